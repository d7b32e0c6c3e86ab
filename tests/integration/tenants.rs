use crate::common;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, Method, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::fixtures::ROOT_TENANT;
use traffic_ops_harness::resources::{ResourceKind, Tenant};
use traffic_ops_harness::{HarnessResult, RequestOptions, SuiteReport, TestContext};

fn tenant(name: &str, parent_id: i64, active: bool) -> Tenant {
    Tenant {
        name: name.to_string(),
        active,
        parent_id: Some(parent_id),
        ..Tenant::default()
    }
}

fn tenant_tests(current_time: DateTime<Utc>, root: i64, tenant1: i64) -> MethodTests<Tenant> {
    let tests = common::conditional_reads(MethodTests::new(), current_time);
    let tests = common::pagination_errors(tests)
        .get(
            "OK when VALID NAME parameter",
            TestCase::new()
                .query("name", "tenant2")
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"parentName": "tenant1", "parentId": tenant1}))),
        )
        .get(
            "OK when VALID ACTIVE parameter",
            TestCase::new()
                .query("active", false)
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"name": "tenant3"}))),
        )
        .get(
            "OK when VALID PARENTNAME parameter",
            TestCase::new()
                .query("parentName", ROOT_TENANT)
                .expect(response_has_length(2)),
        )
        .get(
            "VALID when SORTORDER param is DESC",
            TestCase::new()
                .query("sortOrder", "desc")
                .expect(sorted_desc_reverses_default("name")),
        )
        .post(
            "OK when VALID request",
            TestCase::new()
                .body(tenant("tenant-created", tenant1, true))
                .expect(no_error())
                .expect(fields_equal(json!({"parentName": "tenant1"}))),
        )
        .post(
            "BAD REQUEST when PARENT DOESNT EXIST",
            TestCase::new()
                .body(tenant("tenant-orphan", 99_999_999, true))
                .expect(has_status(StatusCode::BAD_REQUEST)),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("tenant3"))
                .body(tenant("tenant3", root, true))
                .expect(no_error())
                .expect(updated_fields("tenant3", json!({"active": true}))),
        )
        .scenario(
            "GET AFTER CHANGES",
            Method::Get,
            "OK when CHANGES made",
            TestCase::new()
                .options(RequestOptions::new().if_modified_since(current_time))
                .expect(no_error())
                .expect(has_status(StatusCode::OK)),
        )
        .delete(
            "BAD REQUEST when TENANT has CHILDREN",
            TestCase::new()
                .endpoint(EndpointId::by_name("tenant1"))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "parent of other tenants")),
        )
        .delete(
            "BAD REQUEST when deleting the ROOT TENANT",
            TestCase::new()
                .endpoint(EndpointId::id(root))
                .expect(has_status(StatusCode::BAD_REQUEST)),
        )
        .delete(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("tenant-created"))
                .expect(no_error())
                .expect(absent_by("name", "tenant-created")),
        )
        .delete(
            "OK when deleting a LEAF TENANT",
            TestCase::new()
                .endpoint(EndpointId::by_name("tenant4"))
                .expect(no_error())
                .expect(absent_by("name", "tenant4")),
        );

    common::stale_updates(
        tests,
        || {
            TestCase::new()
                .endpoint(EndpointId::by_name("tenant2"))
                .body(tenant("tenant2", tenant1, false))
        },
        current_time,
    )
}

async fn run_tenant_tests(ctx: &TestContext, current_time: DateTime<Utc>) -> HarnessResult<SuiteReport> {
    let root = ctx.id_of::<Tenant>(ROOT_TENANT).await?;
    let tenant1 = ctx.id_of::<Tenant>("tenant1").await?;
    Ok(ctx.run(&tenant_tests(current_time, root, tenant1)).await)
}

#[tokio::test]
async fn test_tenants() {
    let ctx = common::context().await;
    let report = ctx
        .with_objs(
            &[ResourceKind::Tenants],
            run_tenant_tests(&ctx, Utc::now() - Duration::seconds(5)),
        )
        .await
        .expect("fixture setup and teardown")
        .expect("tenant lookups");
    report.assert_passed();
}
