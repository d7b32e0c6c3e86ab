//! Users cannot be deleted through the API; their fixtures are removed
//! through the administrative back-door.

use crate::common;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, Method, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::resources::{ResourceKind, Tenant, User};
use traffic_ops_harness::{HarnessResult, RequestOptions, SuiteReport, TestContext};

fn user(username: &str, role: &str, tenant: &str, tenant_id: i64) -> User {
    let mut user = User::new(username, role, tenant);
    user.tenant_id = Some(tenant_id);
    user.local_passwd = Some("pa55word".to_string());
    user
}

fn user_tests(current_time: DateTime<Utc>, tenant1: i64, tenant2: i64) -> MethodTests<User> {
    let mut renamed = user("opsuser", "operations", "tenant2", tenant2);
    renamed.full_name = Some("Operations User, Moved".to_string());
    renamed.local_passwd = None;

    let tests = common::conditional_reads(MethodTests::new(), current_time);
    let tests = common::pagination_errors(tests)
        .get(
            "OK when VALID USERNAME parameter",
            TestCase::new()
                .query("username", "opsuser")
                .expect(no_error())
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"role": "operations", "tenant": "tenant1"})))
                .expect(satisfies(|outcome, report| {
                    let leaked = outcome
                        .response
                        .iter()
                        .flatten()
                        .any(|user: &User| user.local_passwd.is_some());
                    report.check(!leaked, || "Expected localPasswd to never be returned".to_string());
                    Ok(())
                })),
        )
        .get(
            "OK when VALID ROLE parameter",
            TestCase::new()
                .query("role", "read-only")
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"username": "readonlyuser"}))),
        )
        .get(
            "OK when VALID TENANT parameter",
            TestCase::new()
                .query("tenant", "tenant2")
                .expect(response_has_length(1)),
        )
        .get(
            "OK when VALID request",
            TestCase::new()
                .expect(response_length_at_least(3))
                .expect(sorted_by("username", SortOrder::Ascending)),
        )
        .post(
            "BAD REQUEST when ROLE is UNKNOWN",
            TestCase::new()
                .body(user("wizard", "archmage", "tenant1", tenant1))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "not a known role")),
        )
        .post(
            "BAD REQUEST when USERNAME ALREADY EXISTS",
            TestCase::new()
                .body(user("readonlyuser", "read-only", "tenant2", tenant2))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "already exists")),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("opsuser"))
                .body(renamed)
                .expect(no_error())
                .expect(updated_fields(
                    "opsuser",
                    json!({"tenant": "tenant2", "fullName": "Operations User, Moved"}),
                )),
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
            "METHOD NOT ALLOWED when DELETING a USER",
            TestCase::new()
                .endpoint(EndpointId::by_name("readonlyuser"))
                .expect(has_error())
                .expect(has_status(StatusCode::METHOD_NOT_ALLOWED)),
        );

    common::stale_updates(
        tests,
        || {
            TestCase::new()
                .endpoint(EndpointId::by_name("readonlyuser"))
                .body(user("readonlyuser", "read-only", "tenant1", tenant1))
        },
        current_time,
    )
}

async fn run_user_tests(ctx: &TestContext, current_time: DateTime<Utc>) -> HarnessResult<SuiteReport> {
    let tenant1 = ctx.id_of::<Tenant>("tenant1").await?;
    let tenant2 = ctx.id_of::<Tenant>("tenant2").await?;
    Ok(ctx.run(&user_tests(current_time, tenant1, tenant2)).await)
}

#[tokio::test]
async fn test_users() {
    let ctx = common::context().await;
    let report = ctx
        .with_objs(
            &[ResourceKind::Tenants, ResourceKind::Users],
            run_user_tests(&ctx, Utc::now() - Duration::seconds(5)),
        )
        .await
        .expect("fixture setup and teardown")
        .expect("tenant lookups");
    report.assert_passed();
}

#[tokio::test]
async fn test_user_teardown_goes_through_the_backdoor() {
    let (server, ctx) = common::sim_context().await;
    ctx.with_objs(&[ResourceKind::Tenants, ResourceKind::Users], async {
        assert_eq!(server.count(ResourceKind::Users).await, 3);
    })
    .await
    .unwrap();
    assert_eq!(server.count(ResourceKind::Users).await, 1);
    // Only the seeded root tenant is left.
    assert_eq!(server.count(ResourceKind::Tenants).await, 1);
}
