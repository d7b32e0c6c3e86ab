//! Regions reference divisions by id, so the table is built once the
//! division fixtures exist and their ids are known.

use crate::common;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, Method, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::resources::{Division, Region, ResourceKind};
use traffic_ops_harness::{HarnessResult, RequestOptions, SuiteReport, TestContext};

fn region(name: &str, division: i64, division_name: &str) -> Region {
    let mut region = Region::new(name, division_name);
    region.division = division;
    region
}

fn region_tests(current_time: DateTime<Utc>, division1: i64, division2: i64) -> MethodTests<Region> {
    let tests = common::conditional_reads(MethodTests::new(), current_time);
    common::pagination_errors(tests)
        .get(
            "OK when VALID NAME parameter",
            TestCase::new()
                .query("name", "region1")
                .expect(no_error())
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"name": "region1", "divisionName": "division1"}))),
        )
        .get(
            "OK when VALID DIVISION parameter",
            TestCase::new()
                .query("division", division2)
                .expect(no_error())
                .expect(response_has_length(2))
                .expect(fields_equal(json!({"division": division2}))),
        )
        .get(
            "BAD REQUEST when DIVISION is NOT an INTEGER",
            TestCase::new()
                .query("division", "abc")
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "division cannot parse to integer")),
        )
        .get(
            "VALID when SORTORDER param is DESC",
            TestCase::new()
                .query("sortOrder", "desc")
                .expect(no_error())
                .expect(sorted_desc_reverses_default("name")),
        )
        .get(
            "FIRST RESULT when LIMIT=1",
            TestCase::new()
                .query("orderby", "id")
                .query("limit", 1)
                .expect(paginated(Pagination::Limit(1))),
        )
        .get(
            "SECOND RESULT when LIMIT=1 OFFSET=1",
            TestCase::new()
                .query("orderby", "id")
                .query("limit", 1)
                .query("offset", 1)
                .expect(paginated(Pagination::Offset { limit: 1, offset: 1 })),
        )
        .get(
            "SECOND RESULT when LIMIT=1 PAGE=2",
            TestCase::new()
                .query("orderby", "id")
                .query("limit", 1)
                .query("page", 2)
                .expect(paginated(Pagination::Page { limit: 1, page: 2 })),
        )
        .post(
            "OK when VALID request",
            TestCase::new()
                .body(region("region-created", division1, "division1"))
                .expect(no_error())
                .expect(has_alert(AlertLevel::Success, "region was created."))
                .expect(fields_equal(json!({"name": "region-created", "divisionName": "division1"}))),
        )
        .post(
            "BAD REQUEST when DIVISION DOESNT EXIST",
            TestCase::new()
                .body(region("region-orphan", 99_999_999, "nowhere"))
                .expect(has_status(StatusCode::BAD_REQUEST)),
        )
        .post(
            "BAD REQUEST when NAME ALREADY EXISTS",
            TestCase::new()
                .body(region("region1", division1, "division1"))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "region name 'region1' already exists")),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("region1"))
                .body(region("region1", division2, "division2"))
                .expect(no_error())
                .expect(updated_fields(
                    "region1",
                    json!({"division": division2, "divisionName": "division2"}),
                )),
        )
        .put(
            "PRECONDITION FAILED when updating with IF-UNMODIFIED-SINCE Header",
            TestCase::new()
                .endpoint(EndpointId::by_name("region2"))
                .body(region("region2", division1, "division1"))
                .options(RequestOptions::new().if_unmodified_since(current_time))
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
        .put(
            "PRECONDITION FAILED when updating with IFMATCH ETAG Header",
            TestCase::new()
                .endpoint(EndpointId::by_name("region2"))
                .body(region("region2", division1, "division1"))
                .options(RequestOptions::new().if_match(current_time))
                .expect(has_error())
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
        .scenario(
            "GET AFTER CHANGES",
            Method::Get,
            "OK when CHANGES made",
            TestCase::new()
                .options(RequestOptions::new().if_modified_since(current_time))
                .expect(no_error())
                .expect(has_status(StatusCode::OK))
                .expect(response_length_at_least(1)),
        )
        .delete(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("region-created"))
                .expect(no_error())
                .expect(absent_by("name", "region-created")),
        )
        .delete(
            "NOT FOUND when DOESNT EXIST",
            TestCase::new()
                .endpoint(EndpointId::id(111_111_111))
                .expect(has_status(StatusCode::NOT_FOUND)),
        )
}

async fn run_region_tests(ctx: &TestContext, current_time: DateTime<Utc>) -> HarnessResult<SuiteReport> {
    let division1 = ctx.id_of::<Division>("division1").await?;
    let division2 = ctx.id_of::<Division>("division2").await?;
    Ok(ctx.run(&region_tests(current_time, division1, division2)).await)
}

#[tokio::test]
async fn test_regions() {
    let ctx = common::context().await;
    let current_time = Utc::now() - Duration::seconds(5);
    let report = ctx
        .with_objs(
            &[ResourceKind::Divisions, ResourceKind::Regions],
            run_region_tests(&ctx, current_time),
        )
        .await
        .expect("fixture setup and teardown")
        .expect("division lookups");
    report.assert_passed();
}
