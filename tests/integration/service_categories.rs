//! Service categories have no numeric id; every mutation addresses them by
//! name in the path.

use crate::common;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, Method, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::resources::{ResourceKind, ServiceCategory};
use traffic_ops_harness::RequestOptions;

fn service_category_tests() -> MethodTests<ServiceCategory> {
    let current_time = Utc::now() - Duration::seconds(5);
    let tests = common::conditional_reads(MethodTests::new(), current_time);
    common::pagination_errors(tests)
        .get(
            "OK when VALID NAME parameter",
            TestCase::new()
                .query("name", "barServiceCategory2")
                .expect(no_error())
                .expect(response_has_length(1)),
        )
        .get(
            "OK when VALID request",
            TestCase::new()
                .expect(response_length_at_least(2))
                .expect(sorted_by("name", SortOrder::Ascending)),
        )
        .get(
            "SECOND RESULT when LIMIT=1 OFFSET=1",
            TestCase::new()
                .query("orderby", "name")
                .query("limit", 1)
                .query("offset", 1)
                .expect(paginated_by("name", Pagination::Offset { limit: 1, offset: 1 })),
        )
        .post(
            "BAD REQUEST when NAME ALREADY EXISTS",
            TestCase::new()
                .body(ServiceCategory::new("serviceCategory1"))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "already exists")),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::name("barServiceCategory2"))
                .body(ServiceCategory::new("barServiceCategory2 renamed"))
                .expect(no_error())
                .expect(updated_fields(
                    "barServiceCategory2 renamed",
                    json!({"name": "barServiceCategory2 renamed"}),
                )),
        )
        .put(
            "PRECONDITION FAILED when updating with IF-UNMODIFIED-SINCE Header",
            TestCase::new()
                .endpoint(EndpointId::name("serviceCategory1"))
                .body(ServiceCategory::new("serviceCategory1"))
                .options(RequestOptions::new().if_unmodified_since(current_time))
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
        .put(
            "PRECONDITION FAILED when updating with IFMATCH ETAG Header",
            TestCase::new()
                .endpoint(EndpointId::name("serviceCategory1"))
                .body(ServiceCategory::new("serviceCategory1"))
                .options(RequestOptions::new().if_match(current_time))
                .expect(has_error())
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
        .put(
            "NOT FOUND when DOESNT EXIST",
            TestCase::new()
                .endpoint(EndpointId::name("noSuchCategory"))
                .body(ServiceCategory::new("noSuchCategory"))
                .expect(has_status(StatusCode::NOT_FOUND)),
        )
        .scenario(
            "RESTORE",
            Method::Put,
            "OK when RENAMED BACK",
            TestCase::new()
                .endpoint(EndpointId::by_name("barServiceCategory2 renamed"))
                .body(ServiceCategory::new("barServiceCategory2"))
                .expect(no_error()),
        )
        .delete(
            "NOT FOUND when DOESNT EXIST",
            TestCase::new()
                .endpoint(EndpointId::name("noSuchCategory"))
                .expect(has_status(StatusCode::NOT_FOUND)),
        )
        .delete(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("serviceCategory1"))
                .expect(no_error())
                .expect(absent_by("name", "serviceCategory1")),
        )
}

#[tokio::test]
async fn test_service_categories() {
    let ctx = common::context().await;
    let tests = service_category_tests();
    common::run_with(&ctx, &[ResourceKind::ServiceCategories], ctx.run(&tests)).await;
}
