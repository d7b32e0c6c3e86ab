use crate::common;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::resources::{Coordinate, ResourceKind};
use traffic_ops_harness::RequestOptions;

fn coordinate_tests() -> MethodTests<Coordinate> {
    let current_time = Utc::now() - Duration::seconds(5);
    let tests = common::conditional_reads(MethodTests::new(), current_time);
    common::pagination_errors(tests)
        .get(
            "OK when VALID NAME parameter",
            TestCase::new()
                .query("name", "coordinate1")
                .expect(no_error())
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"latitude": 1.1, "longitude": 2.2}))),
        )
        .get(
            "EMPTY RESPONSE when NAME DOESNT EXIST",
            TestCase::new()
                .query("name", "nope")
                .expect(response_has_length(0)),
        )
        .get(
            "VALID when SORTORDER param is DESC",
            TestCase::new()
                .query("sortOrder", "desc")
                .expect(sorted_by("name", SortOrder::Descending))
                .expect(sorted_desc_reverses_default("name")),
        )
        .get(
            "SECOND RESULT when LIMIT=2 PAGE=2",
            TestCase::new()
                .query("orderby", "id")
                .query("limit", 2)
                .query("page", 2)
                .expect(paginated(Pagination::Page { limit: 2, page: 2 })),
        )
        .get(
            "ALL RESULTS when LIMIT=-1",
            TestCase::new()
                .query("limit", -1)
                .expect(no_error())
                .expect(response_has_length(3)),
        )
        .post(
            "BAD REQUEST when LATITUDE OUT OF RANGE",
            TestCase::new()
                .body(Coordinate::new("coordinate-north", 91.0, 0.0))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "within the range +-90")),
        )
        .post(
            "BAD REQUEST when LONGITUDE OUT OF RANGE",
            TestCase::new()
                .body(Coordinate::new("coordinate-east", 0.0, -180.5))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "within the range +-180")),
        )
        .post(
            "BAD REQUEST when NAME has INVALID CHARACTERS",
            TestCase::new()
                .body(Coordinate::new("not a valid name", 0.0, 0.0))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "alphanumeric")),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("coordinate1"))
                .body(Coordinate::new("coordinate1", 10.5, -20.25))
                .expect(no_error())
                .expect(updated_fields("coordinate1", json!({"latitude": 10.5, "longitude": -20.25}))),
        )
        .put(
            "PRECONDITION FAILED when updating with IFMATCH ETAG Header",
            TestCase::new()
                .endpoint(EndpointId::by_name("coordinate2"))
                .body(Coordinate::new("coordinate2", 0.0, 0.0))
                .options(RequestOptions::new().if_match(current_time))
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
        .put(
            "BAD REQUEST when LATITUDE OUT OF RANGE",
            TestCase::new()
                .endpoint(EndpointId::by_name("coordinate2"))
                .body(Coordinate::new("coordinate2", -90.5, 0.0))
                .expect(has_status(StatusCode::BAD_REQUEST)),
        )
        .delete(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("coordinate3"))
                .expect(no_error())
                .expect(absent_by("name", "coordinate3")),
        )
        .delete(
            "PRECONDITION FAILED when deleting with IF-UNMODIFIED-SINCE Header",
            TestCase::new()
                .endpoint(EndpointId::by_name("coordinate2"))
                .options(RequestOptions::new().if_unmodified_since(current_time))
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
}

#[tokio::test]
async fn test_coordinates() {
    let ctx = common::context().await;
    let tests = coordinate_tests();
    common::run_with(&ctx, &[ResourceKind::Coordinates], ctx.run(&tests)).await;
}
