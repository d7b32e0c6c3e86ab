//! Divisions: reads, renames, conditional writes, and referential deletes.

use crate::common;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, Method, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::resources::{Division, ResourceKind};
use traffic_ops_harness::{Endpoint, RequestOptions};

fn division_tests(current_time: DateTime<Utc>) -> MethodTests<Division> {
    let tests = common::conditional_reads(MethodTests::new(), current_time);
    common::pagination_errors(tests)
        .get(
            "OK when VALID request",
            TestCase::new()
                .expect(no_error())
                .expect(has_status(StatusCode::OK))
                .expect(response_length_at_least(1))
                .expect(sorted_by("name", SortOrder::Ascending)),
        )
        .get(
            "OK when VALID NAME parameter",
            TestCase::new()
                .query("name", "division1")
                .expect(no_error())
                .expect(has_status(StatusCode::OK))
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"name": "division1"}))),
        )
        .get(
            "VALID when SORTORDER param is DESC",
            TestCase::new()
                .query("sortOrder", "desc")
                .expect(no_error())
                .expect(sorted_by("name", SortOrder::Descending))
                .expect(sorted_desc_reverses_default("name")),
        )
        .get(
            "FIRST RESULT when LIMIT=1",
            TestCase::new()
                .query("orderby", "id")
                .query("limit", 1)
                .expect(no_error())
                .expect(paginated(Pagination::Limit(1))),
        )
        .get(
            "SECOND RESULT when LIMIT=1 OFFSET=1",
            TestCase::new()
                .query("orderby", "id")
                .query("limit", 1)
                .query("offset", 1)
                .expect(no_error())
                .expect(paginated(Pagination::Offset { limit: 1, offset: 1 })),
        )
        .get(
            "SECOND RESULT when LIMIT=1 PAGE=2",
            TestCase::new()
                .query("orderby", "id")
                .query("limit", 1)
                .query("page", 2)
                .expect(no_error())
                .expect(paginated(Pagination::Page { limit: 1, page: 2 })),
        )
        .post(
            "BAD REQUEST when NAME is BLANK",
            TestCase::new()
                .body(Division::new(""))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "name: cannot be blank")),
        )
        .post(
            "BAD REQUEST when NAME ALREADY EXISTS",
            TestCase::new()
                .body(Division::new("division1"))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "already exists")),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("division2"))
                .body(Division::new("testdivision"))
                .expect(no_error())
                .expect(has_status(StatusCode::OK))
                .expect(has_alert(AlertLevel::Success, "division was updated"))
                .expect(updated_fields("testdivision", json!({"name": "testdivision"}))),
        )
        .put(
            "PRECONDITION FAILED when updating with IF-UNMODIFIED-SINCE Header",
            TestCase::new()
                .endpoint(EndpointId::by_name("division1"))
                .body(Division::new("division1"))
                .options(RequestOptions::new().if_unmodified_since(current_time))
                .expect(has_error())
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
        .put(
            "PRECONDITION FAILED when updating with IFMATCH ETAG Header",
            TestCase::new()
                .endpoint(EndpointId::by_name("division1"))
                .body(Division::new("division1"))
                .options(RequestOptions::new().if_match(current_time))
                .expect(has_error())
                .expect(has_status(StatusCode::PRECONDITION_FAILED)),
        )
        .put(
            "NOT FOUND when DIVISION DOESNT EXIST",
            TestCase::new()
                .endpoint(EndpointId::id(111_111_111))
                .body(Division::new("nowhere"))
                .expect(has_status(StatusCode::NOT_FOUND)),
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
            "BAD REQUEST when DIVISION in use by REGION",
            TestCase::new()
                .endpoint(EndpointId::by_name("division1"))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "being used by a region")),
        )
        .delete(
            "NOT FOUND when DOESNT EXIST",
            TestCase::new()
                .endpoint(EndpointId::id(111_111_111))
                .expect(has_status(StatusCode::NOT_FOUND)),
        )
        .delete(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("division3"))
                .expect(no_error())
                .expect(has_alert(AlertLevel::Success, "division was deleted."))
                .expect(absent_by("name", "division3")),
        )
        // Restores the renamed fixture so teardown finds it.
        .scenario(
            "RESTORE",
            Method::Put,
            "OK when RENAMED BACK",
            TestCase::new()
                .endpoint(EndpointId::by_name("testdivision"))
                .body(Division::new("division2"))
                .expect(no_error()),
        )
}

#[tokio::test]
async fn test_divisions() {
    let ctx = common::context().await;
    let current_time = Utc::now() - Duration::seconds(5);
    let tests = division_tests(current_time);
    common::run_with(
        &ctx,
        &[ResourceKind::Divisions, ResourceKind::Regions],
        ctx.run(&tests),
    )
    .await;
}

#[tokio::test]
async fn test_stale_update_leaves_division_unchanged() {
    let ctx = common::context().await;
    let stale = Utc::now() - Duration::seconds(5);
    ctx.with_objs(&[ResourceKind::Divisions], async {
        let id = ctx.id_of::<Division>("division1").await.unwrap();
        let api = ctx.api::<Division>();
        let err = api
            .update(
                &Endpoint::Id(id),
                &Division::new("stale-rename"),
                &RequestOptions::new().if_unmodified_since(stale),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::PRECONDITION_FAILED));

        let still = api
            .list(&RequestOptions::new().with_query("name", "division1"))
            .await
            .unwrap()
            .response
            .unwrap();
        assert_eq!(still.len(), 1);
        assert_eq!(still[0].id, Some(id));
    })
    .await
    .unwrap();
}
