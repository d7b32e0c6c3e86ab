//! Profiles belong to a CDN, so the CDN fixtures are set up first and torn
//! down last.

use crate::common;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, Method, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::resources::{Cdn, Profile, ResourceKind};
use traffic_ops_harness::{HarnessResult, RequestOptions, SuiteReport, TestContext};

fn profile(name: &str, cdn: i64, cdn_name: &str) -> Profile {
    let mut profile = Profile::new(name, cdn_name, "ATS_PROFILE");
    profile.cdn = cdn;
    profile
}

fn profile_tests(current_time: DateTime<Utc>, cdn1: i64, cdn2: i64) -> MethodTests<Profile> {
    let mut described = profile("EDGE2", cdn2, "cdn2");
    described.description = "edge2 moved".to_string();

    let tests = common::conditional_reads(MethodTests::new(), current_time);
    let tests = common::pagination_errors(tests)
        .get(
            "OK when VALID NAME parameter",
            TestCase::new()
                .query("name", "EDGE1")
                .expect(no_error())
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"cdnName": "cdn1", "type": "ATS_PROFILE"}))),
        )
        .get(
            "OK when VALID CDN parameter",
            TestCase::new()
                .query("cdn", cdn1)
                .expect(no_error())
                .expect(response_has_length(2))
                .expect(fields_equal(json!({"cdn": cdn1}))),
        )
        .get(
            "BAD REQUEST when CDN is NOT an INTEGER",
            TestCase::new()
                .query("cdn", "abc")
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "cdn cannot parse to integer")),
        )
        .get(
            "OK when VALID request",
            TestCase::new()
                .expect(response_length_at_least(3))
                .expect(sorted_by("name", SortOrder::Ascending)),
        )
        .post(
            "OK when VALID request",
            TestCase::new()
                .body(profile("EDGE3", cdn2, "cdn2"))
                .expect(no_error())
                .expect(has_alert(AlertLevel::Success, "profile was created."))
                .expect(fields_equal(json!({"name": "EDGE3", "cdnName": "cdn2"}))),
        )
        .post(
            "BAD REQUEST when NAME has SPACES",
            TestCase::new()
                .body(profile("EDGE 4", cdn1, "cdn1"))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "cannot contain spaces")),
        )
        .post(
            "BAD REQUEST when CDN DOESNT EXIST",
            TestCase::new()
                .body(profile("EDGE5", 99_999_999, "nowhere"))
                .expect(has_status(StatusCode::BAD_REQUEST)),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("EDGE2"))
                .body(described)
                .expect(no_error())
                .expect(updated_fields("EDGE2", json!({"description": "edge2 moved", "cdnName": "cdn2"}))),
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
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("EDGE3"))
                .expect(no_error())
                .expect(absent_by("name", "EDGE3")),
        )
        .delete(
            "NOT FOUND when DOESNT EXIST",
            TestCase::new()
                .endpoint(EndpointId::id(111_111_111))
                .expect(has_status(StatusCode::NOT_FOUND)),
        );

    common::stale_updates(
        tests,
        || {
            TestCase::new()
                .endpoint(EndpointId::by_name("EDGE1"))
                .body(profile("EDGE1", cdn1, "cdn1"))
        },
        current_time,
    )
}

async fn run_profile_tests(ctx: &TestContext, current_time: DateTime<Utc>) -> HarnessResult<SuiteReport> {
    let cdn1 = ctx.id_of::<Cdn>("cdn1").await?;
    let cdn2 = ctx.id_of::<Cdn>("cdn2").await?;
    Ok(ctx.run(&profile_tests(current_time, cdn1, cdn2)).await)
}

#[tokio::test]
async fn test_profiles() {
    let ctx = common::context().await;
    let report = ctx
        .with_objs(
            &[ResourceKind::Cdns, ResourceKind::Profiles],
            run_profile_tests(&ctx, Utc::now() - Duration::seconds(5)),
        )
        .await
        .expect("fixture setup and teardown")
        .expect("cdn lookups");
    report.assert_passed();
}
