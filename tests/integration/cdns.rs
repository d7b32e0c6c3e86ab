use crate::common;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use traffic_ops_harness::alerts::AlertLevel;
use traffic_ops_harness::case::{EndpointId, Method, MethodTests, TestCase};
use traffic_ops_harness::expect::*;
use traffic_ops_harness::resources::{Cdn, ResourceKind};
use traffic_ops_harness::{Endpoint, RequestOptions};

fn cdn_tests(current_time: DateTime<Utc>) -> MethodTests<Cdn> {
    let changed = Cdn::new("cdn2", "changed.cdn2.net");

    let tests = common::conditional_reads(MethodTests::new(), current_time);
    let tests = common::pagination_errors(tests)
        .get(
            "OK when VALID DNSSECENABLED parameter",
            TestCase::new()
                .query("dnssecEnabled", true)
                .expect(no_error())
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"name": "cdn2", "domainName": "test.cdn2.net"}))),
        )
        .get(
            "BAD REQUEST when DNSSECENABLED is NOT a BOOLEAN",
            TestCase::new()
                .query("dnssecEnabled", "maybe")
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "dnssecEnabled cannot parse to boolean")),
        )
        .get(
            "OK when VALID DOMAINNAME parameter",
            TestCase::new()
                .query("domainName", "test.cdn1.net")
                .expect(response_has_length(1))
                .expect(fields_equal(json!({"name": "cdn1"}))),
        )
        .get(
            "OK when VALID request",
            TestCase::new()
                .query("orderby", "domainName")
                .expect(no_error_alerts())
                .expect(sorted_by("domainName", SortOrder::Ascending)),
        )
        .post(
            "BAD REQUEST when DOMAINNAME is BLANK",
            TestCase::new()
                .body(Cdn::new("cdn-nodomain", ""))
                .expect(has_status(StatusCode::BAD_REQUEST))
                .expect(has_alert(AlertLevel::Error, "domainName: cannot be blank")),
        )
        .put(
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("cdn2"))
                .body(changed)
                .expect(no_error())
                .expect(updated_fields(
                    "cdn2",
                    json!({"domainName": "changed.cdn2.net", "dnssecEnabled": false}),
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
            "OK when VALID request",
            TestCase::new()
                .endpoint(EndpointId::by_name("cdn3"))
                .expect(no_error())
                .expect(has_alert(AlertLevel::Success, "cdn was deleted."))
                .expect(absent_by("name", "cdn3")),
        );

    common::stale_updates(
        tests,
        || {
            TestCase::new()
                .endpoint(EndpointId::by_name("cdn1"))
                .body(Cdn::new("cdn1", "stale.cdn1.net"))
        },
        current_time,
    )
}

#[tokio::test]
async fn test_cdns() {
    let ctx = common::context().await;
    let tests = cdn_tests(Utc::now() - Duration::seconds(5));
    common::run_with(&ctx, &[ResourceKind::Cdns], ctx.run(&tests)).await;
}

#[tokio::test]
async fn test_stale_etag_leaves_cdn_unchanged() {
    let ctx = common::context().await;
    let stale = Utc::now() - Duration::seconds(5);
    ctx.with_objs(&[ResourceKind::Cdns], async {
        let api = ctx.api::<Cdn>();
        let by_name = RequestOptions::new().with_query("name", "cdn1");
        let before = api.list(&by_name).await.unwrap().response.unwrap().remove(0);
        let endpoint = Endpoint::Id(before.id.unwrap());

        let err = api
            .update(
                &endpoint,
                &Cdn::new("cdn1", "stale.cdn1.net"),
                &RequestOptions::new().if_match(stale),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::PRECONDITION_FAILED));

        let after = api.list(&by_name).await.unwrap().response.unwrap().remove(0);
        assert_eq!(after.domain_name, "test.cdn1.net");
        assert_eq!(after.last_updated, before.last_updated);

        // A tag taken from the current row lets the write through.
        let current = before.last_updated.unwrap();
        api.update(
            &endpoint,
            &Cdn::new("cdn1", "fresh.cdn1.net"),
            &RequestOptions::new().if_match(current),
        )
        .await
        .unwrap();
        let fresh = api.list(&by_name).await.unwrap().response.unwrap().remove(0);
        assert_eq!(fresh.domain_name, "fresh.cdn1.net");
    })
    .await
    .unwrap();
}
