//! Runs a [`MethodTests`] table against a [`ResourceApi`].
//!
//! Each scenario goes through two phases. Setup resolves its endpoint
//! (looking up server-assigned ids by name). Execute performs the call
//! and feeds the [`Outcome`] to every expectation in order. A scenario
//! that fails or aborts never stops its siblings; side effects of earlier
//! scenarios are visible to later ones.

use crate::case::{Method, MethodTests, TestCase};
use crate::client::{Endpoint, ResourceApi};
use crate::expect::{CheckScope, Outcome};
use crate::report::{ScenarioReport, SuiteReport};
use crate::resources::Resource;
use log::{debug, info, warn};

/// Runs every scenario of `tests`, group by group.
pub async fn run<R: Resource>(api: &dyn ResourceApi<R>, tests: &MethodTests<R>) -> SuiteReport {
    let mut suite = SuiteReport::new();
    for group in tests.groups() {
        for (name, case) in &group.scenarios {
            info!("{} [{}] {}", R::KIND, group.label, name);
            let mut report = ScenarioReport::new(&group.label, name);
            run_scenario(api, group.method, case, &mut report).await;
            if !report.passed() {
                warn!("{}", report);
            }
            suite.push(report);
        }
    }
    suite
}

async fn resolve_endpoint<R: Resource>(
    api: &dyn ResourceApi<R>,
    case: &TestCase<R>,
    report: &mut ScenarioReport,
) -> Option<Option<Endpoint>> {
    let Some(id) = &case.endpoint else {
        return Some(None);
    };
    match id.resolve(api).await {
        Ok(endpoint) => {
            debug!("Resolved {} to {}", id, endpoint);
            Some(Some(endpoint))
        }
        Err(message) => {
            report.fatal(message);
            None
        }
    }
}

async fn execute<R: Resource>(
    api: &dyn ResourceApi<R>,
    method: Method,
    case: &TestCase<R>,
    endpoint: Option<&Endpoint>,
    report: &mut ScenarioReport,
) -> Option<Outcome<R>> {
    let opts = &case.options;
    let outcome = match method {
        Method::Get => Outcome::from_list(api.list(opts).await),
        Method::Post => {
            let Some(body) = &case.body else {
                report.fatal("POST scenario has no request body");
                return None;
            };
            Outcome::from_single(api.create(body, opts).await)
        }
        Method::Put => {
            let (Some(endpoint), Some(body)) = (endpoint, &case.body) else {
                report.fatal("PUT scenario needs both an endpoint and a request body");
                return None;
            };
            Outcome::from_single(api.update(endpoint, body, opts).await)
        }
        Method::Delete => {
            let Some(endpoint) = endpoint else {
                report.fatal("DELETE scenario has no endpoint");
                return None;
            };
            Outcome::from_untyped(api.delete(endpoint, opts).await)
        }
    };
    Some(outcome)
}

async fn run_scenario<R: Resource>(
    api: &dyn ResourceApi<R>,
    method: Method,
    case: &TestCase<R>,
    report: &mut ScenarioReport,
) {
    let Some(endpoint) = resolve_endpoint(api, case, report).await else {
        return;
    };
    let Some(outcome) = execute(api, method, case, endpoint.as_ref(), report).await else {
        return;
    };

    let mut scope = CheckScope {
        outcome: &outcome,
        api,
        report,
    };
    for expectation in &case.expectations {
        if expectation.check(&mut scope).await.is_err() {
            break;
        }
    }
}
