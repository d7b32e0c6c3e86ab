//! Expectation checkers.
//!
//! An [`Expectation`] inspects the [`Outcome`] of one call and records
//! failures on the scenario's report. Expectations are stateless and
//! composed into ordered lists on a [`TestCase`](crate::case::TestCase);
//! all of them must hold. Most look only at the outcome. The pagination,
//! sort-reversal, update and absence checks issue follow-up reads through
//! the same [`ResourceApi`] the scenario used.
//!
//! The two error channels are checked separately: [`no_error`] looks at the
//! client error, [`no_error_alerts`] at the alerts envelope.

use crate::alerts::{AlertLevel, Alerts};
use crate::client::{ReqInf, Reply, RequestOptions, ResourceApi};
use crate::error::ClientError;
use crate::report::{Abort, ScenarioReport};
use crate::resources::Resource;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Everything a scenario's call produced.
#[derive(Debug)]
pub struct Outcome<R> {
    pub info: ReqInf,
    /// The decoded payload as a list. `None` when the call failed or the
    /// method returns no entities (DELETE).
    pub response: Option<Vec<R>>,
    pub alerts: Alerts,
    pub error: Option<ClientError>,
}

impl<R> Outcome<R> {
    fn failed(err: ClientError) -> Self {
        Self {
            info: err.info(),
            response: None,
            alerts: err.alerts().cloned().unwrap_or_default(),
            error: Some(err),
        }
    }

    /// From a list call. A `304` decodes to an empty list.
    pub fn from_list(result: Result<Reply<Vec<R>>, ClientError>) -> Self {
        match result {
            Ok(reply) => Self {
                info: reply.info,
                response: Some(reply.response.unwrap_or_default()),
                alerts: reply.alerts,
                error: None,
            },
            Err(err) => Self::failed(err),
        }
    }

    /// From a create or update call returning one entity.
    pub fn from_single(result: Result<Reply<R>, ClientError>) -> Self {
        match result {
            Ok(reply) => Self {
                info: reply.info,
                response: reply.response.map(|r| vec![r]),
                alerts: reply.alerts,
                error: None,
            },
            Err(err) => Self::failed(err),
        }
    }

    /// From a call whose payload is not an entity.
    pub fn from_untyped(result: Result<Reply<Value>, ClientError>) -> Self {
        match result {
            Ok(reply) => Self {
                info: reply.info,
                response: None,
                alerts: reply.alerts,
                error: None,
            },
            Err(err) => Self::failed(err),
        }
    }
}

/// What an expectation gets to look at and act through.
pub struct CheckScope<'a, R: Resource> {
    pub outcome: &'a Outcome<R>,
    pub api: &'a dyn ResourceApi<R>,
    pub report: &'a mut ScenarioReport,
}

#[async_trait]
pub trait Expectation<R: Resource>: Send + Sync {
    async fn check(&self, scope: &mut CheckScope<'_, R>) -> Result<(), Abort>;
}

/// Adapts a synchronous closure into an [`Expectation`].
struct FnCheck<F>(F);

#[async_trait]
impl<R, F> Expectation<R> for FnCheck<F>
where
    R: Resource,
    F: Fn(&Outcome<R>, &mut ScenarioReport) -> Result<(), Abort> + Send + Sync,
{
    async fn check(&self, scope: &mut CheckScope<'_, R>) -> Result<(), Abort> {
        (self.0)(scope.outcome, scope.report)
    }
}

/// A resource-specific check written inline.
pub fn satisfies<R, F>(check: F) -> Box<dyn Expectation<R>>
where
    R: Resource,
    F: Fn(&Outcome<R>, &mut ScenarioReport) -> Result<(), Abort> + Send + Sync + 'static,
{
    Box::new(FnCheck(check))
}

pub fn no_error<R: Resource>() -> Box<dyn Expectation<R>> {
    satisfies(|outcome: &Outcome<R>, report: &mut ScenarioReport| {
        if let Some(err) = &outcome.error {
            report.error(format!(
                "Expected no error, but got: {} - alerts: {}",
                err, outcome.alerts
            ));
        }
        Ok(())
    })
}

pub fn has_error<R: Resource>() -> Box<dyn Expectation<R>> {
    satisfies(|outcome: &Outcome<R>, report: &mut ScenarioReport| {
        report.check(outcome.error.is_some(), || {
            format!(
                "Expected error, but got none (status {}) - alerts: {}",
                outcome.info.status_code, outcome.alerts
            )
        });
        Ok(())
    })
}

pub fn has_status<R: Resource>(status: StatusCode) -> Box<dyn Expectation<R>> {
    satisfies(move |outcome: &Outcome<R>, report: &mut ScenarioReport| {
        report.check(outcome.info.status_code == status.as_u16(), || {
            format!(
                "Expected status code {}, got {}",
                status.as_u16(),
                outcome.info.status_code
            )
        });
        Ok(())
    })
}

pub fn no_error_alerts<R: Resource>() -> Box<dyn Expectation<R>> {
    satisfies(|outcome: &Outcome<R>, report: &mut ScenarioReport| {
        report.check(!outcome.alerts.has_errors(), || {
            format!("Expected no error-level alerts, got: {}", outcome.alerts)
        });
        Ok(())
    })
}

/// Some alert of `level` contains `text`.
pub fn has_alert<R: Resource>(level: AlertLevel, text: impl Into<String>) -> Box<dyn Expectation<R>> {
    let text = text.into();
    satisfies(move |outcome: &Outcome<R>, report: &mut ScenarioReport| {
        report.check(outcome.alerts.contains(level, &text), || {
            format!(
                "Expected a {}-level alert containing '{}', got: {}",
                level, text, outcome.alerts
            )
        });
        Ok(())
    })
}

fn require_response<'a, R>(outcome: &'a Outcome<R>, report: &mut ScenarioReport) -> Result<&'a [R], Abort> {
    report
        .require(outcome.response.as_deref(), || {
            format!(
                "Expected a response, but got none (status {})",
                outcome.info.status_code
            )
        })
}

/// Exact length. Aborts the scenario on mismatch so later checks can
/// index the response.
pub fn response_has_length<R: Resource>(expected: usize) -> Box<dyn Expectation<R>> {
    satisfies(move |outcome: &Outcome<R>, report: &mut ScenarioReport| {
        let response = require_response(outcome, report)?;
        if response.len() != expected {
            return Err(report.fatal(format!(
                "Expected response to have length {}, but got {}",
                expected,
                response.len()
            )));
        }
        Ok(())
    })
}

pub fn response_length_at_least<R: Resource>(minimum: usize) -> Box<dyn Expectation<R>> {
    satisfies(move |outcome: &Outcome<R>, report: &mut ScenarioReport| {
        let response = require_response(outcome, report)?;
        report.check(response.len() >= minimum, || {
            format!(
                "Expected response length to be at least {}, but got {}",
                minimum,
                response.len()
            )
        });
        Ok(())
    })
}

fn to_object<R: Resource>(item: &R, report: &mut ScenarioReport) -> Result<Map<String, Value>, Abort> {
    match serde_json::to_value(item) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(report.fatal(format!("Expected a JSON object, got {}", other))),
        Err(e) => Err(report.fatal(format!("Cannot serialize response element: {}", e))),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

fn field_values<R: Resource>(items: &[R], field: &str, report: &mut ScenarioReport) -> Result<Vec<Value>, Abort> {
    items
        .iter()
        .map(|item| Ok(to_object(item, report)?.remove(field).unwrap_or(Value::Null)))
        .collect()
}

fn check_fields<R: Resource>(items: &[R], fields: &Map<String, Value>, report: &mut ScenarioReport) -> Result<(), Abort> {
    for item in items {
        let object = to_object(item, report)?;
        for (key, expected) in fields {
            let actual = object.get(key).unwrap_or(&Value::Null);
            report.check(values_equal(actual, expected), || {
                format!("Expected {} to be {}, but got {}", key, expected, actual)
            });
        }
    }
    Ok(())
}

fn fields_map(fields: Value) -> Map<String, Value> {
    match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Every element carries each field with the given value. `fields` is a
/// JSON object keyed by wire field name; numbers compare by value.
pub fn fields_equal<R: Resource>(fields: Value) -> Box<dyn Expectation<R>> {
    let fields = fields_map(fields);
    satisfies(move |outcome: &Outcome<R>, report: &mut ScenarioReport| {
        let response = require_response(outcome, report)?;
        if response.is_empty() {
            report.error("Expected at least one element to compare fields against, got none");
        }
        check_fields(response, &fields, report)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("ascending"),
            SortOrder::Descending => f.write_str("descending"),
        }
    }
}

/// The response is sorted by `field`.
pub fn sorted_by<R: Resource>(field: impl Into<String>, order: SortOrder) -> Box<dyn Expectation<R>> {
    let field = field.into();
    satisfies(move |outcome: &Outcome<R>, report: &mut ScenarioReport| {
        let response = require_response(outcome, report)?;
        let values = field_values(response, &field, report)?;
        let sorted = values.windows(2).all(|pair| {
            let ordering = compare_values(&pair[0], &pair[1]);
            match order {
                SortOrder::Ascending => ordering.is_some_and(Ordering::is_le),
                SortOrder::Descending => ordering.is_some_and(Ordering::is_ge),
            }
        });
        report.check(sorted, || {
            format!("List is not sorted by {} ({}): {:?}", field, order, values)
        });
        Ok(())
    })
}

struct DescReversesDefault {
    field: String,
}

#[async_trait]
impl<R: Resource> Expectation<R> for DescReversesDefault {
    async fn check(&self, scope: &mut CheckScope<'_, R>) -> Result<(), Abort> {
        let desc = require_response(scope.outcome, scope.report)?;
        if desc.is_empty() {
            return Err(scope
                .report
                .fatal(format!("Need at least one {} to test sort ordering", R::KIND.singular())));
        }

        let asc = match scope.api.list(&RequestOptions::new()).await {
            Ok(reply) => reply.response.unwrap_or_default(),
            Err(e) => {
                return Err(scope
                    .report
                    .fatal(format!("Expected no error getting default ordering, but got: {}", e)));
            }
        };
        if asc.len() != desc.len() {
            return Err(scope.report.fatal(format!(
                "Traffic Ops returned {} {} using default sort order, but {} when sort order was explicitly set to descending",
                asc.len(),
                R::KIND,
                desc.len()
            )));
        }

        let mut reversed = field_values(desc, &self.field, scope.report)?;
        reversed.reverse();
        let ascending = field_values(&asc, &self.field, scope.report)?;
        scope.report.check(reversed == ascending, || {
            format!(
                "{} responses are not equal after reversal: Asc: {:?} - Desc reversed: {:?}",
                R::KIND,
                ascending,
                reversed
            )
        });
        Ok(())
    }
}

/// The response, reversed, equals a freshly fetched default-ordered list
/// field-for-field. Use on a `sortOrder=desc` request.
pub fn sorted_desc_reverses_default<R: Resource>(field: impl Into<String>) -> Box<dyn Expectation<R>> {
    Box::new(DescReversesDefault { field: field.into() })
}

/// The paging parameters a scenario requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Limit(usize),
    Offset { limit: usize, offset: usize },
    Page { limit: usize, page: usize },
}

impl Pagination {
    /// The `[start, end)` window this pagination selects from `len` items.
    pub fn window(&self, len: usize) -> (usize, usize) {
        let (limit, start) = match *self {
            Pagination::Limit(limit) => (limit, 0),
            Pagination::Offset { limit, offset } => (limit, offset),
            Pagination::Page { limit, page } => (limit, page.saturating_sub(1).saturating_mul(limit)),
        };
        let start = start.min(len);
        (start, start.saturating_add(limit).min(len))
    }
}

struct Paginated {
    order_by: String,
    pagination: Pagination,
}

#[async_trait]
impl<R: Resource> Expectation<R> for Paginated {
    async fn check(&self, scope: &mut CheckScope<'_, R>) -> Result<(), Abort> {
        let paged = require_response(scope.outcome, scope.report)?;
        let opts = RequestOptions::new().with_query("orderby", &self.order_by);
        let baseline = match scope.api.list(&opts).await {
            Ok(reply) => reply.response.unwrap_or_default(),
            Err(e) => {
                return Err(scope.report.fatal(format!(
                    "Cannot get {} ordered by {}: {}",
                    R::KIND,
                    self.order_by,
                    e
                )));
            }
        };
        if baseline.len() < 2 {
            return Err(scope.report.fatal(format!(
                "Need at least 2 {} in Traffic Ops to test pagination support, found: {}",
                R::KIND,
                baseline.len()
            )));
        }

        let (start, end) = self.pagination.window(baseline.len());
        scope.report.check(paged == &baseline[start..end], || {
            format!(
                "Expected {:?} to return {} elements [{}..{}] of the {} baseline, got {} elements",
                self.pagination,
                end - start,
                start,
                end,
                self.order_by,
                paged.len()
            )
        });
        Ok(())
    }
}

/// The response is exactly the slice `pagination` selects from an
/// unpaginated list ordered by `id`.
pub fn paginated<R: Resource>(pagination: Pagination) -> Box<dyn Expectation<R>> {
    paginated_by("id", pagination)
}

/// Like [`paginated`] with an explicit `orderby` for the baseline.
pub fn paginated_by<R: Resource>(order_by: impl Into<String>, pagination: Pagination) -> Box<dyn Expectation<R>> {
    Box::new(Paginated {
        order_by: order_by.into(),
        pagination,
    })
}

struct UpdatedFields {
    key: String,
    fields: Map<String, Value>,
}

#[async_trait]
impl<R: Resource> Expectation<R> for UpdatedFields {
    async fn check(&self, scope: &mut CheckScope<'_, R>) -> Result<(), Abort> {
        let opts = RequestOptions::new().with_query(R::KIND.key_field(), &self.key);
        let found = match scope.api.list(&opts).await {
            Ok(reply) => reply.response.unwrap_or_default(),
            Err(e) => {
                return Err(scope.report.fatal(format!(
                    "Expected no error getting {} '{}' after update, but got: {}",
                    R::KIND.singular(),
                    self.key,
                    e
                )));
            }
        };
        if found.len() != 1 {
            return Err(scope.report.fatal(format!(
                "Expected exactly one {} named '{}' after update, found: {}",
                R::KIND.singular(),
                self.key,
                found.len()
            )));
        }
        check_fields(&found, &self.fields, scope.report)
    }
}

/// Re-fetches by natural key after a mutation; exactly one entity must
/// come back and carry `fields`.
pub fn updated_fields<R: Resource>(key: impl Into<String>, fields: Value) -> Box<dyn Expectation<R>> {
    Box::new(UpdatedFields {
        key: key.into(),
        fields: fields_map(fields),
    })
}

struct Absent {
    param: String,
    value: String,
}

#[async_trait]
impl<R: Resource> Expectation<R> for Absent {
    async fn check(&self, scope: &mut CheckScope<'_, R>) -> Result<(), Abort> {
        let opts = RequestOptions::new().with_query(&self.param, &self.value);
        match scope.api.list(&opts).await {
            Ok(reply) => {
                let remaining = reply.response.unwrap_or_default().len();
                scope.report.check(remaining == 0, || {
                    format!(
                        "Expected {} with {}={} to be deleted, but {} remain",
                        R::KIND,
                        self.param,
                        self.value,
                        remaining
                    )
                });
                Ok(())
            }
            Err(e) => Err(scope.report.fatal(format!(
                "Expected no error checking {} {}={}, but got: {}",
                R::KIND,
                self.param,
                self.value,
                e
            ))),
        }
    }
}

/// A list filtered by `param=value` comes back empty.
pub fn absent_by<R: Resource>(param: impl Into<String>, value: impl ToString) -> Box<dyn Expectation<R>> {
    Box::new(Absent {
        param: param.into(),
        value: value.to_string(),
    })
}
