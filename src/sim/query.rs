//! List-query evaluation: filters, ordering and pagination.
//!
//! Follows the server's rules. Filters apply only to the columns a kind
//! declares and are AND-ed. `orderby` defaults to the natural key and an
//! unknown column leaves rows in storage order. `sortOrder=desc` applies
//! only together with a valid `orderby`. `offset` and `page` are read only
//! when `limit` is present; `limit=-1` means no limit.

use super::SimError;
use super::store::Row;
use crate::client::QueryParameters;
use crate::resources::ResourceKind;
use serde_json::Value;
use std::cmp::Ordering;

pub(crate) const LIMIT_ERROR: &str = "limit parameter must be bigger than -1";
pub(crate) const OFFSET_ERROR: &str = "offset parameter must be a positive integer";
pub(crate) const PAGE_ERROR: &str = "page parameter must be a positive integer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Checker {
    Text,
    Int,
    Bool,
}

/// Query parameters a kind can be filtered and ordered by.
fn columns(kind: ResourceKind) -> &'static [(&'static str, Checker)] {
    use Checker::*;
    match kind {
        ResourceKind::Divisions => &[("id", Int), ("name", Text)],
        ResourceKind::Regions => &[
            ("id", Int),
            ("name", Text),
            ("division", Int),
            ("divisionName", Text),
        ],
        ResourceKind::Coordinates => &[("id", Int), ("name", Text)],
        ResourceKind::Cdns => &[
            ("id", Int),
            ("name", Text),
            ("domainName", Text),
            ("dnssecEnabled", Bool),
        ],
        ResourceKind::Profiles => &[
            ("id", Int),
            ("name", Text),
            ("cdn", Int),
        ],
        ResourceKind::ServiceCategories => &[("name", Text)],
        ResourceKind::Tenants => &[
            ("id", Int),
            ("name", Text),
            ("active", Bool),
            ("parentName", Text),
        ],
        ResourceKind::Users => &[
            ("id", Int),
            ("username", Text),
            ("tenant", Text),
            ("role", Text),
        ],
    }
}

fn matches(row: &Row, column: &str, checker: Checker, wanted: &str) -> bool {
    let Some(actual) = row.value.get(column) else {
        return false;
    };
    match checker {
        Checker::Int => wanted.parse::<i64>().ok() == actual.as_i64(),
        Checker::Bool => wanted.parse::<bool>().ok() == actual.as_bool(),
        Checker::Text => actual.as_str() == Some(wanted),
    }
}

fn check(checker: Checker, value: &str) -> Result<(), &'static str> {
    match checker {
        Checker::Text => Ok(()),
        Checker::Int => value.parse::<i64>().map(|_| ()).map_err(|_| "cannot parse to integer"),
        Checker::Bool => value
            .parse::<bool>()
            .map(|_| ())
            .map_err(|_| "cannot parse to boolean"),
    }
}

/// Rows matching every declared filter present in `query`.
pub(crate) fn filter<'a>(rows: &'a [Row], kind: ResourceKind, query: &QueryParameters) -> Result<Vec<&'a Row>, SimError> {
    let mut errors = Vec::new();
    let mut criteria = Vec::new();
    for (column, checker) in columns(kind) {
        if let Some(value) = query.get(column) {
            match check(*checker, value) {
                Ok(()) => criteria.push((*column, *checker, value)),
                Err(message) => errors.push(format!("{} {}", column, message)),
            }
        }
    }
    if !errors.is_empty() {
        return Err(SimError::bad_request(errors.join("; ")));
    }

    Ok(rows
        .iter()
        .filter(|row| {
            criteria
                .iter()
                .all(|(column, checker, value)| matches(row, column, *checker, value))
        })
        .collect())
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) | (Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None) | (Some(_), Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Sorts `rows` in place per `orderby` and `sortOrder`.
pub(crate) fn order(rows: &mut [&Row], kind: ResourceKind, query: &QueryParameters) {
    let order_by = query.get("orderby").unwrap_or(kind.key_field());
    if !columns(kind).iter().any(|(column, _)| *column == order_by) {
        return;
    }
    let descending = query.get("sortOrder") == Some("desc");
    rows.sort_by(|a, b| {
        let ordering = compare(a.value.get(order_by), b.value.get(order_by));
        if descending { ordering.reverse() } else { ordering }
    });
}

/// The `[start, end)` window of `len` ordered rows selected by the paging
/// parameters.
pub(crate) fn window(len: usize, query: &QueryParameters) -> Result<(usize, usize), SimError> {
    let Some(limit) = query.get("limit") else {
        return Ok((0, len));
    };
    let limit = match limit.parse::<i64>() {
        Ok(limit) if limit >= -1 => limit,
        _ => return Err(SimError::bad_request(LIMIT_ERROR)),
    };

    let start = if let Some(offset) = query.get("offset") {
        match offset.parse::<i64>() {
            Ok(offset) if offset >= 1 => offset as usize,
            _ => return Err(SimError::bad_request(OFFSET_ERROR)),
        }
    } else if let Some(page) = query.get("page") {
        match page.parse::<i64>() {
            Ok(page) if page >= 1 => ((page - 1).saturating_mul(limit.max(0))) as usize,
            _ => return Err(SimError::bad_request(PAGE_ERROR)),
        }
    } else {
        0
    };

    let start = start.min(len);
    let end = if limit == -1 {
        len
    } else {
        start.saturating_add(limit as usize).min(len)
    };
    Ok((start, end))
}
