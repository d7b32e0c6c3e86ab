//! Per-kind validation the simulator applies to writes.

use super::SimError;
use super::store::{Row, SimState};
use crate::fixtures::ROOT_TENANT;
use crate::resources::ResourceKind;
use serde_json::{Map, Value, json};

/// Roles a user may be assigned.
pub(crate) const ROLES: &[&str] = &["admin", "operations", "read-only", "portal", "disallowed"];

/// A validated write body, ready to be stored.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub value: Map<String, Value>,
    /// A user's new local password; never stored on the row.
    pub password: Option<String>,
}

fn text<'a>(body: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn blank(field: &str) -> String {
    format!("{}: cannot be blank", field)
}

fn valid_name_chars(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Checks `body` for a create (`current` is `None`) or for an update of
/// the row at `current`, and fills in joined fields.
pub(crate) fn prepare(
    state: &SimState,
    kind: ResourceKind,
    mut body: Map<String, Value>,
    current: Option<usize>,
) -> Result<Prepared, SimError> {
    body.remove("id");
    body.remove("lastUpdated");

    let key_field = kind.key_field();
    let mut errors = Vec::new();
    let key = text(&body, key_field).map(str::to_string);
    match &key {
        None => errors.push(blank(key_field)),
        Some(key) => {
            let table = state.table(kind);
            if let Some(existing) = table.position_by_key(key_field, key) {
                if Some(existing) != current {
                    return Err(SimError::bad_request(format!(
                        "{} {} '{}' already exists",
                        kind.singular(),
                        key_field,
                        key
                    )));
                }
            }
        }
    }

    let mut password = None;
    match kind {
        ResourceKind::Divisions | ResourceKind::ServiceCategories => {}
        ResourceKind::Regions => match body.get("division").and_then(Value::as_i64) {
            None => errors.push(blank("division")),
            Some(division) if division < 0 => errors.push("division: must be no less than 0".to_string()),
            Some(division) => match state.table(ResourceKind::Divisions).find_by_id(division) {
                Some(parent) => {
                    let name = parent.str_field("name").unwrap_or_default().to_string();
                    body.insert("divisionName".to_string(), json!(name));
                }
                None => {
                    return Err(SimError::bad_request(format!(
                        "no division exists by id {}",
                        division
                    )));
                }
            },
        },
        ResourceKind::Coordinates => {
            if let Some(name) = &key {
                if !valid_name_chars(name) {
                    errors.push(
                        "name: must consist of only alphanumeric, dash, dot, or underscore characters"
                            .to_string(),
                    );
                }
            }
            match body.get("latitude").and_then(Value::as_f64) {
                Some(lat) if (-90.0..=90.0).contains(&lat) => {}
                _ => errors.push("latitude: Must be a floating point number within the range +-90".to_string()),
            }
            match body.get("longitude").and_then(Value::as_f64) {
                Some(long) if (-180.0..=180.0).contains(&long) => {}
                _ => errors
                    .push("longitude: Must be a floating point number within the range +-180".to_string()),
            }
        }
        ResourceKind::Cdns => {
            if text(&body, "domainName").is_none() {
                errors.push(blank("domainName"));
            }
            if !body.contains_key("dnssecEnabled") {
                body.insert("dnssecEnabled".to_string(), json!(false));
            }
        }
        ResourceKind::Profiles => {
            if key.as_deref().is_some_and(|name| name.contains(' ')) {
                errors.push("name: cannot contain spaces".to_string());
            }
            for field in ["description", "type"] {
                if text(&body, field).is_none() {
                    errors.push(blank(field));
                }
            }
            if !body.contains_key("routingDisabled") {
                body.insert("routingDisabled".to_string(), json!(false));
            }
            match body.get("cdn").and_then(Value::as_i64) {
                None => errors.push(blank("cdn")),
                Some(cdn) => match state.table(ResourceKind::Cdns).find_by_id(cdn) {
                    Some(parent) => {
                        let name = parent.str_field("name").unwrap_or_default().to_string();
                        body.insert("cdnName".to_string(), json!(name));
                    }
                    None => {
                        return Err(SimError::bad_request(format!("no cdn exists by id {}", cdn)));
                    }
                },
            }
        }
        ResourceKind::Tenants => {
            if !body.contains_key("active") {
                body.insert("active".to_string(), json!(false));
            }
            match body.get("parentId").and_then(Value::as_i64) {
                None => errors.push(blank("parentId")),
                Some(parent_id) => {
                    let tenants = state.table(ResourceKind::Tenants);
                    match tenants.find_by_id(parent_id) {
                        Some(parent) => {
                            let own_id = current.and_then(|index| tenants.rows[index].id());
                            if own_id == Some(parent_id) {
                                errors.push("parentId: a tenant cannot be its own parent".to_string());
                            }
                            let name = parent.str_field("name").unwrap_or_default().to_string();
                            body.insert("parentName".to_string(), json!(name));
                        }
                        None => {
                            return Err(SimError::bad_request(format!(
                                "no tenant exists by id {}",
                                parent_id
                            )));
                        }
                    }
                }
            }
        }
        ResourceKind::Users => {
            match text(&body, "role") {
                None => errors.push(blank("role")),
                Some(role) if !ROLES.contains(&role) => {
                    errors.push(format!("role: '{}' is not a known role", role));
                }
                Some(_) => {}
            }
            match body.get("tenantId").and_then(Value::as_i64) {
                None => errors.push(blank("tenantId")),
                Some(tenant_id) => match state.table(ResourceKind::Tenants).find_by_id(tenant_id) {
                    Some(tenant) => {
                        let name = tenant.str_field("name").unwrap_or_default().to_string();
                        body.insert("tenant".to_string(), json!(name));
                    }
                    None => {
                        return Err(SimError::bad_request(format!(
                            "no tenant exists by id {}",
                            tenant_id
                        )));
                    }
                },
            }
            password = body
                .remove("localPasswd")
                .and_then(|value| value.as_str().map(str::to_string))
                .filter(|value| !value.is_empty());
            if password.is_none() && current.is_none() {
                errors.push(blank("localPasswd"));
            }
        }
    }

    if !errors.is_empty() {
        return Err(SimError::bad_request(errors.join(", ")));
    }
    Ok(Prepared {
        value: body,
        password,
    })
}

/// Refuses deletes that would orphan other rows.
pub(crate) fn check_delete(state: &SimState, kind: ResourceKind, row: &Row) -> Result<(), SimError> {
    let id = row.id().unwrap_or_default();
    match kind {
        ResourceKind::Divisions => {
            if state.table(ResourceKind::Regions).count_where("division", id) > 0 {
                return Err(SimError::bad_request(
                    "cannot delete division because it is being used by a region",
                ));
            }
        }
        ResourceKind::Cdns => {
            if state.table(ResourceKind::Profiles).count_where("cdn", id) > 0 {
                return Err(SimError::bad_request(
                    "cannot delete cdn because it is being used by a profile",
                ));
            }
        }
        ResourceKind::Tenants => {
            if row.str_field("name") == Some(ROOT_TENANT) {
                return Err(SimError::bad_request("the root tenant cannot be deleted"));
            }
            if state.table(ResourceKind::Tenants).count_where("parentId", id) > 0 {
                return Err(SimError::bad_request(
                    "cannot delete tenant because it is the parent of other tenants",
                ));
            }
            if state.table(ResourceKind::Users).count_where("tenantId", id) > 0 {
                return Err(SimError::bad_request(
                    "cannot delete tenant because it is being used by a user",
                ));
            }
        }
        ResourceKind::Users => {
            return Err(SimError::method_not_allowed("users cannot be deleted"));
        }
        _ => {}
    }
    Ok(())
}

/// Rewrites the joined names other rows carry for the row `id` of `kind`.
pub(crate) fn propagate_rename(state: &mut SimState, kind: ResourceKind, id: i64, name: &str) {
    let joins: &[(ResourceKind, &str, &str)] = match kind {
        ResourceKind::Divisions => &[(ResourceKind::Regions, "division", "divisionName")],
        ResourceKind::Cdns => &[(ResourceKind::Profiles, "cdn", "cdnName")],
        ResourceKind::Tenants => &[
            (ResourceKind::Tenants, "parentId", "parentName"),
            (ResourceKind::Users, "tenantId", "tenant"),
        ],
        _ => &[],
    };
    for (dependent, id_field, name_field) in joins {
        for row in state.table_mut(*dependent).rows.iter_mut() {
            if row.i64_field(id_field) == Some(id) {
                row.value.insert(name_field.to_string(), json!(name));
            }
        }
    }
}
