//! Tables backing the simulator.

use crate::resources::ResourceKind;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// One stored entity. `value` is the wire object, including `id` (when the
/// kind has one) and `lastUpdated`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Row {
    pub value: Map<String, Value>,
    pub last_updated: DateTime<Utc>,
}

impl Row {
    pub fn id(&self) -> Option<i64> {
        self.value.get("id").and_then(Value::as_i64)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.value.get(field).and_then(Value::as_str)
    }

    pub fn i64_field(&self, field: &str) -> Option<i64> {
        self.value.get(field).and_then(Value::as_i64)
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
        self.value.insert("lastUpdated".to_string(), json!(at));
    }
}

#[derive(Debug, Default)]
pub(crate) struct Table {
    pub rows: Vec<Row>,
    /// When a row was last removed; list freshness counts deletes too.
    pub last_deleted: Option<DateTime<Utc>>,
    next_id: i64,
}

impl Table {
    /// Stores `value`, assigning the next id when `with_id` is set.
    pub fn insert(&mut self, mut value: Map<String, Value>, with_id: bool, at: DateTime<Utc>) -> &Row {
        if with_id {
            self.next_id += 1;
            value.insert("id".to_string(), json!(self.next_id));
        }
        let mut row = Row {
            value,
            last_updated: at,
        };
        row.touch(at);
        self.rows.push(row);
        let last = self.rows.len() - 1;
        &self.rows[last]
    }

    /// Replaces the row at `index`, keeping its id.
    pub fn replace(&mut self, index: usize, mut value: Map<String, Value>, at: DateTime<Utc>) -> &Row {
        let row = &mut self.rows[index];
        if let Some(id) = row.value.get("id").cloned() {
            value.insert("id".to_string(), id);
        }
        row.value = value;
        row.touch(at);
        row
    }

    pub fn remove(&mut self, index: usize, at: DateTime<Utc>) -> Row {
        self.last_deleted = Some(at);
        self.rows.remove(index)
    }

    /// The newest change among `rows` or any delete from this table.
    pub fn latest_change<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> Option<DateTime<Utc>> {
        rows.into_iter()
            .map(|row| row.last_updated)
            .chain(self.last_deleted)
            .max()
    }

    pub fn position_by_id(&self, id: i64) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == Some(id))
    }

    pub fn position_by_key(&self, field: &str, key: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.str_field(field) == Some(key))
    }

    pub fn find_by_id(&self, id: i64) -> Option<&Row> {
        self.position_by_id(id).map(|index| &self.rows[index])
    }

    pub fn count_where(&self, field: &str, id: i64) -> usize {
        self.rows
            .iter()
            .filter(|row| row.i64_field(field) == Some(id))
            .count()
    }
}

/// Everything the simulator knows.
#[derive(Debug)]
pub(crate) struct SimState {
    tables: BTreeMap<ResourceKind, Table>,
    /// Username → local password.
    pub passwords: HashMap<String, String>,
    /// Session cookies issued by `/user/login` and not yet expired.
    pub tokens: HashSet<Uuid>,
}

impl SimState {
    /// The state of a fresh install: tenant `root` and the admin user.
    pub fn seeded(admin_user: &str, admin_password: &str) -> Self {
        let mut tables: BTreeMap<ResourceKind, Table> = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, Table::default()))
            .collect();
        let now = Utc::now();

        if let Some(tenants) = tables.get_mut(&ResourceKind::Tenants) {
            let root = json!({"name": "root", "active": true});
            if let Value::Object(map) = root {
                tenants.insert(map, true, now);
            }
        }
        if let Some(users) = tables.get_mut(&ResourceKind::Users) {
            let admin = json!({
                "username": admin_user,
                "fullName": "Administrator",
                "role": "admin",
                "tenantId": 1,
                "tenant": "root"
            });
            if let Value::Object(map) = admin {
                users.insert(map, true, now);
            }
        }

        let mut passwords = HashMap::new();
        passwords.insert(admin_user.to_string(), admin_password.to_string());

        Self {
            tables,
            passwords,
            tokens: HashSet::new(),
        }
    }

    pub fn table(&self, kind: ResourceKind) -> &Table {
        static EMPTY: Table = Table {
            rows: Vec::new(),
            last_deleted: None,
            next_id: 0,
        };
        self.tables.get(&kind).unwrap_or(&EMPTY)
    }

    pub fn table_mut(&mut self, kind: ResourceKind) -> &mut Table {
        self.tables.entry(kind).or_default()
    }
}
