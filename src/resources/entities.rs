use super::{Resource, ResourceKind};
use crate::client::Endpoint;
use crate::fixtures::TestData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic division; the parent of regions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Division {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Resource for Division {
    const KIND: ResourceKind = ResourceKind::Divisions;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.divisions
    }
}

/// A region within a division.
///
/// `division` is the server id of the parent; fixtures name the parent by
/// `divisionName` and leave the id to be resolved at creation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub division: i64,
    #[serde(default)]
    pub division_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Region {
    pub fn new(name: impl Into<String>, division_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            division_name: division_name.into(),
            ..Self::default()
        }
    }
}

impl Resource for Region {
    const KIND: ResourceKind = ResourceKind::Regions;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.regions
    }
}

/// A named latitude/longitude pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            ..Self::default()
        }
    }
}

impl Resource for Coordinate {
    const KIND: ResourceKind = ResourceKind::Coordinates;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.coordinates
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cdn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub dnssec_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Cdn {
    pub fn new(name: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain_name: domain_name.into(),
            ..Self::default()
        }
    }
}

impl Resource for Cdn {
    const KIND: ResourceKind = ResourceKind::Cdns;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.cdns
    }
}

/// A named parameter set bound to one CDN.
///
/// Like regions, fixtures name the parent by `cdnName` and leave `cdn` to
/// be resolved at creation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cdn: i64,
    #[serde(default)]
    pub cdn_name: String,
    #[serde(rename = "type", default)]
    pub profile_type: String,
    #[serde(default)]
    pub routing_disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(name: impl Into<String>, cdn_name: impl Into<String>, profile_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("{} description", name),
            name,
            cdn_name: cdn_name.into(),
            profile_type: profile_type.into(),
            ..Self::default()
        }
    }
}

impl Resource for Profile {
    const KIND: ResourceKind = ResourceKind::Profiles;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.profiles
    }
}

/// Service categories have no numeric id; they are addressed by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCategory {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ServiceCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_updated: None,
        }
    }
}

impl Resource for ServiceCategory {
    const KIND: ResourceKind = ResourceKind::ServiceCategories;

    fn id(&self) -> Option<i64> {
        None
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.service_categories
    }

    fn endpoint(&self) -> Option<Endpoint> {
        Some(Endpoint::Name(self.name.clone()))
    }
}

/// A node in the tenancy tree. Fixtures name the parent by `parentName`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, parent_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            parent_name: Some(parent_name.into()),
            ..Self::default()
        }
    }
}

impl Resource for Tenant {
    const KIND: ResourceKind = ResourceKind::Tenants;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.tenants
    }
}

/// A Traffic Ops user. `localPasswd` is only ever sent, never returned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_passwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: impl Into<String>, role: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
            tenant: Some(tenant.into()),
            ..Self::default()
        }
    }
}

impl Resource for User {
    const KIND: ResourceKind = ResourceKind::Users;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        &self.username
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn fixtures(data: &TestData) -> &[Self] {
        &data.users
    }
}
