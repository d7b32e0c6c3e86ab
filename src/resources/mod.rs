//! Traffic Ops resource kinds exercised by the harness.
//!
//! Each entity type implements [`Resource`], which ties it to its
//! [`ResourceKind`] (API path, natural-key query parameter, dependencies)
//! and to its slice of the fixture set.

mod entities;

pub use entities::{Cdn, Coordinate, Division, Profile, Region, ServiceCategory, Tenant, User};

use crate::client::Endpoint;
use crate::fixtures::TestData;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// The resource kinds the harness knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Divisions,
    Regions,
    Coordinates,
    Cdns,
    Profiles,
    ServiceCategories,
    Tenants,
    Users,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Divisions,
        ResourceKind::Regions,
        ResourceKind::Coordinates,
        ResourceKind::Cdns,
        ResourceKind::Profiles,
        ResourceKind::ServiceCategories,
        ResourceKind::Tenants,
        ResourceKind::Users,
    ];

    /// API path relative to `/api/<version>`.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Divisions => "/divisions",
            ResourceKind::Regions => "/regions",
            ResourceKind::Coordinates => "/coordinates",
            ResourceKind::Cdns => "/cdns",
            ResourceKind::Profiles => "/profiles",
            ResourceKind::ServiceCategories => "/service_categories",
            ResourceKind::Tenants => "/tenants",
            ResourceKind::Users => "/users",
        }
    }

    /// Lowercase singular noun used in server alerts.
    pub fn singular(&self) -> &'static str {
        match self {
            ResourceKind::Divisions => "division",
            ResourceKind::Regions => "region",
            ResourceKind::Coordinates => "coordinate",
            ResourceKind::Cdns => "cdn",
            ResourceKind::Profiles => "profile",
            ResourceKind::ServiceCategories => "service category",
            ResourceKind::Tenants => "tenant",
            ResourceKind::Users => "user",
        }
    }

    /// Query parameter and JSON field holding the natural key.
    pub fn key_field(&self) -> &'static str {
        match self {
            ResourceKind::Users => "username",
            _ => "name",
        }
    }

    /// Kinds whose fixtures must exist before this kind's are created.
    pub fn depends_on(&self) -> &'static [ResourceKind] {
        match self {
            ResourceKind::Regions => &[ResourceKind::Divisions],
            ResourceKind::Profiles => &[ResourceKind::Cdns],
            ResourceKind::Users => &[ResourceKind::Tenants],
            _ => &[],
        }
    }

    /// Looks a kind up by its API path, with or without the leading slash.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|kind| kind.path().trim_start_matches('/') == trimmed)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

/// A typed Traffic Ops entity.
pub trait Resource:
    Serialize + DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static
{
    const KIND: ResourceKind;

    /// Server-assigned id; `None` before creation or for kinds keyed by name.
    fn id(&self) -> Option<i64>;

    /// The natural key tests look entities up by.
    fn name(&self) -> &str;

    fn last_updated(&self) -> Option<DateTime<Utc>>;

    /// This kind's slice of the fixture set.
    fn fixtures(data: &TestData) -> &[Self];

    /// How mutating calls address this entity.
    fn endpoint(&self) -> Option<Endpoint> {
        self.id().map(Endpoint::Id)
    }
}
