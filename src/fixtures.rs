//! Fixture data and the setup/teardown lifecycle around test bodies.
//!
//! [`TestData`] is the `tc-fixtures.json` document: sample entities keyed
//! by kind, without server ids. [`with_objs`] creates the requested kinds
//! in order, runs a body, and tears the kinds down in reverse order no
//! matter how the body ended.
//!
//! [`ApiFixtures`] is the lifecycle used against a live server. It creates
//! fixtures through the client, filling in parent ids by looking parents
//! up by name, and deletes only entities whose natural key matches a
//! fixture.

use crate::backdoor::{AdminBackdoor, BackdoorError};
use crate::client::{RequestOptions, ResourceApi, Session};
use crate::error::{HarnessError, HarnessResult};
use crate::resources::{
    Cdn, Coordinate, Division, Profile, Region, Resource, ResourceKind, ServiceCategory, Tenant,
    User,
};
use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;

/// Root of the tenancy tree; always present and never deleted.
pub const ROOT_TENANT: &str = "root";

/// The fixture document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestData {
    pub divisions: Vec<Division>,
    pub regions: Vec<Region>,
    pub coordinates: Vec<Coordinate>,
    pub cdns: Vec<Cdn>,
    pub profiles: Vec<Profile>,
    pub service_categories: Vec<ServiceCategory>,
    pub tenants: Vec<Tenant>,
    pub users: Vec<User>,
}

impl TestData {
    pub fn from_json_str(json: &str) -> HarnessResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Natural keys of the fixtures of `kind`, in document order.
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        fn keys<R: Resource>(items: &[R]) -> Vec<String> {
            items.iter().map(|item| item.name().to_string()).collect()
        }
        match kind {
            ResourceKind::Divisions => keys(&self.divisions),
            ResourceKind::Regions => keys(&self.regions),
            ResourceKind::Coordinates => keys(&self.coordinates),
            ResourceKind::Cdns => keys(&self.cdns),
            ResourceKind::Profiles => keys(&self.profiles),
            ResourceKind::ServiceCategories => keys(&self.service_categories),
            ResourceKind::Tenants => keys(&self.tenants),
            ResourceKind::Users => keys(&self.users),
        }
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.names(kind).len()
    }

    /// Dangling references between fixtures, one message each.
    pub fn reference_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let divisions = self.names(ResourceKind::Divisions);
        for region in &self.regions {
            if !divisions.contains(&region.division_name) {
                problems.push(format!(
                    "region '{}' names unknown division '{}'",
                    region.name, region.division_name
                ));
            }
        }

        let cdns = self.names(ResourceKind::Cdns);
        for profile in &self.profiles {
            if !cdns.contains(&profile.cdn_name) {
                problems.push(format!(
                    "profile '{}' names unknown cdn '{}'",
                    profile.name, profile.cdn_name
                ));
            }
        }

        let mut tenants = vec![ROOT_TENANT.to_string()];
        for tenant in &self.tenants {
            match &tenant.parent_name {
                Some(parent) if !tenants.contains(parent) => problems.push(format!(
                    "tenant '{}' names parent '{}', which is not defined before it",
                    tenant.name, parent
                )),
                None => problems.push(format!("tenant '{}' has no parentName", tenant.name)),
                _ => {}
            }
            tenants.push(tenant.name.clone());
        }

        for user in &self.users {
            match &user.tenant {
                Some(tenant) if !tenants.contains(tenant) => problems.push(format!(
                    "user '{}' names unknown tenant '{}'",
                    user.username, tenant
                )),
                None => problems.push(format!("user '{}' has no tenant", user.username)),
                _ => {}
            }
        }
        problems
    }
}

/// Creates and removes the fixtures of one kind at a time.
#[async_trait]
pub trait FixtureLifecycle: Send + Sync {
    async fn create(&self, kind: ResourceKind) -> HarnessResult<()>;

    async fn teardown(&self, kind: ResourceKind) -> HarnessResult<()>;
}

fn warn_on_order(kinds: &[ResourceKind]) {
    for (index, kind) in kinds.iter().enumerate() {
        for dependency in kind.depends_on() {
            if !kinds[..index].contains(dependency) {
                warn!(
                    "{} fixtures depend on {}, which are not set up before them",
                    kind, dependency
                );
            }
        }
    }
}

async fn teardown_all<L>(lifecycle: &L, kinds: &[ResourceKind]) -> Vec<String>
where
    L: FixtureLifecycle + ?Sized,
{
    let mut errors = Vec::new();
    for kind in kinds.iter().rev() {
        info!("Tearing down {} fixtures", kind);
        if let Err(e) = lifecycle.teardown(*kind).await {
            warn!("Tearing down {} fixtures failed: {}", kind, e);
            errors.push(format!("{}: {}", kind, e));
        }
    }
    errors
}

/// Sets up `kinds` in order, runs `body`, then tears down in reverse.
///
/// Teardown covers every kind whose setup was attempted, including one
/// whose setup failed part-way. A panic in `body` is resumed after
/// teardown. When setup fails the body does not run and the setup error
/// is returned; otherwise teardown failures are returned as
/// [`HarnessError::FixtureTeardown`].
pub async fn with_objs<L, F, T>(lifecycle: &L, kinds: &[ResourceKind], body: F) -> HarnessResult<T>
where
    L: FixtureLifecycle + ?Sized,
    F: Future<Output = T>,
{
    warn_on_order(kinds);

    let mut attempted = Vec::with_capacity(kinds.len());
    for kind in kinds {
        info!("Creating {} fixtures", kind);
        attempted.push(*kind);
        if let Err(e) = lifecycle.create(*kind).await {
            warn!("Creating {} fixtures failed: {}", kind, e);
            let errors = teardown_all(lifecycle, &attempted).await;
            if !errors.is_empty() {
                warn!("Teardown after failed setup also failed: {}", errors.join("; "));
            }
            return Err(e);
        }
    }

    let outcome = AssertUnwindSafe(body).catch_unwind().await;
    let errors = teardown_all(lifecycle, &attempted).await;

    match outcome {
        Err(panic) => {
            if !errors.is_empty() {
                warn!("Teardown after panic failed: {}", errors.join("; "));
            }
            std::panic::resume_unwind(panic)
        }
        Ok(value) if errors.is_empty() => Ok(value),
        Ok(_) => Err(HarnessError::FixtureTeardown(errors)),
    }
}

/// Fixture lifecycle driven through the Traffic Ops API.
pub struct ApiFixtures<'a> {
    session: &'a Session,
    data: &'a TestData,
    backdoor: Option<&'a dyn AdminBackdoor>,
}

impl<'a> ApiFixtures<'a> {
    pub fn new(session: &'a Session, data: &'a TestData, backdoor: Option<&'a dyn AdminBackdoor>) -> Self {
        Self {
            session,
            data,
            backdoor,
        }
    }

    /// Server id of the single `R` whose natural key is `name`.
    pub async fn id_of<R: Resource>(&self, name: &str) -> HarnessResult<i64> {
        lookup_id::<R>(self.session, name).await
    }

    async fn create_each<R: Resource>(&self, items: Vec<R>) -> HarnessResult<()> {
        let mut failures = Vec::new();
        for item in items {
            match ResourceApi::<R>::create(self.session, &item, &RequestOptions::new()).await {
                Ok(_) => debug!("Created {} '{}'", R::KIND.singular(), item.name()),
                Err(e) => failures.push(format!("'{}': {}", item.name(), e)),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::FixtureSetup {
                kind: R::KIND.to_string(),
                message: failures.join("; "),
            })
        }
    }

    async fn create_regions(&self) -> HarnessResult<()> {
        let mut regions = Vec::with_capacity(self.data.regions.len());
        for region in &self.data.regions {
            let mut region = region.clone();
            region.division = self.id_of::<Division>(&region.division_name).await?;
            regions.push(region);
        }
        self.create_each(regions).await
    }

    async fn create_profiles(&self) -> HarnessResult<()> {
        let mut profiles = Vec::with_capacity(self.data.profiles.len());
        for profile in &self.data.profiles {
            let mut profile = profile.clone();
            profile.cdn = self.id_of::<Cdn>(&profile.cdn_name).await?;
            profiles.push(profile);
        }
        self.create_each(profiles).await
    }

    /// Tenants are created in document order, so parents come first.
    async fn create_tenants(&self) -> HarnessResult<()> {
        for tenant in &self.data.tenants {
            let mut tenant = tenant.clone();
            let parent = tenant.parent_name.clone().unwrap_or_else(|| ROOT_TENANT.to_string());
            tenant.parent_id = Some(self.id_of::<Tenant>(&parent).await?);
            self.create_each(vec![tenant]).await?;
        }
        Ok(())
    }

    async fn create_users(&self) -> HarnessResult<()> {
        let mut users = Vec::with_capacity(self.data.users.len());
        for user in &self.data.users {
            let mut user = user.clone();
            if let Some(tenant) = &user.tenant {
                user.tenant_id = Some(self.id_of::<Tenant>(tenant).await?);
            }
            users.push(user);
        }
        self.create_each(users).await
    }

    /// Deletes every listed `R` whose key is in `names`, in the order of
    /// `names`, then checks each is gone.
    async fn delete_named<R: Resource>(&self, names: &[String]) -> HarnessResult<()> {
        let existing = ResourceApi::<R>::list(self.session, &RequestOptions::new())
            .await?
            .response
            .unwrap_or_default();

        let mut failures = Vec::new();
        for name in names {
            let Some(item) = existing.iter().find(|item| item.name() == name) else {
                continue;
            };
            let Some(endpoint) = item.endpoint() else {
                failures.push(format!("'{}' has no id", name));
                continue;
            };
            if let Err(e) = ResourceApi::<R>::delete(self.session, &endpoint, &RequestOptions::new()).await {
                failures.push(format!("cannot delete '{}': {}", name, e));
            }
        }

        for name in names {
            let opts = RequestOptions::new().with_query(R::KIND.key_field(), name);
            match ResourceApi::<R>::list(self.session, &opts).await {
                Ok(reply) => {
                    let remaining = reply.response.map_or(0, |r| r.len());
                    if remaining > 0 {
                        failures.push(format!(
                            "expected {} '{}' to be deleted, but {} remain",
                            R::KIND.singular(),
                            name,
                            remaining
                        ));
                    }
                }
                Err(e) => failures.push(format!("cannot verify '{}' was deleted: {}", name, e)),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::FixtureTeardown(failures))
        }
    }

    async fn delete_users(&self) -> HarnessResult<()> {
        let names = self.data.names(ResourceKind::Users);
        if names.is_empty() {
            return Ok(());
        }
        let backdoor = self.backdoor.ok_or(BackdoorError::NotConfigured)?;
        backdoor.force_delete_users(&names).await?;
        Ok(())
    }
}

/// The single `R` whose natural key is `name`.
pub async fn find_one<R: Resource>(api: &dyn ResourceApi<R>, name: &str) -> HarnessResult<R> {
    let opts = RequestOptions::new().with_query(R::KIND.key_field(), name);
    let mut found = api.list(&opts).await?.response.unwrap_or_default();
    if found.len() != 1 {
        return Err(HarnessError::lookup(
            R::KIND.singular(),
            name,
            format!(
                "Expected exactly one {} named '{}', found: {}",
                R::KIND.singular(),
                name,
                found.len()
            ),
        ));
    }
    Ok(found.remove(0))
}

/// Server id of the single `R` whose natural key is `name`.
pub async fn lookup_id<R: Resource>(api: &dyn ResourceApi<R>, name: &str) -> HarnessResult<i64> {
    find_one(api, name)
        .await?
        .id()
        .ok_or_else(|| HarnessError::lookup(R::KIND.singular(), name, "entity has no id"))
}

#[async_trait]
impl FixtureLifecycle for ApiFixtures<'_> {
    async fn create(&self, kind: ResourceKind) -> HarnessResult<()> {
        match kind {
            ResourceKind::Divisions => self.create_each(self.data.divisions.clone()).await,
            ResourceKind::Regions => self.create_regions().await,
            ResourceKind::Coordinates => self.create_each(self.data.coordinates.clone()).await,
            ResourceKind::Cdns => self.create_each(self.data.cdns.clone()).await,
            ResourceKind::Profiles => self.create_profiles().await,
            ResourceKind::ServiceCategories => {
                self.create_each(self.data.service_categories.clone()).await
            }
            ResourceKind::Tenants => self.create_tenants().await,
            ResourceKind::Users => self.create_users().await,
        }
    }

    async fn teardown(&self, kind: ResourceKind) -> HarnessResult<()> {
        let names = self.data.names(kind);
        match kind {
            ResourceKind::Divisions => self.delete_named::<Division>(&names).await,
            ResourceKind::Regions => self.delete_named::<Region>(&names).await,
            ResourceKind::Coordinates => self.delete_named::<Coordinate>(&names).await,
            ResourceKind::Cdns => self.delete_named::<Cdn>(&names).await,
            ResourceKind::Profiles => self.delete_named::<Profile>(&names).await,
            ResourceKind::ServiceCategories => self.delete_named::<ServiceCategory>(&names).await,
            ResourceKind::Tenants => {
                let children_first: Vec<String> = names
                    .into_iter()
                    .rev()
                    .filter(|name| name != ROOT_TENANT)
                    .collect();
                self.delete_named::<Tenant>(&children_first).await
            }
            ResourceKind::Users => self.delete_users().await,
        }
    }
}
