//! The explicitly constructed state every test runs against.
//!
//! A [`TestContext`] owns the logged-in session, the fixture snapshot, and
//! the optional administrative back-door. Tests receive it by reference;
//! there is no process-wide session or fixture set.

use crate::backdoor::AdminBackdoor;
use crate::case::MethodTests;
use crate::client::{Credentials, HttpTransport, ResourceApi, Session};
use crate::config::{ConfigError, HarnessConfig};
use crate::dispatch;
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::{self, ApiFixtures, TestData};
use crate::report::SuiteReport;
use crate::resources::{Resource, ResourceKind};
use log::info;
use std::future::Future;
use std::sync::Arc;

pub struct TestContext {
    session: Session,
    data: TestData,
    config: Option<HarnessConfig>,
    backdoor: Option<Arc<dyn AdminBackdoor>>,
}

impl TestContext {
    pub fn new(session: Session, data: TestData) -> Self {
        Self {
            session,
            data,
            config: None,
            backdoor: None,
        }
    }

    pub fn with_backdoor(mut self, backdoor: Arc<dyn AdminBackdoor>) -> Self {
        self.backdoor = Some(backdoor);
        self
    }

    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Logs in to the configured Traffic Ops and loads its fixture file.
    ///
    /// With the `postgres` feature and a configured `trafficOpsDB`, also
    /// connects the database back-door.
    pub async fn connect(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let base = config.base_url()?;
        let admin = config
            .admin_user()
            .ok_or_else(|| ConfigError::ValidationError {
                message: "trafficOps.users.admin must name the admin user".to_string(),
            })?
            .to_string();

        let transport = HttpTransport::new(
            base,
            config.timeout(),
            config.traffic_ops.insecure,
            &config.traffic_ops.user_agent,
        )?;
        let credentials = Credentials::new(admin, config.traffic_ops.password.clone());
        let (session, _) = Session::login(Arc::new(transport), credentials, config.api_versions()).await?;

        let data = TestData::load(&config.fixtures)?;
        info!(
            "Loaded fixtures from {} for {}",
            config.fixtures, config.traffic_ops.url
        );

        #[cfg(feature = "postgres")]
        let backdoor: Option<Arc<dyn AdminBackdoor>> = if config.traffic_ops_db.is_configured() {
            let pg = crate::backdoor::PgBackdoor::connect(&config.traffic_ops_db).await?;
            Some(Arc::new(pg))
        } else {
            None
        };
        #[cfg(not(feature = "postgres"))]
        let backdoor: Option<Arc<dyn AdminBackdoor>> = None;

        Ok(Self {
            session,
            data,
            config: Some(config),
            backdoor,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn data(&self) -> &TestData {
        &self.data
    }

    pub fn config(&self) -> Option<&HarnessConfig> {
        self.config.as_ref()
    }

    pub fn backdoor(&self) -> Option<&dyn AdminBackdoor> {
        self.backdoor.as_deref()
    }

    /// The client calls for resource kind `R`.
    pub fn api<R: Resource>(&self) -> &dyn ResourceApi<R> {
        &self.session
    }

    pub fn fixtures<R: Resource>(&self) -> &[R] {
        R::fixtures(&self.data)
    }

    /// The fixtures of `R`, or a fatal error when fewer than `minimum` are
    /// loaded.
    pub fn require_fixtures<R: Resource>(&self, minimum: usize) -> HarnessResult<&[R]> {
        let fixtures = self.fixtures::<R>();
        if fixtures.len() < minimum {
            return Err(HarnessError::missing_fixtures(format!(
                "Need at least {} {} fixtures, found {}",
                minimum,
                R::KIND,
                fixtures.len()
            )));
        }
        Ok(fixtures)
    }

    /// Server id of the single `R` named `name`.
    pub async fn id_of<R: Resource>(&self, name: &str) -> HarnessResult<i64> {
        fixtures::lookup_id::<R>(self.api::<R>(), name).await
    }

    pub async fn run<R: Resource>(&self, tests: &MethodTests<R>) -> SuiteReport {
        dispatch::run(self.api::<R>(), tests).await
    }

    /// The API-driven lifecycle for this context's fixtures.
    pub fn lifecycle(&self) -> ApiFixtures<'_> {
        ApiFixtures::new(&self.session, &self.data, self.backdoor())
    }

    /// Runs `body` with the fixtures of `kinds` in place.
    pub async fn with_objs<F, T>(&self, kinds: &[ResourceKind], body: F) -> HarnessResult<T>
    where
        F: Future<Output = T>,
    {
        let lifecycle = self.lifecycle();
        fixtures::with_objs(&lifecycle, kinds, body).await
    }
}
