//! Declarative integration-test harness for the Traffic Ops API.
//!
//! Tests describe requests and the checks their responses must pass as
//! data; the harness runs them against a logged-in session and reports
//! every failure with its method group and scenario name.
//!
//! # Core Components
//!
//! - [`Session`] - Authenticated client with API version fallback
//! - [`MethodTests`] - Table of scenarios grouped by HTTP method
//! - [`expect`] - Reusable response checks
//! - [`with_objs`] - Fixture setup and guaranteed teardown around a test body
//! - [`sim::SimulatedTrafficOps`] - In-memory server for running the harness offline
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use traffic_ops_harness::expect::{has_status, no_error, response_has_length};
//! use traffic_ops_harness::resources::{Division, ResourceKind};
//! use traffic_ops_harness::{HarnessConfig, MethodTests, TestCase, TestContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::from_env("traffic-ops-test.conf")?;
//! let ctx = TestContext::connect(config).await?;
//!
//! let tests = MethodTests::<Division>::new()
//!     .get(
//!         "OK when VALID NAME parameter",
//!         TestCase::new()
//!             .query("name", "division1")
//!             .expect(no_error())
//!             .expect(response_has_length(1)),
//!     )
//!     .get(
//!         "OK when NO PARAMETERS",
//!         TestCase::new().expect(has_status(reqwest::StatusCode::OK)),
//!     );
//!
//! let report = ctx
//!     .with_objs(&[ResourceKind::Divisions], ctx.run(&tests))
//!     .await?;
//! report.assert_passed();
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod backdoor;
pub mod case;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod expect;
pub mod fixtures;
pub mod precondition;
pub mod report;
pub mod resources;
pub mod sim;

// Re-export commonly used types for convenience
pub use alerts::{Alert, AlertLevel, Alerts};
pub use case::{EndpointId, MethodTests, TestCase};
pub use client::{Credentials, Endpoint, ReqInf, RequestOptions, ResourceApi, Session};
pub use config::{ConfigError, HarnessConfig};
pub use context::TestContext;
pub use error::{ClientError, HarnessError, HarnessResult};
pub use fixtures::{FixtureLifecycle, TestData, with_objs};
pub use report::{ScenarioReport, SuiteReport};
pub use resources::{Resource, ResourceKind};
