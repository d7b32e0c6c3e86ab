//! Harness configuration.
//!
//! The file format is the JSON shape of `traffic-ops-test.conf`:
//!
//! ```json
//! {
//!   "default": { "session": { "timeoutInSecs": 60 } },
//!   "trafficOps": {
//!     "URL": "https://localhost:8443",
//!     "password": "twelve",
//!     "insecure": true,
//!     "users": { "admin": "admin" }
//!   },
//!   "trafficOpsDB": {
//!     "dbname": "to_test", "hostname": "localhost", "port": "5432",
//!     "user": "traffic_ops", "password": "twelve", "ssl": false, "type": "Pg"
//!   },
//!   "fixtures": "tc-fixtures.json"
//! }
//! ```
//!
//! Any field can be overridden from the environment (`TO_URL`,
//! `TO_USER_ADMIN`, `TODB_HOSTNAME`, ...); see
//! [`HarnessConfig::apply_overrides`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "traffic-ops-harness/0.1";
pub const DEFAULT_FIXTURES: &str = "tc-fixtures.json";
pub const ADMIN_ROLE: &str = "admin";

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },

    #[error("Invalid value '{value}' for {name}: expected {expected}")]
    InvalidOverride {
        name: String,
        value: String,
        expected: String,
    },
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_fixtures() -> String {
    DEFAULT_FIXTURES.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "timeoutInSecs", default = "default_timeout")]
    pub timeout_in_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_in_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultConfig {
    #[serde(default)]
    pub session: SessionConfig,
}

/// Where Traffic Ops lives and who to log in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficOpsConfig {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(default)]
    pub password: String,
    /// Role name → username.
    #[serde(default)]
    pub users: BTreeMap<String, String>,
    #[serde(default)]
    pub insecure: bool,
    /// Pins a single API version instead of negotiating.
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(rename = "userAgent", default = "default_user_agent")]
    pub user_agent: String,
}

/// The Traffic Ops database, used only by the administrative back-door.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default)]
    pub dbname: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub port: String,
    #[serde(rename = "type", default)]
    pub db_type: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub user: String,
}

impl DbConfig {
    pub fn is_configured(&self) -> bool {
        !self.hostname.is_empty() && !self.dbname.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub default: DefaultConfig,
    #[serde(rename = "trafficOps")]
    pub traffic_ops: TrafficOpsConfig,
    #[serde(rename = "trafficOpsDB", default)]
    pub traffic_ops_db: DbConfig,
    #[serde(default = "default_fixtures")]
    pub fixtures: String,
}

impl HarnessConfig {
    /// A minimal configuration logging in as `admin_user`.
    pub fn new(url: impl Into<String>, admin_user: impl Into<String>, password: impl Into<String>) -> Self {
        let mut users = BTreeMap::new();
        users.insert(ADMIN_ROLE.to_string(), admin_user.into());
        Self {
            default: DefaultConfig::default(),
            traffic_ops: TrafficOpsConfig {
                url: url.into(),
                password: password.into(),
                users,
                insecure: false,
                api_version: None,
                user_agent: default_user_agent(),
            },
            traffic_ops_db: DbConfig::default(),
            fixtures: default_fixtures(),
        }
    }

    pub fn with_fixtures(mut self, path: impl Into<String>) -> Self {
        self.fixtures = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default.session.timeout_in_secs = timeout.as_secs();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.traffic_ops.api_version = Some(version.into());
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Loads `path`, applies environment overrides, and validates.
    pub fn from_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `lookup`, which maps variable names to values.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `TO_URL` | `trafficOps.URL` |
    /// | `TO_USER_ADMIN` | `trafficOps.users.admin` |
    /// | `TO_USER_PASSWORD` | `trafficOps.password` |
    /// | `TO_INSECURE` | `trafficOps.insecure` |
    /// | `TO_API_VERSION` | `trafficOps.apiVersion` |
    /// | `TO_FIXTURES` | `fixtures` |
    /// | `TODB_HOSTNAME`, `TODB_PORT`, `TODB_NAME`, `TODB_USER`, `TODB_PASSWORD`, `TODB_SSL` | `trafficOpsDB.*` |
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let to = &mut self.traffic_ops;
        if let Some(url) = lookup("TO_URL") {
            to.url = url;
        }
        if let Some(admin) = lookup("TO_USER_ADMIN") {
            to.users.insert(ADMIN_ROLE.to_string(), admin);
        }
        if let Some(password) = lookup("TO_USER_PASSWORD") {
            to.password = password;
        }
        if let Some(insecure) = lookup("TO_INSECURE") {
            to.insecure = parse_bool("TO_INSECURE", &insecure)?;
        }
        if let Some(version) = lookup("TO_API_VERSION") {
            to.api_version = Some(version);
        }
        if let Some(fixtures) = lookup("TO_FIXTURES") {
            self.fixtures = fixtures;
        }

        let db = &mut self.traffic_ops_db;
        if let Some(hostname) = lookup("TODB_HOSTNAME") {
            db.hostname = hostname;
        }
        if let Some(port) = lookup("TODB_PORT") {
            if port.parse::<u16>().is_err() {
                return Err(ConfigError::InvalidOverride {
                    name: "TODB_PORT".to_string(),
                    value: port,
                    expected: "a port number".to_string(),
                });
            }
            db.port = port;
        }
        if let Some(name) = lookup("TODB_NAME") {
            db.dbname = name;
        }
        if let Some(user) = lookup("TODB_USER") {
            db.user = user;
        }
        if let Some(password) = lookup("TODB_PASSWORD") {
            db.password = password;
        }
        if let Some(ssl) = lookup("TODB_SSL") {
            db.ssl = parse_bool("TODB_SSL", &ssl)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if self.admin_user().is_none_or(str::is_empty) {
            return Err(ConfigError::ValidationError {
                message: "trafficOps.users.admin must name the admin user".to_string(),
            });
        }

        if self.default.session.timeout_in_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "default.session.timeoutInSecs must be greater than 0".to_string(),
            });
        }

        if self.fixtures.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "fixtures must name a fixture file".to_string(),
            });
        }

        if self.traffic_ops_db.is_configured() && self.traffic_ops_db.user.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "trafficOpsDB.user is required when a database is configured".to_string(),
            });
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.traffic_ops.url).map_err(|e| ConfigError::ValidationError {
            message: format!("trafficOps.URL '{}' is not a valid URL: {}", self.traffic_ops.url, e),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError {
                message: format!("trafficOps.URL '{}' must be http or https", self.traffic_ops.url),
            });
        }
        Ok(url)
    }

    pub fn admin_user(&self) -> Option<&str> {
        self.traffic_ops.users.get(ADMIN_ROLE).map(String::as_str)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.default.session.timeout_in_secs)
    }

    /// Versions to negotiate, newest first; empty means the client default.
    pub fn api_versions(&self) -> Vec<String> {
        self.traffic_ops.api_version.iter().cloned().collect()
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            name: name.to_string(),
            value: value.to_string(),
            expected: "a boolean".to_string(),
        }),
    }
}
