//! Error types for the harness.
//!
//! Two families live here. [`ClientError`] is what a single API call can
//! fail with and is what expectations inspect. [`HarnessError`] covers
//! everything around the calls: configuration, fixture loading, fixture
//! setup and teardown, and the administrative back-door.

use crate::alerts::Alerts;
use crate::backdoor::BackdoorError;
use crate::client::ReqInf;
use crate::config::ConfigError;
use reqwest::{Method, StatusCode};

/// Main error type for harness operations outside of individual checks.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A client call made by the harness itself failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The loaded fixture set does not hold what a test needs
    #[error("Missing fixtures: {message}")]
    MissingFixtures { message: String },

    /// Reading a file failed
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Administrative back-door errors
    #[error("Back-door error: {0}")]
    Backdoor(#[from] BackdoorError),

    /// Creating the fixtures of one kind failed
    #[error("Setting up {kind} fixtures failed: {message}")]
    FixtureSetup { kind: String, message: String },

    /// One or more fixture kinds could not be torn down
    #[error("Tearing down fixtures failed: {}", .0.join("; "))]
    FixtureTeardown(Vec<String>),

    /// A natural-key lookup did not find exactly one entity
    #[error("Looking up {kind} '{name}' failed: {message}")]
    Lookup {
        kind: String,
        name: String,
        message: String,
    },
}

impl HarnessError {
    pub fn missing_fixtures(message: impl Into<String>) -> Self {
        Self::MissingFixtures {
            message: message.into(),
        }
    }

    pub fn lookup(kind: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            kind: kind.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Everything a single API call can fail with.
///
/// `Status` is the ordinary "server said no" case: anything other than a
/// 2xx or 304. It carries the decoded alerts so checkers can look at both
/// error channels from the error alone.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error status
    #[error("{status} - Error requesting Traffic Ops {method} {path}: {body}")]
    Status {
        status: StatusCode,
        method: Method,
        path: String,
        body: String,
        info: ReqInf,
        alerts: Alerts,
    },

    /// No response came back: connection, TLS or timeout failures
    #[error("Error requesting Traffic Ops {path}: {message}")]
    Transport { path: String, message: String },

    /// A success response whose body did not decode as the expected type
    #[error("Decoding response from {path}: {source}")]
    Decode {
        path: String,
        info: ReqInf,
        alerts: Alerts,
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialized
    #[error("Encoding request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The request could not be built, such as a path that is not a URL
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// `/user/login` answered, but not with a successful login
    #[error("Logging in as '{user}' failed: {message}")]
    Login {
        user: String,
        message: String,
        info: ReqInf,
        alerts: Alerts,
    },
}

impl ClientError {
    pub fn transport(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Request metadata of the failed call; default when nothing came back.
    pub fn info(&self) -> ReqInf {
        match self {
            Self::Status { info, .. } | Self::Decode { info, .. } | Self::Login { info, .. } => {
                info.clone()
            }
            _ => ReqInf::default(),
        }
    }

    /// Alerts decoded from the failing response, if any.
    pub fn alerts(&self) -> Option<&Alerts> {
        match self {
            Self::Status { alerts, .. } | Self::Decode { alerts, .. } | Self::Login { alerts, .. } => {
                Some(alerts)
            }
            _ => None,
        }
    }

    /// HTTP status of the failing response, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => StatusCode::from_u16(self.info().status_code).ok(),
        }
    }
}
