//! Traffic Ops client contract.
//!
//! The harness talks to Traffic Ops through [`Session`], which owns a
//! [`Transport`], a login, and the list of API versions to try. Every call
//! returns a [`Reply`] holding the typed payload, the alerts envelope, and
//! the request metadata ([`ReqInf`]), or a [`ClientError`](crate::ClientError)
//! that carries the same metadata.
//!
//! Test tables do not use `Session` directly; they go through the
//! object-safe [`ResourceApi`] trait, one instantiation per resource kind.

pub mod options;
pub mod session;
pub mod transport;

pub use options::{QueryParameters, RequestOptions};
pub use session::{Credentials, Session, DEFAULT_API_VERSIONS};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

use crate::alerts::Alerts;
use crate::error::ClientError;
use crate::precondition::{HttpDate, LAST_MODIFIED};
use crate::resources::Resource;
use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::fmt;
use std::net::SocketAddr;

/// Characters left unescaped in a path segment: RFC 3986 unreserved.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Metadata about a completed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReqInf {
    pub status_code: u16,
    pub remote_addr: Option<SocketAddr>,
    pub resp_headers: HeaderMap,
}

impl ReqInf {
    pub fn with_status(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }

    /// The response's `Last-Modified`, when present and parseable.
    pub fn last_modified(&self) -> Option<HttpDate> {
        self.resp_headers
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }
}

/// A successful call: payload, alerts, and request metadata.
///
/// `response` is `None` for `304 Not Modified` and for calls whose body has
/// no `response` key.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<P> {
    pub response: Option<P>,
    pub alerts: Alerts,
    pub info: ReqInf,
}

impl<P> Reply<P> {
    pub fn map<U>(self, f: impl FnOnce(P) -> U) -> Reply<U> {
        Reply {
            response: self.response.map(f),
            alerts: self.alerts,
            info: self.info,
        }
    }
}

/// How a single entity is addressed in a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Id(i64),
    Name(String),
}

impl Endpoint {
    /// The escaped path segment for this endpoint.
    pub fn path_segment(&self) -> String {
        match self {
            Endpoint::Id(id) => id.to_string(),
            Endpoint::Name(name) => utf8_percent_encode(name, SEGMENT_ENCODE_SET).to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Id(id) => write!(f, "#{}", id),
            Endpoint::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// CRUD calls for one resource kind.
#[async_trait]
pub trait ResourceApi<R: Resource>: Send + Sync {
    async fn list(&self, opts: &RequestOptions) -> Result<Reply<Vec<R>>, ClientError>;

    async fn create(&self, body: &R, opts: &RequestOptions) -> Result<Reply<R>, ClientError>;

    async fn update(
        &self,
        endpoint: &Endpoint,
        body: &R,
        opts: &RequestOptions,
    ) -> Result<Reply<R>, ClientError>;

    async fn delete(&self, endpoint: &Endpoint, opts: &RequestOptions) -> Result<Reply<Value>, ClientError>;
}
