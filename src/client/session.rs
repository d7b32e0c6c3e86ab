//! An authenticated Traffic Ops session.

use super::options::RequestOptions;
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::{Endpoint, ReqInf, Reply, ResourceApi};
use crate::alerts::{AlertLevel, Alerts};
use crate::error::ClientError;
use crate::resources::Resource;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// API versions tried newest-first when none are configured.
pub const DEFAULT_API_VERSIONS: &[&str] = &["5.0", "4.1", "4.0"];

const LOGIN_PATH: &str = "/user/login";
const LOGIN_SUCCESS: &str = "Successfully logged in.";

/// Username and password used for `/user/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    u: &'a str,
    p: &'a str,
}

#[derive(Deserialize)]
struct Envelope<P> {
    response: Option<P>,
}

/// A logged-in client.
///
/// Paths passed to the request methods are relative to the API root
/// (`/divisions`); the session prefixes `/api/<version>`. When the server
/// answers `501 Not Implemented` the session falls back to the next older
/// version and stays there, unless `force_latest` is set. A `401` or `403`
/// triggers a single re-login and retry.
pub struct Session {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    api_versions: Vec<String>,
    current: AtomicUsize,
    force_latest: bool,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            api_versions: DEFAULT_API_VERSIONS.iter().map(|v| v.to_string()).collect(),
            current: AtomicUsize::new(0),
            force_latest: false,
        }
    }

    /// Versions to try, newest first. An empty list keeps the defaults.
    pub fn with_api_versions(mut self, versions: Vec<String>) -> Self {
        if !versions.is_empty() {
            self.api_versions = versions;
            self.current = AtomicUsize::new(0);
        }
        self
    }

    pub fn with_force_latest(mut self, force_latest: bool) -> Self {
        self.force_latest = force_latest;
        self
    }

    /// Creates a session and logs in.
    pub async fn login(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        api_versions: Vec<String>,
    ) -> Result<(Self, ReqInf), ClientError> {
        let session = Self::new(transport, credentials).with_api_versions(api_versions);
        let info = session.log_in().await?;
        Ok((session, info))
    }

    /// The version currently prefixed to every path.
    pub fn api_version(&self) -> &str {
        let index = self.current.load(Ordering::Relaxed);
        self.api_versions
            .get(index)
            .or_else(|| self.api_versions.last())
            .map(String::as_str)
            .unwrap_or(DEFAULT_API_VERSIONS[0])
    }

    pub fn user(&self) -> &str {
        &self.credentials.user
    }

    /// Posts the credentials to `/user/login`.
    pub async fn log_in(&self) -> Result<ReqInf, ClientError> {
        let body = serde_json::to_vec(&LoginBody {
            u: &self.credentials.user,
            p: &self.credentials.password,
        })
        .map_err(ClientError::Encode)?;

        let response = self
            .send_versioned(Method::POST, LOGIN_PATH, Some(body), &RequestOptions::new())
            .await?;
        let info = Self::info_of(&response);
        let alerts = Self::alerts_of(&response);

        if !response.status.is_success() || !alerts.contains(AlertLevel::Success, LOGIN_SUCCESS) {
            let message = if alerts.has_errors() {
                alerts.error_string()
            } else {
                format!("unexpected response {}", response.status)
            };
            return Err(ClientError::Login {
                user: self.credentials.user.clone(),
                message,
                info,
                alerts,
            });
        }

        info!(
            "Logged in to Traffic Ops as '{}' (API {})",
            self.credentials.user,
            self.api_version()
        );
        Ok(info)
    }

    /// Sends a request and decodes the standard envelope.
    pub async fn request<P: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: &RequestOptions,
    ) -> Result<Reply<P>, ClientError> {
        let mut response = self.send_versioned(method.clone(), path, body.clone(), opts).await?;

        if matches!(response.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            match self.log_in().await {
                Ok(_) => {
                    debug!("Re-authenticated; retrying {} {}", method, path);
                    response = self.send_versioned(method.clone(), path, body, opts).await?;
                }
                Err(e) => warn!("Re-login after {} failed: {}", response.status, e),
            }
        }

        Self::decode(method, path, response)
    }

    async fn send_versioned(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: &RequestOptions,
    ) -> Result<ApiResponse, ClientError> {
        loop {
            let index = self.current.load(Ordering::Relaxed);
            let version = self.api_version().to_string();
            let request = ApiRequest {
                method: method.clone(),
                path: format!("/api/{}{}", version, path),
                query: opts.query_parameters.clone(),
                headers: opts.header.clone(),
                body: body.clone(),
            };
            debug!("{} {} {}", request.method, request.path, request.query.encode());

            let response = self.transport.send(request).await?;
            let has_older = index + 1 < self.api_versions.len();
            if response.status == StatusCode::NOT_IMPLEMENTED && !self.force_latest && has_older {
                warn!(
                    "Traffic Ops does not implement API {}; falling back to {}",
                    version,
                    self.api_versions[index + 1]
                );
                self.current.store(index + 1, Ordering::Relaxed);
                continue;
            }
            return Ok(response);
        }
    }

    fn info_of(response: &ApiResponse) -> ReqInf {
        ReqInf {
            status_code: response.status.as_u16(),
            remote_addr: response.remote_addr,
            resp_headers: response.headers.clone(),
        }
    }

    fn alerts_of(response: &ApiResponse) -> Alerts {
        if response.body.is_empty() {
            return Alerts::default();
        }
        serde_json::from_slice(&response.body).unwrap_or_default()
    }

    fn decode<P: DeserializeOwned>(
        method: Method,
        path: &str,
        response: ApiResponse,
    ) -> Result<Reply<P>, ClientError> {
        let info = Self::info_of(&response);
        let alerts = Self::alerts_of(&response);

        if response.status == StatusCode::NOT_MODIFIED {
            return Ok(Reply {
                response: None,
                alerts,
                info,
            });
        }

        if !response.status.is_success() {
            return Err(ClientError::Status {
                status: response.status,
                method,
                path: path.to_string(),
                body: String::from_utf8_lossy(&response.body).into_owned(),
                info,
                alerts,
            });
        }

        if response.body.is_empty() {
            return Ok(Reply {
                response: None,
                alerts,
                info,
            });
        }

        let envelope: Envelope<P> =
            serde_json::from_slice(&response.body).map_err(|source| ClientError::Decode {
                path: path.to_string(),
                info: info.clone(),
                alerts: alerts.clone(),
                source,
            })?;

        Ok(Reply {
            response: envelope.response,
            alerts,
            info,
        })
    }

    fn encode<R: Resource>(body: &R) -> Result<Vec<u8>, ClientError> {
        serde_json::to_vec(body).map_err(ClientError::Encode)
    }

    /// `GET /<kind>`.
    pub async fn list<R: Resource>(&self, opts: &RequestOptions) -> Result<Reply<Vec<R>>, ClientError> {
        self.request(Method::GET, R::KIND.path(), None, opts).await
    }

    /// `POST /<kind>`.
    pub async fn create<R: Resource>(&self, body: &R, opts: &RequestOptions) -> Result<Reply<R>, ClientError> {
        let bytes = Self::encode(body)?;
        self.request(Method::POST, R::KIND.path(), Some(bytes), opts).await
    }

    /// `PUT /<kind>/<endpoint>`.
    pub async fn update<R: Resource>(
        &self,
        endpoint: &Endpoint,
        body: &R,
        opts: &RequestOptions,
    ) -> Result<Reply<R>, ClientError> {
        let bytes = Self::encode(body)?;
        let path = format!("{}/{}", R::KIND.path(), endpoint.path_segment());
        self.request(Method::PUT, &path, Some(bytes), opts).await
    }

    /// `DELETE /<kind>/<endpoint>`.
    pub async fn delete<R: Resource>(
        &self,
        endpoint: &Endpoint,
        opts: &RequestOptions,
    ) -> Result<Reply<Value>, ClientError> {
        let path = format!("{}/{}", R::KIND.path(), endpoint.path_segment());
        self.request(Method::DELETE, &path, None, opts).await
    }
}

#[async_trait]
impl<R: Resource> ResourceApi<R> for Session {
    async fn list(&self, opts: &RequestOptions) -> Result<Reply<Vec<R>>, ClientError> {
        Session::list::<R>(self, opts).await
    }

    async fn create(&self, body: &R, opts: &RequestOptions) -> Result<Reply<R>, ClientError> {
        Session::create(self, body, opts).await
    }

    async fn update(
        &self,
        endpoint: &Endpoint,
        body: &R,
        opts: &RequestOptions,
    ) -> Result<Reply<R>, ClientError> {
        Session::update(self, endpoint, body, opts).await
    }

    async fn delete(&self, endpoint: &Endpoint, opts: &RequestOptions) -> Result<Reply<Value>, ClientError> {
        Session::delete::<R>(self, endpoint, opts).await
    }
}
