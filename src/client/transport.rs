//! The seam between the session and the wire.
//!
//! [`Session`](super::Session) speaks to Traffic Ops only through the
//! [`Transport`] trait. [`HttpTransport`] is the real thing, built on
//! reqwest; the in-memory simulator implements the same trait.

use super::options::QueryParameters;
use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// One outgoing request. `path` is absolute, including the `/api/<v>`
/// prefix.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParameters,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParameters::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// The raw answer to an [`ApiRequest`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub remote_addr: Option<SocketAddr>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
            remote_addr: None,
        }
    }
}

/// Sends requests to a Traffic Ops instance.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// reqwest-backed transport with a cookie store for the login session.
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url, timeout: Duration, insecure: bool, user_agent: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(insecure)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ClientError::transport(base.as_str(), e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ClientError> {
        let mut url = self
            .base
            .join(&request.path)
            .map_err(|e| ClientError::InvalidRequest(format!("bad path {}: {}", request.path, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(&request)?;
        let mut headers = request.headers;
        let mut builder = self.client.request(request.method.clone(), url.clone());
        if let Some(body) = request.body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            builder = builder.body(body);
        }

        let response = builder
            .headers(headers)
            .send()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e.to_string()))?;

        let status = response.status();
        let remote_addr = response.remote_addr();
        let response_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e.to_string()))?
            .to_vec();

        Ok(ApiResponse {
            status,
            headers: response_headers,
            body,
            remote_addr,
        })
    }
}
