//! An in-memory Traffic Ops.
//!
//! [`SimulatedTrafficOps`] implements [`Transport`], so a [`Session`] can be
//! pointed at it instead of a live server. It keeps the server's
//! observable rules for the resources the harness exercises: login and
//! session cookies, API version negotiation, list queries, conditional
//! requests, validation, and referential refusals.
//!
//! Clones share one server. [`SimulatedTrafficOps::client`] returns a
//! handle with its own (empty) cookie jar, the way a second client process
//! would connect.
//!
//! ```
//! use traffic_ops_harness::sim::SimulatedTrafficOps;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let server = SimulatedTrafficOps::new();
//! let session = server.session().await.unwrap();
//! assert_eq!(session.api_version(), "5.0");
//! # }
//! ```

mod query;
mod rules;
mod store;

use crate::alerts::Alerts;
use crate::backdoor::{AdminBackdoor, BackdoorError};
use crate::client::{ApiRequest, ApiResponse, Credentials, DEFAULT_API_VERSIONS, Session, Transport};
use crate::error::ClientError;
use crate::precondition::{self, LAST_MODIFIED};
use crate::resources::ResourceKind;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use store::SimState;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

const COOKIE_NAME: &str = "mojolicious";
const LOGIN_PATH: &str = "/user/login";

pub(crate) const PRECONDITION_FAILED: &str =
    "resource was modified since the time specified by the request headers";

/// A refusal, rendered as an error alert with `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SimError {
    pub status: StatusCode,
    pub message: String,
}

impl SimError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }
}

#[derive(Deserialize)]
struct LoginBody {
    u: String,
    p: String,
}

/// A successful answer before it is rendered.
struct Answer {
    status: StatusCode,
    alerts: Alerts,
    response: Option<Value>,
    headers: HeaderMap,
}

impl Answer {
    fn new(status: StatusCode, alerts: Alerts, response: Option<Value>) -> Self {
        Self {
            status,
            alerts,
            response,
            headers: HeaderMap::new(),
        }
    }

    fn with_header(mut self, name: HeaderName, value: Option<HeaderValue>) -> Self {
        if let Some(value) = value {
            self.headers.insert(name, value);
        }
        self
    }
}

type Handled = Result<Answer, SimError>;

/// Which row a mutating request addresses.
enum Target {
    Id(i64),
    Key(String),
}

/// The simulated server.
#[derive(Clone)]
pub struct SimulatedTrafficOps {
    state: Arc<RwLock<SimState>>,
    jar: Arc<Mutex<Option<Uuid>>>,
    api_versions: Arc<Vec<String>>,
    credentials: Credentials,
}

impl Default for SimulatedTrafficOps {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTrafficOps {
    /// A fresh install with user `admin`, password `twelve`, serving every
    /// default API version.
    pub fn new() -> Self {
        Self::with_credentials(Credentials::new("admin", "twelve"))
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        let state = SimState::seeded(&credentials.user, &credentials.password);
        Self {
            state: Arc::new(RwLock::new(state)),
            jar: Arc::new(Mutex::new(None)),
            api_versions: Arc::new(DEFAULT_API_VERSIONS.iter().map(|v| v.to_string()).collect()),
            credentials,
        }
    }

    /// Restricts the versions this server implements; others get `501`.
    pub fn with_api_versions(mut self, versions: &[&str]) -> Self {
        self.api_versions = Arc::new(versions.iter().map(|v| v.to_string()).collect());
        self
    }

    /// The admin credentials the server was seeded with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Another client of the same server, not yet logged in.
    pub fn client(&self) -> Self {
        Self {
            jar: Arc::new(Mutex::new(None)),
            ..self.clone()
        }
    }

    /// Logs a new client in as the seeded admin.
    pub async fn session(&self) -> Result<Session, ClientError> {
        let (session, _) = Session::login(
            Arc::new(self.client()),
            self.credentials.clone(),
            Vec::new(),
        )
        .await?;
        Ok(session)
    }

    /// The back-door into this server's state.
    pub fn backdoor(&self) -> SimBackdoor {
        SimBackdoor {
            state: Arc::clone(&self.state),
        }
    }

    /// Rows currently stored for `kind`.
    pub async fn count(&self, kind: ResourceKind) -> usize {
        self.state.read().await.table(kind).rows.len()
    }

    /// Invalidates every issued session cookie.
    pub async fn expire_sessions(&self) {
        self.state.write().await.tokens.clear();
    }

    async fn handle(&self, request: &ApiRequest) -> Handled {
        let rest = request
            .path
            .strip_prefix("/api/")
            .ok_or_else(|| SimError::not_found(format!("no route for {}", request.path)))?;
        let (version, route) = rest.split_once('/').unwrap_or((rest, ""));
        if !self.api_versions.iter().any(|v| v == version) {
            return Err(SimError::new(
                StatusCode::NOT_IMPLEMENTED,
                format!("API version {} is not implemented by this server", version),
            ));
        }
        let route = format!("/{}", route);

        if route == LOGIN_PATH && request.method == Method::POST {
            return self.login(request).await;
        }

        let token = *self.jar.lock().await;
        let authorized = match token {
            Some(token) => self.state.read().await.tokens.contains(&token),
            None => false,
        };
        if !authorized {
            return Err(SimError::new(StatusCode::UNAUTHORIZED, "Unauthorized, please log in."));
        }

        let mut segments = route.trim_start_matches('/').splitn(2, '/');
        let collection = segments.next().unwrap_or_default();
        let kind = ResourceKind::from_path(collection)
            .ok_or_else(|| SimError::not_found(format!("no route for {}", request.path)))?;
        let target = segments
            .next()
            .filter(|segment| !segment.is_empty())
            .map(|segment| Self::target(kind, segment))
            .transpose()?;

        match (&request.method, target) {
            (&Method::GET, None) => self.list(kind, request).await,
            (&Method::POST, None) => self.create(kind, request).await,
            (&Method::PUT, Some(target)) => self.update(kind, target, request).await,
            (&Method::DELETE, Some(_)) if kind == ResourceKind::Users => {
                Err(SimError::method_not_allowed("users cannot be deleted"))
            }
            (&Method::DELETE, Some(target)) => self.delete(kind, target, request).await,
            (method, _) => Err(SimError::method_not_allowed(format!(
                "{} is not allowed on {}",
                method, request.path
            ))),
        }
    }

    fn target(kind: ResourceKind, segment: &str) -> Result<Target, SimError> {
        if kind == ResourceKind::ServiceCategories {
            let name = percent_decode_str(segment).decode_utf8_lossy().into_owned();
            return Ok(Target::Key(name));
        }
        segment
            .parse::<i64>()
            .map(Target::Id)
            .map_err(|_| SimError::bad_request("id must be an integer"))
    }

    fn body(request: &ApiRequest) -> Result<Map<String, Value>, SimError> {
        let bytes = request.body.as_deref().unwrap_or_default();
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(SimError::bad_request("could not decode request body as a JSON object")),
        }
    }

    async fn login(&self, request: &ApiRequest) -> Handled {
        let body: LoginBody = request
            .body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
            .ok_or_else(|| SimError::bad_request("parsing login credentials failed"))?;

        let mut state = self.state.write().await;
        if state.passwords.get(&body.u) != Some(&body.p) {
            return Err(SimError::new(StatusCode::UNAUTHORIZED, "Invalid username or password."));
        }
        let token = Uuid::new_v4();
        state.tokens.insert(token);
        *self.jar.lock().await = Some(token);
        info!("Simulated Traffic Ops: '{}' logged in", body.u);
        let cookie = format!("{}={}; Path=/; HttpOnly", COOKIE_NAME, token);
        Ok(Answer::new(StatusCode::OK, Alerts::success("Successfully logged in."), None)
            .with_header(SET_COOKIE, HeaderValue::try_from(cookie).ok()))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        request: &ApiRequest,
    ) -> Handled {
        let state = self.state.read().await;
        let table = state.table(kind);
        let mut rows = query::filter(&table.rows, kind, &request.query)?;
        let latest = table.latest_change(rows.iter().copied());
        let last_modified = latest.map(|at| precondition::last_modified(at).header_value());
        if precondition::is_not_modified(&request.headers, latest) {
            return Ok(Answer::new(StatusCode::NOT_MODIFIED, Alerts::new(), None)
                .with_header(LAST_MODIFIED, last_modified));
        }

        query::order(&mut rows, kind, &request.query);
        let (start, end) = query::window(rows.len(), &request.query)?;
        let response: Vec<Value> = rows[start..end]
            .iter()
            .map(|row| Value::Object(row.value.clone()))
            .collect();
        Ok(Answer::new(StatusCode::OK, Alerts::new(), Some(Value::Array(response)))
            .with_header(LAST_MODIFIED, last_modified))
    }

    async fn create(
        &self,
        kind: ResourceKind,
        request: &ApiRequest,
    ) -> Handled {
        let body = Self::body(request)?;
        let mut state = self.state.write().await;
        let prepared = rules::prepare(&state, kind, body, None)?;
        let with_id = kind != ResourceKind::ServiceCategories;
        let row = state
            .table_mut(kind)
            .insert(prepared.value, with_id, Utc::now())
            .clone();
        if let (Some(password), Some(username)) = (prepared.password, row.str_field("username")) {
            state.passwords.insert(username.to_string(), password);
        }
        debug!("Simulated Traffic Ops: created {} {:?}", kind.singular(), row.value);
        Ok(Answer::new(
            StatusCode::CREATED,
            Alerts::success(format!("{} was created.", kind.singular())),
            Some(Value::Object(row.value)),
        ))
    }

    fn locate(state: &SimState, kind: ResourceKind, target: &Target) -> Result<usize, SimError> {
        let table = state.table(kind);
        let (found, described) = match target {
            Target::Id(id) => (table.position_by_id(*id), format!("id {}", id)),
            Target::Key(key) => (
                table.position_by_key(kind.key_field(), key),
                format!("{} '{}'", kind.key_field(), key),
            ),
        };
        found.ok_or_else(|| SimError::not_found(format!("no {} exists by {}", kind.singular(), described)))
    }

    fn check_preconditions(state: &SimState, kind: ResourceKind, index: usize, request: &ApiRequest) -> Result<(), SimError> {
        let last_updated = state.table(kind).rows[index].last_updated;
        precondition::check_unmodified(&request.headers, last_updated)
            .map_err(|_| SimError::new(StatusCode::PRECONDITION_FAILED, PRECONDITION_FAILED))
    }

    async fn update(
        &self,
        kind: ResourceKind,
        target: Target,
        request: &ApiRequest,
    ) -> Handled {
        let body = Self::body(request)?;
        let mut state = self.state.write().await;
        let index = Self::locate(&state, kind, &target)?;
        Self::check_preconditions(&state, kind, index, request)?;
        let previous_key = state.table(kind).rows[index]
            .str_field(kind.key_field())
            .unwrap_or_default()
            .to_string();
        let prepared = rules::prepare(&state, kind, body, Some(index))?;

        let row = state
            .table_mut(kind)
            .replace(index, prepared.value, Utc::now())
            .clone();
        let key = row.str_field(kind.key_field()).unwrap_or_default().to_string();
        if key != previous_key {
            if let Some(id) = row.id() {
                rules::propagate_rename(&mut state, kind, id, &key);
            }
            if kind == ResourceKind::Users {
                if let Some(password) = state.passwords.remove(&previous_key) {
                    state.passwords.insert(key.clone(), password);
                }
            }
        }
        if let Some(password) = prepared.password {
            state.passwords.insert(key, password);
        }

        Ok(Answer::new(
            StatusCode::OK,
            Alerts::success(format!("{} was updated", kind.singular())),
            Some(Value::Object(row.value)),
        ))
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        target: Target,
        request: &ApiRequest,
    ) -> Handled {
        let mut state = self.state.write().await;
        let index = Self::locate(&state, kind, &target)?;
        Self::check_preconditions(&state, kind, index, request)?;
        rules::check_delete(&state, kind, &state.table(kind).rows[index])?;
        let row = state.table_mut(kind).remove(index, Utc::now());
        debug!("Simulated Traffic Ops: deleted {} {:?}", kind.singular(), row.value);
        Ok(Answer::new(
            StatusCode::OK,
            Alerts::success(format!("{} was deleted.", kind.singular())),
            None,
        ))
    }

    fn render(
        status: StatusCode,
        alerts: Alerts,
        response: Option<Value>,
    ) -> Result<ApiResponse, ClientError> {
        if status == StatusCode::NOT_MODIFIED {
            return Ok(ApiResponse::new(status, Vec::new()));
        }
        let mut envelope = Map::new();
        if !alerts.is_empty() {
            envelope.insert("alerts".to_string(), json!(alerts.alerts));
        }
        if let Some(response) = response {
            envelope.insert("response".to_string(), response);
        }
        let body = serde_json::to_vec(&envelope).map_err(ClientError::Encode)?;
        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl Transport for SimulatedTrafficOps {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = match self.handle(&request).await {
            Ok(answer) => {
                let mut response = Self::render(answer.status, answer.alerts, answer.response)?;
                response.headers = answer.headers;
                response
            }
            Err(error) => Self::render(error.status, Alerts::error(error.message), None)?,
        };
        if response.status.is_client_error() || response.status.is_server_error() {
            debug!(
                "Simulated Traffic Ops: {} {} -> {}",
                request.method, request.path, response.status
            );
        }
        Ok(response)
    }
}

/// Back-door into a [`SimulatedTrafficOps`]; hard-deletes users in memory.
pub struct SimBackdoor {
    state: Arc<RwLock<SimState>>,
}

#[async_trait]
impl AdminBackdoor for SimBackdoor {
    async fn exec_sql(&self, _statements: &[String]) -> Result<(), BackdoorError> {
        Err(BackdoorError::Unsupported("raw SQL against the simulator".to_string()))
    }

    async fn force_delete_users(&self, usernames: &[String]) -> Result<(), BackdoorError> {
        let mut state = self.state.write().await;
        let users = state.table_mut(ResourceKind::Users);
        let before = users.rows.len();
        users
            .rows
            .retain(|row| !row.str_field("username").is_some_and(|name| usernames.iter().any(|u| u == name)));
        if users.rows.len() != before {
            users.last_deleted = Some(Utc::now());
        }
        for name in usernames {
            state.passwords.remove(name);
        }
        debug!("Simulated Traffic Ops: force-deleted users {:?}", usernames);
        Ok(())
    }
}
