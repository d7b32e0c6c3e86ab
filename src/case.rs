//! The declarative test table.
//!
//! A [`MethodTests`] maps a method group (`"GET"`, `"GET AFTER CHANGES"`,
//! `"PUT"`, ...) to named scenarios, each a [`TestCase`]. Groups and
//! scenarios run in insertion order.
//!
//! ```rust
//! use traffic_ops_harness::case::{EndpointId, MethodTests, TestCase};
//! use traffic_ops_harness::expect::{has_status, no_error, response_has_length};
//! use traffic_ops_harness::resources::Division;
//! use reqwest::StatusCode;
//!
//! let tests: MethodTests<Division> = MethodTests::new()
//!     .get(
//!         "OK when VALID NAME parameter",
//!         TestCase::new()
//!             .query("name", "division1")
//!             .expect(no_error())
//!             .expect(has_status(StatusCode::OK))
//!             .expect(response_has_length(1)),
//!     )
//!     .delete(
//!         "NOT FOUND when DOESNT EXIST",
//!         TestCase::new()
//!             .endpoint(EndpointId::id(111_111_111))
//!             .expect(has_status(StatusCode::NOT_FOUND)),
//!     );
//! assert_eq!(tests.scenario_count(), 2);
//! ```

use crate::client::{Endpoint, RequestOptions, ResourceApi};
use crate::expect::Expectation;
use crate::fixtures;
use crate::resources::Resource;
use reqwest::header::{HeaderName, HeaderValue};
use std::fmt;

/// Which client call a group's scenarios make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// List with the case's query parameters.
    Get,
    /// Create the case's body.
    Post,
    /// Replace the entity at the case's endpoint with its body.
    Put,
    /// Delete the entity at the case's endpoint.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// The target of a mutating call, possibly still unresolved.
///
/// Fixture ids are assigned by the server, so tables usually name the
/// target and let the dispatcher look its id up right before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointId {
    /// Used as given, even if nothing exists there.
    Fixed(Endpoint),
    /// The id of the entity whose natural key is this name.
    ByName(String),
}

impl EndpointId {
    /// A literal id, typically one that does not exist.
    pub fn id(id: i64) -> Self {
        Self::Fixed(Endpoint::Id(id))
    }

    /// A literal name path segment, for kinds addressed by name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Fixed(Endpoint::Name(name.into()))
    }

    /// Looked up by natural key when the scenario runs.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }

    /// Produces the concrete endpoint. A `ByName` lookup must find exactly
    /// one entity.
    pub async fn resolve<R: Resource>(&self, api: &dyn ResourceApi<R>) -> Result<Endpoint, String> {
        let name = match self {
            EndpointId::Fixed(endpoint) => return Ok(endpoint.clone()),
            EndpointId::ByName(name) => name,
        };
        fixtures::find_one(api, name)
            .await
            .map_err(|e| e.to_string())?
            .endpoint()
            .ok_or_else(|| format!("{} '{}' has no id", R::KIND.singular(), name))
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointId::Fixed(endpoint) => write!(f, "{}", endpoint),
            EndpointId::ByName(name) => write!(f, "id of '{}'", name),
        }
    }
}

/// One scenario: what to send and what must hold afterwards.
pub struct TestCase<R: Resource> {
    pub endpoint: Option<EndpointId>,
    pub body: Option<R>,
    pub options: RequestOptions,
    pub expectations: Vec<Box<dyn Expectation<R>>>,
}

impl<R: Resource> Default for TestCase<R> {
    fn default() -> Self {
        Self {
            endpoint: None,
            body: None,
            options: RequestOptions::new(),
            expectations: Vec::new(),
        }
    }
}

impl<R: Resource> TestCase<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where a `PUT` or `DELETE` is sent.
    pub fn endpoint(mut self, endpoint: EndpointId) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// The entity a `POST` or `PUT` sends.
    pub fn body(mut self, body: R) -> Self {
        self.body = Some(body);
        self
    }

    /// Replaces all headers and query parameters.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets one query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options.query_parameters.set(key, value.to_string());
        self
    }

    /// Sets one request header, replacing an earlier value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.options.header.insert(name, value);
        self
    }

    /// Adds a check. Checks run in the order they were added.
    pub fn expect(mut self, expectation: Box<dyn Expectation<R>>) -> Self {
        self.expectations.push(expectation);
        self
    }

    /// Adds several checks at once.
    pub fn expect_all(mut self, expectations: impl IntoIterator<Item = Box<dyn Expectation<R>>>) -> Self {
        self.expectations.extend(expectations);
        self
    }
}

impl<R: Resource> fmt::Debug for TestCase<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("endpoint", &self.endpoint)
            .field("body", &self.body)
            .field("options", &self.options)
            .field("expectations", &self.expectations.len())
            .finish()
    }
}

/// The scenarios of one method group.
#[derive(Debug)]
pub struct MethodGroup<R: Resource> {
    pub label: String,
    pub method: Method,
    pub scenarios: Vec<(String, TestCase<R>)>,
}

/// Method group → scenario name → case.
#[derive(Debug)]
pub struct MethodTests<R: Resource> {
    groups: Vec<MethodGroup<R>>,
}

impl<R: Resource> Default for MethodTests<R> {
    fn default() -> Self {
        Self { groups: Vec::new() }
    }
}

impl<R: Resource> MethodTests<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scenario under `label`. A scenario name already present in
    /// that group is replaced in place.
    pub fn scenario(mut self, label: impl Into<String>, method: Method, name: impl Into<String>, case: TestCase<R>) -> Self {
        let label = label.into();
        let name = name.into();
        let index = match self.groups.iter().position(|g| g.label == label) {
            Some(index) => index,
            None => {
                self.groups.push(MethodGroup {
                    label,
                    method,
                    scenarios: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[index];
        match group.scenarios.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = case,
            None => group.scenarios.push((name, case)),
        }
        self
    }

    pub fn get(self, name: impl Into<String>, case: TestCase<R>) -> Self {
        self.scenario("GET", Method::Get, name, case)
    }

    pub fn post(self, name: impl Into<String>, case: TestCase<R>) -> Self {
        self.scenario("POST", Method::Post, name, case)
    }

    pub fn put(self, name: impl Into<String>, case: TestCase<R>) -> Self {
        self.scenario("PUT", Method::Put, name, case)
    }

    pub fn delete(self, name: impl Into<String>, case: TestCase<R>) -> Self {
        self.scenario("DELETE", Method::Delete, name, case)
    }

    pub fn groups(&self) -> &[MethodGroup<R>] {
        &self.groups
    }

    pub fn scenario_count(&self) -> usize {
        self.groups.iter().map(|g| g.scenarios.len()).sum()
    }
}
