//! The alerts envelope returned by every Traffic Ops API call.
//!
//! Every response body carries an `alerts` array of `{level, text}` objects
//! alongside (or instead of) its `response` payload. Alerts form a second,
//! content-level error channel that is independent of the HTTP status: a
//! request may succeed at the transport level and still report an
//! error-level alert, so checkers treat the two separately.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertLevel::Success => "success",
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single `{level, text}` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub text: String,
    pub level: AlertLevel,
}

impl Alert {
    pub fn new(level: AlertLevel, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.text)
    }
}

/// The list of alerts attached to a response.
///
/// Deserializes from any JSON object; a body without an `alerts` key yields
/// an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl Alerts {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding one success-level alert.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            alerts: vec![Alert::new(AlertLevel::Success, text)],
        }
    }

    /// A list holding one error-level alert.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            alerts: vec![Alert::new(AlertLevel::Error, text)],
        }
    }

    pub fn push(&mut self, level: AlertLevel, text: impl Into<String>) {
        self.alerts.push(Alert::new(level, text));
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    /// Alerts at the given level.
    pub fn at_level(&self, level: AlertLevel) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(move |a| a.level == level)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Alert> {
        self.at_level(AlertLevel::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Whether some alert of `level` contains `needle` in its text.
    pub fn contains(&self, level: AlertLevel, needle: &str) -> bool {
        self.at_level(level).any(|a| a.text.contains(needle))
    }

    /// The error-level texts joined by `"; "`, or an empty string.
    pub fn error_string(&self) -> String {
        self.errors()
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for Alerts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, alert) in self.alerts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", alert)?;
        }
        f.write_str("]")
    }
}

impl Extend<Alert> for Alerts {
    fn extend<T: IntoIterator<Item = Alert>>(&mut self, iter: T) {
        self.alerts.extend(iter);
    }
}
