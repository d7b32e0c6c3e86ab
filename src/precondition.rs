//! Conditional-request primitives.
//!
//! Traffic Ops supports three precondition headers:
//!
//! * `If-Modified-Since` on reads: when no selected row changed after the
//!   given date the server answers `304 Not Modified` with no body.
//! * `If-Unmodified-Since` on writes: when the target changed after the
//!   given date the server answers `412 Precondition Failed` and applies
//!   nothing.
//! * `If-Match` on writes: a list of Traffic Ops entity tags. Each tag
//!   encodes a timestamp; the latest one acts like `If-Unmodified-Since`.
//!
//! The simulator evaluates these rules with [`check_unmodified`] and
//! [`is_not_modified`]; test tables build the headers with [`HttpDate`]
//! and [`EntityTag`].
//!
//! # Examples
//!
//! ```rust
//! use traffic_ops_harness::precondition::{EntityTag, HttpDate};
//! use chrono::{TimeZone, Utc};
//!
//! let when = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
//! assert_eq!(HttpDate::new(when).to_string(), "Sun, 06 Nov 1994 08:49:37 GMT");
//!
//! let tag = EntityTag::new(when);
//! let parsed: EntityTag = tag.to_string().parse().unwrap();
//! assert_eq!(parsed, tag);
//! ```

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use std::fmt;
use std::str::FromStr;

pub use reqwest::header::{ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_UNMODIFIED_SINCE, LAST_MODIFIED};

const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC850: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME: &str = "%a %b %e %H:%M:%S %Y";

const ETAG_PREFIX: &str = "v1-";

/// Errors parsing precondition header values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("invalid HTTP date: {0}")]
    InvalidDate(String),

    #[error("invalid entity tag: {0}")]
    InvalidEntityTag(String),
}

/// A second-precision timestamp in HTTP-date form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HttpDate(DateTime<Utc>);

impl HttpDate {
    /// Wraps a timestamp, dropping sub-second precision.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0))
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn header_value(&self) -> HeaderValue {
        ascii_header(self.to_string())
    }
}

impl From<DateTime<Utc>> for HttpDate {
    fn from(at: DateTime<Utc>) -> Self {
        Self::new(at)
    }
}

impl fmt::Display for HttpDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(RFC1123))
    }
}

impl FromStr for HttpDate {
    type Err = PreconditionError;

    /// Accepts RFC 1123, RFC 850 and asctime forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        [RFC1123, RFC850, ASCTIME]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .map(|naive| Self(naive.and_utc()))
            .ok_or_else(|| PreconditionError::InvalidDate(s.to_string()))
    }
}

/// A Traffic Ops entity tag: `"v1-<base 36 unix nanoseconds>"`.
///
/// Weak tags (`W/"..."`) are accepted when parsing and compare equal to
/// their strong form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityTag {
    nanos: i64,
}

impl EntityTag {
    /// Tags a timestamp. Instants outside the nanosecond range clamp to
    /// the nearest representable value.
    pub fn new(at: DateTime<Utc>) -> Self {
        let nanos = at.timestamp_nanos_opt().unwrap_or(if at.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        });
        Self { nanos }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.nanos)
    }

    pub fn header_value(&self) -> HeaderValue {
        ascii_header(self.to_string())
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}{}\"", ETAG_PREFIX, to_base36(self.nanos))
    }
}

impl FromStr for EntityTag {
    type Err = PreconditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PreconditionError::InvalidEntityTag(s.to_string());
        let trimmed = s.trim();
        let unweakened = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let unquoted = unweakened
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(unweakened);
        let digits = unquoted.strip_prefix(ETAG_PREFIX).ok_or_else(invalid)?;
        let nanos = i64::from_str_radix(digits, 36).map_err(|_| invalid())?;
        Ok(Self { nanos })
    }
}

/// HTTP dates and entity tags are visible ASCII, which a header value
/// always accepts.
fn ascii_header(text: String) -> HeaderValue {
    HeaderValue::try_from(text).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// The `Last-Modified` value for rows whose newest change is `latest`:
/// truncated to the second, then one second later, so that sending it back
/// as `If-Modified-Since` matches the same selection.
pub fn last_modified(latest: DateTime<Utc>) -> HttpDate {
    HttpDate::new(latest.trunc_subsecs(0) + Duration::seconds(1))
}

/// The latest timestamp among the comma-separated tags in `values`.
///
/// Malformed tags are skipped; `None` means no tag parsed.
pub fn parse_etags<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<DateTime<Utc>> {
    values
        .into_iter()
        .flat_map(|value| value.split(','))
        .filter_map(|tag| tag.parse::<EntityTag>().ok())
        .max()
        .map(|tag| tag.timestamp())
}

fn to_base36(value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let negative = value < 0;
    let mut remaining = value.unsigned_abs();
    let mut out = Vec::new();
    while remaining > 0 {
        out.push(DIGITS[(remaining % 36) as usize]);
        remaining /= 36;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Whether a write against a row last updated at `last_updated` may proceed.
///
/// Returns the time the client asserted in the failing header, or `Ok` when
/// every present precondition holds. Unparseable headers are ignored, as the
/// server ignores them.
pub fn check_unmodified(headers: &HeaderMap, last_updated: DateTime<Utc>) -> Result<(), DateTime<Utc>> {
    let if_match = headers.get_all(IF_MATCH).iter().filter_map(|value| value.to_str().ok());
    if let Some(tagged) = parse_etags(if_match) {
        if last_updated > tagged {
            return Err(tagged);
        }
    }

    if let Some(since) = header_date(headers, &IF_UNMODIFIED_SINCE) {
        if last_updated > since.as_datetime() {
            return Err(since.as_datetime());
        }
    }

    Ok(())
}

/// Whether a read selecting rows whose newest change is `latest` should be
/// answered with `304 Not Modified`.
///
/// An empty selection is never "not modified".
pub fn is_not_modified(headers: &HeaderMap, latest: Option<DateTime<Utc>>) -> bool {
    let Some(latest) = latest else {
        return false;
    };
    header_date(headers, &IF_MODIFIED_SINCE)
        .is_some_and(|since| latest.trunc_subsecs(0) <= since.as_datetime())
}

fn header_date(headers: &HeaderMap, name: &reqwest::header::HeaderName) -> Option<HttpDate> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<HttpDate>().ok())
}
