//! # Consumer-side report document.
//!
//! The hub treats a report as an opaque JSON value. Consumers decode it into
//! [`Report`] to group its tests. Only the fields the grouper needs are typed;
//! everything else (`version`, `client`, per-test `desc`/`logs`/`packets`, …)
//! is kept in flattened `extra` maps and round-trips untouched.
//!
//! ## Decoding order
//! ```text
//! Value ──► peek minversion ──► > SUPPORTED_MINVERSION ? ──► UnsupportedMinVersion
//!                                        │
//!                                        └──► scan test statuses ──► UnknownTestStatus
//!                                                       │
//!                                                       └──► serde decode ──► Report / Malformed
//! ```
//! The version check runs first so that a newer schema is reported as a
//! schema error rather than a shape mismatch. Statuses are checked before the
//! full decode so the rejection names the test that caused it.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ReportError;

/// Highest report `minversion` this build can group.
pub const SUPPORTED_MINVERSION: u64 = 1;

/// Outcome of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test ran and passed.
    Success,
    /// Test ran and failed.
    Failed,
    /// Test did not run.
    Skipped,
}

impl TestStatus {
    /// Parses the wire form; `None` for anything outside the three outcomes.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(TestStatus::Success),
            "failed" => Some(TestStatus::Failed),
            "skipped" => Some(TestStatus::Skipped),
            _ => None,
        }
    }
}

/// One test result as submitted by the producer.
///
/// `name` uses `/` to express group nesting (`"suite/sub/case"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Slash-separated test path.
    #[serde(default)]
    pub name: String,
    /// Test outcome.
    pub status: TestStatus,
    /// Producer-supplied fields carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestResult {
    /// Creates a result with no extra fields.
    pub fn new(name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            name: name.into(),
            status,
            extra: Map::new(),
        }
    }
}

/// A test-run report decoded for grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Producer-assigned unique identifier.
    pub id: String,
    /// Schema marker; consumers refuse anything above [`SUPPORTED_MINVERSION`].
    #[serde(default)]
    pub minversion: u64,
    /// Raw creation timestamp (RFC 3339 string or epoch millis).
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    /// Flat list of results, in producer order.
    #[serde(default)]
    pub tests: Vec<TestResult>,
    /// Remaining report fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Report {
    /// Decodes a report from an opaque JSON document.
    ///
    /// Fails with [`ReportError::UnsupportedMinVersion`] before attempting to
    /// decode the body when the declared schema is too new, and with
    /// [`ReportError::UnknownTestStatus`] for the first test whose status is
    /// a string outside the known outcomes.
    pub fn from_value(value: Value) -> Result<Self, ReportError> {
        let found = value
            .get("minversion")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        check_minversion(found)?;
        check_statuses(&value)?;
        Ok(serde_json::from_value(value)?)
    }
}

fn check_statuses(value: &Value) -> Result<(), ReportError> {
    let Some(tests) = value.get("tests").and_then(Value::as_array) else {
        return Ok(());
    };
    for test in tests {
        let Some(status) = test.get("status").and_then(Value::as_str) else {
            continue;
        };
        if TestStatus::from_wire(status).is_none() {
            let name = test.get("name").and_then(Value::as_str).unwrap_or_default();
            return Err(ReportError::UnknownTestStatus {
                test: name.to_string(),
                status: status.to_string(),
            });
        }
    }
    Ok(())
}

/// Returns an error if `found` is above [`SUPPORTED_MINVERSION`].
pub(crate) fn check_minversion(found: u64) -> Result<(), ReportError> {
    if found > SUPPORTED_MINVERSION {
        return Err(ReportError::UnsupportedMinVersion {
            found,
            supported: SUPPORTED_MINVERSION,
        });
    }
    Ok(())
}

/// Best-effort parsed creation time.
///
/// Unparseable or missing timestamps become [`CreatedAt::Unknown`] instead of
/// failing the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedAt {
    /// Successfully parsed timestamp.
    At(DateTime<Utc>),
    /// Missing or unparseable timestamp.
    Unknown,
}

impl CreatedAt {
    /// Parses an RFC 3339 string, or epoch milliseconds given as a number or
    /// a numeric string.
    pub fn parse(raw: Option<&Value>) -> Self {
        let parsed = match raw {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.trim().parse::<i64>().ok().and_then(from_millis)),
            Some(Value::Number(n)) => n.as_i64().and_then(from_millis),
            _ => None,
        };
        parsed.map_or(CreatedAt::Unknown, CreatedAt::At)
    }

    /// Returns the timestamp if it was parsed.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            CreatedAt::At(dt) => Some(*dt),
            CreatedAt::Unknown => None,
        }
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

impl fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatedAt::At(dt) => write!(f, "{}", dt.to_rfc3339()),
            CreatedAt::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for CreatedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CreatedAt::At(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            CreatedAt::Unknown => serializer.serialize_none(),
        }
    }
}
