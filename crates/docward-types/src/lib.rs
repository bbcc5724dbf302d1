//! # docward-types: Core types for `docward`
//!
//! This crate contains the types shared by every docward crate:
//! - Property values ([`Value`])
//! - Access outcomes ([`Decision`])
//! - The read-only document view consumed by the engine ([`Document`], [`PropertyError`])
//! - Principals and group membership ([`Principal`], [`PrincipalKind`],
//!   [`MembershipOracle`], [`OracleError`])
//!
//! The document store, the identity service and the query engine are external
//! collaborators. They are reached only through the narrow traits defined here.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod principal;

pub use principal::{MembershipOracle, OracleError, Principal, PrincipalKind};

// ============================================================================
// Property values
// ============================================================================

/// A typed document property value.
///
/// A missing property is represented by `Option::None` at the accessor level,
/// never by a variant of this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// UTF-8 string value.
    Text(String),
    /// Calendar value, normalised to UTC.
    Date(DateTime<Utc>),
}

impl Value {
    /// Returns the string payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Date(_) => None,
        }
    }

    /// Returns the calendar payload, if this is a date value.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(_) => None,
        }
    }

    /// Short name of the value's type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Date(_) => "date",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Outcome of a single policy, or of a whole policy chain.
///
/// `Unknown` means "no opinion": the host's base ACL resolution decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Access is granted by the policy layer.
    Grant,
    /// Access is denied. Sticky: nothing later in a chain can override it.
    Deny,
    /// The policy does not apply, or has no opinion.
    #[default]
    Unknown,
}

impl Decision {
    /// Folds the next decision into a running result.
    ///
    /// `Deny` is absorbing, `Grant` is recorded and kept unless a later
    /// `Deny` arrives, and `Unknown` leaves the running result unchanged.
    pub fn combine(self, next: Decision) -> Decision {
        match (self, next) {
            (Decision::Deny, _) | (_, Decision::Deny) => Decision::Deny,
            (Decision::Grant, _) | (_, Decision::Grant) => Decision::Grant,
            (Decision::Unknown, Decision::Unknown) => Decision::Unknown,
        }
    }

    pub fn is_grant(self) -> bool {
        matches!(self, Decision::Grant)
    }

    pub fn is_deny(self) -> bool {
        matches!(self, Decision::Deny)
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Decision::Unknown)
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Grant => "GRANT",
            Decision::Deny => "DENY",
            Decision::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Document accessor
// ============================================================================

/// Failure while reading a document property.
///
/// The engine never propagates these: the property is treated as absent and
/// the event is logged and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The document's schema does not define the property.
    #[error("unknown property '{path}'")]
    UnknownField { path: String },

    /// The property exists but holds a value of another type.
    #[error("property '{path}' holds a {found} value, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The underlying store failed while reading the property.
    #[error("failed to read property '{path}': {reason}")]
    Backend { path: String, reason: String },
}

/// Read-only view of a document, as exposed by the host repository.
///
/// Implementations must be immutable for the duration of a single check.
pub trait Document {
    /// Opaque document identifier (used for logging only).
    fn id(&self) -> &str;

    /// Primary type name, e.g. `File`.
    fn type_name(&self) -> &str;

    /// Current lifecycle state, if the document follows a lifecycle.
    fn lifecycle_state(&self) -> Option<&str>;

    /// Reads a property by its schema-qualified path, e.g. `dc:rights`.
    ///
    /// `Ok(None)` means the property is defined but empty.
    fn property(&self, path: &str) -> Result<Option<Value>, PropertyError>;
}

impl<D: Document + ?Sized> Document for &D {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn type_name(&self) -> &str {
        (**self).type_name()
    }

    fn lifecycle_state(&self) -> Option<&str> {
        (**self).lifecycle_state()
    }

    fn property(&self, path: &str) -> Result<Option<Value>, PropertyError> {
        (**self).property(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case(Decision::Unknown, Decision::Unknown, Decision::Unknown; "unknown stays unknown")]
    #[test_case(Decision::Unknown, Decision::Grant, Decision::Grant; "grant is recorded")]
    #[test_case(Decision::Grant, Decision::Unknown, Decision::Grant; "unknown keeps grant")]
    #[test_case(Decision::Grant, Decision::Deny, Decision::Deny; "later deny overrides grant")]
    #[test_case(Decision::Deny, Decision::Grant, Decision::Deny; "deny is sticky")]
    #[test_case(Decision::Deny, Decision::Unknown, Decision::Deny; "deny survives unknown")]
    fn test_combine(running: Decision, next: Decision, expected: Decision) {
        assert_eq!(running.combine(next), expected);
    }

    #[test]
    fn test_decision_default_is_unknown() {
        assert_eq!(Decision::default(), Decision::Unknown);
        assert_eq!(Decision::Deny.to_string(), "DENY");
    }

    #[test]
    fn test_value_accessors() {
        let text = Value::from("Yes");
        assert_eq!(text.as_text(), Some("Yes"));
        assert_eq!(text.as_date(), None);
        assert_eq!(text.kind(), "text");

        let when = Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap();
        let date = Value::from(when);
        assert_eq!(date.as_date(), Some(when));
        assert_eq!(date.as_text(), None);
        assert_eq!(date.kind(), "date");
    }

    #[test]
    fn test_value_serde_shape() {
        let json = serde_json::to_string(&Value::from("GROUP2")).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"GROUP2"}"#);

        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::from("GROUP2"));
    }

    proptest::proptest! {
        #[test]
        fn deny_absorbs_any_sequence(seq in proptest::collection::vec(0u8..3, 0..16)) {
            let decisions: Vec<Decision> = seq
                .iter()
                .map(|n| match n {
                    0 => Decision::Grant,
                    1 => Decision::Deny,
                    _ => Decision::Unknown,
                })
                .collect();

            let folded = decisions
                .iter()
                .fold(Decision::Unknown, |acc, d| acc.combine(*d));

            proptest::prop_assert_eq!(folded.is_deny(), decisions.contains(&Decision::Deny));
            if !folded.is_deny() {
                proptest::prop_assert_eq!(folded.is_grant(), decisions.contains(&Decision::Grant));
            }
        }
    }
}
