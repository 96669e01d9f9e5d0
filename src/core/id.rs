//! Operation identifiers.
//!
//! Identifiers have the shape `<prefix>_<8 hex>_<unix seconds>`. The hex part
//! carries 32 random bits; the suffix makes identifiers sort roughly by
//! creation time. Uniqueness is finally enforced by the registry, which
//! regenerates on the rare collision.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, immutable operation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the suffix, if the identifier is well formed.
    #[must_use]
    pub fn unix_seconds(&self) -> Option<i64> {
        self.0.rsplit('_').next()?.parse().ok()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Generates operation identifiers. Stateless apart from the prefix, so it
/// is safe to share across concurrent submissions.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
}

impl IdGenerator {
    /// Create a generator for the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Prefix placed in front of every identifier.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Produce a fresh identifier stamped with `now`.
    #[must_use]
    pub fn next_id(&self, now: DateTime<Utc>) -> OperationId {
        let random = Uuid::new_v4().simple().to_string();
        OperationId(format!("{}_{}_{}", self.prefix, &random[..8], now.timestamp()))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("bulk_email")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_identifier_shape() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let id = IdGenerator::new("bulk_email").next_id(now);

        let text = id.as_str();
        assert!(text.starts_with("bulk_email_"));
        assert!(text.ends_with("_1700000000"));

        let hex = &text["bulk_email_".len().."bulk_email_".len() + 8];
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id.unix_seconds(), Some(1_700_000_000));
    }

    #[test]
    fn test_identifiers_differ_within_one_second() {
        let now = Utc::now();
        let ids = IdGenerator::default();
        let seen: HashSet<_> = (0..1_000).map(|_| ids.next_id(now)).collect();
        // 32 random bits make a collision among 1k draws vanishingly unlikely.
        assert!(seen.len() >= 999);
    }

    #[test]
    fn test_malformed_identifier_has_no_timestamp() {
        assert_eq!(OperationId::from("not-an-id").unix_seconds(), None);
    }
}
