//! Validated identifiers for lanes, parents and students.
//!
//! Validation happens at construction time, so once a value exists it is
//! always a well-formed id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum allowed length for any identifier.
const MAX_ID_LENGTH: usize = 128;

/// Prefix that lane ids share when rendered for people.
const LANE_PREFIX: &str = "lane-";

fn validate_id(kind: &str, s: &str) -> Result<()> {
    if s.trim().is_empty() {
        return Err(Error::validation(format!("{kind} cannot be empty")));
    }

    if s.chars().count() > MAX_ID_LENGTH {
        return Err(Error::validation(format!(
            "{kind} exceeds maximum length of {MAX_ID_LENGTH} characters"
        )));
    }

    let invalid: String = s
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != '-' && *c != '_')
        .collect();
    if !invalid.is_empty() {
        return Err(Error::validation(format!(
            "{kind} contains invalid characters: {invalid}"
        )));
    }

    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier.
            pub fn parse(s: impl Into<String>) -> Result<Self> {
                let s = s.into();
                validate_id($kind, &s)?;
                Ok(Self(s))
            }

            /// Get the ID as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(s: String) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Identity provider user id of a parent.
    ParentId,
    "parent id"
);

string_id!(
    /// Registry-assigned id of a student.
    StudentId,
    "student id"
);

/// A physical pickup lane, e.g. `lane-1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LaneId(String);

impl LaneId {
    /// Parse and validate a lane id. Lane ids are lowercase ASCII.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        validate_id("lane id", &s)?;
        if s.chars().any(|c| !c.is_ascii() || c.is_ascii_uppercase()) {
            return Err(Error::validation(format!(
                "lane id '{s}' must be lowercase ASCII"
            )));
        }
        Ok(Self(s))
    }

    /// Get the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable lane name: `lane-2` becomes `Lane 2`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.0
            .strip_prefix(LANE_PREFIX)
            .map_or_else(|| self.0.clone(), |rest| format!("Lane {rest}"))
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for LaneId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<LaneId> for String {
    fn from(id: LaneId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert!(ParentId::parse("uid_8f2a-11").is_ok());
        assert!(StudentId::parse("3c1e9d").is_ok());
        assert!(LaneId::parse("lane-1").is_ok());
    }

    #[test]
    fn test_parse_empty_is_invalid() {
        assert!(matches!(
            ParentId::parse("   "),
            Err(Error::ValidationFailed(_))
        ));
        assert!(LaneId::parse("").is_err());
    }

    #[test]
    fn test_parse_invalid_characters() {
        let result = StudentId::parse("a/b");
        assert!(matches!(result, Err(Error::ValidationFailed(msg)) if msg.contains('/')));
    }

    #[test]
    fn test_parse_too_long() {
        let long_id = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(ParentId::parse(long_id).is_err());
        assert!(ParentId::parse("a".repeat(MAX_ID_LENGTH)).is_ok());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        assert!(ParentId::parse("é".repeat(MAX_ID_LENGTH)).is_ok());
        assert!(ParentId::parse("é".repeat(MAX_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_lane_id_rejects_uppercase() {
        assert!(LaneId::parse("Lane-1").is_err());
    }

    #[test]
    fn test_lane_display_name() -> Result<()> {
        assert_eq!(LaneId::parse("lane-3")?.display_name(), "Lane 3");
        assert_eq!(LaneId::parse("gate_b")?.display_name(), "gate_b");
        Ok(())
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: std::result::Result<LaneId, _> = serde_json::from_str("\"lane-2\"");
        assert!(ok.is_ok());
        let bad: std::result::Result<LaneId, _> = serde_json::from_str("\"lane 2\"");
        assert!(bad.is_err());
    }
}
