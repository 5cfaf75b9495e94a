//! Strongly-typed identifiers for civis entities.
//!
//! All generated identifiers in civis are:
//! - **Strongly typed**: Prevents mixing up different ID types at compile time
//! - **Lexicographically sortable**: ULIDs encode creation time and sort naturally
//! - **Globally unique**: No coordination required for generation
//!
//! District codes are the exception: municipal districts are a small fixed
//! set maintained as configuration, so [`DistrictId`] wraps the stable
//! numeric code instead of a generated ULID.
//!
//! # Example
//!
//! ```rust
//! use civis_core::id::{GroupId, RecordId};
//!
//! let record = RecordId::generate();
//! let group = GroupId::generate();
//!
//! // IDs are different types - this won't compile:
//! // let wrong: RecordId = group;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

/// A unique identifier for a case record.
///
/// Records are the primary unit of work: a citizen request, incident
/// report, or service demand moving through a processing graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Ulid);

impl RecordId {
    /// Generates a new unique record ID.
    ///
    /// Uses ULID generation which is:
    /// - Lexicographically sortable by creation time
    /// - Globally unique without coordination
    /// - URL-safe and case-insensitive
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a record ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// Returns the creation timestamp encoded in the ID.
    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        let ms = self.0.timestamp_ms();
        chrono::DateTime::from_timestamp_millis(ms as i64).unwrap_or_else(chrono::Utc::now)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid record ID '{s}': {e}"),
            })
    }
}

/// A unique identifier for an organizational group.
///
/// Groups form the responsibility tree: every record is assigned to
/// exactly one group at a time, and derivation rules route records
/// between groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Ulid);

impl GroupId {
    /// Generates a new unique group ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a group ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid group ID '{s}': {e}"),
            })
    }
}

/// A unique identifier for a theme.
///
/// Themes classify what a record is about (noise complaint, pothole,
/// license request). The theme fixes the processing graph at creation
/// time and keys the routing rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeId(Ulid);

impl ThemeId {
    /// Generates a new unique theme ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a theme ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ThemeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid theme ID '{s}': {e}"),
            })
    }
}

/// A unique identifier for a workflow bundle.
///
/// Records created together from a single multi-part request share a
/// workflow ID; reassignments cascade across the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(Ulid);

impl WorkflowId {
    /// Generates a new unique workflow ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a workflow ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkflowId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid workflow ID '{s}': {e}"),
            })
    }
}

/// A unique identifier for a state history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(Ulid);

impl HistoryId {
    /// Generates a new unique history entry ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a history entry ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HistoryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid history ID '{s}': {e}"),
            })
    }
}

/// A unique identifier for a reassignment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReassignmentId(Ulid);

impl ReassignmentId {
    /// Generates a new unique reassignment entry ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a reassignment entry ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for ReassignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReassignmentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid reassignment ID '{s}': {e}"),
            })
    }
}

/// A municipal district code.
///
/// Districts are a small, stable set of geographic divisions maintained
/// as configuration. The numeric code is the identifier used by the
/// per-district routing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictId(u16);

impl DistrictId {
    /// Creates a district ID from its numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric district code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for DistrictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DistrictId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u16>().map(Self).map_err(|e| Error::InvalidId {
            message: format!("invalid district code '{s}': {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_roundtrip() {
        let id = RecordId::generate();
        let s = id.to_string();
        let parsed: RecordId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn group_id_roundtrip() {
        let id = GroupId::generate();
        let s = id.to_string();
        let parsed: GroupId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_are_unique() {
        let id1 = RecordId::generate();
        let id2 = RecordId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn invalid_id_returns_error() {
        let result: Result<RecordId> = "not-a-valid-ulid".parse();
        assert!(result.is_err());
    }

    #[test]
    fn district_code_roundtrip() {
        let district = DistrictId::new(7);
        assert_eq!(district.to_string(), "7");
        let parsed: DistrictId = "7".parse().unwrap();
        assert_eq!(district, parsed);
    }

    #[test]
    fn invalid_district_code_returns_error() {
        let result: Result<DistrictId> = "seventh".parse();
        assert!(result.is_err());
    }
}
