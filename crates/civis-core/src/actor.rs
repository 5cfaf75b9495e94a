//! Principals acting on records.
//!
//! Every mutating operation records who performed it: a clerk working a
//! queue, a supervisor reassigning, or the system itself when a transition
//! fires automatically. History and audit rows store the actor verbatim,
//! so the identity here is the stable subject, not a session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved actor ID for operations performed by the system itself.
const SYSTEM_ACTOR_ID: &str = "system";

/// The principal performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Stable identifier of the principal (login or service name).
    pub id: String,

    /// Human-readable name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Actor {
    /// Creates an actor for a human user.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    /// Creates the system actor for automatic operations.
    #[must_use]
    pub fn system() -> Self {
        Self {
            id: SYSTEM_ACTOR_ID.to_string(),
            display_name: None,
        }
    }

    /// Attaches a display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Returns true if this is the system actor.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_ACTOR_ID
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// The organizational department stamped on a record at closing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Department(String);

impl Department {
    /// Creates a department from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the department name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
