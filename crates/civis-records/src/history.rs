//! Append-only trails: state history and reassignment rows.
//!
//! Every lifecycle operation leaves exactly one state history row, and
//! every change of responsible group leaves exactly one reassignment
//! row. The rows are immutable once committed; the store appends them
//! in the same batch as the record snapshot they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use civis_core::actor::Actor;
use civis_core::id::{GroupId, HistoryId, ReassignmentId, RecordId};
use civis_flow::state::RecordState;

/// Why a record changed responsible group.
///
/// The same reasons the derivation engine distinguishes; rows written
/// by manual reassignment carry [`ReassignmentReason::ManualReassignment`].
pub use civis_routing::rule::DerivationReason as ReassignmentReason;

/// One step of a record's state trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateHistoryEntry {
    /// Unique identifier.
    pub id: HistoryId,

    /// The record this row belongs to.
    pub record: RecordId,

    /// State before the change. Absent on the creation row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<RecordState>,

    /// State after the change.
    pub next_state: RecordState,

    /// Who triggered the change.
    pub actor: Actor,

    /// Responsible group after the change, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,

    /// True when the change was made by the system rather than an
    /// operator decision (diverted answers, scheduled moves).
    pub automatic: bool,

    /// Free-text note attached to the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// When the change happened.
    pub created_at: DateTime<Utc>,
}

impl StateHistoryEntry {
    /// Builds the creation row: no previous state.
    #[must_use]
    pub fn creation(
        record: RecordId,
        state: RecordState,
        actor: Actor,
        group: Option<GroupId>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryId::generate(),
            record,
            previous_state: None,
            next_state: state,
            actor,
            group,
            automatic: false,
            comment,
            created_at: now,
        }
    }

    /// Builds a transition row.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn transition(
        record: RecordId,
        previous_state: RecordState,
        next_state: RecordState,
        actor: Actor,
        group: Option<GroupId>,
        automatic: bool,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryId::generate(),
            record,
            previous_state: Some(previous_state),
            next_state,
            actor,
            group,
            automatic,
            comment,
            created_at: now,
        }
    }
}

/// One change of responsible group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reassignment {
    /// Unique identifier.
    pub id: ReassignmentId,

    /// The record that changed hands.
    pub record: RecordId,

    /// Group before the change. Absent when this is the first
    /// assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_group: Option<GroupId>,

    /// Group after the change.
    pub next_group: GroupId,

    /// Why the record changed hands.
    pub reason: ReassignmentReason,

    /// The reason the operator gave, verbatim. Only manual rows
    /// carry one; engine-written rows leave it empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stated_reason: Option<String>,

    /// Who triggered the change.
    pub actor: Actor,

    /// Free-text note attached to the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// When the change happened.
    pub created_at: DateTime<Utc>,
}

impl Reassignment {
    /// Builds a reassignment row.
    #[must_use]
    pub fn new(
        record: RecordId,
        previous_group: Option<GroupId>,
        next_group: GroupId,
        reason: ReassignmentReason,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReassignmentId::generate(),
            record,
            previous_group,
            next_group,
            reason,
            stated_reason: None,
            actor,
            comment: None,
            created_at: now,
        }
    }

    /// Attaches the operator's stated reason.
    #[must_use]
    pub fn with_stated_reason(mut self, reason: impl Into<String>) -> Self {
        self.stated_reason = Some(reason.into());
        self
    }

    /// Attaches a free-text note.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
