//! Record lifecycle states.
//!
//! Every record sits in exactly one state of its process graph. The full
//! state vocabulary is shared across processes; each process graph wires a
//! subset of it:
//!
//! ```text
//!  NO_PROCESSED ──> PENDING_VALIDATE ──> IN_PLANNING ──> IN_RESOLUTION
//!                        │                                    │
//!                        │              ┌─────────────────────┤
//!                        v              v                     v
//!                   PENDING_ANSWER ──> CLOSED        EXTERNAL_PROCESSING
//!                                        ^              │         ^
//!                                        │              v         │
//!                                        └──── EXTERNAL_RETURNED ─┘
//! ```
//!
//! (`CANCELLED` is reachable from every non-terminal state and omitted
//! above; `EXTERNAL_PROCESSING_EMAIL` closes directly with no return leg.)

use serde::{Deserialize, Serialize};

/// Lifecycle states a record can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    /// Filed but not admissible yet (required applicant data missing).
    NoProcessed,
    /// Waiting for intake validation. Nominal entry state of every process.
    PendingValidate,
    /// Work is being planned.
    InPlanning,
    /// Work is being resolved.
    InResolution,
    /// Resolved, waiting for the answer to the applicant.
    PendingAnswer,
    /// Handed to an external operator.
    ExternalProcessing,
    /// Handed to an external operator by email; closes without a return leg.
    ExternalProcessingEmail,
    /// Returned by the external operator, awaiting re-send or closure.
    ExternalReturned,
    /// Finished.
    Closed,
    /// Abandoned before finishing.
    Cancelled,
}

impl RecordState {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Returns true if the record currently sits with an external operator.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::ExternalProcessing | Self::ExternalProcessingEmail)
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoProcessed => "NO_PROCESSED",
            Self::PendingValidate => "PENDING_VALIDATE",
            Self::InPlanning => "IN_PLANNING",
            Self::InResolution => "IN_RESOLUTION",
            Self::PendingAnswer => "PENDING_ANSWER",
            Self::ExternalProcessing => "EXTERNAL_PROCESSING",
            Self::ExternalProcessingEmail => "EXTERNAL_PROCESSING_EMAIL",
            Self::ExternalReturned => "EXTERNAL_RETURNED",
            Self::Closed => "CLOSED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}
