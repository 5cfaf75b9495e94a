//! Process kinds.
//!
//! A process names the shape of the graph a record moves through. It is
//! fixed at record creation by the theme and never changes afterwards;
//! claims inherit the process of the record they contest.

use serde::{Deserialize, Serialize};

/// The nine processing graph kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Process {
    /// Validated and closed in one step.
    ClosedDirectly,
    /// Answered directly after validation.
    Response,
    /// Resolved, then answered.
    ResolutionResponse,
    /// Planned, resolved, then answered.
    PlanningResolutionResponse,
    /// Evaluated in planning, resolved, then answered.
    EvaluationResolutionResponse,
    /// Handed to an external operator after validation.
    ExternalProcessing,
    /// Handed to an external operator by email after validation.
    ExternalProcessingEmail,
    /// Resolved, then handed to an external operator.
    ResolutionExternalProcessing,
    /// Resolved, then handed to an external operator by email.
    ResolutionExternalProcessingEmail,
}

impl Process {
    /// All process kinds, in registry order.
    pub const ALL: [Process; 9] = [
        Process::ClosedDirectly,
        Process::Response,
        Process::ResolutionResponse,
        Process::PlanningResolutionResponse,
        Process::EvaluationResolutionResponse,
        Process::ExternalProcessing,
        Process::ExternalProcessingEmail,
        Process::ResolutionExternalProcessing,
        Process::ResolutionExternalProcessingEmail,
    ];

    /// Returns true if the process hands records to an external operator.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ExternalProcessing
                | Self::ExternalProcessingEmail
                | Self::ResolutionExternalProcessing
                | Self::ResolutionExternalProcessingEmail
        )
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ClosedDirectly => "CLOSED_DIRECTLY",
            Self::Response => "RESPONSE",
            Self::ResolutionResponse => "RESOLUTION_RESPONSE",
            Self::PlanningResolutionResponse => "PLANNING_RESOLUTION_RESPONSE",
            Self::EvaluationResolutionResponse => "EVALUATION_RESOLUTION_RESPONSE",
            Self::ExternalProcessing => "EXTERNAL_PROCESSING",
            Self::ExternalProcessingEmail => "EXTERNAL_PROCESSING_EMAIL",
            Self::ResolutionExternalProcessing => "RESOLUTION_EXTERNAL_PROCESSING",
            Self::ResolutionExternalProcessingEmail => "RESOLUTION_EXTERNAL_PROCESSING_EMAIL",
        };
        write!(f, "{s}")
    }
}
