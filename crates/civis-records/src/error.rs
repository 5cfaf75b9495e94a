//! Error types for the record lifecycle domain.

/// The result type used throughout civis-records.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in record lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A process graph refused the operation or is misconfigured.
    #[error(transparent)]
    Flow(#[from] civis_flow::error::Error),

    /// The derivation engine could not consult its rule tables.
    ///
    /// Lifecycle operations degrade to the error group instead of
    /// propagating this; it only surfaces from explicit dry-run
    /// derivation calls.
    #[error(transparent)]
    Routing(#[from] civis_routing::error::Error),

    /// The request is well-formed but not permitted.
    #[error("validation failed: {reason}")]
    Validation {
        /// Why the request was refused.
        reason: String,
    },

    /// The record is in a state that conflicts with the request.
    #[error("conflict: {reason}")]
    Conflict {
        /// Why the current state refuses the request.
        reason: String,
    },

    /// The record store failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error from civis-core.
    #[error(transparent)]
    Core(#[from] civis_core::error::Error),
}

impl Error {
    /// Creates a new validation error.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Creates a new conflict error.
    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Creates a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with an underlying cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a not-found error for the given entity.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::Core(civis_core::error::Error::not_found(entity, id))
    }

    /// Returns true if this error indicates infrastructure failure
    /// rather than a refusable request.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Storage { .. } | Self::Routing(_) => true,
            Self::Flow(civis_flow::error::Error::Configuration { .. }) => true,
            Self::Core(core) => matches!(
                core,
                civis_core::error::Error::Storage { .. }
                    | civis_core::error::Error::Internal { .. }
            ),
            _ => false,
        }
    }

    /// Returns the reason suitable for showing to the requesting user,
    /// when the error is a refusal rather than a failure.
    #[must_use]
    pub fn user_reason(&self) -> Option<String> {
        match self {
            Self::Validation { reason } | Self::Conflict { reason } => Some(reason.clone()),
            Self::Flow(civis_flow::error::Error::IllegalTransition { from, to, reason }) => {
                Some(format!("cannot move from {from} to {to}: {reason}"))
            }
            _ => None,
        }
    }
}
