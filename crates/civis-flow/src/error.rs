//! Error types for the process state machine domain.

/// The result type used throughout civis-flow.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in process graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The process configuration is inconsistent.
    ///
    /// Raised at registry build time, or at lookup time when a record sits
    /// on a (process, state) pair the graph does not define. Never mapped
    /// to a user-facing refusal: a record in an undefined step is broken
    /// configuration, not a bad request.
    #[error("process configuration error: {message}")]
    Configuration {
        /// Description of the inconsistency.
        message: String,
    },

    /// A transition was requested that the graph does not allow.
    #[error("illegal transition: {from} -> {to} ({reason})")]
    IllegalTransition {
        /// The current state.
        from: String,
        /// The requested target state.
        to: String,
        /// The reason the transition is refused.
        reason: String,
    },

    /// An error from civis-core.
    #[error("core error: {0}")]
    Core(#[from] civis_core::error::Error),
}

impl Error {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new illegal transition error.
    #[must_use]
    pub fn illegal_transition(
        from: impl ToString,
        to: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let err = Error::configuration("no step for state IN_PLANNING");
        assert!(err.to_string().contains("configuration"));
        assert!(err.to_string().contains("IN_PLANNING"));
    }

    #[test]
    fn illegal_transition_error_display() {
        let err = Error::illegal_transition("PENDING_VALIDATE", "CLOSED", "no such transition");
        let msg = err.to_string();
        assert!(msg.contains("PENDING_VALIDATE"));
        assert!(msg.contains("CLOSED"));
        assert!(msg.contains("no such transition"));
    }
}
