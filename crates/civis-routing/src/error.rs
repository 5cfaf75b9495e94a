//! Error types for routing-rule lookup and derivation.

/// The result type used throughout civis-routing.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during rule lookup and derivation.
///
/// The engine reports failures instead of swallowing them; the record
/// lifecycle decides how to degrade (it substitutes the configured error
/// group and records the degradation).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rule lookup against the backing store failed.
    #[error("rule lookup failed: {message}")]
    Lookup {
        /// Description of the lookup failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new lookup error with the given message.
    #[must_use]
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new lookup error with a source cause.
    #[must_use]
    pub fn lookup_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Lookup {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
