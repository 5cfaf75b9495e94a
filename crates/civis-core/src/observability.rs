//! Observability infrastructure for civis.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors for consistent
//! observability across all civis components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `civis_records=debug`)
///
/// # Example
///
/// ```rust
/// use civis_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for record lifecycle operations with standard fields.
///
/// # Example
///
/// ```rust
/// use civis_core::observability::record_span;
///
/// let span = record_span("apply_transition", "01J8ZK4YJ0S6TVJ5Q2M9W4R7FX");
/// let _guard = span.enter();
/// // ... do lifecycle operation
/// ```
#[must_use]
pub fn record_span(operation: &str, record_id: &str) -> Span {
    tracing::info_span!(
        "record",
        op = operation,
        record_id = record_id,
    )
}

/// Creates a span for routing operations.
///
/// # Example
///
/// ```rust
/// use civis_core::observability::routing_span;
///
/// let span = routing_span("derive", "01J8ZK4YJ0S6TVJ5Q2M9W4R7FX", "IN_RESOLUTION");
/// let _guard = span.enter();
/// // ... do routing lookup
/// ```
#[must_use]
pub fn routing_span(operation: &str, theme: &str, state: &str) -> Span {
    tracing::info_span!(
        "routing",
        op = operation,
        theme = theme,
        state = state,
    )
}
