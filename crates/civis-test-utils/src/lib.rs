//! Shared test utilities for lifecycle integration tests.
//!
//! This crate provides:
//! - [`TestContext`]: a fully wired [`civis_records::service::RecordService`]
//!   over in-memory collaborators
//! - [`municipal_tree`]: a small group hierarchy with distinct ambits
//! - Factory types for themes and records
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use civis_test_utils::{RecordFactory, TestContext, ThemeFactory, assert_assigned_to};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     let theme = ThemeFactory::resolution_response();
//!     // ... run test ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("civis=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
