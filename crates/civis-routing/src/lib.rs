//! # civis-routing
//!
//! Responsible-group derivation for the civis case-record lifecycle engine.
//!
//! This crate implements the routing domain, providing:
//!
//! - **Routing Rules**: Theme/state keyed assignments, city-wide or
//!   district-qualified
//! - **Rule Store**: The lookup seam, with an in-memory implementation
//! - **Derivation Engine**: Fixed-precedence computation of the next
//!   responsible group
//!
//! ## Precedence
//!
//! Direct rules (city-wide) always beat district rules. When neither
//! matches, the answer is "keep the current group" — an explicit `None`,
//! never a guess.
//!
//! ## Failure Posture
//!
//! Lookup failures surface as `Err`; the engine never silently falls back.
//! The record lifecycle owns degradation: it assigns the configured error
//! group and records that it did so.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use civis_core::id::{GroupId, ThemeId};
//! use civis_flow::state::RecordState;
//! use civis_routing::engine::DerivationEngine;
//! use civis_routing::rule::{DerivationReason, DerivationRequest, RoutingRule};
//! use civis_routing::store::InMemoryRuleStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> civis_routing::error::Result<()> {
//! let theme = ThemeId::generate();
//! let cleaning = GroupId::generate();
//!
//! let store = InMemoryRuleStore::with_rules(vec![RoutingRule::direct(
//!     theme,
//!     RecordState::PendingValidate,
//!     cleaning,
//! )]);
//! let engine = DerivationEngine::new(Arc::new(store), GroupId::generate());
//!
//! let req = DerivationRequest::new(
//!     theme,
//!     RecordState::PendingValidate,
//!     DerivationReason::InitialAssignation,
//! );
//! let outcome = engine.derive(&req).await?;
//! assert_eq!(outcome.map(|d| d.group), Some(cleaning));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod error;
pub mod rule;
pub mod store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::engine::DerivationEngine;
    pub use crate::error::{Error, Result};
    pub use crate::rule::{
        Derivation, DerivationReason, DerivationRequest, RoutingRule, RuleKind,
    };
    pub use crate::store::{InMemoryRuleStore, RuleStore};
}

// Re-export key types at crate root for ergonomics
pub use engine::DerivationEngine;
pub use error::{Error, Result};
pub use rule::{Derivation, DerivationReason, DerivationRequest, RoutingRule, RuleKind};
pub use store::{InMemoryRuleStore, RuleStore};
