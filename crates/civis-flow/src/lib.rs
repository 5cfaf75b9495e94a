//! # civis-flow
//!
//! Process state machines for the civis case-record lifecycle engine.
//!
//! This crate implements the flow domain, providing:
//!
//! - **Record States**: The closed set of lifecycle states a record moves through
//! - **Processes**: The nine shipped handling procedures, one graph each
//! - **Steps and Transitions**: Per-state legal moves, capability gates, and
//!   entry handlers
//! - **Process Registry**: Immutable, build-time-validated lookup for every
//!   flow decision
//!
//! ## Core Concepts
//!
//! - **Ideal path**: The nominal route from the entry state to `CLOSED`,
//!   precomputed at build time; "what happens next" questions read it
//! - **Transition**: One legal move between two declared states, optionally
//!   gated on a [`civis_core::permission::Capability`]
//! - **Handler**: How the target step reacts on entry; almost every step uses
//!   the generic handler, answer-delivery steps use the answer-aware one
//!
//! ## Guarantees
//!
//! - **Immutable**: Graphs never change after [`registry::ProcessRegistry`]
//!   construction
//! - **Validated**: Inconsistent graphs (dangling targets, ideal cycles,
//!   missing entries) fail at build time, not mid-lifecycle
//! - **Closed**: Every declared state reaches a terminal state
//!
//! ## Example
//!
//! ```rust
//! use civis_flow::prelude::*;
//!
//! # fn main() -> civis_flow::error::Result<()> {
//! let registry = ProcessRegistry::builtin()?;
//!
//! // The planning procedure runs validate -> plan -> resolute -> answer.
//! let path = registry.ideal_path(Process::PlanningResolutionResponse)?;
//! assert_eq!(path.first(), Some(&RecordState::PendingValidate));
//! assert_eq!(path.last(), Some(&RecordState::Closed));
//!
//! // Cancellation is always on the table before a terminal state.
//! assert!(registry.is_legal(
//!     Process::PlanningResolutionResponse,
//!     RecordState::InResolution,
//!     RecordState::Cancelled,
//! ));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod process;
pub mod registry;
pub mod state;
pub mod step;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::process::Process;
    pub use crate::registry::{ProcessGraph, ProcessRegistry};
    pub use crate::state::RecordState;
    pub use crate::step::{
        StepDescriptor, TransitionAction, TransitionDescriptor, TransitionHandler,
        TransitionOffer,
    };
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use process::Process;
pub use registry::{ProcessGraph, ProcessRegistry};
pub use state::RecordState;
pub use step::{
    GraphSpec, StepDescriptor, StepSpec, TransitionAction, TransitionDescriptor,
    TransitionHandler, TransitionOffer, TransitionSpec,
};
