//! # civis-records
//!
//! The case-record lifecycle for the civis engine.
//!
//! This crate implements the record domain, providing:
//!
//! - **Records**: The case aggregate — code, theme, state, responsible
//!   group, responder configuration, alarms and claim linkage
//! - **Lifecycle Service**: Creation, state transitions, claims and
//!   reassignment, each committed as one atomic batch with exactly one
//!   history row
//! - **Claims**: Closure disputes that join the source record's family
//!   under ticketed codes (`-02`, `-03`, ...)
//! - **Record Store**: The persistence seam, with an in-memory
//!   implementation
//! - **Edit Locks**: TTL-based soft locks for interactive edit sessions
//!
//! ## Decision Order
//!
//! A transition is decided in a fixed order: legality against the process
//! graph, the actor's capability, the target's entry handler (which may
//! divert an unanswerable record straight to `CLOSED`), closing stamps,
//! and finally routing. Refusals leave no trace on the record beyond an
//! audit event.
//!
//! ## Failure Posture
//!
//! Routing failures never abort a lifecycle operation: the record is
//! parked on the configured error group and the degradation is audited.
//! Only explicit dry-run derivations surface the failure to the caller.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use civis_core::actor::Actor;
//! use civis_core::audit::AuditEmitter;
//! use civis_core::group::GroupTree;
//! use civis_core::id::{GroupId, ThemeId};
//! use civis_core::permission::AllowAll;
//! use civis_flow::process::Process;
//! use civis_flow::registry::ProcessRegistry;
//! use civis_flow::state::RecordState;
//! use civis_routing::engine::DerivationEngine;
//! use civis_routing::rule::RoutingRule;
//! use civis_routing::store::InMemoryRuleStore;
//!
//! use civis_records::config::LifecycleConfig;
//! use civis_records::dispatch::TracingDispatcher;
//! use civis_records::record::{InputChannel, NewRecord, Theme};
//! use civis_records::service::RecordService;
//! use civis_records::store::InMemoryRecordStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> civis_records::error::Result<()> {
//! let theme = Theme {
//!     id: ThemeId::generate(),
//!     name: "Broken swing".to_string(),
//!     process: Process::ResolutionResponse,
//!     requires_applicant: false,
//! };
//! let intake = GroupId::generate();
//! let errors = GroupId::generate();
//! let groups = GroupTree::builder()
//!     .add_ambit(intake, "Central Intake", None)
//!     .add(errors, "Routing Errors", Some(intake))
//!     .build()?;
//!
//! let rules = InMemoryRuleStore::with_rules(vec![RoutingRule::direct(
//!     theme.id,
//!     RecordState::PendingValidate,
//!     intake,
//! )]);
//!
//! let service = RecordService::new(
//!     Arc::new(ProcessRegistry::builtin()?),
//!     DerivationEngine::new(Arc::new(rules), errors),
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(groups),
//!     Arc::new(AllowAll),
//!     Arc::new(TracingDispatcher),
//!     AuditEmitter::with_tracing(),
//!     LifecycleConfig::default(),
//! );
//!
//! let record = service
//!     .create_record(
//!         NewRecord {
//!             theme,
//!             code: "PARKS-2026-0107".parse()?,
//!             district: None,
//!             applicant: Some("ciu-2210".to_string()),
//!             input_channel: InputChannel::Web,
//!             response_config: None,
//!             features: Vec::new(),
//!             description: Some("chains snapped on the east swing".to_string()),
//!             workflow: None,
//!             multirecord_from: None,
//!             similar_to: None,
//!         },
//!         &Actor::user("clerk.munoz"),
//!     )
//!     .await?;
//!
//! assert_eq!(record.state, RecordState::PendingValidate);
//! assert_eq!(record.responsible_group, Some(intake));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod claim;
pub mod code;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod lock;
pub mod metrics;
pub mod record;
pub mod service;
pub mod store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::claim::{ClaimKind, ClaimOptions};
    pub use crate::code::RecordCode;
    pub use crate::config::LifecycleConfig;
    pub use crate::dispatch::{InMemoryDispatcher, Notification, NotificationDispatcher};
    pub use crate::error::{Error, Result};
    pub use crate::history::{Reassignment, ReassignmentReason, StateHistoryEntry};
    pub use crate::lock::{LockInfo, RecordLocks};
    pub use crate::record::{NewRecord, Record, Theme};
    pub use crate::service::{
        CheckOutcome, DeriveMode, ReassignmentCommand, RecordService, TransitionCommand,
        TransitionOutcome,
    };
    pub use crate::store::{InMemoryRecordStore, RecordStore};
}

// Re-export key types at crate root for ergonomics
pub use claim::{ClaimKind, ClaimOptions};
pub use code::RecordCode;
pub use config::LifecycleConfig;
pub use error::{Error, Result};
pub use record::{NewRecord, Record, Theme};
pub use service::{
    CheckOutcome, DeriveMode, ReassignmentCommand, RecordService, TransitionCommand,
    TransitionOutcome,
};
pub use store::{InMemoryRecordStore, RecordStore};
