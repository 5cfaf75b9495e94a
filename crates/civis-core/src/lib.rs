//! # civis-core
//!
//! Core abstractions for the civis case-record lifecycle engine.
//!
//! This crate provides the foundational types and traits used across all
//! civis components:
//!
//! - **Identifiers**: Strongly-typed IDs for records, groups, themes, and workflows
//! - **Groups and Ambits**: The responsibility tree with materialized ancestry plates
//! - **Actors and Capabilities**: Principals and the permission seam
//! - **Audit**: Lifecycle decision events and sinks
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `civis-core` is the **only** crate allowed to define shared primitives.
//! All cross-component interaction happens via the contracts defined here.
//!
//! ## Example
//!
//! ```rust
//! use civis_core::prelude::*;
//!
//! // Generate a unique record ID
//! let record_id = RecordId::generate();
//!
//! // Build a two-group responsibility tree
//! let city = GroupId::generate();
//! let parks = GroupId::generate();
//! let tree = GroupTree::builder()
//!     .add(city, "City Hall", None)
//!     .add(parks, "Parks and Gardens", Some(city))
//!     .build()
//!     .unwrap();
//! assert!(tree.is_within(parks, city));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod actor;
pub mod audit;
pub mod error;
pub mod group;
pub mod id;
pub mod observability;
pub mod permission;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use civis_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::actor::{Actor, Department};
    pub use crate::audit::{AuditAction, AuditEmitter, AuditEvent, AuditSink};
    pub use crate::error::{Error, Result};
    pub use crate::group::{Group, GroupTree, Plate};
    pub use crate::id::{
        DistrictId, GroupId, HistoryId, ReassignmentId, RecordId, ThemeId, WorkflowId,
    };
    pub use crate::permission::{AllowAll, Capability, CapabilitySet, PermissionChecker};
}

// Re-export key types at crate root for ergonomics
pub use actor::{Actor, Department};
pub use audit::{AuditAction, AuditEmitter, AuditEvent, AuditSink, TestAuditSink, TracingAuditSink};
pub use error::{Error, Result};
pub use group::{Group, GroupTree, Plate};
pub use id::{DistrictId, GroupId, HistoryId, ReassignmentId, RecordId, ThemeId, WorkflowId};
pub use observability::{init_logging, LogFormat};
pub use permission::{AllowAll, Capability, CapabilitySet, PermissionChecker, StaticPermissions};
