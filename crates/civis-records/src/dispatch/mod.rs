//! Outbound notifications for lifecycle events.
//!
//! The lifecycle announces reassignments, claims and closures to
//! whatever delivery machinery the deployment wires in (mail queues,
//! webhooks, in-app inboxes). Dispatch is best-effort by contract:
//! the service commits its batch first and never rolls back a record
//! because a notification failed.
//!
//! Two dispatchers ship with the crate:
//! - [`TracingDispatcher`] logs each notification, the no-infra default
//! - [`memory::InMemoryDispatcher`] captures notifications for tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use civis_core::id::{GroupId, RecordId};

use crate::code::RecordCode;
use crate::error::Result;

pub mod memory;

pub use memory::InMemoryDispatcher;

/// A lifecycle event worth announcing outside the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Notification {
    /// A record changed responsible group.
    RecordReassigned {
        /// The record that changed hands.
        record: RecordId,
        /// Its public code.
        code: RecordCode,
        /// Group before the change, when it had one.
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_group: Option<GroupId>,
        /// Group after the change.
        next_group: GroupId,
    },

    /// A claim was opened against a closed record.
    ClaimCreated {
        /// The new claim record.
        claim: RecordId,
        /// The claim's public code, ticket included.
        code: RecordCode,
        /// The record the claim contests.
        source: RecordId,
    },

    /// A record reached a terminal state.
    RecordClosed {
        /// The record that closed.
        record: RecordId,
        /// Its public code.
        code: RecordCode,
        /// Group responsible at closure, when assigned.
        #[serde(skip_serializing_if = "Option::is_none")]
        group: Option<GroupId>,
    },
}

impl Notification {
    /// The record the notification concerns.
    #[must_use]
    pub const fn record_id(&self) -> RecordId {
        match self {
            Self::RecordReassigned { record, .. } | Self::RecordClosed { record, .. } => *record,
            Self::ClaimCreated { claim, .. } => *claim,
        }
    }

    /// Stable name for logs and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RecordReassigned { .. } => "record_reassigned",
            Self::ClaimCreated { .. } => "claim_created",
            Self::RecordClosed { .. } => "record_closed",
        }
    }
}

/// Seam between the lifecycle and notification delivery.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Hands one notification to the delivery machinery.
    ///
    /// # Errors
    ///
    /// Returns an error when the notification could not be handed
    /// over. Callers log and continue; delivery failures never undo
    /// lifecycle writes.
    async fn dispatch(&self, notification: Notification) -> Result<()>;
}

/// Dispatcher that logs each notification and delivers nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<()> {
        tracing::info!(
            kind = notification.kind(),
            record_id = %notification.record_id(),
            "lifecycle notification"
        );
        Ok(())
    }
}
