//! Persistence seam for records and their trails.
//!
//! The lifecycle never writes a record alone: every operation commits
//! the record snapshot together with its history row and, when the
//! group changed, its reassignment row. The [`RecordStore`] trait
//! therefore takes whole batches, and an implementation commits each
//! batch atomically or not at all.
//!
//! [`memory::InMemoryRecordStore`] is the in-process implementation
//! used by tests and embedded deployments; database-backed stores live
//! outside this crate.

use async_trait::async_trait;

use civis_core::id::{RecordId, WorkflowId};

use crate::code::RecordCode;
use crate::error::Result;
use crate::history::{Reassignment, StateHistoryEntry};
use crate::record::Record;

pub mod memory;

pub use memory::InMemoryRecordStore;

/// Everything written when a record is created.
#[derive(Debug, Clone)]
pub struct NewRecordBatch {
    /// The new record.
    pub record: Record,
    /// Its creation history row.
    pub history: StateHistoryEntry,
    /// The initial assignment row, when routing found a group.
    pub reassignment: Option<Reassignment>,
}

/// Everything written when a record transitions.
#[derive(Debug, Clone)]
pub struct TransitionBatch {
    /// The record after the transition.
    pub record: Record,
    /// The transition history row.
    pub history: StateHistoryEntry,
    /// The reassignment row, when the transition changed the group.
    pub reassignment: Option<Reassignment>,
}

/// Everything written when a claim is opened.
///
/// `synchronized` lists the other family members whose claim count is
/// stamped to `claims_number`; the claim and the updated source travel
/// as full snapshots and are not repeated in the list.
#[derive(Debug, Clone)]
pub struct ClaimBatch {
    /// The new claim record.
    pub claim: Record,
    /// The contested record, with its claim count and alarms updated.
    pub source: Record,
    /// The claim's creation history row.
    pub history: StateHistoryEntry,
    /// The claim's assignment row, when routing found a group.
    pub reassignment: Option<Reassignment>,
    /// The claim count every family member ends up with.
    pub claims_number: u32,
    /// Other family members to stamp with `claims_number`.
    pub synchronized: Vec<RecordId>,
}

/// One record's share of a reassignment commit.
#[derive(Debug, Clone)]
pub struct ReassignmentUpdate {
    /// The record after the group change.
    pub record: Record,
    /// Its reassignment row.
    pub reassignment: Reassignment,
}

/// Everything written when records change group by request.
///
/// Carries one update per affected record; a workflow bundle moves as
/// a single batch.
#[derive(Debug, Clone)]
pub struct ReassignmentBatch {
    /// The affected records and their rows.
    pub updates: Vec<ReassignmentUpdate>,
}

/// Seam between the lifecycle and record persistence.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads a record by id.
    async fn get(&self, id: RecordId) -> Result<Option<Record>>;

    /// Loads a record by its public code.
    async fn get_by_code(&self, code: &RecordCode) -> Result<Option<Record>>;

    /// Loads every record of a family (root and claims), root first,
    /// then claims in ticket order.
    async fn family(&self, base: &str) -> Result<Vec<Record>>;

    /// Loads every record in a workflow bundle, oldest first.
    async fn in_workflow(&self, workflow: WorkflowId) -> Result<Vec<Record>>;

    /// Loads a record's state trail, oldest first.
    async fn history_of(&self, id: RecordId) -> Result<Vec<StateHistoryEntry>>;

    /// Loads a record's reassignment trail, oldest first.
    async fn reassignments_of(&self, id: RecordId) -> Result<Vec<Reassignment>>;

    /// Commits a record creation.
    async fn create(&self, batch: NewRecordBatch) -> Result<()>;

    /// Commits a transition.
    async fn commit_transition(&self, batch: TransitionBatch) -> Result<()>;

    /// Commits a claim, its source update and the family claim-count
    /// synchronization.
    async fn commit_claim(&self, batch: ClaimBatch) -> Result<()>;

    /// Commits a reassignment across every affected record.
    async fn commit_reassignment(&self, batch: ReassignmentBatch) -> Result<()>;
}
