//! In-memory record store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use civis_core::id::{RecordId, WorkflowId};

use crate::code::RecordCode;
use crate::error::{Error, Result};
use crate::history::{Reassignment, StateHistoryEntry};
use crate::record::Record;
use crate::store::{
    ClaimBatch, NewRecordBatch, ReassignmentBatch, RecordStore, TransitionBatch,
};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<RecordId, Record>,
    by_code: HashMap<String, RecordId>,
    history: HashMap<RecordId, Vec<StateHistoryEntry>>,
    reassignments: HashMap<RecordId, Vec<Reassignment>>,
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("record store lock poisoned")
}

/// A record store backed by process memory.
///
/// Each commit validates the whole batch before touching any table, so
/// a refused batch leaves the store exactly as it was. Suitable for
/// tests and embedded single-process deployments; contents vanish on
/// drop.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Inner>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn record_count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner.records.len())
    }
}

impl Inner {
    fn require(&self, id: RecordId) -> Result<()> {
        if self.records.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::storage(format!("record {id} is not in the store")))
        }
    }

    fn put(&mut self, record: Record) {
        self.by_code.insert(record.code.to_string(), record.id);
        self.records.insert(record.id, record);
    }
}

fn integrity(ok: bool, what: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::storage(format!("batch integrity: {what}")))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: RecordId) -> Result<Option<Record>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner.records.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &RecordCode) -> Result<Option<Record>> {
        let inner = self.inner.read().map_err(poison_err)?;
        let id = inner.by_code.get(&code.to_string());
        Ok(id.and_then(|id| inner.records.get(id)).cloned())
    }

    async fn family(&self, base: &str) -> Result<Vec<Record>> {
        let inner = self.inner.read().map_err(poison_err)?;
        let mut family: Vec<Record> = inner
            .records
            .values()
            .filter(|r| r.code.base() == base)
            .cloned()
            .collect();
        // Root first (no ticket), then claims in ticket order.
        family.sort_by_key(|r| r.code.ticket().unwrap_or(0));
        Ok(family)
    }

    async fn in_workflow(&self, workflow: WorkflowId) -> Result<Vec<Record>> {
        let inner = self.inner.read().map_err(poison_err)?;
        let mut bundle: Vec<Record> = inner
            .records
            .values()
            .filter(|r| r.workflow == Some(workflow))
            .cloned()
            .collect();
        // ULIDs sort by creation time.
        bundle.sort_by_key(|r| r.id);
        Ok(bundle)
    }

    async fn history_of(&self, id: RecordId) -> Result<Vec<StateHistoryEntry>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner.history.get(&id).cloned().unwrap_or_default())
    }

    async fn reassignments_of(&self, id: RecordId) -> Result<Vec<Reassignment>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner.reassignments.get(&id).cloned().unwrap_or_default())
    }

    async fn create(&self, batch: NewRecordBatch) -> Result<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        let id = batch.record.id;
        let code = batch.record.code.to_string();

        if inner.records.contains_key(&id) {
            return Err(Error::storage(format!("record {id} already exists")));
        }
        if inner.by_code.contains_key(&code) {
            return Err(Error::storage(format!("record code {code} already taken")));
        }
        integrity(batch.history.record == id, "history row names another record")?;
        if let Some(row) = &batch.reassignment {
            integrity(row.record == id, "reassignment row names another record")?;
        }

        inner.history.entry(id).or_default().push(batch.history);
        if let Some(row) = batch.reassignment {
            inner.reassignments.entry(id).or_default().push(row);
        }
        inner.put(batch.record);
        drop(inner);

        Ok(())
    }

    async fn commit_transition(&self, batch: TransitionBatch) -> Result<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        let id = batch.record.id;

        inner.require(id)?;
        integrity(batch.history.record == id, "history row names another record")?;
        if let Some(row) = &batch.reassignment {
            integrity(row.record == id, "reassignment row names another record")?;
        }

        inner.history.entry(id).or_default().push(batch.history);
        if let Some(row) = batch.reassignment {
            inner.reassignments.entry(id).or_default().push(row);
        }
        inner.put(batch.record);
        drop(inner);

        Ok(())
    }

    async fn commit_claim(&self, batch: ClaimBatch) -> Result<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        let claim_id = batch.claim.id;
        let claim_code = batch.claim.code.to_string();

        if inner.records.contains_key(&claim_id) {
            return Err(Error::storage(format!("record {claim_id} already exists")));
        }
        if inner.by_code.contains_key(&claim_code) {
            return Err(Error::storage(format!(
                "record code {claim_code} already taken"
            )));
        }
        inner.require(batch.source.id)?;
        for id in &batch.synchronized {
            inner.require(*id)?;
        }
        integrity(
            batch.history.record == claim_id,
            "history row names another record",
        )?;
        if let Some(row) = &batch.reassignment {
            integrity(row.record == claim_id, "reassignment row names another record")?;
        }
        integrity(
            batch.claim.claims_number == batch.claims_number
                && batch.source.claims_number == batch.claims_number,
            "claim count differs between snapshots and batch",
        )?;

        inner.history.entry(claim_id).or_default().push(batch.history);
        if let Some(row) = batch.reassignment {
            inner.reassignments.entry(claim_id).or_default().push(row);
        }
        for id in &batch.synchronized {
            if let Some(sibling) = inner.records.get_mut(id) {
                sibling.claims_number = batch.claims_number;
            }
        }
        inner.put(batch.source);
        inner.put(batch.claim);
        drop(inner);

        Ok(())
    }

    async fn commit_reassignment(&self, batch: ReassignmentBatch) -> Result<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;

        for update in &batch.updates {
            inner.require(update.record.id)?;
            integrity(
                update.reassignment.record == update.record.id,
                "reassignment row names another record",
            )?;
        }

        for update in batch.updates {
            inner
                .reassignments
                .entry(update.record.id)
                .or_default()
                .push(update.reassignment);
            inner.put(update.record);
        }
        drop(inner);

        Ok(())
    }
}
