//! Soft edit locks over records.
//!
//! Locks stop two operators from editing the same record at once. They
//! are advisory and TTL-bound: a crashed client never wedges a record,
//! because an expired lock is taken over by the next acquirer. Holding
//! a lock is not required for lifecycle operations; the UI acquires one
//! while an edit form is open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use civis_core::id::RecordId;

use crate::config::LifecycleConfig;
use crate::error::{Error, Result};

/// A held edit lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    /// Identifier of the client holding the lock.
    pub holder: String,

    /// When the lock was first acquired by this holder.
    pub acquired_at: DateTime<Utc>,

    /// When the lock lapses unless refreshed.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Returns true if the lock has lapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns the time left before the lock lapses, or zero if it
    /// already has.
    #[must_use]
    pub fn remaining_ttl(&self) -> Duration {
        let remaining = self.expires_at - Utc::now();
        remaining.to_std().unwrap_or(Duration::ZERO)
    }
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("record lock table poisoned")
}

/// The in-process edit-lock table.
#[derive(Debug)]
pub struct RecordLocks {
    locks: RwLock<HashMap<RecordId, LockInfo>>,
    ttl: chrono::Duration,
}

impl RecordLocks {
    /// Creates a lock table with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000)),
        }
    }

    /// Creates a lock table with the configured TTL.
    #[must_use]
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(config.lock_ttl())
    }

    /// Acquires or refreshes the lock on a record.
    ///
    /// The same holder refreshes its own lock, extending the expiry.
    /// An expired lock is taken over regardless of its holder. A live
    /// lock held by someone else is a conflict.
    pub fn acquire(&self, record: RecordId, holder: &str) -> Result<LockInfo> {
        let now = Utc::now();
        let mut locks = self.locks.write().map_err(poison_err)?;

        if let Some(existing) = locks.get(&record) {
            if existing.holder != holder && !existing.is_expired() {
                return Err(Error::conflict(format!(
                    "record locked by {} until {}",
                    existing.holder,
                    existing.expires_at.to_rfc3339()
                )));
            }
        }

        let acquired_at = match locks.get(&record) {
            // A refresh keeps the original acquisition time.
            Some(existing) if existing.holder == holder && !existing.is_expired() => {
                existing.acquired_at
            }
            _ => now,
        };
        let info = LockInfo {
            holder: holder.to_string(),
            acquired_at,
            expires_at: now + self.ttl,
        };
        locks.insert(record, info.clone());
        drop(locks);

        Ok(info)
    }

    /// Releases the lock on a record.
    ///
    /// Returns true if a live lock of this holder was removed, false if
    /// no live lock existed. Releasing someone else's live lock is a
    /// conflict.
    pub fn release(&self, record: RecordId, holder: &str) -> Result<bool> {
        let mut locks = self.locks.write().map_err(poison_err)?;

        match locks.get(&record) {
            None => Ok(false),
            Some(existing) if existing.is_expired() => {
                locks.remove(&record);
                Ok(false)
            }
            Some(existing) if existing.holder == holder => {
                locks.remove(&record);
                Ok(true)
            }
            Some(existing) => Err(Error::conflict(format!(
                "record locked by {}, not by {holder}",
                existing.holder
            ))),
        }
    }

    /// Returns the live lock on a record, if any.
    pub fn holder(&self, record: RecordId) -> Result<Option<LockInfo>> {
        let locks = self.locks.read().map_err(poison_err)?;
        Ok(locks.get(&record).filter(|info| !info.is_expired()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release() -> Result<()> {
        let locks = RecordLocks::new(Duration::from_secs(60));
        let record = RecordId::generate();

        let info = locks.acquire(record, "clerk.munoz")?;
        assert_eq!(info.holder, "clerk.munoz");
        assert!(!info.is_expired());
        assert!(info.remaining_ttl() > Duration::from_secs(50));

        assert!(locks.release(record, "clerk.munoz")?);
        assert!(locks.holder(record)?.is_none());
        Ok(())
    }

    #[test]
    fn second_holder_is_refused() -> Result<()> {
        let locks = RecordLocks::new(Duration::from_secs(60));
        let record = RecordId::generate();

        locks.acquire(record, "clerk.munoz")?;
        let err = locks.acquire(record, "clerk.vidal").unwrap_err();
        assert!(err.user_reason().unwrap().contains("clerk.munoz"));
        Ok(())
    }

    #[test]
    fn same_holder_refreshes_and_keeps_acquisition_time() -> Result<()> {
        let locks = RecordLocks::new(Duration::from_secs(60));
        let record = RecordId::generate();

        let first = locks.acquire(record, "clerk.munoz")?;
        std::thread::sleep(Duration::from_millis(10));
        let second = locks.acquire(record, "clerk.munoz")?;

        assert_eq!(second.acquired_at, first.acquired_at);
        assert!(second.expires_at > first.expires_at);
        Ok(())
    }

    #[test]
    fn expired_lock_is_taken_over() -> Result<()> {
        let locks = RecordLocks::new(Duration::from_millis(10));
        let record = RecordId::generate();

        locks.acquire(record, "clerk.munoz")?;
        std::thread::sleep(Duration::from_millis(30));

        let info = locks.acquire(record, "clerk.vidal")?;
        assert_eq!(info.holder, "clerk.vidal");
        Ok(())
    }

    #[test]
    fn holder_hides_expired_locks() -> Result<()> {
        let locks = RecordLocks::new(Duration::from_millis(10));
        let record = RecordId::generate();

        locks.acquire(record, "clerk.munoz")?;
        std::thread::sleep(Duration::from_millis(30));

        assert!(locks.holder(record)?.is_none());
        Ok(())
    }

    #[test]
    fn release_by_other_holder_is_refused() -> Result<()> {
        let locks = RecordLocks::new(Duration::from_secs(60));
        let record = RecordId::generate();

        locks.acquire(record, "clerk.munoz")?;
        assert!(locks.release(record, "clerk.vidal").is_err());
        // The lock survives the refused release.
        assert!(locks.holder(record)?.is_some());
        Ok(())
    }

    #[test]
    fn release_without_lock_reports_nothing_removed() -> Result<()> {
        let locks = RecordLocks::new(Duration::from_secs(60));
        assert!(!locks.release(RecordId::generate(), "clerk.munoz")?);
        Ok(())
    }
}
