//! Soft edit-lock semantics across actors.

use std::time::Duration;

use civis_core::id::RecordId;
use civis_records::error::{Error, Result};
use civis_records::lock::RecordLocks;
use civis_test_utils::TestContext;

/// Within the expiry window the second actor conflicts;
/// once the lock lapses, acquisition succeeds and transfers it.
#[test]
fn second_actor_conflicts_until_the_lock_expires() -> Result<()> {
    let locks = RecordLocks::new(Duration::from_millis(20));
    let record = RecordId::generate();

    locks.acquire(record, "clerk.munoz")?;
    let err = locks.acquire(record, "clerk.vidal").unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }));
    assert!(err.user_reason().unwrap().contains("clerk.munoz"));

    std::thread::sleep(Duration::from_millis(40));

    let transferred = locks.acquire(record, "clerk.vidal")?;
    assert_eq!(transferred.holder, "clerk.vidal");
    assert_eq!(locks.holder(record)?.unwrap().holder, "clerk.vidal");
    Ok(())
}

/// Re-acquiring one's own lock refreshes the expiry instead of
/// duplicating or conflicting.
#[test]
fn same_holder_reacquire_refreshes() -> Result<()> {
    let locks = RecordLocks::new(Duration::from_secs(60));
    let record = RecordId::generate();

    let first = locks.acquire(record, "clerk.munoz")?;
    std::thread::sleep(Duration::from_millis(5));
    let refreshed = locks.acquire(record, "clerk.munoz")?;

    assert_eq!(refreshed.acquired_at, first.acquired_at);
    assert!(refreshed.expires_at > first.expires_at);
    Ok(())
}

/// The lifecycle service exposes its lock table with the configured
/// TTL; independent records never contend.
#[tokio::test]
async fn service_locks_are_per_record() -> Result<()> {
    let ctx = TestContext::new();
    let a = RecordId::generate();
    let b = RecordId::generate();

    ctx.service.locks().acquire(a, "clerk.munoz")?;
    ctx.service.locks().acquire(b, "clerk.vidal")?;

    assert!(ctx.service.locks().acquire(a, "clerk.vidal").is_err());
    assert_eq!(ctx.service.locks().holder(b)?.unwrap().holder, "clerk.vidal");

    assert!(ctx.service.locks().release(a, "clerk.munoz")?);
    let taken = ctx.service.locks().acquire(a, "clerk.vidal")?;
    assert_eq!(taken.holder, "clerk.vidal");
    Ok(())
}

/// Releasing someone else's live lock is a conflict that leaves the
/// lock in place.
#[test]
fn release_respects_the_holder() -> Result<()> {
    let locks = RecordLocks::new(Duration::from_secs(60));
    let record = RecordId::generate();

    locks.acquire(record, "clerk.munoz")?;
    assert!(locks.release(record, "clerk.vidal").is_err());
    assert_eq!(locks.holder(record)?.unwrap().holder, "clerk.munoz");

    assert!(locks.release(record, "clerk.munoz")?);
    assert!(locks.holder(record)?.is_none());
    Ok(())
}
