//! Custom assertion helpers for lifecycle tests.

use civis_core::audit::{AuditAction, TestAuditSink};
use civis_core::id::GroupId;
use civis_records::dispatch::Notification;
use civis_records::history::StateHistoryEntry;
use civis_records::record::Record;

/// Asserts that a record is assigned to the given group.
///
/// # Panics
///
/// Panics if the record is unassigned or held by another group.
pub fn assert_assigned_to(record: &Record, group: GroupId) {
    assert_eq!(
        record.responsible_group,
        Some(group),
        "Expected record {} to be assigned to {group}, but it is held by {:?}",
        record.code,
        record.responsible_group
    );
}

/// Asserts that a record reached a terminal state with its closing
/// stamp in place.
///
/// # Panics
///
/// Panics if the record is still open or closed without a stamp.
pub fn assert_closed(record: &Record) {
    assert!(
        record.is_terminal(),
        "Expected record {} to be closed, but state is {:?}",
        record.code,
        record.state
    );
    assert!(
        record.closing.is_some(),
        "Record {} is terminal but carries no closing stamp",
        record.code
    );
}

/// Asserts that a record is still open.
///
/// # Panics
///
/// Panics if the record sits in a terminal state.
pub fn assert_open(record: &Record) {
    assert!(
        !record.is_terminal(),
        "Expected record {} to be open, but state is {:?}",
        record.code,
        record.state
    );
}

/// Asserts that a history trail is well formed: one creation row first,
/// every later row chained to its predecessor, timestamps never moving
/// backwards.
///
/// # Panics
///
/// Panics if the trail is empty, starts mid-flight, breaks the chain
/// or runs backwards in time.
pub fn assert_history_chained(entries: &[StateHistoryEntry]) {
    let first = entries.first().expect("history should not be empty");
    assert_eq!(
        first.previous_state, None,
        "First history row must be the creation row, but it moves from {:?}",
        first.previous_state
    );

    for window in entries.windows(2) {
        assert_eq!(
            window[1].previous_state,
            Some(window[0].next_state),
            "History chain broken: row after {:?} claims to come from {:?}",
            window[0].next_state,
            window[1].previous_state
        );
        assert!(
            window[0].created_at <= window[1].created_at,
            "History not ordered: {} > {}",
            window[0].created_at,
            window[1].created_at
        );
    }
}

/// Asserts that at least one notification of the given kind was sent.
///
/// # Panics
///
/// Panics if no notification matches.
pub fn assert_notified(sent: &[Notification], kind: &str) {
    assert!(
        sent.iter().any(|n| n.kind() == kind),
        "Expected a '{kind}' notification, got {:?}",
        sent.iter().map(Notification::kind).collect::<Vec<_>>()
    );
}

/// Asserts that no notification of the given kind was sent.
///
/// # Panics
///
/// Panics if any notification matches.
pub fn assert_no_notification(sent: &[Notification], kind: &str) {
    assert!(
        sent.iter().all(|n| n.kind() != kind),
        "Expected no '{kind}' notification, got {:?}",
        sent.iter().map(Notification::kind).collect::<Vec<_>>()
    );
}

/// Asserts that a record family agrees on its claim count and shares
/// one code base, with every claim ticket unique.
///
/// # Panics
///
/// Panics if the family is empty, spans several bases, disagrees on
/// the claim count or repeats a ticket.
pub fn assert_family_synchronized(family: &[Record]) {
    let root = family.first().expect("family should not be empty");
    let base = root.code.base();
    let claims_number = root.claims_number;

    let mut tickets = std::collections::HashSet::new();
    for record in family {
        assert_eq!(
            record.code.base(),
            base,
            "Record {} does not belong to family {base}",
            record.code
        );
        assert_eq!(
            record.claims_number, claims_number,
            "Record {} carries claim count {}, family says {claims_number}",
            record.code, record.claims_number
        );
        if let Some(ticket) = record.code.ticket() {
            assert!(
                tickets.insert(ticket),
                "Claim ticket {ticket:02} appears twice in family {base}"
            );
        }
    }
}

/// Asserts that the audit sink captured the action exactly `times`
/// times.
///
/// # Panics
///
/// Panics if the count differs.
pub fn assert_audited(sink: &TestAuditSink, action: AuditAction, times: usize) {
    let found = sink.find_by_action(action).len();
    assert_eq!(
        found, times,
        "Expected {action:?} to be audited {times} times, found {found}"
    );
}
