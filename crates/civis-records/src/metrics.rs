//! Lifecycle metrics.
//!
//! Counters for the lifecycle decisions: creations, transitions,
//! claims, reassignments and routing degradations. These complement
//! the audit trail and the structured logs; dashboards alert on the
//! denied and degraded series.

use metrics::{counter, describe_counter};

/// Records created counter.
pub const RECORDS_CREATED: &str = "civis_records_created_total";

/// Transitions applied counter.
pub const TRANSITIONS_APPLIED: &str = "civis_transitions_applied_total";

/// Transitions refused counter.
pub const TRANSITIONS_DENIED: &str = "civis_transitions_denied_total";

/// Claims opened counter.
pub const CLAIMS_CREATED: &str = "civis_claims_created_total";

/// Claims refused counter.
pub const CLAIMS_DENIED: &str = "civis_claims_denied_total";

/// Manual reassignments applied counter (one per record moved).
pub const REASSIGNMENTS_APPLIED: &str = "civis_reassignments_applied_total";

/// Routing degradations counter.
pub const ROUTING_DEGRADED: &str = "civis_routing_degraded_total";

/// Registers all lifecycle metric descriptions.
///
/// Call this once at application startup after initializing the
/// metrics recorder.
pub fn register_metrics() {
    describe_counter!(RECORDS_CREATED, "Total records created");
    describe_counter!(TRANSITIONS_APPLIED, "Total state transitions applied");
    describe_counter!(TRANSITIONS_DENIED, "Total state transitions refused");
    describe_counter!(CLAIMS_CREATED, "Total claims opened");
    describe_counter!(CLAIMS_DENIED, "Total claims refused");
    describe_counter!(
        REASSIGNMENTS_APPLIED,
        "Total records moved by manual reassignment"
    );
    describe_counter!(
        ROUTING_DEGRADED,
        "Total derivations that fell back to the error group"
    );
}

/// Records a record creation.
pub fn record_created(process: &str) {
    counter!(RECORDS_CREATED, "process" => process.to_string()).increment(1);
}

/// Records an applied transition.
pub fn record_transition_applied(process: &str, target: &str) {
    let labels = [
        ("process", process.to_string()),
        ("target", target.to_string()),
    ];
    counter!(TRANSITIONS_APPLIED, &labels).increment(1);
}

/// Records a refused transition.
pub fn record_transition_denied(reason: &str) {
    counter!(TRANSITIONS_DENIED, "reason" => reason.to_string()).increment(1);
}

/// Records an opened claim.
pub fn record_claim_created(kind: &str) {
    counter!(CLAIMS_CREATED, "kind" => kind.to_string()).increment(1);
}

/// Records a refused claim.
pub fn record_claim_denied(reason: &str) {
    counter!(CLAIMS_DENIED, "reason" => reason.to_string()).increment(1);
}

/// Records manually reassigned records.
pub fn record_reassignments_applied(count: u64) {
    counter!(REASSIGNMENTS_APPLIED).increment(count);
}

/// Records a derivation that degraded to the error group.
pub fn record_routing_degraded(operation: &str) {
    counter!(ROUTING_DEGRADED, "operation" => operation.to_string()).increment(1);
}
