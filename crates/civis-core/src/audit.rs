//! Lifecycle audit event infrastructure.
//!
//! Audit events capture every decision the lifecycle engine makes about a
//! record: transitions applied or refused, reassignments, claim openings,
//! and routing degradations. Events are append-only and best-effort; an
//! audit failure never blocks the operation it describes.
//!
//! ## Usage
//!
//! ```rust
//! use civis_core::audit::{AuditAction, AuditEvent};
//!
//! let event = AuditEvent::builder()
//!     .action(AuditAction::TransitionApplied)
//!     .actor("clerk1")
//!     .record_id("01J8ZK4YJ0S6TVJ5Q2M9W4R7FX")
//!     .reason("validate")
//!     .try_build()
//!     .unwrap();
//!
//! let json = serde_json::to_string(&event).unwrap();
//! assert!(json.contains("TRANSITION_APPLIED"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the audit event schema.
///
/// Increment when making breaking changes to the schema.
pub const AUDIT_EVENT_VERSION: u32 = 1;

/// Lifecycle decisions that are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum AuditAction {
    /// A record was created.
    RecordCreated,
    /// A state transition was applied.
    TransitionApplied,
    /// A state transition was refused.
    TransitionDenied,
    /// A record changed responsible group.
    ReassignmentApplied,
    /// A reassignment request was refused.
    ReassignmentDenied,
    /// A claim record was opened.
    ClaimCreated,
    /// A claim request was refused.
    ClaimDenied,
    /// Routing failed and the record fell back to the error group.
    RoutingDegraded,
}

impl AuditAction {
    /// Returns true if this is a refusal.
    #[must_use]
    pub const fn is_deny(&self) -> bool {
        matches!(
            self,
            Self::TransitionDenied | Self::ReassignmentDenied | Self::ClaimDenied
        )
    }

    /// Returns the category of this action for grouping.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::RecordCreated => "record",
            Self::TransitionApplied | Self::TransitionDenied => "transition",
            Self::ReassignmentApplied | Self::ReassignmentDenied => "reassignment",
            Self::ClaimCreated | Self::ClaimDenied => "claim",
            Self::RoutingDegraded => "routing",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RecordCreated => "RECORD_CREATED",
            Self::TransitionApplied => "TRANSITION_APPLIED",
            Self::TransitionDenied => "TRANSITION_DENIED",
            Self::ReassignmentApplied => "REASSIGNMENT_APPLIED",
            Self::ReassignmentDenied => "REASSIGNMENT_DENIED",
            Self::ClaimCreated => "CLAIM_CREATED",
            Self::ClaimDenied => "CLAIM_DENIED",
            Self::RoutingDegraded => "ROUTING_DEGRADED",
        };
        write!(f, "{s}")
    }
}

/// A lifecycle audit event.
///
/// Captures one decision with enough context for forensics: who acted on
/// which record, what was decided, and why. Group fields carry the
/// before/after responsible group for reassignment-shaped events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Schema version for evolution.
    pub event_version: u32,

    /// Unique event identifier (ULID format).
    pub event_id: String,

    /// When the event occurred (UTC).
    pub timestamp: DateTime<Utc>,

    /// Who performed or requested the operation.
    pub actor: String,

    /// The decision taken.
    pub action: AuditAction,

    /// The record the decision concerns.
    pub record_id: String,

    /// The record's public code, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_code: Option<String>,

    /// Responsible group after the operation, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Responsible group before the operation, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_group: Option<String>,

    /// Reason for the decision (action slug, denial reason, error code).
    pub reason: String,
}

impl AuditEvent {
    /// Creates a new builder for constructing audit events.
    #[must_use]
    pub fn builder() -> AuditEventBuilder {
        AuditEventBuilder::default()
    }
}

/// Error type for audit event validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditValidationError {
    /// A required field is missing.
    MissingField {
        /// The name of the missing field.
        field: String,
    },
}

impl std::fmt::Display for AuditValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "audit event missing required field: {field}")
            }
        }
    }
}

impl std::error::Error for AuditValidationError {}

/// Builder for constructing [`AuditEvent`] instances.
#[derive(Debug, Default)]
pub struct AuditEventBuilder {
    action: Option<AuditAction>,
    actor: Option<String>,
    record_id: Option<String>,
    record_code: Option<String>,
    group: Option<String>,
    previous_group: Option<String>,
    reason: Option<String>,
}

impl AuditEventBuilder {
    /// Sets the action for this event.
    #[must_use]
    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Sets the actor identity.
    #[must_use]
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Sets the record ID.
    #[must_use]
    pub fn record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Sets the public record code.
    #[must_use]
    pub fn record_code(mut self, code: impl Into<String>) -> Self {
        self.record_code = Some(code.into());
        self
    }

    /// Sets the responsible group after the operation.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the responsible group before the operation.
    #[must_use]
    pub fn previous_group(mut self, group: impl Into<String>) -> Self {
        self.previous_group = Some(group.into());
        self
    }

    /// Sets the decision reason.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Builds the audit event.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing.
    pub fn try_build(self) -> Result<AuditEvent, AuditValidationError> {
        let action = self
            .action
            .ok_or_else(|| AuditValidationError::MissingField {
                field: "action".to_string(),
            })?;
        let actor = self
            .actor
            .ok_or_else(|| AuditValidationError::MissingField {
                field: "actor".to_string(),
            })?;
        let record_id = self
            .record_id
            .ok_or_else(|| AuditValidationError::MissingField {
                field: "record_id".to_string(),
            })?;
        let reason = self
            .reason
            .ok_or_else(|| AuditValidationError::MissingField {
                field: "reason".to_string(),
            })?;

        Ok(AuditEvent {
            event_version: AUDIT_EVENT_VERSION,
            event_id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            actor,
            action,
            record_id,
            record_code: self.record_code,
            group: self.group,
            previous_group: self.previous_group,
            reason,
        })
    }
}

// ============================================================================
// Audit Sink Infrastructure
// ============================================================================

/// Trait for audit event sinks.
///
/// Implementations should be lightweight and non-blocking. For async
/// storage, implementations should buffer events internally.
pub trait AuditSink: Send + Sync {
    /// Emit an audit event.
    fn emit(&self, event: AuditEvent);

    /// Flush any buffered events.
    ///
    /// Called during graceful shutdown. Default implementation is a no-op.
    fn flush(&self) {}
}

/// Audit emitter that routes events to the configured sink.
#[derive(Clone)]
pub struct AuditEmitter {
    sink: std::sync::Arc<dyn AuditSink>,
}

impl std::fmt::Debug for AuditEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditEmitter").finish_non_exhaustive()
    }
}

impl AuditEmitter {
    /// Creates a new audit emitter with the given sink.
    #[must_use]
    pub fn new(sink: std::sync::Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Creates an audit emitter with the tracing sink (default for production).
    #[must_use]
    pub fn with_tracing() -> Self {
        Self::new(std::sync::Arc::new(TracingAuditSink))
    }

    /// Creates an audit emitter with a test sink for unit testing.
    #[must_use]
    pub fn with_test_sink(sink: std::sync::Arc<TestAuditSink>) -> Self {
        Self::new(sink)
    }

    /// Emits an audit event.
    pub fn emit(&self, event: AuditEvent) {
        self.sink.emit(event);
    }

    /// Flushes any buffered events.
    pub fn flush(&self) {
        self.sink.flush();
    }
}

/// Audit sink that emits events via tracing.
///
/// This is the default sink for production. Events are emitted as
/// structured logs with the `audit` target; refusals at WARN level.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        emit_to_tracing(&event);
    }
}

fn emit_to_tracing(event: &AuditEvent) {
    if event.action.is_deny() {
        tracing::warn!(
            target: "audit",
            event_id = %event.event_id,
            action = %event.action,
            actor = %event.actor,
            record_id = %event.record_id,
            record_code = ?event.record_code,
            group = ?event.group,
            previous_group = ?event.previous_group,
            reason = %event.reason,
            "lifecycle_decision"
        );
    } else {
        tracing::info!(
            target: "audit",
            event_id = %event.event_id,
            action = %event.action,
            actor = %event.actor,
            record_id = %event.record_id,
            record_code = ?event.record_code,
            group = ?event.group,
            previous_group = ?event.previous_group,
            reason = %event.reason,
            "lifecycle_decision"
        );
    }
}

/// Test audit sink that captures events for assertions.
///
/// Use this in unit tests to verify that expected audit events are emitted.
#[derive(Debug, Default)]
pub struct TestAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

impl TestAuditSink {
    /// Creates a new empty test sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns the number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Returns true if no events have been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all captured events.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.events.lock() {
            guard.clear();
        }
    }

    /// Returns the last captured event, if any.
    #[must_use]
    pub fn last(&self) -> Option<AuditEvent> {
        self.events
            .lock()
            .ok()
            .and_then(|guard| guard.last().cloned())
    }

    /// Finds events by action type.
    #[must_use]
    pub fn find_by_action(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| {
                guard
                    .iter()
                    .filter(|e| e.action == action)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl AuditSink for TestAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action_display() {
        assert_eq!(
            AuditAction::TransitionApplied.to_string(),
            "TRANSITION_APPLIED"
        );
        assert_eq!(
            AuditAction::ReassignmentDenied.to_string(),
            "REASSIGNMENT_DENIED"
        );
        assert_eq!(AuditAction::RoutingDegraded.to_string(), "ROUTING_DEGRADED");
    }

    #[test]
    fn test_audit_action_is_deny() {
        assert!(!AuditAction::TransitionApplied.is_deny());
        assert!(AuditAction::TransitionDenied.is_deny());
        assert!(!AuditAction::ReassignmentApplied.is_deny());
        assert!(AuditAction::ReassignmentDenied.is_deny());
        assert!(!AuditAction::ClaimCreated.is_deny());
        assert!(AuditAction::ClaimDenied.is_deny());
        assert!(!AuditAction::RoutingDegraded.is_deny());
    }

    #[test]
    fn test_audit_action_category() {
        assert_eq!(AuditAction::RecordCreated.category(), "record");
        assert_eq!(AuditAction::TransitionApplied.category(), "transition");
        assert_eq!(AuditAction::TransitionDenied.category(), "transition");
        assert_eq!(AuditAction::ReassignmentApplied.category(), "reassignment");
        assert_eq!(AuditAction::ClaimCreated.category(), "claim");
        assert_eq!(AuditAction::RoutingDegraded.category(), "routing");
    }

    #[test]
    fn test_audit_event_builder() {
        let event = AuditEvent::builder()
            .action(AuditAction::ReassignmentApplied)
            .actor("clerk1")
            .record_id("rec-1")
            .record_code("REC/2025/001")
            .previous_group("group-a")
            .group("group-b")
            .reason("manual_reassignment")
            .try_build()
            .expect("valid event");

        assert_eq!(event.event_version, AUDIT_EVENT_VERSION);
        assert!(!event.event_id.is_empty());
        assert_eq!(event.actor, "clerk1");
        assert_eq!(event.action, AuditAction::ReassignmentApplied);
        assert_eq!(event.record_code.as_deref(), Some("REC/2025/001"));
        assert_eq!(event.previous_group.as_deref(), Some("group-a"));
        assert_eq!(event.group.as_deref(), Some("group-b"));
    }

    #[test]
    fn test_audit_event_builder_missing_required_field() {
        let result = AuditEvent::builder()
            .action(AuditAction::TransitionApplied)
            // Missing actor
            .record_id("rec-1")
            .reason("validate")
            .try_build();

        assert!(matches!(
            result,
            Err(AuditValidationError::MissingField { field }) if field == "actor"
        ));
    }

    #[test]
    fn test_audit_event_serde_roundtrip() {
        let event = AuditEvent::builder()
            .action(AuditAction::TransitionApplied)
            .actor("clerk1")
            .record_id("rec-1")
            .record_code("REC/2025/001")
            .group("group-b")
            .reason("validate")
            .try_build()
            .expect("valid event");

        let json = serde_json::to_string(&event).expect("serialize");
        let parsed: AuditEvent = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(event.event_version, parsed.event_version);
        assert_eq!(event.event_id, parsed.event_id);
        assert_eq!(event.actor, parsed.actor);
        assert_eq!(event.action, parsed.action);
        assert_eq!(event.record_id, parsed.record_id);
        assert_eq!(event.record_code, parsed.record_code);
        assert_eq!(event.group, parsed.group);
        assert_eq!(event.reason, parsed.reason);
    }

    #[test]
    fn test_audit_event_optional_fields_skipped_when_none() {
        let event = AuditEvent::builder()
            .action(AuditAction::TransitionDenied)
            .actor("clerk1")
            .record_id("rec-1")
            .reason("illegal_transition")
            .try_build()
            .expect("valid event");

        let json: serde_json::Value = serde_json::to_value(&event).expect("serialize");
        let obj = json.as_object().expect("should be object");

        assert!(!obj.contains_key("recordCode"));
        assert!(!obj.contains_key("group"));
        assert!(!obj.contains_key("previousGroup"));
        assert!(obj.contains_key("recordId"));
        assert!(obj.contains_key("reason"));
    }

    #[test]
    fn test_test_audit_sink_captures_events() {
        let sink = std::sync::Arc::new(TestAuditSink::new());
        let emitter = AuditEmitter::with_test_sink(sink.clone());

        let event = AuditEvent::builder()
            .action(AuditAction::ClaimCreated)
            .actor("clerk1")
            .record_id("rec-2")
            .reason("citizen_claim")
            .try_build()
            .expect("valid event");

        emitter.emit(event);

        assert_eq!(sink.len(), 1);
        let captured = sink.events();
        assert_eq!(captured[0].action, AuditAction::ClaimCreated);
        assert_eq!(captured[0].actor, "clerk1");
    }

    #[test]
    fn test_test_audit_sink_find_by_action() {
        let sink = std::sync::Arc::new(TestAuditSink::new());
        let emitter = AuditEmitter::with_test_sink(sink.clone());

        let applied = AuditEvent::builder()
            .action(AuditAction::TransitionApplied)
            .actor("clerk1")
            .record_id("rec-1")
            .reason("validate")
            .try_build()
            .expect("valid event");

        let denied = AuditEvent::builder()
            .action(AuditAction::TransitionDenied)
            .actor("clerk2")
            .record_id("rec-1")
            .reason("illegal_transition")
            .try_build()
            .expect("valid event");

        emitter.emit(applied);
        emitter.emit(denied);

        let applies = sink.find_by_action(AuditAction::TransitionApplied);
        let denies = sink.find_by_action(AuditAction::TransitionDenied);

        assert_eq!(applies.len(), 1);
        assert_eq!(denies.len(), 1);
        assert_eq!(applies[0].actor, "clerk1");
        assert_eq!(denies[0].actor, "clerk2");
    }

    #[test]
    fn test_test_audit_sink_clear() {
        let sink = std::sync::Arc::new(TestAuditSink::new());
        let emitter = AuditEmitter::with_test_sink(sink.clone());

        let event = AuditEvent::builder()
            .action(AuditAction::RecordCreated)
            .actor("clerk1")
            .record_id("rec-1")
            .reason("created")
            .try_build()
            .expect("valid event");

        emitter.emit(event);
        assert_eq!(sink.len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
