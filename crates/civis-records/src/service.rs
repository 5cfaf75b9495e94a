//! The record lifecycle service.
//!
//! [`RecordService`] orchestrates every lifecycle decision: it loads
//! the record, asks the process registry what is legal, asks the
//! derivation engine who becomes responsible, and commits the outcome
//! to the record store as one atomic batch. Audit events, metrics and
//! notifications ride along; only the batch commit can fail an
//! otherwise-approved operation.
//!
//! # Failure posture
//!
//! Routing failures never abort a lifecycle operation. When the rule
//! store is unreachable the operation degrades: the record is parked
//! on the configured error group, the degradation is audited and
//! counted, and processing continues. Only the explicit dry-run
//! [`RecordService::derive`] surfaces routing errors to its caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use civis_core::actor::{Actor, Department};
use civis_core::audit::{AuditAction, AuditEmitter, AuditEventBuilder};
use civis_core::group::GroupTree;
use civis_core::id::{GroupId, RecordId};
use civis_core::permission::{Capability, PermissionChecker};
use civis_flow::registry::ProcessRegistry;
use civis_flow::state::RecordState;
use civis_flow::step::{TransitionAction, TransitionHandler, TransitionOffer};
use civis_routing::engine::DerivationEngine;
use civis_routing::rule::{Derivation, DerivationReason, DerivationRequest};

use crate::claim::{self, ClaimKind, ClaimOptions};
use crate::code::RecordCode;
use crate::config::LifecycleConfig;
use crate::dispatch::{Notification, NotificationDispatcher};
use crate::error::{Error, Result};
use crate::history::{Reassignment, ReassignmentReason, StateHistoryEntry};
use crate::lock::RecordLocks;
use crate::metrics;
use crate::record::{ClosingMeta, NewRecord, Record};
use crate::store::{
    ClaimBatch, NewRecordBatch, ReassignmentBatch, ReassignmentUpdate, RecordStore,
    TransitionBatch,
};

/// Note appended to the history row when the answer-aware handler
/// closes a record instead of parking it for an answer.
const DIVERTED_CLOSE_NOTE: &str = "closed without answer: applicant has no response channel";

/// A request to move a record to another state.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    /// The record to move.
    pub record_id: RecordId,

    /// The requested target state.
    pub target: RecordState,

    /// Who requests the move.
    pub actor: Actor,

    /// Free-text note for the history row.
    pub comment: Option<String>,

    /// Resolving department, stamped into the closing metadata when
    /// the move reaches a terminal state.
    pub department: Option<Department>,

    /// Explicit responsible group. Overrides derivation entirely.
    pub group: Option<GroupId>,

    /// True when the system, not an operator, requests the move.
    pub automatic: bool,

    /// Whether to consult the routing rules for the target state.
    /// Ignored when `group` is set.
    pub perform_derivation: bool,
}

impl TransitionCommand {
    /// Creates a command with the interactive defaults: not automatic,
    /// derivation on, no overrides.
    #[must_use]
    pub fn new(record_id: RecordId, target: RecordState, actor: Actor) -> Self {
        Self {
            record_id,
            target,
            actor,
            comment: None,
            department: None,
            group: None,
            automatic: false,
            perform_derivation: true,
        }
    }

    /// Attaches a free-text note.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Stamps the resolving department on terminal moves.
    #[must_use]
    pub fn with_department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    /// Forces the responsible group instead of deriving it.
    #[must_use]
    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    /// Marks the move as system-initiated.
    #[must_use]
    pub const fn automatic(mut self) -> Self {
        self.automatic = true;
        self
    }

    /// Skips derivation; the responsible group stays as it is.
    #[must_use]
    pub const fn skip_derivation(mut self) -> Self {
        self.perform_derivation = false;
        self
    }
}

/// What a transition changed.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The record after the move.
    pub record: Record,

    /// The state the record left.
    pub previous_state: RecordState,

    /// The history row the move appended.
    pub history: StateHistoryEntry,

    /// The reassignment row, when the move changed the group.
    pub reassignment: Option<Reassignment>,

    /// True when the answer-aware handler closed the record instead of
    /// entering the requested state.
    pub diverted: bool,
}

/// Preview of a transition: the same decisions as
/// [`RecordService::apply_transition`], with zero writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Whether applying the transition would succeed.
    pub can_confirm: bool,

    /// Why confirmation would be refused, when it would be.
    pub reason: Option<String>,

    /// The state the record would end in (the diversion target when
    /// the answer-aware handler applies).
    pub next_state: RecordState,

    /// The group the record would end with.
    pub next_group: Option<GroupId>,

    /// True when the move would hand the record to another ambit.
    pub different_ambit: bool,
}

impl CheckOutcome {
    fn refusal(next_state: RecordState, reason: impl Into<String>) -> Self {
        Self {
            can_confirm: false,
            reason: Some(reason.into()),
            next_state,
            next_group: None,
            different_ambit: false,
        }
    }
}

/// A request to hand a record to another group.
#[derive(Debug, Clone)]
pub struct ReassignmentCommand {
    /// The record to move. When it belongs to a workflow bundle the
    /// whole bundle moves.
    pub record_id: RecordId,

    /// Who requests the move.
    pub actor: Actor,

    /// The group the actor acts for; bounds the ambit check.
    pub actor_group: GroupId,

    /// Where the record should go.
    pub next_group: GroupId,

    /// Why the actor wants the move; kept verbatim on the rows.
    pub reason: String,

    /// Free-text note for the reassignment rows.
    pub comment: Option<String>,
}

/// Whether a dry-run derivation should persist its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveMode {
    /// Compute only; write nothing.
    Check,
    /// Commit the group change when the rules propose one.
    Apply,
}

/// Orchestrates the record lifecycle.
pub struct RecordService {
    registry: Arc<ProcessRegistry>,
    engine: DerivationEngine,
    store: Arc<dyn RecordStore>,
    groups: Arc<GroupTree>,
    permissions: Arc<dyn PermissionChecker>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    audit: AuditEmitter,
    locks: RecordLocks,
    config: LifecycleConfig,
}

impl std::fmt::Debug for RecordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RecordService {
    /// Creates the service from its collaborators.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        registry: Arc<ProcessRegistry>,
        engine: DerivationEngine,
        store: Arc<dyn RecordStore>,
        groups: Arc<GroupTree>,
        permissions: Arc<dyn PermissionChecker>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        audit: AuditEmitter,
        config: LifecycleConfig,
    ) -> Self {
        let locks = RecordLocks::from_config(&config);
        Self {
            registry,
            engine,
            store,
            groups,
            permissions,
            dispatcher,
            audit,
            locks,
            config,
        }
    }

    /// The edit-lock table.
    #[must_use]
    pub const fn locks(&self) -> &RecordLocks {
        &self.locks
    }

    /// The process registry the service decides against.
    #[must_use]
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Loads a record by id.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the record does not exist.
    pub async fn record(&self, id: RecordId) -> Result<Record> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("record", id))
    }

    /// Loads a record by its public code.
    pub async fn record_by_code(&self, code: &RecordCode) -> Result<Record> {
        self.store
            .get_by_code(code)
            .await?
            .ok_or_else(|| Error::not_found("record", code))
    }

    /// Loads a record's state trail, oldest first.
    pub async fn history(&self, id: RecordId) -> Result<Vec<StateHistoryEntry>> {
        self.store.history_of(id).await
    }

    /// Loads a record's reassignment trail, oldest first.
    pub async fn reassignments(&self, id: RecordId) -> Result<Vec<Reassignment>> {
        self.store.reassignments_of(id).await
    }

    /// The transitions `actor` may invoke on `record` right now.
    #[must_use]
    pub fn transitions_for(
        &self,
        record: &Record,
        actor: &Actor,
    ) -> BTreeMap<TransitionAction, TransitionOffer> {
        let caps = self.permissions.capabilities_of(actor);
        self.registry
            .transitions_for(record.process, record.state, &caps)
    }

    /// Every transition from the record's step, flagging the ones
    /// `actor` cannot invoke.
    #[must_use]
    pub fn transitions_with_forbidden(
        &self,
        record: &Record,
        actor: &Actor,
    ) -> BTreeMap<TransitionAction, TransitionOffer> {
        let caps = self.permissions.capabilities_of(actor);
        self.registry
            .transitions_with_forbidden(record.process, record.state, &caps)
    }

    /// The state after the record's current one on the nominal path.
    #[must_use]
    pub fn next_step(&self, record: &Record) -> Option<RecordState> {
        self.registry.next_step_code(record.process, record.state)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Creates a record.
    ///
    /// The record enters its process at the graph's entry step, unless
    /// the theme requires an identified applicant and the filing names
    /// none, in which case it is parked on `NO_PROCESSED` until an
    /// operator admits it. Initial routing runs against the actual
    /// starting state and falls back to the entry-state rules.
    #[tracing::instrument(skip(self, new, actor), fields(code = %new.code, theme = %new.theme.id))]
    pub async fn create_record(&self, new: NewRecord, actor: &Actor) -> Result<Record> {
        let process = new.theme.process;
        let entry = self.registry.initial_state(process)?;

        let requires_applicant = new.theme.requires_applicant || self.config.require_applicant;
        let state = if requires_applicant && new.applicant.is_none() {
            tracing::debug!("no applicant named; parking record outside the process");
            RecordState::NoProcessed
        } else {
            entry
        };

        let now = Utc::now();
        let id = RecordId::generate();

        let mut request =
            DerivationRequest::new(new.theme.id, state, DerivationReason::InitialAssignation);
        if let Some(district) = new.district {
            request = request.with_district(district);
        }
        let group = self
            .derive_or_degrade(&request, id, &new.code, actor, "create_record")
            .await;

        let record = Record {
            id,
            code: new.code,
            theme: new.theme.id,
            process,
            state,
            responsible_group: group,
            user_displayed: None,
            district: new.district,
            applicant: new.applicant,
            workflow: new.workflow,
            claims_number: 0,
            claimed_from: None,
            reassignment_not_allowed: false,
            multirecord_from: new.multirecord_from,
            similar_to: new.similar_to,
            input_channel: new.input_channel,
            response_config: new.response_config,
            features: new.features,
            description: new.description,
            alarms: crate::record::AlarmFlags::default(),
            conversations: Vec::new(),
            closing: None,
            resolution: None,
            created_at: now,
            updated_at: now,
        };

        let history =
            StateHistoryEntry::creation(id, state, actor.clone(), group, None, now);
        let reassignment = group.map(|group| {
            Reassignment::new(
                id,
                None,
                group,
                ReassignmentReason::InitialAssignation,
                actor.clone(),
                now,
            )
        });

        self.store
            .create(NewRecordBatch {
                record: record.clone(),
                history,
                reassignment,
            })
            .await?;

        self.audit(
            self.event(AuditAction::RecordCreated, actor, &record)
                .reason(format!("created in state {state}")),
        );
        metrics::record_created(&process.to_string());
        tracing::info!(record_id = %id, state = %state, "record created");

        Ok(record)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Applies a state transition.
    ///
    /// The decision order is fixed: legality against the process graph,
    /// then the actor's capability, then the target's entry handler
    /// (which may divert the move), then closing stamps, then routing.
    /// Everything the decision produced is committed as one batch, and
    /// the record gains exactly one history row.
    #[tracing::instrument(
        skip(self, cmd),
        fields(record_id = %cmd.record_id, target = %cmd.target)
    )]
    pub async fn apply_transition(&self, cmd: TransitionCommand) -> Result<TransitionOutcome> {
        let mut record = self.record(cmd.record_id).await?;
        let previous_state = record.state;

        // Legality before anything else; an illegal request must not
        // leave a trace on the record.
        let capability = match self.registry.transition(record.process, record.state, cmd.target)
        {
            Ok(transition) => transition.capability,
            Err(err @ civis_flow::error::Error::IllegalTransition { .. }) => {
                self.audit(
                    self.event(AuditAction::TransitionDenied, &cmd.actor, &record)
                        .reason(err.to_string()),
                );
                metrics::record_transition_denied("illegal_transition");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(capability) = capability {
            if !self.permissions.has_capability(&cmd.actor, capability) {
                self.audit(
                    self.event(AuditAction::TransitionDenied, &cmd.actor, &record)
                        .reason(format!("missing capability {capability}")),
                );
                metrics::record_transition_denied("missing_capability");
                return Err(civis_flow::error::Error::illegal_transition(
                    record.state,
                    cmd.target,
                    format!("requires capability {capability}"),
                )
                .into());
            }
        }

        let (target, diverted) = self.effective_target(&record, cmd.target)?;
        let mut comment = cmd.comment;
        if diverted {
            tracing::info!(requested = %cmd.target, "answer-aware handler diverts to CLOSED");
            comment = Some(match comment {
                Some(text) => format!("{text}; {DIVERTED_CLOSE_NOTE}"),
                None => DIVERTED_CLOSE_NOTE.to_string(),
            });
        }

        let now = Utc::now();
        if target.is_terminal() {
            record.closing = Some(ClosingMeta {
                closed_at: now,
                department: cmd.department,
            });
        }

        let proposed = if let Some(group) = cmd.group {
            Some((group, ReassignmentReason::ManualReassignment))
        } else if cmd.perform_derivation {
            let mut request =
                DerivationRequest::new(record.theme, target, DerivationReason::Derivation);
            if let Some(district) = record.district {
                request = request.with_district(district);
            }
            self.derive_or_degrade(&request, record.id, &record.code, &cmd.actor, "transition")
                .await
                .map(|group| (group, ReassignmentReason::Derivation))
        } else {
            None
        };

        let mut reassignment = None;
        if let Some((next_group, reason)) = proposed {
            if record.responsible_group != Some(next_group) {
                let previous_group = record.responsible_group;
                let closed_threads = record.hand_over_to(next_group);
                if !closed_threads.is_empty() {
                    tracing::info!(
                        closed = closed_threads.len(),
                        "closed internal conversations on handover"
                    );
                }
                reassignment = Some(Reassignment::new(
                    record.id,
                    previous_group,
                    next_group,
                    reason,
                    cmd.actor.clone(),
                    now,
                ));
            }
        }

        record.state = target;
        record.touch(now);
        let history = StateHistoryEntry::transition(
            record.id,
            previous_state,
            target,
            cmd.actor.clone(),
            record.responsible_group,
            cmd.automatic,
            comment,
            now,
        );

        self.store
            .commit_transition(TransitionBatch {
                record: record.clone(),
                history: history.clone(),
                reassignment: reassignment.clone(),
            })
            .await?;

        let mut applied = self
            .event(AuditAction::TransitionApplied, &cmd.actor, &record)
            .reason(format!("{previous_state} -> {target}"));
        if let Some(row) = &reassignment {
            applied = applied.group(row.next_group.to_string());
            if let Some(previous) = row.previous_group {
                applied = applied.previous_group(previous.to_string());
            }
        }
        self.audit(applied);
        metrics::record_transition_applied(&record.process.to_string(), &target.to_string());

        if let Some(row) = &reassignment {
            self.notify(Notification::RecordReassigned {
                record: record.id,
                code: record.code.clone(),
                previous_group: row.previous_group,
                next_group: row.next_group,
            })
            .await;
        }
        if target.is_terminal() {
            self.notify(Notification::RecordClosed {
                record: record.id,
                code: record.code.clone(),
                group: record.responsible_group,
            })
            .await;
        }

        Ok(TransitionOutcome {
            record,
            previous_state,
            history,
            reassignment,
            diverted,
        })
    }

    /// Previews a transition without writing anything.
    ///
    /// Mirrors the decisions of [`RecordService::apply_transition`]:
    /// legality, capability, the entry handler's diversion and the
    /// routing proposal. Routing failures surface as errors here; the
    /// caller asked a question and deserves the real answer rather
    /// than a silent degradation.
    pub async fn check_transition(
        &self,
        record_id: RecordId,
        target: RecordState,
        actor: &Actor,
    ) -> Result<CheckOutcome> {
        let record = self.record(record_id).await?;

        let capability = match self.registry.transition(record.process, record.state, target) {
            Ok(transition) => transition.capability,
            Err(err @ civis_flow::error::Error::IllegalTransition { .. }) => {
                return Ok(CheckOutcome::refusal(target, err.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(capability) = capability {
            if !self.permissions.has_capability(actor, capability) {
                return Ok(CheckOutcome::refusal(
                    target,
                    format!("requires capability {capability}"),
                ));
            }
        }

        let (next_state, _) = self.effective_target(&record, target)?;

        let mut request =
            DerivationRequest::new(record.theme, next_state, DerivationReason::Derivation);
        if let Some(district) = record.district {
            request = request.with_district(district);
        }
        let proposed = self.engine.derive(&request).await?.map(|d| d.group);

        let different_ambit = match (record.responsible_group, proposed) {
            (Some(current), Some(next)) => !self.groups.same_ambit(current, next),
            _ => false,
        };

        Ok(CheckOutcome {
            can_confirm: true,
            reason: None,
            next_state,
            next_group: proposed.or(record.responsible_group),
            different_ambit,
        })
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Opens a claim against a closed record.
    ///
    /// Eligibility is checked against the whole record family; the new
    /// claim takes the next ticket and the claim count is synchronized
    /// across the family in the same batch. Citizen claims are routed
    /// like fresh records and raise the citizen-claim alarm on both
    /// sides; internal claims stay with the group that closed the
    /// source.
    #[tracing::instrument(skip(self, description, options, actor), fields(record_id = %record_id))]
    pub async fn create_claim(
        &self,
        record_id: RecordId,
        description: Option<String>,
        options: ClaimOptions,
        actor: &Actor,
    ) -> Result<Record> {
        let source = self.record(record_id).await?;
        let family = self.store.family(source.code.base()).await?;
        let now = Utc::now();

        if let Err(err) = claim::check_eligibility(&source, &family, &self.config, now) {
            self.audit(
                self.event(AuditAction::ClaimDenied, actor, &source)
                    .reason(err.user_reason().unwrap_or_else(|| err.to_string())),
            );
            metrics::record_claim_denied("ineligible");
            return Err(err);
        }

        let current_claims = family
            .iter()
            .map(|r| r.claims_number)
            .max()
            .unwrap_or(source.claims_number);
        let ticket = RecordCode::next_ticket(current_claims);
        let mut claim = claim::build_claim(&source, ticket, description, &options, now);

        if options.kind == ClaimKind::Citizen {
            let mut request = DerivationRequest::new(
                claim.theme,
                claim.state,
                DerivationReason::ClaimDerivation,
            );
            if let Some(district) = claim.district {
                request = request.with_district(district);
            }
            claim.responsible_group = self
                .derive_or_degrade(&request, claim.id, &claim.code, actor, "create_claim")
                .await;
        }

        let mut source_updated = source.clone();
        source_updated.claims_number = ticket;
        if options.kind == ClaimKind::Citizen {
            source_updated.alarms.citizen_claim = true;
        }
        source_updated.touch(now);

        let history = StateHistoryEntry::creation(
            claim.id,
            claim.state,
            actor.clone(),
            claim.responsible_group,
            options.comment.clone(),
            now,
        );
        let reassignment = claim.responsible_group.map(|group| {
            Reassignment::new(
                claim.id,
                None,
                group,
                ReassignmentReason::ClaimDerivation,
                actor.clone(),
                now,
            )
        });

        let synchronized: Vec<RecordId> = family
            .iter()
            .map(|r| r.id)
            .filter(|id| *id != source.id)
            .collect();
        tracing::info!(
            claim_id = %claim.id,
            ticket,
            synchronized = synchronized.len(),
            "synchronizing claim count across the family"
        );

        self.store
            .commit_claim(ClaimBatch {
                claim: claim.clone(),
                source: source_updated,
                history,
                reassignment,
                claims_number: ticket,
                synchronized,
            })
            .await?;

        self.audit(
            self.event(AuditAction::ClaimCreated, actor, &claim)
                .reason(format!("claim ticket {ticket:02} on {}", source.code)),
        );
        metrics::record_claim_created(match options.kind {
            ClaimKind::Citizen => "citizen",
            ClaimKind::Internal => "internal",
        });
        self.notify(Notification::ClaimCreated {
            claim: claim.id,
            code: claim.code.clone(),
            source: source.id,
        })
        .await;

        Ok(claim)
    }

    // ------------------------------------------------------------------
    // Reassignment
    // ------------------------------------------------------------------

    /// Hands a record (and its workflow bundle) to another group.
    ///
    /// The target must differ from the current group, the record must
    /// allow reassignment and still be open, and the target must lie
    /// in the actor's ambit unless the actor may reassign outside it.
    /// Every open bundle member moves in one atomic batch; terminal
    /// members and members already on the target group stay put.
    #[tracing::instrument(
        skip(self, cmd),
        fields(record_id = %cmd.record_id, next_group = %cmd.next_group)
    )]
    pub async fn request_reassignment(&self, cmd: ReassignmentCommand) -> Result<Vec<Record>> {
        let record = self.record(cmd.record_id).await?;

        if let Err(err) = self.validate_reassignment(&record, &cmd) {
            self.audit(
                self.event(AuditAction::ReassignmentDenied, &cmd.actor, &record)
                    .group(cmd.next_group.to_string())
                    .reason(err.user_reason().unwrap_or_else(|| err.to_string())),
            );
            return Err(err);
        }

        let bundle = match record.workflow {
            Some(workflow) => {
                let members = self.store.in_workflow(workflow).await?;
                tracing::info!(
                    workflow = %workflow,
                    members = members.len(),
                    "reassignment cascades across the workflow bundle"
                );
                members
            }
            None => vec![record],
        };

        let now = Utc::now();
        let mut updates = Vec::new();
        for mut member in bundle {
            if member.is_terminal() || member.responsible_group == Some(cmd.next_group) {
                continue;
            }
            let previous_group = member.responsible_group;
            let closed_threads = member.hand_over_to(cmd.next_group);
            if !closed_threads.is_empty() {
                tracing::info!(
                    record_id = %member.id,
                    closed = closed_threads.len(),
                    "closed internal conversations on handover"
                );
            }
            member.touch(now);

            let mut row = Reassignment::new(
                member.id,
                previous_group,
                cmd.next_group,
                ReassignmentReason::ManualReassignment,
                cmd.actor.clone(),
                now,
            )
            .with_stated_reason(cmd.reason.clone());
            if let Some(comment) = &cmd.comment {
                row = row.with_comment(comment.clone());
            }
            updates.push(ReassignmentUpdate {
                record: member,
                reassignment: row,
            });
        }

        self.store
            .commit_reassignment(ReassignmentBatch {
                updates: updates.clone(),
            })
            .await?;

        let mut moved = Vec::with_capacity(updates.len());
        for update in updates {
            let mut applied = self
                .event(AuditAction::ReassignmentApplied, &cmd.actor, &update.record)
                .group(cmd.next_group.to_string())
                .reason(cmd.reason.clone());
            if let Some(previous) = update.reassignment.previous_group {
                applied = applied.previous_group(previous.to_string());
            }
            self.audit(applied);

            self.notify(Notification::RecordReassigned {
                record: update.record.id,
                code: update.record.code.clone(),
                previous_group: update.reassignment.previous_group,
                next_group: cmd.next_group,
            })
            .await;
            moved.push(update.record);
        }
        metrics::record_reassignments_applied(moved.len() as u64);

        Ok(moved)
    }

    fn validate_reassignment(&self, record: &Record, cmd: &ReassignmentCommand) -> Result<()> {
        if !self.groups.contains(cmd.next_group) {
            return Err(Error::validation(format!(
                "unknown group {}",
                cmd.next_group
            )));
        }
        if record.responsible_group == Some(cmd.next_group) {
            return Err(Error::validation(
                "record is already assigned to that group",
            ));
        }
        if record.reassignment_not_allowed {
            return Err(Error::validation(
                "reassignment is disabled for this record",
            ));
        }
        if record.is_terminal() {
            return Err(Error::conflict("record is closed"));
        }
        if !self.groups.same_ambit(cmd.actor_group, cmd.next_group)
            && !self
                .permissions
                .has_capability(&cmd.actor, Capability::ReassignOutsideAmbit)
        {
            return Err(Error::validation("target group is outside your ambit"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derivation wrapper
    // ------------------------------------------------------------------

    /// Runs the routing rules for a record against a target state.
    ///
    /// In [`DeriveMode::Check`] this is a pure question. In
    /// [`DeriveMode::Apply`] a proposed group change is committed with
    /// a reassignment row. Either way, routing failures surface to the
    /// caller instead of degrading.
    pub async fn derive(
        &self,
        record: &Record,
        target: RecordState,
        mode: DeriveMode,
        actor: &Actor,
    ) -> Result<Option<Derivation>> {
        let mut request =
            DerivationRequest::new(record.theme, target, DerivationReason::Derivation);
        if let Some(district) = record.district {
            request = request.with_district(district);
        }
        let derivation = self.engine.derive(&request).await?;

        if mode == DeriveMode::Apply {
            if let Some(found) = derivation {
                if record.responsible_group != Some(found.group) {
                    let now = Utc::now();
                    let mut updated = record.clone();
                    let previous_group = updated.responsible_group;
                    let closed_threads = updated.hand_over_to(found.group);
                    if !closed_threads.is_empty() {
                        tracing::info!(
                            record_id = %record.id,
                            closed = closed_threads.len(),
                            "closed internal conversations on handover"
                        );
                    }
                    updated.touch(now);

                    let row = Reassignment::new(
                        record.id,
                        previous_group,
                        found.group,
                        ReassignmentReason::Derivation,
                        actor.clone(),
                        now,
                    );
                    self.store
                        .commit_reassignment(ReassignmentBatch {
                            updates: vec![ReassignmentUpdate {
                                record: updated,
                                reassignment: row,
                            }],
                        })
                        .await?;

                    let mut applied = self
                        .event(AuditAction::ReassignmentApplied, actor, record)
                        .group(found.group.to_string())
                        .reason("derivation applied");
                    if let Some(previous) = previous_group {
                        applied = applied.previous_group(previous.to_string());
                    }
                    self.audit(applied);
                    self.notify(Notification::RecordReassigned {
                        record: record.id,
                        code: record.code.clone(),
                        previous_group,
                        next_group: found.group,
                    })
                    .await;
                }
            }
        }

        Ok(derivation)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Resolves the state a move to `target` actually ends in.
    ///
    /// The answer-aware handler diverts to `CLOSED` when the applicant
    /// cannot be answered; the graph guarantees the diversion is legal
    /// from every answer-feeding step.
    fn effective_target(
        &self,
        record: &Record,
        target: RecordState,
    ) -> Result<(RecordState, bool)> {
        let handler = self.registry.handler_for(record.process, target)?;
        if handler == TransitionHandler::AnswerAwareStateChange && !record.wants_response() {
            self.registry
                .transition(record.process, record.state, RecordState::Closed)?;
            return Ok((RecordState::Closed, true));
        }
        Ok((target, false))
    }

    /// Runs a derivation, degrading to the error group on failure.
    async fn derive_or_degrade(
        &self,
        request: &DerivationRequest,
        record_id: RecordId,
        code: &RecordCode,
        actor: &Actor,
        operation: &'static str,
    ) -> Option<GroupId> {
        match self.engine.derive(request).await {
            Ok(found) => found.map(|d| d.group),
            Err(err) => {
                let error_group = self.engine.error_group();
                tracing::warn!(
                    error = %err,
                    record_id = %record_id,
                    operation,
                    error_group = %error_group,
                    "routing failed; degrading to the error group"
                );
                let event = AuditEventBuilder::default()
                    .action(AuditAction::RoutingDegraded)
                    .actor(actor.id.clone())
                    .record_id(record_id.to_string())
                    .record_code(code.to_string())
                    .group(error_group.to_string())
                    .reason(format!("routing failed during {operation}: {err}"));
                self.audit(event);
                metrics::record_routing_degraded(operation);
                Some(error_group)
            }
        }
    }

    /// Starts an audit event for a lifecycle decision on `record`.
    fn event(&self, action: AuditAction, actor: &Actor, record: &Record) -> AuditEventBuilder {
        AuditEventBuilder::default()
            .action(action)
            .actor(actor.id.clone())
            .record_id(record.id.to_string())
            .record_code(record.code.to_string())
    }

    fn audit(&self, builder: AuditEventBuilder) {
        match builder.try_build() {
            Ok(event) => self.audit.emit(event),
            Err(err) => tracing::error!(error = %err, "audit event construction failed"),
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(err) = self.dispatcher.dispatch(notification).await {
            tracing::warn!(error = %err, "notification dispatch failed");
        }
    }
}
