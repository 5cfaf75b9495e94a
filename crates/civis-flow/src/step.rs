//! Steps, transitions, and entry handlers.
//!
//! A process graph is a set of steps, one per reachable state. Each step
//! lists its outgoing transitions keyed by action; at most one of them is
//! flagged *ideal* and forms the nominal path. The entry handler sits on
//! the step, not on the transition: every transition entering a state is
//! handled the same way.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use civis_core::permission::{Capability, CapabilitySet};

use crate::state::RecordState;

/// Actions a caller can invoke on a step.
///
/// The slug is the stable wire name used in offers, history comments,
/// and audit reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    /// Admit a parked record into validation.
    Admit,
    /// Validate intake and move the record along its nominal path.
    Validate,
    /// Finish planning.
    Plan,
    /// Finish resolution.
    Resolute,
    /// Answer the applicant.
    Answer,
    /// Close without answering.
    Close,
    /// Cancel the record.
    Cancel,
    /// Register a return from the external operator.
    ExternalReturn,
    /// Re-send a returned record to the external operator.
    Reprocess,
    /// Close after external processing finished.
    ExternalClose,
}

impl TransitionAction {
    /// Returns the stable string form.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::Validate => "validate",
            Self::Plan => "plan",
            Self::Resolute => "resolute",
            Self::Answer => "answer",
            Self::Close => "close",
            Self::Cancel => "cancel",
            Self::ExternalReturn => "external_return",
            Self::Reprocess => "reprocess",
            Self::ExternalClose => "external_close",
        }
    }
}

impl std::fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// How a step handles transitions entering it.
///
/// Handlers are a closed set. The graph configuration names the handler;
/// the lifecycle service interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionHandler {
    /// Plain state change.
    #[default]
    GenericStateChange,
    /// State change that first checks whether an answer can actually be
    /// delivered; entering with no response channel diverts the record to
    /// `CLOSED` instead.
    AnswerAwareStateChange,
}

/// One outgoing transition of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDescriptor {
    /// The action invoking this transition.
    pub action: TransitionAction,

    /// The state the transition moves to.
    pub target: RecordState,

    /// Capability required to invoke it, if gated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,

    /// True if this transition lies on the nominal path.
    pub ideal: bool,
}

/// One step of a process graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    /// The state this step describes.
    pub state: RecordState,

    /// True if this is the nominal entry step of the process.
    pub initial: bool,

    /// How transitions entering this step are handled.
    pub handler: TransitionHandler,

    /// Outgoing transitions keyed by action.
    pub transitions: BTreeMap<TransitionAction, TransitionDescriptor>,
}

impl StepDescriptor {
    /// Returns the transition for an action, if defined.
    #[must_use]
    pub fn transition(&self, action: TransitionAction) -> Option<&TransitionDescriptor> {
        self.transitions.get(&action)
    }

    /// Returns the transition targeting a state, if defined.
    ///
    /// Graph validation guarantees at most one transition per target.
    #[must_use]
    pub fn transition_to(&self, target: RecordState) -> Option<&TransitionDescriptor> {
        self.transitions.values().find(|t| t.target == target)
    }

    /// Returns the ideal outgoing transition, if the step has one.
    #[must_use]
    pub fn ideal_transition(&self) -> Option<&TransitionDescriptor> {
        self.transitions.values().find(|t| t.ideal)
    }

    /// Returns the offers of this step visible to a holder of `caps`.
    ///
    /// Ungated transitions are always offered; gated ones only when the
    /// capability is held.
    #[must_use]
    pub fn offers(&self, caps: &CapabilitySet) -> BTreeMap<TransitionAction, TransitionOffer> {
        self.transitions
            .values()
            .filter(|t| t.capability.map_or(true, |c| caps.contains(&c)))
            .map(|t| (t.action, TransitionOffer::allowed(t)))
            .collect()
    }

    /// Returns every offer of this step, flagging the ones `caps` cannot
    /// invoke. For supervision views that show withheld actions.
    #[must_use]
    pub fn offers_with_forbidden(
        &self,
        caps: &CapabilitySet,
    ) -> BTreeMap<TransitionAction, TransitionOffer> {
        self.transitions
            .values()
            .map(|t| {
                let allowed = t.capability.map_or(true, |c| caps.contains(&c));
                (t.action, TransitionOffer::new(t, allowed))
            })
            .collect()
    }
}

/// A transition as offered to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOffer {
    /// The action to invoke.
    pub action: TransitionAction,

    /// The state the action moves to.
    pub target: RecordState,

    /// Capability required, if gated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,

    /// True if this transition lies on the nominal path.
    pub ideal: bool,

    /// False when the caller lacks the required capability.
    pub allowed: bool,
}

impl TransitionOffer {
    fn new(t: &TransitionDescriptor, allowed: bool) -> Self {
        Self {
            action: t.action,
            target: t.target,
            capability: t.capability,
            ideal: t.ideal,
            allowed,
        }
    }

    fn allowed(t: &TransitionDescriptor) -> Self {
        Self::new(t, true)
    }
}

// ============================================================================
// Graph specification (registry build input)
// ============================================================================

/// Specification of one transition, used to assemble graphs.
#[derive(Debug, Clone)]
pub struct TransitionSpec {
    /// The invoking action.
    pub action: TransitionAction,
    /// The target state.
    pub target: RecordState,
    /// Required capability, if gated.
    pub capability: Option<Capability>,
    /// Nominal-path flag.
    pub ideal: bool,
}

impl TransitionSpec {
    /// A non-ideal transition.
    #[must_use]
    pub const fn new(action: TransitionAction, target: RecordState) -> Self {
        Self {
            action,
            target,
            capability: None,
            ideal: false,
        }
    }

    /// An ideal (nominal-path) transition.
    #[must_use]
    pub const fn ideal(action: TransitionAction, target: RecordState) -> Self {
        Self {
            action,
            target,
            capability: None,
            ideal: true,
        }
    }

    /// Gates the transition on a capability.
    #[must_use]
    pub const fn requires(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }
}

/// Specification of one step, used to assemble graphs.
#[derive(Debug, Clone)]
pub struct StepSpec {
    /// The state this step describes.
    pub state: RecordState,
    /// Nominal entry flag.
    pub initial: bool,
    /// Entry handler.
    pub handler: TransitionHandler,
    /// Outgoing transitions.
    pub transitions: Vec<TransitionSpec>,
}

impl StepSpec {
    /// A plain step with no transitions.
    #[must_use]
    pub const fn new(state: RecordState) -> Self {
        Self {
            state,
            initial: false,
            handler: TransitionHandler::GenericStateChange,
            transitions: Vec::new(),
        }
    }

    /// Marks the step as the nominal entry of its process.
    #[must_use]
    pub const fn entry(mut self) -> Self {
        self.initial = true;
        self
    }

    /// Sets the entry handler.
    #[must_use]
    pub const fn handler(mut self, handler: TransitionHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Adds an outgoing transition.
    #[must_use]
    pub fn transition(mut self, spec: TransitionSpec) -> Self {
        self.transitions.push(spec);
        self
    }
}

/// Specification of one full process graph.
#[derive(Debug, Clone)]
pub struct GraphSpec {
    /// The process this graph belongs to.
    pub process: crate::process::Process,
    /// The steps of the graph.
    pub steps: Vec<StepSpec>,
}

impl GraphSpec {
    /// An empty graph for a process.
    #[must_use]
    pub const fn new(process: crate::process::Process) -> Self {
        Self {
            process,
            steps: Vec::new(),
        }
    }

    /// Adds a step.
    #[must_use]
    pub fn step(mut self, spec: StepSpec) -> Self {
        self.steps.push(spec);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_step() -> StepDescriptor {
        let mut transitions = BTreeMap::new();
        transitions.insert(
            TransitionAction::Validate,
            TransitionDescriptor {
                action: TransitionAction::Validate,
                target: RecordState::InResolution,
                capability: Some(Capability::Validate),
                ideal: true,
            },
        );
        transitions.insert(
            TransitionAction::Cancel,
            TransitionDescriptor {
                action: TransitionAction::Cancel,
                target: RecordState::Cancelled,
                capability: Some(Capability::Cancel),
                ideal: false,
            },
        );
        StepDescriptor {
            state: RecordState::PendingValidate,
            initial: true,
            handler: TransitionHandler::GenericStateChange,
            transitions,
        }
    }

    #[test]
    fn ideal_transition_found() {
        let step = sample_step();
        let ideal = step.ideal_transition().unwrap();
        assert_eq!(ideal.action, TransitionAction::Validate);
        assert_eq!(ideal.target, RecordState::InResolution);
    }

    #[test]
    fn transition_to_finds_by_target() {
        let step = sample_step();
        let t = step.transition_to(RecordState::Cancelled).unwrap();
        assert_eq!(t.action, TransitionAction::Cancel);
        assert!(step.transition_to(RecordState::Closed).is_none());
    }

    #[test]
    fn offers_filter_by_capability() {
        let step = sample_step();

        let mut caps = CapabilitySet::new();
        caps.insert(Capability::Validate);

        let offers = step.offers(&caps);
        assert_eq!(offers.len(), 1);
        assert!(offers.contains_key(&TransitionAction::Validate));

        let all = step.offers_with_forbidden(&caps);
        assert_eq!(all.len(), 2);
        assert!(all[&TransitionAction::Validate].allowed);
        assert!(!all[&TransitionAction::Cancel].allowed);
    }

    #[test]
    fn action_slug_stability() {
        assert_eq!(TransitionAction::Validate.slug(), "validate");
        assert_eq!(TransitionAction::ExternalReturn.slug(), "external_return");
        let json = serde_json::to_string(&TransitionAction::ExternalClose).unwrap();
        assert_eq!(json, "\"external_close\"");
    }
}
