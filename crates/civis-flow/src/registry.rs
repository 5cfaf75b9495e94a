//! The immutable process registry.
//!
//! The registry holds one validated graph per process. It is built once at
//! startup ([`ProcessRegistry::builtin`] for the nine shipped processes, or
//! [`ProcessRegistry::from_graphs`] for custom sets) and shared read-only;
//! nothing mutates a graph after construction.
//!
//! Build-time validation is strict so runtime lookups can be simple:
//!
//! - exactly one entry step per graph, and it is not terminal
//! - every transition targets a declared step, never its own state
//! - at most one ideal transition per step, one transition per target
//! - terminal steps have no outgoing transitions
//! - the ideal walk from the entry never revisits a state (the path is
//!   precomputed here, so runtime reads cannot loop)
//! - every step reaches a terminal state

use std::collections::BTreeMap;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};

use civis_core::permission::{Capability, CapabilitySet};

use crate::error::{Error, Result};
use crate::process::Process;
use crate::state::RecordState;
use crate::step::{
    GraphSpec, StepDescriptor, StepSpec, TransitionAction, TransitionDescriptor,
    TransitionHandler, TransitionOffer, TransitionSpec,
};

/// One validated process graph.
#[derive(Debug, Clone)]
pub struct ProcessGraph {
    process: Process,
    initial: RecordState,
    steps: BTreeMap<RecordState, StepDescriptor>,
    ideal_path: Vec<RecordState>,
}

impl ProcessGraph {
    /// Validates a spec and precomputes the ideal path.
    fn from_spec(spec: GraphSpec) -> Result<Self> {
        let process = spec.process;

        if spec.steps.is_empty() {
            return Err(Error::configuration(format!("process {process} has no steps")));
        }

        let mut steps: BTreeMap<RecordState, StepDescriptor> = BTreeMap::new();
        let mut initial: Option<RecordState> = None;

        for step_spec in spec.steps {
            let state = step_spec.state;
            if steps.contains_key(&state) {
                return Err(Error::configuration(format!(
                    "process {process} declares state {state} twice"
                )));
            }
            if step_spec.initial {
                if state.is_terminal() {
                    return Err(Error::configuration(format!(
                        "process {process} marks terminal state {state} as entry"
                    )));
                }
                if let Some(previous) = initial {
                    return Err(Error::configuration(format!(
                        "process {process} marks both {previous} and {state} as entry"
                    )));
                }
                initial = Some(state);
            }
            if state.is_terminal() && !step_spec.transitions.is_empty() {
                return Err(Error::configuration(format!(
                    "process {process} gives terminal state {state} outgoing transitions"
                )));
            }
            steps.insert(state, Self::build_step(process, step_spec)?);
        }

        let Some(initial) = initial else {
            return Err(Error::configuration(format!(
                "process {process} has no entry step"
            )));
        };

        for step in steps.values() {
            for transition in step.transitions.values() {
                if !steps.contains_key(&transition.target) {
                    return Err(Error::configuration(format!(
                        "process {process} transition {} -> {} targets an undeclared state",
                        step.state, transition.target
                    )));
                }
            }
        }

        let ideal_path = Self::walk_ideal_path(process, initial, &steps)?;
        Self::check_terminal_reachability(process, &steps)?;

        Ok(Self {
            process,
            initial,
            steps,
            ideal_path,
        })
    }

    fn build_step(process: Process, spec: StepSpec) -> Result<StepDescriptor> {
        let state = spec.state;
        let mut transitions: BTreeMap<TransitionAction, TransitionDescriptor> = BTreeMap::new();
        let mut ideal_seen = false;

        for t in spec.transitions {
            if t.target == state {
                return Err(Error::configuration(format!(
                    "process {process} step {state} declares a self-transition ({})",
                    t.action
                )));
            }
            if t.ideal {
                if ideal_seen {
                    return Err(Error::configuration(format!(
                        "process {process} step {state} declares two ideal transitions"
                    )));
                }
                ideal_seen = true;
            }
            if transitions.values().any(|existing| existing.target == t.target) {
                return Err(Error::configuration(format!(
                    "process {process} step {state} declares two transitions to {}",
                    t.target
                )));
            }
            if transitions
                .insert(
                    t.action,
                    TransitionDescriptor {
                        action: t.action,
                        target: t.target,
                        capability: t.capability,
                        ideal: t.ideal,
                    },
                )
                .is_some()
            {
                return Err(Error::configuration(format!(
                    "process {process} step {state} declares action {} twice",
                    t.action
                )));
            }
        }

        Ok(StepDescriptor {
            state,
            initial: spec.initial,
            handler: spec.handler,
            transitions,
        })
    }

    /// Follows ideal transitions from the entry, refusing any revisit.
    fn walk_ideal_path(
        process: Process,
        initial: RecordState,
        steps: &BTreeMap<RecordState, StepDescriptor>,
    ) -> Result<Vec<RecordState>> {
        let mut path = vec![initial];
        let mut current = initial;

        loop {
            let step = steps.get(&current).ok_or_else(|| {
                Error::configuration(format!("process {process} has no step for state {current}"))
            })?;
            let Some(next) = step.ideal_transition().map(|t| t.target) else {
                break;
            };
            if path.contains(&next) {
                return Err(Error::configuration(format!(
                    "process {process} ideal path revisits {next}"
                )));
            }
            path.push(next);
            current = next;
        }

        Ok(path)
    }

    /// Every step must reach some terminal step.
    fn check_terminal_reachability(
        process: Process,
        steps: &BTreeMap<RecordState, StepDescriptor>,
    ) -> Result<()> {
        let mut graph: DiGraph<RecordState, ()> = DiGraph::new();
        let mut indices: BTreeMap<RecordState, NodeIndex> = BTreeMap::new();

        for state in steps.keys() {
            indices.insert(*state, graph.add_node(*state));
        }
        for step in steps.values() {
            let from = indices[&step.state];
            for transition in step.transitions.values() {
                graph.add_edge(from, indices[&transition.target], ());
            }
        }

        let terminals: Vec<NodeIndex> = steps
            .keys()
            .filter(|s| s.is_terminal())
            .map(|s| indices[s])
            .collect();
        if terminals.is_empty() {
            return Err(Error::configuration(format!(
                "process {process} declares no terminal state"
            )));
        }

        for (state, &index) in &indices {
            let reaches = terminals
                .iter()
                .any(|&t| has_path_connecting(&graph, index, t, None));
            if !reaches {
                return Err(Error::configuration(format!(
                    "process {process} state {state} cannot reach a terminal state"
                )));
            }
        }

        Ok(())
    }

    /// The process this graph belongs to.
    #[must_use]
    pub const fn process(&self) -> Process {
        self.process
    }

    /// The nominal entry state.
    #[must_use]
    pub const fn initial_state(&self) -> RecordState {
        self.initial
    }

    /// The step for a state, if the graph declares it.
    #[must_use]
    pub fn step(&self, state: RecordState) -> Option<&StepDescriptor> {
        self.steps.get(&state)
    }

    /// The precomputed nominal path, entry state first.
    #[must_use]
    pub fn ideal_path(&self) -> &[RecordState] {
        &self.ideal_path
    }

    /// The states this graph declares, in order.
    pub fn states(&self) -> impl Iterator<Item = RecordState> + '_ {
        self.steps.keys().copied()
    }
}

/// The registry of validated process graphs.
#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    graphs: BTreeMap<Process, ProcessGraph>,
}

impl ProcessRegistry {
    /// Builds a registry from graph specifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a graph is inconsistent or a
    /// process appears twice.
    pub fn from_graphs(specs: Vec<GraphSpec>) -> Result<Self> {
        let mut graphs = BTreeMap::new();
        for spec in specs {
            let process = spec.process;
            if graphs.contains_key(&process) {
                return Err(Error::configuration(format!(
                    "process {process} registered twice"
                )));
            }
            graphs.insert(process, ProcessGraph::from_spec(spec)?);
        }
        tracing::debug!(graphs = graphs.len(), "process registry built");
        Ok(Self { graphs })
    }

    /// Builds the registry of the nine shipped processes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the shipped definitions are
    /// inconsistent; reaching that error is a bug.
    pub fn builtin() -> Result<Self> {
        Self::from_graphs(vec![
            closed_directly(),
            response(),
            resolution_response(),
            planning_resolution_response(),
            evaluation_resolution_response(),
            external_processing(),
            external_processing_email(),
            resolution_external_processing(),
            resolution_external_processing_email(),
        ])
    }

    /// Returns true if the registry has a graph for the process.
    #[must_use]
    pub fn contains(&self, process: Process) -> bool {
        self.graphs.contains_key(&process)
    }

    /// The graph of a process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unregistered process.
    pub fn graph(&self, process: Process) -> Result<&ProcessGraph> {
        self.graphs.get(&process).ok_or_else(|| {
            Error::configuration(format!("no graph registered for process {process}"))
        })
    }

    /// The step a record in `(process, state)` currently sits on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the process is unregistered or
    /// the graph has no step for the state. Absence is a configuration
    /// defect, never defaulted.
    pub fn current_step(&self, process: Process, state: RecordState) -> Result<&StepDescriptor> {
        self.graph(process)?.step(state).ok_or_else(|| {
            Error::configuration(format!("process {process} has no step for state {state}"))
        })
    }

    /// The nominal entry state of a process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unregistered process.
    pub fn initial_state(&self, process: Process) -> Result<RecordState> {
        Ok(self.graph(process)?.initial_state())
    }

    /// The precomputed nominal path of a process, entry state first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unregistered process.
    pub fn ideal_path(&self, process: Process) -> Result<&[RecordState]> {
        Ok(self.graph(process)?.ideal_path())
    }

    /// The nominal next state from `(process, state)`, if one exists.
    ///
    /// Unknown processes, undeclared states, and steps without an ideal
    /// transition all answer `None`.
    #[must_use]
    pub fn next_step_code(&self, process: Process, state: RecordState) -> Option<RecordState> {
        self.graphs
            .get(&process)?
            .step(state)?
            .ideal_transition()
            .map(|t| t.target)
    }

    /// The entry handler of the step for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the step is not declared.
    pub fn handler_for(&self, process: Process, target: RecordState) -> Result<TransitionHandler> {
        Ok(self.current_step(process, target)?.handler)
    }

    /// The transitions a holder of `caps` may invoke from `(process, state)`.
    ///
    /// Unknown processes and undeclared states answer an empty map.
    #[must_use]
    pub fn transitions_for(
        &self,
        process: Process,
        state: RecordState,
        caps: &CapabilitySet,
    ) -> BTreeMap<TransitionAction, TransitionOffer> {
        self.graphs
            .get(&process)
            .and_then(|g| g.step(state))
            .map(|step| step.offers(caps))
            .unwrap_or_default()
    }

    /// Every transition from `(process, state)`, flagging the ones `caps`
    /// cannot invoke.
    #[must_use]
    pub fn transitions_with_forbidden(
        &self,
        process: Process,
        state: RecordState,
        caps: &CapabilitySet,
    ) -> BTreeMap<TransitionAction, TransitionOffer> {
        self.graphs
            .get(&process)
            .and_then(|g| g.step(state))
            .map(|step| step.offers_with_forbidden(caps))
            .unwrap_or_default()
    }

    /// Returns true if the graph allows moving `from -> to`.
    #[must_use]
    pub fn is_legal(&self, process: Process, from: RecordState, to: RecordState) -> bool {
        self.transition(process, from, to).is_ok()
    }

    /// The transition moving `from -> to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] when the graph declares no such
    /// move, and [`Error::Configuration`] when `(process, from)` is not a
    /// declared step.
    pub fn transition(
        &self,
        process: Process,
        from: RecordState,
        to: RecordState,
    ) -> Result<&TransitionDescriptor> {
        let step = self.current_step(process, from)?;
        step.transition_to(to).ok_or_else(|| {
            Error::illegal_transition(from, to, format!("process {process} allows no such move"))
        })
    }
}

// ============================================================================
// Shipped graph definitions
// ============================================================================

fn no_processed() -> StepSpec {
    StepSpec::new(RecordState::NoProcessed).transition(
        TransitionSpec::ideal(TransitionAction::Admit, RecordState::PendingValidate)
            .requires(Capability::Validate),
    )
}

/// Entry step. Steps whose nominal target is `PENDING_ANSWER` also allow
/// closing without answer, the diversion target of the answer-aware handler.
fn pending_validate(target: RecordState) -> StepSpec {
    let step = StepSpec::new(RecordState::PendingValidate).entry().transition(
        TransitionSpec::ideal(TransitionAction::Validate, target).requires(Capability::Validate),
    );
    if target == RecordState::PendingAnswer {
        step.transition(
            TransitionSpec::new(TransitionAction::Close, RecordState::Closed)
                .requires(Capability::Close),
        )
    } else {
        step
    }
}

fn in_planning() -> StepSpec {
    StepSpec::new(RecordState::InPlanning).transition(
        TransitionSpec::ideal(TransitionAction::Plan, RecordState::InResolution)
            .requires(Capability::Plan),
    )
}

/// Resolution step. Same closing diversion rule as [`pending_validate`].
fn in_resolution(target: RecordState) -> StepSpec {
    let step = StepSpec::new(RecordState::InResolution).transition(
        TransitionSpec::ideal(TransitionAction::Resolute, target).requires(Capability::Resolute),
    );
    if target == RecordState::PendingAnswer {
        step.transition(
            TransitionSpec::new(TransitionAction::Close, RecordState::Closed)
                .requires(Capability::Close),
        )
    } else {
        step
    }
}

fn pending_answer() -> StepSpec {
    StepSpec::new(RecordState::PendingAnswer)
        .handler(TransitionHandler::AnswerAwareStateChange)
        .transition(
            TransitionSpec::ideal(TransitionAction::Answer, RecordState::Closed)
                .requires(Capability::Answer),
        )
}

fn external_processing_step() -> StepSpec {
    StepSpec::new(RecordState::ExternalProcessing)
        .transition(
            TransitionSpec::ideal(TransitionAction::ExternalClose, RecordState::Closed)
                .requires(Capability::ExternalManage),
        )
        .transition(
            TransitionSpec::new(TransitionAction::ExternalReturn, RecordState::ExternalReturned)
                .requires(Capability::ExternalManage),
        )
}

fn external_returned_step() -> StepSpec {
    StepSpec::new(RecordState::ExternalReturned).transition(
        TransitionSpec::ideal(TransitionAction::Reprocess, RecordState::ExternalProcessing)
            .requires(Capability::ExternalManage),
    )
}

fn external_email_step() -> StepSpec {
    StepSpec::new(RecordState::ExternalProcessingEmail).transition(
        TransitionSpec::ideal(TransitionAction::ExternalClose, RecordState::Closed)
            .requires(Capability::ExternalManage),
    )
}

/// Appends the terminal steps and gives every non-terminal step a
/// cancellation, so `CANCELLED` is reachable from the whole graph.
fn with_terminals(mut spec: GraphSpec) -> GraphSpec {
    for step in &mut spec.steps {
        if !step.state.is_terminal() {
            step.transitions.push(
                TransitionSpec::new(TransitionAction::Cancel, RecordState::Cancelled)
                    .requires(Capability::Cancel),
            );
        }
    }
    spec.step(StepSpec::new(RecordState::Closed))
        .step(StepSpec::new(RecordState::Cancelled))
}

fn closed_directly() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::ClosedDirectly)
            .step(no_processed())
            .step(pending_validate(RecordState::Closed)),
    )
}

fn response() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::Response)
            .step(no_processed())
            .step(pending_validate(RecordState::PendingAnswer))
            .step(pending_answer()),
    )
}

fn resolution_response() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::ResolutionResponse)
            .step(no_processed())
            .step(pending_validate(RecordState::InResolution))
            .step(in_resolution(RecordState::PendingAnswer))
            .step(pending_answer()),
    )
}

fn planning_resolution_response() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::PlanningResolutionResponse)
            .step(no_processed())
            .step(pending_validate(RecordState::InPlanning))
            .step(in_planning())
            .step(in_resolution(RecordState::PendingAnswer))
            .step(pending_answer()),
    )
}

/// Same spine as [`planning_resolution_response`]; the planning step hosts
/// the technical evaluation for these themes.
fn evaluation_resolution_response() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::EvaluationResolutionResponse)
            .step(no_processed())
            .step(pending_validate(RecordState::InPlanning))
            .step(in_planning())
            .step(in_resolution(RecordState::PendingAnswer))
            .step(pending_answer()),
    )
}

fn external_processing() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::ExternalProcessing)
            .step(no_processed())
            .step(pending_validate(RecordState::ExternalProcessing))
            .step(external_processing_step())
            .step(external_returned_step()),
    )
}

fn external_processing_email() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::ExternalProcessingEmail)
            .step(no_processed())
            .step(pending_validate(RecordState::ExternalProcessingEmail))
            .step(external_email_step()),
    )
}

fn resolution_external_processing() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::ResolutionExternalProcessing)
            .step(no_processed())
            .step(pending_validate(RecordState::InResolution))
            .step(in_resolution(RecordState::ExternalProcessing))
            .step(external_processing_step())
            .step(external_returned_step()),
    )
}

fn resolution_external_processing_email() -> GraphSpec {
    with_terminals(
        GraphSpec::new(Process::ResolutionExternalProcessingEmail)
            .step(no_processed())
            .step(pending_validate(RecordState::InResolution))
            .step(in_resolution(RecordState::ExternalProcessingEmail))
            .step(external_email_step()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(list: &[Capability]) -> CapabilitySet {
        list.iter().copied().collect()
    }

    #[test]
    fn builtin_registers_all_processes() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        for process in Process::ALL {
            assert!(registry.contains(process), "{process} missing");
        }
        Ok(())
    }

    #[test]
    fn every_ideal_path_runs_entry_to_closed() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        for process in Process::ALL {
            let path = registry.ideal_path(process)?;
            assert_eq!(path.first(), Some(&RecordState::PendingValidate), "{process}");
            assert_eq!(path.last(), Some(&RecordState::Closed), "{process}");
        }
        Ok(())
    }

    #[test]
    fn planning_path_has_all_stages() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        let path = registry.ideal_path(Process::PlanningResolutionResponse)?;
        assert_eq!(
            path,
            [
                RecordState::PendingValidate,
                RecordState::InPlanning,
                RecordState::InResolution,
                RecordState::PendingAnswer,
                RecordState::Closed,
            ]
        );
        Ok(())
    }

    #[test]
    fn closed_directly_path_is_two_states() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        let path = registry.ideal_path(Process::ClosedDirectly)?;
        assert_eq!(path, [RecordState::PendingValidate, RecordState::Closed]);
        Ok(())
    }

    #[test]
    fn transitions_filtered_by_capability() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;

        let offers = registry.transitions_for(
            Process::ResolutionResponse,
            RecordState::PendingValidate,
            &caps(&[Capability::Validate]),
        );
        assert_eq!(offers.len(), 1);
        assert!(offers.contains_key(&TransitionAction::Validate));

        let all = registry.transitions_with_forbidden(
            Process::ResolutionResponse,
            RecordState::PendingValidate,
            &caps(&[Capability::Validate]),
        );
        assert_eq!(all.len(), 2);
        assert!(all[&TransitionAction::Validate].allowed);
        assert!(!all[&TransitionAction::Cancel].allowed);

        Ok(())
    }

    #[test]
    fn undeclared_state_offers_nothing() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        let offers = registry.transitions_for(
            Process::ClosedDirectly,
            RecordState::InPlanning,
            &caps(&Capability::ALL),
        );
        assert!(offers.is_empty());
        Ok(())
    }

    #[test]
    fn next_step_follows_the_nominal_path() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        assert_eq!(
            registry.next_step_code(Process::PlanningResolutionResponse, RecordState::InResolution),
            Some(RecordState::PendingAnswer)
        );
        assert_eq!(
            registry.next_step_code(Process::PlanningResolutionResponse, RecordState::Closed),
            None
        );
        assert_eq!(
            registry.next_step_code(Process::ExternalProcessing, RecordState::ExternalReturned),
            Some(RecordState::ExternalProcessing)
        );
        Ok(())
    }

    #[test]
    fn handler_is_answer_aware_only_on_pending_answer() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        assert_eq!(
            registry.handler_for(Process::Response, RecordState::PendingAnswer)?,
            TransitionHandler::AnswerAwareStateChange
        );
        assert_eq!(
            registry.handler_for(Process::Response, RecordState::Closed)?,
            TransitionHandler::GenericStateChange
        );
        Ok(())
    }

    #[test]
    fn answer_feeding_steps_allow_direct_close() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        assert!(registry.is_legal(
            Process::ResolutionResponse,
            RecordState::InResolution,
            RecordState::Closed
        ));
        // Validation feeds resolution here, so it cannot short-circuit.
        assert!(!registry.is_legal(
            Process::ResolutionResponse,
            RecordState::PendingValidate,
            RecordState::Closed
        ));
        Ok(())
    }

    #[test]
    fn cancel_reachable_from_every_non_terminal_state() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        for process in Process::ALL {
            let graph = registry.graph(process)?;
            for state in graph.states().collect::<Vec<_>>() {
                if !state.is_terminal() {
                    assert!(
                        registry.is_legal(process, state, RecordState::Cancelled),
                        "{process} {state} cannot cancel"
                    );
                }
            }
        }
        Ok(())
    }

    #[test]
    fn returned_records_only_resend_or_cancel() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        for process in [
            Process::ExternalProcessing,
            Process::ResolutionExternalProcessing,
        ] {
            let step = registry.current_step(process, RecordState::ExternalReturned)?;
            let targets: Vec<RecordState> =
                step.transitions.values().map(|t| t.target).collect();
            assert_eq!(targets.len(), 2, "{process}");
            assert!(targets.contains(&RecordState::ExternalProcessing));
            assert!(targets.contains(&RecordState::Cancelled));
        }
        Ok(())
    }

    #[test]
    fn unknown_move_is_illegal() -> Result<()> {
        let registry = ProcessRegistry::builtin()?;
        let err = registry
            .transition(
                Process::ClosedDirectly,
                RecordState::PendingValidate,
                RecordState::InResolution,
            )
            .unwrap_err();
        assert!(matches!(err, Error::IllegalTransition { .. }));
        Ok(())
    }

    #[test]
    fn missing_entry_step_rejected() {
        let spec = GraphSpec::new(Process::Response)
            .step(StepSpec::new(RecordState::PendingValidate).transition(
                TransitionSpec::ideal(TransitionAction::Validate, RecordState::Closed),
            ))
            .step(StepSpec::new(RecordState::Closed));
        let err = ProcessRegistry::from_graphs(vec![spec]).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("no entry step"));
    }

    #[test]
    fn two_entry_steps_rejected() {
        let spec = GraphSpec::new(Process::Response)
            .step(StepSpec::new(RecordState::PendingValidate).entry().transition(
                TransitionSpec::ideal(TransitionAction::Validate, RecordState::Closed),
            ))
            .step(StepSpec::new(RecordState::InResolution).entry().transition(
                TransitionSpec::ideal(TransitionAction::Resolute, RecordState::Closed),
            ))
            .step(StepSpec::new(RecordState::Closed));
        let err = ProcessRegistry::from_graphs(vec![spec]).unwrap_err();
        assert!(err.to_string().contains("entry"));
    }

    #[test]
    fn ideal_self_loop_rejected() {
        let spec = GraphSpec::new(Process::Response)
            .step(
                StepSpec::new(RecordState::PendingValidate)
                    .entry()
                    .transition(TransitionSpec::ideal(
                        TransitionAction::Validate,
                        RecordState::PendingValidate,
                    ))
                    .transition(TransitionSpec::new(
                        TransitionAction::Close,
                        RecordState::Closed,
                    )),
            )
            .step(StepSpec::new(RecordState::Closed));
        let err = ProcessRegistry::from_graphs(vec![spec]).unwrap_err();
        assert!(err.to_string().contains("self-transition"));
    }

    #[test]
    fn ideal_cycle_rejected() {
        let spec = GraphSpec::new(Process::Response)
            .step(
                StepSpec::new(RecordState::PendingValidate)
                    .entry()
                    .transition(TransitionSpec::ideal(
                        TransitionAction::Validate,
                        RecordState::InResolution,
                    )),
            )
            .step(
                StepSpec::new(RecordState::InResolution)
                    .transition(TransitionSpec::ideal(
                        TransitionAction::Resolute,
                        RecordState::PendingValidate,
                    ))
                    .transition(TransitionSpec::new(
                        TransitionAction::Close,
                        RecordState::Closed,
                    )),
            )
            .step(StepSpec::new(RecordState::Closed));
        let err = ProcessRegistry::from_graphs(vec![spec]).unwrap_err();
        assert!(err.to_string().contains("revisits"));
    }

    #[test]
    fn unreachable_terminal_rejected() {
        // IN_PLANNING can only bounce back to the entry; nothing reaches CLOSED.
        let spec = GraphSpec::new(Process::Response)
            .step(
                StepSpec::new(RecordState::PendingValidate)
                    .entry()
                    .transition(TransitionSpec::ideal(
                        TransitionAction::Validate,
                        RecordState::InPlanning,
                    )),
            )
            .step(StepSpec::new(RecordState::InPlanning).transition(TransitionSpec::new(
                TransitionAction::Plan,
                RecordState::PendingValidate,
            )))
            .step(StepSpec::new(RecordState::Closed));
        let err = ProcessRegistry::from_graphs(vec![spec]).unwrap_err();
        assert!(err.to_string().contains("cannot reach a terminal state"));
    }

    #[test]
    fn undeclared_target_rejected() {
        let spec = GraphSpec::new(Process::Response).step(
            StepSpec::new(RecordState::PendingValidate)
                .entry()
                .transition(TransitionSpec::ideal(
                    TransitionAction::Validate,
                    RecordState::Closed,
                )),
        );
        let err = ProcessRegistry::from_graphs(vec![spec]).unwrap_err();
        assert!(err.to_string().contains("undeclared state"));
    }

    #[test]
    fn duplicate_process_rejected() {
        let err =
            ProcessRegistry::from_graphs(vec![closed_directly(), closed_directly()]).unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn terminal_step_with_transitions_rejected() {
        let spec = GraphSpec::new(Process::Response)
            .step(
                StepSpec::new(RecordState::PendingValidate)
                    .entry()
                    .transition(TransitionSpec::ideal(
                        TransitionAction::Validate,
                        RecordState::Closed,
                    )),
            )
            .step(StepSpec::new(RecordState::Closed).transition(TransitionSpec::new(
                TransitionAction::Reprocess,
                RecordState::PendingValidate,
            )));
        let err = ProcessRegistry::from_graphs(vec![spec]).unwrap_err();
        assert!(err.to_string().contains("terminal"));
    }
}
