//! Property-based tests for civis-flow invariants.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;

use civis_core::permission::{Capability, CapabilitySet};
use civis_flow::registry::ProcessRegistry;
use civis_flow::{Process, RecordState};

fn arb_process() -> impl Strategy<Value = Process> {
    prop::sample::select(Process::ALL.to_vec())
}

/// Generates an arbitrary subset of the capability set.
fn arb_caps() -> impl Strategy<Value = CapabilitySet> {
    prop::sample::subsequence(Capability::ALL.to_vec(), 0..=Capability::ALL.len())
        .prop_map(|caps| caps.into_iter().collect())
}

fn all_states() -> Vec<RecordState> {
    vec![
        RecordState::NoProcessed,
        RecordState::PendingValidate,
        RecordState::InPlanning,
        RecordState::InResolution,
        RecordState::PendingAnswer,
        RecordState::ExternalProcessing,
        RecordState::ExternalProcessingEmail,
        RecordState::ExternalReturned,
        RecordState::Closed,
        RecordState::Cancelled,
    ]
}

proptest! {
    /// INVARIANT: The filtered offer view is exactly the allowed subset of
    /// the full view, and a gate passes iff the capability is held.
    #[test]
    fn offers_are_the_allowed_slice_of_the_full_view(
        process in arb_process(),
        state in prop::sample::select(all_states()),
        caps in arb_caps(),
    ) {
        let registry = ProcessRegistry::builtin().expect("builtin registry");

        let allowed = registry.transitions_for(process, state, &caps);
        let full = registry.transitions_with_forbidden(process, state, &caps);

        for (action, offer) in &allowed {
            prop_assert!(offer.allowed);
            prop_assert!(full.contains_key(action));
            prop_assert!(
                offer.capability.map_or(true, |c| caps.contains(&c)),
                "allowed offer {action} gated on a capability the caller lacks"
            );
        }

        for (action, offer) in &full {
            let expected = offer.capability.map_or(true, |c| caps.contains(&c));
            prop_assert_eq!(offer.allowed, expected);
            prop_assert_eq!(allowed.contains_key(action), expected);
        }
    }

    /// INVARIANT: Every ideal path visits each state at most once and runs
    /// from the entry state to CLOSED.
    #[test]
    fn ideal_paths_are_simple_entry_to_closed(process in arb_process()) {
        let registry = ProcessRegistry::builtin().expect("builtin registry");
        let path = registry.ideal_path(process).expect("ideal path");

        prop_assert_eq!(path.first(), Some(&registry.initial_state(process).expect("entry")));
        prop_assert_eq!(path.last(), Some(&RecordState::Closed));

        let mut seen = std::collections::BTreeSet::new();
        for state in path {
            prop_assert!(seen.insert(state), "ideal path revisits {state}");
        }
    }

    /// INVARIANT: The nominal next state agrees with ideal-path adjacency.
    #[test]
    fn next_step_matches_ideal_path_adjacency(process in arb_process()) {
        let registry = ProcessRegistry::builtin().expect("builtin registry");
        let path = registry.ideal_path(process).expect("ideal path");

        for pair in path.windows(2) {
            prop_assert_eq!(registry.next_step_code(process, pair[0]), Some(pair[1]));
        }
        prop_assert_eq!(registry.next_step_code(process, *path.last().unwrap()), None);
    }

    /// INVARIANT: Legality agrees with the declared transition targets.
    #[test]
    fn legality_matches_declared_targets(
        process in arb_process(),
        from in prop::sample::select(all_states()),
        to in prop::sample::select(all_states()),
    ) {
        let registry = ProcessRegistry::builtin().expect("builtin registry");
        let caps: CapabilitySet = Capability::ALL.iter().copied().collect();

        let declared = registry
            .transitions_with_forbidden(process, from, &caps)
            .values()
            .any(|offer| offer.target == to);

        prop_assert_eq!(registry.is_legal(process, from, to), declared);
    }

    /// INVARIANT: Terminal states never offer a move, under any capability set.
    #[test]
    fn terminal_states_offer_nothing(process in arb_process(), caps in arb_caps()) {
        let registry = ProcessRegistry::builtin().expect("builtin registry");
        for terminal in [RecordState::Closed, RecordState::Cancelled] {
            let full = registry.transitions_with_forbidden(process, terminal, &caps);
            prop_assert!(full.is_empty(), "{process} offers moves from {terminal}");
        }
    }
}
