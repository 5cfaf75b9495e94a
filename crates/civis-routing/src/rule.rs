//! Routing rules and derivation request/outcome types.
//!
//! A routing rule names the group responsible for records of a theme once
//! they land on a state. Two rule kinds exist:
//!
//! - **Direct**: keyed on `(theme, state)`; applies city-wide
//! - **District**: keyed on `(theme, state, district)`; applies only to
//!   records located in that district
//!
//! A direct rule always wins over a district rule for the same key. When
//! neither matches, the record keeps its current group.

use serde::{Deserialize, Serialize};

use civis_core::id::{DistrictId, GroupId, ThemeId};
use civis_flow::state::RecordState;

/// How a derivation found its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// A city-wide `(theme, state)` rule matched.
    Direct,
    /// A `(theme, state, district)` rule matched.
    District,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::District => write!(f, "district"),
        }
    }
}

/// One routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    /// The theme this rule applies to.
    pub theme: ThemeId,
    /// The state a record must be entering for this rule to apply.
    pub state: RecordState,
    /// District qualifier; `None` makes this a direct (city-wide) rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<DistrictId>,
    /// The group the rule assigns.
    pub group: GroupId,
}

impl RoutingRule {
    /// Creates a city-wide rule for `(theme, state)`.
    #[must_use]
    pub const fn direct(theme: ThemeId, state: RecordState, group: GroupId) -> Self {
        Self {
            theme,
            state,
            district: None,
            group,
        }
    }

    /// Creates a district-qualified rule for `(theme, state, district)`.
    #[must_use]
    pub const fn district(
        theme: ThemeId,
        state: RecordState,
        district: DistrictId,
        group: GroupId,
    ) -> Self {
        Self {
            theme,
            state,
            district: Some(district),
            group,
        }
    }

    /// The kind of this rule.
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        match self.district {
            Some(_) => RuleKind::District,
            None => RuleKind::Direct,
        }
    }
}

/// Why a derivation is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationReason {
    /// First assignment of a freshly created record.
    InitialAssignation,
    /// Routine re-derivation while a record moves between states.
    Derivation,
    /// An operator moved the record by hand.
    ManualReassignment,
    /// First assignment of a claim record.
    ClaimDerivation,
}

impl DerivationReason {
    /// Whether a miss at the target state retries against the entry state.
    ///
    /// Initial assignments (of both fresh records and claims) commonly hit
    /// themes whose only rule is configured at the entry state.
    #[must_use]
    pub const fn takes_entry_retry(self) -> bool {
        matches!(self, Self::InitialAssignation | Self::ClaimDerivation)
    }
}

impl std::fmt::Display for DerivationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitialAssignation => write!(f, "initial_assignation"),
            Self::Derivation => write!(f, "derivation"),
            Self::ManualReassignment => write!(f, "manual_reassignment"),
            Self::ClaimDerivation => write!(f, "claim_derivation"),
        }
    }
}

/// A request to compute the next responsible group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationRequest {
    /// The theme of the record being routed.
    pub theme: ThemeId,
    /// The state the record is entering.
    pub target_state: RecordState,
    /// The record's district, when known.
    pub district: Option<DistrictId>,
    /// Why the derivation is being requested.
    pub reason: DerivationReason,
}

impl DerivationRequest {
    /// Creates a request without a district qualifier.
    #[must_use]
    pub const fn new(theme: ThemeId, target_state: RecordState, reason: DerivationReason) -> Self {
        Self {
            theme,
            target_state,
            district: None,
            reason,
        }
    }

    /// Attaches the record's district.
    #[must_use]
    pub const fn with_district(mut self, district: DistrictId) -> Self {
        self.district = Some(district);
        self
    }
}

/// The outcome of a successful derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derivation {
    /// The group the record should move to.
    pub group: GroupId,
    /// The rule kind that produced the match.
    pub matched: RuleKind,
    /// Whether the match came from the entry-state retry.
    pub retried: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_kind_follows_district_presence() {
        let theme = ThemeId::generate();
        let group = GroupId::generate();

        let direct = RoutingRule::direct(theme, RecordState::PendingValidate, group);
        assert_eq!(direct.kind(), RuleKind::Direct);

        let district = RoutingRule::district(
            theme,
            RecordState::PendingValidate,
            DistrictId::new(3),
            group,
        );
        assert_eq!(district.kind(), RuleKind::District);
    }

    #[test]
    fn entry_retry_applies_to_initial_reasons_only() {
        assert!(DerivationReason::InitialAssignation.takes_entry_retry());
        assert!(DerivationReason::ClaimDerivation.takes_entry_retry());
        assert!(!DerivationReason::Derivation.takes_entry_retry());
        assert!(!DerivationReason::ManualReassignment.takes_entry_retry());
    }

    #[test]
    fn rule_serializes_camel_case() {
        let rule = RoutingRule::direct(
            ThemeId::generate(),
            RecordState::InResolution,
            GroupId::generate(),
        );
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["state"], "IN_RESOLUTION");
        assert!(json.get("district").is_none());
    }
}
