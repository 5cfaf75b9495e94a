//! Capabilities gating record operations.
//!
//! Capability *evaluation* (roles, group membership, delegation) lives in
//! the surrounding platform. This module only defines the capability
//! vocabulary the processing graphs reference and the checker seam the
//! lifecycle service calls through; tests and embedders plug in
//! [`AllowAll`] or [`StaticPermissions`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::actor::Actor;

/// Operation classes a transition offer or lifecycle operation may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create new records.
    Create,
    /// Validate freshly filed records.
    Validate,
    /// Plan work on a validated record.
    Plan,
    /// Resolve a planned or validated record.
    Resolute,
    /// Answer the applicant.
    Answer,
    /// Close a record.
    Close,
    /// Cancel a record.
    Cancel,
    /// Hand a record to an external operator and handle its return.
    ExternalManage,
    /// Reassign a record to a group outside the current ambit.
    ReassignOutsideAmbit,
    /// Open a claim on a closed record.
    ClaimCreate,
}

impl Capability {
    /// All capabilities, for probing a checker into a set.
    pub const ALL: [Capability; 10] = [
        Capability::Create,
        Capability::Validate,
        Capability::Plan,
        Capability::Resolute,
        Capability::Answer,
        Capability::Close,
        Capability::Cancel,
        Capability::ExternalManage,
        Capability::ReassignOutsideAmbit,
        Capability::ClaimCreate,
    ];

    /// Returns the stable string form used in logs and offers.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Validate => "validate",
            Self::Plan => "plan",
            Self::Resolute => "resolute",
            Self::Answer => "answer",
            Self::Close => "close",
            Self::Cancel => "cancel",
            Self::ExternalManage => "external_manage",
            Self::ReassignOutsideAmbit => "reassign_outside_ambit",
            Self::ClaimCreate => "claim_create",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The set of capabilities a caller holds.
pub type CapabilitySet = BTreeSet<Capability>;

/// Seam for capability evaluation.
pub trait PermissionChecker: Send + Sync {
    /// Returns true if the actor holds the capability.
    fn has_capability(&self, actor: &Actor, capability: Capability) -> bool;

    /// Collects every capability the actor holds.
    fn capabilities_of(&self, actor: &Actor) -> CapabilitySet {
        Capability::ALL
            .iter()
            .copied()
            .filter(|c| self.has_capability(actor, *c))
            .collect()
    }
}

/// Checker granting everything. Default for embedded and test use.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn has_capability(&self, _actor: &Actor, _capability: Capability) -> bool {
        true
    }
}

/// Checker with a fixed per-actor grant table.
#[derive(Debug, Default, Clone)]
pub struct StaticPermissions {
    grants: HashMap<String, HashSet<Capability>>,
}

impl StaticPermissions {
    /// Creates an empty grant table (denies everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants a capability to an actor, builder-style.
    #[must_use]
    pub fn grant(mut self, actor_id: impl Into<String>, capability: Capability) -> Self {
        self.grants
            .entry(actor_id.into())
            .or_default()
            .insert(capability);
        self
    }

    /// Grants every capability to an actor, builder-style.
    #[must_use]
    pub fn grant_all(mut self, actor_id: impl Into<String>) -> Self {
        self.grants
            .entry(actor_id.into())
            .or_default()
            .extend(Capability::ALL);
        self
    }
}

impl PermissionChecker for StaticPermissions {
    fn has_capability(&self, actor: &Actor, capability: Capability) -> bool {
        self.grants
            .get(&actor.id)
            .is_some_and(|caps| caps.contains(&capability))
    }
}
