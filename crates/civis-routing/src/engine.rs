//! The derivation engine.
//!
//! Given a record's theme, target state, and district, the engine answers
//! one question: which group becomes responsible next? Precedence is fixed:
//!
//! 1. Direct rule for `(theme, state)` wins outright
//! 2. District rule for `(theme, state, district)`, when a district is known
//! 3. No match: the record keeps its current group
//!
//! The engine is pure with respect to records. It never writes, so callers
//! can run it in check mode and discard the answer. It also never swallows
//! store failures; the record lifecycle substitutes the configured error
//! group on `Err` and records the degradation.

use std::sync::Arc;

use civis_core::id::GroupId;
use civis_flow::state::RecordState;

use crate::error::Result;
use crate::rule::{Derivation, DerivationRequest, RuleKind};
use crate::store::RuleStore;

/// Computes the next responsible group from the routing-rule tables.
pub struct DerivationEngine {
    rules: Arc<dyn RuleStore>,
    error_group: GroupId,
}

impl std::fmt::Debug for DerivationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivationEngine")
            .field("error_group", &self.error_group)
            .finish_non_exhaustive()
    }
}

impl DerivationEngine {
    /// Creates an engine over a rule store.
    ///
    /// `error_group` is the catch-all group callers assign when a lookup
    /// fails; the engine itself only reports it.
    #[must_use]
    pub fn new(rules: Arc<dyn RuleStore>, error_group: GroupId) -> Self {
        Self { rules, error_group }
    }

    /// The configured fallback group for degraded derivations.
    #[must_use]
    pub const fn error_group(&self) -> GroupId {
        self.error_group
    }

    /// Computes the next responsible group for a request.
    ///
    /// `Ok(None)` means no rule matched and the record keeps its group.
    /// For initial assignments a miss at the target state is retried once
    /// against the entry state, where most themes configure their intake
    /// rule; the outcome flags the retry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Lookup`] when the rule store fails.
    /// The error carries no routing decision: degrading to
    /// [`Self::error_group`] is the caller's move, so check-mode callers
    /// can surface the failure instead.
    #[tracing::instrument(
        skip(self),
        fields(theme = %req.theme, state = %req.target_state, reason = %req.reason)
    )]
    pub async fn derive(&self, req: &DerivationRequest) -> Result<Option<Derivation>> {
        if let Some((group, matched)) = self.lookup(req, req.target_state).await? {
            tracing::debug!(%group, %matched, "derivation matched");
            return Ok(Some(Derivation {
                group,
                matched,
                retried: false,
            }));
        }

        let retry_state = RecordState::PendingValidate;
        if req.reason.takes_entry_retry() && req.target_state != retry_state {
            if let Some((group, matched)) = self.lookup(req, retry_state).await? {
                tracing::debug!(%group, %matched, "derivation matched on entry-state retry");
                return Ok(Some(Derivation {
                    group,
                    matched,
                    retried: true,
                }));
            }
        }

        tracing::debug!("no routing rule matched");
        Ok(None)
    }

    /// One lookup pass at a fixed state: direct first, then district.
    async fn lookup(
        &self,
        req: &DerivationRequest,
        state: RecordState,
    ) -> Result<Option<(GroupId, RuleKind)>> {
        if let Some(group) = self.rules.direct_rule(req.theme, state).await? {
            return Ok(Some((group, RuleKind::Direct)));
        }
        if let Some(district) = req.district {
            if let Some(group) = self.rules.district_rule(req.theme, state, district).await? {
                return Ok(Some((group, RuleKind::District)));
            }
        }
        Ok(None)
    }
}
