//! Rule store trait and implementations.
//!
//! This module provides:
//!
//! - [`RuleStore`]: Trait for routing-rule lookup
//! - [`memory::InMemoryRuleStore`]: In-memory implementation for tests and
//!   development
//!
//! The derivation engine only reads; rule administration (insert/remove) is
//! an implementation concern and not part of the trait.

pub mod memory;

use async_trait::async_trait;

use civis_core::id::{DistrictId, GroupId, ThemeId};
use civis_flow::state::RecordState;

use crate::error::Result;

pub use memory::InMemoryRuleStore;

/// Read access to the routing-rule tables.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent lookups from
/// multiple lifecycle operations.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Looks up the city-wide rule for `(theme, state)`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Lookup`] when the backing store fails.
    async fn direct_rule(&self, theme: ThemeId, state: RecordState) -> Result<Option<GroupId>>;

    /// Looks up the district-qualified rule for `(theme, state, district)`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Lookup`] when the backing store fails.
    async fn district_rule(
        &self,
        theme: ThemeId,
        state: RecordState,
        district: DistrictId,
    ) -> Result<Option<GroupId>>;
}
