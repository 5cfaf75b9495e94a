//! In-memory rule store implementation for testing.
//!
//! This module provides [`InMemoryRuleStore`], a simple in-memory
//! implementation of the [`RuleStore`] trait suitable for testing and
//! development.
//!
//! ## Limitations
//!
//! - **NOT suitable for production**: No persistence, no cross-process
//!   coordination
//! - **Single-process only**: Rules are not shared across process boundaries

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use civis_core::id::{DistrictId, GroupId, ThemeId};
use civis_flow::state::RecordState;

use super::RuleStore;
use crate::error::{Error, Result};
use crate::rule::RoutingRule;

type DirectKey = (ThemeId, RecordState);
type DistrictKey = (ThemeId, RecordState, DistrictId);

/// In-memory rule store for testing.
///
/// Provides a simple, thread-safe implementation of the [`RuleStore`] trait
/// using `RwLock` for synchronization.
///
/// ## Example
///
/// ```rust
/// use civis_core::id::{GroupId, ThemeId};
/// use civis_flow::state::RecordState;
/// use civis_routing::rule::RoutingRule;
/// use civis_routing::store::InMemoryRuleStore;
///
/// let store = InMemoryRuleStore::new();
/// let rule = RoutingRule::direct(
///     ThemeId::generate(),
///     RecordState::PendingValidate,
///     GroupId::generate(),
/// );
/// store.insert(rule).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    direct: RwLock<HashMap<DirectKey, GroupId>>,
    district: RwLock<HashMap<DistrictKey, GroupId>>,
}

/// Converts a lock poison error to a lookup error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::lookup("rule store lock poisoned")
}

impl InMemoryRuleStore {
    /// Creates an empty rule store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a store from an iterator of rules.
    ///
    /// Later rules overwrite earlier ones with the same key.
    #[must_use]
    pub fn with_rules(rules: impl IntoIterator<Item = RoutingRule>) -> Self {
        let mut direct = HashMap::new();
        let mut district = HashMap::new();
        for rule in rules {
            match rule.district {
                Some(d) => {
                    district.insert((rule.theme, rule.state, d), rule.group);
                }
                None => {
                    direct.insert((rule.theme, rule.state), rule.group);
                }
            }
        }
        Self {
            direct: RwLock::new(direct),
            district: RwLock::new(district),
        }
    }

    /// Inserts a rule, replacing any rule with the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn insert(&self, rule: RoutingRule) -> Result<()> {
        match rule.district {
            Some(d) => {
                let mut table = self.district.write().map_err(poison_err)?;
                table.insert((rule.theme, rule.state, d), rule.group);
            }
            None => {
                let mut table = self.direct.write().map_err(poison_err)?;
                table.insert((rule.theme, rule.state), rule.group);
            }
        }
        Ok(())
    }

    /// Removes the rule for a key, returning the group it assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn remove(
        &self,
        theme: ThemeId,
        state: RecordState,
        district: Option<DistrictId>,
    ) -> Result<Option<GroupId>> {
        match district {
            Some(d) => {
                let mut table = self.district.write().map_err(poison_err)?;
                Ok(table.remove(&(theme, state, d)))
            }
            None => {
                let mut table = self.direct.write().map_err(poison_err)?;
                Ok(table.remove(&(theme, state)))
            }
        }
    }

    /// The number of rules currently held, both kinds combined.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn rule_count(&self) -> Result<usize> {
        let direct = self.direct.read().map_err(poison_err)?;
        let district = self.district.read().map_err(poison_err)?;
        Ok(direct.len() + district.len())
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn direct_rule(&self, theme: ThemeId, state: RecordState) -> Result<Option<GroupId>> {
        let table = self.direct.read().map_err(poison_err)?;
        Ok(table.get(&(theme, state)).copied())
    }

    async fn district_rule(
        &self,
        theme: ThemeId,
        state: RecordState,
        district: DistrictId,
    ) -> Result<Option<GroupId>> {
        let table = self.district.read().map_err(poison_err)?;
        Ok(table.get(&(theme, state, district)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_lookup_direct() -> Result<()> {
        let store = InMemoryRuleStore::new();
        let theme = ThemeId::generate();
        let group = GroupId::generate();

        store.insert(RoutingRule::direct(theme, RecordState::PendingValidate, group))?;

        let found = store.direct_rule(theme, RecordState::PendingValidate).await?;
        assert_eq!(found, Some(group));

        let missing = store.direct_rule(theme, RecordState::InResolution).await?;
        assert_eq!(missing, None);

        Ok(())
    }

    #[tokio::test]
    async fn district_rules_keyed_per_district() -> Result<()> {
        let store = InMemoryRuleStore::new();
        let theme = ThemeId::generate();
        let north = GroupId::generate();
        let south = GroupId::generate();

        store.insert(RoutingRule::district(
            theme,
            RecordState::InResolution,
            DistrictId::new(1),
            north,
        ))?;
        store.insert(RoutingRule::district(
            theme,
            RecordState::InResolution,
            DistrictId::new(2),
            south,
        ))?;

        assert_eq!(
            store
                .district_rule(theme, RecordState::InResolution, DistrictId::new(1))
                .await?,
            Some(north)
        );
        assert_eq!(
            store
                .district_rule(theme, RecordState::InResolution, DistrictId::new(2))
                .await?,
            Some(south)
        );
        assert_eq!(
            store
                .district_rule(theme, RecordState::InResolution, DistrictId::new(3))
                .await?,
            None
        );

        Ok(())
    }

    #[tokio::test]
    async fn insert_replaces_same_key() -> Result<()> {
        let store = InMemoryRuleStore::new();
        let theme = ThemeId::generate();
        let first = GroupId::generate();
        let second = GroupId::generate();

        store.insert(RoutingRule::direct(theme, RecordState::PendingValidate, first))?;
        store.insert(RoutingRule::direct(theme, RecordState::PendingValidate, second))?;

        assert_eq!(
            store.direct_rule(theme, RecordState::PendingValidate).await?,
            Some(second)
        );
        assert_eq!(store.rule_count()?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn remove_returns_previous_group() -> Result<()> {
        let store = InMemoryRuleStore::new();
        let theme = ThemeId::generate();
        let group = GroupId::generate();

        store.insert(RoutingRule::direct(theme, RecordState::PendingValidate, group))?;

        let removed = store.remove(theme, RecordState::PendingValidate, None)?;
        assert_eq!(removed, Some(group));
        assert_eq!(store.rule_count()?, 0);

        let removed_again = store.remove(theme, RecordState::PendingValidate, None)?;
        assert_eq!(removed_again, None);

        Ok(())
    }

    #[tokio::test]
    async fn with_rules_populates_both_tables() -> Result<()> {
        let theme = ThemeId::generate();
        let direct_group = GroupId::generate();
        let district_group = GroupId::generate();

        let store = InMemoryRuleStore::with_rules(vec![
            RoutingRule::direct(theme, RecordState::PendingValidate, direct_group),
            RoutingRule::district(
                theme,
                RecordState::PendingValidate,
                DistrictId::new(7),
                district_group,
            ),
        ]);

        assert_eq!(store.rule_count()?, 2);
        assert_eq!(
            store.direct_rule(theme, RecordState::PendingValidate).await?,
            Some(direct_group)
        );
        assert_eq!(
            store
                .district_rule(theme, RecordState::PendingValidate, DistrictId::new(7))
                .await?,
            Some(district_group)
        );

        Ok(())
    }
}
