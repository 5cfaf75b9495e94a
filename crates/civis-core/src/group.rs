//! Organizational groups, ancestry plates, and ambits.
//!
//! Groups form the municipal responsibility tree. Each group carries a
//! *plate*: the materialized path of its ancestor IDs. Ancestry checks are
//! a single string prefix comparison instead of a tree walk, which keeps
//! routing and reassignment validation cheap on hot paths.
//!
//! An *ambit* is the subtree rooted at the nearest self-or-ancestor group
//! flagged as an ambit head. Manual reassignment is confined to the ambit
//! of the record's current responsible group unless the actor holds the
//! cross-ambit capability.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::id::GroupId;

/// Separator between group IDs in a plate.
const PLATE_SEPARATOR: char = '|';

/// Materialized ancestry path of a group.
///
/// Encoded as `|root|...|parent|self|`. A group's plate is a strict prefix
/// of every descendant's plate, so "is X under Y" is `starts_with`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plate(String);

impl Plate {
    /// Builds the plate of a root group.
    #[must_use]
    pub fn root(id: GroupId) -> Self {
        Self(format!("{PLATE_SEPARATOR}{id}{PLATE_SEPARATOR}"))
    }

    /// Builds the plate of a child group from its parent's plate.
    #[must_use]
    pub fn child_of(parent: &Plate, id: GroupId) -> Self {
        Self(format!("{}{id}{PLATE_SEPARATOR}", parent.0))
    }

    /// Returns true if this plate is the given plate or lies beneath it.
    #[must_use]
    pub fn is_within(&self, ancestor: &Plate) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// Returns the number of groups on the path, the group itself included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.matches(PLATE_SEPARATOR).count().saturating_sub(1)
    }

    /// Returns the raw plate string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the responsibility tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Unique identifier.
    pub id: GroupId,

    /// Human-readable name.
    pub name: String,

    /// Parent group; `None` for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<GroupId>,

    /// Materialized ancestry path.
    pub plate: Plate,

    /// Marks the head of an ambit.
    pub is_ambit: bool,
}

impl Group {
    /// Returns true if this group has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The immutable responsibility tree.
///
/// Built once from configuration via [`GroupTree::builder`] and shared
/// read-only afterwards. All queries answer from the prebuilt plates.
#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    groups: HashMap<GroupId, Group>,
}

impl GroupTree {
    /// Creates a builder for assembling a tree.
    #[must_use]
    pub fn builder() -> GroupTreeBuilder {
        GroupTreeBuilder::default()
    }

    /// Looks up a group by ID.
    #[must_use]
    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Returns true if the group exists.
    #[must_use]
    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    /// Returns the number of groups in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if the tree has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns true if `group` is `ancestor` itself or lies beneath it.
    ///
    /// Unknown IDs answer `false`.
    #[must_use]
    pub fn is_within(&self, group: GroupId, ancestor: GroupId) -> bool {
        match (self.groups.get(&group), self.groups.get(&ancestor)) {
            (Some(g), Some(a)) => g.plate.is_within(&a.plate),
            _ => false,
        }
    }

    /// Returns the ancestors of a group, nearest parent first.
    #[must_use]
    pub fn ancestors(&self, id: GroupId) -> Vec<&Group> {
        let mut out = Vec::new();
        let mut current = self.groups.get(&id).and_then(|g| g.parent);
        while let Some(parent_id) = current {
            let Some(parent) = self.groups.get(&parent_id) else {
                break;
            };
            out.push(parent);
            current = parent.parent;
        }
        out
    }

    /// Returns the strict descendants of a group, ordered by plate.
    #[must_use]
    pub fn descendants(&self, id: GroupId) -> Vec<&Group> {
        let Some(root) = self.groups.get(&id) else {
            return Vec::new();
        };
        let mut out: Vec<&Group> = self
            .groups
            .values()
            .filter(|g| g.id != id && g.plate.is_within(&root.plate))
            .collect();
        out.sort_by(|a, b| a.plate.cmp(&b.plate));
        out
    }

    /// Returns the head of the ambit containing the group.
    ///
    /// The head is the nearest self-or-ancestor flagged `is_ambit`. When no
    /// group on the path is flagged, the root of the path acts as the ambit
    /// head, so every group always belongs to exactly one ambit. Returns
    /// `None` only for unknown IDs.
    #[must_use]
    pub fn ambit_head(&self, id: GroupId) -> Option<&Group> {
        let group = self.groups.get(&id)?;
        if group.is_ambit {
            return Some(group);
        }
        let ancestors = self.ancestors(id);
        for ancestor in &ancestors {
            if ancestor.is_ambit {
                return Some(ancestor);
            }
        }
        ancestors.last().copied().or(Some(group))
    }

    /// Returns true if both groups belong to the same ambit.
    ///
    /// Unknown IDs answer `false`.
    #[must_use]
    pub fn same_ambit(&self, a: GroupId, b: GroupId) -> bool {
        match (self.ambit_head(a), self.ambit_head(b)) {
            (Some(ha), Some(hb)) => ha.id == hb.id,
            _ => false,
        }
    }

    /// Returns every group inside the ambit of the given group, ordered by
    /// plate. The ambit head and the group itself are included; the caller
    /// excludes the record's current group where that matters.
    #[must_use]
    pub fn ambit_members(&self, id: GroupId) -> Vec<&Group> {
        let Some(head) = self.ambit_head(id) else {
            return Vec::new();
        };
        let mut out: Vec<&Group> = self
            .groups
            .values()
            .filter(|g| g.plate.is_within(&head.plate))
            .collect();
        out.sort_by(|a, b| a.plate.cmp(&b.plate));
        out
    }
}

/// Pending entry in a [`GroupTreeBuilder`].
#[derive(Debug, Clone)]
struct GroupEntry {
    id: GroupId,
    name: String,
    parent: Option<GroupId>,
    is_ambit: bool,
}

/// Builder assembling and validating a [`GroupTree`].
///
/// Entries may be added in any order; plates are computed at build time.
#[derive(Debug, Default)]
pub struct GroupTreeBuilder {
    entries: Vec<GroupEntry>,
}

impl GroupTreeBuilder {
    /// Adds a group.
    #[must_use]
    pub fn add(mut self, id: GroupId, name: impl Into<String>, parent: Option<GroupId>) -> Self {
        self.entries.push(GroupEntry {
            id,
            name: name.into(),
            parent,
            is_ambit: false,
        });
        self
    }

    /// Adds a group flagged as an ambit head.
    #[must_use]
    pub fn add_ambit(
        mut self,
        id: GroupId,
        name: impl Into<String>,
        parent: Option<GroupId>,
    ) -> Self {
        self.entries.push(GroupEntry {
            id,
            name: name.into(),
            parent,
            is_ambit: true,
        });
        self
    }

    /// Validates the entries and computes plates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on duplicate IDs, unknown parents,
    /// or parent cycles.
    pub fn build(self) -> Result<GroupTree> {
        let mut groups: HashMap<GroupId, Group> = HashMap::with_capacity(self.entries.len());
        let mut pending = self.entries;

        for entry in &pending {
            let occurrences = pending.iter().filter(|e| e.id == entry.id).count();
            if occurrences > 1 {
                return Err(Error::InvalidInput(format!(
                    "duplicate group ID {}",
                    entry.id
                )));
            }
            if let Some(parent) = entry.parent {
                if !pending.iter().any(|e| e.id == parent) {
                    return Err(Error::InvalidInput(format!(
                        "group {} references unknown parent {parent}",
                        entry.id
                    )));
                }
            }
        }

        // Resolve plates root-down; anything left after a full pass with no
        // progress sits on a parent cycle.
        while !pending.is_empty() {
            let mut progressed = false;
            pending.retain(|entry| {
                let plate = match entry.parent {
                    None => Some(Plate::root(entry.id)),
                    Some(parent) => groups
                        .get(&parent)
                        .map(|p: &Group| Plate::child_of(&p.plate, entry.id)),
                };
                match plate {
                    Some(plate) => {
                        groups.insert(
                            entry.id,
                            Group {
                                id: entry.id,
                                name: entry.name.clone(),
                                parent: entry.parent,
                                plate,
                                is_ambit: entry.is_ambit,
                            },
                        );
                        progressed = true;
                        false
                    }
                    None => true,
                }
            });
            if !progressed {
                return Err(Error::InvalidInput(format!(
                    "group hierarchy contains a cycle involving {} group(s)",
                    pending.len()
                )));
            }
        }

        Ok(GroupTree { groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        tree: GroupTree,
        city: GroupId,
        services: GroupId,
        cleaning: GroupId,
        parks: GroupId,
        districts: GroupId,
        north_office: GroupId,
    }

    fn fixture() -> Fixture {
        let city = GroupId::generate();
        let services = GroupId::generate();
        let cleaning = GroupId::generate();
        let parks = GroupId::generate();
        let districts = GroupId::generate();
        let north_office = GroupId::generate();

        let tree = GroupTree::builder()
            .add(city, "City Hall", None)
            .add_ambit(services, "Urban Services", Some(city))
            .add(cleaning, "Street Cleaning", Some(services))
            .add(parks, "Parks and Gardens", Some(services))
            .add_ambit(districts, "District Offices", Some(city))
            .add(north_office, "North District Office", Some(districts))
            .build()
            .unwrap();

        Fixture {
            tree,
            city,
            services,
            cleaning,
            parks,
            districts,
            north_office,
        }
    }

    #[test]
    fn plates_prefix_encode_ancestry() {
        let f = fixture();
        let services = f.tree.get(f.services).unwrap();
        let cleaning = f.tree.get(f.cleaning).unwrap();

        assert!(cleaning.plate.is_within(&services.plate));
        assert!(!services.plate.is_within(&cleaning.plate));
        assert_eq!(cleaning.plate.depth(), 3);
    }

    #[test]
    fn is_within_includes_self() {
        let f = fixture();
        assert!(f.tree.is_within(f.parks, f.parks));
        assert!(f.tree.is_within(f.parks, f.city));
        assert!(!f.tree.is_within(f.parks, f.districts));
    }

    #[test]
    fn ancestors_nearest_first() {
        let f = fixture();
        let ancestors = f.tree.ancestors(f.cleaning);
        let ids: Vec<GroupId> = ancestors.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![f.services, f.city]);
    }

    #[test]
    fn descendants_exclude_self() {
        let f = fixture();
        let ids: Vec<GroupId> = f.tree.descendants(f.services).iter().map(|g| g.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&f.cleaning));
        assert!(ids.contains(&f.parks));
    }

    #[test]
    fn ambit_head_is_nearest_flagged() {
        let f = fixture();
        assert_eq!(f.tree.ambit_head(f.cleaning).unwrap().id, f.services);
        assert_eq!(f.tree.ambit_head(f.services).unwrap().id, f.services);
        assert_eq!(f.tree.ambit_head(f.north_office).unwrap().id, f.districts);
    }

    #[test]
    fn unflagged_path_falls_back_to_root() {
        let root = GroupId::generate();
        let leaf = GroupId::generate();
        let tree = GroupTree::builder()
            .add(root, "Root", None)
            .add(leaf, "Leaf", Some(root))
            .build()
            .unwrap();
        assert_eq!(tree.ambit_head(leaf).unwrap().id, root);
        assert_eq!(tree.ambit_head(root).unwrap().id, root);
    }

    #[test]
    fn same_ambit_respects_boundaries() {
        let f = fixture();
        assert!(f.tree.same_ambit(f.cleaning, f.parks));
        assert!(f.tree.same_ambit(f.cleaning, f.services));
        assert!(!f.tree.same_ambit(f.cleaning, f.north_office));
    }

    #[test]
    fn ambit_members_cover_the_subtree() {
        let f = fixture();
        let ids: Vec<GroupId> = f
            .tree
            .ambit_members(f.cleaning)
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&f.services));
        assert!(ids.contains(&f.cleaning));
        assert!(ids.contains(&f.parks));
    }

    #[test]
    fn duplicate_group_rejected() {
        let id = GroupId::generate();
        let result = GroupTree::builder()
            .add(id, "One", None)
            .add(id, "Two", None)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn unknown_parent_rejected() {
        let result = GroupTree::builder()
            .add(GroupId::generate(), "Orphan", Some(GroupId::generate()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn parent_cycle_rejected() {
        let a = GroupId::generate();
        let b = GroupId::generate();
        let result = GroupTree::builder()
            .add(a, "A", Some(b))
            .add(b, "B", Some(a))
            .build();
        assert!(result.is_err());
    }
}
