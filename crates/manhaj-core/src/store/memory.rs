//! # In-Memory Store
//!
//! BTreeMap tables behind a single `RwLock`. Readers share the lock; each
//! mutation holds the write guard for its whole unit of work, which gives the
//! same all-or-nothing behaviour as a redb write transaction.

use super::{ContentStore, NodeMutation, RemovalGuard, StoreCounts, check_immutable_fields};
use crate::taxonomy::creates_cycle;
use crate::{CurriculumTag, ManhajError, Node, NodeId, TaxonomyLink, User, UserId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    nodes: BTreeMap<NodeId, Node>,
    /// Adjacency list: parent -> children
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Reverse adjacency: child -> parents
    parents: BTreeMap<NodeId, BTreeSet<NodeId>>,
    tags: BTreeMap<NodeId, BTreeSet<CurriculumTag>>,
    users: BTreeMap<UserId, User>,
    /// Unique index: normalized email -> user
    emails: BTreeMap<String, UserId>,
}

impl Tables {
    fn parents_of(&self, child: &NodeId) -> Vec<NodeId> {
        self.parents
            .get(child)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn attach(&mut self, link: &TaxonomyLink) -> bool {
        let inserted = self
            .children
            .entry(link.parent_id.clone())
            .or_default()
            .insert(link.child_id.clone());
        self.parents
            .entry(link.child_id.clone())
            .or_default()
            .insert(link.parent_id.clone());
        inserted
    }

    fn detach(&mut self, link: &TaxonomyLink) -> bool {
        let removed = self
            .children
            .get_mut(&link.parent_id)
            .is_some_and(|set| set.remove(&link.child_id));
        if let Some(set) = self.parents.get_mut(&link.child_id) {
            set.remove(&link.parent_id);
        }
        self.children.retain(|_, set| !set.is_empty());
        self.parents.retain(|_, set| !set.is_empty());
        removed
    }
}

/// Volatile content store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, ManhajError> {
        self.tables
            .read()
            .map_err(|_| ManhajError::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, ManhajError> {
        self.tables
            .write()
            .map_err(|_| ManhajError::Storage("memory store lock poisoned".to_string()))
    }
}

impl ContentStore for MemoryStore {
    fn insert_node(&self, node: &Node, parent: Option<&NodeId>) -> Result<(), ManhajError> {
        let mut tables = self.write()?;
        if tables.nodes.contains_key(&node.id) {
            return Err(ManhajError::Conflict(format!(
                "node id '{}' already exists",
                node.id
            )));
        }
        if let Some(parent) = parent
            && !tables.nodes.contains_key(parent)
        {
            return Err(ManhajError::NodeNotFound(parent.clone()));
        }

        tables.nodes.insert(node.id.clone(), node.clone());
        if let Some(parent) = parent {
            tables.attach(&TaxonomyLink::new(parent.clone(), node.id.clone()));
        }
        Ok(())
    }

    fn node(&self, id: &NodeId) -> Result<Option<Node>, ManhajError> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    fn nodes(&self) -> Result<Vec<Node>, ManhajError> {
        Ok(self.read()?.nodes.values().cloned().collect())
    }

    fn modify_node(&self, id: &NodeId, apply: NodeMutation<'_>) -> Result<Node, ManhajError> {
        let mut tables = self.write()?;
        let current = tables
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| ManhajError::NodeNotFound(id.clone()))?;

        let mut updated = current.clone();
        apply(&mut updated)?;
        check_immutable_fields(&current, &updated)?;

        tables.nodes.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    fn remove_node(
        &self,
        id: &NodeId,
        guard: RemovalGuard<'_, Node>,
    ) -> Result<Node, ManhajError> {
        let mut tables = self.write()?;
        let node = tables
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| ManhajError::NodeNotFound(id.clone()))?;
        guard(&node)?;

        let outgoing: Vec<NodeId> = tables
            .children
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for child in outgoing {
            tables.detach(&TaxonomyLink::new(id.clone(), child));
        }
        for parent in tables.parents_of(id) {
            tables.detach(&TaxonomyLink::new(parent, id.clone()));
        }
        tables.tags.remove(id);
        tables.nodes.remove(id);
        Ok(node)
    }

    fn insert_link(&self, link: &TaxonomyLink) -> Result<bool, ManhajError> {
        let mut tables = self.write()?;
        for endpoint in [&link.parent_id, &link.child_id] {
            if !tables.nodes.contains_key(endpoint) {
                return Err(ManhajError::NodeNotFound(endpoint.clone()));
            }
        }
        let exists = tables
            .children
            .get(&link.parent_id)
            .is_some_and(|set| set.contains(&link.child_id));
        if exists {
            return Ok(false);
        }
        if creates_cycle(&link.parent_id, &link.child_id, |id| {
            Ok(tables.parents_of(id))
        })? {
            return Err(ManhajError::CycleDetected {
                parent: link.parent_id.clone(),
                child: link.child_id.clone(),
            });
        }
        Ok(tables.attach(link))
    }

    fn remove_link(&self, link: &TaxonomyLink) -> Result<bool, ManhajError> {
        Ok(self.write()?.detach(link))
    }

    fn children_of(&self, parent: &NodeId) -> Result<Vec<NodeId>, ManhajError> {
        Ok(self
            .read()?
            .children
            .get(parent)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn parents_of(&self, child: &NodeId) -> Result<Vec<NodeId>, ManhajError> {
        Ok(self.read()?.parents_of(child))
    }

    fn links(&self) -> Result<Vec<TaxonomyLink>, ManhajError> {
        let tables = self.read()?;
        Ok(tables
            .children
            .iter()
            .flat_map(|(parent, children)| {
                children
                    .iter()
                    .map(move |child| TaxonomyLink::new(parent.clone(), child.clone()))
            })
            .collect())
    }

    fn insert_tag(&self, tag: &CurriculumTag) -> Result<bool, ManhajError> {
        let mut tables = self.write()?;
        if !tables.nodes.contains_key(&tag.node_id) {
            return Err(ManhajError::NodeNotFound(tag.node_id.clone()));
        }
        Ok(tables
            .tags
            .entry(tag.node_id.clone())
            .or_default()
            .insert(tag.clone()))
    }

    fn tags_for(&self, node: &NodeId) -> Result<Vec<CurriculumTag>, ManhajError> {
        Ok(self
            .read()?
            .tags
            .get(node)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn tags(&self) -> Result<Vec<CurriculumTag>, ManhajError> {
        Ok(self.read()?.tags.values().flatten().cloned().collect())
    }

    fn remove_tags_for(&self, node: &NodeId) -> Result<usize, ManhajError> {
        Ok(self
            .write()?
            .tags
            .remove(node)
            .map(|set| set.len())
            .unwrap_or(0))
    }

    fn insert_user(&self, user: &User) -> Result<(), ManhajError> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.id) {
            return Err(ManhajError::Conflict(format!(
                "user id '{}' already exists",
                user.id
            )));
        }
        if tables.emails.contains_key(&user.email) {
            return Err(ManhajError::Conflict(format!(
                "email '{}' is already registered",
                user.email
            )));
        }
        tables.emails.insert(user.email.clone(), user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn user(&self, id: &UserId) -> Result<Option<User>, ManhajError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, ManhajError> {
        let tables = self.read()?;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, ManhajError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    fn remove_user(
        &self,
        id: &UserId,
        guard: RemovalGuard<'_, User>,
    ) -> Result<User, ManhajError> {
        let mut tables = self.write()?;
        let user = tables
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| ManhajError::UserNotFound(id.clone()))?;
        guard(&user)?;

        for node in tables.nodes.values_mut() {
            if node.is_authored_by(id) {
                node.author_id = None;
                node.touch();
            }
        }
        tables.emails.remove(&user.email);
        tables.users.remove(id);
        Ok(user)
    }

    fn counts(&self) -> Result<StoreCounts, ManhajError> {
        let tables = self.read()?;
        Ok(StoreCounts {
            nodes: tables.nodes.len(),
            links: tables.children.values().map(BTreeSet::len).sum(),
            tags: tables.tags.values().map(BTreeSet::len).sum(),
            users: tables.users.len(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn insert_with_parent_is_atomic() {
        conformance::insert_with_parent_is_atomic(&MemoryStore::new());
    }

    #[test]
    fn duplicate_node_id_conflicts() {
        conformance::duplicate_node_id_conflicts(&MemoryStore::new());
    }

    #[test]
    fn remove_node_cascades() {
        conformance::remove_node_cascades(&MemoryStore::new());
    }

    #[test]
    fn remove_guard_aborts_removal() {
        conformance::remove_guard_aborts_removal(&MemoryStore::new());
    }

    #[test]
    fn link_rejects_cycles_and_duplicates() {
        conformance::link_rejects_cycles_and_duplicates(&MemoryStore::new());
    }

    #[test]
    fn modify_node_failure_leaves_record_untouched() {
        conformance::modify_node_failure_leaves_record_untouched(&MemoryStore::new());
    }

    #[test]
    fn modify_node_cannot_change_kind() {
        conformance::modify_node_cannot_change_kind(&MemoryStore::new());
    }

    #[test]
    fn tags_are_unique_per_node() {
        conformance::tags_are_unique_per_node(&MemoryStore::new());
    }

    #[test]
    fn user_email_is_unique() {
        conformance::user_email_is_unique(&MemoryStore::new());
    }

    #[test]
    fn remove_user_detaches_authorship() {
        conformance::remove_user_detaches_authorship(&MemoryStore::new());
    }

    #[test]
    fn counts_track_all_tables() {
        conformance::counts_track_all_tables(&MemoryStore::new());
    }
}
