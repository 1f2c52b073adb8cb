//! # Taxonomy Graph
//!
//! Directed parent→child edges between nodes. A node may have several parents
//! and several children; the only structural rule is that the edge set stays
//! acyclic.

use crate::store::ContentStore;
use crate::{ManhajError, Node, NodeId, TaxonomyLink};
use std::collections::{BTreeSet, VecDeque};

/// Returns `true` if adding `parent -> child` would close a cycle.
///
/// That is the case when `child` is `parent` itself or any ancestor of
/// `parent`. The walk goes upward over every parent edge with a visited set,
/// so it terminates on any graph.
///
/// `parents_of` is supplied by the caller so the check can run inside the
/// same critical section or write transaction that inserts the edge.
pub fn creates_cycle<F>(
    parent: &NodeId,
    child: &NodeId,
    mut parents_of: F,
) -> Result<bool, ManhajError>
where
    F: FnMut(&NodeId) -> Result<Vec<NodeId>, ManhajError>,
{
    if parent == child {
        return Ok(true);
    }

    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([parent.clone()]);
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        for up in parents_of(&current)? {
            if &up == child {
                return Ok(true);
            }
            if !visited.contains(&up) {
                queue.push_back(up);
            }
        }
    }
    Ok(false)
}

/// Read and write access to the parent→child edges of a content store.
#[derive(Clone, Copy)]
pub struct TaxonomyGraph<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> TaxonomyGraph<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Nodes linked as children of `parent`, sorted by title then id.
    pub fn children(&self, parent: &NodeId) -> Result<Vec<Node>, ManhajError> {
        if self.store.node(parent)?.is_none() {
            return Err(ManhajError::NodeNotFound(parent.clone()));
        }

        let mut children = Vec::new();
        for id in self.store.children_of(parent)? {
            // Edges are cascaded on delete; a dangling id means a concurrent
            // removal landed between the two reads.
            if let Some(node) = self.store.node(&id)? {
                children.push(node);
            }
        }
        children.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(children)
    }

    /// Ids of every parent of `child`, smallest first.
    pub fn parents(&self, child: &NodeId) -> Result<Vec<NodeId>, ManhajError> {
        self.store.parents_of(child)
    }

    /// Add the edge `parent -> child`.
    ///
    /// Both ends must exist. Self-links, cycles and duplicate edges are
    /// rejected as conflicts.
    pub fn link(&self, parent: &NodeId, child: &NodeId) -> Result<TaxonomyLink, ManhajError> {
        let link = TaxonomyLink::new(parent.clone(), child.clone());
        if !self.store.insert_link(&link)? {
            return Err(ManhajError::Conflict(format!(
                "link {parent} -> {child} already exists"
            )));
        }
        tracing::info!(parent = %parent, child = %child, "linked nodes");
        Ok(link)
    }

    /// Remove the edge `parent -> child`.
    pub fn unlink(&self, parent: &NodeId, child: &NodeId) -> Result<(), ManhajError> {
        let link = TaxonomyLink::new(parent.clone(), child.clone());
        if !self.store.remove_link(&link)? {
            return Err(ManhajError::LinkNotFound(parent.clone(), child.clone()));
        }
        tracing::info!(parent = %parent, child = %child, "unlinked nodes");
        Ok(())
    }

    /// Every edge in the store, ordered by parent then child.
    pub fn links(&self) -> Result<Vec<TaxonomyLink>, ManhajError> {
        self.store.links()
    }

    /// Nodes without any parent, sorted by title then id.
    pub fn roots(&self) -> Result<Vec<Node>, ManhajError> {
        let with_parent: BTreeSet<NodeId> = self
            .store
            .links()?
            .into_iter()
            .map(|link| link.child_id)
            .collect();
        let mut roots: Vec<Node> = self
            .store
            .nodes()?
            .into_iter()
            .filter(|node| !with_parent.contains(&node.id))
            .collect();
        roots.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(roots)
    }
}

// =============================================================================
// TESTS
// =============================================================================
