//! # Ancestry Resolver
//!
//! Breadcrumb paths from the top of the taxonomy down to a node.

use crate::primitives::MAX_ANCESTOR_DEPTH;
use crate::store::ContentStore;
use crate::{ManhajError, Node, NodeId};
use std::collections::BTreeSet;

/// Read-only resolver for ancestor paths.
#[derive(Clone, Copy)]
pub struct AncestryResolver<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> AncestryResolver<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Ordered path from the furthest reachable ancestor to `node_id` itself.
    ///
    /// Each hop follows the lexicographically smallest parent id. The walk
    /// stops at a root, after `MAX_ANCESTOR_DEPTH` hops, or when an id repeats.
    /// Truncation is silent: the result never exceeds `MAX_ANCESTOR_DEPTH + 1`
    /// nodes and always ends with the start node.
    pub fn ancestor_path(&self, node_id: &NodeId) -> Result<Vec<Node>, ManhajError> {
        let start = self
            .store
            .node(node_id)?
            .ok_or_else(|| ManhajError::NodeNotFound(node_id.clone()))?;

        let mut seen = BTreeSet::from([start.id.clone()]);
        let mut path = vec![start];

        for _ in 0..MAX_ANCESTOR_DEPTH {
            let Some(current) = path.last() else { break };
            // parents_of is sorted, so the first entry is the smallest id.
            let Some(parent_id) = self.store.parents_of(&current.id)?.into_iter().next() else {
                break;
            };
            if !seen.insert(parent_id.clone()) {
                break;
            }
            match self.store.node(&parent_id)? {
                Some(parent) => path.push(parent),
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{NodeKind, Status, TaxonomyLink};

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    fn add(store: &MemoryStore, node: &str, parent: Option<&str>) {
        let n = Node::new(id(node), NodeKind::Topic, node.to_uppercase(), Status::Published);
        store
            .insert_node(&n, parent.map(id).as_ref())
            .expect("insert");
    }

    fn path_ids(store: &MemoryStore, node: &str) -> Vec<String> {
        AncestryResolver::new(store)
            .ancestor_path(&id(node))
            .expect("path")
            .into_iter()
            .map(|n| n.id.0)
            .collect()
    }

    #[test]
    fn root_path_is_itself() {
        let store = MemoryStore::new();
        add(&store, "math", None);
        assert_eq!(path_ids(&store, "math"), vec!["math"]);
    }

    #[test]
    fn path_is_root_first() {
        let store = MemoryStore::new();
        add(&store, "math", None);
        add(&store, "algebra", Some("math"));
        add(&store, "lesson", Some("algebra"));
        assert_eq!(path_ids(&store, "lesson"), vec!["math", "algebra", "lesson"]);
    }

    #[test]
    fn smallest_parent_id_wins() {
        let store = MemoryStore::new();
        add(&store, "zeta", None);
        add(&store, "alpha", None);
        add(&store, "child", Some("zeta"));
        store
            .insert_link(&TaxonomyLink::new(id("alpha"), id("child")))
            .expect("link");
        assert_eq!(path_ids(&store, "child"), vec!["alpha", "child"]);
    }

    #[test]
    fn deep_chain_truncates_at_bound() {
        let store = MemoryStore::new();
        add(&store, "n00", None);
        for i in 1..=15 {
            let parent = format!("n{:02}", i - 1);
            add(&store, &format!("n{i:02}"), Some(&parent));
        }

        let path = path_ids(&store, "n15");
        assert_eq!(path.len(), MAX_ANCESTOR_DEPTH + 1);
        assert_eq!(path.first().map(String::as_str), Some("n05"));
        assert_eq!(path.last().map(String::as_str), Some("n15"));
    }

    #[test]
    fn unknown_node_is_not_found() {
        let store = MemoryStore::new();
        let result = AncestryResolver::new(&store).ancestor_path(&id("ghost"));
        assert!(matches!(result, Err(ManhajError::NodeNotFound(_))));
    }
}
