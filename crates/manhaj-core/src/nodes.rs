//! # Node Store
//!
//! Durable CRUD for content nodes on top of a [`ContentStore`].
//!
//! Every mutation here is a single store primitive, so the record change and
//! any link or tag cascade commit together. Authorization is passed in as a
//! guard and evaluated against the record read inside that same unit.

use crate::store::ContentStore;
use crate::validation;
use crate::{ManhajError, Node, NodeId, NodeKind, Status, UserId};
use std::cmp::Reverse;

/// Partial update of a node's editable fields. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentEdit {
    pub title: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    pub content: Option<String>,
}

impl ContentEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.content.is_none()
    }
}

fn check_version(node: &Node, expected: Option<u64>) -> Result<(), ManhajError> {
    match expected {
        Some(expected) if expected != node.version => Err(ManhajError::VersionConflict {
            node_id: node.id.clone(),
            expected,
            actual: node.version,
        }),
        _ => Ok(()),
    }
}

fn by_recent_update(nodes: &mut [Node]) {
    nodes.sort_by_key(|n| (Reverse(n.updated_at), n.id.clone()));
}

/// Node persistence operations.
#[derive(Clone, Copy)]
pub struct NodeStore<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> NodeStore<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Validate and insert `node`, linking it under `parent` in the same unit.
    ///
    /// The parent is checked for existence inside that unit, so a concurrent
    /// delete of the parent cannot leave a dangling edge.
    pub fn create(&self, mut node: Node, parent: Option<&NodeId>) -> Result<Node, ManhajError> {
        validation::node_id(node.id.as_str())?;
        node.title = validation::title(&node.title)?;
        node.description = validation::description(node.description.as_deref())?;
        if let Some(content) = &node.content {
            validation::content(content)?;
        }

        self.store.insert_node(&node, parent)?;
        tracing::info!(
            node_id = %node.id,
            kind = %node.kind,
            status = %node.status,
            parent = ?parent.map(NodeId::as_str),
            "created node"
        );
        Ok(node)
    }

    pub fn get(&self, id: &NodeId) -> Result<Node, ManhajError> {
        self.store
            .node(id)?
            .ok_or_else(|| ManhajError::NodeNotFound(id.clone()))
    }

    /// Nodes of one kind, sorted by title then id.
    pub fn list_by_type(&self, kind: NodeKind) -> Result<Vec<Node>, ManhajError> {
        let mut nodes: Vec<Node> = self
            .store
            .nodes()?
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect();
        nodes.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(nodes)
    }

    /// Nodes authored by `author`, most recently updated first.
    pub fn list_by_author(&self, author: &UserId) -> Result<Vec<Node>, ManhajError> {
        let mut nodes: Vec<Node> = self
            .store
            .nodes()?
            .into_iter()
            .filter(|n| n.is_authored_by(author))
            .collect();
        by_recent_update(&mut nodes);
        Ok(nodes)
    }

    /// Every node, most recently updated first.
    pub fn list_all(&self) -> Result<Vec<Node>, ManhajError> {
        let mut nodes = self.store.nodes()?;
        by_recent_update(&mut nodes);
        Ok(nodes)
    }

    /// Move a node to `to` after `guard` approves the stored record.
    pub fn update_status(
        &self,
        id: &NodeId,
        to: Status,
        expected_version: Option<u64>,
        guard: impl Fn(&Node) -> Result<(), ManhajError>,
    ) -> Result<Node, ManhajError> {
        let mut from = to;
        let updated = self.store.modify_node(id, &mut |node| {
            guard(node)?;
            check_version(node, expected_version)?;
            from = node.status;
            node.status = to;
            node.touch();
            Ok(())
        })?;
        tracing::info!(node_id = %id, from = %from, to = %to, version = updated.version, "status changed");
        Ok(updated)
    }

    /// Apply a [`ContentEdit`] after `guard` approves the stored record.
    /// The status is left unchanged.
    pub fn update_content(
        &self,
        id: &NodeId,
        edit: ContentEdit,
        expected_version: Option<u64>,
        guard: impl Fn(&Node) -> Result<(), ManhajError>,
    ) -> Result<Node, ManhajError> {
        if edit.is_empty() {
            return Err(ManhajError::invalid("nothing to update"));
        }
        let title = edit.title.as_deref().map(validation::title).transpose()?;
        let description = match edit.description.as_deref() {
            Some(text) => Some(validation::description(Some(text))?),
            None => None,
        };
        if let Some(content) = &edit.content {
            validation::content(content)?;
        }

        let updated = self.store.modify_node(id, &mut |node| {
            guard(node)?;
            check_version(node, expected_version)?;
            if let Some(title) = &title {
                node.title.clone_from(title);
            }
            if let Some(description) = &description {
                node.description.clone_from(description);
            }
            if let Some(content) = &edit.content {
                node.content = Some(content.clone());
            }
            node.touch();
            Ok(())
        })?;
        tracing::info!(node_id = %id, version = updated.version, "content updated");
        Ok(updated)
    }

    /// Remove a node with all links and tags that reference it.
    pub fn delete(
        &self,
        id: &NodeId,
        guard: impl Fn(&Node) -> Result<(), ManhajError>,
    ) -> Result<Node, ManhajError> {
        let removed = self.store.remove_node(id, &mut |node| guard(node))?;
        tracing::info!(node_id = %id, kind = %removed.kind, "deleted node");
        Ok(removed)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{CurriculumTag, ErrorKind, TaxonomyLink};

    fn allow(_: &Node) -> Result<(), ManhajError> {
        Ok(())
    }

    fn topic(id: &str, title: &str) -> Node {
        Node::new(NodeId::new(id), NodeKind::Topic, title, Status::Published)
    }

    #[test]
    fn create_rejects_blank_title() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        let err = nodes.create(topic("t", "   "), None).expect_err("blank");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.counts().expect("counts").nodes, 0);
    }

    #[test]
    fn create_with_missing_parent_inserts_nothing() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        let err = nodes
            .create(topic("a", "A"), Some(&NodeId::new("ghost")))
            .expect_err("missing parent");
        assert!(matches!(err, ManhajError::NodeNotFound(_)));
        assert!(store.node(&NodeId::new("a")).expect("lookup").is_none());
    }

    #[test]
    fn create_trims_title() {
        let store = MemoryStore::new();
        let node = NodeStore::new(&store)
            .create(topic("t", "  Geometry "), None)
            .expect("create");
        assert_eq!(node.title, "Geometry");
    }

    #[test]
    fn list_by_type_sorted_by_title() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        nodes.create(topic("t2", "Zeta"), None).expect("create");
        nodes.create(topic("t1", "Alpha"), None).expect("create");
        nodes
            .create(
                Node::new(NodeId::new("v"), NodeKind::Video, "Beta", Status::Draft),
                None,
            )
            .expect("create");

        let titles: Vec<_> = nodes
            .list_by_type(NodeKind::Topic)
            .expect("list")
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn status_update_bumps_version() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        let created = nodes
            .create(Node::new(NodeId::new("a"), NodeKind::Article, "A", Status::Draft), None)
            .expect("create");

        let updated = nodes
            .update_status(&created.id, Status::Pending, Some(1), allow)
            .expect("update");
        assert_eq!(updated.status, Status::Pending);
        assert_eq!(updated.version, 2);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn stale_version_conflicts() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        nodes
            .create(Node::new(NodeId::new("a"), NodeKind::Article, "A", Status::Draft), None)
            .expect("create");
        nodes
            .update_status(&NodeId::new("a"), Status::Pending, None, allow)
            .expect("update");

        let err = nodes
            .update_status(&NodeId::new("a"), Status::Published, Some(1), allow)
            .expect_err("stale");
        assert!(matches!(
            err,
            ManhajError::VersionConflict { expected: 1, actual: 2, .. }
        ));
        assert_eq!(
            nodes.get(&NodeId::new("a")).expect("get").status,
            Status::Pending
        );
    }

    #[test]
    fn guard_rejection_leaves_node_untouched() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        nodes
            .create(Node::new(NodeId::new("a"), NodeKind::Article, "A", Status::Draft), None)
            .expect("create");

        let err = nodes
            .update_status(&NodeId::new("a"), Status::Published, None, |_| {
                Err(ManhajError::forbidden("no"))
            })
            .expect_err("guarded");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let node = nodes.get(&NodeId::new("a")).expect("get");
        assert_eq!((node.status, node.version), (Status::Draft, 1));
    }

    #[test]
    fn content_edit_keeps_status() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        nodes
            .create(
                Node::new(NodeId::new("a"), NodeKind::Article, "A", Status::Pending)
                    .with_description("old"),
                None,
            )
            .expect("create");

        let edit = ContentEdit {
            title: Some("Fractions".to_string()),
            description: Some(String::new()),
            content: Some(r#"{"plugin":"rows"}"#.to_string()),
        };
        let updated = nodes
            .update_content(&NodeId::new("a"), edit, Some(1), allow)
            .expect("edit");
        assert_eq!(updated.title, "Fractions");
        assert_eq!(updated.description, None);
        assert_eq!(updated.content.as_deref(), Some(r#"{"plugin":"rows"}"#));
        assert_eq!(updated.status, Status::Pending);
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn empty_edit_is_rejected() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        let err = nodes
            .update_content(&NodeId::new("a"), ContentEdit::default(), None, allow)
            .expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn delete_cascades_links_and_tags() {
        let store = MemoryStore::new();
        let nodes = NodeStore::new(&store);
        nodes.create(topic("t", "T"), None).expect("create");
        nodes
            .create(
                Node::new(NodeId::new("a"), NodeKind::Article, "A", Status::Draft),
                Some(&NodeId::new("t")),
            )
            .expect("create");
        store
            .insert_tag(&CurriculumTag::new(NodeId::new("a"), "SA", 4, "Math"))
            .expect("tag");

        nodes.delete(&NodeId::new("a"), allow).expect("delete");
        assert!(store.children_of(&NodeId::new("t")).expect("children").is_empty());
        assert!(store.tags_for(&NodeId::new("a")).expect("tags").is_empty());
        assert!(!store
            .links()
            .expect("links")
            .contains(&TaxonomyLink::new(NodeId::new("t"), NodeId::new("a"))));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = NodeStore::new(&store)
            .delete(&NodeId::new("ghost"), allow)
            .expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
