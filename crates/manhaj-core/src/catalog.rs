//! # Catalog
//!
//! The boundary facade over one storage backend. Each operation that needs
//! authorization takes the calling [`Actor`]; the components underneath
//! (`NodeStore`, `TaxonomyGraph`, ...) are borrowed views over the same store.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` for disk-backed ACID storage

use crate::ancestry::AncestryResolver;
use crate::nodes::{ContentEdit, NodeStore};
use crate::seed::{SeedManifest, SeedReport, Seeder};
use crate::store::{ContentStore, StorageBackend};
use crate::tags::{CurriculumTagIndex, TagQuery};
use crate::taxonomy::TaxonomyGraph;
use crate::users::{NewUser, UserDirectory, UserSummary};
use crate::workflow::WorkflowEngine;
use crate::{
    Actor, CurriculumTag, ManhajError, Node, NodeId, NodeKind, Status, TaxonomyLink, User, UserId,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

// =============================================================================
// REQUEST / REPORT TYPES
// =============================================================================

/// Everything needed to create a node of any kind.
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub kind: NodeKind,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub parent_id: Option<NodeId>,
    /// Requested initial status. `None` picks the default for the kind.
    pub status: Option<Status>,
    /// Fixed id. `None` generates `<prefix>-<uuid>`.
    pub id: Option<NodeId>,
}

impl NodeDraft {
    pub fn new(kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
            content: None,
            parent_id: None,
            status: None,
            id: None,
        }
    }

    #[must_use]
    pub fn under(mut self, parent: NodeId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Node counts per workflow status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub pending: usize,
    pub published: usize,
}

impl StatusCounts {
    fn tally<'n>(nodes: impl IntoIterator<Item = &'n Node>) -> Self {
        let mut counts = Self::default();
        for node in nodes {
            match node.status {
                Status::Draft => counts.draft += 1,
                Status::Pending => counts.pending += 1,
                Status::Published => counts.published += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.draft + self.pending + self.published
    }
}

/// Store-wide counters reported by `status` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogMetrics {
    pub nodes: usize,
    pub links: usize,
    pub tags: usize,
    pub users: usize,
    pub by_status: StatusCounts,
    pub persistent: bool,
}

/// One row of a depth-first taxonomy outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub depth: usize,
    pub node: Node,
    /// The node's subtree was already listed under an earlier parent.
    pub repeated: bool,
}

fn require_admin(actor: &Actor, action: &str) -> Result<(), ManhajError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ManhajError::forbidden(format!("only an admin can {action}")))
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Shared entry point for the API and CLI.
#[derive(Debug, Default)]
pub struct Catalog {
    backend: StorageBackend,
}

impl Catalog {
    /// Create an empty catalog with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or create a persistent catalog at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, ManhajError> {
        Ok(Self {
            backend: StorageBackend::redb(path)?,
        })
    }

    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        Self { backend }
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    fn store(&self) -> &dyn ContentStore {
        self.backend.as_store()
    }

    pub fn nodes(&self) -> NodeStore<'_> {
        NodeStore::new(self.store())
    }

    pub fn graph(&self) -> TaxonomyGraph<'_> {
        TaxonomyGraph::new(self.store())
    }

    pub fn ancestry(&self) -> AncestryResolver<'_> {
        AncestryResolver::new(self.store())
    }

    pub fn tag_index(&self) -> CurriculumTagIndex<'_> {
        CurriculumTagIndex::new(self.store())
    }

    pub fn users(&self) -> UserDirectory<'_> {
        UserDirectory::new(self.store())
    }

    /// Resolve a user id into the actor used for authorization.
    pub fn actor(&self, user_id: &UserId) -> Result<Actor, ManhajError> {
        Ok(Actor::from(&self.users().get(user_id)?))
    }

    // =========================================================================
    // NODES
    // =========================================================================

    /// Create a node authored by `actor`.
    ///
    /// The initial status follows [`WorkflowEngine::initial_status`]. Articles
    /// must be created under a parent.
    pub fn create_node(&self, actor: &Actor, draft: NodeDraft) -> Result<Node, ManhajError> {
        let status = WorkflowEngine::initial_status(actor, draft.kind, draft.status)?;
        if draft.kind == NodeKind::Article && draft.parent_id.is_none() {
            return Err(ManhajError::invalid("an article must be created under a parent"));
        }

        let id = draft.id.unwrap_or_else(|| NodeId::generate(draft.kind));
        let mut node =
            Node::new(id, draft.kind, draft.title, status).with_author(actor.user_id.clone());
        node.description = draft.description;
        node.content = draft.content;

        self.nodes().create(node, draft.parent_id.as_ref())
    }

    /// Admin-only: a topic, published unless another status is requested.
    pub fn create_topic(
        &self,
        actor: &Actor,
        title: &str,
        description: Option<&str>,
        parent_id: Option<NodeId>,
    ) -> Result<Node, ManhajError> {
        let mut draft = NodeDraft::new(NodeKind::Topic, title);
        draft.description = description.map(str::to_string);
        draft.parent_id = parent_id;
        self.create_node(actor, draft)
    }

    /// An article under `parent_id`, draft unless another status is requested.
    pub fn create_article(
        &self,
        actor: &Actor,
        title: &str,
        content: &str,
        parent_id: NodeId,
        status: Option<Status>,
    ) -> Result<Node, ManhajError> {
        let mut draft = NodeDraft::new(NodeKind::Article, title)
            .with_content(content)
            .under(parent_id);
        draft.status = status;
        self.create_node(actor, draft)
    }

    pub fn get_node(&self, id: &NodeId) -> Result<Node, ManhajError> {
        self.nodes().get(id)
    }

    /// Topics ordered by title, as shown on the landing page.
    pub fn list_topics(&self) -> Result<Vec<Node>, ManhajError> {
        self.nodes().list_by_type(NodeKind::Topic)
    }

    /// Admin content board: every node, optionally filtered, most recently
    /// updated first.
    pub fn list_nodes(
        &self,
        actor: &Actor,
        kind: Option<NodeKind>,
        author: Option<&UserId>,
    ) -> Result<Vec<Node>, ManhajError> {
        require_admin(actor, "list all content")?;
        let nodes = match author {
            Some(author) => self.nodes().list_by_author(author)?,
            None => self.nodes().list_all()?,
        };
        Ok(nodes
            .into_iter()
            .filter(|n| kind.is_none_or(|k| n.kind == k))
            .collect())
    }

    /// The actor's own nodes, most recently updated first.
    pub fn my_nodes(&self, actor: &Actor) -> Result<Vec<Node>, ManhajError> {
        self.nodes().list_by_author(&actor.user_id)
    }

    pub fn edit_node(
        &self,
        actor: &Actor,
        id: &NodeId,
        edit: ContentEdit,
        expected_version: Option<u64>,
    ) -> Result<Node, ManhajError> {
        self.nodes().update_content(id, edit, expected_version, |node| {
            WorkflowEngine::can_edit(actor, node)
        })
    }

    /// Move a node through the workflow. Authorization is evaluated against
    /// the stored status inside the write.
    pub fn set_status(
        &self,
        actor: &Actor,
        id: &NodeId,
        to: Status,
        expected_version: Option<u64>,
    ) -> Result<Node, ManhajError> {
        self.nodes().update_status(id, to, expected_version, |node| {
            WorkflowEngine::can_transition(actor, node, node.status, to)
        })
    }

    /// Delete a node and everything that references it.
    pub fn delete_node(&self, actor: &Actor, id: &NodeId) -> Result<Node, ManhajError> {
        self.nodes()
            .delete(id, |node| WorkflowEngine::can_delete(actor, node))
    }

    // =========================================================================
    // TAXONOMY
    // =========================================================================

    pub fn children(&self, id: &NodeId) -> Result<Vec<Node>, ManhajError> {
        self.graph().children(id)
    }

    /// Breadcrumb from the furthest ancestor down to `id`.
    pub fn ancestors(&self, id: &NodeId) -> Result<Vec<Node>, ManhajError> {
        self.ancestry().ancestor_path(id)
    }

    pub fn link(
        &self,
        actor: &Actor,
        parent: &NodeId,
        child: &NodeId,
    ) -> Result<TaxonomyLink, ManhajError> {
        require_admin(actor, "link nodes")?;
        self.graph().link(parent, child)
    }

    pub fn unlink(&self, actor: &Actor, parent: &NodeId, child: &NodeId) -> Result<(), ManhajError> {
        require_admin(actor, "unlink nodes")?;
        self.graph().unlink(parent, child)
    }

    /// Depth-first outline of the taxonomy, from `root` or from every root.
    ///
    /// A node with several parents appears once under each of them, but its
    /// subtree is expanded only the first time; later rows are marked
    /// `repeated`. The outline has one row per root plus one per link.
    pub fn outline(&self, root: Option<&NodeId>) -> Result<Vec<OutlineEntry>, ManhajError> {
        let graph = self.graph();
        let starts = match root {
            Some(id) => vec![self.get_node(id)?],
            None => graph.roots()?,
        };

        let mut out = Vec::new();
        let mut expanded: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack: Vec<(usize, Node)> = starts.into_iter().rev().map(|n| (0, n)).collect();
        while let Some((depth, node)) = stack.pop() {
            let repeated = !expanded.insert(node.id.clone());
            if !repeated {
                for child in graph.children(&node.id)?.into_iter().rev() {
                    stack.push((depth + 1, child));
                }
            }
            out.push(OutlineEntry {
                depth,
                node,
                repeated,
            });
        }
        Ok(out)
    }

    // =========================================================================
    // CURRICULUM TAGS
    // =========================================================================

    pub fn tags_for(&self, id: &NodeId) -> Result<Vec<CurriculumTag>, ManhajError> {
        self.tag_index().tags_for(id)
    }

    pub fn add_tag(
        &self,
        actor: &Actor,
        id: &NodeId,
        country: &str,
        grade: u8,
        subject: &str,
    ) -> Result<CurriculumTag, ManhajError> {
        require_admin(actor, "tag content")?;
        self.tag_index().add_tag(id, country, grade, subject)
    }

    /// Admin-only: drop every tag of a node. Returns how many were removed.
    pub fn clear_tags(&self, actor: &Actor, id: &NodeId) -> Result<usize, ManhajError> {
        require_admin(actor, "untag content")?;
        self.get_node(id)?;
        self.tag_index().remove_all_for(id)
    }

    pub fn nodes_tagged(&self, query: &TagQuery) -> Result<Vec<Node>, ManhajError> {
        self.tag_index().nodes_tagged(query)
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// Register a user without an acting admin (CLI bootstrap, seeding).
    pub fn register_user(&self, new: NewUser) -> Result<User, ManhajError> {
        self.users().create(new)
    }

    pub fn create_user(&self, actor: &Actor, new: NewUser) -> Result<User, ManhajError> {
        require_admin(actor, "create users")?;
        self.users().create(new)
    }

    pub fn list_users(&self, actor: &Actor) -> Result<Vec<UserSummary>, ManhajError> {
        require_admin(actor, "list users")?;
        self.users().list()
    }

    pub fn delete_user(&self, actor: &Actor, id: &UserId) -> Result<User, ManhajError> {
        require_admin(actor, "delete users")?;
        self.users().delete(id)
    }

    // =========================================================================
    // METRICS / SEEDING
    // =========================================================================

    pub fn metrics(&self) -> Result<CatalogMetrics, ManhajError> {
        let counts = self.store().counts()?;
        let nodes = self.store().nodes()?;
        Ok(CatalogMetrics {
            nodes: counts.nodes,
            links: counts.links,
            tags: counts.tags,
            users: counts.users,
            by_status: StatusCounts::tally(&nodes),
            persistent: self.is_persistent(),
        })
    }

    /// Dashboard counts for the actor's own content.
    pub fn author_summary(&self, actor: &Actor) -> Result<StatusCounts, ManhajError> {
        let mine = self.my_nodes(actor)?;
        Ok(StatusCounts::tally(&mine))
    }

    /// Upsert the records of `manifest`. Safe to repeat.
    pub fn seed(&self, manifest: &SeedManifest) -> Result<SeedReport, ManhajError> {
        Seeder::new(self.store()).apply(manifest)
    }
}

// =============================================================================
// TESTS
// =============================================================================
