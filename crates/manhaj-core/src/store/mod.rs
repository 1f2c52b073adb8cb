//! # Content Storage
//!
//! The `ContentStore` trait is the persistence seam of the engine. Two
//! backends implement it:
//! - [`MemoryStore`]: BTreeMap tables behind a `RwLock` (fast, volatile)
//! - [`RedbStore`]: redb embedded database (ACID, persistent)
//!
//! Every method that touches more than one record (node + link, node +
//! cascade, link + cycle check, read-modify-write with version check) runs
//! inside a single write section, so callers never observe partial state.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{CurriculumTag, ManhajError, Node, NodeId, TaxonomyLink, User, UserId};
use std::path::Path;

/// Closure applied to a node inside the write section.
pub type NodeMutation<'a> = &'a mut dyn FnMut(&mut Node) -> Result<(), ManhajError>;

/// Closure consulted before a record is removed. Returning an error aborts.
pub type RemovalGuard<'a, T> = &'a mut dyn FnMut(&T) -> Result<(), ManhajError>;

/// Record counts across all tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub nodes: usize,
    pub links: usize,
    pub tags: usize,
    pub users: usize,
}

/// The ContentStore trait defines the durable operations of the engine.
///
/// All methods take `&self`; backends synchronize internally so a store can be
/// shared across request handlers without an outer lock.
pub trait ContentStore: Send + Sync {
    /// Insert a new node, optionally linked under `parent` in the same unit.
    ///
    /// Fails with `Conflict` if the id is taken and `NodeNotFound` if the
    /// parent does not exist.
    fn insert_node(&self, node: &Node, parent: Option<&NodeId>) -> Result<(), ManhajError>;

    /// Lookup a node by id.
    fn node(&self, id: &NodeId) -> Result<Option<Node>, ManhajError>;

    /// All nodes, ordered by id.
    fn nodes(&self) -> Result<Vec<Node>, ManhajError>;

    /// Read-modify-write a node. `apply` sees the current stored value; if it
    /// returns an error nothing is written. The id and kind cannot change.
    fn modify_node(&self, id: &NodeId, apply: NodeMutation<'_>) -> Result<Node, ManhajError>;

    /// Remove a node together with every link and tag referencing it.
    fn remove_node(&self, id: &NodeId, guard: RemovalGuard<'_, Node>)
    -> Result<Node, ManhajError>;

    /// Insert a parent → child link.
    ///
    /// Both endpoints must exist and the link must not close a cycle; both
    /// checks run inside the write section. Returns `false` if the link was
    /// already present.
    fn insert_link(&self, link: &TaxonomyLink) -> Result<bool, ManhajError>;

    /// Remove a link. Returns `false` if it was not present.
    fn remove_link(&self, link: &TaxonomyLink) -> Result<bool, ManhajError>;

    /// Ids of the direct children of `parent`, ordered by id.
    fn children_of(&self, parent: &NodeId) -> Result<Vec<NodeId>, ManhajError>;

    /// Ids of the direct parents of `child`, ordered by id.
    fn parents_of(&self, child: &NodeId) -> Result<Vec<NodeId>, ManhajError>;

    /// All links, ordered by (parent, child).
    fn links(&self) -> Result<Vec<TaxonomyLink>, ManhajError>;

    /// Attach a tag to an existing node. Returns `false` for a duplicate.
    fn insert_tag(&self, tag: &CurriculumTag) -> Result<bool, ManhajError>;

    /// Tags of one node, ordered.
    fn tags_for(&self, node: &NodeId) -> Result<Vec<CurriculumTag>, ManhajError>;

    /// All tags, ordered.
    fn tags(&self) -> Result<Vec<CurriculumTag>, ManhajError>;

    /// Drop every tag of a node. Returns how many were removed.
    fn remove_tags_for(&self, node: &NodeId) -> Result<usize, ManhajError>;

    /// Insert a user. Fails with `Conflict` if the id or email is taken.
    fn insert_user(&self, user: &User) -> Result<(), ManhajError>;

    /// Lookup a user by id.
    fn user(&self, id: &UserId) -> Result<Option<User>, ManhajError>;

    /// Lookup a user by normalized email.
    fn user_by_email(&self, email: &str) -> Result<Option<User>, ManhajError>;

    /// All users, ordered by id.
    fn users(&self) -> Result<Vec<User>, ManhajError>;

    /// Remove a user; nodes they authored keep existing with no author.
    fn remove_user(&self, id: &UserId, guard: RemovalGuard<'_, User>)
    -> Result<User, ManhajError>;

    /// Record counts.
    fn counts(&self) -> Result<StoreCounts, ManhajError>;
}

/// Reject mutations that try to rewrite immutable node fields.
pub(crate) fn check_immutable_fields(before: &Node, after: &Node) -> Result<(), ManhajError> {
    if before.id != after.id {
        return Err(ManhajError::invalid("node id cannot change"));
    }
    if before.kind != after.kind {
        return Err(ManhajError::invalid(format!(
            "node type is fixed at creation ({})",
            before.kind
        )));
    }
    Ok(())
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Catalog.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open a redb-backed store at `path`.
    pub fn redb(path: impl AsRef<Path>) -> Result<Self, ManhajError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Borrow the backend as a trait object.
    #[must_use]
    pub fn as_store(&self) -> &dyn ContentStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

// =============================================================================
// BACKEND CONFORMANCE TESTS
// =============================================================================

/// Behavioural checks shared by every backend's test module.
#[cfg(test)]
pub(crate) mod conformance {
    use super::ContentStore;
    use crate::{
        Credential, CurriculumTag, ManhajError, Node, NodeId, NodeKind, Role, Status,
        TaxonomyLink, User, UserId,
    };
    use chrono::Utc;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node::new(NodeId::new(id), kind, id.to_uppercase(), Status::Published)
    }

    fn user(id: &str, email: &str, role: Role) -> User {
        User {
            id: UserId::new(id),
            name: id.to_string(),
            email: email.to_string(),
            role,
            credential: Credential::derive("password").expect("hash"),
            created_at: Utc::now(),
        }
    }

    fn link(parent: &str, child: &str) -> TaxonomyLink {
        TaxonomyLink::new(NodeId::new(parent), NodeId::new(child))
    }

    pub fn insert_with_parent_is_atomic(store: &dyn ContentStore) {
        let missing = NodeId::new("ghost");
        let result = store.insert_node(&node("a", NodeKind::Article), Some(&missing));
        assert!(matches!(result, Err(ManhajError::NodeNotFound(id)) if id == missing));
        assert!(store.node(&NodeId::new("a")).expect("lookup").is_none());

        store
            .insert_node(&node("t", NodeKind::Topic), None)
            .expect("insert topic");
        store
            .insert_node(&node("a", NodeKind::Article), Some(&NodeId::new("t")))
            .expect("insert article");
        assert_eq!(
            store.children_of(&NodeId::new("t")).expect("children"),
            vec![NodeId::new("a")]
        );
        assert_eq!(
            store.parents_of(&NodeId::new("a")).expect("parents"),
            vec![NodeId::new("t")]
        );
    }

    pub fn duplicate_node_id_conflicts(store: &dyn ContentStore) {
        store
            .insert_node(&node("t", NodeKind::Topic), None)
            .expect("insert");
        let again = store.insert_node(&node("t", NodeKind::Article), None);
        assert!(matches!(again, Err(ManhajError::Conflict(_))));
        let stored = store.node(&NodeId::new("t")).expect("lookup").expect("node");
        assert_eq!(stored.kind, NodeKind::Topic);
    }

    pub fn remove_node_cascades(store: &dyn ContentStore) {
        store
            .insert_node(&node("root", NodeKind::Topic), None)
            .expect("insert");
        store
            .insert_node(&node("mid", NodeKind::Topic), Some(&NodeId::new("root")))
            .expect("insert");
        store
            .insert_node(&node("leaf", NodeKind::Article), Some(&NodeId::new("mid")))
            .expect("insert");
        store
            .insert_tag(&CurriculumTag::new(NodeId::new("mid"), "SA", 4, "Math"))
            .expect("tag");

        let removed = store
            .remove_node(&NodeId::new("mid"), &mut |_| Ok(()))
            .expect("remove");
        assert_eq!(removed.id, NodeId::new("mid"));

        assert!(store.links().expect("links").is_empty());
        assert!(store.tags().expect("tags").is_empty());
        assert!(store.parents_of(&NodeId::new("leaf")).expect("parents").is_empty());
        assert!(store.children_of(&NodeId::new("root")).expect("children").is_empty());
        assert!(store.node(&NodeId::new("leaf")).expect("lookup").is_some());

        let again = store.remove_node(&NodeId::new("mid"), &mut |_| Ok(()));
        assert!(matches!(again, Err(ManhajError::NodeNotFound(_))));
    }

    pub fn remove_guard_aborts_removal(store: &dyn ContentStore) {
        store
            .insert_node(&node("t", NodeKind::Topic), None)
            .expect("insert");
        store
            .insert_node(&node("a", NodeKind::Article), Some(&NodeId::new("t")))
            .expect("insert");

        let result = store.remove_node(&NodeId::new("a"), &mut |_| {
            Err(ManhajError::Forbidden("no".into()))
        });
        assert!(matches!(result, Err(ManhajError::Forbidden(_))));
        assert!(store.node(&NodeId::new("a")).expect("lookup").is_some());
        assert_eq!(store.links().expect("links").len(), 1);
    }

    pub fn link_rejects_cycles_and_duplicates(store: &dyn ContentStore) {
        for id in ["a", "b", "c"] {
            store
                .insert_node(&node(id, NodeKind::Topic), None)
                .expect("insert");
        }
        assert!(store.insert_link(&link("a", "b")).expect("link"));
        assert!(store.insert_link(&link("b", "c")).expect("link"));
        assert!(!store.insert_link(&link("a", "b")).expect("duplicate"));

        let cycle = store.insert_link(&link("c", "a"));
        assert!(matches!(cycle, Err(ManhajError::CycleDetected { .. })));
        let self_loop = store.insert_link(&link("b", "b"));
        assert!(matches!(self_loop, Err(ManhajError::CycleDetected { .. })));

        let dangling = store.insert_link(&link("a", "zzz"));
        assert!(matches!(dangling, Err(ManhajError::NodeNotFound(_))));

        // Diamond shapes are fine.
        assert!(store.insert_link(&link("a", "c")).expect("link"));
        assert_eq!(store.links().expect("links").len(), 3);

        assert!(store.remove_link(&link("a", "c")).expect("unlink"));
        assert!(!store.remove_link(&link("a", "c")).expect("unlink again"));
    }

    pub fn modify_node_failure_leaves_record_untouched(store: &dyn ContentStore) {
        store
            .insert_node(&node("a", NodeKind::Article), None)
            .expect("insert");
        let result = store.modify_node(&NodeId::new("a"), &mut |n| {
            n.title = "changed".into();
            Err(ManhajError::Forbidden("rejected".into()))
        });
        assert!(result.is_err());
        let stored = store.node(&NodeId::new("a")).expect("lookup").expect("node");
        assert_eq!(stored.title, "A");

        let updated = store
            .modify_node(&NodeId::new("a"), &mut |n| {
                n.title = "changed".into();
                n.touch();
                Ok(())
            })
            .expect("modify");
        assert_eq!(updated.version, 2);
        let stored = store.node(&NodeId::new("a")).expect("lookup").expect("node");
        assert_eq!(stored.title, "changed");

        let missing = store.modify_node(&NodeId::new("zzz"), &mut |_| Ok(()));
        assert!(matches!(missing, Err(ManhajError::NodeNotFound(_))));
    }

    pub fn modify_node_cannot_change_kind(store: &dyn ContentStore) {
        store
            .insert_node(&node("a", NodeKind::Article), None)
            .expect("insert");
        let result = store.modify_node(&NodeId::new("a"), &mut |n| {
            n.kind = NodeKind::Video;
            Ok(())
        });
        assert!(matches!(result, Err(ManhajError::Validation(_))));
    }

    pub fn tags_are_unique_per_node(store: &dyn ContentStore) {
        store
            .insert_node(&node("t", NodeKind::Topic), None)
            .expect("insert");
        let tag = CurriculumTag::new(NodeId::new("t"), "SA", 4, "Math");
        assert!(store.insert_tag(&tag).expect("tag"));
        assert!(!store.insert_tag(&tag).expect("duplicate"));
        assert!(store
            .insert_tag(&CurriculumTag::new(NodeId::new("t"), "JO", 3, "Math"))
            .expect("tag"));
        assert_eq!(store.tags_for(&NodeId::new("t")).expect("tags").len(), 2);

        let orphan = store.insert_tag(&CurriculumTag::new(NodeId::new("x"), "SA", 4, "Math"));
        assert!(matches!(orphan, Err(ManhajError::NodeNotFound(_))));

        assert_eq!(store.remove_tags_for(&NodeId::new("t")).expect("remove"), 2);
        assert!(store.tags_for(&NodeId::new("t")).expect("tags").is_empty());
    }

    pub fn user_email_is_unique(store: &dyn ContentStore) {
        store
            .insert_user(&user("u1", "a@example.org", Role::Contributor))
            .expect("insert");
        let duplicate = store.insert_user(&user("u2", "a@example.org", Role::Contributor));
        assert!(matches!(duplicate, Err(ManhajError::Conflict(_))));
        store
            .insert_user(&user("u2", "b@example.org", Role::Contributor))
            .expect("insert");

        let found = store
            .user_by_email("b@example.org")
            .expect("lookup")
            .expect("user");
        assert_eq!(found.id, UserId::new("u2"));
        assert_eq!(store.users().expect("users").len(), 2);
    }

    pub fn remove_user_detaches_authorship(store: &dyn ContentStore) {
        store
            .insert_user(&user("u1", "a@example.org", Role::Contributor))
            .expect("insert");
        store
            .insert_node(
                &node("a", NodeKind::Article).with_author(UserId::new("u1")),
                None,
            )
            .expect("insert");

        store
            .remove_user(&UserId::new("u1"), &mut |_| Ok(()))
            .expect("remove");
        let stored = store.node(&NodeId::new("a")).expect("lookup").expect("node");
        assert_eq!(stored.author_id, None);
        assert!(store.user_by_email("a@example.org").expect("lookup").is_none());

        // The email is free again.
        store
            .insert_user(&user("u3", "a@example.org", Role::Contributor))
            .expect("re-register");
    }

    pub fn counts_track_all_tables(store: &dyn ContentStore) {
        store
            .insert_node(&node("t", NodeKind::Topic), None)
            .expect("insert");
        store
            .insert_node(&node("a", NodeKind::Article), Some(&NodeId::new("t")))
            .expect("insert");
        store
            .insert_tag(&CurriculumTag::new(NodeId::new("a"), "EG", 8, "Math"))
            .expect("tag");
        store
            .insert_user(&user("u1", "a@example.org", Role::Admin))
            .expect("user");

        let counts = store.counts().expect("counts");
        assert_eq!(
            (counts.nodes, counts.links, counts.tags, counts.users),
            (2, 1, 1, 1)
        );
    }
}
