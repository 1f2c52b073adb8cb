//! # redb-backed Content Storage
//!
//! A disk-backed content store using the redb embedded database, providing:
//! - ACID transactions (every `ContentStore` mutation is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Adjacency is kept in both directions so children and parent lookups are
//! point reads. Records are postcard-encoded.

use super::{ContentStore, NodeMutation, RemovalGuard, StoreCounts, check_immutable_fields};
use crate::taxonomy::creates_cycle;
use crate::{CurriculumTag, ManhajError, Node, NodeId, TaxonomyLink, User, UserId};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;

/// Table for nodes: node id -> serialized Node
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Adjacency: parent id -> serialized BTreeSet<NodeId> of children
const CHILDREN: TableDefinition<&str, &[u8]> = TableDefinition::new("children");

/// Reverse adjacency: child id -> serialized BTreeSet<NodeId> of parents
const PARENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("parents");

/// Curriculum tags: node id -> serialized BTreeSet<CurriculumTag>
const TAGS: TableDefinition<&str, &[u8]> = TableDefinition::new("tags");

/// Table for users: user id -> serialized User
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: normalized email -> user id
const EMAILS: TableDefinition<&str, &str> = TableDefinition::new("emails");

fn storage(e: impl std::fmt::Display) -> ManhajError {
    ManhajError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ManhajError> {
    postcard::to_allocvec(value).map_err(|e| ManhajError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ManhajError> {
    postcard::from_bytes(bytes).map_err(|e| ManhajError::Serialization(e.to_string()))
}

/// Read and decode one record from any readable table.
fn load<T, Tbl>(table: &Tbl, key: &str) -> Result<Option<T>, ManhajError>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key).map_err(storage)? {
        Some(guard) => decode(guard.value()).map(Some),
        None => Ok(None),
    }
}

/// Read an id set (adjacency entry or tag set); absent keys are empty sets.
fn load_set<T, Tbl>(table: &Tbl, key: &str) -> Result<BTreeSet<T>, ManhajError>
where
    T: DeserializeOwned + Ord,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    Ok(load(table, key)?.unwrap_or_default())
}

/// Collect every decoded value of a table in key order.
fn load_all<T, Tbl>(table: &Tbl) -> Result<Vec<T>, ManhajError>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    let mut out = Vec::new();
    for entry in table.iter().map_err(storage)? {
        let (_, value) = entry.map_err(storage)?;
        out.push(decode(value.value())?);
    }
    Ok(out)
}

/// Write an id set back, removing the key when the set became empty.
fn store_set<T: Serialize>(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    key: &str,
    set: &BTreeSet<T>,
) -> Result<(), ManhajError> {
    if set.is_empty() {
        table.remove(key).map_err(storage)?;
    } else {
        let bytes = encode(set)?;
        table.insert(key, bytes.as_slice()).map_err(storage)?;
    }
    Ok(())
}

/// A disk-backed content store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a content database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ManhajError> {
        let db = Database::create(path.as_ref()).map_err(storage)?;
        let store = Self { db };

        // Initialize tables if they don't exist
        store.write(|txn| {
            txn.open_table(NODES).map_err(storage)?;
            txn.open_table(CHILDREN).map_err(storage)?;
            txn.open_table(PARENTS).map_err(storage)?;
            txn.open_table(TAGS).map_err(storage)?;
            txn.open_table(USERS).map_err(storage)?;
            txn.open_table(EMAILS).map_err(storage)?;
            Ok(())
        })?;

        tracing::debug!(path = %path.as_ref().display(), "opened redb content store");
        Ok(store)
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), ManhajError> {
        self.db.compact().map_err(storage)?;
        Ok(())
    }

    /// Run `work` in one write transaction. Commits on success, aborts on error.
    fn write<T>(
        &self,
        work: impl FnOnce(&WriteTransaction) -> Result<T, ManhajError>,
    ) -> Result<T, ManhajError> {
        let txn = self.db.begin_write().map_err(storage)?;
        match work(&txn) {
            Ok(out) => {
                txn.commit().map_err(storage)?;
                Ok(out)
            }
            Err(e) => {
                if let Err(abort) = txn.abort() {
                    tracing::warn!(error = %abort, "failed to abort redb transaction");
                }
                Err(e)
            }
        }
    }

    /// Run `work` against a read snapshot.
    fn read<T>(
        &self,
        work: impl FnOnce(&ReadTransaction) -> Result<T, ManhajError>,
    ) -> Result<T, ManhajError> {
        let txn = self.db.begin_read().map_err(storage)?;
        work(&txn)
    }
}

// =============================================================================
// CONTENTSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl ContentStore for RedbStore {
    fn insert_node(&self, node: &Node, parent: Option<&NodeId>) -> Result<(), ManhajError> {
        let bytes = encode(node)?;
        self.write(|txn| {
            let mut nodes = txn.open_table(NODES).map_err(storage)?;
            if nodes.get(node.id.as_str()).map_err(storage)?.is_some() {
                return Err(ManhajError::Conflict(format!(
                    "node id '{}' already exists",
                    node.id
                )));
            }
            if let Some(parent) = parent
                && nodes.get(parent.as_str()).map_err(storage)?.is_none()
            {
                return Err(ManhajError::NodeNotFound(parent.clone()));
            }
            nodes
                .insert(node.id.as_str(), bytes.as_slice())
                .map_err(storage)?;

            if let Some(parent) = parent {
                let mut children = txn.open_table(CHILDREN).map_err(storage)?;
                let mut set: BTreeSet<NodeId> = load_set(&children, parent.as_str())?;
                set.insert(node.id.clone());
                store_set(&mut children, parent.as_str(), &set)?;

                let mut parents = txn.open_table(PARENTS).map_err(storage)?;
                let set = BTreeSet::from([parent.clone()]);
                store_set(&mut parents, node.id.as_str(), &set)?;
            }
            Ok(())
        })
    }

    fn node(&self, id: &NodeId) -> Result<Option<Node>, ManhajError> {
        self.read(|txn| {
            let nodes = txn.open_table(NODES).map_err(storage)?;
            load(&nodes, id.as_str())
        })
    }

    fn nodes(&self) -> Result<Vec<Node>, ManhajError> {
        self.read(|txn| {
            let nodes = txn.open_table(NODES).map_err(storage)?;
            load_all(&nodes)
        })
    }

    fn modify_node(&self, id: &NodeId, apply: NodeMutation<'_>) -> Result<Node, ManhajError> {
        self.write(|txn| {
            let mut nodes = txn.open_table(NODES).map_err(storage)?;
            let current: Node = load(&nodes, id.as_str())?
                .ok_or_else(|| ManhajError::NodeNotFound(id.clone()))?;

            let mut updated = current.clone();
            apply(&mut updated)?;
            check_immutable_fields(&current, &updated)?;

            let bytes = encode(&updated)?;
            nodes.insert(id.as_str(), bytes.as_slice()).map_err(storage)?;
            Ok(updated)
        })
    }

    fn remove_node(
        &self,
        id: &NodeId,
        guard: RemovalGuard<'_, Node>,
    ) -> Result<Node, ManhajError> {
        self.write(|txn| {
            let mut nodes = txn.open_table(NODES).map_err(storage)?;
            let node: Node = load(&nodes, id.as_str())?
                .ok_or_else(|| ManhajError::NodeNotFound(id.clone()))?;
            guard(&node)?;

            let mut children = txn.open_table(CHILDREN).map_err(storage)?;
            let mut parents = txn.open_table(PARENTS).map_err(storage)?;

            // Outgoing edges: drop this node from each child's parent set.
            let outgoing: BTreeSet<NodeId> = load_set(&children, id.as_str())?;
            for child in &outgoing {
                let mut set: BTreeSet<NodeId> = load_set(&parents, child.as_str())?;
                set.remove(id);
                store_set(&mut parents, child.as_str(), &set)?;
            }
            children.remove(id.as_str()).map_err(storage)?;

            // Incoming edges: drop this node from each parent's child set.
            let incoming: BTreeSet<NodeId> = load_set(&parents, id.as_str())?;
            for parent in &incoming {
                let mut set: BTreeSet<NodeId> = load_set(&children, parent.as_str())?;
                set.remove(id);
                store_set(&mut children, parent.as_str(), &set)?;
            }
            parents.remove(id.as_str()).map_err(storage)?;

            let mut tags = txn.open_table(TAGS).map_err(storage)?;
            tags.remove(id.as_str()).map_err(storage)?;
            nodes.remove(id.as_str()).map_err(storage)?;
            Ok(node)
        })
    }

    fn insert_link(&self, link: &TaxonomyLink) -> Result<bool, ManhajError> {
        self.write(|txn| {
            let nodes = txn.open_table(NODES).map_err(storage)?;
            for endpoint in [&link.parent_id, &link.child_id] {
                if nodes.get(endpoint.as_str()).map_err(storage)?.is_none() {
                    return Err(ManhajError::NodeNotFound(endpoint.clone()));
                }
            }

            let mut children = txn.open_table(CHILDREN).map_err(storage)?;
            let mut parents = txn.open_table(PARENTS).map_err(storage)?;

            let mut child_set: BTreeSet<NodeId> = load_set(&children, link.parent_id.as_str())?;
            if child_set.contains(&link.child_id) {
                return Ok(false);
            }
            if creates_cycle(&link.parent_id, &link.child_id, |id| {
                Ok(load_set::<NodeId, _>(&parents, id.as_str())?
                    .into_iter()
                    .collect())
            })? {
                return Err(ManhajError::CycleDetected {
                    parent: link.parent_id.clone(),
                    child: link.child_id.clone(),
                });
            }

            child_set.insert(link.child_id.clone());
            store_set(&mut children, link.parent_id.as_str(), &child_set)?;

            let mut parent_set: BTreeSet<NodeId> = load_set(&parents, link.child_id.as_str())?;
            parent_set.insert(link.parent_id.clone());
            store_set(&mut parents, link.child_id.as_str(), &parent_set)?;
            Ok(true)
        })
    }

    fn remove_link(&self, link: &TaxonomyLink) -> Result<bool, ManhajError> {
        self.write(|txn| {
            let mut children = txn.open_table(CHILDREN).map_err(storage)?;
            let mut child_set: BTreeSet<NodeId> = load_set(&children, link.parent_id.as_str())?;
            if !child_set.remove(&link.child_id) {
                return Ok(false);
            }
            store_set(&mut children, link.parent_id.as_str(), &child_set)?;

            let mut parents = txn.open_table(PARENTS).map_err(storage)?;
            let mut parent_set: BTreeSet<NodeId> = load_set(&parents, link.child_id.as_str())?;
            parent_set.remove(&link.parent_id);
            store_set(&mut parents, link.child_id.as_str(), &parent_set)?;
            Ok(true)
        })
    }

    fn children_of(&self, parent: &NodeId) -> Result<Vec<NodeId>, ManhajError> {
        self.read(|txn| {
            let children = txn.open_table(CHILDREN).map_err(storage)?;
            Ok(load_set(&children, parent.as_str())?.into_iter().collect())
        })
    }

    fn parents_of(&self, child: &NodeId) -> Result<Vec<NodeId>, ManhajError> {
        self.read(|txn| {
            let parents = txn.open_table(PARENTS).map_err(storage)?;
            Ok(load_set(&parents, child.as_str())?.into_iter().collect())
        })
    }

    fn links(&self) -> Result<Vec<TaxonomyLink>, ManhajError> {
        self.read(|txn| {
            let children = txn.open_table(CHILDREN).map_err(storage)?;
            let mut links = Vec::new();
            for entry in children.iter().map_err(storage)? {
                let (key, value) = entry.map_err(storage)?;
                let parent = NodeId::new(key.value());
                let set: BTreeSet<NodeId> = decode(value.value())?;
                links.extend(
                    set.into_iter()
                        .map(|child| TaxonomyLink::new(parent.clone(), child)),
                );
            }
            Ok(links)
        })
    }

    fn insert_tag(&self, tag: &CurriculumTag) -> Result<bool, ManhajError> {
        self.write(|txn| {
            let nodes = txn.open_table(NODES).map_err(storage)?;
            if nodes.get(tag.node_id.as_str()).map_err(storage)?.is_none() {
                return Err(ManhajError::NodeNotFound(tag.node_id.clone()));
            }
            let mut tags = txn.open_table(TAGS).map_err(storage)?;
            let mut set: BTreeSet<CurriculumTag> = load_set(&tags, tag.node_id.as_str())?;
            if !set.insert(tag.clone()) {
                return Ok(false);
            }
            store_set(&mut tags, tag.node_id.as_str(), &set)?;
            Ok(true)
        })
    }

    fn tags_for(&self, node: &NodeId) -> Result<Vec<CurriculumTag>, ManhajError> {
        self.read(|txn| {
            let tags = txn.open_table(TAGS).map_err(storage)?;
            Ok(load_set(&tags, node.as_str())?.into_iter().collect())
        })
    }

    fn tags(&self) -> Result<Vec<CurriculumTag>, ManhajError> {
        self.read(|txn| {
            let tags = txn.open_table(TAGS).map_err(storage)?;
            let sets: Vec<BTreeSet<CurriculumTag>> = load_all(&tags)?;
            Ok(sets.into_iter().flatten().collect())
        })
    }

    fn remove_tags_for(&self, node: &NodeId) -> Result<usize, ManhajError> {
        self.write(|txn| {
            let mut tags = txn.open_table(TAGS).map_err(storage)?;
            let set: BTreeSet<CurriculumTag> = load_set(&tags, node.as_str())?;
            tags.remove(node.as_str()).map_err(storage)?;
            Ok(set.len())
        })
    }

    fn insert_user(&self, user: &User) -> Result<(), ManhajError> {
        let bytes = encode(user)?;
        self.write(|txn| {
            let mut users = txn.open_table(USERS).map_err(storage)?;
            let mut emails = txn.open_table(EMAILS).map_err(storage)?;
            if users.get(user.id.as_str()).map_err(storage)?.is_some() {
                return Err(ManhajError::Conflict(format!(
                    "user id '{}' already exists",
                    user.id
                )));
            }
            if emails.get(user.email.as_str()).map_err(storage)?.is_some() {
                return Err(ManhajError::Conflict(format!(
                    "email '{}' is already registered",
                    user.email
                )));
            }
            users
                .insert(user.id.as_str(), bytes.as_slice())
                .map_err(storage)?;
            emails
                .insert(user.email.as_str(), user.id.as_str())
                .map_err(storage)?;
            Ok(())
        })
    }

    fn user(&self, id: &UserId) -> Result<Option<User>, ManhajError> {
        self.read(|txn| {
            let users = txn.open_table(USERS).map_err(storage)?;
            load(&users, id.as_str())
        })
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, ManhajError> {
        self.read(|txn| {
            let emails = txn.open_table(EMAILS).map_err(storage)?;
            let Some(id) = emails
                .get(email)
                .map_err(storage)?
                .map(|guard| guard.value().to_string())
            else {
                return Ok(None);
            };
            let users = txn.open_table(USERS).map_err(storage)?;
            load(&users, &id)
        })
    }

    fn users(&self) -> Result<Vec<User>, ManhajError> {
        self.read(|txn| {
            let users = txn.open_table(USERS).map_err(storage)?;
            load_all(&users)
        })
    }

    fn remove_user(
        &self,
        id: &UserId,
        guard: RemovalGuard<'_, User>,
    ) -> Result<User, ManhajError> {
        self.write(|txn| {
            let mut users = txn.open_table(USERS).map_err(storage)?;
            let user: User = load(&users, id.as_str())?
                .ok_or_else(|| ManhajError::UserNotFound(id.clone()))?;
            guard(&user)?;

            let mut nodes = txn.open_table(NODES).map_err(storage)?;
            let all: Vec<Node> = load_all(&nodes)?;
            for mut node in all.into_iter().filter(|n| n.is_authored_by(id)) {
                node.author_id = None;
                node.touch();
                let bytes = encode(&node)?;
                nodes
                    .insert(node.id.as_str(), bytes.as_slice())
                    .map_err(storage)?;
            }

            let mut emails = txn.open_table(EMAILS).map_err(storage)?;
            emails.remove(user.email.as_str()).map_err(storage)?;
            users.remove(id.as_str()).map_err(storage)?;
            Ok(user)
        })
    }

    fn counts(&self) -> Result<StoreCounts, ManhajError> {
        self.read(|txn| {
            let nodes = txn.open_table(NODES).map_err(storage)?;
            let users = txn.open_table(USERS).map_err(storage)?;
            let children = txn.open_table(CHILDREN).map_err(storage)?;
            let tags = txn.open_table(TAGS).map_err(storage)?;

            let child_sets: Vec<BTreeSet<NodeId>> = load_all(&children)?;
            let tag_sets: Vec<BTreeSet<CurriculumTag>> = load_all(&tags)?;
            Ok(StoreCounts {
                nodes: nodes.len().map_err(storage)? as usize,
                links: child_sets.iter().map(BTreeSet::len).sum(),
                tags: tag_sets.iter().map(BTreeSet::len).sum(),
                users: users.len().map_err(storage)? as usize,
            })
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
    use crate::{NodeKind, Status};
    use tempfile::{TempDir, tempdir};

    fn open_temp() -> (RedbStore, TempDir) {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        (store, temp)
    }

    #[test]
    fn insert_with_parent_is_atomic() {
        let (store, _temp) = open_temp();
        conformance::insert_with_parent_is_atomic(&store);
    }

    #[test]
    fn duplicate_node_id_conflicts() {
        let (store, _temp) = open_temp();
        conformance::duplicate_node_id_conflicts(&store);
    }

    #[test]
    fn remove_node_cascades() {
        let (store, _temp) = open_temp();
        conformance::remove_node_cascades(&store);
    }

    #[test]
    fn remove_guard_aborts_removal() {
        let (store, _temp) = open_temp();
        conformance::remove_guard_aborts_removal(&store);
    }

    #[test]
    fn link_rejects_cycles_and_duplicates() {
        let (store, _temp) = open_temp();
        conformance::link_rejects_cycles_and_duplicates(&store);
    }

    #[test]
    fn modify_node_failure_leaves_record_untouched() {
        let (store, _temp) = open_temp();
        conformance::modify_node_failure_leaves_record_untouched(&store);
    }

    #[test]
    fn modify_node_cannot_change_kind() {
        let (store, _temp) = open_temp();
        conformance::modify_node_cannot_change_kind(&store);
    }

    #[test]
    fn tags_are_unique_per_node() {
        let (store, _temp) = open_temp();
        conformance::tags_are_unique_per_node(&store);
    }

    #[test]
    fn user_email_is_unique() {
        let (store, _temp) = open_temp();
        conformance::user_email_is_unique(&store);
    }

    #[test]
    fn remove_user_detaches_authorship() {
        let (store, _temp) = open_temp();
        conformance::remove_user_detaches_authorship(&store);
    }

    #[test]
    fn counts_track_all_tables() {
        let (store, _temp) = open_temp();
        conformance::counts_track_all_tables(&store);
    }

    // =========================================================================
    // Recovery after restart (simulated via reopen)
    // =========================================================================

    #[test]
    fn recovery_persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        // Phase 1: Create data
        {
            let store = RedbStore::open(&db_path).expect("open db");
            let topic = Node::new(NodeId::new("t"), NodeKind::Topic, "T", Status::Published);
            let article = Node::new(NodeId::new("a"), NodeKind::Article, "A", Status::Draft)
                .with_content(r#"{"plugin":"rows","state":[]}"#);
            store.insert_node(&topic, None).expect("insert");
            store
                .insert_node(&article, Some(&NodeId::new("t")))
                .expect("insert");
            store
                .insert_tag(&CurriculumTag::new(NodeId::new("a"), "SA", 4, "Math"))
                .expect("tag");
        }
        // Store dropped here, simulating process exit

        // Phase 2: Reopen and verify all data persisted
        {
            let store = RedbStore::open(&db_path).expect("reopen db");
            let counts = store.counts().expect("counts");
            assert_eq!((counts.nodes, counts.links, counts.tags), (2, 1, 1));

            let article = store.node(&NodeId::new("a")).expect("lookup").expect("node");
            assert_eq!(
                article.content.as_deref(),
                Some(r#"{"plugin":"rows","state":[]}"#)
            );
            assert_eq!(
                store.parents_of(&NodeId::new("a")).expect("parents"),
                vec![NodeId::new("t")]
            );
        }
    }

    #[test]
    fn credentials_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        let stored = {
            let store = RedbStore::open(&db_path).expect("open db");
            let user = crate::User {
                id: crate::UserId::new("u-1"),
                name: "Huda".to_string(),
                email: "huda@example.com".to_string(),
                role: crate::Role::Contributor,
                credential: crate::Credential::derive("secret123").expect("hash"),
                created_at: chrono::Utc::now(),
            };
            store.insert_user(&user).expect("insert user");
            user.credential
        };

        let store = RedbStore::open(&db_path).expect("reopen db");
        let user = store
            .user_by_email("huda@example.com")
            .expect("lookup")
            .expect("user");
        assert_eq!(user.credential, stored);
        assert!(user.credential.verify("secret123"));
        assert!(!user.credential.verify("secret124"));
    }

    #[test]
    fn recovery_compact_and_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            for i in 0..20 {
                let node = Node::new(
                    NodeId::new(format!("n{i:02}")),
                    NodeKind::Exercise,
                    format!("Exercise {i}"),
                    Status::Draft,
                );
                store.insert_node(&node, None).expect("insert");
            }
            for i in 0..10 {
                store
                    .remove_node(&NodeId::new(format!("n{i:02}")), &mut |_| Ok(()))
                    .expect("remove");
            }
            store.compact().expect("compact");
        }

        let store = RedbStore::open(&db_path).expect("reopen db");
        let nodes = store.nodes().expect("nodes");
        assert_eq!(nodes.len(), 10);
        assert_eq!(nodes[0].id, NodeId::new("n10"));
    }
}
