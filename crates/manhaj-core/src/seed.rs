//! # Seeding
//!
//! Idempotent bootstrap of users and content from a manifest.
//!
//! Every record is upserted by a stable key (users by email, nodes by id,
//! links by their endpoints, tags by their full tuple). Nothing is ever
//! deleted, so applying a manifest to a live database only fills gaps and
//! refreshes seeded titles.

use crate::store::ContentStore;
use crate::users::{NewUser, UserDirectory};
use crate::validation;
use crate::{CurriculumTag, ManhajError, Node, NodeId, NodeKind, Role, Status, TaxonomyLink, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// MANIFEST
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedManifest {
    pub users: Vec<SeedUser>,
    pub nodes: Vec<SeedNode>,
    pub links: Vec<SeedLink>,
    pub tags: Vec<SeedTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Contributor
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Seeded content is live unless stated otherwise.
    #[serde(default = "default_status")]
    pub status: Status,
    /// Email of a seeded or existing user.
    #[serde(default)]
    pub author: Option<String>,
    /// Linked in the same unit as the insert when the node is new.
    #[serde(default)]
    pub parent: Option<NodeId>,
}

fn default_status() -> Status {
    Status::Published
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedLink {
    pub parent: NodeId,
    pub child: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTag {
    pub node: NodeId,
    pub country: String,
    pub grade: u8,
    pub subject: String,
}

/// What one application of a manifest changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users_inserted: usize,
    pub users_skipped: usize,
    pub nodes_inserted: usize,
    pub nodes_updated: usize,
    pub nodes_unchanged: usize,
    pub links_inserted: usize,
    pub links_skipped: usize,
    pub tags_inserted: usize,
    pub tags_skipped: usize,
}

impl SeedReport {
    /// True when the manifest was already fully applied.
    pub fn is_noop(&self) -> bool {
        self.users_inserted == 0
            && self.nodes_inserted == 0
            && self.nodes_updated == 0
            && self.links_inserted == 0
            && self.tags_inserted == 0
    }
}

// =============================================================================
// SEEDER
// =============================================================================

pub struct Seeder<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> Seeder<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    pub fn apply(&self, manifest: &SeedManifest) -> Result<SeedReport, ManhajError> {
        let mut report = SeedReport::default();
        self.apply_users(manifest, &mut report)?;
        self.apply_nodes(manifest, &mut report)?;
        self.apply_links(manifest, &mut report)?;
        self.apply_tags(manifest, &mut report)?;
        tracing::info!(?report, "seed applied");
        Ok(report)
    }

    fn apply_users(&self, manifest: &SeedManifest, report: &mut SeedReport) -> Result<(), ManhajError> {
        let directory = UserDirectory::new(self.store);
        for entry in &manifest.users {
            if directory.find_by_email(&entry.email)?.is_some() {
                report.users_skipped += 1;
                continue;
            }
            directory.create(NewUser {
                name: entry.name.clone(),
                email: entry.email.clone(),
                password: entry.password.clone(),
                role: entry.role,
            })?;
            report.users_inserted += 1;
        }
        Ok(())
    }

    fn author_id(&self, email: Option<&str>) -> Result<Option<UserId>, ManhajError> {
        let Some(email) = email else {
            return Ok(None);
        };
        let user = UserDirectory::new(self.store)
            .find_by_email(email)?
            .ok_or_else(|| ManhajError::invalid(format!("seed author '{email}' is not a user")))?;
        Ok(Some(user.id))
    }

    fn apply_nodes(&self, manifest: &SeedManifest, report: &mut SeedReport) -> Result<(), ManhajError> {
        for entry in &manifest.nodes {
            validation::node_id(entry.id.as_str())?;
            let title = validation::title(&entry.title)?;
            let description = validation::description(entry.description.as_deref())?;

            let Some(existing) = self.store.node(&entry.id)? else {
                let mut node = Node::new(entry.id.clone(), entry.kind, title, entry.status);
                node.description = description;
                if let Some(content) = &entry.content {
                    validation::content(content)?;
                    node.content = Some(content.clone());
                }
                node.author_id = self.author_id(entry.author.as_deref())?;
                self.store.insert_node(&node, entry.parent.as_ref())?;
                report.nodes_inserted += 1;
                if entry.parent.is_some() {
                    report.links_inserted += 1;
                }
                continue;
            };

            if existing.kind != entry.kind {
                return Err(ManhajError::Conflict(format!(
                    "seed node '{}' is a {} but already exists as a {}",
                    entry.id, entry.kind, existing.kind
                )));
            }
            if existing.title == title && existing.description == description {
                report.nodes_unchanged += 1;
            } else {
                // Status, content and author belong to the live site now.
                self.store.modify_node(&entry.id, &mut |node| {
                    node.title.clone_from(&title);
                    node.description.clone_from(&description);
                    node.touch();
                    Ok(())
                })?;
                report.nodes_updated += 1;
            }
            if let Some(parent) = &entry.parent {
                self.link(parent, &entry.id, report)?;
            }
        }
        Ok(())
    }

    fn link(&self, parent: &NodeId, child: &NodeId, report: &mut SeedReport) -> Result<(), ManhajError> {
        let link = TaxonomyLink::new(parent.clone(), child.clone());
        if self.store.insert_link(&link)? {
            report.links_inserted += 1;
        } else {
            report.links_skipped += 1;
        }
        Ok(())
    }

    fn apply_links(&self, manifest: &SeedManifest, report: &mut SeedReport) -> Result<(), ManhajError> {
        for entry in &manifest.links {
            self.link(&entry.parent, &entry.child, report)?;
        }
        Ok(())
    }

    fn apply_tags(&self, manifest: &SeedManifest, report: &mut SeedReport) -> Result<(), ManhajError> {
        for entry in &manifest.tags {
            let (country, grade, subject) =
                validation::curriculum(&entry.country, entry.grade, &entry.subject)?;
            let tag = CurriculumTag::new(entry.node.clone(), country, grade, subject);
            if self.store.insert_tag(&tag)? {
                report.tags_inserted += 1;
            } else {
                report.tags_skipped += 1;
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manifest() -> SeedManifest {
        SeedManifest {
            users: vec![SeedUser {
                name: "المدير".into(),
                email: "admin@manhaj.local".into(),
                password: "admin123".into(),
                role: Role::Admin,
            }],
            nodes: vec![
                SeedNode {
                    id: NodeId::new("topic-math"),
                    kind: NodeKind::Topic,
                    title: "الرياضيات".into(),
                    description: Some("مدخل إلى الرياضيات".into()),
                    content: None,
                    status: Status::Published,
                    author: Some("admin@manhaj.local".into()),
                    parent: None,
                },
                SeedNode {
                    id: NodeId::new("topic-algebra"),
                    kind: NodeKind::Topic,
                    title: "الجبر".into(),
                    description: None,
                    content: None,
                    status: Status::Published,
                    author: None,
                    parent: Some(NodeId::new("topic-math")),
                },
            ],
            links: vec![SeedLink {
                parent: NodeId::new("topic-math"),
                child: NodeId::new("topic-algebra"),
            }],
            tags: vec![SeedTag {
                node: NodeId::new("topic-algebra"),
                country: "SA".into(),
                grade: 4,
                subject: "Math".into(),
            }],
        }
    }

    #[test]
    fn first_apply_inserts_everything() {
        let store = MemoryStore::new();
        let report = Seeder::new(&store).apply(&manifest()).expect("seed");
        assert_eq!(report.users_inserted, 1);
        assert_eq!(report.nodes_inserted, 2);
        // The explicit link duplicates the node's `parent`.
        assert_eq!((report.links_inserted, report.links_skipped), (1, 1));
        assert_eq!(report.tags_inserted, 1);

        let counts = store.counts().expect("counts");
        assert_eq!((counts.users, counts.nodes, counts.links, counts.tags), (1, 2, 1, 1));
    }

    #[test]
    fn second_apply_is_a_noop() {
        let store = MemoryStore::new();
        let seeder = Seeder::new(&store);
        seeder.apply(&manifest()).expect("seed");
        let before = store.node(&NodeId::new("topic-math")).expect("lookup");

        let report = seeder.apply(&manifest()).expect("reseed");
        assert!(report.is_noop());
        assert_eq!(report.nodes_unchanged, 2);
        assert_eq!(store.node(&NodeId::new("topic-math")).expect("lookup"), before);
    }

    #[test]
    fn reseed_refreshes_title_but_keeps_workflow_state() {
        let store = MemoryStore::new();
        let seeder = Seeder::new(&store);
        seeder.apply(&manifest()).expect("seed");
        store
            .modify_node(&NodeId::new("topic-math"), &mut |n| {
                n.status = Status::Draft;
                n.touch();
                Ok(())
            })
            .expect("demote");

        let mut changed = manifest();
        changed.nodes[0].title = "رياضيات".into();
        let report = seeder.apply(&changed).expect("reseed");
        assert_eq!(report.nodes_updated, 1);

        let node = store
            .node(&NodeId::new("topic-math"))
            .expect("lookup")
            .expect("node");
        assert_eq!(node.title, "رياضيات");
        assert_eq!(node.status, Status::Draft);
        assert!(node.author_id.is_some());
    }

    #[test]
    fn kind_mismatch_conflicts() {
        let store = MemoryStore::new();
        let seeder = Seeder::new(&store);
        seeder.apply(&manifest()).expect("seed");

        let mut changed = manifest();
        changed.nodes[1].kind = NodeKind::Article;
        assert!(matches!(
            seeder.apply(&changed),
            Err(ManhajError::Conflict(_))
        ));
    }

    #[test]
    fn unknown_author_is_rejected() {
        let store = MemoryStore::new();
        let mut bad = manifest();
        bad.nodes[0].author = Some("nobody@manhaj.local".into());
        assert!(matches!(
            Seeder::new(&store).apply(&bad),
            Err(ManhajError::Validation(_))
        ));
    }

    #[test]
    fn existing_users_are_left_alone() {
        let store = MemoryStore::new();
        let seeder = Seeder::new(&store);
        seeder.apply(&manifest()).expect("seed");

        let mut changed = manifest();
        changed.users[0].password = "changed!".into();
        let report = seeder.apply(&changed).expect("reseed");
        assert_eq!(report.users_skipped, 1);

        let admin = UserDirectory::new(&store)
            .verify("admin@manhaj.local", "admin123")
            .expect("verify");
        assert!(admin.is_some());
    }
}
