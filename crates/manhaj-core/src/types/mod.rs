//! # Core Type Definitions
//!
//! This module contains all core types for the Manhaj content graph:
//! - Identifiers (`NodeId`, `UserId`)
//! - Content nodes and their closed vocabularies (`Node`, `NodeKind`, `Status`)
//! - Graph annotations (`TaxonomyLink`, `CurriculumTag`)
//! - Identities (`User`, `Role`, `Actor`, `Credential`)
//! - Error types (`ManhajError`, `ErrorKind`)
//!
//! ## Ordering Guarantees
//!
//! Identifiers implement `Ord` so every listing produced by the engine can be
//! sorted deterministically through `BTreeMap`/`BTreeSet`.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identifier of a content node.
///
/// Seeded nodes carry fixed human-readable ids (`topic-algebra`); nodes created
/// at runtime get `<prefix>-<uuid>` ids from [`NodeId::generate`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id for a node of the given kind.
    #[must_use]
    pub fn generate(kind: NodeKind) -> Self {
        Self(format!("{}-{}", kind.id_prefix(), Uuid::new_v4().simple()))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random user id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLOSED VOCABULARIES
// =============================================================================

/// The type of a content node. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Topic,
    Article,
    Video,
    Applet,
    Exercise,
}

impl NodeKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Topic,
        Self::Article,
        Self::Video,
        Self::Applet,
        Self::Exercise,
    ];

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Article => "article",
            Self::Video => "video",
            Self::Applet => "applet",
            Self::Exercise => "exercise",
        }
    }

    /// Prefix used for generated node ids.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Article => "art",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ManhajError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ManhajError::Validation(format!("unknown node type '{}'", s)))
    }
}

/// Workflow status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Pending,
    Published,
}

impl Status {
    /// All statuses in workflow order.
    pub const ALL: [Self; 3] = [Self::Draft, Self::Pending, Self::Published];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ManhajError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ManhajError::Validation(format!("unknown status '{}'", s)))
    }
}

/// Role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Contributor,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Contributor => "contributor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ManhajError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "contributor" => Ok(Self::Contributor),
            other => Err(ManhajError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A unit of content in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub title: String,
    pub description: Option<String>,
    /// Opaque serialized document. Stored and returned verbatim.
    pub content: Option<String>,
    pub status: Status,
    pub author_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by every mutation; used for optimistic concurrency.
    pub version: u64,
}

impl Node {
    /// Create a node with fresh timestamps at version 1.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind, title: impl Into<String>, status: Status) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            title: title.into(),
            description: None,
            content: None,
            status,
            author_id: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Builder: set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set the opaque content blob.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Builder: set the author.
    #[must_use]
    pub fn with_author(mut self, author: UserId) -> Self {
        self.author_id = Some(author);
        self
    }

    /// Whether the given user authored this node.
    #[must_use]
    pub fn is_authored_by(&self, user: &UserId) -> bool {
        self.author_id.as_ref() == Some(user)
    }

    /// Record a mutation: bump the version and the update timestamp.
    pub fn touch(&mut self) {
        self.version = self.version.saturating_add(1);
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// GRAPH ANNOTATIONS
// =============================================================================

/// A directed parent → child edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxonomyLink {
    pub parent_id: NodeId,
    pub child_id: NodeId,
}

impl TaxonomyLink {
    #[must_use]
    pub fn new(parent_id: NodeId, child_id: NodeId) -> Self {
        Self {
            parent_id,
            child_id,
        }
    }
}

/// Binding of a node to a curriculum slot.
///
/// Field order gives the sort order used by every tag listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurriculumTag {
    pub node_id: NodeId,
    /// `ALL` or an ISO 3166-1 alpha-2 code such as `SA`.
    pub country: String,
    pub grade: u8,
    pub subject: String,
}

impl CurriculumTag {
    #[must_use]
    pub fn new(
        node_id: NodeId,
        country: impl Into<String>,
        grade: u8,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            node_id,
            country: country.into(),
            grade,
            subject: subject.into(),
        }
    }
}

// =============================================================================
// IDENTITIES
// =============================================================================

/// Argon2id hash of a user's password, kept as a PHC string
/// (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    phc: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

impl Credential {
    /// Hash a plaintext password with a fresh 16-byte random salt.
    pub fn derive(password: &str) -> Result<Self, ManhajError> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| ManhajError::Credential(e.to_string()))?;
        let phc = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ManhajError::Credential(e.to_string()))?
            .to_string();
        Ok(Self { phc })
    }

    /// Check a plaintext password. A stored hash that does not parse never
    /// verifies.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        PasswordHash::new(&self.phc).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
    }
}

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Normalized (trimmed, lowercase) email. Unique.
    pub email: String,
    pub role: Role,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
}

/// The resolved identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.id.clone(), user.role)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Category of a [`ManhajError`], used at the boundary to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Internal,
}

/// Errors that can occur in the Manhaj engine.
///
/// - No silent failures
/// - Use `Result<T, ManhajError>` for fallible operations
/// - The engine never panics; storage faults surface as `Storage`
#[derive(Debug, Error)]
pub enum ManhajError {
    /// Missing or malformed input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested node does not exist.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The requested user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The requested taxonomy link does not exist.
    #[error("Link not found: {0} -> {1}")]
    LinkNotFound(NodeId, NodeId),

    /// Role or ownership violation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate unique key.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The link would close a cycle in the taxonomy.
    #[error("Linking {parent} -> {child} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    /// Optimistic concurrency check failed.
    #[error("Version conflict for node {node_id}: expected {expected}, found {actual}")]
    VersionConflict {
        node_id: NodeId,
        expected: u64,
        actual: u64,
    },

    /// The underlying store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Password hashing failed.
    #[error("Credential error: {0}")]
    Credential(String),
}

impl ManhajError {
    /// Map onto the boundary error taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NodeNotFound(_) | Self::UserNotFound(_) | Self::LinkNotFound(..) => {
                ErrorKind::NotFound
            }
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) | Self::CycleDetected { .. } | Self::VersionConflict { .. } => {
                ErrorKind::Conflict
            }
            Self::Storage(_) | Self::Serialization(_) | Self::Credential(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Shorthand for a forbidden error.
    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    /// Shorthand for a validation error.
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================
