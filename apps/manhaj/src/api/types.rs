//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Closed vocabularies (`type`, `status`, `role`) arrive as plain strings and
//! are parsed here, so an unknown value becomes a localized 400 instead of a
//! bare deserialization rejection.

use manhaj_core::{
    CatalogMetrics, ContentEdit, CurriculumTag, ManhajError, NewUser, Node, NodeDraft, NodeId,
    NodeKind, Role, Status, StatusCounts, TagQuery, User, UserId, UserSummary,
};
use serde::{Deserialize, Serialize};

fn parse_opt<T: std::str::FromStr<Err = ManhajError>>(
    raw: Option<&str>,
) -> Result<Option<T>, ManhajError> {
    raw.map(str::parse).transpose()
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Catalog counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub nodes: usize,
    pub links: usize,
    pub tags: usize,
    pub users: usize,
    pub draft: usize,
    pub pending: usize,
    pub published: usize,
    pub persistent: bool,
}

impl From<CatalogMetrics> for StatusResponse {
    fn from(m: CatalogMetrics) -> Self {
        Self {
            success: true,
            nodes: m.nodes,
            links: m.links,
            tags: m.tags,
            users: m.users,
            draft: m.by_status.draft,
            pending: m.by_status.pending,
            published: m.by_status.published,
            persistent: m.persistent,
        }
    }
}

// =============================================================================
// NODES
// =============================================================================

/// Wire form of a node. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeJson {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
    pub status: String,
    pub author_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub version: u64,
}

impl From<Node> for NodeJson {
    fn from(node: Node) -> Self {
        Self {
            id: node.id.0,
            kind: node.kind.to_string(),
            title: node.title,
            description: node.description,
            content: node.content,
            status: node.status.to_string(),
            author_id: node.author_id.map(|a| a.0),
            created_at: node.created_at.to_rfc3339(),
            updated_at: node.updated_at.to_rfc3339(),
            version: node.version,
        }
    }
}

fn node_list(nodes: Vec<Node>) -> Vec<NodeJson> {
    nodes.into_iter().map(NodeJson::from).collect()
}

/// A single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResponse {
    pub success: bool,
    pub node: NodeJson,
}

impl NodeResponse {
    pub fn new(node: Node) -> Self {
        Self {
            success: true,
            node: node.into(),
        }
    }
}

/// A list of nodes in engine order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeListResponse {
    pub success: bool,
    pub nodes: Vec<NodeJson>,
}

impl NodeListResponse {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            success: true,
            nodes: node_list(nodes),
        }
    }
}

/// Per-status counts of the caller's content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryJson {
    pub draft: usize,
    pub pending: usize,
    pub published: usize,
    pub total: usize,
}

impl From<StatusCounts> for SummaryJson {
    fn from(c: StatusCounts) -> Self {
        Self {
            draft: c.draft,
            pending: c.pending,
            published: c.published,
            total: c.total(),
        }
    }
}

/// `GET /me/nodes`: the caller's dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyNodesResponse {
    pub success: bool,
    pub summary: SummaryJson,
    pub nodes: Vec<NodeJson>,
}

impl MyNodesResponse {
    pub fn new(nodes: Vec<Node>, summary: StatusCounts) -> Self {
        Self {
            success: true,
            summary: summary.into(),
            nodes: node_list(nodes),
        }
    }
}

/// `POST /topics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTopicRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// `POST /articles`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    pub parent_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateArticleRequest {
    pub fn status(&self) -> Result<Option<Status>, ManhajError> {
        parse_opt(self.status.as_deref())
    }
}

/// `POST /nodes`: any kind of node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Caller-chosen id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
}

impl CreateNodeRequest {
    /// Parse the closed vocabularies and build the engine draft.
    pub fn into_draft(self) -> Result<NodeDraft, ManhajError> {
        let kind: NodeKind = self.kind.parse()?;
        let status = parse_opt::<Status>(self.status.as_deref())?;

        let mut draft = NodeDraft::new(kind, self.title);
        draft.description = self.description;
        draft.content = self.content;
        draft.parent_id = self.parent_id.map(NodeId::new);
        draft.status = status;
        draft.id = self.id.map(NodeId::new);
        Ok(draft)
    }
}

/// `PATCH /nodes/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditNodeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub version: Option<u64>,
}

impl EditNodeRequest {
    pub fn split(self) -> (ContentEdit, Option<u64>) {
        let edit = ContentEdit {
            title: self.title,
            description: self.description,
            content: self.content,
        };
        (edit, self.version)
    }
}

/// `PATCH /nodes/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    #[serde(default)]
    pub version: Option<u64>,
}

impl StatusChangeRequest {
    pub fn target(&self) -> Result<Status, ManhajError> {
        self.status.parse()
    }
}

/// `GET /nodes?type=&author=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeListQuery {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl NodeListQuery {
    pub fn kind(&self) -> Result<Option<NodeKind>, ManhajError> {
        parse_opt(self.kind.as_deref())
    }

    pub fn author(&self) -> Option<UserId> {
        self.author.as_deref().map(UserId::new)
    }
}

/// Acknowledges a deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub id: String,
}

impl DeletedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: id.into(),
        }
    }
}

// =============================================================================
// LINKS
// =============================================================================

/// `POST /links`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRequest {
    pub parent_id: String,
    pub child_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResponse {
    pub success: bool,
    pub parent_id: String,
    pub child_id: String,
}

impl LinkResponse {
    pub fn new(parent: &NodeId, child: &NodeId) -> Self {
        Self {
            success: true,
            parent_id: parent.to_string(),
            child_id: child.to_string(),
        }
    }
}

// =============================================================================
// TAGS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagJson {
    pub node_id: String,
    pub country: String,
    pub grade: u8,
    pub subject: String,
}

impl From<CurriculumTag> for TagJson {
    fn from(tag: CurriculumTag) -> Self {
        Self {
            node_id: tag.node_id.0,
            country: tag.country,
            grade: tag.grade,
            subject: tag.subject,
        }
    }
}

/// `POST /nodes/{id}/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRequest {
    pub country: String,
    pub grade: u8,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResponse {
    pub success: bool,
    pub tag: TagJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagListResponse {
    pub success: bool,
    pub tags: Vec<TagJson>,
}

impl TagListResponse {
    pub fn new(tags: Vec<CurriculumTag>) -> Self {
        Self {
            success: true,
            tags: tags.into_iter().map(TagJson::from).collect(),
        }
    }
}

/// `DELETE /nodes/{id}/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsClearedResponse {
    pub success: bool,
    pub removed: usize,
}

/// `GET /tags?country=&grade=&subject=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagLookupQuery {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub grade: Option<u8>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl From<TagLookupQuery> for TagQuery {
    fn from(q: TagLookupQuery) -> Self {
        Self {
            country: q.country,
            grade: q.grade,
            subject: q.subject,
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Public fields of a user. Credentials never leave the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserJson {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_count: Option<usize>,
}

impl From<User> for UserJson {
    fn from(user: User) -> Self {
        Self {
            id: user.id.0,
            name: user.name,
            email: user.email,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
            node_count: None,
        }
    }
}

impl From<UserSummary> for UserJson {
    fn from(summary: UserSummary) -> Self {
        Self {
            id: summary.id.0,
            name: summary.name,
            email: summary.email,
            role: summary.role.to_string(),
            created_at: summary.created_at.to_rfc3339(),
            node_count: Some(summary.node_count),
        }
    }
}

/// `POST /users`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `admin` or `contributor` (default).
    #[serde(default)]
    pub role: Option<String>,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser, ManhajError> {
        let role = parse_opt::<Role>(self.role.as_deref())?.unwrap_or(Role::Contributor);
        Ok(NewUser {
            name: self.name,
            email: self.email,
            password: self.password,
            role,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserJson>,
}
