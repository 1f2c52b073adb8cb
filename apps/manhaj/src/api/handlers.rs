//! # API Endpoint Handlers
//!
//! Each handler resolves its inputs, calls one `Catalog` operation and
//! renders the result. Authorization lives in the engine; handlers only
//! supply the [`Authenticated`] actor.

use super::{
    AppState,
    auth::{Authenticated, Lang},
    error::{ApiError, Message},
    types::{
        CreateArticleRequest, CreateNodeRequest, CreateTopicRequest, CreateUserRequest,
        DeletedResponse, EditNodeRequest, HealthResponse, LinkRequest, LinkResponse,
        MyNodesResponse, NodeListQuery, NodeListResponse, NodeResponse, StatusChangeRequest,
        StatusResponse, TagJson, TagListResponse, TagLookupQuery, TagRequest, TagResponse,
        TagsClearedResponse, UserJson, UserListResponse, UserResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use manhaj_core::{NodeId, UserId};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Unwrap a JSON body, turning axum's rejection into a localized 400.
fn body<T>(lang: Lang, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| lang.message(Message::Validation, rejection.body_text()))
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Store-wide counters.
pub async fn status_handler(State(state): State<AppState>, lang: Lang) -> ApiResult<StatusResponse> {
    let metrics = state.catalog.metrics().map_err(lang.err())?;
    Ok(Json(metrics.into()))
}

// =============================================================================
// NODES
// =============================================================================

pub async fn list_topics_handler(
    State(state): State<AppState>,
    lang: Lang,
) -> ApiResult<NodeListResponse> {
    let topics = state.catalog.list_topics().map_err(lang.err())?;
    Ok(Json(NodeListResponse::new(topics)))
}

pub async fn create_topic_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    payload: Result<Json<CreateTopicRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NodeResponse>), ApiError> {
    let request = body(lang, payload)?;
    let topic = state
        .catalog
        .create_topic(
            &actor,
            &request.title,
            request.description.as_deref(),
            request.parent_id.map(NodeId::new),
        )
        .map_err(lang.err())?;
    Ok((StatusCode::CREATED, Json(NodeResponse::new(topic))))
}

pub async fn create_article_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    payload: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NodeResponse>), ApiError> {
    let request = body(lang, payload)?;
    let status = request.status().map_err(lang.err())?;
    let article = state
        .catalog
        .create_article(
            &actor,
            &request.title,
            &request.content,
            NodeId::new(request.parent_id),
            status,
        )
        .map_err(lang.err())?;
    Ok((StatusCode::CREATED, Json(NodeResponse::new(article))))
}

pub async fn create_node_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    payload: Result<Json<CreateNodeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NodeResponse>), ApiError> {
    let draft = body(lang, payload)?.into_draft().map_err(lang.err())?;
    let node = state
        .catalog
        .create_node(&actor, draft)
        .map_err(lang.err())?;
    Ok((StatusCode::CREATED, Json(NodeResponse::new(node))))
}

/// Admin content board.
pub async fn list_nodes_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Query(query): Query<NodeListQuery>,
) -> ApiResult<NodeListResponse> {
    let kind = query.kind().map_err(lang.err())?;
    let author = query.author();
    let nodes = state
        .catalog
        .list_nodes(&actor, kind, author.as_ref())
        .map_err(lang.err())?;
    Ok(Json(NodeListResponse::new(nodes)))
}

pub async fn get_node_handler(
    State(state): State<AppState>,
    lang: Lang,
    Path(id): Path<String>,
) -> ApiResult<NodeResponse> {
    let node = state
        .catalog
        .get_node(&NodeId::new(id))
        .map_err(lang.err())?;
    Ok(Json(NodeResponse::new(node)))
}

pub async fn edit_node_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<EditNodeRequest>, JsonRejection>,
) -> ApiResult<NodeResponse> {
    let (edit, version) = body(lang, payload)?.split();
    let node = state
        .catalog
        .edit_node(&actor, &NodeId::new(id), edit, version)
        .map_err(lang.err())?;
    Ok(Json(NodeResponse::new(node)))
}

pub async fn set_status_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> ApiResult<NodeResponse> {
    let request = body(lang, payload)?;
    let to = request.target().map_err(lang.err())?;
    let node = state
        .catalog
        .set_status(&actor, &NodeId::new(id), to, request.version)
        .map_err(lang.err())?;
    Ok(Json(NodeResponse::new(node)))
}

pub async fn delete_node_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    let removed = state
        .catalog
        .delete_node(&actor, &NodeId::new(id))
        .map_err(lang.err())?;
    Ok(Json(DeletedResponse::new(removed.id.0)))
}

pub async fn my_nodes_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
) -> ApiResult<MyNodesResponse> {
    let nodes = state.catalog.my_nodes(&actor).map_err(lang.err())?;
    let summary = state.catalog.author_summary(&actor).map_err(lang.err())?;
    Ok(Json(MyNodesResponse::new(nodes, summary)))
}

// =============================================================================
// TAXONOMY
// =============================================================================

pub async fn children_handler(
    State(state): State<AppState>,
    lang: Lang,
    Path(id): Path<String>,
) -> ApiResult<NodeListResponse> {
    let children = state
        .catalog
        .children(&NodeId::new(id))
        .map_err(lang.err())?;
    Ok(Json(NodeListResponse::new(children)))
}

/// Breadcrumb, root first.
pub async fn ancestors_handler(
    State(state): State<AppState>,
    lang: Lang,
    Path(id): Path<String>,
) -> ApiResult<NodeListResponse> {
    let path = state
        .catalog
        .ancestors(&NodeId::new(id))
        .map_err(lang.err())?;
    Ok(Json(NodeListResponse::new(path)))
}

pub async fn link_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    payload: Result<Json<LinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    let request = body(lang, payload)?;
    let link = state
        .catalog
        .link(
            &actor,
            &NodeId::new(request.parent_id),
            &NodeId::new(request.child_id),
        )
        .map_err(lang.err())?;
    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::new(&link.parent_id, &link.child_id)),
    ))
}

pub async fn unlink_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Path((parent, child)): Path<(String, String)>,
) -> ApiResult<LinkResponse> {
    let (parent, child) = (NodeId::new(parent), NodeId::new(child));
    state
        .catalog
        .unlink(&actor, &parent, &child)
        .map_err(lang.err())?;
    Ok(Json(LinkResponse::new(&parent, &child)))
}

// =============================================================================
// CURRICULUM TAGS
// =============================================================================

pub async fn node_tags_handler(
    State(state): State<AppState>,
    lang: Lang,
    Path(id): Path<String>,
) -> ApiResult<TagListResponse> {
    let tags = state
        .catalog
        .tags_for(&NodeId::new(id))
        .map_err(lang.err())?;
    Ok(Json(TagListResponse::new(tags)))
}

pub async fn add_tag_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let request = body(lang, payload)?;
    let tag = state
        .catalog
        .add_tag(
            &actor,
            &NodeId::new(id),
            &request.country,
            request.grade,
            &request.subject,
        )
        .map_err(lang.err())?;
    Ok((
        StatusCode::CREATED,
        Json(TagResponse {
            success: true,
            tag: TagJson::from(tag),
        }),
    ))
}

pub async fn clear_tags_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> ApiResult<TagsClearedResponse> {
    let removed = state
        .catalog
        .clear_tags(&actor, &NodeId::new(id))
        .map_err(lang.err())?;
    Ok(Json(TagsClearedResponse {
        success: true,
        removed,
    }))
}

/// Nodes matching a curriculum filter. `ALL`-country tags match any country.
pub async fn tag_lookup_handler(
    State(state): State<AppState>,
    lang: Lang,
    Query(query): Query<TagLookupQuery>,
) -> ApiResult<NodeListResponse> {
    let nodes = state
        .catalog
        .nodes_tagged(&query.into())
        .map_err(lang.err())?;
    Ok(Json(NodeListResponse::new(nodes)))
}

// =============================================================================
// USERS
// =============================================================================

pub async fn list_users_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
) -> ApiResult<UserListResponse> {
    let users = state.catalog.list_users(&actor).map_err(lang.err())?;
    Ok(Json(UserListResponse {
        success: true,
        users: users.into_iter().map(UserJson::from).collect(),
    }))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let new_user = body(lang, payload)?
        .into_new_user()
        .map_err(lang.err())?;
    let user = state
        .catalog
        .create_user(&actor, new_user)
        .map_err(lang.err())?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user: user.into(),
        }),
    ))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    lang: Lang,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    let removed = state
        .catalog
        .delete_user(&actor, &UserId::new(id))
        .map_err(lang.err())?;
    Ok(Json(DeletedResponse::new(removed.id.0)))
}
