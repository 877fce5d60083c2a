use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    auth::Actor,
    comments::{Comment, CommentPatch, CommentPayload, CommentResponse},
    error::{validation_message, AppError},
    extract::Path,
    permissions::{self, Access},
    posts::handler::load_post,
    response::ApiResponse,
    store::{DynStore, Store},
};

const ACCESS: Access = Access::AuthenticatedOrReadOnly;

/// Get all comments of a post
/// GET /v1/posts/:post_id/comments/
pub async fn list_comments(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let post = load_post(store.as_ref(), post_id).await?;

    let comments: Vec<CommentResponse> = store
        .list_comments(post.id)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();

    Ok(ApiResponse::success(comments))
}

/// Comment on a post
/// POST /v1/posts/:post_id/comments/
pub async fn create_comment(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path(post_id): Path<i64>,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let author = actor.require()?;
    let post = load_post(store.as_ref(), post_id).await?;

    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

    let comment = store
        .create_comment(payload.into_new_comment(post.id, author))
        .await?;

    tracing::info!(
        comment_id = comment.id,
        post_id = comment.post_id,
        author = %comment.author,
        "comment created"
    );

    Ok(ApiResponse::success(CommentResponse::from(comment)).created())
}

/// GET /v1/posts/:post_id/comments/:id/
pub async fn get_comment(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path((post_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let comment = load_scoped(store.as_ref(), post_id, id).await?;
    permissions::authorize_object(&method, &actor, &comment)?;

    Ok(ApiResponse::success(CommentResponse::from(comment)))
}

/// PUT /v1/posts/:post_id/comments/:id/
pub async fn replace_comment(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path((post_id, id)): Path<(i64, i64)>,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let comment = load_scoped(store.as_ref(), post_id, id).await?;
    permissions::authorize_object(&method, &actor, &comment)?;

    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

    save_text(store.as_ref(), comment, Some(payload.text)).await
}

/// PATCH /v1/posts/:post_id/comments/:id/
pub async fn patch_comment(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path((post_id, id)): Path<(i64, i64)>,
    payload: Result<Json<CommentPatch>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let comment = load_scoped(store.as_ref(), post_id, id).await?;
    permissions::authorize_object(&method, &actor, &comment)?;

    let Json(patch) = payload?;
    patch
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

    save_text(store.as_ref(), comment, patch.text).await
}

/// DELETE /v1/posts/:post_id/comments/:id/
pub async fn delete_comment(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path((post_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let comment = load_scoped(store.as_ref(), post_id, id).await?;
    permissions::authorize_object(&method, &actor, &comment)?;

    if !store.delete_comment(comment.id).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    tracing::info!(comment_id = comment.id, post_id, "comment deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// The parent post must exist, and the comment must belong to it.
async fn load_scoped(store: &dyn Store, post_id: i64, id: i64) -> Result<Comment, AppError> {
    let post = load_post(store, post_id).await?;
    store
        .find_comment(post.id, id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

async fn save_text(
    store: &dyn Store,
    comment: Comment,
    text: Option<String>,
) -> Result<ApiResponse<CommentResponse>, AppError> {
    let Some(text) = text else {
        return Ok(ApiResponse::success(CommentResponse::from(comment)));
    };

    let updated = store
        .update_comment(comment.id, text)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    tracing::info!(comment_id = updated.id, "comment updated");

    Ok(ApiResponse::success(CommentResponse::from(updated)))
}
