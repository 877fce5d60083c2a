use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    auth::Actor,
    error::{validation_message, AppError},
    extract::{Path, Query},
    pagination::{ListParams, Listing},
    permissions::{self, Access},
    posts::{Post, PostChanges, PostPatch, PostPayload, PostResponse},
    response::ApiResponse,
    store::{DynStore, Store},
};

const ACCESS: Access = Access::AuthenticatedOrReadOnly;

/// GET /v1/posts/?limit=&offset=
pub async fn list_posts(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    uri: Uri,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;

    let window = params.window();
    let posts = store.list_posts(window).await?.map(PostResponse::from);

    Ok(ApiResponse::success(Listing::build(
        posts,
        window,
        uri.path(),
        &[],
    )))
}

/// POST /v1/posts/
pub async fn create_post(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    payload: Result<Json<PostPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let author = actor.require()?;

    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;
    ensure_group_exists(store.as_ref(), payload.group_ref()).await?;

    let post = store.create_post(payload.into_new_post(author)).await?;

    tracing::info!(post_id = post.id, author = %post.author, "post created");

    Ok(ApiResponse::success(PostResponse::from(post)).created())
}

/// GET /v1/posts/:id/
pub async fn get_post(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;

    let post = load_post(store.as_ref(), id).await?;
    permissions::authorize_object(&method, &actor, &post)?;

    Ok(ApiResponse::success(PostResponse::from(post)))
}

/// PUT /v1/posts/:id/
pub async fn replace_post(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path(id): Path<i64>,
    payload: Result<Json<PostPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;

    let post = load_post(store.as_ref(), id).await?;
    permissions::authorize_object(&method, &actor, &post)?;

    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;
    ensure_group_exists(store.as_ref(), payload.group_ref()).await?;

    save_changes(store.as_ref(), post.id, payload.into()).await
}

/// PATCH /v1/posts/:id/
pub async fn patch_post(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path(id): Path<i64>,
    payload: Result<Json<PostPatch>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;

    let post = load_post(store.as_ref(), id).await?;
    permissions::authorize_object(&method, &actor, &post)?;

    let Json(patch) = payload?;
    patch
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;
    ensure_group_exists(store.as_ref(), patch.group_ref()).await?;

    save_changes(store.as_ref(), post.id, patch.into()).await
}

/// DELETE /v1/posts/:id/
pub async fn delete_post(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;

    let post = load_post(store.as_ref(), id).await?;
    permissions::authorize_object(&method, &actor, &post)?;

    if !store.delete_post(post.id).await? {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    tracing::info!(post_id = post.id, "post deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn load_post(store: &dyn Store, id: i64) -> Result<Post, AppError> {
    store
        .find_post(id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

async fn ensure_group_exists(store: &dyn Store, group_id: Option<i64>) -> Result<(), AppError> {
    let Some(group_id) = group_id else {
        return Ok(());
    };
    store.find_group(group_id).await?.ok_or_else(|| {
        AppError::BadRequest(format!(
            "group: Invalid pk \"{}\" - object does not exist.",
            group_id
        ))
    })?;
    Ok(())
}

async fn save_changes(
    store: &dyn Store,
    id: i64,
    changes: PostChanges,
) -> Result<ApiResponse<PostResponse>, AppError> {
    let post = store
        .update_post(id, changes)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    tracing::info!(post_id = post.id, "post updated");

    Ok(ApiResponse::success(PostResponse::from(post)))
}
