use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, Uri},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    auth::Actor,
    config::settings::Settings,
    error::{validation_message, AppError},
    extract::Query,
    follows::{
        validate::{validate_follow, ALREADY_FOLLOWING},
        FollowFilter, FollowPayload, FollowResponse,
    },
    pagination::Listing,
    permissions::{self, Access},
    response::ApiResponse,
    store::{DynStore, StoreError},
};

const ACCESS: Access = Access::Authenticated;

/// List the acting user's own follows
/// GET /v1/follow/?search=&limit=&offset=
pub async fn list_follows(
    State(store): State<DynStore>,
    State(settings): State<Settings>,
    method: Method,
    actor: Actor,
    uri: Uri,
    Query(filter): Query<FollowFilter>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let user = actor.require()?;

    let window = filter.window();
    let search = filter.search(settings.follow_search_mode);

    let follows = store
        .list_follows(user.id, search.as_ref(), window)
        .await?
        .map(FollowResponse::from);

    let extra: Vec<(&str, &str)> = search
        .as_ref()
        .map(|s| ("search", s.term.as_str()))
        .into_iter()
        .collect();

    Ok(ApiResponse::success(Listing::build(
        follows,
        window,
        uri.path(),
        &extra,
    )))
}

/// Follow a user by username
/// POST /v1/follow/
pub async fn create_follow(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    payload: Result<Json<FollowPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;
    let user = actor.require()?;

    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

    let new_follow = validate_follow(store.as_ref(), user, payload).await?;

    let follow = store
        .create_follow(new_follow)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => AppError::Conflict(ALREADY_FOLLOWING.to_string()),
            other => other.into(),
        })?;

    tracing::info!(
        user = %follow.user,
        following = %follow.following,
        "follow created"
    );

    Ok(ApiResponse::success(FollowResponse::from(follow)).created())
}
