use axum::{extract::State, http::Method, response::IntoResponse};

use crate::{
    auth::Actor,
    error::AppError,
    extract::Path,
    permissions::{self, Access},
    response::ApiResponse,
    store::DynStore,
};

const ACCESS: Access = Access::AllowAny;

/// GET /v1/groups/
pub async fn list_groups(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;

    let groups = store.list_groups().await?;

    Ok(ApiResponse::success(groups))
}

/// GET /v1/groups/:id/
pub async fn get_group(
    State(store): State<DynStore>,
    method: Method,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    permissions::authorize(ACCESS, &method, &actor)?;

    let group = store
        .find_group(id)
        .await?
        .ok_or(AppError::NotFound("Group not found".to_string()))?;

    Ok(ApiResponse::success(group))
}
