use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    auth::{
        jwt::{self, TokenType},
        utils, AccessToken, ObtainToken, RefreshToken, RegisterUser, TokenPair, UserResponse,
        VerifyToken,
    },
    config::settings::Settings,
    error::{validation_message, AppError},
    response::ApiResponse,
    store::{DynStore, StoreError},
};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

/// POST /v1/users/
pub async fn signup(
    State(store): State<DynStore>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

    let password_hash =
        utils::hash_password(&payload.password).map_err(|_| AppError::InternalServerError)?;

    let user = store
        .create_user(&payload.username, &password_hash)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                AppError::Conflict("A user with that username already exists.".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    Ok(ApiResponse::success(UserResponse::from(user)).created())
}

/// POST /v1/jwt/create/
pub async fn obtain_token(
    State(store): State<DynStore>,
    State(settings): State<Settings>,
    payload: Result<Json<ObtainToken>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let user = store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    utils::verify_password(&user.password_hash, &payload.password)
        .map_err(|_| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    let refresh = jwt::create_token(user.id, TokenType::Refresh, &settings)
        .map_err(|_| AppError::InternalServerError)?;
    let access = jwt::create_token(user.id, TokenType::Access, &settings)
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(TokenPair { refresh, access }))
}

/// POST /v1/jwt/refresh/
pub async fn refresh_token(
    State(settings): State<Settings>,
    payload: Result<Json<RefreshToken>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let claims = jwt::decode_token(&payload.refresh, &settings.jwt_secret)
        .map_err(|_| AppError::invalid_token())?;
    if claims.token_type != TokenType::Refresh {
        return Err(AppError::invalid_token());
    }

    let access = jwt::create_token(claims.sub, TokenType::Access, &settings)
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(AccessToken { access }))
}

/// POST /v1/jwt/verify/
pub async fn verify_token(
    State(settings): State<Settings>,
    payload: Result<Json<VerifyToken>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    jwt::decode_token(&payload.token, &settings.jwt_secret)
        .map_err(|_| AppError::invalid_token())?;

    Ok(ApiResponse::success(serde_json::json!({})))
}
