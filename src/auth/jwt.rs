use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{Actor, AuthUser},
    config::settings::Settings,
    error::AppError,
    store::DynStore,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub token_type: TokenType,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn create_token(user_id: i64, token_type: TokenType, settings: &Settings) -> Result<String> {
    let now = Utc::now();
    let ttl = match token_type {
        TokenType::Access => settings.access_token_ttl,
        TokenType::Refresh => settings.refresh_token_ttl,
    };
    let claims = Claims {
        sub: user_id,
        token_type,
        jti: Uuid::new_v4().simple().to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_ref()),
    )?)
}

/// Checks signature and expiry. The token type is left to the caller.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    Settings: FromRef<S>,
    DynStore: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Actor::Anonymous);
        }

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::invalid_token())?;

        let settings = Settings::from_ref(state);
        let claims =
            decode_token(bearer.token(), &settings.jwt_secret).map_err(|_| AppError::invalid_token())?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::invalid_token());
        }

        let store = DynStore::from_ref(state);
        let user = store
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        Ok(Actor::User(AuthUser::from(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::SearchMode;

    fn settings() -> Settings {
        Settings {
            port: 0,
            addr: ([127, 0, 0, 1], 0).into(),
            database_url: "memory://".to_string(),
            database_max_connections: 1,
            jwt_secret: "unit-test-secret".to_string(),
            access_token_ttl: chrono::Duration::minutes(5),
            refresh_token_ttl: chrono::Duration::days(1),
            follow_search_mode: SearchMode::Contains,
        }
    }

    #[test]
    fn token_carries_subject_and_type() {
        let settings = settings();
        let token = create_token(42, TokenType::Refresh, &settings).unwrap();
        let claims = decode_token(&token, &settings.jwt_secret).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let settings = settings();
        let token = create_token(1, TokenType::Access, &settings).unwrap();
        assert!(decode_token(&token, "another-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut settings = settings();
        settings.access_token_ttl = chrono::Duration::hours(-2);
        let token = create_token(1, TokenType::Access, &settings).unwrap();
        assert!(decode_token(&token, &settings.jwt_secret).is_err());
    }
}
