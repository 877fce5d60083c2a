use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

pub mod handler;
pub mod jwt;
pub mod utils;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: chrono::DateTime<chrono::Utc>,
}

/// The identity a request acts as once its bearer token has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            id: user.id,
            username: user.username,
        }
    }
}

/// Who is making the request. Requests without an `Authorization` header are
/// anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(AuthUser),
}

impl Actor {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Actor::User(user) => Some(user),
            Actor::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn require(&self) -> Result<&AuthUser, AppError> {
        self.user().ok_or_else(AppError::unauthenticated)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(
        min = 3,
        max = 150,
        message = "Username must be between 3 and 150 characters"
    ))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ObtainToken {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshToken {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyToken {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}
