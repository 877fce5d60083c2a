use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{auth::AuthUser, permissions::Owned, posts::not_blank};

pub mod handler;

/// A comment joined with its author's username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub created: chrono::DateTime<chrono::Utc>,
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

/// Body of `POST` and `PUT`. A client-supplied `post` or `author` never
/// reaches the store; both come from the request context.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentPayload {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

impl CommentPayload {
    pub fn into_new_comment(self, post_id: i64, author: &AuthUser) -> NewComment {
        NewComment {
            post_id,
            author_id: author.id,
            text: self.text,
        }
    }
}

/// Body of `PATCH`.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentPatch {
    #[validate(custom(function = "not_blank"))]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post: i64,
    pub author: String,
    pub text: String,
    pub created: chrono::DateTime<chrono::Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        CommentResponse {
            id: c.id,
            post: c.post_id,
            author: c.author,
            text: c.text,
            created: c.created,
        }
    }
}
