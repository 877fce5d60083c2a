use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    auth::User,
    comments::{Comment, NewComment},
    follows::{Follow, FollowSearch, NewFollow},
    groups::{Group, NewGroup},
    pagination::{Listed, Window},
    posts::{NewPost, Post, PostChanges},
};

pub mod memory;
pub mod postgres;

pub type DynStore = Arc<dyn Store>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Names the table whose unique constraint rejected the write.
    #[error("Unique constraint violated on {0}")]
    UniqueViolation(String),

    #[error("Missing referenced row in {0}")]
    MissingReference(String),

    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for every entity the API exposes.
///
/// Implementations own the integrity rules the database would enforce:
/// unique usernames, group slugs and (user, following) pairs, no self-follow,
/// and comments removed together with their post. Listings are ordered by
/// ascending id.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User>;

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group>;

    async fn list_groups(&self) -> StoreResult<Vec<Group>>;

    async fn find_group(&self, id: i64) -> StoreResult<Option<Group>>;

    async fn list_posts(&self, window: Option<Window>) -> StoreResult<Listed<Post>>;

    async fn find_post(&self, id: i64) -> StoreResult<Option<Post>>;

    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;

    /// Returns `None` when the post no longer exists.
    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>>;

    /// Returns whether a row was removed.
    async fn delete_post(&self, id: i64) -> StoreResult<bool>;

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>>;

    /// Only finds the comment if it belongs to `post_id`.
    async fn find_comment(&self, post_id: i64, id: i64) -> StoreResult<Option<Comment>>;

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn update_comment(&self, id: i64, text: String) -> StoreResult<Option<Comment>>;

    async fn delete_comment(&self, id: i64) -> StoreResult<bool>;

    /// Outgoing follows of `user_id`.
    async fn list_follows(
        &self,
        user_id: i64,
        search: Option<&FollowSearch>,
        window: Option<Window>,
    ) -> StoreResult<Listed<Follow>>;

    async fn follow_exists(&self, user_id: i64, following_id: i64) -> StoreResult<bool>;

    /// Fails with [`StoreError::UniqueViolation`] if the pair already exists.
    async fn create_follow(&self, follow: NewFollow) -> StoreResult<Follow>;
}
