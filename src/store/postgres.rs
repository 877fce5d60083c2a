use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::User,
    comments::{Comment, NewComment},
    follows::{Follow, FollowSearch, NewFollow},
    groups::{Group, NewGroup},
    pagination::{Listed, Window},
    posts::{NewPost, Post, PostChanges},
    store::{Store, StoreError, StoreResult},
};

const POST_COLUMNS: &str = r#"
    p.id, p.author_id, u.username AS author, p.text, p.pub_date, p.image, p.group_id
"#;

const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.author_id, u.username AS author, c.text, c.created
"#;

const FOLLOW_COLUMNS: &str = r#"
    f.id, f.user_id, u.username AS "user", f.following_id, t.username AS following
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Unique violations become [`StoreError::UniqueViolation`]; everything else
/// stays a driver error.
fn classify(err: sqlx::Error, table: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(table.to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::MissingReference(table.to_string())
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            StoreError::CheckViolation(db.constraint().unwrap_or(table).to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING *",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "users"))
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO post_groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "post_groups"))
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_group(&self, id: i64) -> StoreResult<Option<Group>> {
        Ok(sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_posts(&self, window: Option<Window>) -> StoreResult<Listed<Post>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        // LIMIT NULL means no limit.
        let query_str = format!(
            r#"
            SELECT {}
            FROM posts p
            JOIN users u ON p.author_id = u.id
            ORDER BY p.id
            LIMIT $1 OFFSET $2
            "#,
            POST_COLUMNS
        );
        let items = sqlx::query_as::<_, Post>(&query_str)
            .bind(window.map(|w| w.limit))
            .bind(window.map(|w| w.offset).unwrap_or(0))
            .fetch_all(&self.pool)
            .await?;

        Ok(Listed { items, total })
    }

    async fn find_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let query_str = format!(
            "SELECT {} FROM posts p JOIN users u ON p.author_id = u.id WHERE p.id = $1",
            POST_COLUMNS
        );
        Ok(sqlx::query_as::<_, Post>(&query_str)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let query_str = format!(
            r#"
            WITH p AS (
                INSERT INTO posts (author_id, text, image, group_id)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {} FROM p JOIN users u ON p.author_id = u.id
            "#,
            POST_COLUMNS
        );
        sqlx::query_as::<_, Post>(&query_str)
            .bind(post.author_id)
            .bind(&post.text)
            .bind(&post.image)
            .bind(post.group_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "posts"))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>> {
        let query_str = format!(
            r#"
            WITH p AS (
                UPDATE posts SET
                    text = COALESCE($2, text),
                    image = CASE WHEN $3 THEN $4 ELSE image END,
                    group_id = CASE WHEN $5 THEN $6 ELSE group_id END
                WHERE id = $1
                RETURNING *
            )
            SELECT {} FROM p JOIN users u ON p.author_id = u.id
            "#,
            POST_COLUMNS
        );
        sqlx::query_as::<_, Post>(&query_str)
            .bind(id)
            .bind(&changes.text)
            .bind(changes.image.is_some())
            .bind(changes.image.clone().flatten())
            .bind(changes.group_id.is_some())
            .bind(changes.group_id.flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "posts"))
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        // comments go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let query_str = format!(
            r#"
            SELECT {}
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.post_id = $1
            ORDER BY c.id
            "#,
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&query_str)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_comment(&self, post_id: i64, id: i64) -> StoreResult<Option<Comment>> {
        let query_str = format!(
            r#"
            SELECT {}
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.id = $1 AND c.post_id = $2
            "#,
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&query_str)
            .bind(id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let query_str = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {} FROM c JOIN users u ON c.author_id = u.id
            "#,
            COMMENT_COLUMNS
        );
        sqlx::query_as::<_, Comment>(&query_str)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(&comment.text)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "comments"))
    }

    async fn update_comment(&self, id: i64, text: String) -> StoreResult<Option<Comment>> {
        let query_str = format!(
            r#"
            WITH c AS (
                UPDATE comments SET text = $2 WHERE id = $1 RETURNING *
            )
            SELECT {} FROM c JOIN users u ON c.author_id = u.id
            "#,
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&query_str)
            .bind(id)
            .bind(&text)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_follows(
        &self,
        user_id: i64,
        search: Option<&FollowSearch>,
        window: Option<Window>,
    ) -> StoreResult<Listed<Follow>> {
        let pattern = search.map(FollowSearch::like_pattern);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM follows f
            JOIN users t ON f.following_id = t.id
            WHERE f.user_id = $1 AND ($2::TEXT IS NULL OR t.username ILIKE $2)
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let query_str = format!(
            r#"
            SELECT {}
            FROM follows f
            JOIN users u ON f.user_id = u.id
            JOIN users t ON f.following_id = t.id
            WHERE f.user_id = $1 AND ($2::TEXT IS NULL OR t.username ILIKE $2)
            ORDER BY f.id
            LIMIT $3 OFFSET $4
            "#,
            FOLLOW_COLUMNS
        );
        let items = sqlx::query_as::<_, Follow>(&query_str)
            .bind(user_id)
            .bind(&pattern)
            .bind(window.map(|w| w.limit))
            .bind(window.map(|w| w.offset).unwrap_or(0))
            .fetch_all(&self.pool)
            .await?;

        Ok(Listed { items, total })
    }

    async fn follow_exists(&self, user_id: i64, following_id: i64) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND following_id = $2)",
        )
        .bind(user_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn create_follow(&self, follow: NewFollow) -> StoreResult<Follow> {
        let query_str = format!(
            r#"
            WITH f AS (
                INSERT INTO follows (user_id, following_id)
                VALUES ($1, $2)
                RETURNING *
            )
            SELECT {}
            FROM f
            JOIN users u ON f.user_id = u.id
            JOIN users t ON f.following_id = t.id
            "#,
            FOLLOW_COLUMNS
        );
        sqlx::query_as::<_, Follow>(&query_str)
            .bind(follow.user_id)
            .bind(follow.following_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "follows"))
    }
}
