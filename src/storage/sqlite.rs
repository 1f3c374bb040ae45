use super::{Store, StoreResult};
use crate::error::StorageError;
use crate::models::{Comment, NewPost, NewUser, Post, User};
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use std::str::FromStr;

// SQL schemas for SQLite storage
const USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        email TEXT UNIQUE,
        is_admin INTEGER NOT NULL DEFAULT 0
    )";

const POSTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        text TEXT NOT NULL,
        text_html TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    )";

const POSTS_TIMESTAMP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS posts_timestamp_idx ON posts (timestamp)";

const COMMENTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        reply TEXT NOT NULL,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE
    )";

const COMMENTS_POST_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS comments_post_idx ON comments (post_id)";

const SELECT_POST: &str = "SELECT id, title, text, text_html, timestamp FROM posts WHERE id = ?";

const SELECT_POSTS_PAGE: &str = "SELECT id, title, text, text_html, timestamp FROM posts
        ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?";

const SELECT_USER_BY_ID: &str =
    "SELECT id, username, password_hash, email, is_admin FROM users WHERE id = ?";

const SELECT_USER_BY_NAME: &str =
    "SELECT id, username, password_hash, email, is_admin FROM users WHERE username = ?";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn post_from_row(row: &SqliteRow) -> StoreResult<Post> {
    let micros: i64 = row.try_get("timestamp")?;
    let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        StorageError::Database(format!("timestamp out of range: {micros}").into())
    })?;
    Ok(Post::from_stored(
        row.try_get("id")?,
        row.try_get("title")?,
        row.try_get("text")?,
        row.try_get("text_html")?,
        timestamp,
    ))
}

fn user_from_row(row: &SqliteRow) -> StoreResult<User> {
    let is_admin: i64 = row.try_get("is_admin")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        email: row.try_get("email")?,
        is_admin: is_admin != 0,
    })
}

fn duplicate_or(err: sqlx::Error, what: impl FnOnce() -> String) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Duplicate(what()),
        _ => err.into(),
    }
}

impl SqliteStore {
    /// Create a new SQLite storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    #[tracing::instrument(skip_all)]
    pub async fn new(path: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to :memory: is its own database, so keep exactly one alive.
        let pool = if path.contains(":memory:") || path.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        for schema in [
            USERS_TABLE,
            POSTS_TABLE,
            POSTS_TIMESTAMP_INDEX,
            COMMENTS_TABLE,
            COMMENTS_POST_INDEX,
        ] {
            sqlx::query(schema).execute(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    #[tracing::instrument(skip_all)]
    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let result = sqlx::query(
            "INSERT INTO posts (title, text, text_html, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(post.title())
        .bind(post.text())
        .bind(post.text_html())
        .bind(post.timestamp().timestamp_micros())
        .execute(&self.pool)
        .await?;
        Ok(post.into_post(result.last_insert_rowid()))
    }

    #[tracing::instrument(skip_all)]
    async fn get_post_by_id(&self, id: i64) -> StoreResult<Post> {
        let row = sqlx::query(SELECT_POST)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::PostNotFound(id))?;
        post_from_row(&row)
    }

    #[tracing::instrument(skip_all)]
    async fn list_posts_ordered_by_timestamp_desc(
        &self,
        offset: u64,
        limit: u64,
    ) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query(SELECT_POSTS_PAGE)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(post_from_row).collect()
    }

    #[tracing::instrument(skip_all)]
    async fn count_posts(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[tracing::instrument(skip_all)]
    async fn update_post(&self, post: &Post) -> StoreResult<()> {
        let result = sqlx::query("UPDATE posts SET title = ?, text = ?, text_html = ? WHERE id = ?")
            .bind(post.title())
            .bind(post.text())
            .bind(post.text_html())
            .bind(post.id())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::PostNotFound(post.id()));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::PostNotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn create_comment(&self, post_id: i64, reply: &str) -> StoreResult<Comment> {
        let result = sqlx::query(
            "INSERT INTO comments (reply, post_id) SELECT ?, id FROM posts WHERE id = ?",
        )
        .bind(reply)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::PostNotFound(post_id));
        }
        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id,
            reply: reply.to_string(),
        })
    }

    #[tracing::instrument(skip_all)]
    async fn list_comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query("SELECT id, reply, post_id FROM comments WHERE post_id = ? ORDER BY id")
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                Ok(Comment {
                    id: r.try_get("id")?,
                    post_id: r.try_get("post_id")?,
                    reply: r.try_get("reply")?,
                })
            })
            .collect()
    }

    #[tracing::instrument(skip_all)]
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, email, is_admin) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.email.as_deref())
        .bind(i32::from(user.is_admin))
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, || format!("user {}", user.username)))?;
        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            is_admin: user.is_admin,
        })
    }

    #[tracing::instrument(skip_all)]
    async fn get_user_by_id(&self, id: i64) -> StoreResult<User> {
        let row = sqlx::query(SELECT_USER_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(format!("#{id}")))?;
        user_from_row(&row)
    }

    #[tracing::instrument(skip_all)]
    async fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        let row = sqlx::query(SELECT_USER_BY_NAME)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::UserNotFound(username.to_string()))?;
        user_from_row(&row)
    }

    #[tracing::instrument(skip_all)]
    async fn set_admin(&self, username: &str, admin: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE username = ?")
            .bind(i32::from(admin))
            .bind(username)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotFound(username.to_string()));
        }
        Ok(())
    }
}
