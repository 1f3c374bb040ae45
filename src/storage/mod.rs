use crate::error::StorageError;
use crate::models::{Comment, NewPost, NewUser, Post, User};
use async_trait::async_trait;
use std::sync::Arc;

pub type StoreResult<T> = Result<T, StorageError>;

/// Persistence boundary for users, posts and comments.
///
/// Lookups by id fail with [`StorageError::PostNotFound`] or
/// [`StorageError::UserNotFound`]; implementations must not turn a missing
/// row into a default value.
#[async_trait]
pub trait Store: Send + Sync {
    /// Store a new post, returning it with its assigned id. Title, text and
    /// HTML are written together.
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;

    /// Retrieve a post by id
    async fn get_post_by_id(&self, id: i64) -> StoreResult<Post>;

    /// Posts newest first, ties broken by id (newest id first), skipping
    /// `offset` and returning at most `limit`
    async fn list_posts_ordered_by_timestamp_desc(
        &self,
        offset: u64,
        limit: u64,
    ) -> StoreResult<Vec<Post>>;

    async fn count_posts(&self) -> StoreResult<u64>;

    /// Persist the title, text and HTML of an existing post in one write
    async fn update_post(&self, post: &Post) -> StoreResult<()>;

    /// Delete a post together with its comments
    async fn delete_post(&self, id: i64) -> StoreResult<()>;

    /// Add a comment to an existing post
    async fn create_comment(&self, post_id: i64, reply: &str) -> StoreResult<Comment>;

    /// Comments of a post in the order they were made
    async fn list_comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>>;

    /// Register a user. Usernames and emails are unique.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user_by_id(&self, id: i64) -> StoreResult<User>;

    async fn get_user_by_username(&self, username: &str) -> StoreResult<User>;

    /// Grant or revoke admin rights.
    async fn set_admin(&self, username: &str, admin: bool) -> StoreResult<()>;
}

pub type DynStore = Arc<dyn Store>;

pub mod memory;
pub mod sqlite;

/// Create a store from a connection URI.
///
/// `sqlite:` URIs open (creating if needed) a SQLite database, `memory:`
/// gives a process-local store that is lost on exit.
pub async fn open(uri: &str) -> StoreResult<DynStore> {
    if uri.starts_with("sqlite:") {
        Ok(Arc::new(sqlite::SqliteStore::new(uri).await?))
    } else if uri.starts_with("memory:") {
        Ok(Arc::new(memory::MemoryStore::new()))
    } else {
        Err(StorageError::Database(
            format!("unknown storage backend in '{uri}'").into(),
        ))
    }
}
