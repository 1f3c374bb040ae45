use super::{Store, StoreResult};
use crate::error::StorageError;
use crate::models::{Comment, NewPost, NewUser, Post, User};
use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Process-local store used by tests and `memory:` URIs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        let post = post.into_post(id);
        t.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn get_post_by_id(&self, id: i64) -> StoreResult<Post> {
        self.tables
            .read()
            .await
            .posts
            .get(&id)
            .cloned()
            .ok_or(StorageError::PostNotFound(id))
    }

    async fn list_posts_ordered_by_timestamp_desc(
        &self,
        offset: u64,
        limit: u64,
    ) -> StoreResult<Vec<Post>> {
        let t = self.tables.read().await;
        let mut posts: Vec<&Post> = t.posts.values().collect();
        posts.sort_by_key(|p| Reverse((p.timestamp(), p.id())));
        Ok(posts
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count_posts(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.posts.len() as u64)
    }

    async fn update_post(&self, post: &Post) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let stored = t
            .posts
            .get_mut(&post.id())
            .ok_or(StorageError::PostNotFound(post.id()))?;
        // The creation time is not updatable.
        *stored = Post::from_stored(
            post.id(),
            post.title().to_string(),
            post.text().to_string(),
            post.text_html().to_string(),
            stored.timestamp(),
        );
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.posts.remove(&id).ok_or(StorageError::PostNotFound(id))?;
        t.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }

    async fn create_comment(&self, post_id: i64, reply: &str) -> StoreResult<Comment> {
        let mut t = self.tables.write().await;
        if !t.posts.contains_key(&post_id) {
            return Err(StorageError::PostNotFound(post_id));
        }
        let comment = Comment {
            id: t.next_id(),
            post_id,
            reply: reply.to_string(),
        };
        t.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        Ok(self
            .tables
            .read()
            .await
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        let taken = t.users.values().any(|u| {
            u.username == user.username || (user.email.is_some() && u.email == user.email)
        });
        if taken {
            return Err(StorageError::Duplicate(format!("user {}", user.username)));
        }
        let user = User {
            id: t.next_id(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            is_admin: user.is_admin,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::UserNotFound(format!("#{id}")))
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| StorageError::UserNotFound(username.to_string()))
    }

    async fn set_admin(&self, username: &str, admin: bool) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .values_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StorageError::UserNotFound(username.to_string()))?;
        user.is_admin = admin;
        Ok(())
    }
}
