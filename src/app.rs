//! Application context and the blog's operations.
//!
//! [`App`] is built once at startup and shared by reference with whatever
//! serves requests. Each method is one page or form action.

use crate::auth::{Authenticatable, SessionToken, hash_password, verify_password};
use crate::config::Config;
use crate::error::{AuthError, BlogError, StorageError, ValidationError};
use crate::models::{Comment, NewPost, NewUser, Post, User};
use crate::pagination::{Page, paginate};
use crate::storage::{self, DynStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 64;

pub type AppResult<T> = Result<T, BlogError>;

#[derive(Clone)]
pub struct App {
    store: DynStore,
    config: Arc<Config>,
}

/// The front page: one page of posts, newest first.
#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub posts: Vec<Post>,
    pub page: Page,
}

/// A single post with its comments.
#[derive(Debug, Serialize)]
pub struct PostPage {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// A logged-in user. Only obtainable through [`App::login`] or
/// [`App::resume`].
#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    token: SessionToken,
}

impl Session {
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Value for the session cookie.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Whether the cookie should outlive the browser session.
    pub fn remember(&self) -> bool {
        self.token.remember()
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed)
}

fn within(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

impl App {
    pub fn new(store: DynStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Open the store named by `config.db_path` and build the context.
    pub async fn open(config: Config) -> AppResult<Self> {
        config.validate()?;
        let store = storage::open(&config.db_path).await?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Posts for page `page` of the front page. Out-of-range pages give an
    /// empty list rather than an error.
    pub async fn index(&self, page: i64) -> AppResult<IndexPage> {
        let total = self.store.count_posts().await?;
        let page = paginate(total, self.config.per_page, page);
        let posts = if page.limit == 0 {
            Vec::new()
        } else {
            self.store
                .list_posts_ordered_by_timestamp_desc(page.offset, page.limit)
                .await?
        };
        Ok(IndexPage { posts, page })
    }

    pub async fn post(&self, id: i64) -> AppResult<PostPage> {
        let post = self.store.get_post_by_id(id).await?;
        let comments = self.store.list_comments_for_post(id).await?;
        Ok(PostPage { post, comments })
    }

    /// Leave a comment on a post. Anyone may comment.
    pub async fn add_comment(&self, post_id: i64, reply: &str) -> AppResult<Comment> {
        let reply = required("reply", reply)?;
        let comment = self.store.create_comment(post_id, reply).await?;
        info!(post_id, comment_id = comment.id, "comment added");
        Ok(comment)
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> AppResult<User> {
        let username = required("username", username)?;
        within("username", username, MAX_USERNAME_LEN)?;
        if password.is_empty() {
            return Err(ValidationError::Required("password").into());
        }
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(password)?,
                email: email.map(str::to_string),
                is_admin: false,
            })
            .await?;
        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Check credentials and start a session.
    ///
    /// An unknown username and a wrong password fail the same way.
    pub async fn login(&self, username: &str, password: &str, remember: bool) -> AppResult<Session> {
        let username = required("username", username)?;
        within("username", username, MAX_USERNAME_LEN)?;
        if password.is_empty() {
            return Err(ValidationError::Required("password").into());
        }
        let user = match self.store.get_user_by_username(username).await {
            Ok(user) => user,
            Err(StorageError::UserNotFound(_)) => {
                warn!(username, "login for unknown user");
                return Err(AuthError::InvalidCredentials(username.to_string()).into());
            }
            Err(e) => return Err(e.into()),
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(username, "login with wrong password");
            return Err(AuthError::InvalidCredentials(username.to_string()).into());
        }
        info!(user_id = user.id, remember, "logged in");
        let token = user.session_token(&self.config.secret_key, remember)?;
        Ok(Session { user, token })
    }

    /// Restore a session from a cookie value.
    pub async fn resume(&self, raw_token: &str) -> AppResult<Session> {
        let token: SessionToken = raw_token.parse()?;
        let user = match self.store.get_user_by_id(token.user_id()).await {
            Ok(user) => user,
            Err(StorageError::UserNotFound(_)) => return Err(AuthError::InvalidToken.into()),
            Err(e) => return Err(e.into()),
        };
        if !token.verify(&self.config.secret_key, &user) {
            return Err(AuthError::InvalidToken.into());
        }
        Ok(Session { user, token })
    }

    pub fn logout(&self, session: Session) {
        info!(user_id = session.user.auth_id(), "logged out");
    }

    pub async fn add_post(&self, session: &Session, title: &str, text: &str) -> AppResult<Post> {
        let title = required("title", title)?;
        required("text", text)?;
        let post = self.store.create_post(NewPost::new(title, text)).await?;
        info!(post_id = post.id(), user_id = session.user.id, "post created");
        Ok(post)
    }

    /// Replace a post's title and text. The HTML is re-rendered and stored
    /// in the same write.
    pub async fn edit_post(
        &self,
        session: &Session,
        id: i64,
        title: &str,
        text: &str,
    ) -> AppResult<Post> {
        let title = required("title", title)?;
        required("text", text)?;
        let mut post = self.store.get_post_by_id(id).await?;
        post.edit(title, text);
        self.store.update_post(&post).await?;
        info!(post_id = id, user_id = session.user.id, "post updated");
        Ok(post)
    }

    /// Delete a post and its comments. Admins only.
    pub async fn delete_post(&self, session: &Session, id: i64) -> AppResult<()> {
        if !session.user.is_admin {
            warn!(post_id = id, user_id = session.user.id, "non-admin tried to delete a post");
            return Err(AuthError::Forbidden(session.user.username.clone()).into());
        }
        self.store.delete_post(id).await?;
        info!(post_id = id, user_id = session.user.id, "post deleted");
        Ok(())
    }
}
