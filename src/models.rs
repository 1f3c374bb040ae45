//! Blog entities.
//!
//! A post's HTML is derived from its raw text and can only change through
//! [`NewPost::new`], [`Post::set_text`] or [`Post::edit`], each of which
//! re-renders it.

use crate::render::render;
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

/// A post that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    title: String,
    text: String,
    text_html: String,
    timestamp: DateTime<Utc>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            title: title.into(),
            text_html: render(&text),
            text,
            timestamp: Utc::now().trunc_subsecs(6),
        }
    }

    /// Override the creation time, e.g. when importing older posts.
    /// Timestamps are kept to microsecond precision.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(6);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_html(&self) -> &str {
        &self.text_html
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub(crate) fn into_post(self, id: i64) -> Post {
        Post {
            id,
            title: self.title,
            text: self.text,
            text_html: self.text_html,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    id: i64,
    title: String,
    text: String,
    text_html: String,
    timestamp: DateTime<Utc>,
}

impl Post {
    /// Rebuild a post from stored columns.
    pub(crate) fn from_stored(
        id: i64,
        title: String,
        text: String,
        text_html: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            text,
            text_html,
            timestamp,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Sanitized HTML rendering of [`Post::text`].
    pub fn text_html(&self) -> &str {
        &self.text_html
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Replace the raw text and re-render the HTML in the same step.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.text_html = render(&text);
        self.text = text;
    }

    pub fn edit(&mut self, title: impl Into<String>, text: impl Into<String>) {
        self.set_title(title);
        self.set_text(text);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub reply: String,
}

/// Account data needed to create a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub is_admin: bool,
}
