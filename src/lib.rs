//! A minimal Markdown blog.
//!
//! Posts are written in Markdown and stored together with a sanitized HTML
//! rendering ([`render`]); the front page lists them newest first in pages
//! ([`pagination`]). Persistence sits behind the [`storage::Store`] trait and
//! the operations a web front end needs are methods on [`app::App`].

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod render;
pub mod storage;

pub use app::{App, IndexPage, PostPage, Session};
pub use error::BlogError;
pub use pagination::{Page, paginate};
pub use render::{render, strip_to_allowlist};
