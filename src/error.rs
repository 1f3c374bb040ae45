//! Domain error types for the blog
//!
//! Errors are structured internally for logging/debugging but provide
//! generic responses to visitors to avoid leaking sensitive information.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum BlogError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(Box::new(err))
    }
}

impl StorageError {
    /// True for the lookup failures a caller should turn into "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::PostNotFound(_) | StorageError::UserNotFound(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    Required(&'static str),

    #[error("Field {field} is {actual} characters, limit is {max}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    Required,

    #[error("Invalid credentials for user: {0}")]
    InvalidCredentials(String),

    #[error("User {0} is not allowed to do that")]
    Forbidden(String),

    #[error("Session token is invalid or expired")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Session signing failed: {0}")]
    Signing(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl BlogError {
    /// Get the HTTP status code a web layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            BlogError::Storage(e) if e.is_not_found() => 404,
            BlogError::Storage(StorageError::Duplicate(_)) => 409,
            BlogError::Storage(_) => 500,

            BlogError::Validation(_) => 400,

            BlogError::Auth(AuthError::Forbidden(_)) => 403,
            BlogError::Auth(AuthError::Hash(_) | AuthError::Signing(_)) => 500,
            BlogError::Auth(_) => 401,

            BlogError::Config(_) => 500,
            BlogError::Io(_) => 500,
        }
    }

    /// Get a visitor-safe response message (generic, no internal details)
    pub fn client_message(&self) -> &'static str {
        match self {
            BlogError::Storage(StorageError::PostNotFound(_)) => "No such post",
            BlogError::Storage(StorageError::UserNotFound(_)) => "No such user",
            BlogError::Storage(StorageError::Duplicate(_)) => "Already exists",
            BlogError::Storage(_) => "Service temporarily unavailable",

            BlogError::Validation(_) => "Please check the form and try again",

            BlogError::Auth(AuthError::Required) => "Please log in to access this page",
            BlogError::Auth(AuthError::Forbidden(_)) => "Permission denied",
            BlogError::Auth(AuthError::Hash(_) | AuthError::Signing(_)) => {
                "Service temporarily unavailable"
            }
            BlogError::Auth(_) => "Invalid username or password",

            BlogError::Config(_) => "Service temporarily unavailable",
            BlogError::Io(_) => "Service temporarily unavailable",
        }
    }
}
