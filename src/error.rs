//! Error handling for the Spark client

use std::fmt;
use thiserror::Error;

use spark_auth::AuthError;
use spark_postgrest::PostgrestError;

pub use crate::validation::ValidationError;

/// Unified error type for the Spark client
#[derive(Error, Debug)]
pub enum Error {
    /// Bad credentials, expired or missing session
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Table operation or transport failure
    #[error("Remote error: {0}")]
    Remote(#[from] PostgrestError),

    /// Client-side form checks; raised before any remote call
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A looked-up record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local cache read or write failure
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a new cache error
    pub fn cache<T: fmt::Display>(msg: T) -> Self {
        Error::Cache(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new not-found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
