//! Error types for the CMS glue

use thiserror::Error;

/// Errors raised while fetching, mapping or rendering posts
#[derive(Error, Debug)]
pub enum BlogError {
    /// A date field is missing or malformed
    #[error("Cannot format `{field}`: {value:?}")]
    Format { field: &'static str, value: Option<String> },

    #[error("HTTP error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The CMS answered, but not with something usable
    #[error("CMS error: {0}")]
    Cms(String),

    #[error("No {doc_type} document with uid `{uid}`")]
    NotFound { doc_type: String, uid: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlogError {
    /// Whether the failure came from talking to the CMS (worth a retry)
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Cms(_) | Self::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, BlogError>;
