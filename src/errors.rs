// ABOUTME: Error types for the tutorial-slides application
// ABOUTME: Separates fatal slide-set failures from per-page failures

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlideError {
    #[error("File operation failed: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Could not list the directory {dir:?}: {source}")]
    ListingError {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load template {path:?}: {message}")]
    TemplateLoadError { path: PathBuf, message: String },

    #[error("Template render error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    #[error("Template syntax error: {0}")]
    TemplateSyntaxError(#[from] handlebars::TemplateError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid slide set {0:?}, expected TEMPLATE:DIR")]
    InvalidSlideSet(String),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Build task failed: {0}")]
    TaskError(String),
}

impl From<notify::Error> for SlideError {
    fn from(err: notify::Error) -> Self {
        SlideError::WatchError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SlideError {
    fn from(err: tokio::task::JoinError) -> Self {
        SlideError::TaskError(err.to_string())
    }
}

impl From<url::ParseError> for SlideError {
    fn from(err: url::ParseError) -> Self {
        SlideError::ConfigError(format!("invalid URL: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, SlideError>;
