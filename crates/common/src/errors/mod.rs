//! Error types for the CiteGraph engine
//!
//! Provides a shared error taxonomy with:
//! - Distinct error types for different failure modes
//! - Machine-readable error codes for client handling
//! - Conversions from transport and serialization errors
//!
//! Recoverable "no data" outcomes are deliberately NOT errors: a search
//! job that reports `error` status or exhausts its polling budget
//! surfaces as `Ok(None)` from the client, and an empty candidate pool
//! produces an empty graph. Only genuinely exceptional conditions
//! (transport failure, internal invariant violation) use `AppError`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,
    PaperNotFound,
    SessionNotFound,

    // External service errors (8xxx)
    UpstreamError,
    JobSubmissionError,

    // Internal errors (9xxx)
    GraphConstructionError,
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::PaperNotFound => 4002,
            ErrorCode::SessionNotFound => 4003,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::JobSubmissionError => 8002,

            // Internal (9xxx)
            ErrorCode::GraphConstructionError => 9001,
            ErrorCode::InternalError => 9002,
            ErrorCode::ConfigurationError => 9003,
            ErrorCode::SerializationError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    // External service errors
    #[error("Search service error: {message}")]
    Upstream { message: String },

    #[error("Job submission rejected: {message}")]
    JobSubmission { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Graph construction failed at {stage}: {message}")]
    GraphConstruction { stage: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::JobSubmission { .. } => ErrorCode::JobSubmissionError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::GraphConstruction { .. } => ErrorCode::GraphConstructionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Check if this error originates from caller input rather than
    /// the engine itself (a 400-equivalent for the CRUD layer)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. } | AppError::InvalidFormat { .. }
        )
    }

    /// Check if this error is a missing-resource lookup
    /// (a 404-equivalent for the CRUD layer)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. }
                | AppError::PaperNotFound { .. }
                | AppError::SessionNotFound { .. }
        )
    }

    /// Wrap an error from a graph-assembly stage
    pub fn graph_stage(stage: &str, err: impl std::fmt::Display) -> Self {
        AppError::GraphConstruction {
            stage: stage.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
