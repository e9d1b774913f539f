//! CiteGraph Common Library
//!
//! Shared code for the citation-network construction engine:
//! - Paper records and graph data structures
//! - Identifier normalization
//! - Error types and handling
//! - Configuration management
//! - Tracing setup

pub mod config;
pub mod errors;
pub mod ident;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{Graph, GraphEdge, GraphNode, PaperRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum stored children per expanded parent node
pub const MAX_CHILDREN_PER_PARENT: usize = 3;
