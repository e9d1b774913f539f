//! CiteGraph Engine
//!
//! The citation-network construction core:
//! - Similarity scoring between paper records under weighting policies
//! - Node/edge graph construction from a root and a candidate pool
//! - Parent/child expansion relationships with idempotent merges
//! - Per-session relationship storage with LRU eviction
//! - Job-based client for the external paper-search service
//!
//! The surrounding request/CRUD layer feeds paper records and query
//! parameters in and receives [`citegraph_common::models::Graph`]
//! structures back; nothing in this crate speaks HTTP to end users.

pub mod client;
pub mod graph;
pub mod relations;
pub mod scoring;
pub mod session;

pub use client::{JobSearchClient, JobType, SearchTransport};
pub use graph::GraphBuilder;
pub use relations::RelationshipStore;
pub use scoring::{EdgeScore, SimilarityScorer};
pub use session::SessionStore;
