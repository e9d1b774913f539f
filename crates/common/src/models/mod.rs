//! Core data model for the citation-network engine
//!
//! Paper records as returned by the external search service, graph
//! nodes/edges produced by the builder, stored expansion relationships,
//! and the validated query-parameter boundary.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

/// A paper as returned by the external search service.
///
/// Immutable once fetched; the engine copies records into nodes or
/// relationship entries when longer-lived storage is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    /// Identifier, possibly carrying a synthetic prefix
    pub id: String,

    /// Paper title
    pub title: String,

    /// Comma-joined author names
    #[serde(default)]
    pub authors: String,

    /// Publication year
    #[serde(default)]
    pub year: Option<i32>,

    /// Fields of study assigned by the search service
    #[serde(default)]
    pub fields_of_study: Vec<String>,

    /// Incoming citation count
    #[serde(default)]
    pub citation_count: u32,

    /// Outgoing reference count
    #[serde(default)]
    pub reference_count: u32,

    /// Search-provided relevance score in [0, 1]
    #[serde(default)]
    pub relevance_score: f64,

    /// Short machine-generated summary
    #[serde(default)]
    pub tldr: Option<String>,

    /// Journal or venue name
    #[serde(default)]
    pub journal_name: Option<String>,

    /// Publication type (e.g. JournalArticle, Conference)
    #[serde(default)]
    pub publication_type: Option<String>,
}

impl PaperRecord {
    /// Author names split on commas, trimmed, empties dropped
    pub fn author_list(&self) -> Vec<&str> {
        self.authors
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Whether the record carries a non-empty summary
    pub fn has_tldr(&self) -> bool {
        self.tldr
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Role of a node within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Root,
    Candidate,
}

/// One node of a citation/similarity graph.
///
/// Node identity is the normalized paper id; no two nodes in one graph
/// share a normalized id. Stub nodes restored from stored relationships
/// carry no full `paper` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Normalized paper id
    pub id: String,

    /// Display title
    pub title: String,

    /// Root or candidate
    pub role: NodeRole,

    /// Visual sizing weight in [0.1, 3.0] (not structural)
    pub weight: f64,

    /// Full record when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper: Option<PaperRecord>,
}

/// Kind of edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Root to surfaced candidate, uniform weight
    RootLink,
    /// Candidate to candidate, weighted by shared attributes
    Similarity,
}

/// Display/analysis metadata attached to an edge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetadata {
    /// Literal shared fields of study (original casing)
    #[serde(default)]
    pub shared_keywords: Vec<String>,

    /// Literal shared author names (original casing)
    #[serde(default)]
    pub shared_authors: Vec<String>,

    /// Mean component similarity in [0, 1]
    #[serde(default)]
    pub similarity_score: f64,

    /// Contribution from caller-supplied context hints
    #[serde(default)]
    pub context_boost: f64,
}

/// One edge of a citation/similarity graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Normalized source node id
    pub source: String,

    /// Normalized target node id
    pub target: String,

    /// Edge kind
    #[serde(rename = "type")]
    pub kind: EdgeKind,

    /// Weight clamped into [0.1, 3.0]
    pub weight: f64,

    /// Display metadata
    #[serde(default)]
    pub metadata: EdgeMetadata,
}

/// Summary statistics reported with a built graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,

    /// Normalized id of the root node, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,
}

/// A built node/edge graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
}

impl Graph {
    /// An empty graph (the valid result of building with no papers)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a node with this normalized id exists
    pub fn has_node(&self, normalized_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == normalized_id)
    }

    /// Whether an edge with this normalized source/target pair exists
    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    /// Recompute node/edge totals after external mutation
    pub fn refresh_stats(&mut self) {
        self.stats.total_nodes = self.nodes.len();
        self.stats.total_edges = self.edges.len();
    }
}

/// Reference to a stored expansion child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRef {
    /// Normalized child paper id
    pub id: String,

    /// Display title
    pub title: String,

    /// Normalized id of the parent whose expansion produced this child
    pub source_parent_id: String,

    /// Full record when it was cached at expansion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper: Option<PaperRecord>,
}

/// Stored children of one expanded parent, capped at
/// [`crate::MAX_CHILDREN_PER_PARENT`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEntry {
    #[serde(default)]
    pub child_papers: Vec<ChildRef>,
}

/// Outcome of a `store_children` merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOutcome {
    /// Children actually added by this call
    pub added_count: usize,

    /// Children stored under the parent after the merge
    pub total_children: usize,
}

/// Sort key for graph candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    Citations,
    Year,
    Title,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Weighting policy for similarity scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPolicy {
    #[default]
    Balanced,
    Citations,
    Recency,
    Keywords,
}

/// Caller-supplied hints biasing similarity toward a topic of interest
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreContext {
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub authors: Vec<String>,
}

/// Candidate filters; an unset criterion is a no-op, set criteria are
/// ANDed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphFilters {
    #[serde(default)]
    pub min_citations: Option<u32>,

    #[serde(default)]
    pub max_citations: Option<u32>,

    #[serde(default)]
    pub min_year: Option<i32>,

    #[serde(default)]
    pub max_year: Option<i32>,

    /// Case-insensitive any-match against a paper's fields of study
    #[serde(default)]
    pub fields_of_study: Vec<String>,

    /// Case-insensitive substring match against comma-split authors
    #[serde(default)]
    pub authors: Vec<String>,

    /// Membership match against publication type
    #[serde(default)]
    pub publication_types: Vec<String>,
}

impl GraphFilters {
    pub fn is_empty(&self) -> bool {
        self.min_citations.is_none()
            && self.max_citations.is_none()
            && self.min_year.is_none()
            && self.max_year.is_none()
            && self.fields_of_study.is_empty()
            && self.authors.is_empty()
            && self.publication_types.is_empty()
    }
}

/// Validated options driving one graph build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphOptions {
    /// Preferred root; falls back to the first input paper if absent
    #[serde(default)]
    pub root_paper_id: Option<String>,

    #[serde(default)]
    pub filters: GraphFilters,

    #[serde(default)]
    pub sort_by: SortBy,

    #[serde(default)]
    pub sort_order: SortOrder,

    /// Candidate cap applied after sorting
    pub limit: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            root_paper_id: None,
            filters: GraphFilters::default(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            limit: DEFAULT_GRAPH_LIMIT,
        }
    }
}

/// Default candidate limit when the caller supplies none
pub const DEFAULT_GRAPH_LIMIT: usize = 100;

/// Hard upper bound on the candidate limit
pub const MAX_GRAPH_LIMIT: usize = 1000;

/// Raw graph query parameters as received from the request layer.
///
/// This is the single validated parsing boundary: everything arrives as
/// strings (comma-separated lists, numeric text) and leaves as a typed
/// [`GraphOptions`] or a `Validation` error naming the offending field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQueryParams {
    #[serde(default)]
    pub root_paper_id: Option<String>,

    #[serde(default)]
    pub sort_by: Option<String>,

    #[serde(default)]
    pub sort_order: Option<String>,

    #[serde(default)]
    pub min_citations: Option<String>,

    #[serde(default)]
    pub max_citations: Option<String>,

    #[serde(default)]
    pub min_year: Option<String>,

    #[serde(default)]
    pub max_year: Option<String>,

    /// Comma-separated list
    #[serde(default)]
    pub fields_of_study: Option<String>,

    /// Comma-separated list
    #[serde(default)]
    pub authors: Option<String>,

    /// Comma-separated list
    #[serde(default)]
    pub publication_types: Option<String>,

    #[serde(default)]
    pub limit: Option<String>,
}

fn parse_numeric<T: std::str::FromStr>(value: &str, field: &str) -> Result<T> {
    value.trim().parse().map_err(|_| AppError::Validation {
        message: format!("'{}' is not a valid number for {}", value, field),
        field: Some(field.to_string()),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl GraphQueryParams {
    /// Validate and convert into typed build options.
    pub fn into_options(self) -> Result<GraphOptions> {
        let sort_by = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") => SortBy::default(),
            Some("relevance") => SortBy::Relevance,
            Some("citations") => SortBy::Citations,
            Some("year") => SortBy::Year,
            Some("title") => SortBy::Title,
            Some(other) => {
                return Err(AppError::Validation {
                    message: format!("unknown sortBy value '{}'", other),
                    field: Some("sortBy".to_string()),
                })
            }
        };

        let sort_order = match self.sort_order.as_deref().map(str::trim) {
            None | Some("") => SortOrder::default(),
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(AppError::Validation {
                    message: format!("unknown sortOrder value '{}'", other),
                    field: Some("sortOrder".to_string()),
                })
            }
        };

        let limit = match self.limit.as_deref() {
            None => DEFAULT_GRAPH_LIMIT,
            Some(raw) => {
                let parsed: usize = parse_numeric(raw, "limit")?;
                parsed.clamp(1, MAX_GRAPH_LIMIT)
            }
        };

        let filters = GraphFilters {
            min_citations: self
                .min_citations
                .as_deref()
                .map(|v| parse_numeric(v, "minCitations"))
                .transpose()?,
            max_citations: self
                .max_citations
                .as_deref()
                .map(|v| parse_numeric(v, "maxCitations"))
                .transpose()?,
            min_year: self
                .min_year
                .as_deref()
                .map(|v| parse_numeric(v, "minYear"))
                .transpose()?,
            max_year: self
                .max_year
                .as_deref()
                .map(|v| parse_numeric(v, "maxYear"))
                .transpose()?,
            fields_of_study: self.fields_of_study.as_deref().map(split_list).unwrap_or_default(),
            authors: self.authors.as_deref().map(split_list).unwrap_or_default(),
            publication_types: self
                .publication_types
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
        };

        Ok(GraphOptions {
            root_paper_id: self.root_paper_id.filter(|id| !id.trim().is_empty()),
            filters,
            sort_by,
            sort_order,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: "Ada Lovelace, Alan Turing".to_string(),
            year: Some(2021),
            fields_of_study: vec!["Computer Science".to_string()],
            citation_count: 10,
            reference_count: 20,
            relevance_score: 0.5,
            tldr: Some("A study of machines.".to_string()),
            journal_name: None,
            publication_type: Some("JournalArticle".to_string()),
        }
    }

    #[test]
    fn test_author_list_splits_and_trims() {
        let p = paper("a");
        assert_eq!(p.author_list(), vec!["Ada Lovelace", "Alan Turing"]);
    }

    #[test]
    fn test_has_tldr() {
        let mut p = paper("a");
        assert!(p.has_tldr());
        p.tldr = Some("   ".to_string());
        assert!(!p.has_tldr());
        p.tldr = None;
        assert!(!p.has_tldr());
    }

    #[test]
    fn test_paper_record_deserializes_camel_case() {
        let json = r#"{
            "id": "abc",
            "title": "T",
            "authors": "A, B",
            "fieldsOfStudy": ["CS"],
            "citationCount": 7,
            "referenceCount": 3,
            "relevanceScore": 0.9
        }"#;
        let p: PaperRecord = serde_json::from_str(json).unwrap();
        assert_eq!(p.citation_count, 7);
        assert_eq!(p.fields_of_study, vec!["CS"]);
        assert_eq!(p.year, None);
    }

    #[test]
    fn test_query_params_defaults() {
        let opts = GraphQueryParams::default().into_options().unwrap();
        assert_eq!(opts.limit, DEFAULT_GRAPH_LIMIT);
        assert_eq!(opts.sort_by, SortBy::Relevance);
        assert_eq!(opts.sort_order, SortOrder::Desc);
        assert!(opts.filters.is_empty());
    }

    #[test]
    fn test_query_params_rejects_non_numeric_limit() {
        let params = GraphQueryParams {
            limit: Some("lots".to_string()),
            ..Default::default()
        };
        let err = params.into_options().unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_query_params_clamps_limit() {
        let params = GraphQueryParams {
            limit: Some("99999".to_string()),
            ..Default::default()
        };
        assert_eq!(params.into_options().unwrap().limit, MAX_GRAPH_LIMIT);

        let params = GraphQueryParams {
            limit: Some("0".to_string()),
            ..Default::default()
        };
        assert_eq!(params.into_options().unwrap().limit, 1);
    }

    #[test]
    fn test_query_params_splits_lists() {
        let params = GraphQueryParams {
            fields_of_study: Some("CS, Biology,,  Physics ".to_string()),
            min_year: Some("2019".to_string()),
            ..Default::default()
        };
        let opts = params.into_options().unwrap();
        assert_eq!(opts.filters.fields_of_study, vec!["CS", "Biology", "Physics"]);
        assert_eq!(opts.filters.min_year, Some(2019));
    }

    #[test]
    fn test_query_params_rejects_unknown_sort() {
        let params = GraphQueryParams {
            sort_by: Some("velocity".to_string()),
            ..Default::default()
        };
        assert!(params.into_options().is_err());
    }

    #[test]
    fn test_graph_helpers() {
        let mut graph = Graph::empty();
        assert_eq!(graph.stats.total_nodes, 0);
        graph.nodes.push(GraphNode {
            id: "a".to_string(),
            title: "A".to_string(),
            role: NodeRole::Root,
            weight: 1.0,
            paper: None,
        });
        graph.refresh_stats();
        assert!(graph.has_node("a"));
        assert!(!graph.has_node("b"));
        assert_eq!(graph.stats.total_nodes, 1);
    }
}
