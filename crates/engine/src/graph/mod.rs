//! Citation/similarity graph construction
//!
//! Turns a root paper and a candidate pool into a node/edge graph:
//! - Conjunctive candidate filters (citations, years, fields, authors,
//!   publication types)
//! - Sort and limit applied before node construction
//! - One uniform `root-link` edge per surviving candidate
//! - `similarity` edges between candidate pairs sharing attributes
//!
//! Builds are deterministic: the reference year for recency decay is an
//! explicit constructor argument rather than a wall-clock read inside
//! the build.

use crate::scoring::SimilarityScorer;
use chrono::Datelike;
use citegraph_common::errors::{AppError, Result};
use citegraph_common::ident;
use citegraph_common::models::{
    EdgeKind, EdgeMetadata, Graph, GraphEdge, GraphFilters, GraphNode, GraphOptions, GraphStats,
    NodeRole, PaperRecord, ScoreContext, SortBy, SortOrder, WeightPolicy,
};
use regex_lite::Regex;
use std::collections::HashSet;

/// Year-distance horizon shared with the scorer's recency component
const RECENCY_HORIZON_YEARS: f64 = 15.0;

/// Minimum length of a TLDR word that counts toward overlap
const TLDR_WORD_MIN_LEN: usize = 4;

/// Shared TLDR words at which the overlap bonus saturates
const TLDR_WORDS_FOR_FULL_BONUS: f64 = 4.0;

/// Node/edge graph builder
pub struct GraphBuilder {
    current_year: i32,
    scorer: SimilarityScorer,
    policy: WeightPolicy,
    context: Option<ScoreContext>,
    word_pattern: Regex,
}

impl GraphBuilder {
    /// Create a builder using `current_year` as the recency reference
    pub fn new(current_year: i32) -> Self {
        Self {
            current_year,
            scorer: SimilarityScorer::new(),
            policy: WeightPolicy::default(),
            context: None,
            word_pattern: Regex::new(r"[a-zA-Z0-9]+").expect("valid word pattern"),
        }
    }

    /// Create a builder anchored at the current calendar year
    pub fn for_current_year() -> Self {
        Self::new(chrono::Utc::now().year())
    }

    /// Weighting policy used for candidate-pair metadata
    pub fn with_policy(mut self, policy: WeightPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Context hints biasing candidate-pair metadata
    pub fn with_context(mut self, context: ScoreContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Build a graph from a candidate pool.
    ///
    /// Never mutates its input; an empty pool yields a valid empty
    /// graph. Internal failures are wrapped with the stage that raised
    /// them.
    pub fn build(&self, papers: &[PaperRecord], options: &GraphOptions) -> Result<Graph> {
        if papers.is_empty() {
            return Ok(Graph::empty());
        }

        // Root comes from the FULL input set so a root filtered out of
        // the candidate pool still anchors the graph
        let root = self.select_root(papers, options);
        let root_id = ident::normalize(&root.id);
        if root_id.is_empty() {
            return Err(AppError::graph_stage(
                "root-selection",
                format!("paper '{}' normalizes to an empty id", root.id),
            ));
        }

        let mut survivors: Vec<&PaperRecord> = papers
            .iter()
            .filter(|p| matches_filters(p, &options.filters))
            .collect();

        sort_candidates(&mut survivors, options.sort_by, options.sort_order);

        // The root is never its own candidate; drop duplicates so no
        // two nodes share a normalized id, then bound the candidate
        // count (limit caps candidates, not edges)
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(root_id.clone());
        let candidates: Vec<&PaperRecord> = survivors
            .into_iter()
            .filter(|p| seen.insert(ident::normalize(&p.id)))
            .take(options.limit)
            .collect();

        let mut nodes = Vec::with_capacity(candidates.len() + 1);
        nodes.push(self.make_node(root, NodeRole::Root, &root_id)?);
        for &candidate in &candidates {
            let id = ident::normalize(&candidate.id);
            nodes.push(self.make_node(candidate, NodeRole::Candidate, &id)?);
        }

        let mut edges = Vec::new();
        for &candidate in &candidates {
            edges.push(GraphEdge {
                source: root_id.clone(),
                target: ident::normalize(&candidate.id),
                kind: EdgeKind::RootLink,
                weight: 1.0,
                metadata: EdgeMetadata::default(),
            });
        }

        for (i, &a) in candidates.iter().enumerate() {
            for &b in candidates.iter().skip(i + 1) {
                if let Some(edge) = self.candidate_edge(a, b) {
                    edges.push(edge);
                }
            }
        }

        let stats = GraphStats {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            root_id: Some(root_id),
        };

        Ok(Graph {
            nodes,
            edges,
            stats,
        })
    }

    fn select_root<'a>(
        &self,
        papers: &'a [PaperRecord],
        options: &GraphOptions,
    ) -> &'a PaperRecord {
        if let Some(requested) = &options.root_paper_id {
            if let Some(found) = papers.iter().find(|p| ident::same_paper(&p.id, requested)) {
                return found;
            }
            tracing::debug!(
                root_paper_id = %requested,
                "requested root not in paper set, falling back to first paper"
            );
        }
        &papers[0]
    }

    fn make_node(&self, paper: &PaperRecord, role: NodeRole, id: &str) -> Result<GraphNode> {
        if id.is_empty() {
            return Err(AppError::graph_stage(
                "node-construction",
                format!("paper '{}' normalizes to an empty id", paper.id),
            ));
        }
        Ok(GraphNode {
            id: id.to_string(),
            title: paper.title.clone(),
            role,
            weight: self.node_weight(paper),
            paper: Some(paper.clone()),
        })
    }

    /// Visual node weight: citation volume plus relevance plus a mild
    /// recency boost, clamped to the same range as edge weights
    fn node_weight(&self, paper: &PaperRecord) -> f64 {
        let recency = paper
            .year
            .map(|y| {
                (1.0 - (self.current_year - y).abs() as f64 / RECENCY_HORIZON_YEARS)
                    .clamp(0.0, 1.0)
            })
            .unwrap_or(0.0);

        (1.0 + paper.citation_count as f64 / 200.0
            + paper.relevance_score * 0.5
            + recency * 0.5)
            .clamp(0.1, 3.0)
    }

    /// Similarity edge between two candidates, or `None` when they
    /// share nothing.
    ///
    /// The structural weight is the shared-attribute ratio (fields +
    /// authors + TLDR word overlap over the larger attribute budget);
    /// the scorer supplies the display metadata.
    fn candidate_edge(&self, a: &PaperRecord, b: &PaperRecord) -> Option<GraphEdge> {
        let scored = self.scorer.score(a, b, self.policy, self.context.as_ref());

        let shared_fields = scored.metadata.shared_keywords.len();
        let shared_authors = scored.metadata.shared_authors.len();
        let tldr_bonus = self.tldr_overlap_bonus(a, b);

        let possible_a = a.fields_of_study.len() + a.author_list().len() + a.has_tldr() as usize;
        let possible_b = b.fields_of_study.len() + b.author_list().len() + b.has_tldr() as usize;
        let denominator = possible_a.max(possible_b).max(1) as f64;

        let weight =
            ((shared_fields + shared_authors) as f64 + tldr_bonus) / denominator;
        if weight <= 0.0 {
            return None;
        }

        Some(GraphEdge {
            source: ident::normalize(&a.id),
            target: ident::normalize(&b.id),
            kind: EdgeKind::Similarity,
            weight: weight.min(1.0),
            metadata: scored.metadata,
        })
    }

    /// Overlap bonus from shared TLDR content words, saturating at 1
    fn tldr_overlap_bonus(&self, a: &PaperRecord, b: &PaperRecord) -> f64 {
        if !a.has_tldr() || !b.has_tldr() {
            return 0.0;
        }
        let words_a = self.content_words(a.tldr.as_deref().unwrap_or_default());
        let words_b = self.content_words(b.tldr.as_deref().unwrap_or_default());
        let shared = words_a.intersection(&words_b).count();
        (shared as f64 / TLDR_WORDS_FOR_FULL_BONUS).min(1.0)
    }

    fn content_words(&self, text: &str) -> HashSet<String> {
        self.word_pattern
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|w| w.len() >= TLDR_WORD_MIN_LEN)
            .collect()
    }
}

/// Conjunctive candidate filters; unset criteria are no-ops
fn matches_filters(paper: &PaperRecord, filters: &GraphFilters) -> bool {
    if let Some(min) = filters.min_citations {
        if paper.citation_count < min {
            return false;
        }
    }
    if let Some(max) = filters.max_citations {
        if paper.citation_count > max {
            return false;
        }
    }
    if filters.min_year.is_some() || filters.max_year.is_some() {
        let Some(year) = paper.year else {
            return false;
        };
        if filters.min_year.is_some_and(|min| year < min) {
            return false;
        }
        if filters.max_year.is_some_and(|max| year > max) {
            return false;
        }
    }
    if !filters.fields_of_study.is_empty() {
        let paper_fields: Vec<String> = paper
            .fields_of_study
            .iter()
            .map(|f| f.to_lowercase())
            .collect();
        let any = filters
            .fields_of_study
            .iter()
            .any(|f| paper_fields.contains(&f.to_lowercase()));
        if !any {
            return false;
        }
    }
    if !filters.authors.is_empty() {
        let authors = paper.authors.to_lowercase();
        let any = filters
            .authors
            .iter()
            .any(|a| authors.contains(&a.to_lowercase()));
        if !any {
            return false;
        }
    }
    if !filters.publication_types.is_empty() {
        let matches = paper
            .publication_type
            .as_deref()
            .map(|pt| filters.publication_types.iter().any(|f| f == pt))
            .unwrap_or(false);
        if !matches {
            return false;
        }
    }
    true
}

/// Stable sort; missing numeric values sort as 0, missing titles as
/// the empty string
fn sort_candidates(papers: &mut [&PaperRecord], sort_by: SortBy, order: SortOrder) {
    papers.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::Relevance => a
                .relevance_score
                .partial_cmp(&b.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal),
            SortBy::Citations => a.citation_count.cmp(&b.citation_count),
            SortBy::Year => a.year.unwrap_or(0).cmp(&b.year.unwrap_or(0)),
            SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, citations: u32, score: f64, year: Option<i32>) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: String::new(),
            year,
            fields_of_study: vec![],
            citation_count: citations,
            reference_count: 0,
            relevance_score: score,
            tldr: None,
            journal_name: None,
            publication_type: None,
        }
    }

    fn rich_paper(
        id: &str,
        fields: &[&str],
        authors: &str,
        tldr: Option<&str>,
    ) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: authors.to_string(),
            year: Some(2022),
            fields_of_study: fields.iter().map(|f| f.to_string()).collect(),
            citation_count: 10,
            reference_count: 0,
            relevance_score: 0.5,
            tldr: tldr.map(str::to_string),
            journal_name: None,
            publication_type: None,
        }
    }

    fn builder() -> GraphBuilder {
        GraphBuilder::new(2026)
    }

    #[test]
    fn test_empty_input_yields_empty_graph() {
        let graph = builder().build(&[], &GraphOptions::default()).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert_eq!(graph.stats.total_nodes, 0);
        assert_eq!(graph.stats.total_edges, 0);
    }

    #[test]
    fn test_citation_sort_and_limit() {
        // Candidate set = the 3 highest-citation papers, in order
        let papers = vec![
            paper("root", 0, 0.1, Some(2020)),
            paper("a", 5, 0.1, Some(2020)),
            paper("b", 50, 0.1, Some(2020)),
            paper("c", 500, 0.1, Some(2020)),
            paper("d", 5000, 0.1, Some(2020)),
        ];
        let options = GraphOptions {
            sort_by: SortBy::Citations,
            sort_order: SortOrder::Desc,
            limit: 3,
            ..Default::default()
        };
        let graph = builder().build(&papers, &options).unwrap();

        let candidate_ids: Vec<&str> = graph
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Candidate)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(candidate_ids, vec!["d", "c", "b"]);

        let root_links: Vec<&str> = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::RootLink)
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(root_links, vec!["d", "c", "b"]);
    }

    #[test]
    fn test_explicit_root_selected_and_excluded_from_candidates() {
        let papers = vec![
            paper("a", 1, 0.1, None),
            paper("b", 2, 0.2, None),
            paper("c", 3, 0.3, None),
        ];
        let options = GraphOptions {
            root_paper_id: Some("corpus:b".to_string()),
            ..Default::default()
        };
        let graph = builder().build(&papers, &options).unwrap();

        let root = graph.nodes.iter().find(|n| n.role == NodeRole::Root).unwrap();
        assert_eq!(root.id, "b");
        assert_eq!(graph.stats.root_id.as_deref(), Some("b"));
        assert_eq!(
            graph
                .nodes
                .iter()
                .filter(|n| n.role == NodeRole::Candidate)
                .count(),
            2
        );
        assert!(!graph.has_edge("b", "b"));
    }

    #[test]
    fn test_missing_root_falls_back_to_first_paper() {
        let papers = vec![paper("x", 1, 0.1, None), paper("y", 2, 0.2, None)];
        let options = GraphOptions {
            root_paper_id: Some("nope".to_string()),
            ..Default::default()
        };
        let graph = builder().build(&papers, &options).unwrap();
        assert_eq!(graph.stats.root_id.as_deref(), Some("x"));
    }

    #[test]
    fn test_duplicate_normalized_ids_collapse() {
        let papers = vec![
            paper("root", 0, 0.1, None),
            paper("paper-42", 1, 0.1, None),
            paper("corpus:42", 2, 0.2, None),
        ];
        let graph = builder().build(&papers, &GraphOptions::default()).unwrap();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.iter().filter(|id| **id == "42").count(), 1);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let papers = vec![
            paper("root", 0, 0.1, Some(2000)),
            paper("old-cited", 100, 0.1, Some(2010)),
            paper("new-uncited", 1, 0.1, Some(2023)),
            paper("new-cited", 100, 0.1, Some(2023)),
        ];
        let options = GraphOptions {
            filters: GraphFilters {
                min_citations: Some(10),
                min_year: Some(2020),
                ..Default::default()
            },
            ..Default::default()
        };
        let graph = builder().build(&papers, &options).unwrap();
        let candidates: Vec<&str> = graph
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Candidate)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(candidates, vec!["new-cited"]);
    }

    #[test]
    fn test_year_filter_excludes_missing_year() {
        let papers = vec![
            paper("root", 0, 0.1, Some(2000)),
            paper("undated", 100, 0.1, None),
        ];
        let options = GraphOptions {
            filters: GraphFilters {
                min_year: Some(1990),
                ..Default::default()
            },
            ..Default::default()
        };
        let graph = builder().build(&papers, &options).unwrap();
        assert!(!graph.has_node("undated"));
    }

    #[test]
    fn test_field_and_author_filters() {
        let mut match_both = rich_paper("hit", &["Biology"], "Ada Lovelace, Alan Turing", None);
        match_both.citation_count = 5;
        let papers = vec![
            paper("root", 0, 0.1, None),
            match_both,
            rich_paper("wrong-field", &["Physics"], "Ada Lovelace", None),
            rich_paper("wrong-author", &["Biology"], "Grace Hopper", None),
        ];
        let options = GraphOptions {
            filters: GraphFilters {
                fields_of_study: vec!["biology".to_string()],
                authors: vec!["lovelace".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let graph = builder().build(&papers, &options).unwrap();
        let candidates: Vec<&str> = graph
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Candidate)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(candidates, vec!["hit"]);
    }

    #[test]
    fn test_candidate_edges_require_shared_attributes() {
        let papers = vec![
            paper("root", 0, 0.1, None),
            rich_paper("a", &["CS", "ML"], "Ada, Grace", Some("graph neural networks")),
            rich_paper("b", &["CS"], "Grace", Some("neural architecture search")),
            rich_paper("c", &["History"], "Herodotus", None),
        ];
        let graph = builder().build(&papers, &GraphOptions::default()).unwrap();

        let similarity: Vec<&GraphEdge> = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Similarity)
            .collect();

        // a-b share a field, an author, and the TLDR word "neural";
        // c shares nothing with either
        assert_eq!(similarity.len(), 1);
        let edge = similarity[0];
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("a", "b"));
        assert!(edge.weight > 0.0 && edge.weight <= 1.0);
        assert_eq!(edge.metadata.shared_keywords, vec!["CS"]);
        assert_eq!(edge.metadata.shared_authors, vec!["Grace"]);
    }

    #[test]
    fn test_node_weights_bounded_and_citation_driven() {
        let papers = vec![
            paper("root", 0, 0.0, None),
            paper("small", 10, 0.2, Some(2024)),
            paper("huge", 100_000, 1.0, Some(2024)),
        ];
        let graph = builder().build(&papers, &GraphOptions::default()).unwrap();
        for node in &graph.nodes {
            assert!((0.1..=3.0).contains(&node.weight));
        }
        let weight_of = |id: &str| {
            graph
                .nodes
                .iter()
                .find(|n| n.id == id)
                .map(|n| n.weight)
                .unwrap()
        };
        assert!(weight_of("huge") > weight_of("small"));
        assert!((weight_of("huge") - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_is_deterministic() {
        let papers = vec![
            paper("root", 0, 0.4, Some(2018)),
            rich_paper("a", &["CS", "ML"], "Ada, Grace", Some("graph neural networks")),
            rich_paper("b", &["CS"], "Grace", Some("neural architecture search")),
            rich_paper("c", &["CS", "Stats"], "Ada", Some("bayesian neural inference")),
        ];
        let options = GraphOptions {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Asc,
            limit: 10,
            ..Default::default()
        };
        let b = builder();
        let first = b.build(&papers, &options).unwrap();
        let second = b.build(&papers, &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_title_sort_is_case_insensitive() {
        let mut p1 = paper("1", 0, 0.0, None);
        p1.title = "zebra studies".to_string();
        let mut p2 = paper("2", 0, 0.0, None);
        p2.title = "Ant colonies".to_string();
        let papers = vec![paper("root", 0, 0.0, None), p1, p2];
        let options = GraphOptions {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let graph = builder().build(&papers, &options).unwrap();
        let candidates: Vec<&str> = graph
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Candidate)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(candidates, vec!["2", "1"]);
    }
}
