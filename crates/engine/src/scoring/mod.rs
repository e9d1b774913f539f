//! Similarity scoring between paper records
//!
//! Computes a bounded edge weight for any pair of papers from five
//! normalized components:
//! - Citation strength (ratio of the smaller to the larger count)
//! - Relevance (mean of the search-provided scores)
//! - Recency (15-year linear decay of the publication-year distance)
//! - Keyword similarity (case-insensitive Jaccard of fields of study)
//! - Author similarity (case-insensitive Jaccard of author names)
//!
//! A weighting policy chooses the coefficients; caller-supplied context
//! hints add an unconditional boost. Weights are clamped into
//! [0.1, 3.0] so the rendering layer always receives a usable range.

use citegraph_common::models::{EdgeMetadata, PaperRecord, ScoreContext, WeightPolicy};
use std::collections::HashSet;

/// Lower bound of an edge weight
pub const MIN_EDGE_WEIGHT: f64 = 0.1;

/// Upper bound of an edge weight
pub const MAX_EDGE_WEIGHT: f64 = 3.0;

/// Publication-year distance at which recency decays to zero
const RECENCY_HORIZON_YEARS: f64 = 15.0;

/// Result of scoring one pair
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeScore {
    /// Edge weight in [0.1, 3.0]
    pub weight: f64,

    /// Display/analysis metadata
    pub metadata: EdgeMetadata,
}

/// The five base components, each roughly in [0, 1]
#[derive(Debug, Clone, Copy, Default)]
struct Components {
    citation_strength: f64,
    relevance: f64,
    recency: f64,
    keyword_sim: f64,
    author_sim: f64,
}

/// Pairwise similarity scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a pair of papers under a weighting policy.
    ///
    /// Missing fields contribute neutrally; there are no error
    /// conditions. Symmetric in `a`/`b` for every component, so the
    /// weight is symmetric under every policy.
    pub fn score(
        &self,
        a: &PaperRecord,
        b: &PaperRecord,
        policy: WeightPolicy,
        context: Option<&ScoreContext>,
    ) -> EdgeScore {
        let c = compute_components(a, b);

        let mut weight = 1.0
            + match policy {
                WeightPolicy::Balanced => {
                    0.8 * c.citation_strength
                        + 0.8 * c.relevance
                        + 0.6 * c.recency
                        + 0.6 * c.keyword_sim
                        + 0.4 * c.author_sim
                }
                WeightPolicy::Citations => {
                    1.5 * c.citation_strength + 0.5 * c.relevance + 0.3 * c.keyword_sim
                }
                WeightPolicy::Recency => {
                    1.2 * c.recency + 0.8 * c.relevance + 0.4 * c.citation_strength
                }
                WeightPolicy::Keywords => {
                    1.5 * c.keyword_sim + 0.8 * c.author_sim + 0.5 * c.relevance
                }
            };

        // Context hints apply regardless of policy
        let context_boost = context.map(|ctx| compute_context_boost(ctx, a, b)).unwrap_or(0.0);
        weight += context_boost;

        let similarity_score = ((c.citation_strength
            + c.relevance
            + c.keyword_sim
            + c.author_sim
            + c.recency)
            / 5.0)
            .clamp(0.0, 1.0);

        EdgeScore {
            weight: weight.clamp(MIN_EDGE_WEIGHT, MAX_EDGE_WEIGHT),
            metadata: EdgeMetadata {
                shared_keywords: literal_intersection(&a.fields_of_study, &b.fields_of_study),
                shared_authors: literal_intersection(
                    &a.author_list().iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                    &b.author_list().iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                ),
                similarity_score,
                context_boost,
            },
        }
    }
}

fn compute_components(a: &PaperRecord, b: &PaperRecord) -> Components {
    let (cit_a, cit_b) = (a.citation_count as f64, b.citation_count as f64);
    let citation_strength = cit_a.min(cit_b) / cit_a.max(cit_b).max(1.0);

    let relevance = (a.relevance_score + b.relevance_score) / 2.0;

    let recency = match (a.year, b.year) {
        (Some(ya), Some(yb)) => {
            (1.0 - (ya - yb).abs() as f64 / RECENCY_HORIZON_YEARS).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };

    let keyword_sim = jaccard(
        a.fields_of_study.iter().map(String::as_str),
        b.fields_of_study.iter().map(String::as_str),
    );

    let author_sim = jaccard(a.author_list().into_iter(), b.author_list().into_iter());

    Components {
        citation_strength,
        relevance,
        recency,
        keyword_sim,
        author_sim,
    }
}

fn compute_context_boost(ctx: &ScoreContext, a: &PaperRecord, b: &PaperRecord) -> f64 {
    let mut boost = 0.0;

    if !ctx.keywords.is_empty() {
        boost += 0.5
            * jaccard(
                ctx.keywords.iter().map(String::as_str),
                a.fields_of_study.iter().map(String::as_str),
            );
        boost += 0.5
            * jaccard(
                ctx.keywords.iter().map(String::as_str),
                b.fields_of_study.iter().map(String::as_str),
            );
    }

    if !ctx.authors.is_empty() {
        boost += 0.5
            * jaccard(
                ctx.authors.iter().map(String::as_str),
                a.author_list().into_iter(),
            );
        boost += 0.5
            * jaccard(
                ctx.authors.iter().map(String::as_str),
                b.author_list().into_iter(),
            );
    }

    boost
}

/// Case-insensitive Jaccard set overlap; 0 when both sides are empty
fn jaccard<'a, 'b>(
    a: impl Iterator<Item = &'a str>,
    b: impl Iterator<Item = &'b str>,
) -> f64 {
    let set_a: HashSet<String> = a
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    let set_b: HashSet<String> = b
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Values of `a` also present in `b` (case-insensitive), kept in `a`'s
/// original casing and order, for display
fn literal_intersection(a: &[String], b: &[String]) -> Vec<String> {
    let lowered_b: HashSet<String> = b.iter().map(|s| s.trim().to_lowercase()).collect();
    let mut seen = HashSet::new();
    a.iter()
        .filter(|v| lowered_b.contains(&v.trim().to_lowercase()))
        .filter(|v| seen.insert(v.trim().to_lowercase()))
        .map(|v| v.trim().to_string())
        .collect()
}
