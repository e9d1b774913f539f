//! Parent/child expansion relationships
//!
//! Expanding a node surfaces related papers; the parent/child facts are
//! stored here so reloading a graph in a later request reproduces the
//! same children and edges. Merges are idempotent because expansion
//! requests may be retried by the caller, and each parent is capped at
//! [`citegraph_common::MAX_CHILDREN_PER_PARENT`] stored children.
//!
//! Keys are normalized paper ids. Entries imported from durable state
//! written before normalization existed may still carry prefixed keys;
//! lookups fall back to a linear scan over those (a compatibility shim,
//! not the primary contract) and writes migrate them to normalized
//! keys.

use citegraph_common::ident;
use citegraph_common::models::{
    ChildRef, EdgeKind, EdgeMetadata, Graph, GraphEdge, GraphNode, NodeRole, RelationshipEntry,
    StoreOutcome,
};
use citegraph_common::MAX_CHILDREN_PER_PARENT;
use std::collections::HashMap;
use tracing::debug;

/// Expansion relationship map for one session
#[derive(Debug, Clone)]
pub struct RelationshipStore {
    entries: HashMap<String, RelationshipEntry>,
    max_children: usize,
}

impl Default for RelationshipStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            max_children: MAX_CHILDREN_PER_PARENT,
        }
    }

    /// Rehydrate from a persisted relationship map. Keys are preserved
    /// verbatim; legacy prefixed keys stay readable through the
    /// fallback lookup.
    pub fn from_map(map: HashMap<String, RelationshipEntry>) -> Self {
        Self {
            entries: map,
            max_children: MAX_CHILDREN_PER_PARENT,
        }
    }

    /// Snapshot for the collaborator that owns durable session state
    pub fn to_map(&self) -> HashMap<String, RelationshipEntry> {
        self.entries.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge children under a parent.
    ///
    /// Ids are normalized, children already present are dropped, and
    /// additions stop once the parent holds `max_children`. Calling
    /// twice with identical input is a no-op on the second call.
    /// Unknown parents create a new entry.
    pub fn store_children(&mut self, parent_id: &str, children: &[ChildRef]) -> StoreOutcome {
        let parent = ident::normalize(parent_id);

        // Migrate a legacy-keyed entry to its normalized key on first
        // write so subsequent lookups hit the primary index
        if !self.entries.contains_key(&parent) {
            if let Some(legacy_key) = self.find_legacy_key(&parent) {
                debug!(parent_id = %parent, legacy_key = %legacy_key, "migrating legacy relationship key");
                if let Some(entry) = self.entries.remove(&legacy_key) {
                    self.entries.insert(parent.clone(), entry);
                }
            }
        }

        let entry = self.entries.entry(parent.clone()).or_default();
        let mut added = 0;

        for child in children {
            if entry.child_papers.len() >= self.max_children {
                break;
            }
            let child_id = ident::normalize(&child.id);
            let exists = entry
                .child_papers
                .iter()
                .any(|c| ident::normalize(&c.id) == child_id);
            if exists {
                continue;
            }
            entry.child_papers.push(ChildRef {
                id: child_id,
                title: child.title.clone(),
                source_parent_id: parent.clone(),
                paper: child.paper.clone(),
            });
            added += 1;
        }

        let outcome = StoreOutcome {
            added_count: added,
            total_children: entry.child_papers.len(),
        };
        debug!(
            parent_id = %parent,
            added = outcome.added_count,
            total = outcome.total_children,
            "stored expansion children"
        );
        outcome
    }

    /// Children stored under a parent; empty when the parent is
    /// unknown.
    ///
    /// Two-tier lookup: the primary index by normalized id, then the
    /// legacy-key scan.
    pub fn get_children(&self, parent_id: &str) -> Vec<ChildRef> {
        let parent = ident::normalize(parent_id);
        if let Some(entry) = self.entries.get(&parent) {
            return entry.child_papers.clone();
        }
        if let Some(legacy_key) = self.find_legacy_key(&parent) {
            return self.entries[&legacy_key].child_papers.clone();
        }
        Vec::new()
    }

    /// First stored key whose normalization matches `normalized`
    /// (compatibility shim for pre-normalization durable state)
    fn find_legacy_key(&self, normalized: &str) -> Option<String> {
        self.entries
            .keys()
            .find(|key| ident::normalize(key) == normalized)
            .cloned()
    }

    /// Re-apply stored expansions to a freshly built graph.
    ///
    /// For every parent present as a node, missing children become stub
    /// nodes (id + title only; the full record is not guaranteed to be
    /// cached) and a parent-to-child edge is added when the normalized
    /// source/target pair is absent.
    pub fn restore_into_graph(&self, graph: &mut Graph) {
        let parent_ids: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();

        for parent_id in parent_ids {
            for child in self.get_children(&parent_id) {
                if !graph.has_node(&child.id) {
                    graph.nodes.push(GraphNode {
                        id: child.id.clone(),
                        title: child.title.clone(),
                        role: NodeRole::Candidate,
                        weight: 1.0,
                        paper: child.paper.clone(),
                    });
                }
                if !graph.has_edge(&parent_id, &child.id) {
                    graph.edges.push(GraphEdge {
                        source: parent_id.clone(),
                        target: child.id.clone(),
                        kind: EdgeKind::RootLink,
                        weight: 1.0,
                        metadata: EdgeMetadata::default(),
                    });
                }
            }
        }

        graph.refresh_stats();
    }
}
