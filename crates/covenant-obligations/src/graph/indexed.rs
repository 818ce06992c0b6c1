//! petgraph::StableGraph wrapper keyed by obligation id.
//!
//! Edges point from an obligation to the obligation it depends on, so
//! outgoing edges lead upstream and incoming edges lead to dependents.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Directed;
use serde::{Deserialize, Serialize};

use covenant_core::models::{DependencyType, ObligationDependency};

/// Weight on a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub dependency_type: DependencyType,
    pub cascade_on_delay: bool,
}

pub type DependencyStableGraph = StableGraph<String, DependencyEdge, Directed>;

pub struct IndexedGraph {
    pub graph: DependencyStableGraph,
    /// obligation_id → NodeIndex for O(1) lookup.
    pub node_index: HashMap<String, NodeIndex>,
}

impl IndexedGraph {
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            node_index: HashMap::new(),
        }
    }

    /// Build the graph of one enterprise from its stored edges.
    pub fn from_dependencies(dependencies: &[ObligationDependency]) -> Self {
        let mut indexed = Self::new();
        for dep in dependencies {
            indexed.add_edge(
                &dep.obligation_id,
                &dep.depends_on_id,
                DependencyEdge {
                    dependency_type: dep.dependency_type,
                    cascade_on_delay: dep.cascade_on_delay,
                },
            );
        }
        indexed
    }

    pub fn ensure_node(&mut self, obligation_id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(obligation_id) {
            return idx;
        }
        let idx = self.graph.add_node(obligation_id.to_string());
        self.node_index.insert(obligation_id.to_string(), idx);
        idx
    }

    pub fn get_node(&self, obligation_id: &str) -> Option<NodeIndex> {
        self.node_index.get(obligation_id).copied()
    }

    /// Add `obligation_id → depends_on_id` without any cycle check.
    pub fn add_edge(&mut self, obligation_id: &str, depends_on_id: &str, edge: DependencyEdge) {
        let from = self.ensure_node(obligation_id);
        let to = self.ensure_node(depends_on_id);
        self.graph.add_edge(from, to, edge);
    }

    pub fn id_of(&self, idx: NodeIndex) -> &str {
        self.graph.node_weight(idx).map(String::as_str).unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for IndexedGraph {
    fn default() -> Self {
        Self::new()
    }
}
