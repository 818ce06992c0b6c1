use serde::{Deserialize, Serialize};

use super::defaults;

/// Obligation graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObligationConfig {
    /// Hops materialized by `build_graph` when the caller does not ask for more.
    pub default_graph_depth: usize,
    /// Node budget for a single graph materialization.
    pub max_graph_nodes: usize,
}

impl Default for ObligationConfig {
    fn default() -> Self {
        Self {
            default_graph_depth: defaults::DEFAULT_GRAPH_DEPTH,
            max_graph_nodes: defaults::DEFAULT_MAX_GRAPH_NODES,
        }
    }
}
