use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ObligationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DependencyType {
    /// The upstream obligation must complete first.
    Prerequisite,
    /// The obligations run back to back.
    Sequential,
    /// The dependent only applies if the upstream obligation is met.
    Conditional,
    Related,
}

text_enum!(DependencyType {
    Prerequisite => "prerequisite",
    Sequential => "sequential",
    Conditional => "conditional",
    Related => "related",
});

/// Directed edge: `obligation_id` depends on `depends_on_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ObligationDependency {
    pub id: String,
    pub enterprise_id: String,
    pub obligation_id: String,
    pub depends_on_id: String,
    pub dependency_type: DependencyType,
    pub cascade_on_delay: bool,
    pub created_at: DateTime<Utc>,
}

/// How a graph node relates to the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NodeRelation {
    Root,
    /// Reached by following depends-on edges (upstream).
    Dependency,
    /// Reached by following depended-on-by edges (downstream).
    Dependent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GraphNode {
    pub obligation_id: String,
    pub title: String,
    pub status: ObligationStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// 0 for the root, 1 for direct neighbours.
    pub depth: usize,
    pub relation: NodeRelation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GraphEdge {
    pub obligation_id: String,
    pub depends_on_id: String,
    pub dependency_type: DependencyType,
    pub cascade_on_delay: bool,
}

/// The dependency neighbourhood of one obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DependencyGraph {
    pub root_id: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub max_depth_reached: usize,
    /// True when the node budget cut the traversal short.
    pub truncated: bool,
}
