//! Bounded breadth-first traversal around one obligation.

use std::collections::{HashSet, VecDeque};

use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;

use covenant_core::models::NodeRelation;

use super::indexed::{DependencyEdge, IndexedGraph};

#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Hops from the root in either direction.
    pub max_depth: usize,
    /// Node budget, root included.
    pub max_nodes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reached {
    pub obligation_id: String,
    pub depth: usize,
    pub relation: NodeRelation,
}

#[derive(Debug, Clone)]
pub struct Neighborhood {
    /// Root first, then breadth-first order.
    pub nodes: Vec<Reached>,
    /// Edges whose endpoints were both reached, as (obligation, depends_on, weight).
    pub edges: Vec<(String, String, DependencyEdge)>,
    pub max_depth_reached: usize,
    pub truncated: bool,
}

/// Walk upstream (dependencies) and downstream (dependents) from `root_id`
/// at the same time, level by level.
pub fn neighborhood(graph: &IndexedGraph, root_id: &str, config: &TraversalConfig) -> Neighborhood {
    let mut result = Neighborhood {
        nodes: vec![Reached {
            obligation_id: root_id.to_string(),
            depth: 0,
            relation: NodeRelation::Root,
        }],
        edges: Vec::new(),
        max_depth_reached: 0,
        truncated: false,
    };
    let Some(root) = graph.get_node(root_id) else {
        return result;
    };

    let mut visited: HashSet<NodeIndex> = HashSet::from([root]);
    let mut queue: VecDeque<(NodeIndex, usize, Direction)> = VecDeque::from([
        (root, 0, Direction::Outgoing),
        (root, 0, Direction::Incoming),
    ]);

    'walk: while let Some((node, depth, direction)) = queue.pop_front() {
        if depth >= config.max_depth {
            continue;
        }
        for next in graph.graph.neighbors_directed(node, direction) {
            if visited.contains(&next) {
                continue;
            }
            if result.nodes.len() >= config.max_nodes {
                result.truncated = true;
                break 'walk;
            }
            visited.insert(next);
            result.nodes.push(Reached {
                obligation_id: graph.id_of(next).to_string(),
                depth: depth + 1,
                relation: match direction {
                    Direction::Outgoing => NodeRelation::Dependency,
                    Direction::Incoming => NodeRelation::Dependent,
                },
            });
            result.max_depth_reached = result.max_depth_reached.max(depth + 1);
            queue.push_back((next, depth + 1, direction));
        }
    }

    for edge in graph.graph.edge_references() {
        if visited.contains(&edge.source()) && visited.contains(&edge.target()) {
            result.edges.push((
                graph.id_of(edge.source()).to_string(),
                graph.id_of(edge.target()).to_string(),
                *edge.weight(),
            ));
        }
    }
    result
}
