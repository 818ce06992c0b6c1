use std::collections::{HashSet, VecDeque};

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::indexed::IndexedGraph;

/// Dependents reached from `obligation_id` through edges flagged
/// `cascade_on_delay`, transitively, in breadth-first order.
///
/// Edges without the flag are not followed.
pub fn cascade_targets(graph: &IndexedGraph, obligation_id: &str) -> Vec<String> {
    let Some(start) = graph.get_node(obligation_id) else {
        return Vec::new();
    };

    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut targets = Vec::new();

    while let Some(node) = queue.pop_front() {
        for edge in graph.graph.edges_directed(node, Direction::Incoming) {
            if !edge.weight().cascade_on_delay {
                continue;
            }
            let dependent = edge.source();
            if seen.insert(dependent) {
                targets.push(graph.id_of(dependent).to_string());
                queue.push_back(dependent);
            }
        }
    }
    targets
}
