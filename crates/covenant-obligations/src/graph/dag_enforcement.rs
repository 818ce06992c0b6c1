//! Cycle detection before every edge insertion.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;

use super::indexed::IndexedGraph;

/// The cycle that adding `obligation_id → depends_on_id` would close, as the
/// id sequence `obligation_id, depends_on_id, ..., obligation_id`.
///
/// `None` when the edge is safe. A self-dependency is the cycle `[a, a]`.
pub fn would_create_cycle(
    graph: &IndexedGraph,
    obligation_id: &str,
    depends_on_id: &str,
) -> Option<Vec<String>> {
    if obligation_id == depends_on_id {
        return Some(vec![obligation_id.to_string(), depends_on_id.to_string()]);
    }
    let from = graph.get_node(depends_on_id)?;
    let to = graph.get_node(obligation_id)?;

    let upstream = shortest_path(graph, from, to)?;
    let mut cycle = Vec::with_capacity(upstream.len() + 1);
    cycle.push(obligation_id.to_string());
    cycle.extend(upstream.into_iter().map(|idx| graph.id_of(idx).to_string()));
    Some(cycle)
}

/// BFS along depends-on edges; the returned path includes both ends.
fn shortest_path(graph: &IndexedGraph, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    let mut seen = HashSet::from([from]);

    while let Some(node) = queue.pop_front() {
        if node == to {
            let mut path = vec![to];
            let mut cursor = to;
            while let Some(&prev) = parent.get(&cursor) {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }
        for next in graph.graph.neighbors_directed(node, Direction::Outgoing) {
            if seen.insert(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}

/// Render a cycle as `A -> B -> A`.
pub fn format_path(path: &[String]) -> String {
    path.join(" -> ")
}

/// Strongly connected components with more than one node. Empty for a DAG.
pub fn find_cycles(graph: &IndexedGraph) -> Vec<Vec<String>> {
    tarjan_scc(&graph.graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| scc.into_iter().map(|idx| graph.id_of(idx).to_string()).collect())
        .collect()
}
