//! Deterministic execution order over the chat prerequisite graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use agentgraph_core::graph::find_back_edges;
use agentgraph_core::Flow;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// Chat ids, every prerequisite before its dependants.
    pub ordered: Vec<String>,
    /// Prerequisite edges `(prerequisite, dependant)` left out because they
    /// close a cycle.
    pub excluded_edges: Vec<(String, String)>,
}

/// Topologically order the chats of `flow`.
///
/// Ties are broken by `order`, then by position in the flow. Unknown
/// prerequisites are ignored. Every chat appears exactly once.
pub fn execution_order(flow: &Flow) -> ExecutionPlan {
    let position: HashMap<&str, usize> = flow
        .chats
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for chat in &flow.chats {
        for prereq in &chat.prerequisites {
            if position.contains_key(prereq.as_str()) {
                edges.entry(prereq.as_str()).or_default().push(chat.id.as_str());
            }
        }
    }

    let ids: Vec<&str> = flow.chats.iter().map(|c| c.id.as_str()).collect();
    let back_edges = find_back_edges(&ids, &edges);
    for back in &back_edges {
        if let Some(successors) = edges.get_mut(back.from.as_str()) {
            successors.retain(|s| *s != back.to);
        }
    }

    let mut indegree: Vec<usize> = vec![0; flow.chats.len()];
    for successors in edges.values() {
        for succ in successors {
            indegree[position[succ]] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<(i64, usize)>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse((flow.chats[i].order, i)))
        .collect();

    let mut ordered = Vec::with_capacity(flow.chats.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        let id = flow.chats[i].id.as_str();
        ordered.push(id.to_string());
        for succ in edges.get(id).into_iter().flatten() {
            let j = position[succ];
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.push(Reverse((flow.chats[j].order, j)));
            }
        }
    }

    ExecutionPlan {
        ordered,
        excluded_edges: back_edges.into_iter().map(|b| (b.from, b.to)).collect(),
    }
}
