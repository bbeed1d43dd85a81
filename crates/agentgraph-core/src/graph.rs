//! Cycle detection over id-keyed directed graphs.
//!
//! Used for both the agent hierarchy (agent -> parent) and the chat
//! prerequisite graph (chat -> prerequisite). Nodes are visited in the order
//! given so results are deterministic.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// An edge that closes a cycle during depth-first traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackEdge {
    pub from: String,
    pub to: String,
    /// The cycle as a path, starting and ending at `to`.
    pub cycle: Vec<String>,
}

/// Three-colour DFS returning every back edge found.
///
/// Successors that are not listed in `nodes` are ignored; dangling
/// references are reported elsewhere.
pub fn find_back_edges<'a>(nodes: &[&'a str], edges: &HashMap<&'a str, Vec<&'a str>>) -> Vec<BackEdge> {
    let mut marks: HashMap<&'a str, Mark> = nodes.iter().map(|n| (*n, Mark::Unvisited)).collect();
    let mut path = Vec::new();
    let mut found = Vec::new();

    for node in nodes {
        if marks.get(*node) == Some(&Mark::Unvisited) {
            visit(*node, edges, &mut marks, &mut path, &mut found);
        }
    }
    found
}

fn visit<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    found: &mut Vec<BackEdge>,
) {
    marks.insert(node, Mark::InProgress);
    path.push(node);

    if let Some(successors) = edges.get(node) {
        for &succ in successors {
            match marks.get(succ).copied() {
                Some(Mark::Unvisited) => visit(succ, edges, marks, path, found),
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|n| *n == succ).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(succ.to_string());
                    found.push(BackEdge {
                        from: node.to_string(),
                        to: succ.to_string(),
                        cycle,
                    });
                }
                Some(Mark::Done) | None => {}
            }
        }
    }

    path.pop();
    marks.insert(node, Mark::Done);
}
