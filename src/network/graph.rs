use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub type NodeId = String;

/// Undirected weighted graph with deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    nodes: BTreeSet<NodeId>,
    edges: BTreeMap<(NodeId, NodeId), f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
}

fn key(a: &str, b: &str) -> (NodeId, NodeId) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().map(|((a, b), w)| Edge {
            source: a.clone(),
            target: b.clone(),
            weight: *w,
        })
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn add_node(&mut self, id: &str) {
        if !self.nodes.contains(id) {
            self.nodes.insert(id.to_string());
        }
    }

    /// Removes the node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if !self.nodes.remove(id) {
            return false;
        }
        self.edges.retain(|(a, b), _| a != id && b != id);
        true
    }

    /// Inserts an edge with unit weight, creating missing endpoints.
    /// An existing edge is reset to unit weight.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        self.set_edge(a, b, 1.0);
    }

    pub fn set_edge(&mut self, a: &str, b: &str, weight: f64) {
        self.add_node(a);
        self.add_node(b);
        self.edges.insert(key(a, b), weight);
    }

    /// Adds `by` to the edge weight, creating the edge with weight `by` if absent.
    pub fn increment_edge(&mut self, a: &str, b: &str, by: f64) {
        self.add_node(a);
        self.add_node(b);
        *self.edges.entry(key(a, b)).or_insert(0.0) += by;
    }

    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        self.edges.get(&key(a, b)).copied()
    }

    pub fn neighbors(&self, id: &str) -> Vec<&NodeId> {
        self.edges
            .keys()
            .filter_map(|(a, b)| {
                if a == id {
                    Some(b)
                } else if b == id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn degree(&self, id: &str) -> usize {
        self.neighbors(id).len()
    }
}
