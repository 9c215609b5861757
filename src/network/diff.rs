//! Incremental reconstruction of the social network from per-timestep diffs.
//!
//! A diff file holds an initial snapshot and one record per timestep:
//!
//! ```json
//! {
//!   "initial": {"nodes": [1, 2, 3], "edges": [[1, 2], [2, 3, 4.0]]},
//!   "diffs": [
//!     {"nodes_add": [4], "nodes_remove": [1], "edges_add": [[3, 4]], "edges_increment": [[2, 3, 1.0]]}
//!   ]
//! }
//! ```
//!
//! `G(t) = apply(G(t-1), D(t))`. Records are applied exactly once and in order.
//! A record that does not parse is skipped and the graph carries over unchanged.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use super::graph::{Graph, NodeId};
use crate::data::{open_or_missing, LoadError};
use crate::logging::log_skipped_diff;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

impl RawId {
    fn into_id(self) -> NodeId {
        match self {
            RawId::Int(i) => i.to_string(),
            RawId::Str(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum RawEdge {
    Weighted(RawId, RawId, f64),
    Plain(RawId, RawId),
    Object {
        source: RawId,
        target: RawId,
        #[serde(default)]
        weight: Option<f64>,
    },
}

impl RawEdge {
    fn into_parts(self) -> (NodeId, NodeId, Option<f64>) {
        match self {
            RawEdge::Weighted(a, b, w) => (a.into_id(), b.into_id(), Some(w)),
            RawEdge::Plain(a, b) => (a.into_id(), b.into_id(), None),
            RawEdge::Object { source, target, weight } => (source.into_id(), target.into_id(), weight),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    nodes: Vec<RawId>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawRecord {
    #[serde(default, alias = "add_nodes")]
    nodes_add: Vec<RawId>,
    #[serde(default, alias = "remove_nodes")]
    nodes_remove: Vec<RawId>,
    #[serde(default, alias = "add_edges")]
    edges_add: Vec<RawEdge>,
    #[serde(default, alias = "increment_edges")]
    edges_increment: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawDiffFile {
    #[serde(default)]
    initial: RawSnapshot,
    #[serde(default)]
    diffs: Vec<Value>,
}

/// Graph mutations for one timestep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffRecord {
    pub nodes_add: Vec<NodeId>,
    pub nodes_remove: Vec<NodeId>,
    pub edges_add: Vec<(NodeId, NodeId)>,
    pub edges_increment: Vec<(NodeId, NodeId, f64)>,
}

impl DiffRecord {
    fn from_raw(raw: RawRecord) -> Self {
        Self {
            nodes_add: raw.nodes_add.into_iter().map(RawId::into_id).collect(),
            nodes_remove: raw.nodes_remove.into_iter().map(RawId::into_id).collect(),
            edges_add: raw
                .edges_add
                .into_iter()
                .map(|e| {
                    let (a, b, _) = e.into_parts();
                    (a, b)
                })
                .collect(),
            edges_increment: raw
                .edges_increment
                .into_iter()
                .map(|e| {
                    let (a, b, w) = e.into_parts();
                    (a, b, w.unwrap_or(1.0))
                })
                .collect(),
        }
    }

    /// Nodes first, then removals (dropping incident edges), then new edges
    /// at unit weight, then weight increments.
    pub fn apply(&self, graph: &mut Graph) {
        for n in &self.nodes_add {
            graph.add_node(n);
        }
        for n in &self.nodes_remove {
            graph.remove_node(n);
        }
        for (a, b) in &self.edges_add {
            graph.add_edge(a, b);
        }
        for (a, b, w) in &self.edges_increment {
            graph.increment_edge(a, b, *w);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkDiff {
    pub initial: Graph,
    /// `None` marks a record that could not be parsed.
    pub records: Vec<Option<DiffRecord>>,
}

impl NetworkDiff {
    pub fn from_json(text: &str) -> Result<Self, String> {
        let raw: RawDiffFile = serde_json::from_str(text).map_err(|e| e.to_string())?;

        let mut initial = Graph::new();
        for n in raw.initial.nodes {
            initial.add_node(&n.into_id());
        }
        for e in raw.initial.edges {
            let (a, b, w) = e.into_parts();
            initial.set_edge(&a, &b, w.unwrap_or(1.0));
        }

        let records = raw
            .diffs
            .into_iter()
            .enumerate()
            .map(|(i, value)| match serde_json::from_value::<RawRecord>(value) {
                Ok(r) => Some(DiffRecord::from_raw(r)),
                Err(err) => {
                    log_skipped_diff(i, &err.to_string());
                    None
                }
            })
            .collect();

        Ok(Self { initial, records })
    }

    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let mut file = open_or_missing(path)?;
        let mut text = String::new();
        std::io::Read::read_to_string(&mut file, &mut text)
            .map_err(|e| LoadError::malformed(path, e.to_string()))?;
        Self::from_json(&text).map_err(|msg| LoadError::malformed(path, msg))
    }

    pub fn skipped(&self) -> usize {
        self.records.iter().filter(|r| r.is_none()).count()
    }

    /// Graphs for timesteps `0..duration`; index `t` is `G(t)`.
    pub fn snapshots(&self, duration: usize) -> Vec<Graph> {
        let mut replay = Replay::new(self);
        let mut out = Vec::with_capacity(duration);
        for t in 0..duration {
            out.push(replay.graph_at(t).clone());
        }
        out
    }
}

/// Stateful cursor over a diff file.
#[derive(Debug, Clone)]
pub struct Replay<'a> {
    diff: &'a NetworkDiff,
    graph: Graph,
    timestep: usize,
}

impl<'a> Replay<'a> {
    pub fn new(diff: &'a NetworkDiff) -> Self {
        Self {
            diff,
            graph: diff.initial.clone(),
            timestep: 0,
        }
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Applies the record for the next timestep. Past the last record the
    /// graph stays as it is.
    pub fn advance(&mut self) {
        if let Some(Some(record)) = self.diff.records.get(self.timestep) {
            record.apply(&mut self.graph);
        }
        self.timestep += 1;
    }

    /// Graph at timestep `t`. Moving backwards restarts from the initial snapshot.
    pub fn graph_at(&mut self, t: usize) -> &Graph {
        if t < self.timestep {
            self.graph = self.diff.initial.clone();
            self.timestep = 0;
        }
        while self.timestep < t {
            self.advance();
        }
        &self.graph
    }
}
