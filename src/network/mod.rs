pub mod adjlist;
pub mod diff;
pub mod graph;

pub use diff::{DiffRecord, NetworkDiff, Replay};
pub use graph::{Edge, Graph, NodeId};
