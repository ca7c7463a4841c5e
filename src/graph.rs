//! An undirected graph with stable integer node ids and integer edge weights.
//!
//! Node ids are chosen by the caller and may be sparse. Edges are keyed by
//! the ordered pair `(min(u, v), max(u, v))`; self-loops are not allowed.
//! Every node and edge carries a typed data record.
//!
//! # Example
//!
//! ```
//! use haplotype_network::graph::Graph;
//!
//! let mut g = Graph::new();
//! g.add_weighted_edge(1, 5, 3);
//! g.add_weighted_edge(5, 9, 4);
//! assert!(g.has_edge(5, 1));
//! assert_eq!(g.shortest_path_length(1, 9, None, None), Some(7));
//! assert_eq!(g.next_free_id(), 10);
//! ```

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::dijkstra;
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::{Dfs, EdgeFiltered, EdgeRef, VisitMap};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::sequence::Sequence;

pub type NodeId = usize;
pub type Weight = i64;

/// Weight used for edges that carry none when computing path lengths.
pub const UNWEIGHTED: Weight = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge ({u}, {v}) does not exist")]
    MissingEdge { u: NodeId, v: NodeId },
}

/// Canonical key of an undirected edge.
pub fn edge_key(u: NodeId, v: NodeId) -> (NodeId, NodeId) {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

/// Data attached to a node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeData {
    /// Sorted 1-based ids of the original taxa this node stands for. Empty
    /// for inferred nodes.
    pub taxa: Vec<usize>,
    /// Display label built from the taxon names.
    pub label: Option<String>,
    /// Inferred (or observed) unambiguous sequence.
    pub sequence: Option<Sequence>,
}

impl NodeData {
    pub fn is_taxon(&self) -> bool {
        !self.taxa.is_empty()
    }
}

/// Data attached to an edge.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeData {
    pub weight: Option<Weight>,
    /// 0-based sites at which the sequences of the endpoints differ.
    pub sites: Vec<usize>,
}

impl EdgeData {
    /// Length used in path computations.
    pub fn length(&self) -> Weight {
        self.weight.unwrap_or(UNWEIGHTED)
    }
}

/// Undirected weighted graph.
///
/// Topology and edge data live in a `petgraph` graph map keyed by node id;
/// node data is kept alongside, ordered by id.
#[derive(Debug, Clone)]
pub struct Graph {
    graph: UnGraphMap<NodeId, EdgeData>,
    data: BTreeMap<NodeId, NodeData>,
}

impl Default for Graph {
    fn default() -> Self {
        Graph {
            graph: UnGraphMap::new(),
            data: BTreeMap::new(),
        }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.data.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add a node if it is not present yet. Returns `true` if it was added.
    pub fn add_node(&mut self, id: NodeId) -> bool {
        if self.data.contains_key(&id) {
            return false;
        }
        self.data.insert(id, NodeData::default());
        self.graph.add_node(id);
        true
    }

    /// Add a node with data, replacing the data of an existing node.
    pub fn add_node_with(&mut self, id: NodeId, data: NodeData) {
        self.graph.add_node(id);
        self.data.insert(id, data);
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.data.contains_key(&id)
    }

    /// Remove a node together with all incident edges.
    pub fn remove_node(&mut self, id: NodeId) -> Option<NodeData> {
        let data = self.data.remove(&id)?;
        self.graph.remove_node(id);
        Some(data)
    }

    /// Node ids in increasing order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.data.keys().copied()
    }

    /// Smallest id larger than every id in use.
    pub fn next_free_id(&self) -> NodeId {
        self.data.keys().next_back().map_or(0, |&id| id + 1)
    }

    pub fn node_data(&self, id: NodeId) -> Option<&NodeData> {
        self.data.get(&id)
    }

    pub fn node_data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.data.get_mut(&id)
    }

    pub fn is_taxon(&self, id: NodeId) -> bool {
        self.node_data(id).map_or(false, NodeData::is_taxon)
    }

    /// Add an unweighted edge, creating missing endpoints. Returns `true` if
    /// the edge is new.
    ///
    /// # Panics
    ///
    /// Panics if `u == v`.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        if self.has_edge(u, v) {
            return false;
        }
        self.add_edge_with(u, v, EdgeData::default());
        true
    }

    /// Add an edge with data, creating missing endpoints and replacing the
    /// data of an existing edge.
    ///
    /// # Panics
    ///
    /// Panics if `u == v`.
    pub fn add_edge_with(&mut self, u: NodeId, v: NodeId, data: EdgeData) {
        assert!(u != v, "self-loop on node {}", u);
        self.add_node(u);
        self.add_node(v);
        self.graph.add_edge(u, v, data);
    }

    /// Add an edge with a weight, overwriting the weight of an existing edge.
    pub fn add_weighted_edge(&mut self, u: NodeId, v: NodeId, weight: Weight) {
        self.add_edge(u, v);
        if let Some(e) = self.graph.edge_weight_mut(u, v) {
            e.weight = Some(weight);
        }
    }

    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) -> Option<EdgeData> {
        self.graph.remove_edge(u, v)
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.graph.contains_edge(u, v)
    }

    pub fn weight(&self, u: NodeId, v: NodeId) -> Option<Weight> {
        self.edge_data(u, v).and_then(|e| e.weight)
    }

    /// Set the weight of an existing edge.
    pub fn set_weight(&mut self, u: NodeId, v: NodeId, weight: Weight) -> Result<(), GraphError> {
        match self.edge_data_mut(u, v) {
            Some(e) => {
                e.weight = Some(weight);
                Ok(())
            }
            None => Err(GraphError::MissingEdge { u, v }),
        }
    }

    pub fn edge_data(&self, u: NodeId, v: NodeId) -> Option<&EdgeData> {
        self.graph.edge_weight(u, v)
    }

    pub fn edge_data_mut(&mut self, u: NodeId, v: NodeId) -> Option<&mut EdgeData> {
        self.graph.edge_weight_mut(u, v)
    }

    /// Edges as `(u, v, data)` with `u < v`, in key order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &EdgeData)> + '_ {
        let mut edges: Vec<(NodeId, NodeId, &EdgeData)> = self
            .graph
            .all_edges()
            .map(|(a, b, e)| {
                let (u, v) = edge_key(a, b);
                (u, v, e)
            })
            .collect();
        edges.sort_unstable_by_key(|&(u, v, _)| (u, v));
        edges.into_iter()
    }

    /// Edge keys in key order.
    pub fn edge_keys(&self) -> Vec<(NodeId, NodeId)> {
        self.edges().map(|(u, v, _)| (u, v)).collect()
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.graph.neighbors(id).count()
    }

    /// Neighbors of `id` in unspecified order.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors(id)
    }

    /// Neighbors of `id` in increasing order.
    pub fn sorted_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ns: Vec<NodeId> = self.neighbors(id).collect();
        ns.sort_unstable();
        ns
    }

    /// Sum of all edge weights.
    pub fn total_weight(&self) -> Weight {
        self.graph.all_edges().map(|(_, _, e)| e.length()).sum()
    }

    /// Connected components, each sorted, ordered by their smallest node.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut components = Vec::new();
        let mut dfs = Dfs::empty(&self.graph);
        for start in self.nodes() {
            if dfs.discovered.is_visited(&start) {
                continue;
            }
            dfs.move_to(start);
            let mut component = Vec::new();
            while let Some(n) = dfs.next(&self.graph) {
                component.push(n);
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Length of a shortest path from `source` to `target`.
    ///
    /// The edge `excluded` (in either orientation) is never traversed. With a
    /// `bound`, `None` is returned if no path of length at most `bound`
    /// exists.
    pub fn shortest_path_length(
        &self,
        source: NodeId,
        target: NodeId,
        excluded: Option<(NodeId, NodeId)>,
        bound: Option<Weight>,
    ) -> Option<Weight> {
        if !self.contains_node(source) || !self.contains_node(target) {
            return None;
        }
        let excluded = excluded.map(|(u, v)| edge_key(u, v));
        let view = EdgeFiltered(&self.graph, |e: (NodeId, NodeId, &EdgeData)| {
            Some(edge_key(e.0, e.1)) != excluded
        });
        let dist = dijkstra(&view, source, Some(target), |e| e.weight().length());
        dist.get(&target)
            .copied()
            .filter(|&d| bound.map_or(true, |b| d <= b))
    }

    /// Shortest path lengths from `source` to every reachable node.
    pub fn distances_from(&self, source: NodeId) -> HashMap<NodeId, Weight> {
        if !self.contains_node(source) {
            return HashMap::new();
        }
        dijkstra(&self.graph, source, None, |e| e.weight().length())
    }
}

/// Flat node and edge lists used as the serialized form of a [`Graph`].
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct GraphRecord {
    nodes: Vec<(NodeId, NodeData)>,
    edges: Vec<(NodeId, NodeId, EdgeData)>,
}

#[cfg(feature = "serde")]
impl Serialize for Graph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GraphRecord {
            nodes: self
                .data
                .iter()
                .map(|(&id, d)| (id, d.clone()))
                .collect(),
            edges: self.edges().map(|(u, v, e)| (u, v, e.clone())).collect(),
        }
        .serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Graph {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = GraphRecord::deserialize(deserializer)?;
        let mut graph = Graph::new();
        for (id, data) in record.nodes {
            graph.add_node_with(id, data);
        }
        for (u, v, data) in record.edges {
            if u == v {
                return Err(serde::de::Error::custom(format!("self-loop on node {}", u)));
            }
            graph.add_edge_with(u, v, data);
        }
        Ok(graph)
    }
}
