// Copyright 2026 The haplotype-network developers.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! A haplotype network exported as an undirected `petgraph` graph.
//! Each node is labeled with its taxon names, empty for inferred nodes.
//! The edges are weighted by the decoded distance if it was defined, or f32::NAN otherwise.

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

use crate::graph::NodeId;
use crate::pipeline::Network;

pub type Taxon = String;
pub type Proximity = f32;

pub type NetworkGraph = UnGraph<Taxon, Proximity>;

/// Convert a network, returning the graph and the index of every node.
pub fn to_petgraph(network: &Network) -> (NetworkGraph, HashMap<NodeId, NodeIndex>) {
    let mut out = NetworkGraph::new_undirected();
    let mut index = HashMap::new();
    for id in network.graph.nodes() {
        let label = network
            .graph
            .node_data(id)
            .and_then(|d| d.label.clone())
            .unwrap_or_default();
        index.insert(id, out.add_node(label));
    }
    for (u, v, _) in network.graph.edges() {
        let length = network
            .edge_length(u, v)
            .map_or(f32::NAN, |l| l as Proximity);
        out.add_edge(index[&u], index[&v], length);
    }
    (out, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::quantize::ReducedMatrix;

    #[test]
    fn export_keeps_lengths_and_labels() {
        let mut graph = Graph::new();
        graph.add_weighted_edge(0, 1, 4);
        graph.add_edge(1, 2);
        graph.node_data_mut(0).unwrap().label = Some("a".to_owned());
        let network = Network {
            graph,
            matrix: ReducedMatrix::from_integers(vec![vec![0, 4], vec![4, 0]], 10.0),
        };
        let (g, index) = to_petgraph(&network);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g[index[&0]], "a");
        assert_eq!(g[index[&2]], "");
        let e = g.find_edge(index[&0], index[&1]).unwrap();
        assert!((g[e] - 0.2).abs() < 1e-6);
        let e = g.find_edge(index[&2], index[&1]).unwrap();
        assert!(g[e].is_nan());
    }
}
