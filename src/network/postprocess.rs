//! Clean-up passes run on a network after tightening.
//!
//! * superfluous edge removal: an edge is dropped when another path between
//!   its endpoints has exactly its weight; inferred nodes left with degree
//!   one or two are then removed or bypassed.
//! * zero-length contraction: an edge whose endpoints carry identical
//!   sequences, and at least one endpoint is not a taxon, is contracted.
//!
//! Both passes are greedy and only guarantee local irreducibility.

use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId, Weight, UNWEIGHTED};

/// Which clean-up passes to run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessOptions {
    pub remove_superfluous: bool,
    pub contract_zero_length: bool,
    /// Upper bound on the number of contractions.
    pub max_contractions: usize,
}

impl Default for PostProcessOptions {
    fn default() -> Self {
        PostProcessOptions {
            remove_superfluous: true,
            contract_zero_length: true,
            max_contractions: 10_000,
        }
    }
}

/// Remove edges for which another path of the same length exists, heaviest
/// first, then prune inferred nodes of degree at most two.
///
/// Fails with [`Error::InconsistentNetwork`] if an edge has a strictly
/// shorter alternate path.
///
/// ```
/// use haplotype_network::graph::Graph;
/// use haplotype_network::network::postprocess::remove_superfluous_edges;
///
/// let mut g = Graph::new();
/// for &(u, v, w) in &[(0, 1, 2), (1, 2, 2), (0, 2, 4)] {
///     g.add_weighted_edge(u, v, w);
/// }
/// for id in 0..3 {
///     g.node_data_mut(id).unwrap().taxa = vec![id + 1];
/// }
/// let g = remove_superfluous_edges(g).unwrap();
/// assert_eq!(g.edge_keys(), vec![(0, 1), (1, 2)]);
/// ```
pub fn remove_superfluous_edges(mut graph: Graph) -> Result<Graph> {
    let mut edges: Vec<(Weight, NodeId, NodeId)> = graph
        .edges()
        .filter_map(|(u, v, e)| e.weight.map(|w| (w, u, v)))
        .collect();
    edges.sort_by(|a, b| b.cmp(a));

    let mut removed = 0;
    for (weight, u, v) in edges {
        if !graph.has_edge(u, v) {
            continue;
        }
        match graph.shortest_path_length(u, v, Some((u, v)), Some(weight)) {
            Some(path) if path == weight => {
                graph.remove_edge(u, v);
                removed += 1;
            }
            Some(path) => {
                return Err(Error::InconsistentNetwork {
                    start: u,
                    end: v,
                    weight,
                    path,
                })
            }
            None => (),
        }
    }
    debug!(removed, "removed superfluous edges");
    Ok(prune_inferred_nodes(graph))
}

/// Repeatedly drop inferred leaves and bypass inferred nodes of degree two.
///
/// Leaves that already carry a sequence are kept.
pub fn prune_inferred_nodes(mut graph: Graph) -> Graph {
    loop {
        let mut changed = false;
        let candidates: Vec<NodeId> = graph.nodes().filter(|&id| !graph.is_taxon(id)).collect();
        for id in candidates {
            match graph.degree(id) {
                0 | 1 if !has_sequence(&graph, id) => {
                    graph.remove_node(id);
                    changed = true;
                }
                2 => {
                    let ns = graph.sorted_neighbors(id);
                    let (a, b) = (ns[0], ns[1]);
                    let through = graph.weight(a, id).unwrap_or(UNWEIGHTED)
                        + graph.weight(id, b).unwrap_or(UNWEIGHTED);
                    graph.remove_node(id);
                    let weight = graph.weight(a, b).map_or(through, |w| w.min(through));
                    graph.add_weighted_edge(a, b, weight);
                    changed = true;
                }
                _ => (),
            }
        }
        if !changed {
            return graph;
        }
    }
}

fn has_sequence(graph: &Graph, id: NodeId) -> bool {
    graph
        .node_data(id)
        .map_or(false, |d| d.sequence.is_some())
}

/// Contract edges whose endpoints have identical sequences, keeping the
/// taxon-bearing endpoint (the smaller id if both or neither are taxa).
/// Parallel edges created by a contraction are merged by averaging their
/// weights.
pub fn contract_zero_length_edges(mut graph: Graph, max_contractions: usize) -> Graph {
    let mut contractions = 0;
    while let Some((keep, drop)) = find_contractible(&graph) {
        if contractions == max_contractions {
            warn!(max_contractions, "contraction limit reached");
            break;
        }
        for n in graph.sorted_neighbors(drop) {
            if n == keep {
                continue;
            }
            let moved = match graph.remove_edge(drop, n) {
                Some(moved) => moved,
                None => continue,
            };
            // keep and drop share a sequence, so the moved sites stay valid
            match graph.edge_data_mut(keep, n) {
                Some(existing) => {
                    existing.weight = match (existing.weight, moved.weight) {
                        (Some(a), Some(b)) => Some((a + b) / 2),
                        (a, b) => a.or(b),
                    };
                }
                None => graph.add_edge_with(keep, n, moved),
            }
        }
        // the dropped endpoint never carries taxa
        graph.remove_node(drop);
        contractions += 1;
    }
    debug!(contractions, "contracted zero-length edges");
    graph
}

fn find_contractible(graph: &Graph) -> Option<(NodeId, NodeId)> {
    graph.edges().find_map(|(u, v, _)| {
        let (du, dv) = (graph.node_data(u)?, graph.node_data(v)?);
        match (&du.sequence, &dv.sequence) {
            (Some(a), Some(b)) if a == b => (),
            _ => return None,
        }
        match (du.is_taxon(), dv.is_taxon()) {
            (true, true) => None,
            (false, true) => Some((v, u)),
            _ => Some((u, v)),
        }
    })
}

/// Run the passes selected by `options`.
pub fn post_process(graph: Graph, options: &PostProcessOptions) -> Result<Graph> {
    let mut graph = graph;
    if options.remove_superfluous {
        graph = remove_superfluous_edges(graph)?;
    }
    if options.contract_zero_length {
        graph = contract_zero_length_edges(graph, options.max_contractions);
    }
    Ok(graph)
}
