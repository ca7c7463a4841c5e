//! Realization of a distance oracle as a graph with no redundant edges.
//!
//! Starting from the complete graph, every edge `(u, v)` with an alternate
//! path of length at most its weight is removed, until a full scan removes
//! nothing. Shortest-path distances between all realized nodes are preserved.

use tracing::debug;

use crate::error::Result;
use crate::graph::{Graph, NodeId, Weight};
use crate::progress::Progress;
use crate::quantize::ReducedMatrix;

/// Build a graph over `nodes` (ids kept verbatim) whose shortest paths equal
/// `distance`. Checks for cancellation after every redundancy test.
///
/// ```
/// use haplotype_network::network::realize::realize;
/// use haplotype_network::progress::NoProgress;
///
/// // a path 0 - 1 - 2 with unit steps
/// let d = [[0, 2, 4], [2, 0, 2], [4, 2, 0]];
/// let g = realize(|u, v| d[u][v], &[0, 1, 2], &mut NoProgress).unwrap();
/// assert_eq!(g.edge_keys(), vec![(0, 1), (1, 2)]);
/// ```
pub fn realize<F, P>(distance: F, nodes: &[NodeId], progress: &mut P) -> Result<Graph>
where
    F: Fn(NodeId, NodeId) -> Weight,
    P: Progress + ?Sized,
{
    let mut ids = nodes.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let mut graph = Graph::new();
    for &id in &ids {
        graph.add_node(id);
    }
    for (i, &u) in ids.iter().enumerate() {
        for &v in &ids[i + 1..] {
            graph.add_weighted_edge(u, v, distance(u, v));
        }
    }

    let mut round = 0;
    loop {
        round += 1;
        let keys = graph.edge_keys();
        let total = keys.len();
        let mut removed = 0;
        for (done, (u, v)) in keys.into_iter().enumerate() {
            let weight = match graph.weight(u, v) {
                Some(w) => w,
                None => continue,
            };
            if is_redundant(&graph, u, v, weight) {
                graph.remove_edge(u, v);
                removed += 1;
            }
            progress.advance(done + 1, total);
            progress.check_canceled()?;
        }
        debug!(round, removed, edges = graph.edge_count(), "redundant edge scan");
        if removed == 0 {
            break;
        }
    }
    Ok(graph)
}

/// Realize every component of a reduced matrix; node `i` is component `i`.
pub fn realize_matrix<P>(matrix: &ReducedMatrix, progress: &mut P) -> Result<Graph>
where
    P: Progress + ?Sized,
{
    let nodes: Vec<NodeId> = (0..matrix.len()).collect();
    realize(|u, v| matrix.get(u, v), &nodes, progress)
}

/// An edge is redundant if a path avoiding it is no longer than its weight.
pub fn is_redundant(graph: &Graph, u: NodeId, v: NodeId, weight: Weight) -> bool {
    graph
        .shortest_path_length(u, v, Some((u, v)), Some(weight))
        .map_or(false, |alt| alt <= weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::metric::metric_closure;
    use crate::progress::tests::CancelAfter;
    use crate::progress::NoProgress;
    use proptest::prelude::*;

    fn assert_realizes(g: &Graph, d: &[Vec<Weight>]) {
        for u in 0..d.len() {
            let dist = g.distances_from(u);
            for v in 0..d.len() {
                assert_eq!(dist.get(&v).copied(), Some(d[u][v]), "pair ({}, {})", u, v);
            }
        }
    }

    #[test]
    fn equilateral_triangle_keeps_all_edges() {
        let d = vec![vec![0, 4, 4], vec![4, 0, 4], vec![4, 4, 0]];
        let g = realize(|u, v| d[u][v], &[0, 1, 2], &mut NoProgress).unwrap();
        assert_eq!(g.edge_count(), 3);
        assert_realizes(&g, &d);
    }

    #[test]
    fn square_with_diagonals() {
        // four points on a cycle of unit steps
        let d = vec![
            vec![0, 2, 4, 2],
            vec![2, 0, 2, 4],
            vec![4, 2, 0, 2],
            vec![2, 4, 2, 0],
        ];
        let g = realize(|u, v| d[u][v], &[0, 1, 2, 3], &mut NoProgress).unwrap();
        assert_eq!(g.edge_keys(), vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
        assert_realizes(&g, &d);
    }

    #[test]
    fn ids_are_preserved() {
        let g = realize(|u, v| if u + v == 17 { 6 } else { 2 }, &[5, 12, 40], &mut NoProgress)
            .unwrap();
        assert_eq!(g.nodes().collect::<Vec<_>>(), vec![5, 12, 40]);
        assert!(!g.has_edge(5, 12));
    }

    #[test]
    fn cancellation_stops_realization() {
        let d = vec![vec![0, 2, 4], vec![2, 0, 2], vec![4, 2, 0]];
        let mut progress = CancelAfter {
            remaining: std::cell::Cell::new(0),
        };
        let result = realize(|u, v| d[u][v], &[0, 1, 2], &mut progress);
        assert_eq!(result.unwrap_err(), Error::Canceled);
    }

    fn metric() -> impl Strategy<Value = Vec<Vec<Weight>>> {
        (2usize..7).prop_flat_map(|n| {
            proptest::collection::vec(1i64..8, n * n).prop_map(move |raw| {
                let mut m = vec![vec![0; n]; n];
                for i in 0..n {
                    for j in (i + 1)..n {
                        m[i][j] = raw[i * n + j] * 2;
                        m[j][i] = m[i][j];
                    }
                }
                metric_closure(&mut m);
                m
            })
        })
    }

    proptest! {
        #[test]
        fn realized_graph_is_faithful_and_minimal(d in metric()) {
            let nodes: Vec<NodeId> = (0..d.len()).collect();
            let g = realize(|u, v| d[u][v], &nodes, &mut NoProgress).unwrap();
            for u in 0..d.len() {
                let dist = g.distances_from(u);
                for v in 0..d.len() {
                    prop_assert_eq!(dist.get(&v).copied(), Some(d[u][v]));
                }
            }
            for (u, v, e) in g.edges() {
                let w = e.weight.unwrap();
                prop_assert!(!is_redundant(&g, u, v, w));
            }
        }
    }
}
