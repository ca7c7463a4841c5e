//! Parsimonious sequence labeling of network nodes with graph cuts.
//!
//! Every node of a network receives an unambiguous sequence minimizing, per
//! site, the number of edges whose endpoints differ (the Potts energy).
//! Observed sequences may contain IUPAC ambiguity codes, which restrict the
//! base a node may take at that site; nodes without an observed sequence are
//! unconstrained.
//!
//! Sites are solved independently. A site with two candidate bases is solved
//! exactly by one s-t minimum cut; with three or more, alpha-expansion moves
//! are iterated until a sweep over all bases no longer lowers the energy.
//!
//! ```
//! use std::collections::BTreeMap;
//! use haplotype_network::graph::Graph;
//! use haplotype_network::parsimony::{infer_sequences, LabelerConfig};
//!
//! // a star with an unlabeled center
//! let mut g = Graph::new();
//! for leaf in 0..3 {
//!     g.add_weighted_edge(leaf, 3, 2);
//! }
//! let mut observed = BTreeMap::new();
//! observed.insert(0, b"AC".to_vec());
//! observed.insert(1, b"AY".to_vec());
//! observed.insert(2, b"GT".to_vec());
//! let inferred = infer_sequences(&g, &observed, &LabelerConfig::default()).unwrap();
//! assert_eq!(inferred[&3], b"AT".to_vec());
//! assert_eq!(inferred[&1], b"AT".to_vec());
//! ```

use std::collections::{BTreeMap, HashMap};

use derive_new::new;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flow::{FlowNetwork, NodeRef, INFINITE_CAPACITY};
use crate::graph::{Graph, NodeId};
use crate::sequence::{iupac_mask, BaseMask, Nucleotide, Sequence};

/// Labeler policy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelerConfig {
    /// Maximum number of alpha-expansion sweeps per site.
    pub max_sweeps: usize,
    /// Preference order used to pick "the first allowed base".
    pub base_order: [Nucleotide; 4],
}

impl Default for LabelerConfig {
    fn default() -> Self {
        LabelerConfig {
            max_sweeps: 50,
            base_order: Nucleotide::ALL,
        }
    }
}

/// One site: allowed bases per node and the edges between dense node indices.
#[derive(new, Debug, Clone)]
pub struct SiteProblem<'a> {
    pub masks: Vec<BaseMask>,
    pub edges: &'a [(usize, usize)],
}

/// The labeling found for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSolution {
    pub labels: Vec<Nucleotide>,
    pub energy: usize,
    /// Energy after each alpha-expansion sweep; empty for exact solves.
    pub history: Vec<usize>,
}

/// Number of edges whose endpoints carry different labels.
pub fn potts_energy(labels: &[Nucleotide], edges: &[(usize, usize)]) -> usize {
    edges
        .iter()
        .filter(|&&(u, v)| labels[u] != labels[v])
        .count()
}

impl<'a> SiteProblem<'a> {
    /// Solve the site. `site` is only used in error reports.
    pub fn solve(&self, site: usize, config: &LabelerConfig) -> Result<SiteSolution> {
        let alphabet = self
            .masks
            .iter()
            .fold(BaseMask::EMPTY, |acc, &m| acc.union(m));
        if alphabet.is_empty() || self.masks.iter().any(|m| m.is_empty()) {
            return Err(Error::Infeasible { site });
        }
        let order = &config.base_order;
        let bases: Vec<Nucleotide> = alphabet.iter_in(order).collect();

        let (mut labels, history) = match bases.len() {
            1 => (vec![bases[0]; self.masks.len()], Vec::new()),
            2 => (self.solve_binary(bases[0], bases[1]), Vec::new()),
            _ => self.alpha_expansion(&bases, config)?,
        };

        for (node, label) in labels.iter_mut().enumerate() {
            let mask = self.masks[node];
            if !mask.contains(*label) {
                if let Some(first) = mask.first_in(order) {
                    warn!(node, site, "label outside allowed bases repaired");
                    *label = first;
                }
            }
        }

        let energy = potts_energy(&labels, self.edges);
        Ok(SiteSolution {
            labels,
            energy,
            history,
        })
    }

    /// Exact two-label solve: source side takes `a`, sink side takes `b`.
    fn solve_binary(&self, a: Nucleotide, b: Nucleotide) -> Vec<Nucleotide> {
        let mut net = FlowNetwork::new();
        for (node, &mask) in self.masks.iter().enumerate() {
            net.add_node(node);
            if !mask.contains(b) {
                net.add_capacity(NodeRef::Source, NodeRef::Real(node), INFINITE_CAPACITY);
            }
            if !mask.contains(a) {
                net.add_capacity(NodeRef::Real(node), NodeRef::Sink, INFINITE_CAPACITY);
            }
        }
        for &(u, v) in self.edges {
            net.add_undirected_capacity(NodeRef::Real(u), NodeRef::Real(v), 1.0);
        }
        net.max_flow();
        let side = net.min_cut_source_side();
        (0..self.masks.len())
            .map(|node| {
                if side.contains(&NodeRef::Real(node)) {
                    a
                } else {
                    b
                }
            })
            .collect()
    }

    fn alpha_expansion(
        &self,
        bases: &[Nucleotide],
        config: &LabelerConfig,
    ) -> Result<(Vec<Nucleotide>, Vec<usize>)> {
        let order = &config.base_order;
        let mut labels: Vec<Nucleotide> = self
            .masks
            .iter()
            .map(|m| m.first_in(order).unwrap_or(bases[0]))
            .collect();
        let mut energy = potts_energy(&labels, self.edges);
        let mut history = Vec::new();

        while history.len() < config.max_sweeps {
            let mut improved = false;
            for &alpha in bases {
                let candidate = self.expansion_move(&labels, alpha)?;
                let candidate_energy = potts_energy(&candidate, self.edges);
                if candidate_energy < energy {
                    labels = candidate;
                    energy = candidate_energy;
                    improved = true;
                }
            }
            history.push(energy);
            if !improved {
                break;
            }
        }
        debug!(sweeps = history.len(), energy, "alpha-expansion finished");
        Ok((labels, history))
    }

    /// Best labeling reachable from `labels` by switching any subset of nodes
    /// to `alpha`. A node on the source side of the cut keeps its label.
    fn expansion_move(&self, labels: &[Nucleotide], alpha: Nucleotide) -> Result<Vec<Nucleotide>> {
        let n = self.masks.len();
        let mut net = FlowNetwork::new();
        // coefficient of x_v, where x_v = 1 means "switch to alpha"
        let mut unary = vec![0.0f64; n];
        for node in 0..n {
            net.add_node(node);
            let current = labels[node];
            if current == alpha {
                continue;
            }
            if !self.masks[node].contains(alpha) {
                net.add_capacity(NodeRef::Source, NodeRef::Real(node), INFINITE_CAPACITY);
            }
            if !self.masks[node].contains(current) {
                net.add_capacity(NodeRef::Real(node), NodeRef::Sink, INFINITE_CAPACITY);
            }
        }

        let potts = |x: Nucleotide, y: Nucleotide| if x == y { 0.0 } else { 1.0 };
        for &(u, v) in self.edges {
            let (lu, lv) = (labels[u], labels[v]);
            let a = potts(lu, lv);
            let b = potts(lu, alpha);
            let c = potts(alpha, lv);
            let d = potts(alpha, alpha);
            if a + d > b + c {
                return Err(Error::NotSubmodular { a, b, c, d });
            }
            unary[u] += c - a;
            unary[v] += d - c;
            let pairwise = b + c - a - d;
            if pairwise > 0.0 {
                net.add_capacity(NodeRef::Real(u), NodeRef::Real(v), pairwise);
            }
        }
        for (node, &k) in unary.iter().enumerate() {
            if k > 0.0 {
                net.add_capacity(NodeRef::Source, NodeRef::Real(node), k);
            } else if k < 0.0 {
                net.add_capacity(NodeRef::Real(node), NodeRef::Sink, -k);
            }
        }

        net.max_flow();
        let keep = net.min_cut_source_side();
        Ok((0..n)
            .map(|node| {
                if keep.contains(&NodeRef::Real(node)) {
                    labels[node]
                } else {
                    alpha
                }
            })
            .collect())
    }
}

/// Infer a sequence for every node of `graph`.
///
/// `observed` maps nodes to equal-length sequences that may contain IUPAC
/// codes; entries for nodes missing from the graph are ignored. The
/// candidate bases of a site are those allowed by the observed sequences.
pub fn infer_sequences(
    graph: &Graph,
    observed: &BTreeMap<NodeId, Sequence>,
    config: &LabelerConfig,
) -> Result<BTreeMap<NodeId, Sequence>> {
    let ids: Vec<NodeId> = graph.nodes().collect();
    let dense: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let edges: Vec<(usize, usize)> = graph
        .edges()
        .map(|(u, v, _)| (dense[&u], dense[&v]))
        .collect();

    let labeled: Vec<(usize, &Sequence)> = observed
        .iter()
        .filter_map(|(id, s)| dense.get(id).map(|&i| (i, s)))
        .collect();
    let length = labeled.first().map_or(0, |(_, s)| s.len());

    // per labeled node, the allowed bases at every site
    let mut constraints: Vec<(usize, Vec<BaseMask>)> = Vec::with_capacity(labeled.len());
    for &(i, seq) in &labeled {
        if seq.len() != length {
            return Err(Error::SequenceLength {
                node: ids[i],
                expected: length,
                found: seq.len(),
            });
        }
        let masks = seq
            .iter()
            .enumerate()
            .map(|(site, &symbol)| {
                iupac_mask(symbol).ok_or(Error::InvalidSymbol {
                    node: ids[i],
                    site,
                    symbol: symbol as char,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        constraints.push((i, masks));
    }

    let mut sequences: Vec<Sequence> = vec![Vec::with_capacity(length); ids.len()];
    let mut total_energy = 0;
    for site in 0..length {
        let alphabet = constraints
            .iter()
            .fold(BaseMask::EMPTY, |acc, (_, m)| acc.union(m[site]));
        let mut masks = vec![alphabet; ids.len()];
        for (i, m) in &constraints {
            masks[*i] = m[site].intersection(alphabet);
        }
        let solution = SiteProblem::new(masks, &edges).solve(site, config)?;
        total_energy += solution.energy;
        for (node, label) in solution.labels.into_iter().enumerate() {
            sequences[node].push(label.to_base());
        }
    }
    debug!(sites = length, nodes = ids.len(), total_energy, "labeled network");
    Ok(ids.into_iter().zip(sequences).collect())
}

/// Label every node of `graph` and record, per edge, the differing sites.
pub fn label_network(
    mut graph: Graph,
    observed: &BTreeMap<NodeId, Sequence>,
    config: &LabelerConfig,
) -> Result<Graph> {
    let sequences = infer_sequences(&graph, observed, config)?;
    for (u, v) in graph.edge_keys() {
        let sites: Vec<usize> = sequences[&u]
            .iter()
            .zip(sequences[&v].iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(site, _)| site)
            .collect();
        if let Some(e) = graph.edge_data_mut(u, v) {
            e.sites = sites;
        }
    }
    for (id, sequence) in sequences {
        if let Some(data) = graph.node_data_mut(id) {
            data.sequence = Some(sequence);
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mask(symbol: u8) -> BaseMask {
        iupac_mask(symbol).unwrap()
    }

    fn path(n: usize) -> Graph {
        let mut g = Graph::new();
        for i in 1..n {
            g.add_weighted_edge(i - 1, i, 2);
        }
        g
    }

    fn observed(entries: &[(NodeId, &str)]) -> BTreeMap<NodeId, Sequence> {
        entries
            .iter()
            .map(|&(id, s)| (id, s.as_bytes().to_vec()))
            .collect()
    }

    /// Minimum energy over all labelings drawn from the masks.
    fn brute_force(masks: &[BaseMask], edges: &[(usize, usize)]) -> usize {
        fn go(
            node: usize,
            labels: &mut Vec<Nucleotide>,
            masks: &[BaseMask],
            edges: &[(usize, usize)],
        ) -> usize {
            if node == masks.len() {
                return potts_energy(labels, edges);
            }
            let mut best = usize::MAX;
            for n in masks[node].iter_in(&Nucleotide::ALL) {
                labels.push(n);
                best = best.min(go(node + 1, labels, masks, edges));
                labels.pop();
            }
            best
        }
        go(0, &mut Vec::new(), masks, edges)
    }

    #[test]
    fn ambiguous_path_scenario() {
        let g = path(3);
        let obs = observed(&[(0, "AR"), (1, "AG"), (2, "AC")]);
        let inferred = infer_sequences(&g, &obs, &LabelerConfig::default()).unwrap();
        let labels: Vec<Nucleotide> = (0..3)
            .map(|i| match inferred[&i][1] {
                b'A' => Nucleotide::A,
                b'C' => Nucleotide::C,
                b'G' => Nucleotide::G,
                _ => Nucleotide::T,
            })
            .collect();
        assert!(potts_energy(&labels, &[(0, 1), (1, 2)]) <= 1);
        assert_eq!(inferred[&0], b"AG".to_vec());
        assert_eq!(inferred[&2], b"AC".to_vec());
    }

    #[test]
    fn binary_site_uses_min_cut() {
        // 0 - 2 - 1 with 2 unlabeled, and a pendant 3 that is free
        let mut g = Graph::new();
        g.add_weighted_edge(0, 2, 2);
        g.add_weighted_edge(2, 1, 2);
        g.add_weighted_edge(2, 3, 2);
        let obs = observed(&[(0, "C"), (1, "T"), (3, "T")]);
        let inferred = infer_sequences(&g, &obs, &LabelerConfig::default()).unwrap();
        assert_eq!(inferred[&2], b"T".to_vec());
    }

    #[test]
    fn single_base_site() {
        let g = path(4);
        let obs = observed(&[(0, "G"), (3, "g")]);
        let inferred = infer_sequences(&g, &obs, &LabelerConfig::default()).unwrap();
        for id in 0..4 {
            assert_eq!(inferred[&id], b"G".to_vec());
        }
    }

    #[test]
    fn base_order_breaks_ties() {
        let g = path(2);
        let obs = observed(&[(0, "N"), (1, "N")]);
        let config = LabelerConfig {
            base_order: [Nucleotide::T, Nucleotide::G, Nucleotide::C, Nucleotide::A],
            ..LabelerConfig::default()
        };
        let inferred = infer_sequences(&g, &obs, &config).unwrap();
        assert_eq!(inferred[&0], b"T".to_vec());
        assert_eq!(inferred[&1], b"T".to_vec());
    }

    #[test]
    fn invalid_inputs() {
        let g = path(2);
        let obs = observed(&[(0, "AC"), (1, "A")]);
        assert_eq!(
            infer_sequences(&g, &obs, &LabelerConfig::default()).unwrap_err(),
            Error::SequenceLength {
                node: 1,
                expected: 2,
                found: 1
            }
        );
        let obs = observed(&[(0, "AC"), (1, "AZ")]);
        assert_eq!(
            infer_sequences(&g, &obs, &LabelerConfig::default()).unwrap_err(),
            Error::InvalidSymbol {
                node: 1,
                site: 1,
                symbol: 'Z'
            }
        );
    }

    #[test]
    fn empty_mask_is_infeasible() {
        let edges = [(0, 1)];
        let problem = SiteProblem::new(vec![mask(b'A'), BaseMask::EMPTY], &edges);
        assert_eq!(
            problem.solve(4, &LabelerConfig::default()).unwrap_err(),
            Error::Infeasible { site: 4 }
        );
    }

    #[test]
    fn sweep_cap_is_honored() {
        let edges = [(0, 1), (1, 2), (2, 3)];
        let masks = vec![mask(b'A'), BaseMask::ANY, BaseMask::ANY, mask(b'C')];
        let config = LabelerConfig {
            max_sweeps: 1,
            ..LabelerConfig::default()
        };
        let solution = SiteProblem::new(masks, &edges).solve(0, &config).unwrap();
        assert_eq!(solution.history.len(), 1);
        assert_eq!(solution.energy, 1);
    }

    #[test]
    fn label_network_records_sites() {
        let g = path(3);
        let obs = observed(&[(0, "ACG"), (2, "TCC")]);
        let g = label_network(g, &obs, &LabelerConfig::default()).unwrap();
        let middle = g.node_data(1).unwrap().sequence.clone().unwrap();
        assert_eq!(middle[1], b'C');
        let sites: usize = g.edges().map(|(_, _, e)| e.sites.len()).sum();
        assert_eq!(sites, 2);
        assert_eq!(g.node_data(2).unwrap().sequence, Some(b"TCC".to_vec()));
    }

    fn random_site(symbols: &'static [u8]) -> impl Strategy<Value = (Vec<BaseMask>, Vec<(usize, usize)>)> {
        (2usize..7).prop_flat_map(move |n| {
            (
                proptest::collection::vec(proptest::sample::select(symbols), n),
                proptest::collection::vec((0..n, 0..n), 1..(2 * n)),
            )
                .prop_map(|(chars, pairs)| {
                    let masks = chars.into_iter().map(mask).collect();
                    let mut edges: Vec<(usize, usize)> = pairs
                        .into_iter()
                        .filter(|(u, v)| u != v)
                        .map(|(u, v)| (u.min(v), u.max(v)))
                        .collect();
                    edges.sort_unstable();
                    edges.dedup();
                    (masks, edges)
                })
        })
    }

    proptest! {
        #[test]
        fn binary_sites_are_optimal((masks, edges) in random_site(b"AGR")) {
            let expected = brute_force(&masks, &edges);
            let solution = SiteProblem::new(masks.clone(), &edges)
                .solve(0, &LabelerConfig::default())
                .unwrap();
            prop_assert_eq!(solution.energy, expected);
            for (label, m) in solution.labels.iter().zip(masks.iter()) {
                prop_assert!(m.contains(*label));
            }
        }

        #[test]
        fn expansion_is_monotone_and_feasible((masks, edges) in random_site(b"ACGTRYSKMBN")) {
            let config = LabelerConfig::default();
            let solution = SiteProblem::new(masks.clone(), &edges).solve(0, &config).unwrap();
            prop_assert!(solution.history.len() <= config.max_sweeps);
            for pair in solution.history.windows(2) {
                prop_assert!(pair[1] <= pair[0]);
            }
            for (label, m) in solution.labels.iter().zip(masks.iter()) {
                prop_assert!(m.contains(*label));
            }
            prop_assert!(solution.energy >= brute_force(&masks, &edges));
        }
    }
}
