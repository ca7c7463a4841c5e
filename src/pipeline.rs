//! End-to-end network reconstruction.
//!
//! The stages run in order: quantization, metric repair, realization, the
//! external tightening step, superfluous-edge removal, sequence labeling and
//! zero-length contraction. The [`Graph`] is moved from stage to stage.
//!
//! ```
//! use haplotype_network::distancematrix::DistanceMatrix;
//! use haplotype_network::pipeline::{IdentityTightener, Pipeline, PipelineConfig};
//! use haplotype_network::progress::NoProgress;
//!
//! let m = DistanceMatrix::new(
//!     vec!["x".to_string(), "y".to_string(), "z".to_string(), "w".to_string()],
//!     vec![
//!         vec![0.0, 1.0, 2.0, 0.0],
//!         vec![1.0, 0.0, 1.0, 1.0],
//!         vec![2.0, 1.0, 0.0, 2.0],
//!         vec![0.0, 1.0, 2.0, 0.0],
//!     ],
//! ).unwrap();
//! let mut pipeline = Pipeline::new(PipelineConfig::default(), IdentityTightener);
//! let network = pipeline.run(&m, None, &mut NoProgress).unwrap();
//! assert_eq!(network.graph.node_count(), 3);
//! assert_eq!(network.graph.node_data(0).unwrap().label.as_deref(), Some("x,w"));
//! assert_eq!(network.edge_length(0, 1), Some(1.0));
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distancematrix::DistanceMatrix;
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeData, NodeId};
use crate::metric::metric_closure;
use crate::network::postprocess::{
    contract_zero_length_edges, remove_superfluous_edges, PostProcessOptions,
};
use crate::network::realize::realize_matrix;
use crate::parsimony::{label_network, LabelerConfig};
use crate::progress::Progress;
use crate::quantize::{quantize, ReducedMatrix};
use crate::sequence::{iupac_mask, BaseMask, Sequence};

/// Parameters forwarded to the tightening stage.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TightenOptions {
    pub max_rounds: usize,
    pub polish: bool,
    pub remove_redundant: bool,
}

impl Default for TightenOptions {
    fn default() -> Self {
        TightenOptions {
            max_rounds: 10,
            polish: true,
            remove_redundant: true,
        }
    }
}

/// The network improvement step run between realization and clean-up.
///
/// An implementation must return a graph whose shortest paths between the
/// realized nodes still equal `matrix`, and must honor cancellation through
/// `progress`.
pub trait Tightener {
    fn tighten(
        &mut self,
        matrix: &ReducedMatrix,
        graph: Graph,
        options: &TightenOptions,
        progress: &mut dyn Progress,
    ) -> Result<Graph>;
}

/// Returns the realized graph unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTightener;

impl Tightener for IdentityTightener {
    fn tighten(
        &mut self,
        _matrix: &ReducedMatrix,
        graph: Graph,
        _options: &TightenOptions,
        progress: &mut dyn Progress,
    ) -> Result<Graph> {
        progress.check_canceled()?;
        Ok(graph)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Digit budget of the scaled-integer encoding.
    pub max_digits: u32,
    /// Replace the quantized matrix by its metric closure before realization.
    pub repair_metric: bool,
    pub tighten: TightenOptions,
    pub post: PostProcessOptions,
    pub labeler: LabelerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            max_digits: 6,
            repair_metric: true,
            tighten: TightenOptions::default(),
            post: PostProcessOptions::default(),
            labeler: LabelerConfig::default(),
        }
    }
}

/// A reconstructed network together with the matrix it realizes.
#[derive(Debug, Clone)]
pub struct Network {
    pub graph: Graph,
    pub matrix: ReducedMatrix,
}

impl Network {
    /// Length of an edge on the scale of the input distances.
    pub fn edge_length(&self, u: NodeId, v: NodeId) -> Option<f64> {
        self.graph
            .weight(u, v)
            .map(|w| self.matrix.decode_distance(w))
    }

    /// Total length of the network on the scale of the input distances.
    pub fn total_length(&self) -> f64 {
        self.matrix.decode_distance(self.graph.total_weight())
    }

    /// Original 1-based taxon ids attached to `node`.
    pub fn taxa(&self, node: NodeId) -> &[usize] {
        self.graph
            .node_data(node)
            .map_or(&[][..], |d| d.taxa.as_slice())
    }
}

/// Runs the reconstruction stages with one configuration and tightener.
pub struct Pipeline<T: Tightener> {
    config: PipelineConfig,
    tightener: T,
}

impl<T: Tightener> Pipeline<T> {
    pub fn new(config: PipelineConfig, tightener: T) -> Self {
        Pipeline { config, tightener }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build a network for `matrix`.
    ///
    /// `sequences`, when given, holds one aligned sequence per input taxon
    /// (in matrix order); every node then receives an inferred sequence. Taxa
    /// merged at distance zero must have compatible sequences. Zero length
    /// contraction only applies to labeled networks.
    pub fn run(
        &mut self,
        matrix: &DistanceMatrix,
        sequences: Option<&[Sequence]>,
        progress: &mut dyn Progress,
    ) -> Result<Network> {
        let mut reduced = quantize(matrix, self.config.max_digits)?;
        info!(
            taxa = matrix.len(),
            components = reduced.len(),
            scale = reduced.scale(),
            "quantized distance matrix"
        );
        if self.config.repair_metric {
            metric_closure(reduced.rows_mut());
        }

        let mut graph = realize_matrix(&reduced, &mut *progress)?;
        info!(edges = graph.edge_count(), "realized network");
        attach_taxa(&mut graph, &reduced, matrix);

        graph = self
            .tightener
            .tighten(&reduced, graph, &self.config.tighten, progress)?;
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "tightened network"
        );

        if self.config.post.remove_superfluous {
            graph = remove_superfluous_edges(graph)?;
        }

        if let Some(sequences) = sequences {
            let observed = observed_sequences(&graph, sequences, matrix.len())?;
            graph = label_network(graph, &observed, &self.config.labeler)?;
            if self.config.post.contract_zero_length {
                graph = contract_zero_length_edges(graph, self.config.post.max_contractions);
            }
        }
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "network complete"
        );
        Ok(Network {
            graph,
            matrix: reduced,
        })
    }
}

fn attach_taxa(graph: &mut Graph, reduced: &ReducedMatrix, matrix: &DistanceMatrix) {
    for index in 0..reduced.len() {
        let taxa = reduced.members(index).to_vec();
        let names: Vec<&str> = taxa.iter().filter_map(|&t| matrix.taxon_name(t)).collect();
        graph.add_node_with(
            index,
            NodeData {
                label: Some(names.join(",")),
                taxa,
                sequence: None,
            },
        );
    }
}

/// Observed sequence of each taxon node. Members merged into one node must
/// be compatible; their ambiguity masks are intersected site by site.
fn observed_sequences(
    graph: &Graph,
    sequences: &[Sequence],
    taxa: usize,
) -> Result<BTreeMap<NodeId, Sequence>> {
    if sequences.len() != taxa {
        return Err(Error::SequenceCount {
            expected: taxa,
            found: sequences.len(),
        });
    }
    let mut observed = BTreeMap::new();
    for id in graph.nodes() {
        let members = match graph.node_data(id) {
            Some(data) if data.is_taxon() => &data.taxa,
            _ => continue,
        };
        let mut merged = sequences[members[0] - 1].clone();
        for &taxon in &members[1..] {
            let other = &sequences[taxon - 1];
            if other.len() != merged.len() {
                return Err(Error::SequenceLength {
                    node: id,
                    expected: merged.len(),
                    found: other.len(),
                });
            }
            for (site, (base, &symbol)) in merged.iter_mut().zip(other.iter()).enumerate() {
                let mask = symbol_mask(id, site, *base)?;
                let mask = mask.intersection(symbol_mask(id, site, symbol)?);
                *base = mask.to_iupac().ok_or(Error::Infeasible { site })?;
            }
        }
        observed.insert(id, merged);
    }
    Ok(observed)
}

fn symbol_mask(node: NodeId, site: usize, symbol: u8) -> Result<BaseMask> {
    iupac_mask(symbol).ok_or(Error::InvalidSymbol {
        node,
        site,
        symbol: symbol as char,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CancellationToken, NoProgress};

    /// Adds a median node for a three-taxon star.
    struct StarTightener;

    impl Tightener for StarTightener {
        fn tighten(
            &mut self,
            matrix: &ReducedMatrix,
            mut graph: Graph,
            _options: &TightenOptions,
            _progress: &mut dyn Progress,
        ) -> Result<Graph> {
            let center = graph.next_free_id();
            for leaf in 0..matrix.len() {
                graph.add_weighted_edge(leaf, center, matrix.get(0, 1) / 2);
            }
            Ok(graph)
        }
    }

    fn equilateral() -> DistanceMatrix {
        DistanceMatrix::unnamed(vec![
            vec![0., 2., 2.],
            vec![2., 0., 2.],
            vec![2., 2., 0.],
        ])
        .unwrap()
    }

    #[test]
    fn identity_pipeline_realizes_triangle() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), IdentityTightener);
        let network = pipeline.run(&equilateral(), None, &mut NoProgress).unwrap();
        assert_eq!(network.graph.edge_count(), 3);
        assert_eq!(network.edge_length(0, 2), Some(2.0));
        assert_eq!(network.total_length(), 6.0);
        assert_eq!(network.taxa(1), &[2]);
    }

    #[test]
    fn star_is_reduced_and_labeled() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), StarTightener);
        let sequences = vec![b"AAC".to_vec(), b"ATA".to_vec(), b"GAA".to_vec()];
        let network = pipeline
            .run(&equilateral(), Some(sequences.as_slice()), &mut NoProgress)
            .unwrap();
        let g = &network.graph;
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.node_data(3).unwrap().sequence, Some(b"AAA".to_vec()));
        assert_eq!(network.edge_length(0, 3), Some(1.0));
        assert_eq!(g.edge_data(1, 3).unwrap().sites, vec![1]);
    }

    /// Taxa 1 and 3 are at distance zero and share node 0.
    fn merged_pair() -> DistanceMatrix {
        DistanceMatrix::unnamed(vec![
            vec![0., 1., 0.],
            vec![1., 0., 1.],
            vec![0., 1., 0.],
        ])
        .unwrap()
    }

    fn seqs(symbols: &[&str]) -> Vec<Sequence> {
        symbols.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn one_sequence_per_taxon_is_required() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), IdentityTightener);
        let sequences = seqs(&["AA", "AC"]);
        let result = pipeline.run(&merged_pair(), Some(sequences.as_slice()), &mut NoProgress);
        assert_eq!(
            result.unwrap_err(),
            Error::SequenceCount {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn merged_taxa_intersect_their_sequences() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), IdentityTightener);
        let sequences = seqs(&["RA", "GC", "AA"]);
        let network = pipeline
            .run(&merged_pair(), Some(sequences.as_slice()), &mut NoProgress)
            .unwrap();
        assert_eq!(network.taxa(0), &[1, 3]);
        let g = &network.graph;
        assert_eq!(g.node_data(0).unwrap().sequence, Some(b"AA".to_vec()));
        assert_eq!(g.node_data(1).unwrap().sequence, Some(b"GC".to_vec()));
        assert_eq!(g.edge_data(0, 1).unwrap().sites, vec![0, 1]);
    }

    #[test]
    fn merged_taxa_must_agree() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), IdentityTightener);
        let sequences = seqs(&["AT", "GC", "AG"]);
        let result = pipeline.run(&merged_pair(), Some(sequences.as_slice()), &mut NoProgress);
        assert_eq!(result.unwrap_err(), Error::Infeasible { site: 1 });

        let sequences = seqs(&["AT", "GC", "A"]);
        let result = pipeline.run(&merged_pair(), Some(sequences.as_slice()), &mut NoProgress);
        assert_eq!(
            result.unwrap_err(),
            Error::SequenceLength {
                node: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn canceled_run_fails() {
        let token = CancellationToken::new();
        token.cancel();
        let mut progress = token.clone();
        let mut pipeline = Pipeline::new(PipelineConfig::default(), IdentityTightener);
        let result = pipeline.run(&equilateral(), None, &mut progress);
        assert_eq!(result.unwrap_err(), Error::Canceled);
    }

    #[test]
    fn metric_repair_is_optional() {
        let m = DistanceMatrix::unnamed(vec![
            vec![0., 1., 5.],
            vec![1., 0., 1.],
            vec![5., 1., 0.],
        ])
        .unwrap();
        let mut pipeline = Pipeline::new(PipelineConfig::default(), IdentityTightener);
        let network = pipeline.run(&m, None, &mut NoProgress).unwrap();
        assert_eq!(network.matrix.get(0, 2), 4);
        assert!(!network.graph.has_edge(0, 2));

        let config = PipelineConfig {
            repair_metric: false,
            ..PipelineConfig::default()
        };
        let mut pipeline = Pipeline::new(config, IdentityTightener);
        let network = pipeline.run(&m, None, &mut NoProgress).unwrap();
        assert_eq!(network.matrix.get(0, 2), 10);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_serializes() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
