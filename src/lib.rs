//! Reconstruction of minimal haplotype networks from pairwise distances,
//! and parsimonious labeling of their nodes with sequences.
//!
//! The core pipeline turns a [`DistanceMatrix`](distancematrix::DistanceMatrix)
//! into an exact integer metric ([`quantize`]), repairs triangle inequality
//! violations ([`metric`]), realizes the metric as a graph without redundant
//! edges ([`network::realize`]), cleans up the topology after an external
//! tightening step ([`network::postprocess`]) and assigns an unambiguous
//! sequence to every node with graph cuts ([`parsimony`], [`flow`]).
//! [`pipeline`] runs all stages in order.

#[macro_use]
extern crate lazy_static;

pub mod distancematrix;
pub mod error;
pub mod flow;
pub mod graph;
pub mod metric;
pub mod network;
pub mod parsimony;
pub mod phylogeny;
pub mod pipeline;
pub mod progress;
pub mod quantize;
pub mod scaled;
pub mod sequence;

pub use crate::error::{Error, Result};
