//! Error types shared by all stages of the network pipeline.

use thiserror::Error;

use crate::distancematrix::DistanceMatrixError;
use crate::graph::{GraphError, NodeId, Weight};

/// Errors raised while building or labeling a network.
///
/// Validation errors identify the offending cell, node or site. No stage
/// recovers from them silently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid distance matrix: {0}")]
    InvalidMatrix(#[from] DistanceMatrixError),
    #[error("encoded distance {value} at ({row}, {col}) overflows the 32-bit integer range")]
    EncodingOverflow { row: usize, col: usize, value: f64 },
    #[error("operation canceled")]
    Canceled,
    #[error("no base satisfies the ambiguity constraints at site {site}")]
    Infeasible { site: usize },
    #[error("pairwise term ({a}, {b}, {c}, {d}) is not submodular")]
    NotSubmodular { a: f64, b: f64, c: f64, d: f64 },
    #[error(
        "edge ({start}, {end}) of weight {weight} has a strictly shorter alternate path of length {path}"
    )]
    InconsistentNetwork {
        start: NodeId,
        end: NodeId,
        weight: Weight,
        path: Weight,
    },
    #[error("invalid symbol '{symbol}' for node {node} at site {site}")]
    InvalidSymbol {
        node: NodeId,
        site: usize,
        symbol: char,
    },
    #[error("sequence of node {node} has length {found}, expected {expected}")]
    SequenceLength {
        node: NodeId,
        expected: usize,
        found: usize,
    },
    #[error("expected one sequence per taxon ({expected}), found {found}")]
    SequenceCount { expected: usize, found: usize },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
