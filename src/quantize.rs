//! Quantization of a real-valued distance matrix into an even integer metric.
//!
//! Every off-diagonal distance `x` is encoded as `2 * round(x * scale)`, where
//! `scale` is the power of ten chosen by [`choose_scale`] for the range of the
//! matrix. Taxa at encoded distance zero are merged into one component; the
//! [`ReducedMatrix`] is indexed by component, ordered by smallest member.
//!
//! ```
//! use haplotype_network::distancematrix::DistanceMatrix;
//! use haplotype_network::quantize::quantize;
//!
//! let m = DistanceMatrix::unnamed(vec![
//!     vec![0.0, 0.0, 0.5],
//!     vec![0.0, 0.0, 0.5],
//!     vec![0.5, 0.5, 0.0],
//! ]).unwrap();
//! let reduced = quantize(&m, 3).unwrap();
//! assert_eq!(reduced.len(), 2);
//! assert_eq!(reduced.members(0), &[1, 2]);
//! assert_eq!(reduced.get(0, 1), 10);
//! assert_eq!(reduced.decode_distance(10), 0.5);
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::distancematrix::{DistanceMatrix, DistanceMatrixError};
use crate::error::{Error, Result};
use crate::graph::Weight;
use crate::scaled::{choose_scale, ScaledIntegerCodec};

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Representative of the set containing `i`.
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns `false` if they were already merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// The full encoded matrix, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedMatrix {
    pub values: Vec<Vec<Weight>>,
    pub codec: ScaledIntegerCodec,
}

impl QuantizedMatrix {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Integer distances between merged taxa, with maps back to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedMatrix {
    distances: Vec<Vec<Weight>>,
    members: Vec<Vec<usize>>,
    scale: f64,
}

impl ReducedMatrix {
    /// Build a reduced matrix directly. Every component gets a single member
    /// numbered by its 1-based index.
    pub fn from_integers(distances: Vec<Vec<Weight>>, scale: f64) -> Self {
        let members = (1..=distances.len()).map(|i| vec![i]).collect();
        ReducedMatrix {
            distances,
            members,
            scale,
        }
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> Weight {
        self.distances[i][j]
    }

    pub fn rows(&self) -> &[Vec<Weight>] {
        &self.distances
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Weight>] {
        &mut self.distances
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Sorted 1-based ids of the original taxa merged into `index`.
    pub fn members(&self, index: usize) -> &[usize] {
        &self.members[index]
    }

    /// Map an encoded distance back to the scale of the input matrix.
    pub fn decode_distance(&self, value: Weight) -> f64 {
        if value == 0 {
            0.0
        } else {
            value as f64 / self.scale / 2.0
        }
    }
}

/// Encode every off-diagonal cell as an even integer.
pub fn encode(matrix: &DistanceMatrix, max_digits: u32) -> Result<QuantizedMatrix> {
    matrix.validate()?;
    let n = matrix.len();
    let scale = match matrix.off_diagonal_range() {
        Some((min, max)) => choose_scale(min, max, max_digits),
        None => 1.0,
    };
    let codec = ScaledIntegerCodec::with_scale(scale);
    let mut values = vec![vec![0 as Weight; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let doubled = 2.0 * (matrix.get(i, j) * scale).round();
            if doubled > i32::MAX as f64 || doubled < i32::MIN as f64 {
                return Err(Error::EncodingOverflow {
                    row: i,
                    col: j,
                    value: doubled,
                });
            }
            // -0.0 and tiny negatives collapse to 0
            values[i][j] = (doubled as Weight).max(0);
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if values[i][j] != values[j][i] {
                return Err(DistanceMatrixError::Asymmetric { row: i, col: j }.into());
            }
        }
    }
    Ok(QuantizedMatrix { values, codec })
}

/// Merge taxa at encoded distance zero into components.
pub fn reduce(quantized: &QuantizedMatrix) -> ReducedMatrix {
    let n = quantized.len();
    let mut uf = UnionFind::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if quantized.values[i][j] == 0 {
                uf.union(i, j);
            }
        }
    }

    let mut index_of: HashMap<usize, usize> = HashMap::new();
    let mut representatives = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = uf.find(i);
        let idx = *index_of.entry(root).or_insert_with(|| {
            representatives.push(i);
            members.push(Vec::new());
            members.len() - 1
        });
        members[idx].push(i + 1);
    }

    let k = representatives.len();
    let mut distances = vec![vec![0 as Weight; k]; k];
    for a in 0..k {
        for b in 0..k {
            if a != b {
                distances[a][b] = quantized.values[representatives[a]][representatives[b]];
            }
        }
    }
    debug!(taxa = n, components = k, "merged zero-distance taxa");
    ReducedMatrix {
        distances,
        members,
        scale: quantized.codec.scale(),
    }
}

/// Validate, encode and reduce a distance matrix.
pub fn quantize(matrix: &DistanceMatrix, max_digits: u32) -> Result<ReducedMatrix> {
    let quantized = encode(matrix, max_digits)?;
    Ok(reduce(&quantized))
}
