//! A distance matrix is stored as a list of taxon names, together with a square
//! or triangular matrix representing all pairwise distances.
//!
//! # Example
//!
//! ```rust
//! use haplotype_network::distancematrix::DistanceMatrix;
//!
//! let m = DistanceMatrix::new(vec!["a".to_string(), "b".to_string()],
//! vec![
//!  vec![0.0, 1.0],
//!  vec![1.0, 0.0],
//! ]).unwrap();
//! assert!(m.validate().is_ok());
//! assert_eq!(m.taxon_name(2), Some("b"));
//! ```

use std::{
    cmp::{max, min},
    ops::{Index, IndexMut},
};

use thiserror::Error;

/// Tolerance used when checking the diagonal and the sign of entries.
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// The type of the matrix. Either square, lower triangular (excluding the
/// diagonal), or upper triangular (excluding the diagonal).
/// Square matrices are assumed to be symmetric; `validate` checks the diagonal
/// and the sign of each entry, symmetry is enforced after quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixType {
    Square,
    Lower,
    Upper,
}

/// A distance matrix containing a list of taxon names and a matrix of pairwise distances.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    pub names: Vec<String>,
    pub distances: Vec<Vec<f64>>,
    pub matrix_type: MatrixType,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistanceMatrixError {
    #[error("names and matrix do not have matching length")]
    LengthError,
    #[error("matrix has unrecognized shape")]
    ShapeError,
    #[error("matrix is empty")]
    Empty,
    #[error("entry ({row}, {col}) = {value} is not finite")]
    NonFinite { row: usize, col: usize, value: f64 },
    #[error("diagonal entry ({row}, {row}) = {value} is not zero")]
    NonZeroDiagonal { row: usize, value: f64 },
    #[error("entry ({row}, {col}) = {value} is negative")]
    Negative { row: usize, col: usize, value: f64 },
    #[error("entries ({row}, {col}) and ({col}, {row}) differ")]
    Asymmetric { row: usize, col: usize },
    #[error("triangle inequality violated for ({i}, {j}, {k})")]
    TriangleInequality { i: usize, j: usize, k: usize },
}

impl DistanceMatrix {
    /// The number of sequences (rows) in the matrix.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Create a new DistanceMatrix.
    ///
    /// `distances` must be a matrix with the same number of rows as `names`, and follow one of the accepted shapes.
    pub fn new(names: Vec<String>, distances: Vec<Vec<f64>>) -> Result<Self, DistanceMatrixError> {
        if names.len() != distances.len() {
            Err(DistanceMatrixError::LengthError)
        } else {
            let n = names.len();
            let square = distances.iter().all(|x| x.len() == n);
            let lower = distances.iter().enumerate().all(|(i, x)| x.len() == i);
            let upper = distances
                .iter()
                .enumerate()
                .all(|(i, x)| x.len() == n - 1 - i);
            let matrix_type = match (square, lower, upper) {
                (true, _, _) => MatrixType::Square,
                (_, true, _) => MatrixType::Lower,
                (_, _, true) => MatrixType::Upper,
                _ => Err(DistanceMatrixError::ShapeError)?,
            };
            Ok(Self {
                names,
                distances,
                matrix_type,
            })
        }
    }

    /// Create a matrix whose taxa are named by their 1-based index.
    pub fn unnamed(distances: Vec<Vec<f64>>) -> Result<Self, DistanceMatrixError> {
        let names = (1..=distances.len()).map(|i| i.to_string()).collect();
        Self::new(names, distances)
    }

    /// Name of the taxon with the given 1-based id.
    pub fn taxon_name(&self, id: usize) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|i| self.names.get(i))
            .map(|s| s.as_str())
    }

    /// Distance between `i` and `j`. Unlike indexing, the diagonal of a
    /// triangular matrix is readable and is always zero.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j && self.matrix_type != MatrixType::Square {
            0.0
        } else {
            self[(i, j)]
        }
    }

    /// Check that the matrix is non-empty, finite, has a zero diagonal and no
    /// negative entries. The first offending cell is reported.
    pub fn validate(&self) -> Result<(), DistanceMatrixError> {
        let n = self.len();
        if n == 0 {
            return Err(DistanceMatrixError::Empty);
        }
        for i in 0..n {
            for j in 0..n {
                let value = self.get(i, j);
                if !value.is_finite() {
                    return Err(DistanceMatrixError::NonFinite {
                        row: i,
                        col: j,
                        value,
                    });
                }
                if i == j {
                    if value.abs() > ZERO_TOLERANCE {
                        return Err(DistanceMatrixError::NonZeroDiagonal { row: i, value });
                    }
                } else if value < -ZERO_TOLERANCE {
                    return Err(DistanceMatrixError::Negative {
                        row: i,
                        col: j,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Smallest and largest off-diagonal entries, or `None` for a single taxon.
    pub fn off_diagonal_range(&self) -> Option<(f64, f64)> {
        let n = self.len();
        let mut range: Option<(f64, f64)> = None;
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let v = self.get(i, j);
                range = Some(match range {
                    None => (v, v),
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                });
            }
        }
        range
    }

    // Converts an index (i,j) to the right index to use given the shape of the matrix.
    fn get_index(&self, (i, j): (usize, usize)) -> (usize, usize) {
        match self.matrix_type {
            MatrixType::Square => (i, j),
            MatrixType::Lower => {
                assert!(i != j);
                (max(i, j), min(i, j))
            }
            MatrixType::Upper => {
                assert!(i != j);
                (min(i, j), max(i, j) - min(i, j) - 1)
            }
        }
    }
}

/// Index access into the DistanceMatrix, taking into account the shape.
///
/// Indices should be used as if the matrix was square. For triangular matrices,
/// `i` and `j` must be distinct, and `(i,j)` and `(j,i)` represent the same
/// element.
///
/// # Example
///
/// ```
/// use haplotype_network::distancematrix::DistanceMatrix;
///
/// let mut t = DistanceMatrix::new(vec!["a".to_string(), "b".to_string()],
/// vec![
///  vec![],
///  vec![1.0],
/// ]).unwrap();
/// assert_eq!(t[(1, 0)], 1.0);
/// t[(0, 1)] = 2.0;
/// assert_eq!(t[(1, 0)], 2.0);
/// ```
impl Index<(usize, usize)> for DistanceMatrix {
    type Output = f64;
    fn index(&self, t: (usize, usize)) -> &Self::Output {
        let (i, j) = self.get_index(t);
        &self.distances[i][j]
    }
}

/// Mutable index access into the DistanceMatrix, taking into account the shape, like `Index`.
impl IndexMut<(usize, usize)> for DistanceMatrix {
    fn index_mut(&mut self, t: (usize, usize)) -> &mut Self::Output {
        let (i, j) = self.get_index(t);
        &mut self.distances[i][j]
    }
}
