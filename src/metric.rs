//! Triangle-inequality checks and metric closure for integer distance matrices.
//!
//! ```
//! use haplotype_network::metric::{is_metric, metric_closure};
//!
//! let mut d = vec![vec![0, 2, 9], vec![2, 0, 3], vec![9, 3, 0]];
//! assert!(!is_metric(&d));
//! metric_closure(&mut d);
//! assert_eq!(d[0][2], 5);
//! assert!(is_metric(&d));
//! ```

use tracing::debug;

use crate::distancematrix::DistanceMatrixError;
use crate::error::Result;
use crate::graph::Weight;

/// Whether `d(i, k) <= d(i, j) + d(j, k)` holds for all distinct triples.
pub fn is_metric(d: &[Vec<Weight>]) -> bool {
    find_violation(d).is_none()
}

/// Strict form of [`is_metric`], failing on the first violating triple.
pub fn check_metric(d: &[Vec<Weight>]) -> Result<()> {
    match find_violation(d) {
        None => Ok(()),
        Some((i, j, k)) => Err(DistanceMatrixError::TriangleInequality { i, j, k }.into()),
    }
}

fn find_violation(d: &[Vec<Weight>]) -> Option<(usize, usize, usize)> {
    let n = d.len();
    for i in 0..n {
        for j in 0..n {
            if j == i {
                continue;
            }
            for k in 0..n {
                if k == i || k == j {
                    continue;
                }
                if d[i][k] > d[i][j] + d[j][k] {
                    return Some((i, j, k));
                }
            }
        }
    }
    None
}

/// Replace `d` by its metric closure (all-pairs shortest paths). Entries only
/// decrease; an already metric matrix is left unchanged. Returns the number of
/// entries that were lowered.
pub fn metric_closure(d: &mut [Vec<Weight>]) -> usize {
    let n = d.len();
    if n <= 2 {
        return 0;
    }
    let mut lowered = 0;
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                let via = d[i][k] + d[k][j];
                if via < d[i][j] {
                    d[i][j] = via;
                    d[j][i] = via;
                    lowered += 1;
                }
            }
        }
    }
    if lowered > 0 {
        debug!(lowered, "repaired triangle inequality violations");
    }
    lowered
}
