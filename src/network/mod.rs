//! Construction of a minimal network from an integer distance matrix, and
//! the topology clean-up run after tightening.

pub mod postprocess;
pub mod realize;

pub use self::postprocess::{post_process, PostProcessOptions};
pub use self::realize::{realize, realize_matrix};
