//! Random forest inference
//!
//! - `tree`: flat-vector regression trees with `<=` traversal
//! - `model`: the bagged ensemble, batch prediction and blake3 fingerprinting
//!
//! Training lives in `cropsim-trainer`; this module only evaluates.

pub mod model;
pub mod tree;

pub use model::{Forest, ForestError};
pub use tree::{Node, Tree};
