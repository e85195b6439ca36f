//! # scanmark algorithms
//!
//! Processing steps that sit between the scan decoder and an annotation
//! editor: render-space normalization and automatic box proposals.

pub mod normalize;
pub mod nearest_neighbor;
pub mod clustering;

// Re-export commonly used items
pub use normalize::{normalize, NormalizedCloud, Normalizer};
pub use nearest_neighbor::{BruteForceSearch, NearestNeighborSearch};
pub use clustering::{dbscan, fit_bbox, propose_boxes, ClusterParams};
