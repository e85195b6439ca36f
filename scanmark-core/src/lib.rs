//! Core data structures for scanmark
//!
//! This crate provides the point and point cloud types produced by the scan
//! decoder, the yaw-oriented bounding box model used by annotation editors,
//! annotation records with their partial-update types, and the annotation
//! store.

pub mod point;
pub mod point_cloud;
pub mod traits;
pub mod bbox;
pub mod annotation;
pub mod store;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use traits::*;
pub use bbox::*;
pub use annotation::*;
pub use store::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
