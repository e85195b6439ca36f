//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A single decoded sample from a scan.
///
/// Positions are in meters in the scanner frame. Color and intensity are
/// carried for formats that provide them; the binary decoder only fills in
/// the position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub position: Point3f,
    pub color: Option<[f32; 3]>,
    pub intensity: Option<f32>,
}

impl PointRecord {
    /// Create a record holding only a position
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self::from_position(Point3f::new(x, y, z))
    }

    pub fn from_position(position: Point3f) -> Self {
        Self {
            position,
            color: None,
            intensity: None,
        }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = Some(intensity);
        self
    }

    /// True when every coordinate is a finite number
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
    }
}

impl Default for PointRecord {
    fn default() -> Self {
        Self::from_position(Point3f::origin())
    }
}

impl From<Point3f> for PointRecord {
    fn from(position: Point3f) -> Self {
        Self::from_position(position)
    }
}

impl From<PointRecord> for Point3f {
    fn from(record: PointRecord) -> Self {
        record.position
    }
}
