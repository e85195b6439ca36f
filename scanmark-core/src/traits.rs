//! Core traits and the axis-aligned extent type

use crate::{bbox::BBox3D, point::*, point_cloud::*};
use serde::{Deserialize, Serialize};

/// Axis-aligned min/max bounds of a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: Point3f,
    pub max: Point3f,
}

impl Extent {
    /// A zero-size extent around a single point
    pub fn from_point(point: Point3f) -> Self {
        Self { min: point, max: point }
    }

    /// Bounds of all points yielded by `points`, or `None` when it is empty
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3f>,
    {
        let mut iter = points.into_iter();
        let mut extent = Self::from_point(iter.next()?);
        for point in iter {
            extent.include(&point);
        }
        Some(extent)
    }

    /// Grow the extent so it contains `point`
    pub fn include(&mut self, point: &Point3f) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);

        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Per-axis size (max - min)
    pub fn size(&self) -> Vector3f {
        self.max - self.min
    }

    /// Per-axis midpoint, computed without summing min and max
    pub fn center(&self) -> Point3f {
        Point3f::new(
            self.min.x * 0.5 + self.max.x * 0.5,
            self.min.y * 0.5 + self.max.y * 0.5,
            self.min.z * 0.5 + self.max.z * 0.5,
        )
    }

    /// Largest of the three axis sizes
    pub fn largest_side(&self) -> f32 {
        self.size().max()
    }

    pub fn contains(&self, point: &Point3f) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

/// Trait for objects with a spatial footprint
pub trait Drawable {
    /// Get the bounding box of the object, `None` when it has no points
    fn bounding_box(&self) -> Option<Extent>;

    /// Get the center point of the object
    fn center(&self) -> Option<Point3f> {
        self.bounding_box().map(|extent| extent.center())
    }
}

impl Drawable for PointCloud {
    fn bounding_box(&self) -> Option<Extent> {
        Extent::from_points(self.positions())
    }
}

impl Drawable for [Point3f] {
    fn bounding_box(&self) -> Option<Extent> {
        Extent::from_points(self.iter().copied())
    }
}

impl Drawable for BBox3D {
    fn bounding_box(&self) -> Option<Extent> {
        Extent::from_points(self.world_corners())
    }
}
