//! Point cloud data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// An ordered sequence of decoded points, optionally named after its source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<PointRecord>,
    pub name: Option<String>,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            name: None,
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<PointRecord>) -> Self {
        Self { points, name: None }
    }

    /// Attach a display name (usually the source file name)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the cloud
    pub fn push(&mut self, point: PointRecord) {
        self.points.push(point);
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, PointRecord> {
        self.points.iter()
    }

    /// Iterate over positions only
    pub fn positions(&self) -> impl Iterator<Item = Point3f> + '_ {
        self.points.iter().map(|p| p.position)
    }
}

impl Index<usize> for PointCloud {
    type Output = PointRecord;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl IntoIterator for PointCloud {
    type Item = PointRecord;
    type IntoIter = std::vec::IntoIter<PointRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a PointRecord;
    type IntoIter = std::slice::Iter<'a, PointRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl Extend<PointRecord> for PointCloud {
    fn extend<I: IntoIterator<Item = PointRecord>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}

impl FromIterator<PointRecord> for PointCloud {
    fn from_iter<I: IntoIterator<Item = PointRecord>>(iter: I) -> Self {
        Self::from_points(Vec::from_iter(iter))
    }
}

impl FromIterator<Point3f> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3f>>(iter: I) -> Self {
        iter.into_iter().map(PointRecord::from_position).collect()
    }
}
