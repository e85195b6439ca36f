//! Bounding box geometry
//!
//! A [`BBox3D`] is a yaw-only oriented box: a center, three strictly
//! positive dimensions (width along x, height along y, depth along z) and a
//! rotation about the vertical (y) axis. Everything here is pure; editors
//! derive handle positions from a box and hand drag results back as a new
//! center.

use crate::point::{Point3f, Vector3f};
use crate::traits::Extent;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Smallest dimension produced when fitting a box around degenerate extents
pub const MIN_DIMENSION: f32 = 1e-3;

/// A 2D bounding box in image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox2D {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BBox2D {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Check that all coordinates are finite and min <= max on both axes
    pub fn validate(&self) -> Result<()> {
        let coords = [self.xmin, self.ymin, self.xmax, self.ymax];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidData(format!("2D box has non-finite coordinates: {:?}", coords)));
        }
        if self.xmin > self.xmax || self.ymin > self.ymax {
            return Err(Error::InvalidData(format!(
                "2D box corners out of order: ({}, {}) - ({}, {})",
                self.xmin, self.ymin, self.xmax, self.ymax
            )));
        }
        Ok(())
    }
}

/// Rotation of a box; only yaw about the vertical axis is modelled
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f32,
}

/// Wrap an angle into (-π, π]
pub fn normalize_yaw(yaw: f32) -> f32 {
    if !yaw.is_finite() {
        return yaw;
    }
    let wrapped = yaw.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

/// Editor projections. Each orthogonal view manipulates exactly two axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Looking down the vertical axis; edits x and z
    Top,
    /// Looking along z; edits x and y
    Front,
    /// Looking along x; edits y and z
    Side,
    Perspective,
}

impl View {
    pub const ALL: [View; 4] = [View::Top, View::Front, View::Side, View::Perspective];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Top => "top",
            View::Front => "front",
            View::Side => "side",
            View::Perspective => "perspective",
        }
    }

    /// Normal of the drag plane for orthogonal views
    pub fn plane_normal(&self) -> Option<Vector3f> {
        match self {
            View::Top => Some(Vector3f::y()),
            View::Front => Some(Vector3f::z()),
            View::Side => Some(Vector3f::x()),
            View::Perspective => None,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(View::Top),
            "front" => Ok(View::Front),
            "side" => Ok(View::Side),
            "perspective" => Ok(View::Perspective),
            other => Err(Error::InvalidData(format!("Unknown view: {}", other))),
        }
    }
}

/// A yaw-oriented 3D bounding box in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox3D {
    pub center: Point3f,
    /// width (x), height (y), depth (z)
    pub dimensions: Vector3f,
    pub rotation: Rotation,
}

impl BBox3D {
    pub fn new(center: Point3f, dimensions: Vector3f, yaw: f32) -> Self {
        Self {
            center,
            dimensions,
            rotation: Rotation { yaw },
        }
    }

    /// Axis-aligned box around an extent. Flat axes are padded to
    /// [`MIN_DIMENSION`] so the result always validates.
    pub fn from_extent(extent: &Extent) -> Self {
        let dimensions = extent.size().map(|d| d.max(MIN_DIMENSION));
        Self::new(extent.center(), dimensions, 0.0)
    }

    pub fn width(&self) -> f32 {
        self.dimensions.x
    }

    pub fn height(&self) -> f32 {
        self.dimensions.y
    }

    pub fn depth(&self) -> f32 {
        self.dimensions.z
    }

    pub fn yaw(&self) -> f32 {
        self.rotation.yaw
    }

    /// Check the box invariants: finite center and yaw, strictly positive dimensions
    pub fn validate(&self) -> Result<()> {
        if !self.center.iter().all(|c| c.is_finite()) {
            return Err(Error::InvalidData(format!("3D box center is not finite: {:?}", self.center)));
        }
        if !self.dimensions.iter().all(|d| d.is_finite() && *d > 0.0) {
            return Err(Error::InvalidData(format!(
                "3D box dimensions must be positive: {:?}",
                self.dimensions
            )));
        }
        if !self.rotation.yaw.is_finite() {
            return Err(Error::InvalidData("3D box yaw is not finite".to_string()));
        }
        Ok(())
    }

    /// Same box with yaw wrapped into (-π, π]
    pub fn normalized(mut self) -> Self {
        self.rotation.yaw = normalize_yaw(self.rotation.yaw);
        self
    }

    /// The 8 object-space corner offsets.
    ///
    /// Order is fixed: x varies slowest, z fastest, `-` before `+`.
    pub fn corners(&self) -> [Vector3f; 8] {
        let h = self.dimensions * 0.5;
        [
            Vector3f::new(-h.x, -h.y, -h.z),
            Vector3f::new(-h.x, -h.y, h.z),
            Vector3f::new(-h.x, h.y, -h.z),
            Vector3f::new(-h.x, h.y, h.z),
            Vector3f::new(h.x, -h.y, -h.z),
            Vector3f::new(h.x, -h.y, h.z),
            Vector3f::new(h.x, h.y, -h.z),
            Vector3f::new(h.x, h.y, h.z),
        ]
    }

    /// Object-space handle offsets for a view.
    ///
    /// Orthogonal views flatten the handles onto the plane they edit, so the
    /// axis a view cannot manipulate is always zero.
    pub fn view_handles(&self, view: View) -> Vec<Vector3f> {
        let h = self.dimensions * 0.5;
        match view {
            View::Top => vec![
                Vector3f::new(-h.x, 0.0, -h.z),
                Vector3f::new(-h.x, 0.0, h.z),
                Vector3f::new(h.x, 0.0, -h.z),
                Vector3f::new(h.x, 0.0, h.z),
            ],
            View::Front => vec![
                Vector3f::new(-h.x, -h.y, 0.0),
                Vector3f::new(-h.x, h.y, 0.0),
                Vector3f::new(h.x, -h.y, 0.0),
                Vector3f::new(h.x, h.y, 0.0),
            ],
            View::Side => vec![
                Vector3f::new(0.0, -h.y, -h.z),
                Vector3f::new(0.0, -h.y, h.z),
                Vector3f::new(0.0, h.y, -h.z),
                Vector3f::new(0.0, h.y, h.z),
            ],
            View::Perspective => self.corners().to_vec(),
        }
    }

    /// Map an object-space offset into world space: yaw about the vertical
    /// axis, then translate by the center.
    pub fn to_world(&self, offset: &Vector3f) -> Point3f {
        let (sin, cos) = self.rotation.yaw.sin_cos();
        Point3f::new(
            self.center.x + offset.x * cos + offset.z * sin,
            self.center.y + offset.y,
            self.center.z - offset.x * sin + offset.z * cos,
        )
    }

    /// World-space positions of the 8 corners, in [`corners`](Self::corners) order
    pub fn world_corners(&self) -> [Point3f; 8] {
        self.corners().map(|offset| self.to_world(&offset))
    }

    /// World-space handle positions for a view
    pub fn world_handles(&self, view: View) -> Vec<Point3f> {
        self.view_handles(view)
            .iter()
            .map(|offset| self.to_world(offset))
            .collect()
    }

    /// World direction of the box's local +x axis
    pub fn heading(&self) -> Vector3f {
        let (sin, cos) = self.rotation.yaw.sin_cos();
        Vector3f::new(cos, 0.0, -sin)
    }

    /// New center after dragging in `view` to a point on its drag plane.
    ///
    /// The axis the view cannot see is carried over bit-for-bit.
    pub fn drag_update(&self, view: View, hit: &Point3f) -> Point3f {
        let mut center = self.center;
        match view {
            View::Top => {
                center.x = hit.x;
                center.z = hit.z;
            }
            View::Front => {
                center.x = hit.x;
                center.y = hit.y;
            }
            View::Side => {
                center.y = hit.y;
                center.z = hit.z;
            }
            View::Perspective => {}
        }
        center
    }

    /// Whether a world-space point lies inside the box
    pub fn contains(&self, point: &Point3f) -> bool {
        let d = point - self.center;
        let (sin, cos) = self.rotation.yaw.sin_cos();
        // inverse of the yaw applied in `to_world`
        let local = Vector3f::new(d.x * cos - d.z * sin, d.y, d.x * sin + d.z * cos);
        let h = self.dimensions * 0.5;
        local.x.abs() <= h.x && local.y.abs() <= h.y && local.z.abs() <= h.z
    }
}
