//! Render-space normalization
//!
//! Centers a scan on the origin, scales it so its largest axis spans a fixed
//! scene size, and colors every point by height. Sensor-error samples are
//! dropped first, so the output may hold fewer points than the input; size
//! render buffers from [`NormalizedCloud::len`].

use log::debug;
use nalgebra::Point3;
use scanmark_core::{Point3f, PointCloud};

/// Vertical magnitude above which a sample is treated as a sensor error
pub const OUTLIER_THRESHOLD: f64 = 1e10;

/// Length of the largest axis after normalization
pub const SCENE_SIZE: f64 = 10.0;

/// Blue channel of every height color
pub const HEIGHT_COLOR_BLUE: f32 = 0.5;

/// Render-ready point buffers plus the transform that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCloud {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    /// Subtracted from every raw position
    pub center: Point3<f64>,
    /// Uniform factor applied after centering
    pub scale: f64,
}

impl NormalizedCloud {
    fn empty() -> Self {
        Self {
            positions: Vec::new(),
            colors: Vec::new(),
            center: Point3::origin(),
            scale: 1.0,
        }
    }

    /// Number of retained points
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position buffer as raw bytes for vertex upload
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Color buffer as raw bytes for vertex upload
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Map a scanner-frame position into render space
    pub fn to_render(&self, world: &Point3f) -> Point3f {
        let p = (world.cast::<f64>() - self.center) * self.scale;
        Point3f::new(p.x as f32, p.y as f32, p.z as f32)
    }

    /// Map a render-space position back into the scanner frame
    pub fn to_world(&self, render: &Point3f) -> Point3f {
        let p = self.center + render.cast::<f64>().coords / self.scale;
        Point3f::new(p.x as f32, p.y as f32, p.z as f32)
    }
}

/// Normalization settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    pub scene_size: f64,
    pub outlier_threshold: f64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            scene_size: SCENE_SIZE,
            outlier_threshold: OUTLIER_THRESHOLD,
        }
    }
}

impl Normalizer {
    pub fn new(scene_size: f64, outlier_threshold: f64) -> Self {
        Self {
            scene_size,
            outlier_threshold,
        }
    }

    /// Whether a sample is excluded from both the extent and the output
    pub fn is_outlier(&self, position: &Point3f) -> bool {
        !position.iter().all(|c| c.is_finite()) || (position.y as f64).abs() > self.outlier_threshold
    }

    /// Produce render buffers for `cloud`.
    ///
    /// Arithmetic runs in f64, so the same input always gives bit-identical
    /// output and extreme-but-finite coordinates cannot overflow.
    pub fn normalize(&self, cloud: &PointCloud) -> NormalizedCloud {
        let retained: Vec<Point3<f64>> = cloud
            .positions()
            .filter(|p| !self.is_outlier(p))
            .map(|p| p.cast::<f64>())
            .collect();

        let Some((min, max)) = bounds(&retained) else {
            debug!("normalize: no usable points out of {}", cloud.len());
            return NormalizedCloud::empty();
        };

        let center = Point3::new(
            (min.x + max.x) * 0.5,
            (min.y + max.y) * 0.5,
            (min.z + max.z) * 0.5,
        );
        let largest = (max - min).max();
        let scale = if largest > 0.0 { self.scene_size / largest } else { 1.0 };
        let height_range = max.y - min.y;

        let mut positions = Vec::with_capacity(retained.len());
        let mut colors = Vec::with_capacity(retained.len());
        for p in &retained {
            let r = (*p - center) * scale;
            positions.push([r.x as f32, r.y as f32, r.z as f32]);

            let height = if height_range > 0.0 {
                ((p.y - min.y) / height_range) as f32
            } else {
                0.0
            };
            colors.push([1.0 - height, height, HEIGHT_COLOR_BLUE]);
        }

        debug!(
            "normalize: kept {} of {} points, center {:?}, scale {}",
            positions.len(),
            cloud.len(),
            center,
            scale
        );

        NormalizedCloud {
            positions,
            colors,
            center,
            scale,
        }
    }
}

/// Normalize with the default settings
pub fn normalize(cloud: &PointCloud) -> NormalizedCloud {
    Normalizer::default().normalize(cloud)
}

fn bounds(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(min, max), p| {
        (min.inf(p), max.sup(p))
    }))
}
