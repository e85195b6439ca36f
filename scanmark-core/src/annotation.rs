//! Annotation records and their partial-update types

use crate::bbox::{BBox2D, BBox3D, Rotation};
use crate::point::{Point3f, Vector3f};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single labelled object in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Assigned by whoever creates the record (importer or editor), never by the store
    pub id: u64,
    pub class: String,
    pub bbox_2d: BBox2D,
    pub bbox_3d: BBox3D,
    /// Stable across the frames of a sequence; may be empty
    pub tracking_id: String,
}

impl Annotation {
    pub fn new(id: u64, class: impl Into<String>, bbox_2d: BBox2D, bbox_3d: BBox3D) -> Self {
        Self {
            id,
            class: class.into(),
            bbox_2d,
            bbox_3d,
            tracking_id: String::new(),
        }
    }

    pub fn with_tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = tracking_id.into();
        self
    }

    /// Check the record invariants
    pub fn validate(&self) -> Result<()> {
        if self.class.trim().is_empty() {
            return Err(Error::InvalidData(format!("annotation {} has an empty class", self.id)));
        }
        self.bbox_2d.validate()?;
        self.bbox_3d.validate()?;
        Ok(())
    }
}

/// Field-wise update of a [`BBox2D`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox2DPatch {
    pub xmin: Option<f32>,
    pub ymin: Option<f32>,
    pub xmax: Option<f32>,
    pub ymax: Option<f32>,
}

impl BBox2DPatch {
    pub fn apply(&self, bbox: &mut BBox2D) {
        if let Some(v) = self.xmin {
            bbox.xmin = v;
        }
        if let Some(v) = self.ymin {
            bbox.ymin = v;
        }
        if let Some(v) = self.xmax {
            bbox.xmax = v;
        }
        if let Some(v) = self.ymax {
            bbox.ymax = v;
        }
    }
}

impl From<BBox2D> for BBox2DPatch {
    fn from(bbox: BBox2D) -> Self {
        Self {
            xmin: Some(bbox.xmin),
            ymin: Some(bbox.ymin),
            xmax: Some(bbox.xmax),
            ymax: Some(bbox.ymax),
        }
    }
}

/// Field-wise update of a [`BBox3D`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox3DPatch {
    pub center: Option<Point3f>,
    pub dimensions: Option<Vector3f>,
    pub rotation: Option<Rotation>,
}

impl BBox3DPatch {
    pub fn center(center: Point3f) -> Self {
        Self {
            center: Some(center),
            ..Default::default()
        }
    }

    pub fn dimensions(dimensions: Vector3f) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..Default::default()
        }
    }

    pub fn yaw(yaw: f32) -> Self {
        Self {
            rotation: Some(Rotation { yaw }),
            ..Default::default()
        }
    }

    pub fn apply(&self, bbox: &mut BBox3D) {
        if let Some(center) = self.center {
            bbox.center = center;
        }
        if let Some(dimensions) = self.dimensions {
            bbox.dimensions = dimensions;
        }
        if let Some(rotation) = self.rotation {
            bbox.rotation = rotation;
        }
    }
}

impl From<BBox3D> for BBox3DPatch {
    fn from(bbox: BBox3D) -> Self {
        Self {
            center: Some(bbox.center),
            dimensions: Some(bbox.dimensions),
            rotation: Some(bbox.rotation),
        }
    }
}

/// Partial update of an [`Annotation`]. The id is not patchable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub class: Option<String>,
    pub bbox_2d: Option<BBox2DPatch>,
    pub bbox_3d: Option<BBox3DPatch>,
    pub tracking_id: Option<String>,
}

impl AnnotationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn bbox_2d(mut self, patch: impl Into<BBox2DPatch>) -> Self {
        self.bbox_2d = Some(patch.into());
        self
    }

    pub fn bbox_3d(mut self, patch: impl Into<BBox3DPatch>) -> Self {
        self.bbox_3d = Some(patch.into());
        self
    }

    pub fn tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = Some(tracking_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge into `annotation`, leaving unspecified fields untouched
    pub fn apply(&self, annotation: &mut Annotation) {
        if let Some(class) = &self.class {
            annotation.class = class.clone();
        }
        if let Some(patch) = &self.bbox_2d {
            patch.apply(&mut annotation.bbox_2d);
        }
        if let Some(patch) = &self.bbox_3d {
            patch.apply(&mut annotation.bbox_3d);
        }
        if let Some(tracking_id) = &self.tracking_id {
            annotation.tracking_id = tracking_id.clone();
        }
    }
}
