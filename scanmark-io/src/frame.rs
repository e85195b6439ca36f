//! Frame folder helpers
//!
//! A frame folder holds one scan, optionally a camera image, and optionally
//! an `annotations.json`. Locating the candidate paths is the caller's job;
//! this module sorts them and loads what it can decode.

use crate::annotation;
use crate::pcd::PcdReader;
use crate::PointCloudReader;
use log::{debug, info};
use scanmark_core::{Annotation, PointCloud, Result};
use std::path::{Path, PathBuf};

/// File name of the annotation document inside a frame folder
pub const ANNOTATIONS_FILE_NAME: &str = "annotations.json";

const IMAGE_EXTENSIONS: [&str; 4] = ["bmp", "jpg", "jpeg", "png"];

/// The files that make up one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFiles {
    pub point_cloud: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub annotations: Option<PathBuf>,
}

/// A loaded frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub point_cloud: Option<PointCloud>,
    pub image: Option<PathBuf>,
    pub annotations: Vec<Annotation>,
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

impl FrameFiles {
    /// Sort candidate paths. The first `.pcd` and first image win; the
    /// annotation file must be named exactly `annotations.json`.
    pub fn classify<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut files = Self::default();
        for path in paths {
            let path = path.as_ref();
            let extension = extension_of(path);
            let is_annotations = path.file_name().and_then(|n| n.to_str()) == Some(ANNOTATIONS_FILE_NAME);

            if extension.as_deref() == Some("pcd") && files.point_cloud.is_none() {
                files.point_cloud = Some(path.to_path_buf());
            } else if extension
                .as_deref()
                .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext))
                && files.image.is_none()
            {
                files.image = Some(path.to_path_buf());
            } else if is_annotations {
                files.annotations = Some(path.to_path_buf());
            }
        }
        files
    }

    /// Name of the folder holding the point cloud
    pub fn folder_name(&self) -> Option<String> {
        self.point_cloud.as_deref().and_then(folder_name)
    }

    /// Decode the point cloud and parse the annotations, failing on the
    /// first error so no half-loaded frame is returned
    pub fn load(&self) -> Result<Frame> {
        let point_cloud = self
            .point_cloud
            .as_ref()
            .map(PcdReader::read_point_cloud)
            .transpose()?;
        let annotations = match &self.annotations {
            Some(path) => annotation::read_annotations(path)?,
            None => Vec::new(),
        };

        info!(
            "loaded frame {:?}: {} points, {} annotations",
            self.folder_name(),
            point_cloud.as_ref().map_or(0, PointCloud::len),
            annotations.len()
        );

        Ok(Frame {
            point_cloud,
            image: self.image.clone(),
            annotations,
        })
    }
}

/// Name of the directory directly containing `path`
pub fn folder_name(path: &Path) -> Option<String> {
    let name = path.parent()?.file_name()?.to_str()?.to_string();
    debug!("folder of {} is {}", path.display(), name);
    Some(name)
}
