//! I/O operations for scanmark
//!
//! This crate decodes binary PCD scans into point clouds, reads and writes
//! the annotation exchange document, and loads frame folders.

pub mod pcd;
pub mod annotation;
pub mod frame;

pub use pcd::{HeaderParser, PcdDecoder, PcdHeader, PcdReader, HEADER_SCAN_LIMIT};
pub use annotation::{read_annotations, result_file_name, write_annotations, ExchangeDocument};
pub use frame::{Frame, FrameFiles};

use scanmark_core::{PointCloud, Result};
use std::path::Path;

/// Trait for reading point clouds from files
pub trait PointCloudReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud>;
}

/// Auto-detect format and read point cloud
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("pcd") => PcdReader::read_point_cloud(path),
        _ => Err(scanmark_core::Error::Unsupported(format!(
            "Unsupported point cloud format: {:?}",
            path.extension()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_point_cloud_rejects_other_formats() {
        let result = read_point_cloud("scan.ply");
        assert!(matches!(result, Err(scanmark_core::Error::Unsupported(_))));
    }

    #[test]
    fn test_read_point_cloud_dispatches_pcd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pcd");
        std::fs::write(&path, "FIELDS x y z\nPOINTS 0\nDATA binary\n").unwrap();

        let cloud = read_point_cloud(&path).unwrap();
        assert!(cloud.is_empty());
        assert_eq!(cloud.name.as_deref(), Some("empty.pcd"));
    }
}
