//! Automatic box proposals
//!
//! Groups scan points with DBSCAN and fits an axis-aligned box around each
//! cluster. The proposals are a starting point for manual annotation, so
//! every box comes out with zero yaw.

use crate::nearest_neighbor::{BruteForceSearch, NearestNeighborSearch, RTreeSearch};
use crate::normalize::Normalizer;
use log::debug;
use rayon::prelude::*;
use scanmark_core::{BBox3D, Drawable, Error, Point3f, PointCloud, Result};

/// Inputs up to this size are searched by brute force instead of an R-tree
pub const BRUTE_FORCE_LIMIT: usize = 256;

/// DBSCAN settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Neighbourhood radius in scan units
    pub eps: f32,
    /// Neighbours (the point itself included) needed for a core point
    pub min_samples: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 10,
        }
    }
}

impl ClusterParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(Error::InvalidData("eps must be positive".to_string()));
        }
        if self.min_samples == 0 {
            return Err(Error::InvalidData("min_samples must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Label every point with a cluster index, or `None` for noise.
///
/// Cluster indices are assigned in order of discovery, scanning points in
/// input order.
pub fn dbscan(points: &[Point3f], params: &ClusterParams) -> Result<Vec<Option<usize>>> {
    params.validate()?;

    let neighborhoods = if points.len() <= BRUTE_FORCE_LIMIT {
        radius_neighborhoods(&BruteForceSearch::new(points), points, params.eps)
    } else {
        radius_neighborhoods(&RTreeSearch::new(points), points, params.eps)
    };
    let is_core = |i: usize| neighborhoods[i].len() >= params.min_samples;

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut cluster = 0;

    for start in 0..points.len() {
        if visited[start] || !is_core(start) {
            continue;
        }

        visited[start] = true;
        labels[start] = Some(cluster);
        let mut frontier = vec![start];
        while let Some(current) = frontier.pop() {
            for &neighbor in &neighborhoods[current] {
                if labels[neighbor].is_none() {
                    labels[neighbor] = Some(cluster);
                }
                if !visited[neighbor] && is_core(neighbor) {
                    visited[neighbor] = true;
                    frontier.push(neighbor);
                }
            }
        }
        cluster += 1;
    }

    debug!(
        "dbscan: {} clusters, {} noise points out of {}",
        cluster,
        labels.iter().filter(|l| l.is_none()).count(),
        points.len()
    );
    Ok(labels)
}

/// Neighbour indices of every point, each list in ascending index order
fn radius_neighborhoods<S>(search: &S, points: &[Point3f], eps: f32) -> Vec<Vec<usize>>
where
    S: NearestNeighborSearch + Sync,
{
    points
        .par_iter()
        .map(|p| {
            search
                .find_radius_neighbors(p, eps)
                .into_iter()
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect()
}

/// Axis-aligned box around a set of points, `None` when it is empty
pub fn fit_bbox(points: &[Point3f]) -> Option<BBox3D> {
    points.bounding_box().map(|extent| BBox3D::from_extent(&extent))
}

/// Cluster a scan and propose one box per cluster, in cluster order.
/// Sensor-error samples are dropped before clustering.
pub fn propose_boxes(cloud: &PointCloud, params: &ClusterParams) -> Result<Vec<BBox3D>> {
    let filter = Normalizer::default();
    let points: Vec<Point3f> = cloud.positions().filter(|p| !filter.is_outlier(p)).collect();

    let labels = dbscan(&points, params)?;
    let cluster_count = labels.iter().flatten().max().map_or(0, |max| max + 1);

    let mut members: Vec<Vec<Point3f>> = vec![Vec::new(); cluster_count];
    for (point, label) in points.iter().zip(&labels) {
        if let Some(label) = label {
            members[*label].push(*point);
        }
    }

    Ok(members.iter().filter_map(|cluster| fit_bbox(cluster)).collect())
}
