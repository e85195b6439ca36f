//! Nearest neighbor search implementations

use rstar::primitives::GeomWithData;
use rstar::RTree;
use scanmark_core::Point3f;

/// Trait for radius neighbourhood queries
pub trait NearestNeighborSearch {
    /// Find all neighbors within a given radius, as (index, distance) pairs.
    /// The query point itself is included when it is part of the set.
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)>;
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch<'a> {
    points: &'a [Point3f],
}

impl<'a> BruteForceSearch<'a> {
    pub fn new(points: &'a [Point3f]) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl NearestNeighborSearch for BruteForceSearch<'_> {
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let radius_squared = radius * radius;
        self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let dx = point.x - query.x;
                let dy = point.y - query.y;
                let dz = point.z - query.z;
                let distance_squared = dx * dx + dy * dy + dz * dz;

                if distance_squared <= radius_squared {
                    Some((idx, distance_squared.sqrt()))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Indexed point stored in the R-tree
type IndexedPoint = GeomWithData<[f32; 3], usize>;

/// R*-tree backed search for full scans.
///
/// Points with a non-finite coordinate are left out of the tree and never
/// match a query.
pub struct RTreeSearch {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl RTreeSearch {
    pub fn new(points: &[Point3f]) -> Self {
        let indexed = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.iter().all(|c| c.is_finite()))
            .map(|(idx, p)| IndexedPoint::new([p.x, p.y, p.z], idx))
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
            len: points.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl NearestNeighborSearch for RTreeSearch {
    /// Same result as [`BruteForceSearch`]: inclusive radius, ascending index order
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        if !query.iter().all(|c| c.is_finite()) {
            return Vec::new();
        }
        let center = [query.x, query.y, query.z];
        let mut neighbors: Vec<(usize, f32)> = self
            .tree
            .locate_within_distance(center, radius * radius)
            .map(|entry| {
                let p = entry.geom();
                let dx = p[0] - center[0];
                let dy = p[1] - center[1];
                let dz = p[2] - center[2];
                (entry.data, (dx * dx + dy * dy + dz * dz).sqrt())
            })
            .collect();
        neighbors.sort_unstable_by_key(|(idx, _)| *idx);
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_search_includes_boundary_and_self() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 2.0, 0.0),
        ];
        let search = BruteForceSearch::new(&points);
        assert_eq!(search.len(), 3);

        let neighbors: Vec<usize> = search
            .find_radius_neighbors(&points[0], 1.0)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(neighbors, vec![0, 1]);
    }

    #[test]
    fn test_radius_search_empty() {
        let search = BruteForceSearch::new(&[]);
        assert!(search.is_empty());
        assert!(search.find_radius_neighbors(&Point3f::origin(), 10.0).is_empty());
    }

    #[test]
    fn test_rtree_matches_brute_force() {
        let points: Vec<Point3f> = (0..500)
            .map(|i| {
                let t = i as f32;
                Point3f::new((t * 0.37).sin() * 4.0, (t * 0.11).cos() * 2.0, (t * 0.23).sin() * 4.0)
            })
            .collect();
        let brute = BruteForceSearch::new(&points);
        let tree = RTreeSearch::new(&points);
        assert_eq!(tree.len(), points.len());

        for query in points.iter().step_by(37) {
            let expected: Vec<usize> = brute.find_radius_neighbors(query, 0.8).into_iter().map(|(i, _)| i).collect();
            let found: Vec<usize> = tree.find_radius_neighbors(query, 0.8).into_iter().map(|(i, _)| i).collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_rtree_skips_non_finite_points() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(f32::NAN, 0.0, 0.0),
            Point3f::new(0.5, 0.0, 0.0),
        ];
        let tree = RTreeSearch::new(&points);

        let neighbors: Vec<usize> = tree
            .find_radius_neighbors(&points[0], 1.0)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(neighbors, vec![0, 2]);
        assert!(tree.find_radius_neighbors(&points[1], 1.0).is_empty());
    }
}
