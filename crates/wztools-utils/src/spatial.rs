//! Nearest-point lookup over (lon, lat) coordinate tables.

use rstar::RTree;
use thiserror::Error;

/// Maximum number of candidates examined when a minimum distance applies
pub const MAX_CANDIDATES: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum SpatialError {
    #[error("Coordinate table is empty")]
    EmptyTable,

    #[error("No point found farther than {min_dis} from the target")]
    NoPointBeyond { min_dis: f64 },

    #[error("Coordinate ({lon}, {lat}) is not finite")]
    NonFiniteCoordinate { lon: f64, lat: f64 },
}

pub type Result<T> = std::result::Result<T, SpatialError>;

/// The R-tree cannot order NaN or infinite coordinates
fn check_finite(lon: f64, lat: f64) -> Result<[f64; 2]> {
    if lon.is_finite() && lat.is_finite() {
        Ok([lon, lat])
    } else {
        Err(SpatialError::NonFiniteCoordinate { lon, lat })
    }
}

/// R-tree over distinct (lon, lat) pairs, compared in plain Euclidean space.
pub struct NearestPointIndex {
    tree: RTree<[f64; 2]>,
}

impl NearestPointIndex {
    pub fn new<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut coords = points
            .into_iter()
            .map(|(lon, lat)| check_finite(lon, lat))
            .collect::<Result<Vec<_>>>()?;
        coords.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
        coords.dedup();

        if coords.is_empty() {
            return Err(SpatialError::EmptyTable);
        }

        tracing::debug!(points = coords.len(), "Built nearest-point index");
        Ok(Self {
            tree: RTree::bulk_load(coords),
        })
    }

    /// Number of distinct points
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest point to `target`.
    ///
    /// With `min_dis > 0` only the closest [`MAX_CANDIDATES`] points are
    /// considered, and the first one strictly farther than `min_dis` wins.
    pub fn nearest(&self, target: (f64, f64), min_dis: f64) -> Result<(f64, f64)> {
        let query = check_finite(target.0, target.1)?;

        if min_dis <= 0.0 {
            return self
                .tree
                .nearest_neighbor(&query)
                .map(|p| (p[0], p[1]))
                .ok_or(SpatialError::EmptyTable);
        }

        let k = MAX_CANDIDATES.min(self.len());
        self.tree
            .nearest_neighbor_iter(&query)
            .take(k)
            .find(|p| distance(p, &query) > min_dis)
            .map(|p| (p[0], p[1]))
            .ok_or(SpatialError::NoPointBeyond { min_dis })
    }
}

fn distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Find the point of `points` nearest to `target` whose distance exceeds
/// `min_dis` (any distance when `min_dis <= 0`).
pub fn fetch_nearest_point<I>(points: I, target: (f64, f64), min_dis: f64) -> Result<(f64, f64)>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    NearestPointIndex::new(points)?.nearest(target, min_dis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<(f64, f64)> {
        vec![(120.0, 30.0), (120.5, 30.0), (121.0, 30.0)]
    }

    #[test]
    fn test_unconditional_nearest() {
        let nearest = fetch_nearest_point(grid(), (120.4, 30.1), 0.0).unwrap();
        assert_eq!(nearest, (120.5, 30.0));
    }

    #[test]
    fn test_min_distance_skips_close_points() {
        // (120.5, 30.0) is 0.1 away; the next closest is (120.0, 30.0) at 0.4
        let nearest = fetch_nearest_point(grid(), (120.4, 30.0), 0.2).unwrap();
        assert_eq!(nearest, (120.0, 30.0));
    }

    #[test]
    fn test_min_distance_is_strict() {
        let err = fetch_nearest_point(grid(), (120.5, 30.0), 0.5).unwrap_err();
        assert_eq!(err, SpatialError::NoPointBeyond { min_dis: 0.5 });
    }

    #[test]
    fn test_no_candidate_beyond_threshold() {
        let err = fetch_nearest_point(grid(), (120.5, 30.0), 5.0).unwrap_err();
        assert!(matches!(err, SpatialError::NoPointBeyond { .. }));
    }

    #[test]
    fn test_only_top_candidates_are_considered() {
        // Eleven points near the origin plus one far away: the far point is
        // outside the ten nearest and is never returned
        let mut points: Vec<_> = (0..11).map(|i| (i as f64 * 0.01, 0.0)).collect();
        points.push((50.0, 50.0));
        let err = fetch_nearest_point(points, (0.0, 0.0), 1.0).unwrap_err();
        assert_eq!(err, SpatialError::NoPointBeyond { min_dis: 1.0 });
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let mut points = grid();
        points.extend(grid());
        let index = NearestPointIndex::new(points).unwrap();
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_non_finite_table_point_is_rejected() {
        let mut points: Vec<_> = (0..20).map(|i| (i as f64, i as f64)).collect();
        points.push((f64::NAN, 1.0));
        let err = fetch_nearest_point(points, (0.0, 0.0), 0.0).unwrap_err();
        assert!(matches!(err, SpatialError::NonFiniteCoordinate { lat, .. } if lat == 1.0));

        let err = NearestPointIndex::new(vec![(1.0, f64::INFINITY)]).err().unwrap();
        assert!(matches!(err, SpatialError::NonFiniteCoordinate { .. }));
    }

    #[test]
    fn test_non_finite_target_is_rejected() {
        let index = NearestPointIndex::new(grid()).unwrap();
        for min_dis in [0.0, 0.5] {
            let err = index.nearest((f64::NAN, 0.0), min_dis).unwrap_err();
            assert!(matches!(err, SpatialError::NonFiniteCoordinate { lat, .. } if lat == 0.0));
        }
        assert!(index.nearest((120.0, f64::NEG_INFINITY), 0.0).is_err());
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(
            fetch_nearest_point(Vec::new(), (0.0, 0.0), 0.0).unwrap_err(),
            SpatialError::EmptyTable
        );
    }
}
