//! 2-D spatial index over city records, haversine distance metric.
//!
//! Nodes are indexed by their unit-sphere Cartesian projection rather than
//! raw lat/lon degrees, so the R*-tree's pruning metric (squared Euclidean
//! chord distance) is monotonic with great-circle distance everywhere,
//! including across the antimeridian and near the poles. The haversine
//! formula is then applied to every candidate before sorting and returning,
//! so returned distances are always exact great-circle kilometers.

use haversine::{distance as haversine_distance, Location, Units};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::model::Point;

/// One indexed node: its unit-sphere position plus the index into the
/// caller's city array. Kept minimal — the spatial index owns no city data.
#[derive(Debug, Clone, Copy)]
pub struct IndexedPoint {
    pub city_index: usize,
    latitude: f64,
    longitude: f64,
    xyz: [f64; 3],
}

/// Project a (latitude, longitude) in decimal degrees onto the unit sphere.
fn to_unit_sphere(latitude: f64, longitude: f64) -> [f64; 3] {
    let lat = latitude.to_radians();
    let lon = longitude.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.xyz[0] - point[0];
        let dy = self.xyz[1] - point[1];
        let dz = self.xyz[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

/// Haversine great-circle distance in kilometers.
pub fn haversine_km(a: Point, b: Point) -> f64 {
    haversine_distance(
        Location { latitude: a.latitude, longitude: a.longitude },
        Location { latitude: b.latitude, longitude: b.longitude },
        Units::Kilometers,
    )
}

impl SpatialIndex {
    /// Build a one-shot index over `(latitude, longitude)` pairs.
    /// Construction is build-once; no insertion or deletion is supported
    /// afterward.
    pub fn build(points: impl Iterator<Item = (f64, f64)>) -> Self {
        let nodes: Vec<IndexedPoint> = points
            .enumerate()
            .map(|(city_index, (latitude, longitude))| IndexedPoint {
                city_index,
                latitude,
                longitude,
                xyz: to_unit_sphere(latitude, longitude),
            })
            .collect();
        let len = nodes.len();
        SpatialIndex { tree: RTree::bulk_load(nodes), len }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return up to `k` nearest city indices with their exact haversine
    /// distance, sorted nearest-first. Returns all points when `k` exceeds
    /// the corpus size.
    pub fn nearest(&self, query: Point, k: usize) -> Vec<(usize, f64)> {
        if k == 0 || self.len == 0 {
            return Vec::new();
        }

        let query_xyz = to_unit_sphere(query.latitude, query.longitude);
        let mut hits: Vec<(usize, f64)> = self
            .tree
            .nearest_neighbor_iter(&query_xyz)
            .take(k)
            .map(|node| {
                let city_point = Point { latitude: node.latitude, longitude: node.longitude };
                (node.city_index, haversine_km(query, city_point))
            })
            .collect();

        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_own_coordinates_is_near_zero() {
        let cities = vec![(48.466667, 9.133333), (51.5074, -0.1278), (35.6762, 139.6503)];
        let index = SpatialIndex::build(cities.iter().copied());
        let query = Point::new(48.466667, 9.133333).unwrap();
        let hits = index.nearest(query, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);
        assert!(hits[0].1 < 0.001);
    }

    #[test]
    fn nearest_sorted_ascending_and_capped() {
        let cities = vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)];
        let index = SpatialIndex::build(cities.iter().copied());
        let hits = index.nearest(Point::new(0.0, 0.0).unwrap(), 2);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn k_greater_than_corpus_returns_all() {
        let cities = vec![(0.0, 0.0), (1.0, 1.0)];
        let index = SpatialIndex::build(cities.iter().copied());
        let hits = index.nearest(Point::new(0.0, 0.0).unwrap(), 50);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn antimeridian_neighbors_are_symmetric() {
        let cities = vec![(10.0, 179.999), (10.0, -179.999)];
        let index = SpatialIndex::build(cities.iter().copied());
        let from_east = index.nearest(Point::new(10.0, 179.9999).unwrap(), 1);
        let from_west = index.nearest(Point::new(10.0, -179.9999).unwrap(), 1);
        assert!(from_east[0].1 < 1.0);
        assert!(from_west[0].1 < 1.0);
    }

    #[test]
    fn across_the_antimeridian_true_nearest_wins_over_same_side_decoy() {
        // A decoy sits on the query's own side but far away in true
        // distance; the true nearest neighbor is just across the seam.
        let cities = vec![(0.0, 170.0), (0.0, -179.9)];
        let index = SpatialIndex::build(cities.iter().copied());
        let hits = index.nearest(Point::new(0.0, 179.9).unwrap(), 1);
        assert_eq!(hits[0].0, 1);
        assert!(hits[0].1 < 50.0);
    }

    #[test]
    fn high_latitude_nearest_matches_haversine_ranking() {
        // Near the pole, a degree of longitude covers far less ground than
        // a degree of latitude; the chord metric must still rank by true
        // great-circle distance rather than raw degree deltas.
        let far_in_degrees_close_in_km = (89.9, 90.0);
        let close_in_degrees_far_in_km = (80.0, 0.1);
        let cities = vec![far_in_degrees_close_in_km, close_in_degrees_far_in_km];
        let index = SpatialIndex::build(cities.iter().copied());
        let hits = index.nearest(Point::new(89.9, 0.0).unwrap(), 1);
        assert_eq!(hits[0].0, 0);
    }
}
