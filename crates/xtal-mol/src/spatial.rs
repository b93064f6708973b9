//! Spatial hash grid for neighbor queries
//!
//! Used by the distance-range filter of the expansion engine.

use ahash::AHashMap;
use lin_alg::f64::Vec3;

/// Spatial hash grid over uniform cubic cells.
///
/// Neighbor queries check the 3×3×3 neighborhood of cells around the query
/// point, so every point within `cell_size` of it is returned.
pub struct SpatialGrid {
    cells: AHashMap<(i32, i32, i32), Vec<usize>>,
    cell_size: f64,
    len: usize,
}

impl SpatialGrid {
    pub fn with_capacity(cell_size: f64, expected_points: usize) -> Self {
        Self {
            cells: AHashMap::with_capacity(expected_points),
            cell_size: cell_size.max(1e-6),
            len: 0,
        }
    }

    fn cell_key(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, pos: Vec3, idx: usize) {
        let key = self.cell_key(pos);
        self.cells.entry(key).or_default().push(idx);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Collect all indices in the 3×3×3 neighborhood of the given position
    pub fn query_neighbors(&self, pos: Vec3, out: &mut Vec<usize>) {
        out.clear();
        let (cx, cy, cz) = self.cell_key(pos);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(indices) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        out.extend_from_slice(indices);
                    }
                }
            }
        }
    }

    /// Whether any stored point lies within `radius` of `pos`.
    ///
    /// `radius` must not exceed the cell size.
    pub fn any_within(&self, pos: Vec3, radius: f64, points: &[Vec3], scratch: &mut Vec<usize>) -> bool {
        self.query_neighbors(pos, scratch);
        let r2 = radius * radius;
        scratch
            .iter()
            .any(|&i| (points[i] - pos).magnitude_squared() <= r2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialGrid::with_capacity(2.0, 10);
        grid.insert(Vec3::new(0.0, 0.0, 0.0), 0);
        grid.insert(Vec3::new(1.0, 0.0, 0.0), 1);
        grid.insert(Vec3::new(0.0, 1.0, 0.0), 2);

        let mut neighbors = Vec::new();
        grid.query_neighbors(Vec3::new(0.5, 0.5, 0.0), &mut neighbors);
        neighbors.sort();

        assert_eq!(neighbors, vec![0, 1, 2]);
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_query_no_neighbors() {
        let mut grid = SpatialGrid::with_capacity(1.0, 10);
        grid.insert(Vec3::new(0.0, 0.0, 0.0), 0);

        let mut neighbors = Vec::new();
        grid.query_neighbors(Vec3::new(100.0, 100.0, 100.0), &mut neighbors);

        assert!(neighbors.is_empty());
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SpatialGrid::with_capacity(2.0, 4);
        grid.insert(Vec3::new(-1.0, -1.0, -1.0), 0);
        grid.insert(Vec3::new(1.0, 1.0, 1.0), 1);

        let mut neighbors = Vec::new();
        grid.query_neighbors(Vec3::new(0.0, 0.0, 0.0), &mut neighbors);
        neighbors.sort();

        assert_eq!(neighbors, vec![0, 1]);
    }

    #[test]
    fn test_any_within() {
        let points = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];
        let mut grid = SpatialGrid::with_capacity(2.5, points.len());
        for (i, p) in points.iter().enumerate() {
            grid.insert(*p, i);
        }
        let mut scratch = Vec::new();
        assert!(grid.any_within(Vec3::new(1.0, 0.0, 0.0), 2.5, &points, &mut scratch));
        assert!(!grid.any_within(Vec3::new(0.0, 5.0, 5.0), 2.5, &points, &mut scratch));
    }
}
