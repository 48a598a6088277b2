use std::collections::HashMap;

use bevy::math::{IVec3, Vec3};
use rayon::prelude::*;

use crate::bodies::{BodyId, BodyKindTag};
use crate::points::{PointId, PointOrder};

/// Per-tick projection of a water point for proximity queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPoint {
    pub point: PointId,
    pub body: BodyId,
    pub kind: BodyKindTag,
    pub order: PointOrder,
    pub position: Vec3,
    pub radius: f32,
}

/// `external` lies within `internal`'s radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPair {
    pub internal: CollisionPoint,
    pub external: CollisionPoint,
}

/// Uniform hash grid with cells as wide as the largest collision radius.
#[derive(Debug, Clone, Default)]
pub struct CollisionGrid {
    cell_size: f32,
    points: Vec<CollisionPoint>,
    cells: HashMap<IVec3, Vec<usize>>,
}

impl CollisionGrid {
    pub fn build(points: Vec<CollisionPoint>) -> Self {
        let cell_size = points
            .iter()
            .map(|point| point.radius)
            .fold(0.0_f32, f32::max);
        let mut cells: HashMap<IVec3, Vec<usize>> = HashMap::new();
        if cell_size > 0.0 {
            for (index, point) in points.iter().enumerate() {
                cells
                    .entry(cell_of(point.position, cell_size))
                    .or_default()
                    .push(index);
            }
        }
        Self {
            cell_size,
            points,
            cells,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn points(&self) -> &[CollisionPoint] {
        &self.points
    }

    /// Every ordered pair whose distance is below the first point's radius.
    ///
    /// Cells are scanned in lexicographic order and their results concatenated
    /// in that order, so parallel scans match a sequential one exactly.
    pub fn collisions(&self) -> Vec<CollisionPair> {
        let mut keys: Vec<IVec3> = self.cells.keys().copied().collect();
        keys.sort_unstable_by_key(|cell| (cell.x, cell.y, cell.z));
        let per_cell: Vec<Vec<CollisionPair>> = keys
            .par_iter()
            .map(|cell| self.collisions_in_cell(*cell))
            .collect();
        per_cell.into_iter().flatten().collect()
    }

    fn collisions_in_cell(&self, cell: IVec3) -> Vec<CollisionPair> {
        let Some(members) = self.cells.get(&cell) else {
            return Vec::new();
        };
        let neighbours: Vec<usize> = NEIGHBOUR_OFFSETS
            .iter()
            .filter_map(|offset| self.cells.get(&(cell + *offset)))
            .flatten()
            .copied()
            .collect();

        let mut pairs = Vec::new();
        for &index in members {
            let internal = self.points[index];
            for &other in &neighbours {
                if other == index {
                    continue;
                }
                let external = self.points[other];
                if internal.position.distance(external.position) < internal.radius {
                    pairs.push(CollisionPair { internal, external });
                }
            }
        }
        pairs
    }
}

pub fn cell_of(position: Vec3, cell_size: f32) -> IVec3 {
    let scaled = (position / cell_size).round();
    IVec3::new(scaled.x as i32, scaled.y as i32, scaled.z as i32)
}

const NEIGHBOUR_OFFSETS: [IVec3; 27] = neighbour_offsets();

const fn neighbour_offsets() -> [IVec3; 27] {
    let mut offsets = [IVec3::ZERO; 27];
    let mut i = 0;
    while i < 27 {
        let x = (i / 9) as i32 - 1;
        let y = ((i / 3) % 3) as i32 - 1;
        let z = (i % 3) as i32 - 1;
        offsets[i] = IVec3::new(x, y, z);
        i += 1;
    }
    offsets
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::points::PointGraph;

    fn cloud(seed: u64, count: usize, spread: f32) -> Vec<CollisionPoint> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut graph = PointGraph::new();
        (0..count)
            .map(|i| {
                let position = Vec3::new(
                    rng.gen_range(-spread..spread),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-spread..spread),
                );
                let radius = if i % 5 == 0 { 0.2 } else { 0.5 };
                let point = graph.spawn(position, radius, &[]);
                CollisionPoint {
                    point,
                    body: BodyId((i % 3) as u32),
                    kind: BodyKindTag::River,
                    order: graph[point].order(),
                    position,
                    radius,
                }
            })
            .collect()
    }

    fn brute_force(points: &[CollisionPoint]) -> Vec<(PointId, PointId)> {
        let mut pairs = Vec::new();
        for a in points {
            for b in points {
                if a.point != b.point && a.position.distance(b.position) < a.radius {
                    pairs.push((a.point, b.point));
                }
            }
        }
        pairs.sort();
        pairs
    }

    #[test]
    fn grid_matches_brute_force() {
        for seed in 0..6 {
            let points = cloud(seed, 300, 6.0);
            let grid = CollisionGrid::build(points.clone());
            let mut found: Vec<(PointId, PointId)> = grid
                .collisions()
                .iter()
                .map(|pair| (pair.internal.point, pair.external.point))
                .collect();
            found.sort();
            assert_eq!(found, brute_force(&points), "seed {seed}");
        }
    }

    #[test]
    fn output_order_is_stable() {
        let points = cloud(42, 200, 4.0);
        let first = CollisionGrid::build(points.clone()).collisions();
        let second = CollisionGrid::build(points).collisions();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_radius_points_never_collide() {
        let mut points = cloud(3, 10, 0.1);
        for point in &mut points {
            point.radius = 0.0;
        }
        let grid = CollisionGrid::build(points);
        assert_eq!(grid.cell_size(), 0.0);
        assert!(grid.collisions().is_empty());
    }

    #[test]
    fn offsets_cover_the_neighbourhood_once() {
        let mut offsets = NEIGHBOUR_OFFSETS.to_vec();
        offsets.sort_unstable_by_key(|o| (o.x, o.y, o.z));
        offsets.dedup();
        assert_eq!(offsets.len(), 27);
        assert_eq!(NEIGHBOUR_OFFSETS[0], IVec3::new(-1, -1, -1));
        assert_eq!(NEIGHBOUR_OFFSETS[13], IVec3::ZERO);
    }
}
