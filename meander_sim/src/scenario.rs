use bevy::math::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::bodies::BodyId;
use crate::config::RiverConfig;
use crate::terrain::TerrainSampler;
use crate::water_cycle::WaterCycle;

/// Scatters `count` springs over a square of side `extent` starting at the
/// origin, dropped onto the terrain. The same seed always yields the same
/// placements.
pub fn seed_springs(
    cycle: &mut WaterCycle,
    config: &RiverConfig,
    terrain: &dyn TerrainSampler,
    count: usize,
    extent: f32,
    seed: u64,
) -> Vec<BodyId> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let extent = extent.max(f32::EPSILON);
    let springs: Vec<BodyId> = (0..count)
        .map(|_| {
            let x = rng.gen_range(0.0..extent);
            let z = rng.gen_range(0.0..extent);
            let position = terrain.project(Vec3::new(x, 0.0, z));
            cycle.spawn_spring(position, config)
        })
        .collect();
    cycle.drain_topology_events();
    tracing::info!(
        target: "meander::topology",
        count,
        seed,
        "scenario.springs_seeded"
    );
    springs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bodies::BodyKindTag;
    use crate::terrain::FlatTerrain;

    #[test]
    fn same_seed_same_layout() {
        let config = RiverConfig::default();
        let terrain = FlatTerrain { elevation: 1.5 };
        let mut a = WaterCycle::new();
        let mut b = WaterCycle::new();
        seed_springs(&mut a, &config, &terrain, 4, 20.0, 99);
        seed_springs(&mut b, &config, &terrain, 4, 20.0, 99);
        let positions = |cycle: &WaterCycle| -> Vec<Vec3> {
            cycle.graph().iter().map(|(_, point)| point.position).collect()
        };
        assert_eq!(positions(&a), positions(&b));
        assert_eq!(a.count_kind(BodyKindTag::Spring), 4);
        assert_eq!(a.hierarchy().vertex_count(), 8);
        assert!(positions(&a).iter().all(|p| p.y == 1.5));
    }
}
