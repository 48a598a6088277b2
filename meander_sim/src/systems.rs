use bevy::{ecs::system::SystemParam, prelude::*};

use crate::config::RiverConfig;
use crate::metrics::CycleMetrics;
use crate::resources::{
    PendingCollisions, Presentation, SimulationTick, SpawnRequests, TerrainHandle,
};
use crate::water_cycle::WaterCycle;

#[derive(SystemParam)]
pub struct FlowParams<'w> {
    pub cycle: ResMut<'w, WaterCycle>,
    pub config: ResMut<'w, RiverConfig>,
    pub terrain: Res<'w, TerrainHandle>,
    pub presentation: ResMut<'w, Presentation>,
    pub metrics: ResMut<'w, CycleMetrics>,
}

/// Turn queued spawn requests into springs.
pub fn spawn_requested_springs(
    mut requests: ResMut<SpawnRequests>,
    mut cycle: ResMut<WaterCycle>,
    config: Res<RiverConfig>,
) {
    if requests.is_empty() {
        return;
    }
    for position in requests.drain() {
        cycle.spawn_spring(position, &config);
    }
    cycle.drain_topology_events();
}

/// Meander, resample and drain every body once.
pub fn flow_water_bodies(mut params: FlowParams) {
    let FlowParams {
        cycle,
        config,
        terrain,
        presentation,
        metrics,
    } = &mut params;
    let report = cycle.flow(config, terrain.sampler(), presentation.presenter_mut());
    metrics.record_flow(&report);
}

pub fn detect_collisions(cycle: Res<WaterCycle>, mut pending: ResMut<PendingCollisions>) {
    pending.pairs = cycle.detect_collisions();
}

pub fn resolve_collisions(
    mut cycle: ResMut<WaterCycle>,
    mut pending: ResMut<PendingCollisions>,
    config: Res<RiverConfig>,
    mut metrics: ResMut<CycleMetrics>,
) {
    let pairs = std::mem::take(&mut pending.pairs);
    let report = cycle.resolve_collisions(&pairs, &config);
    metrics.record_resolution(pairs.len(), &report);
}

/// Increment global tick counter after simulation step.
pub fn advance_tick(mut tick: ResMut<SimulationTick>) {
    tick.0 = tick.0.wrapping_add(1);
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::SystemState;

    use super::*;
    use crate::bodies::BodyKindTag;

    fn world_with_cycle() -> World {
        let mut world = World::new();
        world.insert_resource(WaterCycle::default());
        world.insert_resource(RiverConfig::default());
        world.insert_resource(TerrainHandle::default());
        world.insert_resource(Presentation::default());
        world.insert_resource(CycleMetrics::default());
        world.insert_resource(SpawnRequests::default());
        world.insert_resource(PendingCollisions::default());
        world
    }

    #[test]
    fn spawn_requests_become_springs() {
        let mut world = world_with_cycle();
        world
            .resource_mut::<SpawnRequests>()
            .push(Vec3::new(2.0, 0.0, 3.0));

        let mut state: SystemState<(
            ResMut<SpawnRequests>,
            ResMut<WaterCycle>,
            Res<RiverConfig>,
        )> = SystemState::new(&mut world);
        let (requests, cycle, config) = state.get_mut(&mut world);
        spawn_requested_springs(requests, cycle, config);
        state.apply(&mut world);

        let cycle = world.resource::<WaterCycle>();
        assert_eq!(cycle.count_kind(BodyKindTag::Spring), 1);
        assert_eq!(cycle.count_kind(BodyKindTag::River), 1);
        assert_eq!(cycle.hierarchy().edge_count(), 1);
        assert!(world.resource::<SpawnRequests>().is_empty());
    }

    #[test]
    fn flow_system_records_metrics() {
        let mut world = world_with_cycle();
        {
            let mut config = world.resource::<RiverConfig>().clone();
            config.max_sample_interval = 0.6;
            config.min_sample_interval = 0.25;
            world.insert_resource(config.clone());
            world
                .resource_mut::<WaterCycle>()
                .spawn_spring(Vec3::ZERO, &config);
        }

        let mut state: SystemState<FlowParams> = SystemState::new(&mut world);
        let params = state.get_mut(&mut world);
        flow_water_bodies(params);
        state.apply(&mut world);

        // the spring's river spans ~1.41, above the 0.6 ceiling
        assert!(world.resource::<CycleMetrics>().points_inserted >= 1);
    }
}
