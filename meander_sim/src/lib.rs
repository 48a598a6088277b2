//! Core simulation crate for branching, meandering river networks.
//!
//! Rivers are chains of water points that bend under a curvature rule,
//! keep their sample spacing bounded, and split, merge or pinch off oxbow
//! lakes when they touch. [`run_tick`] advances the network one step.

pub mod bodies;
pub mod collision;
pub mod config;
pub mod curvature;
pub mod events;
pub mod hierarchy;
pub mod math;
pub mod meander;
pub mod metrics;
pub mod points;
pub mod presentation;
mod resources;
pub mod scenario;
mod snapshot;
mod systems;
pub mod terrain;
mod water_cycle;

use bevy::prelude::*;

pub use bodies::{BodyId, BodyKind, BodyKindTag, Sink, WaterBody};
pub use collision::{CollisionGrid, CollisionPair, CollisionPoint};
pub use config::{
    load_river_config_from_env, DiagnosticFlags, RiverConfig, RiverConfigError,
    RiverConfigMetadata,
};
pub use events::{SubscriptionId, TopologyEvent};
pub use metrics::CycleMetrics;
pub use points::{GraphError, PointGraph, PointId, PointOrder, WaterPoint};
pub use presentation::{NullPresenter, PolylineRecorder, Presenter};
pub use resources::{
    PendingCollisions, Presentation, SimulationTick, SpawnRequests, TerrainHandle,
};
pub use snapshot::{BodySnapshot, LatestSnapshot, NetworkSnapshot};
pub use terrain::{ElevationField, FlatTerrain, HeightfieldTerrain, TerrainSampler};
pub use water_cycle::{FlowReport, ResolutionReport, TickReport, WaterCycle};

/// Construct a Bevy [`App`] configured with the river network tick pipeline.
pub fn build_headless_app() -> App {
    let mut app = App::new();

    let (config, metadata) = load_river_config_from_env();

    app.insert_resource(config)
        .insert_resource(metadata)
        .insert_resource(WaterCycle::default())
        .insert_resource(TerrainHandle::default())
        .insert_resource(Presentation::default())
        .insert_resource(SpawnRequests::default())
        .insert_resource(PendingCollisions::default())
        .insert_resource(SimulationTick::default())
        .insert_resource(CycleMetrics::default())
        .insert_resource(LatestSnapshot::default())
        .add_plugins(MinimalPlugins)
        .add_systems(
            Update,
            (
                systems::spawn_requested_springs,
                systems::flow_water_bodies,
                systems::detect_collisions,
                systems::resolve_collisions,
                systems::advance_tick,
                metrics::collect_metrics,
                snapshot::capture_snapshot,
            )
                .chain(),
        );

    app
}

/// Execute a single simulation tick.
pub fn run_tick(app: &mut App) {
    app.update();
}
