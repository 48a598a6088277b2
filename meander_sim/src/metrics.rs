use bevy::prelude::*;

use crate::bodies::BodyKindTag;
use crate::resources::SimulationTick;
use crate::water_cycle::{FlowReport, ResolutionReport, WaterCycle};

#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct CycleMetrics {
    pub tick: u64,
    pub rivers: usize,
    pub oxbows: usize,
    pub springs: usize,
    pub points: usize,
    pub hierarchy_edges: usize,
    pub points_inserted: usize,
    pub points_removed: usize,
    pub splits: usize,
    pub destroyed: usize,
    pub collisions_detected: usize,
    pub collisions_resolved: usize,
    pub collisions_stale: usize,
    pub oxbows_created: usize,
}

impl CycleMetrics {
    pub fn record_flow(&mut self, report: &FlowReport) {
        self.points_inserted = report.points_inserted;
        self.points_removed = report.points_removed;
        self.splits = report.splits;
        self.destroyed = report.destroyed;
    }

    pub fn record_resolution(&mut self, detected: usize, report: &ResolutionReport) {
        self.collisions_detected = detected;
        self.collisions_resolved = report.resolved;
        self.collisions_stale = report.stale;
        self.oxbows_created = report.oxbows_created;
        self.splits += report.splits;
    }
}

pub fn collect_metrics(
    cycle: Res<WaterCycle>,
    tick: Res<SimulationTick>,
    mut metrics: ResMut<CycleMetrics>,
) {
    metrics.tick = tick.0;
    metrics.rivers = cycle.count_kind(BodyKindTag::River);
    metrics.oxbows = cycle.count_kind(BodyKindTag::Oxbow);
    metrics.springs = cycle.count_kind(BodyKindTag::Spring);
    metrics.points = cycle.graph().len();
    metrics.hierarchy_edges = cycle.hierarchy().edge_count();

    tracing::debug!(
        target: "meander::flow",
        tick = metrics.tick,
        rivers = metrics.rivers,
        oxbows = metrics.oxbows,
        points = metrics.points,
        collisions = metrics.collisions_resolved,
        "cycle.metrics"
    );
}
