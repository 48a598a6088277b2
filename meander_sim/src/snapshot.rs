use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bodies::{BodyKindTag, WaterBody};
use crate::resources::SimulationTick;
use crate::water_cycle::WaterCycle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: u32,
    pub kind: BodyKindTag,
    /// `None` for unbounded amounts, as springs carry.
    pub volume: Option<f32>,
    pub capacity: Option<f32>,
    pub points: Vec<[f32; 3]>,
    pub sinks: Vec<u32>,
}

/// Serializable view of the whole network at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub tick: u64,
    pub bodies: Vec<BodySnapshot>,
    pub digest: u64,
}

impl NetworkSnapshot {
    pub fn capture(tick: u64, cycle: &WaterCycle) -> Self {
        let bodies: Vec<BodySnapshot> = cycle
            .bodies()
            .map(|body| body_snapshot(cycle, body))
            .collect();
        let digest = digest_bodies(tick, &bodies);
        Self {
            tick,
            bodies,
            digest,
        }
    }

    pub fn point_count(&self) -> usize {
        self.bodies.iter().map(|body| body.points.len()).sum()
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct LatestSnapshot(pub Option<NetworkSnapshot>);

pub fn capture_snapshot(
    tick: Res<SimulationTick>,
    cycle: Res<WaterCycle>,
    mut latest: ResMut<LatestSnapshot>,
) {
    latest.0 = Some(NetworkSnapshot::capture(tick.0, &cycle));
}

fn body_snapshot(cycle: &WaterCycle, body: &WaterBody) -> BodySnapshot {
    BodySnapshot {
        id: body.id().0,
        kind: body.tag(),
        volume: bounded(body.volume),
        capacity: bounded(body.capacity),
        points: body
            .points
            .iter()
            .filter_map(|point| cycle.graph().position(*point))
            .map(|position| position.to_array())
            .collect(),
        sinks: body.sinks.iter().map(|sink| sink.body.0).collect(),
    }
}

fn bounded(amount: f32) -> Option<f32> {
    amount.is_finite().then_some(amount)
}

/// FNV-1a over tick, body ids, sinks and position bit patterns.
fn digest_bodies(tick: u64, bodies: &[BodySnapshot]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut state = OFFSET_BASIS;
    let mut feed = |bytes: &[u8]| {
        for &byte in bytes {
            state ^= byte as u64;
            state = state.wrapping_mul(PRIME);
        }
    };
    feed(&tick.to_le_bytes());
    for body in bodies {
        feed(&body.id.to_le_bytes());
        feed(&[body.kind as u8]);
        let volume = body.volume.unwrap_or(f32::INFINITY);
        feed(&volume.to_bits().to_le_bytes());
        for point in &body.points {
            for component in point {
                feed(&component.to_bits().to_le_bytes());
            }
        }
        for sink in &body.sinks {
            feed(&sink.to_le_bytes());
        }
    }
    state
}
