use std::sync::Arc;

use bevy::{math::Vec3, prelude::*};

use crate::collision::CollisionPair;
use crate::presentation::{NullPresenter, Presenter};
use crate::terrain::{FlatTerrain, TerrainSampler};

/// Tick counter incremented after every full flow/collision step.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationTick(pub u64);

/// Ground the network flows over.
#[derive(Resource, Clone)]
pub struct TerrainHandle(pub Arc<dyn TerrainSampler>);

impl TerrainHandle {
    pub fn new(sampler: impl TerrainSampler + 'static) -> Self {
        Self(Arc::new(sampler))
    }

    pub fn flat(elevation: f32) -> Self {
        Self::new(FlatTerrain { elevation })
    }

    pub fn sampler(&self) -> &dyn TerrainSampler {
        self.0.as_ref()
    }
}

impl Default for TerrainHandle {
    fn default() -> Self {
        Self::flat(0.0)
    }
}

#[derive(Resource)]
pub struct Presentation(pub Box<dyn Presenter>);

impl Presentation {
    pub fn new(presenter: impl Presenter + 'static) -> Self {
        Self(Box::new(presenter))
    }

    pub fn presenter_mut(&mut self) -> &mut dyn Presenter {
        self.0.as_mut()
    }
}

impl Default for Presentation {
    fn default() -> Self {
        Self::new(NullPresenter)
    }
}

/// Spring placements requested from outside the simulation, consumed at the
/// start of the next tick.
#[derive(Resource, Debug, Clone, Default)]
pub struct SpawnRequests {
    queue: Vec<Vec3>,
}

impl SpawnRequests {
    pub fn push(&mut self, position: Vec3) {
        self.queue.push(position);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Vec3> + '_ {
        self.queue.drain(..)
    }
}

/// Contacts found this tick, waiting to be resolved.
#[derive(Resource, Debug, Clone, Default)]
pub struct PendingCollisions {
    pub pairs: Vec<CollisionPair>,
}
