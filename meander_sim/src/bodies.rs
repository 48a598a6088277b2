use std::fmt;

use serde::{Deserialize, Serialize};

use crate::points::PointId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl BodyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    River,
    Oxbow,
    /// Holds its source point outside the body's point sequence.
    Spring { source: PointId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKindTag {
    River,
    Oxbow,
    Spring,
}

impl BodyKind {
    pub fn tag(&self) -> BodyKindTag {
        match self {
            BodyKind::River => BodyKindTag::River,
            BodyKind::Oxbow => BodyKindTag::Oxbow,
            BodyKind::Spring { .. } => BodyKindTag::Spring,
        }
    }
}

impl fmt::Display for BodyKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BodyKindTag::River => "river",
            BodyKindTag::Oxbow => "oxbow",
            BodyKindTag::Spring => "spring",
        };
        f.write_str(label)
    }
}

/// Rate-limited drain from one body into another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sink {
    pub body: BodyId,
    pub max_rate: f32,
}

#[derive(Debug, Clone)]
pub struct WaterBody {
    id: BodyId,
    kind: BodyKind,
    pub points: Vec<PointId>,
    pub volume: f32,
    pub capacity: f32,
    pub sinks: Vec<Sink>,
}

impl WaterBody {
    pub fn new(id: BodyId, kind: BodyKind, points: Vec<PointId>, volume: f32, capacity: f32) -> Self {
        Self {
            id,
            kind,
            points,
            volume,
            capacity,
            sinks: Vec::new(),
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn tag(&self) -> BodyKindTag {
        self.kind.tag()
    }

    pub fn contains_point(&self, point: PointId) -> bool {
        self.points.contains(&point)
    }

    pub fn index_of(&self, point: PointId) -> Option<usize> {
        self.points.iter().position(|candidate| *candidate == point)
    }

    pub fn available_capacity(&self) -> f32 {
        if self.capacity.is_infinite() {
            f32::INFINITY
        } else {
            self.capacity - self.volume
        }
    }

    /// Takes in as much of `offered` as capacity allows and returns the accepted amount.
    pub fn accept(&mut self, offered: f32) -> f32 {
        let accepted = self.available_capacity().min(offered).max(0.0);
        self.volume += accepted;
        accepted
    }
}
