use std::collections::BTreeMap;

use bevy::math::Vec3;

use crate::bodies::{BodyId, BodyKindTag};

/// Lift applied to drawn centerlines so they sit above the terrain surface.
pub const LINE_HEIGHT_OFFSET: f32 = 0.1;
/// Lift applied to debug parent edges.
pub const EDGE_HEIGHT_OFFSET: f32 = 0.5;

/// Receives draw and erase requests for water bodies. Never reports back.
pub trait Presenter: Send + Sync {
    fn draw(&mut self, body: BodyId, kind: BodyKindTag, polyline: &[Vec3]);

    fn draw_edge(&mut self, _body: BodyId, _from: Vec3, _to: Vec3) {}

    fn erase(&mut self, body: BodyId);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn draw(&mut self, _body: BodyId, _kind: BodyKindTag, _polyline: &[Vec3]) {}

    fn erase(&mut self, _body: BodyId) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLine {
    pub kind: BodyKindTag,
    pub polyline: Vec<Vec3>,
}

/// Keeps the latest polyline per body. Useful for inspection and tests.
#[derive(Debug, Default, Clone)]
pub struct PolylineRecorder {
    lines: BTreeMap<BodyId, RecordedLine>,
    edges: Vec<(BodyId, Vec3, Vec3)>,
    erased: Vec<BodyId>,
}

impl PolylineRecorder {
    pub fn line(&self, body: BodyId) -> Option<&RecordedLine> {
        self.lines.get(&body)
    }

    pub fn lines(&self) -> impl Iterator<Item = (BodyId, &RecordedLine)> {
        self.lines.iter().map(|(id, line)| (*id, line))
    }

    pub fn edges(&self) -> &[(BodyId, Vec3, Vec3)] {
        &self.edges
    }

    pub fn erased(&self) -> &[BodyId] {
        &self.erased
    }
}

impl Presenter for PolylineRecorder {
    fn draw(&mut self, body: BodyId, kind: BodyKindTag, polyline: &[Vec3]) {
        self.edges.retain(|(owner, _, _)| *owner != body);
        self.lines.insert(
            body,
            RecordedLine {
                kind,
                polyline: polyline.to_vec(),
            },
        );
    }

    fn draw_edge(&mut self, body: BodyId, from: Vec3, to: Vec3) {
        self.edges.push((body, from, to));
    }

    fn erase(&mut self, body: BodyId) {
        self.lines.remove(&body);
        self.edges.retain(|(owner, _, _)| *owner != body);
        self.erased.push(body);
    }
}
