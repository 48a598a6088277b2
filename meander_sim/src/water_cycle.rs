use std::collections::{BTreeMap, VecDeque};

use bevy::math::Vec3;
use bevy::prelude::Resource;
use crossbeam_channel::Receiver;

use crate::bodies::{BodyId, BodyKind, BodyKindTag, Sink, WaterBody};
use crate::collision::{CollisionGrid, CollisionPair, CollisionPoint};
use crate::config::{DiagnosticFlags, RiverConfig};
use crate::events::{SubscriptionId, TopologyBus, TopologyEvent};
use crate::hierarchy::Digraph;
use crate::meander::{
    meander_points, remove_point_range, resample_points, split_index, verify_sequence_order,
};
use crate::points::{PointGraph, PointId};
use crate::presentation::{Presenter, EDGE_HEIGHT_OFFSET, LINE_HEIGHT_OFFSET};
use crate::terrain::TerrainSampler;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlowReport {
    pub bodies_flowed: usize,
    pub points_inserted: usize,
    pub points_removed: usize,
    pub splits: usize,
    pub destroyed: usize,
    pub order_violations: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionReport {
    pub resolved: usize,
    pub stale: usize,
    pub ignored: usize,
    pub self_collisions: usize,
    pub merges: usize,
    pub oxbows_created: usize,
    pub splits: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub flow: FlowReport,
    pub collisions_detected: usize,
    pub resolution: ResolutionReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollisionOutcome {
    Stale,
    Ignored,
    SelfContact,
    Merged,
}

/// Owns every point and body in the network and advances them tick by tick.
///
/// Topology events produced while a phase runs are queued and applied to
/// the hierarchy in one batch at the phase boundary.
#[derive(Resource, Debug, Default)]
pub struct WaterCycle {
    graph: PointGraph,
    bodies: BTreeMap<BodyId, WaterBody>,
    next_body: u32,
    hierarchy: Digraph<BodyId>,
    pending_events: VecDeque<TopologyEvent>,
    bus: TopologyBus,
}

impl WaterCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &PointGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut PointGraph {
        &mut self.graph
    }

    pub fn hierarchy(&self) -> &Digraph<BodyId> {
        &self.hierarchy
    }

    pub fn body(&self, id: BodyId) -> Option<&WaterBody> {
        self.bodies.get(&id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &WaterBody> {
        self.bodies.values()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn count_kind(&self, tag: BodyKindTag) -> usize {
        self.bodies.values().filter(|body| body.tag() == tag).count()
    }

    /// Body currently holding `point` in its sequence, if any.
    pub fn owner_of(&self, point: PointId) -> Option<BodyId> {
        self.bodies
            .values()
            .find(|body| body.contains_point(point))
            .map(WaterBody::id)
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<TopologyEvent>) {
        self.bus.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending_events.len()
    }

    /// Applies queued events to the hierarchy, then forwards them to subscribers.
    pub fn drain_topology_events(&mut self) -> usize {
        let mut drained = 0;
        while let Some(event) = self.pending_events.pop_front() {
            match event {
                TopologyEvent::BodyCreated { body, .. } => {
                    self.hierarchy.add_vertex(body);
                }
                TopologyEvent::BodyDestroyed { body } => {
                    self.hierarchy.remove_vertex(body);
                }
                TopologyEvent::SinkAdded { source, sink } => {
                    if self.hierarchy.contains_vertex(source) && self.hierarchy.contains_vertex(sink)
                    {
                        self.hierarchy.add_edge(source, sink);
                    }
                }
                TopologyEvent::SinkRemoved { source, sink } => {
                    self.hierarchy.remove_edge(source, sink);
                }
            }
            self.bus.publish(event);
            drained += 1;
        }
        drained
    }

    /// Places a spring at `position`; it immediately feeds a short new river.
    pub fn spawn_spring(&mut self, position: Vec3, config: &RiverConfig) -> BodyId {
        let source = self.graph.spawn(position, 0.0, &[]);
        let spring = self.create_body(
            BodyKind::Spring { source },
            Vec::new(),
            f32::INFINITY,
            f32::INFINITY,
        );
        let river = self.spawn_river_between(
            Some(source),
            position + Vec3::X,
            position + Vec3::Z,
            config,
        );
        self.add_sink(spring, river, config.sink_rate);
        tracing::info!(
            target: "meander::topology",
            spring = spring.0,
            river = river.0,
            x = position.x,
            z = position.z,
            "spring.spawned"
        );
        spring
    }

    /// Two-point river from `start` to `end`, headed by `anchor` when given.
    pub fn spawn_river_between(
        &mut self,
        anchor: Option<PointId>,
        start: Vec3,
        end: Vec3,
        config: &RiverConfig,
    ) -> BodyId {
        let anchors: Vec<PointId> = anchor.into_iter().collect();
        let head = self.graph.spawn(start, config.point_radius, &anchors);
        let tail = self.graph.spawn(end, config.point_radius, &[head]);
        self.create_body(
            BodyKind::River,
            vec![head, tail],
            config.river_volume,
            config.river_capacity,
        )
    }

    /// River over existing points. A lone point gains an extrapolated tail;
    /// an empty list creates nothing.
    pub fn spawn_river(
        &mut self,
        anchor: Option<PointId>,
        mut points: Vec<PointId>,
        config: &RiverConfig,
    ) -> Option<BodyId> {
        let head = *points.first()?;
        if let Some(anchor) = anchor {
            self.graph.add_parents(head, &[anchor]);
        }
        if points.len() == 1 {
            let position = self.graph.position(head).unwrap_or(Vec3::ZERO);
            let behind = self.graph.mean_parent_position(head);
            let tail = self
                .graph
                .spawn(position + (position - behind), config.point_radius, &[head]);
            points.push(tail);
        }
        Some(self.create_body(
            BodyKind::River,
            points,
            config.river_volume,
            config.river_capacity,
        ))
    }

    pub fn spawn_oxbow(&mut self, points: Vec<PointId>, config: &RiverConfig) -> BodyId {
        self.create_body(
            BodyKind::Oxbow,
            points,
            config.oxbow_volume,
            config.oxbow_capacity,
        )
    }

    pub fn add_sink(&mut self, source: BodyId, sink: BodyId, max_rate: f32) {
        let Some(body) = self.bodies.get_mut(&source) else {
            return;
        };
        body.sinks.push(Sink {
            body: sink,
            max_rate,
        });
        self.pending_events
            .push_back(TopologyEvent::SinkAdded { source, sink });
    }

    fn create_body(
        &mut self,
        kind: BodyKind,
        points: Vec<PointId>,
        volume: f32,
        capacity: f32,
    ) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        let body = WaterBody::new(id, kind, points, volume, capacity);
        self.pending_events.push_back(TopologyEvent::BodyCreated {
            body: id,
            kind: body.tag(),
        });
        self.bodies.insert(id, body);
        id
    }

    /// Erases a body, detaches every sink relation touching it and, for
    /// rivers, bridges and releases its points.
    pub fn destroy_body(&mut self, id: BodyId, presenter: &mut dyn Presenter) {
        let Some(mut body) = self.bodies.remove(&id) else {
            return;
        };
        presenter.erase(id);
        for sink in &body.sinks {
            self.pending_events.push_back(TopologyEvent::SinkRemoved {
                source: id,
                sink: sink.body,
            });
        }
        for (source_id, source) in self.bodies.iter_mut() {
            let before = source.sinks.len();
            source.sinks.retain(|sink| sink.body != id);
            if source.sinks.len() != before {
                self.pending_events.push_back(TopologyEvent::SinkRemoved {
                    source: *source_id,
                    sink: id,
                });
            }
        }
        self.pending_events
            .push_back(TopologyEvent::BodyDestroyed { body: id });

        if body.tag() == BodyKindTag::River && !body.points.is_empty() {
            let last = body.points.len() - 1;
            let removed = remove_point_range(&mut self.graph, &mut body.points, 0, last, true);
            for point in removed {
                self.graph.release(point);
            }
        }
        tracing::debug!(target: "meander::topology", body = id.0, "body.destroyed");
    }

    /// Cuts a river in two at `index`.
    ///
    /// `points[..index]` stay on the body and `points[index..]` become a new
    /// river draining from it, headed by `anchor`. With nothing upstream the
    /// body keeps the whole chain and only re-anchors its head; with nothing
    /// downstream no river is created.
    pub fn split_river(
        &mut self,
        id: BodyId,
        index: usize,
        anchor: Option<PointId>,
        config: &RiverConfig,
    ) -> Option<BodyId> {
        let body = self.bodies.get_mut(&id)?;
        assert!(
            index <= body.points.len(),
            "split index {index} past end of {} points",
            body.points.len()
        );
        if index == 0 {
            if let (Some(anchor), Some(&head)) = (anchor, body.points.first()) {
                self.graph.add_parents(head, &[anchor]);
            }
            return None;
        }
        let downstream = body.points.split_off(index);
        if downstream.is_empty() {
            return None;
        }
        let river = self.spawn_river(anchor, downstream, config)?;
        self.add_sink(id, river, config.sink_rate);
        tracing::debug!(
            target: "meander::topology",
            body = id.0,
            river = river.0,
            index,
            "river.split"
        );
        Some(river)
    }

    fn split_river_at_predecessor(
        &mut self,
        id: BodyId,
        index: usize,
        config: &RiverConfig,
    ) -> Option<BodyId> {
        if index == 0 {
            return None;
        }
        let anchor = self.bodies.get(&id)?.points.get(index - 1).copied();
        self.split_river(id, index, anchor, config)
    }

    /// Advances every body once, largest catchments first.
    pub fn flow(
        &mut self,
        config: &mut RiverConfig,
        terrain: &dyn TerrainSampler,
        presenter: &mut dyn Presenter,
    ) -> FlowReport {
        self.drain_topology_events();
        let mut report = FlowReport::default();
        for id in self.hierarchy.vertices_by_successor_count() {
            let Some(tag) = self.bodies.get(&id).map(WaterBody::tag) else {
                continue;
            };
            report.bodies_flowed += 1;
            if tag == BodyKindTag::River && !self.flow_river(id, config, terrain, presenter, &mut report)
            {
                continue;
            }
            self.transfer_to_sinks(id);
            self.draw_body(id, config, terrain, presenter);
        }
        self.drain_topology_events();
        report
    }

    /// Returns false when the river destroyed itself.
    fn flow_river(
        &mut self,
        id: BodyId,
        config: &mut RiverConfig,
        terrain: &dyn TerrainSampler,
        presenter: &mut dyn Presenter,
        report: &mut FlowReport,
    ) -> bool {
        if config.split {
            config.split = false;
            let len = self.bodies.get(&id).map_or(0, |body| body.points.len());
            if self.split_river_at_predecessor(id, split_index(len), config).is_some() {
                report.splits += 1;
            }
        }

        let Some(body) = self.bodies.get_mut(&id) else {
            return false;
        };
        if body.points.len() < 2 {
            self.destroy_body(id, presenter);
            report.destroyed += 1;
            return false;
        }

        let points = std::mem::take(&mut body.points);
        meander_points(&mut self.graph, &points, config, terrain);
        let (points, resampled) = resample_points(&mut self.graph, points, config);
        report.points_inserted += resampled.inserted;
        report.points_removed += resampled.removed;

        if config.diagnostics().contains(DiagnosticFlags::TRACE_TOPOLOGY) {
            if let Err(err) = verify_sequence_order(&self.graph, &points) {
                report.order_violations += 1;
                tracing::error!(
                    target: "meander::flow",
                    body = id.0,
                    error = %err,
                    "river.order_violation"
                );
            }
        }

        if let Some(body) = self.bodies.get_mut(&id) {
            body.points = points;
        }
        true
    }

    fn transfer_to_sinks(&mut self, id: BodyId) {
        let Some(sinks) = self.bodies.get(&id).map(|body| body.sinks.clone()) else {
            return;
        };
        for sink in sinks {
            let offered = match self.bodies.get(&id) {
                Some(source) => source.volume.min(sink.max_rate),
                None => return,
            };
            let accepted = match self.bodies.get_mut(&sink.body) {
                Some(target) => target.accept(offered),
                None => 0.0,
            };
            if let Some(source) = self.bodies.get_mut(&id) {
                source.volume -= accepted;
            }
        }
    }

    fn draw_body(
        &self,
        id: BodyId,
        config: &RiverConfig,
        terrain: &dyn TerrainSampler,
        presenter: &mut dyn Presenter,
    ) {
        let Some(body) = self.bodies.get(&id) else {
            return;
        };
        if body.tag() == BodyKindTag::Spring {
            return;
        }
        let polyline: Vec<Vec3> = body
            .points
            .iter()
            .filter_map(|point| self.graph.position(*point))
            .map(|position| terrain.project(position) + Vec3::Y * LINE_HEIGHT_OFFSET)
            .collect();
        presenter.draw(id, body.tag(), &polyline);

        if config.diagnostics().contains(DiagnosticFlags::DRAW_EDGES) {
            for point in &body.points {
                let Some(position) = self.graph.position(*point) else {
                    continue;
                };
                let to = terrain.project(position) + Vec3::Y * EDGE_HEIGHT_OFFSET;
                for parent in self.graph.parent_ids(*point) {
                    if let Some(from) = self.graph.position(parent) {
                        presenter.draw_edge(id, terrain.project(from) + Vec3::Y * EDGE_HEIGHT_OFFSET, to);
                    }
                }
            }
        }
    }

    /// Snapshot of every sequenced point, in hierarchy then sequence order.
    pub fn collision_points(&self) -> Vec<CollisionPoint> {
        let mut points = Vec::new();
        for id in self.hierarchy.vertices_by_successor_count() {
            let Some(body) = self.bodies.get(&id) else {
                continue;
            };
            for &point in &body.points {
                if let Some(water) = self.graph.get(point) {
                    points.push(CollisionPoint {
                        point,
                        body: id,
                        kind: body.tag(),
                        order: water.order(),
                        position: water.position,
                        radius: water.radius,
                    });
                }
            }
        }
        points
    }

    pub fn detect_collisions(&self) -> Vec<CollisionPair> {
        CollisionGrid::build(self.collision_points()).collisions()
    }

    /// Applies every detected contact in order. Points dropped by
    /// non-dominant bodies are estranged and released once all pairs ran.
    pub fn resolve_collisions(
        &mut self,
        pairs: &[CollisionPair],
        config: &RiverConfig,
    ) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        let mut deferred: Vec<PointId> = Vec::new();
        for pair in pairs {
            match self.resolve_pair(pair, config, &mut deferred, &mut report) {
                CollisionOutcome::Stale => report.stale += 1,
                CollisionOutcome::Ignored => report.ignored += 1,
                CollisionOutcome::SelfContact => {
                    report.resolved += 1;
                    report.self_collisions += 1;
                }
                CollisionOutcome::Merged => {
                    report.resolved += 1;
                    report.merges += 1;
                }
            }
        }
        for point in deferred {
            if self.owner_of(point).is_none() {
                self.graph.release(point);
            }
        }
        self.drain_topology_events();
        if report.resolved > 0 {
            tracing::debug!(
                target: "meander::collision",
                resolved = report.resolved,
                stale = report.stale,
                oxbows = report.oxbows_created,
                "collisions.resolved"
            );
        }
        report
    }

    fn resolve_pair(
        &mut self,
        pair: &CollisionPair,
        config: &RiverConfig,
        deferred: &mut Vec<PointId>,
        report: &mut ResolutionReport,
    ) -> CollisionOutcome {
        let internal = pair.internal.point;
        let external = pair.external.point;
        // an earlier split this pass may have moved the point to a new river
        let Some(body) = self
            .owner_of(internal)
            .and_then(|owner| self.bodies.get(&owner))
        else {
            return CollisionOutcome::Stale;
        };
        let Some(internal_index) = body.index_of(internal) else {
            return CollisionOutcome::Stale;
        };
        if !self.graph.contains(external) {
            return CollisionOutcome::Stale;
        }
        if body.tag() != BodyKindTag::River {
            return CollisionOutcome::Ignored;
        }
        let id = body.id();

        if let Some(external_index) = body.index_of(external) {
            if internal_index.abs_diff(external_index) <= 1 {
                return CollisionOutcome::Ignored;
            }
            self.collide_with_self(id, internal_index, external_index, config, deferred, report);
            return CollisionOutcome::SelfContact;
        }
        if pair.external.kind != BodyKindTag::River {
            return CollisionOutcome::Ignored;
        }

        let dominant = pair.internal.order > pair.external.order;
        if dominant {
            let parents = self.graph.parent_ids(external);
            let children = self.graph.child_ids(external);
            self.graph.add_parents(internal, &parents);
            self.graph.add_children(internal, &children);
            if self
                .split_river_at_predecessor(id, internal_index, config)
                .is_some()
            {
                report.splits += 1;
            }
        } else {
            if let Some(body) = self.bodies.get_mut(&id) {
                body.points.remove(internal_index);
            }
            deferred.push(internal);
            if self
                .split_river(id, internal_index, Some(external), config)
                .is_some()
            {
                report.splits += 1;
            }
        }
        tracing::debug!(
            target: "meander::collision",
            body = id.0,
            other = pair.external.body.0,
            dominant,
            "collision.river"
        );
        CollisionOutcome::Merged
    }

    /// A river touching itself pinches off the loop between the two points.
    fn collide_with_self(
        &mut self,
        id: BodyId,
        first: usize,
        second: usize,
        config: &RiverConfig,
        deferred: &mut Vec<PointId>,
        report: &mut ResolutionReport,
    ) {
        let (low, high) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        let distance = high - low;
        let Some(body) = self.bodies.get_mut(&id) else {
            return;
        };
        let mut points = std::mem::take(&mut body.points);
        let removed = remove_point_range(&mut self.graph, &mut points, low, high, false);
        if let Some(body) = self.bodies.get_mut(&id) {
            body.points = points;
        }
        if distance > 2 {
            let oxbow = self.spawn_oxbow(removed, config);
            report.oxbows_created += 1;
            tracing::debug!(
                target: "meander::collision",
                body = id.0,
                oxbow = oxbow.0,
                "collision.oxbow"
            );
        } else {
            deferred.extend(removed);
        }
    }

    /// Full pipeline: flow, detect, resolve.
    pub fn tick(
        &mut self,
        config: &mut RiverConfig,
        terrain: &dyn TerrainSampler,
        presenter: &mut dyn Presenter,
    ) -> TickReport {
        let flow = self.flow(config, terrain, presenter);
        let pairs = self.detect_collisions();
        let resolution = self.resolve_collisions(&pairs, config);
        TickReport {
            flow,
            collisions_detected: pairs.len(),
            resolution,
        }
    }
}

const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WaterCycle>();
};
