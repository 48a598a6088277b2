use std::collections::BTreeSet;
use std::ops::Index;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable handle into the [`PointGraph`] arena.
///
/// The generation is bumped whenever a slot is released, so handles held
/// past a release never alias the point that later reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId {
    index: u32,
    generation: u32,
}

impl PointId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Creation rank of a point. Larger means created later.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PointOrder(pub u64);

/// Hands out strictly increasing [`PointOrder`] values.
#[derive(Debug, Default, Clone)]
pub struct OrderSequence {
    next: u64,
}

impl OrderSequence {
    pub fn next_order(&mut self) -> PointOrder {
        let order = PointOrder(self.next);
        self.next += 1;
        order
    }

    pub fn peek(&self) -> PointOrder {
        PointOrder(self.next)
    }
}

#[derive(Debug, Clone)]
pub struct WaterPoint {
    order: PointOrder,
    pub position: Vec3,
    pub movement: Vec3,
    pub radius: f32,
    parents: BTreeSet<PointId>,
    children: BTreeSet<PointId>,
}

impl WaterPoint {
    pub fn order(&self) -> PointOrder {
        self.order
    }

    pub fn parents(&self) -> &BTreeSet<PointId> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<PointId> {
        &self.children
    }

    pub fn is_estranged(&self) -> bool {
        self.parents.is_empty() && self.children.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("point {child:?} lists parent {parent:?} which does not list it as a child")]
    MissingChildLink { parent: PointId, child: PointId },
    #[error("point {parent:?} lists child {child:?} which does not list it as a parent")]
    MissingParentLink { parent: PointId, child: PointId },
    #[error("point {point:?} references released point {missing:?}")]
    DanglingLink { point: PointId, missing: PointId },
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    point: Option<WaterPoint>,
}

/// Arena of water points and their parent/child relations.
///
/// Every relation edit updates both endpoints, so `p` is a parent of `c`
/// exactly when `c` is a child of `p`.
#[derive(Debug, Default, Clone)]
pub struct PointGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    sequence: OrderSequence,
}

impl PointGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn sequence(&self) -> &OrderSequence {
        &self.sequence
    }

    pub fn spawn(&mut self, position: Vec3, radius: f32, parents: &[PointId]) -> PointId {
        let point = WaterPoint {
            order: self.sequence.next_order(),
            position,
            movement: Vec3::ZERO,
            radius,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.point = Some(point);
                PointId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    point: Some(point),
                });
                PointId {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        self.add_parents(id, parents);
        id
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: PointId) -> Option<&WaterPoint> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.point.as_ref())
    }

    pub fn get_mut(&mut self, id: PointId) -> Option<&mut WaterPoint> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.point.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointId, &WaterPoint)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.point.as_ref().map(|point| {
                (
                    PointId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    point,
                )
            })
        })
    }

    pub fn position(&self, id: PointId) -> Option<Vec3> {
        self.get(id).map(|point| point.position)
    }

    pub fn parent_ids(&self, id: PointId) -> Vec<PointId> {
        self.get(id)
            .map(|point| point.parents.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn child_ids(&self, id: PointId) -> Vec<PointId> {
        self.get(id)
            .map(|point| point.children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Links `parents` upstream of `node`. Self links and released handles are skipped.
    pub fn add_parents(&mut self, node: PointId, parents: &[PointId]) {
        for &parent in parents {
            self.link(parent, node);
        }
    }

    pub fn add_children(&mut self, node: PointId, children: &[PointId]) {
        for &child in children {
            self.link(node, child);
        }
    }

    pub fn remove_parents(&mut self, node: PointId, parents: &[PointId]) {
        for &parent in parents {
            self.unlink(parent, node);
        }
    }

    pub fn remove_children(&mut self, node: PointId, children: &[PointId]) {
        for &child in children {
            self.unlink(node, child);
        }
    }

    pub fn remove_all_parents(&mut self, node: PointId) {
        let parents = self.parent_ids(node);
        self.remove_parents(node, &parents);
    }

    pub fn remove_all_children(&mut self, node: PointId) {
        let children = self.child_ids(node);
        self.remove_children(node, &children);
    }

    /// Detaches `node` from every neighbour in both directions.
    pub fn estrange(&mut self, node: PointId) {
        self.remove_all_parents(node);
        self.remove_all_children(node);
    }

    pub fn replace_parent(&mut self, node: PointId, old: PointId, new: PointId) {
        self.unlink(old, node);
        self.link(new, node);
    }

    /// Estranges `node` and frees its slot. Returns the detached point.
    pub fn release(&mut self, node: PointId) -> Option<WaterPoint> {
        if !self.contains(node) {
            return None;
        }
        self.estrange(node);
        let slot = &mut self.slots[node.index()];
        let point = slot.point.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
        self.live -= 1;
        point
    }

    pub fn mean_parent_position(&self, node: PointId) -> Vec3 {
        self.get(node)
            .map(|point| self.mean_position(&point.parents, point.position))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn mean_child_position(&self, node: PointId) -> Vec3 {
        self.get(node)
            .map(|point| self.mean_position(&point.children, point.position))
            .unwrap_or(Vec3::ZERO)
    }

    /// Depth-weighted average of upstream movement.
    ///
    /// Each parent contributes `base^depth * movement` plus its own momentum
    /// one level deeper; contributions are averaged per level.
    pub fn momentum(&self, node: PointId, base: f32, max_depth: u32) -> Vec3 {
        self.momentum_at(node, base, 1, max_depth)
    }

    fn momentum_at(&self, node: PointId, base: f32, depth: u32, max_depth: u32) -> Vec3 {
        let Some(point) = self.get(node) else {
            return Vec3::ZERO;
        };
        if depth > max_depth || point.parents.is_empty() {
            return Vec3::ZERO;
        }
        let weight = base.powi(depth as i32);
        let mut total = Vec3::ZERO;
        let mut count = 0usize;
        for &parent in &point.parents {
            if let Some(upstream) = self.get(parent) {
                total += weight * upstream.movement
                    + self.momentum_at(parent, base, depth + 1, max_depth);
                count += 1;
            }
        }
        if count == 0 {
            Vec3::ZERO
        } else {
            total / count as f32
        }
    }

    pub fn verify_consistency(&self) -> Result<(), GraphError> {
        for (id, point) in self.iter() {
            for &parent in &point.parents {
                let upstream = self
                    .get(parent)
                    .ok_or(GraphError::DanglingLink { point: id, missing: parent })?;
                if !upstream.children.contains(&id) {
                    return Err(GraphError::MissingChildLink { parent, child: id });
                }
            }
            for &child in &point.children {
                let downstream = self
                    .get(child)
                    .ok_or(GraphError::DanglingLink { point: id, missing: child })?;
                if !downstream.parents.contains(&id) {
                    return Err(GraphError::MissingParentLink { parent: id, child });
                }
            }
        }
        Ok(())
    }

    fn mean_position(&self, ids: &BTreeSet<PointId>, fallback: Vec3) -> Vec3 {
        let mut total = Vec3::ZERO;
        let mut count = 0usize;
        for &id in ids {
            if let Some(point) = self.get(id) {
                total += point.position;
                count += 1;
            }
        }
        if count == 0 {
            fallback
        } else {
            total / count as f32
        }
    }

    fn link(&mut self, parent: PointId, child: PointId) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        if let Some(point) = self.get_mut(parent) {
            point.children.insert(child);
        }
        if let Some(point) = self.get_mut(child) {
            point.parents.insert(parent);
        }
    }

    fn unlink(&mut self, parent: PointId, child: PointId) {
        if let Some(point) = self.get_mut(parent) {
            point.children.remove(&child);
        }
        if let Some(point) = self.get_mut(child) {
            point.parents.remove(&parent);
        }
    }
}

impl Index<PointId> for PointGraph {
    type Output = WaterPoint;

    fn index(&self, id: PointId) -> &WaterPoint {
        match self.get(id) {
            Some(point) => point,
            None => panic!("point {id:?} was released"),
        }
    }
}
