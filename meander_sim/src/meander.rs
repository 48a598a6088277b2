//! Per-tick centreline motion and spacing control for river point chains.

use bevy::math::Vec3;
use thiserror::Error;

use crate::config::{DiagnosticFlags, RiverConfig};
use crate::curvature::CurveSegment;
use crate::math::interpolate;
use crate::points::{PointGraph, PointId};
use crate::terrain::TerrainSampler;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("point at index {child_index} has a parent downstream at index {parent_index}")]
    ParentDownstream {
        child_index: usize,
        parent_index: usize,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResampleReport {
    pub inserted: usize,
    pub removed: usize,
}

pub fn movement_vector(segment: &CurveSegment, config: &RiverConfig, terrain_normal: Vec3) -> Vec3 {
    let bend = config.binormal_coeff * segment.weighted_binormal()
        + config.tangent_coeff * segment.tangent;
    let slope = config.normal_coeff * terrain_normal;
    config.total_coeff * segment.curvature * bend + Vec3::new(slope.x, 0.0, slope.z)
}

/// Moves each point along its curvature frame plus inherited momentum.
///
/// Points are visited in sequence order, so downstream points see the
/// positions their upstream neighbours already took this pass.
pub fn meander_points(
    graph: &mut PointGraph,
    points: &[PointId],
    config: &RiverConfig,
    terrain: &dyn TerrainSampler,
) {
    for &id in points {
        let Some(center) = graph.position(id) else {
            continue;
        };
        let segment = CurveSegment::new(
            graph.mean_parent_position(id),
            center,
            graph.mean_child_position(id),
        );
        let movement = movement_vector(&segment, config, terrain.normal(center));
        let momentum = graph.momentum(id, config.momentum_base, config.momentum_depth);
        if let Some(point) = graph.get_mut(id) {
            point.movement = movement;
            point.position += movement + momentum;
        }
    }
}

/// Inserts midpoints across long gaps and merges points that sit too close
/// to their predecessor. The first and last points always survive.
pub fn resample_points(
    graph: &mut PointGraph,
    points: Vec<PointId>,
    config: &RiverConfig,
) -> (Vec<PointId>, ResampleReport) {
    let mut report = ResampleReport::default();
    if points.len() < 2 {
        return (points, report);
    }

    let positions: Vec<Vec3> = points
        .iter()
        .map(|id| graph.position(*id).unwrap_or(Vec3::ZERO))
        .collect();
    let mut insert_after = vec![None; points.len()];
    let mut remove = vec![false; points.len()];

    let mut distance_backward = f32::INFINITY;
    for i in 0..points.len() - 1 {
        let mut distance_forward = positions[i].distance(positions[i + 1]);
        let too_close = distance_backward < config.min_sample_interval;
        let too_far = distance_forward > config.max_sample_interval;
        if too_far {
            distance_forward *= 0.5;
            insert_after[i] = Some(interpolate(positions[i], positions[i + 1], distance_forward));
        }
        if too_close {
            remove[i] = true;
        }
        if too_close && !too_far {
            distance_backward += distance_forward;
        } else {
            distance_backward = distance_forward;
        }
    }

    let trace = config.diagnostics().contains(DiagnosticFlags::TRACE_TOPOLOGY);
    let mut updated = points.clone();
    let mut offset: isize = 0;
    for i in 0..points.len() - 1 {
        let j = (i as isize + offset) as usize;
        if let Some(midpoint) = insert_after[i] {
            let inserted = graph.spawn(midpoint, config.point_radius, &[points[i]]);
            insert_point(graph, &mut updated, j + 1, inserted);
            offset += 1;
            report.inserted += 1;
            if trace {
                tracing::debug!(target: "meander::resample", index = j + 1, "resample.insert");
            }
        }
        if remove[i] {
            let removed = remove_point(graph, &mut updated, j);
            graph.release(removed);
            offset -= 1;
            report.removed += 1;
            if trace {
                tracing::debug!(target: "meander::resample", index = j, "resample.remove");
            }
        }
    }
    (updated, report)
}

/// Places `point` before `points[index]`, taking over all of its parents.
pub fn insert_point(graph: &mut PointGraph, points: &mut Vec<PointId>, index: usize, point: PointId) {
    if let Some(&next) = points.get(index) {
        let parents = graph.parent_ids(next);
        graph.add_parents(point, &parents);
        graph.remove_all_parents(next);
        graph.add_parents(next, &[point]);
    }
    points.insert(index, point);
}

/// Takes `points[index]` out of the chain, linking its parents straight to
/// its children. The removed point is returned estranged.
pub fn remove_point(graph: &mut PointGraph, points: &mut Vec<PointId>, index: usize) -> PointId {
    let removed = points.remove(index);
    let children = graph.child_ids(removed);
    for parent in graph.parent_ids(removed) {
        graph.add_children(parent, &children);
    }
    graph.estrange(removed);
    removed
}

/// Removes the points strictly between `start` and `end`, or `start..=end`
/// when `inclusive` is set. Returns them in their original order.
pub fn remove_point_range(
    graph: &mut PointGraph,
    points: &mut Vec<PointId>,
    start: usize,
    end: usize,
    inclusive: bool,
) -> Vec<PointId> {
    let (first, count) = if inclusive {
        (start, (end + 1).saturating_sub(start))
    } else {
        (start + 1, end.saturating_sub(start + 1))
    };
    assert!(
        first + count <= points.len(),
        "point range {start}..{end} outside sequence of {}",
        points.len()
    );
    (0..count)
        .map(|_| remove_point(graph, points, first))
        .collect()
}

/// Checks that no point lists a parent sitting downstream of it.
pub fn verify_sequence_order(graph: &PointGraph, points: &[PointId]) -> Result<(), TopologyError> {
    for (child_index, id) in points.iter().enumerate() {
        for parent in graph.parent_ids(*id) {
            if let Some(parent_index) = points.iter().position(|p| *p == parent) {
                if parent_index > child_index {
                    return Err(TopologyError::ParentDownstream {
                        child_index,
                        parent_index,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Index used by a requested split: half the length, ties to even.
pub fn split_index(len: usize) -> usize {
    (len as f32 / 2.0).round_ties_even() as usize
}
