use bevy::math::Vec3;

use meander_sim::{BodyId, BodyKindTag, PointId, RiverConfig, WaterCycle};

fn river_from(cycle: &mut WaterCycle, positions: &[Vec3], config: &RiverConfig) -> (BodyId, Vec<PointId>) {
    let mut points: Vec<PointId> = Vec::new();
    for position in positions {
        let parents: Vec<PointId> = points.last().copied().into_iter().collect();
        points.push(
            cycle
                .graph_mut()
                .spawn(*position, config.point_radius, &parents),
        );
    }
    let body = cycle
        .spawn_river(None, points.clone(), config)
        .expect("river with points");
    (body, points)
}

fn v(x: f32, z: f32) -> Vec3 {
    Vec3::new(x, 0.0, z)
}

#[test]
fn dominant_river_absorbs_the_crossing() {
    let config = RiverConfig::default();
    let mut cycle = WaterCycle::new();
    let (a, a_points) = river_from(&mut cycle, &[v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0)], &config);
    let (b, b_points) = river_from(&mut cycle, &[v(1.0, -1.2), v(1.0, 0.2), v(1.0, 1.2)], &config);
    cycle.drain_topology_events();

    let pairs = cycle.detect_collisions();
    assert_eq!(pairs.len(), 2, "one contact seen from both sides");

    let report = cycle.resolve_collisions(&pairs, &config);
    assert_eq!(report.merges, 2);
    assert_eq!(report.stale, 0);

    let crossing = a_points[1];
    assert!(!cycle.graph().contains(crossing), "non-dominant point is released");
    assert!(cycle.owner_of(crossing).is_none());

    let junction = b_points[1];
    let parents = cycle.graph().parent_ids(junction);
    let children = cycle.graph().child_ids(junction);
    assert!(parents.contains(&a_points[0]) && parents.contains(&b_points[0]));
    assert!(children.contains(&a_points[2]) && children.contains(&b_points[2]));
    assert_eq!(cycle.graph().child_ids(a_points[0]), vec![junction]);
    assert_eq!(cycle.graph().parent_ids(a_points[2]), vec![junction]);

    assert_eq!(cycle.body(a).expect("a").points, vec![a_points[0]]);
    assert_eq!(cycle.body(b).expect("b").points, vec![b_points[0]]);
    let a_tail = cycle.owner_of(a_points[2]).expect("a's remainder is a river");
    let b_tail = cycle.owner_of(junction).expect("b's remainder is a river");
    assert!(cycle.hierarchy().contains_edge(a, a_tail));
    assert!(cycle.hierarchy().contains_edge(b, b_tail));
    assert_eq!(cycle.body(a_tail).expect("tail").points.len(), 2);
    cycle.graph().verify_consistency().expect("graph stays consistent");

    let replay = cycle.resolve_collisions(&pairs, &config);
    assert_eq!(replay.stale, 2, "resolved contacts are stale on replay");
}

#[test]
fn self_contact_pinches_off_an_oxbow() {
    let config = RiverConfig::default();
    let mut cycle = WaterCycle::new();
    let (river, points) = river_from(
        &mut cycle,
        &[
            v(0.0, 0.0),
            v(1.0, 0.0),
            v(2.0, 0.0),
            v(2.0, 1.0),
            v(1.0, 1.0),
            v(1.0, 0.3),
            v(0.0, 0.6),
        ],
        &config,
    );
    cycle.drain_topology_events();

    let pairs = cycle.detect_collisions();
    let report = cycle.resolve_collisions(&pairs, &config);
    assert_eq!(report.oxbows_created, 1);
    assert_eq!(report.self_collisions, 1);
    assert_eq!(report.ignored, 1, "the mirrored contact is now adjacent");

    assert_eq!(
        cycle.body(river).expect("river").points,
        vec![points[0], points[1], points[5], points[6]]
    );
    assert_eq!(cycle.graph().child_ids(points[1]), vec![points[5]]);
    assert_eq!(cycle.graph().parent_ids(points[5]), vec![points[1]]);

    let oxbow = cycle
        .bodies()
        .find(|body| body.tag() == BodyKindTag::Oxbow)
        .expect("oxbow created");
    assert_eq!(oxbow.points, points[2..5].to_vec());
    assert!(oxbow
        .points
        .iter()
        .all(|point| cycle.graph()[*point].is_estranged()));
    assert_eq!(oxbow.capacity, config.oxbow_capacity);
    cycle.graph().verify_consistency().expect("graph stays consistent");
}

#[test]
fn narrow_self_contact_drops_single_point() {
    let config = RiverConfig::default();
    let mut cycle = WaterCycle::new();
    let (river, points) = river_from(
        &mut cycle,
        &[v(0.0, 0.0), v(1.0, 0.0), v(1.8, 0.5), v(1.2, 0.35), v(1.0, 1.2)],
        &config,
    );
    cycle.drain_topology_events();

    let pairs = cycle.detect_collisions();
    let report = cycle.resolve_collisions(&pairs, &config);
    assert_eq!(report.oxbows_created, 0);
    assert_eq!(
        cycle.body(river).expect("river").points,
        vec![points[0], points[1], points[3], points[4]]
    );
    assert!(!cycle.graph().contains(points[2]));
    assert_eq!(cycle.count_kind(BodyKindTag::Oxbow), 0);
}

#[test]
fn oxbow_contacts_are_ignored() {
    let config = RiverConfig::default();
    let mut cycle = WaterCycle::new();
    let (river, points) = river_from(&mut cycle, &[v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0)], &config);
    let lake_point = cycle.graph_mut().spawn(v(1.0, 0.2), config.point_radius, &[]);
    cycle.spawn_oxbow(vec![lake_point], &config);
    cycle.drain_topology_events();

    let pairs = cycle.detect_collisions();
    assert_eq!(pairs.len(), 2);
    let report = cycle.resolve_collisions(&pairs, &config);
    assert_eq!(report.ignored, 2);
    assert_eq!(report.resolved, 0);
    assert_eq!(cycle.body(river).expect("river").points, points);
}

#[test]
fn adjacent_self_contact_is_ignored() {
    let config = RiverConfig::default();
    let mut cycle = WaterCycle::new();
    let (river, points) = river_from(&mut cycle, &[v(0.0, 0.0), v(0.3, 0.0), v(1.3, 0.0)], &config);
    cycle.drain_topology_events();

    let pairs = cycle.detect_collisions();
    assert_eq!(pairs.len(), 2);
    let report = cycle.resolve_collisions(&pairs, &config);
    assert_eq!(report.ignored, 2);
    assert_eq!(report.resolved, 0);
    assert_eq!(report.self_collisions, 0);
    assert_eq!(cycle.body(river).expect("river").points, points);
}

struct DoubleCrossing {
    cycle: WaterCycle,
    trunk: BodyId,
    left: Vec<PointId>,
    right: Vec<PointId>,
    trunk_points: Vec<PointId>,
}

/// A trunk along X crossed at x = 1 and x = 3 by two older rivers, so the
/// trunk wins both contacts.
fn double_crossing(config: &RiverConfig) -> DoubleCrossing {
    let mut cycle = WaterCycle::new();
    let (_, left) = river_from(&mut cycle, &[v(1.0, -1.2), v(1.0, 0.2), v(1.0, 1.2)], config);
    let (_, right) = river_from(&mut cycle, &[v(3.0, -1.2), v(3.0, 0.2), v(3.0, 1.2)], config);
    let (trunk, trunk_points) = river_from(
        &mut cycle,
        &[v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0), v(3.0, 0.0), v(4.0, 0.0)],
        config,
    );
    cycle.drain_topology_events();
    DoubleCrossing {
        cycle,
        trunk,
        left,
        right,
        trunk_points,
    }
}

fn assert_junctions_merged(crossing: &DoubleCrossing) {
    let cycle = &crossing.cycle;
    let graph = cycle.graph();
    let (left, right, trunk) = (&crossing.left, &crossing.right, &crossing.trunk_points);

    for (junction, upstream, downstream, prev, next) in [
        (trunk[1], left[0], left[2], trunk[0], trunk[2]),
        (trunk[3], right[0], right[2], trunk[2], trunk[4]),
    ] {
        let parents = graph.parent_ids(junction);
        let children = graph.child_ids(junction);
        assert!(parents.contains(&upstream) && parents.contains(&prev));
        assert!(children.contains(&downstream) && children.contains(&next));
        assert_eq!(graph.child_ids(upstream), vec![junction]);
        assert_eq!(graph.parent_ids(downstream), vec![junction]);
    }
    assert!(!graph.contains(left[1]));
    assert!(!graph.contains(right[1]));
    assert_eq!(cycle.body(crossing.trunk).expect("trunk").points, vec![trunk[0]]);
    graph.verify_consistency().expect("graph stays consistent");
}

#[test]
fn river_split_twice_in_one_pass_keeps_both_merges() {
    let config = RiverConfig::default();
    let mut crossing = double_crossing(&config);
    let pairs = crossing.cycle.detect_collisions();
    assert_eq!(pairs.len(), 4);

    let report = crossing.cycle.resolve_collisions(&pairs, &config);
    assert_eq!(report.merges, 4);
    assert_eq!(report.stale, 0);
    assert_junctions_merged(&crossing);

    let trunk = &crossing.trunk_points;
    let middle = crossing.cycle.owner_of(trunk[1]).expect("middle reach");
    let lower = crossing.cycle.owner_of(trunk[3]).expect("lower reach");
    assert_ne!(middle, lower);
    assert_eq!(
        crossing.cycle.body(middle).expect("middle").points,
        vec![trunk[1], trunk[2]]
    );
    assert_eq!(
        crossing.cycle.body(lower).expect("lower").points,
        vec![trunk[3], trunk[4]]
    );
    let hierarchy = crossing.cycle.hierarchy();
    assert!(hierarchy.contains_edge(crossing.trunk, middle));
    assert!(hierarchy.contains_edge(middle, lower));
}

#[test]
fn resolution_order_does_not_change_merged_links() {
    let config = RiverConfig::default();
    let mut crossing = double_crossing(&config);
    let mut pairs = crossing.cycle.detect_collisions();
    pairs.reverse();

    let report = crossing.cycle.resolve_collisions(&pairs, &config);
    assert_eq!(report.merges, 4);
    assert_eq!(report.stale, 0);
    assert_junctions_merged(&crossing);
}
