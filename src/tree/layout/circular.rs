use std::f32::consts::{PI, TAU};

use super::rectangular::{self, RectangularLayoutData};
use super::{ContinuousBranch, NodeId, Tree, TreeLayout, TreeLayoutType};

// Arc resolution: one point per two degrees of sweep.
const ARC_STEP: f32 = PI / 90.0;

pub(super) fn build(tree: &Tree) -> Option<TreeLayout> {
    let root_id = tree.root?;
    let RectangularLayoutData {
        positions,
        edges,
        root_distances,
        tip_count,
        ..
    } = rectangular::compute_base(tree)?;

    // Leaves share the full turn so each one owns an equal wedge.
    let angular_step = TAU / tip_count as f32;
    let start_angle = PI;

    let mut node_angles = vec![0.0f32; positions.len()];
    compute_node_angles(
        tree,
        root_id,
        &positions,
        angular_step,
        start_angle,
        &mut node_angles,
    );

    let polar = |radius: f32, angle: f32| (radius * angle.cos(), radius * angle.sin());

    let polar_positions: Vec<(f32, f32)> = root_distances
        .iter()
        .zip(&node_angles)
        .map(|(&radius, &angle)| polar(radius, angle))
        .collect();

    let continuous_branches = edges
        .iter()
        .map(|&(parent, child)| {
            let parent_radius = root_distances[parent];
            let parent_angle = node_angles[parent];
            let child_angle = node_angles[child];

            // child -> shoulder, then along the parent's circle to the parent.
            let mut points = vec![polar_positions[child]];
            let sweep = parent_angle - child_angle;
            let steps = ((sweep.abs() / ARC_STEP).ceil() as usize).max(1);
            for i in 0..=steps {
                let angle = child_angle + sweep * i as f32 / steps as f32;
                points.push(polar(parent_radius, angle));
            }

            ContinuousBranch {
                points,
                parent,
                child,
            }
        })
        .collect();

    let max_radius = root_distances.iter().copied().fold(0.0f32, f32::max);
    let extent = (max_radius * 2.0).max(1e-6);

    Some(TreeLayout {
        positions: polar_positions,
        edges,
        width: extent,
        height: extent,
        leaf_count: tip_count,
        layout_type: TreeLayoutType::Circular,
        continuous_branches,
        root_branch: None,
        node_angles,
        root_distances,
        angular_step,
        origin: (0.0, 0.0),
    })
}

/// Leaves are spread evenly by row; internal nodes sit at the middle of the
/// angular range of their children. Returns the (min, max) range below `node_id`.
fn compute_node_angles(
    tree: &Tree,
    node_id: NodeId,
    positions: &[(f32, f32)],
    angular_step: f32,
    start_angle: f32,
    node_angles: &mut [f32],
) -> (f32, f32) {
    let node = &tree.nodes[node_id];

    if node.children.is_empty() {
        let row = positions[node_id].1;
        let angle = start_angle - row * angular_step;
        node_angles[node_id] = angle;
        return (angle, angle);
    }

    let mut min_angle = f32::INFINITY;
    let mut max_angle = f32::NEG_INFINITY;
    for &child_id in &node.children {
        let (child_min, child_max) = compute_node_angles(
            tree,
            child_id,
            positions,
            angular_step,
            start_angle,
            node_angles,
        );
        min_angle = min_angle.min(child_min);
        max_angle = max_angle.max(child_max);
    }

    node_angles[node_id] = (min_angle + max_angle) * 0.5;
    (min_angle, max_angle)
}
