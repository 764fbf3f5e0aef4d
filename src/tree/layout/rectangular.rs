use super::{
    ContinuousBranch, NodeId, Tree, TreeLayout, TreeLayoutType, DEFAULT_BRANCH_LENGTH,
    ROOT_LENGTH_PROPORTION,
};

pub(super) struct RectangularLayoutData {
    pub positions: Vec<(f32, f32)>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub root_distances: Vec<f32>,
    pub root_length: f32,
    pub max_x: f32,
    pub tip_count: usize,
}

pub(super) fn compute_base(tree: &Tree) -> Option<RectangularLayoutData> {
    let root_id = tree.root?;
    let tip_count = tree.leaf_count().max(1);

    let mut positions = vec![(0.0f32, 0.0f32); tree.nodes.len()];
    let mut root_distances = vec![0.0f32; tree.nodes.len()];
    let mut edges = Vec::with_capacity(tree.nodes.len());

    let total_height = tree.height() as f32;
    let root_length = (total_height * ROOT_LENGTH_PROPORTION).max(f32::EPSILON);

    let mut state = RectangularState {
        next_tip_index: 0,
        root_length,
        max_x: root_length,
    };

    assign_rectangular_positions(
        tree,
        root_id,
        root_length,
        &mut positions,
        &mut root_distances,
        &mut edges,
        &mut state,
    );

    Some(RectangularLayoutData {
        positions,
        edges,
        root_distances,
        root_length,
        max_x: state.max_x,
        tip_count,
    })
}

pub(super) fn build(tree: &Tree) -> Option<TreeLayout> {
    let root_id = tree.root?;
    let data = compute_base(tree)?;
    let root_pos = data.positions[root_id];

    let layout_height = if data.tip_count > 1 {
        (data.tip_count - 1) as f32
    } else {
        1.0
    };

    // Each branch runs child -> shoulder -> parent, so the union of the
    // shoulder-to-parent legs forms the vertical connector of every clade.
    let continuous_branches = data
        .edges
        .iter()
        .map(|&(parent, child)| {
            let parent_pos = data.positions[parent];
            let child_pos = data.positions[child];
            let shoulder = (parent_pos.0, child_pos.1);

            let mut points = vec![child_pos];
            if shoulder != child_pos {
                points.push(shoulder);
            }
            if shoulder != parent_pos {
                points.push(parent_pos);
            }

            ContinuousBranch {
                points,
                parent,
                child,
            }
        })
        .collect();

    let root_branch = ContinuousBranch {
        points: vec![root_pos, (root_pos.0 - data.root_length, root_pos.1)],
        parent: root_id,
        child: root_id,
    };

    Some(TreeLayout {
        positions: data.positions,
        edges: data.edges,
        width: data.max_x.max(1e-6),
        height: layout_height.max(1e-6),
        leaf_count: data.tip_count,
        layout_type: TreeLayoutType::Rectangular,
        continuous_branches,
        root_branch: Some(root_branch),
        node_angles: Vec::new(),
        root_distances: data.root_distances,
        angular_step: 0.0,
        origin: (0.0, root_pos.1),
    })
}

struct RectangularState {
    next_tip_index: usize,
    root_length: f32,
    max_x: f32,
}

fn assign_rectangular_positions(
    tree: &Tree,
    node_id: NodeId,
    x_pos: f32,
    positions: &mut [(f32, f32)],
    root_distances: &mut [f32],
    edges: &mut Vec<(NodeId, NodeId)>,
    state: &mut RectangularState,
) -> f32 {
    let node = &tree.nodes[node_id];

    let y_pos = if node.children.is_empty() {
        let y = state.next_tip_index as f32;
        state.next_tip_index += 1;
        y
    } else {
        let mut first_y = f32::MAX;
        let mut last_y = f32::MIN;

        for &child_id in &node.children {
            edges.push((node_id, child_id));

            let branch_length = tree.nodes[child_id]
                .length
                .map(|value| value as f32)
                .unwrap_or(DEFAULT_BRANCH_LENGTH);
            let child_x = x_pos + branch_length;

            let child_y = assign_rectangular_positions(
                tree,
                child_id,
                child_x,
                positions,
                root_distances,
                edges,
                state,
            );

            first_y = first_y.min(child_y);
            last_y = last_y.max(child_y);
        }

        if first_y.is_finite() && last_y.is_finite() {
            (first_y + last_y) / 2.0
        } else {
            0.0
        }
    };

    positions[node_id] = (x_pos, y_pos);
    root_distances[node_id] = x_pos - state.root_length;
    state.max_x = state.max_x.max(x_pos);

    y_pos
}
