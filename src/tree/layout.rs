use super::{NodeId, Tree};

mod circular;
mod rectangular;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeLayoutType {
    Rectangular,
    Circular,
}

/// Node positions in layout units plus the branch geometry joining them.
///
/// Rectangular: x is distance from the root, y is the leaf row.
/// Circular: positions are cartesian around `origin`, the root.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    pub positions: Vec<(f32, f32)>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub width: f32,
    pub height: f32,
    pub leaf_count: usize,
    pub layout_type: TreeLayoutType,
    pub continuous_branches: Vec<ContinuousBranch>,
    /// Root stub drawn before the root node.
    pub root_branch: Option<ContinuousBranch>,
    /// Polar angle per node (circular only, empty otherwise).
    pub node_angles: Vec<f32>,
    /// Distance from the root per node, in branch-length units.
    pub root_distances: Vec<f32>,
    /// Angle between neighbouring leaves (circular only).
    pub angular_step: f32,
    pub origin: (f32, f32),
}

/// Polyline from child to parent for one branch.
#[derive(Debug, Clone)]
pub struct ContinuousBranch {
    pub points: Vec<(f32, f32)>,
    pub parent: NodeId,
    pub child: NodeId,
}

pub(super) const DEFAULT_BRANCH_LENGTH: f32 = 1.0;
pub(super) const ROOT_LENGTH_PROPORTION: f32 = 0.01;

impl TreeLayout {
    /// Build a layout for the provided tree using the specified layout type.
    pub fn from_tree(tree: &Tree, layout_type: TreeLayoutType) -> Option<Self> {
        match layout_type {
            TreeLayoutType::Rectangular => rectangular::build(tree),
            TreeLayoutType::Circular => circular::build(tree),
        }
    }

    /// Outermost distance from the root, in branch-length units.
    pub fn max_root_distance(&self) -> f32 {
        self.root_distances.iter().copied().fold(0.0, f32::max)
    }
}
