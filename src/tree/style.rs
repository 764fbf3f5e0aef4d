//! Per-node visual styles and the passes that assign them.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;

use crate::color::{FamilyColors, Rgb};
use crate::tree::Tree;

/// Marker drawn at a node position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum NodeShape {
    Circle,
    Square,
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeShape::Circle => write!(f, "circle"),
            NodeShape::Square => write!(f, "square"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStyle {
    pub shape: NodeShape,
    pub fg_color: Rgb,
    /// Fill behind the node's row (rectangular) or wedge (circular).
    pub bg_color: Option<Rgb>,
    /// Marker diameter in pixels; zero hides the marker.
    pub size: f32,
}

impl Default for NodeStyle {
    fn default() -> Self {
        StyleDefaults::default().node_style()
    }
}

/// Configurable defaults for node styling.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDefaults {
    /// Marker shape for every node. Default: circle.
    pub shape: NodeShape,
    /// Marker color for every node. Default: black.
    pub fg_color: Rgb,
    /// Marker size for every node. Default: 5.
    pub node_size: f32,
    /// Marker size for leaves that received a family color. Default: 2.
    pub leaf_size: f32,
    /// Color for families the palette does not mention. Default: grey.
    pub fallback_color: Rgb,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            shape: NodeShape::Circle,
            fg_color: Rgb::BLACK,
            node_size: 5.0,
            leaf_size: 2.0,
            fallback_color: Rgb::new(128, 128, 128),
        }
    }
}

impl StyleDefaults {
    pub fn node_style(&self) -> NodeStyle {
        NodeStyle {
            shape: self.shape,
            fg_color: self.fg_color,
            bg_color: None,
            size: self.node_size,
        }
    }

    pub fn colored_leaf_style(&self, bg_color: Rgb) -> NodeStyle {
        NodeStyle {
            shape: self.shape,
            fg_color: self.fg_color,
            bg_color: Some(bg_color),
            size: self.leaf_size,
        }
    }
}

/// Give every node, internal and leaf, the default style.
pub fn apply_node_style(tree: &mut Tree, defaults: &StyleDefaults) {
    for node in &mut tree.nodes {
        node.style = defaults.node_style();
    }
}

/// Paint the background of every mapped leaf with its family color.
///
/// Leaves without a name, without a mapping entry or mapped to an empty family
/// keep their current style.
/// Returns how many leaves were colored.
pub fn apply_leaf_colors(
    tree: &mut Tree,
    leaf_to_family: &BTreeMap<String, String>,
    family_colors: &FamilyColors,
    defaults: &StyleDefaults,
) -> usize {
    let mut colored = 0;
    for node in tree.nodes.iter_mut().filter(|node| node.is_leaf()) {
        let Some(family) = node
            .name
            .as_ref()
            .and_then(|name| leaf_to_family.get(name))
            .filter(|family| !family.is_empty())
        else {
            continue;
        };

        let color = family_colors
            .get(family)
            .copied()
            .unwrap_or(defaults.fallback_color);
        node.style = defaults.colored_leaf_style(color);
        colored += 1;
    }
    colored
}
