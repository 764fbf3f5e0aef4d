use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::color::Rgb;
use crate::tree::layout::{ContinuousBranch, TreeLayout, TreeLayoutType};
use crate::tree::painter::TreePainter;
use crate::tree::style::NodeShape;
use crate::tree::{NodeId, Tree};

const MARGIN: f32 = 20.0;
const LABEL_GAP: f32 = 4.0;
const MIN_TREE_EXTENT: f32 = 100.0;
const SCALE_BAR_HEIGHT: f32 = 30.0;
// Average glyph advance relative to the font size, for sizing the canvas.
const GLYPH_WIDTH_RATIO: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenePrimitive {
    FillRect {
        min: (f32, f32),
        max: (f32, f32),
        color: Rgb,
    },
    FillSector {
        center: (f32, f32),
        inner_radius: f32,
        outer_radius: f32,
        start_angle: f32,
        end_angle: f32,
        color: Rgb,
    },
    StrokePolyline {
        points: Vec<(f32, f32)>,
        width: f32,
        color: Rgb,
    },
    Marker {
        center: (f32, f32),
        size: f32,
        shape: NodeShape,
        color: Rgb,
    },
    /// `angle` is in radians, clockwise, around `anchor`.
    Text {
        text: String,
        anchor: (f32, f32),
        angle: f32,
        align: TextAlign,
        size: f32,
        color: Rgb,
    },
}

/// Everything needed to draw a tree, in pixel coordinates with y pointing down.
#[derive(Debug, Clone)]
pub struct TreeScene {
    pub width: f32,
    pub height: f32,
    pub primitives: Vec<ScenePrimitive>,
}

/// Maps layout units to canvas pixels.
enum Projection {
    Rows {
        left: f32,
        top: f32,
        pitch: f32,
        scale: f32,
        rotated: bool,
    },
    Polar {
        center: (f32, f32),
        scale: f32,
    },
}

impl Projection {
    fn map(&self, pos: (f32, f32)) -> (f32, f32) {
        match *self {
            Projection::Rows {
                left,
                top,
                pitch,
                scale,
                rotated: false,
            } => (left + pos.0 * scale, top + pitch * 0.5 + pos.1 * pitch),
            Projection::Rows {
                left,
                top,
                pitch,
                scale,
                rotated: true,
            } => (left + pitch * 0.5 + pos.1 * pitch, top + pos.0 * scale),
            Projection::Polar { center, scale } => {
                (center.0 + pos.0 * scale, center.1 + pos.1 * scale)
            }
        }
    }

    fn scale(&self) -> f32 {
        match *self {
            Projection::Rows { scale, .. } | Projection::Polar { scale, .. } => scale,
        }
    }
}

/// Rough rendered width of `text`, used to reserve room for labels.
pub fn estimate_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH_RATIO
}

/// Lay out `tree` according to `painter` and collect the drawing primitives.
///
/// Returns `None` for a tree without a root.
pub fn build_tree_scene(tree: &Tree, painter: &TreePainter) -> Option<TreeScene> {
    let layout = TreeLayout::from_tree(tree, painter.layout_type)?;

    let max_marker = tree
        .nodes
        .iter()
        .map(|node| node.style.size)
        .fold(0.0f32, f32::max);
    let label_offset = max_marker * 0.5 + LABEL_GAP;
    let label_extent = if painter.show_leaf_name {
        tree.external_nodes()
            .iter()
            .filter_map(|node| node.name.as_deref())
            .map(|name| estimate_text_width(name, painter.tip_label_font_size))
            .fold(0.0f32, f32::max)
            + label_offset
    } else {
        max_marker * 0.5
    };

    let title_height = if painter.title.is_some() {
        painter.title_font_size * 1.6
    } else {
        0.0
    };
    let title_width = painter
        .title
        .as_deref()
        .map(|title| estimate_text_width(title, painter.title_font_size) + 2.0 * MARGIN)
        .unwrap_or(0.0);
    let scale_height = if painter.show_scale {
        SCALE_BAR_HEIGHT
    } else {
        0.0
    };

    let pitch = painter.row_pitch();
    let breadth = layout.leaf_count as f32 * pitch;
    let depth_units = layout.max_root_distance().max(1e-6);
    let top = MARGIN + title_height;

    let (width, height, projection, leaf_band_outer) = match layout.layout_type {
        TreeLayoutType::Rectangular if !painter.rotate => {
            let depth = (painter.width - 2.0 * MARGIN - label_extent).max(MIN_TREE_EXTENT);
            let width = (2.0 * MARGIN + depth + label_extent).max(title_width);
            let height = top + breadth + MARGIN + scale_height;
            let projection = Projection::Rows {
                left: MARGIN,
                top,
                pitch,
                scale: depth / layout.width.max(1e-6),
                rotated: false,
            };
            (width, height, projection, width - MARGIN)
        }
        TreeLayoutType::Rectangular => {
            let depth = (painter.height - top - MARGIN - label_extent - scale_height)
                .max(MIN_TREE_EXTENT);
            let width = (2.0 * MARGIN + breadth).max(title_width);
            let height = top + depth + label_extent + MARGIN + scale_height;
            let projection = Projection::Rows {
                left: (width - breadth) * 0.5,
                top,
                pitch,
                scale: depth / layout.width.max(1e-6),
                rotated: true,
            };
            (width, height, projection, height - MARGIN - scale_height)
        }
        TreeLayoutType::Circular => {
            let hinted = (painter.width.min(painter.height) - 2.0 * MARGIN) * 0.5 - label_extent;
            let needed = breadth / TAU;
            let radius = hinted.max(needed).max(MIN_TREE_EXTENT * 0.5);
            let outer = radius + label_extent;
            let width = (2.0 * (MARGIN + outer)).max(title_width);
            let height = top + 2.0 * outer + MARGIN + scale_height;
            let projection = Projection::Polar {
                center: (width * 0.5, top + outer),
                scale: radius / depth_units,
            };
            (width, height, projection, outer)
        }
    };

    let mut builder = SceneBuilder {
        tree,
        layout: &layout,
        painter,
        projection,
        width,
        height,
        label_offset,
        leaf_band_outer,
        primitives: Vec::new(),
    };

    builder.push_background();
    builder.push_leaf_backgrounds();
    builder.push_branches();
    builder.push_markers();
    if painter.show_branch_length {
        builder.push_branch_lengths();
    }
    if painter.show_leaf_name {
        builder.push_leaf_names();
    }
    builder.push_title(title_height);
    if painter.show_scale {
        builder.push_scale_bar(depth_units);
    }

    Some(TreeScene {
        width: width.ceil(),
        height: height.ceil(),
        primitives: builder.primitives,
    })
}

struct SceneBuilder<'a> {
    tree: &'a Tree,
    layout: &'a TreeLayout,
    painter: &'a TreePainter,
    projection: Projection,
    width: f32,
    height: f32,
    label_offset: f32,
    /// Far edge of leaf backgrounds: x, y or radius depending on the projection.
    leaf_band_outer: f32,
    primitives: Vec<ScenePrimitive>,
}

impl SceneBuilder<'_> {
    fn map(&self, node_id: NodeId) -> (f32, f32) {
        self.projection.map(self.layout.positions[node_id])
    }

    fn push_background(&mut self) {
        self.primitives.push(ScenePrimitive::FillRect {
            min: (0.0, 0.0),
            max: (self.width, self.height),
            color: self.painter.background_color,
        });
    }

    /// Leaf background colors fill from the start of the leaf's branch to the
    /// outer edge of the label area.
    fn push_leaf_backgrounds(&mut self) {
        let pitch = self.painter.row_pitch();
        for node in self.tree.nodes.iter().filter(|node| node.is_leaf()) {
            let Some(color) = node.style.bg_color else {
                continue;
            };
            let branch_start = node.parent.unwrap_or(node.id);

            let primitive = match self.projection {
                Projection::Rows { rotated: false, .. } => {
                    let (x, y) = self.map(node.id);
                    let start_x = self.map(branch_start).0.min(x);
                    ScenePrimitive::FillRect {
                        min: (start_x, y - pitch * 0.5),
                        max: (self.leaf_band_outer, y + pitch * 0.5),
                        color,
                    }
                }
                Projection::Rows { rotated: true, .. } => {
                    let (x, y) = self.map(node.id);
                    let start_y = self.map(branch_start).1.min(y);
                    ScenePrimitive::FillRect {
                        min: (x - pitch * 0.5, start_y),
                        max: (x + pitch * 0.5, self.leaf_band_outer),
                        color,
                    }
                }
                Projection::Polar { center, scale } => {
                    let angle = self.layout.node_angles[node.id];
                    let half_step = self.layout.angular_step * 0.5;
                    let inner = self.layout.root_distances[branch_start] * scale;
                    ScenePrimitive::FillSector {
                        center,
                        inner_radius: inner,
                        outer_radius: self.leaf_band_outer.max(inner),
                        start_angle: angle - half_step,
                        end_angle: angle + half_step,
                        color,
                    }
                }
            };
            self.primitives.push(primitive);
        }
    }

    fn push_branches(&mut self) {
        let branches: Vec<&ContinuousBranch> = self
            .layout
            .root_branch
            .iter()
            .chain(self.layout.continuous_branches.iter())
            .collect();

        for branch in branches {
            if branch.points.len() < 2 {
                continue;
            }
            let points = branch
                .points
                .iter()
                .map(|&point| self.projection.map(point))
                .collect();
            self.primitives.push(ScenePrimitive::StrokePolyline {
                points,
                width: self.painter.branch_width,
                color: self.painter.branch_color,
            });
        }
    }

    fn push_markers(&mut self) {
        for node in &self.tree.nodes {
            if node.style.size <= 0.0 {
                continue;
            }
            self.primitives.push(ScenePrimitive::Marker {
                center: self.map(node.id),
                size: node.style.size,
                shape: node.style.shape,
                color: node.style.fg_color,
            });
        }
    }

    fn push_branch_lengths(&mut self) {
        let size = self.painter.branch_label_font_size;
        let gap = size * 0.5 + 2.0;

        for branch in &self.layout.continuous_branches {
            let Some(length) = self.tree.nodes[branch.child].length else {
                continue;
            };
            // The first leg always runs from the child to its shoulder.
            let (Some(&child), Some(&shoulder)) = (branch.points.first(), branch.points.get(1))
            else {
                continue;
            };
            let child = self.projection.map(child);
            let shoulder = self.projection.map(shoulder);
            let mid = ((child.0 + shoulder.0) * 0.5, (child.1 + shoulder.1) * 0.5);

            let (anchor, angle) = match self.projection {
                Projection::Rows { rotated: false, .. } => ((mid.0, mid.1 - gap), 0.0),
                Projection::Rows { rotated: true, .. } => ((mid.0 - gap, mid.1), FRAC_PI_2),
                Projection::Polar { .. } => {
                    let radial = self.layout.node_angles[branch.child];
                    let normal = (-radial.sin(), radial.cos());
                    let anchor = (mid.0 - normal.0 * gap, mid.1 - normal.1 * gap);
                    (anchor, readable_angle(radial).0)
                }
            };

            self.primitives.push(ScenePrimitive::Text {
                text: format_branch_length(length),
                anchor,
                angle,
                align: TextAlign::Middle,
                size,
                color: self.painter.branch_label_color,
            });
        }
    }

    fn push_leaf_names(&mut self) {
        let size = self.painter.tip_label_font_size;
        for node in self.tree.nodes.iter().filter(|node| node.is_leaf()) {
            let Some(name) = node.name.as_deref() else {
                continue;
            };
            let (x, y) = self.map(node.id);

            let (anchor, angle, align) = match self.projection {
                Projection::Rows { rotated: false, .. } => {
                    ((x + self.label_offset, y), 0.0, TextAlign::Start)
                }
                Projection::Rows { rotated: true, .. } => {
                    ((x, y + self.label_offset), FRAC_PI_2, TextAlign::Start)
                }
                Projection::Polar { .. } => {
                    let radial = self.layout.node_angles[node.id];
                    let anchor = (
                        x + self.label_offset * radial.cos(),
                        y + self.label_offset * radial.sin(),
                    );
                    let (angle, flipped) = readable_angle(radial);
                    let align = if flipped {
                        TextAlign::End
                    } else {
                        TextAlign::Start
                    };
                    (anchor, angle, align)
                }
            };

            self.primitives.push(ScenePrimitive::Text {
                text: name.to_owned(),
                anchor,
                angle,
                align,
                size,
                color: self.painter.label_color,
            });
        }
    }

    fn push_title(&mut self, title_height: f32) {
        let Some(title) = self.painter.title.as_deref() else {
            return;
        };
        self.primitives.push(ScenePrimitive::Text {
            text: title.to_owned(),
            anchor: (self.width * 0.5, MARGIN + title_height * 0.5),
            angle: 0.0,
            align: TextAlign::Middle,
            size: self.painter.title_font_size,
            color: self.painter.label_color,
        });
    }

    fn push_scale_bar(&mut self, depth_units: f32) {
        let Some(tick) = nice_tick_span(depth_units) else {
            return;
        };
        let bar = tick * self.projection.scale();
        let baseline = self.height - MARGIN;
        let start = MARGIN;
        let end = start + bar;
        let color = self.painter.branch_color;
        let width = self.painter.branch_width;

        self.primitives.push(ScenePrimitive::StrokePolyline {
            points: vec![
                (start, baseline - 6.0),
                (start, baseline),
                (end, baseline),
                (end, baseline - 6.0),
            ],
            width,
            color,
        });
        self.primitives.push(ScenePrimitive::Text {
            text: format_branch_length(tick as f64),
            anchor: ((start + end) * 0.5, baseline - 12.0),
            angle: 0.0,
            align: TextAlign::Middle,
            size: self.painter.branch_label_font_size,
            color,
        });
    }
}

/// Keep radial text upright: angles pointing left are turned half a turn.
/// Returns the drawing angle and whether it was flipped.
fn readable_angle(angle: f32) -> (f32, bool) {
    let normalized = angle.rem_euclid(TAU);
    if normalized > FRAC_PI_2 && normalized < 3.0 * FRAC_PI_2 {
        (normalized + PI, true)
    } else {
        (normalized, false)
    }
}

fn format_branch_length(length: f64) -> String {
    if length != 0.0 && length.abs() < 1e-3 {
        format!("{length:.1e}")
    } else {
        format!("{length:.3}")
    }
}

/// Round span for a scale bar covering a sensible part of `total`.
fn nice_tick_span(total: f32) -> Option<f32> {
    if total <= f32::EPSILON {
        return None;
    }

    let magnitude = 10.0f32.powf(total.log10().floor());
    let normalized = total / magnitude;

    let nice = if normalized < 2.0 {
        0.5
    } else if normalized < 5.0 {
        1.0
    } else {
        2.0
    };

    Some(nice * magnitude)
}
