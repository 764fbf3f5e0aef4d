use std::f32::consts::PI;
use std::path::Path;

use anyhow::{Context, Result};
use svg::node::element::{Circle, Group, Path as SvgPath, Rectangle, Text};
use svg::Document;

use super::scene::{ScenePrimitive, TextAlign, TreeScene};
use crate::tree::style::NodeShape;

/// Write the scene as an SVG document.
pub fn export_svg(scene: &TreeScene, path: &Path) -> Result<()> {
    let document = render_document(scene);
    svg::save(path, &document)
        .with_context(|| format!("failed to save SVG: {}", path.display()))
}

pub fn render_document(scene: &TreeScene) -> Document {
    let mut tree_group = Group::new().set("id", "tree");

    for primitive in &scene.primitives {
        tree_group = match primitive {
            ScenePrimitive::FillRect { min, max, color } => tree_group.add(
                Rectangle::new()
                    .set("x", min.0)
                    .set("y", min.1)
                    .set("width", (max.0 - min.0).max(0.0))
                    .set("height", (max.1 - min.1).max(0.0))
                    .set("fill", color.to_hex())
                    .set("stroke", "none"),
            ),
            ScenePrimitive::FillSector {
                center,
                inner_radius,
                outer_radius,
                start_angle,
                end_angle,
                color,
            } => {
                let path_data =
                    sector_path(*center, *inner_radius, *outer_radius, *start_angle, *end_angle);
                if path_data.is_empty() {
                    continue;
                }
                tree_group.add(
                    SvgPath::new()
                        .set("d", path_data)
                        .set("fill", color.to_hex())
                        .set("stroke", "none"),
                )
            }
            ScenePrimitive::StrokePolyline {
                points,
                width,
                color,
            } => {
                let Some(path_data) = polyline_path(points) else {
                    continue;
                };
                tree_group.add(
                    SvgPath::new()
                        .set("d", path_data)
                        .set("fill", "none")
                        .set("stroke", color.to_hex())
                        .set("stroke-width", *width)
                        .set("stroke-linecap", "round")
                        .set("stroke-linejoin", "round"),
                )
            }
            ScenePrimitive::Marker {
                center,
                size,
                shape,
                color,
            } => match shape {
                NodeShape::Circle => tree_group.add(
                    Circle::new()
                        .set("cx", center.0)
                        .set("cy", center.1)
                        .set("r", size * 0.5)
                        .set("fill", color.to_hex()),
                ),
                NodeShape::Square => tree_group.add(
                    Rectangle::new()
                        .set("x", center.0 - size * 0.5)
                        .set("y", center.1 - size * 0.5)
                        .set("width", *size)
                        .set("height", *size)
                        .set("fill", color.to_hex()),
                ),
            },
            ScenePrimitive::Text {
                text,
                anchor,
                angle,
                align,
                size,
                color,
            } => {
                let text_anchor = match align {
                    TextAlign::Start => "start",
                    TextAlign::Middle => "middle",
                    TextAlign::End => "end",
                };
                let mut element = Text::new("")
                    .set("x", anchor.0)
                    .set("y", anchor.1)
                    .set("font-size", *size)
                    .set("font-family", "sans-serif")
                    .set("fill", color.to_hex())
                    .set("dominant-baseline", "middle")
                    .set("text-anchor", text_anchor);

                let degrees = angle.to_degrees();
                if degrees.abs() > 0.1 {
                    element = element.set(
                        "transform",
                        format!("rotate({} {} {})", degrees, anchor.0, anchor.1),
                    );
                }

                tree_group.add(element.add(svg::node::Text::new(text.clone())))
            }
        };
    }

    Document::new()
        .set("width", scene.width)
        .set("height", scene.height)
        .set("viewBox", (0, 0, scene.width as i32, scene.height as i32))
        .add(tree_group)
}

fn polyline_path(points: &[(f32, f32)]) -> Option<String> {
    let ((start_x, start_y), rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let mut path_data = format!("M {} {}", start_x, start_y);
    for (x, y) in rest {
        path_data.push_str(&format!(" L {} {}", x, y));
    }
    Some(path_data)
}

fn sector_path(
    center: (f32, f32),
    inner_radius: f32,
    outer_radius: f32,
    start_angle: f32,
    end_angle: f32,
) -> String {
    if outer_radius <= inner_radius {
        return String::new();
    }

    let angle_span = (end_angle - start_angle).abs();
    let steps = ((angle_span / (PI / 24.0)).ceil() as usize).max(16);
    let point = |radius: f32, t: f32| {
        let angle = start_angle + (end_angle - start_angle) * t;
        (
            center.0 + radius * angle.cos(),
            center.1 + radius * angle.sin(),
        )
    };

    let outer_points = (0..=steps).map(|i| point(outer_radius, i as f32 / steps as f32));
    let inner_points: Vec<(f32, f32)> = if inner_radius > f32::EPSILON {
        (0..=steps)
            .rev()
            .map(|i| point(inner_radius, i as f32 / steps as f32))
            .collect()
    } else {
        vec![center]
    };

    let mut path_data = String::new();
    for (i, (x, y)) in outer_points.chain(inner_points).enumerate() {
        let command = if i == 0 { "M" } else { "L" };
        path_data.push_str(&format!("{} {} {} ", command, x, y));
    }
    path_data.push('Z');
    path_data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::export::build_tree_scene;
    use crate::tree::painter::TreePainter;
    use crate::tree::style::{apply_node_style, StyleDefaults};
    use crate::tree::tree_from_newick;

    #[test]
    fn document_contains_labels_and_leaf_colors() {
        let mut tree = tree_from_newick("((Alpha:1,Beta:1):0.5,Gamma:2);");
        apply_node_style(&mut tree, &StyleDefaults::default());
        let beta = tree
            .nodes
            .iter()
            .position(|node| node.name.as_deref() == Some("Beta"))
            .unwrap();
        tree.nodes[beta].style.bg_color = Some(Rgb::new(0xab, 0xcd, 0xef));

        let scene = build_tree_scene(&tree, &TreePainter::new(false, false, Some("Demo".into())))
            .unwrap();
        let rendered = render_document(&scene).to_string();

        for name in ["Alpha", "Beta", "Gamma", "Demo"] {
            assert!(rendered.contains(name), "missing {name}");
        }
        assert!(rendered.contains("#abcdef"));
        assert!(rendered.contains("<circle"));
    }

    #[test]
    fn rotated_labels_get_transform() {
        let mut tree = tree_from_newick("(A:1,B:1);");
        apply_node_style(&mut tree, &StyleDefaults::default());
        let scene = build_tree_scene(&tree, &TreePainter::new(false, true, None)).unwrap();
        let rendered = render_document(&scene).to_string();
        assert!(rendered.contains("rotate(90"));
    }

    #[test]
    fn export_writes_file() {
        let mut tree = tree_from_newick("((A:1,B:1):1,C:1);");
        apply_node_style(&mut tree, &StyleDefaults::default());
        let scene = build_tree_scene(&tree, &TreePainter::new(true, false, None)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.svg");
        export_svg(&scene, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<svg"));
        assert!(written.contains("A"));
    }

    #[test]
    fn sector_without_inner_radius_closes_at_center() {
        let data = sector_path((10.0, 10.0), 0.0, 5.0, 0.0, 1.0);
        assert!(data.starts_with("M 15 10"));
        assert!(data.ends_with("L 10 10 Z"));
        assert!(sector_path((0.0, 0.0), 5.0, 5.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn single_point_polyline_is_skipped() {
        assert!(polyline_path(&[(1.0, 1.0)]).is_none());
        assert_eq!(
            polyline_path(&[(0.0, 0.0), (2.0, 1.5)]).as_deref(),
            Some("M 0 0 L 2 1.5")
        );
    }
}
