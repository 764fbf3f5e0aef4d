use std::path::Path;

use anyhow::{anyhow, Context, Result};
use font_kit::family_name::FamilyName;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use log::{debug, warn};
use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::scene::{ScenePrimitive, TextAlign, TreeScene};
use crate::color::Rgb;
use crate::tree::style::NodeShape;

/// Rasterizes scenes with tiny-skia. Text needs a TrueType font; without one
/// labels are left out of the image.
pub struct PngRenderer {
    text_font: Option<Font>,
}

impl PngRenderer {
    /// Use `font_path` when given, otherwise the system's default sans-serif font.
    pub fn new(font_path: Option<&Path>) -> Result<Self> {
        let text_font = match font_path {
            Some(path) => Some(load_font(path)?),
            None => load_system_sans_font(),
        };
        if text_font.is_none() {
            warn!("no usable font found, PNG output will not contain text (use --font)");
        }
        Ok(Self { text_font })
    }

    pub fn without_text() -> Self {
        Self { text_font: None }
    }

    pub fn render(&self, scene: &TreeScene) -> Result<Pixmap> {
        let width_px = scene.width.round().max(1.0) as u32;
        let height_px = scene.height.round().max(1.0) as u32;

        let mut pixmap = Pixmap::new(width_px, height_px)
            .ok_or_else(|| anyhow!("failed to create a {width_px}x{height_px} pixmap"))?;

        for primitive in &scene.primitives {
            render_primitive(&mut pixmap, primitive, self.text_font.as_ref());
        }
        Ok(pixmap)
    }

    pub fn export(&self, scene: &TreeScene, path: &Path) -> Result<()> {
        let pixmap = self.render(scene)?;
        pixmap
            .save_png(path)
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("failed to save PNG: {}", path.display()))
    }
}

/// Rasterize `scene` into a PNG at `path`.
pub fn export_png(scene: &TreeScene, path: &Path, font_path: Option<&Path>) -> Result<()> {
    PngRenderer::new(font_path)?.export(scene, path)
}

fn load_font(path: &Path) -> Result<Font> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    Font::from_bytes(data, FontSettings::default())
        .map_err(|err| anyhow!("{err}"))
        .with_context(|| format!("failed to parse font: {}", path.display()))
}

fn load_system_sans_font() -> Option<Font> {
    let source = SystemSource::new();
    let handle = match source.select_best_match(&[FamilyName::SansSerif], &Properties::new()) {
        Ok(handle) => handle,
        Err(err) => {
            debug!("no system sans-serif font: {err:?}");
            return None;
        }
    };
    let font = handle.load().ok()?;
    debug!("using system font {}", font.full_name());
    let font_data = font.copy_font_data()?;
    Font::from_bytes(font_data.as_ref().clone(), FontSettings::default()).ok()
}

fn render_primitive(pixmap: &mut Pixmap, primitive: &ScenePrimitive, text_font: Option<&Font>) {
    match primitive {
        ScenePrimitive::FillRect { min, max, color } => {
            let Some(rect) = tiny_skia::Rect::from_ltrb(min.0, min.1, max.0, max.1) else {
                return;
            };
            pixmap.fill_rect(rect, &fill_paint(*color), Transform::identity(), None);
        }
        ScenePrimitive::FillSector {
            center,
            inner_radius,
            outer_radius,
            start_angle,
            end_angle,
            color,
        } => {
            let points = annular_sector_points(
                *center,
                *inner_radius,
                *outer_radius,
                *start_angle,
                *end_angle,
            );
            if let Some(path) = polygon_path(&points) {
                pixmap.fill_path(
                    &path,
                    &fill_paint(*color),
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        }
        ScenePrimitive::StrokePolyline {
            points,
            width,
            color,
        } => {
            let mut builder = PathBuilder::new();
            let Some((first, rest)) = points.split_first() else {
                return;
            };
            builder.move_to(first.0, first.1);
            for point in rest {
                builder.line_to(point.0, point.1);
            }
            if let Some(path) = builder.finish() {
                stroke_path(pixmap, &path, *width, *color);
            }
        }
        ScenePrimitive::Marker {
            center,
            size,
            shape,
            color,
        } => {
            let half = size * 0.5;
            let path = match shape {
                NodeShape::Circle => PathBuilder::from_circle(center.0, center.1, half),
                NodeShape::Square => {
                    tiny_skia::Rect::from_xywh(center.0 - half, center.1 - half, *size, *size)
                        .map(PathBuilder::from_rect)
                }
            };
            if let Some(path) = path {
                pixmap.fill_path(
                    &path,
                    &fill_paint(*color),
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        }
        ScenePrimitive::Text {
            text,
            anchor,
            angle,
            align,
            size,
            color,
        } => {
            let Some(font) = text_font else {
                return;
            };
            render_text(pixmap, font, text, *anchor, *angle, *align, *size, *color);
        }
    }
}

fn fill_paint(color: Rgb) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_skia_color(color));
    paint.anti_alias = true;
    paint
}

fn stroke_path(pixmap: &mut Pixmap, path: &tiny_skia::Path, width: f32, color: Rgb) {
    let paint = fill_paint(color);

    let stroke = Stroke {
        width: width.max(1.0),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    pixmap.stroke_path(path, &paint, &stroke, Transform::identity(), None);
}

fn to_skia_color(color: Rgb) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, 255)
}

fn polygon_path(points: &[(f32, f32)]) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(first.0, first.1);
    for point in rest {
        builder.line_to(point.0, point.1);
    }
    builder.close();
    builder.finish()
}

fn arc_points(center: (f32, f32), radius: f32, start_angle: f32, end_angle: f32) -> Vec<(f32, f32)> {
    let delta = end_angle - start_angle;
    let steps = ((delta.abs() * radius.abs() / 2.0).ceil() as usize).clamp(12, 320);

    (0..=steps)
        .map(|i| {
            let a = start_angle + delta * i as f32 / steps as f32;
            (center.0 + radius * a.cos(), center.1 + radius * a.sin())
        })
        .collect()
}

fn annular_sector_points(
    center: (f32, f32),
    inner_radius: f32,
    outer_radius: f32,
    start_angle: f32,
    end_angle: f32,
) -> Vec<(f32, f32)> {
    let mut points = arc_points(center, outer_radius, start_angle, end_angle);
    if inner_radius > f32::EPSILON {
        points.extend(arc_points(center, inner_radius, end_angle, start_angle));
    } else {
        points.push(center);
    }
    points
}

#[allow(clippy::too_many_arguments)]
fn render_text(
    pixmap: &mut Pixmap,
    font: &Font,
    text: &str,
    anchor: (f32, f32),
    angle: f32,
    align: TextAlign,
    size: f32,
    color: Rgb,
) {
    if text.is_empty() {
        return;
    }

    let px = size.max(6.0);
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings::default());
    layout.append(&[font], &TextStyle::new(text, px, 0));

    let glyphs = layout.glyphs();
    if glyphs.is_empty() {
        return;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in glyphs {
        if g.width == 0 || g.height == 0 {
            continue;
        }
        min_x = min_x.min(g.x);
        min_y = min_y.min(g.y);
        max_x = max_x.max(g.x + g.width as f32);
        max_y = max_y.max(g.y + g.height as f32);
    }

    if !min_x.is_finite() || !min_y.is_finite() || !max_x.is_finite() || !max_y.is_finite() {
        return;
    }

    let text_w = (max_x - min_x).max(1.0);
    let text_h = (max_y - min_y).max(1.0);
    let anchor_local = match align {
        TextAlign::Start => (0.0_f32, text_h * 0.5),
        TextAlign::End => (text_w, text_h * 0.5),
        TextAlign::Middle => (text_w * 0.5, text_h * 0.5),
    };

    let width_px = pixmap.width() as usize;
    let cos_a = angle.cos();
    let sin_a = angle.sin();
    let data = pixmap.data_mut();

    for g in glyphs {
        if g.width == 0 || g.height == 0 {
            continue;
        }

        let (metrics, bitmap) = font.rasterize_config(g.key);
        if metrics.width == 0 || metrics.height == 0 {
            continue;
        }

        let gx = g.x - min_x;
        let gy = g.y - min_y;

        for y in 0..metrics.height {
            for x in 0..metrics.width {
                let cov = bitmap[y * metrics.width + x] as f32 / 255.0;
                if cov <= 0.0 {
                    continue;
                }

                // Sample at the pixel center so rotated glyphs stay stable.
                let dx = gx + x as f32 + 0.5 - anchor_local.0;
                let dy = gy + y as f32 + 0.5 - anchor_local.1;
                let world_x = anchor.0 + dx * cos_a - dy * sin_a;
                let world_y = anchor.1 + dx * sin_a + dy * cos_a;

                // Bilinear splat avoids pinholes in rotated strokes.
                let x0 = world_x.floor();
                let y0 = world_y.floor();
                let fx = world_x - x0;
                let fy = world_y - y0;
                let (x0, y0) = (x0 as i32, y0 as i32);

                for (ox, oy, weight) in [
                    (0, 0, (1.0 - fx) * (1.0 - fy)),
                    (1, 0, fx * (1.0 - fy)),
                    (0, 1, (1.0 - fx) * fy),
                    (1, 1, fx * fy),
                ] {
                    blend_pixel_premultiplied(data, width_px, x0 + ox, y0 + oy, color, cov * weight);
                }
            }
        }
    }
}

fn blend_pixel_premultiplied(
    data: &mut [u8],
    width: usize,
    x: i32,
    y: i32,
    color: Rgb,
    src_a: f32,
) {
    if src_a <= 0.0 || x < 0 || y < 0 {
        return;
    }
    let (xu, yu) = (x as usize, y as usize);
    let height = data.len() / (width * 4);
    if xu >= width || yu >= height {
        return;
    }
    let idx = (yu * width + xu) * 4;

    let src = [color.r, color.g, color.b];
    for (channel, &value) in src.iter().enumerate() {
        let dst = data[idx + channel] as f32 / 255.0;
        let out = (value as f32 / 255.0) * src_a + dst * (1.0 - src_a);
        data[idx + channel] = (out.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    let dst_a = data[idx + 3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    data[idx + 3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let color = pixmap.pixel(x, y).unwrap();
        (color.red(), color.green(), color.blue(), color.alpha())
    }

    #[test]
    fn fills_background_and_rects() {
        let scene = TreeScene {
            width: 40.0,
            height: 20.0,
            primitives: vec![
                ScenePrimitive::FillRect {
                    min: (0.0, 0.0),
                    max: (40.0, 20.0),
                    color: Rgb::WHITE,
                },
                ScenePrimitive::FillRect {
                    min: (20.0, 0.0),
                    max: (40.0, 20.0),
                    color: Rgb::new(255, 0, 0),
                },
            ],
        };

        let pixmap = PngRenderer::without_text().render(&scene).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (40, 20));
        assert_eq!(pixel(&pixmap, 5, 10), (255, 255, 255, 255));
        assert_eq!(pixel(&pixmap, 30, 10), (255, 0, 0, 255));
    }

    #[test]
    fn draws_markers_and_sectors() {
        let scene = TreeScene {
            width: 60.0,
            height: 60.0,
            primitives: vec![
                ScenePrimitive::FillSector {
                    center: (30.0, 30.0),
                    inner_radius: 10.0,
                    outer_radius: 25.0,
                    start_angle: -0.5,
                    end_angle: 0.5,
                    color: Rgb::new(0, 0, 255),
                },
                ScenePrimitive::Marker {
                    center: (30.0, 30.0),
                    size: 8.0,
                    shape: NodeShape::Square,
                    color: Rgb::new(0, 255, 0),
                },
            ],
        };

        let pixmap = PngRenderer::without_text().render(&scene).unwrap();
        assert_eq!(pixel(&pixmap, 47, 30), (0, 0, 255, 255));
        assert_eq!(pixel(&pixmap, 30, 30), (0, 255, 0, 255));
        assert_eq!(pixel(&pixmap, 5, 5).3, 0);
    }

    #[test]
    fn export_writes_png_file() {
        let scene = TreeScene {
            width: 10.0,
            height: 10.0,
            primitives: vec![ScenePrimitive::StrokePolyline {
                points: vec![(0.0, 5.0), (10.0, 5.0)],
                width: 1.0,
                color: Rgb::BLACK,
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.png");
        PngRenderer::without_text().export(&scene, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn system_font_draws_label_pixels() {
        // Hosts without any installed font have nothing to check.
        let Some(font) = load_system_sans_font() else {
            return;
        };
        let renderer = PngRenderer {
            text_font: Some(font),
        };
        let scene = TreeScene {
            width: 80.0,
            height: 30.0,
            primitives: vec![
                ScenePrimitive::FillRect {
                    min: (0.0, 0.0),
                    max: (80.0, 30.0),
                    color: Rgb::WHITE,
                },
                ScenePrimitive::Text {
                    text: "Leaf".into(),
                    anchor: (10.0, 15.0),
                    angle: 0.0,
                    align: TextAlign::Start,
                    size: 14.0,
                    color: Rgb::BLACK,
                },
            ],
        };

        let pixmap = renderer.render(&scene).unwrap();
        let inked = pixmap.pixels().iter().filter(|p| p.red() < 128).count();
        assert!(inked > 0);
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PngRenderer::new(Some(&dir.path().join("nope.ttf")));
        assert!(result.is_err());
    }

    #[test]
    fn text_is_blended_inside_canvas() {
        let mut data = vec![255u8; 4 * 4 * 4];
        blend_pixel_premultiplied(&mut data, 4, 1, 1, Rgb::BLACK, 1.0);
        blend_pixel_premultiplied(&mut data, 4, -1, 9, Rgb::BLACK, 1.0);
        let idx = (4 + 1) * 4;
        assert_eq!(&data[idx..idx + 4], &[0, 0, 0, 255]);
        assert_eq!(data.iter().filter(|&&v| v == 0).count(), 3);
    }
}
