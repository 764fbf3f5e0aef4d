use crate::color::Rgb;
use crate::tree::layout::TreeLayoutType;

/// How a tree is laid out and decorated when exported.
#[derive(Debug, Clone)]
pub struct TreePainter {
    pub layout_type: TreeLayoutType,
    /// Draw a rectangular tree top to bottom. Ignored for circular trees.
    pub rotate: bool,
    pub title: Option<String>,
    pub title_font_size: f32,
    pub show_leaf_name: bool,
    pub show_branch_length: bool,
    pub show_scale: bool,
    /// Pixels between neighbouring leaf rows.
    pub branch_vertical_margin: f32,
    /// Canvas size hints; the canvas grows when the tree needs more room.
    pub width: f32,
    pub height: f32,
    pub tip_label_font_size: f32,
    pub branch_label_font_size: f32,
    pub branch_width: f32,
    pub branch_color: Rgb,
    pub label_color: Rgb,
    pub branch_label_color: Rgb,
    pub background_color: Rgb,
}

impl Default for TreePainter {
    fn default() -> Self {
        Self {
            layout_type: TreeLayoutType::Rectangular,
            rotate: false,
            title: None,
            title_font_size: RECTANGULAR_TITLE_SIZE,
            show_leaf_name: true,
            show_branch_length: true,
            show_scale: false,
            branch_vertical_margin: 5.0,
            width: 800.0,
            height: 600.0,
            tip_label_font_size: 10.0,
            branch_label_font_size: 8.0,
            branch_width: 1.0,
            branch_color: Rgb::BLACK,
            label_color: Rgb::BLACK,
            branch_label_color: Rgb::new(0x80, 0x80, 0x80),
            background_color: Rgb::WHITE,
        }
    }
}

const CIRCULAR_TITLE_SIZE: f32 = 50.0;
const RECTANGULAR_TITLE_SIZE: f32 = 30.0;

impl TreePainter {
    pub fn new(circular: bool, rotate: bool, title: Option<String>) -> Self {
        let layout_type = if circular {
            TreeLayoutType::Circular
        } else {
            TreeLayoutType::Rectangular
        };
        let title_font_size = if circular {
            CIRCULAR_TITLE_SIZE
        } else {
            RECTANGULAR_TITLE_SIZE
        };

        Self {
            layout_type,
            rotate: rotate && !circular,
            title: title.filter(|title| !title.trim().is_empty()),
            title_font_size,
            ..Self::default()
        }
    }

    pub fn is_circular(&self) -> bool {
        self.layout_type == TreeLayoutType::Circular
    }

    /// Vertical distance between adjacent leaves.
    pub fn row_pitch(&self) -> f32 {
        self.tip_label_font_size + self.branch_vertical_margin * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_uses_large_title_and_drops_rotation() {
        let painter = TreePainter::new(true, true, Some("Viroids".into()));
        assert!(painter.is_circular());
        assert!(!painter.rotate);
        assert_eq!(painter.title_font_size, 50.0);
        assert_eq!(painter.title.as_deref(), Some("Viroids"));
    }

    #[test]
    fn rectangular_keeps_rotation() {
        let painter = TreePainter::new(false, true, None);
        assert_eq!(painter.layout_type, TreeLayoutType::Rectangular);
        assert!(painter.rotate);
        assert_eq!(painter.title_font_size, 30.0);
    }

    #[test]
    fn fixed_display_toggles() {
        let painter = TreePainter::new(false, false, Some("   ".into()));
        assert!(painter.show_leaf_name);
        assert!(painter.show_branch_length);
        assert!(!painter.show_scale);
        assert_eq!(painter.branch_vertical_margin, 5.0);
        assert_eq!(painter.title, None);
    }
}
