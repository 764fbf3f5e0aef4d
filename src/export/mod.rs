//! Turning a styled tree into image files.

pub mod png;
pub mod scene;
pub mod svg;

pub use scene::{build_tree_scene, TreeScene};
