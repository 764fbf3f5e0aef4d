use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use crate::color::{generate_family_colors, Rgb};
use crate::export::{build_tree_scene, png, svg};
use crate::io;
use crate::tree::painter::TreePainter;
use crate::tree::style::{apply_leaf_colors, apply_node_style, NodeShape, StyleDefaults};
use crate::ui::{self, PreviewSummary};

pub const DEFAULT_PNG_PATH: &str = "Tree.png";
pub const DEFAULT_SVG_PATH: &str = "Tree.svg";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "phyloview",
    version,
    about = "Render a phylogenetic tree with leaves colored by family."
)]
pub struct AppConfig {
    /// Tree file to load (Newick or Nexus formats).
    #[arg(short = 't', long, alias = "tree_file", value_name = "TREE_FILE")]
    pub tree_file: PathBuf,

    /// `leaf:family` mapping, one pair per line.
    #[arg(short = 'f', long, alias = "mapping_file", value_name = "MAPPING_FILE")]
    pub mapping_file: PathBuf,

    /// Color scheme name, or a `.txt` file of `family:color` lines.
    #[arg(short, long, default_value = crate::color::scheme::DEFAULT_SCHEME)]
    pub palette: String,

    /// Title drawn above the tree.
    #[arg(long, alias = "tree_title")]
    pub title: Option<String>,

    /// Where to write the PNG rendering.
    #[arg(
        long,
        alias = "save_png",
        value_name = "PATH",
        num_args = 0..=1,
        default_value = DEFAULT_PNG_PATH,
        default_missing_value = DEFAULT_PNG_PATH
    )]
    pub png: PathBuf,

    /// Where to write the SVG rendering.
    #[arg(
        long,
        alias = "save_svg",
        value_name = "PATH",
        num_args = 0..=1,
        default_value = DEFAULT_SVG_PATH,
        default_missing_value = DEFAULT_SVG_PATH
    )]
    pub svg: PathBuf,

    /// Draw a circular tree.
    #[arg(short, long, visible_alias = "circ", alias = "circular_tree")]
    pub circular: bool,

    /// Draw a rectangular tree top to bottom.
    #[arg(short, long, alias = "rotate_tree")]
    pub rotate: bool,

    /// Canvas width hint in pixels
    #[arg(long, default_value_t = 800.0)]
    pub width: f32,

    /// Canvas height hint in pixels
    #[arg(long, default_value_t = 600.0)]
    pub height: f32,

    #[arg(long, value_enum, default_value_t = NodeShape::Circle)]
    pub node_shape: NodeShape,

    /// Marker color for every node.
    #[arg(long, default_value = "black")]
    pub node_color: Rgb,

    #[arg(long, default_value_t = 5.0)]
    pub node_size: f32,

    /// Marker size of leaves that received a family color.
    #[arg(long, default_value_t = 2.0)]
    pub leaf_size: f32,

    /// Color for families missing from a palette file.
    #[arg(long, default_value = "gray")]
    pub fallback_color: Rgb,

    /// TTF/OTF font used for PNG labels.
    #[arg(long, value_name = "FONT")]
    pub font: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl AppConfig {
    pub fn style_defaults(&self) -> StyleDefaults {
        StyleDefaults {
            shape: self.node_shape,
            fg_color: self.node_color,
            node_size: self.node_size,
            leaf_size: self.leaf_size,
            fallback_color: self.fallback_color,
        }
    }

    pub fn painter(&self) -> TreePainter {
        if self.circular && self.rotate {
            warn!("--rotate only applies to rectangular trees; ignoring it");
        }
        TreePainter {
            width: self.width,
            height: self.height,
            ..TreePainter::new(self.circular, self.rotate, self.title.clone())
        }
    }
}

pub struct PhyloViewApp;

impl PhyloViewApp {
    pub fn run(config: &AppConfig) -> Result<()> {
        let bundle = io::load_trees(&config.tree_file)?;
        if bundle.trees.len() > 1 {
            warn!(
                "{} contains {} trees; only the first one is rendered",
                config.tree_file.display(),
                bundle.trees.len()
            );
        }
        let mut tree = bundle
            .trees
            .first()
            .cloned()
            .with_context(|| format!("no trees found in {}", config.tree_file.display()))?;
        info!(
            "Loaded {:?} tree with {} leaves from {}",
            bundle.format,
            tree.leaf_count(),
            config.tree_file.display()
        );

        let mapping = io::load_mapping(&config.mapping_file)?;
        let families = io::families(&mapping);
        info!(
            "Mapped {} leaves to {} families",
            mapping.len(),
            families.len()
        );

        let palette = io::load_palette(&config.palette)?;
        let defaults = config.style_defaults();
        let family_colors = generate_family_colors(&palette, &families, defaults.fallback_color)?;

        apply_node_style(&mut tree, &defaults);
        let colored_leaves = apply_leaf_colors(&mut tree, &mapping, &family_colors, &defaults);
        info!("Colored {colored_leaves} of {} leaves", tree.leaf_count());

        ui::render_preview(&PreviewSummary {
            bundle: &bundle,
            tree: &tree,
            family_colors: &family_colors,
            colored_leaves,
        })
        .context("failed to print preview")?;

        let painter = config.painter();
        let scene = build_tree_scene(&tree, &painter)
            .with_context(|| format!("{} has no root", config.tree_file.display()))?;

        png::export_png(&scene, &config.png, config.font.as_deref())?;
        info!("Saved PNG to {}", config.png.display());
        svg::export_svg(&scene, &config.svg)?;
        info!("Saved SVG to {}", config.svg.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> AppConfig {
        AppConfig::try_parse_from(std::iter::once("phyloview").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_and_aliases() {
        let config = parse(&["--tree_file", "t.nwk", "--mapping_file", "m.txt"]);
        assert_eq!(config.palette, "pastel");
        assert_eq!(config.png, PathBuf::from(DEFAULT_PNG_PATH));
        assert_eq!(config.svg, PathBuf::from(DEFAULT_SVG_PATH));
        assert!(!config.circular && !config.rotate);
        assert_eq!(config.style_defaults(), StyleDefaults::default());

        let config = parse(&[
            "-t", "t.nwk", "-f", "m.txt", "--circ", "--rotate_tree", "--save_png", "--svg",
            "out.svg", "-vv",
        ]);
        assert!(config.circular && config.rotate);
        assert_eq!(config.png, PathBuf::from(DEFAULT_PNG_PATH));
        assert_eq!(config.svg, PathBuf::from("out.svg"));
        assert_eq!(config.verbose, 2);
        assert!(!config.painter().rotate);
    }

    #[test]
    fn style_flags_are_parsed() {
        let config = parse(&[
            "-t",
            "t.nwk",
            "-f",
            "m.txt",
            "--node-shape",
            "square",
            "--node-color",
            "#ff0000",
            "--fallback-color",
            "navy",
            "--leaf-size",
            "4",
        ]);
        let defaults = config.style_defaults();
        assert_eq!(defaults.shape, NodeShape::Square);
        assert_eq!(defaults.fg_color, Rgb::new(255, 0, 0));
        assert_eq!(defaults.fallback_color, Rgb::new(0, 0, 128));
        assert_eq!(defaults.leaf_size, 4.0);
    }

    #[test]
    fn empty_palette_flag_falls_back_to_default_scheme() {
        let config = parse(&["-t", "t.nwk", "-f", "m.txt", "-p", ""]);
        assert_eq!(
            io::load_palette(&config.palette).unwrap(),
            crate::color::Palette::default()
        );
    }

    #[test]
    fn missing_tree_file_is_required() {
        assert!(AppConfig::try_parse_from(["phyloview", "-f", "m.txt"]).is_err());
    }

    #[test]
    fn run_writes_png_and_svg() {
        let dir = tempfile::tempdir().unwrap();
        let tree_file = dir.path().join("tree.nwk");
        let mapping_file = dir.path().join("mapping.txt");
        let palette_file = dir.path().join("palette.txt");
        fs::write(&tree_file, "((PSTVd:0.2,CEVd:0.3):0.1,(ASBVd:0.4,ELVd:0.1):0.2);").unwrap();
        fs::write(
            &mapping_file,
            "PSTVd:Pospiviroidae\nCEVd:Pospiviroidae\nASBVd:Avsunviroidae\nbroken line\n",
        )
        .unwrap();
        fs::write(&palette_file, "Pospiviroidae:#123456\n").unwrap();

        let png = dir.path().join("out.png");
        let svg_path = dir.path().join("out.svg");
        let config = parse(&[
            "-t",
            tree_file.to_str().unwrap(),
            "-f",
            mapping_file.to_str().unwrap(),
            "-p",
            palette_file.to_str().unwrap(),
            "--png",
            png.to_str().unwrap(),
            "--svg",
            svg_path.to_str().unwrap(),
            "--title",
            "Viroids",
            "--fallback-color",
            "#abcdef",
        ]);

        PhyloViewApp::run(&config).unwrap();

        assert!(fs::metadata(&png).unwrap().len() > 0);
        let svg_text = fs::read_to_string(&svg_path).unwrap();
        assert!(svg_text.contains("#123456"));
        // Avsunviroidae is missing from the palette file.
        assert!(svg_text.contains("#abcdef"));
        for name in ["PSTVd", "CEVd", "ASBVd", "ELVd", "Viroids"] {
            assert!(svg_text.contains(name));
        }
    }

    #[test]
    fn run_reports_missing_tree_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = parse(&[
            "-t",
            dir.path().join("nope.nwk").to_str().unwrap(),
            "-f",
            "m.txt",
        ]);
        let err = PhyloViewApp::run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("nope.nwk"));
    }
}
