use std::io::{self, Write};

use crate::color::FamilyColors;
use crate::tree::{Tree, TreeBundle};

/// What `render_preview` reports about a styled tree.
pub struct PreviewSummary<'a> {
    pub bundle: &'a TreeBundle,
    pub tree: &'a Tree,
    pub family_colors: &'a FamilyColors,
    pub colored_leaves: usize,
}

/// Print a short textual summary of the tree about to be rendered.
pub fn render_preview(summary: &PreviewSummary<'_>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_preview(&mut out, summary)?;
    out.flush()
}

pub fn write_preview<W: Write>(out: &mut W, summary: &PreviewSummary<'_>) -> io::Result<()> {
    let PreviewSummary {
        bundle,
        tree,
        family_colors,
        colored_leaves,
    } = *summary;

    writeln!(
        out,
        "Loaded {:?} file with {} tree(s).",
        bundle.format,
        bundle.trees.len()
    )?;

    match &tree.label {
        Some(label) => writeln!(out, "Rendering {} ({} leaves).", label, tree.leaf_count())?,
        None => writeln!(
            out,
            "Rendering tree #{} ({} leaves).",
            tree.id + 1,
            tree.leaf_count()
        )?,
    }

    if family_colors.is_empty() {
        writeln!(out, "No families mapped.")?;
    } else {
        writeln!(out, "Families:")?;
        let width = family_colors.keys().map(|name| name.len()).max().unwrap_or(0);
        for (family, color) in family_colors {
            writeln!(out, "  {family:<width$}  {}", color.to_hex())?;
        }
    }

    let uncolored = tree.leaf_count().saturating_sub(colored_leaves);
    writeln!(
        out,
        "{colored_leaves} leaf/leaves colored, {uncolored} left uncolored."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::tree::{tree_from_newick, TreeFileFormat};

    #[test]
    fn preview_lists_families_and_counts() {
        let tree = tree_from_newick("((A:1,B:1):1,C:1);");
        let bundle = TreeBundle::new(TreeFileFormat::Newick, vec![tree.clone()]);
        let family_colors: FamilyColors = [
            ("Pospiviroidae".to_string(), Rgb::new(0xa1, 0xc9, 0xf4)),
            ("Avsunviroidae".to_string(), Rgb::new(0xff, 0xb4, 0x82)),
        ]
        .into_iter()
        .collect();

        let mut out = Vec::new();
        write_preview(
            &mut out,
            &PreviewSummary {
                bundle: &bundle,
                tree: &tree,
                family_colors: &family_colors,
                colored_leaves: 2,
            },
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Loaded Newick file with 1 tree(s)."));
        assert!(text.contains("tree #1 (3 leaves)"));
        assert!(text.contains("  Avsunviroidae  #ffb482"));
        assert!(text.contains("  Pospiviroidae  #a1c9f4"));
        assert!(text.contains("2 leaf/leaves colored, 1 left uncolored."));
    }

    #[test]
    fn preview_without_families() {
        let tree = tree_from_newick("(A,B);");
        let bundle = TreeBundle::new(TreeFileFormat::Newick, vec![tree.clone()]);
        let family_colors = FamilyColors::new();

        let mut out = Vec::new();
        write_preview(
            &mut out,
            &PreviewSummary {
                bundle: &bundle,
                tree: &tree,
                family_colors: &family_colors,
                colored_leaves: 0,
            },
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No families mapped."));
        assert!(text.contains("0 leaf/leaves colored, 2 left uncolored."));
    }
}
