use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use phylotree::tree::Tree as PhyloTree;

use crate::color::Palette;
use crate::tree::{Tree, TreeBundle, TreeFileFormat};

/// Leaf name to family name.
pub type Mapping = BTreeMap<String, String>;

/// Extension that marks a palette argument as a file rather than a scheme name.
pub const PALETTE_FILE_EXTENSION: &str = "txt";

pub fn load_trees(path: &Path) -> Result<TreeBundle> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file: {}", path.display()))?;

    let format = detect_format(&raw);
    let trees = match format {
        TreeFileFormat::Newick => parse_newick(&raw)?,
        TreeFileFormat::Nexus => parse_nexus(&raw)?,
    };

    if trees.is_empty() {
        bail!("tree file did not contain any trees: {}", path.display());
    }

    Ok(TreeBundle::new(format, trees))
}

fn detect_format(raw: &str) -> TreeFileFormat {
    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        // Skip pure comment lines
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            continue;
        }

        if trimmed.to_ascii_uppercase().starts_with("#NEXUS") {
            return TreeFileFormat::Nexus;
        }

        if trimmed.starts_with('(') || trimmed.contains('(') && trimmed.contains(')') {
            return TreeFileFormat::Newick;
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("BEGIN ") || upper.starts_with("TREE ") {
            return TreeFileFormat::Nexus;
        }
    }

    TreeFileFormat::Newick
}

fn parse_newick(raw: &str) -> Result<Vec<Tree>> {
    let mut trees = Vec::new();

    for chunk in strip_comments(raw).split_inclusive(';') {
        let candidate = chunk.trim();
        if candidate.is_empty() || !candidate.ends_with(';') {
            continue;
        }

        let index = trees.len();
        trees.push(build_tree(index, None, normalise_newick(candidate))?);
    }

    Ok(trees)
}

fn parse_nexus(raw: &str) -> Result<Vec<Tree>> {
    let mut trees = Vec::new();
    let mut in_trees_block = false;
    let mut current_tree_lines: Vec<String> = Vec::new();

    let without_comments = strip_comments(raw);
    for line in without_comments.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let upper_line = line.to_ascii_uppercase();

        if upper_line.starts_with("BEGIN TREES") {
            in_trees_block = true;
            continue;
        }

        if upper_line.starts_with("END") {
            in_trees_block = false;
            flush_tree_lines(&mut current_tree_lines, &mut trees);
            continue;
        }

        if !in_trees_block {
            continue;
        }

        // TRANSLATE tables are not resolved; leaves keep their raw tokens.
        if upper_line.starts_with("TRANSLATE") {
            continue;
        }

        if upper_line.starts_with("TREE ") || upper_line.starts_with("UTREE ") {
            flush_tree_lines(&mut current_tree_lines, &mut trees);
            current_tree_lines.push(line.to_owned());
        } else if !current_tree_lines.is_empty() {
            current_tree_lines.push(line.to_owned());
        } else {
            continue;
        }

        if line.ends_with(';') {
            flush_tree_lines(&mut current_tree_lines, &mut trees);
        }
    }

    flush_tree_lines(&mut current_tree_lines, &mut trees);

    Ok(trees)
}

fn flush_tree_lines(lines: &mut Vec<String>, trees: &mut Vec<Tree>) {
    if lines.is_empty() {
        return;
    }
    let full_tree_line = lines.join(" ");
    lines.clear();
    match parse_nexus_tree_line(&full_tree_line)
        .and_then(|(label, newick)| build_tree(trees.len(), label, newick))
    {
        Ok(tree) => trees.push(tree),
        Err(err) => debug!("skipping nexus tree: {err:#}"),
    }
}

fn build_tree(index: usize, label: Option<String>, newick: String) -> Result<Tree> {
    let phylo = PhyloTree::from_newick(&newick)
        .map_err(|err| anyhow!("failed to parse newick tree: {err}"))?;

    Ok(Tree::new(index, label, newick, &phylo))
}

fn parse_nexus_tree_line(line: &str) -> Result<(Option<String>, String)> {
    let lower = line.to_ascii_lowercase();
    let tree_start = if lower.starts_with("tree ") {
        5
    } else if lower.starts_with("utree ") {
        6
    } else {
        return Err(anyhow!("invalid tree line: {line}"));
    };

    let tree_def = line[tree_start..].trim();

    let mut parts = tree_def.splitn(2, '=');
    let label_part = parts
        .next()
        .ok_or_else(|| anyhow!("missing tree identifier in nexus line: {line}"))?;
    let tree_part = parts
        .next()
        .ok_or_else(|| anyhow!("missing tree definition in nexus line: {line}"))?;

    // Labels may be quoted and may carry a leading asterisk for the default tree.
    let cleaned_label = label_part.trim().trim_start_matches('*').trim();
    let label = if cleaned_label.is_empty() {
        None
    } else {
        Some(
            cleaned_label
                .trim_matches('"')
                .trim_matches('\'')
                .to_owned(),
        )
    };

    Ok((label, normalise_newick(tree_part)))
}

/// Remove `[...]` comments, including FigTree/BEAST `[&...]` annotations.
fn strip_comments(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => cleaned.push(ch),
            _ => {}
        }
    }
    cleaned
}

fn normalise_newick(raw: &str) -> String {
    let mut cleaned = raw.trim().trim_end_matches(';').trim().to_owned();
    cleaned.push(';');
    cleaned
}

/// Load a `leaf:family` mapping file.
pub fn load_mapping(path: &Path) -> Result<Mapping> {
    let file = File::open(path)
        .with_context(|| format!("failed to open mapping file: {}", path.display()))?;
    parse_mapping(BufReader::new(file))
        .with_context(|| format!("failed to read mapping file: {}", path.display()))
}

/// Parse `key:value` lines.
///
/// Lines that do not split into exactly two fields on `:` are skipped. The
/// value is trimmed, the key is kept as written. Later keys overwrite earlier.
pub fn parse_mapping<R: BufRead>(reader: R) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let parts: Vec<&str> = line.trim().split(':').collect();
        if let [key, value] = parts.as_slice() {
            mapping.insert((*key).to_owned(), value.trim().to_owned());
        } else {
            debug!("mapping line {} skipped: {:?}", index + 1, line);
        }
    }
    Ok(mapping)
}

/// Sorted, duplicate-free family names used by `mapping`.
pub fn families(mapping: &Mapping) -> Vec<String> {
    mapping
        .values()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Interpret the palette argument: a `.txt` path is read as a palette file,
/// an empty value means the default scheme, anything else is a scheme name
/// resolved later.
pub fn load_palette(palette: &str) -> Result<Palette> {
    if palette.trim().is_empty() {
        return Ok(Palette::default());
    }

    let path = Path::new(palette);
    let is_file = path
        .extension()
        .is_some_and(|ext| ext == PALETTE_FILE_EXTENSION);
    if !is_file {
        return Ok(Palette::Scheme(palette.to_owned()));
    }

    let file = File::open(path)
        .with_context(|| format!("failed to open palette file: {}", path.display()))?;
    let specs = parse_palette(BufReader::new(file))
        .with_context(|| format!("invalid palette file: {}", path.display()))?;
    Ok(Palette::Explicit(specs))
}

/// Parse `family:color` lines. Every non-blank line must have exactly one colon.
/// Blank lines are skipped rather than rejected.
pub fn parse_palette<R: BufRead>(reader: R) -> Result<BTreeMap<String, String>> {
    let mut specs = BTreeMap::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let [key, value] = parts.as_slice() else {
            bail!(
                "line {}: expected `family:color`, found {:?}",
                index + 1,
                trimmed
            );
        };
        specs.insert(key.trim().to_owned(), value.trim().to_owned());
    }
    Ok(specs)
}
