//! FASTA header cleanup: headers are cut at the first comma and their spaces
//! replaced with underscores. Sequence lines pass through untouched.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};

const HEADER_PREFIX: char = '>';

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    pub headers: usize,
    pub passed_through: usize,
}

/// Normalize one header line. The line ending, if any, is dropped.
pub fn normalize_header_line(line: &str) -> String {
    let kept = match line.split_once(',') {
        Some((head, _)) => head,
        None => line,
    };
    kept.trim().replace(' ', "_")
}

/// Stream `reader` into `writer`, rewriting header lines.
pub fn normalize_headers<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
) -> Result<NormalizeStats> {
    let mut stats = NormalizeStats::default();
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .context("failed to read FASTA input")?;
        if read == 0 {
            break;
        }

        if line.starts_with(HEADER_PREFIX) {
            let header = normalize_header_line(&line);
            debug!("header {:?} -> {header:?}", line.trim_end());
            writeln!(writer, "{header}")?;
            stats.headers += 1;
        } else {
            writer.write_all(line.as_bytes())?;
            stats.passed_through += 1;
        }
    }

    writer.flush().context("failed to flush FASTA output")?;
    Ok(stats)
}

/// Normalize the headers of `input` into a new file at `output`.
pub fn normalize_file(input: &Path, output: &Path) -> Result<NormalizeStats> {
    let reader = File::open(input)
        .map(BufReader::new)
        .with_context(|| format!("failed to open FASTA file: {}", input.display()))?;
    let writer = File::create(output)
        .map(BufWriter::new)
        .with_context(|| format!("failed to create output file: {}", output.display()))?;

    let stats = normalize_headers(reader, writer)
        .with_context(|| format!("failed to normalize {}", input.display()))?;

    info!(
        "{}: rewrote {} header(s), passed through {} line(s) -> {}",
        input.display(),
        stats.headers,
        stats.passed_through,
        output.display()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn normalize(input: &str) -> (String, NormalizeStats) {
        let mut out = Vec::new();
        let stats = normalize_headers(Cursor::new(input), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn header_is_cut_and_underscored() {
        let (out, stats) = normalize(">seq1 desc, extra stuff\nACGT\n");
        assert_eq!(out, ">seq1_desc\nACGT\n");
        assert_eq!(
            stats,
            NormalizeStats {
                headers: 1,
                passed_through: 1
            }
        );
    }

    #[test]
    fn sequence_lines_are_untouched() {
        let input = "no header, here it is\r\nAC GT,\n";
        let (out, stats) = normalize(input);
        assert_eq!(out, input);
        assert_eq!(stats.headers, 0);
        assert_eq!(stats.passed_through, 2);
    }

    #[test]
    fn header_line_endings_become_lf() {
        let (out, _) = normalize(">a b \r\nAC\r\n>c");
        assert_eq!(out, ">a_b\nAC\r\n>c\n");
    }

    #[test]
    fn last_line_without_newline_is_kept_as_is() {
        let (out, _) = normalize(">x\nACGT");
        assert_eq!(out, ">x\nACGT");
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let (once, _) = normalize(">sp|P1| some protein, OS=Homo\nMKV\n>  two  words \nAA\n");
        let (twice, _) = normalize(&once);
        assert_eq!(once, twice);
        assert_eq!(once, ">sp|P1|_some_protein\nMKV\n>__two__words\nAA\n");
    }

    #[test]
    fn header_line_helper() {
        assert_eq!(normalize_header_line(">a,b,c"), ">a");
        assert_eq!(normalize_header_line(">plain\n"), ">plain");
        assert_eq!(normalize_header_line(">"), ">");
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fasta");
        let output = dir.path().join("out.fasta");
        std::fs::write(&input, ">r1 x, y\nAAA\n>r2\nCCC\n").unwrap();

        let stats = normalize_file(&input, &output).unwrap();
        assert_eq!(stats.headers, 2);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            ">r1_x\nAAA\n>r2\nCCC\n"
        );
    }

    #[test]
    fn missing_input_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.fasta");
        let err = normalize_file(&missing, &dir.path().join("out.fasta")).unwrap_err();
        assert!(format!("{err:#}").contains("missing.fasta"));
    }
}
