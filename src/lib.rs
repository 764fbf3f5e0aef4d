//! Phylogenetics glue: render trees with leaves colored by category, and
//! normalize FASTA headers.

pub mod app;
pub mod color;
pub mod export;
pub mod fasta;
pub mod io;
pub mod tree;
pub mod ui;

use log::LevelFilter;

/// Install the `env_logger` backend. `RUST_LOG` wins over the verbosity count.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let _ = env_logger::builder()
        .format_timestamp(None)
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
