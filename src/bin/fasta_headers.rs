use std::path::PathBuf;

use clap::Parser;

use phyloview::fasta;

#[derive(Debug, Parser)]
#[command(
    name = "fasta-headers",
    version,
    about = "Cut FASTA headers at the first comma and replace spaces with underscores."
)]
struct FastaConfig {
    /// FASTA file to read.
    #[arg(short, long, alias = "input_file", value_name = "INPUT")]
    input_file: PathBuf,

    /// Where to write the normalized FASTA.
    #[arg(short, long, alias = "output_file", value_name = "OUTPUT")]
    output_file: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let config = FastaConfig::parse();
    phyloview::init_logging(config.verbose);

    if let Err(err) = fasta::normalize_file(&config.input_file, &config.output_file) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
