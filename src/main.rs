use clap::Parser;

use phyloview::app::{AppConfig, PhyloViewApp};

fn main() {
    let config = AppConfig::parse();
    phyloview::init_logging(config.verbose);

    if let Err(err) = PhyloViewApp::run(&config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
