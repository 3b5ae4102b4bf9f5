use clap::Parser;
use tracing_subscriber::EnvFilter;

use tp_probe::cli::{self, Cli};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Cli::parse();
    std::process::exit(cli::run(&args));
}
