//! Command-line interface for running the example probes.
//!
//! Results are printed as pretty JSON on stdout; logs go to stderr. The
//! vim probe needs a live endpoint and is not wired up here.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use crate::application::ApplicationProbe;
use crate::file::FileProbe;
use crate::probe::Probe;
use crate::simple::SimpleProbe;
use crate::storage::StorageProbe;
use tp_common::account::{self, AccountValues};

/// Exit code for a discovery or validation that reported failure.
const EXIT_FAILED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "tp-probe", version, about = "Run example mediation probes")]
pub struct Cli {
    /// Which probe to run.
    #[arg(long, value_enum, global = true, default_value = "file")]
    pub probe: ProbeKind,

    /// Target identifier. A topology file path for the file probe, an
    /// arbitrary target name for the others.
    #[arg(long, global = true)]
    pub target: Option<String>,

    /// Directory searched for per-target properties files.
    #[arg(long, global = true)]
    pub properties_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    File,
    Simple,
    Storage,
    Application,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the target and print the discovered entity graph.
    Discover,
    /// Check that the target is reachable with the given credentials.
    Validate,
    /// Print the probe's supply-chain templates.
    SupplyChain,
    /// Print the credential fields the probe requires.
    AccountDefinition,
}

impl Cli {
    fn build_probe(&self) -> Box<dyn Probe> {
        match self.probe {
            ProbeKind::File => Box::new(FileProbe::new()),
            ProbeKind::Simple => Box::new(SimpleProbe::new()),
            ProbeKind::Storage => {
                let mut probe = StorageProbe::new();
                if let Some(dir) = &self.properties_dir {
                    probe = probe.with_properties_dir(dir);
                }
                Box::new(probe)
            }
            ProbeKind::Application => {
                let mut probe = ApplicationProbe::new();
                if let Some(dir) = &self.properties_dir {
                    probe = probe.with_properties_dir(dir);
                }
                Box::new(probe)
            }
        }
    }

    fn account_values(&self) -> AccountValues {
        let mut values = AccountValues::new();
        if let Some(target) = &self.target {
            values.insert(account::TARGET_IDENTIFIER.to_owned(), target.clone());
        }
        values
    }
}

/// Run the parsed command, returning the process exit code.
pub fn run(cli: &Cli) -> i32 {
    let probe = cli.build_probe();
    let values = cli.account_values();
    let result = match &cli.command {
        Command::Discover => {
            let response = probe.discover(&values);
            let ok = response.is_ok();
            print_json(&response).map(|()| ok)
        }
        Command::Validate => {
            let response = probe.validate(&values);
            let ok = response.ok;
            print_json(&response).map(|()| ok)
        }
        Command::SupplyChain => print_json(&probe.supply_chain()).map(|()| true),
        Command::AccountDefinition => print_json(&probe.account_definition()).map(|()| true),
    };
    match result {
        Ok(true) => 0,
        Ok(false) => EXIT_FAILED,
        Err(err) => {
            error!(error = %err, "cannot serialize response");
            1
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
