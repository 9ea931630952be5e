//! CLI command definitions and dispatch.

pub mod ps_tree;
pub mod wait;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use seawall_common::config::SeawallConfig;

/// seawall: readiness waits and process tree checks for container tests.
#[derive(Parser, Debug)]
#[command(name = seawall_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file. Missing fields take their defaults.
    #[arg(long, global = true, env = "SEAWALL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait until log output matches the given patterns.
    Wait(wait::WaitArgs),
    /// Rebuild and print the process tree from `ps` output.
    PsTree(ps_tree::PsTreeArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the command
/// fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SeawallConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SeawallConfig::default(),
    };
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Command::Wait(args) => wait::execute(args, &config),
        Command::PsTree(args) => ps_tree::execute(args, &config),
    }
}

/// Opens `path` for reading, or standard input when no path is given.
fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn Read + Send>> {
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdin())),
    }
}
