//! `seawall ps-tree`: rebuild a process tree from `ps` output.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use seawall_common::config::{PsConfig, SeawallConfig};
use seawall_common::encoding::TextEncoding;
use seawall_ps::row::{list_processes, ps_command};
use seawall_ps::tree::build_process_tree;

use crate::output::render_tree;

/// Arguments for the `ps-tree` command.
#[derive(Args, Debug)]
pub struct PsTreeArgs {
    /// Read `ps` output from this file instead of standard input.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Encoding of the `ps` output. Overrides the configured encoding.
    #[arg(short, long)]
    pub encoding: Option<TextEncoding>,

    /// Print the tree as JSON.
    #[arg(long)]
    pub json: bool,

    /// Keep the row for the `ps` invocation itself.
    #[arg(long)]
    pub keep_self: bool,
}

/// Executes the `ps-tree` command.
///
/// The input is expected to come from running the command printed by
/// `ps_command` inside the container.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, or does not form
/// a single rooted tree.
pub fn execute(args: PsTreeArgs, config: &SeawallConfig) -> anyhow::Result<()> {
    let ps_config = effective_config(&args, &config.ps);

    let mut raw = Vec::new();
    let _ = super::open_input(args.file.as_deref())?
        .read_to_end(&mut raw)
        .context("reading ps output")?;
    tracing::debug!(bytes = raw.len(), command = %ps_command().join(" "), "read ps output");

    let rows = list_processes(&raw, &ps_config)?;
    let tree = build_process_tree(&rows)?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&tree)?
    } else {
        format!("{}{} processes", render_tree(&tree), tree.count())
    };
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

fn effective_config(args: &PsTreeArgs, base: &PsConfig) -> PsConfig {
    let mut config = base.clone();
    if args.keep_self {
        config.exclude_self = false;
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = PsTreeArgs {
            file: None,
            encoding: Some(TextEncoding::Ascii),
            json: false,
            keep_self: true,
        };
        let config = effective_config(&args, &PsConfig::default());
        assert!(!config.exclude_self);
        assert_eq!(config.encoding, TextEncoding::Ascii);
    }

    #[test]
    fn defaults_come_from_config() {
        let args = PsTreeArgs {
            file: None,
            encoding: None,
            json: true,
            keep_self: false,
        };
        assert_eq!(effective_config(&args, &PsConfig::default()), PsConfig::default());
    }
}
