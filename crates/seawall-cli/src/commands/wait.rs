//! `seawall wait`: block until log output matches.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, ValueEnum};
use seawall_common::config::{SeawallConfig, WaitConfig};
use seawall_common::encoding::TextEncoding;
use seawall_logs::frame::FramedSource;
use seawall_logs::matcher::{AnyMatcher, Matcher, OrderedLinesMatcher, UnorderedLinesMatcher};
use seawall_logs::source::{LogSource, ReaderSource};
use seawall_logs::wait::wait_with_config;

use crate::output::format_duration;

/// How the patterns combine.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Every pattern must match, in the given order.
    #[default]
    Ordered,
    /// Every pattern must match, in any order.
    Unordered,
    /// Any single pattern is enough.
    Any,
}

/// Arguments for the `wait` command.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Patterns to wait for.
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// Read log output from this file instead of standard input.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Input is a multiplexed attach stream rather than plain text.
    #[arg(long)]
    pub framed: bool,

    /// How the patterns combine.
    #[arg(short, long, value_enum, default_value_t = Mode::Ordered)]
    pub mode: Mode,

    /// Compare whole lines for equality instead of regex search.
    #[arg(short, long)]
    pub literal: bool,

    /// Time budget in seconds. Overrides the configured timeout.
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Encoding of the log output. Overrides the configured encoding.
    #[arg(short, long)]
    pub encoding: Option<TextEncoding>,
}

/// Executes the `wait` command.
///
/// Prints the line that completed the match.
///
/// # Errors
///
/// Returns an error if a pattern is invalid, the input cannot be read, or
/// the wait fails.
pub fn execute(args: WaitArgs, config: &SeawallConfig) -> anyhow::Result<()> {
    let wait_config = effective_config(&args, &config.wait)?;
    let mut matcher = build_matcher(&args.patterns, args.mode, args.literal)?;

    let reader = super::open_input(args.file.as_deref())?;
    let plain = ReaderSource::spawn(reader).context("starting log reader")?;
    let source: Box<dyn LogSource> = if args.framed {
        Box::new(FramedSource::new(plain, wait_config.streams))
    } else {
        Box::new(plain)
    };

    let started = Instant::now();
    let line = wait_with_config(source, &mut matcher, &wait_config)?;
    tracing::info!(elapsed = %format_duration(started.elapsed()), "wait finished");

    #[allow(clippy::print_stdout)]
    {
        println!("{line}");
    }
    Ok(())
}

fn effective_config(args: &WaitArgs, base: &WaitConfig) -> anyhow::Result<WaitConfig> {
    let mut config = base.clone();
    if let Some(secs) = args.timeout {
        let timeout = Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|t| !t.is_zero())
            .with_context(|| format!("invalid timeout: {secs}"))?;
        config.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding;
    }
    Ok(config)
}

fn build_matcher(patterns: &[String], mode: Mode, literal: bool) -> anyhow::Result<Matcher> {
    let mut leaves = patterns
        .iter()
        .map(|p| {
            if literal {
                Ok(Matcher::equals(p.as_str()))
            } else {
                Matcher::regex(p)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    // A lone pattern reads better in diagnostics without a wrapper.
    if mode != Mode::Any && leaves.len() == 1 {
        if let Some(only) = leaves.pop() {
            return Ok(only);
        }
    }
    Ok(match mode {
        Mode::Ordered => OrderedLinesMatcher::new(leaves).into(),
        Mode::Unordered => UnorderedLinesMatcher::new(leaves).into(),
        Mode::Any => AnyMatcher::new(leaves).into(),
    })
}

#[cfg(test)]
mod tests {
    use seawall_logs::matcher::LineMatcher;

    use super::*;

    fn args(timeout: Option<f64>) -> WaitArgs {
        WaitArgs {
            patterns: vec!["ready".into()],
            file: None,
            framed: false,
            mode: Mode::Ordered,
            literal: false,
            timeout,
            encoding: Some(TextEncoding::Latin1),
        }
    }

    #[test]
    fn flags_override_config() {
        let config = effective_config(&args(Some(2.5)), &WaitConfig::default()).unwrap();
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.encoding, TextEncoding::Latin1);
    }

    #[test]
    fn config_timeout_is_kept_without_flag() {
        let base = WaitConfig {
            timeout_ms: 1234,
            ..WaitConfig::default()
        };
        assert_eq!(effective_config(&args(None), &base).unwrap().timeout_ms, 1234);
    }

    #[test]
    fn bad_timeouts_are_rejected() {
        for secs in [0.0, -1.0, f64::NAN] {
            assert!(effective_config(&args(Some(secs)), &WaitConfig::default()).is_err());
        }
    }

    #[test]
    fn modes_build_matching_combinators() {
        let pats = vec!["a".to_string(), "b".to_string()];

        let mut ordered = build_matcher(&pats, Mode::Ordered, true).unwrap();
        assert!(!ordered.feed("b"));
        assert!(!ordered.feed("a"));
        assert!(ordered.feed("b"));

        let mut unordered = build_matcher(&pats, Mode::Unordered, true).unwrap();
        assert!(!unordered.feed("b"));
        assert!(unordered.feed("a"));

        let mut any = build_matcher(&pats, Mode::Any, true).unwrap();
        assert!(any.feed("b"));
    }

    #[test]
    fn single_pattern_is_not_wrapped() {
        let m = build_matcher(&["^up".to_string()], Mode::Ordered, false).unwrap();
        assert_eq!(m.to_string(), "RegexMatcher(\"^up\")");
    }

    #[test]
    fn invalid_regex_is_an_error() {
        assert!(build_matcher(&["(".to_string()], Mode::Ordered, false).is_err());
    }
}
