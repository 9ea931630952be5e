//! Readiness waits: feed live log output to a matcher until it is satisfied
//! or the time budget runs out.

use std::time::{Duration, Instant};

use seawall_common::config::WaitConfig;
use seawall_common::encoding::TextEncoding;
use seawall_common::lines::LineSplitter;

use crate::error::{LogsError, Result};
use crate::matcher::{LineMatcher, Matcher};
use crate::source::{LogSource, SourceEvent};

/// Pulls lines from `source` and feeds them to `matcher` until it is
/// satisfied.
///
/// Each line is decoded with `encoding` and stripped of trailing whitespace
/// before it is fed. A trailing line without a newline is still fed when
/// the source closes. The deadline is checked on every iteration and every
/// pull from the source is bounded by the time remaining, so the call
/// returns promptly once `timeout` has elapsed. A timeout too large to
/// represent as a deadline (such as [`Duration::MAX`]) waits without limit.
///
/// Returns the line that completed the match, or an empty string if the
/// matcher was already satisfied before any line arrived.
///
/// # Errors
///
/// - [`LogsError::MatchTimeout`] if `timeout` elapses first.
/// - [`LogsError::StreamEnded`] if the source closes first.
/// - [`LogsError::Decode`] if a line is invalid in `encoding`.
/// - Any error raised by the source itself.
pub fn wait_for_logs_matching<S, M>(
    mut source: S,
    matcher: &mut M,
    timeout: Duration,
    encoding: TextEncoding,
) -> Result<String>
where
    S: LogSource,
    M: LineMatcher + ?Sized,
{
    let started = Instant::now();
    let deadline = started.checked_add(timeout);
    tracing::info!(%matcher, ?timeout, %encoding, "waiting for logs matching");

    if matcher.is_satisfied() {
        return Ok(String::new());
    }

    let mut splitter = LineSplitter::new(encoding);
    let mut feeder = Feeder {
        matcher,
        lines_seen: 0,
    };

    loop {
        while let Some(line) = splitter.next_line() {
            if let Some(matched) = feeder.feed(line)? {
                tracing::info!(elapsed = ?started.elapsed(), lines = feeder.lines_seen, "logs matched");
                return Ok(matched);
            }
        }

        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            let err = LogsError::MatchTimeout {
                timeout,
                elapsed: now - started,
                matcher: feeder.matcher.to_string(),
                unsatisfied: feeder.matcher.unsatisfied(),
                lines_seen: feeder.lines_seen,
            };
            tracing::warn!(%err, "gave up waiting for logs");
            return Err(err);
        }

        let remaining = deadline.map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(now));
        match source.next_chunk(remaining)? {
            SourceEvent::Data(chunk) => splitter.push(&chunk),
            SourceEvent::Idle => {}
            SourceEvent::Closed => {
                if let Some(line) = splitter.finish() {
                    if let Some(matched) = feeder.feed(line)? {
                        return Ok(matched);
                    }
                }
                let err = LogsError::StreamEnded {
                    elapsed: started.elapsed(),
                    matcher: feeder.matcher.to_string(),
                    unsatisfied: feeder.matcher.unsatisfied(),
                    lines_seen: feeder.lines_seen,
                };
                tracing::warn!(%err, "log stream ended before match");
                return Err(err);
            }
        }
    }
}

/// Same as [`wait_for_logs_matching`], with timeout and encoding taken from
/// `config`.
///
/// # Errors
///
/// See [`wait_for_logs_matching`].
pub fn wait_with_config<S, M>(source: S, matcher: &mut M, config: &WaitConfig) -> Result<String>
where
    S: LogSource,
    M: LineMatcher + ?Sized,
{
    wait_for_logs_matching(source, matcher, config.timeout(), config.encoding)
}

/// Runs [`wait_for_logs_matching`] on the blocking worker pool of the
/// current tokio runtime, so async test code is never blocked by the wait.
///
/// The matcher is handed back alongside the matching line so callers can
/// inspect its final state.
///
/// # Errors
///
/// See [`wait_for_logs_matching`]. Returns [`LogsError::Worker`] if the
/// worker panicked or was cancelled.
pub async fn wait_for_logs_matching_async<S>(
    source: S,
    mut matcher: Matcher,
    timeout: Duration,
    encoding: TextEncoding,
) -> Result<(String, Matcher)>
where
    S: LogSource + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let line = wait_for_logs_matching(source, &mut matcher, timeout, encoding)?;
        Ok((line, matcher))
    })
    .await
    .map_err(|e| LogsError::Worker {
        message: e.to_string(),
    })?
}

struct Feeder<'m, M: ?Sized> {
    matcher: &'m mut M,
    lines_seen: usize,
}

impl<M: LineMatcher + ?Sized> Feeder<'_, M> {
    fn feed(
        &mut self,
        line: std::result::Result<String, seawall_common::error::DecodeError>,
    ) -> Result<Option<String>> {
        let line = line.map_err(|source| LogsError::Decode {
            line_index: self.lines_seen,
            source,
        })?;
        self.lines_seen += 1;
        tracing::trace!(line = %line, "feeding log line");
        Ok(self.matcher.feed(&line).then_some(line))
    }
}
