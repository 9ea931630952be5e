//! Log sources the readiness wait pulls raw output from.
//!
//! A source hands out byte chunks that need not be aligned to line
//! boundaries. Every source honors the timeout passed to
//! [`LogSource::next_chunk`] so that the caller's deadline stays authoritative.

use std::collections::VecDeque;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use seawall_common::constants::READ_CHUNK_SIZE;

use crate::error::Result;

/// Outcome of one pull from a [`LogSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A chunk of raw output.
    Data(Vec<u8>),
    /// Nothing arrived within the timeout; the source is still open.
    Idle,
    /// The source has ended and will produce nothing more.
    Closed,
}

/// A producer of raw log output.
pub trait LogSource {
    /// Blocks for at most `timeout` waiting for the next chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying producer fails.
    fn next_chunk(&mut self, timeout: Duration) -> Result<SourceEvent>;
}

impl<S: LogSource + ?Sized> LogSource for &mut S {
    fn next_chunk(&mut self, timeout: Duration) -> Result<SourceEvent> {
        (**self).next_chunk(timeout)
    }
}

impl<S: LogSource + ?Sized> LogSource for Box<S> {
    fn next_chunk(&mut self, timeout: Duration) -> Result<SourceEvent> {
        (**self).next_chunk(timeout)
    }
}

/// Pre-collected chunks, closed once they are exhausted.
#[derive(Debug, Clone, Default)]
pub struct ChunkSource {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkSource {
    /// Creates a source yielding `chunks` in order.
    #[must_use]
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }
}

impl LogSource for ChunkSource {
    fn next_chunk(&mut self, _timeout: Duration) -> Result<SourceEvent> {
        Ok(self
            .chunks
            .pop_front()
            .map_or(SourceEvent::Closed, SourceEvent::Data))
    }
}

/// Chunks delivered over a channel by another thread.
///
/// The source closes when every sender has been dropped.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
}

impl ChannelSource {
    /// Wraps an existing receiver.
    #[must_use]
    pub const fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }

    /// Creates a connected sender and source.
    #[must_use]
    pub fn channel() -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl LogSource for ChannelSource {
    fn next_chunk(&mut self, timeout: Duration) -> Result<SourceEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => Ok(SourceEvent::Data(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(SourceEvent::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(SourceEvent::Closed),
        }
    }
}

/// Output of a blocking reader, pumped through a background thread so that
/// waits on it still respect their deadline.
///
/// The reader thread is detached. If the wait finishes first, the thread
/// exits on its next read once it notices the source has been dropped.
#[derive(Debug)]
pub struct ReaderSource {
    rx: Receiver<std::io::Result<Vec<u8>>>,
}

impl ReaderSource {
    /// Starts pumping `reader` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<R>(reader: R) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let _handle = std::thread::Builder::new()
            .name("seawall-log-reader".into())
            .spawn(move || pump(reader, &tx))?;
        Ok(Self { rx })
    }
}

fn pump<R: Read>(mut reader: R, tx: &Sender<std::io::Result<Vec<u8>>>) {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let msg = match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };
        let failed = msg.is_err();
        if tx.send(msg).is_err() || failed {
            return;
        }
    }
}

impl LogSource for ReaderSource {
    fn next_chunk(&mut self, timeout: Duration) -> Result<SourceEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => Ok(SourceEvent::Data(chunk?)),
            Err(RecvTimeoutError::Timeout) => Ok(SourceEvent::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(SourceEvent::Closed),
        }
    }
}

/// Replays previously collected output before continuing with a live source.
///
/// Useful when a container has already logged part of its startup before
/// the wait begins.
#[derive(Debug)]
pub struct HistorySource<S> {
    history: Option<Vec<u8>>,
    live: S,
}

impl<S: LogSource> HistorySource<S> {
    /// Yields `history` first, then whatever `live` produces.
    pub fn new(history: Vec<u8>, live: S) -> Self {
        Self {
            history: Some(history).filter(|h| !h.is_empty()),
            live,
        }
    }
}

impl<S: LogSource> LogSource for HistorySource<S> {
    fn next_chunk(&mut self, timeout: Duration) -> Result<SourceEvent> {
        match self.history.take() {
            Some(history) => Ok(SourceEvent::Data(history)),
            None => self.live.next_chunk(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    const TICK: Duration = Duration::from_millis(20);

    #[test]
    fn chunk_source_yields_then_closes() {
        let mut src = ChunkSource::new([b"a\n".to_vec(), b"b\n".to_vec()]);
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Data(b"a\n".to_vec()));
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Data(b"b\n".to_vec()));
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn channel_source_reports_idle_then_closed() {
        let (tx, mut src) = ChannelSource::channel();
        let started = Instant::now();
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Idle);
        assert!(started.elapsed() >= TICK);

        tx.send(b"x".to_vec()).unwrap();
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Data(b"x".to_vec()));
        drop(tx);
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn reader_source_pumps_until_eof() {
        let mut src = ReaderSource::spawn(std::io::Cursor::new(b"line one\n".to_vec())).unwrap();
        let mut collected = Vec::new();
        loop {
            match src.next_chunk(Duration::from_secs(1)).unwrap() {
                SourceEvent::Data(chunk) => collected.extend(chunk),
                SourceEvent::Idle => {}
                SourceEvent::Closed => break,
            }
        }
        assert_eq!(collected, b"line one\n");
    }

    #[test]
    fn reader_errors_are_surfaced() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("boom"))
            }
        }

        let mut src = ReaderSource::spawn(Broken).unwrap();
        let err = src.next_chunk(Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("boom"), "got: {err}");
    }

    #[test]
    fn history_precedes_live_output() {
        let live = ChunkSource::new([b"new\n".to_vec()]);
        let mut src = HistorySource::new(b"old\n".to_vec(), live);
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Data(b"old\n".to_vec()));
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Data(b"new\n".to_vec()));
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn empty_history_is_skipped() {
        let mut src = HistorySource::new(Vec::new(), ChunkSource::default());
        assert_eq!(src.next_chunk(TICK).unwrap(), SourceEvent::Closed);
    }
}
