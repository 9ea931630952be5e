//! Decoder for the multiplexed attach stream of a container.
//!
//! When a container runs without a TTY, the runtime interleaves stdout and
//! stderr on one connection. Each frame starts with an 8-byte header:
//!
//! ```text
//! [stream type: u8][0u8; 3][payload length: u32 big-endian]
//! ```

use std::time::{Duration, Instant};

use seawall_common::constants::FRAME_HEADER_LEN;
use seawall_common::types::{StreamKind, StreamSelection};

use crate::error::{LogsError, Result};
use crate::source::{LogSource, SourceEvent};

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Stream the payload was written to.
    pub stream: StreamKind,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// Incremental frame decoder.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends raw bytes read from the connection.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pops the next complete frame, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`LogsError::MalformedFrame`] if the header names an unknown
    /// stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(header) = self.buf.get(..FRAME_HEADER_LEN) else {
            return Ok(None);
        };
        let stream = StreamKind::from_frame_byte(header[0]).ok_or_else(|| {
            LogsError::MalformedFrame {
                message: format!("unknown stream type {}", header[0]),
            }
        })?;
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let end = FRAME_HEADER_LEN + len;
        if self.buf.len() < end {
            return Ok(None);
        }
        let payload = self.buf[FRAME_HEADER_LEN..end].to_vec();
        drop(self.buf.drain(..end));
        Ok(Some(Frame { stream, payload }))
    }

    /// Checks that the connection ended on a frame boundary.
    ///
    /// # Errors
    ///
    /// Returns [`LogsError::MalformedFrame`] if a partial frame is buffered.
    pub fn finish(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(LogsError::MalformedFrame {
                message: format!("stream ended inside a frame ({} bytes pending)", self.buf.len()),
            })
        }
    }
}

/// Encodes one frame. The inverse of [`FrameDecoder`], used to build test
/// fixtures and to replay captured output.
#[must_use]
pub fn encode_frame(stream: StreamKind, payload: &[u8]) -> Vec<u8> {
    let kind = match stream {
        StreamKind::Stdin => 0u8,
        StreamKind::Stdout => 1,
        StreamKind::Stderr => 2,
    };
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(&[kind, 0, 0, 0]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Adapts a multiplexed source into plain output of the selected streams.
///
/// Each stream is buffered separately and only whole lines are handed out,
/// so an unterminated stdout fragment never merges with stderr output. A
/// fragment still pending when the connection closes is emitted as its own
/// line.
#[derive(Debug)]
pub struct FramedSource<S> {
    inner: S,
    decoder: FrameDecoder,
    streams: StreamSelection,
    // Partial lines for stdout and stderr.
    partial: [Vec<u8>; 2],
    closed: bool,
}

impl<S: LogSource> FramedSource<S> {
    /// Decodes frames from `inner`, keeping payloads from `streams` only.
    pub const fn new(inner: S, streams: StreamSelection) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            streams,
            partial: [Vec::new(), Vec::new()],
            closed: false,
        }
    }

    /// Buffers a frame and returns the complete lines it finished, if any.
    fn accept(&mut self, frame: Frame) -> Option<Vec<u8>> {
        if !self.streams.includes(frame.stream) {
            tracing::trace!(stream = %frame.stream, "skipping unselected frame");
            return None;
        }
        let slot = match frame.stream {
            StreamKind::Stdout => 0,
            StreamKind::Stderr => 1,
            StreamKind::Stdin => return None,
        };
        let pending = &mut self.partial[slot];
        pending.extend_from_slice(&frame.payload);
        let end = pending.iter().rposition(|&b| b == b'\n')? + 1;
        let rest = pending.split_off(end);
        Some(std::mem::replace(pending, rest))
    }

    fn flush_partial(&mut self) -> Option<Vec<u8>> {
        let pending = self.partial.iter_mut().find(|p| !p.is_empty())?;
        let mut line = std::mem::take(pending);
        line.push(b'\n');
        Some(line)
    }
}

impl<S: LogSource> LogSource for FramedSource<S> {
    fn next_chunk(&mut self, timeout: Duration) -> Result<SourceEvent> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            while let Some(frame) = self.decoder.next_frame()? {
                if let Some(lines) = self.accept(frame) {
                    return Ok(SourceEvent::Data(lines));
                }
            }
            if self.closed {
                return Ok(self
                    .flush_partial()
                    .map_or(SourceEvent::Closed, SourceEvent::Data));
            }
            let remaining = deadline.map_or(Duration::MAX, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
            if remaining.is_zero() {
                return Ok(SourceEvent::Idle);
            }
            match self.inner.next_chunk(remaining)? {
                SourceEvent::Data(bytes) => self.decoder.push(&bytes),
                SourceEvent::Idle => return Ok(SourceEvent::Idle),
                SourceEvent::Closed => {
                    self.decoder.finish()?;
                    self.closed = true;
                }
            }
        }
    }
}
