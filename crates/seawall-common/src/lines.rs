//! Splitting raw byte output into decoded lines.
//!
//! Container output arrives in arbitrary chunks, so a line may straddle
//! several reads. [`LineSplitter`] buffers partial lines until their
//! terminating newline arrives.

use crate::encoding::TextEncoding;
use crate::error::DecodeError;

/// Incremental splitter turning byte chunks into decoded lines.
///
/// Lines are split on `\n`, decoded with the configured encoding, and
/// stripped of trailing whitespace (which also removes a `\r` left over from
/// CRLF output).
#[derive(Debug, Clone)]
pub struct LineSplitter {
    encoding: TextEncoding,
    buf: Vec<u8>,
    // Bytes before `start` have already been returned as lines.
    start: usize,
    // Bytes before `scanned` are known to hold no newline past `start`.
    scanned: usize,
}

impl LineSplitter {
    /// Creates an empty splitter decoding with `encoding`.
    #[must_use]
    pub const fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            buf: Vec::new(),
            start: 0,
            scanned: 0,
        }
    }

    /// Appends a raw chunk to the pending buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            drop(self.buf.drain(..self.start));
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Pops the next complete line, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the line's bytes are invalid in the
    /// configured encoding. The offending line is consumed.
    pub fn next_line(&mut self) -> Option<Result<String, DecodeError>> {
        let from = self.scanned.max(self.start);
        let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buf.len();
            return None;
        };
        let (begin, end) = (self.start, from + offset);
        self.start = end + 1;
        self.scanned = self.start;
        Some(self.decode(&self.buf[begin..end]))
    }

    /// Flushes a trailing line that never received its newline.
    ///
    /// Returns `None` when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the pending bytes cannot be decoded.
    pub fn finish(&mut self) -> Option<Result<String, DecodeError>> {
        if self.pending() == 0 {
            return None;
        }
        let mut rest = std::mem::take(&mut self.buf);
        drop(rest.drain(..self.start));
        self.start = 0;
        self.scanned = 0;
        Some(self.decode(&rest))
    }

    /// Number of buffered bytes not yet returned as a line.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len() - self.start
    }

    fn decode(&self, raw: &[u8]) -> Result<String, DecodeError> {
        let mut line = self.encoding.decode(raw)?;
        line.truncate(line.trim_end().len());
        Ok(line)
    }
}

/// Decodes a complete command output and splits it into lines.
///
/// # Errors
///
/// Returns a [`DecodeError`] if `raw` is invalid in `encoding`.
pub fn output_lines(raw: &[u8], encoding: TextEncoding) -> Result<Vec<String>, DecodeError> {
    Ok(encoding.decode(raw)?.lines().map(str::to_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(splitter: &mut LineSplitter) -> Vec<String> {
        std::iter::from_fn(|| splitter.next_line())
            .map(|r| r.expect("decodes"))
            .collect()
    }

    #[test]
    fn splits_complete_lines() {
        let mut s = LineSplitter::new(TextEncoding::Utf8);
        s.push(b"hello\ngoodbye\n");
        assert_eq!(drain(&mut s), vec!["hello", "goodbye"]);
        assert_eq!(s.pending(), 0);
        assert!(s.finish().is_none());
    }

    #[test]
    fn joins_lines_across_chunks() {
        let mut s = LineSplitter::new(TextEncoding::Utf8);
        s.push(b"hel");
        assert!(s.next_line().is_none());
        s.push(b"lo\nwor");
        assert_eq!(drain(&mut s), vec!["hello"]);
        assert_eq!(s.pending(), 3);
        assert_eq!(s.finish().unwrap().unwrap(), "wor");
    }

    #[test]
    fn strips_trailing_whitespace_and_carriage_returns() {
        let mut s = LineSplitter::new(TextEncoding::Utf8);
        s.push(b"  ready  \r\n\n");
        assert_eq!(drain(&mut s), vec!["  ready", ""]);
    }

    #[test]
    fn multibyte_character_split_between_chunks() {
        let mut s = LineSplitter::new(TextEncoding::Utf8);
        s.push(b"\xc3");
        s.push(b"\xbeorn\n");
        assert_eq!(drain(&mut s), vec!["\u{fe}orn"]);
    }

    #[test]
    fn invalid_line_is_reported_and_consumed() {
        let mut s = LineSplitter::new(TextEncoding::Utf8);
        s.push(b"\xfeorn\nnext\n");
        let err = s.next_line().unwrap().unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(drain(&mut s), vec!["next"]);
    }

    #[test]
    fn many_lines_in_one_chunk_split_in_order() {
        let mut s = LineSplitter::new(TextEncoding::Utf8);
        let history: String = (0..10_000).map(|i| format!("Log entry {i}\n")).collect();
        s.push(history.as_bytes());
        s.push(b"tail");
        let lines = drain(&mut s);
        assert_eq!(lines.len(), 10_000);
        assert_eq!(lines[0], "Log entry 0");
        assert_eq!(lines[9_999], "Log entry 9999");
        assert_eq!(s.pending(), 4);
        s.push(b" end\n");
        assert_eq!(drain(&mut s), vec!["tail end"]);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn output_lines_decodes_and_splits() {
        let lines = output_lines(b"PID PPID\r\n1 0\n", TextEncoding::Utf8).unwrap();
        assert_eq!(lines, vec!["PID PPID", "1 0"]);
        assert!(output_lines(b"\xff", TextEncoding::Ascii).is_err());
    }
}
