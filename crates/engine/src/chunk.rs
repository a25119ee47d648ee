//! Chunk assembler — frames arbitrary text/byte chunks into complete lines.
//!
//! Pipe reads and file polls hand over chunks that can end anywhere: mid-line,
//! between `\r` and `\n`, or inside a multi-byte UTF-8 character. Bytes are
//! buffered until a `\n` arrives, and only complete lines are decoded, so the
//! produced line sequence does not depend on where the chunk boundaries fall.

use bytes::BytesMut;

/// Buffers at most one partial line across calls.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    pending: BytesMut,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text chunk and return every line it completed.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.feed_bytes(chunk.as_bytes())
    }

    /// Append a raw byte chunk and return every line it completed.
    ///
    /// `\n` and `\r\n` both terminate a line; the terminator is not part of
    /// the returned line.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut scanned = self.pending.len();
        self.pending.extend_from_slice(chunk);

        while let Some(offset) = self.pending[scanned..].iter().position(|&b| b == b'\n') {
            let end = scanned + offset;
            let mut line = self.pending.split_to(end + 1);
            line.truncate(end);
            if line.last() == Some(&b'\r') {
                line.truncate(end - 1);
            }
            lines.push(decode(&line));
            scanned = 0;
        }

        lines
    }

    /// Emit the retained partial line, if any, as a final line.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        Some(decode(&rest))
    }

    /// Bytes currently held back waiting for a terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut assembler = ChunkAssembler::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(assembler.feed_bytes(chunk));
        }
        out.extend(assembler.flush());
        out
    }

    #[test]
    fn test_complete_lines() {
        let mut assembler = ChunkAssembler::new();
        let lines = assembler.feed("one\ntwo\n");
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(assembler.pending_len(), 0);
        assert!(assembler.flush().is_none());
    }

    #[test]
    fn test_partial_line_retained() {
        let mut assembler = ChunkAssembler::new();
        assert_eq!(assembler.feed("java.lang.Runtime"), Vec::<String>::new());
        assert_eq!(assembler.feed("Exception: boom\n    at"), vec!["java.lang.RuntimeException: boom"]);
        assert_eq!(assembler.flush().as_deref(), Some("    at"));
        assert!(assembler.flush().is_none());
    }

    #[test]
    fn test_crlf_terminators() {
        let mut assembler = ChunkAssembler::new();
        assert_eq!(assembler.feed("a\r\nb\nc\r\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        assert_eq!(feed_all(&[b"a\r", b"\nb"]), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_lines_preserved() {
        let mut assembler = ChunkAssembler::new();
        assert_eq!(assembler.feed("\n\nx\n"), vec!["", "", "x"]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let text = "에러 발생\n".as_bytes();
        let (head, tail) = text.split_at(2);
        assert_eq!(feed_all(&[head, tail]), vec!["에러 발생"]);
    }

    #[test]
    fn test_boundary_invariance_every_split() {
        let text = "2026-02-05 ERROR boom\r\njava.lang.IllegalStateException: x\n\tat com.example.A.b(A.java:1)\r\nCaused by: a.B: c\ntrailing";
        let whole = feed_all(&[text.as_bytes()]);

        for i in 0..=text.len() {
            for j in i..=text.len() {
                let bytes = text.as_bytes();
                let split = feed_all(&[&bytes[..i], &bytes[i..j], &bytes[j..]]);
                assert_eq!(split, whole, "split at {} / {}", i, j);
            }
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let text = "x\r\ny\nz";
        let chunks: Vec<&[u8]> = text.as_bytes().chunks(1).collect();
        assert_eq!(feed_all(&chunks), vec!["x", "y", "z"]);
    }
}
