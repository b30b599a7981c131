//! Incremental record framing
//!
//! Both the provider stream and the session event stream arrive as arbitrary
//! byte chunks. [`RecordBuffer`] keeps the unfinished tail between chunks and
//! yields each complete record exactly once.

/// Carry-over buffer that splits a byte stream on a fixed delimiter
#[derive(Debug, Clone)]
pub struct RecordBuffer {
    buffer: Vec<u8>,
    delimiter: &'static [u8],
}

impl RecordBuffer {
    /// Create a buffer splitting on `delimiter`
    pub fn new(delimiter: &'static str) -> Self {
        debug_assert!(!delimiter.is_empty());
        Self {
            buffer: Vec::new(),
            delimiter: delimiter.as_bytes(),
        }
    }

    /// Newline-delimited records (provider streams)
    pub fn lines() -> Self {
        Self::new("\n")
    }

    /// Blank-line-delimited records (session event streams)
    pub fn events() -> Self {
        Self::new("\n\n")
    }

    /// Append a chunk and return every record it completed.
    ///
    /// Records are decoded only once complete, so a multi-byte character
    /// split across chunks is never mangled.
    pub fn push(&mut self, chunk: impl AsRef<[u8]>) -> Vec<String> {
        self.buffer.extend_from_slice(chunk.as_ref());

        let mut records = Vec::new();
        let mut start = 0;
        while let Some(pos) = find(&self.buffer[start..], self.delimiter) {
            let end = start + pos;
            records.push(String::from_utf8_lossy(&self.buffer[start..end]).into_owned());
            start = end + self.delimiter.len();
        }
        self.buffer.drain(..start);
        records
    }

    /// Flush whatever is left once the source has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.iter().all(|b| b.is_ascii_whitespace()) {
            self.buffer.clear();
            return None;
        }
        let rest = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(rest)
    }

    /// Bytes waiting for a delimiter
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
