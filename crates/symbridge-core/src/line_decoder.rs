use std::fmt;

/// Longest partial line kept while waiting for a terminator.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024;

/// Something discarded while decoding. Never fatal; the caller logs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssue {
    /// Invalid UTF-8 bytes dropped from an otherwise usable line.
    InvalidUtf8 { dropped: usize },
    /// A partial line grew past the limit without a terminator and was discarded.
    Oversized { size: usize, max: usize },
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeIssue::InvalidUtf8 { dropped } => {
                write!(f, "dropped {dropped} invalid utf-8 byte(s)")
            }
            DecodeIssue::Oversized { size, max } => {
                write!(f, "line exceeds max size without terminator: {size} > {max}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub lines: Vec<String>,
    pub issues: Vec<DecodeIssue>,
}

/// Splits a byte stream into trimmed, non-empty text lines.
pub struct LineDecoder {
    max_line_bytes: usize,
    pending: Vec<u8>,
    discarding: bool,
}

impl LineDecoder {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            pending: Vec::new(),
            discarding: false,
        }
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) -> DecodeReport {
        let mut report = DecodeReport::default();
        let mut chunk = chunk;
        if self.discarding {
            // The rest of an oversized line is dropped through its terminator.
            match chunk.iter().position(|byte| *byte == b'\n') {
                Some(newline_idx) => {
                    self.discarding = false;
                    chunk = &chunk[newline_idx + 1..];
                }
                None => return report,
            }
        }
        if !chunk.is_empty() {
            self.pending.extend_from_slice(chunk);
        }

        while let Some(newline_idx) = self.pending.iter().position(|byte| *byte == b'\n') {
            let raw = self.pending.drain(..=newline_idx).collect::<Vec<u8>>();
            let (text, dropped) = decode_lenient(&raw);
            if dropped > 0 {
                report.issues.push(DecodeIssue::InvalidUtf8 { dropped });
            }
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            report.lines.push(trimmed.to_string());
        }

        if self.pending.len() > self.max_line_bytes {
            report.issues.push(DecodeIssue::Oversized {
                size: self.pending.len(),
                max: self.max_line_bytes,
            });
            self.pending.clear();
            self.discarding = true;
        }

        report
    }

    /// Drops any partial line. Called whenever a new connection starts.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

/// Decodes UTF-8, skipping invalid sequences. Returns the text and the number
/// of bytes dropped.
fn decode_lenient(bytes: &[u8]) -> (String, usize) {
    let mut text = String::with_capacity(bytes.len());
    let mut dropped = 0;
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                return (text, dropped);
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    text.push_str(valid);
                }
                let skip = err.error_len().unwrap_or(after.len());
                dropped += skip;
                rest = &after[skip..];
            }
        }
    }
}
