use crate::{
    CodecError,
    constants::{DEFAULT_MAX_LINE_BYTES, LINE_TERMINATOR},
};

/// Reassembles newline-delimited packets from arbitrarily split byte chunks.
///
/// Bytes after the last newline stay buffered until a later chunk completes
/// them. A line longer than `max_line` bytes is rejected as soon as it is
/// detected, no matter how it was fragmented.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line: usize,
    unterminated: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            unterminated: 0,
        }
    }

    /// Appends a chunk to the buffer.
    ///
    /// On error the chunk is not buffered; the stream should be abandoned.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), CodecError> {
        let mut run = self.unterminated;
        for &byte in chunk {
            if byte == LINE_TERMINATOR {
                run = 0;
                continue;
            }

            run += 1;
            if run > self.max_line {
                return Err(CodecError::LineTooLong {
                    max: self.max_line,
                    pending: run,
                });
            }
        }

        self.unterminated = run;
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Removes and returns the next complete, non-blank line.
    ///
    /// Invalid UTF-8 is dropped and surrounding whitespace is trimmed.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.iter().position(|b| *b == LINE_TERMINATOR)?;
            let raw = self.buffer.drain(..=end).collect::<Vec<u8>>();
            let line = decode_ignoring_errors(&raw[..end]);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Some(line.to_owned());
        }
    }

    /// Drains every complete line currently buffered.
    pub fn lines(&mut self) -> impl Iterator<Item = String> + '_ {
        std::iter::from_fn(move || self.next_line())
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.unterminated
    }
}

fn decode_ignoring_errors(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, "")
}
