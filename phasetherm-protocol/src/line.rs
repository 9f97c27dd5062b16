//! Line assembly for the serial command channel
//!
//! Bytes arrive one at a time from the UART. A line ends at `\n` or `\r`;
//! a `\r\n` pair yields one line because the empty line in between is
//! skipped. Lines longer than [`MAX_LINE_LEN`] are discarded whole.

use heapless::{String, Vec};

/// Longest accepted line, excluding the terminator
pub const MAX_LINE_LEN: usize = 32;

/// A complete line, terminator stripped
pub type Line = String<MAX_LINE_LEN>;

/// Line assembly errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded [`MAX_LINE_LEN`] and was dropped
    Overflow,
    /// Line contained bytes that are not UTF-8
    InvalidUtf8,
}

/// Incremental line assembler
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8, MAX_LINE_LEN>,
    /// Set after an overflow until the next terminator
    discarding: bool,
}

impl LineBuffer {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            discarding: false,
        }
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Number of bytes buffered for the current line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one byte
    ///
    /// Returns `Ok(Some(line))` when a terminator completes a non-empty line.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line>, LineError> {
        if byte == b'\n' || byte == b'\r' {
            if self.discarding {
                self.reset();
                return Err(LineError::Overflow);
            }
            if self.buffer.is_empty() {
                return Ok(None);
            }

            let result = core::str::from_utf8(&self.buffer)
                .map_err(|_| LineError::InvalidUtf8)
                .and_then(|text| {
                    let mut line = Line::new();
                    line.push_str(text).map_err(|_| LineError::Overflow)?;
                    Ok(line)
                });
            self.reset();
            return result.map(Some);
        }

        if self.discarding {
            return Ok(None);
        }

        if self.buffer.push(byte).is_err() {
            self.buffer.clear();
            self.discarding = true;
        }
        Ok(None)
    }

    /// Feed several bytes
    ///
    /// Returns the first complete line. Bytes after it are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Line>, LineError> {
        for &byte in bytes {
            if let Some(line) = self.feed(byte)? {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}
