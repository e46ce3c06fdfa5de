//! Reassembly of terminator-delimited packets from a TCP byte stream.
//!
//! A single read may carry several packets, a fragment of one, or both.
//! A chunk that does not end with the terminator is held back in full; the
//! next chunk that does end with it releases everything buffered so far,
//! split on the terminator with empty segments dropped.
//!
//! After an overflow the rest of the dropped packet is skipped up to and
//! including its terminator.

use crate::packet::TERMINATOR;

const TERMINATOR_BYTE: u8 = TERMINATOR as u8;

/// Configuration for a [`StreamReassembler`].
#[derive(Debug, Clone)]
pub struct ReassemblerConfig {
    /// Maximum number of bytes held while waiting for a terminator. Default: 1 MB.
    pub max_pending: usize,
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self {
            max_pending: 1_048_576,
        }
    }
}

/// Errors produced while reassembling packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The pending fragment grew past the configured limit and was discarded.
    #[error("pending fragment of {size} bytes exceeds maximum {max}")]
    PendingOverflow {
        /// Size the fragment would have reached.
        size: usize,
        /// The configured maximum.
        max: usize,
    },
}

/// Per-connection packet reassembler.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    config: ReassemblerConfig,
    pending: Vec<u8>,
    /// Set after an overflow until the dropped packet's terminator is seen.
    discarding: bool,
}

impl StreamReassembler {
    /// Create a reassembler with the given limits.
    pub fn new(config: ReassemblerConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            discarding: false,
        }
    }

    /// Feed one read's worth of bytes, returning the packets it completes.
    ///
    /// Returned strings have the terminator removed and are in arrival order.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Result<Vec<String>, FrameError> {
        if self.discarding {
            let Some(end) = chunk.iter().position(|&b| b == TERMINATOR_BYTE) else {
                return Ok(Vec::new());
            };
            self.discarding = false;
            chunk = &chunk[end + 1..];
        }
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        if chunk.last() != Some(&TERMINATOR_BYTE) {
            let size = self.pending.len() + chunk.len();
            if size > self.config.max_pending {
                self.pending.clear();
                self.discarding = true;
                return Err(FrameError::PendingOverflow {
                    size,
                    max: self.config.max_pending,
                });
            }
            self.pending.extend_from_slice(chunk);
            return Ok(Vec::new());
        }

        let combined = if self.pending.is_empty() {
            std::borrow::Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            std::borrow::Cow::Owned(joined)
        };

        Ok(combined
            .split(|&b| b == TERMINATOR_BYTE)
            .filter(|segment| !segment.is_empty())
            .map(|segment| String::from_utf8_lossy(segment).into_owned())
            .collect())
    }

    /// Whether a fragment is waiting for its terminator.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop any buffered fragment (used when a connection is reset).
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }
}
