//! Reassemble text lines from arbitrarily split serial reads.

use log::warn;

use crate::app::sample::Sample;

/// A partial line longer than this is noise (no newline for a long time).
/// The whole line is discarded, up to and including its eventual newline.
pub const MAX_PENDING_BYTES: usize = 1024;

/// Buffers bytes until a `\n` arrives.  `\r\n` endings are accepted.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
    dropped: u32,
    /// Set after an overflow; cleared by the newline that ends the bad line.
    discarding: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the lines it completed, in order.
    ///
    /// Lines that are not valid UTF-8 are dropped and counted.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &b in chunk {
            if self.discarding {
                if b == b'\n' {
                    self.discarding = false;
                }
                continue;
            }
            if b != b'\n' {
                self.pending.push(b);
                if self.pending.len() > MAX_PENDING_BYTES {
                    warn!("discarding {} bytes without newline", self.pending.len());
                    self.pending.clear();
                    self.dropped = self.dropped.saturating_add(1);
                    self.discarding = true;
                }
                continue;
            }

            if self.pending.last() == Some(&b'\r') {
                self.pending.pop();
            }
            match String::from_utf8(core::mem::take(&mut self.pending)) {
                Ok(line) => lines.push(line),
                Err(_) => self.dropped = self.dropped.saturating_add(1),
            }
        }
        lines
    }

    /// Feed one chunk and keep only the lines that are samples.
    pub fn push_samples(&mut self, chunk: &[u8]) -> Vec<Sample> {
        self.push(chunk)
            .iter()
            .filter_map(|l| Sample::parse_line(l))
            .collect()
    }

    /// Flush a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.discarding {
            self.discarding = false;
            return None;
        }
        if self.pending.is_empty() {
            return None;
        }
        let mut rest = core::mem::take(&mut self.pending);
        if rest.last() == Some(&b'\r') {
            rest.pop();
        }
        String::from_utf8(rest).ok()
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Lines discarded as invalid UTF-8 or over-long.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
