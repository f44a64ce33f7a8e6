//! A single qualifying reading and its wire form.
//!
//! The wire form is one line of two whitespace-separated tokens:
//!
//! ```text
//! <elapsed seconds, 3 decimals> <distance mm, 2 decimals>\n
//! ```
//!
//! The firmware only formats; the host side only parses.  Both live here so
//! the two can never drift apart.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

/// Upper bound on a formatted line, newline included.  Large enough for a
/// `u64` millisecond tick and any finite `f32` distance.
pub const LINE_CAPACITY: usize = 72;

/// Largest elapsed time the firmware can print (`u64::MAX` ms).
pub const MAX_ELAPSED_SECS: f64 = u64::MAX as f64 / 1000.0;

/// Stack-allocated formatted line.
pub type SampleLine = heapless::String<LINE_CAPACITY>;

/// Timestamped distance reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub elapsed_secs: f64,
    pub distance_mm: f32,
}

impl Sample {
    /// Build a sample from the raw millisecond tick count.
    pub fn from_ticks(ticks_ms: u64, distance_mm: f32) -> Self {
        Self {
            elapsed_secs: elapsed_secs_from_ticks(ticks_ms),
            distance_mm,
        }
    }

    /// Render the wire line, trailing newline included.
    pub fn format_line(&self) -> SampleLine {
        let mut line = SampleLine::new();
        // Cannot overflow: LINE_CAPACITY covers the widest possible values.
        let _ = writeln!(line, "{:.3} {:.2}", self.elapsed_secs, self.distance_mm);
        line
    }

    /// Parse one wire line.
    ///
    /// Returns `None` unless the line holds exactly two whitespace-separated
    /// tokens that both parse as finite numbers, with the time inside
    /// `0..=MAX_ELAPSED_SECS`.  Console noise such as the init failure
    /// message is therefore skipped, not treated as an error.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let (secs, mm) = (tokens.next()?, tokens.next()?);
        if tokens.next().is_some() {
            return None;
        }
        let elapsed_secs: f64 = secs.parse().ok()?;
        let distance_mm: f32 = mm.parse().ok()?;
        if !(0.0..=MAX_ELAPSED_SECS).contains(&elapsed_secs) || !distance_mm.is_finite() {
            return None;
        }
        Some(Self {
            elapsed_secs,
            distance_mm,
        })
    }
}

/// Elapsed seconds for a millisecond tick count.  Recomputed from the clock
/// on every call, never accumulated.
pub fn elapsed_secs_from_ticks(ticks_ms: u64) -> f64 {
    ticks_ms as f64 / 1000.0
}
