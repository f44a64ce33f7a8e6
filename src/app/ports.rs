//! Port traits: the boundary between the stream logic and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StreamService (domain)
//! ```
//!
//! Driven adapters (range sensor, clock, console) implement these traits.
//! The [`StreamService`](super::service::StreamService) consumes them via
//! generics, so the poll loop never touches a peripheral directly and runs
//! unchanged against fakes on the host.

use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Range sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// The capability set the stream needs from a distance sensor.
pub trait RangeSensor {
    /// Configure the response timeout used by every blocking sensor call.
    fn set_timeout(&mut self, timeout_ms: u16);

    /// Run the one-shot bring-up sequence.
    ///
    /// Any failure here is fatal for the stream and maps to
    /// [`Error::SensorInit`](crate::error::Error::SensorInit).
    fn init(&mut self) -> Result<()>;

    /// Put the sensor into free-running (continuous) sampling.
    fn start_continuous(&mut self) -> Result<()>;

    /// Latest continuous-mode distance in millimetres.
    ///
    /// Never fails: a timed-out or unreadable sample is reported through the
    /// sensor's own out-of-range sentinel, which the threshold filters.
    fn read_distance_mm(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Free-running monotonic clock.
pub trait TimePort {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Console port (driven adapter: domain → serial link)
// ───────────────────────────────────────────────────────────────

/// Text sink for the serial console.  Output only; nothing is ever read.
pub trait ConsolePort {
    /// Write `text` verbatim.  Implementations must not add line endings.
    fn write_str(&mut self, text: &str) -> Result<()>;
}
