//! Unified error types for the tofstream firmware.
//!
//! A single `Error` enum that the stream service and its adapters convert
//! into, so the entry point has one thing to match on.  All variants are
//! `Copy` so they can be returned through the poll loop without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The range sensor did not answer or failed its bring-up sequence.
    /// This is the only fatal condition; the service halts after it.
    SensorInit,
    /// An I²C transfer failed outside of initialisation.
    Bus,
    /// Writing a line to the console failed.
    Console,
    /// A lifecycle call was made in the wrong [`StreamState`](crate::app::service::StreamState).
    InvalidState,
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorInit => write!(f, "sensor initialisation failed"),
            Self::Bus => write!(f, "I2C bus error"),
            Self::Console => write!(f, "console write failed"),
            Self::InvalidState => write!(f, "operation not valid in current state"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
