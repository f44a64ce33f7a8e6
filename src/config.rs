//! Stream configuration parameters
//!
//! Compile-time defaults for the distance streamer.  There is no runtime
//! configuration surface; [`StreamConfig::validate`] runs once at boot so a
//! bad edit to the defaults fails loudly instead of silently.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    // --- Filtering ---
    /// Readings strictly below this distance (mm) are emitted.
    pub threshold_mm: f32,

    // --- Sensor ---
    /// Response timeout handed to the sensor driver (milliseconds).
    pub sensor_timeout_ms: u16,
    /// Drive the sensor's I/O pads at 2.8 V instead of 1.8 V.
    pub sensor_io_2v8: bool,

    // --- Buses ---
    /// Serial console symbol rate.
    pub console_baud: u32,
    /// I²C bus clock (Hz).
    pub i2c_baudrate_hz: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            threshold_mm: 600.0,
            sensor_timeout_ms: 500,
            sensor_io_2v8: true,
            console_baud: 115_200,
            i2c_baudrate_hz: 400_000, // fast mode
        }
    }
}

impl StreamConfig {
    /// Lowest I²C clock the ESP32 master accepts reliably.
    pub const MIN_I2C_HZ: u32 = 10_000;
    /// Fast-mode-plus ceiling.
    pub const MAX_I2C_HZ: u32 = 1_000_000;

    /// Reject values that would make the stream meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_mm.is_finite() || self.threshold_mm <= 0.0 {
            return Err(Error::Config("threshold_mm must be finite and positive"));
        }
        if self.sensor_timeout_ms == 0 {
            return Err(Error::Config("sensor_timeout_ms must be non-zero"));
        }
        if self.console_baud == 0 {
            return Err(Error::Config("console_baud must be non-zero"));
        }
        if !(Self::MIN_I2C_HZ..=Self::MAX_I2C_HZ).contains(&self.i2c_baudrate_hz) {
            return Err(Error::Config("i2c_baudrate_hz out of range"));
        }
        Ok(())
    }
}
