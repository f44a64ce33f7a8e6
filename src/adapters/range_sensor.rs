//! [`RangeSensor`] adapter over the VL53L0X driver.
//!
//! Generic over the `embedded-hal` bus and delay, so the same adapter runs
//! on the ESP-IDF I²C master and on a fake register file in tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, warn};

use crate::app::ports::RangeSensor;
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::sensors::vl53l0x::{OUT_OF_RANGE_MM, Vl53l0x};

/// Owns the driver for the lifetime of the stream.
pub struct TofAdapter<I2C, D> {
    sensor: Vl53l0x<I2C, D>,
    io_2v8: bool,
    continuous_period_ms: u32,
    timeouts: u32,
}

impl<I2C, D> TofAdapter<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(sensor: Vl53l0x<I2C, D>, config: &StreamConfig) -> Self {
        Self {
            sensor,
            io_2v8: config.sensor_io_2v8,
            continuous_period_ms: 0,
            timeouts: 0,
        }
    }

    /// Number of reads that ran into the sensor timeout.
    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }

    pub fn into_inner(self) -> Vl53l0x<I2C, D> {
        self.sensor
    }
}

impl<I2C, D> RangeSensor for TofAdapter<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    fn set_timeout(&mut self, timeout_ms: u16) {
        self.sensor.set_timeout(timeout_ms);
    }

    fn init(&mut self) -> Result<()> {
        self.sensor.init(self.io_2v8).map_err(|e| {
            error!("VL53L0X init: {:?}", e);
            Error::SensorInit
        })
    }

    fn start_continuous(&mut self) -> Result<()> {
        self.sensor
            .start_continuous(self.continuous_period_ms)
            .map_err(|e| {
                error!("VL53L0X start_continuous: {:?}", e);
                Error::Bus
            })
    }

    fn read_distance_mm(&mut self) -> f32 {
        let mm = match self.sensor.read_range_continuous_mm() {
            Ok(mm) => mm,
            Err(e) => {
                warn!("VL53L0X read: {:?}", e);
                OUT_OF_RANGE_MM
            }
        };
        if self.sensor.timeout_occurred() {
            self.timeouts = self.timeouts.saturating_add(1);
            warn!("VL53L0X read timed out ({} so far)", self.timeouts);
        }
        f32::from(mm)
    }
}
