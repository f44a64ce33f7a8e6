//! One-shot board bring-up.
//!
//! Takes the chip peripherals, installs the I²C master the range sensor
//! hangs off and the UART the stream is printed on.  Called once from
//! `main()` before the stream starts.

use crate::config::StreamConfig;
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    /// `Peripherals::take()` was already called.
    PeripheralsTaken,
    I2cInitFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PeripheralsTaken   => write!(f, "peripherals already taken"),
            Self::I2cInitFailed(rc)  => write!(f, "I2C master init failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "UART init failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

/// Human-readable pin map, logged at boot.
pub fn describe_wiring(config: &StreamConfig) -> heapless::String<96> {
    use core::fmt::Write;

    let mut s = heapless::String::new();
    let _ = write!(
        s,
        "I2C SDA={} SCL={} @{}Hz, TOF 0x{:02x}, console TX={} RX={} @{}",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        config.i2c_baudrate_hz,
        pins::VL53L0X_I2C_ADDR,
        pins::CONSOLE_TX_GPIO,
        pins::CONSOLE_RX_GPIO,
        config.console_baud,
    );
    s
}

#[cfg(feature = "espidf")]
pub use self::board::{Board, init_board};

#[cfg(feature = "espidf")]
mod board {
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
    use esp_idf_hal::units::Hertz;
    use log::info;

    use super::HwInitError;
    use crate::config::StreamConfig;
    use crate::pins;

    /// Drivers handed to the stream.
    pub struct Board {
        pub i2c: I2cDriver<'static>,
        pub uart: UartDriver<'static>,
    }

    pub fn init_board(config: &StreamConfig) -> Result<Board, HwInitError> {
        let p = Peripherals::take().map_err(|_| HwInitError::PeripheralsTaken)?;

        // SAFETY: each GPIO number is claimed exactly once here, and the
        // typed pins in `p.pins` are never used elsewhere.
        let (sda, scl, tx, rx) = unsafe {
            (
                AnyIOPin::new(pins::I2C_SDA_GPIO),
                AnyIOPin::new(pins::I2C_SCL_GPIO),
                AnyIOPin::new(pins::CONSOLE_TX_GPIO),
                AnyIOPin::new(pins::CONSOLE_RX_GPIO),
            )
        };

        let i2c_cfg = I2cConfig::new().baudrate(Hertz(config.i2c_baudrate_hz));
        let i2c = I2cDriver::new(p.i2c0, sda, scl, &i2c_cfg)
            .map_err(|e| HwInitError::I2cInitFailed(e.code()))?;
        info!("hw_init: I2C0 master up");

        let uart_cfg = UartConfig::new().baudrate(Hertz(config.console_baud));
        let uart = UartDriver::new(
            p.uart0,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart_cfg,
        )
        .map_err(|e| HwInitError::UartInitFailed(e.code()))?;
        info!("hw_init: UART0 console up");

        Ok(Board { i2c, uart })
    }
}
