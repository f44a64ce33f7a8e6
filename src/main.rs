//! tofstream firmware main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  TofAdapter          Esp32TimeAdapter     UartConsole    │
//! │  (RangeSensor)       (TimePort)           (ConsolePort)  │
//! │                                                          │
//! │  ────────────── Port Trait Boundary ──────────────       │
//! │                                                          │
//! │  ┌──────────────────────────────────────────────────┐    │
//! │  │  StreamService: init → loop { read, compare,     │    │
//! │  │                              print }             │    │
//! │  └──────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::{Delay, FreeRtos};
use log::{error, info};

use tofstream::adapters::console::UartConsole;
use tofstream::adapters::range_sensor::TofAdapter;
use tofstream::adapters::time::Esp32TimeAdapter;
use tofstream::app::service::StreamService;
use tofstream::config::StreamConfig;
use tofstream::drivers::hw_init;
use tofstream::pins;
use tofstream::sensors::vl53l0x::Vl53l0x;

/// Delay between wake-ups while parked.
const HALT_SLEEP_MS: u32 = 1_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("tofstream v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config ─────────────────────────────────────────────
    let config = StreamConfig::default();
    config.validate()?;
    info!("wiring: {}", hw_init::describe_wiring(&config));

    // ── 3. Board ──────────────────────────────────────────────
    let board = hw_init::init_board(&config)?;

    // ── 4. Adapters ───────────────────────────────────────────
    let tof = Vl53l0x::new(board.i2c, Delay::new_default()).with_address(pins::VL53L0X_I2C_ADDR);
    let sensor = TofAdapter::new(tof, &config);
    let clock = Esp32TimeAdapter::new();
    let mut console = UartConsole::new(board.uart);

    // ── 5. Stream ─────────────────────────────────────────────
    let mut service = StreamService::new(sensor, &config);
    let Err(e) = service.run(&clock, &mut console);
    error!("stream stopped: {} (state {:?})", e, service.state());
    halt()
}

/// Park the main task forever.  Nothing restarts the stream.
fn halt() -> ! {
    loop {
        FreeRtos::delay_ms(HALT_SLEEP_MS);
    }
}
