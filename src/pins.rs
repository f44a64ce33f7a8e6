//! GPIO / peripheral pin assignments for the ESP32 DevKit wiring.
//!
//! Single source of truth for the bring-up code in
//! [`drivers::hw_init`](crate::drivers::hw_init).

// ---------------------------------------------------------------------------
// I²C bus (VL53L0X breakout)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;

/// Default 7-bit address of the VL53L0X.
pub const VL53L0X_I2C_ADDR: u8 = 0x29;

// ---------------------------------------------------------------------------
// UART console (UART0, routed to the USB bridge)
// ---------------------------------------------------------------------------

pub const CONSOLE_TX_GPIO: i32 = 1;
pub const CONSOLE_RX_GPIO: i32 = 3;
