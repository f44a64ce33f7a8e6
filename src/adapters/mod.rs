//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements    | Connects to                  |
//! |----------------|---------------|------------------------------|
//! | `range_sensor` | RangeSensor   | VL53L0X over `embedded-hal`  |
//! | `time`         | TimePort      | ESP32 system timer           |
//! | `console`      | ConsolePort   | UART0 (espidf only)          |

pub mod console;
pub mod range_sensor;
pub mod time;
