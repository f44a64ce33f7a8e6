//! Sensor drivers.
//!
//! Drivers here speak to the part directly over `embedded-hal` traits and
//! know nothing about the stream; [`crate::adapters::range_sensor`] wraps
//! them into the [`RangeSensor`](crate::app::ports::RangeSensor) port.

pub mod vl53l0x;
