//! tofstream firmware library.
//!
//! Exposes the stream logic, the VL53L0X driver and the host-side analysis
//! for integration testing.  All ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod analysis;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod sensors;

pub use error::{Error, Result};
