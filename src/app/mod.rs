//! Application core: the stream logic, no direct I/O.
//!
//! All interaction with hardware happens through the **port traits** in
//! [`ports`], so the init sequence and poll loop are testable on the host
//! against fake sensors, clocks and consoles.

pub mod ports;
pub mod sample;
pub mod service;
