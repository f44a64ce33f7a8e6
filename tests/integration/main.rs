//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the fakes in `mock_hw`.  All tests run on the host (x86_64) with
//! no real hardware required.

mod mock_hw;
mod session_flow_tests;
mod stream_service_tests;
mod vl53l0x_tests;
