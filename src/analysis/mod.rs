//! Host-side consumers of the sample stream.
//!
//! The firmware only emits `<secs> <mm>` lines.  Everything a bench PC does
//! with them lives here: reassembling lines from serial chunks, running a
//! timed collection, keeping averages for the equilibrium position, saving
//! a session to a text file and reading it back, estimating the oscillation
//! period and spring constant, and fitting a damped-oscillator curve.
//!
//! None of this runs on the ESP32, but it is plain `core`/`std` code so it
//! builds for either target.

pub mod averaging;
pub mod collector;
pub mod fit;
pub mod line_assembler;
pub mod oscillation;
pub mod record;

pub use averaging::{BlockAverage, RollingAverage};
pub use collector::{CivilTime, CollectStatus, SessionCollector, session_file_name};
pub use fit::{DampedFit, Kinematics, fit_damped_oscillation, gradient};
pub use line_assembler::LineAssembler;
pub use oscillation::{OscillationReport, analyze, count_half_oscillations};
pub use record::{RecordError, SessionHeader, SessionRecord};
