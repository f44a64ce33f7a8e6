//! Stream service: the whole of the firmware's behaviour.
//!
//! [`StreamService`] owns the range sensor and walks it through a three-state
//! lifecycle.  The clock and console are injected at call sites, so the
//! service runs unchanged against fakes on the host.
//!
//! ```text
//!                 start() ok
//!  Uninitialized ───────────▶ Running ──┐ poll_once()
//!        │                       ▲      │
//!        │ start() err           └──────┘
//!        ▼
//!     Halted   (terminal; the caller decides what to do)
//! ```

use core::convert::Infallible;

use log::{debug, error, info, trace};

use crate::config::StreamConfig;
use crate::error::{Error, Result};

use super::ports::{ConsolePort, RangeSensor, TimePort};
use super::sample::Sample;

/// Printed to the console, once, when the sensor fails to come up.
pub const INIT_FAILURE_MESSAGE: &str = "Failed to detect and initialize sensor!\n";

/// Lifecycle state of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, sensor untouched.
    Uninitialized,
    /// Sensor is in continuous mode and the poll loop may run.
    Running,
    /// Sensor bring-up failed.  No transition leaves this state.
    Halted,
}

/// Whether a reading qualifies for output.  Strict: a reading exactly at
/// the threshold is dropped, and there is no hysteresis.
#[inline]
pub fn passes_threshold(distance_mm: f32, threshold_mm: f32) -> bool {
    distance_mm < threshold_mm
}

// ───────────────────────────────────────────────────────────────
// StreamService
// ───────────────────────────────────────────────────────────────

/// Owns the sensor and runs init → loop { read, compare, print }.
pub struct StreamService<S> {
    sensor: S,
    threshold_mm: f32,
    sensor_timeout_ms: u16,
    state: StreamState,
    lines_emitted: u64,
}

impl<S: RangeSensor> StreamService<S> {
    /// Wrap `sensor`.  Does **not** touch the hardware; call
    /// [`start`](Self::start) or [`run`](Self::run) next.
    pub fn new(sensor: S, config: &StreamConfig) -> Self {
        Self {
            sensor,
            threshold_mm: config.threshold_mm,
            sensor_timeout_ms: config.sensor_timeout_ms,
            state: StreamState::Uninitialized,
            lines_emitted: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn threshold_mm(&self) -> f32 {
        self.threshold_mm
    }

    /// Number of sample lines written since start.
    pub fn lines_emitted(&self) -> u64 {
        self.lines_emitted
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Give the sensor back (e.g. to inspect a fake after a test run).
    pub fn into_sensor(self) -> S {
        self.sensor
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Configure the sensor timeout, attempt bring-up exactly once, and on
    /// success enable continuous sampling.
    ///
    /// On failure the failure message is written to `console`, the service
    /// moves to [`StreamState::Halted`] and [`Error::SensorInit`] is
    /// returned.  Calling this twice is [`Error::InvalidState`].
    pub fn start(&mut self, console: &mut impl ConsolePort) -> Result<()> {
        if self.state != StreamState::Uninitialized {
            return Err(Error::InvalidState);
        }

        self.sensor.set_timeout(self.sensor_timeout_ms);
        debug!("sensor timeout set to {} ms", self.sensor_timeout_ms);

        if let Err(e) = self.sensor.init() {
            error!("sensor init failed: {}", e);
            self.state = StreamState::Halted;
            if let Err(ce) = console.write_str(INIT_FAILURE_MESSAGE) {
                error!("could not report init failure: {}", ce);
            }
            return Err(Error::SensorInit);
        }

        if let Err(e) = self.sensor.start_continuous() {
            error!("continuous mode not enabled: {}", e);
            self.state = StreamState::Halted;
            return Err(e);
        }

        self.state = StreamState::Running;
        info!(
            "stream running (threshold < {:.1} mm, timeout {} ms)",
            self.threshold_mm, self.sensor_timeout_ms
        );
        Ok(())
    }

    // ── Per-iteration step ────────────────────────────────────

    /// One loop iteration: timestamp, read, compare, maybe print.
    ///
    /// Returns the emitted sample, or `None` if the reading was filtered.
    pub fn poll_once(
        &mut self,
        clock: &impl TimePort,
        console: &mut impl ConsolePort,
    ) -> Result<Option<Sample>> {
        if self.state != StreamState::Running {
            return Err(Error::InvalidState);
        }

        let ticks_ms = clock.uptime_ms();
        let distance_mm = self.sensor.read_distance_mm();

        if !passes_threshold(distance_mm, self.threshold_mm) {
            trace!("filtered {:.2} mm at {} ms", distance_mm, ticks_ms);
            return Ok(None);
        }

        let sample = Sample::from_ticks(ticks_ms, distance_mm);
        console.write_str(&sample.format_line())?;
        self.lines_emitted += 1;
        Ok(Some(sample))
    }

    /// Start, then poll forever.  Returns only on error: a failed bring-up
    /// ([`Error::SensorInit`]) or a console/bus fault.
    pub fn run(
        &mut self,
        clock: &impl TimePort,
        console: &mut impl ConsolePort,
    ) -> Result<Infallible> {
        self.start(console)?;
        loop {
            self.poll_once(clock, console)?;
        }
    }
}
