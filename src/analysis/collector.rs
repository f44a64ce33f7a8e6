//! Timed collection run on the bench PC.
//!
//! Serial chunks are fed in as they arrive together with the host's clock.
//! Samples go into a [`SessionRecord`], a block average is logged every
//! [`BLOCK_LEN`](super::averaging::BLOCK_LEN) samples, and the run ends once
//! the header's `duration_secs` has elapsed.

use log::info;

use super::averaging::BlockAverage;
use super::line_assembler::LineAssembler;
use super::record::{SessionHeader, SessionRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectStatus {
    Collecting { remaining_secs: f64 },
    Done,
}

pub struct SessionCollector {
    record: SessionRecord,
    assembler: LineAssembler,
    block: BlockAverage,
    block_averages: Vec<f32>,
    started_at_secs: f64,
    done: bool,
}

impl SessionCollector {
    /// Start a run at host time `started_at_secs`.
    pub fn new(header: SessionHeader, started_at_secs: f64) -> Self {
        Self {
            record: SessionRecord::new(header),
            assembler: LineAssembler::new(),
            block: BlockAverage::new(),
            block_averages: Vec::new(),
            started_at_secs,
            done: false,
        }
    }

    /// Feed one serial chunk read at host time `now_secs`.
    ///
    /// The clock is checked before the chunk is used, so a chunk that
    /// arrives after the duration has passed is dropped.  Once done, every
    /// later call is a no-op.  An empty chunk just advances the clock.
    pub fn push(&mut self, chunk: &[u8], now_secs: f64) -> CollectStatus {
        if self.done {
            return CollectStatus::Done;
        }
        let remaining_secs = self.remaining_secs(now_secs);
        if remaining_secs <= 0.0 {
            info!(
                "collection complete: {}s reached, {} samples",
                self.record.header.duration_secs,
                self.record.samples.len()
            );
            self.done = true;
            return CollectStatus::Done;
        }

        for sample in self.assembler.push_samples(chunk) {
            if let Some(avg) = self.block.push(sample.distance_mm) {
                info!("averaged distance: {:.2} mm", avg);
                self.block_averages.push(avg);
            }
            self.record.samples.push(sample);
        }
        CollectStatus::Collecting { remaining_secs }
    }

    /// Time left in the run, never negative.
    pub fn remaining_secs(&self, now_secs: f64) -> f64 {
        (self.record.header.duration_secs - (now_secs - self.started_at_secs)).max(0.0)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Block averages reported so far, oldest first.
    pub fn block_averages(&self) -> &[f32] {
        &self.block_averages
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// End the run.  A trailing line without its newline is dropped: it may
    /// be cut mid-number.
    pub fn finish(self) -> SessionRecord {
        self.record
    }
}

// ── File naming ───────────────────────────────────────────────

/// Broken-down UTC date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilTime {
    /// Convert seconds since the Unix epoch.
    pub fn from_unix_secs(secs: u64) -> Self {
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;

        // days → proleptic Gregorian date, eras of 400 years from 0000-03-01
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = yoe + era * 400 + i64::from(month <= 2);

        Self {
            year,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: (rem / 60 % 60) as u8,
            second: (rem % 60) as u8,
        }
    }

    /// Current wall-clock time, or the epoch if the system clock is before it.
    pub fn now_utc() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self::from_unix_secs(secs)
    }
}

/// `spring_<YYYYmmdd_HHMMSS>.txt`
pub fn session_file_name(at: &CivilTime) -> String {
    format!(
        "spring_{:04}{:02}{:02}_{:02}{:02}{:02}.txt",
        at.year, at.month, at.day, at.hour, at.minute, at.second
    )
}
