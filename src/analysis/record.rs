//! Session file: a short metadata header followed by the raw stream.
//!
//! ```text
//! Mass of Spring: 0.609 kg
//! Duration: 10 seconds
//! Last Averaged Distance: 312.40 mm      (optional)
//!
//! 0.010 311.20
//! 0.020 309.85
//! ...
//! ```

use core::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::app::sample::Sample;

const MASS_PREFIX: &str = "Mass of Spring:";
const DURATION_PREFIX: &str = "Duration:";
const AVERAGE_PREFIX: &str = "Last Averaged Distance:";

/// Mass used on the bench rig when none is entered.
pub const DEFAULT_SPRING_MASS_KG: f64 = 0.609;

/// Default length of a collection run.
pub const DEFAULT_DURATION_SECS: f64 = 10.0;

// ── Error type ────────────────────────────────────────────────

/// Header problems found while parsing a session file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    MissingMass,
    InvalidMass,
    MissingDuration,
    InvalidDuration,
    InvalidAverage,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMass     => write!(f, "missing \"{}\" header", MASS_PREFIX),
            Self::InvalidMass     => write!(f, "spring mass is not a number"),
            Self::MissingDuration => write!(f, "missing \"{}\" header", DURATION_PREFIX),
            Self::InvalidDuration => write!(f, "duration is not a number"),
            Self::InvalidAverage  => write!(f, "averaged distance is not a number"),
        }
    }
}

impl core::error::Error for RecordError {}

// ── Header ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub spring_mass_kg: f64,
    pub duration_secs: f64,
    /// Equilibrium position measured before the run, if any.
    pub last_averaged_distance_mm: Option<f32>,
}

impl Default for SessionHeader {
    fn default() -> Self {
        Self {
            spring_mass_kg: DEFAULT_SPRING_MASS_KG,
            duration_secs: DEFAULT_DURATION_SECS,
            last_averaged_distance_mm: None,
        }
    }
}

// ── Record ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    pub header: SessionHeader,
    pub samples: Vec<Sample>,
}

impl SessionRecord {
    pub fn new(header: SessionHeader) -> Self {
        Self {
            header,
            samples: Vec::new(),
        }
    }

    /// Render the file contents, samples in wire format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "{} {} kg", MASS_PREFIX, self.header.spring_mass_kg)?;
        writeln!(out, "{} {} seconds", DURATION_PREFIX, self.header.duration_secs)?;
        if let Some(avg) = self.header.last_averaged_distance_mm {
            writeln!(out, "{} {:.2} mm", AVERAGE_PREFIX, avg)?;
        }
        out.push('\n');
        for s in &self.samples {
            out.push_str(&s.format_line());
        }
        Ok(())
    }

    /// Parse a session file.  The header must carry mass and duration;
    /// body lines that are not samples are skipped.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let mut mass = None;
        let mut duration = None;
        let mut average = None;

        let mut lines = text.lines();
        let mut body_start = None;
        for line in lines.by_ref() {
            let line = line.trim();
            if let Some(v) = header_value(line, MASS_PREFIX, "kg") {
                mass = Some(v.parse::<f64>().map_err(|_| RecordError::InvalidMass)?);
            } else if let Some(v) = header_value(line, DURATION_PREFIX, "seconds") {
                duration = Some(v.parse::<f64>().map_err(|_| RecordError::InvalidDuration)?);
            } else if let Some(v) = header_value(line, AVERAGE_PREFIX, "mm") {
                average = Some(v.parse::<f32>().map_err(|_| RecordError::InvalidAverage)?);
            } else {
                // first non-header line ends the header
                body_start = Some(line);
                break;
            }
        }

        let header = SessionHeader {
            spring_mass_kg: mass.ok_or(RecordError::MissingMass)?,
            duration_secs: duration.ok_or(RecordError::MissingDuration)?,
            last_averaged_distance_mm: average,
        };

        let samples = body_start
            .into_iter()
            .chain(lines)
            .filter_map(Sample::parse_line)
            .collect();

        Ok(Self { header, samples })
    }
}

fn header_value<'a>(line: &'a str, prefix: &str, unit: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(prefix)?.trim();
    Some(rest.strip_suffix(unit).unwrap_or(rest).trim())
}
