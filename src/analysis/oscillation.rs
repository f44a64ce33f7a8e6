//! Period and spring-constant estimate from a recorded session.
//!
//! Times are rebased to the first sample.  Each upward pass through the
//! equilibrium (`prev < eq <= cur`) counts as one crossing, and crossings
//! closer than [`CROSSING_DEBOUNCE_SECS`] to the previous counted one are
//! ignored so sensor jitter around the equilibrium does not double count.
//!
//! With `n > 1` crossings the period is `(t_last - t_first) / (n - 1)` and
//! the spring constant follows from `T = 2π·sqrt(m/k)`.

use core::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::app::sample::Sample;

/// Minimum spacing between two counted crossings.
pub const CROSSING_DEBOUNCE_SECS: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillationReport {
    pub equilibrium_mm: f32,
    pub crossings: u32,
    /// Rebased time of the first and last counted crossing.
    pub first_crossing_secs: Option<f64>,
    pub last_crossing_secs: Option<f64>,
    pub period_secs: Option<f64>,
    pub spring_constant_n_per_m: Option<f64>,
}

/// Mean distance, or `None` for an empty slice.
pub fn mean_distance(samples: &[Sample]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|s| f64::from(s.distance_mm)).sum();
    Some((sum / samples.len() as f64) as f32)
}

/// Analyse a session.  `equilibrium_mm` falls back to the mean distance.
/// Returns `None` when there are no samples.
pub fn analyze(
    samples: &[Sample],
    equilibrium_mm: Option<f32>,
    spring_mass_kg: f64,
) -> Option<OscillationReport> {
    let first = samples.first()?;
    let eq = match equilibrium_mm {
        Some(eq) => eq,
        None => mean_distance(samples)?,
    };
    let t0 = first.elapsed_secs;

    let mut crossings = 0u32;
    let mut first_crossing: Option<f64> = None;
    let mut last_crossing: Option<f64> = None;

    for pair in samples.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let t = cur.elapsed_secs - t0;
        if last_crossing.is_some_and(|last| t - last < CROSSING_DEBOUNCE_SECS) {
            continue;
        }
        if prev.distance_mm < eq && eq <= cur.distance_mm {
            crossings += 1;
            last_crossing = Some(t);
            first_crossing.get_or_insert(t);
        }
    }

    let period_secs = match (first_crossing, last_crossing) {
        (Some(a), Some(b)) if crossings > 1 => Some((b - a) / f64::from(crossings - 1)),
        _ => None,
    };
    let spring_constant_n_per_m = period_secs
        .filter(|&p| p > 0.0)
        .map(|p| 4.0 * PI * PI * spring_mass_kg / (p * p));

    Some(OscillationReport {
        equilibrium_mm: eq,
        crossings,
        first_crossing_secs: first_crossing,
        last_crossing_secs: last_crossing,
        period_secs,
        spring_constant_n_per_m,
    })
}

/// Number of passes through the mean distance in either direction.  Two
/// halves make one full oscillation.
///
/// The first sample is left out of both the mean and the count: it is often
/// a stale reading from before the spring was released.
pub fn count_half_oscillations(samples: &[Sample]) -> u32 {
    let Some(body) = samples.get(1..) else {
        return 0;
    };
    let Some(eq) = mean_distance(body) else {
        return 0;
    };
    body.windows(2)
        .filter(|pair| {
            let prev = pair[0].distance_mm - eq;
            let cur = pair[1].distance_mm - eq;
            (prev < 0.0 && cur >= 0.0) || (prev > 0.0 && cur <= 0.0)
        })
        .count() as u32
}
