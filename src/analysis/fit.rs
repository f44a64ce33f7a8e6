//! Damped-oscillator model fitted to a recorded session.
//!
//! The displacement from equilibrium is modelled as
//! `x(t) = A·e^(−αt)·cos(ωt + φ)` with `t` rebased to the first sample, and
//! the four parameters are found with Levenberg–Marquardt least squares.
//! Speed and acceleration come from numerical gradients of the fitted
//! curve at the sample times.

use core::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::sample::Sample;

/// Angular frequency seed when no crossing period is known.
pub const DEFAULT_OMEGA_SEED: f64 = 1.0;

/// Damping seed, per second.
pub const DEFAULT_DAMPING_SEED: f64 = 0.1;

const MAX_ITERATIONS: u32 = 200;
/// Stop once an accepted step improves the squared error by less than this
/// fraction.
const REL_TOLERANCE: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e12;

/// Parameter order in the solver: `[A, ω, φ, α]`.
type Params = [f64; 4];
type Normal = ([[f64; 4]; 4], [f64; 4]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DampedFit {
    pub amplitude_mm: f64,
    pub omega_rad_s: f64,
    /// Normalised to `[−π, π)`.
    pub phase_rad: f64,
    pub damping_per_s: f64,
    pub equilibrium_mm: f64,
    /// Elapsed time of the first sample; model time is measured from here.
    pub start_secs: f64,
    pub rms_residual_mm: f64,
    pub iterations: u32,
}

/// Model curve sampled at the session's times, with its first and second
/// derivatives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Kinematics {
    pub displacement_mm: Vec<f64>,
    pub speed_mm_s: Vec<f64>,
    pub acceleration_mm_s2: Vec<f64>,
}

impl DampedFit {
    /// Displacement from equilibrium at `elapsed_secs`.
    pub fn displacement_at(&self, elapsed_secs: f64) -> f64 {
        model(
            &[self.amplitude_mm, self.omega_rad_s, self.phase_rad, self.damping_per_s],
            elapsed_secs - self.start_secs,
        )
    }

    /// Distance the sensor would report at `elapsed_secs`.
    pub fn distance_at(&self, elapsed_secs: f64) -> f64 {
        self.equilibrium_mm + self.displacement_at(elapsed_secs)
    }

    pub fn period_secs(&self) -> f64 {
        2.0 * PI / self.omega_rad_s
    }

    /// Fitted curve plus speed and acceleration at each sample time.
    /// `None` when the times are not strictly increasing.
    pub fn kinematics(&self, samples: &[Sample]) -> Option<Kinematics> {
        let times: Vec<f64> = samples.iter().map(|s| s.elapsed_secs).collect();
        let displacement_mm: Vec<f64> = times.iter().map(|&t| self.displacement_at(t)).collect();
        let speed_mm_s = gradient(&displacement_mm, &times)?;
        let acceleration_mm_s2 = gradient(&speed_mm_s, &times)?;
        Some(Kinematics {
            displacement_mm,
            speed_mm_s,
            acceleration_mm_s2,
        })
    }
}

/// Fit the damped model to `samples` around `equilibrium_mm`.
///
/// The solver is seeded with the largest displacement as amplitude,
/// `ω = 2π / period_secs` (or [`DEFAULT_OMEGA_SEED`]), zero phase and
/// [`DEFAULT_DAMPING_SEED`].  Returns `None` with fewer than four samples
/// or when the solution is not finite.
pub fn fit_damped_oscillation(
    samples: &[Sample],
    equilibrium_mm: f32,
    period_secs: Option<f64>,
) -> Option<DampedFit> {
    if samples.len() < 4 {
        return None;
    }
    let start_secs = samples[0].elapsed_secs;
    let eq = f64::from(equilibrium_mm);
    let t: Vec<f64> = samples.iter().map(|s| s.elapsed_secs - start_secs).collect();
    let y: Vec<f64> = samples.iter().map(|s| f64::from(s.distance_mm) - eq).collect();

    let amplitude = y.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let omega = period_secs
        .filter(|&p| p > 0.0 && p.is_finite())
        .map_or(DEFAULT_OMEGA_SEED, |p| 2.0 * PI / p);
    let mut p: Params = [amplitude, omega, 0.0, DEFAULT_DAMPING_SEED];

    let mut cost = sum_sq(&t, &y, &p);
    let mut lambda = 1e-3;
    let mut iterations = 0;

    'outer: while iterations < MAX_ITERATIONS && cost > 0.0 {
        iterations += 1;
        let (jtj, jtr) = normal_equations(&t, &y, &p);
        loop {
            let mut a = jtj;
            for (i, row) in a.iter_mut().enumerate() {
                row[i] += lambda * jtj[i][i].max(1e-12);
            }
            if let Some(step) = solve(a, jtr) {
                let candidate: Params = core::array::from_fn(|i| p[i] + step[i]);
                let next = sum_sq(&t, &y, &candidate);
                if next.is_finite() && next < cost {
                    let improvement = (cost - next) / cost;
                    p = candidate;
                    cost = next;
                    lambda = (lambda / 10.0).max(1e-12);
                    if improvement < REL_TOLERANCE {
                        break 'outer;
                    }
                    continue 'outer;
                }
            }
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                break 'outer;
            }
        }
    }

    let [mut amplitude_mm, mut omega_rad_s, mut phase_rad, damping_per_s] = p;
    // cos(−ωt − φ) = cos(ωt + φ) and −A·cos(θ) = A·cos(θ + π)
    if omega_rad_s < 0.0 {
        omega_rad_s = -omega_rad_s;
        phase_rad = -phase_rad;
    }
    if amplitude_mm < 0.0 {
        amplitude_mm = -amplitude_mm;
        phase_rad += PI;
    }
    phase_rad = (phase_rad + PI).rem_euclid(2.0 * PI) - PI;

    let rms_residual_mm = (cost / t.len() as f64).sqrt();
    let fit = DampedFit {
        amplitude_mm,
        omega_rad_s,
        phase_rad,
        damping_per_s,
        equilibrium_mm: eq,
        start_secs,
        rms_residual_mm,
        iterations,
    };
    debug!(
        "damped fit: A={:.2} mm ω={:.4} rad/s φ={:.3} α={:.4}/s rms={:.3} mm ({} iterations)",
        fit.amplitude_mm, fit.omega_rad_s, fit.phase_rad, fit.damping_per_s, fit.rms_residual_mm, iterations
    );

    let finite = [amplitude_mm, omega_rad_s, phase_rad, damping_per_s, rms_residual_mm]
        .iter()
        .all(|v| v.is_finite());
    finite.then_some(fit)
}

/// Derivative of `values` with respect to `times`: second-order central
/// differences inside, first-order one-sided differences at the ends.
/// Uneven spacing is allowed.
///
/// `None` when the lengths differ, there are fewer than two points, or the
/// times are not strictly increasing.
pub fn gradient(values: &[f64], times: &[f64]) -> Option<Vec<f64>> {
    let n = values.len();
    if n < 2 || times.len() != n || times.windows(2).any(|w| w[1] <= w[0]) {
        return None;
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) / (times[1] - times[0]));
    for i in 1..n - 1 {
        let hs = times[i] - times[i - 1];
        let hd = times[i + 1] - times[i];
        let num = hs * hs * values[i + 1] + (hd * hd - hs * hs) * values[i] - hd * hd * values[i - 1];
        out.push(num / (hs * hd * (hd + hs)));
    }
    out.push((values[n - 1] - values[n - 2]) / (times[n - 1] - times[n - 2]));
    Some(out)
}

// ── Solver internals ──────────────────────────────────────────

fn model(p: &Params, t: f64) -> f64 {
    let [a, omega, phi, alpha] = *p;
    a * (-alpha * t).exp() * (omega * t + phi).cos()
}

fn sum_sq(t: &[f64], y: &[f64], p: &Params) -> f64 {
    t.iter()
        .zip(y)
        .map(|(&ti, &yi)| {
            let r = yi - model(p, ti);
            r * r
        })
        .sum()
}

/// `JᵀJ` and `Jᵀr` for the residuals `r = y − model`.
fn normal_equations(t: &[f64], y: &[f64], p: &Params) -> Normal {
    let [a, omega, phi, alpha] = *p;
    let mut jtj = [[0.0; 4]; 4];
    let mut jtr = [0.0; 4];

    for (&ti, &yi) in t.iter().zip(y) {
        let decay = (-alpha * ti).exp();
        let (sin, cos) = (omega * ti + phi).sin_cos();
        let f = a * decay * cos;
        let j = [
            decay * cos,
            -a * decay * ti * sin,
            -a * decay * sin,
            -ti * f,
        ];
        let r = yi - f;
        for row in 0..4 {
            jtr[row] += j[row] * r;
            for col in 0..4 {
                jtj[row][col] += j[row] * j[col];
            }
        }
    }
    (jtj, jtr)
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let pivot = (col..4).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        let magnitude = a[pivot][col].abs();
        if magnitude.is_nan() || magnitude <= f64::MIN_POSITIVE {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..4 {
            let factor = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; 4];
    for row in (0..4).rev() {
        let tail: f64 = (row + 1..4).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
