//! Adaptive tolerance policy and per-channel pass/fail verdicts.
//!
//! Physical channels in one output can differ by many orders of magnitude
//! (a tower-base moment next to a blade pitch angle), so a fixed epsilon is
//! either too loose for the small channels or too strict for the large ones.
//! The absolute tolerance is therefore derived from the largest order of
//! magnitude present in the baseline:
//!
//! ```text
//! offset    = baseline - min(baseline)           (per channel)
//! order     = floor(log10(offset + NUM_EPS))     (elementwise)
//! atol      = max(10^(max(order) - a), ATOL_MIN)
//! rtol      = 10^(-r)
//! close(t,b) = |t - b| <= atol + rtol * |b|
//! ```
//!
//! A channel passes when every sample is close and the test data holds no
//! NaN or infinite values.

use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};

/// Added to offsets before `log10` so constant channels do not produce `-inf`
pub const NUM_EPS: f64 = 1e-12;

/// Floor for the absolute tolerance; below this only numerical noise differs
pub const ATOL_MIN: f64 = 1e-6;

/// Tolerance magnitudes as configured for a case
///
/// Both values are exponents, not raw tolerances: `relative_magnitude = 2`
/// means a relative tolerance of `1e-2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub relative_magnitude: f64,
    pub absolute_magnitude: f64,
}

impl Tolerance {
    pub fn new(relative_magnitude: f64, absolute_magnitude: f64) -> Self {
        Self { relative_magnitude, absolute_magnitude }
    }
}

/// Relative tolerance `10^(-r)`
pub fn relative_tolerance(relative_magnitude: f64) -> f64 {
    10f64.powf(-relative_magnitude)
}

/// Absolute tolerance derived from the baseline's largest order of magnitude
///
/// Never returns less than [`ATOL_MIN`]. Non-finite orders (from NaN or
/// infinite baseline values) are skipped when taking the maximum.
pub fn adaptive_absolute_tolerance(baseline: &TimeSeries, absolute_magnitude: f64) -> f64 {
    let mut max_order = f64::NEG_INFINITY;

    for channel in 0..baseline.channels() {
        let min = baseline.column(channel).fold(f64::INFINITY, f64::min);
        for value in baseline.column(channel) {
            let order = (value - min + NUM_EPS).log10().floor();
            if order.is_finite() && order > max_order {
                max_order = order;
            }
        }
    }

    let atol = 10f64.powf(max_order - absolute_magnitude);
    if atol.is_nan() { ATOL_MIN } else { atol.max(ATOL_MIN) }
}

/// Elementwise closeness test
///
/// Non-finite pairs are only close when they compare equal, so `inf` matches
/// `inf` of the same sign and NaN never matches anything.
#[inline]
pub fn is_close(test: f64, baseline: f64, atol: f64, rtol: f64) -> bool {
    if !test.is_finite() || !baseline.is_finite() {
        return test == baseline;
    }
    (test - baseline).abs() <= atol + rtol * baseline.abs()
}

/// Per-channel verdicts for `test` against `baseline`
///
/// Returns one entry per test channel. When the shapes differ every entry is
/// `false`: the series are incomparable, which is a failing comparison.
pub fn passing_channels(test: &TimeSeries, baseline: &TimeSeries, tolerance: Tolerance) -> Vec<bool> {
    if !test.same_shape(baseline) {
        tracing::debug!(
            test_shape = ?(test.samples(), test.channels()),
            baseline_shape = ?(baseline.samples(), baseline.channels()),
            "series shapes differ; all channels fail"
        );
        return vec![false; test.channels()];
    }

    let rtol = relative_tolerance(tolerance.relative_magnitude);
    let atol = adaptive_absolute_tolerance(baseline, tolerance.absolute_magnitude);
    tracing::debug!(atol, rtol, "derived comparison tolerances");

    (0..test.channels())
        .map(|channel| {
            test.column(channel)
                .zip(baseline.column(channel))
                .all(|(t, b)| t.is_finite() && is_close(t, b, atol, rtol))
        })
        .collect()
}
