//! Reporting norms for test-vs-baseline differences
//!
//! These norms are independent of the pass/fail verdict; they exist so a
//! report can show how far each channel drifted.
//!
//! # Norms
//!
//! - **max_norm_over_range**: L∞ of the difference, divided by the baseline's
//!   peak-to-peak range when that range is at least 1
//! - **relative_l2_norm**: L2 of the difference, divided by the baseline's L2
//!   norm when that norm is at least 1
//! - **max_norm**: L∞ of the difference
//!
//! When the two series are not the same shape, every norm of every channel
//! is NaN. NaN here means "incomparable", as opposed to 0 ("equal").

use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Substitute for an all-zero baseline L2 norm
const ZERO_NORM_SUBSTITUTE: f64 = 1e-16;

/// Column of a [`NormResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormKind {
    MaxNormOverRange,
    RelativeL2Norm,
    MaxNorm,
}

impl NormKind {
    /// All kinds in column order
    pub const ALL: [NormKind; 3] =
        [NormKind::MaxNormOverRange, NormKind::RelativeL2Norm, NormKind::MaxNorm];

    pub fn column(self) -> usize {
        match self {
            NormKind::MaxNormOverRange => 0,
            NormKind::RelativeL2Norm => 1,
            NormKind::MaxNorm => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NormKind::MaxNormOverRange => "max_norm_over_range",
            NormKind::RelativeL2Norm => "relative_l2_norm",
            NormKind::MaxNorm => "max_norm",
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `channels × norm kinds` matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormResult {
    rows: Vec<[f64; 3]>,
}

impl NormResult {
    /// A matrix of NaN, marking every channel incomparable
    pub fn incomparable(channels: usize) -> Self {
        Self { rows: vec![[f64::NAN; 3]; channels] }
    }

    pub fn channels(&self) -> usize {
        self.rows.len()
    }

    /// # Panics
    ///
    /// Panics if `channel` is out of range
    pub fn get(&self, channel: usize, kind: NormKind) -> f64 {
        self.rows[channel][kind.column()]
    }

    pub fn row(&self, channel: usize) -> Option<&[f64; 3]> {
        self.rows.get(channel)
    }

    pub fn column(&self, kind: NormKind) -> Vec<f64> {
        self.rows.iter().map(|row| row[kind.column()]).collect()
    }

    pub fn is_incomparable(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().flatten().all(|v| v.is_nan())
    }
}

/// L∞ norm that propagates NaN, as numpy's `norm(x, inf)` does
fn max_abs<I: Iterator<Item = f64>>(values: I) -> f64 {
    values.map(f64::abs).fold(0.0, |acc, v| if acc.is_nan() || v.is_nan() { f64::NAN } else { acc.max(v) })
}

fn l2<I: Iterator<Item = f64>>(values: I) -> f64 {
    values.map(|v| v * v).sum::<f64>().sqrt()
}

/// Compute every reporting norm for every channel
///
/// Channel count of the result follows `test`.
pub fn calculate_norms(test: &TimeSeries, baseline: &TimeSeries) -> NormResult {
    if test.len() != baseline.len() || !test.same_shape(baseline) {
        tracing::debug!(
            test_len = test.len(),
            baseline_len = baseline.len(),
            "series are incomparable; norms set to NaN"
        );
        return NormResult::incomparable(test.channels());
    }

    let rows = (0..test.channels())
        .map(|channel| {
            let diff = || test.column(channel).zip(baseline.column(channel)).map(|(t, b)| t - b);

            let max_norm = max_abs(diff());

            let (lo, hi) = baseline
                .column(channel)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let range = (hi - lo).abs();
            let max_norm_over_range =
                if range >= 1.0 { max_abs(diff().map(|d| d / range)) } else { max_norm };

            let diff_l2 = l2(diff());
            let mut baseline_l2 = l2(baseline.column(channel));
            if baseline_l2 == 0.0 {
                baseline_l2 = ZERO_NORM_SUBSTITUTE;
            }
            let relative_l2_norm = if baseline_l2 >= 1.0 { diff_l2 / baseline_l2 } else { diff_l2 };

            [max_norm_over_range, relative_l2_norm, max_norm]
        })
        .collect();

    NormResult { rows }
}

/// Norm-threshold pass rule
///
/// Passes when every selected norm of every channel is strictly below
/// `threshold`. NaN never passes, and an empty selection never passes.
pub fn passes_norm_gate(norms: &NormResult, kinds: &[NormKind], threshold: f64) -> bool {
    !kinds.is_empty()
        && kinds.iter().all(|kind| norms.column(*kind).into_iter().all(|v| v < threshold))
}
