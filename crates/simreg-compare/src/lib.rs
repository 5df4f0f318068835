//! Numerical regression comparison for simulation time series.
//!
//! This crate decides, channel by channel, whether a freshly produced output
//! matches its stored baseline, and computes the summary norms that reports
//! show next to each verdict.
//!
//! # Quick start
//!
//! ```rust
//! use simreg_compare::{TimeSeries, Tolerance, calculate_norms, passing_channels, NormKind};
//!
//! let baseline = TimeSeries::from_rows(vec![vec![0.0], vec![1.0], vec![2.0]]).unwrap();
//! let test = baseline.clone();
//!
//! let verdicts = passing_channels(&test, &baseline, Tolerance::new(2.0, 6.0));
//! assert_eq!(verdicts, vec![true]);
//!
//! let norms = calculate_norms(&test, &baseline);
//! assert_eq!(norms.get(0, NormKind::MaxNorm), 0.0);
//! ```

pub mod norms;
pub mod series;
pub mod tolerance;

pub use norms::{NormKind, NormResult, calculate_norms, passes_norm_gate};
pub use series::{ChannelInfo, SeriesError, SeriesResult, TimeSeries};
pub use tolerance::{
    ATOL_MIN, NUM_EPS, Tolerance, adaptive_absolute_tolerance, is_close, passing_channels,
    relative_tolerance,
};
