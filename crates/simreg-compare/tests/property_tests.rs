//! Property-based tests for `simreg-compare`.
//!
//! Exercises the tolerance floor, reflexivity of the verdicts and the NaN
//! contract for incomparable series across generated inputs.

use proptest::prelude::*;
use simreg_compare::{
    ATOL_MIN, NormKind, TimeSeries, Tolerance, adaptive_absolute_tolerance, calculate_norms,
    passing_channels,
};

// ── Strategies ──────────────────────────────────────────────────────────────

/// A rectangular series with finite values spanning many magnitudes.
fn arb_series() -> impl Strategy<Value = TimeSeries> {
    (1usize..=12, 1usize..=5).prop_flat_map(|(samples, channels)| {
        prop::collection::vec(-1e9f64..1e9, samples * channels)
            .prop_map(move |data| TimeSeries::new(samples, channels, data).unwrap())
    })
}

/// Any f64 at all, including NaN and infinities.
fn arb_any_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<f64>(),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        Just(0.0),
    ]
}

// ── Property tests ──────────────────────────────────────────────────────────

proptest! {
    /// The absolute tolerance never drops below its floor, whatever the data.
    #[test]
    fn atol_never_below_floor(
        values in prop::collection::vec(arb_any_value(), 0..40),
        magnitude in -50f64..50.0,
    ) {
        let baseline = TimeSeries::from_channel(values);
        let atol = adaptive_absolute_tolerance(&baseline, magnitude);
        prop_assert!(atol >= ATOL_MIN, "atol = {atol}");
    }

    /// A finite series always matches itself, with zero difference norms.
    #[test]
    fn identical_series_always_pass(series in arb_series(), r in 0f64..10.0, a in 0f64..10.0) {
        let verdicts = passing_channels(&series, &series, Tolerance::new(r, a));
        prop_assert_eq!(verdicts.len(), series.channels());
        prop_assert!(verdicts.iter().all(|ok| *ok));

        let norms = calculate_norms(&series, &series);
        for channel in 0..series.channels() {
            prop_assert_eq!(norms.get(channel, NormKind::MaxNorm), 0.0);
            prop_assert_eq!(norms.get(channel, NormKind::RelativeL2Norm), 0.0);
        }
    }

    /// Dropping samples makes every norm NaN and every channel fail.
    #[test]
    fn truncated_series_are_incomparable(series in arb_series()) {
        prop_assume!(series.samples() > 1);
        let channels = series.channels();
        let kept = (series.samples() - 1) * channels;
        let truncated =
            TimeSeries::new(series.samples() - 1, channels, series.as_slice()[..kept].to_vec()).unwrap();

        let norms = calculate_norms(&truncated, &series);
        prop_assert!(norms.is_incomparable());
        prop_assert!(passing_channels(&truncated, &series, Tolerance::new(1.0, 1.0)).iter().all(|ok| !ok));
    }
}
