//! Property tests for scaling, windowing, ranking and forecast clamping

use approx::relative_eq;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rusty_potential::features::{FeatureMatrix, FeatureWindower, Scaler};
use rusty_potential::models::clamp_to_band;
use rusty_potential::ranking::RankingAggregator;
use rusty_potential::types::{Bar, BarSeries, Forecast};

fn series_from_closes(closes: &[f64]) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(start + Duration::days(i as i64), c * 0.99, c * 1.02, c * 0.97, c, 1e5 + c))
        .collect();
    BarSeries::new("PROP", bars)
}

proptest! {
    #[test]
    fn prop_scaler_round_trips_close(
        closes in prop::collection::vec(1.0f64..1_000.0, 2..80),
        price in 1.0f64..1_000.0,
    ) {
        let series = series_from_closes(&closes);
        let scaler = Scaler::fit(&FeatureMatrix::from_series(&series)).unwrap();

        let decoded = scaler.inverse_close(scaler.encode_close(price));
        prop_assert!(relative_eq!(decoded, price, max_relative = 1e-9));
    }

    #[test]
    fn prop_scaled_features_stay_in_unit_range(closes in prop::collection::vec(1.0f64..500.0, 1..60)) {
        let matrix = FeatureMatrix::from_series(&series_from_closes(&closes));
        let scaled = Scaler::fit(&matrix).unwrap().transform(&matrix).unwrap();

        prop_assert!(scaled.iter().all(|&v| (-1e-12..=1.0 + 1e-12).contains(&v)));
    }

    #[test]
    fn prop_window_counts(len in 0usize..90, time_step in 1usize..30) {
        let closes: Vec<f64> = (0..len).map(|i| 50.0 + i as f64).collect();
        let series = series_from_closes(&closes);
        let windower = FeatureWindower::new(time_step);

        match windower.prepare_training(&series) {
            Ok(set) => {
                prop_assert!(len > time_step);
                prop_assert_eq!(set.samples.len(), len - time_step);
                prop_assert_eq!(set.samples.windows.dim().1, time_step);

                let inference = windower.prepare_inference(&series, &set.scaler).unwrap();
                prop_assert_eq!(inference.dim().0, len - time_step + 1);
            }
            Err(_) => prop_assert!(len <= time_step),
        }
    }

    #[test]
    fn prop_rankings_are_sorted_and_bounded(
        basis_points in prop::collection::btree_set(-1_000i32..1_000, 0..40),
        n in 1usize..12,
    ) {
        let forecasts: Vec<Forecast> = basis_points
            .iter()
            .enumerate()
            .map(|(i, &bp)| {
                let p = bp as f64 / 1_000.0;
                Forecast::new(format!("T{i}"), p, 10.0, 10.0 * (1.0 + p))
            })
            .collect();
        let ranking = RankingAggregator::new(n).rank(&forecasts);

        prop_assert_eq!(ranking.top.len(), forecasts.len().min(n));
        prop_assert_eq!(ranking.bottom.len(), forecasts.len().min(n));
        prop_assert!(ranking.top.windows(2).all(|w| w[0].potential >= w[1].potential));
        prop_assert!(ranking.bottom.windows(2).all(|w| w[0].potential <= w[1].potential));

        if forecasts.len() >= 2 * n {
            let overlap = ranking
                .top
                .iter()
                .filter(|t| ranking.bottom.iter().any(|b| b.ticker == t.ticker))
                .count();
            prop_assert_eq!(overlap, 0);
        }
    }

    #[test]
    fn prop_clamped_forecast_stays_in_band(value in -1e4f64..1e4, anchor in 0.01f64..1e4) {
        let clamped = clamp_to_band(value, anchor, 0.8, 1.2);
        prop_assert!(clamped >= anchor * 0.8 - 1e-9);
        prop_assert!(clamped <= anchor * 1.2 + 1e-9);
    }
}
