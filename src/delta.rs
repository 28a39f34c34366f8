//! Snapshot delta calculation
//!
//! Pure functions describing how the external market moved between two
//! polled snapshots of the same runner. All three functions follow the same
//! union rule: merge both inputs into a price-keyed map, default an absent
//! price to zero, subtract or add elementwise, and drop all-zero rows.
//! Keyed merges over `BTreeMap` keep the rule auditable and the output
//! sorted by price with at most one entry per price.

use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

use crate::types::{PriceDelta, PriceTradedVolume, RunnerPrice, SIZE_EPSILON};

/// Per-price difference between two price-level snapshots.
///
/// For the union of prices appearing in either input, computes
/// `(new_back - prev_back, new_lay - prev_lay)`; entries where both
/// components are zero are dropped.
pub fn calculate_runner_prices_delta(
    new: &[RunnerPrice],
    previous: &[RunnerPrice],
) -> Vec<RunnerPrice> {
    let mut merged: BTreeMap<OrderedFloat<f64>, (f64, f64)> = BTreeMap::new();

    for price in new {
        let entry = merged.entry(OrderedFloat(price.price)).or_default();
        entry.0 += price.total_unmatched_back;
        entry.1 += price.total_unmatched_lay;
    }
    for price in previous {
        let entry = merged.entry(OrderedFloat(price.price)).or_default();
        entry.0 -= price.total_unmatched_back;
        entry.1 -= price.total_unmatched_lay;
    }

    merged
        .into_iter()
        .filter(|(_, (back, lay))| back.abs() > SIZE_EPSILON || lay.abs() > SIZE_EPSILON)
        .map(|(price, (back, lay))| RunnerPrice::new(price.0, back, lay))
        .collect()
}

/// Per-price difference between two traded-volume snapshots.
///
/// Same union rule as [`calculate_runner_prices_delta`] for the single
/// matched-amount component; zero deltas are dropped.
pub fn calculate_traded_volume_delta(
    new: &[PriceTradedVolume],
    previous: &[PriceTradedVolume],
) -> Vec<PriceTradedVolume> {
    let mut merged: BTreeMap<OrderedFloat<f64>, f64> = BTreeMap::new();

    for volume in new {
        *merged.entry(OrderedFloat(volume.price)).or_default() += volume.total_matched_amount;
    }
    for volume in previous {
        *merged.entry(OrderedFloat(volume.price)).or_default() -= volume.total_matched_amount;
    }

    merged
        .into_iter()
        .filter(|(_, amount)| amount.abs() > SIZE_EPSILON)
        .map(|(price, amount)| PriceTradedVolume::new(price.0, amount))
        .collect()
}

/// Merge a price-level delta and a traded-volume delta into one combined
/// record per price.
///
/// The traded-volume delta is added to **both** the to-back and the to-lay
/// components: an aggregated snapshot cannot attribute newly matched volume
/// to consumption of resting back versus lay orders, so it is treated as
/// pressure on both channels and the synthesizer attributes it
/// symmetrically. Example: price delta `(2, 0)` and volume delta `5` at
/// 1.9 combine to `(7, 5)`.
pub fn combine(
    prices_delta: &[RunnerPrice],
    traded_volume_delta: &[PriceTradedVolume],
) -> Vec<PriceDelta> {
    let mut merged: BTreeMap<OrderedFloat<f64>, (f64, f64)> = BTreeMap::new();

    for price in prices_delta {
        let entry = merged.entry(OrderedFloat(price.price)).or_default();
        entry.0 += price.total_unmatched_back;
        entry.1 += price.total_unmatched_lay;
    }
    for volume in traded_volume_delta {
        let entry = merged.entry(OrderedFloat(volume.price)).or_default();
        entry.0 += volume.total_matched_amount;
        entry.1 += volume.total_matched_amount;
    }

    merged
        .into_iter()
        .map(|(price, (to_back, to_lay))| PriceDelta {
            price: price.0,
            to_back,
            to_lay,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prices_delta_zero_is_empty() {
        let snapshot = vec![
            RunnerPrice::new(1.9, 5.0, 0.0),
            RunnerPrice::new(2.0, 3.0, 4.0),
        ];
        assert!(calculate_runner_prices_delta(&snapshot, &snapshot).is_empty());
        assert!(calculate_runner_prices_delta(&[], &[]).is_empty());
    }

    #[test]
    fn test_prices_delta_union_defaults_to_zero() {
        let new = vec![RunnerPrice::new(2.0, 3.0, 0.0)];
        let previous = vec![RunnerPrice::new(1.9, 0.0, 2.0)];

        let delta = calculate_runner_prices_delta(&new, &previous);
        assert_eq!(delta.len(), 2);
        // price only in previous shows up negated
        assert_relative_eq!(delta[0].price, 1.9);
        assert_relative_eq!(delta[0].total_unmatched_back, 0.0);
        assert_relative_eq!(delta[0].total_unmatched_lay, -2.0);
        // price only in new passes through
        assert_relative_eq!(delta[1].price, 2.0);
        assert_relative_eq!(delta[1].total_unmatched_back, 3.0);
        assert_relative_eq!(delta[1].total_unmatched_lay, 0.0);
    }

    #[test]
    fn test_prices_delta_elementwise() {
        let new = vec![RunnerPrice::new(1.9, 7.0, 1.0)];
        let previous = vec![RunnerPrice::new(1.9, 5.0, 4.0)];

        let delta = calculate_runner_prices_delta(&new, &previous);
        assert_eq!(delta.len(), 1);
        assert_relative_eq!(delta[0].total_unmatched_back, 2.0);
        assert_relative_eq!(delta[0].total_unmatched_lay, -3.0);
    }

    #[test]
    fn test_traded_volume_delta() {
        let new = vec![
            PriceTradedVolume::new(1.9, 5.0),
            PriceTradedVolume::new(2.0, 8.0),
        ];
        let previous = vec![PriceTradedVolume::new(2.0, 8.0)];

        let delta = calculate_traded_volume_delta(&new, &previous);
        assert_eq!(delta.len(), 1);
        assert_relative_eq!(delta[0].price, 1.9);
        assert_relative_eq!(delta[0].total_matched_amount, 5.0);

        assert!(calculate_traded_volume_delta(&new, &new).is_empty());
    }

    #[test]
    fn test_combine_adds_traded_to_both_channels() {
        let prices_delta = vec![RunnerPrice::new(1.9, 2.0, 0.0)];
        let traded_delta = vec![PriceTradedVolume::new(1.9, 5.0)];

        let combined = combine(&prices_delta, &traded_delta);
        assert_eq!(combined.len(), 1);
        assert_relative_eq!(combined[0].price, 1.9);
        assert_relative_eq!(combined[0].to_back, 7.0);
        assert_relative_eq!(combined[0].to_lay, 5.0);
    }

    #[test]
    fn test_combine_union_with_missing_sides() {
        let prices_delta = vec![RunnerPrice::new(2.0, -3.0, 1.0)];
        let traded_delta = vec![PriceTradedVolume::new(2.1, 4.0)];

        let combined = combine(&prices_delta, &traded_delta);
        assert_eq!(combined.len(), 2);
        assert_relative_eq!(combined[0].price, 2.0);
        assert_relative_eq!(combined[0].to_back, -3.0);
        assert_relative_eq!(combined[0].to_lay, 1.0);
        assert_relative_eq!(combined[1].price, 2.1);
        assert_relative_eq!(combined[1].to_back, 4.0);
        assert_relative_eq!(combined[1].to_lay, 4.0);
    }

    #[test]
    fn test_level_growth_with_trade_full_pipeline() {
        // levels 7@1.9 vs 5@1.9 to back, traded 5 vs 0
        let new_prices = vec![RunnerPrice::new(1.9, 7.0, 0.0)];
        let prev_prices = vec![RunnerPrice::new(1.9, 5.0, 0.0)];
        let new_traded = vec![PriceTradedVolume::new(1.9, 5.0)];
        let prev_traded = vec![PriceTradedVolume::new(1.9, 0.0)];

        let prices_delta = calculate_runner_prices_delta(&new_prices, &prev_prices);
        assert_eq!(prices_delta, vec![RunnerPrice::new(1.9, 2.0, 0.0)]);

        let traded_delta = calculate_traded_volume_delta(&new_traded, &prev_traded);
        assert_eq!(traded_delta, vec![PriceTradedVolume::new(1.9, 5.0)]);

        let combined = combine(&prices_delta, &traded_delta);
        assert_eq!(
            combined,
            vec![PriceDelta {
                price: 1.9,
                to_back: 7.0,
                to_lay: 5.0
            }]
        );
    }
}
