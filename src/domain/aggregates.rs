//! Price statistics derived from a product's price history.

use serde::{Deserialize, Serialize};

use super::product::PriceHistoryEntry;

/// Lowest, highest and mean price over an entire history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceAggregates {
    pub lowest: f64,
    pub highest: f64,
    pub average: f64,
}

impl PriceAggregates {
    /// Aggregates of a history holding exactly one price
    pub fn single(price: f64) -> Self {
        Self {
            lowest: price,
            highest: price,
            average: price,
        }
    }
}

/// Computes min, max and arithmetic mean over every price in `history`.
///
/// Timestamps are ignored and the result does not depend on entry order.
/// Returns `None` for an empty history.
pub fn aggregate(history: &[PriceHistoryEntry]) -> Option<PriceAggregates> {
    let first = history.first()?.price;

    let (lowest, highest, sum) = history.iter().fold(
        (first, first, 0.0_f64),
        |(lowest, highest, sum), entry| {
            (lowest.min(entry.price), highest.max(entry.price), sum + entry.price)
        },
    );

    // Summation rounding can push the mean a hair outside [lowest, highest].
    let average = (sum / history.len() as f64).clamp(lowest, highest);

    Some(PriceAggregates {
        lowest,
        highest,
        average,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn history(prices: &[f64]) -> Vec<PriceHistoryEntry> {
        let now = Utc::now();
        prices
            .iter()
            .map(|price| PriceHistoryEntry::new(*price, now))
            .collect()
    }

    #[test]
    fn empty_history_has_no_aggregates() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn single_entry_yields_that_price_everywhere() {
        let stats = aggregate(&history(&[42.5])).unwrap();
        assert_eq!(stats, PriceAggregates::single(42.5));
    }

    #[test]
    fn computes_min_max_and_mean() {
        let stats = aggregate(&history(&[30.0, 10.0, 20.0])).unwrap();
        assert_eq!(stats.lowest, 10.0);
        assert_eq!(stats.highest, 30.0);
        assert!((stats.average - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn repeated_prices_keep_average_inside_bounds() {
        let stats = aggregate(&history(&[0.1, 0.1, 0.1])).unwrap();
        assert_eq!(stats.average, 0.1);
    }

    proptest! {
        #[test]
        fn every_price_lies_between_lowest_and_highest(
            prices in prop::collection::vec(0.01f64..100_000.0, 1..64)
        ) {
            let stats = aggregate(&history(&prices)).unwrap();
            for price in &prices {
                prop_assert!(stats.lowest <= *price && *price <= stats.highest);
            }
            prop_assert!(stats.lowest <= stats.average && stats.average <= stats.highest);
        }

        #[test]
        fn result_is_independent_of_entry_order(
            prices in prop::collection::vec(0.01f64..100_000.0, 1..32)
        ) {
            let forward = aggregate(&history(&prices)).unwrap();
            let mut reversed = prices.clone();
            reversed.reverse();
            let backward = aggregate(&history(&reversed)).unwrap();

            prop_assert_eq!(forward.lowest, backward.lowest);
            prop_assert_eq!(forward.highest, backward.highest);
            prop_assert!((forward.average - backward.average).abs() <= forward.highest * 1e-9);
        }
    }
}
