//! Aggregator service for folding a week of summaries into totals

use crate::types::{AggregatedTotals, DailyPoint, Dimension, WeekSummary};

/// Aggregator for computing week-level coding statistics
pub struct Aggregator;

impl Aggregator {
    /// Fold every day of the week into totals. Pure: the input is only read.
    pub fn aggregate(week: &WeekSummary) -> AggregatedTotals {
        let mut totals = AggregatedTotals::default();

        for day in &week.data {
            for dimension in Dimension::ALL {
                let acc = totals.dimension_mut(dimension);
                for entry in day.entries(dimension) {
                    acc.add(&entry.name, entry.total_seconds);
                }
            }

            let seconds = day.grand_total_seconds();
            totals.total_seconds = totals.total_seconds.saturating_add(seconds);
            totals.daily_series.push(DailyPoint {
                date: day.date(),
                seconds,
            });
        }

        totals
    }
}
