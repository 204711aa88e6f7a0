//! Monthly quote series and the source abstraction that produces them

use crate::core::month::Month;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Closing price of one currency pair for one calendar month, in home-currency
/// units per unit of foreign currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotePoint {
    pub month: Month,
    pub close: f64,
}

/// Ordered monthly closes for a single pair.
///
/// Points are strictly increasing by month and every price is finite and
/// positive. The series may be empty or start later than requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSeries {
    points: Vec<QuotePoint>,
}

impl QuoteSeries {
    /// Builds a series from raw observations. Unusable prices are discarded and
    /// when a month appears more than once the last observation wins.
    pub fn new(points: impl IntoIterator<Item = QuotePoint>) -> Self {
        let mut raw: Vec<QuotePoint> = points
            .into_iter()
            .filter(|p| p.close.is_finite() && p.close > 0.0)
            .collect();
        raw.sort_by_key(|p| p.month);

        let mut deduped: Vec<QuotePoint> = Vec::with_capacity(raw.len());
        for point in raw {
            match deduped.last_mut() {
                Some(last) if last.month == point.month => *last = point,
                _ => deduped.push(point),
            }
        }

        QuoteSeries { points: deduped }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[QuotePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_month(&self) -> Option<Month> {
        self.points.first().map(|p| p.month)
    }

    pub fn last_month(&self) -> Option<Month> {
        self.points.last().map(|p| p.month)
    }

    pub fn close_at(&self, month: Month) -> Option<f64> {
        self.points
            .binary_search_by_key(&month, |p| p.month)
            .ok()
            .map(|idx| self.points[idx].close)
    }

    pub fn has_month(&self, month: Month) -> bool {
        self.close_at(month).is_some()
    }

    /// Points from `start` onward whose month begins before the exclusive `end` date.
    pub fn between(&self, start: Month, end: NaiveDate) -> Self {
        QuoteSeries {
            points: self
                .points
                .iter()
                .filter(|p| p.month >= start && p.month.first_day() < end)
                .copied()
                .collect(),
        }
    }
}

/// Supplies monthly closing prices for a ticker.
///
/// `end` is exclusive. An unknown ticker or a range with no data may be
/// reported either as an empty series or as an error; callers treat both as
/// "no data".
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, ticker: &str, start: Month, end: NaiveDate) -> Result<QuoteSeries>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(s: &str) -> Month {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_sorts_dedupes_and_filters() {
        let series = QuoteSeries::new([
            QuotePoint { month: month("2020-03"), close: 3.0 },
            QuotePoint { month: month("2020-01"), close: 1.0 },
            QuotePoint { month: month("2020-02"), close: 0.0 },
            QuotePoint { month: month("2020-03"), close: 3.5 },
            QuotePoint { month: month("2020-04"), close: f64::NAN },
        ]);

        assert_eq!(series.len(), 2);
        assert_eq!(series.first_month(), Some(month("2020-01")));
        assert_eq!(series.close_at(month("2020-03")), Some(3.5));
        assert!(!series.has_month(month("2020-02")));
        assert!(!series.has_month(month("2020-04")));
    }

    #[test]
    fn test_between_slices_by_start_and_exclusive_end() {
        let series = QuoteSeries::new(
            (1..=6).map(|m| QuotePoint { month: Month::new(2020, m).unwrap(), close: m as f64 }),
        );
        let end = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let slice = series.between(month("2020-02"), end);

        assert_eq!(slice.first_month(), Some(month("2020-02")));
        assert_eq!(slice.last_month(), Some(month("2020-04")));
        assert_eq!(slice.len(), 3);
    }

    #[test]
    fn test_empty_series() {
        let series = QuoteSeries::empty();
        assert!(series.is_empty());
        assert_eq!(series.first_month(), None);
        assert_eq!(series.close_at(month("2020-01")), None);
    }
}
