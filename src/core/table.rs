//! Rectangular month x currency price table built from aligned series.

use crate::core::error::{Result, SimulationError};
use crate::core::month::Month;
use crate::core::quote::QuoteSeries;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Closing prices indexed by month (rows) and currency (columns).
///
/// Every cell holds a price: a month only appears if every column has a quote
/// for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    months: Vec<Month>,
    currencies: Vec<String>,
    // Column-major: prices[column][row].
    prices: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Joins the series on month, keeping only months present in all of them.
    ///
    /// Empty series are excluded with a warning. Fails with
    /// [`SimulationError::NoUsableSeries`] when nothing usable remains.
    pub fn inner_join(series: &BTreeMap<String, QuoteSeries>) -> Result<Self> {
        let usable: Vec<(&String, &QuoteSeries)> = series
            .iter()
            .filter(|(currency, s)| {
                if s.is_empty() {
                    warn!(%currency, "Ignoring currency with no quotes");
                    false
                } else {
                    true
                }
            })
            .collect();

        let Some(((_, first), rest)) = usable.split_first() else {
            return Err(SimulationError::NoUsableSeries);
        };

        let mut common: BTreeSet<Month> = first.points().iter().map(|p| p.month).collect();
        for (_, s) in rest {
            common.retain(|m| s.has_month(*m));
        }
        if common.is_empty() {
            return Err(SimulationError::NoUsableSeries);
        }

        let months: Vec<Month> = common.into_iter().collect();
        let mut currencies = Vec::with_capacity(usable.len());
        let mut prices = Vec::with_capacity(usable.len());
        for (currency, s) in &usable {
            let column = months
                .iter()
                .map(|m| s.close_at(*m).ok_or(SimulationError::NoUsableSeries))
                .collect::<Result<Vec<f64>>>()?;
            debug!(%currency, rows = column.len(), dropped = s.len() - column.len(), "Joined column");
            currencies.push((*currency).clone());
            prices.push(column);
        }

        Ok(PriceTable {
            months,
            currencies,
            prices,
        })
    }

    /// Builds a table from explicit columns. Months must be strictly
    /// increasing and every column must have one price per month.
    pub fn from_columns(months: Vec<Month>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if months.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimulationError::InvalidMonth(
                "table months must be strictly increasing".to_string(),
            ));
        }
        if columns.iter().any(|(_, c)| c.len() != months.len()) {
            return Err(SimulationError::EmptyTable);
        }

        let (currencies, prices) = columns.into_iter().unzip();
        Ok(PriceTable {
            months,
            currencies,
            prices,
        })
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    pub fn row_count(&self) -> usize {
        self.months.len()
    }

    pub fn column_count(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty() || self.currencies.is_empty()
    }

    pub fn column(&self, currency: &str) -> Option<&[f64]> {
        self.currencies
            .iter()
            .position(|c| c == currency)
            .map(|idx| self.prices[idx].as_slice())
    }

    /// Iterates `(currency, prices)` in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.currencies
            .iter()
            .map(String::as_str)
            .zip(self.prices.iter().map(Vec::as_slice))
    }
}
