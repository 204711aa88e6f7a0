//! Month-by-month value of a deposit split evenly across currencies.

use crate::core::error::{Result, SimulationError};
use crate::core::month::Month;
use crate::core::table::PriceTable;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::debug;

/// Initial deposit as an integer count of minor units (e.g. cents) with the
/// number of decimal places of the home currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub minor_units: i64,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_scale() -> u32 {
    2
}

impl Deposit {
    pub fn new(minor_units: i64, scale: u32) -> Self {
        Deposit { minor_units, scale }
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        Decimal::try_new(self.minor_units, self.scale)
            .map_err(|e| SimulationError::InvalidDeposit(e.to_string()))
    }

    /// Deposit in major units of the home currency.
    pub fn amount(&self) -> Result<f64> {
        let amount = self
            .to_decimal()?
            .to_f64()
            .ok_or_else(|| SimulationError::InvalidDeposit(self.to_string()))?;
        if amount <= 0.0 {
            return Err(SimulationError::InvalidDeposit(format!(
                "{self} must be positive"
            )));
        }
        Ok(amount)
    }
}

impl Default for Deposit {
    fn default() -> Self {
        Deposit {
            minor_units: 20_000,
            scale: default_scale(),
        }
    }
}

impl Display for Deposit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_decimal() {
            Ok(d) => write!(f, "{d}"),
            Err(_) => write!(f, "{} (scale {})", self.minor_units, self.scale),
        }
    }
}

/// One currency's share of the deposit over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub currency: String,
    /// Foreign-currency units bought in the first month.
    pub units: f64,
    /// Home-currency value of the units, one entry per month.
    pub values: Vec<f64>,
}

impl Holding {
    /// Values indexed to 100 at the first month.
    pub fn percentage(&self) -> Vec<f64> {
        match self.values.first() {
            Some(&base) if base > 0.0 => self.values.iter().map(|v| v / base * 100.0).collect(),
            _ => Vec::new(),
        }
    }

    pub fn final_value(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Output of [`simulate`]: per-currency value columns and their row-wise total.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub months: Vec<Month>,
    /// Home-currency amount allocated to each currency in the first month.
    pub allocation: f64,
    pub holdings: Vec<Holding>,
    pub total: Vec<f64>,
}

impl Valuation {
    pub fn initial_total(&self) -> Option<f64> {
        self.total.first().copied()
    }

    pub fn final_total(&self) -> Option<f64> {
        self.total.last().copied()
    }
}

/// Compound annual growth rate, in percent, of a value going from `begin` to
/// `end` over `months` months. `None` for spans under a year or non-positive
/// values; annualising a shorter span raises the ratio past one and can
/// overflow.
pub fn annualized_growth(begin: f64, end: f64, months: i64) -> Option<f64> {
    if months < 12 || begin <= 0.0 || end <= 0.0 {
        return None;
    }
    let begin_bal = Decimal::from_f64(begin)?;
    let end_bal = Decimal::from_f64(end)?;
    let n_years = Decimal::from(months) / Decimal::from(12);

    let rate = cagr(begin_bal, end_bal, n_years);
    (rate * Decimal::from(100)).to_f64()
}

/// Splits `deposit` evenly across the table's currencies at first-month prices
/// and values the resulting units at every month.
pub fn simulate(table: &PriceTable, deposit: &Deposit) -> Result<Valuation> {
    if table.is_empty() {
        return Err(SimulationError::EmptyTable);
    }
    let amount = deposit.amount()?;
    let allocation = amount / table.column_count() as f64;

    let mut holdings = Vec::with_capacity(table.column_count());
    for (currency, prices) in table.columns() {
        let first = prices[0];
        if !first.is_finite() || first <= 0.0 {
            return Err(SimulationError::InvalidPrice {
                currency: currency.to_string(),
                price: first,
            });
        }

        let units = allocation / first;
        debug!(%currency, units, first_price = first, "Allocated deposit share");
        holdings.push(Holding {
            currency: currency.to_string(),
            units,
            values: prices.iter().map(|p| units * p).collect(),
        });
    }

    let total = (0..table.row_count())
        .map(|row| holdings.iter().map(|h| h.values[row]).sum())
        .collect();

    Ok(Valuation {
        months: table.months().to_vec(),
        allocation,
        holdings,
        total,
    })
}
