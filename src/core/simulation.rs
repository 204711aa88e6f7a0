//! End-to-end simulation: align, join, value, find milestones.

use crate::core::align::{self, Alignment};
use crate::core::error::Result;
use crate::core::goals::{self, Milestone};
use crate::core::month::Month;
use crate::core::quote::QuoteSource;
use crate::core::table::PriceTable;
use crate::core::valuation::{self, Deposit, Valuation};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

/// Inputs for one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub home_currency: String,
    /// Currency identifier -> quote ticker.
    pub pairs: BTreeMap<String, String>,
    /// Candidate start month; the aligner may move it forward.
    pub start: Month,
    /// Exclusive end date for quotes.
    pub end: NaiveDate,
    pub deposit: Deposit,
    /// Ascending milestone thresholds in home-currency major units.
    pub milestones: Vec<f64>,
    pub max_attempts: usize,
}

/// Everything a run produces, consumed by reporting and charting.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub home_currency: String,
    pub deposit: Deposit,
    pub requested_start: Month,
    pub start: Month,
    /// Quote count per included currency, before the join.
    pub series_lengths: BTreeMap<String, usize>,
    pub dropped: Vec<String>,
    pub valuation: Valuation,
    pub milestones: Vec<Milestone>,
}

impl SimulationReport {
    /// Annualised growth in percent of the total value across the simulated span.
    pub fn total_growth(&self) -> Option<f64> {
        let (first, last) = (self.valuation.months.first()?, self.valuation.months.last()?);
        valuation::annualized_growth(
            self.valuation.initial_total()?,
            self.valuation.final_total()?,
            first.months_until(last),
        )
    }
}

pub async fn run_simulation(
    source: &dyn QuoteSource,
    settings: &SimulationSettings,
    on_fetch: &(dyn Fn(&str, Month)),
) -> Result<SimulationReport> {
    let Alignment {
        start,
        series,
        dropped,
    } = align::align_start(
        source,
        &settings.pairs,
        settings.start,
        settings.end,
        settings.max_attempts,
        on_fetch,
    )
    .await?;

    let series_lengths = series
        .iter()
        .map(|(currency, s)| (currency.clone(), s.len()))
        .collect();

    let table = PriceTable::inner_join(&series)?;
    info!(
        rows = table.row_count(),
        currencies = table.column_count(),
        "Built aligned price table"
    );

    let valuation = valuation::simulate(&table, &settings.deposit)?;
    let milestones =
        goals::find_milestones(&valuation.months, &valuation.total, &settings.milestones);

    Ok(SimulationReport {
        home_currency: settings.home_currency.clone(),
        deposit: settings.deposit,
        requested_start: settings.start,
        start,
        series_lengths,
        dropped,
        valuation,
        milestones,
    })
}
