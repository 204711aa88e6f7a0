//! Finds the earliest month at which every remaining currency pair has a quote.
//!
//! The search walks forward one month at a time from a candidate start. A pair
//! with no quote in the candidate month is dropped for good, so later attempts
//! only consider the survivors. This converges on the pairs with the shortest
//! history and may discard a pair that would have had full coverage from a
//! slightly later month.

use crate::core::error::{Result, SimulationError};
use crate::core::month::Month;
use crate::core::quote::{QuoteSeries, QuoteSource};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Five years of monthly candidates.
pub const DEFAULT_MAX_ATTEMPTS: usize = 60;

/// Result of a successful alignment.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// First month for which every surviving pair has a quote.
    pub start: Month,
    /// Quotes from `start` to the end date, keyed by currency.
    pub series: BTreeMap<String, QuoteSeries>,
    /// Currencies dropped along the way, in the order they were dropped.
    pub dropped: Vec<String>,
}

/// Outcome of checking a single candidate month.
#[derive(Debug)]
pub enum Probe {
    /// Every pair has a quote in the candidate month.
    Aligned(BTreeMap<String, QuoteSeries>),
    /// Some pairs had no quote; `remaining` is the shrunken set to retry with.
    Retry {
        remaining: BTreeMap<String, String>,
        missing: Vec<String>,
    },
}

/// Checks one candidate month against the `available` pairs (currency -> ticker).
///
/// Fetch failures count as missing data.
#[instrument(skip(source, available, on_fetch), fields(candidate = %candidate, pairs = available.len()))]
pub async fn probe(
    source: &dyn QuoteSource,
    candidate: Month,
    end: NaiveDate,
    available: BTreeMap<String, String>,
    on_fetch: &(dyn Fn(&str, Month)),
) -> Probe {
    let mut missing = Vec::new();
    let mut fetched = BTreeMap::new();

    for (currency, ticker) in &available {
        on_fetch(ticker, candidate);
        let series = match source.fetch(ticker, candidate, end).await {
            Ok(series) => series,
            Err(e) => {
                warn!(%currency, %ticker, error = %e, "Quote fetch failed");
                QuoteSeries::empty()
            }
        };

        if series.has_month(candidate) {
            debug!(%currency, points = series.len(), "Pair has data at candidate month");
            fetched.insert(currency.clone(), series);
        } else {
            debug!(%currency, points = series.len(), "Pair missing at candidate month");
            missing.push(currency.clone());
        }
    }

    if missing.is_empty() {
        return Probe::Aligned(fetched);
    }

    let remaining = available
        .into_iter()
        .filter(|(currency, _)| !missing.contains(currency))
        .collect();
    Probe::Retry { remaining, missing }
}

/// Searches forward from `start` for the first month covered by every
/// remaining pair, trying at most `max_attempts` months.
///
/// `on_fetch` is called before each quote request with the ticker and the
/// candidate month, for progress reporting.
pub async fn align_start(
    source: &dyn QuoteSource,
    pairs: &BTreeMap<String, String>,
    start: Month,
    end: NaiveDate,
    max_attempts: usize,
    on_fetch: &(dyn Fn(&str, Month)),
) -> Result<Alignment> {
    if pairs.is_empty() {
        return Err(SimulationError::NoUsableSeries);
    }

    let mut candidate = start;
    let mut available = pairs.clone();
    let mut dropped = Vec::new();

    for attempt in 1..=max_attempts {
        info!(%candidate, attempt, pairs = available.len(), "Probing candidate start month");

        match probe(source, candidate, end, available, on_fetch).await {
            Probe::Aligned(series) => {
                info!(start = %candidate, pairs = series.len(), "Found common start month");
                return Ok(Alignment {
                    start: candidate,
                    series,
                    dropped,
                });
            }
            Probe::Retry { remaining, missing } => {
                for currency in &missing {
                    warn!(%currency, month = %candidate, "Dropping pair without data at candidate month");
                }
                dropped.extend(missing);

                if remaining.is_empty() {
                    warn!(attempt, "Every pair was dropped");
                    return Err(SimulationError::NoUsableSeries);
                }
                available = remaining;
                candidate = candidate.succ();
            }
        }
    }

    Err(SimulationError::NoCommonStartDate {
        attempts: max_attempts,
        start,
    })
}
