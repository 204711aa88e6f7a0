//! Error types for the simulation core

use crate::core::month::Month;
use thiserror::Error;

/// Failures that escape the simulation core.
///
/// A single pair missing at one candidate month is not represented here: the
/// aligner absorbs it by dropping the pair.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("No common start date found after {attempts} attempts starting at {start}")]
    NoCommonStartDate { attempts: usize, start: Month },

    #[error("No usable quote series left to simulate")]
    NoUsableSeries,

    #[error("Price table has no rows or no currencies")]
    EmptyTable,

    #[error("Invalid price {price} for {currency} in the first month")]
    InvalidPrice { currency: String, price: f64 },

    #[error("Invalid deposit: {0}")]
    InvalidDeposit(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(String),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
