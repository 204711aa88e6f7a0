//! Simulation core: alignment, valuation and milestone detection

pub mod align;
pub mod chart;
pub mod config;
pub mod error;
pub mod goals;
pub mod log;
pub mod month;
pub mod quote;
pub mod simulation;
pub mod table;
pub mod valuation;

// Re-export main types for cleaner imports
pub use chart::{ChartMode, ChartSink};
pub use error::SimulationError;
pub use month::Month;
pub use quote::{QuotePoint, QuoteSeries, QuoteSource};
pub use simulation::{SimulationReport, SimulationSettings, run_simulation};
