//! Chart output abstractions

use crate::core::simulation::SimulationReport;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// What the chart plots on its y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    /// Each currency indexed to 100 at the start, against a flat home-currency baseline.
    #[default]
    Percentage,
    /// Home-currency value of each share and of the total.
    Value,
}

impl Display for ChartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChartMode::Percentage => "percentage",
                ChartMode::Value => "value",
            }
        )
    }
}

impl FromStr for ChartMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "percentage" | "pct" => Ok(ChartMode::Percentage),
            "value" => Ok(ChartMode::Value),
            _ => Err(anyhow::anyhow!("Invalid chart mode: {}", s)),
        }
    }
}

/// Consumes a finished simulation and produces a visual artifact.
pub trait ChartSink {
    fn render(&self, report: &SimulationReport) -> Result<()>;
}
