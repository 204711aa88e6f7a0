//! First month at which the accumulated total reaches each milestone.

use crate::core::month::Month;

/// Targets reported when the configuration does not list any.
pub const DEFAULT_MILESTONES: [f64; 5] = [1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 1_000_000_000.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Milestone {
    pub threshold: f64,
    /// First month with `total >= threshold`, or `None` if never reached.
    pub reached: Option<Month>,
}

impl Milestone {
    /// `YYYY-MM` label of the month reached.
    pub fn label(&self) -> Option<String> {
        self.reached.map(|m| m.to_string())
    }
}

/// Scans `total` (aligned with `months`) once per threshold, each from the
/// start of the series.
pub fn find_milestones(months: &[Month], total: &[f64], thresholds: &[f64]) -> Vec<Milestone> {
    thresholds
        .iter()
        .map(|&threshold| Milestone {
            threshold,
            reached: total
                .iter()
                .position(|v| *v >= threshold)
                .and_then(|idx| months.get(idx).copied()),
        })
        .collect()
}
