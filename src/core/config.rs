use crate::core::align::DEFAULT_MAX_ATTEMPTS;
use crate::core::chart::ChartMode;
use crate::core::goals::DEFAULT_MILESTONES;
use crate::core::month::Month;
use crate::core::simulation::SimulationSettings;
use crate::core::valuation::Deposit;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Currency pairs either as `id: ticker` entries or as a plain list of ids
/// whose tickers are derived from the home currency.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum PairsConfig {
    Tickers(BTreeMap<String, String>),
    Currencies(Vec<String>),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub yahoo: YahooProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChartConfig {
    #[serde(default)]
    pub mode: ChartMode,
    #[serde(default = "default_chart_path")]
    pub path: PathBuf,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            mode: ChartMode::default(),
            path: default_chart_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_home_currency")]
    pub home_currency: String,
    pub pairs: PairsConfig,
    #[serde(default = "default_start")]
    pub start: Month,
    #[serde(default = "default_end")]
    pub end: NaiveDate,
    #[serde(default)]
    pub deposit: Deposit,
    #[serde(default = "default_milestones")]
    pub milestones: Vec<f64>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub start: Option<Month>,
    pub end: Option<NaiveDate>,
    pub deposit_minor_units: Option<i64>,
    pub chart_mode: Option<ChartMode>,
    pub output: Option<PathBuf>,
}

fn default_home_currency() -> String {
    "BRL".to_string()
}

fn default_start() -> Month {
    Month::from_date(NaiveDate::from_ymd_opt(2015, 8, 1).unwrap_or_default())
}

fn default_end() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

fn default_milestones() -> Vec<f64> {
    DEFAULT_MILESTONES.to_vec()
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_chart_path() -> PathBuf {
    PathBuf::from("fx_simulation.html")
}

fn default_retries() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "fxsim", "fxsim")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Currency id -> ticker, deriving `{ID}{HOME}=X` for bare ids.
    pub fn pairs(&self) -> BTreeMap<String, String> {
        match &self.pairs {
            PairsConfig::Tickers(map) => map.clone(),
            PairsConfig::Currencies(ids) => ids
                .iter()
                .map(|id| {
                    let id = id.to_uppercase();
                    let ticker = format!("{id}{}=X", self.home_currency.to_uppercase());
                    (id, ticker)
                })
                .collect(),
        }
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(start) = overrides.start {
            self.start = start;
        }
        if let Some(end) = overrides.end {
            self.end = end;
        }
        if let Some(minor_units) = overrides.deposit_minor_units {
            self.deposit.minor_units = minor_units;
        }
        if let Some(mode) = overrides.chart_mode {
            self.chart.mode = mode;
        }
        if let Some(path) = overrides.output {
            self.chart.path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pairs().is_empty() {
            bail!("Configuration must list at least one currency pair");
        }
        if self.deposit.minor_units <= 0 {
            bail!("Deposit must be positive, got {}", self.deposit);
        }
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if self.start.first_day() >= self.end {
            bail!("Start month {} must be before end date {}", self.start, self.end);
        }
        if self.milestones.iter().any(|m| !m.is_finite()) {
            bail!("Milestones must be finite numbers");
        }
        Ok(())
    }

    pub fn settings(&self) -> SimulationSettings {
        let mut milestones = self.milestones.clone();
        milestones.sort_by(f64::total_cmp);

        SimulationSettings {
            home_currency: self.home_currency.clone(),
            pairs: self.pairs(),
            start: self.start,
            end: self.end,
            deposit: self.deposit,
            milestones,
            max_attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
home_currency: "BRL"
pairs:
  USD: "USDBRL=X"
  EUR: "EURBRL=X"
  JPY: "JPYBRL=X"
start: "2015-08"
end: "2025-05-01"
deposit:
  minor_units: 20000
  scale: 2
milestones: [10000, 1000]
max_attempts: 12
chart:
  mode: value
  path: "out.html"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
    retries: 0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        let pairs = config.pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs["JPY"], "JPYBRL=X");
        assert_eq!(config.start.to_string(), "2015-08");
        assert_eq!(config.end, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(config.deposit, Deposit::new(20_000, 2));
        assert_eq!(config.max_attempts, 12);
        assert_eq!(config.chart.mode, ChartMode::Value);
        assert_eq!(config.chart.path, PathBuf::from("out.html"));
        assert_eq!(config.providers.yahoo.base_url, "http://example.com/yahoo");
        assert_eq!(config.providers.yahoo.retries, 0);
        assert_eq!(config.providers.yahoo.retry_delay_ms, 500);
        assert!(config.validate().is_ok());

        let settings = config.settings();
        assert_eq!(settings.milestones, vec![1000.0, 10000.0]);
        assert_eq!(settings.max_attempts, 12);
    }

    #[test]
    fn test_defaults_and_derived_tickers() {
        let yaml_str = r#"
pairs: ["usd", "EUR"]
end: "2025-05-01"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        let pairs = config.pairs();
        assert_eq!(pairs["USD"], "USDBRL=X");
        assert_eq!(pairs["EUR"], "EURBRL=X");
        assert_eq!(config.home_currency, "BRL");
        assert_eq!(config.start.to_string(), "2015-08");
        assert_eq!(config.deposit, Deposit::default());
        assert_eq!(config.milestones, DEFAULT_MILESTONES.to_vec());
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.chart.mode, ChartMode::Percentage);
        assert_eq!(
            config.providers.yahoo.base_url,
            "https://query1.finance.yahoo.com"
        );
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config: AppConfig = serde_yaml::from_str("pairs: [USD]\nend: \"2025-05-01\"").unwrap();
        config.apply(Overrides {
            start: Some("2018-01".parse().unwrap()),
            end: None,
            deposit_minor_units: Some(500),
            chart_mode: Some(ChartMode::Value),
            output: Some(PathBuf::from("custom.html")),
        });

        assert_eq!(config.start.to_string(), "2018-01");
        assert_eq!(config.deposit.minor_units, 500);
        assert_eq!(config.deposit.scale, 2);
        assert_eq!(config.chart.mode, ChartMode::Value);
        assert_eq!(config.chart.path, PathBuf::from("custom.html"));
    }

    #[test]
    fn test_validation_failures() {
        let mut config: AppConfig = serde_yaml::from_str("pairs: []\nend: \"2025-05-01\"").unwrap();
        assert!(config.validate().is_err());

        config.pairs = PairsConfig::Currencies(vec!["USD".to_string()]);
        assert!(config.validate().is_ok());

        config.deposit.minor_units = 0;
        assert!(config.validate().is_err());
        config.deposit.minor_units = 100;

        config.start = "2026-01".parse().unwrap();
        assert!(config.validate().is_err());
    }
}
