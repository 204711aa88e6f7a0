pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::chart::HtmlChart;
use crate::core::config::{AppConfig, Overrides};
use crate::providers::{CachingQuoteSource, YahooQuoteSource};
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Simulate(Overrides),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxsim starting...");

    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Simulate(overrides) => {
            config.apply(overrides);
            config.validate()?;

            let source =
                CachingQuoteSource::new(YahooQuoteSource::from_config(&config.providers.yahoo));
            let chart = HtmlChart::new(&config.chart.path, config.chart.mode);

            cli::simulate::run(&config, &source, &chart).await?;
            println!("Chart saved to {}", chart.path().display());
            Ok(())
        }
    }
}
