use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use fxsim::core::log::init_logging;
use fxsim::core::{ChartMode, Month, config::Overrides};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct SimulateArgs {
    /// First month to try, as YYYY-MM
    #[arg(long)]
    start: Option<Month>,

    /// Exclusive end date for quotes, as YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Initial deposit in minor units of the home currency (e.g. cents)
    #[arg(long)]
    deposit: Option<i64>,

    /// Chart mode: percentage or value
    #[arg(long)]
    chart_mode: Option<ChartMode>,

    /// Where to write the HTML chart
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl From<SimulateArgs> for Overrides {
    fn from(args: SimulateArgs) -> Overrides {
        Overrides {
            start: args.start,
            end: args.end,
            deposit_minor_units: args.deposit,
            chart_mode: args.chart_mode,
            output: args.output,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Simulate the deposit over the configured currency pairs
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxsim::cli::setup::setup(),
        Some(Commands::Simulate(args)) => {
            fxsim::run_command(
                fxsim::AppCommand::Simulate(args.into()),
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
