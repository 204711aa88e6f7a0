use super::ui;
use crate::core::{
    ChartSink, Month, QuoteSource, SimulationReport, config::AppConfig, run_simulation,
    valuation::{self, Holding},
};
use anyhow::Result;
use comfy_table::{Attribute, Cell};
use tracing::info;

/// Runs the simulation for `config`, prints the report and renders the chart.
pub async fn run(
    config: &AppConfig,
    source: &dyn QuoteSource,
    chart: &dyn ChartSink,
) -> Result<SimulationReport> {
    info!("Searching for the first month where every currency pair has quotes...");
    let settings = config.settings();

    let spinner = ui::new_spinner();
    spinner.set_message("Searching for a common start month...");
    let on_fetch = |ticker: &str, month: Month| {
        spinner.set_message(format!("Fetching {ticker} from {month}"));
    };
    let result = run_simulation(source, &settings, &on_fetch).await;
    spinner.finish_and_clear();
    let report = result?;

    display_report(&report);
    chart.render(&report)?;

    Ok(report)
}

fn display_report(report: &SimulationReport) {
    println!(
        "\n{}",
        ui::style_text("Currency diversification simulation", ui::StyleType::Title)
    );
    if report.start == report.requested_start {
        println!("Start month: {}", report.start);
    } else {
        println!(
            "Start month adjusted to: {} {}",
            report.start,
            ui::style_text(
                &format!("(requested {})", report.requested_start),
                ui::StyleType::Subtle
            )
        );
    }

    println!("Currencies included:");
    for (currency, rows) in &report.series_lengths {
        println!(" - {currency}, {rows} months");
    }
    for currency in &report.dropped {
        println!(
            " - {}",
            ui::style_text(
                &format!("Ignoring {currency}: no quotes at the candidate start month"),
                ui::StyleType::Error
            )
        );
    }

    println!(
        "{} {} {}",
        ui::style_text("Initial deposit:", ui::StyleType::TotalLabel),
        report.deposit,
        report.home_currency
    );

    ui::print_separator();
    display_milestones(report);
    ui::print_separator();
    display_holdings(report);
}

fn display_milestones(report: &SimulationReport) {
    println!("Estimated months to reach each milestone:");
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&format!("Milestone ({})", report.home_currency)),
        ui::header_cell("Reached"),
    ]);

    for milestone in &report.milestones {
        let reached = match milestone.label() {
            Some(label) => Cell::new(label),
            None => ui::na_cell("not reached in historical data"),
        };
        table.add_row(vec![ui::amount_cell(milestone.threshold), reached]);
    }

    println!("{table}");
}

fn holding_row(holding: &Holding, span_months: i64) -> Vec<Cell> {
    let initial = holding.values.first().copied().unwrap_or_default();
    let last = holding.final_value().unwrap_or_default();
    let first_price = if holding.units > 0.0 { initial / holding.units } else { 0.0 };
    let last_price = if holding.units > 0.0 { last / holding.units } else { 0.0 };

    vec![
        Cell::new(&holding.currency),
        Cell::new(format!("{:.4}", holding.units)),
        ui::amount_cell(first_price),
        ui::amount_cell(last_price),
        ui::amount_cell(last),
        change_or_na(initial, last),
        growth_or_na(initial, last, span_months),
    ]
}

fn change_or_na(initial: f64, last: f64) -> Cell {
    if initial > 0.0 {
        ui::change_cell((last / initial - 1.0) * 100.0)
    } else {
        ui::na_cell("N/A")
    }
}

fn growth_or_na(initial: f64, last: f64, span_months: i64) -> Cell {
    valuation::annualized_growth(initial, last, span_months)
        .map_or_else(|| ui::na_cell("N/A"), ui::change_cell)
}

fn display_holdings(report: &SimulationReport) {
    let valuation = &report.valuation;
    let span_months = match (valuation.months.first(), valuation.months.last()) {
        (Some(first), Some(last)) => first.months_until(last),
        _ => 0,
    };
    let last_month = valuation
        .months
        .last()
        .map_or_else(|| "N/A".to_string(), Month::to_string);

    println!("Value per currency at {last_month}:");
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Units"),
        ui::header_cell("First price"),
        ui::header_cell("Last price"),
        ui::header_cell(&format!("Value ({})", report.home_currency)),
        ui::header_cell("Change"),
        ui::header_cell("CAGR"),
    ]);

    for holding in &valuation.holdings {
        table.add_row(holding_row(holding, span_months));
    }

    if valuation.holdings.len() > 1 {
        let initial = valuation.initial_total().unwrap_or_default();
        let last = valuation.final_total().unwrap_or_default();
        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            ui::amount_cell(last).add_attribute(Attribute::Bold),
            change_or_na(initial, last),
            report
                .total_growth()
                .map_or_else(|| ui::na_cell("N/A"), ui::change_cell),
        ]);
    }

    println!("{table}");
    if let Some(line) = final_value_line(report) {
        println!("{line}");
    }
}

fn final_value_line(report: &SimulationReport) -> Option<String> {
    let last = report.valuation.final_total()?;
    Some(format!(
        "{} {}",
        ui::style_text("Final value:", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{} {}", ui::format_amount(last), report.home_currency),
            ui::StyleType::TotalValue
        )
    ))
}
