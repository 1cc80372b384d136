use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use log::info;
use std::fs;
use std::path::Path;

use bess_savings_calculator::{MonthlySavingsReport, SavingsCalculator};

#[derive(Parser)]
#[command(name = "bess_savings_calculator")]
#[command(about = "Calculate monthly bill savings from battery storage operations")]
struct Args {
    /// Path to the parsed tariff rate table (JSON)
    #[arg(long)]
    tariff: String,

    /// Path to the battery telemetry file (CSV or JSON)
    #[arg(long)]
    battery_data: String,

    /// Path to the market price file (CSV or JSON)
    #[arg(long)]
    market_data: String,

    /// Month to analyze (YYYY-MM); defaults to the current month
    #[arg(short, long)]
    month: Option<String>,

    /// Output path for the JSON report
    #[arg(short, long, default_value = "savings_report.json")]
    output: String,
}

fn parse_month(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("month must be in YYYY-MM format, got '{}'", raw))
}

fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

fn display_report(report: &MonthlySavingsReport) {
    println!();
    println!("Battery Storage Bill Savings Analysis");
    println!("=====================================");
    println!("Analysis month: {}", report.month);

    println!();
    println!("Battery Operations");
    println!("------------------");
    let ops = &report.battery_operations;
    println!("Total energy charged:    {:.2} kWh", ops.total_charge);
    println!("Total energy discharged: {:.2} kWh", ops.total_discharge);
    println!("Average state of charge: {}", format_percentage(ops.avg_soc));
    println!("Charge cycles:           {}", ops.charge_cycles);
    println!("Discharge cycles:        {}", ops.discharge_cycles);

    println!();
    println!("Market Conditions");
    println!("-----------------");
    let market = &report.market_conditions;
    println!("Average price:  {}/kWh", format_currency(market.avg_price));
    println!("Highest price:  {}/kWh", format_currency(market.max_price));
    println!("Lowest price:   {}/kWh", format_currency(market.min_price));
    println!("Peak intervals:     {}", market.peak_hours);
    println!("Off-peak intervals: {}", market.off_peak_hours);

    println!();
    println!("Bill Savings");
    println!("------------");
    let breakdown = &report.savings_breakdown;
    println!("Total savings:          {}", format_currency(report.total_savings));
    println!("Energy cost savings:    {}", format_currency(breakdown.energy_cost_savings));
    println!("Demand charge savings:  {}", format_currency(breakdown.demand_charge_savings));
    println!("Other savings:          {}", format_currency(breakdown.other_savings));
    println!(
        "Energy cost reduction:  {}",
        format_percentage(breakdown.energy_cost_reduction_pct)
    );
    println!(
        "Peak demand reduction:  {}",
        format_percentage(breakdown.peak_demand_reduction_pct)
    );

    println!();
    println!("Arbitrage Opportunities");
    println!("-----------------------");
    println!("Opportunities found: {}", breakdown.number_of_opportunities);
    if breakdown.number_of_opportunities > 0 {
        println!(
            "Average savings per opportunity: {}",
            format_currency(breakdown.average_savings_per_opportunity)
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Check inputs up front so a typo fails before any parsing work.
    for path in [&args.tariff, &args.battery_data, &args.market_data] {
        if !Path::new(path).exists() {
            anyhow::bail!("input file not found: {}", path);
        }
    }

    let month = args.month.as_deref().map(parse_month).transpose()?;

    info!("Starting savings analysis");
    let mut calculator = SavingsCalculator::new(
        Path::new(&args.tariff),
        Path::new(&args.battery_data),
        Path::new(&args.market_data),
    );
    let report = calculator.calculate_monthly_savings(month)?;

    display_report(&report);

    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&args.output, json)?;
    println!();
    println!("Full report saved to: {}", args.output);

    Ok(())
}
