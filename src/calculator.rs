use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use log::{debug, info};

use crate::arbitrage::ArbitrageDetector;
use crate::battery_data::BatteryDataHandler;
use crate::market_data::MarketDataHandler;
use crate::models::{MonthlySavingsReport, SavingsBreakdown, SavingsConfig};
use crate::series::{align, AlignedWindow};
use crate::tariff::{RateKind, TariffSchedule};

/// Itemize bill savings over an aligned charge/discharge/price window.
///
/// Pure function of its inputs. Degenerate windows (empty, all-zero) produce
/// zeroed metrics rather than errors; the only failure mode is a tariff that
/// fails shape validation.
pub fn compute_breakdown(
    aligned: &AlignedWindow,
    tariff: &TariffSchedule,
    config: &SavingsConfig,
    detector: &ArbitrageDetector,
) -> Result<SavingsBreakdown> {
    tariff.validate()?;

    // Energy cost: discharge offsets consumption at the prevailing price,
    // charging buys it back.
    let discharge_value: f64 = aligned
        .discharge
        .iter()
        .zip(&aligned.price)
        .map(|(d, p)| d * p)
        .sum();
    let charge_cost: f64 = aligned
        .charge
        .iter()
        .zip(&aligned.price)
        .map(|(c, p)| c * p)
        .sum();
    let energy_cost_savings = discharge_value - charge_cost;

    // Demand charge: first declared demand-peak rate against the slice of the
    // observed peak assumed shaved by dispatch.
    let peak_rate = tariff
        .first_rate(RateKind::DemandPeak)
        .map(|rate| rate.value)
        .unwrap_or(0.0);
    let peak_without = aligned.discharge.iter().fold(0.0f64, |a, &b| a.max(b));
    let peak_with = peak_without * (1.0 - config.peak_shaving_factor);
    let demand_charge_savings = (peak_without - peak_with) * peak_rate;

    // Ancillary services and grid support revenue are not modeled yet.
    let other_savings = 0.0;

    let total_savings = energy_cost_savings + demand_charge_savings + other_savings;

    let energy_cost_reduction_pct = if charge_cost > 0.0 {
        energy_cost_savings / charge_cost * 100.0
    } else {
        0.0
    };

    let peak_demand_reduction_pct = if peak_without > 0.0 {
        let mean_discharge =
            aligned.discharge.iter().sum::<f64>() / aligned.discharge.len() as f64;
        peak_without / (peak_without + mean_discharge) * 100.0
    } else {
        0.0
    };

    let arbitrage_opportunities = detector.detect(aligned);
    let number_of_opportunities = arbitrage_opportunities.len();
    let arbitrage_total: f64 = arbitrage_opportunities
        .iter()
        .map(|opp| opp.price_difference * opp.energy)
        .sum();
    let average_savings_per_opportunity = if number_of_opportunities > 0 {
        arbitrage_total / number_of_opportunities as f64
    } else {
        0.0
    };
    debug!(
        "Breakdown over {} aligned intervals: {} arbitrage opportunities",
        aligned.len(),
        number_of_opportunities
    );

    Ok(SavingsBreakdown {
        energy_cost_savings,
        demand_charge_savings,
        other_savings,
        total_savings,
        energy_cost_reduction_pct,
        peak_demand_reduction_pct,
        arbitrage_opportunities,
        number_of_opportunities,
        average_savings_per_opportunity,
    })
}

/// End-to-end monthly savings analysis over a tariff document and two
/// telemetry files.
///
/// Each input is loaded once on first use and cached for the lifetime of the
/// calculator, so repeated invocations reuse the same parsed data.
pub struct SavingsCalculator {
    tariff_path: PathBuf,
    battery: BatteryDataHandler,
    market: MarketDataHandler,
    tariff: Option<TariffSchedule>,
    config: SavingsConfig,
    detector: ArbitrageDetector,
}

impl SavingsCalculator {
    pub fn new(tariff_path: &Path, battery_data_path: &Path, market_data_path: &Path) -> Self {
        Self {
            tariff_path: tariff_path.to_path_buf(),
            battery: BatteryDataHandler::new(battery_data_path),
            market: MarketDataHandler::new(market_data_path),
            tariff: None,
            config: SavingsConfig::default(),
            detector: ArbitrageDetector::default(),
        }
    }

    /// Replace the default model constants.
    pub fn with_config(mut self, config: SavingsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default charge/discharge pairing policy.
    pub fn with_detector(mut self, detector: ArbitrageDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Assemble the monthly report. `month` may be any date inside the month
    /// of interest; `None` means the current month.
    ///
    /// The operations and market summaries cover the requested month. The
    /// savings breakdown runs over the full range the three series jointly
    /// cover, which can extend beyond that month.
    pub fn calculate_monthly_savings(
        &mut self,
        month: Option<NaiveDate>,
    ) -> Result<MonthlySavingsReport> {
        let month = month.unwrap_or_else(|| Utc::now().date_naive());
        info!("Calculating savings for {}", month.format("%Y-%m"));

        let battery_operations = self.battery.monthly_summary(month)?;
        let market_conditions = self.market.monthly_summary(month)?;

        let charge = self.battery.charge_series()?;
        let discharge = self.battery.discharge_series()?;
        let price = self.market.price_series()?;
        let aligned = align(&charge, &discharge, &price);
        debug!(
            "Aligned {} battery and {} price samples into {} shared intervals",
            charge.len(),
            price.len(),
            aligned.len()
        );

        if self.tariff.is_none() {
            self.tariff = Some(TariffSchedule::from_path(&self.tariff_path)?);
        }
        let tariff = self.tariff.as_ref().unwrap();

        let savings_breakdown = compute_breakdown(&aligned, tariff, &self.config, &self.detector)?;
        let total_savings = savings_breakdown.total_savings;

        Ok(MonthlySavingsReport {
            month: month.format("%Y-%m").to_string(),
            battery_operations,
            market_conditions,
            savings_breakdown,
            total_savings,
        })
    }
}
