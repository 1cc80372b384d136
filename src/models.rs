use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default fraction of the observed discharge peak assumed to be shaved off
/// the site's demand. Placeholder until a dispatch optimization model supplies
/// a measured figure.
pub const DEFAULT_PEAK_SHAVING_FACTOR: f64 = 0.20;

/// Tunable model constants for the savings calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsConfig {
    /// Fraction of the peak assumed shaved by battery dispatch, 0.0 to 1.0
    pub peak_shaving_factor: f64,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            peak_shaving_factor: DEFAULT_PEAK_SHAVING_FACTOR,
        }
    }
}

/// A discharge interval priced above the charge interval that filled it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    /// Timestamp of the discharge slot
    pub timestamp: DateTime<Utc>,
    pub charge_price: f64,
    pub discharge_price: f64,
    /// Energy discharged in the slot, kWh
    pub energy: f64,
    /// discharge_price - charge_price, always positive
    pub price_difference: f64,
}

/// Itemized bill savings over an aligned charge/discharge/price window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsBreakdown {
    pub energy_cost_savings: f64,
    pub demand_charge_savings: f64,
    pub other_savings: f64,
    pub total_savings: f64,
    pub energy_cost_reduction_pct: f64,
    pub peak_demand_reduction_pct: f64,
    pub arbitrage_opportunities: Vec<ArbitrageOpportunity>,
    pub number_of_opportunities: usize,
    pub average_savings_per_opportunity: f64,
}

/// Battery operations statistics for one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryOperationsSummary {
    /// Total energy charged, kWh
    pub total_charge: f64,
    /// Total energy discharged, kWh
    pub total_discharge: f64,
    /// Average state of charge, percent
    pub avg_soc: f64,
    pub max_soc: f64,
    pub min_soc: f64,
    /// Intervals with any charging activity
    pub charge_cycles: usize,
    /// Intervals with any discharging activity
    pub discharge_cycles: usize,
}

/// Market price statistics for one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConditionsSummary {
    /// Average price, $/kWh
    pub avg_price: f64,
    pub max_price: f64,
    pub min_price: f64,
    /// Sample standard deviation of prices
    pub price_std: f64,
    /// Intervals priced above the monthly average
    pub peak_hours: usize,
    /// Intervals priced at or below the monthly average
    pub off_peak_hours: usize,
}

/// Complete monthly report: operations and market summaries plus the
/// savings breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySavingsReport {
    /// Analysis month, YYYY-MM
    pub month: String,
    pub battery_operations: BatteryOperationsSummary,
    pub market_conditions: MarketConditionsSummary,
    pub savings_breakdown: SavingsBreakdown,
    /// Duplicate of savings_breakdown.total_savings for quick consumption
    pub total_savings: f64,
}
