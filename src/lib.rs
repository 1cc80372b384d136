pub mod arbitrage;
pub mod battery_data;
pub mod calculator;
pub mod data_loader;
pub mod error;
pub mod market_data;
pub mod models;
pub mod series;
pub mod tariff;

pub use arbitrage::{ArbitrageDetector, ChargeEvent, DischargeEvent, LowestPriorChargePrice, PairingPolicy};
pub use battery_data::{BatteryDataHandler, BatteryPoint};
pub use calculator::{compute_breakdown, SavingsCalculator};
pub use error::DataError;
pub use market_data::{MarketDataHandler, MarketPoint};
pub use models::{
    ArbitrageOpportunity, BatteryOperationsSummary, MarketConditionsSummary, MonthlySavingsReport,
    SavingsBreakdown, SavingsConfig, DEFAULT_PEAK_SHAVING_FACTOR,
};
pub use series::{align, month_bounds, parse_timestamp, AlignedWindow, TimeSeries};
pub use tariff::{RateKind, TariffRate, TariffSchedule, TimePeriod, Weekday};
