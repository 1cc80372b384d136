use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataError;

/// Kind of charge a tariff rate prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    EnergyPeak,
    EnergyPartialPeak,
    EnergyOffpeak,
    EnergySuperOffpeak,
    DemandPeak,
    DemandOffpeak,
    /// Kinds present in the source document that this engine does not price.
    #[serde(other)]
    Other,
}

/// A single priced entry from the tariff document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffRate {
    #[serde(rename = "type")]
    pub kind: RateKind,
    /// $/kWh for energy kinds, $/kW for demand kinds
    pub value: f64,
    /// Name of the time-of-use period this rate applies in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn weekdays() -> Vec<Weekday> {
        vec![
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
        ]
    }

    pub fn weekends() -> Vec<Weekday> {
        vec![Weekday::Saturday, Weekday::Sunday]
    }

    pub fn all_days() -> Vec<Weekday> {
        let mut days = Weekday::weekdays();
        days.extend(Weekday::weekends());
        days
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

/// A named time-of-use window.
///
/// Hours are whole clock hours: `start_hour` inclusive, `end_hour` exclusive.
/// A window with `start_hour > end_hour` wraps past midnight, so Off-Peak
/// 21:00-07:00 covers both late evening and early morning. Windows may
/// overlap between periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePeriod {
    pub name: String,
    pub start_hour: u8,
    pub end_hour: u8,
    pub applicable_days: Vec<Weekday>,
}

impl TimePeriod {
    /// Whether the timestamp falls on an applicable day inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if !self.applicable_days.contains(&Weekday::from(ts.weekday())) {
            return false;
        }
        let hour = ts.hour() as u8;
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Parsed tariff document: declared rates and time-of-use periods, plus
/// free-form conditions and metadata carried through from the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TariffSchedule {
    #[serde(default)]
    pub rates: Vec<TariffRate>,
    #[serde(default)]
    pub time_periods: Vec<TimePeriod>,
    #[serde(default)]
    pub conditions: BTreeMap<String, Value>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl TariffSchedule {
    /// Load and validate a rate table emitted by the tariff document parser.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| DataError::load_failure(path, &e))?;
        let schedule: TariffSchedule = serde_json::from_str(&raw)
            .map_err(|e| DataError::malformed_tariff(format!("{} in {:?}", e, path)))?;
        schedule.validate()?;
        Ok(schedule)
    }

    /// Shape validation of the declared rates and periods.
    pub fn validate(&self) -> Result<()> {
        for (idx, rate) in self.rates.iter().enumerate() {
            if !rate.value.is_finite() {
                return Err(
                    DataError::malformed_tariff(format!("rate #{} has a non-finite value", idx))
                        .into(),
                );
            }
        }
        for period in &self.time_periods {
            if period.name.is_empty() {
                return Err(DataError::malformed_tariff("time period with an empty name").into());
            }
            if period.start_hour > 23 || period.end_hour > 23 {
                return Err(DataError::malformed_tariff(format!(
                    "time period '{}' has hours outside 0-23",
                    period.name
                ))
                .into());
            }
        }
        Ok(())
    }

    /// First rate of the given kind in declared order.
    pub fn first_rate(&self, kind: RateKind) -> Option<&TariffRate> {
        self.rates.iter().find(|rate| rate.kind == kind)
    }

    /// First rate of the given kind whose time-of-use period covers `ts`.
    /// Rates without a period reference apply at any time.
    pub fn rate_at(&self, kind: RateKind, ts: DateTime<Utc>) -> Option<&TariffRate> {
        self.rates.iter().find(|rate| {
            rate.kind == kind
                && match &rate.period {
                    Some(name) => self.period(name).map(|p| p.contains(ts)).unwrap_or(false),
                    None => true,
                }
        })
    }

    pub fn period(&self, name: &str) -> Option<&TimePeriod> {
        self.time_periods.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::parse_timestamp;

    fn sample_schedule() -> TariffSchedule {
        TariffSchedule {
            rates: vec![
                TariffRate {
                    kind: RateKind::EnergyPeak,
                    value: 0.35424,
                    period: Some("Peak".to_string()),
                },
                TariffRate {
                    kind: RateKind::EnergyPartialPeak,
                    value: 0.25339,
                    period: Some("Partial-Peak".to_string()),
                },
                TariffRate {
                    kind: RateKind::EnergyOffpeak,
                    value: 0.18254,
                    period: Some("Off-Peak".to_string()),
                },
                TariffRate {
                    kind: RateKind::DemandPeak,
                    value: 18.50,
                    period: Some("Peak".to_string()),
                },
                TariffRate {
                    kind: RateKind::DemandPeak,
                    value: 21.00,
                    period: None,
                },
            ],
            time_periods: vec![
                TimePeriod {
                    name: "Peak".to_string(),
                    start_hour: 16,
                    end_hour: 21,
                    applicable_days: Weekday::weekdays(),
                },
                TimePeriod {
                    name: "Partial-Peak".to_string(),
                    start_hour: 7,
                    end_hour: 16,
                    applicable_days: Weekday::weekdays(),
                },
                TimePeriod {
                    name: "Off-Peak".to_string(),
                    start_hour: 21,
                    end_hour: 7,
                    applicable_days: Weekday::all_days(),
                },
            ],
            conditions: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_parse_tariff_document() {
        let raw = r#"{
            "rates": [
                {"type": "energy_peak", "value": 0.35424, "period": "Peak"},
                {"type": "demand_peak", "value": 18.50}
            ],
            "time_periods": [
                {"name": "Peak", "start_hour": 16, "end_hour": 21,
                 "applicable_days": ["monday", "tuesday", "wednesday", "thursday", "friday"]}
            ],
            "conditions": {"minimum_demand_kw": 50},
            "metadata": {"utility": "Sample Electric", "effective": "2024-01-01"}
        }"#;

        let schedule: TariffSchedule = serde_json::from_str(raw).unwrap();
        assert_eq!(schedule.rates.len(), 2);
        assert_eq!(schedule.rates[0].kind, RateKind::EnergyPeak);
        assert_eq!(schedule.rates[0].period.as_deref(), Some("Peak"));
        assert_eq!(schedule.rates[1].kind, RateKind::DemandPeak);
        assert!(schedule.rates[1].period.is_none());
        assert_eq!(schedule.time_periods[0].applicable_days.len(), 5);
        assert_eq!(schedule.conditions["minimum_demand_kw"], 50);
        schedule.validate().unwrap();
    }

    #[test]
    fn test_unknown_rate_kind_is_tolerated() {
        let raw = r#"{"rates": [{"type": "standby_charge", "value": 1.25}]}"#;
        let schedule: TariffSchedule = serde_json::from_str(raw).unwrap();
        assert_eq!(schedule.rates[0].kind, RateKind::Other);
    }

    #[test]
    fn test_missing_value_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tariff.json");
        std::fs::write(&path, r#"{"rates": [{"type": "demand_peak"}]}"#).unwrap();

        let err = TariffSchedule::from_path(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MalformedTariffData { .. })
        ));
    }

    #[test]
    fn test_hours_out_of_range_rejected() {
        let mut schedule = sample_schedule();
        schedule.time_periods[0].end_hour = 24;
        let err = schedule.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MalformedTariffData { .. })
        ));
    }

    #[test]
    fn test_non_finite_rate_rejected() {
        let mut schedule = sample_schedule();
        schedule.rates[0].value = f64::NAN;
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn test_first_rate_uses_declared_order() {
        let schedule = sample_schedule();
        let rate = schedule.first_rate(RateKind::DemandPeak).unwrap();
        assert!((rate.value - 18.50).abs() < 1e-12);
    }

    #[test]
    fn test_first_rate_none_when_kind_absent() {
        let schedule = sample_schedule();
        assert!(schedule.first_rate(RateKind::DemandOffpeak).is_none());
    }

    #[test]
    fn test_rate_at_respects_period_hours() {
        let schedule = sample_schedule();
        // 2024-06-03 is a Monday.
        let peak_ts = parse_timestamp("2024-06-03 17:00:00").unwrap();
        let morning_ts = parse_timestamp("2024-06-03 08:00:00").unwrap();

        let rate = schedule.rate_at(RateKind::EnergyPeak, peak_ts).unwrap();
        assert!((rate.value - 0.35424).abs() < 1e-12);
        assert!(schedule.rate_at(RateKind::EnergyPeak, morning_ts).is_none());
        let partial = schedule
            .rate_at(RateKind::EnergyPartialPeak, morning_ts)
            .unwrap();
        assert!((partial.value - 0.25339).abs() < 1e-12);
    }

    #[test]
    fn test_rate_at_overnight_wrap() {
        let schedule = sample_schedule();
        let late = parse_timestamp("2024-06-03 23:00:00").unwrap();
        let early = parse_timestamp("2024-06-03 03:00:00").unwrap();
        let midday = parse_timestamp("2024-06-03 12:00:00").unwrap();

        assert!(schedule.rate_at(RateKind::EnergyOffpeak, late).is_some());
        assert!(schedule.rate_at(RateKind::EnergyOffpeak, early).is_some());
        assert!(schedule.rate_at(RateKind::EnergyOffpeak, midday).is_none());
    }

    #[test]
    fn test_rate_at_weekday_filter() {
        let schedule = sample_schedule();
        // 2024-06-08 is a Saturday; Peak only applies on weekdays.
        let saturday_evening = parse_timestamp("2024-06-08 17:00:00").unwrap();
        assert!(schedule
            .rate_at(RateKind::EnergyPeak, saturday_evening)
            .is_none());
    }

    #[test]
    fn test_rate_without_period_applies_any_time() {
        let mut schedule = sample_schedule();
        schedule.rates.remove(3); // drop the period-scoped demand rate
        let midnight = parse_timestamp("2024-06-03 00:00:00").unwrap();
        let rate = schedule.rate_at(RateKind::DemandPeak, midnight).unwrap();
        assert!((rate.value - 21.00).abs() < 1e-12);
    }
}
