use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::data_loader::read_records;
use crate::error::DataError;
use crate::models::BatteryOperationsSummary;
use crate::series::{month_bounds, parse_timestamp, TimeSeries};

/// One raw telemetry row as it appears on disk.
#[derive(Debug, Deserialize)]
struct BatteryRecord {
    timestamp: String,
    charge_power: f64,
    discharge_power: f64,
    state_of_charge: f64,
}

/// One parsed telemetry sample from the battery management system.
#[derive(Debug, Clone, Copy)]
pub struct BatteryPoint {
    pub timestamp: DateTime<Utc>,
    /// Energy charged during the interval, kWh
    pub charge_power: f64,
    /// Energy discharged during the interval, kWh
    pub discharge_power: f64,
    /// State of charge, percent
    pub state_of_charge: f64,
}

/// Loads battery telemetry from CSV or JSON and serves series views of it.
///
/// The file is read once on first access and cached for the lifetime of the
/// handler.
pub struct BatteryDataHandler {
    data_path: PathBuf,
    data: Option<Vec<BatteryPoint>>,
}

impl BatteryDataHandler {
    pub fn new(data_path: &Path) -> Self {
        Self {
            data_path: data_path.to_path_buf(),
            data: None,
        }
    }

    /// Telemetry sorted ascending by timestamp, loading it on first call.
    pub fn load(&mut self) -> Result<&[BatteryPoint]> {
        if self.data.is_none() {
            self.data = Some(self.load_table()?);
        }
        Ok(self.data.as_deref().unwrap())
    }

    fn load_table(&self) -> Result<Vec<BatteryPoint>> {
        let path = &self.data_path;
        let records: Vec<BatteryRecord> = read_records(path)?;

        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let timestamp = parse_timestamp(&record.timestamp).map_err(|e| {
                DataError::load_failure(path, format!("bad timestamp '{}': {}", record.timestamp, e))
            })?;
            points.push(BatteryPoint {
                timestamp,
                charge_power: record.charge_power,
                discharge_power: record.discharge_power,
                state_of_charge: record.state_of_charge,
            });
        }

        points.sort_by_key(|p| p.timestamp);
        if let Some(pair) = points.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(DataError::load_failure(
                path,
                format!("duplicate timestamp {}", pair[0].timestamp),
            )
            .into());
        }
        Ok(points)
    }

    /// Charging power as a time series.
    pub fn charge_series(&mut self) -> Result<TimeSeries> {
        let points = self.load()?;
        Ok(TimeSeries::from_points(
            points.iter().map(|p| (p.timestamp, p.charge_power)).collect(),
        ))
    }

    /// Discharging power as a time series.
    pub fn discharge_series(&mut self) -> Result<TimeSeries> {
        let points = self.load()?;
        Ok(TimeSeries::from_points(
            points
                .iter()
                .map(|p| (p.timestamp, p.discharge_power))
                .collect(),
        ))
    }

    /// State of charge as a time series.
    pub fn soc_series(&mut self) -> Result<TimeSeries> {
        let points = self.load()?;
        Ok(TimeSeries::from_points(
            points
                .iter()
                .map(|p| (p.timestamp, p.state_of_charge))
                .collect(),
        ))
    }

    /// Operations statistics for the calendar month containing `month`.
    /// A month with no samples yields all-zero statistics.
    pub fn monthly_summary(&mut self, month: NaiveDate) -> Result<BatteryOperationsSummary> {
        let points = self.load()?;
        let (start, end) = month_bounds(month);
        let window: Vec<&BatteryPoint> = points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .collect();

        if window.is_empty() {
            return Ok(BatteryOperationsSummary {
                total_charge: 0.0,
                total_discharge: 0.0,
                avg_soc: 0.0,
                max_soc: 0.0,
                min_soc: 0.0,
                charge_cycles: 0,
                discharge_cycles: 0,
            });
        }

        let soc_sum: f64 = window.iter().map(|p| p.state_of_charge).sum();
        Ok(BatteryOperationsSummary {
            total_charge: window.iter().map(|p| p.charge_power).sum(),
            total_discharge: window.iter().map(|p| p.discharge_power).sum(),
            avg_soc: soc_sum / window.len() as f64,
            max_soc: window
                .iter()
                .map(|p| p.state_of_charge)
                .fold(f64::MIN, f64::max),
            min_soc: window
                .iter()
                .map(|p| p.state_of_charge)
                .fold(f64::MAX, f64::min),
            charge_cycles: window.iter().filter(|p| p.charge_power > 0.0).count(),
            discharge_cycles: window.iter().filter(|p| p.discharge_power > 0.0).count(),
        })
    }
}
