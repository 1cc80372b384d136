use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::data_loader::read_records;
use crate::error::DataError;
use crate::models::MarketConditionsSummary;
use crate::series::{month_bounds, parse_timestamp, TimeSeries};

#[derive(Debug, Deserialize)]
struct MarketRecord {
    timestamp: String,
    price: f64,
}

/// One parsed market price sample.
#[derive(Debug, Clone, Copy)]
pub struct MarketPoint {
    pub timestamp: DateTime<Utc>,
    /// Electricity price, $/kWh
    pub price: f64,
}

/// Loads market price data from CSV or JSON and serves series views of it.
///
/// Mirrors the battery handler: one read on first access, cached afterwards.
pub struct MarketDataHandler {
    data_path: PathBuf,
    data: Option<Vec<MarketPoint>>,
}

impl MarketDataHandler {
    pub fn new(data_path: &Path) -> Self {
        Self {
            data_path: data_path.to_path_buf(),
            data: None,
        }
    }

    /// Price samples sorted ascending by timestamp, loading on first call.
    pub fn load(&mut self) -> Result<&[MarketPoint]> {
        if self.data.is_none() {
            self.data = Some(self.load_table()?);
        }
        Ok(self.data.as_deref().unwrap())
    }

    fn load_table(&self) -> Result<Vec<MarketPoint>> {
        let path = &self.data_path;
        let records: Vec<MarketRecord> = read_records(path)?;

        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let timestamp = parse_timestamp(&record.timestamp).map_err(|e| {
                DataError::load_failure(path, format!("bad timestamp '{}': {}", record.timestamp, e))
            })?;
            points.push(MarketPoint {
                timestamp,
                price: record.price,
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

    /// Electricity prices as a time series.
    pub fn price_series(&mut self) -> Result<TimeSeries> {
        let points = self.load()?;
        Ok(TimeSeries::from_points(
            points.iter().map(|p| (p.timestamp, p.price)).collect(),
        ))
    }

    /// Price statistics for the calendar month containing `month`.
    /// A month with no samples yields all-zero statistics.
    pub fn monthly_summary(&mut self, month: NaiveDate) -> Result<MarketConditionsSummary> {
        let points = self.load()?;
        let (start, end) = month_bounds(month);
        let prices: Vec<f64> = points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .map(|p| p.price)
            .collect();

        if prices.is_empty() {
            return Ok(MarketConditionsSummary {
                avg_price: 0.0,
                max_price: 0.0,
                min_price: 0.0,
                price_std: 0.0,
                peak_hours: 0,
                off_peak_hours: 0,
            });
        }

        let avg_price = prices.iter().sum::<f64>() / prices.len() as f64;
        Ok(MarketConditionsSummary {
            avg_price,
            max_price: prices.iter().copied().fold(f64::MIN, f64::max),
            min_price: prices.iter().copied().fold(f64::MAX, f64::min),
            price_std: sample_std(&prices, avg_price),
            peak_hours: prices.iter().filter(|&&p| p > avg_price).count(),
            off_peak_hours: prices.iter().filter(|&&p| p <= avg_price).count(),
        })
    }

    /// All prices split around the full-series mean: above it and at-or-below
    /// it. Both halves keep their original timestamps.
    pub fn price_periods(&mut self) -> Result<(TimeSeries, TimeSeries)> {
        let points = self.load()?;
        if points.is_empty() {
            return Ok((TimeSeries::new(), TimeSeries::new()));
        }

        let mean = points.iter().map(|p| p.price).sum::<f64>() / points.len() as f64;
        let peak = points
            .iter()
            .filter(|p| p.price > mean)
            .map(|p| (p.timestamp, p.price))
            .collect();
        let off_peak = points
            .iter()
            .filter(|p| p.price <= mean)
            .map(|p| (p.timestamp, p.price))
            .collect();
        Ok((
            TimeSeries::from_points(peak),
            TimeSeries::from_points(off_peak),
        ))
    }
}

/// Sample standard deviation (n - 1 denominator); 0.0 for fewer than two
/// samples.
fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, rows: &[&str]) -> PathBuf {
        let path = dir.path().join("prices.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "timestamp,price").unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        path
    }

    #[test]
    fn test_load_and_price_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            &[
                "2024-06-01 01:00:00,0.20",
                "2024-06-01 00:00:00,0.10",
            ],
        );

        let mut handler = MarketDataHandler::new(&path);
        let series = handler.price_series().unwrap();
        assert_eq!(series.values().collect::<Vec<_>>(), vec![0.10, 0.20]);
    }

    #[test]
    fn test_duplicate_timestamps_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            &["2024-06-01 00:00:00,0.10", "2024-06-01 00:00:00,0.20"],
        );

        let mut handler = MarketDataHandler::new(&path);
        assert!(handler.load().is_err());
    }

    #[test]
    fn test_monthly_summary_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            &[
                "2024-06-01 00:00:00,0.10",
                "2024-06-01 01:00:00,0.20",
                "2024-06-01 02:00:00,0.30",
                "2024-06-01 03:00:00,0.40",
                // July sample stays out of the June summary.
                "2024-07-01 00:00:00,9.99",
            ],
        );

        let mut handler = MarketDataHandler::new(&path);
        let summary = handler
            .monthly_summary(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();

        assert!((summary.avg_price - 0.25).abs() < 1e-9);
        assert!((summary.max_price - 0.40).abs() < 1e-9);
        assert!((summary.min_price - 0.10).abs() < 1e-9);
        // Sample std of [0.1, 0.2, 0.3, 0.4] is sqrt(0.05/3).
        assert!((summary.price_std - (0.05f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(summary.peak_hours, 2);
        assert_eq!(summary.off_peak_hours, 2);
    }

    #[test]
    fn test_monthly_summary_empty_month_is_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, &["2024-06-01 00:00:00,0.10"]);

        let mut handler = MarketDataHandler::new(&path);
        let summary = handler
            .monthly_summary(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();

        assert_eq!(summary.avg_price, 0.0);
        assert_eq!(summary.price_std, 0.0);
        assert_eq!(summary.peak_hours, 0);
        assert_eq!(summary.off_peak_hours, 0);
    }

    #[test]
    fn test_single_sample_has_zero_std() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, &["2024-06-01 00:00:00,0.10"]);

        let mut handler = MarketDataHandler::new(&path);
        let summary = handler
            .monthly_summary(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();
        assert_eq!(summary.price_std, 0.0);
    }

    #[test]
    fn test_price_periods_split_on_mean() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            &[
                "2024-06-01 00:00:00,0.10",
                "2024-06-01 01:00:00,0.20",
                "2024-06-01 02:00:00,0.60",
            ],
        );

        let mut handler = MarketDataHandler::new(&path);
        let (peak, off_peak) = handler.price_periods().unwrap();

        // Mean is 0.30; only the 0.60 sample sits above it.
        assert_eq!(peak.values().collect::<Vec<_>>(), vec![0.60]);
        assert_eq!(off_peak.values().collect::<Vec<_>>(), vec![0.10, 0.20]);
        assert_eq!(peak.len() + off_peak.len(), 3);
    }
}
