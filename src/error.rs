use std::path::PathBuf;

use thiserror::Error;

/// Failure conditions raised while ingesting tariff and telemetry inputs.
///
/// Degenerate-but-valid data (empty series intersections, zero denominators,
/// empty month windows) is never an error; those cases produce zeroed metrics
/// downstream instead.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported file format: {path:?} (expected .csv or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("malformed tariff data: {reason}")]
    MalformedTariffData { reason: String },

    #[error("failed to load {path:?}: {cause}")]
    DataLoadFailure { path: PathBuf, cause: String },
}

impl DataError {
    /// Wrap a lower-level loading failure together with the offending path.
    pub fn load_failure(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Self::DataLoadFailure {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn malformed_tariff(reason: impl ToString) -> Self {
        Self::MalformedTariffData {
            reason: reason.to_string(),
        }
    }
}
