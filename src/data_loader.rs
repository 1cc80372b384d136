use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Result;
use log::debug;
use serde::de::DeserializeOwned;

use crate::error::DataError;

/// Read every record from a tabular CSV or JSON file, dispatching on the
/// file extension. JSON files hold an array of objects with the same fields
/// as the CSV columns.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let records = match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => read_csv(path)?,
        Some("json") => read_json(path)?,
        _ => return Err(DataError::UnsupportedFormat { path: path.to_path_buf() }.into()),
    };
    debug!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DataError::load_failure(path, &e))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: T = row.map_err(|e| DataError::load_failure(path, &e))?;
        records.push(record);
    }
    Ok(records)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| DataError::load_failure(path, &e))?;
    let records = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| DataError::load_failure(path, &e))?;
    Ok(records)
}
