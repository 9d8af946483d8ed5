use super::types::BatchResult;
use crate::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct ResultReader;

impl ResultReader {
    /// Read and parse a saved batch document
    pub fn from_file(path: &Path) -> Result<BatchResult> {
        tracing::debug!("Reading results file from: {}", path.display());

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let batch: BatchResult = serde_json::from_reader(reader)?;

        tracing::info!("Parsed results for {} apps", batch.apps.len());

        Ok(batch)
    }

    pub fn from_str(content: &str) -> Result<BatchResult> {
        let batch: BatchResult = serde_json::from_str(content)?;
        Ok(batch)
    }

    /// Check that a batch document is internally consistent
    pub fn validate(batch: &BatchResult) -> Result<()> {
        if batch.date_range_days != 7 && batch.date_range_days != 30 {
            return Err(Error::UnsupportedWindow(batch.date_range_days));
        }

        for (key, app) in &batch.apps {
            if key != &app.app_key {
                return Err(Error::InvalidRegistry(format!(
                    "entry '{}' holds results for '{}'",
                    key, app.app_key
                )));
            }
        }

        if batch.apps.is_empty() {
            tracing::warn!("Results file contains no apps");
        }

        Ok(())
    }
}
