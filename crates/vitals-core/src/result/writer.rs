use super::types::BatchResult;
use crate::Result;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub struct ResultWriter;

impl ResultWriter {
    /// File name a batch is saved under, derived from its timestamp
    pub fn file_name(batch: &BatchResult) -> String {
        format!("crash_data_{}.json", batch.timestamp.format("%Y%m%d_%H%M%S"))
    }

    /// Write a batch to a file
    pub fn to_file(batch: &BatchResult, path: &Path) -> Result<()> {
        tracing::debug!("Writing results to: {}", path.display());

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, batch)?;

        tracing::info!(
            "Wrote results for {} apps to {}",
            batch.apps.len(),
            path.display()
        );

        Ok(())
    }

    /// Write a batch into `dir` under its timestamped name, returning the full path
    pub fn to_dir(batch: &BatchResult, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(batch));
        Self::to_file(batch, &path)?;
        Ok(path)
    }

    pub fn to_string(batch: &BatchResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(batch)?)
    }
}
