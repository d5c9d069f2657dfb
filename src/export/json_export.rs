use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::EnsembleResult;
use crate::export::Exporter;

pub const RESULT_FILE: &str = "result.json";

/// Writes the full result, per-region ballots included, as `result.json`.
///
/// The file is written next to its final name and renamed into place, so a
/// reader polling a batch output directory never sees a partial document.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            pretty: true,
        }
    }

    /// Single-line output, for feeding results into line-oriented tools.
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn render(&self, result: &EnsembleResult) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(result)
        } else {
            serde_json::to_string(result)
        };
        rendered.context("failed to serialize ensemble result")
    }
}

impl Exporter for JsonExporter {
    fn export(&self, result: &EnsembleResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        let data = self.render(result)?;
        let target = self.out_dir.join(RESULT_FILE);
        let staging = self.out_dir.join(format!(".{RESULT_FILE}.partial"));
        fs::write(&staging, data)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &target)
            .with_context(|| format!("failed to move result into {}", target.display()))?;
        Ok(())
    }
}
