use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::EnsembleResult;
use crate::export::Exporter;

/// Writes the transcription alone, one region winner per line.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn format_result(result: &EnsembleResult) -> String {
        let mut text = result
            .reconciliation
            .outcomes()
            .filter(|outcome| !outcome.is_empty())
            .map(|outcome| outcome.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

impl Exporter for TextExporter {
    fn export(&self, result: &EnsembleResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("transcription.txt");
        fs::write(path, Self::format_result(result))?;
        Ok(())
    }
}
