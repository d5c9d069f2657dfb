pub mod html_debug_export;
pub mod json_export;
pub mod text_export;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::model::EnsembleResult;

pub use html_debug_export::HtmlDebugExporter;
pub use json_export::JsonExporter;
pub use text_export::TextExporter;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Text,
    Html,
}

pub trait Exporter {
    fn export(&self, result: &EnsembleResult) -> Result<()>;
}
