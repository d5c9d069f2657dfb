use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::core::config::EngineSpec;
use crate::core::geometry::BBox;
use crate::core::model::{Detection, ImageRef};
use crate::engine::BackendAdapter;

/// Box shapes emitted by the recognizer bridges: corner pairs, or a 4-point
/// polygon as produced by quad-based detectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawBox {
    Corners([f32; 4]),
    Quad([[f32; 2]; 4]),
}

impl RawBox {
    fn to_bbox(&self) -> BBox {
        match self {
            RawBox::Corners(c) => BBox::from(*c),
            RawBox::Quad(points) => BBox::from_quad(points),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrToken {
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub bbox: Option<RawBox>,
}

fn default_confidence() -> f32 {
    0.5
}

/// Runs an external recognizer as `program [args..] --image <path>` and reads
/// a JSON token array from its stdout. The child is killed if the call is
/// dropped before it exits.
#[derive(Debug, Clone)]
pub struct CommandAdapter {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    relative_coords: bool,
}

impl CommandAdapter {
    pub fn new(name: impl Into<String>, program: PathBuf) -> Self {
        Self {
            name: name.into(),
            program,
            args: Vec::new(),
            relative_coords: false,
        }
    }

    pub fn from_spec(spec: &EngineSpec) -> Self {
        Self::new(spec.name.clone(), spec.program.clone())
            .with_args(spec.args.clone())
            .with_relative_coords(spec.relative_coords)
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_relative_coords(mut self, relative: bool) -> Self {
        self.relative_coords = relative;
        self
    }

    pub fn parse_tokens(&self, stdout: &str, image: &ImageRef) -> Result<Vec<Detection>> {
        let tokens: Vec<OcrToken> = serde_json::from_str(stdout)
            .with_context(|| format!("failed to parse {} OCR JSON response", self.name))?;

        let scale = if self.relative_coords {
            let (w, h) = image.size().with_context(|| {
                format!(
                    "{} reports relative coordinates but image geometry is unknown",
                    self.name
                )
            })?;
            Some((w as f32, h as f32))
        } else {
            None
        };

        Ok(tokens
            .into_iter()
            .map(|token| {
                let bbox = token.bbox.as_ref().map(|raw| {
                    let bbox = raw.to_bbox();
                    match scale {
                        Some((sx, sy)) => bbox.scaled(sx, sy),
                        None => bbox,
                    }
                });
                Detection {
                    text: token.text,
                    confidence: token.confidence,
                    engine: self.name.clone(),
                    bbox,
                }
            })
            .collect())
    }
}

#[async_trait]
impl BackendAdapter for CommandAdapter {
    fn engine(&self) -> &str {
        &self.name
    }

    async fn detect(&self, image: &ImageRef) -> Result<Vec<Detection>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--image")
            .arg(&image.path)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to invoke {} OCR bridge", self.name))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} OCR bridge failed: {}", self.name, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        self.parse_tokens(&stdout, image)
    }
}
