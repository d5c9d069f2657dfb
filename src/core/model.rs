use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::MalformedDetection;
use crate::core::geometry::BBox;

/// One text fragment reported by one recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub text: String,
    pub confidence: f32,
    #[serde(default)]
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}

impl Detection {
    pub fn new(text: impl Into<String>, confidence: f32, engine: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence,
            engine: engine.into(),
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn validate(&self) -> Result<(), MalformedDetection> {
        if self.text.trim().is_empty() {
            return Err(MalformedDetection::EmptyText);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(MalformedDetection::Confidence(self.confidence));
        }
        match self.bbox {
            Some(b) if !b.is_well_formed() => Err(MalformedDetection::BBox {
                x0: b.x0,
                y0: b.y0,
                x1: b.x1,
                y1: b.y1,
            }),
            _ => Ok(()),
        }
    }
}

/// Read-only handle to the image every engine looks at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Reads width/height from the image header. Unknown formats keep the
    /// geometry empty; only a missing file is an error.
    pub fn probe(path: &Path) -> anyhow::Result<Self> {
        if !path.is_file() {
            anyhow::bail!("image does not exist: {}", path.display());
        }
        let image = Self::new(path);
        match image::image_dimensions(path) {
            Ok((w, h)) => Ok(image.with_size(w, h)),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "could not read image geometry");
                Ok(image)
            }
        }
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

/// Detections judged to occupy the same visual region.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialCluster {
    pub detections: Vec<Detection>,
    /// Catch-all cluster of detections without a bbox.
    pub fallback: bool,
}

impl SpatialCluster {
    pub fn bbox(&self) -> Option<BBox> {
        self.detections
            .iter()
            .filter_map(|d| d.bbox)
            .reduce(|acc, b| acc.union(&b))
    }
}

/// Near-duplicate readings inside one spatial cluster, keyed by the first text seen.
#[derive(Debug, Clone)]
pub struct TextCluster<'a> {
    pub representative: &'a str,
    pub members: Vec<&'a Detection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotingOutcome {
    pub text: String,
    pub confidence: f32,
}

impl VotingOutcome {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateReport {
    pub text: String,
    pub score: f32,
    pub members: usize,
    pub engines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterReport {
    pub index: usize,
    pub detections: Vec<Detection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    pub fallback: bool,
    pub candidates: Vec<CandidateReport>,
    pub outcome: VotingOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineReport {
    pub engine: String,
    pub succeeded: bool,
    pub detections: usize,
    pub dropped: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Deterministic part of a run: everything derived from the detections alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reconciliation {
    pub text: String,
    pub average_confidence: f32,
    pub word_count: usize,
    pub clusters: Vec<ClusterReport>,
}

impl Reconciliation {
    pub fn outcomes(&self) -> impl Iterator<Item = &VotingOutcome> {
        self.clusters.iter().map(|c| &c.outcome)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnsembleResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    /// Wall-clock seconds for invocation plus reconciliation.
    pub processing_time: f64,
    pub engines: Vec<EngineReport>,
}

impl EnsembleResult {
    pub fn text(&self) -> &str {
        &self.reconciliation.text
    }

    pub fn average_confidence(&self) -> f32 {
        self.reconciliation.average_confidence
    }

    pub fn word_count(&self) -> usize {
        self.reconciliation.word_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validates_detections() {
        let ok = Detection::new("Acme", 0.9, "A").with_bbox(BBox::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(ok.validate(), Ok(()));

        assert_eq!(
            Detection::new("  ", 0.9, "A").validate(),
            Err(MalformedDetection::EmptyText)
        );
        assert_eq!(
            Detection::new("x", 1.2, "A").validate(),
            Err(MalformedDetection::Confidence(1.2))
        );
        assert!(Detection::new("x", f32::NAN, "A").validate().is_err());
        assert!(Detection::new("x", 0.5, "A")
            .with_bbox(BBox::new(5.0, 0.0, 1.0, 1.0))
            .validate()
            .is_err());
    }

    #[test]
    fn detection_json_omits_missing_bbox() {
        let json = serde_json::to_string(&Detection::new("hi", 0.5, "B")).unwrap();
        assert_eq!(json, r#"{"text":"hi","confidence":0.5,"engine":"B"}"#);
    }

    #[test]
    fn cluster_bbox_is_union_of_members() {
        let cluster = SpatialCluster {
            detections: vec![
                Detection::new("a", 0.9, "A").with_bbox(BBox::new(0.0, 0.0, 10.0, 10.0)),
                Detection::new("b", 0.9, "B"),
                Detection::new("c", 0.9, "C").with_bbox(BBox::new(5.0, 2.0, 20.0, 12.0)),
            ],
            fallback: false,
        };
        assert_eq!(cluster.bbox(), Some(BBox::new(0.0, 0.0, 20.0, 12.0)));
    }
}
