//! Run configuration for the reconciliation pipeline.
//!
//! Values come from defaults, an optional TOML file, `OCRVOTE_*` environment
//! variables and finally CLI flags, in that order. `validate` must pass before
//! a pipeline is built.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 85;
pub const DEFAULT_SPATIAL_PROXIMITY: f32 = 50.0;
pub const DEFAULT_AGREEMENT_BONUS: f32 = 0.1;
pub const DEFAULT_ADAPTER_TIMEOUT_MS: u64 = 120_000;

/// What the spatial grouper does with detections that carry no bbox.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BboxPolicy {
    /// Collect them into one cluster emitted after all spatial clusters.
    #[default]
    Fallback,
    /// Discard them before grouping.
    Drop,
}

impl std::str::FromStr for BboxPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "drop" => Ok(Self::Drop),
            other => Err(format!("unknown bbox policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Detections below this confidence take no part in voting.
    pub min_confidence: f32,
    /// Texts scoring strictly above this ratio (0-100) share a text cluster.
    pub similarity_threshold: u32,
    /// Vertical proximity in image units; horizontal reach is three times this.
    pub spatial_proximity: f32,
    pub agreement_bonus: f32,
    pub bbox_policy: BboxPolicy,
    /// Deadline for the whole fan-out of one image.
    pub adapter_timeout_ms: u64,
    pub engines: Vec<EngineSpec>,
}

/// An external recognizer invoked as `program [args..] --image <path>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSpec {
    pub name: String,
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// Bboxes are fractions of the image size and get scaled to pixels.
    #[serde(default)]
    pub relative_coords: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            spatial_proximity: DEFAULT_SPATIAL_PROXIMITY,
            agreement_bonus: DEFAULT_AGREEMENT_BONUS,
            bbox_policy: BboxPolicy::default(),
            adapter_timeout_ms: DEFAULT_ADAPTER_TIMEOUT_MS,
            engines: Vec::new(),
        }
    }
}

impl EnsembleConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `OCRVOTE_*` environment variables on top of `self`.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(|key| env::var(key).ok())
    }

    fn with_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "OCRVOTE_MIN_CONFIDENCE")? {
            self.min_confidence = v;
        }
        if let Some(v) = parse_var(&lookup, "OCRVOTE_SIMILARITY_THRESHOLD")? {
            self.similarity_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "OCRVOTE_SPATIAL_PROXIMITY")? {
            self.spatial_proximity = v;
        }
        if let Some(v) = parse_var(&lookup, "OCRVOTE_AGREEMENT_BONUS")? {
            self.agreement_bonus = v;
        }
        if let Some(v) = parse_var(&lookup, "OCRVOTE_BBOX_POLICY")? {
            self.bbox_policy = v;
        }
        if let Some(v) = parse_var(&lookup, "OCRVOTE_ADAPTER_TIMEOUT_MS")? {
            self.adapter_timeout_ms = v;
        }
        Ok(self)
    }

    /// Check thresholds only. Engine presence is checked where adapters are
    /// registered, since replay runs need none.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::MinConfidence(self.min_confidence));
        }
        if self.similarity_threshold > 100 {
            return Err(ConfigError::SimilarityThreshold(self.similarity_threshold));
        }
        if !self.spatial_proximity.is_finite() || self.spatial_proximity <= 0.0 {
            return Err(ConfigError::SpatialProximity(self.spatial_proximity));
        }
        if !self.agreement_bonus.is_finite() || self.agreement_bonus < 0.0 {
            return Err(ConfigError::AgreementBonus(self.agreement_bonus));
        }
        if self.adapter_timeout_ms == 0 {
            return Err(ConfigError::AdapterTimeout);
        }
        Ok(())
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    pub fn enabled_engines(&self) -> impl Iterator<Item = &EngineSpec> {
        self.engines.iter().filter(|e| e.enabled)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env {
                key: key.to_string(),
                value: raw,
            }),
    }
}
