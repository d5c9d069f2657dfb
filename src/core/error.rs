use std::path::PathBuf;

use thiserror::Error;

/// Configuration rejected before any run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_confidence must be within [0, 1], got {0}")]
    MinConfidence(f32),

    #[error("similarity_threshold must be within [0, 100], got {0}")]
    SimilarityThreshold(u32),

    #[error("spatial_proximity must be a positive finite distance, got {0}")]
    SpatialProximity(f32),

    #[error("agreement_bonus must be a non-negative finite factor, got {0}")]
    AgreementBonus(f32),

    #[error("adapter_timeout_ms must be greater than 0")]
    AdapterTimeout,

    #[error("no recognition engines are enabled")]
    NoEngines,

    #[error("duplicate engine name: {0}")]
    DuplicateEngine(String),

    #[error("invalid value for {key}: {value}")]
    Env { key: String, value: String },

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A single backend adapter did not deliver detections.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("engine {engine} failed: {message}")]
    Failed { engine: String, message: String },

    #[error("engine {engine} panicked")]
    Panicked { engine: String },

    #[error("engine {engine} timed out after {timeout_ms}ms")]
    TimedOut { engine: String, timeout_ms: u64 },
}

/// Reason a detection was dropped before grouping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedDetection {
    #[error("empty text")]
    EmptyText,

    #[error("confidence {0} outside [0, 1]")]
    Confidence(f32),

    #[error("malformed bbox [{x0}, {y0}, {x1}, {y1}]")]
    BBox { x0: f32, y0: f32, x1: f32, y1: f32 },
}
