pub mod coordinator;
pub mod core;
pub mod engine;
pub mod export;
pub mod fusion;
pub mod logging;
pub mod pipeline;

pub use crate::core::config::{BboxPolicy, EnsembleConfig};
pub use crate::core::model::{Detection, EnsembleResult, ImageRef, Reconciliation};
pub use pipeline::EnsemblePipeline;
