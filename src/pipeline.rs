use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::coordinator::{drop_malformed, Coordinator};
use crate::core::config::EnsembleConfig;
use crate::core::error::ConfigError;
use crate::core::model::{Detection, EnsembleResult, ImageRef, Reconciliation};
use crate::engine::AdapterRegistry;
use crate::export::html_debug_export::HtmlDebugExporter;
use crate::export::json_export::JsonExporter;
use crate::export::text_export::TextExporter;
use crate::export::{ExportFormat, Exporter};
use crate::fusion::{Reconciler, VotingReconciler};

/// Engines plus voting for one configuration. Cheap to share across images;
/// each `run` is independent of any other in flight.
#[derive(Debug, Clone)]
pub struct EnsemblePipeline {
    coordinator: Coordinator,
    reconciler: VotingReconciler,
}

impl EnsemblePipeline {
    pub fn new(config: &EnsembleConfig, registry: AdapterRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        registry.ensure_not_empty()?;
        Ok(Self {
            coordinator: Coordinator::new(registry, config.adapter_timeout()),
            reconciler: VotingReconciler::new(config),
        })
    }

    pub fn from_config(config: &EnsembleConfig) -> Result<Self, ConfigError> {
        let registry = AdapterRegistry::from_config(config)?;
        Self::new(config, registry)
    }

    pub fn engines(&self) -> Vec<&str> {
        self.coordinator.registry().names()
    }

    /// Never fails: engine problems surface in the per-engine reports and an
    /// image nobody could read yields an empty transcription.
    pub async fn run(&self, image: &ImageRef) -> EnsembleResult {
        let start = Instant::now();
        let invocation = self.coordinator.invoke(image).await;
        let reconciliation = self.reconciler.reconcile(&invocation.detections);
        let processing_time = start.elapsed().as_secs_f64();

        info!(
            image = %image.path.display(),
            words = reconciliation.word_count,
            confidence = reconciliation.average_confidence,
            seconds = processing_time,
            "ensemble run complete"
        );

        EnsembleResult {
            image: Some(image.path.clone()),
            reconciliation,
            processing_time,
            engines: invocation.reports,
        }
    }

    pub fn reconcile(&self, detections: &[Detection]) -> Reconciliation {
        self.reconciler.reconcile(detections)
    }
}

/// Votes over detections captured earlier, without calling any engine.
pub fn replay(config: &EnsembleConfig, detections: Vec<Detection>) -> Result<EnsembleResult, ConfigError> {
    config.validate()?;
    let start = Instant::now();
    let (detections, dropped) = drop_malformed(detections);
    if dropped > 0 {
        tracing::warn!(dropped, "replay input contained malformed detections");
    }
    let reconciliation = VotingReconciler::new(config).reconcile(&detections);
    Ok(EnsembleResult {
        image: None,
        reconciliation,
        processing_time: start.elapsed().as_secs_f64(),
        engines: Vec::new(),
    })
}

pub fn export_result(result: &EnsembleResult, output: &Path, formats: &[ExportFormat]) -> Result<()> {
    for format in formats {
        match format {
            ExportFormat::Json => JsonExporter::new(output.to_path_buf()).export(result)?,
            ExportFormat::Text => TextExporter::new(output.to_path_buf()).export(result)?,
            ExportFormat::Html => HtmlDebugExporter::new(output.join("debug")).export(result)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::engine::StaticAdapter;
    use pretty_assertions::assert_eq;

    fn registry(detections: Vec<Detection>) -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.register(StaticAdapter::new("A", detections)).unwrap();
        registry
    }

    #[test]
    fn rejects_invalid_configuration_before_running() {
        let bad = EnsembleConfig {
            similarity_threshold: 150,
            ..Default::default()
        };
        assert!(matches!(
            EnsemblePipeline::new(&bad, registry(vec![])),
            Err(ConfigError::SimilarityThreshold(150))
        ));
        assert!(matches!(
            EnsemblePipeline::new(&EnsembleConfig::default(), AdapterRegistry::new()),
            Err(ConfigError::NoEngines)
        ));
        assert!(matches!(
            EnsemblePipeline::from_config(&EnsembleConfig::default()),
            Err(ConfigError::NoEngines)
        ));
    }

    #[tokio::test]
    async fn run_reports_engines_and_timing() -> Result<()> {
        let pipeline = EnsemblePipeline::new(
            &EnsembleConfig::default(),
            registry(vec![
                Detection::new("Hello", 0.95, "A").with_bbox(BBox::new(0.0, 0.0, 40.0, 10.0))
            ]),
        )?;
        let result = pipeline.run(&ImageRef::new("page.png")).await;
        assert_eq!(result.text(), "Hello");
        assert_eq!(result.word_count(), 1);
        assert_eq!(result.engines.len(), 1);
        assert!(result.engines[0].succeeded);
        assert!(result.processing_time >= 0.0);
        Ok(())
    }

    #[test]
    fn replay_drops_malformed_input() -> Result<()> {
        let result = replay(
            &EnsembleConfig::default(),
            vec![
                Detection::new("Hello", 0.9, "A").with_bbox(BBox::new(0.0, 0.0, 40.0, 10.0)),
                Detection::new("Bogus", 7.0, "B").with_bbox(BBox::new(0.0, 0.0, 40.0, 10.0)),
            ],
        )?;
        assert_eq!(result.text(), "Hello");
        assert_eq!(result.reconciliation.clusters[0].detections.len(), 1);
        Ok(())
    }

    #[test]
    fn export_result_writes_selected_formats() -> Result<()> {
        let output = tempfile::tempdir()?;
        let result = replay(
            &EnsembleConfig::default(),
            vec![Detection::new("Hello", 0.9, "A").with_bbox(BBox::new(0.0, 0.0, 40.0, 10.0))],
        )?;

        export_result(&result, output.path(), &[ExportFormat::Json, ExportFormat::Html])?;

        assert!(output.path().join("result.json").exists());
        assert!(output.path().join("debug/clusters.html").exists());
        assert!(!output.path().join("transcription.txt").exists());
        Ok(())
    }
}
