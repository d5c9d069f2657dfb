//! Fan-out of one image to every registered engine and fan-in of their
//! detections.
//!
//! Each engine runs as its own task. The coordinator waits for all of them up
//! to a shared deadline; an engine that errors, panics or misses the deadline
//! contributes nothing and is reported as failed. Tasks still pending at the
//! deadline are aborted, which drops any child process they own. Merged
//! detections keep registry order, not completion order.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::error::AdapterError;
use crate::core::model::{Detection, EngineReport, ImageRef};
use crate::engine::AdapterRegistry;

type TaskOutput = (anyhow::Result<Vec<Detection>>, Duration);

#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub detections: Vec<Detection>,
    pub reports: Vec<EngineReport>,
}

impl Invocation {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.succeeded).count()
    }
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: AdapterRegistry,
    timeout: Duration,
}

impl Coordinator {
    pub fn new(registry: AdapterRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub async fn invoke(&self, image: &ImageRef) -> Invocation {
        let image = Arc::new(image.clone());
        let started = Instant::now();
        let deadline = started + self.timeout;

        let handles: Vec<JoinHandle<TaskOutput>> = self
            .registry
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let image = Arc::clone(&image);
                tokio::spawn(async move {
                    let begin = std::time::Instant::now();
                    let result = adapter.detect(&image).await;
                    (result, begin.elapsed())
                })
            })
            .collect();

        let mut invocation = Invocation::default();
        for (adapter, mut handle) in self.registry.iter().zip(handles) {
            let engine = adapter.engine().to_string();
            let outcome = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok((Ok(detections), elapsed))) => Ok((detections, elapsed)),
                Ok(Ok((Err(err), _))) => Err(AdapterError::Failed {
                    engine: engine.clone(),
                    message: format!("{err:#}"),
                }),
                Ok(Err(_)) => Err(AdapterError::Panicked {
                    engine: engine.clone(),
                }),
                Err(_) => {
                    handle.abort();
                    Err(AdapterError::TimedOut {
                        engine: engine.clone(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    })
                }
            };

            match outcome {
                Ok((raw, elapsed)) => {
                    let (accepted, dropped) = sanitize(&engine, raw);
                    debug!(
                        engine = %engine,
                        detections = accepted.len(),
                        dropped,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "engine finished"
                    );
                    invocation.reports.push(EngineReport {
                        engine,
                        succeeded: true,
                        detections: accepted.len(),
                        dropped,
                        elapsed_ms: elapsed.as_millis() as u64,
                        error: None,
                    });
                    invocation.detections.extend(accepted);
                }
                Err(err) => {
                    warn!(engine = %engine, error = %err, "engine contributed no detections");
                    invocation.reports.push(EngineReport {
                        engine,
                        succeeded: false,
                        detections: 0,
                        dropped: 0,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        info!(
            image = %image.path.display(),
            engines = invocation.reports.len(),
            succeeded = invocation.succeeded(),
            detections = invocation.detections.len(),
            "fan-out complete"
        );
        invocation
    }
}

/// Tags every detection with the engine that produced it, whatever the
/// adapter reported, then drops the malformed ones. Returns the accepted
/// detections and the number dropped.
pub fn sanitize(engine: &str, detections: Vec<Detection>) -> (Vec<Detection>, usize) {
    let tagged = detections
        .into_iter()
        .map(|mut detection| {
            if detection.engine != engine {
                detection.engine = engine.to_string();
            }
            detection
        })
        .collect();
    drop_malformed(tagged)
}

/// Keeps detections as recorded, minus the malformed ones.
pub fn drop_malformed(detections: Vec<Detection>) -> (Vec<Detection>, usize) {
    let mut dropped = 0;
    let accepted = detections
        .into_iter()
        .filter(|detection| match detection.validate() {
            Ok(()) => true,
            Err(reason) => {
                warn!(engine = %detection.engine, text = %detection.text, %reason, "dropping malformed detection");
                dropped += 1;
                false
            }
        })
        .collect();
    (accepted, dropped)
}
