use anyhow::Result;
use async_trait::async_trait;

use crate::core::model::{Detection, ImageRef};
use crate::engine::BackendAdapter;

/// Replays a fixed set of detections regardless of the image.
#[derive(Debug, Clone)]
pub struct StaticAdapter {
    name: String,
    detections: Vec<Detection>,
}

impl StaticAdapter {
    pub fn new(name: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            name: name.into(),
            detections,
        }
    }
}

#[async_trait]
impl BackendAdapter for StaticAdapter {
    fn engine(&self) -> &str {
        &self.name
    }

    async fn detect(&self, _image: &ImageRef) -> Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}
