pub mod bridge;
pub mod registry;
pub mod static_adapter;

pub use bridge::CommandAdapter;
pub use registry::AdapterRegistry;
pub use static_adapter::StaticAdapter;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::model::{Detection, ImageRef};

/// One recognition engine, normalized to the common detection record.
///
/// `detect` may be invoked for several images at once; an engine that cannot
/// run concurrently must serialize internally. The future is dropped when the
/// run deadline passes, so anything it owns (a child process, a blocking
/// handle) must be released on drop. CPU-bound in-process engines should move
/// their work to `tokio::task::spawn_blocking`.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Tag stamped on every detection this engine produces.
    fn engine(&self) -> &str;

    async fn detect(&self, image: &ImageRef) -> Result<Vec<Detection>>;
}
