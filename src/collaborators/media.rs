//! Media generation collaborator.
//!
//! The real system hands diagram and video requests to a cloud image/video
//! model. This implementation returns configurable placeholder URLs, which
//! is enough to exercise the full voice round trip end to end.

use async_trait::async_trait;

use super::{MediaGenerator, MediaReference};
use crate::types::Result;

/// Media generator that serves placeholder artifacts.
pub struct PlaceholderMediaGenerator {
    diagram_url: String,
    video_url: String,
}

impl PlaceholderMediaGenerator {
    /// Use custom placeholder locations.
    pub fn new(diagram_url: String, video_url: String) -> Self {
        Self {
            diagram_url,
            video_url,
        }
    }
}

impl Default for PlaceholderMediaGenerator {
    fn default() -> Self {
        Self::new(
            "https://storage.example.com/media/placeholder_architecture.png".to_string(),
            "https://storage.example.com/media/placeholder_video.mp4".to_string(),
        )
    }
}

#[async_trait]
impl MediaGenerator for PlaceholderMediaGenerator {
    async fn generate_diagram(&self, description: &str) -> Result<MediaReference> {
        tracing::info!(description, "generating architecture diagram");
        Ok(MediaReference {
            url: self.diagram_url.clone(),
            media_type: "image".to_string(),
        })
    }

    async fn generate_video(&self, description: &str) -> Result<MediaReference> {
        tracing::info!(description, "generating example video");
        Ok(MediaReference {
            url: self.video_url.clone(),
            media_type: "video".to_string(),
        })
    }
}
