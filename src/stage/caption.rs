//! Caption stage. Any failure degrades to the mission's default caption; a
//! missing caption never voids a finished image.

use tracing::warn;

use crate::provider::TextComposer;
use crate::registry::{MissionDescriptor, MissionKind};

pub struct CaptionStage<'a> {
    composer: &'a dyn TextComposer,
}

impl<'a> CaptionStage<'a> {
    pub fn new(composer: &'a dyn TextComposer) -> Self {
        Self { composer }
    }

    /// Compose a short festive caption for the finished artifact. Always
    /// returns a non-empty string.
    pub async fn compose(&self, descriptor: &MissionDescriptor, image_url: &str) -> String {
        let prompt = caption_prompt(descriptor.kind, image_url);
        match self.composer.complete(&prompt).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    warn!(mission = %descriptor.kind, "empty caption, using default");
                    descriptor.default_caption.to_string()
                } else {
                    trimmed.to_string()
                }
            }
            Err(err) => {
                warn!(mission = %descriptor.kind, error = %err, "caption degraded to default");
                descriptor.default_caption.to_string()
            }
        }
    }
}

fn caption_prompt(kind: MissionKind, image_url: &str) -> String {
    match kind {
        MissionKind::FestiveTransform => format!(
            "Write one or two short festive blessing lines for this transformed \
             portrait. Warm, playful, full of good fortune. No title, no quotes, \
             no explanation. Image: {image_url}"
        ),
        _ => format!(
            "Write one short rhyming blessing of 8-12 words for this festive \
             portrait. Output only the blessing. Image: {image_url}"
        ),
    }
}
