use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Caller-supplied payload for one mission invocation. Owned exclusively by
/// a single orchestration run.
#[derive(Debug, Clone, Default)]
pub struct MissionInput {
    /// Primary photo as a data URI or fetchable URL.
    pub image: Option<String>,
    /// Subject photos for multi-subject missions, in slot order.
    pub images: Vec<String>,
    pub text: Option<String>,
    pub gender: Option<Gender>,
    pub params: HashMap<String, serde_json::Value>,
}

impl MissionInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// All subject photos in submission order, whichever field carried them.
    pub fn subject_images(&self) -> Vec<&str> {
        if !self.images.is_empty() {
            self.images.iter().map(String::as_str).collect()
        } else {
            self.image.as_deref().into_iter().collect()
        }
    }
}

/// Metadata attached to every persisted result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub mission_id: String,
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// Final artifact of a successful mission. Immutable once built; owned by
/// the result store until evicted.
///
/// The serialized layout has no schema-version field, so every optional
/// field must stay backward-tolerant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionResult {
    pub task_id: TaskId,
    /// Primary artifact URL.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Extracted feature tags shown alongside the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dna: Option<Vec<String>>,
    /// Pre-restoration original, for before/after display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_image: Option<String>,
    pub metadata: ResultMetadata,
}
