//! External capability contracts the orchestrator depends on.
//!
//! Implementations live outside this crate; the orchestration core only
//! relies on these minimal submit/poll/result shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::status::{JobId, JobStatus, SubmitError};
use crate::error::Result;

/// Publishes a binary or data-URI payload to a publicly fetchable location.
#[async_trait]
pub trait AssetPublisher: Send + Sync {
    async fn publish(&self, payload: &str) -> Result<PublishedAsset>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedAsset {
    pub url: String,
}

/// Vision capability: free-text description of an image under an
/// instruction prompt.
#[async_trait]
pub trait VisionDescriber: Send + Sync {
    async fn describe(&self, image_ref: &str, instruction: &str) -> Result<String>;
}

/// Binding of one logical image onto a provider-side input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBinding {
    pub slot: String,
    pub image_url: String,
}

/// Request payload for the asynchronous image capability, assembled from a
/// workflow's slot mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Provider-side workflow/graph identifier.
    pub workflow: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub bindings: Vec<SlotBinding>,
}

impl GenerationRequest {
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            prompt: None,
            negative_prompt: None,
            bindings: Vec::new(),
        }
    }

    pub fn with_prompt(mut self, positive: impl Into<String>, negative: impl Into<String>) -> Self {
        self.prompt = Some(positive.into());
        self.negative_prompt = Some(negative.into());
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.prompt = Some(instruction.into());
        self
    }

    pub fn with_bindings(mut self, bindings: Vec<SlotBinding>) -> Self {
        self.bindings = bindings;
        self
    }
}

/// Asynchronous generative image capability: submit returns a job id, the
/// job is then polled to a terminal status.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    async fn submit(&self, request: &GenerationRequest) -> std::result::Result<JobId, SubmitError>;

    async fn poll(&self, job: &JobId) -> std::result::Result<JobStatus, SubmitError>;
}

/// Text generation capability used by the caption stage.
#[async_trait]
pub trait TextComposer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
