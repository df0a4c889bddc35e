//! Single-workflow image synthesis: one submit, one polling loop, no
//! fallback space.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};
use crate::poller::{PollProgress, StatusPoller};
use crate::provider::{GenerationRequest, ImageSynthesizer, RejectionSubject, SubmitError};

pub const FEATURES_PLACEHOLDER: &str = "{{FEATURES}}";

/// Positive/negative prompt pair with a feature-conditioning placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub positive: String,
    pub negative: String,
}

impl PromptTemplate {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }

    /// Substitute the extracted features into the positive prompt.
    pub fn fill(&self, features: &str) -> (String, String) {
        (
            self.positive.replace(FEATURES_PLACEHOLDER, features),
            self.negative.clone(),
        )
    }
}

/// Translate a classified submission failure into the mission error
/// taxonomy. Only a user-asset moderation rejection keeps its specific,
/// user-facing shape.
pub(crate) fn submit_failure(err: SubmitError) -> ForgeError {
    match err {
        SubmitError::Moderation {
            subject: RejectionSubject::UserAsset,
            ..
        } => ForgeError::UserAssetRejected {
            message: err.to_string(),
        },
        SubmitError::Moderation { code, message, .. } => ForgeError::JobFailed { code, message },
        SubmitError::Transient(message) => ForgeError::JobFailed {
            code: None,
            message,
        },
        SubmitError::Provider { code, message } => ForgeError::JobFailed { code, message },
    }
}

pub struct SingleGeneration<'a> {
    synthesizer: &'a dyn ImageSynthesizer,
    poller: &'a StatusPoller,
}

impl<'a> SingleGeneration<'a> {
    pub fn new(synthesizer: &'a dyn ImageSynthesizer, poller: &'a StatusPoller) -> Self {
        Self {
            synthesizer,
            poller,
        }
    }

    pub async fn run(
        &self,
        request: GenerationRequest,
        observe: &mut (dyn FnMut(PollProgress) + Send),
    ) -> Result<String> {
        let job = self
            .synthesizer
            .submit(&request)
            .await
            .map_err(submit_failure)?;
        self.poller.wait(self.synthesizer, &job, observe).await
    }
}
