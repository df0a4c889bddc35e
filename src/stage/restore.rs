//! Restoration synthesis: repair an old photo and keep the published
//! original for before/after display.

use crate::error::{ForgeError, Result};
use crate::fallback::WorkflowOption;
use crate::poller::{PollProgress, StatusPoller};
use crate::provider::{GenerationRequest, ImageSynthesizer};

use super::generate::submit_failure;

/// Fixed instruction bound to the restoration workflow's prompt slot.
pub const RESTORE_INSTRUCTION: &str = "Repair this photograph: remove cracks and scratches, \
     enhance clarity, correct faded colors, and recover fine detail at high resolution.";

#[derive(Debug, Clone)]
pub struct Restoration {
    pub restored_url: String,
    /// Published original, kept as the before-artifact.
    pub original_url: String,
}

pub struct RestorationStage<'a> {
    synthesizer: &'a dyn ImageSynthesizer,
    poller: &'a StatusPoller,
}

impl<'a> RestorationStage<'a> {
    pub fn new(synthesizer: &'a dyn ImageSynthesizer, poller: &'a StatusPoller) -> Self {
        Self {
            synthesizer,
            poller,
        }
    }

    pub async fn run(
        &self,
        workflow: &WorkflowOption,
        original_url: &str,
        observe: &mut (dyn FnMut(PollProgress) + Send),
    ) -> Result<Restoration> {
        if original_url.is_empty() {
            return Err(ForgeError::InvalidInput(
                "restoration requires a published photo".into(),
            ));
        }

        let bindings = workflow
            .slot_mapping
            .bind(&[original_url.to_string()], None)?;
        let request = GenerationRequest::new(&workflow.external_workflow_id)
            .with_instruction(RESTORE_INSTRUCTION)
            .with_bindings(bindings);

        let job = self
            .synthesizer
            .submit(&request)
            .await
            .map_err(submit_failure)?;
        let restored_url = self.poller.wait(self.synthesizer, &job, observe).await?;

        Ok(Restoration {
            restored_url,
            original_url: original_url.to_string(),
        })
    }
}
