//! Multi-subject synthesis: several published subject photos fused into one
//! template scene.

use tracing::debug;

use crate::error::Result;
use crate::fallback::{TemplateAsset, WorkflowOption};
use crate::poller::{PollProgress, StatusPoller};
use crate::provider::{AssetPublisher, GenerationRequest, ImageSynthesizer};

use super::generate::submit_failure;

pub struct MultiSubjectStage<'a> {
    synthesizer: &'a dyn ImageSynthesizer,
    publisher: &'a dyn AssetPublisher,
    poller: &'a StatusPoller,
}

impl<'a> MultiSubjectStage<'a> {
    pub fn new(
        synthesizer: &'a dyn ImageSynthesizer,
        publisher: &'a dyn AssetPublisher,
        poller: &'a StatusPoller,
    ) -> Self {
        Self {
            synthesizer,
            publisher,
            poller,
        }
    }

    /// Bind the subject photos and the template scene onto the workflow's
    /// slots, submit, and poll to completion.
    pub async fn run(
        &self,
        workflow: &WorkflowOption,
        template: &TemplateAsset,
        subject_urls: &[String],
        observe: &mut (dyn FnMut(PollProgress) + Send),
    ) -> Result<String> {
        let template_url = template.resolve(self.publisher).await?;
        debug!(
            workflow = %workflow.id,
            template = %template.id,
            subjects = subject_urls.len(),
            "submitting multi-subject fusion"
        );

        let bindings = workflow
            .slot_mapping
            .bind(subject_urls, Some(&template_url))?;
        let request =
            GenerationRequest::new(&workflow.external_workflow_id).with_bindings(bindings);

        let job = self
            .synthesizer
            .submit(&request)
            .await
            .map_err(submit_failure)?;
        self.poller.wait(self.synthesizer, &job, observe).await
    }
}
