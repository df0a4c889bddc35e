//! The mission engine: owns the stage state machine, sequences stage
//! executors per the registry descriptor, and hands finished artifacts to
//! the result store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::catalog::AssetCatalog;
use crate::config::ForgeConfig;
use crate::domain::{
    Gender, MissionInput, MissionResult, ProgressReporter, ProgressSink, ResultMetadata, Stage,
    TaskId,
};
use crate::error::{ForgeError, Result};
use crate::fallback::{FallbackResolver, ResolverEvent};
use crate::persistence::ResultStore;
use crate::poller::{PollProgress, StatusPoller};
use crate::provider::{
    AssetPublisher, GenerationRequest, ImageSynthesizer, TextComposer, VisionDescriber,
};
use crate::registry::{self, MissionDescriptor, MissionKind};
use crate::stage::{
    CaptionStage, CardDrawStage, ExtractedFeatures, FeatureExtractor, MultiSubjectStage,
    RestorationStage, SingleGeneration,
};

/// The external capability set one orchestrator instance runs against.
pub struct Capabilities {
    pub publisher: Arc<dyn AssetPublisher>,
    pub vision: Arc<dyn VisionDescriber>,
    pub synthesizer: Arc<dyn ImageSynthesizer>,
    pub composer: Arc<dyn TextComposer>,
}

/// What the generating stage produced, before captioning.
struct GenerationOutcome {
    image: String,
    caption: Option<String>,
    tags: Option<Vec<String>>,
    original_image: Option<String>,
}

impl GenerationOutcome {
    fn image(image: String) -> Self {
        Self {
            image,
            caption: None,
            tags: None,
            original_image: None,
        }
    }
}

/// Caller-owned mission engine. Construct one per capability set; separate
/// instances share no hidden state, so concurrent missions in a test
/// harness cannot interfere.
pub struct Orchestrator {
    capabilities: Capabilities,
    catalog: AssetCatalog,
    config: ForgeConfig,
    poller: StatusPoller,
    store: ResultStore,
}

impl Orchestrator {
    pub fn new(
        capabilities: Capabilities,
        catalog: AssetCatalog,
        config: ForgeConfig,
        store: ResultStore,
    ) -> Self {
        let poller = StatusPoller::new(config.poller.clone());
        Self {
            capabilities,
            catalog,
            config,
            poller,
            store,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run one mission to completion. Emits exactly one progress event per
    /// stage transition; the result is persisted before the completion
    /// event, so a caller observing 100% can already read it back.
    pub async fn run(
        &self,
        kind: MissionKind,
        input: MissionInput,
        sink: &dyn ProgressSink,
    ) -> Result<MissionResult> {
        let descriptor = registry::descriptor(kind);
        let task_id = TaskId::generate();
        info!(
            mission = %kind,
            task_id = %task_id,
            name = descriptor.name,
            "starting mission"
        );

        let reporter = ProgressReporter::new(sink);
        match self
            .execute(descriptor, &task_id, &input, &reporter)
            .await
        {
            Ok(result) => {
                self.store.save(&result);
                reporter.transition(Stage::Complete, 100, "Your artwork is ready")?;
                info!(mission = %kind, task_id = %task_id, "mission complete");
                Ok(result)
            }
            Err(err) => {
                warn!(mission = %kind, task_id = %task_id, error = %err, "mission failed");
                reporter.error("Generation failed", err.to_string());
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        descriptor: &MissionDescriptor,
        task_id: &TaskId,
        input: &MissionInput,
        reporter: &ProgressReporter<'_>,
    ) -> Result<MissionResult> {
        validate_input(descriptor, input)?;

        let published = self.publish_subjects(descriptor, input, reporter).await?;
        let features = self
            .extract_features(descriptor, &published, input, reporter)
            .await?;

        reporter.transition(Stage::Generating, 40, "Creating your artwork...")?;
        let outcome = self
            .generate(
                descriptor,
                task_id,
                input,
                &published,
                features.as_ref().map(|f| f.conditioning.as_str()),
                reporter,
            )
            .await?;
        reporter.update(80, "Artwork finished, adding final touches");

        let caption = if descriptor.needs_caption {
            reporter.transition(Stage::Caption, 90, "Composing a blessing...")?;
            Some(
                CaptionStage::new(self.capabilities.composer.as_ref())
                    .compose(descriptor, &outcome.image)
                    .await,
            )
        } else {
            outcome.caption
        };

        Ok(MissionResult {
            task_id: task_id.clone(),
            image: outcome.image,
            caption,
            dna: features.map(|f| f.display_tags).or(outcome.tags),
            original_image: outcome.original_image,
            comparison_image: None,
            metadata: ResultMetadata {
                mission_id: descriptor.kind.as_str().to_string(),
                timestamp_ms: Utc::now().timestamp_millis(),
                cost: None,
            },
        })
    }

    /// Uploading stage; skipped for missions whose provider accepts inline
    /// payloads.
    async fn publish_subjects(
        &self,
        descriptor: &MissionDescriptor,
        input: &MissionInput,
        reporter: &ProgressReporter<'_>,
    ) -> Result<Vec<String>> {
        if !descriptor.needs_publish {
            return Ok(Vec::new());
        }

        let subjects = input.subject_images();
        if subjects.len() <= 1 {
            reporter.transition(Stage::Uploading, 5, "Uploading your photo...")?;
        } else {
            reporter.transition(
                Stage::Uploading,
                10,
                format!("Uploading {} photos...", subjects.len()),
            )?;
        }

        let mut urls = Vec::new();
        for (i, payload) in subjects.iter().enumerate() {
            let asset = self
                .capabilities
                .publisher
                .publish(payload)
                .await
                .map_err(|e| ForgeError::PublishFailed(e.to_string()))?;
            debug!(url = %asset.url, "subject photo published");
            urls.push(asset.url);

            let percent = if subjects.len() <= 1 {
                8
            } else {
                10 + ((i + 1) * 25 / subjects.len()) as u8
            };
            reporter.update(
                percent,
                format!("Uploaded photo {} of {}", i + 1, subjects.len()),
            );
        }
        Ok(urls)
    }

    async fn extract_features(
        &self,
        descriptor: &MissionDescriptor,
        published: &[String],
        input: &MissionInput,
        reporter: &ProgressReporter<'_>,
    ) -> Result<Option<ExtractedFeatures>> {
        if !descriptor.needs_feature_extraction {
            return Ok(None);
        }

        reporter.transition(Stage::FeatureExtraction, 10, "Studying your photo...")?;
        let image_ref = published
            .first()
            .map(String::as_str)
            .or(input.image.as_deref())
            .ok_or_else(|| {
                ForgeError::InvalidInput("feature extraction requires a photo".into())
            })?;

        let features = FeatureExtractor::new(self.capabilities.vision.as_ref())
            .extract(image_ref, self.catalog.feature_instruction())
            .await?;
        reporter.update_with_tags(
            30,
            "Features captured, preparing generation",
            features.display_tags.clone(),
        );
        Ok(Some(features))
    }

    /// Generating stage dispatch. The fallback resolver serves the mission
    /// with a real workflow/template search space; every other mission is a
    /// single direct executor call.
    async fn generate(
        &self,
        descriptor: &MissionDescriptor,
        task_id: &TaskId,
        input: &MissionInput,
        published: &[String],
        conditioning: Option<&str>,
        reporter: &ProgressReporter<'_>,
    ) -> Result<GenerationOutcome> {
        let kind = descriptor.kind;
        match kind {
            MissionKind::FortuneCard => {
                let draw = CardDrawStage::new(self.catalog.cards()).draw(task_id)?;
                reporter.update(70, format!("You drew {}!", draw.card.name));
                Ok(GenerationOutcome {
                    image: draw.card.image.clone(),
                    caption: Some(draw.card.blessing.clone()),
                    tags: Some(draw.tags),
                    original_image: None,
                })
            }

            MissionKind::PhotoRestore => {
                let workflow = self.primary_workflow(kind)?;
                let original = published.first().ok_or_else(|| {
                    ForgeError::InvalidInput("restoration requires an uploaded photo".into())
                })?;
                let stage =
                    RestorationStage::new(self.capabilities.synthesizer.as_ref(), &self.poller);
                let mut observe = |p: PollProgress| poll_update(reporter, &p);
                let restoration = stage.run(workflow, original, &mut observe).await?;
                Ok(GenerationOutcome {
                    image: restoration.restored_url,
                    caption: None,
                    tags: None,
                    original_image: Some(restoration.original_url),
                })
            }

            MissionKind::CouplePortrait | MissionKind::FamilyPortrait => {
                let workflow = self.primary_workflow(kind)?;
                let pool = self.catalog.templates(kind, None);
                if pool.is_empty() {
                    return Err(ForgeError::Config(format!(
                        "no templates configured for {kind}"
                    )));
                }
                let template = &pool[task_id.hash_index(pool.len())];
                let stage = MultiSubjectStage::new(
                    self.capabilities.synthesizer.as_ref(),
                    self.capabilities.publisher.as_ref(),
                    &self.poller,
                );
                let mut observe = |p: PollProgress| poll_update(reporter, &p);
                let image = stage
                    .run(workflow, template, published, &mut observe)
                    .await?;
                Ok(GenerationOutcome::image(image))
            }

            MissionKind::FestiveTransform => {
                let gender = input.gender.unwrap_or(Gender::Female);
                let workflows = self.catalog.workflows(kind);
                let pool = self.catalog.templates(kind, Some(gender));
                let resolver = FallbackResolver::new(
                    self.capabilities.synthesizer.as_ref(),
                    self.capabilities.publisher.as_ref(),
                    &self.poller,
                    self.config.resolver.attempt_delay(),
                );
                let mut observe = |event: ResolverEvent| match event {
                    ResolverEvent::Attempt { ordinal, .. } => {
                        if ordinal > 1 {
                            reporter.update(45, "Trying another combination...");
                        }
                    }
                    ResolverEvent::TemplateSkipped { .. } => {
                        reporter.update(46, "Switching template...");
                    }
                    ResolverEvent::WorkflowExhausted { .. } => {
                        reporter.update(47, "Switching workflow...");
                    }
                    ResolverEvent::Poll(p) => poll_update(reporter, &p),
                };
                let resolution = resolver
                    .resolve(task_id, workflows, pool, published, &mut observe)
                    .await?;
                debug!(
                    workflow = %resolution.workflow_id,
                    template = %resolution.template_id,
                    submissions = resolution.submissions,
                    "fallback resolution succeeded"
                );
                Ok(GenerationOutcome::image(resolution.image_url))
            }

            MissionKind::StylizedAvatar => {
                let workflow = self.primary_workflow(kind)?;
                let gender = input.gender.unwrap_or(Gender::Female);
                let prompt = self.catalog.prompt(gender).ok_or_else(|| {
                    ForgeError::Config(format!("no prompt template for {gender:?}"))
                })?;
                let (positive, negative) =
                    prompt.fill(conditioning.unwrap_or("individual portrait"));
                let bindings = workflow.slot_mapping.bind(published, None)?;
                let request = GenerationRequest::new(&workflow.external_workflow_id)
                    .with_prompt(positive, negative)
                    .with_bindings(bindings);

                let stage =
                    SingleGeneration::new(self.capabilities.synthesizer.as_ref(), &self.poller);
                let mut observe = |p: PollProgress| poll_update(reporter, &p);
                let image = stage.run(request, &mut observe).await?;
                Ok(GenerationOutcome::image(image))
            }
        }
    }

    fn primary_workflow(&self, kind: MissionKind) -> Result<&crate::fallback::WorkflowOption> {
        self.catalog
            .primary_workflow(kind)
            .ok_or_else(|| ForgeError::Config(format!("no enabled workflow for {kind}")))
    }
}

fn validate_input(descriptor: &MissionDescriptor, input: &MissionInput) -> Result<()> {
    let subjects = input.subject_images().len();
    if descriptor.subject_count > 0 && subjects != descriptor.subject_count {
        return Err(ForgeError::InvalidInput(format!(
            "{} requires {} photo(s), got {}",
            descriptor.name, descriptor.subject_count, subjects
        )));
    }
    Ok(())
}

/// Map poll progress into the generating stage's 40..80 percent envelope.
fn poll_update(reporter: &ProgressReporter<'_>, progress: &PollProgress) {
    let percent = match progress.fraction {
        Some(fraction) => 40 + (fraction * 40.0) as u8,
        None => {
            let span = progress.attempt.saturating_mul(40) / progress.max_attempts.max(1);
            40 + span.min(39) as u8
        }
    };
    let message = match progress.remaining_estimate {
        Some(remaining) => format!(
            "Rendering your artwork... about {} left",
            format_remaining(remaining)
        ),
        None => "Rendering your artwork...".to_string(),
    };
    reporter.update(percent.min(79), message);
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_input_counts_subjects() {
        let descriptor = registry::descriptor(MissionKind::CouplePortrait);
        let two = MissionInput::new().with_images(vec!["a".into(), "b".into()]);
        assert!(validate_input(descriptor, &two).is_ok());

        let one = MissionInput::new().with_image("a");
        assert!(matches!(
            validate_input(descriptor, &one),
            Err(ForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_card_mission_accepts_empty_input() {
        let descriptor = registry::descriptor(MissionKind::FortuneCard);
        assert!(validate_input(descriptor, &MissionInput::new()).is_ok());
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::from_secs(42)), "42s");
        assert_eq!(format_remaining(Duration::from_secs(95)), "1m 35s");
        assert_eq!(format_remaining(Duration::from_millis(200)), "1s");
    }
}
