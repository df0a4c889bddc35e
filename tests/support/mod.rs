//! In-memory capability doubles shared by the integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use festival_forge::{
    AssetCatalog, AssetPublisher, Capabilities, GenerationRequest, ImageSynthesizer, JobId,
    JobStatus, MissionKind, ProgressEvent, ProgressSink, PublishedAsset, Result, SlotMapping,
    SubmitError, TemplateAsset, TextComposer, VisionDescriber, WorkflowOption,
};

pub const TEMPLATE_SLOT: &str = "40";
pub const SUBJECT_SLOT: &str = "21";

/// Publishes payloads to unique fake URLs.
#[derive(Default)]
pub struct StubPublisher {
    counter: Mutex<usize>,
}

#[async_trait]
impl AssetPublisher for StubPublisher {
    async fn publish(&self, payload: &str) -> Result<PublishedAsset> {
        let n = {
            let mut counter = self.counter.lock();
            *counter += 1;
            *counter
        };
        let short: String = payload
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        Ok(PublishedAsset {
            url: format!("https://cdn.example/pub/{n}-{short}"),
        })
    }
}

pub struct StubVision(pub String);

#[async_trait]
impl VisionDescriber for StubVision {
    async fn describe(&self, _image_ref: &str, _instruction: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub enum ComposerBehavior {
    Reply(String),
    Fail,
}

pub struct StubComposer(pub ComposerBehavior);

#[async_trait]
impl TextComposer for StubComposer {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        match &self.0 {
            ComposerBehavior::Reply(text) => Ok(text.clone()),
            ComposerBehavior::Fail => Err(festival_forge::ForgeError::JobTimeout { attempts: 60 }),
        }
    }
}

/// Per-submission behavior of the scripted synthesizer.
#[derive(Clone)]
pub enum SubmitOutcome {
    /// Accept the submission; the job succeeds on its first poll.
    Accept,
    /// Accept the submission; the job reports failure on its first poll.
    AcceptThenFail { code: Option<u32>, message: String },
    /// Reject the submission outright.
    Reject(SubmitError),
}

/// Scripted image synthesizer: submissions pop outcomes in order, jobs
/// resolve against the request that created them. A successful render URL
/// embeds the template URL it was generated from, so tests can tell which
/// combination won.
pub struct ScriptedSynthesizer {
    outcomes: Mutex<VecDeque<SubmitOutcome>>,
    submissions: Mutex<Vec<GenerationRequest>>,
    jobs: Mutex<HashMap<String, (GenerationRequest, bool)>>,
    poll_count: Mutex<u32>,
}

impl ScriptedSynthesizer {
    pub fn new(outcomes: Vec<SubmitOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            submissions: Mutex::new(Vec::new()),
            jobs: Mutex::new(HashMap::new()),
            poll_count: Mutex::new(0),
        }
    }

    pub fn always_accept() -> Self {
        Self::new(Vec::new())
    }

    pub fn submissions(&self) -> Vec<GenerationRequest> {
        self.submissions.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    pub fn poll_count(&self) -> u32 {
        *self.poll_count.lock()
    }

    pub fn template_url_of(request: &GenerationRequest) -> Option<String> {
        request
            .bindings
            .iter()
            .find(|b| b.slot == TEMPLATE_SLOT)
            .map(|b| b.image_url.clone())
    }

    pub fn render_url_for(request: &GenerationRequest) -> String {
        match Self::template_url_of(request) {
            Some(template_url) => format!("{template_url}::render"),
            None => "https://cdn.example/render/plain".to_string(),
        }
    }
}

#[async_trait]
impl ImageSynthesizer for ScriptedSynthesizer {
    async fn submit(&self, request: &GenerationRequest) -> std::result::Result<JobId, SubmitError> {
        self.submissions.lock().push(request.clone());
        let outcome = self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or(SubmitOutcome::Accept);

        match outcome {
            SubmitOutcome::Reject(err) => Err(err),
            SubmitOutcome::Accept => {
                let id = format!("job-{}", self.submissions.lock().len());
                self.jobs
                    .lock()
                    .insert(id.clone(), (request.clone(), false));
                Ok(JobId(id))
            }
            SubmitOutcome::AcceptThenFail { .. } => {
                let id = format!("job-{}", self.submissions.lock().len());
                self.jobs.lock().insert(id.clone(), (request.clone(), true));
                Ok(JobId(id))
            }
        }
    }

    async fn poll(&self, job: &JobId) -> std::result::Result<JobStatus, SubmitError> {
        *self.poll_count.lock() += 1;
        let jobs = self.jobs.lock();
        match jobs.get(&job.0) {
            Some((_, true)) => Ok(JobStatus::Failed {
                code: Some(6),
                message: "render failed".into(),
            }),
            Some((request, false)) => Ok(JobStatus::Succeeded {
                image_url: Self::render_url_for(request),
            }),
            None => Err(SubmitError::Provider {
                code: None,
                message: format!("unknown job {job}"),
            }),
        }
    }
}

/// Sink that records every event for later assertions.
#[derive(Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}

pub fn capabilities(synthesizer: Arc<ScriptedSynthesizer>, composer: ComposerBehavior) -> Capabilities {
    Capabilities {
        publisher: Arc::new(StubPublisher::default()),
        vision: Arc::new(StubVision(
            "short curly hair, round face, young adult".into(),
        )),
        synthesizer,
        composer: Arc::new(StubComposer(composer)),
    }
}

pub fn fusion_workflow(id: &str) -> WorkflowOption {
    WorkflowOption::new(id, format!("wf-{id}"))
        .with_slot_mapping(SlotMapping::new(vec![SUBJECT_SLOT], vec![TEMPLATE_SLOT]))
}

pub fn remote_templates(n: usize) -> Vec<TemplateAsset> {
    (0..n)
        .map(|i| TemplateAsset::remote(format!("tpl-{i}"), format!("https://cdn.example/tpl/{i}")))
        .collect()
}

pub fn transform_catalog(templates: usize) -> AssetCatalog {
    AssetCatalog::new()
        .with_workflow(MissionKind::FestiveTransform, fusion_workflow("fusion-a"))
        .with_templates(
            MissionKind::FestiveTransform,
            None,
            remote_templates(templates),
        )
}
