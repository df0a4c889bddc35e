use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{TemplateAsset, WorkflowOption};
use crate::domain::TaskId;
use crate::error::{ForgeError, Result};
use crate::poller::{PollProgress, StatusPoller};
use crate::provider::{AssetPublisher, GenerationRequest, ImageSynthesizer};

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub image_url: String,
    pub workflow_id: String,
    pub template_id: String,
    /// Provider submissions spent, counting the successful one.
    pub submissions: usize,
}

/// Advisory notifications emitted while the resolver walks the search space.
#[derive(Debug, Clone)]
pub enum ResolverEvent {
    Attempt {
        workflow_id: String,
        template_id: String,
        ordinal: usize,
    },
    TemplateSkipped {
        template_id: String,
        reason: String,
    },
    WorkflowExhausted {
        workflow_id: String,
    },
    Poll(PollProgress),
}

/// Deterministically iterates the (workflow, template) cross product until
/// one combination survives provider-side content moderation.
///
/// Visits at most `|workflows| x |templates|` pairs, never repeating one
/// within a resolution attempt.
pub struct FallbackResolver<'a> {
    synthesizer: &'a dyn ImageSynthesizer,
    publisher: &'a dyn AssetPublisher,
    poller: &'a StatusPoller,
    attempt_delay: Duration,
}

impl<'a> FallbackResolver<'a> {
    pub fn new(
        synthesizer: &'a dyn ImageSynthesizer,
        publisher: &'a dyn AssetPublisher,
        poller: &'a StatusPoller,
        attempt_delay: Duration,
    ) -> Self {
        Self {
            synthesizer,
            publisher,
            poller,
            attempt_delay,
        }
    }

    pub async fn resolve(
        &self,
        task_id: &TaskId,
        workflows: &[WorkflowOption],
        templates: &[TemplateAsset],
        subject_urls: &[String],
        observe: &mut (dyn FnMut(ResolverEvent) + Send),
    ) -> Result<Resolution> {
        let mut ordered: Vec<&WorkflowOption> = workflows.iter().filter(|w| w.enabled).collect();
        ordered.sort_by_key(|w| w.priority);

        if ordered.is_empty() || templates.is_empty() {
            return Err(ForgeError::NoViableCombination {
                workflows: ordered.len(),
                templates: templates.len(),
                submissions: 0,
            });
        }

        // Same task id, same starting template: reproducible for one run's
        // retries without biasing the whole fleet toward index 0.
        let start = task_id.hash_index(templates.len());
        info!(
            task_id = %task_id,
            workflows = ordered.len(),
            templates = templates.len(),
            start_offset = start,
            "resolving workflow/template combination"
        );

        let mut submissions = 0usize;
        let mut ordinal = 0usize;

        for workflow in &ordered {
            for step in 0..templates.len() {
                let template = &templates[(start + step) % templates.len()];

                if ordinal > 0 {
                    // Rapid-fire retries trip provider rate limits.
                    sleep(self.attempt_delay).await;
                }
                ordinal += 1;
                observe(ResolverEvent::Attempt {
                    workflow_id: workflow.id.clone(),
                    template_id: template.id.clone(),
                    ordinal,
                });
                debug!(
                    workflow = %workflow.id,
                    template = %template.id,
                    ordinal,
                    "attempting combination"
                );

                let template_url = match template.resolve(self.publisher).await {
                    Ok(url) => url,
                    Err(err) => {
                        warn!(template = %template.id, error = %err, "template unusable, skipping");
                        observe(ResolverEvent::TemplateSkipped {
                            template_id: template.id.clone(),
                            reason: err.to_string(),
                        });
                        continue;
                    }
                };

                let bindings = workflow
                    .slot_mapping
                    .bind(subject_urls, Some(&template_url))?;
                let request = GenerationRequest::new(&workflow.external_workflow_id)
                    .with_bindings(bindings);

                submissions += 1;
                let job = match self.synthesizer.submit(&request).await {
                    Ok(job) => job,
                    Err(err) if err.blames_user_asset() => {
                        // The offending input is the caller's own photo;
                        // no other template can change that.
                        return Err(ForgeError::UserAssetRejected {
                            message: err.to_string(),
                        });
                    }
                    Err(err) => {
                        warn!(
                            workflow = %workflow.id,
                            template = %template.id,
                            error = %err,
                            "submission failed, advancing to next template"
                        );
                        observe(ResolverEvent::TemplateSkipped {
                            template_id: template.id.clone(),
                            reason: err.to_string(),
                        });
                        continue;
                    }
                };

                match self
                    .poller
                    .wait(self.synthesizer, &job, &mut |p| {
                        observe(ResolverEvent::Poll(p))
                    })
                    .await
                {
                    Ok(image_url) => {
                        info!(
                            workflow = %workflow.id,
                            template = %template.id,
                            submissions,
                            "combination succeeded"
                        );
                        return Ok(Resolution {
                            image_url,
                            workflow_id: workflow.id.clone(),
                            template_id: template.id.clone(),
                            submissions,
                        });
                    }
                    Err(err) => {
                        warn!(
                            workflow = %workflow.id,
                            template = %template.id,
                            error = %err,
                            "job did not complete, advancing to next template"
                        );
                        observe(ResolverEvent::TemplateSkipped {
                            template_id: template.id.clone(),
                            reason: err.to_string(),
                        });
                    }
                }
            }

            observe(ResolverEvent::WorkflowExhausted {
                workflow_id: workflow.id.clone(),
            });
        }

        Err(ForgeError::NoViableCombination {
            workflows: ordered.len(),
            templates: templates.len(),
            submissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::super::SlotMapping;
    use super::*;
    use crate::config::PollerConfig;
    use crate::provider::{JobId, JobStatus, PublishedAsset, RejectionSubject, SubmitError};

    struct StubPublisher;

    #[async_trait]
    impl AssetPublisher for StubPublisher {
        async fn publish(&self, payload: &str) -> Result<PublishedAsset> {
            Ok(PublishedAsset {
                url: format!("https://cdn.example/{payload}"),
            })
        }
    }

    /// Scripted synthesizer: each submit pops the next outcome; jobs succeed
    /// on the first poll.
    struct ScriptedSynthesizer {
        outcomes: Mutex<VecDeque<std::result::Result<(), SubmitError>>>,
        submitted: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedSynthesizer {
        fn new(outcomes: Vec<std::result::Result<(), SubmitError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn submissions(&self) -> usize {
            self.submitted.lock().len()
        }
    }

    #[async_trait]
    impl ImageSynthesizer for ScriptedSynthesizer {
        async fn submit(
            &self,
            request: &GenerationRequest,
        ) -> std::result::Result<JobId, SubmitError> {
            self.submitted.lock().push(request.clone());
            match self.outcomes.lock().pop_front() {
                Some(Ok(())) => Ok(JobId("job".into())),
                Some(Err(err)) => Err(err),
                None => Ok(JobId("job".into())),
            }
        }

        async fn poll(&self, _job: &JobId) -> std::result::Result<JobStatus, SubmitError> {
            Ok(JobStatus::Succeeded {
                image_url: "https://cdn.example/result.png".into(),
            })
        }
    }

    fn template_rejection() -> SubmitError {
        SubmitError::Moderation {
            subject: RejectionSubject::TemplateAsset,
            code: Some(100_031),
            message: "template blocked".into(),
        }
    }

    fn workflows() -> Vec<WorkflowOption> {
        vec![WorkflowOption::new("fusion-a", "wf-ext-a")
            .with_slot_mapping(SlotMapping::new(vec!["21"], vec!["40"]))]
    }

    fn templates(n: usize) -> Vec<TemplateAsset> {
        (0..n)
            .map(|i| TemplateAsset::remote(format!("tpl-{i}"), format!("https://cdn.example/t{i}")))
            .collect()
    }

    fn poller() -> StatusPoller {
        StatusPoller::new(PollerConfig::default())
    }

    fn subject() -> Vec<String> {
        vec!["https://cdn.example/user.png".to_string()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_template_rejected_second_succeeds() {
        let synthesizer = ScriptedSynthesizer::new(vec![Err(template_rejection()), Ok(())]);
        let poller = poller();
        let resolver = FallbackResolver::new(
            &synthesizer,
            &StubPublisher,
            &poller,
            Duration::from_secs(1),
        );

        let resolution = resolver
            .resolve(
                &TaskId::from("task_1_fixed"),
                &workflows(),
                &templates(3),
                &subject(),
                &mut |_| {},
            )
            .await
            .unwrap();

        assert_eq!(resolution.submissions, 2);
        assert_eq!(synthesizer.submissions(), 2);
        assert_eq!(resolution.image_url, "https://cdn.example/result.png");
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_asset_rejection_aborts_immediately() {
        let synthesizer = ScriptedSynthesizer::new(vec![Err(SubmitError::Moderation {
            subject: RejectionSubject::UserAsset,
            code: Some(100_031),
            message: "input image blocked".into(),
        })]);
        let poller = poller();
        let resolver = FallbackResolver::new(
            &synthesizer,
            &StubPublisher,
            &poller,
            Duration::from_secs(1),
        );

        let err = resolver
            .resolve(
                &TaskId::from("task_1_fixed"),
                &workflows(),
                &templates(5),
                &subject(),
                &mut |_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::UserAssetRejected { .. }));
        assert_eq!(synthesizer.submissions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_counts_full_pool() {
        let pool_size = 4;
        let synthesizer =
            ScriptedSynthesizer::new((0..pool_size).map(|_| Err(template_rejection())).collect());
        let poller = poller();
        let resolver = FallbackResolver::new(
            &synthesizer,
            &StubPublisher,
            &poller,
            Duration::from_secs(1),
        );

        let err = resolver
            .resolve(
                &TaskId::from("task_1_fixed"),
                &workflows(),
                &templates(pool_size),
                &subject(),
                &mut |_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ForgeError::NoViableCombination {
                workflows: 1,
                templates: 4,
                submissions: 4,
            }
        ));
        assert_eq!(synthesizer.submissions(), pool_size);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visits_each_pair_at_most_once() {
        let wf = vec![
            WorkflowOption::new("a", "wf-a")
                .with_slot_mapping(SlotMapping::new(vec!["21"], vec!["40"])),
            WorkflowOption::new("b", "wf-b")
                .with_priority(1)
                .with_slot_mapping(SlotMapping::new(vec!["21"], vec!["40"])),
        ];
        let tpl = templates(3);
        let synthesizer = ScriptedSynthesizer::new((0..6).map(|_| Err(template_rejection())).collect());
        let poller = poller();
        let resolver = FallbackResolver::new(
            &synthesizer,
            &StubPublisher,
            &poller,
            Duration::from_secs(1),
        );

        let mut attempts = Vec::new();
        let _ = resolver
            .resolve(
                &TaskId::from("task_1_fixed"),
                &wf,
                &tpl,
                &subject(),
                &mut |event| {
                    if let ResolverEvent::Attempt {
                        workflow_id,
                        template_id,
                        ..
                    } = event
                    {
                        attempts.push((workflow_id, template_id));
                    }
                },
            )
            .await;

        assert_eq!(attempts.len(), 6);
        let unique: std::collections::HashSet<_> = attempts.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_offset_is_deterministic() {
        let task_id = TaskId::from("task_1700000000000_abcdef123");
        let tpl = templates(5);
        let mut first_attempts = Vec::new();

        for _ in 0..3 {
            let synthesizer = ScriptedSynthesizer::new(vec![Ok(())]);
            let poller = poller();
            let resolver = FallbackResolver::new(
                &synthesizer,
                &StubPublisher,
                &poller,
                Duration::from_secs(1),
            );
            let resolution = resolver
                .resolve(&task_id, &workflows(), &tpl, &subject(), &mut |_| {})
                .await
                .unwrap();
            first_attempts.push(resolution.template_id);
        }

        assert!(first_attempts.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(first_attempts[0], tpl[task_id.hash_index(5)].id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_workflows_are_ignored() {
        let wf = vec![
            WorkflowOption::new("off", "wf-off")
                .disabled()
                .with_slot_mapping(SlotMapping::new(vec!["21"], vec!["40"])),
            WorkflowOption::new("on", "wf-on")
                .with_priority(5)
                .with_slot_mapping(SlotMapping::new(vec!["21"], vec!["40"])),
        ];
        let synthesizer = ScriptedSynthesizer::new(vec![Ok(())]);
        let poller = poller();
        let resolver = FallbackResolver::new(
            &synthesizer,
            &StubPublisher,
            &poller,
            Duration::from_secs(1),
        );

        let resolution = resolver
            .resolve(
                &TaskId::from("task_1_fixed"),
                &wf,
                &templates(2),
                &subject(),
                &mut |_| {},
            )
            .await
            .unwrap();
        assert_eq!(resolution.workflow_id, "on");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pools_fail_without_submitting() {
        let synthesizer = ScriptedSynthesizer::new(vec![]);
        let poller = poller();
        let resolver = FallbackResolver::new(
            &synthesizer,
            &StubPublisher,
            &poller,
            Duration::from_secs(1),
        );

        let err = resolver
            .resolve(
                &TaskId::from("task_1_fixed"),
                &workflows(),
                &[],
                &subject(),
                &mut |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ForgeError::NoViableCombination {
                submissions: 0,
                ..
            }
        ));
        assert_eq!(synthesizer.submissions(), 0);
    }
}
