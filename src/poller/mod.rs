//! Generic adaptive-interval polling for asynchronous provider jobs.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::PollerConfig;
use crate::error::{ForgeError, Result};
use crate::provider::{ImageSynthesizer, JobId, JobStatus};

/// Advisory snapshot handed to the observer between status checks.
#[derive(Debug, Clone)]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
    pub elapsed: Duration,
    /// Provider-reported completion fraction, clamped to `0.0..=1.0`.
    pub fraction: Option<f32>,
    /// Rough time-to-completion estimate, available once the reported
    /// fraction is meaningful.
    pub remaining_estimate: Option<Duration>,
}

/// Blocks a stage until a remote job reaches a terminal state.
///
/// The inter-check interval grows with elapsed wall-clock time: early checks
/// are cheap signals of fast jobs, late checks avoid busy-waiting on slow
/// ones. A maximum attempt count bounds the worst case.
pub struct StatusPoller {
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    /// Interval to sleep after `elapsed` time in the polling loop.
    /// Non-decreasing in `elapsed` and always within the configured
    /// floor/ceiling.
    pub fn interval_after(&self, elapsed: Duration) -> Duration {
        if elapsed < self.config.early_threshold() {
            self.config.floor()
        } else if elapsed < self.config.late_threshold() {
            self.config.mid()
        } else {
            self.config.ceiling()
        }
    }

    /// Poll `job` to completion, reporting advisory progress to `observe`.
    ///
    /// Returns the result URL on success; a provider-reported failure or
    /// attempt exhaustion is an error. Transport failures of the status
    /// check itself are tolerated and consume an attempt.
    pub async fn wait(
        &self,
        synthesizer: &dyn ImageSynthesizer,
        job: &JobId,
        observe: &mut (dyn FnMut(PollProgress) + Send),
    ) -> Result<String> {
        let started = Instant::now();

        for attempt in 1..=self.config.max_attempts {
            sleep(self.interval_after(started.elapsed())).await;

            match synthesizer.poll(job).await {
                Ok(JobStatus::Succeeded { image_url }) => {
                    debug!(job = %job, attempt, "job succeeded");
                    return Ok(image_url);
                }
                Ok(JobStatus::Failed { code, message }) => {
                    return Err(ForgeError::JobFailed { code, message });
                }
                Ok(JobStatus::Pending { fraction }) => {
                    let elapsed = started.elapsed();
                    let fraction = fraction.map(|f| f.clamp(0.0, 1.0));
                    observe(PollProgress {
                        attempt,
                        max_attempts: self.config.max_attempts,
                        elapsed,
                        fraction,
                        remaining_estimate: estimate_remaining(elapsed, fraction),
                    });
                }
                Err(err) => {
                    debug!(job = %job, attempt, error = %err, "status check failed");
                }
            }
        }

        Err(ForgeError::JobTimeout {
            attempts: self.config.max_attempts,
        })
    }
}

/// Linear extrapolation from the reported fraction. Below 10% the estimate
/// is too noisy to show.
fn estimate_remaining(elapsed: Duration, fraction: Option<f32>) -> Option<Duration> {
    let fraction = fraction?;
    if fraction <= 0.1 {
        return None;
    }
    let total = elapsed.as_secs_f32() / fraction;
    let remaining = total - elapsed.as_secs_f32();
    if remaining <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f32(remaining))
}
