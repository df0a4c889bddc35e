//! Progress reporting for mission execution.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{ForgeError, Result};

/// One phase of the mission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploading,
    FeatureExtraction,
    Generating,
    Caption,
    Complete,
    Error,
}

impl Stage {
    pub fn allowed_transitions(&self) -> &'static [Stage] {
        use Stage::*;
        match self {
            Uploading => &[FeatureExtraction, Generating, Error],
            FeatureExtraction => &[Generating, Error],
            Generating => &[Caption, Complete, Error],
            Caption => &[Complete, Error],
            Complete => &[],
            Error => &[],
        }
    }

    pub fn can_transition_to(&self, target: Stage) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uploading => "Uploading",
            Self::FeatureExtraction => "FeatureExtraction",
            Self::Generating => "Generating",
            Self::Caption => "Caption",
            Self::Complete => "Complete",
            Self::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// Transient progress notification. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent,
            message: message.into(),
            extracted_tags: None,
            error: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.extracted_tags = Some(tags);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Receiver of progress events. Delivery is advisory: a sink must not block
/// mission execution, and dropping events is acceptable.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that forwards events onto a bounded channel. When the receiver lags
/// behind, new events are dropped rather than stalling the mission.
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.try_send(event);
    }
}

/// Drives a sink while holding the state-machine invariants: one event per
/// stage transition, no re-entry of a stage once left, and percent
/// monotonically non-decreasing within a stage.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    cursor: Mutex<Option<(Stage, u8)>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            cursor: Mutex::new(None),
        }
    }

    pub fn current_stage(&self) -> Option<Stage> {
        self.cursor.lock().map(|(stage, _)| stage)
    }

    /// Enter `stage` and emit exactly one event for the transition.
    pub fn transition(&self, stage: Stage, percent: u8, message: impl Into<String>) -> Result<()> {
        self.transition_event(ProgressEvent::new(stage, percent, message))
    }

    pub fn transition_event(&self, event: ProgressEvent) -> Result<()> {
        {
            let mut cursor = self.cursor.lock();
            if let Some((current, _)) = *cursor {
                if !current.can_transition_to(event.stage) {
                    return Err(ForgeError::InvalidStageTransition {
                        from: current.to_string(),
                        to: event.stage.to_string(),
                    });
                }
            }
            *cursor = Some((event.stage, event.percent));
        }
        self.sink.emit(event);
        Ok(())
    }

    /// Advisory update within the current stage. Percent is clamped so it
    /// never moves backwards inside a stage. A no-op before the first
    /// transition.
    pub fn update(&self, percent: u8, message: impl Into<String>) {
        self.apply_update(percent, message.into(), None);
    }

    pub fn update_with_tags(&self, percent: u8, message: impl Into<String>, tags: Vec<String>) {
        self.apply_update(percent, message.into(), Some(tags));
    }

    fn apply_update(&self, percent: u8, message: String, tags: Option<Vec<String>>) {
        let (stage, percent) = {
            let mut cursor = self.cursor.lock();
            let Some((stage, last_percent)) = *cursor else {
                return;
            };
            let percent = percent.max(last_percent);
            *cursor = Some((stage, percent));
            (stage, percent)
        };
        let mut event = ProgressEvent::new(stage, percent, message);
        event.extracted_tags = tags;
        self.sink.emit(event);
    }

    /// Terminal error notification; emitted once, from any non-terminal stage.
    pub fn error(&self, message: impl Into<String>, detail: impl Into<String>) {
        {
            let mut cursor = self.cursor.lock();
            if matches!(*cursor, Some((stage, _)) if stage.is_terminal()) {
                return;
            }
            *cursor = Some((Stage::Error, 0));
        }
        self.sink
            .emit(ProgressEvent::new(Stage::Error, 0, message).with_error(detail));
    }
}
