use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote job state as seen through the minimal submit/poll contract.
///
/// Adapters translate raw provider status codes into this enum at the
/// boundary; numeric codes never reach the orchestration core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum JobStatus {
    Pending {
        /// Provider-reported completion fraction in `0.0..=1.0`, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fraction: Option<f32>,
    },
    Succeeded {
        image_url: String,
    },
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u32>,
        message: String,
    },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// Opaque handle for an asynchronous generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which input a content-moderation rejection blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionSubject {
    /// The caller's own photo. Terminal: no template swap can help.
    UserAsset,
    /// A pooled template asset. Recoverable by trying the next one.
    TemplateAsset,
}

impl fmt::Display for RejectionSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserAsset => f.write_str("user photo"),
            Self::TemplateAsset => f.write_str("template"),
        }
    }
}

/// Classified submission failure. The classification is the adapter's
/// responsibility: it knows its provider's codes and which request slot a
/// rejection points at, so the core never pattern-matches error text.
#[derive(Error, Debug, Clone)]
pub enum SubmitError {
    #[error("content moderation rejected the {subject}: {message}")]
    Moderation {
        subject: RejectionSubject,
        code: Option<u32>,
        message: String,
    },

    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider rejected the request: {message}")]
    Provider { code: Option<u32>, message: String },
}

impl SubmitError {
    pub fn blames_user_asset(&self) -> bool {
        matches!(
            self,
            Self::Moderation {
                subject: RejectionSubject::UserAsset,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending { fraction: None }.is_terminal());
        assert!(JobStatus::Succeeded {
            image_url: "https://cdn.example/a.png".into()
        }
        .is_terminal());
        assert!(JobStatus::Failed {
            code: Some(6),
            message: "boom".into()
        }
        .is_terminal());
    }

    #[test]
    fn test_user_asset_blame() {
        let user = SubmitError::Moderation {
            subject: RejectionSubject::UserAsset,
            code: Some(100_031),
            message: "input image blocked".into(),
        };
        let template = SubmitError::Moderation {
            subject: RejectionSubject::TemplateAsset,
            code: Some(100_031),
            message: "template blocked".into(),
        };
        assert!(user.blames_user_asset());
        assert!(!template.blames_user_asset());
        assert!(!SubmitError::Transient("502".into()).blames_user_asset());
    }
}
