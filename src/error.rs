use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Photo upload failed: {0}")]
    PublishFailed(String),

    #[error("Uploaded photo was rejected by content moderation: {message}")]
    UserAssetRejected { message: String },

    #[error(
        "No viable workflow/template combination: {submissions} submissions across \
         {workflows} workflows and {templates} templates all failed"
    )]
    NoViableCombination {
        workflows: usize,
        templates: usize,
        submissions: usize,
    },

    #[error("Generation job failed: {message}")]
    JobFailed { code: Option<u32>, message: String },

    #[error("Generation job timed out after {attempts} status checks")]
    JobTimeout { attempts: u32 },

    #[error("Feature extraction failed: {0}")]
    FeatureExtraction(String),

    #[error("Invalid mission input: {0}")]
    InvalidInput(String),

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidStageTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    /// Whether the fallback resolver may answer this failure by advancing to
    /// the next (workflow, template) pair. A moderation rejection of the
    /// user's own photo is the one failure no amount of retrying can fix.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        !matches!(self, Self::UserAssetRejected { .. })
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
