//! festival-forge: mission orchestration for multi-stage festival AI
//! content generation.
//!
//! The engine drives partially-asynchronous generation jobs through a
//! bounded stage machine, polls remote jobs with adaptive backoff, and
//! recovers from provider-side content-moderation rejections by searching
//! the workflow x template space. External capabilities (asset publishing,
//! vision description, image synthesis, text generation) are supplied by
//! the caller behind the `provider` traits.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use festival_forge::*;
//! # async fn demo(
//! #     capabilities: Capabilities,
//! #     catalog: AssetCatalog,
//! # ) -> Result<()> {
//! let store = ResultStore::in_memory(32);
//! let orchestrator = Orchestrator::new(capabilities, catalog, ForgeConfig::default(), store);
//!
//! let input = MissionInput::new()
//!     .with_image("data:image/png;base64,...")
//!     .with_gender(Gender::Female);
//! let result = orchestrator
//!     .run(MissionKind::FestiveTransform, input, &|event: ProgressEvent| {
//!         println!("{}% {}", event.percent, event.message);
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod persistence;
pub mod poller;
pub mod provider;
pub mod registry;
pub mod stage;

pub use config::{ForgeConfig, PersistenceConfig, PollerConfig, ResolverConfig};
pub use domain::{
    ChannelSink, Gender, MissionInput, MissionResult, ProgressEvent, ProgressSink, ResultMetadata,
    Stage, TaskId,
};
pub use error::{ForgeError, Result};
pub use fallback::{
    FallbackResolver, Resolution, ResolverEvent, SlotMapping, TemplateAsset, TemplateLocation,
    WorkflowOption,
};
pub use orchestrator::{AssetCatalog, Capabilities, Orchestrator};
pub use persistence::{FileBackend, MemoryBackend, ResultStore, StorageBackend, StorageError};
pub use poller::{PollProgress, StatusPoller};
pub use provider::{
    AssetPublisher, GenerationRequest, ImageSynthesizer, JobId, JobStatus, PublishedAsset,
    RejectionSubject, SlotBinding, SubmitError, TextComposer, VisionDescriber,
};
pub use registry::{MissionDescriptor, MissionKind};
pub use stage::{CardFace, PromptTemplate, Rarity};
