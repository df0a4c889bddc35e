mod capability;
mod status;

pub use capability::{
    AssetPublisher, GenerationRequest, ImageSynthesizer, PublishedAsset, SlotBinding, TextComposer,
    VisionDescriber,
};
pub use status::{JobId, JobStatus, RejectionSubject, SubmitError};
