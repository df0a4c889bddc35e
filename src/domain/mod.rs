mod mission;
mod progress;
mod task_id;

pub use mission::{Gender, MissionInput, MissionResult, ResultMetadata};
pub use progress::{ChannelSink, ProgressEvent, ProgressReporter, ProgressSink, Stage};
pub use task_id::TaskId;
