//! Stage executors: thin adapters around one external capability call each,
//! plus the polling they need.

mod caption;
mod card;
mod features;
mod generate;
mod multi;
mod restore;

pub use caption::CaptionStage;
pub use card::{CardDraw, CardDrawStage, CardFace, Rarity};
pub use features::{ExtractedFeatures, FeatureExtractor, DEFAULT_INSTRUCTION};
pub use generate::{PromptTemplate, SingleGeneration, FEATURES_PLACEHOLDER};
pub use multi::MultiSubjectStage;
pub use restore::{Restoration, RestorationStage, RESTORE_INSTRUCTION};
