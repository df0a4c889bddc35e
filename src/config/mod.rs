mod settings;

pub use settings::{ForgeConfig, PersistenceConfig, PollerConfig, ResolverConfig};
