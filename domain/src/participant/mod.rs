//! Participants: the reasoning agents taking part in a deliberation.

pub mod model_config;

pub use model_config::{ModelConfig, ProviderKind};
