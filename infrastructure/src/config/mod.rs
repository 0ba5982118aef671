//! Configuration file loading for delib-quorum
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./delib.toml` or `./.delib.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/delib-quorum/config.toml`
//! 4. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileConfig, FileDeliberationConfig, FileGovernanceConfig, FileLedgerConfig,
    FileOutputConfig, FileOutputFormat, FileParticipantConfig, FileRouterConfig, Severity,
    resolve_participants,
};
pub use loader::{ConfigLoader, ConfigSource, ConfigSourceKind};
