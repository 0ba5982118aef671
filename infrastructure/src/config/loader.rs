//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const PROJECT_FILES: [&str; 2] = ["delib.toml", ".delib.toml"];

/// Where a configuration layer comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSourceKind {
    Explicit,
    Project,
    Global,
    Default,
}

impl ConfigSourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ConfigSourceKind::Explicit => "Explicit",
            ConfigSourceKind::Project => "Project",
            ConfigSourceKind::Global => "Global",
            ConfigSourceKind::Default => "Default",
        }
    }
}

/// One candidate configuration layer, for `delib config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    /// `None` for built-in defaults
    pub path: Option<PathBuf>,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Project root: `./delib.toml` or `./.delib.toml`
    /// 3. XDG config: `$XDG_CONFIG_HOME/delib-quorum/config.toml`
    /// 4. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::load_from(
            Self::global_config_path().as_deref(),
            Self::project_config_path().as_deref(),
            config_path.map(PathBuf::as_path),
        )
    }

    /// Merge defaults with whichever of the given files exist.
    ///
    /// Missing global or project files are skipped; a missing explicit file
    /// is an error.
    pub fn load_from(
        global: Option<&Path>,
        project: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(path) = global.filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = project.filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Box::new(figment::Error::from(format!(
                    "config file not found: {}",
                    path.display()
                ))));
            }
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("delib-quorum").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Every layer [`load`](Self::load) would consider, highest priority first
    pub fn config_sources(config_path: Option<&PathBuf>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                kind: ConfigSourceKind::Explicit,
                path: Some(path.clone()),
                found: path.exists(),
            });
        }

        let project = Self::project_config_path();
        sources.push(ConfigSource {
            kind: ConfigSourceKind::Project,
            found: project.is_some(),
            path: Some(project.unwrap_or_else(|| PathBuf::from(PROJECT_FILES[0]))),
        });

        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                kind: ConfigSourceKind::Global,
                found: path.exists(),
                path: Some(path),
            });
        }

        sources.push(ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            found: true,
        });

        sources
    }
}
