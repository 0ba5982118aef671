//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to application types on
//! demand.

mod deliberation;
mod governance;
mod ledger;
mod output;
mod participants;
mod router;

pub use deliberation::FileDeliberationConfig;
pub use governance::FileGovernanceConfig;
pub use ledger::FileLedgerConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use participants::{FileParticipantConfig, resolve_participants};
pub use router::FileRouterConfig;

use delib_domain::ModelConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How serious a configuration issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The configuration cannot work as written
    Error,
    /// The configuration works but may not behave as expected
    Warning,
}

/// A single problem found by [`FileConfig::validate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    /// Dotted path of the offending key, e.g. `participants.claude.model`
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}: {}: {}", self.field, self.message)
    }
}

fn check_unit(issues: &mut Vec<ConfigIssue>, field: &str, value: f64) {
    if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
        issues.push(ConfigIssue::error(
            field,
            format!("{value} is outside the range [0, 1]"),
        ));
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Session loop limits
    pub deliberation: FileDeliberationConfig,
    /// Retry and HTTP timeout settings
    pub router: FileRouterConfig,
    /// Constitution prepended to every query
    pub governance: FileGovernanceConfig,
    /// Participant models keyed by participant id
    pub participants: BTreeMap<String, FileParticipantConfig>,
    /// Optional attestation ledger
    pub ledger: FileLedgerConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Credentials are looked up in the process environment.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        self.validate_with_env(&|name| std::env::var(name).ok())
    }

    pub fn validate_with_env(&self, env: &dyn Fn(&str) -> Option<String>) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        self.deliberation.validate(&mut issues);
        self.router.validate(&mut issues);
        self.governance.validate(&mut issues);
        self.ledger.validate(&mut issues);

        if self.participants.is_empty() {
            issues.push(ConfigIssue::error(
                "participants",
                "no participants configured; add at least one [participants.<id>] table",
            ));
        }
        issues.extend(resolve_participants(&self.participants, env).1);

        issues
    }

    /// Participant configs with credentials read from the process environment
    pub fn participant_configs(&self) -> HashMap<String, ModelConfig> {
        resolve_participants(&self.participants, &|name| std::env::var(name).ok()).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delib_domain::ProviderKind;
    use std::time::Duration;

    const FULL: &str = r#"
[deliberation]
max_rounds = 3
timeout_secs = 120

[router]
max_attempts = 2
backoff_base_ms = 250

[governance]
integrity_threshold = 0.9

[participants.claude]
provider = "anthropic"
model = "claude-sonnet-4-5-20250929"
api_key = "inline-key"
expertise = ["ethics", "architecture"]
weight = 1.2

[participants.gpt4]
provider = "openai"
model = "gpt-4-turbo"
api_key_env = "DELIB_TEST_UNSET_KEY"

[ledger]
url = "http://localhost:4000"

[output]
format = "json"
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_deserialize_full_config() {
        let config: FileConfig = toml::from_str(FULL).unwrap();

        let params = config.deliberation.to_params();
        assert_eq!(params.max_rounds, 3);
        assert_eq!(params.timeout, Duration::from_secs(120));
        assert_eq!(params.digest_chars, 200);

        let policy = config.router.to_retry_policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(250));

        assert_eq!(config.governance.to_preamble().integrity_threshold(), 0.9);
        assert_eq!(config.participants.len(), 2);
        assert_eq!(config.participants["claude"].weight, 1.2);
        assert!(config.ledger.is_configured());
        assert_eq!(config.output.format, Some(FileOutputFormat::Json));
    }

    #[test]
    fn test_resolved_participants() {
        let config: FileConfig = toml::from_str(FULL).unwrap();
        let (resolved, issues) = resolve_participants(&config.participants, &no_env);

        let claude = &resolved["claude"];
        assert_eq!(claude.provider, ProviderKind::Anthropic);
        assert_eq!(claude.credential(), Some("inline-key"));
        assert_eq!(claude.expertise, vec!["ethics", "architecture"]);

        assert!(resolved["gpt4"].credential().is_none());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("DELIB_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.participants.is_empty());
        assert!(!config.ledger.is_configured());
        assert!(config.output.color);
        assert_eq!(config.deliberation.max_rounds, 5);
    }

    #[test]
    fn test_default_config_requires_participants() {
        let issues = FileConfig::default().validate_with_env(&no_env);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "participants");
        assert!(ConfigIssue::has_errors(&issues));
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let config: FileConfig = toml::from_str(
            r#"
[deliberation]
convergence_threshold = 2.0

[governance]
integrity_threshold = -0.5

[participants.x]
provider = "unknown"
model = "m"
"#,
        )
        .unwrap();

        let issues = config.validate_with_env(&no_env);
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "deliberation.convergence_threshold",
                "governance.integrity_threshold",
                "participants.x.provider"
            ]
        );
    }

    #[test]
    fn test_issue_display() {
        let issue = ConfigIssue::warning("router.max_attempts", "is 0");
        assert_eq!(issue.to_string(), "warning: router.max_attempts: is 0");
    }
}
