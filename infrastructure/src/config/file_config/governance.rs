//! Governance preamble configuration from TOML (`[governance]` section)

use super::{ConfigIssue, check_unit};
use delib_domain::GovernancePreamble;
use serde::{Deserialize, Serialize};

/// Raw `[governance]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGovernanceConfig {
    /// Replacement constitution text; the built-in one is used when unset
    pub preamble: Option<String>,
    /// Integrity score participants are asked to maintain
    pub integrity_threshold: f64,
}

impl Default for FileGovernanceConfig {
    fn default() -> Self {
        Self {
            preamble: None,
            integrity_threshold: GovernancePreamble::default().integrity_threshold(),
        }
    }
}

impl FileGovernanceConfig {
    pub fn to_preamble(&self) -> GovernancePreamble {
        match self.preamble.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(text) => GovernancePreamble::new(text, self.integrity_threshold),
            None => {
                let default = GovernancePreamble::default();
                GovernancePreamble::new(default.text(), self.integrity_threshold)
            }
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        check_unit(
            issues,
            "governance.integrity_threshold",
            self.integrity_threshold,
        );
    }
}
