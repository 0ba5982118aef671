//! Ledger configuration from TOML (`[ledger]` section)

use super::ConfigIssue;
use crate::ledger::{DEFAULT_LEDGER_TIMEOUT, HttpLedgerClient};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw `[ledger]` section; no URL means no ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLedgerConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FileLedgerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: DEFAULT_LEDGER_TIMEOUT.as_secs(),
        }
    }
}

impl FileLedgerConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Build a client when a URL is configured
    pub fn to_client(&self, client: reqwest::Client) -> Option<HttpLedgerClient> {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|url| {
                HttpLedgerClient::new(client, url.trim())
                    .with_timeout(Duration::from_secs(self.timeout_secs))
            })
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        let bad_scheme = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty() && !(u.starts_with("http://") || u.starts_with("https://")));
        if let Some(url) = bad_scheme {
            issues.push(ConfigIssue::error(
                "ledger.url",
                format!("ledger url '{url}' must start with http:// or https://"),
            ));
        }
        if self.is_configured() && self.timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                "ledger.timeout_secs",
                "timeout_secs cannot be 0",
            ));
        }
    }
}
