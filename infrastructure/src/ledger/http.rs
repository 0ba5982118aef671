//! HTTP ledger client
//!
//! Posts `{action, data, timestamp}` to `{base}/api/attestations` and reads
//! the attestation hash from the response body.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use delib_application::{LedgerClient, LedgerError, LedgerReceipt};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct AttestationRequest<'a> {
    action: &'a str,
    data: serde_json::Value,
    timestamp: String,
}

/// [`LedgerClient`] backed by a remote attestation service
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpLedgerClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/attestations", self.base_url)
    }
}

/// Decode an attestation response; a receipt without a hash is rejected
fn parse_receipt(body: &str) -> Result<LedgerReceipt, LedgerError> {
    let receipt: LedgerReceipt =
        serde_json::from_str(body).map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
    if receipt.hash.trim().is_empty() {
        return Err(LedgerError::InvalidResponse("empty attestation hash".into()));
    }
    Ok(receipt)
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn attest(
        &self,
        action: &str,
        data: serde_json::Value,
    ) -> Result<LedgerReceipt, LedgerError> {
        let url = self.endpoint();
        let body = AttestationRequest {
            action,
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        debug!(%url, action, "Posting ledger attestation");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let receipt = parse_receipt(&text)?;
        info!(action, hash = %receipt.hash, "Ledger attestation recorded");
        Ok(receipt)
    }
}
