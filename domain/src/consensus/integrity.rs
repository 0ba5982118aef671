//! Integrity score value object.
//!
//! Integrity scores come from an external constitutional scorer. This crate
//! never computes them; it only carries them alongside a verdict or proof.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction of an agent's recent integrity history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityTrend {
    Improving,
    Stable,
    Declining,
}

/// Result of an external integrity scoring call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityScore {
    pub score: f64,
    /// Per-clause scores
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
    pub trend: IntegrityTrend,
    pub threshold_met: bool,
}

impl IntegrityScore {
    pub fn new(score: f64, threshold: f64) -> Result<Self, DomainError> {
        let score = validate_unit_score("integrity_score", score)?;
        Ok(Self {
            score,
            breakdown: BTreeMap::new(),
            trend: IntegrityTrend::Stable,
            threshold_met: score >= threshold,
        })
    }

    pub fn with_breakdown(mut self, breakdown: BTreeMap<String, f64>) -> Self {
        self.breakdown = breakdown;
        self
    }

    pub fn with_trend(mut self, trend: IntegrityTrend) -> Self {
        self.trend = trend;
        self
    }
}

/// Reject NaN, infinities and values outside `[0, 1]`.
pub fn validate_unit_score(field: &'static str, value: f64) -> Result<f64, DomainError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::InvalidScore { field, value })
    }
}
