//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`DeliberationParams`]: session loop control (rounds, timeout, thresholds)
//! - [`RetryPolicy`]: participant query retries and backoff

pub mod deliberation_params;
pub mod retry_policy;

pub use deliberation_params::DeliberationParams;
pub use retry_policy::RetryPolicy;
