//! Exchange rate abstractions

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Every rate is quoted against this currency.
pub const BASE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("Currency API key not configured. Please set CURRENCY_API_KEY environment variable.")]
    MissingApiKey,
    #[error("Currency rate request failed: {0}")]
    Upstream(String),
}

/// Source of USD based exchange rates.
///
/// Implementations make a single attempt per call. Callers decide what a
/// failure means for them.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Returns the positive rate for one USD in `currency`.
    async fn fetch_rate(&self, currency: &str) -> Result<Decimal, RateError>;
}
