//! Exchange rate readings and the seams they flow through

use super::error::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// A single bid price as published by the upstream API.
///
/// The value is kept as the decimal string the API sent; it is never parsed
/// or rounded. Serializes as `{"bid": "<value>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateReading {
    bid: String,
}

impl RateReading {
    pub fn new(bid: impl Into<String>) -> Self {
        Self { bid: bid.into() }
    }

    pub fn bid(&self) -> &str {
        &self.bid
    }
}

impl Display for RateReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.bid)
    }
}

/// A reading after it has been stored as a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRate {
    pub id: i64,
    pub bid: String,
    pub created_at: DateTime<Utc>,
}

/// Produces a fresh reading on every call. One attempt, no retries.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rate(&self, timeout: Duration) -> Result<RateReading, Error>;
}

/// Append-only storage for readings.
#[async_trait]
pub trait RateRepository: Send + Sync {
    async fn persist(&self, reading: &RateReading, timeout: Duration)
    -> Result<PersistedRate, Error>;

    /// Most recent rows first.
    async fn recent(&self, limit: u32) -> Result<Vec<PersistedRate>, Error>;
}
