//! Upstream market-data providers
//!
//! [`MarketDataProvider`] is the raw, provider-shaped surface: it returns
//! errors as-is and knows nothing about retries or candidate rules. The
//! resilient layer in [`crate::market_data`] sits on top of it.

pub mod yahoo;

use crate::error::Result;
use crate::model::{RawInfo, RawNewsItem};
use async_trait::async_trait;
use std::collections::HashMap;

pub use yahoo::YahooProvider;

/// Close prices per ticker from a batched request
pub type BatchCloses = HashMap<String, Vec<Option<f64>>>;

/// Raw access to one market-data vendor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily closes over `range` (e.g. "1mo"), oldest first
    async fn close_series(&self, ticker: &str, range: &str) -> Result<Vec<Option<f64>>>;

    /// Company name, 52-week bounds, valuation and analyst consensus
    async fn info(&self, ticker: &str) -> Result<RawInfo>;

    /// Recent news items for the ticker
    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<RawNewsItem>>;

    /// Daily closes for many tickers in as few requests as possible
    async fn batch_close_series(&self, tickers: &[String], range: &str) -> Result<BatchCloses>;

    /// Drop cookies, tokens and connections so the next call starts a new session
    async fn reset_session(&self);
}
