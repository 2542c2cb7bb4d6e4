//! Resilient market-data access
//!
//! [`MarketDataSource`] is what the pipeline talks to. Its methods never
//! fail: a ticker that cannot be fetched comes back as `None` or an empty
//! list, so one bad symbol cannot abort a screen.

use crate::api::{BatchCloses, MarketDataProvider};
use crate::config::InsightConfig;
use crate::error::Result;
use crate::model::{Candidate, NewsItem, RawMarketRecord, lookback_change, normalize};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Seed universe scanned for movers: tech, AI/cloud, healthcare, finance,
/// consumer and a handful of industrials/energy/media names
pub const MOVER_UNIVERSE: [&str; 54] = [
    // Tech
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "TSLA", "AMD", "INTC", "CRM", "ORCL", "ADBE",
    "NOW", "SNOW", "PLTR", "NET", "DDOG", "ZM",
    // AI/Cloud
    "SMCI", "ARM", "AVGO", "MU", "QCOM", "MRVL",
    // Healthcare
    "UNH", "JNJ", "PFE", "ABBV", "MRK", "LLY", "TMO", "ABT",
    // Finance
    "JPM", "BAC", "WFC", "GS", "MS", "V", "MA", "PYPL",
    // Consumer
    "WMT", "COST", "TGT", "HD", "NKE", "SBUX", "MCD",
    // Other
    "XOM", "CVX", "BA", "CAT", "GE", "DIS", "NFLX",
];

/// Known high-volatility names returned when the batched scan fails outright
pub const FALLBACK_MOVERS: [&str; 5] = ["NVDA", "TSLA", "AMD", "META", "SMCI"];

/// Candidate-level market data access
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch and normalize one ticker; `None` when no valid price is available
    async fn fetch(&self, ticker: &str) -> Option<Candidate>;

    /// Tickers from `universe` with the largest recent moves, biggest first
    async fn fetch_movers(&self, universe: &[String], limit: usize) -> Vec<String>;

    /// Up to `limit` (headline, URL) pairs; empty on any failure
    async fn fetch_news(&self, ticker: &str, limit: usize) -> Vec<NewsItem>;
}

/// The seed universe as owned strings
pub fn default_universe() -> Vec<String> {
    MOVER_UNIVERSE.iter().map(ToString::to_string).collect()
}

/// Select tickers whose move over the batch window clears `threshold_pct`
///
/// Keeps universe order among equal moves. Series with fewer than two
/// finite closes, or with a non-positive first or last close, are ignored.
pub fn rank_movers(
    universe: &[String],
    closes: &BatchCloses,
    threshold_pct: f64,
    limit: usize,
) -> Vec<String> {
    let mut movers: Vec<(&String, f64)> = universe
        .iter()
        .filter_map(|ticker| {
            let series = closes.get(ticker)?;
            let valid_points = series.iter().flatten().filter(|v| v.is_finite()).count();
            if valid_points < 2 {
                return None;
            }
            let (_, change) = lookback_change(series)?;
            (change.abs() >= threshold_pct).then_some((ticker, change))
        })
        .collect();

    movers.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    movers
        .into_iter()
        .take(limit)
        .map(|(ticker, _)| ticker.clone())
        .collect()
}

/// [`MarketDataSource`] over a raw provider, with retries and session resets
pub struct ResilientMarketData {
    provider: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
    history_range: String,
    mover_range: String,
    mover_threshold_pct: f64,
}

impl ResilientMarketData {
    /// Wrap a provider using the ranges, threshold and retry policy from `config`
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: &InsightConfig) -> Self {
        Self {
            provider,
            retry: config.market_retry.clone(),
            history_range: config.history_range.clone(),
            mover_range: config.mover_range.clone(),
            mover_threshold_pct: config.mover_threshold_pct,
        }
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run `call` under the retry policy, resetting the session after every
    /// auth failure so the next attempt gets a fresh cookie and crumb
    async fn call_with_reset<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry
            .execute(operation, || {
                let attempt = call();
                async move {
                    match attempt.await {
                        Err(e) if e.is_auth_failure() => {
                            debug!(operation, error = %e, "Auth failure, resetting session");
                            self.provider.reset_session().await;
                            Err(e)
                        }
                        other => other,
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl MarketDataSource for ResilientMarketData {
    async fn fetch(&self, ticker: &str) -> Option<Candidate> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return None;
        }

        let closes = match self
            .call_with_reset("price", || {
                self.provider.close_series(&ticker, &self.history_range)
            })
            .await
        {
            Ok(closes) => closes,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Price fetch failed");
                return None;
            }
        };

        if lookback_change(&closes).is_none() {
            warn!(ticker = %ticker, points = closes.len(), "No valid price in history");
            return None;
        }

        let info = match self
            .call_with_reset("enrichment", || self.provider.info(&ticker))
            .await
        {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(ticker = %ticker, error = %e, "Enrichment unavailable, continuing without it");
                None
            }
        };

        normalize(
            RawMarketRecord {
                ticker,
                closes,
                info,
                news: Vec::new(),
            },
            Utc::now(),
        )
    }

    async fn fetch_movers(&self, universe: &[String], limit: usize) -> Vec<String> {
        let batch = self
            .call_with_reset("movers", || {
                self.provider.batch_close_series(universe, &self.mover_range)
            })
            .await;

        match batch {
            Ok(closes) => {
                let movers = rank_movers(universe, &closes, self.mover_threshold_pct, limit);
                info!(
                    scanned = universe.len(),
                    returned = closes.len(),
                    movers = movers.len(),
                    "Mover scan complete"
                );
                movers
            }
            Err(e) => {
                warn!(error = %e, "Mover scan failed, using fallback list");
                FALLBACK_MOVERS
                    .iter()
                    .take(limit)
                    .map(ToString::to_string)
                    .collect()
            }
        }
    }

    async fn fetch_news(&self, ticker: &str, limit: usize) -> Vec<NewsItem> {
        if limit == 0 {
            return Vec::new();
        }

        match self.provider.news(ticker, limit).await {
            Ok(items) => items
                .into_iter()
                .filter_map(NewsItem::from_raw)
                .take(limit)
                .collect(),
            Err(e) => {
                if e.is_auth_failure() {
                    self.provider.reset_session().await;
                }
                debug!(ticker, error = %e, "News unavailable");
                Vec::new()
            }
        }
    }
}
