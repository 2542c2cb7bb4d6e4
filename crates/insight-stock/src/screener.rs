//! Candidate screening
//!
//! Two entry points share one fetch-and-annotate step:
//! - [`Screener::screen_universe`] walks the mover list in rank order,
//!   keeps names that moved at least `min_price_change_pct`, and stops as
//!   soon as `max_candidates` survive.
//! - [`Screener::screen_watchlist`] fetches every requested ticker with no
//!   movement filter, then sorts by absolute move and truncates.
//!
//! Neither fails. A ticker that cannot be fetched is skipped, and an empty
//! result means "no candidates".

use crate::config::InsightConfig;
use crate::market_data::{MarketDataSource, default_universe};
use crate::model::Candidate;
use std::sync::Arc;
use tracing::{debug, info};

/// Screens tickers into a bounded candidate list
pub struct Screener {
    source: Arc<dyn MarketDataSource>,
    config: Arc<InsightConfig>,
    universe: Vec<String>,
}

impl Screener {
    /// Create a screener over the default seed universe
    pub fn new(source: Arc<dyn MarketDataSource>, config: Arc<InsightConfig>) -> Self {
        Self {
            source,
            config,
            universe: default_universe(),
        }
    }

    /// Replace the seed universe used for mover discovery
    pub fn with_universe(mut self, universe: Vec<String>) -> Self {
        self.universe = universe;
        self
    }

    /// Attach up to `screen_headline_limit` recent headlines
    async fn annotate(&self, mut candidate: Candidate) -> Candidate {
        let headlines = self
            .source
            .fetch_news(&candidate.ticker, self.config.screen_headline_limit)
            .await
            .into_iter()
            .map(|item| item.headline)
            .collect();
        candidate.attach_headlines(headlines);
        candidate
    }

    /// Fetch one ticker, dropping anything without a positive price
    async fn fetch_valid(&self, ticker: &str) -> Option<Candidate> {
        let candidate = self.source.fetch(ticker).await;
        if candidate.is_none() {
            debug!(ticker, "Skipping unavailable ticker");
        }
        candidate.filter(|c| c.current_price > 0.0)
    }

    /// Screen the market movers
    pub async fn screen_universe(&self) -> Vec<Candidate> {
        let max = self.config.max_candidates;
        let min_change = self.config.min_price_change_pct;
        let movers = self
            .source
            .fetch_movers(&self.universe, self.config.mover_pool_size)
            .await;
        info!(movers = movers.len(), max, min_change, "Screening movers");

        let mut candidates = Vec::with_capacity(max);
        for ticker in &movers {
            if candidates.len() >= max {
                break;
            }

            let Some(candidate) = self.fetch_valid(ticker).await else {
                continue;
            };
            if candidate.abs_change() < min_change {
                debug!(
                    ticker = %ticker,
                    change = candidate.price_change_pct,
                    "Below movement threshold"
                );
                continue;
            }

            candidates.push(self.annotate(candidate).await);
        }

        info!(candidates = candidates.len(), "Universe screen complete");
        candidates
    }

    /// Screen a caller-supplied watchlist
    ///
    /// Duplicate tickers are fetched once per occurrence.
    pub async fn screen_watchlist(&self, tickers: &[String]) -> Vec<Candidate> {
        let mut candidates = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            if let Some(candidate) = self.fetch_valid(ticker).await {
                candidates.push(self.annotate(candidate).await);
            }
        }

        candidates.sort_by(|a, b| b.abs_change().total_cmp(&a.abs_change()));
        candidates.truncate(self.config.max_candidates);

        info!(
            requested = tickers.len(),
            candidates = candidates.len(),
            "Watchlist screen complete"
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::ScriptedSource;
    use crate::model::test_support::candidate;

    fn config(max: usize, min_change: f64) -> Arc<InsightConfig> {
        Arc::new(
            InsightConfig::builder()
                .max_candidates(max)
                .min_price_change_pct(min_change)
                .build()
                .unwrap(),
        )
    }

    fn tickers(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(ToString::to_string).collect()
    }

    fn symbols(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.ticker.as_str()).collect()
    }

    #[tokio::test]
    async fn test_watchlist_sorted_and_truncated() {
        let source = ScriptedSource::with_candidates(vec![
            candidate("A", 10.0, 2.0),
            candidate("B", 10.0, 9.0),
            candidate("C", 10.0, -6.0),
        ]);
        let screener = Screener::new(Arc::new(source), config(2, 10.0));

        let result = screener.screen_watchlist(&tickers(&["A", "B", "C"])).await;
        assert_eq!(symbols(&result), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_watchlist_skips_unavailable_and_ignores_threshold() {
        let source = ScriptedSource::with_candidates(vec![candidate("A", 10.0, 0.5)]);
        let screener = Screener::new(Arc::new(source), config(6, 10.0));

        let result = screener.screen_watchlist(&tickers(&["MISSING", "A"])).await;
        assert_eq!(symbols(&result), vec!["A"]);
    }

    #[tokio::test]
    async fn test_watchlist_duplicates_fetched_per_occurrence() {
        let source = Arc::new(ScriptedSource::with_candidates(vec![candidate(
            "NVDA", 100.0, 12.0,
        )]));
        let screener = Screener::new(Arc::clone(&source) as Arc<dyn MarketDataSource>, config(6, 10.0));

        let result = screener
            .screen_watchlist(&tickers(&["NVDA", "NVDA"]))
            .await;
        assert_eq!(symbols(&result), vec!["NVDA", "NVDA"]);
        assert_eq!(source.fetch_log(), tickers(&["NVDA", "NVDA"]));
    }

    #[tokio::test]
    async fn test_universe_filters_and_stops_early() {
        let source = Arc::new(ScriptedSource::with_candidates(vec![
            candidate("M1", 10.0, 4.0),
            candidate("M2", 10.0, -15.0),
            candidate("M3", 10.0, 11.0),
            candidate("M4", 10.0, 30.0),
        ]));
        let screener = Screener::new(Arc::clone(&source) as Arc<dyn MarketDataSource>, config(2, 10.0));

        let result = screener.screen_universe().await;
        // Mover order is kept; M4 is never fetched once the cap is hit.
        assert_eq!(symbols(&result), vec!["M2", "M3"]);
        assert_eq!(source.fetch_log(), tickers(&["M1", "M2", "M3"]));
    }

    #[tokio::test]
    async fn test_universe_attaches_headlines_and_catalyst() {
        let source = ScriptedSource::with_candidates(vec![candidate("TSLA", 200.0, -12.0)])
            .with_news("TSLA", &["Deliveries miss", "Recall", "Price cut", "Fourth"]);
        let screener = Screener::new(Arc::new(source), config(6, 10.0));

        let result = screener.screen_universe().await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].news_headlines.len(), 3);
        assert_eq!(result[0].catalyst.as_deref(), Some("Deliveries miss"));
    }

    #[tokio::test]
    async fn test_universe_drops_non_positive_price() {
        let source = ScriptedSource::with_candidates(vec![candidate("BAD", 0.0, 50.0)]);
        let screener = Screener::new(Arc::new(source), config(6, 10.0));

        assert!(screener.screen_universe().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_screen_is_not_an_error() {
        let screener = Screener::new(Arc::new(ScriptedSource::default()), config(6, 10.0));
        assert!(screener.screen_universe().await.is_empty());
        assert!(screener.screen_watchlist(&[]).await.is_empty());
    }
}
