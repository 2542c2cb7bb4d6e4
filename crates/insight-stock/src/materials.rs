//! Materials handed to content generation
//!
//! The assembler refreshes the selected candidate, pulls fresh news with
//! URLs, and packages everything a writer needs into a [`MaterialsBundle`].

use crate::market_data::MarketDataSource;
use crate::model::{Candidate, NewsItem, chart_url};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// News digest used when no items were found
pub const NO_NEWS: &str = "No recent news available.";

/// Payload consumed by the content-generation step
#[derive(Debug, Clone, Serialize)]
pub struct MaterialsBundle {
    pub ticker: String,
    pub company_name: String,
    pub price_summary: String,
    pub analyst_summary: String,
    pub news_items: Vec<NewsItem>,
    pub news_summary: String,
    pub chart_url: String,
    pub candidate: Candidate,
}

/// Plain-text news digest for prompt consumption
pub fn news_summary(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return NO_NEWS.to_string();
    }

    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push("Recent news and catalysts:".to_string());
    lines.extend(items.iter().map(|item| format!("- {}", item.headline)));
    lines.join("\n")
}

/// Builds [`MaterialsBundle`]s for selected candidates
pub struct MaterialsAssembler {
    source: Arc<dyn MarketDataSource>,
    news_limit: usize,
}

impl MaterialsAssembler {
    /// Create an assembler fetching up to `news_limit` news items
    pub fn new(source: Arc<dyn MarketDataSource>, news_limit: usize) -> Self {
        Self { source, news_limit }
    }

    /// Refresh `candidate` and bundle it with its supporting materials
    ///
    /// The candidate moves into the bundle. A successful refresh overwrites
    /// price, 52-week bounds and analyst fields; a failed one keeps the
    /// screened values.
    pub async fn assemble(&self, mut candidate: Candidate) -> MaterialsBundle {
        let ticker = candidate.ticker.clone();

        match self.source.fetch(&ticker).await {
            Some(fresh) => {
                info!(
                    ticker = %ticker,
                    screened_price = candidate.current_price,
                    fresh_price = fresh.current_price,
                    "Refreshed candidate"
                );
                candidate.apply_refresh(&fresh);
            }
            None => warn!(ticker = %ticker, "Refresh failed, keeping screened values"),
        }

        let news_items = self.source.fetch_news(&ticker, self.news_limit).await;

        MaterialsBundle {
            company_name: candidate.company_name.clone(),
            price_summary: candidate.price_summary(),
            analyst_summary: candidate.analyst_summary(),
            news_summary: news_summary(&news_items),
            chart_url: chart_url(&ticker),
            news_items,
            ticker,
            candidate,
        }
    }
}
