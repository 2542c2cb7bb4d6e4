//! Yahoo Finance provider
//!
//! Price history goes through the `yahoo_finance_api` connector. Company
//! info needs a cookie + crumb session, news comes from the search endpoint,
//! and the mover scan uses the spark endpoint to fetch many symbols at once.

use super::{BatchCloses, MarketDataProvider};
use crate::cache::SessionCache;
use crate::config::InsightConfig;
use crate::error::{Result, StockError};
use crate::model::{RawInfo, RawNewsItem};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use yahoo_finance_api as yahoo;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";
const SPARK_URL: &str = "https://query1.finance.yahoo.com/v8/finance/spark";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const CRUMB_KEY: &str = "crumb";
const CRUMB_TTL: Duration = Duration::from_secs(30 * 60);
/// Spark rejects requests with more symbols than this
const SPARK_CHUNK: usize = 20;

/// Connections and cookies that make up one upstream session
struct YahooSession {
    http: Client,
    connector: Option<Arc<yahoo::YahooConnector>>,
}

/// Yahoo Finance market-data provider
pub struct YahooProvider {
    session: Mutex<YahooSession>,
    crumbs: SessionCache,
    rate_limiter: SharedRateLimiter,
    timeout: Duration,
}

impl YahooProvider {
    /// Create a provider paced at `config.requests_per_minute`
    pub fn new(config: &InsightConfig) -> Result<Self> {
        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            session: Mutex::new(YahooSession {
                http: build_http_client(config.request_timeout)?,
                connector: None,
            }),
            crumbs: SessionCache::new(CRUMB_TTL),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            timeout: config.request_timeout,
        })
    }

    async fn http(&self) -> Client {
        self.session.lock().await.http.clone()
    }

    async fn connector(&self) -> Result<Arc<yahoo::YahooConnector>> {
        let mut session = self.session.lock().await;
        if let Some(connector) = &session.connector {
            return Ok(Arc::clone(connector));
        }

        let connector = Arc::new(
            yahoo::YahooConnector::new()
                .map_err(|e| StockError::YahooFinanceError(e.to_string()))?,
        );
        session.connector = Some(Arc::clone(&connector));
        Ok(connector)
    }

    /// Crumb bound to the current cookie jar
    async fn crumb(&self, http: &Client) -> Result<String> {
        self.crumbs
            .get_or_fetch(CRUMB_KEY, move || async move {
                // fc.yahoo.com answers 404 but sets the session cookie.
                self.rate_limiter.until_ready().await;
                if let Err(e) = http.get(COOKIE_URL).send().await {
                    debug!(error = %e, "Cookie priming request failed");
                }

                self.rate_limiter.until_ready().await;
                let response = http.get(CRUMB_URL).send().await?;
                let response = ensure_success(response, "getcrumb")?;
                let crumb = response.text().await?.trim().to_string();

                if crumb.is_empty() || crumb.contains('<') || crumb.contains(' ') {
                    return Err(StockError::AuthTransient(format!(
                        "invalid crumb returned: {crumb:.40}"
                    )));
                }
                Ok(crumb)
            })
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;
        let response = request.timeout(self.timeout).send().await?;
        let response = ensure_success(response, endpoint)?;
        Ok(response.json::<T>().await?)
    }
}

fn build_http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .cookie_store(true)
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

fn ensure_success(response: reqwest::Response, endpoint: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StockError::HttpStatus {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    #[instrument(skip(self))]
    async fn close_series(&self, ticker: &str, range: &str) -> Result<Vec<Option<f64>>> {
        let connector = self.connector().await?;

        self.rate_limiter.until_ready().await;
        let response = connector
            .get_quote_range(ticker, "1d", range)
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        Ok(quotes.iter().map(|q| Some(q.close)).collect())
    }

    #[instrument(skip(self))]
    async fn info(&self, ticker: &str) -> Result<RawInfo> {
        let http = self.http().await;
        let crumb = self.crumb(&http).await?;

        let request = http
            .get(format!("{QUOTE_SUMMARY_URL}/{ticker}"))
            .query(&[
                ("modules", "price,summaryDetail,financialData"),
                ("crumb", crumb.as_str()),
            ]);
        let envelope: QuoteSummaryEnvelope = self.get_json(request, "quoteSummary").await?;

        envelope.into_raw_info(ticker)
    }

    #[instrument(skip(self))]
    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<RawNewsItem>> {
        let http = self.http().await;
        let request = http.get(SEARCH_URL).query(&[
            ("q", ticker.to_string()),
            ("quotesCount", "0".to_string()),
            ("newsCount", limit.to_string()),
        ]);
        let search: SearchResponse = self.get_json(request, "search").await?;

        Ok(search
            .news
            .into_iter()
            .take(limit)
            .map(|n| RawNewsItem {
                title: n.title,
                link: n.link,
            })
            .collect())
    }

    #[instrument(skip(self, tickers), fields(count = tickers.len()))]
    async fn batch_close_series(&self, tickers: &[String], range: &str) -> Result<BatchCloses> {
        let http = self.http().await;
        let mut closes = BatchCloses::new();
        let mut last_error = None;

        for chunk in tickers.chunks(SPARK_CHUNK) {
            let request = http.get(SPARK_URL).query(&[
                ("symbols", chunk.join(",")),
                ("range", range.to_string()),
                ("interval", "1d".to_string()),
            ]);

            match self.get_json::<HashMap<String, SparkSeries>>(request, "spark").await {
                Ok(series) => {
                    closes.extend(series.into_iter().map(|(symbol, s)| (symbol, s.close)));
                }
                Err(e) => {
                    warn!(error = %e, symbols = chunk.len(), "Spark chunk failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if closes.is_empty() => Err(e),
            _ => Ok(closes),
        }
    }

    async fn reset_session(&self) {
        debug!("Resetting Yahoo session");
        self.crumbs.clear().await;

        let mut session = self.session.lock().await;
        session.connector = None;
        match build_http_client(self.timeout) {
            Ok(http) => session.http = http,
            Err(e) => warn!(error = %e, "Could not rebuild HTTP client, keeping the old one"),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawNumber {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: Option<RawNumber>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryEnvelope {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    error: Option<YahooErrorBody>,
}

#[derive(Debug, Deserialize)]
struct YahooErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    financial_data: Option<FinancialDataModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    #[serde(default)]
    fifty_two_week_high: Option<RawNumber>,
    #[serde(default)]
    fifty_two_week_low: Option<RawNumber>,
    #[serde(default)]
    market_cap: Option<RawNumber>,
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    #[serde(default)]
    target_mean_price: Option<RawNumber>,
    #[serde(default)]
    recommendation_key: Option<String>,
}

impl QuoteSummaryEnvelope {
    fn into_raw_info(self, ticker: &str) -> Result<RawInfo> {
        if let Some(error) = self.quote_summary.error {
            return Err(StockError::unavailable(
                ticker,
                format!(
                    "{}: {}",
                    error.code.unwrap_or_default(),
                    error.description.unwrap_or_default()
                ),
            ));
        }

        let result = self
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| StockError::unavailable(ticker, "empty quoteSummary result"))?;

        let price = result.price.unwrap_or_default();
        let detail = result.summary_detail.unwrap_or_default();
        let financial = result.financial_data.unwrap_or_default();

        Ok(RawInfo {
            long_name: price.long_name,
            short_name: price.short_name,
            fifty_two_week_high: raw(detail.fifty_two_week_high),
            fifty_two_week_low: raw(detail.fifty_two_week_low),
            market_cap: raw(detail.market_cap),
            trailing_pe: raw(detail.trailing_pe),
            target_mean_price: raw(financial.target_mean_price),
            recommendation_key: financial.recommendation_key.filter(|k| k != "none"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchNews {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SparkSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_summary_parsing() {
        let envelope: QuoteSummaryEnvelope = serde_json::from_value(json!({
            "quoteSummary": {
                "result": [{
                    "price": {"longName": "Apple Inc.", "shortName": "Apple"},
                    "summaryDetail": {
                        "fiftyTwoWeekHigh": {"raw": 260.1, "fmt": "260.10"},
                        "fiftyTwoWeekLow": {"raw": 169.21, "fmt": "169.21"},
                        "marketCap": {"raw": 3.5e12, "fmt": "3.5T"},
                        "trailingPE": {}
                    },
                    "financialData": {
                        "targetMeanPrice": {"raw": 245.0, "fmt": "245.00"},
                        "recommendationKey": "buy"
                    }
                }],
                "error": null
            }
        }))
        .unwrap();

        let info = envelope.into_raw_info("AAPL").unwrap();
        assert_eq!(info.long_name.as_deref(), Some("Apple Inc."));
        assert_eq!(info.fifty_two_week_high, Some(260.1));
        assert_eq!(info.market_cap, Some(3.5e12));
        assert_eq!(info.trailing_pe, None);
        assert_eq!(info.target_mean_price, Some(245.0));
        assert_eq!(info.recommendation_key.as_deref(), Some("buy"));
    }

    #[test]
    fn test_quote_summary_error_body() {
        let envelope: QuoteSummaryEnvelope = serde_json::from_value(json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ"}
            }
        }))
        .unwrap();

        let err = envelope.into_raw_info("ZZZZ").unwrap_err();
        assert!(matches!(err, StockError::UpstreamUnavailable { .. }));
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn test_missing_modules_yield_empty_info() {
        let envelope: QuoteSummaryEnvelope = serde_json::from_value(json!({
            "quoteSummary": {"result": [{}], "error": null}
        }))
        .unwrap();

        assert_eq!(envelope.into_raw_info("AAPL").unwrap(), RawInfo::default());
    }

    #[test]
    fn test_spark_and_search_parsing() {
        let spark: HashMap<String, SparkSeries> = serde_json::from_value(json!({
            "NVDA": {"symbol": "NVDA", "timestamp": [1, 2], "close": [100.0, null, 110.0]},
            "AMD": {"symbol": "AMD"}
        }))
        .unwrap();
        assert_eq!(spark["NVDA"].close, vec![Some(100.0), None, Some(110.0)]);
        assert!(spark["AMD"].close.is_empty());

        let search: SearchResponse = serde_json::from_value(json!({
            "quotes": [],
            "news": [{"title": "Nvidia beats", "link": "https://example.com/n", "publisher": "Wire"}]
        }))
        .unwrap();
        assert_eq!(search.news[0].title.as_deref(), Some("Nvidia beats"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_close_series() {
        let provider = YahooProvider::new(&InsightConfig::default()).unwrap();
        let closes = provider.close_series("AAPL", "1mo").await.unwrap();
        assert!(!closes.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_info_and_news() {
        let provider = YahooProvider::new(&InsightConfig::default()).unwrap();
        let info = provider.info("MSFT").await.unwrap();
        assert!(info.long_name.is_some() || info.short_name.is_some());

        let news = provider.news("MSFT", 3).await.unwrap();
        assert!(news.len() <= 3);
    }
}
