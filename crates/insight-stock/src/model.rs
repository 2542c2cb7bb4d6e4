//! Candidate records and the normalizer that builds them from raw provider data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chart reference for a ticker
pub fn chart_url(ticker: &str) -> String {
    format!("https://ycharts.com/companies/{ticker}/chart/")
}

/// Best-effort enrichment fields as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInfo {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub recommendation_key: Option<String>,
}

/// A news item as reported by the provider (either field may be missing)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNewsItem {
    pub title: Option<String>,
    pub link: Option<String>,
}

/// A news reference with both a headline and a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub url: String,
}

impl NewsItem {
    /// Keep only items that carry both a non-empty title and link
    pub fn from_raw(raw: RawNewsItem) -> Option<Self> {
        let headline = raw.title.filter(|t| !t.trim().is_empty())?;
        let url = raw.link.filter(|l| !l.trim().is_empty())?;
        Some(Self { headline, url })
    }
}

/// Provider-shaped data for one ticker, discarded after normalization
#[derive(Debug, Clone, Default)]
pub struct RawMarketRecord {
    pub ticker: String,
    /// Close prices over the lookback window, oldest first; gaps are `None`
    pub closes: Vec<Option<f64>>,
    pub info: Option<RawInfo>,
    pub news: Vec<RawNewsItem>,
}

/// A normalized security record eligible for ranking
///
/// `current_price` is always strictly positive: the normalizer refuses to
/// build a candidate otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub company_name: String,
    pub current_price: f64,
    /// Percent change over the lookback window
    pub price_change_pct: f64,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub analyst_target_price: Option<f64>,
    pub analyst_rating: Option<String>,
    pub news_headlines: Vec<String>,
    /// First headline, used as a cheap hint for why the stock moved
    pub catalyst: Option<String>,
    pub chart_url: String,
    pub fetched_at: DateTime<Utc>,
}

impl Candidate {
    /// Percent gap between the analyst target and the current price
    pub fn upside_potential(&self) -> Option<f64> {
        let target = self.analyst_target_price?;
        (self.current_price > 0.0)
            .then(|| (target - self.current_price) / self.current_price * 100.0)
    }

    /// Percent distance of the current price from the 52-week high
    pub fn from_52w_high_pct(&self) -> Option<f64> {
        let high = self.high_52w.filter(|h| *h > 0.0)?;
        (self.current_price > 0.0).then(|| (self.current_price - high) / high * 100.0)
    }

    /// Absolute lookback move, the ordering key for screening
    pub fn abs_change(&self) -> f64 {
        self.price_change_pct.abs()
    }

    /// Replace headlines and derive the catalyst from the first one
    pub fn attach_headlines(&mut self, headlines: Vec<String>) {
        if headlines.is_empty() {
            return;
        }
        self.catalyst = headlines.first().cloned();
        self.news_headlines = headlines;
    }

    /// Overwrite the fields a refresh is allowed to change
    ///
    /// Momentum (`price_change_pct`) and everything else captured at
    /// screening time is left alone.
    pub fn apply_refresh(&mut self, fresh: &Candidate) {
        self.current_price = fresh.current_price;
        self.high_52w = fresh.high_52w;
        self.low_52w = fresh.low_52w;
        self.analyst_target_price = fresh.analyst_target_price;
        self.analyst_rating = fresh.analyst_rating.clone();
    }

    /// One-line digest used in ranking prompts
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} ({})", self.ticker, self.company_name),
            format!("Price: ${:.2}", self.current_price),
            format!("Change: {:+.1}%", self.price_change_pct),
        ];
        if let Some(upside) = self.upside_potential() {
            parts.push(format!("Upside to target: {upside:.1}%"));
        }
        if let Some(catalyst) = &self.catalyst {
            parts.push(format!("Catalyst: {catalyst}"));
        }
        parts.join(" | ")
    }

    /// Multi-line price and valuation summary
    pub fn price_summary(&self) -> String {
        let mut lines = vec![
            format!("Current Price: ${:.2}", self.current_price),
            format!("1-Month Change: {:+.1}%", self.price_change_pct),
        ];
        if let Some(high) = self.high_52w {
            lines.push(format!("52-Week High: ${high:.2}"));
        }
        if let Some(low) = self.low_52w {
            lines.push(format!("52-Week Low: ${low:.2}"));
        }
        if let Some(pct) = self.from_52w_high_pct() {
            lines.push(format!("From 52W High: {pct:.1}%"));
        }
        if let Some(pe) = self.pe_ratio {
            lines.push(format!("P/E Ratio: {pe:.1}"));
        }
        if let Some(cap) = self.market_cap {
            lines.push(format!("Market Cap: ${:.1}B", cap / 1e9));
        }
        lines.join("\n")
    }

    /// Multi-line analyst consensus summary
    pub fn analyst_summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(target) = self.analyst_target_price {
            lines.push(format!("Consensus Target Price: ${target:.2}"));
            if let Some(upside) = self.upside_potential() {
                lines.push(format!("Implied Upside: {upside:.1}%"));
            }
        }
        if let Some(rating) = &self.analyst_rating {
            lines.push(format!("Consensus Rating: {}", rating.to_uppercase()));
        }

        if lines.is_empty() {
            "No analyst data available".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Keep finite, strictly positive values
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Percent change from the first to the last finite close
///
/// Missing and non-finite points are skipped. Returns `None` when nothing
/// remains or when either endpoint is not strictly positive, and `0.0`
/// change when only one point exists.
pub fn lookback_change(closes: &[Option<f64>]) -> Option<(f64, f64)> {
    let mut finite = closes.iter().flatten().copied().filter(|v| v.is_finite());
    let first = finite.next()?;
    let last = finite.last().unwrap_or(first);

    if first <= 0.0 || last <= 0.0 {
        return None;
    }
    Some((last, (last - first) / first * 100.0))
}

/// Build a [`Candidate`] from raw provider output
///
/// Absent or non-positive prices yield `None`; enrichment gaps only leave
/// the corresponding fields unset.
pub fn normalize(record: RawMarketRecord, fetched_at: DateTime<Utc>) -> Option<Candidate> {
    let ticker = record.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return None;
    }

    let (current_price, price_change_pct) = lookback_change(&record.closes)?;
    let info = record.info.unwrap_or_default();

    let company_name = info
        .long_name
        .or(info.short_name)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| ticker.clone());

    let mut candidate = Candidate {
        chart_url: chart_url(&ticker),
        ticker,
        company_name,
        current_price,
        price_change_pct,
        high_52w: positive(info.fifty_two_week_high),
        low_52w: positive(info.fifty_two_week_low),
        market_cap: positive(info.market_cap),
        pe_ratio: info.trailing_pe.filter(|v| v.is_finite()),
        analyst_target_price: positive(info.target_mean_price),
        analyst_rating: info.recommendation_key.filter(|r| !r.trim().is_empty()),
        news_headlines: Vec::new(),
        catalyst: None,
        fetched_at,
    };

    candidate.attach_headlines(
        record
            .news
            .into_iter()
            .filter_map(NewsItem::from_raw)
            .map(|n| n.headline)
            .collect(),
    );

    Some(candidate)
}
