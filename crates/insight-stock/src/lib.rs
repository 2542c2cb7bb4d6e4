//! Stock insight candidate pipeline
//!
//! This crate turns noisy market data into one selected stock and a bundle
//! of materials for writing about it. It includes:
//!
//! - Yahoo Finance access with cookie/crumb session handling and rate limiting
//! - A resilient market-data layer that retries auth failures and never
//!   fails on a single bad ticker
//! - Candidate normalization with derived metrics (momentum, distance from
//!   the 52-week high, upside to the analyst target)
//! - Mover and watchlist screening
//! - Selection through a pluggable [`Ranker`] (model-backed or momentum),
//!   with deterministic fallbacks
//! - Materials assembly for the content-generation step
//!
//! # Example
//!
//! ```rust,ignore
//! use insight_stock::{InsightConfig, PipelineOutcome, StockInsightPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(InsightConfig::from_env()?);
//!     let pipeline = StockInsightPipeline::from_config(config, true)?;
//!
//!     match pipeline.run(None).await? {
//!         PipelineOutcome::NoCandidates => println!("No candidates found"),
//!         PipelineOutcome::Ready(report) => println!("{}", report.materials.ticker),
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod market_data;
pub mod materials;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod ranker;
pub mod retry;
pub mod screener;
pub mod selector;

// Re-export main types for convenience
pub use api::{MarketDataProvider, YahooProvider};
pub use config::{InsightConfig, InsightConfigBuilder, Language, LlmSettings};
pub use error::{Result, StockError};
pub use market_data::{MarketDataSource, ResilientMarketData};
pub use materials::{MaterialsAssembler, MaterialsBundle};
pub use model::{Candidate, NewsItem};
pub use pipeline::{InsightReport, PipelineOutcome, StockInsightPipeline};
pub use ranker::{LlmRanker, MomentumRanker, Ranker};
pub use retry::RetryPolicy;
pub use screener::Screener;
pub use selector::{Resolution, SelectionResult, Selector};
