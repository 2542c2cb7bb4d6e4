//! End-to-end insight pipeline
//!
//! screen → select → assemble. An empty screen ends the run with
//! [`PipelineOutcome::NoCandidates`]; selection only ever sees a non-empty
//! list.

use crate::api::YahooProvider;
use crate::config::InsightConfig;
use crate::error::Result;
use crate::market_data::{MarketDataSource, ResilientMarketData};
use crate::materials::{MaterialsAssembler, MaterialsBundle};
use crate::ranker::{LlmRanker, MomentumRanker, Ranker};
use crate::screener::Screener;
use crate::selector::{Resolution, Selector};
use insight_llm::providers::{OpenAIConfig, OpenAIProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything produced by a run that found candidates
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    /// Screened tickers in the order handed to the selector
    pub screened: Vec<String>,
    /// Ranking rationale for the selection
    pub rationale: String,
    /// How the selection was resolved
    pub resolution: Resolution,
    /// Materials for the selected ticker
    pub materials: MaterialsBundle,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Screening produced nothing to rank
    NoCandidates,
    /// A candidate was selected and its materials assembled
    Ready(Box<InsightReport>),
}

/// Screener, selector and assembler wired over one configuration
pub struct StockInsightPipeline {
    screener: Screener,
    selector: Selector,
    assembler: MaterialsAssembler,
}

impl StockInsightPipeline {
    /// Assemble a pipeline from explicit collaborators
    pub fn new(
        config: Arc<InsightConfig>,
        source: Arc<dyn MarketDataSource>,
        ranker: Arc<dyn Ranker>,
    ) -> Self {
        Self {
            assembler: MaterialsAssembler::new(Arc::clone(&source), config.materials_news_limit),
            screener: Screener::new(source, config),
            selector: Selector::new(ranker),
        }
    }

    /// Build the default stack: Yahoo market data and, when an API key is
    /// configured, a model-backed ranker (momentum ranking otherwise)
    pub fn from_config(config: Arc<InsightConfig>, use_llm: bool) -> Result<Self> {
        config.validate()?;

        let provider = Arc::new(YahooProvider::new(&config)?);
        let source: Arc<dyn MarketDataSource> =
            Arc::new(ResilientMarketData::new(provider, &config));
        let ranker = build_ranker(&config, use_llm)?;

        Ok(Self::new(config, source, ranker))
    }

    /// Run the pipeline over `watchlist`, or over market movers when `None`
    ///
    /// # Errors
    ///
    /// Only [`crate::StockError::InvalidInput`] escapes; per-ticker failures are
    /// absorbed by screening and assembly.
    #[instrument(skip_all, fields(watchlist = watchlist.map(<[String]>::len)))]
    pub async fn run(&self, watchlist: Option<&[String]>) -> Result<PipelineOutcome> {
        let candidates = match watchlist {
            Some(tickers) if !tickers.is_empty() => self.screener.screen_watchlist(tickers).await,
            _ => self.screener.screen_universe().await,
        };

        if candidates.is_empty() {
            info!("No candidates found");
            return Ok(PipelineOutcome::NoCandidates);
        }

        let screened = candidates.iter().map(|c| c.ticker.clone()).collect();
        let selection = self.selector.select(candidates).await?;
        let materials = self.assembler.assemble(selection.candidate).await;

        info!(ticker = %materials.ticker, "Materials ready");
        Ok(PipelineOutcome::Ready(Box::new(InsightReport {
            screened,
            rationale: selection.rationale,
            resolution: selection.resolution,
            materials,
        })))
    }
}

/// Pick the ranker for `config`
///
/// Falls back to [`MomentumRanker`] when model ranking is disabled or no
/// API key is set.
pub fn build_ranker(config: &InsightConfig, use_llm: bool) -> Result<Arc<dyn Ranker>> {
    let api_key = match (&config.llm.api_key, use_llm) {
        (Some(key), true) if !key.trim().is_empty() => key.clone(),
        _ => {
            info!("Using momentum ranking");
            return Ok(Arc::new(MomentumRanker::new()));
        }
    };

    let provider = OpenAIProvider::with_config(
        OpenAIConfig::new(api_key)
            .with_api_base(&config.llm.api_base)
            .with_timeout(config.request_timeout.as_secs())
            .with_app_title("stock-insight"),
    )?;

    info!(model = %config.llm.model, "Using model ranking");
    Ok(Arc::new(LlmRanker::new(Arc::new(provider), config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::ScriptedSource;
    use crate::model::test_support::candidate;
    use crate::ranker::MockRanker;

    fn config() -> Arc<InsightConfig> {
        Arc::new(
            InsightConfig::builder()
                .max_candidates(3)
                .min_price_change_pct(10.0)
                .build()
                .unwrap(),
        )
    }

    fn pipeline(source: ScriptedSource, ranker: MockRanker) -> StockInsightPipeline {
        StockInsightPipeline::new(config(), Arc::new(source), Arc::new(ranker))
    }

    #[tokio::test]
    async fn test_no_candidates_is_not_an_error() {
        let mut ranker = MockRanker::new();
        ranker.expect_rank().never();

        let outcome = pipeline(ScriptedSource::default(), ranker).run(None).await.unwrap();
        assert!(matches!(outcome, PipelineOutcome::NoCandidates));
    }

    #[tokio::test]
    async fn test_universe_run_selects_and_assembles() {
        let source = ScriptedSource::with_candidates(vec![
            candidate("AMD", 150.0, 12.0),
            candidate("PFE", 25.0, -18.0),
            candidate("KO", 60.0, 1.0),
        ])
        .with_news("PFE", &["Trial halted"]);

        let mut ranker = MockRanker::new();
        ranker
            .expect_rank()
            .times(1)
            .returning(|_| Ok("Selected PFE: overreaction to trial news".to_string()));

        let outcome = pipeline(source, ranker).run(None).await.unwrap();
        let PipelineOutcome::Ready(report) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(report.screened, vec!["AMD", "PFE"]);
        assert_eq!(report.resolution, Resolution::Matched);
        assert_eq!(report.materials.ticker, "PFE");
        assert_eq!(report.materials.candidate.catalyst.as_deref(), Some("Trial halted"));
        assert!(report.materials.news_summary.contains("- Trial halted"));
    }

    #[tokio::test]
    async fn test_single_watchlist_ticker_skips_ranking() {
        let source = ScriptedSource::with_candidates(vec![candidate("KO", 60.0, 0.4)]);
        let mut ranker = MockRanker::new();
        ranker.expect_rank().never();

        let watchlist = vec!["KO".to_string()];
        let outcome = pipeline(source, ranker).run(Some(watchlist.as_slice())).await.unwrap();
        let PipelineOutcome::Ready(report) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(report.rationale, "single candidate provided");
        assert_eq!(report.materials.candidate.ticker, "KO");
    }

    #[test]
    fn test_build_ranker_without_key_uses_momentum() {
        let config = InsightConfig::default();
        assert!(build_ranker(&config, true).is_ok());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(PipelineOutcome::NoCandidates).unwrap();
        assert_eq!(json["status"], "no_candidates");
    }
}
