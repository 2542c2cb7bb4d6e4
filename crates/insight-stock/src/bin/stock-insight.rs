//! Stock insight CLI
//!
//! Screens candidates, selects one and prints the materials bundle.
//!
//! # Usage
//!
//! ```bash
//! # Optional: model-backed ranking through OpenRouter
//! export OPENROUTER_API_KEY="sk-or-..."
//!
//! # Scan market movers
//! cargo run --bin stock-insight -p insight-stock
//!
//! # Screen a watchlist and emit JSON
//! cargo run --bin stock-insight -p insight-stock -- --tickers NVDA,AMD,TSLA --json
//! ```

use clap::Parser;
use insight_stock::{
    InsightConfig, InsightReport, Language, PipelineOutcome, StockInsightPipeline,
};
use std::sync::Arc;
use tracing::info;

const DEFAULT_LOG_DIRECTIVE: &str = "warn,insight_stock=info";

#[derive(Parser, Debug)]
#[command(name = "stock-insight")]
#[command(about = "Screen movers, select one candidate and assemble writing materials", long_about = None)]
struct Args {
    /// Comma-separated watchlist; scans market movers when omitted
    #[arg(short, long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// Prompt language (en, zh-TW)
    #[arg(short, long)]
    language: Option<String>,

    /// Maximum number of screened candidates
    #[arg(long)]
    max_candidates: Option<usize>,

    /// Minimum absolute change (%) for mover screening
    #[arg(long)]
    min_change: Option<f64>,

    /// Rank by momentum even when a model API key is configured (also `INSIGHT_NO_LLM=1`)
    #[arg(long)]
    no_llm: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<InsightConfig> {
        let mut builder = InsightConfig::builder();
        if let Some(code) = &self.language {
            builder = builder.language(Language::from_code(code)?);
        }
        if let Some(max) = self.max_candidates {
            builder = builder.max_candidates(max);
        }
        if let Some(pct) = self.min_change {
            builder = builder.min_price_change_pct(pct);
        }
        Ok(builder.with_env()?.build()?)
    }

    fn watchlist(&self) -> Vec<String> {
        self.tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn print_report(report: &InsightReport) {
    let materials = &report.materials;

    println!("Screened: {}", report.screened.join(", "));
    println!();
    println!("Selected: {} ({})", materials.ticker, materials.company_name);
    println!("Resolution: {:?}", report.resolution);
    println!();
    println!("Rationale:\n{}", report.rationale);
    println!();
    println!("{}", materials.price_summary);
    println!();
    println!("{}", materials.analyst_summary);
    println!();
    println!("{}", materials.news_summary);
    for item in &materials.news_items {
        println!("  {}", item.url);
    }
    println!();
    println!("Chart: {}", materials.chart_url);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.log_json {
        insight_utils::init_tracing_json(DEFAULT_LOG_DIRECTIVE);
    } else {
        insight_utils::init_tracing(DEFAULT_LOG_DIRECTIVE);
    }

    let config = Arc::new(args.config()?);
    let use_llm = !(args.no_llm || insight_utils::env_flag("INSIGHT_NO_LLM"));
    info!(
        language = %config.language,
        max_candidates = config.max_candidates,
        min_change = config.min_price_change_pct,
        llm = config.has_llm() && use_llm,
        "Starting stock-insight"
    );

    let pipeline = StockInsightPipeline::from_config(Arc::clone(&config), use_llm)?;
    let watchlist = args.watchlist();
    let watchlist = (!watchlist.is_empty()).then_some(watchlist.as_slice());

    let outcome = pipeline.run(watchlist).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        PipelineOutcome::NoCandidates => println!("No candidates found."),
        PipelineOutcome::Ready(report) => print_report(report),
    }

    Ok(())
}
