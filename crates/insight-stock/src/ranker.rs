//! Ranking capabilities consumed by the selector
//!
//! A ranker reads the numbered candidate digest and answers in free text
//! that should mention the chosen ticker. The selector owns ticker
//! extraction; rankers make no structural promises about their output.

use crate::config::{InsightConfig, Language};
use crate::error::{Result, StockError};
use crate::prompts::ranking_prompts;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use insight_llm::{CompletionRequest, LLMProvider, Message};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Free-text ranking over a candidate digest
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ranker: Send + Sync {
    /// Rank the digest and return reasoning naming one ticker
    async fn rank(&self, digest: &str) -> Result<String>;
}

/// Ranker backed by any [`LLMProvider`]
pub struct LlmRanker {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
    language: Language,
    retry: RetryPolicy,
}

impl LlmRanker {
    /// Build from the model settings, language and ranking retry policy in `config`
    pub fn new(provider: Arc<dyn LLMProvider>, config: &InsightConfig) -> Self {
        Self {
            provider,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            language: config.language,
            retry: config.ranking_retry.clone(),
        }
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, digest: &str) -> Result<CompletionRequest> {
        let (system, user) = ranking_prompts(self.language, digest)?;
        Ok(CompletionRequest::builder(&self.model)
            .system(system)
            .add_message(Message::user(user))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build())
    }
}

#[async_trait]
impl Ranker for LlmRanker {
    #[instrument(skip(self, digest), fields(model = %self.model, provider = self.provider.name()))]
    async fn rank(&self, digest: &str) -> Result<String> {
        let request = self.request(digest)?;

        let response = self
            .retry
            .execute("ranking", || {
                let request = request.clone();
                async move { Ok(self.provider.complete(request).await?) }
            })
            .await?;

        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Ranking completion received"
        );

        let text = response.text().trim();
        if text.is_empty() {
            return Err(StockError::unavailable("ranking", "model returned no text"));
        }
        Ok(text.to_string())
    }
}

/// Deterministic ranker that picks the largest absolute move in the digest
///
/// Its answer names only the chosen ticker plus numbers. The selector still
/// resolves it by substring, so a shorter ticker contained in the winner
/// (`MS` inside `MSFT`) wins when it is listed first.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumRanker;

impl MomentumRanker {
    /// Create a momentum ranker
    pub fn new() -> Self {
        Self
    }
}

/// Parse a digest line like `"2. NVDA (NVIDIA) | Price: $120.00 | Change: +9.1% | ..."`
fn parse_digest_line(line: &str) -> Option<(&str, f64)> {
    let (index, rest) = line.trim().split_once(". ")?;
    index.parse::<usize>().ok()?;

    let ticker = rest.split_whitespace().next()?;
    let change = rest
        .split(" | ")
        .find_map(|segment| segment.strip_prefix("Change: "))?
        .trim_end_matches('%')
        .parse::<f64>()
        .ok()?;

    change.is_finite().then_some((ticker, change))
}

#[async_trait]
impl Ranker for MomentumRanker {
    async fn rank(&self, digest: &str) -> Result<String> {
        let parsed: Vec<(&str, f64)> = digest.lines().filter_map(parse_digest_line).collect();

        let mut best: Option<(&str, f64)> = None;
        for &(ticker, change) in &parsed {
            if best.is_none_or(|(_, top)| change.abs() > top.abs()) {
                best = Some((ticker, change));
            }
        }

        let (ticker, change) = best.ok_or_else(|| {
            StockError::InvalidInput("digest lists no rankable candidates".to_string())
        })?;

        info!(ticker, change, candidates = parsed.len(), "Momentum pick");
        Ok(format!("{ticker}: {change:+.1}% (1/{})", parsed.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_llm::{CompletionResponse, LLMError, StopReason, TokenUsage};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedProvider {
        replies: Mutex<VecDeque<insight_llm::Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<insight_llm::Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> insight_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LLMError::RequestFailed("script exhausted".to_string())));
            reply.map(|text| CompletionResponse {
                message: Message::assistant(text),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const DIGEST: &str = "1. AAPL (Apple Inc.) | Price: $150.00 | Change: +5.5%\n   News: Apple unveils...\n2. TSLA (Tesla, Inc.) | Price: $200.00 | Change: -12.3% | Upside to target: 20.0%\n3. NVDA (NVIDIA) | Price: $120.00 | Change: +12.3%";

    fn ranker(provider: Arc<ScriptedProvider>) -> LlmRanker {
        LlmRanker::new(provider, &InsightConfig::default()).with_retry(RetryPolicy::fast())
    }

    #[tokio::test]
    async fn test_llm_ranker_returns_trimmed_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            "  1. TSLA\n2. Oversold after delivery miss  ".to_string(),
        )]));
        let answer = ranker(Arc::clone(&provider)).rank(DIGEST).await.unwrap();

        assert_eq!(answer, "1. TSLA\n2. Oversold after delivery miss");
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].model, "anthropic/claude-sonnet-4");
        assert_eq!(requests[0].temperature, Some(0.5));
        assert!(requests[0].system.as_deref().unwrap().contains("investment analyst"));
        assert!(requests[0].messages[0].text().contains(DIGEST));
    }

    #[tokio::test]
    async fn test_llm_ranker_retries_transient_failures() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(LLMError::RateLimitExceeded("429".to_string())),
            Ok("NVDA".to_string()),
        ]));
        let answer = ranker(Arc::clone(&provider)).rank(DIGEST).await.unwrap();
        assert_eq!(answer, "NVDA");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_llm_ranker_gives_up_after_three_attempts() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let result = ranker(Arc::clone(&provider)).rank(DIGEST).await;
        assert!(matches!(result, Err(StockError::Llm(_))));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_llm_ranker_does_not_retry_auth_rejection() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(LLMError::AuthenticationFailed)]));
        assert!(ranker(Arc::clone(&provider)).rank(DIGEST).await.is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_llm_ranker_rejects_empty_output() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("   ".to_string())]));
        let result = ranker(provider).rank(DIGEST).await;
        assert!(matches!(result, Err(StockError::UpstreamUnavailable { .. })));
    }

    #[test]
    fn test_parse_digest_line() {
        assert_eq!(
            parse_digest_line("2. TSLA (Tesla, Inc.) | Price: $200.00 | Change: -12.3%"),
            Some(("TSLA", -12.3))
        );
        assert_eq!(parse_digest_line("   News: Apple unveils..."), None);
        assert_eq!(parse_digest_line("1. AAPL (Apple) | Price: $1.00"), None);
    }

    #[tokio::test]
    async fn test_momentum_ranker_prefers_earlier_line_on_tie() {
        let answer = MomentumRanker::new().rank(DIGEST).await.unwrap();
        assert_eq!(answer, "TSLA: -12.3% (1/3)");
    }

    #[tokio::test]
    async fn test_momentum_ranker_empty_digest() {
        let result = MomentumRanker::new().rank("").await;
        assert!(matches!(result, Err(StockError::InvalidInput(_))));
    }
}
