//! Configuration for the stock insight pipeline
//!
//! A single [`InsightConfig`] is built at process start and handed to each
//! component behind an `Arc`; nothing reads settings from ambient globals.

use crate::error::{Result, StockError};
use crate::retry::RetryPolicy;
use insight_utils::{env_or, env_parse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Output language for model prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// English
    #[default]
    #[serde(rename = "en")]
    English,
    /// Traditional Chinese
    #[serde(rename = "zh-TW")]
    TraditionalChinese,
}

impl Language {
    /// BCP 47 tag
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::TraditionalChinese => "zh-TW",
        }
    }

    /// Parse a language tag (`en`, `zh-TW`, `zh_tw`, ...)
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim().to_lowercase().replace('_', "-").as_str() {
            "en" | "english" => Ok(Language::English),
            "zh-tw" | "zh-hant" | "zh" => Ok(Language::TraditionalChinese),
            other => Err(StockError::ConfigError(format!(
                "unsupported language: {other}"
            ))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Settings for the ranking model
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// API key; `None` disables the model-backed ranker
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL
    pub api_base: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature for the ranking prompt
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-sonnet-4".to_string(),
            temperature: 0.5,
            max_tokens: 2000,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Configuration for the stock insight pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Minimum absolute lookback change (percent) for universe screening
    pub min_price_change_pct: f64,

    /// Maximum number of candidates a screen may return
    pub max_candidates: usize,

    /// Number of mover tickers requested from the market-data source
    pub mover_pool_size: usize,

    /// Absolute 5-day change (percent) a ticker needs to count as a mover
    pub mover_threshold_pct: f64,

    /// Headlines attached to each screened candidate
    pub screen_headline_limit: usize,

    /// News items gathered for the materials bundle
    pub materials_news_limit: usize,

    /// Lookback range for per-ticker price history
    pub history_range: String,

    /// Lookback range for the batched mover scan
    pub mover_range: String,

    /// Retry policy for market-data calls
    pub market_retry: RetryPolicy,

    /// Retry policy for the ranking call
    pub ranking_retry: RetryPolicy,

    /// Request timeout for upstream HTTP calls
    pub request_timeout: Duration,

    /// Upstream request budget per minute
    pub requests_per_minute: u32,

    /// Prompt language
    pub language: Language,

    /// Ranking model settings
    pub llm: LlmSettings,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            min_price_change_pct: 10.0,
            max_candidates: 6,
            mover_pool_size: 15,
            mover_threshold_pct: 5.0,
            screen_headline_limit: 3,
            materials_news_limit: 5,
            history_range: "1mo".to_string(),
            mover_range: "5d".to_string(),
            market_retry: RetryPolicy::default(),
            ranking_retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            requests_per_minute: 120,
            language: Language::English,
            llm: LlmSettings::default(),
        }
    }
}

impl InsightConfig {
    /// Create a new configuration builder
    pub fn builder() -> InsightConfigBuilder {
        InsightConfigBuilder::default()
    }

    /// Load configuration from environment variables on top of the defaults
    ///
    /// Reads `OPENROUTER_API_KEY`, `OPENROUTER_MODEL`, `OPENROUTER_BASE_URL`,
    /// `INSIGHT_LANGUAGE`, `MIN_PRICE_CHANGE_PCT` and `MAX_CANDIDATES`.
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env()?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            return Err(StockError::ConfigError(
                "max_candidates must be greater than 0".to_string(),
            ));
        }

        if !(self.min_price_change_pct >= 0.0 && self.mover_threshold_pct >= 0.0) {
            return Err(StockError::ConfigError(
                "price change thresholds must be non-negative".to_string(),
            ));
        }

        if self.requests_per_minute == 0 {
            return Err(StockError::ConfigError(
                "requests_per_minute must be greater than 0".to_string(),
            ));
        }

        self.market_retry.validate()?;
        self.ranking_retry.validate()?;

        Ok(())
    }

    /// Whether a model-backed ranker can be built
    pub fn has_llm(&self) -> bool {
        self.llm.api_key.is_some()
    }
}

/// Builder for InsightConfig
#[derive(Debug, Default)]
pub struct InsightConfigBuilder {
    min_price_change_pct: Option<f64>,
    max_candidates: Option<usize>,
    language: Option<Language>,
    api_key: Option<String>,
    api_base: Option<String>,
    model: Option<String>,
}

impl InsightConfigBuilder {
    /// Set the minimum absolute change for universe screening
    pub fn min_price_change_pct(mut self, pct: f64) -> Self {
        self.min_price_change_pct = Some(pct);
        self
    }

    /// Set the maximum candidate count
    pub fn max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = Some(max);
        self
    }

    /// Set the prompt language
    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Set the ranking model API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the ranking model base URL
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set the ranking model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Fill unset fields from the environment
    pub fn with_env(mut self) -> Result<Self> {
        if self.api_key.is_none() {
            self.api_key = env_or("OPENROUTER_API_KEY");
        }
        if self.model.is_none() {
            self.model = env_or("OPENROUTER_MODEL");
        }
        if self.api_base.is_none() {
            self.api_base = env_or("OPENROUTER_BASE_URL");
        }
        if self.language.is_none() {
            self.language = env_or("INSIGHT_LANGUAGE")
                .map(|code| Language::from_code(&code))
                .transpose()?;
        }
        if self.min_price_change_pct.is_none() {
            self.min_price_change_pct = env_parse("MIN_PRICE_CHANGE_PCT")?;
        }
        if self.max_candidates.is_none() {
            self.max_candidates = env_parse("MAX_CANDIDATES")?;
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<InsightConfig> {
        let defaults = InsightConfig::default();

        let config = InsightConfig {
            min_price_change_pct: self
                .min_price_change_pct
                .unwrap_or(defaults.min_price_change_pct),
            max_candidates: self.max_candidates.unwrap_or(defaults.max_candidates),
            language: self.language.unwrap_or(defaults.language),
            llm: LlmSettings {
                api_key: self.api_key,
                api_base: self.api_base.unwrap_or(defaults.llm.api_base),
                model: self.model.unwrap_or(defaults.llm.model),
                ..defaults.llm
            },
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InsightConfig::default();
        assert_eq!(config.min_price_change_pct, 10.0);
        assert_eq!(config.max_candidates, 6);
        assert_eq!(config.mover_pool_size, 15);
        assert_eq!(config.mover_threshold_pct, 5.0);
        assert_eq!(config.market_retry.max_attempts, 3);
        assert!(!config.has_llm());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = InsightConfig::builder()
            .max_candidates(3)
            .min_price_change_pct(4.5)
            .language(Language::TraditionalChinese)
            .api_key("sk-test")
            .model("openai/gpt-4o")
            .build()
            .unwrap();

        assert_eq!(config.max_candidates, 3);
        assert_eq!(config.min_price_change_pct, 4.5);
        assert_eq!(config.language, Language::TraditionalChinese);
        assert_eq!(config.llm.model, "openai/gpt-4o");
        assert_eq!(config.llm.api_base, "https://openrouter.ai/api/v1");
        assert!(config.has_llm());
    }

    #[test]
    fn test_validation_zero_candidates() {
        let result = InsightConfig::builder().max_candidates(0).build();
        assert!(matches!(result, Err(StockError::ConfigError(_))));
    }

    #[test]
    fn test_validation_negative_threshold() {
        let config = InsightConfig {
            min_price_change_pct: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("en").unwrap(), Language::English);
        assert_eq!(
            Language::from_code("zh_TW").unwrap(),
            Language::TraditionalChinese
        );
        assert!(Language::from_code("klingon").is_err());
        assert_eq!(Language::TraditionalChinese.to_string(), "zh-TW");
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let settings = LlmSettings {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("***"));
    }
}
