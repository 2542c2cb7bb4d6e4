//! Error types for the stock insight pipeline

use thiserror::Error;

/// Markers that identify an expired or rejected Yahoo session in error text
const AUTH_MARKERS: [&str; 3] = ["401", "unauthorized", "crumb"];

fn has_auth_marker(text: &str) -> bool {
    let text = text.to_lowercase();
    AUTH_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Stock insight specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Upstream provider could not deliver data for the symbol
    #[error("Data not available for {symbol}: {reason}")]
    UpstreamUnavailable {
        symbol: String,
        reason: String,
    },

    /// Session or authorization rejected by the upstream provider
    #[error("Authorization failed: {0}")]
    AuthTransient(String),

    /// Caller supplied input the operation cannot work with
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// HTTP status returned by an upstream endpoint
    #[error("HTTP {status} from {endpoint}")]
    HttpStatus {
        status: u16,
        endpoint: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Prompt template rendering error
    #[error("Prompt error: {0}")]
    PromptError(String),

    /// Ranking model error
    #[error("LLM error: {0}")]
    Llm(#[from] insight_llm::LLMError),
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

impl StockError {
    /// Whether the error text carries an authorization/session marker
    ///
    /// Yahoo reports stale cookies and crumbs in several shapes (HTTP 401,
    /// "Unauthorized", "Invalid Crumb"), so classification inspects the
    /// rendered message. Status errors are judged by their code, and request
    /// URLs are left out since crumb-bearing URLs would always match.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthTransient(_) => true,
            Self::Llm(_) => false,
            Self::HttpStatus { status, .. } => *status == 401,
            Self::NetworkError(e) => {
                if e.status().is_some_and(|s| s.as_u16() == 401) {
                    return true;
                }
                let mut text = e.to_string();
                if let Some(url) = e.url() {
                    text = text.replace(url.as_str(), "");
                }
                has_auth_marker(&text)
            }
            _ => has_auth_marker(&self.to_string()),
        }
    }

    /// Whether a later attempt of the same call may succeed
    pub fn is_retryable(&self) -> bool {
        if self.is_auth_failure() {
            return true;
        }
        match self {
            Self::NetworkError(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Llm(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Shorthand for [`StockError::UpstreamUnavailable`]
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

impl From<insight_utils::EnvError> for StockError {
    fn from(err: insight_utils::EnvError) -> Self {
        StockError::ConfigError(err.to_string())
    }
}

impl From<minijinja::Error> for StockError {
    fn from(err: minijinja::Error) -> Self {
        StockError::PromptError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::InvalidInput("no candidates provided".to_string());
        assert_eq!(err.to_string(), "Invalid input: no candidates provided");

        let err = StockError::unavailable("AAPL", "empty price history");
        assert_eq!(
            err.to_string(),
            "Data not available for AAPL: empty price history"
        );
    }

    #[test]
    fn test_auth_markers_detected_in_text() {
        assert!(StockError::YahooFinanceError("HTTP 401 returned".to_string()).is_auth_failure());
        assert!(StockError::YahooFinanceError("Invalid Crumb".to_string()).is_auth_failure());
        assert!(StockError::YahooFinanceError("Unauthorized".to_string()).is_auth_failure());
        assert!(
            StockError::HttpStatus {
                status: 401,
                endpoint: "quoteSummary".to_string(),
            }
            .is_auth_failure()
        );
        assert!(StockError::AuthTransient("session expired".to_string()).is_auth_failure());
    }

    #[test]
    fn test_non_auth_errors() {
        assert!(!StockError::YahooFinanceError("No data found".to_string()).is_auth_failure());
        assert!(!StockError::InvalidInput("x".to_string()).is_auth_failure());
        assert!(
            !StockError::Llm(insight_llm::LLMError::AuthenticationFailed).is_auth_failure()
        );
    }

    #[test]
    fn test_status_errors_judged_by_code_not_endpoint() {
        let server_error = StockError::HttpStatus {
            status: 500,
            endpoint: "getcrumb".to_string(),
        };
        assert!(!server_error.is_auth_failure());
        assert!(server_error.is_retryable());
    }

    #[tokio::test]
    async fn test_transport_error_on_crumb_url_is_not_auth() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/v1/test/getcrumb?crumb=abc")
            .send()
            .await
            .unwrap_err();
        let err = StockError::from(err);

        assert!(err.to_string().contains("crumb"));
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(StockError::YahooFinanceError("invalid crumb".to_string()).is_retryable());
        assert!(
            StockError::HttpStatus {
                status: 503,
                endpoint: "spark".to_string(),
            }
            .is_retryable()
        );
        assert!(
            !StockError::HttpStatus {
                status: 404,
                endpoint: "spark".to_string(),
            }
            .is_retryable()
        );
        assert!(!StockError::unavailable("AAPL", "delisted").is_retryable());
    }
}
