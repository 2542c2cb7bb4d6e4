//! Single-candidate selection
//!
//! The selector turns a screened list into exactly one [`SelectionResult`].
//! Ranking is consulted only when there is an actual choice to make, and
//! every path out of it is deterministic: a response naming no candidate
//! and a ranker that fails outright both resolve to the first candidate.

use crate::error::{Result, StockError};
use crate::model::Candidate;
use crate::ranker::Ranker;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Rationale recorded when no ranking was needed
pub const SINGLE_CANDIDATE_RATIONALE: &str = "single candidate provided";

/// Longest headline excerpt carried into the digest
const DIGEST_HEADLINE_CHARS: usize = 100;

/// How the selected ticker was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Only one candidate was supplied
    Single,
    /// The ranking response named this candidate
    Matched,
    /// The ranking response named no candidate; first one taken
    Fallback,
    /// The ranker failed; first one taken
    RankerUnavailable,
}

/// The chosen candidate with its rationale
#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    pub candidate: Candidate,
    pub rationale: String,
    pub resolution: Resolution,
}

/// Numbered digest of candidates handed to a ranker
///
/// One `summary()` line per candidate, followed by an indented excerpt of
/// its first headline when it has any.
pub fn build_digest(candidates: &[Candidate]) -> String {
    let mut lines = Vec::with_capacity(candidates.len() * 2);
    for (i, candidate) in candidates.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, candidate.summary()));
        if let Some(headline) = candidate.news_headlines.first() {
            let excerpt: String = headline.chars().take(DIGEST_HEADLINE_CHARS).collect();
            lines.push(format!("   News: {excerpt}..."));
        }
    }
    lines.join("\n")
}

/// Index of the first candidate, in input order, whose ticker appears in `response`
///
/// Matching is a case-insensitive substring test. The first listed
/// candidate that matches wins even if another ticker is mentioned earlier
/// in the text.
pub fn find_mentioned(response: &str, candidates: &[Candidate]) -> Option<usize> {
    let haystack = response.to_uppercase();
    candidates.iter().position(|c| {
        let ticker = c.ticker.trim().to_uppercase();
        !ticker.is_empty() && haystack.contains(&ticker)
    })
}

/// Picks one candidate out of many
pub struct Selector {
    ranker: Arc<dyn Ranker>,
}

impl Selector {
    /// Create a selector over the given ranking capability
    pub fn new(ranker: Arc<dyn Ranker>) -> Self {
        Self { ranker }
    }

    /// Select exactly one candidate
    ///
    /// # Errors
    ///
    /// Returns [`StockError::InvalidInput`] when `candidates` is empty.
    /// Ranking failures are absorbed into the result.
    pub async fn select(&self, mut candidates: Vec<Candidate>) -> Result<SelectionResult> {
        if candidates.is_empty() {
            return Err(StockError::InvalidInput(
                "no candidates provided for selection".to_string(),
            ));
        }

        if candidates.len() == 1 {
            let candidate = candidates.swap_remove(0);
            info!(ticker = %candidate.ticker, "Single candidate, skipping ranking");
            return Ok(SelectionResult {
                candidate,
                rationale: SINGLE_CANDIDATE_RATIONALE.to_string(),
                resolution: Resolution::Single,
            });
        }

        let digest = build_digest(&candidates);
        let (index, rationale, resolution) = match self.ranker.rank(&digest).await {
            Ok(response) => match find_mentioned(&response, &candidates) {
                Some(index) => (index, response, Resolution::Matched),
                None => {
                    warn!(
                        fallback = %candidates[0].ticker,
                        "Ranking response names no candidate, taking the first"
                    );
                    (0, response, Resolution::Fallback)
                }
            },
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %candidates[0].ticker,
                    "Ranking unavailable, taking the first candidate"
                );
                (0, format!("ranking unavailable: {e}"), Resolution::RankerUnavailable)
            }
        };

        let candidate = candidates.swap_remove(index);
        info!(
            ticker = %candidate.ticker,
            resolution = ?resolution,
            "Candidate selected"
        );

        Ok(SelectionResult {
            candidate,
            rationale,
            resolution,
        })
    }
}
