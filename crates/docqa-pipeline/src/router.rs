//! Confidence-based routing.
//!
//! Small-talk is decided by pattern alone, before any score is looked
//! at. Otherwise the top similarity gates the grounded branch, and a
//! secondary threshold picks which retrieved chunks travel with it.

use regex::Regex;

use docqa_core::config::RetrievalConfig;
use docqa_core::error::{Error, Result};
use docqa_core::types::{RoutingDecision, ScoredChunk};

pub struct Router {
    smalltalk: Option<Regex>,
    confidence_threshold: f32,
    inclusion_threshold: f32,
}

impl Router {
    pub fn new(cfg: &RetrievalConfig) -> Result<Self> {
        let smalltalk = if cfg.smalltalk_patterns.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)^\s*(?:{})\W*$", cfg.smalltalk_patterns.join("|"));
            Some(
                Regex::new(&pattern)
                    .map_err(|e| Error::InvalidConfig(format!("smalltalk patterns: {e}")))?,
            )
        };
        Ok(Self {
            smalltalk,
            confidence_threshold: cfg.confidence_threshold,
            inclusion_threshold: cfg.inclusion_threshold,
        })
    }

    /// Deterministic: identical (query, scores) always yield the same
    /// decision.
    pub fn route(&self, query: &str, retrieval: &[ScoredChunk]) -> RoutingDecision {
        if self.smalltalk.as_ref().is_some_and(|re| re.is_match(query)) {
            return RoutingDecision::SmallTalk;
        }
        let Some(top) = retrieval.first() else {
            return RoutingDecision::InsufficientContext;
        };
        if top.score < self.confidence_threshold {
            return RoutingDecision::InsufficientContext;
        }
        let kept = retrieval
            .iter()
            .filter(|s| s.score >= self.inclusion_threshold)
            .cloned()
            .collect();
        RoutingDecision::AnswerFromContext(kept)
    }
}
