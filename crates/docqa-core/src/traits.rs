use crate::error::Result;
use crate::types::{Prompt, ScoredChunk};

/// Maps text to fixed-dimension, L2-normalized vectors.
///
/// Implementations must be deterministic for a fixed model version:
/// identical text yields numerically identical vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// The single generation capability. Which implementation backs it is
/// decided once at startup from configuration, not per request.
///
/// `context` carries the retained retrieval evidence; the remote variant
/// answers from the prompt alone, the extractive variant composes its
/// answer directly from the context.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &Prompt, context: &[ScoredChunk]) -> Result<String>;
}
