//! Online query answering: embed, retrieve, route, prompt, generate.
//!
//! The pipeline holds no per-query state; the only shared mutable
//! resource is the `SharedIndex` handle, which readers snapshot once per
//! query. A rebuild publishes a replacement index in one swap.

use std::path::Path;

use docqa_core::config::{GenerationConfig, RetrievalConfig};
use docqa_core::error::Result;
use docqa_core::ingest::Chunker;
use docqa_core::traits::{Embedder, Generator};
use docqa_core::types::{Answer, DecisionKind, RoutingDecision, ScoredChunk};
use docqa_index::SharedIndex;

use crate::generate::{ExtractiveGenerator, RemoteGenerator};
use crate::indexing;
use crate::prompt::PromptBuilder;
use crate::router::Router;

const REFUSAL: &str = "I couldn't find that in the indexed notes.";

pub struct Pipeline {
    embedder: Box<dyn Embedder>,
    index: SharedIndex,
    router: Router,
    prompts: PromptBuilder,
    remote: Option<Box<dyn Generator>>,
    fallback: Box<dyn Generator>,
    top_k: usize,
}

impl Pipeline {
    /// Wire the pipeline from configuration. The remote generator exists
    /// only when a credential is configured; the extractive fallback is
    /// always present.
    pub fn new(
        embedder: Box<dyn Embedder>,
        index: SharedIndex,
        retrieval: &RetrievalConfig,
        generation: &GenerationConfig,
    ) -> Result<Self> {
        let remote: Option<Box<dyn Generator>> = match &generation.api_key {
            Some(key) if !key.trim().is_empty() => {
                Some(Box::new(RemoteGenerator::new(generation)?))
            }
            _ => None,
        };
        Self::with_generators(
            embedder,
            index,
            retrieval,
            generation.max_context_chars,
            remote,
            Box::new(ExtractiveGenerator::default()),
        )
    }

    /// Explicit wiring, used by tests to substitute generators.
    pub fn with_generators(
        embedder: Box<dyn Embedder>,
        index: SharedIndex,
        retrieval: &RetrievalConfig,
        max_context_chars: usize,
        remote: Option<Box<dyn Generator>>,
        fallback: Box<dyn Generator>,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            index,
            router: Router::new(retrieval)?,
            prompts: PromptBuilder::new(max_context_chars),
            remote,
            fallback,
            top_k: retrieval.top_k,
        })
    }

    /// Answer one query. Stateless per request; safe to call from many
    /// threads over the same pipeline.
    ///
    /// Infrastructure failures (unusable index, unloadable model) come
    /// back as errors; an evidentiary "no answer" comes back as a normal
    /// `Answer` with `DecisionKind::InsufficientContext`.
    pub fn answer(&self, query: &str) -> Result<Answer> {
        let query_vec = self.embedder.embed(query)?;
        let index = self.index.current();
        let retrieval = index.search(&query_vec, self.top_k)?;

        match self.router.route(query, &retrieval) {
            RoutingDecision::SmallTalk => {
                let prompt = self.prompts.small_talk(query);
                let text = self.generate(&prompt, &[]);
                Ok(Answer { text, sources: Vec::new(), decision: DecisionKind::SmallTalk })
            }
            RoutingDecision::InsufficientContext => {
                // terminal branch: the generator is never invoked
                Ok(Answer {
                    text: REFUSAL.to_string(),
                    sources: Vec::new(),
                    decision: DecisionKind::InsufficientContext,
                })
            }
            RoutingDecision::AnswerFromContext(kept) => {
                let prompt = self.prompts.grounded(query, &kept);
                let text = self.generate(&prompt, &kept);
                let sources = kept.iter().map(|sc| sc.chunk.id.clone()).collect();
                Ok(Answer { text, sources, decision: DecisionKind::AnswerFromContext })
            }
        }
    }

    /// Rebuild the index from `data_dir`, persist it to `out_path`, and
    /// publish it to concurrent readers in one swap.
    pub fn rebuild(&self, data_dir: &Path, out_path: &Path, chunker: &Chunker) -> Result<usize> {
        let chunks = docqa_core::ingest::process_directory(data_dir, chunker)?;
        let index = indexing::build_index(&chunks, self.embedder.as_ref())?;
        index.save(out_path)?;
        let count = index.len();
        self.index.swap(index);
        Ok(count)
    }

    /// Remote first when configured; any generation failure degrades to
    /// the extractive fallback for this request only.
    fn generate(&self, prompt: &docqa_core::types::Prompt, context: &[ScoredChunk]) -> String {
        if let Some(remote) = &self.remote {
            match remote.generate(prompt, context) {
                Ok(text) => return text,
                Err(e) => {
                    tracing::warn!(error = %e, "remote generation failed, using extractive fallback");
                }
            }
        }
        self.fallback
            .generate(prompt, context)
            .unwrap_or_else(|_| REFUSAL.to_string())
    }
}
