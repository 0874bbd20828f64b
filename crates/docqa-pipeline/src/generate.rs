//! Generation backends.
//!
//! `RemoteGenerator` talks to an OpenAI-compatible chat-completions
//! endpoint; `ExtractiveGenerator` composes an answer directly from the
//! retrieved chunks so a grounded decision always yields text even with
//! zero external dependencies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use docqa_core::config::GenerationConfig;
use docqa_core::error::{Error, Result};
use docqa_core::traits::Generator;
use docqa_core::types::{Prompt, ScoredChunk};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Remote completion client. Built once at startup when a credential is
/// configured; every failure is per-request and recoverable by the
/// caller's fallback.
pub struct RemoteGenerator {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl RemoteGenerator {
    /// Errors if no credential is configured or the client cannot be
    /// constructed.
    pub fn new(cfg: &GenerationConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("generation.api_key is not set".to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Generation(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
        })
    }
}

impl Generator for RemoteGenerator {
    fn generate(&self, prompt: &Prompt, _context: &[ScoredChunk]) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: 0.2,
            max_tokens: 700,
        };
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Generation(format!("request to {url}: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Generation(format!("endpoint status: {e}")))?;
        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| Error::Generation(format!("malformed completion response: {e}")))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Error::Generation("empty completion".to_string()));
        }
        Ok(text)
    }
}

const NO_MODEL_PREFIX: &str =
    "(no generative model configured; showing the closest indexed passages)";

const SMALL_TALK_REPLY: &str = "Hi! I answer questions from your indexed documents. \
Add .txt or .md files to the data folder, rebuild the index, then ask away.";

/// Extractive composition of the top retrieved chunks. Always produces
/// nonempty text for a grounded decision.
pub struct ExtractiveGenerator {
    max_chunks: usize,
    max_chars_per_chunk: usize,
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self { max_chunks: 3, max_chars_per_chunk: 800 }
    }
}

impl ExtractiveGenerator {
    pub fn new(max_chunks: usize, max_chars_per_chunk: usize) -> Self {
        Self { max_chunks, max_chars_per_chunk }
    }

    fn truncate(&self, text: &str) -> String {
        if text.chars().count() <= self.max_chars_per_chunk {
            return text.to_string();
        }
        let cut: String = text.chars().take(self.max_chars_per_chunk).collect();
        format!("{cut}...")
    }
}

impl Generator for ExtractiveGenerator {
    fn generate(&self, _prompt: &Prompt, context: &[ScoredChunk]) -> Result<String> {
        if context.is_empty() {
            // small-talk path: no document context to extract from
            return Ok(SMALL_TALK_REPLY.to_string());
        }
        let body = context
            .iter()
            .take(self.max_chunks)
            .map(|sc| format!("[{}] {}", sc.chunk.id, self.truncate(sc.chunk.content.trim())))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(format!("{NO_MODEL_PREFIX}\n\n{body}"))
    }
}
