//! Deterministic prompt assembly.

use docqa_core::types::{Prompt, ScoredChunk};

const GROUNDED_SYSTEM: &str = "You are a careful assistant that answers using the provided context ONLY.\n\
- Summarize and synthesize; do not copy long raw lines from the source.\n\
- If the context only partially answers, say what is known and what is not.\n\
- Never invent facts. If the answer is not present, say so explicitly.\n\
- When you use a fact, cite it inline as [source: CHUNK-ID] using the id that tags the passage.\n\
- End with a compact \"Sources:\" list of the unique ids you cited.";

const SMALL_TALK_SYSTEM: &str = "You are a friendly guide for a local document Q&A tool. \
Greet the user briefly and explain that they can add .txt or .md files to the data folder, \
rebuild the index, and then ask questions about their documents. \
Keep it short and do not mention implementation details.";

pub struct PromptBuilder {
    max_context_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    /// Grounded-answer prompt: the system instruction constrains the
    /// generator to the supplied chunks; the user section is the tagged
    /// context followed by the question.
    pub fn grounded(&self, query: &str, chunks: &[ScoredChunk]) -> Prompt {
        let context = self.format_context(chunks);
        Prompt {
            system: GROUNDED_SYSTEM.to_string(),
            user: format!("# Context\n{context}\n\n# Question\n{query}\n\n# Your Answer"),
        }
    }

    /// Minimal conversational prompt, no document context.
    pub fn small_talk(&self, query: &str) -> Prompt {
        Prompt { system: SMALL_TALK_SYSTEM.to_string(), user: query.to_string() }
    }

    /// Tag each chunk with its id for citation and join with separators,
    /// stopping before the context budget is blown. At least one chunk
    /// is always included.
    fn format_context(&self, chunks: &[ScoredChunk]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut total = 0usize;
        for sc in chunks {
            let text = sc.chunk.content.trim();
            if text.is_empty() {
                continue;
            }
            let block = format!("[{}]\n{}", sc.chunk.id, text);
            // budget is in characters, same unit the chunker enforces
            let block_chars = block.chars().count();
            if total + block_chars > self.max_context_chars && !parts.is_empty() {
                break;
            }
            total += block_chars;
            parts.push(block);
        }
        parts.join("\n\n---\n\n")
    }
}
