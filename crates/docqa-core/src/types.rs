//! Domain types shared by the indexing and answering sides.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// A source document read at index-build time. Immutable once ingested.
/// `id` is the path relative to the corpus root with the extension
/// stripped, so same-named files in different subdirectories stay
/// distinct.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub path: String,
    pub text: String,
}

/// A bounded segment of a source document, the unit of retrieval.
///
/// - `id`: `"{doc_id}:{chunk_index}"`, unique within a build
/// - `doc_id`: stable document identity, the corpus-relative path
///   without its extension
/// - `doc_path`: original path to the source file
/// - `content`: the text payload of the chunk
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_path: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A retrieved chunk with its cosine similarity to the query.
/// Higher is always better.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Ordered retrieval output, highest similarity first, at most top-k long.
pub type RetrievalResult = Vec<ScoredChunk>;

/// The response mode chosen for a query, carrying the evidence that
/// justified it.
#[derive(Debug, Clone)]
pub enum RoutingDecision {
    /// Retrieval is confident enough to ground an answer; carries every
    /// retained chunk, not only the top hit.
    AnswerFromContext(Vec<ScoredChunk>),
    /// Greeting/thanks shortcut, decided independently of retrieval.
    SmallTalk,
    /// Retrieval was empty or below the confidence threshold.
    InsufficientContext,
}

/// Flat tag of [`RoutingDecision`] suitable for returning to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    AnswerFromContext,
    SmallTalk,
    InsufficientContext,
}

impl RoutingDecision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            RoutingDecision::AnswerFromContext(_) => DecisionKind::AnswerFromContext,
            RoutingDecision::SmallTalk => DecisionKind::SmallTalk,
            RoutingDecision::InsufficientContext => DecisionKind::InsufficientContext,
        }
    }
}

/// A fully assembled generation request: a system instruction and the
/// user section (context plus question). Deterministic for identical
/// inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Final answer returned to the caller: the text, the chunk ids it is
/// grounded on, and which routing branch produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ChunkId>,
    pub decision: DecisionKind,
}
