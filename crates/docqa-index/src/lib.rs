//! Persisted vector index and its process-wide shared handle.
//!
//! Exact brute-force inner-product search over L2-normalized vectors.
//! At this corpus scale an exact scan beats the operational cost of an
//! ANN structure; the interface promises nothing approximate, so one can
//! be swapped in later without touching callers.

use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use docqa_core::error::{Error, Result};
use docqa_core::types::{DocumentChunk, RetrievalResult, ScoredChunk};

/// One indexed chunk: its embedding plus metadata. Insertion order
/// defines the stable id used for deterministic tie-breaking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    dim: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn empty(dim: usize) -> Self {
        Self { dim, entries: Vec::new() }
    }

    /// Construct a fresh index from (vector, chunk) pairs. Every vector
    /// must match `dim`.
    pub fn build(dim: usize, pairs: Vec<(Vec<f32>, DocumentChunk)>) -> Result<Self> {
        let mut entries = Vec::with_capacity(pairs.len());
        for (vector, chunk) in pairs {
            if vector.len() != dim {
                return Err(Error::InvalidConfig(format!(
                    "entry '{}' has dim {}, index dim is {}",
                    chunk.id,
                    vector.len(),
                    dim
                )));
            }
            entries.push(IndexEntry { vector, chunk });
        }
        Ok(Self { dim, entries })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Top-k by descending inner product (cosine on normalized vectors).
    /// Ties break toward the lowest insertion id. An empty index returns
    /// an empty result, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(Error::InvalidConfig(format!(
                "query dim {} does not match index dim {}",
                query.len(),
                self.dim
            )));
        }
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, e)| (id, dot(query, &e.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(id, score)| ScoredChunk { chunk: self.entries[id].chunk.clone(), score })
            .collect())
    }

    /// Persist atomically: write to a temp file in the destination
    /// directory, then rename over the target, so a concurrent reader
    /// never observes a partially written artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::IndexUnavailable(format!("create {}: {e}", parent.display())))?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| Error::IndexUnavailable(format!("temp file: {e}")))?;
        serde_json::to_writer(&mut tmp, self)
            .map_err(|e| Error::IndexUnavailable(format!("serialize index: {e}")))?;
        tmp.flush()
            .map_err(|e| Error::IndexUnavailable(format!("flush index: {e}")))?;
        tmp.persist(path)
            .map_err(|e| Error::IndexUnavailable(format!("persist {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), entries = self.entries.len(), "index saved");
        Ok(())
    }

    /// Load a persisted index. Missing or corrupt artifacts surface as
    /// `IndexUnavailable`, distinct from an "insufficient context"
    /// answer.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::IndexUnavailable(format!("read {}: {e}", path.display())))?;
        let index: VectorIndex = serde_json::from_slice(&bytes)
            .map_err(|e| Error::IndexUnavailable(format!("parse {}: {e}", path.display())))?;
        for entry in &index.entries {
            if entry.vector.len() != index.dim {
                return Err(Error::IndexUnavailable(format!(
                    "corrupt index: entry '{}' dim mismatch",
                    entry.chunk.id
                )));
            }
        }
        Ok(index)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Process-wide handle to the active index. Readers clone the inner
/// `Arc`; a rebuild publishes a fully constructed replacement in one
/// swap, never mutating the index in place.
#[derive(Clone)]
pub struct SharedIndex {
    inner: Arc<RwLock<Arc<VectorIndex>>>,
}

impl SharedIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(index))) }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::new(VectorIndex::load(path)?))
    }

    /// Snapshot of the currently published index.
    pub fn current(&self) -> Arc<VectorIndex> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publish a replacement index. In-flight readers keep the snapshot
    /// they already hold.
    pub fn swap(&self, next: VectorIndex) {
        let next = Arc::new(next);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}
