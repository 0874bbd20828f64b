//! Offline index construction: ingest, chunk, embed, persist.

use std::path::Path;

use indicatif::ProgressBar;

use docqa_core::error::Result;
use docqa_core::ingest::Chunker;
use docqa_core::traits::Embedder;
use docqa_core::types::DocumentChunk;
use docqa_index::VectorIndex;

/// Embed every chunk and assemble a fresh index. Insertion order follows
/// the (sorted) ingestion order, which keeps rebuilds reproducible.
pub fn build_index(chunks: &[DocumentChunk], embedder: &dyn Embedder) -> Result<VectorIndex> {
    let pb = ProgressBar::new(chunks.len() as u64);
    let mut pairs = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let vector = embedder.embed(&chunk.content)?;
        pairs.push((vector, chunk.clone()));
        pb.inc(1);
    }
    pb.finish_and_clear();
    VectorIndex::build(embedder.dim(), pairs)
}

/// Full offline build: chunk the corpus under `data_dir`, embed, and
/// persist to `out_path` atomically. Re-running on the same inputs
/// produces the same artifact. Returns the number of indexed chunks.
pub fn build_and_save(
    data_dir: &Path,
    out_path: &Path,
    chunker: &Chunker,
    embedder: &dyn Embedder,
) -> Result<usize> {
    let chunks = docqa_core::ingest::process_directory(data_dir, chunker)?;
    let index = build_index(&chunks, embedder)?;
    index.save(out_path)?;
    tracing::info!(
        data_dir = %data_dir.display(),
        out = %out_path.display(),
        chunks = index.len(),
        "index build complete"
    );
    Ok(index.len())
}
