//! Document ingestion and chunking.
//!
//! Splits on paragraph boundaries first, packs neighbors up to the max
//! chunk size, and hard-wraps oversized spans with a trailing-character
//! overlap so context survives the cut. Same input and config always
//! produce the same chunk sequence.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Document, DocumentChunk};

/// List `.txt`/`.md` files under `root`, sorted for determinism.
pub fn list_document_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        match path.extension().and_then(|s| s.to_str()) {
            Some("txt") | Some("md") => files.push(path.to_path_buf()),
            _ => {}
        }
    }
    files.sort();
    files
}

/// Read one source document. Unreadable or empty files are skipped with
/// a warning, never fatal to the build.
pub fn read_document(root: &Path, path: &Path) -> Option<Document> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(_) => match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                return None;
            }
        },
    };
    if text.trim().is_empty() {
        tracing::warn!(path = %path.display(), "skipping empty file");
        return None;
    }
    Some(Document {
        id: doc_id_for(root, path),
        path: path.to_string_lossy().to_string(),
        text,
    })
}

/// Document identity: the path relative to the corpus root, extension
/// stripped. Keeps same-named files in different subdirectories from
/// colliding in chunk ids.
fn doc_id_for(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.with_extension("").to_string_lossy().to_string()
}

#[derive(Default)]
pub struct Chunker {
    cfg: ChunkingConfig,
}

impl Chunker {
    pub fn new(cfg: ChunkingConfig) -> Self {
        Self { cfg }
    }

    /// Split a document into chunks. Every chunk except possibly the
    /// final one has a length in `[min_chars, max_chars]`; an empty
    /// document yields no chunks.
    pub fn chunk(&self, doc: &Document) -> Vec<DocumentChunk> {
        let doc_id = doc.id.clone();
        let spans = self.split_spans(&doc.text);
        let total_chunks = spans.len();
        spans
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| DocumentChunk {
                id: format!("{}:{}", doc_id, chunk_index),
                doc_id: doc_id.clone(),
                doc_path: doc.path.clone(),
                content,
                chunk_index,
                total_chunks,
            })
            .collect()
    }

    fn split_spans(&self, text: &str) -> Vec<String> {
        let mut spans: Vec<String> = Vec::new();
        let mut cur = String::new();
        for para in text.split("\n\n") {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }
            let cur_len = cur.chars().count();
            // Flush a full-enough buffer before it would overflow.
            if cur_len >= self.cfg.min_chars
                && cur_len + 2 + para.chars().count() > self.cfg.max_chars
            {
                spans.push(std::mem::take(&mut cur));
            }
            if !cur.is_empty() {
                cur.push_str("\n\n");
            }
            cur.push_str(para);
            if cur.chars().count() > self.cfg.max_chars {
                let mut pieces = self.hard_wrap(&cur);
                // An under-min tail stays in the buffer so following
                // paragraphs can fill it up.
                cur = if pieces
                    .last()
                    .is_some_and(|l| l.chars().count() < self.cfg.min_chars)
                {
                    pieces.pop().unwrap_or_default()
                } else {
                    String::new()
                };
                spans.extend(pieces);
            }
        }
        if !cur.is_empty() {
            spans.push(cur);
        }
        spans
    }

    /// Wrap an oversized span at whitespace near the max length, carrying
    /// `overlap_chars` of trailing context into the next piece.
    ///
    /// Whitespace cuts are only taken at or past the min bound, so
    /// non-final pieces stay within `[min_chars, max_chars]`; a window
    /// with no usable whitespace is cut hard at the cap. `start`
    /// strictly advances every iteration.
    fn hard_wrap(&self, span: &str) -> Vec<String> {
        let chars: Vec<char> = span.chars().collect();
        let max = self.cfg.max_chars.max(1);
        let min = self.cfg.min_chars.min(max).max(1);
        let overlap = self.cfg.overlap_chars.min(max / 2);
        let mut pieces = Vec::new();
        let mut start = 0usize;
        while start < chars.len() {
            let end = (start + max).min(chars.len());
            let mut cut = end;
            if end < chars.len() {
                if let Some(ws) = (start + min..end).rev().find(|&i| chars[i].is_whitespace()) {
                    let mut content_end = ws;
                    while content_end > start && chars[content_end - 1].is_whitespace() {
                        content_end -= 1;
                    }
                    if content_end - start >= min {
                        cut = ws;
                    }
                }
            }
            let piece: String = chars[start..cut].iter().collect();
            let piece = piece.trim().to_string();
            if !piece.is_empty() {
                pieces.push(piece);
            }
            if cut >= chars.len() {
                break;
            }
            let mut next = cut.saturating_sub(overlap);
            // Snap forward to a word boundary so the overlap never opens
            // with a partial token.
            while next < cut && next > 0 && !chars[next - 1].is_whitespace() {
                next += 1;
            }
            if next <= start {
                // overlap would rewind to or before the previous cut;
                // give it up rather than stall
                next = cut;
            }
            start = next;
            while start < chars.len() && chars[start].is_whitespace() {
                start += 1;
            }
        }
        pieces
    }
}

/// Chunk every readable document under `data_dir`.
pub fn process_directory(data_dir: &Path, chunker: &Chunker) -> Result<Vec<DocumentChunk>> {
    process_files(data_dir, &list_document_files(data_dir), chunker)
}

/// Same as [`process_directory`] but restricted to the first `limit`
/// files, for partial rebuilds during development.
pub fn process_directory_limited(
    data_dir: &Path,
    chunker: &Chunker,
    limit: usize,
) -> Result<Vec<DocumentChunk>> {
    let mut files = list_document_files(data_dir);
    if files.len() > limit {
        files.truncate(limit);
        tracing::info!(limit, "limited ingestion to first files");
    }
    process_files(data_dir, &files, chunker)
}

fn process_files(root: &Path, files: &[PathBuf], chunker: &Chunker) -> Result<Vec<DocumentChunk>> {
    let mut all_chunks = Vec::new();
    let mut read = 0usize;
    for file_path in files {
        let Some(doc) = read_document(root, file_path) else {
            continue;
        };
        read += 1;
        all_chunks.extend(chunker.chunk(&doc));
    }
    tracing::info!(files = read, chunks = all_chunks.len(), "processed corpus");
    Ok(all_chunks)
}
