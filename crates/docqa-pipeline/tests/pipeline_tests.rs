use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docqa_core::config::RetrievalConfig;
use docqa_core::error::{Error, Result};
use docqa_core::traits::{Embedder, Generator};
use docqa_core::types::{DecisionKind, DocumentChunk, Prompt, RoutingDecision, ScoredChunk};
use docqa_embed::HashEmbedder;
use docqa_index::{SharedIndex, VectorIndex};
use docqa_pipeline::{ExtractiveGenerator, Pipeline, PromptBuilder, Router};

fn chunk(doc_id: &str, idx: usize, content: &str) -> DocumentChunk {
    DocumentChunk {
        id: format!("{doc_id}:{idx}"),
        doc_id: doc_id.to_string(),
        doc_path: format!("/data/{doc_id}.txt"),
        content: content.to_string(),
        chunk_index: idx,
        total_chunks: 1,
    }
}

fn scored(doc_id: &str, score: f32) -> ScoredChunk {
    ScoredChunk { chunk: chunk(doc_id, 0, "content"), score }
}

fn retrieval_cfg() -> RetrievalConfig {
    RetrievalConfig { top_k: 4, confidence_threshold: 0.12, inclusion_threshold: 0.05, ..Default::default() }
}

fn index_from(texts: &[&str], embedder: &HashEmbedder) -> SharedIndex {
    let pairs: Vec<_> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| (embedder.embed(t).unwrap(), chunk("doc", i, t)))
        .collect();
    SharedIndex::new(VectorIndex::build(embedder.dim(), pairs).expect("build"))
}

struct CountingGenerator {
    calls: Arc<AtomicUsize>,
}

impl Generator for CountingGenerator {
    fn generate(&self, _prompt: &Prompt, _context: &[ScoredChunk]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("generated".to_string())
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &Prompt, _context: &[ScoredChunk]) -> Result<String> {
        Err(Error::Generation("connection refused".to_string()))
    }
}

// ---- Router ----

#[test]
fn greeting_short_circuits_to_small_talk() {
    let router = Router::new(&retrieval_cfg()).unwrap();
    // even with a confident retrieval in hand
    let retrieval = vec![scored("a", 0.9)];
    assert!(matches!(router.route("hello", &retrieval), RoutingDecision::SmallTalk));
    assert!(matches!(router.route("  Thanks!! ", &retrieval), RoutingDecision::SmallTalk));
    assert!(matches!(router.route("good morning", &[]), RoutingDecision::SmallTalk));
}

#[test]
fn empty_or_weak_retrieval_is_insufficient() {
    let router = Router::new(&retrieval_cfg()).unwrap();
    assert!(matches!(
        router.route("what is crop rotation?", &[]),
        RoutingDecision::InsufficientContext
    ));
    assert!(matches!(
        router.route("what is crop rotation?", &[scored("a", 0.08)]),
        RoutingDecision::InsufficientContext
    ));
}

#[test]
fn confident_retrieval_keeps_chunks_above_inclusion_threshold() {
    let router = Router::new(&retrieval_cfg()).unwrap();
    let retrieval = vec![scored("a", 0.8), scored("b", 0.3), scored("c", 0.02)];
    match router.route("what is crop rotation?", &retrieval) {
        RoutingDecision::AnswerFromContext(kept) => {
            let ids: Vec<&str> = kept.iter().map(|s| s.chunk.doc_id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b"], "sub-threshold chunk must be dropped");
        }
        other => panic!("expected grounded decision, got {other:?}"),
    }
}

#[test]
fn routing_is_deterministic() {
    let router = Router::new(&retrieval_cfg()).unwrap();
    let retrieval = vec![scored("a", 0.5)];
    for _ in 0..5 {
        assert!(matches!(
            router.route("how do I rotate crops?", &retrieval),
            RoutingDecision::AnswerFromContext(_)
        ));
    }
}

// ---- PromptBuilder ----

#[test]
fn grounded_prompt_tags_chunks_and_carries_question() {
    let pb = PromptBuilder::new(10_000);
    let chunks = vec![
        ScoredChunk { chunk: chunk("guide", 0, "Rotate crops yearly."), score: 0.8 },
        ScoredChunk { chunk: chunk("guide", 1, "Legumes fix nitrogen."), score: 0.6 },
    ];
    let prompt = pb.grounded("why rotate crops?", &chunks);
    assert!(prompt.system.contains("context ONLY"));
    assert!(prompt.user.contains("[guide:0]"));
    assert!(prompt.user.contains("[guide:1]"));
    assert!(prompt.user.contains("why rotate crops?"));
}

#[test]
fn context_respects_budget_but_keeps_first_chunk() {
    let pb = PromptBuilder::new(50);
    let big = "x".repeat(400);
    let chunks = vec![
        ScoredChunk { chunk: chunk("a", 0, &big), score: 0.9 },
        ScoredChunk { chunk: chunk("b", 0, &big), score: 0.8 },
    ];
    let prompt = pb.grounded("q", &chunks);
    assert!(prompt.user.contains("[a:0]"));
    assert!(!prompt.user.contains("[b:0]"), "second chunk must be dropped by the budget");
}

#[test]
fn context_budget_counts_characters_not_bytes() {
    // 20 two-byte chars per chunk: both fit a 60-char budget even though
    // the byte total is nearly twice that.
    let pb = PromptBuilder::new(60);
    let accented = "é".repeat(20);
    let chunks = vec![
        ScoredChunk { chunk: chunk("a", 0, &accented), score: 0.9 },
        ScoredChunk { chunk: chunk("b", 0, &accented), score: 0.8 },
    ];
    let prompt = pb.grounded("q", &chunks);
    assert!(prompt.user.contains("[a:0]"));
    assert!(prompt.user.contains("[b:0]"), "second chunk fits the character budget");
}

#[test]
fn small_talk_prompt_has_no_context() {
    let pb = PromptBuilder::new(10_000);
    let prompt = pb.small_talk("hello");
    assert!(!prompt.user.contains("# Context"));
    assert_eq!(prompt.user, "hello");
}

// ---- Generators ----

#[test]
fn extractive_fallback_is_nonempty_and_cites_ids() {
    let gen = ExtractiveGenerator::default();
    let context = vec![ScoredChunk { chunk: chunk("notes", 2, "Water early in the day."), score: 0.7 }];
    let prompt = PromptBuilder::new(10_000).grounded("when to water?", &context);
    let text = gen.generate(&prompt, &context).unwrap();
    assert!(!text.trim().is_empty());
    assert!(text.contains("[notes:2]"));
    assert!(text.contains("no generative model"));
}

// ---- Pipeline scenarios ----

#[test]
fn grounded_question_is_answered_with_citations() {
    let embedder = HashEmbedder::new(384);
    let index = index_from(&["Paris is the capital of France."], &embedder);
    let pipeline = Pipeline::with_generators(
        Box::new(HashEmbedder::new(384)),
        index,
        &retrieval_cfg(),
        10_000,
        None,
        Box::new(ExtractiveGenerator::default()),
    )
    .unwrap();

    let answer = pipeline.answer("What is the capital of France?").unwrap();
    assert_eq!(answer.decision, DecisionKind::AnswerFromContext);
    assert!(!answer.text.trim().is_empty());
    assert_eq!(answer.sources, vec!["doc:0".to_string()]);
}

#[test]
fn greeting_routes_to_small_talk_regardless_of_index() {
    let embedder = HashEmbedder::new(384);
    let index = index_from(&["Paris is the capital of France."], &embedder);
    let pipeline = Pipeline::with_generators(
        Box::new(HashEmbedder::new(384)),
        index,
        &retrieval_cfg(),
        10_000,
        None,
        Box::new(ExtractiveGenerator::default()),
    )
    .unwrap();

    let answer = pipeline.answer("hello").unwrap();
    assert_eq!(answer.decision, DecisionKind::SmallTalk);
    assert!(answer.sources.is_empty());
    assert!(!answer.text.trim().is_empty());
}

#[test]
fn empty_index_refuses_without_invoking_generator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::with_generators(
        Box::new(HashEmbedder::new(384)),
        SharedIndex::new(VectorIndex::empty(384)),
        &retrieval_cfg(),
        10_000,
        Some(Box::new(CountingGenerator { calls: Arc::clone(&calls) })),
        Box::new(CountingGenerator { calls: Arc::clone(&calls) }),
    )
    .unwrap();

    let answer = pipeline.answer("What is the capital of France?").unwrap();
    assert_eq!(answer.decision, DecisionKind::InsufficientContext);
    assert!(!answer.text.trim().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0, "generator must not run on refusal");
}

#[test]
fn unrelated_question_is_insufficient_context() {
    let embedder = HashEmbedder::new(384);
    let index = index_from(&["Paris is the capital of France."], &embedder);
    let pipeline = Pipeline::with_generators(
        Box::new(HashEmbedder::new(384)),
        index,
        &retrieval_cfg(),
        10_000,
        None,
        Box::new(ExtractiveGenerator::default()),
    )
    .unwrap();

    let answer = pipeline.answer("zucchini harvest calendar").unwrap();
    assert_eq!(answer.decision, DecisionKind::InsufficientContext);
}

#[test]
fn failing_remote_degrades_to_fallback_with_nonempty_answer() {
    let embedder = HashEmbedder::new(384);
    let index = index_from(&["Paris is the capital of France."], &embedder);
    let pipeline = Pipeline::with_generators(
        Box::new(HashEmbedder::new(384)),
        index,
        &retrieval_cfg(),
        10_000,
        Some(Box::new(FailingGenerator)),
        Box::new(ExtractiveGenerator::default()),
    )
    .unwrap();

    let answer = pipeline.answer("What is the capital of France?").unwrap();
    assert_eq!(answer.decision, DecisionKind::AnswerFromContext);
    assert!(!answer.text.trim().is_empty());
    assert!(answer.text.contains("no generative model"));
}

#[test]
fn rebuild_publishes_new_corpus_to_queries() {
    let tmp = tempfile::TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("facts.txt"), "Paris is the capital of France.").unwrap();
    let out_path = tmp.path().join("index.json");

    let pipeline = Pipeline::with_generators(
        Box::new(HashEmbedder::new(384)),
        SharedIndex::new(VectorIndex::empty(384)),
        &retrieval_cfg(),
        10_000,
        None,
        Box::new(ExtractiveGenerator::default()),
    )
    .unwrap();

    let before = pipeline.answer("What is the capital of France?").unwrap();
    assert_eq!(before.decision, DecisionKind::InsufficientContext);

    let chunker = docqa_core::ingest::Chunker::new(Default::default());
    let count = pipeline.rebuild(&data_dir, &out_path, &chunker).unwrap();
    assert_eq!(count, 1);
    assert!(out_path.exists());

    let after = pipeline.answer("What is the capital of France?").unwrap();
    assert_eq!(after.decision, DecisionKind::AnswerFromContext);
    assert_eq!(after.sources, vec!["facts:0".to_string()]);
}
