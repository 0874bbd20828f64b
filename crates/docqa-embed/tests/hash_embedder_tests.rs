use docqa_core::traits::Embedder;
use docqa_embed::HashEmbedder;

#[test]
fn identical_text_embeds_identically() {
    let e = HashEmbedder::new(384);
    let a = e.embed("Paris is the capital of France.").unwrap();
    let b = e.embed("Paris is the capital of France.").unwrap();
    assert_eq!(a, b);
}

#[test]
fn vectors_are_unit_norm() {
    let e = HashEmbedder::new(256);
    let v = e.embed("grow potatoes in raised beds").unwrap();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
}

#[test]
fn dim_matches_construction() {
    let e = HashEmbedder::new(128);
    assert_eq!(e.dim(), 128);
    assert_eq!(e.embed("anything").unwrap().len(), 128);
}

#[test]
fn overlapping_text_scores_higher_than_unrelated() {
    let e = HashEmbedder::new(384);
    let doc = e.embed("Paris is the capital of France.").unwrap();
    let close = e.embed("What is the capital of France?").unwrap();
    let far = e.embed("zucchini harvest calendar").unwrap();
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&doc, &close) > dot(&doc, &far));
}

#[test]
fn embed_batch_matches_single_calls() {
    let e = HashEmbedder::new(64);
    let texts = vec!["one two".to_string(), "three four".to_string()];
    let batch = e.embed_batch(&texts).unwrap();
    assert_eq!(batch[0], e.embed("one two").unwrap());
    assert_eq!(batch[1], e.embed("three four").unwrap());
}
