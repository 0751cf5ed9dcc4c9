use candle_core::{DType, Device, Tensor};

use docshelf_core::traits::Embedder;
use docshelf_embed::{masked_mean_l2, HashEmbedder};

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384);
    assert_eq!(embedder.dim(), 384);

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn hash_embedder_distinguishes_texts() {
    let embedder = HashEmbedder::new(128);
    let embs = embedder
        .embed_batch(&["alpha beta".to_string(), "gamma delta".to_string()])
        .expect("embed");
    let dot: f32 = embs[0].iter().zip(embs[1].iter()).map(|(a, b)| a * b).sum();
    assert!(dot < 0.99, "distinct texts should not collapse to one vector");
}

#[test]
fn embed_one_matches_batch_of_one() {
    let embedder = HashEmbedder::new(64);
    let single = embedder.embed_one("alpha beta gamma").expect("embed_one");
    let batch = embedder
        .embed_batch(&["alpha beta gamma".to_string()])
        .expect("embed_batch");
    assert_eq!(single, batch[0]);
}

#[test]
fn masked_mean_l2_ignores_masked_tokens() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; second token is masked out.
    let h = Tensor::from_slice(
        &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        (1, 2, 4),
        &dev,
    )
    .expect("tensor");
    let mask = Tensor::from_slice(&[1i64, 0i64], (1, 2), &dev)
        .expect("mask")
        .to_dtype(DType::F32)
        .expect("dtype");
    let out = masked_mean_l2(&h, &mask).expect("pool");
    let v: Vec<Vec<f32>> = out.to_vec2().expect("to_vec2");
    let v = &v[0];
    // Mean over unmasked tokens = first token [1,2,3,4], then L2 normalize
    let norm: f32 = (1.0f32 + 4.0 + 9.0 + 16.0).sqrt();
    let expected = [1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm];
    for (a, b) in v.iter().copied().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}
