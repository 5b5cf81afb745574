//! Integration tests for embeddings module
//!
//! ONNX tests need a downloaded model (`kbase model add all-minilm-l6-v2`)
//! and are skipped with a note when it is missing. The rest run anywhere.

use kbase::embeddings::{
    cosine_similarity, create_engine, euclidean_distance, EmbeddingEngine, EngineKind,
    ModelRegistry,
};
use kbase::models::resolve_model_path;
use kbase::EmbeddingProvider;

/// ONNX engine for the default model, if its files are available
fn onnx_embedder() -> Option<Box<dyn EmbeddingEngine>> {
    let registry = ModelRegistry::builtin().expect("builtin registry should parse");
    let model = registry.default_model();
    assert_eq!(model.engine, EngineKind::Onnx);

    if let Err(e) = resolve_model_path(&model.id) {
        eprintln!("\nSkipping ONNX test: {:#}", e);
        eprintln!("Run: kbase model add {}\n", model.id);
        return None;
    }
    Some(create_engine(model, None).expect("cached model should load"))
}

#[test]
fn test_registry_models_resolve() {
    let registry = ModelRegistry::builtin().unwrap();
    assert!(registry.names().contains(&"all-minilm-l6-v2"));

    for name in registry.names() {
        let model = registry.get(name).unwrap();
        assert!(model.dimensions > 0, "{} should declare a dimension", name);
        if model.engine == EngineKind::Onnx {
            assert!(
                model.download_quantized.is_some() && model.download_tokenizer.is_some(),
                "{} should have download URLs",
                name
            );
        }
    }
}

#[test]
fn test_hashing_provider_from_registry() {
    let registry = ModelRegistry::builtin().unwrap();
    let provider = EmbeddingProvider::from_definition(registry.get("hashing-384").unwrap(), None);

    let embedding = provider.embed("Rust for systems programming").unwrap();
    assert_eq!(embedding.len(), 384);
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 0.001, "Embedding should be L2 normalized, got norm: {}", norm);
}

#[test]
fn test_single_embedding_generation() {
    let Some(mut embedder) = onnx_embedder() else { return };

    let text = "This is a test sentence for semantic embedding";
    let embedding = embedder.embed(text).expect("Failed to generate embedding");

    assert_eq!(embedding.len(), embedder.dimension());
    assert!(embedding.iter().any(|&x| x != 0.0), "Embedding should not be all zeros");

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 0.001, "Embedding should be L2 normalized, got norm: {}", norm);
}

#[test]
fn test_semantic_similarity_detection() {
    let Some(mut embedder) = onnx_embedder() else { return };

    let e1 = embedder.embed("I prefer Rust for systems programming").unwrap();
    let e2 = embedder.embed("Rust is my choice for low-level development").unwrap();
    let e3 = embedder.embed("The weather is nice today").unwrap();

    let sim_12 = cosine_similarity(&e1, &e2);
    let sim_13 = cosine_similarity(&e1, &e3);
    println!("Similarity (Rust/Rust): {}", sim_12);
    println!("Similarity (Rust/weather): {}", sim_13);

    assert!(sim_12 > sim_13, "Similar sentences should score higher: {} vs {}", sim_12, sim_13);
    assert!(sim_12 > 0.5, "Similar sentences should score above 0.5, got {}", sim_12);
}

#[test]
fn test_batch_embedding_generation() {
    let Some(mut embedder) = onnx_embedder() else { return };

    let texts = vec![
        "First test sentence".to_string(),
        "Second test sentence".to_string(),
        "Third test sentence".to_string(),
    ];
    let embeddings = embedder.embed_batch(&texts).expect("Failed to generate batch embeddings");

    assert_eq!(embeddings.len(), 3);
    for (i, emb) in embeddings.iter().enumerate() {
        assert_eq!(emb.len(), embedder.dimension(), "Embedding {} has wrong dimension", i);
    }
}

#[test]
fn test_cosine_similarity_properties() {
    let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
    assert!((sim - 1.0).abs() < 0.001, "Identical vectors should have similarity ~1.0");

    let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
    assert!(sim.abs() < 0.001, "Orthogonal vectors should have similarity ~0.0");

    let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]);
    assert!((sim + 1.0).abs() < 0.001, "Opposite vectors should have similarity ~-1.0");

    let sim = cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
    assert_eq!(sim, 0.0, "Zero vector should score 0.0 rather than NaN");
}

#[test]
fn test_euclidean_distance_properties() {
    let dist = euclidean_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
    assert!(dist.abs() < 0.001, "Identical vectors should have distance ~0.0");

    let dist = euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]);
    assert!((dist - 5.0).abs() < 0.001, "3-4-5 triangle should give 5.0, got {}", dist);
}
