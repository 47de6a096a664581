//! End-to-end classification tests
//!
//! Record events through the engine, then classify known and unknown
//! phrases against the resulting scores and registry.

mod common;

use common::{axis, create_hashed_engine, create_test_engine, FailingEmbedder, StaticEmbedder};
use mastery_core::mastery::aggregator::squash;
use mastery_core::{Bucket, ClassifyOptions, EventKind, MasteryError};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::test]
async fn test_alice_scenario() {
    let (engine, _temp) = create_hashed_engine().await;

    engine
        .record_event("alice", "priors", EventKind::Confusion, None)
        .await
        .unwrap();
    engine
        .record_event("alice", "posterior", EventKind::Confusion, None)
        .await
        .unwrap();
    engine
        .record_event("alice", "gradient descent", EventKind::AssumedMastery, None)
        .await
        .unwrap();
    engine
        .record_event("alice", "gradient descent", EventKind::RecallCorrect, None)
        .await
        .unwrap();

    let result = engine
        .classify("alice", &["gradient descent", "priors"])
        .await
        .unwrap();

    assert_eq!(result.bucket_of("priors"), Some(Bucket::Weak));
    assert_ne!(result.bucket_of("gradient descent"), Some(Bucket::Weak));
    assert_eq!(result.len(), 2);

    let scores = engine.compute_scores("alice", 30.0).await.unwrap();
    assert!(scores["gradient descent"] > 0.5);
}

#[tokio::test]
async fn test_original_text_preserved_and_not_deduplicated() {
    let (engine, _temp) = create_hashed_engine().await;
    engine
        .record_event("alice", "priors", EventKind::Confusion, None)
        .await
        .unwrap();

    let phrases = ["  Priors", "PRIORS", "priors"];
    let result = engine.classify("alice", &phrases).await.unwrap();

    assert_eq!(result.weak, vec!["  Priors", "PRIORS", "priors"]);
    assert!(result.strong.is_empty());
    assert!(result.neutral.is_empty());
}

#[tokio::test]
async fn test_unrelated_phrase_never_strong() {
    let (engine, _temp) = create_hashed_engine().await;
    engine
        .record_event("alice", "priors", EventKind::RecallCorrect, None)
        .await
        .unwrap();
    engine
        .record_event("alice", "posterior", EventKind::RecallCorrect, None)
        .await
        .unwrap();

    let result = engine
        .classify("alice", &["an unrelated phrase with no near concept"])
        .await
        .unwrap();

    assert_ne!(
        result.bucket_of("an unrelated phrase with no near concept"),
        Some(Bucket::Strong)
    );
}

#[tokio::test]
async fn test_dissimilar_neighbour_falls_back_to_default() {
    let embedder = StaticEmbedder::new(4)
        .with("priors", axis(4, 0))
        .with("posterior", axis(4, 1))
        .with_fallback(axis(4, 3));
    let (engine, _temp) = create_test_engine(Arc::new(embedder)).await;

    engine
        .record_event("alice", "priors", EventKind::RecallCorrect, None)
        .await
        .unwrap();
    engine
        .record_event("alice", "posterior", EventKind::RecallCorrect, None)
        .await
        .unwrap();

    let scores = engine.compute_scores("alice", 30.0).await.unwrap();
    let score = engine
        .nearest_score("an unrelated phrase with no near concept", &scores)
        .await
        .unwrap();
    assert_eq!(score, -0.5);

    let result = engine
        .classify("alice", &["an unrelated phrase with no near concept"])
        .await
        .unwrap();
    assert_eq!(result.weak.len(), 1);
}

#[tokio::test]
async fn test_similar_neighbour_blends_score() {
    let embedder = StaticEmbedder::new(3)
        .with("gradient descent", vec![1.0, 0.0, 0.0])
        .with("sgd", vec![0.8, 0.6, 0.0]);
    let (engine, _temp) = create_test_engine(Arc::new(embedder)).await;

    let now = chrono::Utc::now().timestamp();
    engine
        .record_event("alice", "gradient descent", EventKind::RecallCorrect, Some(now))
        .await
        .unwrap();

    let scores = engine.compute_scores_at("alice", 30.0, now).await.unwrap();
    let neighbour = scores["gradient descent"];
    assert!((neighbour - squash(1.0)).abs() < 1e-12);

    let score = engine.nearest_score("SGD", &scores).await.unwrap();
    let expected = neighbour * 0.8 + -0.5 * 0.2;
    assert!((score - expected).abs() < 1e-5, "{} vs {}", score, expected);

    // Fallback never registers the queried phrase
    assert!(engine.registry().lookup("sgd").await.unwrap().is_none());
}

#[tokio::test]
async fn test_neighbour_without_user_history_uses_default() {
    let embedder = StaticEmbedder::new(3)
        .with("priors", vec![1.0, 0.0, 0.0])
        .with("prior", vec![1.0, 0.0, 0.0]);
    let (engine, _temp) = create_test_engine(Arc::new(embedder)).await;

    // Registered through bob; alice has no events on it
    engine
        .record_event("bob", "priors", EventKind::RecallCorrect, None)
        .await
        .unwrap();

    let result = engine.classify("alice", &["prior"]).await.unwrap();
    assert_eq!(result.weak, vec!["prior"]);

    let score = engine.nearest_score("prior", &HashMap::new()).await.unwrap();
    assert!((score - -0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_registry_uses_default_for_every_phrase() {
    let (engine, _temp) = create_test_engine(Arc::new(FailingEmbedder)).await;

    let phrases = ["tensor calculus", "duck", "bayes rule", "cheesecake"];
    let result = engine.classify("alice", &phrases).await.unwrap();
    assert_eq!(result.weak.len(), 4);

    // A default inside the neutral band moves every phrase there
    let options = ClassifyOptions {
        default_score: 0.5,
        ..ClassifyOptions::default()
    };
    let result = engine.classify_with("alice", &phrases, &options).await.unwrap();
    assert_eq!(result.neutral.len(), 4);

    let options = ClassifyOptions {
        default_score: 0.9,
        ..ClassifyOptions::default()
    };
    let result = engine.classify_with("alice", &phrases, &options).await.unwrap();
    assert_eq!(result.strong.len(), 4);
}

#[tokio::test]
async fn test_empty_phrase_is_classified() {
    let (engine, _temp) = create_hashed_engine().await;
    engine
        .record_event("alice", "priors", EventKind::Confusion, None)
        .await
        .unwrap();

    let result = engine.classify("alice", &["", "   "]).await.unwrap();
    assert_eq!(result.weak, vec!["", "   "]);
}

#[tokio::test]
async fn test_provider_failure_aborts_record() {
    let (engine, _temp) = create_test_engine(Arc::new(FailingEmbedder)).await;

    let result = engine
        .record_event("alice", "priors", EventKind::Confusion, None)
        .await;
    assert!(matches!(result, Err(MasteryError::EmbeddingUnavailable(_))));

    assert_eq!(engine.events().count(None).await.unwrap(), 0);
    assert!(engine.registry().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_provider_failure_on_fallback_propagates() {
    // Knows "priors" but cannot embed anything else
    let embedder = StaticEmbedder::new(2).with("priors", vec![1.0, 0.0]);
    let (engine, _temp) = create_test_engine(Arc::new(embedder)).await;
    engine
        .record_event("alice", "priors", EventKind::Confusion, None)
        .await
        .unwrap();

    // Known phrases never touch the provider
    let result = engine.classify("alice", &["priors"]).await.unwrap();
    assert_eq!(result.weak, vec!["priors"]);

    let result = engine.classify("alice", &["posterior"]).await;
    assert!(matches!(result, Err(MasteryError::EmbeddingUnavailable(_))));
}

#[tokio::test]
async fn test_custom_thresholds() {
    let (engine, _temp) = create_hashed_engine().await;
    let now = chrono::Utc::now().timestamp();
    engine
        .record_event("alice", "priors", EventKind::AssumedMastery, Some(now))
        .await
        .unwrap();

    // squash(0.1) ≈ 0.525
    let result = engine.classify("alice", &["priors"]).await.unwrap();
    assert_eq!(result.neutral, vec!["priors"]);

    let options = ClassifyOptions::default().with_thresholds(0.6, 0.8);
    let result = engine
        .classify_with("alice", &["priors"], &options)
        .await
        .unwrap();
    assert_eq!(result.weak, vec!["priors"]);

    let options = ClassifyOptions::default().with_thresholds(0.1, 0.5);
    let result = engine
        .classify_with("alice", &["priors"], &options)
        .await
        .unwrap();
    assert_eq!(result.strong, vec!["priors"]);
}

#[tokio::test]
async fn test_inverted_thresholds_still_partition() {
    let (engine, _temp) = create_hashed_engine().await;
    let now = chrono::Utc::now().timestamp();
    engine
        .record_event("alice", "priors", EventKind::AssumedMastery, Some(now))
        .await
        .unwrap();
    engine
        .record_event("alice", "gradient descent", EventKind::RecallCorrect, Some(now))
        .await
        .unwrap();

    let options = ClassifyOptions::default().with_thresholds(0.8, 0.2);
    let result = engine
        .classify_with("alice", &["priors", "gradient descent", "duck"], &options)
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result.bucket_of("priors"), Some(Bucket::Weak));
    assert_eq!(result.bucket_of("gradient descent"), Some(Bucket::Weak));
}

#[tokio::test]
async fn test_concurrent_record_and_classify() {
    let (engine, _temp) = create_hashed_engine().await;
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let concept = format!("topic {}", i % 5);
            engine
                .record_event("alice", &concept, EventKind::RecallFail, None)
                .await?;
            let result = engine
                .classify("alice", &[concept.as_str(), "something else"])
                .await;
            result
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.len(), 2);
    }

    assert_eq!(engine.events().count(Some("alice")).await.unwrap(), 16);
    assert_eq!(engine.registry().len().await.unwrap(), 5);
    assert_eq!(engine.registry().index().len(), 5);
}
