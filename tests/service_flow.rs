//! Service-level flows: input validation, single-flight builds, grounded
//! answers, cancellation.

mod common;

use std::sync::Arc;

use ragweave::providers::{EmbeddingProvider, StubEmbedder, StubGenerator};
use ragweave::{CancelToken, RagError, RagService};

use common::*;

#[tokio::test]
async fn blank_query_is_rejected_before_any_index_or_provider_work() {
    let corpus = Arc::new(CountingCorpus::new(alpha_beta_corpus()));
    let embedder = Arc::new(FlakyEmbedder::reliable(64));
    let config = test_config(64);
    let service = RagService::new(
        &config,
        corpus.clone(),
        embedder.clone(),
        Arc::new(StubGenerator::new()),
    );
    let cancel = CancelToken::new();

    for query in ["", "   ", "\t\n"] {
        let err = service.search(query, 3, &cancel).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyQuery));
        assert!(err.is_client_error());
    }
    assert_eq!(corpus.enumerations(), 0);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn blank_query_is_rejected_for_generation_too() {
    let config = test_config(64);
    let service = RagService::new(
        &config,
        Arc::new(alpha_beta_corpus()),
        Arc::new(StubEmbedder::new(64)),
        Arc::new(StubGenerator::new()),
    );
    let cancel = CancelToken::new();

    let err = service.generate_answer("  ", &[], &cancel).await.unwrap_err();
    assert!(matches!(err, RagError::EmptyQuery));
}

#[tokio::test]
async fn generated_answer_is_grounded_in_the_retrieved_documents() {
    init_tracing();
    let config = test_config(384);
    let service = RagService::new(
        &config,
        Arc::new(alpha_beta_corpus()),
        Arc::new(StubEmbedder::new(384)),
        Arc::new(StubGenerator::new()),
    );
    let cancel = CancelToken::new();

    let documents = service.search("quick fox", 1, &cancel).await.unwrap();
    let answer = service
        .generate_answer("quick fox", &documents, &cancel)
        .await
        .unwrap();
    assert!(answer.contains("quick fox"));
    assert!(answer.contains("alpha.txt"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_searches_trigger_exactly_one_build() {
    init_tracing();
    let corpus = Arc::new(CountingCorpus::new(
        ragweave::MemoryCorpus::default()
            .with_document("a.txt", "alpha text")
            .with_document("b.txt", "beta text")
            .with_document("c.txt", "gamma text"),
    ));
    let embedder = Arc::new(FlakyEmbedder::reliable(128));
    let config = test_config(128);
    let service = Arc::new(RagService::new(
        &config,
        corpus.clone(),
        embedder.clone(),
        Arc::new(StubGenerator::new()),
    ));

    let query_vector = StubEmbedder::new(128).embed("alpha").await.unwrap();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let query_vector = query_vector.clone();
        handles.push(tokio::spawn(async move {
            let cancel = CancelToken::new();
            service.search_by_vector(&query_vector, 2, &cancel).await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    // One enumeration, one embedding per document, identical results.
    assert_eq!(corpus.enumerations(), 1);
    assert_eq!(embedder.calls(), 3);
    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }
}

#[tokio::test]
async fn pre_cancelled_token_fails_fast() {
    let corpus = Arc::new(CountingCorpus::new(alpha_beta_corpus()));
    let embedder = Arc::new(FlakyEmbedder::reliable(64));
    let config = test_config(64);
    let service = RagService::new(
        &config,
        corpus.clone(),
        embedder.clone(),
        Arc::new(StubGenerator::new()),
    );

    let cancel = CancelToken::new();
    cancel.cancel();

    let err = service.search("quick", 2, &cancel).await.unwrap_err();
    assert!(matches!(err, RagError::Cancelled));
    assert_eq!(embedder.calls(), 0);
}
