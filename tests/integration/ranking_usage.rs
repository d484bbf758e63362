use async_trait::async_trait;
use bmad_catalog::ranking::{RerankContext, Reranker};
use bmad_catalog::{CatalogError, CompositeKey, Resolution};
use chrono::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::support::{agent, standard_project, Fixture};

fn candidate_keys(resolution: Resolution<impl Sized>) -> Vec<String> {
    match resolution {
        Resolution::Ambiguous(ambiguous) => ambiguous
            .candidates
            .iter()
            .map(|c| c.key.to_string())
            .collect(),
        Resolution::Found(_) => panic!("expected an ambiguous result"),
    }
}

#[tokio::test]
async fn used_agent_ranks_above_unused_sibling() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    // Manifest order alone puts bmm first.
    let cold = candidate_keys(catalog.resolve_agent("debug", None, None).await.unwrap());
    assert_eq!(cold, vec!["bmm:debug", "core:debug"]);

    let core_debug = CompositeKey::parse("core:debug");
    for _ in 0..3 {
        catalog.record_usage(&core_debug);
    }
    fixture.clock.advance(Duration::seconds(30));

    let warm = candidate_keys(catalog.resolve_agent("debug", None, None).await.unwrap());
    assert_eq!(warm, vec!["core:debug", "bmm:debug"]);
}

#[tokio::test]
async fn ranking_is_stable_for_tied_scores() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let first = candidate_keys(catalog.resolve_agent("debug", None, None).await.unwrap());
    let second = candidate_keys(catalog.resolve_agent("debug", None, None).await.unwrap());
    assert_eq!(first, second);
}

/// Replies with a fixed order and counts calls.
struct ScriptedReranker {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

#[async_trait]
impl Reranker for ScriptedReranker {
    fn available(&self) -> bool {
        true
    }

    async fn rerank(&self, context: &RerankContext) -> Result<String, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(context.prompt().contains(&context.query));
        self.reply.clone().map_err(CatalogError::RerankFailed)
    }
}

fn three_debuggers(fixture: &Fixture) {
    standard_project(fixture);
    fixture.project("tea/agents/debug.md", &agent("Tea Debug", "Test Debugger", &[]));
}

#[tokio::test]
async fn reranker_orders_candidates_when_query_given() {
    let fixture = Fixture::new();
    three_debuggers(&fixture);
    let reranker = Arc::new(ScriptedReranker {
        reply: Ok("tea:debug, core:debug".to_string()),
        calls: AtomicUsize::new(0),
    });
    let catalog = fixture.builder().reranker(reranker.clone()).build().unwrap();

    let ranked = candidate_keys(
        catalog
            .resolve_agent("debug", None, Some("flaky test suite"))
            .await
            .unwrap(),
    );
    assert_eq!(ranked, vec!["tea:debug", "core:debug", "bmm:debug"]);
    assert_eq!(reranker.calls.load(Ordering::SeqCst), 1);

    // No query, no rerank.
    catalog.resolve_agent("debug", None, None).await.unwrap();
    assert_eq!(reranker.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_rerank_falls_back_to_usage_order() {
    let fixture = Fixture::new();
    three_debuggers(&fixture);
    let reranker = Arc::new(ScriptedReranker {
        reply: Err("provider down".to_string()),
        calls: AtomicUsize::new(0),
    });
    let catalog = fixture.builder().reranker(reranker.clone()).build().unwrap();

    let ranked = candidate_keys(
        catalog
            .resolve_agent("debug", None, Some("anything"))
            .await
            .unwrap(),
    );
    assert_eq!(ranked, vec!["bmm:debug", "core:debug", "tea:debug"]);
    assert_eq!(reranker.calls.load(Ordering::SeqCst), 1);
}
