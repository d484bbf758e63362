use bmad_catalog::manifest::Keyed;
use bmad_catalog::{CatalogError, RecordKind, Resolution};
use std::collections::HashSet;

use crate::support::{standard_project, Fixture};

#[tokio::test]
async fn unique_agent_resolves_and_records_usage() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let agent = catalog
        .resolve_agent("analyst", None, None)
        .await
        .unwrap()
        .found()
        .expect("analyst is unique");
    assert_eq!(agent.key().to_string(), "bmm:analyst");
    assert_eq!(agent.display_name, "Mary");
    assert_eq!(agent.role, "Business Analyst");
    assert!(agent.workflows.contains_key("brainstorm-project"));

    let usage = catalog.ranking().usage().get(&agent.key()).unwrap();
    assert_eq!(usage.count, 1);
}

#[tokio::test]
async fn shared_name_is_ambiguous_with_distinct_retry_modules() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let resolution = catalog.resolve_agent("debug", None, None).await.unwrap();
    let Resolution::Ambiguous(ambiguous) = resolution else {
        panic!("expected an ambiguous result");
    };
    assert_eq!(ambiguous.name, "debug");
    assert_eq!(ambiguous.candidates.len(), 2);

    let modules: HashSet<&str> = ambiguous
        .candidates
        .iter()
        .map(|c| c.retry.module.as_str())
        .collect();
    assert_eq!(modules, HashSet::from(["core", "bmm"]));
    assert!(ambiguous.candidates.iter().all(|c| c.retry.name == "debug"));
    // Nothing was chosen, so nothing was counted.
    assert!(catalog.ranking().usage().recent(10).is_empty());

    for candidate in &ambiguous.candidates {
        let retry = &candidate.retry;
        let agent = catalog
            .resolve_agent(&retry.name, Some(&retry.module), None)
            .await
            .unwrap()
            .found()
            .expect("retry descriptor resolves one agent");
        assert_eq!(agent.key(), candidate.key);
    }
}

#[tokio::test]
async fn star_prefix_and_master_alias_are_accepted() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    fixture.project(
        "core/agents/bmad-master.md",
        &crate::support::agent("BMad Master", "Master Orchestrator", &[]),
    );
    let catalog = fixture.catalog();

    let master = catalog
        .resolve_agent("master", None, None)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(master.key().to_string(), "core:bmad-master");

    let pm = catalog
        .resolve_agent("*pm", Some("bmm"), None)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(pm.name, "pm");
}

#[tokio::test]
async fn unknown_agent_reports_suggestions() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let err = catalog.resolve_agent("analist", None, None).await.unwrap_err();
    match err {
        CatalogError::NotFound {
            kind,
            name,
            suggestions,
        } => {
            assert_eq!(kind, RecordKind::Agent);
            assert_eq!(name, "analist");
            assert!(suggestions.contains(&"analyst".to_string()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn invalid_names_are_rejected_before_lookup() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    for bad in ["a", "Analyst", "pm2", "../pm", "bad--name"] {
        let err = catalog.resolve_agent(bad, None, None).await.unwrap_err();
        assert!(
            matches!(err, CatalogError::InvalidName { .. }),
            "{} should be rejected, got {:?}",
            bad,
            err
        );
    }
}

#[tokio::test]
async fn load_agent_returns_definition_text() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let loaded = catalog.load_agent("pm", Some("bmm")).await.unwrap();
    assert_eq!(loaded.module, "bmm");
    assert!(loaded.content.contains("Product Manager"));

    let err = catalog.load_agent("nobody", None).await.unwrap_err();
    assert!(err.is_not_found());
}
