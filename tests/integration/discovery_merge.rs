use bmad_catalog::config::DiscoveryMode;
use bmad_catalog::manifest::Keyed;
use bmad_catalog::SourceKind;

use crate::support::{agent, standard_project, workflow, Fixture};

#[tokio::test]
async fn auto_mode_orders_remote_before_project_and_skips_empty_user_root() {
    let mut fixture = Fixture::new();
    standard_project(&fixture);
    fixture.remote("tea/agents/murat.md", &agent("Murat", "Test Architect", &[]));

    let catalog = fixture.catalog();
    let sources = catalog.sources().await.unwrap();

    let kinds: Vec<SourceKind> = sources.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![SourceKind::Remote, SourceKind::Project]);
    assert_eq!(sources[0].priority, 1);
    assert_eq!(sources[1].priority, 2);
    assert!(sources[1].root.ends_with("bmad"));
}

#[tokio::test]
async fn unreachable_remote_is_skipped_in_auto_mode() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let mut config = fixture.config();
    config.discovery.remotes = vec!["https://example.com/missing.git".to_string()];

    let catalog = bmad_catalog::Catalog::builder(config)
        .clock(fixture.clock.clone())
        .git_resolver(std::sync::Arc::new(crate::support::LocalRemotes::empty()))
        .build()
        .unwrap();
    let sources = catalog.sources().await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].kind, SourceKind::Project);
}

#[tokio::test]
async fn higher_priority_source_wins_merge() {
    let mut fixture = Fixture::new();
    standard_project(&fixture);
    fixture.remote(
        "bmm/agents/architect.md",
        &agent("Remote Winston", "Remote Architect", &[]),
    );

    let catalog = fixture.catalog();
    let agents = catalog.list_agents().await.unwrap();

    let architects: Vec<_> = agents
        .iter()
        .filter(|a| a.key().to_string() == "bmm:architect")
        .collect();
    assert_eq!(architects.len(), 1);
    assert_eq!(architects[0].title, "Remote Architect");
    assert_eq!(architects[0].source_kind, SourceKind::Remote);
    assert_eq!(architects[0].priority, 1);

    // Records only the project has still come through.
    assert!(agents.iter().any(|a| a.key().to_string() == "bmm:pm"));
}

#[tokio::test]
async fn local_mode_ignores_remotes() {
    let mut fixture = Fixture::new();
    standard_project(&fixture);
    fixture.remote("tea/agents/murat.md", &agent("Murat", "Test Architect", &[]));
    fixture.mode = DiscoveryMode::Local;

    let catalog = fixture.catalog();
    let agents = catalog.list_agents().await.unwrap();
    assert!(agents.iter().all(|a| a.source_kind == SourceKind::Project));
    assert!(!agents.iter().any(|a| a.module == "tea"));
}

#[tokio::test]
async fn flat_project_root_is_presented_as_core() {
    let fixture = Fixture::new();
    fixture
        .project("agents/helper.md", &agent("Helper", "Helper", &[]))
        .project(
            "workflows/tidy/workflow.yaml",
            &workflow("tidy", "Tidy up", true),
        );

    let catalog = fixture.catalog();
    let agents = catalog.list_agents().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].key().to_string(), "core:helper");

    let workflows = catalog.list_workflows().await.unwrap();
    assert_eq!(workflows[0].key().to_string(), "core:tidy");
    assert_eq!(workflows[0].path, "workflows/tidy/workflow.yaml");
}

#[tokio::test]
async fn resolve_path_classifies_root_and_module() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let module = catalog.resolve_path(&fixture.project_root().join("bmm"));
    assert_eq!(module.bmad_root, fixture.project_root());
    assert_eq!(module.module.as_deref(), Some("bmm"));

    let root = catalog.resolve_path(&fixture.project_dir());
    assert_eq!(root.bmad_root, fixture.project_root());
    assert_eq!(root.module, None);
}

#[tokio::test]
async fn file_listing_dedups_by_relative_path() {
    let mut fixture = Fixture::new();
    standard_project(&fixture);
    fixture.remote(
        "bmm/workflows/quick-spec/workflow.yaml",
        &workflow("quick-spec", "Remote spec", true),
    );

    let catalog = fixture.catalog();
    let files = catalog.aggregator().list_all_files().await.unwrap();
    let quick: Vec<_> = files
        .iter()
        .filter(|f| f.relative_path == "bmm/workflows/quick-spec/workflow.yaml")
        .collect();
    assert_eq!(quick.len(), 1);
    assert_eq!(quick[0].source_kind, SourceKind::Remote);

    let loaded = catalog.load_workflow("brainstorm-project", Some("bmm")).await.unwrap();
    assert!(loaded.content.contains("brainstorm-project"));
    assert!(loaded.instructions.unwrap().contains("Converge"));

    assert!(catalog.load_file("../etc/passwd").await.is_err());
}
