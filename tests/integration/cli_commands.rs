use bmad_catalog::manifest::cache::{MANIFESTS_DIR, VISIBLE_DIR};
use bmad_catalog::manifest::table::AGENT_TABLE;
use bmad_catalog::tooling::cli::{CacheCommands, CliContext, Commands, OutputFormat};
use serde_json::Value;
use std::path::PathBuf;

use crate::support::{standard_project, Fixture};

fn context(fixture: &Fixture, format: OutputFormat) -> CliContext {
    CliContext::with_catalog(fixture.catalog(), format)
}

#[tokio::test]
async fn agents_command_lists_merged_agents_as_json() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let cli = context(&fixture, OutputFormat::Json);

    let output = cli.execute(&Commands::Agents).await.unwrap();
    let agents: Value = serde_json::from_str(&output).unwrap();
    let names: Vec<&str> = agents
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"analyst"));
    assert_eq!(agents[0]["sourceKind"], "project");
}

#[tokio::test]
async fn ambiguous_agent_renders_retry_hints() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let cli = context(&fixture, OutputFormat::Text);

    let output = cli
        .execute(&Commands::Agent {
            name: "debug".to_string(),
            module: None,
            query: None,
        })
        .await
        .unwrap();
    assert!(output.contains("Several agents match 'debug'"));
    assert!(output.contains("--module core"));
    assert!(output.contains("--module bmm"));
}

#[tokio::test]
async fn workflow_command_reports_status_in_json() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let cli = context(&fixture, OutputFormat::Json);

    let output = cli
        .execute(&Commands::Workflow {
            name: "quick-spec".to_string(),
            module: None,
            agent: None,
            query: None,
        })
        .await
        .unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["status"], "found");
    assert_eq!(value["tier"], "standalone");
}

#[tokio::test]
async fn cache_export_then_clear_disk() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let cli = context(&fixture, OutputFormat::Text);

    let output = cli
        .execute(&Commands::Cache {
            command: CacheCommands::Export,
        })
        .await
        .unwrap();
    let visible = fixture.cache_dir().join(VISIBLE_DIR);
    assert!(output.contains(&visible.display().to_string()));
    let table = std::fs::read_to_string(visible.join(AGENT_TABLE)).unwrap();
    assert!(table.contains("analyst"));
    assert!(fixture.cache_dir().join(MANIFESTS_DIR).is_dir());

    cli.execute(&Commands::Cache {
        command: CacheCommands::Clear { disk: true },
    })
    .await
    .unwrap();
    assert!(!fixture.cache_dir().join(MANIFESTS_DIR).exists());
    assert!(!visible.exists());

    // Everything rebuilds on the next lookup.
    let agents = cli.catalog().list_agents().await.unwrap();
    assert!(!agents.is_empty());
}

#[tokio::test]
async fn path_command_prints_root_and_module() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let cli = context(&fixture, OutputFormat::Text);

    let dir: PathBuf = fixture.project_root().join("bmm");
    let output = cli.execute(&Commands::Path { dir }).await.unwrap();
    assert!(output.contains("Module: bmm"));
    assert!(output.contains(&fixture.project_root().display().to_string()));
}
