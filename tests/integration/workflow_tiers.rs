use bmad_catalog::manifest::Keyed;
use bmad_catalog::{CatalogError, Resolution, WorkflowQuery, WorkflowTier};

use crate::support::{agent, standard_project, workflow, Fixture};

fn query<'a>(module: Option<&'a str>, agent: Option<&'a str>) -> WorkflowQuery<'a> {
    WorkflowQuery {
        module,
        agent,
        text: None,
    }
}

#[tokio::test]
async fn standalone_workflow_runs_without_agent() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let execution = catalog
        .resolve_workflow("quick-spec", WorkflowQuery::default())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(execution.tier, WorkflowTier::Standalone);
    assert_eq!(execution.key.to_string(), "bmm:quick-spec");
    assert_eq!(execution.path, "bmm/workflows/quick-spec/workflow.yaml");
    assert!(execution.agent.is_none());
    assert_eq!(
        catalog.ranking().usage().get(&execution.key).unwrap().count,
        1
    );
}

#[tokio::test]
async fn menu_owned_workflow_runs_through_its_agent() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let execution = catalog
        .resolve_workflow("brainstorm-project", WorkflowQuery::default())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(execution.tier, WorkflowTier::AgentMenu);
    assert_eq!(execution.agent.unwrap().key().to_string(), "bmm:analyst");
    assert_eq!(execution.workflow.unwrap().description, "Guided brainstorming");

    let usage = catalog.ranking().usage();
    assert_eq!(usage.get(&execution.key).unwrap().count, 1);
    assert_eq!(usage.get_module("bmm").unwrap().count, 1);
}

#[tokio::test]
async fn workflow_shared_by_agents_is_ambiguous_until_agent_given() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let resolution = catalog
        .resolve_workflow("party-mode", WorkflowQuery::default())
        .await
        .unwrap();
    let Resolution::Ambiguous(ambiguous) = resolution else {
        panic!("party-mode is on two agent menus");
    };
    let mut owners: Vec<String> = ambiguous
        .candidates
        .iter()
        .map(|c| c.retry.agent.clone().unwrap())
        .collect();
    owners.sort();
    assert_eq!(owners, vec!["bmm:analyst".to_string(), "bmm:pm".to_string()]);
    assert!(ambiguous.candidates.iter().all(|c| c.retry.module == "core"));

    let retry = &ambiguous.candidates[0].retry;
    let execution = catalog
        .resolve_workflow(
            &retry.name,
            query(Some(retry.module.as_str()), retry.agent.as_deref()),
        )
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(execution.tier, WorkflowTier::AgentMenu);
    assert_eq!(
        &execution.agent.unwrap().key().to_string(),
        retry.agent.as_ref().unwrap()
    );
}

#[tokio::test]
async fn same_named_agents_in_two_modules_are_told_apart_on_retry() {
    let fixture = Fixture::new();
    let triage = [(
        "triage",
        "workflow",
        "{project-root}/bmad/bmm/workflows/triage/workflow.yaml",
    )];
    fixture
        .project("core/agents/debug.md", &agent("Core Debug", "Core Debugger", &triage))
        .project("bmm/agents/debug.md", &agent("Bmm Debug", "BMM Debugger", &triage))
        .project(
            "bmm/workflows/triage/workflow.yaml",
            &workflow("triage", "Sort incoming bugs", false),
        );
    let catalog = fixture.catalog();

    let resolution = catalog
        .resolve_workflow("triage", WorkflowQuery::default())
        .await
        .unwrap();
    let Resolution::Ambiguous(ambiguous) = resolution else {
        panic!("triage is on both debug menus");
    };
    assert_eq!(ambiguous.candidates.len(), 2);

    for candidate in &ambiguous.candidates {
        let retry = &candidate.retry;
        let execution = catalog
            .resolve_workflow(
                &retry.name,
                query(Some(retry.module.as_str()), retry.agent.as_deref()),
            )
            .await
            .unwrap()
            .found()
            .expect("retry names one agent");
        assert_eq!(
            Some(execution.agent.unwrap().key().to_string()),
            retry.agent
        );
    }

    // A bare agent name still matches both.
    let bare = catalog
        .resolve_workflow("triage", query(Some("bmm"), Some("debug")))
        .await
        .unwrap();
    assert!(bare.is_ambiguous());
}

#[tokio::test]
async fn menu_reference_into_another_module_does_not_claim_workflow() {
    let mut fixture = Fixture::new();
    fixture
        .project("agents/helper.md", &agent("Helper", "Helper", &[]))
        .project(
            "workflows/research/workflow.yaml",
            &workflow("research", "Flat research", false),
        );
    fixture.remote(
        "bmm/agents/analyst.md",
        &agent(
            "Mary",
            "Business Analyst",
            &[(
                "research",
                "workflow",
                "{project-root}/bmad/bmm/workflows/research/workflow.yaml",
            )],
        ),
    );
    let catalog = fixture.catalog();

    let err = catalog
        .resolve_workflow("research", query(Some("core"), None))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NoOwningAgent { ref workflow } if workflow == "research"));
}

#[tokio::test]
async fn workflow_without_owner_is_an_error() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let err = catalog
        .resolve_workflow("orphan", WorkflowQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NoOwningAgent { ref workflow } if workflow == "orphan"));
}

#[tokio::test]
async fn agent_declared_workflow_is_the_last_resort() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let execution = catalog
        .resolve_workflow("ghost-flow", WorkflowQuery::default())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(execution.tier, WorkflowTier::AgentDeclared);
    assert!(execution.workflow.is_none());
    assert_eq!(execution.agent.unwrap().name, "analyst");
    assert_eq!(
        execution.path,
        "{project-root}/bmad/bmm/workflows/ghost-flow/workflow.yaml"
    );
}

#[tokio::test]
async fn standalone_match_wins_over_agent_owners() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    fixture.project(
        "bmm/agents/sm.md",
        &agent(
            "Bob",
            "Scrum Master",
            &[(
                "quick-spec",
                "workflow",
                "{project-root}/bmad/bmm/workflows/quick-spec/workflow.yaml",
            )],
        ),
    );
    let catalog = fixture.catalog();

    let execution = catalog
        .resolve_workflow("quick-spec", WorkflowQuery::default())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(execution.tier, WorkflowTier::Standalone);
    assert!(execution.agent.is_none());
}

#[tokio::test]
async fn standalone_workflows_in_two_modules_are_ambiguous() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    fixture.project(
        "core/workflows/quick-spec/workflow.yaml",
        &workflow("quick-spec", "Core spec", true),
    );
    let catalog = fixture.catalog();

    let resolution = catalog
        .resolve_workflow("quick-spec", WorkflowQuery::default())
        .await
        .unwrap();
    assert!(resolution.is_ambiguous());

    let execution = catalog
        .resolve_workflow("quick-spec", query(Some("core"), None))
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(execution.key.to_string(), "core:quick-spec");
}

#[tokio::test]
async fn unknown_workflow_suggests_close_names() {
    let fixture = Fixture::new();
    standard_project(&fixture);
    let catalog = fixture.catalog();

    let err = catalog
        .resolve_workflow("party-mod", WorkflowQuery::default())
        .await
        .unwrap_err();
    match err {
        CatalogError::NotFound { suggestions, .. } => {
            assert!(suggestions.contains(&"party-mode".to_string()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
