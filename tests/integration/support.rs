//! Fixture roots and a catalog wired to them.

use async_trait::async_trait;
use bmad_catalog::config::{CacheConfig, CatalogConfig, DiscoveryConfig, DiscoveryMode};
use bmad_catalog::source::GitResolver;
use bmad_catalog::{Catalog, CatalogError, ManualClock};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const REMOTE_URL: &str = "https://example.com/bmad-remote.git";

/// Serves remote URLs from local directories; anything else is unreachable.
pub struct LocalRemotes {
    checkouts: HashMap<String, PathBuf>,
}

impl LocalRemotes {
    pub fn empty() -> Self {
        Self {
            checkouts: HashMap::new(),
        }
    }
}

#[async_trait]
impl GitResolver for LocalRemotes {
    async fn resolve(&self, url: &str) -> Result<PathBuf, CatalogError> {
        self.checkouts
            .get(url)
            .cloned()
            .ok_or_else(|| CatalogError::SourceUnreachable {
                url: url.to_string(),
                message: "no such remote".to_string(),
            })
    }
}

pub struct Fixture {
    pub temp: TempDir,
    pub clock: Arc<ManualClock>,
    pub mode: DiscoveryMode,
    with_remote: bool,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("project")).unwrap();
        fs::create_dir_all(temp.path().join("home")).unwrap();
        Self {
            temp,
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            )),
            mode: DiscoveryMode::Auto,
            with_remote: false,
        }
    }

    pub fn project_dir(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    /// Content root inside the project (`project/bmad`).
    pub fn project_root(&self) -> PathBuf {
        self.project_dir().join("bmad")
    }

    pub fn remote_dir(&self) -> PathBuf {
        self.temp.path().join("remote")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    pub fn project(&self, rel: &str, content: &str) -> &Self {
        write(&self.project_root(), rel, content);
        self
    }

    pub fn remote(&mut self, rel: &str, content: &str) -> &mut Self {
        write(&self.remote_dir(), rel, content);
        self.with_remote = true;
        self
    }

    pub fn config(&self) -> CatalogConfig {
        CatalogConfig {
            discovery: DiscoveryConfig {
                mode: self.mode,
                project_root: Some(self.project_dir()),
                user_root: Some(self.temp.path().join("home")),
                remotes: if self.with_remote {
                    vec![REMOTE_URL.to_string()]
                } else {
                    Vec::new()
                },
            },
            cache: CacheConfig {
                ttl_secs: 300,
                base_dir: Some(self.cache_dir()),
            },
            ..Default::default()
        }
    }

    pub fn builder(&self) -> bmad_catalog::CatalogBuilder {
        let mut checkouts = HashMap::new();
        checkouts.insert(REMOTE_URL.to_string(), self.remote_dir());
        Catalog::builder(self.config())
            .clock(self.clock.clone())
            .git_resolver(Arc::new(LocalRemotes { checkouts }))
    }

    pub fn catalog(&self) -> Catalog {
        self.builder().build().unwrap()
    }
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn agent(display: &str, title: &str, menu: &[(&str, &str, &str)]) -> String {
    let items: String = menu
        .iter()
        .map(|(cmd, attr, target)| {
            format!(
                "    <item cmd=\"*{}\" {}=\"{}\">{}</item>\n",
                cmd, attr, target, cmd
            )
        })
        .collect();
    format!(
        "<agent name=\"{}\" title=\"{}\" icon=\"🤖\">\n  <persona>\n    <role>{}</role>\n    <identity>Test agent</identity>\n    <communication_style>Plain</communication_style>\n    <principles>Be exact</principles>\n  </persona>\n  <menu>\n    <item cmd=\"*help\">Show menu</item>\n{}  </menu>\n</agent>\n",
        display, title, title, items
    )
}

pub fn workflow(name: &str, description: &str, standalone: bool) -> String {
    format!(
        "name: {}\ndescription: {}\nstandalone: {}\n",
        name, description, standalone
    )
}

/// Two modules (`core`, `bmm`) with agents and workflows across all tiers.
pub fn standard_project(fixture: &Fixture) {
    fixture
        .project("core/agents/debug.md", &agent("Core Debug", "Core Debugger", &[]))
        .project("bmm/agents/debug.md", &agent("Bmm Debug", "BMM Debugger", &[]))
        .project(
            "bmm/agents/analyst.md",
            &agent(
                "Mary",
                "Business Analyst",
                &[
                    (
                        "brainstorm-project",
                        "workflow",
                        "{project-root}/bmad/bmm/workflows/brainstorm-project/workflow.yaml",
                    ),
                    (
                        "party-mode",
                        "exec",
                        "{project-root}/bmad/core/workflows/party-mode/workflow.yaml",
                    ),
                    (
                        "ghost",
                        "workflow",
                        "{project-root}/bmad/bmm/workflows/ghost-flow/workflow.yaml",
                    ),
                ],
            ),
        )
        .project(
            "bmm/agents/pm.md",
            &agent(
                "John",
                "Product Manager",
                &[(
                    "party-mode",
                    "exec",
                    "{project-root}/bmad/core/workflows/party-mode/workflow.yaml",
                )],
            ),
        )
        .project("bmm/agents/architect.md", &agent("Winston", "Architect", &[]))
        .project(
            "core/workflows/party-mode/workflow.yaml",
            &workflow("party-mode", "Group discussion", false),
        )
        .project(
            "bmm/workflows/brainstorm-project/workflow.yaml",
            &workflow("brainstorm-project", "Guided brainstorming", false),
        )
        .project(
            "bmm/workflows/brainstorm-project/instructions.md",
            "# Steps\n1. Diverge\n2. Converge\n",
        )
        .project(
            "bmm/workflows/quick-spec/workflow.yaml",
            &workflow("quick-spec", "Lightweight spec", true),
        )
        .project(
            "bmm/workflows/orphan/workflow.yaml",
            &workflow("orphan", "Nobody runs this", false),
        );
}
