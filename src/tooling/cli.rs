//! CLI Tooling
//!
//! Command-line interface over the catalog: listing merged records, resolving
//! agents and workflows, and managing the manifest cache.

use crate::config::{CatalogConfig, ConfigLoader, DiscoveryMode};
use crate::error::CatalogError;
use crate::manifest::{AgentRecord, Sourced, WorkflowRecord};
use crate::resolve::{AmbiguousResult, Catalog, Resolution, WorkflowExecution, WorkflowQuery};
use crate::types::Source;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// BMAD catalog - discover, rank and resolve agents and workflows
#[derive(Parser)]
#[command(name = "bmad-catalog")]
#[command(about = "Multi-source discovery and resolution of BMAD agents and workflows")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root directory
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Discovery mode (strict, local, user, auto, first)
    #[arg(long)]
    pub mode: Option<DiscoveryMode>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the sources taking part in lookups
    Sources,
    /// List merged agents
    Agents,
    /// List merged workflows
    Workflows,
    /// List merged tools
    Tools,
    /// List merged tasks
    Tasks,
    /// List content files across sources
    Files,
    /// Classify a directory as a root and module
    Path {
        dir: PathBuf,
    },
    /// Resolve an agent by name
    Agent {
        name: String,
        #[arg(long)]
        module: Option<String>,
        /// Free-text hint for ranking ambiguous matches
        #[arg(long)]
        query: Option<String>,
    },
    /// Resolve a workflow by name
    Workflow {
        name: String,
        #[arg(long)]
        module: Option<String>,
        /// Owning agent (`module:name`), when retrying an ambiguous result
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },
    /// Manifest cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Drop cached snapshots and source lists
    Clear {
        /// Also delete the on-disk manifest tables
        #[arg(long)]
        disk: bool,
    },
    /// Write the merged tables to the visible cache directory
    Export,
}

impl Cli {
    /// Configuration for this invocation, with command-line overrides applied.
    pub fn load_config(&self) -> Result<CatalogConfig, CatalogError> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&self.project)?,
        };
        if config.discovery.project_root.is_none() {
            config.discovery.project_root = Some(self.project.clone());
        }
        if let Some(mode) = self.mode {
            config.discovery.mode = mode;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        Ok(config)
    }
}

/// CLI context holding the catalog for one invocation.
pub struct CliContext {
    catalog: Catalog,
    format: OutputFormat,
}

impl CliContext {
    pub fn new(config: CatalogConfig, format: OutputFormat) -> Result<Self, CatalogError> {
        Ok(Self {
            catalog: Catalog::from_config(config)?,
            format,
        })
    }

    pub fn with_catalog(catalog: Catalog, format: OutputFormat) -> Self {
        Self { catalog, format }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute a CLI command and render its output.
    pub async fn execute(&self, command: &Commands) -> Result<String, CatalogError> {
        let started = Instant::now();
        let result = self.execute_inner(command).await;
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, CatalogError> {
        match command {
            Commands::Sources => {
                let sources = self.catalog.sources().await?;
                self.render(&sources, || format_sources_text(&sources))
            }
            Commands::Agents => {
                let agents = self.catalog.list_agents().await?;
                self.render(&agents, || format_agent_list_text(&agents))
            }
            Commands::Workflows => {
                let workflows = self.catalog.list_workflows().await?;
                self.render(&workflows, || format_workflow_list_text(&workflows))
            }
            Commands::Tools => {
                let tools = self.catalog.list_tools().await?;
                self.render(&tools, || {
                    format_rows(
                        &["Key", "Name", "Standalone", "Source"],
                        tools.iter().map(|t| {
                            vec![
                                format!("{}:{}", t.module, t.name),
                                t.display_name.clone(),
                                t.standalone.to_string(),
                                t.source_kind.to_string(),
                            ]
                        }),
                        "tool",
                    )
                })
            }
            Commands::Tasks => {
                let tasks = self.catalog.list_tasks().await?;
                self.render(&tasks, || {
                    format_rows(
                        &["Key", "Name", "Standalone", "Source"],
                        tasks.iter().map(|t| {
                            vec![
                                format!("{}:{}", t.module, t.name),
                                t.display_name.clone(),
                                t.standalone.to_string(),
                                t.source_kind.to_string(),
                            ]
                        }),
                        "task",
                    )
                })
            }
            Commands::Files => {
                let files = self.catalog.aggregator().list_all_files().await?;
                self.render(&files, || {
                    format_rows(
                        &["Path", "Source", "Priority"],
                        files.iter().map(|f| {
                            vec![
                                f.relative_path.clone(),
                                f.source_kind.to_string(),
                                f.priority.to_string(),
                            ]
                        }),
                        "file",
                    )
                })
            }
            Commands::Path { dir } => {
                let resolution = self.catalog.resolve_path(dir);
                self.render(&resolution, || {
                    format!(
                        "Root:   {}\nModule: {}",
                        resolution.bmad_root.display(),
                        resolution.module.as_deref().unwrap_or("-")
                    )
                })
            }
            Commands::Agent {
                name,
                module,
                query,
            } => {
                let resolution = self
                    .catalog
                    .resolve_agent(name, module.as_deref(), query.as_deref())
                    .await?;
                self.render(&resolution, || match &resolution {
                    Resolution::Found(agent) => format_agent_text(agent),
                    Resolution::Ambiguous(ambiguous) => format_ambiguous_text("agent", ambiguous),
                })
            }
            Commands::Workflow {
                name,
                module,
                agent,
                query,
            } => {
                let query = WorkflowQuery {
                    module: module.as_deref(),
                    agent: agent.as_deref(),
                    text: query.as_deref(),
                };
                let resolution = self.catalog.resolve_workflow(name, query).await?;
                self.render(&resolution, || match &resolution {
                    Resolution::Found(execution) => format_execution_text(execution),
                    Resolution::Ambiguous(ambiguous) => {
                        format_ambiguous_text("workflow", ambiguous)
                    }
                })
            }
            Commands::Cache { command } => self.handle_cache_command(command).await,
        }
    }

    async fn handle_cache_command(&self, command: &CacheCommands) -> Result<String, CatalogError> {
        match command {
            CacheCommands::Clear { disk } => {
                self.catalog.cache().clear(*disk).await?;
                let message = if *disk {
                    "Cleared in-memory and on-disk manifest cache."
                } else {
                    "Cleared in-memory manifest cache."
                };
                self.render(&json!({ "cleared": true, "disk": disk }), || {
                    message.to_string()
                })
            }
            CacheCommands::Export => {
                let dir = self.catalog.cache().export_visible().await?;
                self.render(&json!({ "exported": dir }), || {
                    format!("Exported merged tables to {}", dir.display())
                })
            }
        }
    }

    fn render<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce() -> String,
    ) -> Result<String, CatalogError> {
        match self.format {
            OutputFormat::Text => Ok(text()),
            OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| {
                CatalogError::ConfigError(format!("Failed to serialize output: {}", e))
            }),
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Sources => "sources",
        Commands::Agents => "agents",
        Commands::Workflows => "workflows",
        Commands::Tools => "tools",
        Commands::Tasks => "tasks",
        Commands::Files => "files",
        Commands::Path { .. } => "path",
        Commands::Agent { .. } => "agent",
        Commands::Workflow { .. } => "workflow",
        Commands::Cache {
            command: CacheCommands::Clear { .. },
        } => "cache.clear",
        Commands::Cache {
            command: CacheCommands::Export,
        } => "cache.export",
    }
}

fn format_rows(
    header: &[&str],
    rows: impl Iterator<Item = Vec<String>>,
    noun: &str,
) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(header.to_vec());
    let mut count = 0;
    for row in rows {
        table.add_row(row);
        count += 1;
    }
    if count == 0 {
        return format!("No {}s found.", noun);
    }
    format!("{}\n\nTotal: {} {}(s)", table, count, noun)
}

fn format_sources_text(sources: &[Source]) -> String {
    format_rows(
        &["Priority", "Kind", "Root"],
        sources.iter().map(|s| {
            vec![
                s.priority.to_string(),
                s.kind.to_string(),
                display_path(&s.root),
            ]
        }),
        "source",
    )
}

fn format_agent_list_text(agents: &[Sourced<AgentRecord>]) -> String {
    format_rows(
        &["Key", "Name", "Title", "Source"],
        agents.iter().map(|a| {
            vec![
                format!("{}:{}", a.module, a.name),
                format!("{} {}", a.icon, a.display_name).trim().to_string(),
                a.title.clone(),
                a.source_kind.to_string(),
            ]
        }),
        "agent",
    )
}

fn format_workflow_list_text(workflows: &[Sourced<WorkflowRecord>]) -> String {
    format_rows(
        &["Key", "Standalone", "Description", "Source"],
        workflows.iter().map(|w| {
            vec![
                format!("{}:{}", w.module, w.name),
                w.standalone.to_string(),
                w.description.clone(),
                w.source_kind.to_string(),
            ]
        }),
        "workflow",
    )
}

fn format_agent_text(agent: &Sourced<AgentRecord>) -> String {
    let mut out = format!(
        "{} {} ({}:{})\n",
        agent.icon, agent.display_name, agent.module, agent.name
    );
    if !agent.title.is_empty() {
        out.push_str(&format!("  Title:  {}\n", agent.title));
    }
    if !agent.role.is_empty() {
        out.push_str(&format!("  Role:   {}\n", agent.role));
    }
    out.push_str(&format!("  Path:   {}\n", agent.path));
    out.push_str(&format!(
        "  Source: {} ({})\n",
        agent.source_kind,
        display_path(&agent.source_root)
    ));
    if !agent.menu.is_empty() {
        out.push_str("  Menu:\n");
        for item in &agent.menu {
            out.push_str(&format!("    *{:<16} {}\n", item.cmd, item.label));
        }
    }
    out
}

fn format_execution_text(execution: &WorkflowExecution) -> String {
    let mut out = format!("Workflow {} ({:?})\n", execution.key, execution.tier);
    out.push_str(&format!("  Path:  {}\n", execution.path));
    match &execution.agent {
        Some(agent) => out.push_str(&format!(
            "  Agent: {}:{} ({})\n",
            agent.module, agent.name, agent.display_name
        )),
        None => out.push_str("  Agent: none (standalone)\n"),
    }
    out
}

fn format_ambiguous_text(noun: &str, ambiguous: &AmbiguousResult) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Candidate", "Score", "Source", "Retry with"]);
    for (i, candidate) in ambiguous.candidates.iter().enumerate() {
        let retry = &candidate.retry;
        let mut hint = format!("--module {}", retry.module);
        if let Some(agent) = &retry.agent {
            hint.push_str(&format!(" --agent {}", agent));
        }
        table.add_row(vec![
            (i + 1).to_string(),
            format!("{} ({})", candidate.key, candidate.display_name),
            format!("{:.3}", candidate.score),
            candidate.source_kind.to_string(),
            hint,
        ]);
    }
    format!("Several {}s match '{}':\n{}", noun, ambiguous.name, table)
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
