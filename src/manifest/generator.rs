//! Manifest table generation.
//!
//! The cache treats generation as an opaque collaborator: it hands over the
//! effective root, the modules to scan and the file list, and expects the five
//! tables in `out_dir`. `ScanGenerator` is the built-in implementation.

use crate::error::CatalogError;
use crate::hasher::content_hash;
use crate::manifest::markup::{
    parse_agent_markup, parse_command_definition, parse_workflow_definition,
};
use crate::manifest::records::{AgentRecord, CommandRecord, FileEntry, WorkflowRecord};
use crate::manifest::table::{
    write_table, AgentRow, CommandRow, FileRow, WorkflowRow, AGENT_TABLE, FILES_TABLE,
    TASK_TABLE, TOOL_TABLE, WORKFLOW_TABLE,
};
use crate::paths::{is_flat_root, module_dirs};
use crate::types::DEFAULT_MODULE;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// A directory presented to the generator as one named module.
///
/// A flat root (content directories directly under it) is presented as the
/// module `core` at the root itself, so no link on disk is ever needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleView {
    pub name: String,
    pub dir: PathBuf,
}

/// Input to one generation run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub root: PathBuf,
    pub modules: Vec<ModuleView>,
    /// Every file of the source, relative to `root`.
    pub files: Vec<PathBuf>,
}

impl GenerationRequest {
    /// Build a request for `root`, detecting its module views.
    pub fn for_root(root: &Path, files: Vec<PathBuf>) -> Self {
        Self {
            root: root.to_path_buf(),
            modules: module_views(root),
            files,
        }
    }
}

/// Module views of a root: its module directories, or `core` for a flat root.
pub fn module_views(root: &Path) -> Vec<ModuleView> {
    let mut views: Vec<ModuleView> = module_dirs(root)
        .into_iter()
        .map(|(name, dir)| ModuleView { name, dir })
        .collect();
    if views.is_empty() && is_flat_root(root) {
        views.push(ModuleView {
            name: DEFAULT_MODULE.to_string(),
            dir: root.to_path_buf(),
        });
    }
    views
}

/// Writes the five manifest tables for one source.
#[async_trait]
pub trait ManifestGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest, out_dir: &Path)
        -> Result<(), CatalogError>;
}

/// Scans module views for definition files and writes their tables.
#[derive(Debug, Default, Clone)]
pub struct ScanGenerator;

impl ScanGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ManifestGenerator for ScanGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        out_dir: &Path,
    ) -> Result<(), CatalogError> {
        let request = request.clone();
        let out_dir = out_dir.to_path_buf();
        let root = request.root.clone();
        tokio::task::spawn_blocking(move || scan_and_write(&request, &out_dir))
            .await
            .map_err(|e| CatalogError::GenerationFailed {
                root,
                message: format!("generator task failed: {}", e),
            })?
    }
}

fn scan_and_write(request: &GenerationRequest, out_dir: &Path) -> Result<(), CatalogError> {
    let mut agents = Vec::new();
    let mut workflows = Vec::new();
    let mut tools = Vec::new();
    let mut tasks = Vec::new();

    for view in &request.modules {
        agents.extend(scan_agents(&request.root, view));
        workflows.extend(scan_workflows(&request.root, view));
        tools.extend(scan_commands(&request.root, view, "tools"));
        tasks.extend(scan_commands(&request.root, view, "tasks"));
    }
    let files = file_entries(request);

    debug!(
        root = %request.root.display(),
        agents = agents.len(),
        workflows = workflows.len(),
        tools = tools.len(),
        tasks = tasks.len(),
        files = files.len(),
        "Generated manifest tables"
    );

    let failed = |e: crate::error::StorageError| CatalogError::GenerationFailed {
        root: request.root.clone(),
        message: e.to_string(),
    };
    write_table::<AgentRow, _>(&out_dir.join(AGENT_TABLE), &agents).map_err(failed)?;
    write_table::<WorkflowRow, _>(&out_dir.join(WORKFLOW_TABLE), &workflows).map_err(failed)?;
    write_table::<CommandRow, _>(&out_dir.join(TOOL_TABLE), &tools).map_err(failed)?;
    write_table::<CommandRow, _>(&out_dir.join(TASK_TABLE), &tasks).map_err(failed)?;
    write_table::<FileRow, _>(&out_dir.join(FILES_TABLE), &files).map_err(failed)?;
    Ok(())
}

/// Files directly under `dir` with one of `extensions`, sorted by name.
fn files_with_extension(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.contains(&ext))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn read_definition(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!(path = %path.display(), "Skipping unreadable definition: {}", e);
            None
        }
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `path` relative to `root`, always with `/` separators.
pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn scan_agents(root: &Path, view: &ModuleView) -> Vec<AgentRecord> {
    files_with_extension(&view.dir.join("agents"), &["md"])
        .into_iter()
        .filter_map(|path| {
            let content = read_definition(&path)?;
            let parsed = parse_agent_markup(&content);
            for warning in &parsed.warnings {
                debug!(path = %path.display(), "Agent markup: {}", warning);
            }
            let markup = parsed.value;
            let name = markup
                .frontmatter
                .name
                .clone()
                .unwrap_or_else(|| stem(&path));
            let persona = markup.persona.unwrap_or_default();
            Some(AgentRecord {
                display_name: markup.name.unwrap_or_else(|| name.clone()),
                title: markup
                    .title
                    .or(markup.frontmatter.title)
                    .or(markup.frontmatter.description)
                    .unwrap_or_default(),
                icon: markup.icon.or(markup.frontmatter.icon).unwrap_or_default(),
                role: persona.role,
                identity: persona.identity,
                communication_style: persona.communication_style,
                principles: persona.principles,
                module: view.name.clone(),
                path: relative_path(root, &path),
                name,
                ..Default::default()
            })
        })
        .collect()
}

fn scan_workflows(root: &Path, view: &ModuleView) -> Vec<WorkflowRecord> {
    let Ok(entries) = std::fs::read_dir(view.dir.join("workflows")) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|dir| {
            let definition = ["workflow.yaml", "workflow.md"]
                .iter()
                .map(|file| dir.join(file))
                .find(|path| path.is_file())?;
            let content = read_definition(&definition)?;
            let parsed = parse_workflow_definition(&content);
            for warning in &parsed.warnings {
                debug!(path = %definition.display(), "Workflow definition: {}", warning);
            }
            let def = parsed.value;
            Some(WorkflowRecord {
                name: def
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| dir_name(&dir)),
                description: def.description.unwrap_or_default(),
                module: view.name.clone(),
                path: relative_path(root, &definition),
                standalone: def.standalone.unwrap_or(false),
            })
        })
        .collect()
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn scan_commands(root: &Path, view: &ModuleView, kind_dir: &str) -> Vec<CommandRecord> {
    files_with_extension(&view.dir.join(kind_dir), &["md", "xml"])
        .into_iter()
        .filter_map(|path| {
            let content = read_definition(&path)?;
            let parsed = parse_command_definition(&content);
            for warning in &parsed.warnings {
                debug!(path = %path.display(), "Command definition: {}", warning);
            }
            let def = parsed.value;
            let name = def.name.unwrap_or_else(|| stem(&path));
            Some(CommandRecord {
                display_name: def.display_name.unwrap_or_else(|| name.clone()),
                description: def.description.unwrap_or_default(),
                module: view.name.clone(),
                path: relative_path(root, &path),
                standalone: def.standalone,
                name,
            })
        })
        .collect()
}

fn file_entries(request: &GenerationRequest) -> Vec<FileEntry> {
    request
        .files
        .iter()
        .filter_map(|relative| {
            let absolute = request.root.join(relative);
            let bytes = match std::fs::read(&absolute) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(path = %absolute.display(), "Skipping file entry: {}", e);
                    return None;
                }
            };
            Some(FileEntry {
                file_type: relative
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_string())
                    .unwrap_or_default(),
                name: stem(relative),
                module: owning_module(&request.modules, &absolute),
                relative_path: relative_path(&request.root, &absolute),
                content_hash: content_hash(&bytes),
            })
        })
        .collect()
}

/// Module whose view contains `path`; the most specific view wins.
fn owning_module(views: &[ModuleView], path: &Path) -> String {
    views
        .iter()
        .filter(|view| path.starts_with(&view.dir))
        .max_by_key(|view| view.dir.components().count())
        .map(|view| view.name.clone())
        .unwrap_or_else(|| DEFAULT_MODULE.to_string())
}
