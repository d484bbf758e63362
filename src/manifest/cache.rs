//! Per-source manifest snapshots with TTL checks in memory and on disk, and
//! the priority merge across sources.
//!
//! Cache layout under the base directory:
//!
//! ```text
//! manifests/<hash(root)>/{agent,workflow,tool,task,files}-manifest.csv
//! manifests/<hash(root)>/.complete      written last; its mtime dates the set
//! visible/                merged tables, written by export_visible
//! git/<hash(url)>/        remote checkouts
//! ```

use crate::clock::Clock;
use crate::error::{CatalogError, StorageError};
use crate::hasher::root_key;
use crate::manifest::generator::{GenerationRequest, ManifestGenerator};
use crate::manifest::markup::parse_agent_markup;
use crate::manifest::merge::{merge_by_priority, tag};
use crate::manifest::records::{
    AgentRecord, FileEntry, Keyed, ManifestSnapshot, Sourced, TaskRecord, ToolRecord,
    WorkflowRecord,
};
use crate::manifest::table::{
    read_table, write_table, AgentRow, CommandRow, FileRow, WorkflowRow, AGENT_TABLE,
    ALL_TABLES, FILES_TABLE, TASK_TABLE, TOOL_TABLE, WORKFLOW_TABLE,
};
use crate::paths::PREBUILT_MANIFEST_DIR;
use crate::source::{walk_source, SourceAggregator};
use crate::types::Source;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MANIFESTS_DIR: &str = "manifests";
pub const VISIBLE_DIR: &str = "visible";
pub const GIT_DIR: &str = "git";
/// Marker written once every table of a build is in place.
pub const BUILD_MARKER: &str = ".complete";

/// Snapshot cache shared by every caller of one catalog.
pub struct ManifestCache {
    aggregator: Arc<SourceAggregator>,
    generator: Arc<dyn ManifestGenerator>,
    clock: Arc<dyn Clock>,
    cache_base: PathBuf,
    ttl: Duration,
    snapshots: Mutex<HashMap<PathBuf, Arc<ManifestSnapshot>>>,
    /// Serializes check-then-generate so one source is never built twice at once.
    generation: tokio::sync::Mutex<()>,
}

impl ManifestCache {
    pub fn new(
        aggregator: Arc<SourceAggregator>,
        generator: Arc<dyn ManifestGenerator>,
        clock: Arc<dyn Clock>,
        cache_base: PathBuf,
        ttl: Duration,
    ) -> Self {
        Self {
            aggregator,
            generator,
            clock,
            cache_base,
            ttl,
            snapshots: Mutex::new(HashMap::new()),
            generation: tokio::sync::Mutex::new(()),
        }
    }

    pub fn aggregator(&self) -> &Arc<SourceAggregator> {
        &self.aggregator
    }

    pub fn cache_base(&self) -> &Path {
        &self.cache_base
    }

    /// Directory holding the generated tables of `root`.
    pub fn cache_dir_for(&self, root: &Path) -> PathBuf {
        self.cache_base.join(MANIFESTS_DIR).join(root_key(root))
    }

    fn fresh_in_memory(&self, root: &Path, now: DateTime<Utc>) -> Option<Arc<ManifestSnapshot>> {
        self.snapshots
            .lock()
            .get(root)
            .filter(|snapshot| snapshot.is_fresh(now, self.ttl))
            .cloned()
    }

    /// When the table set in `dir` was completed; `None` for a partial set.
    fn disk_timestamp(dir: &Path) -> Option<DateTime<Utc>> {
        std::fs::metadata(dir.join(BUILD_MARKER))
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    }

    fn fresh_on_disk(&self, dir: &Path, now: DateTime<Utc>) -> Option<ManifestSnapshot> {
        let stamp = Self::disk_timestamp(dir)?.min(now);
        if now - stamp >= self.ttl {
            return None;
        }
        match load_snapshot(dir, stamp) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(dir = %dir.display(), "Ignoring unreadable cached tables: {}", e);
                None
            }
        }
    }

    fn remember(&self, root: &Path, snapshot: ManifestSnapshot) -> Arc<ManifestSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.snapshots
            .lock()
            .insert(root.to_path_buf(), snapshot.clone());
        snapshot
    }

    /// Snapshot of one source: memory, then disk, then copy or generate.
    ///
    /// A failed build yields an empty snapshot that is not remembered, so the
    /// next access tries again.
    pub async fn snapshot_for(&self, source: &Source) -> Arc<ManifestSnapshot> {
        let now = self.clock.now();
        if let Some(snapshot) = self.fresh_in_memory(&source.root, now) {
            return snapshot;
        }
        let dir = self.cache_dir_for(&source.root);
        if let Some(snapshot) = self.fresh_on_disk(&dir, now) {
            debug!(root = %source.root.display(), "Loaded manifest tables from disk cache");
            return self.remember(&source.root, snapshot);
        }

        let _guard = self.generation.lock().await;
        // Another caller may have finished while we waited.
        let now = self.clock.now();
        if let Some(snapshot) = self.fresh_in_memory(&source.root, now) {
            return snapshot;
        }
        if let Some(snapshot) = self.fresh_on_disk(&dir, now) {
            return self.remember(&source.root, snapshot);
        }

        if let Err(e) = self.build(source, &dir).await {
            warn!(
                root = %source.root.display(),
                "Manifest build failed, source contributes nothing: {}",
                e
            );
            return Arc::new(ManifestSnapshot::empty(now));
        }
        match load_snapshot(&dir, now) {
            Ok(snapshot) => self.remember(&source.root, snapshot),
            Err(e) => {
                warn!(root = %source.root.display(), "Failed to read built tables: {}", e);
                Arc::new(ManifestSnapshot::empty(now))
            }
        }
    }

    /// Build into a sibling staging directory and move it into place only
    /// once complete; a failed build leaves no tables behind.
    async fn build(&self, source: &Source, dir: &Path) -> Result<(), CatalogError> {
        let staging = dir.with_extension("partial");
        if staging.exists() {
            tokio::fs::remove_dir_all(&staging).await?;
        }
        tokio::fs::create_dir_all(&staging).await?;

        if let Err(e) = self.build_into(source, &staging).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                debug!(dir = %staging.display(), "Leaving partial tables: {}", cleanup);
            }
            return Err(e);
        }
        tokio::fs::write(staging.join(BUILD_MARKER), b"").await?;
        if dir.exists() {
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::rename(&staging, dir).await?;
        Ok(())
    }

    async fn build_into(&self, source: &Source, out_dir: &Path) -> Result<(), CatalogError> {
        let prebuilt = source.root.join(PREBUILT_MANIFEST_DIR);
        if ALL_TABLES.iter().any(|table| prebuilt.join(table).is_file()) {
            info!(root = %source.root.display(), "Copying pre-built manifest tables");
            for table in ALL_TABLES {
                let from = prebuilt.join(table);
                if from.is_file() {
                    tokio::fs::copy(&from, out_dir.join(table)).await?;
                }
            }
            return Ok(());
        }

        let root = source.root.clone();
        let files = tokio::task::spawn_blocking(move || walk_source(&root))
            .await
            .map_err(|e| CatalogError::GenerationFailed {
                root: source.root.clone(),
                message: format!("file walk failed: {}", e),
            })?;
        let request = GenerationRequest::for_root(&source.root, files);
        info!(
            root = %source.root.display(),
            modules = request.modules.len(),
            files = request.files.len(),
            "Generating manifest tables"
        );
        self.generator.generate(&request, out_dir).await
    }

    /// Tag and merge one record kind across all sources.
    async fn merged<T, F>(&self, pick: F) -> Result<Vec<Sourced<T>>, CatalogError>
    where
        T: Keyed + Clone,
        F: Fn(&ManifestSnapshot) -> &Vec<T>,
    {
        let sources = self.aggregator.sources().await?;
        let mut all = Vec::new();
        for source in &sources {
            let snapshot = self.snapshot_for(source).await;
            all.extend(tag(pick(snapshot.as_ref()).iter().cloned(), source));
        }
        Ok(merge_by_priority(all))
    }

    /// Merged agents, enriched from their definition files.
    pub async fn get_all_agents(&self) -> Result<Vec<Sourced<AgentRecord>>, CatalogError> {
        let mut agents = self.merged(|s| &s.agents).await?;
        for agent in agents.iter_mut() {
            enrich_agent(agent).await;
        }
        Ok(agents)
    }

    pub async fn get_all_workflows(&self) -> Result<Vec<Sourced<WorkflowRecord>>, CatalogError> {
        self.merged(|s| &s.workflows).await
    }

    pub async fn get_all_tools(&self) -> Result<Vec<Sourced<ToolRecord>>, CatalogError> {
        self.merged(|s| &s.tools).await
    }

    pub async fn get_all_tasks(&self) -> Result<Vec<Sourced<TaskRecord>>, CatalogError> {
        self.merged(|s| &s.tasks).await
    }

    /// File entries across sources; a relative path keeps its first source.
    pub async fn get_all_files(&self) -> Result<Vec<Sourced<FileEntry>>, CatalogError> {
        let sources = self.aggregator.sources().await?;
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for source in &sources {
            let snapshot = self.snapshot_for(source).await;
            for entry in tag(snapshot.files.iter().cloned(), source) {
                if seen.insert(entry.relative_path.clone()) {
                    files.push(entry);
                }
            }
        }
        Ok(files)
    }

    /// Write the merged tables to `<cache_base>/visible/` and return that path.
    pub async fn export_visible(&self) -> Result<PathBuf, CatalogError> {
        let dir = self.cache_base.join(VISIBLE_DIR);
        let agents = records(self.get_all_agents().await?);
        let workflows = records(self.get_all_workflows().await?);
        let tools = records(self.get_all_tools().await?);
        let tasks = records(self.get_all_tasks().await?);
        let files = records(self.get_all_files().await?);

        write_table::<AgentRow, _>(&dir.join(AGENT_TABLE), &agents)?;
        write_table::<WorkflowRow, _>(&dir.join(WORKFLOW_TABLE), &workflows)?;
        write_table::<CommandRow, _>(&dir.join(TOOL_TABLE), &tools)?;
        write_table::<CommandRow, _>(&dir.join(TASK_TABLE), &tasks)?;
        write_table::<FileRow, _>(&dir.join(FILES_TABLE), &files)?;
        info!(dir = %dir.display(), "Exported merged manifest tables");
        Ok(dir)
    }

    /// Drop remembered snapshots and the memoized source list; with
    /// `remove_disk`, also delete generated and exported tables.
    pub async fn clear(&self, remove_disk: bool) -> Result<(), CatalogError> {
        self.snapshots.lock().clear();
        self.aggregator.reset().await;
        if remove_disk {
            for sub in [MANIFESTS_DIR, VISIBLE_DIR] {
                let dir = self.cache_base.join(sub);
                if dir.exists() {
                    tokio::fs::remove_dir_all(&dir).await?;
                }
            }
        }
        info!(remove_disk, "Cleared manifest cache");
        Ok(())
    }
}

fn records<T>(sourced: Vec<Sourced<T>>) -> Vec<T> {
    sourced.into_iter().map(|s| s.record).collect()
}

fn load_snapshot(dir: &Path, timestamp: DateTime<Utc>) -> Result<ManifestSnapshot, StorageError> {
    Ok(ManifestSnapshot {
        agents: read_table::<AgentRow, _>(&dir.join(AGENT_TABLE))?,
        workflows: read_table::<WorkflowRow, _>(&dir.join(WORKFLOW_TABLE))?,
        tools: read_table::<CommandRow, _>(&dir.join(TOOL_TABLE))?,
        tasks: read_table::<CommandRow, _>(&dir.join(TASK_TABLE))?,
        files: read_table::<FileRow, _>(&dir.join(FILES_TABLE))?,
        timestamp,
    })
}

/// Fill in what the tables cannot carry. A missing file leaves the record as is.
async fn enrich_agent(agent: &mut Sourced<AgentRecord>) {
    let path = agent.source_root.join(&agent.record.path);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), "Skipping enrichment: {}", e);
            return;
        }
    };
    let parsed = parse_agent_markup(&content);
    let markup = parsed.value;
    let record = &mut agent.record;

    if let Some(persona) = markup.persona {
        if record.role.is_empty() {
            record.role = persona.role.clone();
        }
        if record.identity.is_empty() {
            record.identity = persona.identity.clone();
        }
        if record.communication_style.is_empty() {
            record.communication_style = persona.communication_style.clone();
        }
        if record.principles.is_empty() {
            record.principles = persona.principles.clone();
        }
        record.persona = Some(persona);
    }
    if record.title.is_empty() {
        record.title = markup.title.unwrap_or_default();
    }
    if record.icon.is_empty() {
        record.icon = markup.icon.unwrap_or_default();
    }
    record.capabilities = markup.capabilities;
    record.menu = markup.menu;
    record.workflows = markup.workflows;
}
