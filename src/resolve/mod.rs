//! The catalog: merged records, ranking and name resolution behind one object.

mod agent;
pub mod names;
pub mod outcome;
mod workflow;

pub use names::{resolve_agent_alias, suggest, validate_name};
pub use outcome::{
    AmbiguousResult, RankedCandidate, Resolution, RetryDescriptor, WorkflowExecution,
    WorkflowTier,
};
pub use workflow::WorkflowQuery;

use crate::clock::{Clock, SystemClock};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::manifest::cache::GIT_DIR;
use crate::manifest::{
    AgentRecord, FileEntry, ManifestCache, ManifestGenerator, ScanGenerator, Sourced, TaskRecord,
    ToolRecord, WorkflowRecord,
};
use crate::paths::resolve_bmad_path;
use crate::provider::ProviderReranker;
use crate::ranking::{RankingEngine, Reranker};
use crate::source::{GitCliResolver, GitResolver, LoadedContent, SourceAggregator};
use crate::types::{CompositeKey, PathResolution, Source};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Entry point for lookups. One per process; share it by reference.
pub struct Catalog {
    cache: Arc<ManifestCache>,
    ranking: RankingEngine,
}

/// Assembles a catalog from configuration, with seams for tests.
pub struct CatalogBuilder {
    config: CatalogConfig,
    clock: Option<Arc<dyn Clock>>,
    git: Option<Arc<dyn GitResolver>>,
    generator: Option<Arc<dyn ManifestGenerator>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl CatalogBuilder {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            clock: None,
            git: None,
            generator: None,
            reranker: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn git_resolver(mut self, git: Arc<dyn GitResolver>) -> Self {
        self.git = Some(git);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn ManifestGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        let cache_base = self.config.cache.resolved_base_dir()?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let git = self
            .git
            .unwrap_or_else(|| {
                Arc::new(GitCliResolver::new(cache_base.join(GIT_DIR))) as Arc<dyn GitResolver>
            });
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(ScanGenerator::new()) as Arc<dyn ManifestGenerator>);

        let aggregator = Arc::new(SourceAggregator::new(self.config.discovery.clone(), git));
        let cache = Arc::new(ManifestCache::new(
            aggregator,
            generator,
            clock.clone(),
            cache_base,
            self.config.cache.ttl(),
        ));

        let mut ranking = RankingEngine::new(self.config.ranking.clone(), clock);
        let reranker = self.reranker.or_else(|| {
            self.config.rerank.clone().map(|provider| {
                debug!(
                    provider = ?provider.provider_type,
                    model = %provider.model,
                    "Reranker configured"
                );
                Arc::new(ProviderReranker::new(provider)) as Arc<dyn Reranker>
            })
        });
        if let Some(reranker) = reranker {
            ranking = ranking.with_reranker(reranker);
        }

        Ok(Catalog { cache, ranking })
    }
}

impl Catalog {
    pub fn builder(config: CatalogConfig) -> CatalogBuilder {
        CatalogBuilder::new(config)
    }

    /// Catalog with the default collaborators for `config`.
    pub fn from_config(config: CatalogConfig) -> Result<Self, CatalogError> {
        CatalogBuilder::new(config).build()
    }

    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    pub fn aggregator(&self) -> &SourceAggregator {
        self.cache.aggregator()
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    /// Classify a directory as a root and optional module.
    pub fn resolve_path(&self, path: &Path) -> PathResolution {
        resolve_bmad_path(path)
    }

    pub async fn sources(&self) -> Result<Vec<Source>, CatalogError> {
        self.aggregator().sources().await
    }

    pub fn record_usage(&self, key: &CompositeKey) {
        self.ranking.record_usage(key);
    }

    pub async fn list_agents(&self) -> Result<Vec<Sourced<AgentRecord>>, CatalogError> {
        self.cache.get_all_agents().await
    }

    pub async fn list_workflows(&self) -> Result<Vec<Sourced<WorkflowRecord>>, CatalogError> {
        self.cache.get_all_workflows().await
    }

    pub async fn list_tools(&self) -> Result<Vec<Sourced<ToolRecord>>, CatalogError> {
        self.cache.get_all_tools().await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Sourced<TaskRecord>>, CatalogError> {
        self.cache.get_all_tasks().await
    }

    pub async fn list_files(&self) -> Result<Vec<Sourced<FileEntry>>, CatalogError> {
        self.cache.get_all_files().await
    }

    /// Raw definition text of an agent, first source wins.
    pub async fn load_agent(
        &self,
        name: &str,
        module: Option<&str>,
    ) -> Result<LoadedContent, CatalogError> {
        let name = validate_name(
            crate::error::RecordKind::Agent,
            resolve_agent_alias(name.trim()),
        )?;
        let module = module.map(names::validate_module).transpose()?;
        self.aggregator().load_agent(&name, module.as_deref()).await
    }

    /// Raw workflow definition plus its instructions, first source wins.
    pub async fn load_workflow(
        &self,
        name: &str,
        module: Option<&str>,
    ) -> Result<LoadedContent, CatalogError> {
        let name = validate_name(crate::error::RecordKind::Workflow, name)?;
        let module = module.map(names::validate_module).transpose()?;
        self.aggregator().load_workflow(&name, module.as_deref()).await
    }

    pub async fn load_file(&self, relative: &str) -> Result<LoadedContent, CatalogError> {
        self.aggregator().load_file(relative).await
    }
}
