//! Workflow resolution in three tiers, tried in order:
//!
//! 1. a standalone manifest entry runs without an agent;
//! 2. a non-standalone manifest entry runs through the agents whose menu
//!    points at its path;
//! 3. a name found in no manifest falls back to the workflow names agents
//!    declare in their definitions.
//!
//! In tiers 2 and 3, no owner is an error, one owner executes and several
//! owners come back ranked as an ambiguous result.

use super::names::{resolve_agent_alias, suggest, validate_module, validate_name};
use super::outcome::{
    AmbiguousResult, RankedCandidate, Resolution, RetryDescriptor, WorkflowExecution,
    WorkflowTier,
};
use super::Catalog;
use crate::error::{CatalogError, RecordKind};
use crate::manifest::{AgentRecord, Keyed, Sourced, WorkflowRecord};
use crate::types::CompositeKey;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Optional narrowing applied to a workflow lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowQuery<'a> {
    pub module: Option<&'a str>,
    /// Owning agent, `module:name` or a bare name, for retrying an ambiguous
    /// result.
    pub agent: Option<&'a str>,
    /// Free text for the optional reranker.
    pub text: Option<&'a str>,
}

impl Catalog {
    pub async fn resolve_workflow(
        &self,
        name: &str,
        query: WorkflowQuery<'_>,
    ) -> Result<Resolution<WorkflowExecution>, CatalogError> {
        let name = validate_name(RecordKind::Workflow, name)?;
        let module = query.module.map(validate_module).transpose()?;
        let agent_filter = query.agent.map(AgentFilter::parse).transpose()?;

        let workflows = self.cache.get_all_workflows().await?;
        let named: Vec<&Sourced<WorkflowRecord>> =
            workflows.iter().filter(|w| w.name == name).collect();
        let matching: Vec<Sourced<WorkflowRecord>> = named
            .iter()
            .filter(|w| module.as_deref().map_or(true, |m| w.module == m))
            .map(|w| (*w).clone())
            .collect();

        // Tier 1.
        let standalone: Vec<Sourced<WorkflowRecord>> =
            matching.iter().filter(|w| w.standalone).cloned().collect();
        if !standalone.is_empty() {
            return Ok(self.standalone_outcome(&name, standalone, query.text).await);
        }

        if !named.is_empty() {
            if matching.is_empty() {
                return Err(CatalogError::NotFound {
                    kind: RecordKind::Workflow,
                    name: qualified(module.as_deref(), &name),
                    suggestions: named.iter().map(|w| w.key().to_string()).collect(),
                });
            }
            return self
                .agent_menu_outcome(&name, matching, agent_filter.as_ref(), query.text)
                .await;
        }

        self.agent_declared_outcome(
            &name,
            module.as_deref(),
            agent_filter.as_ref(),
            query.text,
            &workflows,
        )
        .await
    }

    async fn standalone_outcome(
        &self,
        name: &str,
        mut standalone: Vec<Sourced<WorkflowRecord>>,
        text: Option<&str>,
    ) -> Resolution<WorkflowExecution> {
        if standalone.len() == 1 {
            let workflow = standalone.swap_remove(0);
            let key = workflow.key();
            info!(workflow = %key, "Resolved standalone workflow");
            self.ranking.record_usage(&key);
            return Resolution::Found(WorkflowExecution {
                path: workflow.path.clone(),
                key,
                tier: WorkflowTier::Standalone,
                workflow: Some(workflow),
                agent: None,
            });
        }

        let ranked = self
            .ranking
            .rank_hybrid(standalone, text, |w| w.key(), |w| w.description.clone())
            .await;
        Resolution::Ambiguous(AmbiguousResult {
            name: name.to_string(),
            candidates: ranked
                .into_iter()
                .map(|ranked| RankedCandidate {
                    retry: RetryDescriptor {
                        name: ranked.item.name.clone(),
                        module: ranked.item.module.clone(),
                        agent: None,
                    },
                    display_name: ranked.item.name.clone(),
                    description: ranked.item.description.clone(),
                    source_kind: ranked.item.source_kind,
                    key: ranked.key,
                    score: ranked.score,
                })
                .collect(),
        })
    }

    async fn agent_menu_outcome(
        &self,
        name: &str,
        matching: Vec<Sourced<WorkflowRecord>>,
        agent_filter: Option<&AgentFilter>,
        text: Option<&str>,
    ) -> Result<Resolution<WorkflowExecution>, CatalogError> {
        let agents = self.cache.get_all_agents().await?;
        let owners: Vec<Owner> = matching
            .iter()
            .flat_map(|workflow| {
                agents
                    .iter()
                    .filter(|agent| agent.references_workflow(workflow))
                    .filter(|agent| agent_filter.map_or(true, |f| f.matches(agent)))
                    .map(|agent| Owner {
                        key: workflow.key(),
                        path: workflow.path.clone(),
                        workflow: Some(workflow.clone()),
                        agent: agent.clone(),
                    })
            })
            .collect();

        flag_divergence(name, &owners, &agents);

        match owners.len() {
            0 => Err(CatalogError::NoOwningAgent {
                workflow: name.to_string(),
            }),
            _ => Ok(self
                .owner_outcome(name, owners, WorkflowTier::AgentMenu, text)
                .await),
        }
    }

    async fn agent_declared_outcome(
        &self,
        name: &str,
        module: Option<&str>,
        agent_filter: Option<&AgentFilter>,
        text: Option<&str>,
        workflows: &[Sourced<WorkflowRecord>],
    ) -> Result<Resolution<WorkflowExecution>, CatalogError> {
        let agents = self.cache.get_all_agents().await?;
        let owners: Vec<Owner> = agents
            .iter()
            .filter(|agent| module.map_or(true, |m| agent.module == m))
            .filter(|agent| agent_filter.map_or(true, |f| f.matches(agent)))
            .filter_map(|agent| {
                let path = agent.workflows.get(name)?;
                Some(Owner {
                    key: CompositeKey::new(Some(agent.module.as_str()), name),
                    path: path.clone(),
                    workflow: None,
                    agent: agent.clone(),
                })
            })
            .collect();

        if owners.is_empty() {
            let declared = agents.iter().flat_map(|a| a.workflows.keys().map(String::as_str));
            let listed = workflows.iter().map(|w| w.name.as_str());
            return Err(CatalogError::NotFound {
                kind: RecordKind::Workflow,
                name: qualified(module, name),
                suggestions: suggest(name, listed.chain(declared)),
            });
        }
        debug!(
            workflow = %name,
            owners = owners.len(),
            "Resolved through agent-declared workflows"
        );
        Ok(self
            .owner_outcome(name, owners, WorkflowTier::AgentDeclared, text)
            .await)
    }

    async fn owner_outcome(
        &self,
        name: &str,
        mut owners: Vec<Owner>,
        tier: WorkflowTier,
        text: Option<&str>,
    ) -> Resolution<WorkflowExecution> {
        if owners.len() == 1 {
            let owner = owners.swap_remove(0);
            info!(
                workflow = %owner.key,
                agent = %owner.agent.key(),
                ?tier,
                "Resolved workflow through agent"
            );
            self.ranking.record_usage(&owner.key);
            return Resolution::Found(WorkflowExecution {
                key: owner.key,
                path: owner.path,
                tier,
                workflow: owner.workflow,
                agent: Some(owner.agent),
            });
        }

        let ranked = self
            .ranking
            .rank_hybrid(
                owners,
                text,
                |owner| owner.agent.key(),
                |owner| owner.agent.summary(),
            )
            .await;
        Resolution::Ambiguous(AmbiguousResult {
            name: name.to_string(),
            candidates: ranked
                .into_iter()
                .map(|ranked| RankedCandidate {
                    retry: RetryDescriptor {
                        name: ranked.item.key.name.clone(),
                        module: ranked.item.key.module.clone(),
                        agent: Some(ranked.item.agent.key().to_string()),
                    },
                    display_name: ranked.item.agent.display_name.clone(),
                    description: ranked.item.agent.summary(),
                    source_kind: ranked.item.agent.source_kind,
                    key: ranked.key,
                    score: ranked.score,
                })
                .collect(),
        })
    }
}

/// A workflow paired with an agent that can run it.
#[derive(Debug, Clone)]
struct Owner {
    key: CompositeKey,
    path: String,
    workflow: Option<Sourced<WorkflowRecord>>,
    agent: Sourced<AgentRecord>,
}

/// Agent narrowing for a retry; a module pins one agent among same-named ones.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AgentFilter {
    module: Option<String>,
    name: String,
}

impl AgentFilter {
    fn parse(raw: &str) -> Result<Self, CatalogError> {
        let raw = raw.trim();
        let (module, name) = match raw.split_once(':') {
            Some((module, name)) => (Some(validate_module(module)?), name),
            None => (None, raw),
        };
        Ok(Self {
            module,
            name: validate_name(RecordKind::Agent, resolve_agent_alias(name.trim()))?,
        })
    }

    fn matches(&self, agent: &AgentRecord) -> bool {
        agent.name == self.name && self.module.as_deref().map_or(true, |m| agent.module == m)
    }
}

fn qualified(module: Option<&str>, name: &str) -> String {
    match module {
        Some(module) => format!("{}:{}", module, name),
        None => name.to_string(),
    }
}

/// Log when menu-path owners and name-declaring agents disagree.
fn flag_divergence(name: &str, owners: &[Owner], agents: &[Sourced<AgentRecord>]) {
    let by_path: BTreeSet<CompositeKey> = owners.iter().map(|o| o.agent.key()).collect();
    let by_name: BTreeSet<CompositeKey> = agents
        .iter()
        .filter(|agent| agent.workflows.contains_key(name))
        .map(|agent| agent.key())
        .collect();
    if by_path != by_name {
        debug!(
            workflow = %name,
            menu_owners = ?by_path,
            declaring_agents = ?by_name,
            "Menu-path owners differ from agents declaring the workflow name"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_filter_accepts_qualified_and_bare_names() {
        let qualified = AgentFilter::parse("core:debug").unwrap();
        assert_eq!(qualified.module.as_deref(), Some("core"));
        assert_eq!(qualified.name, "debug");

        let bare = AgentFilter::parse(" master ").unwrap();
        assert_eq!(bare.module, None);
        assert_eq!(bare.name, "bmad-master");

        assert!(AgentFilter::parse("core:../debug").is_err());
    }

    #[test]
    fn qualified_name_includes_module() {
        assert_eq!(qualified(Some("bmm"), "prd"), "bmm:prd");
        assert_eq!(qualified(None, "prd"), "prd");
    }
}
