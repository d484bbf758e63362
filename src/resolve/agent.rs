use super::names::{resolve_agent_alias, suggest, validate_module, validate_name};
use super::outcome::{AmbiguousResult, RankedCandidate, Resolution, RetryDescriptor};
use super::Catalog;
use crate::error::{CatalogError, RecordKind};
use crate::manifest::{AgentRecord, Keyed, Sourced};
use tracing::{debug, info};

impl Catalog {
    /// Resolve an agent by name, optionally qualified by module.
    ///
    /// Several agents sharing the name come back ranked as an ambiguous
    /// result; each candidate's retry descriptor names its module.
    pub async fn resolve_agent(
        &self,
        name: &str,
        module: Option<&str>,
        query: Option<&str>,
    ) -> Result<Resolution<Sourced<AgentRecord>>, CatalogError> {
        let name = validate_name(RecordKind::Agent, resolve_agent_alias(name.trim()))?;
        let module = module.map(validate_module).transpose()?;

        let agents = self.cache.get_all_agents().await?;
        let mut matches: Vec<Sourced<AgentRecord>> = agents
            .iter()
            .filter(|agent| agent.name == name)
            .filter(|agent| module.as_deref().map_or(true, |m| agent.module == m))
            .cloned()
            .collect();

        match matches.len() {
            0 => Err(CatalogError::NotFound {
                kind: RecordKind::Agent,
                name: match &module {
                    Some(module) => format!("{}:{}", module, name),
                    None => name.clone(),
                },
                suggestions: suggest(&name, agents.iter().map(|a| a.name.as_str())),
            }),
            1 => {
                let agent = matches.swap_remove(0);
                let key = agent.key();
                info!(agent = %key, source = %agent.source_kind, "Resolved agent");
                self.ranking.record_usage(&key);
                Ok(Resolution::Found(agent))
            }
            count => {
                debug!(agent = %name, count, "Agent name is ambiguous");
                let ranked = self
                    .ranking
                    .rank_hybrid(matches, query, |a| a.key(), |a| a.summary())
                    .await;
                let candidates = ranked
                    .into_iter()
                    .map(|ranked| RankedCandidate {
                        retry: RetryDescriptor {
                            name: ranked.item.name.clone(),
                            module: ranked.item.module.clone(),
                            agent: None,
                        },
                        display_name: ranked.item.display_name.clone(),
                        description: ranked.item.summary(),
                        source_kind: ranked.item.source_kind,
                        key: ranked.key,
                        score: ranked.score,
                    })
                    .collect();
                Ok(Resolution::Ambiguous(AmbiguousResult { name, candidates }))
            }
        }
    }
}
