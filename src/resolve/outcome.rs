//! What a resolution hands back: one record, or ranked candidates to pick from.

use crate::manifest::{AgentRecord, Sourced, WorkflowRecord};
use crate::types::{CompositeKey, SourceKind};
use serde::Serialize;

/// Outcome of a lookup that found something.
///
/// Ambiguity is an ordinary outcome, not an error: the caller picks a
/// candidate and retries with its descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution<T> {
    Found(T),
    Ambiguous(AmbiguousResult),
}

impl<T> Resolution<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found(value) => Some(value),
            Resolution::Ambiguous(_) => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Resolution::Ambiguous(_))
    }
}

/// Arguments that resolve one candidate when passed back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryDescriptor {
    pub name: String,
    pub module: String,
    /// Owning agent as `module:name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub key: CompositeKey,
    pub display_name: String,
    pub description: String,
    pub score: f64,
    pub source_kind: SourceKind,
    pub retry: RetryDescriptor,
}

#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousResult {
    pub name: String,
    /// Best candidate first.
    pub candidates: Vec<RankedCandidate>,
}

/// Which rule resolved a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowTier {
    /// Flagged standalone; runs without an agent.
    Standalone,
    /// Listed in the manifest and referenced by an agent menu.
    AgentMenu,
    /// Absent from every manifest; declared by name in an agent definition.
    AgentDeclared,
}

/// A workflow ready to run, with the agent that runs it when one is needed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub key: CompositeKey,
    /// Definition path as the manifest or the agent menu gives it.
    pub path: String,
    pub tier: WorkflowTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Sourced<WorkflowRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<Sourced<AgentRecord>>,
}
