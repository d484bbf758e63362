//! Record types projected from content files.

use crate::types::{CompositeKey, SourceKind, DEFAULT_MODULE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Anything identified by a composite key.
pub trait Keyed {
    fn key(&self) -> CompositeKey;
}

/// Persona text recovered from an agent definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
    pub identity: String,
    pub communication_style: String,
    pub principles: String,
}

/// One entry of an agent's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Trigger without the leading `*`.
    pub cmd: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub name: String,
    pub module: String,
    pub display_name: String,
    pub title: String,
    pub icon: String,
    pub role: String,
    pub identity: String,
    pub communication_style: String,
    pub principles: String,
    /// Definition file, relative to the source root.
    pub path: String,

    // Filled by enrichment from the definition file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub menu: Vec<MenuItem>,
    /// Workflow name to the path its menu entry points at.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub workflows: BTreeMap<String, String>,
}

impl AgentRecord {
    /// Short text used in listings and rerank prompts.
    pub fn summary(&self) -> String {
        if !self.title.is_empty() {
            self.title.clone()
        } else {
            self.role.clone()
        }
    }

    /// True when a menu entry points at `workflow`'s definition in its own
    /// module. A declared path with no module segment belongs to `core`.
    pub fn references_workflow(&self, workflow: &WorkflowRecord) -> bool {
        let Some(target) = workflow_ref(&workflow.path) else {
            return false;
        };
        let target_module = target.module.as_deref().unwrap_or(&workflow.module);
        self.workflows
            .values()
            .chain(self.menu.iter().filter_map(|item| item.workflow.as_ref()))
            .filter_map(|declared| workflow_ref(declared))
            .any(|declared| {
                declared.tail == target.tail
                    && declared.module.as_deref().unwrap_or(DEFAULT_MODULE) == target_module
            })
    }
}

/// A workflow path split into the module segment ahead of `workflows/` and
/// the remainder from `workflows/` on.
struct WorkflowRef {
    module: Option<String>,
    tail: String,
}

fn workflow_ref(path: &str) -> Option<WorkflowRef> {
    let normalized = normalize_ref(path);
    if normalized.is_empty() {
        return None;
    }
    let segments: Vec<&str> = normalized.split('/').collect();
    match segments.iter().position(|s| *s == "workflows") {
        Some(at) => Some(WorkflowRef {
            module: at
                .checked_sub(1)
                .map(|i| segments[i])
                .filter(|m| *m != "bmad")
                .map(str::to_string),
            tail: segments[at..].join("/"),
        }),
        None => Some(WorkflowRef {
            module: None,
            tail: normalized,
        }),
    }
}

impl Keyed for AgentRecord {
    fn key(&self) -> CompositeKey {
        CompositeKey::new(Some(&self.module), &self.name)
    }
}

/// Strip placeholders and separators so declared and manifest paths compare.
pub(crate) fn normalize_ref(path: &str) -> String {
    let trimmed = path.trim().replace('\\', "/");
    let without_placeholder = match trimmed.strip_prefix('{') {
        Some(rest) => rest.split_once('}').map(|(_, tail)| tail).unwrap_or(rest),
        None => trimmed.as_str(),
    };
    without_placeholder.trim_start_matches('/').to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub name: String,
    pub description: String,
    pub module: String,
    /// Definition file, relative to the source root.
    pub path: String,
    /// Runs without an owning agent.
    pub standalone: bool,
}

impl Keyed for WorkflowRecord {
    fn key(&self) -> CompositeKey {
        CompositeKey::new(Some(&self.module), &self.name)
    }
}

/// Tool or task entry; both tables share a shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub module: String,
    pub path: String,
    pub standalone: bool,
}

pub type ToolRecord = CommandRecord;
pub type TaskRecord = CommandRecord;

impl Keyed for CommandRecord {
    fn key(&self) -> CompositeKey {
        CompositeKey::new(Some(&self.module), &self.name)
    }
}

/// Integrity/listing entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    #[serde(rename = "type")]
    pub file_type: String,
    pub name: String,
    pub module: String,
    pub relative_path: String,
    pub content_hash: String,
}

/// All tables of one source root at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSnapshot {
    pub agents: Vec<AgentRecord>,
    pub workflows: Vec<WorkflowRecord>,
    pub tools: Vec<ToolRecord>,
    pub tasks: Vec<TaskRecord>,
    pub files: Vec<FileEntry>,
    pub timestamp: DateTime<Utc>,
}

impl ManifestSnapshot {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            agents: Vec::new(),
            workflows: Vec::new(),
            tools: Vec::new(),
            tasks: Vec::new(),
            files: Vec::new(),
            timestamp,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.timestamp < ttl
    }
}

/// A record tagged with the source it was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sourced<T> {
    #[serde(flatten)]
    pub record: T,
    pub priority: u32,
    pub source_kind: SourceKind,
    pub source_root: PathBuf,
}

impl<T: Keyed> Keyed for Sourced<T> {
    fn key(&self) -> CompositeKey {
        self.record.key()
    }
}

impl<T> std::ops::Deref for Sourced<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}
