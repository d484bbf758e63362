//! CSV manifest tables: fixed file names and headers, one row type per table.
//!
//! Reading is row-tolerant: a malformed row is logged and skipped, a missing
//! table reads as empty.

use crate::error::StorageError;
use crate::manifest::records::{AgentRecord, CommandRecord, FileEntry, WorkflowRecord};
use crate::types::DEFAULT_MODULE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::warn;

pub const AGENT_TABLE: &str = "agent-manifest.csv";
pub const WORKFLOW_TABLE: &str = "workflow-manifest.csv";
pub const TOOL_TABLE: &str = "tool-manifest.csv";
pub const TASK_TABLE: &str = "task-manifest.csv";
pub const FILES_TABLE: &str = "files-manifest.csv";

/// All five tables, in generation order.
pub const ALL_TABLES: [&str; 5] = [
    AGENT_TABLE,
    WORKFLOW_TABLE,
    TOOL_TABLE,
    TASK_TABLE,
    FILES_TABLE,
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentRow {
    pub name: String,
    pub display_name: String,
    pub title: String,
    pub icon: String,
    pub role: String,
    pub identity: String,
    pub communication_style: String,
    pub principles: String,
    pub module: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRow {
    pub name: String,
    pub description: String,
    pub module: String,
    pub path: String,
    #[serde(deserialize_with = "flag")]
    pub standalone: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandRow {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub module: String,
    pub path: String,
    #[serde(deserialize_with = "flag")]
    pub standalone: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRow {
    #[serde(rename = "type")]
    pub file_type: String,
    pub name: String,
    pub module: String,
    pub path: String,
    pub hash: String,
}

/// Accepts `true/false`, `yes/no`, `1/0`; anything else is false.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "y"
    ))
}

fn module_or_default(module: String) -> String {
    let trimmed = module.trim();
    if trimmed.is_empty() {
        DEFAULT_MODULE.to_string()
    } else {
        trimmed.to_string()
    }
}

impl From<AgentRow> for AgentRecord {
    fn from(row: AgentRow) -> Self {
        AgentRecord {
            display_name: if row.display_name.is_empty() {
                row.name.clone()
            } else {
                row.display_name
            },
            name: row.name,
            module: module_or_default(row.module),
            title: row.title,
            icon: row.icon,
            role: row.role,
            identity: row.identity,
            communication_style: row.communication_style,
            principles: row.principles,
            path: row.path,
            ..Default::default()
        }
    }
}

impl From<&AgentRecord> for AgentRow {
    fn from(record: &AgentRecord) -> Self {
        AgentRow {
            name: record.name.clone(),
            display_name: record.display_name.clone(),
            title: record.title.clone(),
            icon: record.icon.clone(),
            role: record.role.clone(),
            identity: record.identity.clone(),
            communication_style: record.communication_style.clone(),
            principles: record.principles.clone(),
            module: record.module.clone(),
            path: record.path.clone(),
        }
    }
}

impl From<WorkflowRow> for WorkflowRecord {
    fn from(row: WorkflowRow) -> Self {
        WorkflowRecord {
            name: row.name,
            description: row.description,
            module: module_or_default(row.module),
            path: row.path,
            standalone: row.standalone,
        }
    }
}

impl From<&WorkflowRecord> for WorkflowRow {
    fn from(record: &WorkflowRecord) -> Self {
        WorkflowRow {
            name: record.name.clone(),
            description: record.description.clone(),
            module: record.module.clone(),
            path: record.path.clone(),
            standalone: record.standalone,
        }
    }
}

impl From<CommandRow> for CommandRecord {
    fn from(row: CommandRow) -> Self {
        CommandRecord {
            display_name: if row.display_name.is_empty() {
                row.name.clone()
            } else {
                row.display_name
            },
            name: row.name,
            description: row.description,
            module: module_or_default(row.module),
            path: row.path,
            standalone: row.standalone,
        }
    }
}

impl From<&CommandRecord> for CommandRow {
    fn from(record: &CommandRecord) -> Self {
        CommandRow {
            name: record.name.clone(),
            display_name: record.display_name.clone(),
            description: record.description.clone(),
            module: record.module.clone(),
            path: record.path.clone(),
            standalone: record.standalone,
        }
    }
}

impl From<FileRow> for FileEntry {
    fn from(row: FileRow) -> Self {
        FileEntry {
            file_type: row.file_type,
            name: row.name,
            module: module_or_default(row.module),
            relative_path: row.path,
            content_hash: row.hash,
        }
    }
}

impl From<&FileEntry> for FileRow {
    fn from(entry: &FileEntry) -> Self {
        FileRow {
            file_type: entry.file_type.clone(),
            name: entry.name.clone(),
            module: entry.module.clone(),
            path: entry.relative_path.clone(),
            hash: entry.content_hash.clone(),
        }
    }
}

/// Read one table, skipping rows that fail to parse or have no name.
pub fn read_table<R, T>(path: &Path) -> Result<Vec<T>, StorageError>
where
    R: DeserializeOwned + TableRow,
    T: From<R>,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<R>().enumerate() {
        match result {
            Ok(row) if !row.name().trim().is_empty() => rows.push(T::from(row)),
            Ok(_) => {}
            Err(e) => {
                warn!(
                    table = %path.display(),
                    row = index + 1,
                    "Skipping malformed manifest row: {}",
                    e
                );
            }
        }
    }
    Ok(rows)
}

/// Write one table with its header, replacing any existing file.
pub fn write_table<'a, R, T>(
    path: &Path,
    records: impl IntoIterator<Item = &'a T>,
) -> Result<(), StorageError>
where
    R: Serialize + TableRow + From<&'a T>,
    T: 'a,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(R::header())?;
    for record in records {
        writer.serialize(R::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Row types expose their name (blank rows are dropped) and header.
pub trait TableRow {
    fn name(&self) -> &str;
    fn header() -> &'static [&'static str];
}

impl TableRow for AgentRow {
    fn name(&self) -> &str {
        &self.name
    }
    fn header() -> &'static [&'static str] {
        &[
            "name",
            "displayName",
            "title",
            "icon",
            "role",
            "identity",
            "communicationStyle",
            "principles",
            "module",
            "path",
        ]
    }
}

impl TableRow for WorkflowRow {
    fn name(&self) -> &str {
        &self.name
    }
    fn header() -> &'static [&'static str] {
        &["name", "description", "module", "path", "standalone"]
    }
}

impl TableRow for CommandRow {
    fn name(&self) -> &str {
        &self.name
    }
    fn header() -> &'static [&'static str] {
        &["name", "displayName", "description", "module", "path", "standalone"]
    }
}

impl TableRow for FileRow {
    fn name(&self) -> &str {
        &self.name
    }
    fn header() -> &'static [&'static str] {
        &["type", "name", "module", "path", "hash"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_agent_table_and_defaults_module() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(AGENT_TABLE);
        fs::write(
            &path,
            "name,displayName,title,icon,role,identity,communicationStyle,principles,module,path\n\
             analyst,Mary,Business Analyst,📊,Analyst,\"Curious, thorough\",Direct,Evidence,bmm,bmm/agents/analyst.md\n\
             bmad-master,,Master,🧙,Orchestrator,,,,,core/agents/bmad-master.md\n\
             ,,,,,,,,,\n",
        )
        .unwrap();

        let agents: Vec<AgentRecord> = read_table::<AgentRow, _>(&path).unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].identity, "Curious, thorough");
        assert_eq!(agents[1].module, "core");
        assert_eq!(agents[1].display_name, "bmad-master");
    }

    #[test]
    fn missing_table_reads_empty() {
        let temp = TempDir::new().unwrap();
        let rows: Vec<WorkflowRecord> =
            read_table::<WorkflowRow, _>(&temp.path().join(WORKFLOW_TABLE)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn workflow_table_written_then_read_keeps_standalone_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join(WORKFLOW_TABLE);
        let workflows = vec![
            WorkflowRecord {
                name: "party-mode".to_string(),
                description: "Group discussion".to_string(),
                module: "core".to_string(),
                path: "core/workflows/party-mode/workflow.yaml".to_string(),
                standalone: true,
            },
            WorkflowRecord {
                name: "prd".to_string(),
                description: "Product requirements".to_string(),
                module: "bmm".to_string(),
                path: "bmm/workflows/prd/workflow.yaml".to_string(),
                standalone: false,
            },
        ];
        write_table::<WorkflowRow, _>(&path, &workflows).unwrap();

        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("name,description,module,path,standalone"));

        let read: Vec<WorkflowRecord> = read_table::<WorkflowRow, _>(&path).unwrap();
        assert_eq!(read, workflows);
    }

    #[test]
    fn standalone_flag_accepts_common_spellings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(TASK_TABLE);
        fs::write(
            &path,
            "name,displayName,description,module,path,standalone\n\
             a,A,,core,core/tasks/a.xml,yes\n\
             b,B,,core,core/tasks/b.xml,0\n\
             c,C,,core,core/tasks/c.xml,\n",
        )
        .unwrap();
        let tasks: Vec<CommandRecord> = read_table::<CommandRow, _>(&path).unwrap();
        let flags: Vec<bool> = tasks.iter().map(|t| t.standalone).collect();
        assert_eq!(flags, vec![true, false, false]);
    }
}
