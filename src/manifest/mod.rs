//! Manifest tables: record types, the CSV codec, markup parsing, generation,
//! per-source caching and the cross-source merge.

pub mod cache;
pub mod generator;
pub mod markup;
pub mod merge;
pub mod records;
pub mod table;

pub use cache::ManifestCache;
pub use generator::{GenerationRequest, ManifestGenerator, ModuleView, ScanGenerator};
pub use markup::{parse_agent_markup, ParseWarning, Parsed};
pub use merge::merge_by_priority;
pub use records::{
    AgentRecord, CommandRecord, FileEntry, Keyed, ManifestSnapshot, MenuItem, Persona, Sourced,
    TaskRecord, ToolRecord, WorkflowRecord,
};
