//! BMAD Catalog: multi-source discovery and resolution of agents and workflows
//!
//! Content roots are gathered from git remotes, the project and the user's
//! home, each one's manifest tables are cached with a TTL, and the merged
//! records are ranked by usage when a name matches more than one of them.

pub mod clock;
pub mod config;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod manifest;
pub mod paths;
pub mod provider;
pub mod ranking;
pub mod resolve;
pub mod source;
pub mod tooling;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CatalogConfig, ConfigLoader, DiscoveryMode};
pub use error::{CatalogError, RecordKind};
pub use manifest::{AgentRecord, ManifestCache, Sourced, WorkflowRecord};
pub use ranking::RankingEngine;
pub use resolve::{
    AmbiguousResult, Catalog, CatalogBuilder, Resolution, RetryDescriptor, WorkflowExecution,
    WorkflowQuery, WorkflowTier,
};
pub use types::{CompositeKey, PathResolution, Source, SourceKind};
