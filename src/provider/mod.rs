//! Language-model provider used for optional reranking.

pub mod config;
pub mod reranker;

pub use config::{ProviderType, RerankProviderConfig};
pub use reranker::ProviderReranker;
