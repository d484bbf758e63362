//! Integration tests for the BMAD catalog

mod agent_resolution;
mod cli_commands;
mod discovery_merge;
mod ranking_usage;
mod support;
mod workflow_tiers;
