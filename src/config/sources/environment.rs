//! Environment variable source: BMAD_CATALOG_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const ENV_PREFIX: &str = "BMAD_CATALOG";

/// Add environment variable overlay to builder.
///
/// `BMAD_CATALOG__DISCOVERY__MODE=first` sets `discovery.mode`. Remote URLs are
/// a comma-separated list in `BMAD_CATALOG__DISCOVERY__REMOTES`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(environment()))
}

pub(crate) fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("discovery.remotes")
        .try_parsing(true)
}
