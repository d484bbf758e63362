//! Built-in defaults every merge starts from.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("discovery.mode", "auto")?
        .set_default("cache.ttl_secs", 300)?
        .set_default("logging.level", "info")
}
