//! Global config file source (optional).

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = match xdg::global_config_path() {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!("Skipping global config: {}", e);
            return Ok(builder);
        }
    };
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(false)))
}
