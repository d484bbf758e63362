//! Project config file source: `<project>/.bmad-catalog.toml` (optional).

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::Path;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = xdg::project_config_path(project_root);
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(false)))
}
