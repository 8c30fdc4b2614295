pub mod call;
pub mod show_config;

pub use call::CallCommand;
pub use show_config::ShowConfigCommand;

use crate::error::CliResult;
use restkit_config::{ClientSettings, SettingsLoader};
use std::path::Path;

/// Settings file (if any) with `RESTKIT_*` environment overrides applied
pub fn load_settings(config: Option<&Path>) -> CliResult<ClientSettings> {
    let mut settings = match config {
        Some(path) => SettingsLoader::default().load_from_file(path)?,
        None => ClientSettings::default(),
    };
    settings.apply_env_overrides()?;
    settings.validate()?;
    Ok(settings)
}
