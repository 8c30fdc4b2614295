use crate::env_resolver::EnvResolver;
use crate::error::{ConfigError, ConfigResult};
use crate::settings::ClientSettings;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::info;

/// Supported file formats for configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Detect file format from extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("json") => Ok(FileFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }
}

/// Reads [`ClientSettings`] from YAML or JSON, resolving `${VAR}` references first
#[derive(Debug, Clone, Default)]
pub struct SettingsLoader {
    resolver: EnvResolver,
}

impl SettingsLoader {
    pub fn new(resolver: EnvResolver) -> Self {
        Self { resolver }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<ClientSettings> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        let settings = self.parse_content(&content, format)?;
        info!("loaded client settings from {}", path.display());
        Ok(settings)
    }

    pub fn parse_content(&self, content: &str, format: FileFormat) -> ConfigResult<ClientSettings> {
        if content.trim().is_empty() {
            return Ok(ClientSettings::default());
        }
        let raw: JsonValue = match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        };
        // A YAML document holding only comments parses as null
        let raw = if raw.is_null() {
            JsonValue::Object(Default::default())
        } else {
            raw
        };

        let resolved = self.resolver.resolve(&raw)?;
        let settings: ClientSettings = serde_json::from_value(resolved)?;
        settings.validate()?;
        Ok(settings)
    }
}
