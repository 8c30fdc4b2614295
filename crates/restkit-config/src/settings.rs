//! Client settings as read from files and the environment

use crate::error::{ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use restkit_core::{
    BodyCodec, ClientOptions, ConcurrencyAdapter, SerializationStrategy, TimeoutSettings,
    YamlCodec,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub const ENV_ENDPOINT: &str = "RESTKIT_ENDPOINT";
pub const ENV_CONNECT_TIMEOUT: &str = "RESTKIT_CONNECT_TIMEOUT_SECS";
pub const ENV_READ_TIMEOUT: &str = "RESTKIT_READ_TIMEOUT_SECS";
pub const ENV_WRITE_TIMEOUT: &str = "RESTKIT_WRITE_TIMEOUT_SECS";
pub const ENV_LOGGING: &str = "RESTKIT_LOGGING";

static YAML_CODEC: Lazy<Arc<dyn BodyCodec>> = Lazy::new(|| Arc::new(YamlCodec));

/// Serialization strategies selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SerializationKind {
    #[default]
    JsonTree,
    Typed,
    Yaml,
}

impl SerializationKind {
    pub fn to_strategy(self) -> SerializationStrategy {
        match self {
            SerializationKind::JsonTree => SerializationStrategy::JsonTree,
            SerializationKind::Typed => SerializationStrategy::Typed,
            SerializationKind::Yaml => SerializationStrategy::Custom(YAML_CODEC.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSection {
    #[serde(default = "default_timeout_secs")]
    pub connect_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub read_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub write_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            connect_secs: default_timeout_secs(),
            read_secs: default_timeout_secs(),
            write_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    restkit_core::timeouts::DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub serialization: SerializationKind,
    #[serde(default)]
    pub concurrency: ConcurrencyAdapter,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub timeouts: TimeoutSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ClientSettings {
    /// Apply `RESTKIT_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            debug!("{} overrides endpoint", ENV_ENDPOINT);
            self.endpoint = Some(endpoint);
        }
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT) {
            self.timeouts.connect_secs = parse_var(ENV_CONNECT_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_READ_TIMEOUT) {
            self.timeouts.read_secs = parse_var(ENV_READ_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_WRITE_TIMEOUT) {
            self.timeouts.write_secs = parse_var(ENV_WRITE_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_LOGGING) {
            self.logging = parse_var(ENV_LOGGING, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(endpoint) = &self.endpoint {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::Validation("endpoint must not be empty".to_string()));
            }
        }
        self.timeout_settings()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn timeout_settings(&self) -> TimeoutSettings {
        TimeoutSettings::from_secs(
            self.timeouts.connect_secs,
            self.timeouts.read_secs,
            self.timeouts.write_secs,
        )
    }

    /// Options for [`restkit_core::ClientCache::get_or_build`]
    pub fn client_options(&self, endpoint: &str) -> ClientOptions {
        let headers = self.headers.clone();
        let user_agent = self.user_agent.clone();
        ClientOptions::new(endpoint)
            .serialization(self.serialization.to_strategy())
            .concurrency(self.concurrency)
            .logging(self.logging)
            .customize(move |mut builder| {
                for (name, value) in headers {
                    builder = builder.default_header(name, value);
                }
                if let Some(user_agent) = user_agent {
                    builder = builder.user_agent(user_agent);
                }
                builder
            })
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_yaml_strategy_is_shared() {
        let first = SerializationKind::Yaml.to_strategy();
        let second = SerializationKind::Yaml.to_strategy();
        assert!(first.same_as(&second));
        assert!(!first.same_as(&SerializationKind::JsonTree.to_strategy()));
    }

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.timeout_settings(), TimeoutSettings::default());
        assert_eq!(settings.serialization, SerializationKind::JsonTree);
        assert_eq!(settings.concurrency, ConcurrencyAdapter::None);
        assert!(!settings.logging);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env = vars(&[
            (ENV_ENDPOINT, "https://override.example.com/"),
            (ENV_CONNECT_TIMEOUT, "30"),
            (ENV_LOGGING, "true"),
        ]);
        let mut settings = ClientSettings::default();
        settings.apply_overrides_from(|name| env.get(name).cloned()).unwrap();

        assert_eq!(settings.endpoint.as_deref(), Some("https://override.example.com/"));
        assert_eq!(settings.timeout_settings().connect, Duration::from_secs(30));
        assert_eq!(settings.timeout_settings().read, Duration::from_secs(10));
        assert!(settings.logging);
    }

    #[test]
    fn test_bad_override_value() {
        let env = vars(&[(ENV_READ_TIMEOUT, "soon")]);
        let mut settings = ClientSettings::default();
        let result = settings.apply_overrides_from(|name| env.get(name).cloned());

        match result {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, ENV_READ_TIMEOUT);
                assert_eq!(value, "soon");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let mut settings = ClientSettings::default();
        settings.timeouts.write_secs = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_blank_endpoint_fails_validation() {
        let settings = ClientSettings {
            endpoint: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_serialization_kind_mapping() {
        assert_eq!(SerializationKind::Typed.to_strategy().name(), "typed");
        assert_eq!(SerializationKind::Yaml.to_strategy().name(), "custom");
    }
}
