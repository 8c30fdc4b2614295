//! `${VAR}` and `${VAR:default}` substitution with a prefix whitelist

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

static VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("variable pattern is valid")
});

#[derive(Debug, Error)]
pub enum EnvResolverError {
    #[error("Environment variable '{0}' not found and no default provided")]
    VarNotFound(String),
    #[error("Environment variable '{0}' is not in whitelist. Allowed prefixes: {1:?}")]
    VarNotWhitelisted(String, Vec<String>),
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves variable references inside configuration values
#[derive(Clone)]
pub struct EnvResolver {
    /// Empty means no restrictions
    allowed_prefixes: Vec<String>,
    lookup: Lookup,
}

impl fmt::Debug for EnvResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvResolver")
            .field("allowed_prefixes", &self.allowed_prefixes)
            .finish()
    }
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self::new(vec![
            "RESTKIT_".to_string(),
            "HTTP_".to_string(),
            "APP_".to_string(),
        ])
    }
}

impl EnvResolver {
    pub fn new(allowed_prefixes: Vec<String>) -> Self {
        Self {
            allowed_prefixes,
            lookup: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    pub fn unrestricted() -> Self {
        Self::new(vec![])
    }

    /// Read variables from somewhere other than the process environment
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    /// Resolve every string in `value`, recursing through objects and arrays
    pub fn resolve(&self, value: &JsonValue) -> Result<JsonValue, EnvResolverError> {
        match value {
            JsonValue::String(s) => self.resolve_string(s),
            JsonValue::Object(obj) => {
                let mut resolved = serde_json::Map::new();
                for (key, val) in obj {
                    resolved.insert(key.clone(), self.resolve(val)?);
                }
                Ok(JsonValue::Object(resolved))
            }
            JsonValue::Array(arr) => arr
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, input: &str) -> Result<JsonValue, EnvResolverError> {
        if !input.contains("${") {
            return Ok(JsonValue::String(input.to_string()));
        }

        let mut result = String::with_capacity(input.len());
        let mut last = 0;
        for caps in VAR_PATTERN.captures_iter(input) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let name = &caps[1];
            self.validate_var_name(name)?;

            let value = match (self.lookup)(name) {
                Some(value) => value,
                None => match caps.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => return Err(EnvResolverError::VarNotFound(name.to_string())),
                },
            };
            result.push_str(&input[last..whole.start]);
            result.push_str(&value);
            last = whole.end;
        }
        result.push_str(&input[last..]);

        Ok(Self::typed_value(result))
    }

    /// Scalars and structured values come back typed, everything else as a string
    fn typed_value(resolved: String) -> JsonValue {
        let looks_structured = resolved.starts_with('{') || resolved.starts_with('[');
        let looks_scalar = resolved == "true"
            || resolved == "false"
            || resolved.parse::<f64>().is_ok();
        if looks_structured || looks_scalar {
            if let Ok(parsed) = serde_json::from_str(&resolved) {
                return parsed;
            }
        }
        JsonValue::String(resolved)
    }

    fn validate_var_name(&self, var_name: &str) -> Result<(), EnvResolverError> {
        if self.allowed_prefixes.is_empty()
            || self
                .allowed_prefixes
                .iter()
                .any(|prefix| var_name.starts_with(prefix))
        {
            return Ok(());
        }

        Err(EnvResolverError::VarNotWhitelisted(
            var_name.to_string(),
            self.allowed_prefixes.clone(),
        ))
    }
}
