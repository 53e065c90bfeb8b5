//! TOML configuration.
//!
//! Every section is optional:
//!
//! ```toml
//! [templates]
//! namespace = "http://example.org/templates/"
//! strict = true
//!
//! [prefixes]
//! ex = "http://example.org/"
//!
//! [serialization]
//! strict = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! modules = { "rspql_spin::dialect" = "debug" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use oxigraph::model::NamedNode;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::prefixes::PrefixMapping;
use crate::template::registry::DEFAULT_NAMESPACE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RspConfig {
    pub templates: TemplatesConfig,
    /// Merged over the built-in vocabulary prefixes.
    pub prefixes: BTreeMap<String, String>,
    pub serialization: SerializationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Namespace short template ids are resolved against.
    pub namespace: String,
    /// Report undeclared parameters as warnings.
    pub strict: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerializationConfig {
    /// Fail instead of degrading when a dialect cannot express a construct.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global level filter, e.g. `"info"`.
    pub level: String,
    pub format: LogFormat,
    /// Per-module overrides, e.g. `{ "rspql_spin::codec" = "trace" }`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
            modules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl RspConfig {
    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        contents.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if NamedNode::new(self.templates.namespace.as_str()).is_err() {
            return Err(ConfigError::InvalidTemplateNamespace(
                self.templates.namespace.clone(),
            ));
        }
        for (prefix, namespace) in &self.prefixes {
            if NamedNode::new(namespace.as_str()).is_err() {
                return Err(ConfigError::InvalidNamespace {
                    prefix: prefix.clone(),
                    namespace: namespace.clone(),
                });
            }
        }
        Ok(())
    }

    /// Built-in prefixes with the configured ones on top.
    pub fn prefix_mapping(&self) -> PrefixMapping {
        let mut mapping = PrefixMapping::with_defaults();
        for (prefix, namespace) in &self.prefixes {
            mapping.insert(prefix.as_str(), namespace.as_str());
        }
        mapping
    }
}

impl FromStr for RspConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: RspConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
