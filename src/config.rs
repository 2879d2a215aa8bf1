// SPDX-License-Identifier: MIT OR Apache-2.0

//! YAML configuration and environment names.
//!
//! The configuration is a single `logging:` document:
//!
//! ```yaml
//! logging:
//!   formatters:
//!     brief:
//!       format: "{level} {name}: {message}"
//!   handlers:
//!     console:
//!       class: stderr        # or: memory
//!       level: INFO
//!       formatter: brief
//!   loggers:
//!     console:
//!       level: DEBUG
//!       handlers: [console]
//!   root:
//!     level: WARNING
//!     handlers: [console]
//! ```
//!
//! [import_config] reads `./logging.yaml` when it exists and the copy built into the
//! crate otherwise. [Environment] carries the module, repository and image names, which
//! [set_module_name] writes into every fluent formatter.

use crate::error::Error;
use crate::formatter::Formatter;
use crate::level::Level;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Location of the project-local configuration.
pub const LOCAL_CONFIG_PATH: &str = "./logging.yaml";

/// Configuration used when there is no project-local file.
pub const DEFAULT_CONFIG: &str = include_str!("../config/logging.yaml");

pub const ENV_MODULE_NAME: &str = "MODULE_NAME";
pub const ENV_GIT_REPO_NAME: &str = "GIT_REPO_NAME";
pub const ENV_DOCKER_IMAGE_NAME: &str = "DOCKER_IMAGE_NAME";

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct ConfigDocument {
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub formatters: BTreeMap<String, FormatterConfig>,
    pub handlers: BTreeMap<String, HandlerConfig>,
    pub loggers: BTreeMap<String, SinkConfig>,
    pub root: Option<SinkConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FormatterConfig {
    pub format: FormatSpec,
}

/// A template string, or a mapping of output keys to templates.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FormatSpec {
    Template(String),
    Fluent(BTreeMap<String, String>),
}

impl From<&FormatSpec> for Formatter {
    fn from(spec: &FormatSpec) -> Self {
        match spec {
            FormatSpec::Template(template) => Formatter::Template(template.clone()),
            FormatSpec::Fluent(fields) => Formatter::Fluent(fields.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HandlerConfig {
    pub class: String,
    #[serde(default)]
    pub level: Option<Level>,
    #[serde(default)]
    pub formatter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SinkConfig {
    pub level: Option<Level>,
    pub handlers: Vec<String>,
}

impl LoggingConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        let document: ConfigDocument = serde_yaml_ng::from_str(yaml)?;
        Ok(document.logging)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let yaml = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The configuration built into the crate.
    pub fn builtin() -> Result<Self, Error> {
        Self::from_yaml_str(DEFAULT_CONFIG)
    }
}

/// Whether a project-local configuration exists.
pub fn local_config_present() -> bool {
    Path::new(LOCAL_CONFIG_PATH).exists()
}

/// Loads `./logging.yaml`, falling back to the built-in configuration.
pub fn import_config() -> Result<LoggingConfig, Error> {
    if local_config_present() {
        LoggingConfig::from_path(Path::new(LOCAL_CONFIG_PATH))
    } else {
        LoggingConfig::builtin()
    }
}

/// Deployment names injected into fluent output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub module_name: String,
    pub git_repo_name: String,
    pub docker_image_name: String,
}

impl Environment {
    /// Reads the names from the process environment, after loading `.env` if present.
    pub fn from_std_env() -> Self {
        dotenvy::dotenv().ok();
        let mut map = BTreeMap::new();
        for name in [ENV_MODULE_NAME, ENV_GIT_REPO_NAME, ENV_DOCKER_IMAGE_NAME] {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }
        Self::from_env_map(&map)
    }

    /// Reads the names from `map`; absent names are empty.
    pub fn from_env_map(map: &BTreeMap<String, String>) -> Self {
        let read = |name: &str| map.get(name).cloned().unwrap_or_default();
        Self {
            module_name: read(ENV_MODULE_NAME),
            git_repo_name: read(ENV_GIT_REPO_NAME),
            docker_image_name: read(ENV_DOCKER_IMAGE_NAME),
        }
    }

    /// Warnings for every name that is empty.
    pub fn missing_warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.git_repo_name.is_empty() {
            warnings.push(
                "No GIT_REPO_NAME was given. Set the GIT_REPO_NAME environment variable; \
                 the repository name may be unavailable inside the image.",
            );
        }
        if self.docker_image_name.is_empty() {
            warnings.push(
                "No DOCKER_IMAGE_NAME was given. Set the DOCKER_IMAGE_NAME environment variable for the fluent logs.",
            );
        }
        if self.module_name.is_empty() {
            warnings.push(
                "No MODULE_NAME was given. Set the MODULE_NAME environment variable; \
                 it tells which deployment the logs come from.",
            );
        }
        warnings
    }
}

/// Writes the environment names into every fluent formatter of `config`.
pub fn set_module_name(mut config: LoggingConfig, env: &Environment) -> LoggingConfig {
    for formatter in config.formatters.values_mut() {
        if let FormatSpec::Fluent(fields) = &mut formatter.format {
            fields.insert("module_name".to_string(), env.module_name.clone());
            fields.insert("git_repo_name".to_string(), env.git_repo_name.clone());
            fields.insert("docker_image_name".to_string(), env.docker_image_name.clone());
        }
    }
    config
}
