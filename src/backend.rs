// SPDX-License-Identifier: MIT OR Apache-2.0

//! The logging backend handle.
//!
//! A [Backend] owns every named [LogSink] and the handlers attached to them. It is
//! built once, usually with [Backend::create_logs], and then passed to whatever needs
//! to log: timers take emitters from its sinks, thread contexts take a sink.
//!
//! Three sinks always exist: `root`, `console` and `debug`.
//!
//! # Examples
//!
//! ## From the configuration files
//!
//! ```no_run
//! use timewise::Backend;
//!
//! let backend = Backend::create_logs(None)?;
//! backend.console().info("configured");
//! # Ok::<(), timewise::Error>(())
//! ```
//!
//! ## For tests
//!
//! ```
//! use timewise::{Backend, InMemoryLogger, Level};
//! use std::sync::Arc;
//!
//! let backend = Backend::bare();
//! let store = Arc::new(InMemoryLogger::new());
//! backend.debug().add_handler(store.clone());
//! backend.debug().debug("captured");
//! assert_eq!(store.count_levels(Some(Level::Debug)), 1);
//! ```

use crate::config::{
    Environment, LoggingConfig, SinkConfig, import_config, local_config_present, set_module_name,
};
use crate::error::Error;
use crate::formatter::Formatter;
use crate::inmemory_logger::InMemoryLogger;
use crate::level::Level;
use crate::log_sink::LogSink;
use crate::logger::Logger;
use crate::stderror_logger::StdErrorLogger;
use crate::timer::TimerBuilder;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const ROOT: &str = "root";
pub const CONSOLE: &str = "console";
pub const DEBUG: &str = "debug";

/// Logged through `root` when the built-in configuration is used.
pub const DEFAULT_CONFIG_NOTICE: &str =
    "No logging.yaml in the root of the project, using the default config.";

#[derive(Debug, Clone)]
pub struct Backend {
    root: Arc<LogSink>,
    console: Arc<LogSink>,
    debug: Arc<LogSink>,
    sinks: BTreeMap<String, Arc<LogSink>>,
    memory_handlers: BTreeMap<String, Arc<InMemoryLogger>>,
}

impl Backend {
    /// The three default sinks at [Level::Debug], with no handlers.
    pub fn bare() -> Self {
        let root = Arc::new(LogSink::new(ROOT, Level::Debug));
        let console = Arc::new(LogSink::new(CONSOLE, Level::Debug));
        let debug = Arc::new(LogSink::new(DEBUG, Level::Debug));
        let sinks = [&root, &console, &debug]
            .into_iter()
            .map(|sink| (sink.name().to_string(), Arc::clone(sink)))
            .collect();
        Self {
            root,
            console,
            debug,
            sinks,
            memory_handlers: BTreeMap::new(),
        }
    }

    /// Builds sinks and handlers from `config`.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, Error> {
        let mut backend = Self::bare();
        let mut handlers: BTreeMap<String, Arc<dyn Logger>> = BTreeMap::new();
        for (name, handler) in &config.handlers {
            let level = handler.level.unwrap_or_default();
            let formatter = match &handler.formatter {
                None => Formatter::default(),
                Some(formatter) => config
                    .formatters
                    .get(formatter)
                    .map(|found| Formatter::from(&found.format))
                    .ok_or_else(|| Error::UnknownFormatter {
                        handler: name.clone(),
                        formatter: formatter.clone(),
                    })?,
            };
            let built: Arc<dyn Logger> = match handler.class.as_str() {
                "stderr" => Arc::new(StdErrorLogger::with_formatter(formatter, level)),
                "memory" => {
                    let memory = Arc::new(InMemoryLogger::with_level(level));
                    backend.memory_handlers.insert(name.clone(), memory.clone());
                    memory
                }
                other => {
                    return Err(Error::UnknownHandlerClass {
                        handler: name.clone(),
                        class: other.to_string(),
                    });
                }
            };
            handlers.insert(name.clone(), built);
        }

        let mut sink_configs: Vec<(String, &SinkConfig)> = config
            .loggers
            .iter()
            .map(|(name, sink_config)| (name.clone(), sink_config))
            .collect();
        if let Some(root) = &config.root {
            sink_configs.push((ROOT.to_string(), root));
        }
        for (name, sink_config) in sink_configs {
            let sink = backend
                .sinks
                .entry(name.clone())
                .or_insert_with(|| Arc::new(LogSink::new(name.as_str(), Level::Debug)))
                .clone();
            sink.set_level(sink_config.level.unwrap_or_default());
            for handler in &sink_config.handlers {
                let found = handlers.get(handler).ok_or_else(|| Error::UnknownHandler {
                    logger: name.clone(),
                    handler: handler.clone(),
                })?;
                sink.add_handler(found.clone());
            }
        }
        Ok(backend)
    }

    /**
    Loads, configures and returns the backend.

    `config` defaults to [import_config]. The environment names are read with
    [Environment::from_std_env] and injected into the fluent formatters; every missing
    name is logged as a warning through `root`.
    */
    pub fn create_logs(config: Option<LoggingConfig>) -> Result<Self, Error> {
        let config = match config {
            Some(config) => config,
            None => import_config()?,
        };
        Self::create_logs_with(config, &Environment::from_std_env(), local_config_present())
    }

    /// [Backend::create_logs] with the environment and file lookup supplied by the caller.
    pub fn create_logs_with(
        config: LoggingConfig,
        env: &Environment,
        local_config_present: bool,
    ) -> Result<Self, Error> {
        let config = set_module_name(config, env);
        let backend = Self::from_config(&config)?;
        for warning in env.missing_warnings() {
            backend.root().warning(warning);
        }
        if !local_config_present {
            backend.root().info(DEFAULT_CONFIG_NOTICE);
        }
        Ok(backend)
    }

    pub fn sink(&self, name: &str) -> Option<&Arc<LogSink>> {
        self.sinks.get(name)
    }

    pub fn sink_names(&self) -> impl Iterator<Item = &str> {
        self.sinks.keys().map(String::as_str)
    }

    pub fn root(&self) -> &Arc<LogSink> {
        &self.root
    }

    pub fn console(&self) -> &Arc<LogSink> {
        &self.console
    }

    pub fn debug(&self) -> &Arc<LogSink> {
        &self.debug
    }

    /// A handler configured with `class: memory`.
    pub fn memory_handler(&self, name: &str) -> Option<&Arc<InMemoryLogger>> {
        self.memory_handlers.get(name)
    }

    /// A timer builder that logs to `console` at [Level::Warning].
    pub fn timer(&self) -> TimerBuilder {
        TimerBuilder::default().logger(self.console().emitter(Level::Warning))
    }

    /// Asks every handler of every sink to flush.
    pub fn prepare_to_die(&self) {
        for sink in self.sinks.values() {
            sink.prepare_to_die();
        }
    }
}
