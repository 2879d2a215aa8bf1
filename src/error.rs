// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;

/// Errors raised while building a [Backend](crate::Backend) from configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to read logging config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid logging config: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("logger {logger:?} refers to unknown handler {handler:?}")]
    UnknownHandler { logger: String, handler: String },
    #[error("handler {handler:?} refers to unknown formatter {formatter:?}")]
    UnknownFormatter { handler: String, formatter: String },
    #[error("handler {handler:?} has unknown class {class:?}")]
    UnknownHandlerClass { handler: String, class: String },
}
