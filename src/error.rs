//! Unified error types for the broadcaster.
//!
//! [`BroadcastError`] covers everything that can stop the process before or
//! around serving (config loading, validation, logging, binding).
//! [`ForwardError`] describes a single failed backend call; its `Display`
//! text is what the caller sees when the primary backend fails.
//! [`ValidationError`] is one config problem, with an optional hint.

use std::path::PathBuf;

use crate::config::model::EndpointId;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub(crate) fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BroadcastError {
    #[error("No config file found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Cannot open log file {}: {source}", path.display())]
    LogDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install logger: {0}")]
    LoggerInstall(#[from] tracing::dispatcher::SetGlobalDefaultError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one outbound backend call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ForwardError {
    #[error("request to backend '{endpoint}' ({target}) failed: {detail}")]
    Transport {
        endpoint: EndpointId,
        target: String,
        detail: String,
    },

    #[error("could not build request for backend '{endpoint}': {detail}")]
    InvalidRequest { endpoint: EndpointId, detail: String },

    #[error("backend '{endpoint}' task ended without an outcome")]
    Abandoned { endpoint: EndpointId },
}

/// Render an error and all of its sources as `outer: inner: root`.
///
/// hyper's client errors are terse at the top level ("client error
/// (Connect)"); the useful part is further down the chain.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = inner.source();
    }
    rendered
}
