//! Serde data structures for the broadcaster configuration file, and the
//! validated form the core consumes.
//!
//! [`Config`] mirrors the file layout (`Options` + `Backends`) and keeps
//! every option optional so that validation can report all missing fields
//! at once. [`BroadcastConfig`] is only produced by
//! [`validate`](super::validation::validate) and always satisfies its
//! invariants.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::LogLevel;

/// Identifier of a backend, e.g. `B1` or `primary`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EndpointId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::borrow::Borrow<str> for EndpointId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub backends: BTreeMap<EndpointId, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_endpoint: Option<EndpointId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_in_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_log_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_error_status: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_status: Option<u16>,
}

/// Status codes written on the non-success paths.
///
/// `None` leaves the response at the server default (`200 OK`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusPolicy {
    pub primary_error: Option<StatusCode>,
    pub timeout: Option<StatusCode>,
}

/// Validated, immutable broadcast configuration.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub(super) port: u16,
    pub(super) primary: EndpointId,
    pub(super) response_timeout: Duration,
    pub(super) log_file: Option<PathBuf>,
    pub(super) log_level: LogLevel,
    pub(super) status_policy: StatusPolicy,
    pub(super) backends: BTreeMap<EndpointId, Url>,
}

impl BroadcastConfig {
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub const fn primary(&self) -> &EndpointId {
        &self.primary
    }

    #[must_use]
    pub fn is_primary(&self, id: &EndpointId) -> bool {
        *id == self.primary
    }

    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    #[must_use]
    pub const fn log_level(&self) -> &LogLevel {
        &self.log_level
    }

    #[must_use]
    pub const fn status_policy(&self) -> StatusPolicy {
        self.status_policy
    }

    #[must_use]
    pub const fn backends(&self) -> &BTreeMap<EndpointId, Url> {
        &self.backends
    }

    #[must_use]
    pub fn primary_url(&self) -> &Url {
        // Validation guarantees the primary is a backend key.
        &self.backends[self.primary.as_str()]
    }

    pub fn secondaries(&self) -> impl Iterator<Item = (&EndpointId, &Url)> {
        self.backends.iter().filter(|(id, _)| !self.is_primary(id))
    }
}
