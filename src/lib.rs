//! Broadcaster is an HTTP broadcast dispatcher.
//!
//! It accepts any HTTP request on a single port and forwards a copy to
//! every configured backend concurrently. The designated primary backend's
//! response (status, headers and body) is returned to the caller, unless it
//! fails or the response timeout elapses first, in which case the caller
//! gets an error text or `Timeout`. Secondary responses are only logged.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate).
//! - [`config`] -- Config file loading and validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`metrics`] -- Named counters and timings behind a pluggable reporter.
//! - [`proxy`] -- The broadcast engine: request rewriting, concurrent
//!   fan-out, the primary/timeout race and response writing.
//! - [`server`] -- Axum router, the pooled HTTP client, and graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All config file formats |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod server;
