//! Structured logging setup using the `tracing` ecosystem.
//!
//! Builds a `tracing-subscriber` with either JSON output (for production)
//! or pretty-printed output (for TTY / local dev). Format is auto-detected
//! from the terminal but can be forced via `--json` or `--pretty`.
//!
//! The subscriber is returned as a [`Dispatch`] so it can be handed to a
//! [`Broadcaster`](crate::proxy::Broadcaster) directly or installed as the
//! process-wide default with [`install`]. When a broadcast log file is
//! configured, events go to that file (appended, no ANSI colours) instead
//! of stdout.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Dispatch;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::layer::SubscriberExt;

use crate::cli::LogLevel;
use crate::error::BroadcastError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Build a subscriber writing to `log_file`, or stdout when `None`.
pub fn build(
    level: &LogLevel,
    format: LogFormat,
    log_file: Option<&Path>,
) -> Result<Dispatch, BroadcastError> {
    let filter = Targets::new().with_default(level.to_tracing_level());

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| BroadcastError::LogDestination {
                    path: path.to_path_buf(),
                    source,
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let dispatch = match format {
        LogFormat::Json => Dispatch::new(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(writer),
            ),
        ),
        LogFormat::Pretty => Dispatch::new(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .pretty()
                    .with_ansi(ansi)
                    .with_writer(writer),
            ),
        ),
    };
    Ok(dispatch)
}

pub fn install(dispatch: Dispatch) -> Result<(), BroadcastError> {
    tracing::dispatcher::set_global_default(dispatch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins() {
        assert_eq!(resolve_format(true, true), LogFormat::Json);
        assert_eq!(resolve_format(false, true), LogFormat::Json);
    }

    #[test]
    fn pretty_flag_forces_pretty() {
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn file_destination_receives_events() {
        let path = std::env::temp_dir().join(format!(
            "broadcaster-log-{}.log",
            uuid::Uuid::new_v4()
        ));
        let dispatch = build(&LogLevel::Info, LogFormat::Json, Some(&path)).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(endpoint = "B2", "primary target responded");
            tracing::debug!("filtered out at info");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(written.contains("primary target responded"));
        assert!(written.contains("\"endpoint\":\"B2\""));
        assert!(!written.contains("filtered out at info"));
    }

    #[test]
    fn unwritable_destination_is_reported() {
        let path = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("missing-dir")
            .join("broadcast.log");
        let err = build(&LogLevel::Info, LogFormat::Pretty, Some(&path)).unwrap_err();
        assert!(matches!(err, BroadcastError::LogDestination { .. }));
    }
}
