//! Configuration validation with detailed error reporting.
//!
//! [`validate`] turns a parsed [`Config`] into a [`BroadcastConfig`],
//! collecting every problem it finds (missing options, zero port or
//! timeout, empty or malformed backends, an unknown primary, bad status
//! codes) instead of stopping at the first one.

use std::collections::BTreeMap;
use std::time::Duration;

use http::StatusCode;
use url::Url;

use super::model::{BroadcastConfig, Config, EndpointId, StatusPolicy};
use crate::cli::LogLevel;
use crate::error::ValidationError;

/// Parse a backend URL. Returns the parsed URL or a human-readable error.
pub fn validate_backend_url(url: &str) -> Result<Url, String> {
    if url.trim().is_empty() {
        return Err("backend does not have any associated URL".into());
    }
    match Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(format!(
                "unsupported scheme '{scheme}' (expected http or https)"
            )),
        },
        Err(e) => Err(format!("'{url}' is not a valid absolute URL ({e})")),
    }
}

fn validate_status(
    field: &str,
    code: Option<u16>,
    errors: &mut Vec<ValidationError>,
) -> Option<StatusCode> {
    let code = code?;
    match StatusCode::from_u16(code) {
        Ok(status) => Some(status),
        Err(_) => {
            errors.push(ValidationError::new(
                field,
                format!("{code} is not a valid HTTP status code"),
            ));
            None
        }
    }
}

pub fn validate(config: &Config) -> Result<BroadcastConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let Some(options) = config.options.as_ref() else {
        errors.push(
            ValidationError::new("Options", "broadcast options are missing").with_suggestion(
                "add an Options section with Port, PrimaryEndpoint and ResponseTimeoutInSecs",
            ),
        );
        return Err(errors);
    };

    let port = match options.port {
        Some(port) if port != 0 => Some(port),
        Some(_) => {
            errors.push(ValidationError::new("Options.Port", "port must be non-zero"));
            None
        }
        None => {
            errors.push(ValidationError::new(
                "Options.Port",
                "broadcast port is missing",
            ));
            None
        }
    };

    let primary = match options.primary_endpoint.as_ref() {
        Some(id) if !id.as_str().is_empty() => Some(id.clone()),
        _ => {
            errors.push(ValidationError::new(
                "Options.PrimaryEndpoint",
                "primary endpoint is missing",
            ));
            None
        }
    };

    let response_timeout = match options.response_timeout_in_secs {
        Some(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        Some(_) => {
            errors.push(ValidationError::new(
                "Options.ResponseTimeoutInSecs",
                "response timeout must be greater than zero",
            ));
            None
        }
        None => {
            errors.push(ValidationError::new(
                "Options.ResponseTimeoutInSecs",
                "response timeout is missing",
            ));
            None
        }
    };

    let status_policy = StatusPolicy {
        primary_error: validate_status(
            "Options.PrimaryErrorStatus",
            options.primary_error_status,
            &mut errors,
        ),
        timeout: validate_status("Options.TimeoutStatus", options.timeout_status, &mut errors),
    };

    let mut backends = BTreeMap::new();
    if config.backends.is_empty() {
        errors.push(ValidationError::new(
            "Backends",
            "backends are missing or empty",
        ));
    }
    for (id, raw) in &config.backends {
        match validate_backend_url(raw) {
            Ok(url) => {
                backends.insert(id.clone(), url);
            }
            Err(msg) => errors.push(ValidationError::new(format!("Backends.{id}"), msg)),
        }
    }

    if let Some(ref primary) = primary {
        if !config.backends.is_empty() && !config.backends.contains_key(primary) {
            let known: Vec<&str> = config.backends.keys().map(EndpointId::as_str).collect();
            errors.push(
                ValidationError::new(
                    "Options.PrimaryEndpoint",
                    format!("primary backend '{primary}' is missing from the set of backends"),
                )
                .with_suggestion(format!("expected one of: {}", known.join(", "))),
            );
        }
    }

    match (port, primary, response_timeout) {
        (Some(port), Some(primary), Some(response_timeout)) if errors.is_empty() => {
            Ok(BroadcastConfig {
                port,
                primary,
                response_timeout,
                log_file: options.broadcast_log_file.clone(),
                log_level: options.log_level.clone().unwrap_or(LogLevel::Info),
                status_policy,
                backends,
            })
        }
        _ => Err(errors),
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &BroadcastConfig) -> String {
    let mut lines = vec![format!(
        "  port {}, {} backends, timeout {}s\n",
        config.port(),
        config.backends().len(),
        config.response_timeout().as_secs()
    )];

    lines.push(format!(
        "  primary    {}  -> {}",
        config.primary(),
        config.primary_url()
    ));
    for (id, url) in config.secondaries() {
        lines.push(format!("  secondary  {id}  -> {url}"));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
