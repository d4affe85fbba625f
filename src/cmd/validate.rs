//! `broadcaster validate`: check a configuration file for errors.
//!
//! Parses and validates the config file, reporting results in either
//! human-readable text or machine-readable JSON format.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::{self, validation};
use crate::error::BroadcastError;

pub async fn execute(args: &ValidateArgs) -> Result<(), BroadcastError> {
    let path = &args.config;

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BroadcastError::ConfigFileNotFound { path: path.clone() }
        } else {
            BroadcastError::Io(e)
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parsed = config::parse_config_str(ext, &content, &path.display().to_string())?;

    let config = match validation::validate(&parsed) {
        Ok(config) => config,
        Err(errors) => {
            match args.format {
                ValidateFormat::Text => {
                    eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                    for error in &errors {
                        eprintln!("{error}");
                    }
                }
                ValidateFormat::Json => {
                    let json_errors: Vec<serde_json::Value> = errors
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "field": e.field,
                                "message": e.message,
                                "suggestion": e.suggestion,
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::json!({
                            "valid": false,
                            "errors": json_errors,
                        })
                    );
                }
            }
            return Err(BroadcastError::ConfigValidation { errors });
        }
    };

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&path.display().to_string(), &config)
            );
        }
        ValidateFormat::Json => {
            let secondaries: Vec<&str> = config.secondaries().map(|(id, _)| id.as_str()).collect();
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "port": config.port(),
                    "primary": config.primary().as_str(),
                    "secondaries": secondaries,
                    "response_timeout_secs": config.response_timeout().as_secs(),
                })
            );
        }
    }

    Ok(())
}
