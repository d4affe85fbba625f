//! Configuration loading and validation.
//!
//! Config files are read asynchronously, deserialized according to their
//! extension (YAML, JSON or TOML, each behind a cargo feature), and
//! validated into a [`BroadcastConfig`](model::BroadcastConfig).

pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::BroadcastError;
use model::{BroadcastConfig, Config};

/// File names probed in the working directory when no config is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "broadcaster.yaml",
    "broadcaster.yml",
    "broadcaster.json",
    "broadcaster.toml",
];

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, BroadcastError> {
    let parse_error = |source: Box<dyn std::error::Error + Send + Sync>| {
        BroadcastError::ConfigParse {
            path: path_display.to_string(),
            source,
        }
    };

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        other => Err(BroadcastError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse and validate config text in one step.
pub fn from_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<BroadcastConfig, BroadcastError> {
    let config = parse_config_str(ext, content, path_display)?;
    validation::validate(&config).map_err(|errors| BroadcastError::ConfigValidation { errors })
}

/// Read, parse and validate a config file.
pub async fn load_file(path: &Path) -> Result<BroadcastConfig, BroadcastError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BroadcastError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            BroadcastError::Io(e)
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    from_str(ext, &content, &path.display().to_string())
}

/// Use the explicit path if given, otherwise the first default file that exists.
pub async fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, BroadcastError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    for name in DEFAULT_CONFIG_FILES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Ok(path);
        }
    }

    Err(BroadcastError::NoConfigSource {
        hint: "Provide --config <file> or create ./broadcaster.yaml.".into(),
    })
}
