//! Configuration file helpers
//!
//! Configuration is plain JSON. A project-level file in the working
//! directory overrides a user-level file under `~/.config/agent-rs/`.
//! String values may reference environment variables as `${VAR}` or `$VAR`.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while locating, reading or parsing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid for the target type
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A `${VAR}` reference points to an unset variable
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Home directory could not be determined
    #[error("HOME or USERPROFILE not set")]
    NoHomeDir,

    /// Semantic validation failed
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration helpers
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Directory holding user-level configuration (`~/.config/agent-rs`)
pub fn user_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| ConfigError::NoHomeDir)?;

    Ok(PathBuf::from(home).join(".config").join("agent-rs"))
}

/// Read and deserialize a JSON file, resolving environment references first
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut value: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    resolve_env_value(&mut value)?;

    serde_json::from_value(value).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a JSON file if it exists; a missing file yields `None`
pub fn load_json_optional<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Option<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    load_json(path).map(Some)
}

/// Merge `overlay` into `base` key by key; nested objects merge recursively
///
/// Scalars and arrays in `overlay` replace those in `base`.
pub fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn resolve_env_value(value: &mut serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::String(s) if s.contains('$') => {
            *s = resolve_env_string(s)?;
        }
        serde_json::Value::Array(items) => {
            for item in items {
                resolve_env_value(item)?;
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                resolve_env_value(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Replace `${VAR}` and `$VAR` references with environment values
///
/// # Example
///
/// ```
/// # use agent_utils::config::resolve_env_string;
/// let home = std::env::var("HOME").unwrap_or_default();
/// # if !home.is_empty() {
/// assert_eq!(resolve_env_string("${HOME}/x")?, format!("{home}/x"));
/// # }
/// # Ok::<(), agent_utils::config::ConfigError>(())
/// ```
pub fn resolve_env_string(s: &str) -> Result<String> {
    resolve_with(s, |name| std::env::var(name).ok())
}

/// Single pass over `s`; substituted values are never re-scanned
fn resolve_with(s: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    let mut result = String::with_capacity(s.len());
    let mut last = 0;
    for cap in re.captures_iter(s) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1).or_else(|| cap.get(2))) else {
            continue;
        };
        let value = lookup(name.as_str())
            .ok_or_else(|| ConfigError::EnvVarNotFound(name.as_str().to_string()))?;
        result.push_str(&s[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&s[last..]);

    Ok(result)
}
