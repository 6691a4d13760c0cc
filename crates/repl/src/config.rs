//! REPL configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty or
//! absent file behaves the same as no configuration at all. The default
//! location is `lyra/config.toml` under the platform config directory,
//! overridable with `--config`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplConfig {
    /// Prompt shown before each input line.
    pub prompt: String,
    /// Number of history entries kept across sessions.
    pub history_limit: usize,
    /// A file of forms evaluated before the first prompt.
    pub init_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            prompt: "> ".to_string(),
            history_limit: 500,
            init_file: None,
        }
    }
}

impl ReplConfig {
    /// The platform default config path, when one can be resolved.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lyra").join("config.toml"))
    }

    /// History lives next to the config under the data directory.
    pub fn history_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("lyra").join("history"))
    }

    /// Load from `path`. A missing file yields the defaults; a file that
    /// exists but does not parse is a real error.
    pub fn load(path: &Path) -> Result<ReplConfig, String> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ReplConfig::default());
            }
            Err(e) => return Err(format!("Failed to read {}: {}", path.display(), e)),
        };
        toml::from_str(&text).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
    }
}
