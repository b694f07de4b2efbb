use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "skilldex";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum number of cached query results
    #[serde(default = "default_cache_max_size")]
    pub cache_max_size: usize,

    /// Seconds a cached result stays valid after insertion
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Result limit used when the caller does not give one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Scalar parameters shown in each action summary
    #[serde(default = "default_summary_params")]
    pub summary_params: usize,

    /// Write the snapshot artifact after each build
    #[serde(default = "default_true")]
    pub persist_snapshot: bool,

    /// Parse corpus files on the rayon pool
    #[serde(default = "default_true")]
    pub parallel_parse: bool,

    /// Where snapshot artifacts live; defaults to `<app data>/indexes`
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
}

fn default_cache_max_size() -> usize {
    100
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_limit() -> usize {
    50
}

fn default_summary_params() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_max_size: default_cache_max_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            default_limit: default_limit(),
            summary_params: default_summary_params(),
            persist_snapshot: true,
            parallel_parse: true,
            artifact_dir: None,
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Directory holding the snapshot artifact for `corpus_root`
    pub fn artifact_dir_for(&self, corpus_root: &Path) -> Result<PathBuf> {
        match &self.artifact_dir {
            Some(base) => Ok(base.join(hash_path(corpus_root))),
            None => get_index_dir(corpus_root),
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Get the artifact directory for a specific corpus root
pub fn get_index_dir(corpus_root: &Path) -> Result<PathBuf> {
    let indexes_dir = get_app_data_dir()?.join("indexes");
    Ok(indexes_dir.join(hash_path(corpus_root)))
}

/// Readable, collision-resistant folder name for a corpus path.
/// Format: up to 16 chars of the dir name + hash of the full path
fn hash_path(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let dir_name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("corpus");
    let sanitized: String = dir_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(16)
        .collect();

    let mut hasher = DefaultHasher::new();
    canonical.to_string_lossy().hash(&mut hasher);

    format!("{}-{:016x}", sanitized, hasher.finish())
}
