//! Configuration for stemshelf.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (STEMSHELF_HOME, STEMSHELF_BACKEND_URL, STEMSHELF_DOWNLOADS)
//! 2. Config file (.stemshelf/config.yaml)
//! 3. Defaults (~/.stemshelf, http://localhost:8000, ~/Downloads)
//!
//! Config file discovery:
//! - Searches current directory and parents for .stemshelf/config.yaml
//! - Paths in config file are relative to the config file's parent directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::library::StoreSettings;
use crate::limits::{default_max_upload_bytes, UploadLimits};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_GRACE_SECONDS: u64 = 5;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub library: Option<LibraryConfig>,
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the processing service
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .stemshelf/)
    pub home: Option<String>,
    /// Download directory (relative to the project root)
    pub downloads: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    pub grace_window_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to stemshelf home (storage file lives here)
    pub home: PathBuf,
    /// Where downloads are saved
    pub downloads: PathBuf,
    /// Processing service base URL
    pub backend_url: String,
    /// Undo window for deletes and clears
    pub grace_window: Duration,
    /// Upload validation
    pub limits: UploadLimits,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Key-value storage file
    pub fn storage_path(&self) -> PathBuf {
        self.home.join("storage.json")
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            download_dir: self.downloads.clone(),
            grace_window: self.grace_window,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".stemshelf").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn default_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".stemshelf"))
}

fn default_downloads(home: &Path) -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| home.join("downloads"))
}

/// Merge a parsed config file with env overrides
fn resolve(config: Option<(&Path, ConfigFile)>) -> Result<ResolvedConfig> {
    let env_home = std::env::var("STEMSHELF_HOME").ok().map(PathBuf::from);
    let env_backend = std::env::var("STEMSHELF_BACKEND_URL").ok();
    let env_downloads = std::env::var("STEMSHELF_DOWNLOADS").ok().map(PathBuf::from);

    let Some((config_path, config)) = config else {
        let home = match env_home {
            Some(home) => home,
            None => default_home()?,
        };
        let downloads = env_downloads.unwrap_or_else(|| default_downloads(&home));

        return Ok(ResolvedConfig {
            home,
            downloads,
            backend_url: env_backend.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            grace_window: Duration::from_secs(DEFAULT_GRACE_SECONDS),
            limits: UploadLimits::default(),
            config_file: None,
        });
    };

    // .stemshelf/ and the project root above it
    let state_dir = config_path.parent().unwrap_or(Path::new("."));
    let base_dir = state_dir.parent().unwrap_or(Path::new("."));

    let home = match (env_home, &config.paths.home) {
        (Some(home), _) => home,
        (None, Some(home)) => resolve_path(state_dir, home),
        (None, None) => default_home()?,
    };

    let downloads = match (env_downloads, &config.paths.downloads) {
        (Some(dir), _) => dir,
        (None, Some(dir)) => resolve_path(base_dir, dir),
        (None, None) => default_downloads(&home),
    };

    let backend_url = env_backend
        .or_else(|| config.backend.as_ref().and_then(|b| b.url.clone()))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

    let grace_seconds = config
        .library
        .as_ref()
        .and_then(|l| l.grace_window_seconds)
        .unwrap_or(DEFAULT_GRACE_SECONDS);

    let limits = UploadLimits {
        max_upload_bytes: config
            .limits
            .as_ref()
            .and_then(|l| l.max_upload_bytes)
            .unwrap_or_else(default_max_upload_bytes),
    };

    Ok(ResolvedConfig {
        home,
        downloads,
        backend_url,
        grace_window: Duration::from_secs(grace_seconds),
        limits,
        config_file: Some(config_path.to_path_buf()),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            resolve(Some((&path, config)))
        }
        None => resolve(None),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
