//! Configuration for barcoder.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (BARCODER_HOME, BARCODER_ARTIFACT_DIR, BARCODER_BIND)
//! 2. Config file (.barcoder/config.yaml)
//! 3. Defaults (~/.barcoder, artifacts in ~/.barcoder/static/Barcodes)
//!
//! Config file discovery:
//! - Searches current directory and parents for .barcoder/config.yaml
//! - `artifact_dir` is relative to the project root (parent of .barcoder/)
//! - `home` is relative to the .barcoder/ directory
//!
//! The cipher key is not part of the cached configuration. It is read from
//! BARCODER_KEY by [`cipher_key`] at startup, or generated when absent.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::barcode::RenderOptions;
use crate::cipher::CipherKey;

/// Environment variable holding the base64 cipher key
pub const KEY_ENV: &str = "BARCODER_KEY";

const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub render: Option<RenderConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .barcoder/)
    pub home: Option<String>,
    /// Artifact directory (relative to the project root)
    pub artifact_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Draw the serial number under the bars
    #[serde(default = "default_show_text")]
    pub show_text: bool,
    #[serde(flatten)]
    pub options: RenderOptions,
}

fn default_show_text() -> bool {
    true
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// barcoder home (state directory)
    pub home: PathBuf,
    /// Directory holding rendered barcodes
    pub artifact_dir: PathBuf,
    /// HTTP bind address
    pub bind: String,
    /// Raster layout
    pub render: RenderOptions,
    /// Draw the serial number under the bars
    pub show_text: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".barcoder").join("config.yaml");
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

/// Resolve configuration from an env lookup and an optional config file
fn resolve_config(
    env: impl Fn(&str) -> Option<String>,
    config_file: Option<PathBuf>,
) -> Result<ResolvedConfig> {
    let default_home = || -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".barcoder"))
    };

    let parsed = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    let (home, artifact_dir, bind, render, show_text) = match (&config_file, parsed) {
        (Some(config_path), Some(config)) => {
            // .barcoder/
            let barcoder_dir = config_path.parent().unwrap_or(Path::new("."));
            // project root
            let base_dir = barcoder_dir.parent().unwrap_or(Path::new("."));

            let home = if let Some(env_home) = env("BARCODER_HOME") {
                PathBuf::from(env_home)
            } else if let Some(ref home_path) = config.paths.home {
                resolve_path(barcoder_dir, home_path)
            } else {
                default_home()?
            };

            let artifact_dir = if let Some(env_dir) = env("BARCODER_ARTIFACT_DIR") {
                PathBuf::from(env_dir)
            } else if let Some(ref dir) = config.paths.artifact_dir {
                resolve_path(base_dir, dir)
            } else {
                home.join("static").join("Barcodes")
            };

            let bind = env("BARCODER_BIND")
                .or_else(|| config.server.as_ref().and_then(|s| s.bind.clone()))
                .unwrap_or_else(|| DEFAULT_BIND.to_string());

            let (render, show_text) = match config.render {
                Some(render) => (render.options, render.show_text),
                None => (RenderOptions::default(), default_show_text()),
            };

            (home, artifact_dir, bind, render, show_text)
        }
        _ => {
            // No config file - use env vars or defaults
            let home = match env("BARCODER_HOME") {
                Some(home) => PathBuf::from(home),
                None => default_home()?,
            };

            let artifact_dir = env("BARCODER_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join("static").join("Barcodes"));

            let bind = env("BARCODER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());

            (home, artifact_dir, bind, RenderOptions::default(), default_show_text())
        }
    };

    Ok(ResolvedConfig {
        home,
        artifact_dir,
        bind,
        render,
        show_text,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    resolve_config(|name| std::env::var(name).ok(), find_config_file())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Load the process cipher key from BARCODER_KEY, or generate one.
///
/// A generated key lives only in memory; restarting the process replaces it.
pub fn cipher_key() -> Result<CipherKey> {
    key_from_env(std::env::var(KEY_ENV).ok())
}

/// Whether BARCODER_KEY supplies the key; a blank value does not
pub fn key_from_environment() -> bool {
    configured_key(std::env::var(KEY_ENV).ok()).is_some()
}

fn configured_key(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn key_from_env(value: Option<String>) -> Result<CipherKey> {
    match configured_key(value) {
        Some(encoded) => {
            let key = CipherKey::from_encoded(&encoded)
                .with_context(|| format!("Failed to parse {}", KEY_ENV))?;
            info!(fingerprint = %key.fingerprint(), "Loaded cipher key from environment");
            Ok(key)
        }
        None => {
            let key = CipherKey::generate();
            warn!(
                fingerprint = %key.fingerprint(),
                "{} not set, generated an ephemeral cipher key", KEY_ENV
            );
            Ok(key)
        }
    }
}
