//! Server configuration.
//!
//! Loaded once at startup into a [`ServerConfig`] value that is handed to
//! every component by reference. Nothing reads configuration from globals.
//!
//! ## File
//!
//! `proofsheet.json` in the working directory unless `--config` points
//! elsewhere. A path ending in `.toml` is read and written as TOML.
//!
//! ```json
//! {
//!   "base_dir": ".",
//!   "cache_dir": "/tmp",
//!   "thumb_size": 100,
//!   "view_size": 480,
//!   "thumb_crop": "square",
//!   "view_crop": "fit",
//!   "catch_all": false,
//!   "listen": "0.0.0.0:8781",
//!   "quality": 75,
//!   "engine": {
//!     "kind": "native",
//!     "filter": "nearest",
//!     "command": "convert"
//!   }
//! }
//! ```
//!
//! `workers` is optional; when absent the request pool uses one thread per
//! CPU core.
//!
//! ## Loading rules
//!
//! Config files are sparse: missing keys take their defaults. After a
//! successful load the merged result is written back, so the file always
//! documents every setting. A missing file is created from defaults. A file
//! that cannot be read, parsed, or validated is left alone and the server
//! starts on defaults; configuration problems are never fatal.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{CropMode, Filter, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "proofsheet.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Which resize engine produces derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Native,
    External,
}

/// Resize engine selection and tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// `native` (in-process `image` crate) or `external` (ImageMagick).
    pub kind: EngineKind,
    /// Resampling filter for the native engine.
    pub filter: Filter,
    /// Binary invoked by the external engine.
    pub command: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Native,
            filter: Filter::Nearest,
            command: "convert".to_string(),
        }
    }
}

/// Complete server configuration.
///
/// All fields have defaults. User config files need only specify the
/// values they want to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Root of the browsable image tree. Requests can never escape it.
    pub base_dir: PathBuf,
    /// Where derivatives are stored, one file per cache key.
    pub cache_dir: PathBuf,
    /// Maximum dimension of `/thumb` derivatives.
    pub thumb_size: u32,
    /// Maximum dimension of `/small` derivatives.
    pub view_size: u32,
    /// Crop mode for `/thumb`.
    pub thumb_crop: CropMode,
    /// Crop mode for `/small`.
    pub view_crop: CropMode,
    /// Redirect unmatched routes to the gallery root instead of returning 404.
    pub catch_all: bool,
    /// Socket address the HTTP server binds.
    pub listen: String,
    /// JPEG quality of generated derivatives (1-100).
    pub quality: u8,
    /// Request worker threads. `None` means one per CPU core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            cache_dir: PathBuf::from("/tmp"),
            thumb_size: 100,
            view_size: 480,
            thumb_crop: CropMode::Square,
            view_crop: CropMode::Fit,
            catch_all: false,
            listen: "0.0.0.0:8781".to_string(),
            quality: 75,
            workers: None,
            engine: EngineConfig::default(),
        }
    }
}

/// Largest accepted `thumb_size`/`view_size`.
pub const MAX_DERIVATIVE_SIZE: u32 = 8192;

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumb_size == 0 || self.view_size == 0 {
            return Err(ConfigError::Validation(
                "thumb_size and view_size must be non-zero".into(),
            ));
        }
        if self.thumb_size > MAX_DERIVATIVE_SIZE || self.view_size > MAX_DERIVATIVE_SIZE {
            return Err(ConfigError::Validation(format!(
                "thumb_size and view_size must be at most {MAX_DERIVATIVE_SIZE}"
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Validation(
                "workers must be at least 1 when set".into(),
            ));
        }
        if self.engine.command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine.command must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Resolve the effective request worker count.
///
/// - `None` → one per available core
/// - `Some(n)` → exactly `n`; request handling blocks on I/O, so more
///   workers than cores is a reasonable choice
pub fn effective_workers(config: &ServerConfig) -> usize {
    config.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// On-disk serialization format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Parse and validate config text. Missing keys take their defaults.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    config.validate()?;
    Ok(config)
}

/// Render a config in the given format, with every key present.
pub fn render_config(config: &ServerConfig, format: ConfigFormat) -> Result<String, ConfigError> {
    let mut text = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// Load a config file.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if it exists but can't be read, parsed, or validated.
pub fn load_config(path: &Path) -> Result<Option<ServerConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content, ConfigFormat::for_path(path)).map(Some)
}

/// Write a config file in the format its extension selects.
pub fn save_config(config: &ServerConfig, path: &Path) -> Result<(), ConfigError> {
    let text = render_config(config, ConfigFormat::for_path(path))?;
    fs::write(path, text)?;
    Ok(())
}

/// Load the config at `path`, falling back to defaults on any problem.
///
/// Successful loads and missing files are persisted back so the file lists
/// every setting. A broken file is never overwritten.
pub fn load_or_init(path: &Path) -> ServerConfig {
    let config = match load_config(path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            info!("No config at {}, using defaults", path.display());
            ServerConfig::default()
        }
        Err(e) => {
            warn!(
                "Ignoring config {}: {}; continuing with defaults",
                path.display(),
                e
            );
            return ServerConfig::default();
        }
    };

    match save_config(&config, path) {
        Ok(()) => info!("Configuration saved to {}", path.display()),
        Err(e) => warn!("Could not write config {}: {}", path.display(), e),
    }
    config
}

/// Stock configuration as pretty JSON, for the `gen-config` command.
pub fn stock_config_json() -> String {
    render_config(&ServerConfig::default(), ConfigFormat::Json)
        .unwrap_or_else(|_| "{}\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.base_dir, PathBuf::from("."));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp"));
        assert_eq!(config.thumb_size, 100);
        assert_eq!(config.view_size, 480);
        assert_eq!(config.thumb_crop, CropMode::Square);
        assert_eq!(config.view_crop, CropMode::Fit);
        assert!(!config.catch_all);
        assert_eq!(config.engine.kind, EngineKind::Native);
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn parse_partial_json() {
        let config = parse_config(
            r#"{"base_dir": "/srv/photos", "thumb_size": 150}"#,
            ConfigFormat::Json,
        )
        .unwrap();

        assert_eq!(config.base_dir, PathBuf::from("/srv/photos"));
        assert_eq!(config.thumb_size, 150);
        // Unspecified keys keep defaults
        assert_eq!(config.view_size, 480);
        assert_eq!(config.engine.command, "convert");
    }

    #[test]
    fn parse_partial_toml() {
        let config = parse_config(
            r#"
view_crop = "square"

[engine]
kind = "external"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.view_crop, CropMode::Square);
        assert_eq!(config.engine.kind, EngineKind::External);
        assert_eq!(config.engine.filter, Filter::Nearest);
    }

    #[test]
    fn unknown_key_rejected() {
        let result = parse_config(r#"{"thumbsize": 100}"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn validate_zero_size() {
        let result = parse_config(r#"{"view_size": 0}"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_size_ceiling() {
        let at_limit = ServerConfig {
            view_size: MAX_DERIVATIVE_SIZE,
            ..ServerConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        let result = ServerConfig {
            thumb_size: 100_000,
            ..ServerConfig::default()
        }
        .validate();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_quality_range() {
        let result = parse_config(r#"{"quality": 0}"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
        assert!(parse_config(r#"{"quality": 100}"#, ConfigFormat::Json).is_ok());
    }

    #[test]
    fn validate_zero_workers() {
        let result = parse_config(r#"{"workers": 0}"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::for_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::for_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::for_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::for_path(Path::new("noext")), ConfigFormat::Json);
    }

    // =========================================================================
    // load_or_init
    // =========================================================================

    #[test]
    fn load_or_init_creates_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);

        let config = load_or_init(&path);
        assert_eq!(config, ServerConfig::default());
        assert!(path.exists());

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(parse_config(&written, ConfigFormat::Json).unwrap(), config);
    }

    #[test]
    fn load_or_init_merges_and_persists_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, r#"{"catch_all": true}"#).unwrap();

        let config = load_or_init(&path);
        assert!(config.catch_all);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"thumb_size\": 100"), "{written}");
        assert!(written.contains("\"catch_all\": true"), "{written}");
    }

    #[test]
    fn load_or_init_falls_back_on_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "not json").unwrap();

        let config = load_or_init(&path);
        assert_eq!(config, ServerConfig::default());
        // Broken file is left for the operator to fix
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn load_or_init_toml_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("proofsheet.toml");
        fs::write(&path, "thumb_size = 64\n").unwrap();

        let config = load_or_init(&path);
        assert_eq!(config.thumb_size, 64);

        let reloaded = load_config(&path).unwrap().unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn load_config_missing_returns_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(&tmp.path().join("nope.json")).unwrap().is_none());
    }

    // =========================================================================
    // Misc
    // =========================================================================

    #[test]
    fn effective_workers_auto_and_explicit() {
        let auto = effective_workers(&ServerConfig::default());
        assert!(auto >= 1);

        let config = ServerConfig {
            workers: Some(16),
            ..ServerConfig::default()
        };
        assert_eq!(effective_workers(&config), 16);
    }

    #[test]
    fn stock_config_json_roundtrips_to_defaults() {
        let parsed = parse_config(&stock_config_json(), ConfigFormat::Json).unwrap();
        assert_eq!(parsed, ServerConfig::default());
    }

    #[test]
    fn stock_config_omits_unset_workers() {
        assert!(!stock_config_json().contains("workers"));
    }
}
