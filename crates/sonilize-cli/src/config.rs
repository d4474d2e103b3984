//! Configuration file – reads/writes `~/.sonilize/config.toml`.

use serde::{Deserialize, Serialize};
use sonilize_runtime::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.sonilize/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Looped sound sources, one audio channel each.
    #[serde(default = "default_sounds")]
    pub sounds: Vec<String>,

    /// Frames that may queue up in front of the pipeline.
    #[serde(default = "default_frame_queue")]
    pub frame_queue: usize,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_sounds() -> Vec<String> {
    (1..=8).map(|i| format!("sound_{i}")).collect()
}

fn default_frame_queue() -> usize {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sounds: default_sounds(),
            frame_queue: default_frame_queue(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Check the pipeline parameters and that at least one sound exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.sounds.is_empty() {
            return Err("At least one sound must be configured".to_string());
        }
        self.pipeline.validate().map_err(|e| e.to_string())
    }
}

/// Return the path to `~/.sonilize/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".sonilize").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from disk, falling back to defaults when absent, with
/// environment overrides applied either way.
pub fn effective() -> Result<Config, String> {
    let mut cfg = match load()? {
        Some(cfg) => cfg,
        None => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `SONILIZE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SONILIZE_MAX_THINGS` | `pipeline.max_things` |
/// | `SONILIZE_EPSILON` | `pipeline.epsilon` |
/// | `SONILIZE_MIN_BLOB_SIZE` | `pipeline.min_blob_size` |
/// | `SONILIZE_MAX_DISTANCE` | `pipeline.max_distance` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SONILIZE_MAX_THINGS")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.pipeline.max_things = n;
    }
    if let Ok(v) = std::env::var("SONILIZE_EPSILON")
        && let Ok(x) = v.parse::<f32>()
    {
        cfg.pipeline.epsilon = x;
    }
    if let Ok(v) = std::env::var("SONILIZE_MIN_BLOB_SIZE")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.pipeline.min_blob_size = n;
    }
    if let Ok(v) = std::env::var("SONILIZE_MAX_DISTANCE")
        && let Ok(x) = v.parse::<f32>()
    {
        cfg.pipeline.max_distance = x;
    }
}

/// Save the config to disk, creating `~/.sonilize/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Owner read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
