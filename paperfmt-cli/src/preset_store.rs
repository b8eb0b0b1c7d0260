//! Preset Store - user formatting presets on disk
//!
//! Presets are YAML files named `<preset>.yaml` in the user's config
//! directory. They are loaded next to the built-in presets on every run.

use paperfmt_core::{ConfigManager, FormatConfig, FormatError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUILTIN_PRESETS: [&str; 2] = ["default", "chinese-thesis"];

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("Invalid preset name '{0}' (use letters, digits, '-' and '_')")]
    InvalidName(String),

    #[error("'{0}' is a built-in preset and cannot be replaced or deleted")]
    Builtin(String),

    #[error("Preset '{0}' not found")]
    NotFound(String),

    #[error("Preset '{name}' is invalid: {source}")]
    Invalid {
        name: String,
        #[source]
        source: FormatError,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PresetError>;

/// Manages user presets for the CLI
pub struct PresetStore {
    /// e.g. ~/.config/paperfmt/presets
    presets_dir: PathBuf,
}

impl PresetStore {
    /// Store in the default user config directory
    pub fn new() -> Result<Self> {
        let base = dirs::config_dir().ok_or(PresetError::NoConfigDir)?;
        Ok(Self::with_dir(base.join("paperfmt").join("presets")))
    }

    pub fn with_dir(presets_dir: impl Into<PathBuf>) -> Self {
        Self {
            presets_dir: presets_dir.into(),
        }
    }

    pub fn presets_dir(&self) -> &Path {
        &self.presets_dir
    }

    fn preset_path(&self, name: &str) -> PathBuf {
        self.presets_dir.join(format!("{name}.yaml"))
    }

    /// Names of stored presets, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.presets_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.presets_dir).map_err(|source| PresetError::Io {
            path: self.presets_dir.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("yaml"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<FormatConfig> {
        validate_name(name)?;
        let path = self.preset_path(name);
        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }
        FormatConfig::load_from_file(&path).map_err(|source| PresetError::Invalid {
            name: name.to_string(),
            source,
        })
    }

    /// Store `config` under its spec name.
    pub fn save(&self, config: &FormatConfig) -> Result<PathBuf> {
        let name = config.spec.name.as_str();
        validate_name(name)?;
        if BUILTIN_PRESETS.contains(&name) {
            return Err(PresetError::Builtin(name.to_string()));
        }
        config.spec.validate().map_err(|source| PresetError::Invalid {
            name: name.to_string(),
            source,
        })?;

        fs::create_dir_all(&self.presets_dir).map_err(|source| PresetError::Io {
            path: self.presets_dir.clone(),
            source,
        })?;

        let yaml = config.to_yaml_string().map_err(|source| PresetError::Invalid {
            name: name.to_string(),
            source,
        })?;
        let path = self.preset_path(name);
        fs::write(&path, yaml).map_err(|source| PresetError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("💾 Saved preset '{}' to {}", name, path.display());
        Ok(path)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        if BUILTIN_PRESETS.contains(&name) {
            return Err(PresetError::Builtin(name.to_string()));
        }
        let path = self.preset_path(name);
        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }
        fs::remove_file(&path).map_err(|source| PresetError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("🗑️  Deleted preset '{}'", name);
        Ok(())
    }

    /// Register every readable stored preset with `manager`. Broken files are
    /// logged and skipped.
    pub fn load_into(&self, manager: &mut ConfigManager) -> Result<usize> {
        let mut loaded = 0;
        for name in self.list()? {
            match self.load(&name) {
                Ok(mut config) => {
                    // The file name is the preset's identity
                    config.spec.name = name;
                    manager.insert(config);
                    loaded += 1;
                }
                Err(e) => log::warn!("⚠️  Skipping preset: {e}"),
            }
        }
        Ok(loaded)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PresetError::InvalidName(name.to_string()))
    }
}
