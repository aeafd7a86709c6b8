// tagshelf Settings Engine
// Loads, saves and updates application settings. Settings are stored as a JSON
// file at the platform config path; a few environment variables override the file.

use std::env;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::{AppSettings, StoreBackend};

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Values taken from the environment, kept apart from the file contents.
#[derive(Debug, Clone, Default)]
struct EnvOverrides {
    backend: Option<StoreBackend>,
    database_path: Option<String>,
    remote_url: Option<String>,
    scoring_url: Option<String>,
}

impl EnvOverrides {
    fn apply_to(&self, settings: &mut AppSettings) {
        if let Some(backend) = self.backend {
            settings.storage.backend = backend;
        }
        if let Some(path) = &self.database_path {
            settings.storage.database_path = Some(path.clone());
        }
        if let Some(url) = &self.remote_url {
            settings.storage.remote.base_url = url.clone();
        }
        if let Some(url) = &self.scoring_url {
            settings.scoring.function_url = Some(url.clone());
        }
    }
}

/// Settings engine implementation that persists settings as JSON on disk.
///
/// `file_settings` mirrors the config file and is the only thing written back;
/// `settings` is the effective view with environment overrides on top.
pub struct SettingsEngine {
    config_path: String,
    file_settings: AppSettings,
    settings: AppSettings,
    overrides: EnvOverrides,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses `settings.json` in the platform config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            file_settings: AppSettings::default(),
            settings: AppSettings::default(),
            overrides: EnvOverrides::default(),
        }
    }

    /// Replaces the file-backed settings and recomputes the effective view.
    fn set_file_settings(&mut self, settings: AppSettings) {
        let mut effective = settings.clone();
        self.overrides.apply_to(&mut effective);
        self.file_settings = settings;
        self.settings = effective;
    }

    /// Applies environment overrides on top of the loaded settings.
    ///
    /// Overrides are not written back to disk by a later `save`; they are
    /// re-applied on every start.
    ///
    /// - `TAGSHELF_BACKEND`: `memory`, `sqlite` or `remote`
    /// - `TAGSHELF_DATABASE`: SQLite file path
    /// - `TAGSHELF_REMOTE_URL`: hosted record API base URL
    /// - `TAGSHELF_SCORING_URL`: deployed scoring function URL
    pub fn apply_env_overrides(&mut self) -> &AppSettings {
        let var = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());

        let mut overrides = EnvOverrides::default();
        if let Some(backend) = var("TAGSHELF_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    info!(backend = %backend, "store backend overridden from environment");
                    overrides.backend = Some(parsed);
                }
                Err(e) => warn!("ignoring TAGSHELF_BACKEND: {}", e),
            }
        }
        overrides.database_path = var("TAGSHELF_DATABASE");
        overrides.remote_url = var("TAGSHELF_REMOTE_URL");
        overrides.scoring_url = var("TAGSHELF_SCORING_URL");

        self.overrides = overrides;
        let file_settings = self.file_settings.clone();
        self.set_file_settings(file_settings);
        &self.settings
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.set_file_settings(AppSettings::default());
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.set_file_settings(settings);
        Ok(self.settings.clone())
    }

    /// Saves the file-backed settings to the JSON config file, creating parent
    /// directories. Environment overrides are never written.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.file_settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Updates an individual setting by dot-notation key path and saves to disk.
    ///
    /// The new value must deserialize into the field's type, e.g.
    /// `"storage.backend"` accepts `"sqlite"`, `"scoring.max_tokens"` accepts `300`.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        let parts: Vec<&str> = key.split('.').collect();

        let mut json_value = serde_json::to_value(&self.file_settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        {
            let mut current = &mut json_value;
            let (last, parents) = parts
                .split_last()
                .ok_or_else(|| SettingsError::InvalidKey("Key cannot be empty".to_string()))?;

            for part in parents {
                current = current.get_mut(*part).ok_or_else(|| {
                    SettingsError::InvalidKey(format!("Key '{}' not found in settings", key))
                })?;
            }

            match current {
                serde_json::Value::Object(map) if map.contains_key(*last) => {
                    map.insert(last.to_string(), value);
                }
                serde_json::Value::Object(_) => {
                    return Err(SettingsError::InvalidKey(format!(
                        "Key '{}' not found in settings",
                        key
                    )));
                }
                _ => {
                    return Err(SettingsError::InvalidKey(format!(
                        "Cannot navigate to key '{}': intermediate value is not an object",
                        key
                    )));
                }
            }
        }

        // Deserialize back to validate the new value
        let new_settings: AppSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.set_file_settings(new_settings);
        self.save()
    }

    /// Resets all settings to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.set_file_settings(AppSettings::default());
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
