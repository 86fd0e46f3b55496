//! `.env`-backed persistence of `AppConfig`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use transcript_core::{AppConfig, ConfigError, NamingMode};
use transcript_logging::{transcript_debug, transcript_warn};

use crate::persist::{AtomicFileWriter, PersistError};

pub const KEY_SPEECH_API_KEY: &str = "DEEPGRAM_API_KEY";
pub const KEY_CREDENTIALS: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";
pub const KEY_FOLDER_ID: &str = "DRIVE_FOLDER_ID";
pub const KEY_NAMING_MODE: &str = "NAMING_MODE";
pub const KEY_PREFIX: &str = "PREFIX";
pub const KEY_OUTPUT_DIR: &str = "MARKDOWN_OUTPUT_DIR";

/// Every key this store reads and writes, in file order.
pub const CONFIG_KEYS: [&str; 6] = [
    KEY_SPEECH_API_KEY,
    KEY_CREDENTIALS,
    KEY_FOLDER_ID,
    KEY_NAMING_MODE,
    KEY_PREFIX,
    KEY_OUTPUT_DIR,
];

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("cannot read {path:?}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("cannot write config: {0}")]
    Write(#[from] PersistError),
    #[error("unknown config key {0}")]
    UnknownKey(String),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

pub trait ConfigStore: Send + Sync {
    /// Defaults for everything the store does not have.
    fn load(&self) -> Result<AppConfig, ConfigStoreError>;
    fn save(&self, config: &AppConfig) -> Result<(), ConfigStoreError>;
}

/// Reads and writes a dotenv file, leaving unrelated keys and comments alone.
#[derive(Debug, Clone)]
pub struct EnvConfigStore {
    path: PathBuf,
}

impl Default for EnvConfigStore {
    fn default() -> Self {
        Self::new(".env")
    }
}

impl EnvConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_values(&self) -> Result<HashMap<String, String>, ConfigStoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let read_error = |message: String| ConfigStoreError::Read {
            path: self.path.clone(),
            message,
        };
        let iter = dotenvy::from_path_iter(&self.path).map_err(|e| read_error(e.to_string()))?;
        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| read_error(e.to_string()))?;
            values.insert(key, value);
        }
        Ok(values)
    }

    /// Sets one key by name, e.g. from `config set PREFIX Clase`.
    pub fn set(&self, key: &str, value: &str) -> Result<AppConfig, ConfigStoreError> {
        let mut config = self.load()?;
        match key {
            KEY_SPEECH_API_KEY => config.speech_api_key = value.to_string(),
            KEY_CREDENTIALS => config.credentials_path = value.to_string(),
            KEY_FOLDER_ID => config.folder_id = value.to_string(),
            KEY_NAMING_MODE => {
                config.naming_mode = value.parse()?;
            }
            KEY_PREFIX => config.prefix = value.to_string(),
            KEY_OUTPUT_DIR => config.output_directory = PathBuf::from(value),
            other => return Err(ConfigStoreError::UnknownKey(other.to_string())),
        }
        self.save(&config)?;
        Ok(config)
    }
}

impl ConfigStore for EnvConfigStore {
    fn load(&self) -> Result<AppConfig, ConfigStoreError> {
        let values = self.read_values()?;
        let defaults = AppConfig::default();
        let get = |key: &str| values.get(key).cloned();

        let naming_mode = match get(KEY_NAMING_MODE).as_deref() {
            None | Some("") => defaults.naming_mode,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                transcript_warn!("Ignoring unknown {}={:?}", KEY_NAMING_MODE, raw);
                NamingMode::Sequential
            }),
        };

        Ok(AppConfig {
            speech_api_key: get(KEY_SPEECH_API_KEY).unwrap_or_default(),
            credentials_path: get(KEY_CREDENTIALS).unwrap_or_default(),
            folder_id: get(KEY_FOLDER_ID).unwrap_or_default(),
            naming_mode,
            prefix: get(KEY_PREFIX).unwrap_or(defaults.prefix),
            output_directory: get(KEY_OUTPUT_DIR)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_directory),
        })
    }

    fn save(&self, config: &AppConfig) -> Result<(), ConfigStoreError> {
        let existing = if self.path.exists() {
            fs::read_to_string(&self.path).map_err(|e| ConfigStoreError::Read {
                path: self.path.clone(),
                message: e.to_string(),
            })?
        } else {
            String::new()
        };

        let output_dir = config.output_directory.display().to_string();
        let updates: [(&str, &str); 6] = [
            (KEY_SPEECH_API_KEY, &config.speech_api_key),
            (KEY_CREDENTIALS, &config.credentials_path),
            (KEY_FOLDER_ID, &config.folder_id),
            (KEY_NAMING_MODE, config.naming_mode.as_str()),
            (KEY_PREFIX, &config.prefix),
            (KEY_OUTPUT_DIR, &output_dir),
        ];
        let content = merge_env(&existing, &updates);

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".env".to_string());
        AtomicFileWriter::new(dir).write(&filename, content)?;
        transcript_debug!("Saved config to {:?}", self.path);
        Ok(())
    }
}

/// Rewrites the assignments for `updates` in place and appends the missing ones.
fn merge_env(existing: &str, updates: &[(&str, &str)]) -> String {
    let mut written = vec![false; updates.len()];
    let mut lines: Vec<String> = Vec::new();

    for line in existing.lines() {
        let replaced = assignment_key(line).and_then(|key| {
            updates
                .iter()
                .position(|(name, _)| *name == key)
                .map(|idx| (idx, key))
        });
        match replaced {
            Some((idx, _)) if written[idx] => {}
            Some((idx, key)) => {
                written[idx] = true;
                lines.push(format!("{key}={}", quote_value(updates[idx].1)));
            }
            None => lines.push(line.to_string()),
        }
    }
    for (idx, (key, value)) in updates.iter().enumerate() {
        if !written[idx] {
            lines.push(format!("{key}={}", quote_value(value)));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn assignment_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, _) = trimmed.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

fn quote_value(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '@'));
    if plain {
        return value.to_string();
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}
