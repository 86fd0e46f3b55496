use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// `prefix_N`, numbered per prefix.
    #[default]
    Sequential,
    /// `prefix_<source stem>`, de-duplicated with numeric suffixes.
    Original,
}

impl NamingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NamingMode::Sequential => "sequential",
            NamingMode::Original => "original",
        }
    }
}

impl fmt::Display for NamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sequential" => Ok(NamingMode::Sequential),
            "original" => Ok(NamingMode::Original),
            other => Err(ConfigError::InvalidNamingMode(other.to_string())),
        }
    }
}

/// Where finished transcripts are delivered. Derived from the config, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationMode {
    DocumentService,
    LocalFiles,
}

impl DestinationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DestinationMode::DocumentService => "document_service",
            DestinationMode::LocalFiles => "local_files",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DestinationMode::DocumentService => "Google Docs",
            DestinationMode::LocalFiles => "Local Markdown",
        }
    }
}

impl fmt::Display for DestinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("speech API key not configured")]
    MissingApiKey,
    #[error("invalid naming mode: {0}")]
    InvalidNamingMode(String),
}

/// Run-wide settings. Treated as immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub speech_api_key: String,
    /// Path to a service-account JSON key for the document service.
    pub credentials_path: String,
    pub folder_id: String,
    pub naming_mode: NamingMode,
    pub prefix: String,
    pub output_directory: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            speech_api_key: String::new(),
            credentials_path: String::new(),
            folder_id: String::new(),
            naming_mode: NamingMode::Sequential,
            prefix: "Transcripcion".to_string(),
            output_directory: PathBuf::from("./output"),
        }
    }
}

impl AppConfig {
    /// Document service only when both credentials and a folder are configured.
    pub fn destination(&self) -> DestinationMode {
        if !self.credentials_path.trim().is_empty() && !self.folder_id.trim().is_empty() {
            DestinationMode::DocumentService
        } else {
            DestinationMode::LocalFiles
        }
    }

    /// Checks what must hold before any job is allowed to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speech_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}

/// Masks a secret for display: `abcd***wxyz`, or `***` when too short to reveal anything.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}
