use std::error::Error;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::remote::BackendConfig;

pub const BACKEND_URL_ENV: &str = "HEMPAPP_BACKEND_URL";
pub const BACKEND_KEY_ENV: &str = "HEMPAPP_BACKEND_KEY";
pub const ADVISOR_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Auto,
    Always,
    Never,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Auto => "auto",
            Theme::Always => "always",
            Theme::Never => "never",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Theme::Auto),
            "always" => Ok(Theme::Always),
            "never" => Ok(Theme::Never),
            _ => Err(SettingsError::InvalidValue(format!(
                "invalid theme '{}': expected auto, always, or never",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorSettings {
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.2,
        }
    }
}

/// The browser build kept these as local-storage overrides; here they
/// live in a TOML file next to the cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub theme: Theme,
    pub advisor: AdvisorSettings,
}

impl Settings {
    /// Missing file is a valid state and yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Resolve the backend pair: the settings-file override wins, the
    /// environment is the fallback. `None` means local-only mode.
    pub fn resolve_backend(&self) -> Option<BackendConfig> {
        let from_settings = match (self.backend_url.as_deref(), self.backend_key.as_deref()) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Some(BackendConfig::new(url, key))
            }
            _ => None,
        };
        if from_settings.is_some() {
            return from_settings;
        }

        let url = std::env::var(BACKEND_URL_ENV).ok()?;
        let key = std::env::var(BACKEND_KEY_ENV).ok()?;
        if url.trim().is_empty() || key.trim().is_empty() {
            return None;
        }
        Some(BackendConfig::new(&url, &key))
    }

    /// Advisor key: settings value first, environment second.
    pub fn resolve_advisor_key(&self) -> Option<String> {
        if let Some(key) = self.advisor.api_key.as_deref() {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }
        std::env::var(ADVISOR_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Keep only the tail of a secret for display.
pub fn redact_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(err) => write!(f, "I/O error: {}", err),
            SettingsError::Parse(err) => write!(f, "invalid settings TOML: {}", err),
            SettingsError::Serialize(err) => write!(f, "settings serialization failed: {}", err),
            SettingsError::InvalidValue(message) => write!(f, "{}", message),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SettingsError::Io(err) => Some(err),
            SettingsError::Parse(err) => Some(err),
            SettingsError::Serialize(err) => Some(err),
            SettingsError::InvalidValue(_) => None,
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(value: std::io::Error) -> Self {
        SettingsError::Io(value)
    }
}

impl From<toml::de::Error> for SettingsError {
    fn from(value: toml::de::Error) -> Self {
        SettingsError::Parse(value)
    }
}

impl From<toml::ser::Error> for SettingsError {
    fn from(value: toml::ser::Error) -> Self {
        SettingsError::Serialize(value)
    }
}
