use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub output_dir: Option<String>,
    pub default_model: Option<String>,
    pub default_resolution: Option<String>,
    pub default_aspect_ratio: Option<String>,
    pub api_base: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_base_ms: Option<u64>,
    pub retry_max_ms: Option<u64>,
    pub bind: Option<String>,
}

pub fn load_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let raw = fs::read_to_string(path).map_err(|error| ConfigError::ReadFile {
        path: path.display().to_string(),
        message: error.to_string(),
    })?;
    parse_settings_toml(raw.as_str()).map_err(|message| ConfigError::ParseToml {
        path: path.display().to_string(),
        message,
    })
}

pub fn parse_settings_toml(raw: &str) -> Result<SettingsFile, String> {
    toml::from_str::<SettingsFile>(raw).map_err(|error| error.to_string())
}
