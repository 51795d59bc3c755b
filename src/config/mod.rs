use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::tools::generative::{GeminiHttpTransport, GenerativeAdapter, RetryPolicy, DEFAULT_API_BASE};
use crate::tools::local_ops::LocalAdapter;
use crate::tools::registry::{
    builtin_models, GenerationDefaults, ToolRegistry, ASPECT_RATIOS, FLASH_IMAGE_MODEL,
};
use crate::tools::staging::ArtifactStager;
use crate::tools::Dispatcher;

mod dotenv;
mod settings_file;

pub use dotenv::{load_dotenv_map, parse_dotenv_content};
pub use settings_file::{load_settings_file, parse_settings_toml, SettingsFile};

pub const DEFAULT_BIND: &str = "127.0.0.1:8790";
pub const DEFAULT_SETTINGS_PATH: &str = "image-tools.toml";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read '{path}': {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse settings TOML '{path}': {message}")]
    ParseToml { path: String, message: String },
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub output_dir: PathBuf,
    pub defaults: GenerationDefaults,
    pub api_base: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub bind: SocketAddr,
    pub settings_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub env: HashMap<String, String>,
    pub dotenv: HashMap<String, String>,
    pub file: SettingsFile,
    pub settings_path: PathBuf,
}

impl ConfigSources {
    fn lookup(&self, key: &str) -> Option<&str> {
        [&self.env, &self.dotenv]
            .into_iter()
            .filter_map(|layer| layer.get(key))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }
}

impl AppConfig {
    pub fn from_environment(working_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::vars().collect::<HashMap<_, _>>();
        let dotenv = load_dotenv_map(working_dir)?;
        let settings_path = env
            .get("IMAGE_TOOLS_SETTINGS")
            .or_else(|| dotenv.get("IMAGE_TOOLS_SETTINGS"))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
        let settings_path = if settings_path.is_absolute() {
            settings_path
        } else {
            working_dir.join(settings_path)
        };
        let file = load_settings_file(settings_path.as_path())?;
        Self::resolve(&ConfigSources {
            env,
            dotenv,
            file,
            settings_path,
        })
    }

    pub fn resolve(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let file = &sources.file;
        let api_key = sources
            .lookup("GEMINI_API_KEY")
            .or_else(|| sources.lookup("GOOGLE_API_KEY"))
            .map(str::to_string);
        let output_dir = PathBuf::from(choose_string(
            sources.lookup("DEFAULT_OUTPUT_DIR"),
            file.output_dir.as_deref(),
            "./output",
        ));
        let defaults = GenerationDefaults {
            model: choose_string(
                sources.lookup("DEFAULT_MODEL"),
                file.default_model.as_deref(),
                FLASH_IMAGE_MODEL,
            ),
            resolution: choose_string(
                sources.lookup("DEFAULT_RESOLUTION"),
                file.default_resolution.as_deref(),
                "1K",
            )
            .to_ascii_uppercase(),
            aspect_ratio: choose_string(
                sources.lookup("DEFAULT_ASPECT_RATIO"),
                file.default_aspect_ratio.as_deref(),
                "1:1",
            ),
        };
        validate_defaults(&defaults)?;

        let api_base = choose_string(
            sources.lookup("GEMINI_API_BASE"),
            file.api_base.as_deref(),
            DEFAULT_API_BASE,
        );
        let timeout_secs = choose_number(
            sources,
            "GEMINI_REQUEST_TIMEOUT_SECS",
            file.request_timeout_secs,
            120u64,
        )?;
        let max_attempts = choose_number(sources, "GEMINI_MAX_ATTEMPTS", file.max_attempts, 3u32)?;
        if max_attempts == 0 {
            return Err(invalid("GEMINI_MAX_ATTEMPTS", "0", "must be at least 1"));
        }
        let base_ms = choose_number(sources, "GEMINI_RETRY_BASE_MS", file.retry_base_ms, 2_000u64)?;
        let max_ms = choose_number(sources, "GEMINI_RETRY_MAX_MS", file.retry_max_ms, 20_000u64)?;

        let bind_raw = choose_string(sources.lookup("IMAGE_TOOLS_BIND"), file.bind.as_deref(), DEFAULT_BIND);
        let bind = SocketAddr::from_str(bind_raw.as_str())
            .map_err(|e| invalid("IMAGE_TOOLS_BIND", bind_raw.as_str(), e.to_string().as_str()))?;

        Ok(Self {
            api_key,
            output_dir,
            defaults,
            api_base,
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(max_ms.max(base_ms)),
            },
            bind,
            settings_path: sources.settings_path.clone(),
        })
    }

    pub fn build_dispatcher(&self) -> Result<Dispatcher, ConfigError> {
        let transport = GeminiHttpTransport::new(
            self.api_base.clone(),
            self.api_key.clone(),
            self.request_timeout,
        )
        .map_err(ConfigError::HttpClient)?;
        if self.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; generative tools will fail with auth_failure");
        }
        Ok(Dispatcher::new(
            Arc::new(ToolRegistry::builtin(&self.defaults)),
            Arc::new(GenerativeAdapter::new(Arc::new(transport), self.retry.clone())),
            Arc::new(LocalAdapter::new()),
            Arc::new(ArtifactStager::new(self.output_dir.clone())),
        ))
    }
}

fn validate_defaults(defaults: &GenerationDefaults) -> Result<(), ConfigError> {
    let models = builtin_models();
    let capability = models
        .iter()
        .find(|m| m.model == defaults.model)
        .ok_or_else(|| invalid("DEFAULT_MODEL", defaults.model.as_str(), "unknown model"))?;
    if !ASPECT_RATIOS.contains(&defaults.aspect_ratio.as_str()) {
        return Err(invalid(
            "DEFAULT_ASPECT_RATIO",
            defaults.aspect_ratio.as_str(),
            "unsupported aspect ratio",
        ));
    }
    if !capability.supports_resolution(defaults.resolution.as_str()) {
        return Err(invalid(
            "DEFAULT_RESOLUTION",
            defaults.resolution.as_str(),
            "not supported by the default model",
        ));
    }
    Ok(())
}

fn choose_string(primary: Option<&str>, file: Option<&str>, fallback: &str) -> String {
    primary
        .or(file.map(str::trim).filter(|v| !v.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

fn choose_number<T>(
    sources: &ConfigSources,
    key: &str,
    file: Option<T>,
    fallback: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match sources.lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| invalid(key, raw, "expected a non-negative integer")),
        None => Ok(file.unwrap_or(fallback)),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
