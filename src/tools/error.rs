use std::path::PathBuf;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("missing required parameter '{key}'")]
    MissingParameter { key: String },
    #[error("tool '{tool}' requires one of: {}", format_groups(.alternatives))]
    MissingParameterGroup {
        tool: String,
        alternatives: Vec<Vec<String>>,
    },
    #[error("parameter '{key}' expected {expected}, got {got}")]
    TypeMismatch {
        key: String,
        expected: String,
        got: String,
    },
    #[error("parameter '{key}' value '{value}' is not one of: {}", .allowed.join(", "))]
    InvalidEnumValue {
        key: String,
        value: String,
        allowed: Vec<String>,
    },
    #[error("parameter '{key}' value {value} is outside {min}..={max}")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{provided} reference images provided, model allows at most {max}")]
    TooManyReferences { provided: usize, max: usize },
    #[error(
        "model '{model}' does not support aspect ratio {} at resolution {}",
        display_opt(.aspect_ratio),
        display_opt(.resolution)
    )]
    UnsupportedCombination {
        model: String,
        aspect_ratio: Option<String>,
        resolution: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("generative backend rate limited the request: {detail}")]
    RateLimited { detail: String },
    #[error("transient generative backend failure: {detail}")]
    Transient { detail: String },
    #[error("generative backend rejected the request: {detail}")]
    InvalidRequest { detail: String },
    #[error("generative backend authentication failed: {detail}")]
    AuthFailure { detail: String },
    #[error("generative backend unavailable after {attempts} attempts: {last}")]
    BackendUnavailable { attempts: u32, last: String },
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    #[error("source image not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },
    #[error("unsupported image format for {}: {detail}", .path.display())]
    UnsupportedFormat { path: PathBuf, detail: String },
    #[error("image processing failed: {detail}")]
    ProcessingFailure { detail: String },
}

impl ProcessingError {
    pub(crate) fn failure(detail: impl Into<String>) -> Self {
        Self::ProcessingFailure {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("failed to write artifact {}: {detail}", .path.display())]
    WriteFailure { path: PathBuf, detail: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error(transparent)]
    Staging(#[from] StagingError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Backend,
    Processing,
    Staging,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Backend(_) => ErrorKind::Backend,
            Self::Processing(_) => ErrorKind::Processing,
            Self::Staging(_) => ErrorKind::Staging,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(error) => match error {
                ValidationError::UnknownTool(_) => "unknown_tool",
                ValidationError::UnknownModel(_) => "unknown_model",
                ValidationError::MissingParameter { .. } => "missing_parameter",
                ValidationError::MissingParameterGroup { .. } => "missing_parameter_group",
                ValidationError::TypeMismatch { .. } => "type_mismatch",
                ValidationError::InvalidEnumValue { .. } => "invalid_enum_value",
                ValidationError::OutOfRange { .. } => "out_of_range",
                ValidationError::TooManyReferences { .. } => "too_many_references",
                ValidationError::UnsupportedCombination { .. } => "unsupported_combination",
            },
            Self::Backend(error) => match error {
                BackendError::RateLimited { .. } => "rate_limited",
                BackendError::Transient { .. } => "transient",
                BackendError::InvalidRequest { .. } => "invalid_request",
                BackendError::AuthFailure { .. } => "auth_failure",
                BackendError::BackendUnavailable { .. } => "backend_unavailable",
            },
            Self::Processing(error) => match error {
                ProcessingError::SourceNotFound { .. } => "source_not_found",
                ProcessingError::UnsupportedFormat { .. } => "unsupported_format",
                ProcessingError::ProcessingFailure { .. } => "processing_failure",
            },
            Self::Staging(StagingError::WriteFailure { .. }) => "write_failure",
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind(),
            code: self.code().to_string(),
            message: self.to_string(),
            retryable: matches!(self, Self::Backend(error) if error.is_retryable()),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Validation(error) => match error {
                ValidationError::UnknownTool(tool) => Some(json!({ "tool": tool })),
                ValidationError::UnknownModel(model) => Some(json!({ "model": model })),
                ValidationError::MissingParameter { key } => Some(json!({ "key": key })),
                ValidationError::MissingParameterGroup { tool, alternatives } => {
                    Some(json!({ "tool": tool, "alternatives": alternatives }))
                }
                ValidationError::TypeMismatch { key, expected, got } => {
                    Some(json!({ "key": key, "expected": expected, "got": got }))
                }
                ValidationError::InvalidEnumValue {
                    key,
                    value,
                    allowed,
                } => Some(json!({ "key": key, "value": value, "allowed": allowed })),
                ValidationError::OutOfRange {
                    key,
                    value,
                    min,
                    max,
                } => Some(json!({ "key": key, "value": value, "min": min, "max": max })),
                ValidationError::TooManyReferences { provided, max } => {
                    Some(json!({ "provided": provided, "max": max }))
                }
                ValidationError::UnsupportedCombination {
                    model,
                    aspect_ratio,
                    resolution,
                } => Some(json!({
                    "model": model,
                    "aspect_ratio": aspect_ratio,
                    "resolution": resolution,
                })),
            },
            Self::Backend(BackendError::BackendUnavailable { attempts, last }) => {
                Some(json!({ "attempts": attempts, "last_error": last }))
            }
            Self::Backend(_) => None,
            Self::Processing(ProcessingError::SourceNotFound { path })
            | Self::Processing(ProcessingError::UnsupportedFormat { path, .. }) => {
                Some(json!({ "path": path.display().to_string() }))
            }
            Self::Processing(ProcessingError::ProcessingFailure { .. }) => None,
            Self::Staging(StagingError::WriteFailure { path, .. }) => {
                Some(json!({ "path": path.display().to_string() }))
            }
        }
    }
}

fn format_groups(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|group| format!("({})", group.join(", ")))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn display_opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(unset)")
}
