use std::path::PathBuf;

use serde::Serialize;

use crate::tools::error::{DispatchError, ErrorDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Image,
    Text,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    pub content_kind: ContentKind,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolPayload {
    Artifact {
        artifact: ArtifactHandle,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub status: EnvelopeStatus,
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ToolPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl ResultEnvelope {
    pub fn success(tool: impl Into<String>, payload: ToolPayload) -> Self {
        Self {
            status: EnvelopeStatus::Ok,
            tool: tool.into(),
            data: Some(payload),
            error: None,
        }
    }

    pub fn failure(tool: impl Into<String>, error: &DispatchError) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            tool: tool.into(),
            data: None,
            error: Some(error.descriptor()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EnvelopeStatus::Ok
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        match self.data.as_ref() {
            Some(ToolPayload::Artifact { artifact, .. }) => Some(artifact),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self.data.as_ref() {
            Some(ToolPayload::Text { text }) => Some(text.as_str()),
            _ => None,
        }
    }
}
