use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::tools::envelope::{ContentKind, ResultEnvelope, ToolPayload};
use crate::tools::error::{DispatchError, ProcessingError};
use crate::tools::registry::{BackendKind, ToolRegistry};
use crate::tools::staging::ArtifactStager;
use crate::tools::validator::{validate, NormalizedRequest};
use crate::tools::{AdapterOutput, SharedToolAdapter};

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    generative: SharedToolAdapter,
    local: SharedToolAdapter,
    stager: Arc<ArtifactStager>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        generative: SharedToolAdapter,
        local: SharedToolAdapter,
        stager: Arc<ArtifactStager>,
    ) -> Self {
        Self {
            registry,
            generative,
            local,
            stager,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.registry.as_ref()
    }

    pub fn validate(&self, tool: &str, args: &Value) -> Result<NormalizedRequest, DispatchError> {
        Ok(validate(self.registry.as_ref(), tool, args)?)
    }

    pub fn dispatch(&self, tool: &str, args: &Value) -> ResultEnvelope {
        let started = Instant::now();
        let outcome = self.run(tool, args);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(payload) => {
                tracing::info!(tool, elapsed_ms, "tool call succeeded");
                ResultEnvelope::success(tool, payload)
            }
            Err(error) => {
                tracing::warn!(
                    tool,
                    elapsed_ms,
                    code = error.code(),
                    error = %error,
                    "tool call failed"
                );
                ResultEnvelope::failure(tool, &error)
            }
        }
    }

    fn run(&self, tool: &str, args: &Value) -> Result<ToolPayload, DispatchError> {
        let request = self.validate(tool, args)?;
        let adapter = match request.backend {
            BackendKind::Generative => &self.generative,
            BackendKind::Local => &self.local,
        };

        if request.output == ContentKind::Text {
            return match adapter.invoke(&request)? {
                AdapterOutput::Text(text) => Ok(ToolPayload::Text { text }),
                AdapterOutput::Image { .. } => Err(ProcessingError::failure(format!(
                    "tool '{tool}' produced an image where text was expected"
                ))
                .into()),
            };
        }

        let reservation = self.stager.stage(
            request.tool.as_str(),
            request.identity_hint().as_str(),
            request.path("outputPath"),
        )?;
        match adapter.invoke(&request)? {
            AdapterOutput::Image {
                bytes,
                extension,
                notes,
            } => {
                let artifact = self.stager.commit(&reservation, &bytes, extension.as_str())?;
                Ok(ToolPayload::Artifact { artifact, notes })
            }
            AdapterOutput::Text(_) => Err(ProcessingError::failure(format!(
                "tool '{tool}' produced text where an image was expected"
            ))
            .into()),
        }
    }
}
