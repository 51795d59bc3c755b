use std::sync::Arc;

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod generative;
pub mod local_ops;
pub mod registry;
pub mod staging;
pub mod validator;

pub use dispatcher::Dispatcher;
pub use envelope::{ArtifactHandle, ContentKind, EnvelopeStatus, ResultEnvelope, ToolPayload};
pub use error::{
    BackendError, DispatchError, ErrorDescriptor, ErrorKind, ProcessingError, StagingError,
    ValidationError,
};
pub use registry::{GenerationDefaults, ToolRegistry};
pub use validator::{validate, NormalizedRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOutput {
    Image {
        bytes: Vec<u8>,
        extension: String,
        notes: Option<String>,
    },
    Text(String),
}

pub trait ToolAdapter: Send + Sync + 'static {
    fn invoke(&self, request: &NormalizedRequest) -> Result<AdapterOutput, DispatchError>;
}

pub type SharedToolAdapter = Arc<dyn ToolAdapter>;
