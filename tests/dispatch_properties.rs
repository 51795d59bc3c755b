use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::prelude::*;
use image::{ImageFormat, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use image_tools_backend::tools::generative::{GenerativeAdapter, GenerativeTransport, RetryPolicy};
use image_tools_backend::tools::local_ops::LocalAdapter;
use image_tools_backend::tools::staging::ArtifactStager;
use image_tools_backend::tools::{
    BackendError, Dispatcher, GenerationDefaults, ToolPayload, ToolRegistry,
};

struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, BackendError>>>,
    calls: Mutex<usize>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Result<Value, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }
}

impl GenerativeTransport for ScriptedTransport {
    fn generate_content(&self, _model: &str, _body: &Value) -> Result<Value, BackendError> {
        *self.calls.lock().expect("calls lock") += 1;
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::InvalidRequest {
                    detail: String::from("script exhausted"),
                })
            })
    }
}

#[test]
fn concurrent_resizes_stage_distinct_artifacts() {
    let root = test_root("concurrent");
    let source = write_png(root.as_path(), "tile.png", 16, 16);
    let dispatcher = dispatcher_with(root.as_path(), ScriptedTransport::new(Vec::new()));
    let args = json!({ "sourcePath": source, "width": 8 });

    let envelopes = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| dispatcher.dispatch("resize", &args)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("dispatch thread"))
            .collect::<Vec<_>>()
    });

    let paths = envelopes
        .iter()
        .map(|envelope| {
            envelope
                .artifact()
                .map(|artifact| artifact.path.clone())
                .expect("every resize should succeed")
        })
        .collect::<HashSet<PathBuf>>();
    assert_eq!(paths.len(), 8);
    assert!(paths.iter().all(|path| path.is_file()));
}

#[test]
fn transient_failures_are_retried_until_success() {
    let root = test_root("retry");
    let transport = ScriptedTransport::new(vec![
        Err(BackendError::Transient {
            detail: String::from("503 overloaded"),
        }),
        Err(BackendError::RateLimited {
            detail: String::from("429"),
        }),
        Ok(json!({
            "candidates": [{
                "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": BASE64_STANDARD.encode(b"png-bytes") } }
                ]}
            }]
        })),
    ]);
    let dispatcher = dispatcher_with(root.as_path(), transport.clone());

    let envelope = dispatcher.dispatch("generate-image", &json!({ "prompt": "a red kite" }));
    assert!(envelope.is_ok(), "unexpected failure: {:?}", envelope.error);
    assert_eq!(transport.calls(), 3);
    let artifact = envelope.artifact().expect("artifact");
    assert_eq!(artifact.size_bytes, 9);
    assert_eq!(
        artifact.path.extension().and_then(|e| e.to_str()),
        Some("png")
    );
}

#[test]
fn retry_exhaustion_reports_backend_unavailable() {
    let root = test_root("exhausted");
    let transport = ScriptedTransport::new(
        (0..3)
            .map(|_| {
                Err(BackendError::Transient {
                    detail: String::from("connection reset"),
                })
            })
            .collect(),
    );
    let dispatcher = dispatcher_with(root.as_path(), transport.clone());

    let envelope = dispatcher.dispatch("generate-image", &json!({ "prompt": "a red kite" }));
    assert_eq!(envelope.error_code(), Some("backend_unavailable"));
    assert_eq!(transport.calls(), 3);
    assert_eq!(count_files(root.join("out").as_path()), 0);
}

#[test]
fn reference_limit_is_enforced_before_any_call() {
    let root = test_root("references");
    let transport = ScriptedTransport::new(Vec::new());
    let dispatcher = dispatcher_with(root.as_path(), transport.clone());

    let envelope = dispatcher.dispatch(
        "generate-with-references",
        &json!({
            "prompt": "merge these",
            "referenceImages": ["a.png", "b.png", "c.png", "d.png"],
        }),
    );
    let error = envelope.error.expect("too many references");
    assert_eq!(error.code, "too_many_references");
    assert_eq!(error.details, Some(json!({ "provided": 4, "max": 3 })));
    assert_eq!(transport.calls(), 0);
}

#[test]
fn validation_is_idempotent() {
    let root = test_root("idempotent");
    let dispatcher = dispatcher_with(root.as_path(), ScriptedTransport::new(Vec::new()));
    let args = json!({ "prompt": "fox", "aspect_ratio": "16:9", "resolution": "2k" });

    let first = dispatcher
        .validate("generate-image", &args)
        .expect("valid request");
    let second = dispatcher
        .validate("generate-image", &args)
        .expect("valid request");
    assert_eq!(first, second);
    assert_eq!(first.str("aspectRatio"), Some("16:9"));
    assert_eq!(first.str("resolution"), Some("2K"));
}

#[test]
fn describe_returns_text_without_staging() {
    let root = test_root("describe");
    let source = write_png(root.as_path(), "scene.png", 4, 4);
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "candidates": [{ "content": { "parts": [{ "text": "A flat red square." }] } }]
    }))]);
    let dispatcher = dispatcher_with(root.as_path(), transport);

    let envelope = dispatcher.dispatch(
        "describe-image",
        &json!({ "sourcePath": source, "detailLevel": "brief" }),
    );
    assert_eq!(
        envelope.data,
        Some(ToolPayload::Text {
            text: String::from("A flat red square.")
        })
    );
    assert!(!root.join("out").exists());
}

fn dispatcher_with(root: &Path, transport: Arc<ScriptedTransport>) -> Dispatcher {
    Dispatcher::new(
        Arc::new(ToolRegistry::builtin(&GenerationDefaults::default())),
        Arc::new(GenerativeAdapter::new(transport, RetryPolicy::immediate(3))),
        Arc::new(LocalAdapter::new()),
        Arc::new(ArtifactStager::new(root.join("out"))),
    )
}

fn test_root(label: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("image_tools_{label}_props_{}", Uuid::new_v4()));
    std::fs::create_dir_all(root.as_path()).expect("temp test root must be creatable");
    root
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, Rgba([220, 30, 30, 255]))
        .save_with_format(path.as_path(), ImageFormat::Png)
        .expect("fixture PNG should be writable");
    path
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}
