use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use rand::Rng;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::tools::error::{BackendError, DispatchError, ProcessingError};
use crate::tools::validator::NormalizedRequest;
use crate::tools::{AdapterOutput, ToolAdapter};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const BRIEF_PROMPT: &str = "Describe this image in one or two sentences.";
const DETAILED_PROMPT: &str = "Provide a detailed description of this image, including the main subjects, colors, composition, and mood.";
const TECHNICAL_PROMPT: &str = "Provide a technical analysis of this image, including composition, lighting, color palette, style, and any text visible. Also note the apparent resolution and image quality.";

pub trait GenerativeTransport: Send + Sync + 'static {
    fn generate_content(&self, model: &str, body: &Value) -> Result<Value, BackendError>;
}

pub type SharedGenerativeTransport = Arc<dyn GenerativeTransport>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2_000),
            max_delay: Duration::from_millis(20_000),
        }
    }
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Upper bound of the sleep after `attempt` failed (1-based).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let ceiling_ms = self.ceiling(attempt).as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=ceiling_ms))
    }
}

#[derive(Debug, Clone)]
pub struct GeminiHttpTransport {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl GeminiHttpTransport {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("http client init failed: {e}"))?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.filter(|v| !v.trim().is_empty()),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        )
    }
}

impl GenerativeTransport for GeminiHttpTransport {
    fn generate_content(&self, model: &str, body: &Value) -> Result<Value, BackendError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| BackendError::AuthFailure {
            detail: String::from("GEMINI_API_KEY is not configured"),
        })?;
        let resp = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .map_err(classify_transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), body.as_str()));
        }
        resp.json::<Value>()
            .map_err(|e| BackendError::Transient {
                detail: format!("response decode failed: {e}"),
            })
    }
}

fn classify_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_builder() {
        return BackendError::InvalidRequest {
            detail: format!("invalid request: {error}"),
        };
    }
    if error.is_timeout() {
        return BackendError::Transient {
            detail: format!("request timed out: {error}"),
        };
    }
    if error.is_connect() || error.is_request() {
        return BackendError::Transient {
            detail: format!("connection failed: {error}"),
        };
    }
    BackendError::Transient {
        detail: error.to_string(),
    }
}

pub(crate) fn classify_status(status: u16, body: &str) -> BackendError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(300).collect());
    let detail = format!("HTTP {status}: {}", message.trim());
    match status {
        429 => BackendError::RateLimited { detail },
        401 | 403 => BackendError::AuthFailure { detail },
        500..=599 => BackendError::Transient { detail },
        _ => BackendError::InvalidRequest { detail },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

pub struct GenerativeAdapter {
    transport: SharedGenerativeTransport,
    retry: RetryPolicy,
}

impl GenerativeAdapter {
    pub fn new(transport: SharedGenerativeTransport, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn build_request_body(&self, request: &NormalizedRequest) -> Result<Value, DispatchError> {
        let mut parts = Vec::new();
        let mut modalities = vec!["TEXT", "IMAGE"];
        match request.tool.as_str() {
            "generate-image" => {
                parts.push(json!({ "text": request.str("prompt").unwrap_or_default() }));
            }
            "edit-image" => {
                parts.push(json!({ "text": request.str("instruction").unwrap_or_default() }));
                parts.push(inline_part(require_path(request, "sourcePath")?)?);
            }
            "generate-with-references" => {
                parts.push(json!({ "text": request.str("prompt").unwrap_or_default() }));
                for reference in request.paths("referenceImages") {
                    parts.push(inline_part(reference.as_path())?);
                }
            }
            "describe-image" => {
                modalities = vec!["TEXT"];
                let prompt = match request.str("detailLevel").unwrap_or("detailed") {
                    "brief" => BRIEF_PROMPT,
                    "technical" => TECHNICAL_PROMPT,
                    _ => DETAILED_PROMPT,
                };
                parts.push(json!({ "text": prompt }));
                parts.push(inline_part(require_path(request, "sourcePath")?)?);
            }
            other => {
                return Err(ProcessingError::failure(format!(
                    "tool '{other}' is not served by the generative backend"
                ))
                .into())
            }
        }

        let mut generation_config = Map::new();
        generation_config.insert(String::from("responseModalities"), json!(modalities));
        let mut image_config = Map::new();
        if let Some(aspect_ratio) = request.str("aspectRatio") {
            image_config.insert(String::from("aspectRatio"), json!(aspect_ratio));
        }
        let sized = request
            .capability
            .as_ref()
            .is_some_and(|c| c.accepts_image_size());
        if let Some(resolution) = request.str("resolution").filter(|_| sized) {
            image_config.insert(String::from("imageSize"), json!(resolution));
        }
        if !image_config.is_empty() {
            generation_config.insert(String::from("imageConfig"), Value::Object(image_config));
        }

        Ok(json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": Value::Object(generation_config),
        }))
    }

    fn call_with_retry(&self, model: &str, body: &Value) -> Result<Value, BackendError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.generate_content(model, body) {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.jittered_delay(attempt);
                    tracing::warn!(
                        model,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying generative request"
                    );
                    std::thread::sleep(delay);
                }
                Err(error) if error.is_retryable() => {
                    return Err(BackendError::BackendUnavailable {
                        attempts: attempt,
                        last: error.to_string(),
                    })
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl ToolAdapter for GenerativeAdapter {
    fn invoke(&self, request: &NormalizedRequest) -> Result<AdapterOutput, DispatchError> {
        let model = request
            .model()
            .ok_or_else(|| ProcessingError::failure("generative request has no resolved model"))?;
        let body = self.build_request_body(request)?;
        let raw = self.call_with_retry(model, &body)?;
        let response: GenerateContentResponse =
            serde_json::from_value(raw).map_err(|e| BackendError::InvalidRequest {
                detail: format!("unexpected response shape: {e}"),
            })?;

        if request.tool == "describe-image" {
            let text = collect_text(&response).ok_or_else(|| BackendError::InvalidRequest {
                detail: no_content_detail(&response, "no description returned"),
            })?;
            return Ok(AdapterOutput::Text(text));
        }

        let inline = response
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .ok_or_else(|| BackendError::InvalidRequest {
                detail: no_content_detail(&response, "no image returned"),
            })?;
        let bytes = BASE64_STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| BackendError::InvalidRequest {
                detail: format!("image base64 decode failed: {e}"),
            })?;
        Ok(AdapterOutput::Image {
            bytes,
            extension: extension_for_mime(inline.mime_type.as_deref().unwrap_or("image/png"))
                .to_string(),
            notes: collect_text(&response),
        })
    }
}

fn require_path<'a>(request: &'a NormalizedRequest, key: &str) -> Result<&'a Path, DispatchError> {
    request
        .path(key)
        .ok_or_else(|| ProcessingError::failure(format!("missing path parameter '{key}'")).into())
}

fn inline_part(path: &Path) -> Result<Value, DispatchError> {
    let mime = mime_for_path(path).ok_or_else(|| ProcessingError::UnsupportedFormat {
        path: path.to_path_buf(),
        detail: String::from("expected png, jpg, jpeg, webp, gif, bmp or tiff"),
    })?;
    if !path.is_file() {
        return Err(ProcessingError::SourceNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    let bytes = fs::read(path).map_err(|e| ProcessingError::failure(format!(
        "failed to read {}: {e}",
        path.display()
    )))?;
    Ok(json!({
        "inlineData": {
            "mimeType": mime,
            "data": BASE64_STANDARD.encode(bytes),
        }
    }))
}

fn collect_text(response: &GenerateContentResponse) -> Option<String> {
    let text = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn no_content_detail(response: &GenerateContentResponse, fallback: &str) -> String {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return format!("prompt blocked: {reason}");
    }
    match response
        .candidates
        .iter()
        .find_map(|c| c.finish_reason.as_deref())
    {
        Some(reason) => format!("{fallback} (finish reason {reason})"),
        None => fallback.to_string(),
    }
}

pub(crate) fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::{GenerationDefaults, ToolRegistry, PRO_IMAGE_MODEL};
    use crate::tools::validator::validate;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<Value, BackendError>>>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<Value, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("calls lock").len()
        }
    }

    impl GenerativeTransport for ScriptedTransport {
        fn generate_content(&self, model: &str, body: &Value) -> Result<Value, BackendError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((model.to_string(), body.clone()));
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

    fn image_response(bytes: &[u8]) -> Value {
        json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here is your fox." },
                    { "inlineData": { "mimeType": "image/jpeg", "data": BASE64_STANDARD.encode(bytes) } }
                ]},
                "finishReason": "STOP"
            }]
        })
    }

    fn transient() -> BackendError {
        BackendError::Transient {
            detail: String::from("HTTP 503: overloaded"),
        }
    }

    fn temp_image(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("image_tools_gen_{tag}_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("temp dir should be created");
        let path = dir.join("source.png");
        fs::write(&path, b"\x89PNG fake").expect("source should be written");
        path
    }

    fn request(tool: &str, args: Value) -> NormalizedRequest {
        let registry = ToolRegistry::builtin(&GenerationDefaults::default());
        validate(&registry, tool, &args).expect("request should validate")
    }

    #[test]
    fn generate_image_body_carries_image_config() {
        let transport = ScriptedTransport::new(Vec::new());
        let adapter = GenerativeAdapter::new(transport, RetryPolicy::immediate(1));
        let body = adapter
            .build_request_body(&request(
                "generate-image",
                json!({ "prompt": "a fox", "aspectRatio": "16:9", "model": PRO_IMAGE_MODEL, "resolution": "4K" }),
            ))
            .expect("body");

        assert_eq!(body["contents"][0]["parts"][0]["text"], json!("a fox"));
        assert_eq!(
            body["generationConfig"]["responseModalities"],
            json!(["TEXT", "IMAGE"])
        );
        assert_eq!(
            body["generationConfig"]["imageConfig"],
            json!({ "aspectRatio": "16:9", "imageSize": "4K" })
        );

        let flash = adapter
            .build_request_body(&request(
                "generate-image",
                json!({ "prompt": "a fox", "resolution": "2K" }),
            ))
            .expect("flash body");
        assert_eq!(
            flash["generationConfig"]["imageConfig"],
            json!({ "aspectRatio": "1:1" })
        );
        assert!(flash["generationConfig"]["imageConfig"].get("imageSize").is_none());
    }

    #[test]
    fn edit_image_without_sizing_omits_image_config() {
        let source = temp_image("edit");
        let adapter = GenerativeAdapter::new(ScriptedTransport::new(Vec::new()), RetryPolicy::immediate(1));
        let body = adapter
            .build_request_body(&request(
                "edit-image",
                json!({ "sourcePath": source, "instruction": "add a hat" }),
            ))
            .expect("body");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], json!("image/png"));
        assert!(body["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn retries_transient_failures_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(transient()),
            Err(transient()),
            Ok(image_response(b"jpeg-bytes")),
        ]);
        let adapter = GenerativeAdapter::new(transport.clone(), RetryPolicy::immediate(3));
        let output = adapter
            .invoke(&request("generate-image", json!({ "prompt": "fox" })))
            .expect("third attempt succeeds");

        assert_eq!(transport.call_count(), 3);
        assert_eq!(
            output,
            AdapterOutput::Image {
                bytes: b"jpeg-bytes".to_vec(),
                extension: String::from("jpg"),
                notes: Some(String::from("Here is your fox.")),
            }
        );
    }

    #[test]
    fn exhausting_attempts_reports_backend_unavailable() {
        let transport = ScriptedTransport::new(vec![
            Err(BackendError::RateLimited {
                detail: String::from("HTTP 429"),
            }),
            Err(transient()),
        ]);
        let adapter = GenerativeAdapter::new(transport.clone(), RetryPolicy::immediate(2));
        let err = adapter
            .invoke(&request("generate-image", json!({ "prompt": "fox" })))
            .expect_err("should give up");
        assert_eq!(transport.call_count(), 2);
        assert!(matches!(
            err,
            DispatchError::Backend(BackendError::BackendUnavailable { attempts: 2, .. })
        ));
    }

    #[test]
    fn non_retryable_errors_fail_immediately() {
        let transport = ScriptedTransport::new(vec![Err(BackendError::AuthFailure {
            detail: String::from("HTTP 403"),
        })]);
        let adapter = GenerativeAdapter::new(transport.clone(), RetryPolicy::immediate(3));
        let err = adapter
            .invoke(&request("generate-image", json!({ "prompt": "fox" })))
            .expect_err("auth failure");
        assert_eq!(transport.call_count(), 1);
        assert_eq!(err.code(), "auth_failure");
    }

    #[test]
    fn missing_source_never_reaches_the_transport() {
        let transport = ScriptedTransport::new(Vec::new());
        let adapter = GenerativeAdapter::new(transport.clone(), RetryPolicy::immediate(3));
        let err = adapter
            .invoke(&request(
                "describe-image",
                json!({ "sourcePath": "/definitely/not/here.png" }),
            ))
            .expect_err("missing source");
        assert_eq!(err.code(), "source_not_found");
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn describe_returns_text_and_blocked_prompt_is_invalid() {
        let source = temp_image("describe");
        let transport = ScriptedTransport::new(vec![
            Ok(json!({ "candidates": [{ "content": { "parts": [{ "text": " A cat on a mat. " }] } }] })),
            Ok(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        ]);
        let adapter = GenerativeAdapter::new(transport.clone(), RetryPolicy::immediate(1));
        let described = adapter
            .invoke(&request(
                "describe-image",
                json!({ "sourcePath": source, "detailLevel": "brief" }),
            ))
            .expect("description");
        assert_eq!(described, AdapterOutput::Text(String::from("A cat on a mat.")));
        let calls = transport.calls.lock().expect("calls lock").clone();
        assert_eq!(calls[0].1["contents"][0]["parts"][0]["text"], json!(BRIEF_PROMPT));
        assert_eq!(calls[0].1["generationConfig"]["responseModalities"], json!(["TEXT"]));

        let blocked = adapter
            .invoke(&request("generate-image", json!({ "prompt": "fox" })))
            .expect_err("blocked");
        assert!(matches!(
            blocked,
            DispatchError::Backend(BackendError::InvalidRequest { ref detail }) if detail.contains("SAFETY")
        ));
    }

    #[test]
    fn unknown_reference_extension_is_rejected_before_the_transport() {
        let transport = ScriptedTransport::new(Vec::new());
        let adapter = GenerativeAdapter::new(transport.clone(), RetryPolicy::immediate(3));
        let err = adapter
            .invoke(&request(
                "generate-with-references",
                json!({ "prompt": "merge", "referenceImages": ["ref.xyz"] }),
            ))
            .expect_err("unknown extension");
        assert_eq!(err.code(), "unsupported_format");
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn missing_image_reports_the_finish_reason() {
        let transport = ScriptedTransport::new(vec![Ok(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "sorry" }] },
                "finishReason": "IMAGE_SAFETY"
            }]
        }))]);
        let adapter = GenerativeAdapter::new(transport.clone(), RetryPolicy::immediate(3));
        let err = adapter
            .invoke(&request("generate-image", json!({ "prompt": "fox" })))
            .expect_err("no image");
        assert_eq!(transport.call_count(), 1);
        assert!(matches!(
            err,
            DispatchError::Backend(BackendError::InvalidRequest { ref detail })
                if detail.contains("no image returned") && detail.contains("IMAGE_SAFETY")
        ));
    }

    #[test]
    fn malformed_request_is_not_retried_as_transient() {
        let error = Client::new()
            .get("not a url")
            .build()
            .expect_err("relative url cannot be built");
        assert!(matches!(
            classify_transport_error(error),
            BackendError::InvalidRequest { .. }
        ));
    }

    #[test]
    fn status_codes_map_to_failure_classes() {
        let body = r#"{"error":{"message":"quota exceeded"}}"#;
        assert_eq!(
            classify_status(429, body),
            BackendError::RateLimited {
                detail: String::from("HTTP 429: quota exceeded")
            }
        );
        assert!(matches!(classify_status(503, ""), BackendError::Transient { .. }));
        assert!(matches!(classify_status(401, ""), BackendError::AuthFailure { .. }));
        assert!(matches!(classify_status(400, "bad"), BackendError::InvalidRequest { .. }));
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.ceiling(1), Duration::from_millis(2_000));
        assert_eq!(policy.ceiling(2), Duration::from_millis(4_000));
        assert_eq!(policy.ceiling(5), Duration::from_millis(20_000));
        assert!(policy.jittered_delay(3) <= Duration::from_millis(8_000));
    }

    #[test]
    fn missing_api_key_is_an_auth_failure() {
        let transport = GeminiHttpTransport::new(DEFAULT_API_BASE, None, Duration::from_secs(1))
            .expect("client");
        let err = transport
            .generate_content("gemini-2.5-flash-image", &json!({}))
            .expect_err("no key");
        assert!(matches!(err, BackendError::AuthFailure { .. }));
    }
}
