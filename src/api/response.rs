use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::tools::{ErrorKind, ResultEnvelope};

pub type ApiJson<T> = (StatusCode, Json<T>);

pub fn status_for(envelope: &ResultEnvelope) -> StatusCode {
    let Some(error) = envelope.error.as_ref() else {
        return StatusCode::OK;
    };
    match error.kind {
        ErrorKind::Validation if error.code == "unknown_tool" => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Processing => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Backend => StatusCode::BAD_GATEWAY,
        ErrorKind::Staging => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn envelope_response(envelope: ResultEnvelope) -> ApiJson<ResultEnvelope> {
    (status_for(&envelope), Json(envelope))
}

pub fn success<T>(payload: T) -> ApiJson<T>
where
    T: Serialize,
{
    (StatusCode::OK, Json(payload))
}

pub fn internal_error(tool: &str, message: impl Into<String>) -> ApiJson<Value> {
    let detail = message.into();
    error!(tool, detail = %detail, "internal api error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "status": "error",
            "tool": tool,
            "error": {
                "kind": "internal",
                "code": "internal_error",
                "message": "Internal server error",
                "retryable": false,
            }
        })),
    )
}
