use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::api::response::{envelope_response, internal_error, success, ApiJson};
use crate::api::server::AppState;
use crate::tools::{DispatchError, ResultEnvelope, ValidationError};

pub async fn list_tools_handler(State(state): State<AppState>) -> ApiJson<Value> {
    success(state.dispatcher.registry().catalog())
}

pub async fn call_tool_handler(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    body: Bytes,
) -> Response {
    let args = match parse_arguments(body.as_ref()) {
        Ok(args) => args,
        Err(error) => return envelope_response(ResultEnvelope::failure(tool, &error)).into_response(),
    };

    let dispatcher = state.dispatcher.clone();
    let tool_name = tool.clone();
    let result =
        tokio::task::spawn_blocking(move || dispatcher.dispatch(tool_name.as_str(), &args)).await;

    match result {
        Ok(envelope) => envelope_response(envelope).into_response(),
        Err(join_error) => internal_error(tool.as_str(), join_error.to_string()).into_response(),
    }
}

fn parse_arguments(body: &[u8]) -> Result<Value, DispatchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice::<Value>(body).map_err(|error| {
        ValidationError::TypeMismatch {
            key: String::from("arguments"),
            expected: String::from("object"),
            got: format!("invalid JSON ({error})"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_means_no_arguments() {
        assert_eq!(parse_arguments(b"").expect("empty"), Value::Null);
        assert_eq!(parse_arguments(b"  \n").expect("blank"), Value::Null);
        assert_eq!(
            parse_arguments(br#"{"prompt":"fox"}"#).expect("object"),
            json!({ "prompt": "fox" })
        );
    }

    #[test]
    fn malformed_body_is_a_type_mismatch() {
        let err = parse_arguments(b"{not json").expect_err("malformed");
        assert_eq!(err.code(), "type_mismatch");
    }
}
