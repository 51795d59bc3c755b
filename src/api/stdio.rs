use std::io::{BufRead, Write};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::tools::{DispatchError, Dispatcher, ResultEnvelope, ValidationError};

#[derive(Debug, Deserialize)]
struct StdioRequest {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default, alias = "args", alias = "params")]
    arguments: Value,
}

/// Reads one JSON request per line and answers with one envelope per line.
pub fn serve_stdio<R, W>(dispatcher: &Dispatcher, input: R, mut output: W) -> std::io::Result<usize>
where
    R: BufRead,
    W: Write,
{
    info!("serving tool calls over stdio");
    let mut handled = 0usize;
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let envelope = handle_line(dispatcher, trimmed);
        serde_json::to_writer(&mut output, &envelope).map_err(std::io::Error::other)?;
        output.write_all(b"\n")?;
        output.flush()?;
        handled += 1;
    }
    debug!(handled, "stdio input closed");
    Ok(handled)
}

fn handle_line(dispatcher: &Dispatcher, line: &str) -> ResultEnvelope {
    let request = match serde_json::from_str::<StdioRequest>(line) {
        Ok(request) => request,
        Err(error) => {
            let error: DispatchError = ValidationError::TypeMismatch {
                key: String::from("request"),
                expected: String::from("object with 'tool' and 'arguments'"),
                got: format!("invalid JSON ({error})"),
            }
            .into();
            return ResultEnvelope::failure("", &error);
        }
    };
    let Some(tool) = request.tool.filter(|t| !t.trim().is_empty()) else {
        let error: DispatchError = ValidationError::MissingParameter {
            key: String::from("tool"),
        }
        .into();
        return ResultEnvelope::failure("", &error);
    };
    dispatcher.dispatch(tool.trim(), &request.arguments)
}
