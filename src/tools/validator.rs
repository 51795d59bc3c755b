use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use image::Rgba;
use serde_json::{Map, Value};

use crate::tools::envelope::ContentKind;
use crate::tools::error::ValidationError;
use crate::tools::registry::{
    BackendKind, ModelCapability, ParamDecl, ParamKind, ParamValue, ToolRegistry, ToolSpec,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub tool: String,
    pub backend: BackendKind,
    pub output: ContentKind,
    pub params: BTreeMap<String, ParamValue>,
    pub capability: Option<ModelCapability>,
}

impl NormalizedRequest {
    pub fn value(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.params.get(key) {
            Some(ParamValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.params.get(key) {
            Some(ParamValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.params.get(key) {
            Some(ParamValue::Float(v)) => Some(*v),
            Some(ParamValue::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.params.get(key) {
            Some(ParamValue::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn color(&self, key: &str) -> Option<Rgba<u8>> {
        match self.params.get(key) {
            Some(ParamValue::Color(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn path(&self, key: &str) -> Option<&Path> {
        match self.params.get(key) {
            Some(ParamValue::Path(v)) => Some(v.as_path()),
            _ => None,
        }
    }

    pub fn paths(&self, key: &str) -> &[PathBuf] {
        match self.params.get(key) {
            Some(ParamValue::PathList(v)) => v.as_slice(),
            _ => &[],
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.capability.as_ref().map(|c| c.model.as_str())
    }

    /// Text used to make generated artifact names recognizable.
    pub fn identity_hint(&self) -> String {
        if let Some(prompt) = self.str("prompt").or_else(|| self.str("instruction")) {
            return prompt.to_string();
        }
        self.path("sourcePath")
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.tool.clone())
    }
}

pub fn validate(
    registry: &ToolRegistry,
    tool: &str,
    raw: &Value,
) -> Result<NormalizedRequest, ValidationError> {
    let spec = registry.lookup(tool)?;
    let empty = Map::new();
    let args = match raw {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::TypeMismatch {
                key: String::from("arguments"),
                expected: String::from("object"),
                got: describe(other),
            })
        }
    };
    log_unknown_keys(spec, args);

    let present = collect_present(spec, args)?;

    let mut params = BTreeMap::new();
    let mut defaulted = BTreeSet::new();
    let mut supplied = Vec::new();
    for decl in &spec.params {
        match present.get(decl.key) {
            Some(value) => supplied.push((decl, *value)),
            None => {
                if let Some(default) = decl.default.clone() {
                    params.insert(decl.key.to_string(), default);
                    defaulted.insert(decl.key);
                }
            }
        }
    }

    let mut coerced = Vec::with_capacity(supplied.len());
    for (decl, value) in supplied {
        coerced.push((decl, decl.kind.coerce(decl.key, value)?));
    }
    for (decl, value) in coerced {
        let value = decl.kind.check_domain(decl.key, value)?;
        params.insert(decl.key.to_string(), value);
    }

    let capability = match spec.backend {
        BackendKind::Generative => Some(check_model(registry, &mut params, &defaulted)?),
        BackendKind::Local => None,
    };

    Ok(NormalizedRequest {
        tool: spec.name.to_string(),
        backend: spec.backend,
        output: spec.output,
        params,
        capability,
    })
}

fn collect_present<'a>(
    spec: &ToolSpec,
    args: &'a Map<String, Value>,
) -> Result<BTreeMap<&'static str, &'a Value>, ValidationError> {
    let mut present = BTreeMap::new();
    for decl in &spec.params {
        match lookup_raw(decl, args) {
            Some(value) => {
                present.insert(decl.key, value);
            }
            None if decl.required => {
                return Err(ValidationError::MissingParameter {
                    key: decl.key.to_string(),
                })
            }
            None => {}
        }
    }

    if !spec.required_groups.is_empty() {
        let satisfied = spec
            .required_groups
            .iter()
            .any(|group| group.iter().all(|key| present.contains_key(key)));
        if !satisfied {
            return Err(ValidationError::MissingParameterGroup {
                tool: spec.name.to_string(),
                alternatives: spec
                    .required_groups
                    .iter()
                    .map(|group| group.iter().map(|k| k.to_string()).collect())
                    .collect(),
            });
        }
    }
    Ok(present)
}

fn lookup_raw<'a>(decl: &ParamDecl, args: &'a Map<String, Value>) -> Option<&'a Value> {
    std::iter::once(decl.key)
        .chain(decl.aliases.iter().copied())
        .filter_map(|key| args.get(key))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn log_unknown_keys(spec: &ToolSpec, args: &Map<String, Value>) {
    for key in args.keys() {
        let known = spec
            .params
            .iter()
            .any(|decl| decl.key == key || decl.aliases.contains(&key.as_str()));
        if !known {
            tracing::debug!(tool = spec.name, key = %key, "ignoring unknown argument");
        }
    }
}

/// Caller-supplied sizing must fit the model. Configured defaults that do not
/// fit are replaced by the model's own choice instead of failing the call.
fn check_model(
    registry: &ToolRegistry,
    params: &mut BTreeMap<String, ParamValue>,
    defaulted: &BTreeSet<&'static str>,
) -> Result<ModelCapability, ValidationError> {
    let model = match params.get("model") {
        Some(ParamValue::String(model)) => model.clone(),
        _ => return Err(ValidationError::UnknownModel(String::new())),
    };
    let capability = registry.capability_of(model.as_str())?;

    if let Some(ParamValue::PathList(references)) = params.get("referenceImages") {
        if references.len() > capability.max_reference_images {
            return Err(ValidationError::TooManyReferences {
                provided: references.len(),
                max: capability.max_reference_images,
            });
        }
    }

    fit_default(
        params,
        defaulted,
        "resolution",
        |v| capability.supports_resolution(v),
        capability.resolutions.last().copied(),
    );
    fit_default(
        params,
        defaulted,
        "aspectRatio",
        |v| capability.supports_aspect_ratio(v),
        capability.aspect_ratios.first().copied(),
    );

    let aspect_ratio = string_param(params, "aspectRatio");
    let resolution = string_param(params, "resolution");
    let aspect_ok = aspect_ratio
        .as_deref()
        .map(|v| capability.supports_aspect_ratio(v))
        .unwrap_or(true);
    let resolution_ok = resolution
        .as_deref()
        .map(|v| capability.supports_resolution(v))
        .unwrap_or(true);
    if !aspect_ok || !resolution_ok {
        return Err(ValidationError::UnsupportedCombination {
            model: capability.model.clone(),
            aspect_ratio,
            resolution,
        });
    }
    Ok(capability.clone())
}

fn fit_default(
    params: &mut BTreeMap<String, ParamValue>,
    defaulted: &BTreeSet<&'static str>,
    key: &'static str,
    supported: impl Fn(&str) -> bool,
    fallback: Option<&'static str>,
) {
    if !defaulted.contains(key) {
        return;
    }
    if matches!(params.get(key), Some(ParamValue::String(v)) if supported(v.as_str())) {
        return;
    }
    match fallback {
        Some(value) => {
            tracing::debug!(key, value, "default does not fit the model, using model fallback");
            params.insert(key.to_string(), ParamValue::String(value.to_string()));
        }
        None => {
            params.remove(key);
        }
    }
}

fn string_param(params: &BTreeMap<String, ParamValue>, key: &str) -> Option<String> {
    match params.get(key) {
        Some(ParamValue::String(v)) => Some(v.clone()),
        _ => None,
    }
}

impl ParamKind {
    fn coerce(&self, key: &str, value: &Value) -> Result<ParamValue, ValidationError> {
        let coerced = match self {
            Self::String | Self::Enum(_) => value
                .as_str()
                .map(|s| ParamValue::String(s.trim().to_string())),
            Self::Integer { .. } => coerce_integer(value).map(ParamValue::Integer),
            Self::Float { .. } => coerce_float(value).map(ParamValue::Float),
            Self::Boolean => match value {
                Value::Bool(b) => Some(ParamValue::Boolean(*b)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(ParamValue::Boolean(true)),
                    "false" => Some(ParamValue::Boolean(false)),
                    _ => None,
                },
                _ => None,
            },
            Self::Color => value.as_str().and_then(parse_color).map(ParamValue::Color),
            Self::Path => value
                .as_str()
                .map(|s| ParamValue::Path(PathBuf::from(s.trim()))),
            Self::PathList => value.as_array().and_then(|items| {
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(PathBuf::from)
                    })
                    .collect::<Option<Vec<_>>>()
                    .map(ParamValue::PathList)
            }),
        };
        coerced.ok_or_else(|| ValidationError::TypeMismatch {
            key: key.to_string(),
            expected: self.type_name().to_string(),
            got: describe(value),
        })
    }

    fn check_domain(&self, key: &str, value: ParamValue) -> Result<ParamValue, ValidationError> {
        match (self, value) {
            (Self::Enum(domain), ParamValue::String(raw)) => domain
                .iter()
                .find(|allowed| allowed.eq_ignore_ascii_case(&raw))
                .map(|canonical| ParamValue::String(canonical.to_string()))
                .ok_or_else(|| ValidationError::InvalidEnumValue {
                    key: key.to_string(),
                    value: raw,
                    allowed: domain.iter().map(|v| v.to_string()).collect(),
                }),
            (Self::Integer { min, max }, ParamValue::Integer(v)) => {
                if v < *min || v > *max {
                    return Err(ValidationError::OutOfRange {
                        key: key.to_string(),
                        value: v as f64,
                        min: *min as f64,
                        max: *max as f64,
                    });
                }
                Ok(ParamValue::Integer(v))
            }
            (Self::Float { min, max }, ParamValue::Float(v)) => {
                if v < *min || v > *max {
                    return Err(ValidationError::OutOfRange {
                        key: key.to_string(),
                        value: v,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(ParamValue::Float(v))
            }
            (_, value) => Ok(value),
        }
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

pub(crate) fn parse_color(raw: &str) -> Option<Rgba<u8>> {
    let value = raw.trim().to_ascii_lowercase();
    let named = match value.as_str() {
        "black" => Some([0, 0, 0, 255]),
        "white" => Some([255, 255, 255, 255]),
        "red" => Some([255, 0, 0, 255]),
        "green" => Some([0, 128, 0, 255]),
        "lime" => Some([0, 255, 0, 255]),
        "blue" => Some([0, 0, 255, 255]),
        "yellow" => Some([255, 255, 0, 255]),
        "cyan" => Some([0, 255, 255, 255]),
        "magenta" => Some([255, 0, 255, 255]),
        "orange" => Some([255, 165, 0, 255]),
        "purple" => Some([128, 0, 128, 255]),
        "gray" | "grey" => Some([128, 128, 128, 255]),
        "transparent" => Some([0, 0, 0, 0]),
        _ => None,
    };
    if let Some(rgba) = named {
        return Some(Rgba(rgba));
    }

    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let digit = channel(&c.to_string())?;
                out[i] = digit * 17;
            }
            Some(Rgba(out))
        }
        6 | 8 => {
            let mut out = [0u8, 0, 0, 255];
            for i in 0..hex.len() / 2 {
                out[i] = channel(&hex[i * 2..i * 2 + 2])?;
            }
            Some(Rgba(out))
        }
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string '{}'", s.chars().take(64).collect::<String>()),
        Value::Array(_) => String::from("array"),
        Value::Object(_) => String::from("object"),
    }
}
