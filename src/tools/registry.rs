use std::collections::BTreeMap;
use std::path::PathBuf;

use image::Rgba;
use serde::Serialize;
use serde_json::{json, Value};

use crate::tools::envelope::ContentKind;
use crate::tools::error::ValidationError;

pub const ASPECT_RATIOS: &[&str] = &[
    "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
];
pub const RESOLUTIONS: &[&str] = &["1K", "2K", "4K"];
pub const EFFECT_KINDS: &[&str] = &[
    "blur",
    "sharpen",
    "brightness",
    "contrast",
    "grayscale",
    "sepia",
    "negative",
];
pub const GRAVITY_ANCHORS: &[&str] = &[
    "center",
    "north",
    "south",
    "east",
    "west",
    "north_east",
    "north_west",
    "south_east",
    "south_west",
];
pub const FLIP_DIRECTIONS: &[&str] = &["horizontal", "vertical"];
pub const TARGET_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff"];
pub const DETAIL_LEVELS: &[&str] = &["brief", "detailed", "technical"];

pub const FLASH_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const PRO_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Generative,
    Local,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generative => "generative",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String,
    Enum(&'static [&'static str]),
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Boolean,
    Color,
    Path,
    PathList,
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Enum(_) => "enum",
            Self::Integer { .. } => "integer",
            Self::Float { .. } => "float",
            Self::Boolean => "boolean",
            Self::Color => "color",
            Self::Path => "path",
            Self::PathList => "path-list",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Color(Rgba<u8>),
    Path(PathBuf),
    PathList(Vec<PathBuf>),
}

impl ParamValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(v) => json!(v),
            Self::Integer(v) => json!(v),
            Self::Float(v) => json!(v),
            Self::Boolean(v) => json!(v),
            Self::Color(c) => json!(format!("#{:02x}{:02x}{:02x}{:02x}", c[0], c[1], c[2], c[3])),
            Self::Path(p) => json!(p.display().to_string()),
            Self::PathList(list) => json!(list
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub description: &'static str,
}

impl ParamDecl {
    pub fn required(key: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            key,
            aliases: &[],
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(key: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(key, kind, description)
        }
    }

    pub fn with_default(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn descriptor(&self) -> Value {
        let mut out = json!({
            "key": self.key,
            "type": self.kind.type_name(),
            "required": self.required,
            "description": self.description,
        });
        if !self.aliases.is_empty() {
            out["aliases"] = json!(self.aliases);
        }
        if let Some(default) = self.default.as_ref() {
            out["default"] = default.to_json();
        }
        match &self.kind {
            ParamKind::Enum(domain) => out["allowed"] = json!(domain),
            ParamKind::Integer { min, max } => {
                out["min"] = json!(min);
                out["max"] = json!(max);
            }
            ParamKind::Float { min, max } => {
                out["min"] = json!(min);
                out["max"] = json!(max);
            }
            _ => {}
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub backend: BackendKind,
    pub output: ContentKind,
    pub description: &'static str,
    pub params: Vec<ParamDecl>,
    /// At least one group must be fully present.
    pub required_groups: Vec<Vec<&'static str>>,
}

impl ToolSpec {
    pub fn param(&self, key: &str) -> Option<&ParamDecl> {
        self.params.iter().find(|p| p.key == key)
    }

    pub fn descriptor(&self) -> Value {
        let mut out = json!({
            "name": self.name,
            "backend": self.backend.as_str(),
            "output": self.output.as_str(),
            "description": self.description,
            "parameters": self.params.iter().map(ParamDecl::descriptor).collect::<Vec<_>>(),
        });
        if !self.required_groups.is_empty() {
            out["required_one_of"] = json!(self.required_groups);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCapability {
    pub model: String,
    pub max_reference_images: usize,
    pub resolutions: Vec<&'static str>,
    pub aspect_ratios: Vec<&'static str>,
}

impl ModelCapability {
    pub fn supports_resolution(&self, resolution: &str) -> bool {
        self.resolutions.contains(&resolution)
    }

    pub fn supports_aspect_ratio(&self, aspect_ratio: &str) -> bool {
        self.aspect_ratios.contains(&aspect_ratio)
    }

    /// Only the 4K-capable tier takes an explicit `imageSize`; the others
    /// reject the field.
    pub fn accepts_image_size(&self) -> bool {
        self.resolutions.len() > 1 && self.supports_resolution("4K")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationDefaults {
    pub model: String,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            model: String::from(FLASH_IMAGE_MODEL),
            resolution: String::from("1K"),
            aspect_ratio: String::from("1:1"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    models: BTreeMap<String, ModelCapability>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolSpec>, models: Vec<ModelCapability>) -> Self {
        Self {
            tools,
            models: models
                .into_iter()
                .map(|m| (m.model.clone(), m))
                .collect(),
        }
    }

    pub fn builtin(defaults: &GenerationDefaults) -> Self {
        Self::new(builtin_tools(defaults), builtin_models())
    }

    pub fn lookup(&self, tool: &str) -> Result<&ToolSpec, ValidationError> {
        self.tools
            .iter()
            .find(|spec| spec.name == tool)
            .ok_or_else(|| ValidationError::UnknownTool(tool.to_string()))
    }

    pub fn capability_of(&self, model: &str) -> Result<&ModelCapability, ValidationError> {
        self.models
            .get(model)
            .ok_or_else(|| ValidationError::UnknownModel(model.to_string()))
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelCapability> {
        self.models.values()
    }

    pub fn catalog(&self) -> Value {
        json!({
            "tools": self.tools.iter().map(ToolSpec::descriptor).collect::<Vec<_>>(),
            "models": self.models.values().collect::<Vec<_>>(),
        })
    }
}

pub fn builtin_models() -> Vec<ModelCapability> {
    vec![
        ModelCapability {
            model: String::from(FLASH_IMAGE_MODEL),
            max_reference_images: 3,
            resolutions: vec!["1K", "2K"],
            aspect_ratios: ASPECT_RATIOS.to_vec(),
        },
        ModelCapability {
            model: String::from(PRO_IMAGE_MODEL),
            max_reference_images: 14,
            resolutions: RESOLUTIONS.to_vec(),
            aspect_ratios: ASPECT_RATIOS.to_vec(),
        },
    ]
}

fn source_path() -> ParamDecl {
    ParamDecl::required("sourcePath", ParamKind::Path, "Path to the input image")
        .with_aliases(&["source_path", "image_path"])
}

fn output_path() -> ParamDecl {
    ParamDecl::optional(
        "outputPath",
        ParamKind::Path,
        "Explicit output file path; generated under the output directory when omitted",
    )
    .with_aliases(&["output_path"])
}

fn model(defaults: &GenerationDefaults) -> ParamDecl {
    ParamDecl::optional("model", ParamKind::String, "Generative model identifier")
        .with_default(ParamValue::String(defaults.model.clone()))
}

fn aspect_ratio(default: Option<&str>) -> ParamDecl {
    let decl = ParamDecl::optional(
        "aspectRatio",
        ParamKind::Enum(ASPECT_RATIOS),
        "Output aspect ratio",
    )
    .with_aliases(&["aspect_ratio"]);
    match default {
        Some(v) => decl.with_default(ParamValue::String(v.to_string())),
        None => decl,
    }
}

fn resolution(default: Option<&str>) -> ParamDecl {
    let decl = ParamDecl::optional(
        "resolution",
        ParamKind::Enum(RESOLUTIONS),
        "Output resolution tier",
    );
    match default {
        Some(v) => decl.with_default(ParamValue::String(v.to_string())),
        None => decl,
    }
}

fn int(min: i64, max: i64) -> ParamKind {
    ParamKind::Integer { min, max }
}

fn float(min: f64, max: f64) -> ParamKind {
    ParamKind::Float { min, max }
}

const MAX_DIMENSION: i64 = 16_384;

pub fn builtin_tools(defaults: &GenerationDefaults) -> Vec<ToolSpec> {
    let default_aspect = Some(defaults.aspect_ratio.as_str());
    let default_resolution = Some(defaults.resolution.as_str());
    vec![
        ToolSpec {
            name: "generate-image",
            backend: BackendKind::Generative,
            output: ContentKind::Image,
            description: "Generate an image from a text prompt",
            params: vec![
                ParamDecl::required("prompt", ParamKind::String, "Description of the image"),
                model(defaults),
                aspect_ratio(default_aspect),
                resolution(default_resolution),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "edit-image",
            backend: BackendKind::Generative,
            output: ContentKind::Image,
            description: "Edit an existing image following text instructions",
            params: vec![
                source_path(),
                ParamDecl::required(
                    "instruction",
                    ParamKind::String,
                    "How the image should be changed",
                )
                .with_aliases(&["prompt"]),
                model(defaults),
                aspect_ratio(None),
                resolution(None),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "generate-with-references",
            backend: BackendKind::Generative,
            output: ContentKind::Image,
            description: "Generate an image guided by an ordered list of reference images",
            params: vec![
                ParamDecl::required("prompt", ParamKind::String, "Description of the image"),
                ParamDecl::required(
                    "referenceImages",
                    ParamKind::PathList,
                    "Reference image paths, in priority order",
                )
                .with_aliases(&["reference_images"]),
                model(defaults),
                aspect_ratio(default_aspect),
                resolution(default_resolution),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "describe-image",
            backend: BackendKind::Generative,
            output: ContentKind::Text,
            description: "Describe the contents of an image",
            params: vec![
                source_path(),
                ParamDecl::optional(
                    "detailLevel",
                    ParamKind::Enum(DETAIL_LEVELS),
                    "How much detail to include",
                )
                .with_aliases(&["detail_level"])
                .with_default(ParamValue::String(String::from("detailed"))),
                model(defaults),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "resize",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Resize an image",
            params: vec![
                source_path(),
                ParamDecl::optional("width", int(1, MAX_DIMENSION), "Target width in pixels"),
                ParamDecl::optional("height", int(1, MAX_DIMENSION), "Target height in pixels"),
                ParamDecl::optional(
                    "maintainAspect",
                    ParamKind::Boolean,
                    "Derive the missing dimension from the source aspect ratio",
                )
                .with_aliases(&["maintain_aspect"])
                .with_default(ParamValue::Boolean(true)),
                output_path(),
            ],
            required_groups: vec![vec!["width"], vec!["height"]],
        },
        ToolSpec {
            name: "crop",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Crop by absolute coordinates or by size and gravity anchor",
            params: vec![
                source_path(),
                ParamDecl::optional("left", int(0, MAX_DIMENSION), "Left edge (absolute mode)"),
                ParamDecl::optional("top", int(0, MAX_DIMENSION), "Top edge (absolute mode)"),
                ParamDecl::optional("right", int(1, MAX_DIMENSION), "Right edge (absolute mode)"),
                ParamDecl::optional(
                    "bottom",
                    int(1, MAX_DIMENSION),
                    "Bottom edge (absolute mode)",
                ),
                ParamDecl::optional("width", int(1, MAX_DIMENSION), "Width (gravity mode)"),
                ParamDecl::optional("height", int(1, MAX_DIMENSION), "Height (gravity mode)"),
                ParamDecl::optional(
                    "gravity",
                    ParamKind::Enum(GRAVITY_ANCHORS),
                    "Anchor for gravity mode",
                )
                .with_default(ParamValue::String(String::from("center"))),
                output_path(),
            ],
            required_groups: vec![vec!["left", "top", "right", "bottom"], vec!["width", "height"]],
        },
        ToolSpec {
            name: "rotate",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Rotate clockwise by an arbitrary angle",
            params: vec![
                source_path(),
                ParamDecl::required("degrees", float(-360.0, 360.0), "Clockwise rotation"),
                ParamDecl::optional(
                    "backgroundColor",
                    ParamKind::Color,
                    "Fill for areas exposed by the rotation",
                )
                .with_aliases(&["background_color"])
                .with_default(ParamValue::Color(Rgba([0, 0, 0, 0]))),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "flip",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Mirror an image horizontally or vertically",
            params: vec![
                source_path(),
                ParamDecl::optional(
                    "direction",
                    ParamKind::Enum(FLIP_DIRECTIONS),
                    "Flip direction",
                )
                .with_default(ParamValue::String(String::from("horizontal"))),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "convert",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Convert an image to another file format",
            params: vec![
                source_path(),
                ParamDecl::required(
                    "targetFormat",
                    ParamKind::Enum(TARGET_FORMATS),
                    "Target file format",
                )
                .with_aliases(&["target_format", "format"]),
                ParamDecl::optional("quality", int(1, 100), "Quality for lossy formats")
                    .with_default(ParamValue::Integer(90)),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "effects",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Apply a color or filter effect",
            params: vec![
                source_path(),
                ParamDecl::required(
                    "effect",
                    ParamKind::Enum(EFFECT_KINDS),
                    "Effect to apply",
                ),
                ParamDecl::optional(
                    "radius",
                    float(0.1, 100.0),
                    "Sigma for blur and sharpen",
                )
                .with_default(ParamValue::Float(2.0)),
                ParamDecl::optional(
                    "level",
                    float(-100.0, 100.0),
                    "Adjustment for brightness and contrast",
                )
                .with_default(ParamValue::Float(20.0)),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "composite",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Overlay one image onto another",
            params: vec![
                source_path().with_aliases(&["source_path", "image_path", "base_image"]),
                ParamDecl::required("overlayPath", ParamKind::Path, "Image to place on top")
                    .with_aliases(&["overlay_path", "overlay_image"]),
                ParamDecl::optional("x", int(-MAX_DIMENSION, MAX_DIMENSION), "Overlay left offset")
                    .with_aliases(&["position_x"])
                    .with_default(ParamValue::Integer(0)),
                ParamDecl::optional("y", int(-MAX_DIMENSION, MAX_DIMENSION), "Overlay top offset")
                    .with_aliases(&["position_y"])
                    .with_default(ParamValue::Integer(0)),
                ParamDecl::optional("opacity", float(0.0, 1.0), "Overlay opacity")
                    .with_default(ParamValue::Float(1.0)),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "thumbnail",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Create a square, center-cropped thumbnail",
            params: vec![
                source_path(),
                ParamDecl::optional("size", int(1, 4096), "Edge length in pixels")
                    .with_default(ParamValue::Integer(256)),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "info",
            backend: BackendKind::Local,
            output: ContentKind::Text,
            description: "Report format, dimensions and color information",
            params: vec![source_path()],
            required_groups: Vec::new(),
        },
        ToolSpec {
            name: "border",
            backend: BackendKind::Local,
            output: ContentKind::Image,
            description: "Surround an image with a solid border",
            params: vec![
                source_path(),
                ParamDecl::optional("borderSize", int(0, 1000), "Border width in pixels")
                    .with_aliases(&["border_size"])
                    .with_default(ParamValue::Integer(10)),
                ParamDecl::optional("borderColor", ParamKind::Color, "Border color")
                    .with_aliases(&["border_color"])
                    .with_default(ParamValue::Color(Rgba([0, 0, 0, 255]))),
                output_path(),
            ],
            required_groups: Vec::new(),
        },
    ]
}
