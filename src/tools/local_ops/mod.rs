use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};

use crate::tools::error::{DispatchError, ProcessingError};
use crate::tools::validator::NormalizedRequest;
use crate::tools::{AdapterOutput, ToolAdapter};

mod effects;
mod geometry;
mod info;

pub use geometry::Gravity;
pub use info::format_file_size;

const DEFAULT_JPEG_QUALITY: u8 = 90;
const ENCODABLE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAdapter;

impl LocalAdapter {
    pub fn new() -> Self {
        Self
    }

    fn transform(
        &self,
        request: &NormalizedRequest,
        source: &LoadedImage,
    ) -> Result<DynamicImage, ProcessingError> {
        let image = &source.image;
        match request.tool.as_str() {
            "resize" => geometry::resize(
                image,
                dimension(request, "width")?,
                dimension(request, "height")?,
                request.boolean("maintainAspect").unwrap_or(true),
            ),
            "crop" => {
                let absolute = ["left", "top", "right", "bottom"]
                    .iter()
                    .map(|key| dimension(request, key))
                    .collect::<Result<Vec<_>, _>>()?;
                if let [Some(left), Some(top), Some(right), Some(bottom)] = absolute.as_slice() {
                    geometry::crop_absolute(image, *left, *top, *right, *bottom)
                } else {
                    let width = dimension(request, "width")?.unwrap_or(image.width());
                    let height = dimension(request, "height")?.unwrap_or(image.height());
                    let gravity = request
                        .str("gravity")
                        .map(Gravity::parse)
                        .unwrap_or(Some(Gravity::Center))
                        .ok_or_else(|| ProcessingError::failure("unknown gravity anchor"))?;
                    geometry::crop_gravity(image, width, height, gravity)
                }
            }
            "rotate" => Ok(geometry::rotate(
                image,
                request.float("degrees").unwrap_or(0.0),
                request.color("backgroundColor").unwrap_or(image::Rgba([0, 0, 0, 0])),
            )),
            "flip" => Ok(geometry::flip(
                image,
                request.str("direction").unwrap_or("horizontal"),
            )),
            "convert" => Ok(image.clone()),
            "effects" => effects::apply(
                image,
                request.str("effect").unwrap_or_default(),
                request.float("radius").unwrap_or(2.0) as f32,
                request.float("level").unwrap_or(20.0) as f32,
            ),
            "composite" => {
                let overlay_path = request
                    .path("overlayPath")
                    .ok_or_else(|| ProcessingError::failure("missing overlay path"))?;
                let overlay = load_image(overlay_path)?;
                Ok(geometry::composite(
                    image,
                    &overlay.image,
                    request.integer("x").unwrap_or(0),
                    request.integer("y").unwrap_or(0),
                    request.float("opacity").unwrap_or(1.0) as f32,
                ))
            }
            "thumbnail" => Ok(geometry::thumbnail(
                image,
                dimension(request, "size")?.unwrap_or(256),
            )),
            "border" => Ok(geometry::border(
                image,
                dimension(request, "borderSize")?.unwrap_or(10),
                request.color("borderColor").unwrap_or(image::Rgba([0, 0, 0, 255])),
            )),
            other => Err(ProcessingError::failure(format!(
                "tool '{other}' is not served by the local backend"
            ))),
        }
    }
}

impl ToolAdapter for LocalAdapter {
    fn invoke(&self, request: &NormalizedRequest) -> Result<AdapterOutput, DispatchError> {
        let source_path = request
            .path("sourcePath")
            .ok_or_else(|| ProcessingError::failure("missing source path"))?;
        let source = load_image(source_path)?;

        if request.tool == "info" {
            let file_size = std::fs::metadata(source_path)
                .map(|m| m.len())
                .map_err(|e| ProcessingError::failure(format!("stat failed: {e}")))?;
            return Ok(AdapterOutput::Text(info::describe(
                source_path,
                &source,
                file_size,
            )));
        }

        let transformed = self.transform(request, &source)?;
        let (format, extension) = output_format(request, source.format);
        let quality = request
            .integer("quality")
            .and_then(|q| u8::try_from(q).ok())
            .unwrap_or(DEFAULT_JPEG_QUALITY);
        let bytes = encode(&transformed, format, quality)?;
        tracing::debug!(
            tool = request.tool.as_str(),
            width = transformed.width(),
            height = transformed.height(),
            extension = extension.as_str(),
            "local transform finished"
        );
        Ok(AdapterOutput::Image {
            bytes,
            extension,
            notes: None,
        })
    }
}

pub(crate) struct LoadedImage {
    pub(crate) image: DynamicImage,
    pub(crate) format: Option<ImageFormat>,
}

pub(crate) fn load_image(path: &Path) -> Result<LoadedImage, ProcessingError> {
    if !path.is_file() {
        return Err(ProcessingError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| ProcessingError::failure(format!("open '{}': {e}", path.display())))?;
    let format = reader.format();
    let image = reader.decode().map_err(|error| match error {
        ImageError::Unsupported(_) | ImageError::Decoding(_) => ProcessingError::UnsupportedFormat {
            path: path.to_path_buf(),
            detail: error.to_string(),
        },
        other => ProcessingError::failure(format!("decode '{}': {other}", path.display())),
    })?;
    Ok(LoadedImage { image, format })
}

fn dimension(request: &NormalizedRequest, key: &str) -> Result<Option<u32>, ProcessingError> {
    request
        .integer(key)
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| ProcessingError::failure(format!("'{key}' must be non-negative")))
        })
        .transpose()
}

pub(crate) fn format_for_extension(ext: &str) -> Option<ImageFormat> {
    match ext.trim().to_ascii_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "webp" => Some(ImageFormat::WebP),
        "gif" => Some(ImageFormat::Gif),
        "bmp" => Some(ImageFormat::Bmp),
        "tif" | "tiff" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

fn default_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "png",
    }
}

/// Conversion target first, then an explicit output extension, then the
/// per-tool fallback (PNG for rotate and composite, the source format otherwise).
fn output_format(
    request: &NormalizedRequest,
    source_format: Option<ImageFormat>,
) -> (ImageFormat, String) {
    if let Some(target) = request.str("targetFormat") {
        if let Some(format) = format_for_extension(target) {
            return (format, target.to_ascii_lowercase());
        }
    }
    let explicit = request
        .path("outputPath")
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if let Some(ext) = explicit {
        if let Some(format) = format_for_extension(ext.as_str()) {
            return (format, ext);
        }
    }
    let format = match request.tool.as_str() {
        "rotate" | "composite" => ImageFormat::Png,
        _ => source_format
            .filter(|f| ENCODABLE_FORMATS.contains(f))
            .unwrap_or(ImageFormat::Png),
    };
    (format, default_extension(format).to_string())
}

pub(crate) fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
) -> Result<Vec<u8>, ProcessingError> {
    let mut cursor = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
        }
        other => DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut cursor, other),
    };
    result.map_err(|e| ProcessingError::failure(format!("encode {format:?} failed: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::{GenerationDefaults, ToolRegistry};
    use crate::tools::validator::validate;
    use image::{GenericImageView, Rgba, RgbaImage};
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("image_tools_local_{tag}_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir should be created");
        dir
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let mut img = RgbaImage::new(width, height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 10) as u8, (y * 10) as u8, 128, 255]);
        }
        let path = dir.join(name);
        img.save(&path).expect("png should be written");
        path
    }

    fn run(tool: &str, args: Value) -> Result<AdapterOutput, DispatchError> {
        let registry = ToolRegistry::builtin(&GenerationDefaults::default());
        let request = validate(&registry, tool, &args).expect("request should validate");
        LocalAdapter::new().invoke(&request)
    }

    fn decode(output: AdapterOutput) -> (DynamicImage, String) {
        match output {
            AdapterOutput::Image {
                bytes, extension, ..
            } => (
                image::load_from_memory(&bytes).expect("output should decode"),
                extension,
            ),
            AdapterOutput::Text(text) => panic!("expected image output, got text: {text}"),
        }
    }

    #[test]
    fn resize_keeps_aspect_when_one_side_given() {
        let dir = temp_dir("resize");
        let src = write_png(&dir, "wide.png", 20, 10);
        let (img, ext) = decode(run("resize", json!({ "sourcePath": src, "width": 10 })).expect("resize"));
        assert_eq!(img.dimensions(), (10, 5));
        assert_eq!(ext, "png");

        let (stretched, _) = decode(
            run(
                "resize",
                json!({ "sourcePath": src, "width": 10, "maintainAspect": false }),
            )
            .expect("resize"),
        );
        assert_eq!(stretched.dimensions(), (10, 10));
    }

    #[test]
    fn crop_supports_both_modes_and_rejects_outside_regions() {
        let dir = temp_dir("crop");
        let src = write_png(&dir, "grid.png", 20, 20);
        let (abs, _) = decode(
            run(
                "crop",
                json!({ "sourcePath": src, "left": 2, "top": 3, "right": 12, "bottom": 8 }),
            )
            .expect("absolute crop"),
        );
        assert_eq!(abs.dimensions(), (10, 5));
        assert_eq!(abs.get_pixel(0, 0), Rgba([20, 30, 128, 255]));

        let (anchored, _) = decode(
            run(
                "crop",
                json!({ "sourcePath": src, "width": 4, "height": 4, "gravity": "south_east" }),
            )
            .expect("gravity crop"),
        );
        assert_eq!(anchored.get_pixel(0, 0), Rgba([160, 160, 128, 255]));

        let err = run(
            "crop",
            json!({ "sourcePath": src, "left": 0, "top": 0, "right": 40, "bottom": 5 }),
        )
        .expect_err("outside the image");
        assert_eq!(err.code(), "processing_failure");
    }

    #[test]
    fn rotate_quarter_turn_swaps_dimensions_and_outputs_png() {
        let dir = temp_dir("rotate");
        let src = write_png(&dir, "tall.png", 4, 8);
        let (img, ext) = decode(run("rotate", json!({ "sourcePath": src, "degrees": 90 })).expect("rotate"));
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(ext, "png");

        let (tilted, _) = decode(
            run(
                "rotate",
                json!({ "sourcePath": src, "degrees": 45, "backgroundColor": "white" }),
            )
            .expect("rotate"),
        );
        assert!(tilted.width() > 4 && tilted.height() > 4);
        assert_eq!(tilted.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn convert_honors_target_format() {
        let dir = temp_dir("convert");
        let src = write_png(&dir, "photo.png", 8, 8);
        let output = run(
            "convert",
            json!({ "sourcePath": src, "targetFormat": "JPEG", "quality": 70 }),
        )
        .expect("convert");
        let AdapterOutput::Image { bytes, extension, .. } = output else {
            panic!("expected image output");
        };
        assert_eq!(extension, "jpeg");
        assert_eq!(
            image::guess_format(&bytes).expect("format should be detected"),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn border_and_thumbnail_sizes() {
        let dir = temp_dir("border");
        let src = write_png(&dir, "tile.png", 6, 4);
        let (bordered, _) = decode(
            run(
                "border",
                json!({ "sourcePath": src, "borderSize": 3, "borderColor": "#00ff00" }),
            )
            .expect("border"),
        );
        assert_eq!(bordered.dimensions(), (12, 10));
        assert_eq!(bordered.get_pixel(0, 0), Rgba([0, 255, 0, 255]));

        let (thumb, _) = decode(run("thumbnail", json!({ "sourcePath": src, "size": 3 })).expect("thumb"));
        assert_eq!(thumb.dimensions(), (3, 3));
    }

    #[test]
    fn composite_blends_overlay_with_opacity() {
        let dir = temp_dir("composite");
        let base = write_png(&dir, "base.png", 4, 4);
        let overlay_path = dir.join("overlay.png");
        RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]))
            .save(&overlay_path)
            .expect("overlay written");
        let (img, ext) = decode(
            run(
                "composite",
                json!({ "sourcePath": base, "overlayPath": overlay_path, "x": 1, "y": 1, "opacity": 0.5 }),
            )
            .expect("composite"),
        );
        assert_eq!(ext, "png");
        assert_eq!(img.get_pixel(0, 0), Rgba([0, 0, 128, 255]));
        let blended = img.get_pixel(1, 1);
        assert!(blended[0] > 120 && blended[0] < 140);
    }

    #[test]
    fn info_reports_dimensions_and_size() {
        let dir = temp_dir("info");
        let src = write_png(&dir, "meta.png", 7, 3);
        let output = run("info", json!({ "sourcePath": src })).expect("info");
        let AdapterOutput::Text(text) = output else {
            panic!("expected text output");
        };
        assert!(text.starts_with("Image Information:"));
        assert!(text.contains("width: 7"));
        assert!(text.contains("height: 3"));
        assert!(text.contains("format: PNG"));
        assert!(text.contains("has_alpha: true"));
    }

    #[test]
    fn missing_and_undecodable_sources_are_classified() {
        let dir = temp_dir("errors");
        let missing = run("flip", json!({ "sourcePath": dir.join("nope.png") })).expect_err("missing");
        assert_eq!(missing.code(), "source_not_found");

        let junk = dir.join("junk.png");
        std::fs::write(&junk, b"not an image at all").expect("junk written");
        let unsupported = run("flip", json!({ "sourcePath": junk })).expect_err("junk");
        assert_eq!(unsupported.code(), "unsupported_format");
    }
}
