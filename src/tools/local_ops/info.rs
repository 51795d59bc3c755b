use std::path::Path;

use image::{ColorType, GenericImageView};

use super::LoadedImage;

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

pub(super) fn describe(path: &Path, source: &LoadedImage, file_size: u64) -> String {
    let (width, height) = source.image.dimensions();
    let color = source.image.color();
    let format = source
        .format
        .map(|f| format!("{f:?}").to_ascii_uppercase())
        .unwrap_or_else(|| String::from("UNKNOWN"));
    let rows = [
        ("path", path.display().to_string()),
        ("format", format),
        ("width", width.to_string()),
        ("height", height.to_string()),
        ("color_type", color_name(color).to_string()),
        ("has_alpha", color.has_alpha().to_string()),
        ("bits_per_pixel", color.bits_per_pixel().to_string()),
        ("file_size", format_file_size(file_size)),
    ];
    let body = rows
        .iter()
        .map(|(key, value)| format!("  {key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Image Information:\n{body}")
}

fn color_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 => "grayscale",
        ColorType::La8 | ColorType::La16 => "grayscale+alpha",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "rgb",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "rgba",
        _ => "other",
    }
}
