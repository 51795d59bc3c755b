use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::tools::error::ProcessingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    Center,
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Gravity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" => Some(Self::Center),
            "north" => Some(Self::North),
            "south" => Some(Self::South),
            "east" => Some(Self::East),
            "west" => Some(Self::West),
            "north_east" => Some(Self::NorthEast),
            "north_west" => Some(Self::NorthWest),
            "south_east" => Some(Self::SouthEast),
            "south_west" => Some(Self::SouthWest),
            _ => None,
        }
    }

    fn offset(self, outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
        let (free_x, free_y) = (outer.0 - inner.0, outer.1 - inner.1);
        let x = match self {
            Self::West | Self::NorthWest | Self::SouthWest => 0,
            Self::East | Self::NorthEast | Self::SouthEast => free_x,
            Self::Center | Self::North | Self::South => free_x / 2,
        };
        let y = match self {
            Self::North | Self::NorthEast | Self::NorthWest => 0,
            Self::South | Self::SouthEast | Self::SouthWest => free_y,
            Self::Center | Self::East | Self::West => free_y / 2,
        };
        (x, y)
    }
}

pub(super) fn resize(
    image: &DynamicImage,
    width: Option<u32>,
    height: Option<u32>,
    maintain_aspect: bool,
) -> Result<DynamicImage, ProcessingError> {
    let (src_w, src_h) = image.dimensions();
    let (w, h) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) if maintain_aspect => (w, scaled(src_h, w, src_w)),
        (None, Some(h)) if maintain_aspect => (scaled(src_w, h, src_h), h),
        (Some(w), None) => (w, src_h),
        (None, Some(h)) => (src_w, h),
        (None, None) => {
            return Err(ProcessingError::failure(
                "at least one of width or height must be given",
            ))
        }
    };
    Ok(image.resize_exact(w.max(1), h.max(1), FilterType::Lanczos3))
}

fn scaled(side: u32, target: u32, reference: u32) -> u32 {
    if reference == 0 {
        return target;
    }
    ((u64::from(side) * u64::from(target)) / u64::from(reference)).max(1) as u32
}

pub(super) fn crop_absolute(
    image: &DynamicImage,
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
) -> Result<DynamicImage, ProcessingError> {
    let (w, h) = image.dimensions();
    if left >= right || top >= bottom {
        return Err(ProcessingError::failure(format!(
            "crop box ({left}, {top}, {right}, {bottom}) is empty"
        )));
    }
    if right > w || bottom > h {
        return Err(ProcessingError::failure(format!(
            "crop box ({left}, {top}, {right}, {bottom}) lies outside the {w}x{h} image"
        )));
    }
    Ok(image.crop_imm(left, top, right - left, bottom - top))
}

pub(super) fn crop_gravity(
    image: &DynamicImage,
    width: u32,
    height: u32,
    gravity: Gravity,
) -> Result<DynamicImage, ProcessingError> {
    let (w, h) = image.dimensions();
    if width > w || height > h {
        return Err(ProcessingError::failure(format!(
            "crop size {width}x{height} exceeds the {w}x{h} image"
        )));
    }
    let (x, y) = gravity.offset((w, h), (width, height));
    Ok(image.crop_imm(x, y, width, height))
}

/// Clockwise rotation. Quarter turns are lossless; other angles expand the
/// canvas to the rotated bounding box and fill exposed areas with `background`.
pub(super) fn rotate(image: &DynamicImage, degrees: f64, background: Rgba<u8>) -> DynamicImage {
    let normalized = degrees.rem_euclid(360.0);
    let quarter = (normalized / 90.0).round();
    if (normalized - quarter * 90.0).abs() < 1e-9 {
        return match quarter as u32 % 4 {
            1 => image.rotate90(),
            2 => image.rotate180(),
            3 => image.rotate270(),
            _ => image.clone(),
        };
    }

    let src = image.to_rgba8();
    let (src_w, src_h) = (f64::from(src.width()), f64::from(src.height()));
    let theta = normalized.to_radians();
    let (sin, cos) = theta.sin_cos();
    let out_w = (src_w * cos.abs() + src_h * sin.abs()).ceil().max(1.0);
    let out_h = (src_w * sin.abs() + src_h * cos.abs()).ceil().max(1.0);
    let (cx_src, cy_src) = (src_w / 2.0, src_h / 2.0);
    let (cx_out, cy_out) = (out_w / 2.0, out_h / 2.0);

    let mut out = RgbaImage::from_pixel(out_w as u32, out_h as u32, background);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = f64::from(x) + 0.5 - cx_out;
        let dy = f64::from(y) + 0.5 - cy_out;
        let sx = dx * cos + dy * sin + cx_src - 0.5;
        let sy = -dx * sin + dy * cos + cy_src - 0.5;
        *px = sample_bilinear(&src, sx, sy, background);
    }
    DynamicImage::ImageRgba8(out)
}

fn sample_bilinear(src: &RgbaImage, x: f64, y: f64, background: Rgba<u8>) -> Rgba<u8> {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let fetch = |ix: f64, iy: f64| -> [f64; 4] {
        let inside = ix >= 0.0
            && iy >= 0.0
            && ix < f64::from(src.width())
            && iy < f64::from(src.height());
        let p = if inside {
            *src.get_pixel(ix as u32, iy as u32)
        } else {
            background
        };
        [p[0], p[1], p[2], p[3]].map(f64::from)
    };
    let tl = fetch(x0, y0);
    let tr = fetch(x0 + 1.0, y0);
    let bl = fetch(x0, y0 + 1.0);
    let br = fetch(x0 + 1.0, y0 + 1.0);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = tl[i] + (tr[i] - tl[i]) * fx;
        let bottom = bl[i] + (br[i] - bl[i]) * fx;
        out[i] = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

pub(super) fn flip(image: &DynamicImage, direction: &str) -> DynamicImage {
    match direction {
        "vertical" => image.flipv(),
        _ => image.fliph(),
    }
}

pub(super) fn thumbnail(image: &DynamicImage, size: u32) -> DynamicImage {
    let size = size.max(1);
    image.resize_to_fill(size, size, FilterType::Lanczos3)
}

pub(super) fn border(image: &DynamicImage, size: u32, color: Rgba<u8>) -> DynamicImage {
    let (w, h) = image.dimensions();
    let mut canvas = RgbaImage::from_pixel(w + 2 * size, h + 2 * size, color);
    imageops::overlay(&mut canvas, &image.to_rgba8(), i64::from(size), i64::from(size));
    DynamicImage::ImageRgba8(canvas)
}

pub(super) fn composite(
    base: &DynamicImage,
    overlay: &DynamicImage,
    x: i64,
    y: i64,
    opacity: f32,
) -> DynamicImage {
    let mut canvas = base.to_rgba8();
    let mut layer = overlay.to_rgba8();
    if opacity < 1.0 {
        let factor = opacity.clamp(0.0, 1.0);
        for px in layer.pixels_mut() {
            px[3] = (f32::from(px[3]) * factor).round() as u8;
        }
    }
    imageops::overlay(&mut canvas, &layer, x, y);
    DynamicImage::ImageRgba8(canvas)
}
