use image::{imageops, DynamicImage, RgbaImage};

use crate::tools::error::ProcessingError;

pub(super) fn apply(
    image: &DynamicImage,
    effect: &str,
    radius: f32,
    level: f32,
) -> Result<DynamicImage, ProcessingError> {
    let mut out = image.to_rgba8();
    match effect {
        "blur" => out = imageops::blur(&out, radius.max(0.1)),
        "sharpen" => out = apply_sharpen(&out, radius.max(0.1)),
        "brightness" => apply_brightness_in_place(&mut out, level_factor(level)),
        "contrast" => apply_contrast_in_place(&mut out, level_factor(level)),
        "grayscale" => apply_grayscale_in_place(&mut out),
        "sepia" => apply_sepia_in_place(&mut out),
        "negative" => apply_negative_in_place(&mut out),
        other => {
            return Err(ProcessingError::failure(format!(
                "unknown effect '{other}'"
            )))
        }
    }
    Ok(DynamicImage::ImageRgba8(out))
}

// -100..100 maps onto 0.0..2.0
fn level_factor(level: f32) -> f32 {
    ((100.0 + level) / 100.0).max(0.0)
}

fn apply_brightness_in_place(image: &mut RgbaImage, factor: f32) {
    for pixel in image.pixels_mut() {
        for i in 0..3 {
            pixel[i] = clamp_u8(f32::from(pixel[i]) * factor);
        }
    }
}

fn apply_contrast_in_place(image: &mut RgbaImage, factor: f32) {
    for pixel in image.pixels_mut() {
        for i in 0..3 {
            let centered = f32::from(pixel[i]) - 128.0;
            pixel[i] = clamp_u8(centered * factor + 128.0);
        }
    }
}

fn apply_grayscale_in_place(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let gray = luma(pixel[0], pixel[1], pixel[2]);
        pixel[0] = gray;
        pixel[1] = gray;
        pixel[2] = gray;
    }
}

fn apply_sepia_in_place(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let r = f32::from(pixel[0]);
        let g = f32::from(pixel[1]);
        let b = f32::from(pixel[2]);
        pixel[0] = clamp_u8(0.393 * r + 0.769 * g + 0.189 * b);
        pixel[1] = clamp_u8(0.349 * r + 0.686 * g + 0.168 * b);
        pixel[2] = clamp_u8(0.272 * r + 0.534 * g + 0.131 * b);
    }
}

fn apply_negative_in_place(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        for i in 0..3 {
            pixel[i] = u8::MAX - pixel[i];
        }
    }
}

fn apply_sharpen(image: &RgbaImage, sigma: f32) -> RgbaImage {
    let blurred = imageops::blur(image, sigma);
    let mut out = image.clone();
    for (dst, (orig, blur)) in out.pixels_mut().zip(image.pixels().zip(blurred.pixels())) {
        for i in 0..3 {
            let val = f32::from(orig[i]) + (f32::from(orig[i]) - f32::from(blur[i]));
            dst[i] = clamp_u8(val);
        }
    }
    out
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b))
}

fn clamp_u8(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba(px)))
    }

    fn first_pixel(image: DynamicImage) -> Rgba<u8> {
        *image.to_rgba8().get_pixel(1, 1)
    }

    #[test]
    fn negative_keeps_alpha() {
        let out = apply(&solid([10, 20, 30, 77]), "negative", 2.0, 0.0).expect("negative");
        assert_eq!(first_pixel(out), Rgba([245, 235, 225, 77]));
    }

    #[test]
    fn brightness_level_scales_channels() {
        let brighter = apply(&solid([100, 100, 100, 255]), "brightness", 2.0, 50.0).expect("bright");
        assert_eq!(first_pixel(brighter), Rgba([150, 150, 150, 255]));
        let darker = apply(&solid([100, 100, 100, 255]), "brightness", 2.0, -100.0).expect("dark");
        assert_eq!(first_pixel(darker), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn contrast_stretches_around_mid_gray() {
        let punchy = apply(&solid([178, 78, 128, 90]), "contrast", 2.0, 100.0).expect("contrast");
        assert_eq!(first_pixel(punchy), Rgba([228, 28, 128, 90]));
        let flat = apply(&solid([178, 78, 128, 90]), "contrast", 2.0, -100.0).expect("flat");
        assert_eq!(first_pixel(flat), Rgba([128, 128, 128, 90]));
    }

    #[test]
    fn grayscale_and_sepia_use_fixed_weights() {
        let gray = apply(&solid([255, 0, 0, 255]), "grayscale", 2.0, 0.0).expect("gray");
        assert_eq!(first_pixel(gray), Rgba([76, 76, 76, 255]));
        let sepia = apply(&solid([100, 100, 100, 255]), "sepia", 2.0, 0.0).expect("sepia");
        assert_eq!(first_pixel(sepia), Rgba([135, 120, 94, 255]));
    }

    #[test]
    fn blur_and_sharpen_keep_dimensions() {
        for effect in ["blur", "sharpen"] {
            let out = apply(&solid([40, 80, 120, 255]), effect, 1.5, 0.0).expect("filter");
            assert_eq!((out.width(), out.height()), (3, 3));
        }
    }

    #[test]
    fn unknown_effect_is_a_processing_failure() {
        let err = apply(&solid([0, 0, 0, 255]), "vignette", 2.0, 0.0).expect_err("unknown");
        assert!(matches!(err, ProcessingError::ProcessingFailure { .. }));
    }
}
