use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageReader, Limits, Luma};
use imageproc::filter::median_filter;
use std::io::Cursor;
use thiserror::Error;

/// Output width in pixels; height follows the source aspect ratio.
pub const TARGET_WIDTH: u32 = 1000;

/// Luminance cut between black and white. Empirically chosen for printed
/// receipts rather than computed from the image.
pub const BINARIZE_THRESHOLD: u8 = 150;

/// Median filter radius in both directions (a 3×3 aperture).
pub const MEDIAN_RADIUS: u32 = 1;

pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Tallest bitmap handed to the engine. Narrow strips scale up by
/// `TARGET_WIDTH / width` and would otherwise allocate without bound.
pub const MAX_OUTPUT_HEIGHT: u32 = 20_000;

/// Decoder limits for untrusted uploads.
pub const MAX_INPUT_DIMENSION: u32 = 16_384;
pub const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("Image of {width}x{height} scales past {max} rows", max = MAX_OUTPUT_HEIGHT)]
    TooLarge { width: u32, height: u32 },
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// A grayscale, fixed-width, bilevel bitmap ready for OCR.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage(GrayImage);

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    /// Lossless PNG encoding, the form handed to the OCR engine.
    pub fn to_png(&self) -> Result<Vec<u8>, PreprocessError> {
        let mut buf = Vec::new();
        self.0
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Decode encoded image bytes (PNG / JPEG / WEBP / …) and normalize them.
pub fn normalize_bytes(data: &[u8]) -> Result<NormalizedImage, PreprocessError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?;
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_INPUT_DIMENSION);
    limits.max_image_height = Some(MAX_INPUT_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    let img = reader.decode()?;
    normalize(&img)
}

/// Grayscale → median denoise → resize to [`TARGET_WIDTH`] → binarize.
pub fn normalize(img: &DynamicImage) -> Result<NormalizedImage, PreprocessError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(PreprocessError::EmptyImage { width, height });
    }
    let target_height = scaled_height(width, height);
    if target_height > MAX_OUTPUT_HEIGHT {
        return Err(PreprocessError::TooLarge { width, height });
    }

    let gray = img.to_luma8();
    let denoised = median_filter(&gray, MEDIAN_RADIUS, MEDIAN_RADIUS);
    let resized = imageops::resize(
        &denoised,
        TARGET_WIDTH,
        target_height,
        RESIZE_FILTER,
    );

    Ok(NormalizedImage(binarize(resized)))
}

/// `round(height * TARGET_WIDTH / width)`, never less than one row.
pub fn scaled_height(width: u32, height: u32) -> u32 {
    let scaled = (f64::from(height) * f64::from(TARGET_WIDTH) / f64::from(width)).round();
    (scaled as u32).max(1)
}

fn binarize(mut img: GrayImage) -> GrayImage {
    for Luma([v]) in img.pixels_mut() {
        *v = if *v < BINARIZE_THRESHOLD { 0 } else { 255 };
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn solid_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |_, _| Luma([value])))
    }

    fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            let v = ((x + y) * 255 / (width + height)) as u8;
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn output_width_is_fixed_and_aspect_preserved() {
        let out = normalize(&solid_gray(200, 100, 90)).unwrap();
        assert_eq!((out.width(), out.height()), (1000, 500));

        let out = normalize(&gradient_rgb(1500, 1001)).unwrap();
        assert_eq!((out.width(), out.height()), (1000, 667));
    }

    #[test]
    fn scaled_height_rounds_to_nearest() {
        assert_eq!(scaled_height(3, 2), 667);
        assert_eq!(scaled_height(3, 1), 333);
        assert_eq!(scaled_height(4000, 3000), 750);
        assert_eq!(scaled_height(1000, 1), 1);
    }

    #[test]
    fn very_wide_image_keeps_at_least_one_row() {
        let out = normalize(&solid_gray(5000, 1, 200)).unwrap();
        assert_eq!((out.width(), out.height()), (1000, 1));
    }

    #[test]
    fn output_is_strictly_bilevel() {
        let out = normalize(&gradient_rgb(320, 240)).unwrap();
        assert!(out.as_gray().pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(out.as_gray().pixels().any(|p| p[0] == 0));
        assert!(out.as_gray().pixels().any(|p| p[0] == 255));
    }

    #[test]
    fn binarize_threshold_is_inclusive_for_white() {
        let img: GrayImage = ImageBuffer::from_fn(3, 1, |x, _| Luma([149 + x as u8]));
        let out = binarize(img);
        let values: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![0, 255, 255]);
    }

    #[test]
    fn median_filter_removes_isolated_speck() {
        let mut img: GrayImage = ImageBuffer::from_fn(20, 20, |_, _| Luma([255u8]));
        img.put_pixel(10, 10, Luma([0]));
        let out = normalize(&DynamicImage::ImageLuma8(img)).unwrap();
        assert!(out.as_gray().pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn normalize_is_deterministic() {
        let bytes = png_bytes(&gradient_rgb(64, 48));
        assert_eq!(normalize_bytes(&bytes).unwrap(), normalize_bytes(&bytes).unwrap());
    }

    #[test]
    fn undecodable_bytes_fail_with_decode_error() {
        let err = normalize_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        let err = normalize(&DynamicImage::new_luma8(0, 10)).unwrap_err();
        assert!(matches!(err, PreprocessError::EmptyImage { width: 0, height: 10 }));
    }

    #[test]
    fn narrow_tall_strip_is_rejected_before_resizing() {
        let err = normalize(&DynamicImage::new_luma8(2, 40_000)).unwrap_err();
        assert!(matches!(err, PreprocessError::TooLarge { width: 2, height: 40_000 }));
    }

    #[test]
    fn tallest_allowed_output_still_normalizes() {
        let out = normalize(&solid_gray(50, 1000, 255)).unwrap();
        assert_eq!((out.width(), out.height()), (1000, MAX_OUTPUT_HEIGHT));
    }

    #[test]
    fn oversized_upload_fails_instead_of_allocating() {
        let bytes = png_bytes(&solid_gray(2, 40_000, 255));
        assert!(normalize_bytes(&bytes).is_err());
    }

    #[test]
    fn to_png_produces_png_header() {
        let out = normalize(&solid_gray(4, 4, 100)).unwrap();
        let png = out.to_png().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
