//! Decoding files into `FloatImage`s and encoding them back
//!
//! Everything here is a thin layer over the `image` crate.

use crate::error::EnhanceError;
use crate::raster::FloatImage;
use image::codecs::jpeg::JpegEncoder;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, ImageFormat, Luma, LumaA, Rgb,
    RgbImage, Rgba, RgbaImage,
};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default JPEG quality
pub const DEFAULT_QUALITY: u8 = 95;

/// Sample depth of the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BitDepth {
    Eight,
    Sixteen,
    Float,
}

/// A decoded image and where it came from
#[derive(Debug, Clone)]
pub struct Decoded {
    pub image: FloatImage,
    pub bit_depth: BitDepth,
}

#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// JPEG quality, 1-100
    pub quality: u8,
    /// Keep 16 bits per sample where the format allows it
    pub bit_depth: BitDepth,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            bit_depth: BitDepth::Eight,
        }
    }
}

/// Open and decode any format the `image` crate understands
pub fn decode(path: &Path) -> Result<Decoded, EnhanceError> {
    let img = image::open(path).map_err(|e| {
        EnhanceError::InvalidInput(format!("Failed to load {}: {}", path.display(), e))
    })?;
    from_dynamic(&img)
}

/// Normalize a decoded image into [0, 1] floating-point planes
///
/// Gray images become 2-D; gray+alpha, RGB and RGBA keep 2, 3 and 4 channels.
pub fn from_dynamic(img: &DynamicImage) -> Result<Decoded, EnhanceError> {
    let color = img.color();
    let bit_depth = match color.bytes_per_pixel() / color.channel_count() {
        1 => BitDepth::Eight,
        2 => BitDepth::Sixteen,
        _ => BitDepth::Float,
    };
    let (width, height) = (img.width() as usize, img.height() as usize);

    let image = match (color.has_color(), color.has_alpha()) {
        (false, false) => FloatImage::from_shape_vec(&[height, width], img.to_luma32f().into_raw()),
        (false, true) => {
            FloatImage::from_shape_vec(&[height, width, 2], img.to_luma_alpha32f().into_raw())
        }
        (true, false) => FloatImage::from_shape_vec(&[height, width, 3], img.to_rgb32f().into_raw()),
        (true, true) => FloatImage::from_shape_vec(&[height, width, 4], img.to_rgba32f().into_raw()),
    }?;

    Ok(Decoded { image, bit_depth })
}

/// Quantize to an 8- or 16-bit `DynamicImage` matching the channel count
pub fn to_dynamic(image: &FloatImage, sixteen_bit: bool) -> Result<DynamicImage, EnhanceError> {
    let (w, h) = (image.width(), image.height());
    let samples = image.to_interleaved();
    let size_err = || EnhanceError::Internal("sample buffer size mismatch".to_string());

    let dynamic = if sixteen_bit {
        let raw: Vec<u16> = samples.iter().map(|&v| quantize_u16(v)).collect();
        match image.channels() {
            1 => DynamicImage::ImageLuma16(
                ImageBuffer::<Luma<u16>, _>::from_raw(w, h, raw).ok_or_else(size_err)?,
            ),
            2 => DynamicImage::ImageLumaA16(
                ImageBuffer::<LumaA<u16>, _>::from_raw(w, h, raw).ok_or_else(size_err)?,
            ),
            3 => DynamicImage::ImageRgb16(
                ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, raw).ok_or_else(size_err)?,
            ),
            4 => DynamicImage::ImageRgba16(
                ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, raw).ok_or_else(size_err)?,
            ),
            n => return Err(unsupported_channels(n)),
        }
    } else {
        let raw: Vec<u8> = samples.iter().map(|&v| quantize_u8(v)).collect();
        match image.channels() {
            1 => DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, raw).ok_or_else(size_err)?),
            2 => DynamicImage::ImageLumaA8(
                GrayAlphaImage::from_raw(w, h, raw).ok_or_else(size_err)?,
            ),
            3 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, raw).ok_or_else(size_err)?),
            4 => DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, raw).ok_or_else(size_err)?),
            n => return Err(unsupported_channels(n)),
        }
    };
    Ok(dynamic)
}

/// Encode `image` to `path`, picking the format from the extension
///
/// The file is written next to its destination and renamed into place, so a
/// failed encode never leaves a truncated output behind.
pub fn encode(image: &FloatImage, path: &Path, options: &EncodeOptions) -> Result<(), EnhanceError> {
    let format = ImageFormat::from_path(path).map_err(|e| {
        EnhanceError::Encode(format!("Unsupported output format for {}: {}", path.display(), e))
    })?;

    let sixteen_bit = options.bit_depth != BitDepth::Eight
        && matches!(format, ImageFormat::Png | ImageFormat::Tiff);
    let mut dynamic = to_dynamic(image, sixteen_bit)?;

    if format == ImageFormat::Jpeg {
        // JPEG carries neither alpha nor 16-bit samples
        dynamic = if dynamic.color().has_color() {
            DynamicImage::ImageRgb8(dynamic.to_rgb8())
        } else {
            DynamicImage::ImageLuma8(dynamic.to_luma8())
        };
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::Builder::new()
        .prefix(".auto-enhance")
        .tempfile_in(dir)
        .map_err(|e| EnhanceError::Encode(format!("Failed to create temp file: {}", e)))?;

    {
        let mut writer = BufWriter::new(temp_file.as_file_mut());
        let written = if format == ImageFormat::Jpeg {
            dynamic.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, options.quality))
        } else {
            dynamic.write_to(&mut writer, format)
        };
        written.map_err(|e| {
            EnhanceError::Encode(format!("Failed to encode {}: {}", path.display(), e))
        })?;
        writer
            .flush()
            .map_err(|e| EnhanceError::Encode(format!("Failed to write temp file: {}", e)))?;
    }

    temp_file.persist(path).map_err(|e| {
        EnhanceError::Encode(format!("Failed to write {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

fn quantize_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn quantize_u16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0).round() as u16
}

fn unsupported_channels(n: usize) -> EnhanceError {
    EnhanceError::Encode(format!("cannot encode an image with {} channels", n))
}
