// The image codec boundary: bytes in, `RgbImage` out, and back again.
// Also speaks the `data:image/...;base64,` form the web front end posts.

use crate::error::{DiffError, ImageSlot, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use serde::{Deserialize, Serialize};

pub const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unsupported output format `{other}`")),
        }
    }
}

/// Decodes any format the `image` crate recognises; alpha is dropped.
pub fn decode(bytes: &[u8], which: ImageSlot) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).map_err(|source| DiffError::Decode { which, source })?;
    Ok(image.to_rgb8())
}

pub fn encode(image: &RgbImage, format: OutputFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let (width, height) = image.dimensions();
    match format {
        OutputFormat::Jpeg => {
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
            encoder
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(DiffError::Encode)?;
        }
        OutputFormat::Png => {
            let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
            encoder
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(DiffError::Encode)?;
        }
    }
    Ok(buffer)
}

/// Bilinear resize to exactly `(width, height)`. Returns a copy when already that size.
pub fn resize_to_match(image: &RgbImage, (width, height): (u32, u32)) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

/// Accepts a bare base64 payload or a full `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(data_url: &str, which: ImageSlot) -> Result<RgbImage> {
    let payload = match data_url.split_once(',') {
        Some((_, payload)) => payload,
        None => data_url,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DiffError::DataUrl(format!("{which} image: {e}")))?;
    decode(&bytes, which)
}

/// Wraps already-encoded bytes as a `data:` URL.
pub fn bytes_to_data_url(bytes: &[u8], format: OutputFormat) -> String {
    format!("data:{};base64,{}", format.mime(), STANDARD.encode(bytes))
}

pub fn encode_data_url(image: &RgbImage, format: OutputFormat) -> Result<String> {
    Ok(bytes_to_data_url(&encode(image, format)?, format))
}
