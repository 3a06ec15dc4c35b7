use image::{GenericImageView, ImageFormat};
use tracing::warn;

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

pub fn mime_to_format(mime_type: &str) -> Option<ImageFormat> {
    match mime_type {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::WebP),
        "image/bmp" => Some(ImageFormat::Bmp),
        _ => None,
    }
}

/// Pixel dimensions of an encoded image, when the bytes decode.
pub fn get_dimensions(bytes: &[u8], mime_type: &str) -> Option<(u32, u32)> {
    let format = mime_to_format(mime_type)?;
    image::load_from_memory_with_format(bytes, format)
        .ok()
        .map(|image| image.dimensions())
}

/// Same as [`get_dimensions`] but off the async executor; decoding is CPU bound.
pub async fn dimensions_blocking(bytes: Vec<u8>, mime_type: String) -> Option<(u32, u32)> {
    match tokio::task::spawn_blocking(move || get_dimensions(&bytes, &mime_type)).await {
        Ok(dimensions) => dimensions,
        Err(err) => {
            warn!(error = %err, "image decode task failed");
            None
        }
    }
}
