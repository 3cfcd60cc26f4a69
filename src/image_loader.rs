//! # Image sources
//!
//! Layout only needs an image's intrinsic pixel size to derive a display
//! size from its aspect ratio. Sources are file paths, data URIs or raw
//! base64 strings; only the header is read to get the dimensions.

use std::io::Cursor;

/// Intrinsic `(width, height)` in pixels of the image at `src`.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...`: data URI
/// - a path starting with `/`, `./` or `../`: read from disk
/// - anything else: raw base64-encoded image data
pub fn load_image_dimensions(src: &str) -> Result<(u32, u32), String> {
    let bytes = read_source_bytes(src)?;
    image_dimensions(&bytes)
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>, String> {
    if src.starts_with("data:image/") {
        let comma = src
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        return base64_decode(&src[comma + 1..]);
    }

    // Base64 contains '/', so only explicit path prefixes count as paths.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src).map_err(|e| format!("Failed to read image file '{src}': {e}"));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| format!("Base64 decode error: {e}"))
}

fn image_dimensions(data: &[u8]) -> Result<(u32, u32), String> {
    if data.len() < 4 {
        return Err("Image data too short".to_string());
    }
    if !(is_jpeg(data) || is_png(data) || is_webp(data)) {
        return Err("Unsupported image format (expected JPEG, PNG or WebP)".to_string());
    }
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Image format detection error: {e}"))?
        .into_dimensions()
        .map_err(|e| format!("Failed to read image dimensions: {e}"))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == [0x89, 0x50, 0x4E, 0x47]
}

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
        assert!(is_webp(b"RIFF\0\0\0\0WEBPVP8 "));
    }

    #[test]
    fn data_uri_without_comma_is_rejected() {
        assert!(load_image_dimensions("data:image/png;base64").is_err());
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert!(image_dimensions(&[0x00, 0x01]).is_err());
        assert!(image_dimensions(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
    }

    #[test]
    fn png_dimensions_from_data_uri() {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD.encode(png(3, 2));
        let uri = format!("data:image/png;base64,{b64}");
        assert_eq!(load_image_dimensions(&uri).unwrap(), (3, 2));
        assert_eq!(load_image_dimensions(&b64).unwrap(), (3, 2));
    }

    #[test]
    fn jpeg_dimensions() {
        let img = image::RgbImage::from_fn(4, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 4, 2, image::ColorType::Rgb8)
            .unwrap();
        assert_eq!(image_dimensions(&buf).unwrap(), (4, 2));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = load_image_dimensions("./no/such/image.png").unwrap_err();
        assert!(err.contains("./no/such/image.png"), "{err}");
    }
}
