use image::RgbImage;
use thiserror::Error;

/// Upload size cap; anything larger is rejected before decoding.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image data is empty")]
    Empty,

    #[error("image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("failed to decode image: {0}")]
    Invalid(#[from] image::ImageError),
}

/// Decode raw uploaded bytes into an RGB pixel grid.
///
/// Format is detected from the payload itself (magic bytes), not from the
/// declared content type.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(DecodeError::TooLarge(bytes.len(), MAX_IMAGE_BYTES));
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}
