use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use super::error::ClassifierError;

/// Resampling filter used for every resize.
///
/// Bicubic (Catmull-Rom). Test fixtures that compare numeric output depend on it.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Decodes user-supplied bytes into an RGB bitmap.
///
/// Any format the `image` crate recognises is accepted; grayscale and alpha
/// images are converted to three channels.
///
/// # Errors
/// - `InvalidInput` if the bytes are empty, not an image, or corrupt
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::InvalidInput("Image data is empty".into()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| ClassifierError::InvalidInput(format!("Invalid image file: {}", e)))?;
    Ok(image.to_rgb8())
}

/// Converts an RGB image into the `(1, 3, H, W)` tensor the model expects.
///
/// The image is resized to exactly `target_size` (width, height) without
/// preserving the aspect ratio, transposed to channel-first layout and scaled
/// to `[0.0, 1.0]`.
pub fn preprocess(image: &RgbImage, target_size: (u32, u32)) -> Array4<f32> {
    let (width, height) = target_size;
    let resized = imageops::resize(image, width, height, RESIZE_FILTER);

    Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, channel, y, x)| f32::from(resized.get_pixel(x as u32, y as u32)[channel]) / 255.0,
    )
}
