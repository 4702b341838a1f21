/// Screenshot encoding of swapchain readbacks

use std::path::Path;
use image::ExtendedColorType;
use crate::engine_err;
use crate::error::{Error, Result};
use crate::graphics_device::ImageReadback;

/// Convert a readback to tightly packed RGBA8
///
/// Blue-first surfaces (the common swapchain format) are swizzled.
pub fn to_rgba8(readback: ImageReadback) -> Result<Vec<u8>> {
    let expected = readback.width as usize * readback.height as usize * 4;
    if readback.pixels.len() != expected {
        return Err(Error::InvalidResource(format!(
            "Readback of {}x{} holds {} bytes, expected {}",
            readback.width,
            readback.height,
            readback.pixels.len(),
            expected
        )));
    }

    let mut pixels = readback.pixels;
    if readback.format.is_bgra() {
        for pixel in pixels.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
    }
    Ok(pixels)
}

/// Encode a readback to `path` (format picked from the extension)
pub fn save_readback(path: &Path, readback: ImageReadback) -> Result<()> {
    let (width, height) = (readback.width, readback.height);
    let pixels = to_rgba8(readback)?;
    image::save_buffer(path, &pixels, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| engine_err!("fusion::Graphics", "Failed to write screenshot {}: {}", path.display(), e))
}

#[cfg(test)]
#[path = "screenshot_tests.rs"]
mod tests;
