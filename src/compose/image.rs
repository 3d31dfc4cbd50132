use crate::foundation::core::ImageSize;
use crate::foundation::error::{CompositeError, CompositeResult};

/// Depth value meaning "no opaque geometry at this pixel".
pub const EMPTY_DEPTH: f32 = 1.0;

/// Source of the opaque-geometry image the volume is merged against.
pub trait BackgroundProvider {
    /// Image dimensions.
    fn size(&self) -> ImageSize;

    /// `width * height * 3` RGB bytes, bottom row first.
    fn rgb_buffer(&self) -> &[u8];

    /// `width * height` normalized depths, `1.0` where no geometry was drawn.
    fn z_buffer(&self) -> &[f32];
}

/// Owned opaque background: RGB bytes plus a parallel z-buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundImage {
    size: ImageSize,
    rgb: Vec<u8>,
    depth: Vec<f32>,
}

impl BackgroundImage {
    /// Wrap buffers, checking their lengths against `size`.
    pub fn new(size: ImageSize, rgb: Vec<u8>, depth: Vec<f32>) -> CompositeResult<Self> {
        let px = size.pixel_count();
        if rgb.len() != px * 3 {
            return Err(CompositeError::validation(format!(
                "background rgb buffer needs {} bytes, got {}",
                px * 3,
                rgb.len()
            )));
        }
        if depth.len() != px {
            return Err(CompositeError::validation(format!(
                "background z-buffer needs {} values, got {}",
                px,
                depth.len()
            )));
        }
        Ok(Self { size, rgb, depth })
    }

    /// Uniform color at uniform depth.
    pub fn solid(size: ImageSize, rgb: [u8; 3], depth: f32) -> Self {
        Self {
            size,
            rgb: rgb.repeat(size.pixel_count()),
            depth: vec![depth; size.pixel_count()],
        }
    }

    /// Mutable access for callers painting geometry into the background.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3], depth: f32) {
        let i = (y as usize) * (self.size.width as usize) + x as usize;
        self.rgb[i * 3..i * 3 + 3].copy_from_slice(&rgb);
        self.depth[i] = depth;
    }
}

impl BackgroundProvider for BackgroundImage {
    fn size(&self) -> ImageSize {
        self.size
    }

    fn rgb_buffer(&self) -> &[u8] {
        &self.rgb
    }

    fn z_buffer(&self) -> &[f32] {
        &self.depth
    }
}

/// Final RGB8 frame, bottom row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalImage {
    /// Dimensions.
    pub size: ImageSize,
    /// `width * height * 3` bytes.
    pub rgb: Vec<u8>,
}

impl FinalImage {
    /// Start from a copy of the background colors.
    pub fn from_background(background: &dyn BackgroundProvider) -> Self {
        Self {
            size: background.size(),
            rgb: background.rgb_buffer().to_vec(),
        }
    }

    /// RGB at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y as usize) * (self.size.width as usize) + x as usize) * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }

    /// Convert to a top-down [`image::RgbImage`] suitable for encoding.
    pub fn to_rgb_image(&self) -> CompositeResult<image::RgbImage> {
        let row = (self.size.width as usize) * 3;
        let mut flipped = Vec::with_capacity(self.rgb.len());
        for chunk in self.rgb.chunks_exact(row.max(1)).rev() {
            flipped.extend_from_slice(chunk);
        }
        image::RgbImage::from_raw(self.size.width, self.size.height, flipped)
            .ok_or_else(|| CompositeError::validation("final image buffer size mismatch"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/image.rs"]
mod tests;
