use crate::foundation::core::ScreenRect;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::clamp01;
use crate::patch::model::{CHANNELS, ImagePatch};

/// Float RGBA accumulator covering `extent` (row-major, bottom row first).
#[derive(Clone, Debug, PartialEq)]
pub struct CompositedBuffer {
    extent: ScreenRect,
    data: Vec<f32>,
}

impl CompositedBuffer {
    /// Fully transparent buffer over `extent`.
    pub fn zeroed(extent: ScreenRect) -> Self {
        Self {
            extent,
            data: vec![0.0; extent.area() * CHANNELS],
        }
    }

    /// Wrap an existing buffer, which must hold `extent.area() * 4` floats.
    pub fn from_parts(extent: ScreenRect, data: Vec<f32>) -> CompositeResult<Self> {
        if data.len() != extent.area() * CHANNELS {
            return Err(CompositeError::validation(format!(
                "composited buffer for {}x{} pixels needs {} floats, got {}",
                extent.width(),
                extent.height(),
                extent.area() * CHANNELS,
                data.len()
            )));
        }
        Ok(Self { extent, data })
    }

    /// Buffer covering nothing.
    pub fn empty() -> Self {
        Self {
            extent: ScreenRect::empty(),
            data: Vec::new(),
        }
    }

    /// Pixel bounds covered by the buffer.
    pub fn extent(&self) -> ScreenRect {
        self.extent
    }

    /// Raw RGBA floats.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Give up the raw floats, e.g. to hand them back to a pool.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (((y - self.extent.y0) as usize) * (self.extent.width() as usize)
            + (x - self.extent.x0) as usize)
            * CHANNELS
    }

    /// RGBA at absolute `(x, y)`, or `None` outside the extent.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if !self.extent.contains(x, y) {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// RGBA at absolute `(x, y)`, transparent black outside the extent.
    pub fn pixel_or_clear(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixel(x, y).unwrap_or([0.0; 4])
    }

    /// Copy every pixel of `src` that falls inside this buffer.
    pub fn copy_from(&mut self, src: &CompositedBuffer) {
        let Some(r) = self.extent.intersect(src.extent) else {
            return;
        };
        let n = (r.width() as usize) * CHANNELS;
        for y in r.y0..r.y1 {
            let d = self.offset(r.x0, y);
            let s = src.offset(r.x0, y);
            self.data[d..d + n].copy_from_slice(&src.data[s..s + n]);
        }
    }

    /// Number of pixels with non-zero alpha.
    pub fn covered_pixels(&self) -> usize {
        self.data
            .chunks_exact(CHANNELS)
            .filter(|px| px[3] > 0.0)
            .count()
    }
}

/// Back-to-front blend of one sample onto an accumulated pixel.
///
/// Opaque pixels are left untouched so farther samples can never alter them.
#[inline]
pub fn blend_pixel(dst: &mut [f32], src: [f32; 4]) {
    if dst[3] >= 1.0 {
        return;
    }
    let keep = 1.0 - src[3];
    dst[0] = clamp01(dst[0] * keep + src[0]);
    dst[1] = clamp01(dst[1] * keep + src[1]);
    dst[2] = clamp01(dst[2] * keep + src[2]);
    dst[3] = clamp01(dst[3] * keep + src[3]);
}

/// Blend the part of `patch` inside `accum`'s extent. Returns the number of pixels visited.
pub fn blend_patch(accum: &mut CompositedBuffer, patch: &ImagePatch) -> usize {
    let Some(r) = accum.extent.intersect(patch.meta.rect) else {
        return 0;
    };
    let src_rect = patch.meta.rect;
    let src_w = src_rect.width() as usize;

    for y in r.y0..r.y1 {
        let src_row = ((y - src_rect.y0) as usize) * src_w;
        let dst_row = accum.offset(r.x0, y);
        for (i, x) in (r.x0..r.x1).enumerate() {
            let s = (src_row + (x - src_rect.x0) as usize) * CHANNELS;
            let d = dst_row + i * CHANNELS;
            let src = [
                patch.pixels[s],
                patch.pixels[s + 1],
                patch.pixels[s + 2],
                patch.pixels[s + 3],
            ];
            blend_pixel(&mut accum.data[d..d + CHANNELS], src);
        }
    }
    r.area()
}

#[cfg(test)]
#[path = "../../tests/unit/compose/blend.rs"]
mod tests;
