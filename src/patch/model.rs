use std::collections::BTreeMap;

use crate::foundation::core::{ImageSize, PatchId, ScreenRect};
use crate::foundation::error::{CompositeError, CompositeResult};

/// Number of f32 channels per patch pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Per-patch metadata: placement on screen and the two depth ordering keys.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatchMeta {
    /// Identifier, unique per frame across all ranks.
    pub id: PatchId,
    /// Screen rectangle covered by the pixel buffer.
    pub rect: ScreenRect,
    /// Average world depth of the patch samples (serial ordering key).
    pub avg_z: f32,
    /// Signed eye-space depth of the patch (parallel ordering key).
    pub eye_z: f32,
    /// Rank that produced the patch.
    pub origin_rank: u32,
}

impl PatchMeta {
    /// Number of f32 values the pixel buffer must hold.
    pub fn pixel_len(&self) -> usize {
        self.rect.area() * CHANNELS
    }
}

/// A rectangular RGBA tile produced by the ray sampler.
///
/// Pixels are row-major, bottom row first, `rect.width() * rect.height() * 4` floats.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePatch {
    /// Placement and ordering keys.
    pub meta: PatchMeta,
    /// RGBA samples.
    pub pixels: Vec<f32>,
}

impl ImagePatch {
    /// Create a patch, checking the buffer length against the rectangle.
    pub fn new(meta: PatchMeta, pixels: Vec<f32>) -> CompositeResult<Self> {
        if pixels.len() != meta.pixel_len() {
            return Err(CompositeError::validation(format!(
                "patch {} expects {} floats for {}x{} pixels, got {}",
                meta.id.0,
                meta.pixel_len(),
                meta.rect.width(),
                meta.rect.height(),
                pixels.len()
            )));
        }
        Ok(Self { meta, pixels })
    }

    /// Patch filled with a single RGBA value.
    pub fn solid(meta: PatchMeta, rgba: [f32; 4]) -> Self {
        let pixels = rgba.repeat(meta.rect.area());
        Self { meta, pixels }
    }

    /// RGBA at absolute screen position `(x, y)`, which must lie inside the rectangle.
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        let r = self.meta.rect;
        let idx = (((y - r.y0) as usize) * (r.width() as usize) + (x - r.x0) as usize) * CHANNELS;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Copy of the part of this patch inside `bounds`, keeping the metadata keys.
    ///
    /// Returns `None` when nothing of the patch lies inside `bounds`.
    pub fn clip(&self, bounds: ScreenRect) -> Option<ImagePatch> {
        let src = self.meta.rect;
        let rect = src.intersect(bounds)?;
        let src_w = src.width() as usize;
        let row_len = (rect.width() as usize) * CHANNELS;
        let mut pixels = Vec::with_capacity(rect.area() * CHANNELS);
        for y in rect.y0..rect.y1 {
            let start =
                (((y - src.y0) as usize) * src_w + (rect.x0 - src.x0) as usize) * CHANNELS;
            pixels.extend_from_slice(&self.pixels[start..start + row_len]);
        }
        Some(ImagePatch {
            meta: PatchMeta { rect, ..self.meta },
            pixels,
        })
    }
}

/// Output of the external ray sampler.
///
/// Pixel buffers are handed over by value; a provider may release its own copy afterwards.
pub trait PatchProvider {
    /// Number of patches produced for this frame.
    fn patch_count(&self) -> usize;

    /// Metadata of patch `i`.
    fn patch_meta(&self, i: usize) -> CompositeResult<PatchMeta>;

    /// Take ownership of the pixels of patch `i`.
    fn take_patch_pixels(&mut self, i: usize) -> CompositeResult<Vec<f32>>;
}

/// Rank-local collection of rendered patches for one frame.
#[derive(Clone, Debug, Default)]
pub struct PatchStore {
    patches: Vec<ImagePatch>,
    index_by_id: BTreeMap<PatchId, usize>,
}

impl PatchStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from patches, rejecting duplicate ids.
    pub fn from_patches(patches: impl IntoIterator<Item = ImagePatch>) -> CompositeResult<Self> {
        let mut store = Self::new();
        for p in patches {
            store.push(p)?;
        }
        Ok(store)
    }

    /// Drain every patch out of `provider`.
    pub fn from_provider(provider: &mut dyn PatchProvider) -> CompositeResult<Self> {
        let mut store = Self::new();
        for i in 0..provider.patch_count() {
            let meta = provider.patch_meta(i)?;
            let pixels = provider.take_patch_pixels(i)?;
            store.push(ImagePatch::new(meta, pixels)?)?;
        }
        Ok(store)
    }

    /// Add a patch.
    pub fn push(&mut self, patch: ImagePatch) -> CompositeResult<()> {
        if patch.pixels.len() != patch.meta.pixel_len() {
            return Err(CompositeError::validation(format!(
                "patch {} pixel buffer does not match its rectangle",
                patch.meta.id.0
            )));
        }
        if self.index_by_id.contains_key(&patch.meta.id) {
            return Err(CompositeError::validation(format!(
                "duplicate patch id {}",
                patch.meta.id.0
            )));
        }
        self.index_by_id.insert(patch.meta.id, self.patches.len());
        self.patches.push(patch);
        Ok(())
    }

    /// Number of patches.
    pub fn get_patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Patch at position `i`.
    pub fn get_patch(&self, i: usize) -> &ImagePatch {
        &self.patches[i]
    }

    /// Patch with identifier `id`.
    pub fn patch_by_id(&self, id: PatchId) -> Option<&ImagePatch> {
        self.index_by_id.get(&id).map(|&i| &self.patches[i])
    }

    /// All patches in insertion order.
    pub fn patches(&self) -> &[ImagePatch] {
        &self.patches
    }

    /// Metadata of every patch in insertion order.
    pub fn metas(&self) -> Vec<PatchMeta> {
        self.patches.iter().map(|p| p.meta).collect()
    }

    /// Return `true` when the store holds no patches.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Check every rectangle lies within `image`.
    pub fn validate(&self, image: ImageSize) -> CompositeResult<()> {
        let full = image.full_rect();
        for p in &self.patches {
            if !full.contains_rect(p.meta.rect) {
                return Err(CompositeError::validation(format!(
                    "patch {} rect {:?} exceeds image {}x{}",
                    p.meta.id.0, p.meta.rect, image.width, image.height
                )));
            }
        }
        Ok(())
    }

    /// Union of all patch rectangles.
    pub fn rendered_extents(&self) -> ScreenRect {
        self.patches
            .iter()
            .fold(ScreenRect::empty(), |acc, p| acc.union(p.meta.rect))
    }

    /// Remove every patch, yielding the pixel buffers for reuse.
    pub fn drain_pixels(&mut self) -> impl Iterator<Item = Vec<f32>> + '_ {
        self.index_by_id.clear();
        self.patches.drain(..).map(|p| p.pixels)
    }
}

impl PatchProvider for PatchStore {
    fn patch_count(&self) -> usize {
        self.patches.len()
    }

    fn patch_meta(&self, i: usize) -> CompositeResult<PatchMeta> {
        self.patches
            .get(i)
            .map(|p| p.meta)
            .ok_or_else(|| CompositeError::validation(format!("patch index {i} out of range")))
    }

    fn take_patch_pixels(&mut self, i: usize) -> CompositeResult<Vec<f32>> {
        self.patches
            .get_mut(i)
            .map(|p| std::mem::take(&mut p.pixels))
            .ok_or_else(|| CompositeError::validation(format!("patch index {i} out of range")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/patch/model.rs"]
mod tests;
