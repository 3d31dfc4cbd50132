use crate::compose::blend::{CompositedBuffer, blend_patch};
use crate::compose::order::{DepthKey, depth_order};
use crate::foundation::error::CompositeResult;
use crate::patch::model::{CHANNELS, ImagePatch, PatchMeta, PatchStore};
use crate::patch::pool::FrameScope;

/// Blend `patches` into `accum` farthest-first by `key`. Returns pixels visited.
pub fn composite_into(
    accum: &mut CompositedBuffer,
    patches: &[ImagePatch],
    key: DepthKey,
) -> usize {
    let metas: Vec<PatchMeta> = patches.iter().map(|p| p.meta).collect();
    depth_order(&metas, key)
        .into_iter()
        .map(|i| blend_patch(accum, &patches[i]))
        .sum()
}

/// Single-rank compositing of every patch in `store`.
///
/// The accumulator covers the union of the patch rectangles; an empty store yields an empty
/// buffer.
#[tracing::instrument(skip_all, fields(patches = store.get_patch_count(), ?key))]
pub fn composite_serial(
    store: &PatchStore,
    key: DepthKey,
    scope: &mut FrameScope<'_>,
) -> CompositeResult<CompositedBuffer> {
    let extent = store.rendered_extents();
    if extent.is_empty() {
        return Ok(CompositedBuffer::empty());
    }

    let data = scope.take_zeroed(extent.area() * CHANNELS);
    let mut accum = CompositedBuffer::from_parts(extent, data)?;
    let visited = composite_into(&mut accum, store.patches(), key);
    tracing::debug!(visited, w = extent.width(), h = extent.height(), "serial composite done");
    Ok(accum)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/serial.rs"]
mod tests;
