use crate::foundation::core::ScreenRect;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::patch::model::PatchMeta;
use crate::patch::pool::FrameScope;

/// Header a rank sends to rank 0 ahead of its band pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BandHeader {
    /// Sending rank.
    pub rank: u32,
    /// Pixel extent of the composited band; empty when nothing was drawn.
    pub extent: ScreenRect,
}

pub(crate) fn encode_count(n: usize) -> CompositeResult<Vec<u8>> {
    let n = u32::try_from(n)
        .map_err(|_| CompositeError::exchange(format!("patch count {n} does not fit a u32")))?;
    Ok(n.to_le_bytes().to_vec())
}

pub(crate) fn decode_count(bytes: &[u8]) -> CompositeResult<usize> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| {
        CompositeError::exchange(format!("count message has {} bytes, expected 4", bytes.len()))
    })?;
    Ok(u32::from_le_bytes(raw) as usize)
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> CompositeResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode_meta(bytes: &[u8]) -> CompositeResult<PatchMeta> {
    serde_json::from_slice(bytes)
        .map_err(|e| CompositeError::exchange(format!("undecodable patch metadata: {e}")))
}

pub(crate) fn decode_band_header(bytes: &[u8]) -> CompositeResult<BandHeader> {
    serde_json::from_slice(bytes)
        .map_err(|e| CompositeError::exchange(format!("undecodable band header: {e}")))
}

/// Pixels as little-endian f32 bytes.
pub(crate) fn encode_pixels(pixels: &[f32]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        bytemuck::cast_slice::<f32, u8>(pixels).to_vec()
    } else {
        pixels.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Decode exactly `expected` little-endian floats into a pooled buffer.
pub(crate) fn decode_pixels(
    bytes: &[u8],
    expected: usize,
    scope: &mut FrameScope<'_>,
) -> CompositeResult<Vec<f32>> {
    let want = expected * std::mem::size_of::<f32>();
    if bytes.len() != want {
        return Err(CompositeError::exchange(format!(
            "pixel message has {} bytes, metadata announced {want}",
            bytes.len()
        )));
    }
    let mut out = scope.take_zeroed(expected);
    if cfg!(target_endian = "little") {
        bytemuck::cast_slice_mut::<f32, u8>(&mut out).copy_from_slice(bytes);
    } else {
        for (dst, raw) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *dst = f32::from_le_bytes(bytemuck::pod_read_unaligned(raw));
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/distributed/wire.rs"]
mod tests;
