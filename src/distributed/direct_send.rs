use crate::compose::blend::CompositedBuffer;
use crate::compose::order::{DepthKey, depth_order};
use crate::compose::serial::composite_into;
use crate::distributed::context::DistributedContext;
use crate::distributed::regions::{ScreenRegion, owners_of_rows, plan_regions};
use crate::distributed::tags::{ExchangeStage, Tag};
use crate::distributed::wire::{
    BandHeader, decode_band_header, decode_count, decode_meta, decode_pixels, encode_count,
    encode_json, encode_pixels,
};
use crate::foundation::core::{ImageSize, ScreenRect};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::patch::model::{CHANNELS, ImagePatch, PatchStore};
use crate::patch::pool::FrameScope;

/// Counters of one direct-send exchange on one rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Patches in the local store.
    pub local_patches: usize,
    /// Sub-patches sent to other ranks.
    pub sent: usize,
    /// Sub-patches received from other ranks.
    pub received: usize,
    /// Sub-patches that stayed on this rank.
    pub kept: usize,
    /// Patches no band claimed.
    pub dropped: usize,
    /// Pixels blended into the owned band.
    pub blended_pixels: usize,
}

/// This rank's composited band after the exchange.
#[derive(Debug)]
pub struct ExchangeOutcome {
    /// Rows owned by this rank.
    pub region: ScreenRegion,
    /// Composited pixels, covering only the drawn part of the band.
    pub band: CompositedBuffer,
    /// Counters.
    pub stats: ExchangeStats,
}

/// Redistribute local patches to the ranks owning their rows and composite the owned band.
///
/// Every rank must call this with the same `image`; ownership comes from [`plan_regions`].
#[tracing::instrument(skip_all, fields(rank = ctx.rank(), size = ctx.size()))]
pub fn direct_send(
    ctx: &DistributedContext,
    store: &PatchStore,
    image: ImageSize,
    scope: &mut FrameScope<'_>,
) -> CompositeResult<ExchangeOutcome> {
    let regions = plan_regions(ctx.size(), image.height)?;
    let me = ctx.rank();
    let region = regions[me];
    let mut stats = ExchangeStats {
        local_patches: store.get_patch_count(),
        ..ExchangeStats::default()
    };

    let mut outgoing: Vec<Vec<ImagePatch>> = vec![Vec::new(); ctx.size()];
    let metas = store.metas();
    for i in depth_order(&metas, DepthKey::EyeZ) {
        let patch = store.get_patch(i);
        let rect = patch.meta.rect.intersect(image.full_rect());
        let owners = match rect {
            Some(r) => owners_of_rows(&regions, r.y0, r.y1),
            None => Default::default(),
        };
        if owners.is_empty() {
            tracing::warn!(
                patch = patch.meta.id.0,
                rect = ?patch.meta.rect,
                "patch not claimed by any region; dropped"
            );
            stats.dropped += 1;
            continue;
        }
        for owner in owners {
            // Clipped to the band rect so columns past the image edge never leave the rank.
            if let Some(part) = patch.clip(regions[owner].rect(image)) {
                outgoing[owner].push(part);
            }
        }
    }

    for (dest, parts) in outgoing.iter().enumerate() {
        if dest == me {
            continue;
        }
        let comm = ctx.comm();
        comm.send(dest, Tag::new(ExchangeStage::PatchCount, 0)?, encode_count(parts.len())?)?;
        for (seq, part) in parts.iter().enumerate() {
            comm.send(dest, Tag::new(ExchangeStage::PatchMeta, seq)?, encode_json(&part.meta)?)?;
            comm.send(
                dest,
                Tag::new(ExchangeStage::PatchPixels, seq)?,
                encode_pixels(&part.pixels),
            )?;
        }
        stats.sent += parts.len();
    }

    let mut mine = std::mem::take(&mut outgoing[me]);
    stats.kept = mine.len();
    for src in (0..ctx.size()).filter(|&r| r != me) {
        let received = receive_from(ctx, src, region, image, scope)?;
        stats.received += received.len();
        mine.extend(received);
    }
    // Sender-side splits are reused as pool buffers once the payload left.
    for parts in outgoing {
        scope.recycle_all(parts.into_iter().map(|p| p.pixels));
    }

    let extent = mine
        .iter()
        .fold(ScreenRect::empty(), |acc, p| acc.union(p.meta.rect));
    let mut band = if extent.is_empty() {
        CompositedBuffer::empty()
    } else {
        CompositedBuffer::from_parts(extent, scope.take_zeroed(extent.area() * CHANNELS))?
    };
    stats.blended_pixels = composite_into(&mut band, &mine, DepthKey::EyeZ);
    scope.recycle_all(mine.into_iter().map(|p| p.pixels));

    ctx.comm().barrier()?;
    tracing::debug!(?stats, ?region, "direct-send exchange done");

    Ok(ExchangeOutcome {
        region,
        band,
        stats,
    })
}

fn receive_from(
    ctx: &DistributedContext,
    src: usize,
    region: ScreenRegion,
    image: ImageSize,
    scope: &mut FrameScope<'_>,
) -> CompositeResult<Vec<ImagePatch>> {
    let comm = ctx.comm();
    let count = decode_count(&comm.recv(src, Tag::new(ExchangeStage::PatchCount, 0)?)?)?;
    let band = region.rect(image);

    let mut out = Vec::with_capacity(count);
    for seq in 0..count {
        let meta = decode_meta(&comm.recv(src, Tag::new(ExchangeStage::PatchMeta, seq)?)?)?;
        if meta.rect.is_empty() || !band.contains_rect(meta.rect) {
            return Err(CompositeError::exchange(format!(
                "rank {src} sent patch {} with rect {:?} outside band {:?}",
                meta.id.0, meta.rect, region
            )));
        }
        let bytes = comm.recv(src, Tag::new(ExchangeStage::PatchPixels, seq)?)?;
        let pixels = decode_pixels(&bytes, meta.pixel_len(), scope)?;
        out.push(ImagePatch::new(meta, pixels)?);
    }
    Ok(out)
}

/// Collect every band on rank 0 as one intermediate image.
///
/// Returns `Some` on rank 0 (covering the union of all drawn band extents) and `None` elsewhere.
#[tracing::instrument(skip_all, fields(rank = ctx.rank()))]
pub fn gather_to_root(
    ctx: &DistributedContext,
    outcome: ExchangeOutcome,
    image: ImageSize,
    scope: &mut FrameScope<'_>,
) -> CompositeResult<Option<CompositedBuffer>> {
    let comm = ctx.comm();
    let header_tag = Tag::new(ExchangeStage::GatherMeta, 0)?;
    let pixels_tag = Tag::new(ExchangeStage::GatherPixels, 0)?;

    if !ctx.is_root() {
        let extent = outcome.band.extent();
        let header = BandHeader {
            rank: ctx.rank() as u32,
            extent,
        };
        comm.send(0, header_tag, encode_json(&header)?)?;
        if !extent.is_empty() {
            comm.send(0, pixels_tag, encode_pixels(outcome.band.data()))?;
        }
        scope.recycle(outcome.band.into_data());
        return Ok(None);
    }

    let regions = plan_regions(ctx.size(), image.height)?;
    let mut headers = Vec::with_capacity(ctx.size().saturating_sub(1));
    for src in 1..ctx.size() {
        let header = decode_band_header(&comm.recv(src, header_tag)?)?;
        let band = regions[src].rect(image);
        if header.rank as usize != src
            || (!header.extent.is_empty() && !band.contains_rect(header.extent))
        {
            return Err(CompositeError::exchange(format!(
                "rank {src} announced band {:?} outside its region {:?}",
                header.extent, regions[src]
            )));
        }
        headers.push(header);
    }

    let extent = headers
        .iter()
        .fold(outcome.band.extent(), |acc, h| acc.union(h.extent));
    if extent.is_empty() {
        scope.recycle(outcome.band.into_data());
        return Ok(Some(CompositedBuffer::empty()));
    }

    let mut intermediate =
        CompositedBuffer::from_parts(extent, scope.take_zeroed(extent.area() * CHANNELS))?;
    intermediate.copy_from(&outcome.band);
    scope.recycle(outcome.band.into_data());

    for h in headers.iter().filter(|h| !h.extent.is_empty()) {
        let bytes = comm.recv(h.rank as usize, pixels_tag)?;
        let data = decode_pixels(&bytes, h.extent.area() * CHANNELS, scope)?;
        let part = CompositedBuffer::from_parts(h.extent, data)?;
        intermediate.copy_from(&part);
        scope.recycle(part.into_data());
    }

    tracing::debug!(?extent, bands = ctx.size(), "gathered intermediate image");
    Ok(Some(intermediate))
}

#[cfg(test)]
#[path = "../../tests/unit/distributed/direct_send.rs"]
mod tests;
