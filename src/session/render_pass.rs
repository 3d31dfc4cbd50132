use crate::camera::projection::{CameraParams, ProjectionContext};
use crate::compose::assemble::{AssemblyStats, FinalAssembler};
use crate::compose::image::{BackgroundProvider, FinalImage};
use crate::compose::order::DepthKey;
use crate::compose::serial::composite_serial;
use crate::distributed::context::DistributedContext;
use crate::distributed::direct_send::{direct_send, gather_to_root};
use crate::foundation::core::{Aabb, DVec3, ImageSize};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::patch::model::{PatchProvider, PatchStore};
use crate::patch::pool::{BufferPool, FrameScope, PoolOpts, PoolStats};

/// External ray sampler bound to a [`RenderPass`].
///
/// Called once per frame on every rank with the frame's projection; returns that rank's patches.
pub trait PatchSampler: Send {
    /// Produce this rank's patches for the frame.
    fn sample(
        &mut self,
        projection: &ProjectionContext,
        ctx: &DistributedContext,
    ) -> CompositeResult<Box<dyn PatchProvider>>;
}

/// Static configuration of a [`RenderPass`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PassSettings {
    /// Output image size.
    pub image: ImageSize,
    /// World-space bounds of the rendered volume.
    pub volume_bounds: Aabb,
    /// Buffer pool limits.
    #[serde(default)]
    pub pool: PoolOpts,
}

impl PassSettings {
    /// Settings with default pool limits.
    pub fn new(image: ImageSize, volume_bounds: Aabb) -> Self {
        Self {
            image,
            volume_bounds,
            pool: PoolOpts::default(),
        }
    }

    /// Check the image is drawable and the bounds are well formed.
    pub fn validate(&self) -> CompositeResult<()> {
        if self.image.width == 0 || self.image.height == 0 {
            return Err(CompositeError::validation("image must be non-empty"));
        }
        self.volume_bounds.validate()
    }
}

impl Default for PassSettings {
    fn default() -> Self {
        Self::new(
            ImageSize::new(256, 256),
            Aabb {
                min: DVec3::splat(-1.0),
                max: DVec3::splat(1.0),
            },
        )
    }
}

/// Per-frame counters of one rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Patches produced by the local sampler.
    pub local_patches: usize,
    /// Sub-patches sent to other ranks.
    pub sent: usize,
    /// Sub-patches received from other ranks.
    pub received: usize,
    /// Patches dropped because no band claimed them.
    pub dropped: usize,
    /// Pixels blended by this rank's compositor.
    pub composited_pixels: usize,
    /// Final assembly counters; zero on ranks that do not assemble.
    pub assembly: AssemblyStats,
}

/// Result of [`RenderPass::render_frame`].
#[derive(Debug)]
pub struct FrameOutput {
    /// The final image on the assembling rank, `None` elsewhere.
    pub image: Option<FinalImage>,
    /// Counters.
    pub stats: FrameStats,
}

/// One compositing pass: sampling, depth-ordered compositing and background merge.
///
/// Single-rank contexts composite serially by average depth; larger contexts use direct-send by
/// eye depth and assemble on rank 0.
pub struct RenderPass {
    settings: PassSettings,
    sampler: Option<Box<dyn PatchSampler>>,
    pool: BufferPool,
}

impl RenderPass {
    /// Create a pass without a sampler.
    pub fn new(settings: PassSettings) -> CompositeResult<Self> {
        settings.validate()?;
        let pool = BufferPool::new(settings.pool);
        Ok(Self {
            settings,
            sampler: None,
            pool,
        })
    }

    /// Bind the ray sampler that produces patches.
    pub fn bind_sampler(&mut self, sampler: Box<dyn PatchSampler>) {
        self.sampler = Some(sampler);
    }

    /// Settings the pass was created with.
    pub fn settings(&self) -> &PassSettings {
        &self.settings
    }

    /// Buffer pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Render and composite one frame. Collective: every rank of `ctx` must call it.
    #[tracing::instrument(skip_all, fields(rank = ctx.rank(), size = ctx.size()))]
    pub fn render_frame(
        &mut self,
        ctx: &DistributedContext,
        camera: &CameraParams,
        background: &dyn BackgroundProvider,
    ) -> CompositeResult<FrameOutput> {
        let image = self.settings.image;
        let sampler = self.sampler.as_mut().ok_or_else(|| {
            CompositeError::improper_use("no ray sampler bound before render_frame")
        })?;
        if background.size() != image {
            return Err(CompositeError::validation(format!(
                "background is {}x{}, pass renders {}x{}",
                background.size().width,
                background.size().height,
                image.width,
                image.height
            )));
        }

        let projection = ProjectionContext::new(camera, image)?;
        let mut provider = sampler.sample(&projection, ctx)?;
        let mut store = PatchStore::from_provider(provider.as_mut())?;
        drop(provider);
        store.validate(image)?;

        let mut scope = FrameScope::new(&mut self.pool);
        let mut stats = FrameStats {
            local_patches: store.get_patch_count(),
            ..FrameStats::default()
        };

        let composited = if ctx.size() == 1 {
            let buf = composite_serial(&store, DepthKey::AvgZ, &mut scope)?;
            stats.composited_pixels = buf.covered_pixels();
            Some(buf)
        } else {
            let outcome = direct_send(ctx, &store, image, &mut scope)?;
            stats.sent = outcome.stats.sent;
            stats.received = outcome.stats.received;
            stats.dropped = outcome.stats.dropped;
            stats.composited_pixels = outcome.stats.blended_pixels;
            gather_to_root(ctx, outcome, image, &mut scope)?
        };
        scope.recycle_all(store.drain_pixels());

        let Some(composited) = composited else {
            return Ok(FrameOutput { image: None, stats });
        };

        let (final_image, assembly) = FinalAssembler::new(&projection, self.settings.volume_bounds)
            .assemble(&composited, background)?;
        scope.recycle(composited.into_data());
        stats.assembly = assembly;

        tracing::debug!(?stats, "frame composited");
        Ok(FrameOutput {
            image: Some(final_image),
            stats,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_pass.rs"]
mod tests;
