//! Sort-last compositing for distributed volume rendering.
//!
//! Every rank ray-casts its share of a volume into rectangular RGBA [`ImagePatch`]es. The
//! compositor orders them back to front, blends them, redistributes them across ranks by screen
//! rows ("direct-send") and finally merges the result with an opaque background image and its
//! z-buffer on rank 0.
//!
//! The public API is pass-oriented:
//!
//! - Describe the camera with [`CameraParams`]
//! - Create a [`RenderPass`] and bind a [`PatchSampler`]
//! - Call [`RenderPass::render_frame`] on every rank of a [`DistributedContext`]
//!
//! [`LocalCluster`] runs a group of ranks as threads of one process.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod camera;
pub(crate) mod compose;
pub(crate) mod distributed;
pub(crate) mod patch;
pub(crate) mod scene;
pub(crate) mod session;

pub use crate::foundation::core::{Aabb, DMat4, DVec3, DVec4, ImageSize, PatchId, ScreenRect};
pub use crate::foundation::error::{CompositeError, CompositeResult};

pub use crate::camera::projection::{
    CameraParams, DegenerateTransform, ProjectionContext, ScreenPoint,
};
pub use crate::compose::assemble::{AssemblyStats, FinalAssembler, over_background};
pub use crate::compose::blend::{CompositedBuffer, blend_patch, blend_pixel};
pub use crate::compose::image::{BackgroundImage, BackgroundProvider, EMPTY_DEPTH, FinalImage};
pub use crate::compose::order::{DepthKey, compare_back_to_front, depth_order};
pub use crate::compose::serial::{composite_into, composite_serial};
pub use crate::distributed::context::DistributedContext;
pub use crate::distributed::direct_send::{
    ExchangeOutcome, ExchangeStats, direct_send, gather_to_root,
};
pub use crate::distributed::regions::{ScreenRegion, owners_of_rows, plan_regions};
pub use crate::distributed::tags::{ExchangeStage, STAGE_SPAN, Tag};
pub use crate::distributed::transport::{Communicator, LocalCluster, LocalClusterOpts, LocalComm};
pub use crate::distributed::wire::BandHeader;
pub use crate::patch::model::{CHANNELS, ImagePatch, PatchMeta, PatchProvider, PatchStore};
pub use crate::patch::pool::{BufferPool, FrameScope, PoolOpts, PoolStats};
pub use crate::scene::file::{BackgroundSpec, SceneFile, ScenePatch, ScenePatchSampler};
pub use crate::session::render_pass::{
    FrameOutput, FrameStats, PassSettings, PatchSampler, RenderPass,
};
