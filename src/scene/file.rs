use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::camera::projection::{CameraParams, ProjectionContext};
use crate::compose::image::{BackgroundImage, EMPTY_DEPTH};
use crate::distributed::context::DistributedContext;
use crate::foundation::core::{Aabb, DVec3, ImageSize, PatchId, ScreenRect};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::patch::model::{ImagePatch, PatchMeta, PatchProvider, PatchStore};
use crate::session::render_pass::{PassSettings, PatchSampler};

/// Uniform opaque background.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackgroundSpec {
    /// Background colour.
    pub rgb: [u8; 3],
    /// Normalized depth of the background geometry; `1.0` means none.
    pub depth: f32,
}

impl Default for BackgroundSpec {
    fn default() -> Self {
        Self {
            rgb: [0, 0, 0],
            depth: EMPTY_DEPTH,
        }
    }
}

/// One pre-sampled, uniformly coloured patch.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScenePatch {
    /// Screen rectangle, half-open, row 0 at the bottom.
    pub rect: ScreenRect,
    /// Colour and opacity of every pixel.
    pub rgba: [f32; 4],
    /// Average world depth; serial sort key.
    pub avg_z: f32,
    /// Eye-space depth; parallel sort key. Defaults to the projected `anchor`, then to `avg_z`.
    #[serde(default)]
    pub eye_z: Option<f32>,
    /// World point whose eye depth provides `eye_z`.
    #[serde(default)]
    pub anchor: Option<DVec3>,
    /// Producing rank, taken modulo the rank count. Defaults to the patch index.
    #[serde(default)]
    pub rank: Option<usize>,
}

/// JSON scene: camera, volume bounds, background and the patches each rank "sampled".
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneFile {
    /// Output image size.
    pub image: ImageSize,
    /// Camera.
    #[serde(default)]
    pub camera: CameraParams,
    /// World-space volume bounds.
    pub volume_bounds: Aabb,
    /// Background.
    #[serde(default)]
    pub background: BackgroundSpec,
    /// Patches.
    #[serde(default)]
    pub patches: Vec<ScenePatch>,
}

impl SceneFile {
    /// Parse a scene from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> CompositeResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| CompositeError::serde(format!("parse scene JSON: {e}")))
    }

    /// Parse a scene from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CompositeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CompositeError::validation(format!("open scene JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check the scene is renderable.
    pub fn validate(&self) -> CompositeResult<()> {
        self.pass_settings().validate()?;
        self.camera.validate()?;
        if !self.background.depth.is_finite() || !(0.0..=1.0).contains(&self.background.depth) {
            return Err(CompositeError::validation(
                "background depth must lie in [0, 1]",
            ));
        }
        let full = self.image.full_rect();
        for (i, p) in self.patches.iter().enumerate() {
            if p.rect.is_empty() || !full.contains_rect(p.rect) {
                return Err(CompositeError::validation(format!(
                    "patch {i} rect {:?} is empty or outside the image",
                    p.rect
                )));
            }
            if p.rgba.iter().any(|c| !c.is_finite()) || !p.avg_z.is_finite() {
                return Err(CompositeError::validation(format!(
                    "patch {i} has non-finite colour or depth"
                )));
            }
        }
        Ok(())
    }

    /// Settings for a [`crate::RenderPass`] rendering this scene.
    pub fn pass_settings(&self) -> PassSettings {
        PassSettings::new(self.image, self.volume_bounds)
    }

    /// The background as an image.
    pub fn background_image(&self) -> BackgroundImage {
        BackgroundImage::solid(self.image, self.background.rgb, self.background.depth)
    }
}

/// Sampler that hands each rank the scene patches assigned to it.
#[derive(Clone, Debug)]
pub struct ScenePatchSampler {
    scene: Arc<SceneFile>,
}

impl ScenePatchSampler {
    /// Sampler over `scene`.
    pub fn new(scene: Arc<SceneFile>) -> Self {
        Self { scene }
    }
}

impl PatchSampler for ScenePatchSampler {
    fn sample(
        &mut self,
        projection: &ProjectionContext,
        ctx: &DistributedContext,
    ) -> CompositeResult<Box<dyn PatchProvider>> {
        let mut store = PatchStore::new();
        for (i, p) in self.scene.patches.iter().enumerate() {
            if p.rank.unwrap_or(i) % ctx.size() != ctx.rank() {
                continue;
            }
            let id = u32::try_from(i)
                .map_err(|_| CompositeError::validation("too many scene patches"))?;
            let eye_z = match (p.eye_z, p.anchor) {
                (Some(z), _) => z,
                (None, Some(anchor)) => projection.eye_depth(anchor) as f32,
                (None, None) => p.avg_z,
            };
            let meta = PatchMeta {
                id: PatchId(id),
                rect: p.rect,
                avg_z: p.avg_z,
                eye_z,
                origin_rank: ctx.rank() as u32,
            };
            store.push(ImagePatch::solid(meta, p.rgba))?;
        }
        tracing::debug!(rank = ctx.rank(), patches = store.get_patch_count(), "scene sampled");
        Ok(Box::new(store))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/file.rs"]
mod tests;
