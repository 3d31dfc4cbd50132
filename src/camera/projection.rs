use crate::foundation::core::{DMat4, DVec3, DVec4, ImageSize};
use crate::foundation::error::{CompositeError, CompositeResult};

/// Camera description consumed by the compositor.
///
/// Near/far planes are expected to be tightened by the caller around the rendered data.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Eye position in world space.
    pub position: DVec3,
    /// Point the camera looks at.
    pub focus: DVec3,
    /// Up hint; must not be parallel to the view direction.
    pub view_up: DVec3,
    /// Vertical field of view in degrees (perspective only).
    pub view_angle_deg: f64,
    /// Near clipping distance.
    pub near: f64,
    /// Far clipping distance.
    pub far: f64,
    /// Orthographic projection when `true`.
    pub orthographic: bool,
    /// Half-height of the view volume (orthographic only).
    pub parallel_scale: f64,
    /// Eye-space pan applied before projection.
    pub image_pan: [f64; 2],
    /// Eye-space zoom applied before projection.
    pub image_zoom: f64,
    /// Per-axis scale applied after the view transform.
    pub scale: DVec3,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 0.0, 5.0),
            focus: DVec3::ZERO,
            view_up: DVec3::Y,
            view_angle_deg: 30.0,
            near: 0.1,
            far: 100.0,
            orthographic: false,
            parallel_scale: 1.0,
            image_pan: [0.0, 0.0],
            image_zoom: 1.0,
            scale: DVec3::ONE,
        }
    }
}

impl CameraParams {
    /// Check the parameters describe a usable, invertible camera.
    pub fn validate(&self) -> CompositeResult<()> {
        let finite = self.position.is_finite()
            && self.focus.is_finite()
            && self.view_up.is_finite()
            && self.scale.is_finite()
            && self.near.is_finite()
            && self.far.is_finite()
            && self.image_zoom.is_finite()
            && self.image_pan.iter().all(|v| v.is_finite());
        if !finite {
            return Err(CompositeError::validation("camera parameters must be finite"));
        }

        let dir = self.focus - self.position;
        if dir.length_squared() == 0.0 {
            return Err(CompositeError::validation(
                "camera position and focus must differ",
            ));
        }
        if dir.cross(self.view_up).length_squared() == 0.0 {
            return Err(CompositeError::validation(
                "camera view_up must not be parallel to the view direction",
            ));
        }
        if self.far <= self.near {
            return Err(CompositeError::validation("camera far must be > near"));
        }
        if self.image_zoom <= 0.0 {
            return Err(CompositeError::validation("camera image_zoom must be > 0"));
        }
        if self.scale.cmpeq(DVec3::ZERO).any() {
            return Err(CompositeError::validation("camera scale must be non-zero"));
        }
        if self.orthographic {
            if self.parallel_scale <= 0.0 {
                return Err(CompositeError::validation(
                    "orthographic camera parallel_scale must be > 0",
                ));
            }
        } else {
            if self.near <= 0.0 {
                return Err(CompositeError::validation(
                    "perspective camera near must be > 0",
                ));
            }
            if !(self.view_angle_deg > 0.0 && self.view_angle_deg < 180.0) {
                return Err(CompositeError::validation(
                    "perspective camera view_angle_deg must be in (0, 180)",
                ));
            }
        }
        Ok(())
    }
}

/// A projected point: pixel coordinates plus normalized depth in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    /// Horizontal pixel coordinate (0 at the left edge).
    pub x: f64,
    /// Vertical pixel coordinate (0 at the bottom edge).
    pub y: f64,
    /// Window depth, 0 at the near plane and 1 at the far plane.
    pub z: f64,
}

/// A homogeneous divide hit `w == 0` (or a non-finite `w`).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("degenerate homogeneous coordinate (w = {w})")]
pub struct DegenerateTransform {
    /// The offending `w` component.
    pub w: f64,
}

/// Per-frame camera transform: `pvm = P * (ZoomPan * (Scale * View))` and its inverse.
#[derive(Clone, Debug)]
pub struct ProjectionContext {
    camera: CameraParams,
    image: ImageSize,
    pvm: DMat4,
    inverse: DMat4,
    eye_to_world: DMat4,
}

impl ProjectionContext {
    /// Build the combined transform for `camera` rendering into `image`.
    pub fn new(camera: &CameraParams, image: ImageSize) -> CompositeResult<Self> {
        camera.validate()?;
        if image.width == 0 || image.height == 0 {
            return Err(CompositeError::validation(
                "projection requires a non-empty image",
            ));
        }

        let view = DMat4::look_at_rh(camera.position, camera.focus, camera.view_up);
        let scale = DMat4::from_scale(camera.scale);
        let zoom_pan = DMat4::from_translation(DVec3::new(
            camera.image_pan[0],
            camera.image_pan[1],
            0.0,
        )) * DMat4::from_scale(DVec3::new(camera.image_zoom, camera.image_zoom, 1.0));
        let projection = projection_matrix(camera, image.aspect());

        let world_to_eye = zoom_pan * (scale * view);
        let pvm = projection * world_to_eye;
        let inverse = pvm.inverse();
        if !inverse.is_finite() || pvm.determinant() == 0.0 {
            return Err(CompositeError::validation(
                "camera produces a non-invertible projection",
            ));
        }

        Ok(Self {
            camera: camera.clone(),
            image,
            pvm,
            inverse,
            eye_to_world: world_to_eye.inverse(),
        })
    }

    /// World to clip transform.
    pub fn matrix(&self) -> DMat4 {
        self.pvm
    }

    /// Clip to world transform.
    pub fn inverse(&self) -> DMat4 {
        self.inverse
    }

    /// Camera this context was built from.
    pub fn camera(&self) -> &CameraParams {
        &self.camera
    }

    /// Image the viewport maps onto.
    pub fn image(&self) -> ImageSize {
        self.image
    }

    /// Whether the projection is orthographic.
    pub fn is_orthographic(&self) -> bool {
        self.camera.orthographic
    }

    /// Centre of projection in world space.
    pub fn eye_position(&self) -> DVec3 {
        self.eye_to_world.transform_point3(DVec3::ZERO)
    }

    /// Unit viewing direction in world space.
    pub fn view_direction(&self) -> DVec3 {
        self.eye_to_world
            .transform_vector3(DVec3::NEG_Z)
            .normalize_or_zero()
    }

    /// Signed eye-space depth along the viewing axis; positive in front of the camera.
    pub fn eye_depth(&self, world: DVec3) -> f64 {
        (world - self.eye_position()).dot(self.view_direction())
    }

    /// Map a world point to pixel coordinates and window depth.
    pub fn project(&self, world: DVec3) -> Result<ScreenPoint, DegenerateTransform> {
        let clip = self.pvm * world.extend(1.0);
        let ndc = divide_w(clip)?;
        Ok(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * f64::from(self.image.width),
            y: (ndc.y + 1.0) * 0.5 * f64::from(self.image.height),
            z: (ndc.z + 1.0) * 0.5,
        })
    }

    /// Map pixel coordinates and window depth in `[0, 1]` back to world space.
    pub fn unproject(&self, x: f64, y: f64, z: f64) -> Result<DVec3, DegenerateTransform> {
        let ndc = DVec4::new(
            2.0 * x / f64::from(self.image.width) - 1.0,
            2.0 * y / f64::from(self.image.height) - 1.0,
            z * 2.0 - 1.0,
            1.0,
        );
        divide_w(self.inverse * ndc)
    }
}

fn divide_w(v: DVec4) -> Result<DVec3, DegenerateTransform> {
    if v.w == 0.0 || !v.w.is_finite() {
        return Err(DegenerateTransform { w: v.w });
    }
    Ok(v.truncate() / v.w)
}

// Clip z is remapped so near -> -1 and far -> +1 by overwriting rows 2, cols 2..3.
fn projection_matrix(camera: &CameraParams, aspect: f64) -> DMat4 {
    let (n, f) = (camera.near, camera.far);
    let mut m = if camera.orthographic {
        let half_h = camera.parallel_scale;
        let half_w = half_h * aspect;
        DMat4::from_diagonal(DVec4::new(1.0 / half_w, 1.0 / half_h, 1.0, 1.0))
    } else {
        let cot = 1.0 / (camera.view_angle_deg.to_radians() * 0.5).tan();
        let mut m = DMat4::from_diagonal(DVec4::new(cot / aspect, cot, 1.0, 0.0));
        m.z_axis.w = -1.0;
        m
    };

    if camera.orthographic {
        m.z_axis.z = -2.0 / (f - n);
        m.w_axis.z = -(f + n) / (f - n);
    } else {
        m.z_axis.z = -(f + n) / (f - n);
        m.w_axis.z = -2.0 * f * n / (f - n);
    }
    m
}

#[cfg(test)]
#[path = "../../tests/unit/camera/projection.rs"]
mod tests;
