use std::ops::Range;

use crate::camera::projection::{DegenerateTransform, ProjectionContext};
use crate::compose::blend::CompositedBuffer;
use crate::compose::image::{BackgroundProvider, EMPTY_DEPTH, FinalImage};
use crate::foundation::core::{Aabb, DVec3};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::{clamp01, u8_to_unit, unit_to_u8};

/// What happened to the pixels of one assembly pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Pixels where the volume was blended over the background.
    pub blended: u64,
    /// Pixels with no volume contribution.
    pub passthrough: u64,
    /// Pixels where opaque geometry sits in front of the volume.
    pub occluded: u64,
    /// Pixels whose background point could not be unprojected.
    pub degenerate: u64,
}

impl AssemblyStats {
    /// Sum two counters.
    pub fn merge(self, other: AssemblyStats) -> AssemblyStats {
        AssemblyStats {
            blended: self.blended + other.blended,
            passthrough: self.passthrough + other.passthrough,
            occluded: self.occluded + other.occluded,
            degenerate: self.degenerate + other.degenerate,
        }
    }
}

/// Merges composited volume color with the opaque background.
///
/// The composited buffer carries no per-pixel depth, so occlusion against geometry is decided
/// from the volume's world-space bounding box.
pub struct FinalAssembler<'a> {
    projection: &'a ProjectionContext,
    volume: Aabb,
}

impl<'a> FinalAssembler<'a> {
    /// Assembler for one frame.
    pub fn new(projection: &'a ProjectionContext, volume: Aabb) -> Self {
        Self { projection, volume }
    }

    /// Assemble the whole image.
    #[tracing::instrument(skip_all)]
    pub fn assemble(
        &self,
        composited: &CompositedBuffer,
        background: &dyn BackgroundProvider,
    ) -> CompositeResult<(FinalImage, AssemblyStats)> {
        let mut out = FinalImage::from_background(background);
        let rows = 0..background.size().height;
        let stats = self.assemble_rows(composited, background, rows, &mut out)?;
        tracing::debug!(?stats, "final assembly done");
        Ok((out, stats))
    }

    /// Assemble rows `rows` into `out`; other rows are left untouched.
    pub fn assemble_rows(
        &self,
        composited: &CompositedBuffer,
        background: &dyn BackgroundProvider,
        rows: Range<u32>,
        out: &mut FinalImage,
    ) -> CompositeResult<AssemblyStats> {
        let size = background.size();
        if out.size != size || size != self.projection.image() {
            return Err(CompositeError::validation(
                "background, output and projection sizes must agree",
            ));
        }
        if rows.end > size.height {
            return Err(CompositeError::validation(format!(
                "assembly rows {rows:?} exceed image height {}",
                size.height
            )));
        }

        let px = size.pixel_count();
        let bg_rgb = background.rgb_buffer();
        let bg_z = background.z_buffer();
        if bg_rgb.len() != px * 3 || bg_z.len() != px || out.rgb.len() != px * 3 {
            return Err(CompositeError::validation(format!(
                "{}x{} background needs {} rgb bytes and {px} depths, got {} and {}",
                size.width,
                size.height,
                px * 3,
                bg_rgb.len(),
                bg_z.len()
            )));
        }
        let mut stats = AssemblyStats::default();

        for y in rows {
            for x in 0..size.width {
                let i = (y as usize) * (size.width as usize) + x as usize;
                let bg = [bg_rgb[i * 3], bg_rgb[i * 3 + 1], bg_rgb[i * 3 + 2]];

                let px = match composited.pixel(x, y) {
                    Some(px) if px[3] > 0.0 => px,
                    _ => {
                        out.rgb[i * 3..i * 3 + 3].copy_from_slice(&bg);
                        stats.passthrough += 1;
                        continue;
                    }
                };

                let rgb = if bg_z[i] >= EMPTY_DEPTH {
                    stats.blended += 1;
                    over_background(bg, px)
                } else {
                    match self.volume_in_front(x, y, f64::from(bg_z[i])) {
                        Ok(true) => {
                            stats.blended += 1;
                            over_background(bg, px)
                        }
                        Ok(false) => {
                            stats.occluded += 1;
                            bg
                        }
                        Err(err) => {
                            tracing::debug!(x, y, %err, "background point is undefined");
                            stats.degenerate += 1;
                            bg
                        }
                    }
                };
                out.rgb[i * 3..i * 3 + 3].copy_from_slice(&rgb);
            }
        }
        Ok(stats)
    }

    /// Whether the volume lies in front of the background point at pixel `(x, y)`, depth `z`.
    pub fn volume_in_front(&self, x: u32, y: u32, z: f64) -> Result<bool, DegenerateTransform> {
        let (sx, sy) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
        let point = self.projection.unproject(sx, sy, z)?;
        if self.volume.contains_strict(point) {
            return Ok(true);
        }

        let (origin, dir) = if self.projection.is_orthographic() {
            (
                self.projection.unproject(sx, sy, 0.0)?,
                self.projection.view_direction(),
            )
        } else {
            let eye = self.projection.eye_position();
            (eye, (point - eye).normalize_or_zero())
        };
        if dir == DVec3::ZERO {
            return Ok(false);
        }

        let t_point = (point - origin).dot(dir);
        Ok(match self.volume.intersect_ray(origin, dir) {
            Some((t_near, _)) => t_near < t_point,
            None => false,
        })
    }
}

/// `clamp(bg * (1 - a) + rgb)` quantized back to bytes.
pub fn over_background(bg: [u8; 3], px: [f32; 4]) -> [u8; 3] {
    let keep = 1.0 - px[3];
    [
        unit_to_u8(clamp01(u8_to_unit(bg[0]) * keep + px[0])),
        unit_to_u8(clamp01(u8_to_unit(bg[1]) * keep + px[1])),
        unit_to_u8(clamp01(u8_to_unit(bg[2]) * keep + px[2])),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/compose/assemble.rs"]
mod tests;
