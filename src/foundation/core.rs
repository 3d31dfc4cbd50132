use crate::foundation::error::{CompositeError, CompositeResult};

pub use glam::{DMat4, DVec3, DVec4};

/// Output image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// Create an image size; both dimensions may be zero.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Rectangle covering the whole image.
    pub fn full_rect(self) -> ScreenRect {
        ScreenRect {
            x0: 0,
            y0: 0,
            x1: self.width,
            y1: self.height,
        }
    }

    /// Width over height, or `1.0` for a degenerate image.
    pub fn aspect(self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Identifier of an image patch, unique among the patches of one frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PatchId(pub u32);

/// Half-open integer pixel rectangle `[x0, x1) x [y0, y1)`.
///
/// `(x0, y0)` is the lower-left corner (`ll`), `(x1, y1)` the exclusive upper-right (`ur`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScreenRect {
    /// Inclusive left column.
    pub x0: u32,
    /// Inclusive bottom row.
    pub y0: u32,
    /// Exclusive right column.
    pub x1: u32,
    /// Exclusive top row.
    pub y1: u32,
}

impl ScreenRect {
    /// Create a validated rectangle with `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> CompositeResult<Self> {
        if x0 > x1 || y0 > y1 {
            return Err(CompositeError::validation(format!(
                "ScreenRect ll ({x0},{y0}) must not exceed ur ({x1},{y1})"
            )));
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    /// Rectangle at `(x, y)` with the given dimensions.
    pub fn from_origin_size(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x.saturating_add(width),
            y1: y.saturating_add(height),
        }
    }

    /// Empty rectangle at the origin.
    pub fn empty() -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: 0,
            y1: 0,
        }
    }

    /// Width in pixels.
    pub fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Height in pixels.
    pub fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Number of pixels covered.
    pub fn area(self) -> usize {
        (self.width() as usize) * (self.height() as usize)
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Return `true` when `(x, y)` lies inside.
    pub fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Return `true` when `other` lies entirely inside `self`.
    pub fn contains_rect(self, other: ScreenRect) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    /// Overlapping area, or `None` when the rectangles are disjoint.
    pub fn intersect(self, other: ScreenRect) -> Option<ScreenRect> {
        let r = ScreenRect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (!r.is_empty()).then_some(r)
    }

    /// Restrict the rectangle to rows `[y0, y1)`.
    pub fn clip_rows(self, y0: u32, y1: u32) -> Option<ScreenRect> {
        self.intersect(ScreenRect {
            x0: self.x0,
            y0,
            x1: self.x1,
            y1,
        })
    }

    /// Smallest rectangle covering both. Empty inputs are ignored.
    pub fn union(self, other: ScreenRect) -> ScreenRect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        ScreenRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Axis-aligned world-space bounding box of the rendered volume.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb {
    /// Create a validated box with `min <= max` on every axis.
    pub fn new(min: DVec3, max: DVec3) -> CompositeResult<Self> {
        let b = Self { min, max };
        b.validate()?;
        Ok(b)
    }

    /// Check ordering and finiteness of the corners.
    pub fn validate(&self) -> CompositeResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(CompositeError::validation("volume bounds must be finite"));
        }
        if self.min.cmpgt(self.max).any() {
            return Err(CompositeError::validation(
                "volume bounds min must be <= max on every axis",
            ));
        }
        Ok(())
    }

    /// Return `true` when `p` lies strictly inside (boundary excluded).
    pub fn contains_strict(&self, p: DVec3) -> bool {
        p.cmpgt(self.min).all() && p.cmplt(self.max).all()
    }

    /// Slab test of the ray `origin + t * dir` against the box.
    ///
    /// Returns `(t_near, t_far)` when the ray's line hits the box with `t_far >= 0`. Axes with a
    /// zero direction component only constrain the ray if the origin lies outside that slab.
    pub fn intersect_ray(&self, origin: DVec3, dir: DVec3) -> Option<(f64, f64)> {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d == 0.0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }

        (t_far >= 0.0).then_some((t_near, t_far))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
