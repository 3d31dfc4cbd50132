use smallvec::SmallVec;

use crate::foundation::core::{ImageSize, ScreenRect};
use crate::foundation::error::{CompositeError, CompositeResult};

/// Half-open row band `[min_y, max_y)` owned by one rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScreenRegion {
    /// First owned row.
    pub min_y: u32,
    /// One past the last owned row.
    pub max_y: u32,
}

impl ScreenRegion {
    /// Number of owned rows; zero when the image has fewer rows than ranks.
    pub fn rows(self) -> u32 {
        self.max_y - self.min_y
    }

    /// Whether the band owns no rows.
    pub fn is_empty(self) -> bool {
        self.min_y >= self.max_y
    }

    /// Whether rows `[y0, y1)` overlap the band.
    pub fn overlaps_rows(self, y0: u32, y1: u32) -> bool {
        y0 < self.max_y && self.min_y < y1
    }

    /// The band as a full-width rectangle of `image`.
    pub fn rect(self, image: ImageSize) -> ScreenRect {
        ScreenRect {
            x0: 0,
            y0: self.min_y,
            x1: image.width,
            y1: self.max_y,
        }
    }
}

/// Split `[0, height)` into `rank_count` contiguous bands, band `r` starting at `r * H / N`.
///
/// Pure integer arithmetic, so every rank derives the same plan without communicating.
pub fn plan_regions(rank_count: usize, height: u32) -> CompositeResult<Vec<ScreenRegion>> {
    if rank_count == 0 {
        return Err(CompositeError::validation("region plan needs at least one rank"));
    }
    let n = rank_count as u64;
    let h = u64::from(height);
    Ok((0..n)
        .map(|r| ScreenRegion {
            min_y: (r * h / n) as u32,
            max_y: ((r + 1) * h / n) as u32,
        })
        .collect())
}

/// Ranks whose band intersects rows `[y0, y1)`, in rank order.
pub fn owners_of_rows(regions: &[ScreenRegion], y0: u32, y1: u32) -> SmallVec<[usize; 4]> {
    regions
        .iter()
        .enumerate()
        .filter(|(_, r)| r.overlaps_rows(y0, y1))
        .map(|(rank, _)| rank)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/distributed/regions.rs"]
mod tests;
