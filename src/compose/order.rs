use std::cmp::Ordering;

use crate::patch::model::PatchMeta;

/// Which per-patch depth value drives the back-to-front order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DepthKey {
    /// Average world depth; used by the single-rank path.
    AvgZ,
    /// Signed eye-space depth; used before and after the direct-send exchange.
    EyeZ,
}

impl DepthKey {
    fn of(self, meta: &PatchMeta) -> f32 {
        match self {
            DepthKey::AvgZ => meta.avg_z,
            DepthKey::EyeZ => meta.eye_z,
        }
    }
}

/// Total back-to-front order: larger key first, ties by ascending `(id, origin_rank)`.
pub fn compare_back_to_front(a: &PatchMeta, b: &PatchMeta, key: DepthKey) -> Ordering {
    key.of(b)
        .total_cmp(&key.of(a))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.origin_rank.cmp(&b.origin_rank))
}

/// Indices into `metas`, farthest patch first.
pub fn depth_order(metas: &[PatchMeta], key: DepthKey) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..metas.len()).collect();
    idx.sort_by(|&a, &b| compare_back_to_front(&metas[a], &metas[b], key));
    idx
}

#[cfg(test)]
#[path = "../../tests/unit/compose/order.rs"]
mod tests;
