use std::ops::Range;

use crate::foundation::error::{CompositeError, CompositeResult};

/// Number of tags available to each exchange stage.
pub const STAGE_SPAN: u32 = 1 << 20;

/// Message classes of one compositing frame. Each owns a disjoint tag pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExchangeStage {
    /// Number of sub-patches one rank sends to another.
    PatchCount,
    /// Serialized [`crate::PatchMeta`] of a sub-patch.
    PatchMeta,
    /// Raw RGBA floats of a sub-patch.
    PatchPixels,
    /// Band header sent to rank 0 during the gather.
    GatherMeta,
    /// Band pixels sent to rank 0 during the gather.
    GatherPixels,
}

impl ExchangeStage {
    /// Every stage, in tag order.
    pub const ALL: [ExchangeStage; 5] = [
        ExchangeStage::PatchCount,
        ExchangeStage::PatchMeta,
        ExchangeStage::PatchPixels,
        ExchangeStage::GatherMeta,
        ExchangeStage::GatherPixels,
    ];

    /// First tag of the stage's pool.
    pub const fn base(self) -> u32 {
        let slot = match self {
            ExchangeStage::PatchCount => 1,
            ExchangeStage::PatchMeta => 2,
            ExchangeStage::PatchPixels => 3,
            ExchangeStage::GatherMeta => 4,
            ExchangeStage::GatherPixels => 5,
        };
        slot * STAGE_SPAN
    }

    /// Tag pool of the stage.
    pub const fn range(self) -> Range<u32> {
        self.base()..self.base() + STAGE_SPAN
    }
}

const fn pools_are_disjoint() -> bool {
    let all = ExchangeStage::ALL;
    let mut i = 0;
    while i < all.len() {
        let mut j = i + 1;
        while j < all.len() {
            let (a, b) = (all[i].range(), all[j].range());
            if !(a.end <= b.start || b.end <= a.start) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(pools_are_disjoint(), "exchange tag pools overlap");

/// A message tag: a stage plus a sequence number inside the stage's pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    stage: ExchangeStage,
    seq: u32,
}

impl Tag {
    /// Tag number `seq` of `stage`; fails when the pool is exhausted.
    pub fn new(stage: ExchangeStage, seq: usize) -> CompositeResult<Self> {
        match u32::try_from(seq) {
            Ok(seq) if seq < STAGE_SPAN => Ok(Self { stage, seq }),
            _ => Err(CompositeError::exchange(format!(
                "{stage:?} tag pool exhausted at sequence {seq}"
            ))),
        }
    }

    /// Stage the tag belongs to.
    pub fn stage(self) -> ExchangeStage {
        self.stage
    }

    /// Sequence number within the stage.
    pub fn seq(self) -> u32 {
        self.seq
    }

    /// Flat integer value, as carried by a transport.
    pub fn value(self) -> u32 {
        self.stage.base() + self.seq
    }

    /// Decode a flat value back into a tag.
    pub fn from_value(value: u32) -> Option<Self> {
        ExchangeStage::ALL
            .into_iter()
            .find(|s| s.range().contains(&value))
            .map(|stage| Self {
                stage,
                seq: value - stage.base(),
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/distributed/tags.rs"]
mod tests;
