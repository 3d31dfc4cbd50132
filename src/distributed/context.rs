use std::fmt;
use std::sync::Arc;

use crate::distributed::transport::{Communicator, LocalCluster, LocalClusterOpts};
use crate::foundation::error::{CompositeError, CompositeResult};

/// Process topology handed to every compositor entry point.
///
/// Created once at process start and never mutated while a frame is in flight.
#[derive(Clone)]
pub struct DistributedContext {
    rank: usize,
    size: usize,
    comm: Arc<dyn Communicator>,
}

impl DistributedContext {
    /// Context for `rank` of `size` ranks over `comm`.
    pub fn new(rank: usize, size: usize, comm: Arc<dyn Communicator>) -> CompositeResult<Self> {
        if size == 0 {
            return Err(CompositeError::validation("rank count must be >= 1"));
        }
        if rank >= size {
            return Err(CompositeError::validation(format!(
                "rank {rank} out of range for {size} ranks"
            )));
        }
        Ok(Self { rank, size, comm })
    }

    /// Single-rank context; compositing stays on the serial path.
    pub fn single() -> CompositeResult<Self> {
        LocalCluster::contexts(1, LocalClusterOpts::default())?
            .pop()
            .ok_or_else(|| CompositeError::transport("failed to create single-rank context"))
    }

    /// This process' rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this rank assembles the final image.
    pub fn is_root(&self) -> bool {
        self.rank == 0
    }

    /// The transport.
    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }
}

impl fmt::Debug for DistributedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedContext")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
