use std::collections::HashMap;

/// Pool configuration for cached f32 buffers.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained buffers per length bucket.
    pub max_buffers_per_bucket: usize,
}

impl Default for PoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_buffers_per_bucket: 8,
        }
    }
}

/// Pool counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers currently held for reuse.
    pub retained_buffers: usize,
    /// Bytes currently held for reuse.
    pub retained_bytes: usize,
    /// Fresh allocations served.
    pub alloc_buffers: u64,
    /// Bytes of fresh allocations served.
    pub alloc_bytes: u64,
    /// Borrows satisfied from a retained buffer.
    pub reused_buffers: u64,
    /// Released buffers dropped because a cap was reached.
    pub dropped_on_release: u64,
}

struct Bucket {
    buffers: Vec<Vec<f32>>,
}

/// Bounded pool of f32 buffers used for accumulators, received patches and gather targets.
///
/// Keyed by buffer length. Borrow/release happens at buffer granularity, never per pixel.
pub struct BufferPool {
    opts: PoolOpts,
    stats: PoolStats,

    bucket_idx_by_len: HashMap<usize, usize>,
    buckets: Vec<Bucket>,
}

impl BufferPool {
    /// Empty pool.
    pub fn new(opts: PoolOpts) -> Self {
        Self {
            opts,
            stats: PoolStats::default(),
            bucket_idx_by_len: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> PoolStats {
        self.stats.clone()
    }

    /// Zero-filled buffer of `len` floats.
    pub fn borrow(&mut self, len: usize) -> Vec<f32> {
        if let Some(&bi) = self.bucket_idx_by_len.get(&len)
            && let Some(mut buf) = self.buckets[bi].buffers.pop()
        {
            self.stats.retained_buffers = self.stats.retained_buffers.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(byte_len(len));
            self.stats.reused_buffers = self.stats.reused_buffers.saturating_add(1);
            buf.fill(0.0);
            return buf;
        }

        self.stats.alloc_buffers = self.stats.alloc_buffers.saturating_add(1);
        self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(byte_len(len) as u64);
        vec![0.0; len]
    }

    /// Hand a buffer back for reuse. Empty buffers are ignored.
    pub fn release(&mut self, buf: Vec<f32>) {
        let len = buf.len();
        if len == 0 {
            return;
        }
        if self.opts.max_pool_bytes == 0 || self.opts.max_buffers_per_bucket == 0 {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bytes = byte_len(len);
        if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bi = match self.bucket_idx_by_len.get(&len).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    buffers: Vec::new(),
                });
                self.bucket_idx_by_len.insert(len, i);
                i
            }
        };

        let bucket = &mut self.buckets[bi];
        if bucket.buffers.len() >= self.opts.max_buffers_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.buffers.push(buf);
        self.stats.retained_buffers = self.stats.retained_buffers.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolOpts::default())
    }
}

fn byte_len(len: usize) -> usize {
    len.saturating_mul(std::mem::size_of::<f32>())
}

/// Frame-scoped view of a [`BufferPool`].
///
/// Buffers taken through the scope and handed back with [`FrameScope::recycle`] return to the
/// pool when the scope is dropped, whichever path the frame leaves through.
pub struct FrameScope<'p> {
    pool: &'p mut BufferPool,
    recycled: Vec<Vec<f32>>,
    taken: usize,
}

impl<'p> FrameScope<'p> {
    /// Open a scope for one frame.
    pub fn new(pool: &'p mut BufferPool) -> Self {
        Self {
            pool,
            recycled: Vec::new(),
            taken: 0,
        }
    }

    /// Zero-filled buffer of `len` floats.
    pub fn take_zeroed(&mut self, len: usize) -> Vec<f32> {
        self.taken += 1;
        self.pool.borrow(len)
    }

    /// Queue a buffer for return to the pool at scope end.
    pub fn recycle(&mut self, buf: Vec<f32>) {
        if !buf.is_empty() {
            self.recycled.push(buf);
        }
    }

    /// Queue many buffers for return to the pool.
    pub fn recycle_all(&mut self, bufs: impl IntoIterator<Item = Vec<f32>>) {
        for b in bufs {
            self.recycle(b);
        }
    }

    /// Buffers handed out by this scope so far.
    pub fn taken(&self) -> usize {
        self.taken
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        for buf in self.recycled.drain(..) {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/patch/pool.rs"]
mod tests;
