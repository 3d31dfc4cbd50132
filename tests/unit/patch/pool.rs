use super::*;

#[test]
fn pool_honors_bucket_cap() {
    let mut p = BufferPool::new(PoolOpts {
        max_pool_bytes: 1 << 30,
        max_buffers_per_bucket: 1,
    });

    let a = p.borrow(64);
    let b = p.borrow(64);
    p.release(a);
    p.release(b);

    let st = p.stats();
    assert_eq!(st.retained_buffers, 1);
    assert_eq!(st.dropped_on_release, 1);
}

#[test]
fn pool_honors_global_byte_cap() {
    let bytes = byte_len(64);
    let mut p = BufferPool::new(PoolOpts {
        max_pool_bytes: bytes,
        max_buffers_per_bucket: 8,
    });

    let a = p.borrow(64);
    let b = p.borrow(64);
    p.release(a);
    p.release(b);

    let st = p.stats();
    assert_eq!(st.retained_bytes, bytes);
    assert_eq!(st.retained_buffers, 1);
    assert!(st.dropped_on_release >= 1);
}

#[test]
fn reused_buffers_come_back_zeroed() {
    let mut p = BufferPool::default();
    let mut a = p.borrow(8);
    a.fill(7.0);
    p.release(a);

    let b = p.borrow(8);
    assert!(b.iter().all(|&v| v == 0.0));
    assert_eq!(p.stats().reused_buffers, 1);
    assert_eq!(p.stats().alloc_buffers, 1);
}

#[test]
fn frame_scope_returns_buffers_on_drop() {
    let mut pool = BufferPool::default();
    {
        let mut scope = FrameScope::new(&mut pool);
        let a = scope.take_zeroed(16);
        let b = scope.take_zeroed(32);
        scope.recycle(a);
        scope.recycle(b);
        scope.recycle(Vec::new());
        assert_eq!(scope.taken(), 2);
    }
    assert_eq!(pool.stats().retained_buffers, 2);
}

#[test]
fn frame_scope_releases_on_early_return() {
    fn failing_frame(pool: &mut BufferPool) -> Result<(), &'static str> {
        let mut scope = FrameScope::new(pool);
        let a = scope.take_zeroed(16);
        scope.recycle(a);
        Err("frame aborted")
    }

    let mut pool = BufferPool::default();
    assert!(failing_frame(&mut pool).is_err());
    assert_eq!(pool.stats().retained_buffers, 1);
}
