use super::*;
use crate::foundation::core::{PatchId, ScreenRect};
use crate::patch::pool::BufferPool;

fn patch(id: u32, rect: ScreenRect, avg_z: f32, rgba: [f32; 4]) -> ImagePatch {
    ImagePatch::solid(
        PatchMeta {
            id: PatchId(id),
            rect,
            avg_z,
            eye_z: -avg_z,
            origin_rank: 0,
        },
        rgba,
    )
}

#[test]
fn empty_store_yields_empty_buffer() {
    let mut pool = BufferPool::default();
    let mut scope = FrameScope::new(&mut pool);
    let out = composite_serial(&PatchStore::new(), DepthKey::AvgZ, &mut scope).unwrap();
    assert!(out.extent().is_empty());
    assert_eq!(scope.taken(), 0);
}

#[test]
fn farther_patch_is_blended_first_regardless_of_insertion() {
    let px = ScreenRect::from_origin_size(0, 0, 1, 1);
    let red = patch(0, px, 10.0, [1.0, 0.0, 0.0, 0.5]);
    let blue = patch(1, px, 5.0, [0.0, 0.0, 1.0, 0.5]);

    let mut pool = BufferPool::default();
    let mut scope = FrameScope::new(&mut pool);
    for order in [vec![red.clone(), blue.clone()], vec![blue.clone(), red.clone()]] {
        let store = PatchStore::from_patches(order).unwrap();
        let out = composite_serial(&store, DepthKey::AvgZ, &mut scope).unwrap();
        assert_eq!(out.pixel(0, 0), Some([0.5, 0.0, 1.0, 0.75]));
    }
}

#[test]
fn serial_and_eye_orders_may_differ() {
    let px = ScreenRect::from_origin_size(0, 0, 1, 1);
    let store = PatchStore::from_patches([
        patch(0, px, 10.0, [1.0, 0.0, 0.0, 0.5]),
        patch(1, px, 5.0, [0.0, 0.0, 1.0, 0.5]),
    ])
    .unwrap();
    let mut pool = BufferPool::default();
    let mut scope = FrameScope::new(&mut pool);
    let by_avg = composite_serial(&store, DepthKey::AvgZ, &mut scope).unwrap();
    let by_eye = composite_serial(&store, DepthKey::EyeZ, &mut scope).unwrap();
    assert_eq!(by_eye.pixel(0, 0), Some([1.0, 0.0, 0.5, 0.75]));
    assert_ne!(by_avg, by_eye);
}

#[test]
fn opaque_front_patch_hides_everything_behind() {
    let rect = ScreenRect::from_origin_size(0, 0, 2, 2);
    let store = PatchStore::from_patches([
        patch(0, rect, 1.0, [0.2, 0.4, 0.6, 1.0]),
        patch(1, rect, 2.0, [1.0, 1.0, 1.0, 1.0]),
        patch(2, rect, 3.0, [0.0, 1.0, 0.0, 0.3]),
    ])
    .unwrap();
    let mut pool = BufferPool::default();
    let mut scope = FrameScope::new(&mut pool);
    let out = composite_serial(&store, DepthKey::AvgZ, &mut scope).unwrap();
    // Patch 1 makes the pixel opaque, so the nearer patch 0 is skipped too.
    assert_eq!(out.pixel(1, 1), Some([1.0, 1.0, 1.0, 1.0]));
}

#[test]
fn uncovered_pixels_stay_transparent() {
    let store = PatchStore::from_patches([
        patch(0, ScreenRect::from_origin_size(0, 0, 1, 1), 1.0, [1.0; 4]),
        patch(1, ScreenRect::from_origin_size(3, 3, 1, 1), 1.0, [1.0; 4]),
    ])
    .unwrap();
    let mut pool = BufferPool::default();
    let mut scope = FrameScope::new(&mut pool);
    let out = composite_serial(&store, DepthKey::AvgZ, &mut scope).unwrap();
    assert_eq!(out.extent(), ScreenRect::new(0, 0, 4, 4).unwrap());
    assert_eq!(out.pixel(1, 2), Some([0.0; 4]));
    assert_eq!(out.covered_pixels(), 2);
}
