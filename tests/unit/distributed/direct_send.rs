use super::*;
use crate::distributed::transport::{LocalCluster, LocalClusterOpts};
use crate::foundation::core::PatchId;
use crate::patch::model::PatchMeta;
use crate::patch::pool::BufferPool;
use std::time::Duration;

const IMAGE: ImageSize = ImageSize {
    width: 6,
    height: 9,
};

fn solid(id: u32, rank: u32, rect: ScreenRect, eye_z: f32, rgba: [f32; 4]) -> ImagePatch {
    ImagePatch::solid(
        PatchMeta {
            id: PatchId(id),
            rect,
            avg_z: eye_z,
            eye_z,
            origin_rank: rank,
        },
        rgba,
    )
}

#[test]
fn tall_patch_is_split_across_every_band() {
    let results = LocalCluster::run(3, LocalClusterOpts::default(), |ctx| {
        let store = if ctx.rank() == 1 {
            PatchStore::from_patches([solid(
                0,
                1,
                ScreenRect::from_origin_size(1, 0, 2, 9),
                1.0,
                [0.1, 0.2, 0.3, 0.4],
            )])?
        } else {
            PatchStore::new()
        };
        let mut pool = BufferPool::default();
        let mut scope = FrameScope::new(&mut pool);
        let out = direct_send(ctx, &store, IMAGE, &mut scope)?;
        Ok((out.region, out.band.extent(), out.stats))
    })
    .unwrap();

    for (rank, (region, extent, stats)) in results.iter().enumerate() {
        assert_eq!(region.rows(), 3);
        assert_eq!(*extent, ScreenRect::new(1, region.min_y, 3, region.max_y).unwrap());
        if rank == 1 {
            assert_eq!(stats.sent, 2);
            assert_eq!(stats.kept, 1);
        } else {
            assert_eq!(stats.received, 1);
        }
        assert_eq!(stats.blended_pixels, 6);
    }
}

#[test]
fn gather_stacks_bands_on_root() {
    let results = LocalCluster::run(3, LocalClusterOpts::default(), |ctx| {
        let r = ctx.rank() as u32;
        let store = PatchStore::from_patches([solid(
            r,
            r,
            ScreenRect::from_origin_size(r, 0, 1, 9),
            1.0,
            [1.0, 1.0, 1.0, 1.0],
        )])?;
        let mut pool = BufferPool::default();
        let mut scope = FrameScope::new(&mut pool);
        let out = direct_send(ctx, &store, IMAGE, &mut scope)?;
        gather_to_root(ctx, out, IMAGE, &mut scope)
    })
    .unwrap();

    assert!(results[1].is_none());
    assert!(results[2].is_none());
    let full = results[0].as_ref().unwrap();
    assert_eq!(full.extent(), ScreenRect::new(0, 0, 3, 9).unwrap());
    for y in 0..9 {
        for x in 0..3 {
            assert_eq!(full.pixel(x, y), Some([1.0; 4]), "({x},{y})");
        }
    }
}

#[test]
fn patches_outside_the_image_are_dropped() {
    let results = LocalCluster::run(2, LocalClusterOpts::default(), |ctx| {
        let store = PatchStore::from_patches([solid(
            ctx.rank() as u32,
            ctx.rank() as u32,
            ScreenRect::from_origin_size(0, 20, 2, 2),
            1.0,
            [1.0; 4],
        )])?;
        let mut pool = BufferPool::default();
        let mut scope = FrameScope::new(&mut pool);
        Ok(direct_send(ctx, &store, IMAGE, &mut scope)?.stats)
    })
    .unwrap();
    for stats in results {
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.blended_pixels, 0);
    }
}

#[test]
fn short_pixel_message_is_an_exchange_error() {
    let ctxs = LocalCluster::contexts(2, LocalClusterOpts::default()).unwrap();
    let meta = PatchMeta {
        id: PatchId(0),
        rect: ScreenRect::from_origin_size(0, 0, 2, 2),
        avg_z: 0.0,
        eye_z: 0.0,
        origin_rank: 1,
    };
    let comm = ctxs[1].comm();
    comm.send(0, Tag::new(ExchangeStage::PatchCount, 0).unwrap(), encode_count(1).unwrap())
        .unwrap();
    comm.send(0, Tag::new(ExchangeStage::PatchMeta, 0).unwrap(), encode_json(&meta).unwrap())
        .unwrap();
    comm.send(0, Tag::new(ExchangeStage::PatchPixels, 0).unwrap(), encode_pixels(&[0.0; 3]))
        .unwrap();

    let region = plan_regions(2, IMAGE.height).unwrap()[0];
    let mut pool = BufferPool::default();
    let mut scope = FrameScope::new(&mut pool);
    let err = receive_from(&ctxs[0], 1, region, IMAGE, &mut scope).unwrap_err();
    assert!(matches!(err, CompositeError::Exchange(_)));
}

#[test]
fn patch_outside_receiver_band_is_an_exchange_error() {
    let ctxs = LocalCluster::contexts(2, LocalClusterOpts::default()).unwrap();
    let meta = PatchMeta {
        id: PatchId(0),
        rect: ScreenRect::from_origin_size(0, 7, 1, 1),
        avg_z: 0.0,
        eye_z: 0.0,
        origin_rank: 1,
    };
    let comm = ctxs[1].comm();
    comm.send(0, Tag::new(ExchangeStage::PatchCount, 0).unwrap(), encode_count(1).unwrap())
        .unwrap();
    comm.send(0, Tag::new(ExchangeStage::PatchMeta, 0).unwrap(), encode_json(&meta).unwrap())
        .unwrap();

    let region = plan_regions(2, IMAGE.height).unwrap()[0];
    let mut pool = BufferPool::default();
    let mut scope = FrameScope::new(&mut pool);
    let err = receive_from(&ctxs[0], 1, region, IMAGE, &mut scope).unwrap_err();
    assert!(err.to_string().contains("outside band"));
}

#[test]
fn patch_wider_than_image_is_clipped_before_sending() {
    let image = ImageSize::new(4, 4);
    let opts = LocalClusterOpts {
        recv_timeout: Some(Duration::from_millis(200)),
    };
    let results = LocalCluster::run(2, opts, |ctx| {
        let store = if ctx.rank() == 0 {
            PatchStore::from_patches([solid(
                0,
                0,
                ScreenRect::from_origin_size(0, 2, 6, 2),
                1.0,
                [0.5, 0.5, 0.5, 0.5],
            )])?
        } else {
            PatchStore::new()
        };
        let mut pool = BufferPool::default();
        let mut scope = FrameScope::new(&mut pool);
        let out = direct_send(ctx, &store, image, &mut scope)?;
        let stats = out.stats;
        let full = gather_to_root(ctx, out, image, &mut scope)?;
        Ok((stats, full))
    })
    .unwrap();

    let (root_stats, full) = &results[0];
    assert_eq!(root_stats.sent, 1);
    assert_eq!(results[1].0.received, 1);
    assert_eq!(results[1].0.blended_pixels, 8);

    let full = full.as_ref().unwrap();
    assert_eq!(full.extent(), ScreenRect::new(0, 2, 4, 4).unwrap());
    assert_eq!(full.pixel(3, 3), Some([0.5; 4]));
}
