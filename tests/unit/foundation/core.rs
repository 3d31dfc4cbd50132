use super::*;

#[test]
fn rect_rejects_inverted_bounds() {
    assert!(ScreenRect::new(4, 0, 2, 1).is_err());
    assert!(ScreenRect::new(0, 3, 1, 1).is_err());
    assert!(ScreenRect::new(1, 1, 1, 1).unwrap().is_empty());
}

#[test]
fn rect_intersection_and_row_clip() {
    let a = ScreenRect::from_origin_size(2, 2, 6, 6);
    let b = ScreenRect::from_origin_size(5, 0, 10, 4);
    assert_eq!(a.intersect(b), Some(ScreenRect::new(5, 2, 8, 4).unwrap()));
    assert_eq!(a.clip_rows(0, 2), None);
    assert_eq!(a.clip_rows(3, 5), Some(ScreenRect::new(2, 3, 8, 5).unwrap()));
}

#[test]
fn rect_union_ignores_empty() {
    let a = ScreenRect::from_origin_size(1, 1, 2, 2);
    assert_eq!(a.union(ScreenRect::empty()), a);
    assert_eq!(ScreenRect::empty().union(a), a);
    let b = ScreenRect::from_origin_size(5, 0, 1, 1);
    assert_eq!(a.union(b), ScreenRect::new(1, 0, 6, 3).unwrap());
}

#[test]
fn aabb_strict_containment_excludes_faces() {
    let b = Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0)).unwrap();
    assert!(b.contains_strict(DVec3::ZERO));
    assert!(!b.contains_strict(DVec3::new(1.0, 0.0, 0.0)));
    assert!(!b.contains_strict(DVec3::new(0.0, 0.0, 2.0)));
}

#[test]
fn aabb_rejects_inverted_corners() {
    assert!(Aabb::new(DVec3::splat(1.0), DVec3::splat(-1.0)).is_err());
    assert!(Aabb::new(DVec3::splat(f64::NAN), DVec3::splat(1.0)).is_err());
}

#[test]
fn slab_test_uses_all_three_axes() {
    let b = Aabb::new(DVec3::new(-1.0, -1.0, -1.0), DVec3::new(1.0, 1.0, 1.0)).unwrap();

    let (t0, t1) = b
        .intersect_ray(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0))
        .unwrap();
    assert!((t0 - 4.0).abs() < 1e-12);
    assert!((t1 - 6.0).abs() < 1e-12);

    // The x slab is crossed for t in [2, 4] but the z slab only for t in [-1, 1].
    let miss = b.intersect_ray(DVec3::new(-3.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 1.0));
    assert!(miss.is_none());

    // Box entirely behind the origin.
    assert!(
        b.intersect_ray(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, 1.0))
            .is_none()
    );
}

#[test]
fn slab_test_handles_axis_parallel_rays() {
    let b = Aabb::new(DVec3::splat(0.0), DVec3::splat(2.0)).unwrap();
    assert!(
        b.intersect_ray(DVec3::new(1.0, 1.0, -3.0), DVec3::new(0.0, 0.0, 1.0))
            .is_some()
    );
    assert!(
        b.intersect_ray(DVec3::new(3.0, 1.0, -3.0), DVec3::new(0.0, 0.0, 1.0))
            .is_none()
    );
}
