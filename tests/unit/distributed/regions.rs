use super::*;

#[test]
fn plans_cover_every_row_exactly_once() {
    for n in 1..=9usize {
        for h in [0u32, 1, 2, 3, 7, 8, 9, 64, 101, 1080] {
            let plan = plan_regions(n, h).unwrap();
            assert_eq!(plan.len(), n);
            assert_eq!(plan[0].min_y, 0);
            assert_eq!(plan[n - 1].max_y, h);
            for w in plan.windows(2) {
                assert_eq!(w[0].max_y, w[1].min_y, "gap or overlap for n={n} h={h}");
            }
            let total: u32 = plan.iter().map(|r| r.rows()).sum();
            assert_eq!(total, h);
        }
    }
}

#[test]
fn short_images_leave_some_bands_empty() {
    let plan = plan_regions(4, 2).unwrap();
    assert_eq!(plan.iter().filter(|r| r.is_empty()).count(), 2);
    assert_eq!(plan.iter().filter(|r| r.rows() == 1).count(), 2);
}

#[test]
fn zero_ranks_is_an_error() {
    assert!(plan_regions(0, 10).is_err());
}

#[test]
fn owners_follow_row_overlap() {
    let plan = plan_regions(4, 16).unwrap(); // 0..4, 4..8, 8..12, 12..16
    assert_eq!(owners_of_rows(&plan, 0, 4).as_slice(), &[0]);
    assert_eq!(owners_of_rows(&plan, 3, 5).as_slice(), &[0, 1]);
    assert_eq!(owners_of_rows(&plan, 2, 15).as_slice(), &[0, 1, 2, 3]);
    assert!(owners_of_rows(&plan, 16, 20).is_empty());
    assert!(owners_of_rows(&plan, 5, 5).is_empty());
}

#[test]
fn empty_bands_own_nothing() {
    let plan = plan_regions(3, 1).unwrap();
    assert_eq!(owners_of_rows(&plan, 0, 1).len(), 1);
}

#[test]
fn band_rect_spans_full_width() {
    let r = ScreenRegion { min_y: 2, max_y: 5 };
    assert_eq!(r.rect(ImageSize::new(7, 9)), ScreenRect::new(0, 2, 7, 5).unwrap());
}
