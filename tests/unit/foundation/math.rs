use super::*;

#[test]
fn clamp01_bounds_and_nan() {
    assert_eq!(clamp01(-0.5), 0.0);
    assert_eq!(clamp01(1.5), 1.0);
    assert_eq!(clamp01(0.25), 0.25);
    assert_eq!(clamp01(f32::NAN), 0.0);
}

#[test]
fn byte_quantization_rounds_to_nearest() {
    assert_eq!(unit_to_u8(0.0), 0);
    assert_eq!(unit_to_u8(1.0), 255);
    assert_eq!(unit_to_u8(0.5), 128);
    assert_eq!(unit_to_u8(2.0), 255);
    for b in [0u8, 1, 17, 128, 254, 255] {
        assert_eq!(unit_to_u8(u8_to_unit(b)), b);
    }
}
