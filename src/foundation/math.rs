/// Clamp to the unit interval; NaN maps to `0.0`.
pub(crate) fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Quantize a unit-interval value to a byte, rounding to nearest.
pub(crate) fn unit_to_u8(v: f32) -> u8 {
    (clamp01(v) * 255.0).round() as u8
}

/// Expand a byte to the unit interval.
pub(crate) fn u8_to_unit(v: u8) -> f32 {
    f32::from(v) / 255.0
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
