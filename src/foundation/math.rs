pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y).min(255) as u8
}

/// Linear fade from 1 at `age == 0` to 0 at `age == window`.
pub(crate) fn linear_fade(age: u64, window: u64) -> f64 {
    if window == 0 {
        return 0.0;
    }
    (1.0 - (age as f64) / (window as f64)).clamp(0.0, 1.0)
}

/// Convert seconds to ticks at `rate`, rounding to nearest and never below zero.
pub(crate) fn secs_to_ticks_round(secs: f64, rate: f64) -> u64 {
    (secs * rate).round().max(0.0) as u64
}
