//! Free-standing numeric operations over primitive types.
//!
//! The interpreter decodes an [`crate::UntypedValue`] into the concrete
//! primitive the opcode expects, calls the matching function here, and
//! re-encodes the result. Keeping these as plain functions over `i32`/`u32`/…
//! rather than methods on `UntypedValue` keeps the signed/unsigned or
//! narrow/wide choice explicit at each call site, which is where Wasm
//! opcodes themselves disagree (e.g. `i32.div_s` vs `i32.div_u`).

use crate::TrapCode;

pub fn clz32(v: u32) -> u32 {
    v.leading_zeros()
}

pub fn ctz32(v: u32) -> u32 {
    v.trailing_zeros()
}

pub fn popcnt32(v: u32) -> u32 {
    v.count_ones()
}

pub fn clz64(v: u64) -> u64 {
    v.leading_zeros() as u64
}

pub fn ctz64(v: u64) -> u64 {
    v.trailing_zeros() as u64
}

pub fn popcnt64(v: u64) -> u64 {
    v.count_ones() as u64
}

pub fn rotl32(x: u32, y: u32) -> u32 {
    x.rotate_left(y & 31)
}

pub fn rotr32(x: u32, y: u32) -> u32 {
    x.rotate_right(y & 31)
}

pub fn rotl64(x: u64, y: u64) -> u64 {
    x.rotate_left((y & 63) as u32)
}

pub fn rotr64(x: u64, y: u64) -> u64 {
    x.rotate_right((y & 63) as u32)
}

pub fn div_s32(a: i32, b: i32) -> Result<i32, TrapCode> {
    if b == 0 {
        return Err(TrapCode::IntegerDivisionByZero);
    }
    if a == i32::MIN && b == -1 {
        return Err(TrapCode::IntegerOverflow);
    }
    Ok(a.wrapping_div(b))
}

pub fn div_u32(a: u32, b: u32) -> Result<u32, TrapCode> {
    a.checked_div(b).ok_or(TrapCode::IntegerDivisionByZero)
}

pub fn rem_s32(a: i32, b: i32) -> Result<i32, TrapCode> {
    if b == 0 {
        return Err(TrapCode::IntegerDivisionByZero);
    }
    Ok(a.wrapping_rem(b))
}

pub fn rem_u32(a: u32, b: u32) -> Result<u32, TrapCode> {
    a.checked_rem(b).ok_or(TrapCode::IntegerDivisionByZero)
}

pub fn div_s64(a: i64, b: i64) -> Result<i64, TrapCode> {
    if b == 0 {
        return Err(TrapCode::IntegerDivisionByZero);
    }
    if a == i64::MIN && b == -1 {
        return Err(TrapCode::IntegerOverflow);
    }
    Ok(a.wrapping_div(b))
}

pub fn div_u64(a: u64, b: u64) -> Result<u64, TrapCode> {
    a.checked_div(b).ok_or(TrapCode::IntegerDivisionByZero)
}

pub fn rem_s64(a: i64, b: i64) -> Result<i64, TrapCode> {
    if b == 0 {
        return Err(TrapCode::IntegerDivisionByZero);
    }
    Ok(a.wrapping_rem(b))
}

pub fn rem_u64(a: u64, b: u64) -> Result<u64, TrapCode> {
    a.checked_rem(b).ok_or(TrapCode::IntegerDivisionByZero)
}

macro_rules! float_unary {
    ($name:ident, $f:ty, $libm:ident) => {
        pub fn $name(v: $f) -> $f {
            libm::$libm(v)
        }
    };
}
float_unary!(ceil32, f32, ceilf);
float_unary!(floor32, f32, floorf);
float_unary!(trunc32, f32, truncf);
float_unary!(sqrt32, f32, sqrtf);
float_unary!(ceil64, f64, ceil);
float_unary!(floor64, f64, floor);
float_unary!(trunc64, f64, trunc);
float_unary!(sqrt64, f64, sqrt);

/// Round-to-nearest-even, per Wasm's `nearest` semantics: ties round towards
/// the even neighbor rather than always away from zero (unlike `libm::round`,
/// which rounds ties away from zero).
pub fn nearest32(v: f32) -> f32 {
    if v.is_nan() || v.is_infinite() || v == 0.0 {
        return v;
    }
    let floor = libm::floorf(v);
    let diff = v - floor;
    let rounded = if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if libm::fmodf(floor, 2.0) == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    if rounded == 0.0 {
        libm::copysignf(0.0, v)
    } else {
        rounded
    }
}

pub fn nearest64(v: f64) -> f64 {
    if v.is_nan() || v.is_infinite() || v == 0.0 {
        return v;
    }
    let floor = libm::floor(v);
    let diff = v - floor;
    let rounded = if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if libm::fmod(floor, 2.0) == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    if rounded == 0.0 {
        libm::copysign(0.0, v)
    } else {
        rounded
    }
}

/// Returns the Wasm `min` of two floats: `NaN`-propagating, and `-0.0 < 0.0`.
pub fn fmin32(a: f32, b: f32) -> f32 {
    if a.is_nan() {
        return a;
    }
    if b.is_nan() {
        return b;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() || b.is_sign_negative() {
            -0.0
        } else {
            0.0
        };
    }
    a.min(b)
}

pub fn fmax32(a: f32, b: f32) -> f32 {
    if a.is_nan() {
        return a;
    }
    if b.is_nan() {
        return b;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_positive() || b.is_sign_positive() {
            0.0
        } else {
            -0.0
        };
    }
    a.max(b)
}

pub fn fmin64(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        return a;
    }
    if b.is_nan() {
        return b;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() || b.is_sign_negative() {
            -0.0
        } else {
            0.0
        };
    }
    a.min(b)
}

pub fn fmax64(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        return a;
    }
    if b.is_nan() {
        return b;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_positive() || b.is_sign_positive() {
            0.0
        } else {
            -0.0
        };
    }
    a.max(b)
}

pub fn copysign32(a: f32, b: f32) -> f32 {
    libm::copysignf(a, b)
}

pub fn copysign64(a: f64, b: f64) -> f64 {
    libm::copysign(a, b)
}

/// Truncating conversion from float to integer, trapping on `NaN`, infinity,
/// or a magnitude the target type cannot represent.
pub fn trunc_f32_to_i32(v: f32) -> Result<i32, TrapCode> {
    trunc_to_range(v as f64, i32::MIN as f64, (i32::MAX as f64) + 1.0).map(|v| v as i32)
}

pub fn trunc_f32_to_u32(v: f32) -> Result<u32, TrapCode> {
    trunc_to_range(v as f64, 0.0, (u32::MAX as f64) + 1.0).map(|v| v as u32)
}

pub fn trunc_f64_to_i32(v: f64) -> Result<i32, TrapCode> {
    trunc_to_range(v, i32::MIN as f64, (i32::MAX as f64) + 1.0).map(|v| v as i32)
}

pub fn trunc_f64_to_u32(v: f64) -> Result<u32, TrapCode> {
    trunc_to_range(v, 0.0, (u32::MAX as f64) + 1.0).map(|v| v as u32)
}

pub fn trunc_f32_to_i64(v: f32) -> Result<i64, TrapCode> {
    trunc_to_range_i64(v as f64, i64::MIN as f64, 9223372036854775808.0)
}

pub fn trunc_f32_to_u64(v: f32) -> Result<u64, TrapCode> {
    trunc_to_range_u64(v as f64, 18446744073709551616.0)
}

pub fn trunc_f64_to_i64(v: f64) -> Result<i64, TrapCode> {
    trunc_to_range_i64(v, i64::MIN as f64, 9223372036854775808.0)
}

pub fn trunc_f64_to_u64(v: f64) -> Result<u64, TrapCode> {
    trunc_to_range_u64(v, 18446744073709551616.0)
}

fn trunc_to_range(v: f64, min_inclusive: f64, max_exclusive: f64) -> Result<f64, TrapCode> {
    if v.is_nan() {
        return Err(TrapCode::BadConversionToInteger);
    }
    let truncated = libm::trunc(v);
    if truncated < min_inclusive || truncated >= max_exclusive {
        return Err(TrapCode::BadConversionToInteger);
    }
    Ok(truncated)
}

fn trunc_to_range_i64(v: f64, min_inclusive: f64, max_exclusive_mag: f64) -> Result<i64, TrapCode> {
    if v.is_nan() {
        return Err(TrapCode::BadConversionToInteger);
    }
    let truncated = libm::trunc(v);
    if truncated < min_inclusive || truncated >= max_exclusive_mag {
        return Err(TrapCode::BadConversionToInteger);
    }
    Ok(truncated as i64)
}

fn trunc_to_range_u64(v: f64, max_exclusive_mag: f64) -> Result<u64, TrapCode> {
    if v.is_nan() {
        return Err(TrapCode::BadConversionToInteger);
    }
    let truncated = libm::trunc(v);
    if truncated < 0.0 || truncated >= max_exclusive_mag {
        return Err(TrapCode::BadConversionToInteger);
    }
    Ok(truncated as u64)
}

/// Saturating variant of the `trunc_*` conversions (the `0xFC` prefix opcodes):
/// `NaN` saturates to `0`, out-of-range magnitudes saturate to the nearest
/// representable bound instead of trapping.
pub fn trunc_sat_f32_to_i32(v: f32) -> i32 {
    trunc_sat(v as f64, i32::MIN as f64, i32::MAX as f64) as i32
}

pub fn trunc_sat_f32_to_u32(v: f32) -> u32 {
    trunc_sat(v as f64, 0.0, u32::MAX as f64) as u32
}

pub fn trunc_sat_f64_to_i32(v: f64) -> i32 {
    trunc_sat(v, i32::MIN as f64, i32::MAX as f64) as i32
}

pub fn trunc_sat_f64_to_u32(v: f64) -> u32 {
    trunc_sat(v, 0.0, u32::MAX as f64) as u32
}

pub fn trunc_sat_f32_to_i64(v: f32) -> i64 {
    trunc_sat(v as f64, i64::MIN as f64, i64::MAX as f64) as i64
}

pub fn trunc_sat_f32_to_u64(v: f32) -> u64 {
    trunc_sat(v as f64, 0.0, u64::MAX as f64) as u64
}

pub fn trunc_sat_f64_to_i64(v: f64) -> i64 {
    trunc_sat(v, i64::MIN as f64, i64::MAX as f64) as i64
}

pub fn trunc_sat_f64_to_u64(v: f64) -> u64 {
    trunc_sat(v, 0.0, u64::MAX as f64) as u64
}

fn trunc_sat(v: f64, min: f64, max: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    let truncated = libm::trunc(v);
    if truncated < min {
        min
    } else if truncated > max {
        max
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popcnt_matches_bit_count() {
        assert_eq!(popcnt32(0xF0F0_F0F0), 16);
        assert_eq!(popcnt64(u64::MAX), 64);
    }

    #[test]
    fn clz_of_zero_is_width() {
        assert_eq!(clz32(0), 32);
        assert_eq!(clz64(0), 64);
    }

    #[test]
    fn div_s32_traps_on_overflow_and_zero() {
        assert_eq!(div_s32(i32::MIN, -1), Err(TrapCode::IntegerOverflow));
        assert_eq!(div_s32(1, 0), Err(TrapCode::IntegerDivisionByZero));
        assert_eq!(div_s32(7, 2), Ok(3));
    }

    #[test]
    fn float_min_max_propagate_nan_and_prefer_negative_zero() {
        assert!(fmin32(f32::NAN, 1.0).is_nan());
        assert_eq!(fmin32(0.0, -0.0).to_bits(), (-0.0f32).to_bits());
        assert_eq!(fmax32(0.0, -0.0).to_bits(), (0.0f32).to_bits());
    }

    #[test]
    fn trunc_sat_saturates_instead_of_trapping() {
        assert_eq!(trunc_sat_f32_to_i32(f32::NAN), 0);
        assert_eq!(trunc_sat_f32_to_i32(1e20), i32::MAX);
        assert_eq!(trunc_sat_f32_to_i32(-1e20), i32::MIN);
    }

    #[test]
    fn trunc_traps_on_nan_and_out_of_range() {
        assert_eq!(trunc_f32_to_i32(f32::NAN), Err(TrapCode::BadConversionToInteger));
        assert_eq!(trunc_f32_to_i32(1e20), Err(TrapCode::BadConversionToInteger));
        assert_eq!(trunc_f32_to_i32(3.9), Ok(3));
    }
}
