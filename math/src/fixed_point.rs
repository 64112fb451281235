//! 16.16 fixed-point primitives. Every value the renderer and level loader
//! deal in is one of these, so all results are bit-exact across platforms.

/// A 16.16 signed fixed-point value, `fixed_t`
pub type Fixed = i32;

pub const FRACBITS: i32 = 16;
pub const FRACUNIT: Fixed = 1 << FRACBITS;

/// Convert whole map units to fixed point
#[inline]
pub const fn int_to_fixed(value: i32) -> Fixed {
    value << FRACBITS
}

/// Drop the fractional part, rounding toward negative infinity
#[inline]
pub const fn fixed_to_int(value: Fixed) -> i32 {
    value >> FRACBITS
}

/// `FixedMul`. The intermediate is 64 bits wide so no precision is lost
/// before the shift.
#[inline]
pub const fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    ((a as i64 * b as i64) >> FRACBITS) as Fixed
}

/// `FixedDiv`. If the quotient would not fit in 16.16 it saturates to
/// `i32::MIN` or `i32::MAX` according to the sign of the result.
#[inline]
pub const fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if (a.unsigned_abs() >> 14) >= b.unsigned_abs() {
        if (a ^ b) < 0 { i32::MIN } else { i32::MAX }
    } else {
        (((a as i64) << FRACBITS) / b as i64) as Fixed
    }
}

/// Integer length of the vector `(dx, dy)` where both are raw fixed values.
/// The result is in the same units as the inputs.
#[inline]
pub fn fixed_hypot(dx: Fixed, dy: Fixed) -> Fixed {
    let dx = dx.unsigned_abs() as u64;
    let dy = dy.unsigned_abs() as u64;
    (dx * dx + dy * dy).isqrt() as Fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_identity_and_half() {
        assert_eq!(fixed_mul(FRACUNIT, FRACUNIT), FRACUNIT);
        assert_eq!(fixed_mul(FRACUNIT * 3, FRACUNIT / 2), FRACUNIT * 3 / 2);
        assert_eq!(fixed_mul(-FRACUNIT * 2, FRACUNIT * 4), -FRACUNIT * 8);
    }

    #[test]
    fn div_regular() {
        assert_eq!(fixed_div(FRACUNIT * 6, FRACUNIT * 3), FRACUNIT * 2);
        assert_eq!(fixed_div(FRACUNIT, FRACUNIT * 4), FRACUNIT / 4);
        assert_eq!(fixed_div(-FRACUNIT * 6, FRACUNIT * 3), -FRACUNIT * 2);
    }

    #[test]
    fn div_saturates() {
        assert_eq!(fixed_div(FRACUNIT * 1000, 1), i32::MAX);
        assert_eq!(fixed_div(-FRACUNIT * 1000, 1), i32::MIN);
        assert_eq!(fixed_div(FRACUNIT, 0), i32::MAX);
        assert_eq!(fixed_div(i32::MIN, 2), i32::MIN);
    }

    #[test]
    fn hypot_is_exact_for_triples() {
        assert_eq!(fixed_hypot(3 * FRACUNIT, 4 * FRACUNIT), 5 * FRACUNIT);
        assert_eq!(fixed_hypot(-5, 12), 13);
        assert_eq!(fixed_hypot(0, 0), 0);
    }

    #[test]
    fn int_conversions() {
        assert_eq!(int_to_fixed(-3), -3 * FRACUNIT);
        assert_eq!(fixed_to_int(FRACUNIT * 7 + 100), 7);
        assert_eq!(fixed_to_int(-1), -1);
    }
}
