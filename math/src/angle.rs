//! Binary angle measurement. A full turn is the whole `u32` range so angle
//! arithmetic wraps for free.

use crate::tables::tantoangle;
use crate::{Fixed, fixed_div, finesine};

/// A BAM angle, `angle_t`
pub type Angle = u32;

pub const ANG45: Angle = 0x2000_0000;
pub const ANG90: Angle = 0x4000_0000;
pub const ANG180: Angle = 0x8000_0000;
pub const ANG270: Angle = 0xc000_0000;
pub const ANG1: Angle = ANG45 / 45;
pub const ANG_MAX: Angle = u32::MAX;

/// Size of the fine trig tables
pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
/// `angle >> ANGLETOFINESHIFT` gives a fine table index
pub const ANGLETOFINESHIFT: u32 = 19;

pub const SLOPERANGE: usize = 2048;
pub const SLOPEBITS: u32 = 11;
pub const DBITS: i32 = crate::FRACBITS - SLOPEBITS as i32;

/// Index into the fine tables for a BAM angle
#[inline]
pub const fn fine_index(angle: Angle) -> usize {
    (angle >> ANGLETOFINESHIFT) as usize
}

/// Degrees to BAM, used for thing angles stored in map data
#[inline]
pub const fn degrees_to_bam(degrees: i32) -> Angle {
    (degrees as i64 * ANG45 as i64 / 45) as Angle
}

/// `SlopeDiv`. Maps a ratio to an index into `tantoangle`.
#[inline]
pub const fn slope_div(num: u32, den: u32) -> usize {
    if den < 512 {
        return SLOPERANGE;
    }
    let ans = ((num as u64) << 3) / (den >> 8) as u64;
    if ans <= SLOPERANGE as u64 {
        ans as usize
    } else {
        SLOPERANGE
    }
}

/// `R_PointToAngle2` relative to the origin: the BAM angle of the vector
/// `(x, y)`, found by octant decomposition over `tantoangle`.
pub fn point_to_angle(mut x: Fixed, mut y: Fixed) -> Angle {
    if x == 0 && y == 0 {
        return 0;
    }
    if x >= 0 {
        if y >= 0 {
            if x > y {
                // octant 0
                tantoangle(slope_div(y as u32, x as u32))
            } else {
                // octant 1
                (ANG90 - 1).wrapping_sub(tantoangle(slope_div(x as u32, y as u32)))
            }
        } else {
            y = y.wrapping_neg();
            if x > y {
                // octant 8
                tantoangle(slope_div(y as u32, x as u32)).wrapping_neg()
            } else {
                // octant 7
                ANG270.wrapping_add(tantoangle(slope_div(x as u32, y as u32)))
            }
        }
    } else {
        x = x.wrapping_neg();
        if y >= 0 {
            if x > y {
                // octant 3
                (ANG180 - 1).wrapping_sub(tantoangle(slope_div(y as u32, x as u32)))
            } else {
                // octant 2
                ANG90.wrapping_add(tantoangle(slope_div(x as u32, y as u32)))
            }
        } else {
            y = y.wrapping_neg();
            if x > y {
                // octant 4
                ANG180.wrapping_add(tantoangle(slope_div(y as u32, x as u32)))
            } else {
                // octant 5
                (ANG270 - 1).wrapping_sub(tantoangle(slope_div(x as u32, y as u32)))
            }
        }
    }
}

/// `R_PointToDist` relative to the origin
pub fn point_to_dist(x: Fixed, y: Fixed) -> Fixed {
    let mut dx = x.wrapping_abs();
    let mut dy = y.wrapping_abs();
    if dy > dx {
        std::mem::swap(&mut dx, &mut dy);
    }
    if dx == 0 {
        return 0;
    }
    let angle = (tantoangle((fixed_div(dy, dx) >> crate::DBITS) as usize) + ANG90)
        >> ANGLETOFINESHIFT;
    fixed_div(dx, finesine(angle as usize))
}

/// Interpolate from `prev` to `cur` by `frac` (0 to `FRACUNIT`), always
/// through the shorter of the two arcs.
#[inline]
pub fn lerp_angle(prev: Angle, cur: Angle, frac: Fixed) -> Angle {
    let delta = cur.wrapping_sub(prev) as i32;
    prev.wrapping_add(crate::fixed_mul(delta, frac) as Angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FRACUNIT;

    fn near(a: Angle, b: Angle) -> bool {
        (a.wrapping_sub(b) as i32).unsigned_abs() < ANG1
    }

    #[test]
    fn cardinal_angles() {
        assert_eq!(point_to_angle(FRACUNIT, 0), 0);
        assert!(near(point_to_angle(0, FRACUNIT), ANG90));
        assert!(near(point_to_angle(-FRACUNIT, 0), ANG180));
        assert!(near(point_to_angle(0, -FRACUNIT), ANG270));
    }

    #[test]
    fn diagonal_angles() {
        assert!(near(point_to_angle(FRACUNIT, FRACUNIT), ANG45));
        assert!(near(point_to_angle(-FRACUNIT, FRACUNIT), ANG90 + ANG45));
        assert!(near(point_to_angle(-FRACUNIT, -FRACUNIT), ANG180 + ANG45));
        assert!(near(point_to_angle(FRACUNIT, -FRACUNIT), ANG270 + ANG45));
    }

    #[test]
    fn distance() {
        let d = point_to_dist(300 * FRACUNIT, 400 * FRACUNIT);
        assert!((d - 500 * FRACUNIT).abs() < FRACUNIT);
        assert_eq!(point_to_dist(0, 0), 0);
    }

    #[test]
    fn slope_div_clamps() {
        assert_eq!(slope_div(1, 100), SLOPERANGE);
        assert_eq!(slope_div(FRACUNIT as u32, FRACUNIT as u32), SLOPERANGE);
        assert_eq!(slope_div(FRACUNIT as u32, 2 * FRACUNIT as u32), SLOPERANGE / 2);
    }

    #[test]
    fn lerp_takes_short_arc() {
        let prev = ANG_MAX - ANG1 * 10;
        let cur = ANG1 * 10;
        let mid = lerp_angle(prev, cur, FRACUNIT / 2);
        // Halfway across the wrap is ~0, not ~180
        assert!(near(mid, 0));
        assert_eq!(lerp_angle(ANG90, ANG180, 0), ANG90);
    }

    #[test]
    fn degree_conversion() {
        assert_eq!(degrees_to_bam(90), ANG90);
        assert_eq!(degrees_to_bam(180), ANG180);
        assert_eq!(degrees_to_bam(45), ANG45);
    }
}
