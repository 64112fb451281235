use lazy_static::lazy_static;
use std::f64::consts::PI;

use crate::{FINEANGLES, Fixed, FRACUNIT, SLOPERANGE};

lazy_static! {
    /// `finesine` with an extra quarter turn appended so that `finecosine`
    /// can be a plain offset into it.
    static ref FINESINE: Vec<Fixed> = (0..5 * FINEANGLES / 4)
        .map(|i| {
            let a = (i as f64 + 0.5) * 2.0 * PI / FINEANGLES as f64;
            (a.sin() * FRACUNIT as f64) as Fixed
        })
        .collect();

    /// Covers -90 to +90 degrees, centred on index `FINEANGLES / 4`
    static ref FINETANGENT: Vec<Fixed> = (0..FINEANGLES / 2)
        .map(|i| {
            let a = (i as f64 - (FINEANGLES / 4) as f64 + 0.5) * 2.0 * PI / FINEANGLES as f64;
            (a.tan() * FRACUNIT as f64) as Fixed
        })
        .collect();

    /// `atan(i / SLOPERANGE)` as a BAM angle, 0 to 45 degrees inclusive
    static ref TANTOANGLE: Vec<u32> = (0..=SLOPERANGE)
        .map(|i| {
            let a = (i as f64 / SLOPERANGE as f64).atan();
            (a / (2.0 * PI) * 4_294_967_296.0).round() as u32
        })
        .collect();
}

/// `finesine[index]`, index range `0..10240`
#[inline]
pub fn finesine(index: usize) -> Fixed {
    FINESINE[index]
}

/// `finecosine[index]`, index range `0..8192`
#[inline]
pub fn finecosine(index: usize) -> Fixed {
    FINESINE[index + FINEANGLES / 4]
}

/// `finetangent[index]`, index range `0..4096`
#[inline]
pub fn finetangent(index: usize) -> Fixed {
    FINETANGENT[index]
}

#[inline]
pub fn tantoangle(index: usize) -> u32 {
    TANTOANGLE[index]
}

/// Forces table generation so the first frame doesn't pay for it
pub fn init_tables() {
    lazy_static::initialize(&FINESINE);
    lazy_static::initialize(&FINETANGENT);
    lazy_static::initialize(&TANTOANGLE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ANG45, FINEMASK};

    #[test]
    fn sine_quadrants() {
        assert!(finesine(0) > 0 && finesine(0) < 64);
        assert!(finesine(FINEANGLES / 4 - 1) > FRACUNIT - 8);
        assert!((finesine(FINEANGLES / 2 - 1) - finesine(0)).abs() <= 1);
        for i in 0..FINEANGLES / 2 {
            assert!((finesine(i) + finesine(i + FINEANGLES / 2)).abs() <= 1);
        }
    }

    #[test]
    fn cosine_is_offset_sine() {
        for i in 0..FINEANGLES {
            let wrapped = finesine((i + FINEANGLES / 4) & FINEMASK);
            assert!((finecosine(i) - wrapped).abs() <= 1);
        }
    }

    #[test]
    fn tangent_is_odd_symmetric() {
        let n = FINEANGLES / 2;
        for i in 0..n {
            assert!((finetangent(i) + finetangent(n - 1 - i)).abs() <= 1);
        }
        assert!(finetangent(n / 2) > 0);
        assert!(finetangent(n / 2 - 1) < 0);
    }

    #[test]
    fn tantoangle_range() {
        assert_eq!(tantoangle(0), 0);
        assert_eq!(tantoangle(SLOPERANGE), ANG45);
        for i in 1..=SLOPERANGE {
            assert!(tantoangle(i) > tantoangle(i - 1));
        }
    }
}
