use std::fmt::Debug;

use log::info;
use math::Fixed;

use crate::portals::OpeningHandle;

pub const SIL_NONE: i32 = 0;
pub const SIL_BOTTOM: i32 = 1;
pub const SIL_TOP: i32 = 2;
pub const SIL_BOTH: i32 = 3;

pub const MAXDRAWSEGS: usize = 256;
pub const MAXVISPLANES: usize = 128;

/// Unset column in `Visplane::top`
pub const PLANE_UNSET: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub struct DrawSeg {
    /// Index in to `MapData::segments`
    pub curline: usize,
    pub x1: i32,
    pub x2: i32,

    pub scale1: Fixed,
    pub scale2: Fixed,
    pub scalestep: Fixed,

    /// 0=none, 1=bottom, 2=top, 3=both
    pub silhouette: i32,

    /// do not clip sprites above this
    pub bsilheight: Fixed,

    /// do not clip sprites below this
    pub tsilheight: Fixed,

    /// Offsets in to `openings`, adjusted so `[x1]` is the first value
    pub sprtopclip: Option<OpeningHandle>,
    pub sprbottomclip: Option<OpeningHandle>,
    pub maskedtexturecol: Option<OpeningHandle>,
}

impl DrawSeg {
    pub fn new(curline: usize) -> Self {
        DrawSeg {
            curline,
            x1: 0,
            x2: 0,
            scale1: 0,
            scale2: 0,
            scalestep: 0,
            silhouette: SIL_NONE,
            bsilheight: 0,
            tsilheight: 0,
            sprtopclip: None,
            sprbottomclip: None,
            maskedtexturecol: None,
        }
    }
}

/// The range of columns on the screen clipped against
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClipRange {
    /// Leftmost starting pixel/column
    pub first: i32,
    /// Rightmost ending pixel/column
    pub last: i32,
}

/// Now what is a visplane, anyway?
///
/// `top` and `bottom` carry one padding column on each side, so column `x` is
/// stored at `x + 1`.
#[derive(Clone)]
pub struct Visplane {
    pub height: Fixed,
    pub picnum: usize,
    pub lightlevel: i32,
    pub minx: i32,
    pub maxx: i32,
    pub top: Vec<u32>,
    pub bottom: Vec<u32>,
}

impl Debug for Visplane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visplane")
            .field("height", &self.height)
            .field("picnum", &self.picnum)
            .field("lightlevel", &self.lightlevel)
            .field("minx", &self.minx)
            .field("maxx", &self.maxx)
            .finish_non_exhaustive()
    }
}

impl Visplane {
    pub fn new(view_width: usize) -> Self {
        Visplane {
            height: 0,
            picnum: 0,
            lightlevel: 0,
            minx: 0,
            maxx: -1,
            top: vec![PLANE_UNSET; view_width + 2],
            bottom: vec![0; view_width + 2],
        }
    }

    #[inline]
    pub fn top(&self, x: i32) -> u32 {
        self.top[(x + 1) as usize]
    }

    #[inline]
    pub fn bottom(&self, x: i32) -> u32 {
        self.bottom[(x + 1) as usize]
    }

    #[inline]
    pub fn set_column(&mut self, x: i32, top: i32, bottom: i32) {
        self.top[(x + 1) as usize] = top as u32;
        self.bottom[(x + 1) as usize] = bottom as u32;
    }

    pub fn clear_columns(&mut self) {
        self.top.fill(PLANE_UNSET);
    }

    /// Leave the columns either side of `minx..=maxx` empty so every span
    /// gets closed off
    pub fn seal_edges(&mut self) {
        self.top[self.minx as usize] = PLANE_UNSET;
        self.top[(self.maxx + 2) as usize] = PLANE_UNSET;
    }
}

/// Reports the first time a growable store passes its starting size
#[derive(Debug, Clone, Copy)]
pub struct GrowthNotice {
    name: &'static str,
    limit: usize,
    logged: bool,
}

impl GrowthNotice {
    pub const fn new(name: &'static str, limit: usize) -> Self {
        Self {
            name,
            limit,
            logged: false,
        }
    }

    /// Called when a store of size `old` doubles
    pub fn grew(&mut self, old: usize, new: usize) {
        if !self.logged && old >= self.limit {
            info!(
                "{}: Hit the vanilla limit of {}, raised to {}",
                self.name, self.limit, new
            );
            self.logged = true;
        }
    }

    pub fn logged(&self) -> bool {
        self.logged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visplane_padding() {
        let mut pl = Visplane::new(4);
        assert_eq!(pl.top.len(), 6);
        pl.set_column(-1, 3, 7);
        pl.set_column(4, 1, 2);
        assert_eq!(pl.top(-1), 3);
        assert_eq!(pl.bottom(4), 2);
        pl.clear_columns();
        assert_eq!(pl.top(0), PLANE_UNSET);
    }

    #[test]
    fn growth_notice_once() {
        let mut notice = GrowthNotice::new("test", 8);
        notice.grew(4, 8);
        assert!(!notice.logged());
        notice.grew(8, 16);
        assert!(notice.logged());
        notice.grew(16, 32);
        assert!(notice.logged());
    }
}
