//! Vertical clipping for windows/portals, used in the segs render part, and
//! the `openings` store that keeps copies of it for sprite clipping.

use crate::defs::GrowthNotice;

pub struct PortalClip {
    /// Clip values are the solid pixel bounding the range.
    ///  floorclip starts out viewheight
    ///  ceilingclip starts out -1
    pub floorclip: Vec<i32>,
    pub ceilingclip: Vec<i32>,
    view_height: i32,
}

impl PortalClip {
    pub fn new(view_width: usize, view_height: i32) -> Self {
        PortalClip {
            floorclip: vec![view_height; view_width],
            ceilingclip: vec![-1; view_width],
            view_height,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.floorclip.fill(self.view_height);
        self.ceilingclip.fill(-1);
    }
}

/// An offset in to `Openings`, already adjusted so indexing with a screen
/// column lands on that column's entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHandle(pub usize);

impl OpeningHandle {
    #[inline]
    pub fn at(self, x: i32) -> usize {
        self.0 + x as usize
    }
}

/// The `openings` array. The first two rows hold `screenheightarray` and
/// `negonearray` and are never reset, so every handle handed out for a column
/// range is at least `view_width` past zero.
pub struct Openings {
    data: Vec<i32>,
    last: usize,
    view_width: usize,
    notice: GrowthNotice,
}

impl Openings {
    pub fn new(view_width: usize, view_height: i32) -> Self {
        let size = (view_width * 64).max(view_width * 2 + 1);
        let mut data = vec![0; size];
        data[..view_width].fill(view_height);
        data[view_width..view_width * 2].fill(-1);
        Self {
            data,
            last: view_width * 2,
            view_width,
            notice: GrowthNotice::new("R_StoreWallRange: openings", size),
        }
    }

    pub fn clear(&mut self) {
        self.last = self.view_width * 2;
    }

    /// Every entry is the view height
    pub fn screenheight(&self) -> OpeningHandle {
        OpeningHandle(0)
    }

    /// Every entry is -1
    pub fn negone(&self) -> OpeningHandle {
        OpeningHandle(self.view_width)
    }

    /// Hand out `count` entries for the columns starting at `start`
    pub fn reserve(&mut self, start: i32, count: usize) -> OpeningHandle {
        if self.last + count > self.data.len() {
            let old = self.data.len();
            let new = (old * 2).max(self.last + count);
            self.data.resize(new, 0);
            self.notice.grew(old, new);
        }
        let base = self.last;
        self.last += count;
        OpeningHandle(base - start as usize)
    }

    /// Copy a slice of a clip array for the columns starting at `start`
    pub fn copy_in(&mut self, start: i32, clip: &[i32]) -> OpeningHandle {
        let handle = self.reserve(start, clip.len());
        let base = handle.at(start);
        self.data[base..base + clip.len()].copy_from_slice(clip);
        handle
    }

    #[inline]
    pub fn get(&self, handle: OpeningHandle, x: i32) -> i32 {
        self.data[handle.at(x)]
    }

    #[inline]
    pub fn set(&mut self, handle: OpeningHandle, x: i32, value: i32) {
        self.data[handle.at(x)] = value;
    }

    pub fn used(&self) -> usize {
        self.last
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn grew(&self) -> bool {
        self.notice.logged()
    }
}

#[cfg(test)]
mod tests {
    use super::{Openings, PortalClip};

    #[test]
    fn default_portal_clip() {
        let mut rd = PortalClip::new(640, 400);
        rd.floorclip[3] = 7;
        rd.ceilingclip[3] = 7;
        rd.clear();
        assert_eq!(rd.floorclip[3], 400);
        assert_eq!(rd.ceilingclip[3], -1);
    }

    #[test]
    fn reserved_rows_survive_clear() {
        let mut openings = Openings::new(8, 100);
        let h = openings.copy_in(2, &[5, 6, 7]);
        assert_eq!(openings.get(h, 2), 5);
        assert_eq!(openings.get(h, 4), 7);
        openings.clear();
        assert_eq!(openings.used(), 16);
        assert_eq!(openings.get(openings.screenheight(), 7), 100);
        assert_eq!(openings.get(openings.negone(), 0), -1);
    }

    #[test]
    fn growth_keeps_contents() {
        let mut openings = Openings::new(4, 10);
        let first = openings.copy_in(0, &[1, 2, 3, 4]);
        assert!(!openings.grew());
        let start_cap = openings.capacity();

        let big = openings.reserve(0, start_cap);
        assert!(openings.capacity() >= start_cap * 2);
        assert!(openings.grew());
        openings.set(big, 3, 42);
        assert_eq!(openings.get(big, 3), 42);
        assert_eq!(openings.get(first, 3), 4);
        assert_eq!(openings.get(openings.screenheight(), 1), 10);
    }
}
