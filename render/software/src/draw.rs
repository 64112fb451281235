//! The column and span drawers, `r_draw`. The renderer fills in a
//! `DrawColumn` or `DrawSpan` and the `DrawStrategy` picked for the current
//! detail level writes it out.

use level::{Colourmap, FlatPic, TRANSPARENT};
use math::{FRACBITS, Fixed};
use render_trait::PixelBuffer;

use crate::planes::SwirlTable;

/// Top left of the view window within the buffer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DrawStrategy {
    /// One buffer pixel per view column
    #[default]
    High,
    /// Each view column covers two buffer pixels
    Low,
}

/// `dc_*` state for one vertical run
pub struct DrawColumn<'a> {
    pub source: &'a [usize],
    pub colourmap: &'a Colourmap,
    pub iscale: Fixed,
    pub texturemid: Fixed,
    pub centery: i32,
    pub x: i32,
    pub yl: i32,
    pub yh: i32,
}

impl<'a> DrawColumn<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: &'a [usize],
        colourmap: &'a Colourmap,
        iscale: Fixed,
        texturemid: Fixed,
        centery: i32,
        x: i32,
        yl: i32,
        yh: i32,
    ) -> Self {
        Self {
            source,
            colourmap,
            iscale,
            texturemid,
            centery,
            x,
            yl,
            yh,
        }
    }

    #[inline]
    fn start_frac(&self) -> Fixed {
        self.texturemid
            .wrapping_add((self.yl - self.centery).wrapping_mul(self.iscale))
    }
}

/// `ds_*` state for one horizontal run
pub struct DrawSpan<'a> {
    pub flat: &'a FlatPic,
    pub swirl: Option<&'a SwirlTable>,
    pub colourmap: &'a Colourmap,
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
}

impl DrawStrategy {
    pub fn for_detail(detailshift: i32) -> Self {
        if detailshift == 0 {
            DrawStrategy::High
        } else {
            DrawStrategy::Low
        }
    }

    #[inline]
    fn put(self, window: ViewWindow, x: i32, y: i32, colour: u8, pixels: &mut impl PixelBuffer) {
        let y = (window.y + y) as usize;
        match self {
            DrawStrategy::High => pixels.set_pixel((window.x + x) as usize, y, colour),
            DrawStrategy::Low => {
                let x = (window.x + (x << 1)) as usize;
                pixels.set_pixel(x, y, colour);
                pixels.set_pixel(x + 1, y, colour);
            }
        }
    }

    /// `R_DrawColumn`. The source tiles vertically, including textures that
    /// are not a power of two tall.
    pub fn draw_column(self, dc: &DrawColumn, window: ViewWindow, pixels: &mut impl PixelBuffer) {
        if dc.yh < dc.yl || dc.source.is_empty() {
            return;
        }
        let texheight = dc.source.len() as i32;
        let mut frac = dc.start_frac();
        for y in dc.yl..=dc.yh {
            let index = if texheight & (texheight - 1) == 0 {
                (frac >> FRACBITS) & (texheight - 1)
            } else {
                (frac >> FRACBITS).rem_euclid(texheight)
            };
            let texel = dc.source[index as usize];
            if texel != TRANSPARENT {
                self.put(window, dc.x, y, dc.colourmap[texel & 0xff], pixels);
            }
            frac = frac.wrapping_add(dc.iscale);
        }
    }

    /// Draw one post of a masked column. The source is only the post, so
    /// sampling is clamped to it rather than tiled.
    pub fn draw_post(self, dc: &DrawColumn, window: ViewWindow, pixels: &mut impl PixelBuffer) {
        if dc.yh < dc.yl || dc.source.is_empty() {
            return;
        }
        let last = dc.source.len() as i32 - 1;
        let mut frac = dc.start_frac();
        for y in dc.yl..=dc.yh {
            let index = (frac >> FRACBITS).clamp(0, last);
            let texel = dc.source[index as usize];
            if texel != TRANSPARENT {
                self.put(window, dc.x, y, dc.colourmap[texel & 0xff], pixels);
            }
            frac = frac.wrapping_add(dc.iscale);
        }
    }

    /// `R_DrawSpan`
    pub fn draw_span(self, ds: &DrawSpan, window: ViewWindow, pixels: &mut impl PixelBuffer) {
        let mut xfrac = ds.xfrac;
        let mut yfrac = ds.yfrac;
        for x in ds.x1..=ds.x2 {
            let mut u = ((xfrac >> FRACBITS) & 63) as usize;
            let mut v = ((yfrac >> FRACBITS) & 63) as usize;
            if let Some(swirl) = ds.swirl {
                (u, v) = swirl.sample(u, v);
            }
            let texel = ds.flat.data[u][v];
            self.put(window, x, ds.y, ds.colourmap[texel as usize], pixels);
            xfrac = xfrac.wrapping_add(ds.xstep);
            yfrac = yfrac.wrapping_add(ds.ystep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::FRACUNIT;
    use render_trait::Framebuffer;

    fn identity() -> Colourmap {
        let mut map = [0u8; 256];
        for (i, c) in map.iter_mut().enumerate() {
            *c = i as u8;
        }
        map
    }

    #[test]
    fn column_tiles_odd_heights() {
        let cmap = identity();
        let source = [1, 2, 3];
        let mut fb = Framebuffer::new(4, 8);
        let dc = DrawColumn::new(&source, &cmap, FRACUNIT, 0, 0, 1, 0, 6);
        DrawStrategy::High.draw_column(&dc, ViewWindow::default(), &mut fb);
        let col: Vec<u8> = (0..7).map(|y| fb.read_pixel(1, y)).collect();
        assert_eq!(col, vec![1, 2, 3, 1, 2, 3, 1]);
        assert_eq!(fb.read_pixel(1, 7), 0);
    }

    #[test]
    fn low_detail_doubles_columns() {
        let cmap = identity();
        let source = [9; 4];
        let mut fb = Framebuffer::new(8, 4);
        let dc = DrawColumn::new(&source, &cmap, FRACUNIT, 0, 0, 2, 0, 3);
        DrawStrategy::Low.draw_column(&dc, ViewWindow { x: 1, y: 0 }, &mut fb);
        assert_eq!(fb.read_pixel(5, 2), 9);
        assert_eq!(fb.read_pixel(6, 2), 9);
        assert_eq!(fb.read_pixel(4, 2), 0);
        assert_eq!(fb.read_pixel(7, 2), 0);
    }

    #[test]
    fn post_sampling_clamps() {
        let cmap = identity();
        let source = [4, 5];
        let mut fb = Framebuffer::new(2, 4);
        // Starts one texel before the post
        let dc = DrawColumn::new(&source, &cmap, FRACUNIT, -FRACUNIT, 0, 0, 0, 3);
        DrawStrategy::High.draw_post(&dc, ViewWindow::default(), &mut fb);
        let col: Vec<u8> = (0..4).map(|y| fb.read_pixel(0, y)).collect();
        assert_eq!(col, vec![4, 4, 5, 5]);
    }
}
