use level::{FlatPic, PicData};
#[cfg(feature = "hprof")]
use coarse_prof::profile;
use math::{FINEMASK, FRACBITS, FRACUNIT, Fixed, finesine, fixed_mul};
use render_trait::PixelBuffer;

use crate::SoftwareRenderer;
use crate::defs::{GrowthNotice, MAXVISPLANES, PLANE_UNSET, Visplane};
use crate::draw::{DrawColumn, DrawSpan};
use crate::view::{LIGHTLEVELS, LIGHTSEGSHIFT, LIGHTZSHIFT, MAXLIGHTZ, ViewState, ViewTables};

/// Sky columns are picked from the view angle at this shift
const ANGLETOSKYSHIFT: u32 = 22;
const SKYTEXTUREMID: Fixed = 100 * FRACUNIT;

/// Per row cache of plane distances, valid while the plane height matches
pub(crate) struct PlaneRows {
    height: Vec<Fixed>,
    distance: Vec<Fixed>,
    xstep: Vec<Fixed>,
    ystep: Vec<Fixed>,
}

impl PlaneRows {
    fn new(view_height: usize) -> Self {
        Self {
            height: vec![0; view_height],
            distance: vec![0; view_height],
            xstep: vec![0; view_height],
            ystep: vec![0; view_height],
        }
    }

    fn clear(&mut self) {
        self.height.fill(0);
        self.distance.fill(0);
        self.xstep.fill(0);
        self.ystep.fill(0);
    }
}

pub(crate) struct VisPlaneRender {
    // Here comes the obnoxious "visplane".
    pub visplanes: Vec<Visplane>,
    pub lastvisplane: usize,
    /// Index of current visplane in `self.visplanes` for floor
    pub floorplane: Option<usize>,
    /// Index of current visplane in `self.visplanes` for ceiling
    pub ceilingplane: Option<usize>,

    rows: PlaneRows,
    /// spanstart holds the start of a plane span
    spanstart: Vec<i32>,

    view_width: usize,
    notice: GrowthNotice,
}

impl VisPlaneRender {
    pub fn new(view_width: usize, view_height: usize) -> Self {
        VisPlaneRender {
            visplanes: vec![Visplane::new(view_width); MAXVISPLANES],
            lastvisplane: 0,
            floorplane: None,
            ceilingplane: None,
            rows: PlaneRows::new(view_height),
            spanstart: vec![0; view_height],
            view_width,
            notice: GrowthNotice::new("R_FindPlane: visplanes", MAXVISPLANES),
        }
    }

    /// R_ClearPlanes
    /// At begining of frame.
    pub fn clear_planes(&mut self) {
        self.lastvisplane = 0;
        self.floorplane = None;
        self.ceilingplane = None;
        self.rows.clear();
    }

    fn raise_visplanes(&mut self) {
        if self.lastvisplane == self.visplanes.len() {
            let old = self.visplanes.len();
            let new = old * 2;
            self.visplanes.resize(new, Visplane::new(self.view_width));
            self.notice.grew(old, new);
        }
    }

    fn new_plane(&mut self, height: Fixed, picnum: usize, lightlevel: i32, minx: i32, maxx: i32) -> usize {
        self.raise_visplanes();
        let index = self.lastvisplane;
        self.lastvisplane += 1;

        let plane = &mut self.visplanes[index];
        plane.height = height;
        plane.picnum = picnum;
        plane.lightlevel = lightlevel;
        plane.minx = minx;
        plane.maxx = maxx;
        plane.clear_columns();
        index
    }

    /// Find a plane matching height, picnum, light level. Otherwise return a
    /// new plane. Sky planes all merge, whatever their height or light.
    pub fn find_plane(&mut self, height: Fixed, picnum: usize, lightlevel: i32, skynum: usize) -> usize {
        let (height, lightlevel) = if picnum == skynum {
            (0, 0)
        } else {
            (height, lightlevel)
        };

        if let Some(index) = self.visplanes[..self.lastvisplane]
            .iter()
            .position(|p| p.height == height && p.picnum == picnum && p.lightlevel == lightlevel)
        {
            return index;
        }

        self.new_plane(height, picnum, lightlevel, self.view_width as i32, -1)
    }

    /// Check if this plane can take `start..=stop`, otherwise split off a new
    /// plane with the same properties.
    ///
    /// A floor and ceiling that share one plane (both sky) are always split
    /// when the ceiling is being marked, or the floor columns get overwritten.
    pub fn check_plane(&mut self, index: usize, start: i32, stop: i32, markceiling: bool) -> usize {
        let plane = &mut self.visplanes[index];

        let (intrl, unionl) = if start < plane.minx {
            (plane.minx, start)
        } else {
            (start, plane.minx)
        };

        let (intrh, unionh) = if stop > plane.maxx {
            (plane.maxx, stop)
        } else {
            (stop, plane.maxx)
        };

        let mut x = intrl;
        while x <= intrh && plane.top(x) == PLANE_UNSET {
            x += 1;
        }

        let shared = markceiling
            && self.floorplane == Some(index)
            && self.floorplane == self.ceilingplane;
        if x > intrh && !shared {
            // Use the same plane
            plane.minx = unionl;
            plane.maxx = unionh;
            return index;
        }

        let (height, picnum, lightlevel) = (plane.height, plane.picnum, plane.lightlevel);
        self.new_plane(height, picnum, lightlevel, start, stop)
    }
}

/// Everything `R_MapPlane` reads that stays fixed for one visplane
struct PlaneSpans<'a> {
    tables: &'a ViewTables,
    view: &'a ViewState,
    pic_data: &'a PicData,
    flat: &'a FlatPic,
    swirl: Option<&'a SwirlTable>,
    zlight: &'a [usize; MAXLIGHTZ],
    planeheight: Fixed,
}

impl PlaneSpans<'_> {
    /// R_MapPlane
    ///
    /// Draw one row of the plane from `x1` to `x2`. The horizon row has no
    /// distance and is skipped.
    fn map_plane(&self, rows: &mut PlaneRows, y: i32, x1: i32, x2: i32, pixels: &mut impl PixelBuffer) {
        if let Some(ds) = self.row_span(rows, y, x1, x2) {
            self.tables.strategy.draw_span(&ds, self.tables.window, pixels);
        }
    }

    /// Texture position and stepping for a row span. Steps are per row and
    /// positions are measured from the centre column, so spans of the same
    /// flat and height line up wherever they start.
    fn row_span(&self, rows: &mut PlaneRows, y: i32, x1: i32, x2: i32) -> Option<DrawSpan<'_>> {
        let tables = self.tables;
        let view = self.view;
        #[cfg(any(feature = "safety_check", debug_assertions))]
        if x2 < x1 || x1 < 0 || x2 >= tables.viewwidth || y < 0 || y >= tables.viewheight {
            panic!("R_MapPlane: {}, {} at {}", x1, x2, y);
        }
        let dy = (view.centery - y).abs();
        if dy == 0 {
            return None;
        }

        let row = y as usize;
        let (distance, xstep, ystep) = if self.planeheight != rows.height[row] {
            let distance = fixed_mul(self.planeheight, tables.yslope(view.yslope_bucket)[row]);
            let xstep = fixed_mul(view.sin, self.planeheight) / dy;
            let ystep = fixed_mul(view.cos, self.planeheight) / dy;
            rows.height[row] = self.planeheight;
            rows.distance[row] = distance;
            rows.xstep[row] = xstep;
            rows.ystep[row] = ystep;
            (distance, xstep, ystep)
        } else {
            (rows.distance[row], rows.xstep[row], rows.ystep[row])
        };

        let dx = x1 - tables.centerx;
        let xfrac = view
            .x
            .wrapping_add(fixed_mul(view.cos, distance))
            .wrapping_add(dx.wrapping_mul(xstep));
        let yfrac = view
            .y
            .wrapping_neg()
            .wrapping_sub(fixed_mul(view.sin, distance))
            .wrapping_add(dx.wrapping_mul(ystep));

        let colourmap = match view.fixedcolormap {
            Some(fixed) => fixed,
            None => self.zlight[((distance >> LIGHTZSHIFT) as u32 as usize).min(MAXLIGHTZ - 1)],
        };

        Some(DrawSpan {
            flat: self.flat,
            swirl: self.swirl,
            colourmap: self.pic_data.colourmap(colourmap),
            xfrac,
            yfrac,
            xstep,
            ystep,
            y,
            x1,
            x2,
        })
    }

    /// R_MakeSpans
    ///
    /// Close the spans that end at column `x - 1` and open the ones that
    /// start at `x`. Empty columns have a top of `PLANE_UNSET`.
    #[allow(clippy::too_many_arguments)]
    fn make_spans(
        &self,
        rows: &mut PlaneRows,
        spanstart: &mut [i32],
        x: i32,
        mut t1: u32,
        mut b1: u32,
        mut t2: u32,
        mut b2: u32,
        pixels: &mut impl PixelBuffer,
    ) {
        while t1 < t2 && t1 <= b1 {
            self.map_plane(rows, t1 as i32, spanstart[t1 as usize], x - 1, pixels);
            t1 += 1;
        }
        while b1 > b2 && b1 >= t1 {
            self.map_plane(rows, b1 as i32, spanstart[b1 as usize], x - 1, pixels);
            b1 -= 1;
        }

        while t2 < t1 && t2 <= b2 {
            spanstart[t2 as usize] = x;
            t2 += 1;
        }
        while b2 > b1 && b2 >= t2 {
            spanstart[b2 as usize] = x;
            b2 -= 1;
        }
    }
}

impl SoftwareRenderer {
    /// R_DrawPlanes
    ///
    /// At the end of each frame.
    pub(crate) fn draw_planes(&mut self, pic_data: &PicData, pixels: &mut impl PixelBuffer) {
        #[cfg(feature = "hprof")]
        profile!("draw_planes");
        let tables = &self.tables;
        let view = &self.view;
        let swirl = self.config.swirling_flats.then_some(&self.swirl);
        let VisPlaneRender {
            visplanes,
            lastvisplane,
            rows,
            spanstart,
            ..
        } = &mut self.scratch.planes;
        let skynum = pic_data.sky_num();

        for plane in visplanes[..*lastvisplane].iter_mut() {
            if plane.minx > plane.maxx {
                continue;
            }

            if plane.picnum == skynum {
                let Some(sky) = pic_data.sky_pic() else {
                    continue;
                };
                let colourmap = match view.fixedcolormap {
                    Some(fixed) if self.config.invul_sky => fixed,
                    _ => 0,
                };
                let colourmap = pic_data.colourmap(colourmap);
                let iscale = tables.sky_iscale();
                for x in plane.minx..=plane.maxx {
                    let (top, bottom) = (plane.top(x), plane.bottom(x));
                    if top > bottom {
                        continue;
                    }
                    let angle = view.angle.wrapping_add(tables.xtoviewangle[x as usize]) >> ANGLETOSKYSHIFT;
                    let dc = DrawColumn::new(
                        pic_data.wall_pic_column(sky, angle as i32),
                        colourmap,
                        iscale,
                        SKYTEXTUREMID,
                        view.centery,
                        x,
                        top as i32,
                        bottom as i32,
                    );
                    tables.strategy.draw_column(&dc, tables.window, pixels);
                }
                continue;
            }

            let flat = pic_data.get_flat(plane.picnum);
            let light = ((plane.lightlevel >> LIGHTSEGSHIFT) + view.extralight)
                .clamp(0, LIGHTLEVELS as i32 - 1) as usize;
            let spans = PlaneSpans {
                tables,
                view,
                pic_data,
                flat,
                swirl: swirl.filter(|_| flat.swirl),
                zlight: &tables.zlight[light],
                planeheight: plane.height.wrapping_sub(view.z).wrapping_abs(),
            };

            plane.seal_edges();
            for x in plane.minx..=plane.maxx + 1 {
                spans.make_spans(
                    rows,
                    spanstart,
                    x,
                    plane.top(x - 1),
                    plane.bottom(x - 1),
                    plane.top(x),
                    plane.bottom(x),
                    pixels,
                );
            }
        }
    }
}

const SWIRL_SPEED: usize = 40;
const SWIRL_AMP: Fixed = 2;
const SWIRL_FACTOR: usize = 8192 / 64;
const SWIRL_FACTOR2: usize = 8192 / 32;

/// Texel offsets for warping liquid flats, rebuilt once per game tic
pub struct SwirlTable {
    tic: Option<u32>,
    offsets: Vec<(u8, u8)>,
}

impl Default for SwirlTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SwirlTable {
    pub fn new() -> Self {
        Self {
            tic: None,
            offsets: (0..64 * 64).map(|i| ((i & 63) as u8, (i >> 6) as u8)).collect(),
        }
    }

    /// Rebuild for `leveltime` if the game has ticked since the last call.
    /// Returns whether the table changed.
    pub fn update(&mut self, leveltime: u32, gametic: u32) -> bool {
        if self.tic == Some(gametic) {
            return false;
        }
        self.tic = Some(gametic);

        let t = leveltime as usize;
        let wave = |phase: usize| (finesine(phase & FINEMASK) * SWIRL_AMP) >> FRACBITS;
        for y in 0..64 {
            for x in 0..64 {
                let x1 = x as i32
                    + 128
                    + wave(y * SWIRL_FACTOR + t * SWIRL_SPEED * 5 + 900)
                    + wave(x * SWIRL_FACTOR2 + t * SWIRL_SPEED * 4 + 300);
                let y1 = y as i32
                    + 128
                    + wave(x * SWIRL_FACTOR + t * SWIRL_SPEED * 3 + 700)
                    + wave(y * SWIRL_FACTOR2 + t * SWIRL_SPEED * 4 + 1200);
                self.offsets[(y << 6) + x] = ((x1 & 63) as u8, (y1 & 63) as u8);
            }
        }
        true
    }

    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> (usize, usize) {
        let (x1, y1) = self.offsets[(y << 6) + x];
        (x1 as usize, y1 as usize)
    }
}
