use level::{LineDefFlags, MapData, PicData, Vertex};
#[cfg(feature = "hprof")]
use coarse_prof::profile;
use math::{
    ANG90, ANGLETOFINESHIFT, Angle, FINEANGLES, FRACBITS, FRACUNIT, Fixed, finesine, finetangent,
    fixed_div, fixed_mul,
};
use render_trait::PixelBuffer;

use crate::defs::{DrawSeg, SIL_BOTH, SIL_BOTTOM, SIL_NONE, SIL_TOP};
use crate::draw::DrawColumn;
use crate::portals::OpeningHandle;
use crate::view::{LIGHTLEVELS, LIGHTSEGSHIFT};
use crate::{SoftwareRenderer, to_row};

/// All of the state in this struct is unique to the seg being rendered, it is
/// set up by `store_wall_range` and stepped by `render_seg_loop`.
#[derive(Debug, Default)]
pub(crate) struct SegRender {
    /// `curline`, index in to `MapData::segments`
    pub curline: usize,
    /// Sector of the subsector being drawn
    pub frontsector: usize,
    /// Angle to the start vertex, before clipping to the view
    pub rw_angle1: Angle,

    /// True if any of the segs textures might be visible.
    segtextured: bool,
    /// False if the back side is the same plane.
    pub markfloor: bool,
    pub markceiling: bool,
    maskedtexture: bool,
    maskedtexturecol: Option<OpeningHandle>,
    toptexture: Option<usize>,
    bottomtexture: Option<usize>,
    midtexture: Option<usize>,

    rw_normalangle: Angle,
    // regular wall
    rw_x: i32,
    rw_stopx: i32,
    rw_centerangle: Angle,
    rw_offset: Fixed,
    rw_distance: Fixed,
    rw_scale: Fixed,
    rw_scalestep: Fixed,
    rw_midtexturemid: Fixed,
    rw_toptexturemid: Fixed,
    rw_bottomtexturemid: Fixed,

    // These are in `heightunit` fractions of a row
    pixhigh: i64,
    pixlow: i64,
    pixhighstep: Fixed,
    pixlowstep: Fixed,
    topfrac: i64,
    topstep: Fixed,
    bottomfrac: i64,
    bottomstep: Fixed,

    /// Row of `scalelight` for this wall
    walllights: usize,
}

/// Height precision for the sector being drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WiggleScale {
    pub max_rwscale: Fixed,
    pub heightbits: i32,
    pub heightunit: i32,
    pub invhgtbits: i32,
}

impl WiggleScale {
    fn from_index(index: usize) -> Self {
        let (clamp, heightbits) = SCALE_VALUES[index.min(SCALE_VALUES.len() - 1)];
        Self {
            max_rwscale: clamp * FRACUNIT,
            heightbits,
            heightunit: 1 << heightbits,
            invhgtbits: FRACBITS - heightbits,
        }
    }
}

/// Max scale in whole units, and height bits, by sector height class
const SCALE_VALUES: [(i32, i32); 8] = [
    (2048, 12),
    (1024, 12),
    (1024, 11),
    (512, 11),
    (512, 10),
    (256, 10),
    (256, 9),
    (128, 9),
];

#[derive(Debug, Default, Clone, Copy)]
struct WiggleEntry {
    cachedheight: i32,
    scaleindex: usize,
}

/// `R_FixWiggle`. Tall sectors trade height precision for headroom so walls
/// neither bend nor overflow. The class is kept per sector and only worked
/// out again when that sector's height changes.
#[derive(Debug)]
pub(crate) struct WiggleCache {
    entries: Vec<WiggleEntry>,
    lastheight: i32,
    pub current: WiggleScale,
}

impl Default for WiggleCache {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            lastheight: 0,
            current: WiggleScale::from_index(0),
        }
    }
}

impl WiggleCache {
    pub fn fix(&mut self, sector: usize, ceilingheight: Fixed, floorheight: Fixed) {
        let height = (ceilingheight.wrapping_sub(floorheight) >> FRACBITS).max(1);
        if height == self.lastheight {
            return;
        }
        self.lastheight = height;

        if sector >= self.entries.len() {
            self.entries.resize(sector + 1, WiggleEntry::default());
        }
        let entry = &mut self.entries[sector];
        if height != entry.cachedheight {
            entry.cachedheight = height;
            entry.scaleindex = 0;
            let mut h = height >> 7;
            loop {
                h >>= 1;
                if h == 0 {
                    break;
                }
                entry.scaleindex += 1;
            }
        }
        self.current = WiggleScale::from_index(entry.scaleindex);
    }
}

impl SoftwareRenderer {
    /// R_ScaleFromGlobalAngle
    ///
    /// Returns the texture mapping scale for the current line (horizontal
    /// span) at the given angle. `rw_distance` must be calculated first.
    pub(crate) fn scale_from_global_angle(&self, visangle: Angle) -> Fixed {
        let anglea = ANG90.wrapping_add(visangle.wrapping_sub(self.view.angle));
        let angleb = ANG90.wrapping_add(visangle.wrapping_sub(self.seg.rw_normalangle));
        let sinea = finesine((anglea >> ANGLETOFINESHIFT) as usize);
        let sineb = finesine((angleb >> ANGLETOFINESHIFT) as usize);
        let num = fixed_mul(self.tables.projection, sineb) << self.tables.detailshift;
        let den = fixed_mul(self.seg.rw_distance, sinea);

        let max = self.wiggle.current.max_rwscale;
        if den > num >> FRACBITS {
            fixed_div(num, den).clamp(256, max)
        } else {
            max
        }
    }

    /// Light row for a wall. With fake contrast on, lines along the x axis
    /// are a level darker and lines along y a level brighter, and solid
    /// walls in an unlit sector are lifted a level for brightmaps.
    pub(crate) fn seg_light(&self, lightlevel: i32, v1: &Vertex, v2: &Vertex, wall: bool) -> usize {
        let mut lightnum = (lightlevel >> LIGHTSEGSHIFT) + self.view.extralight;
        if self.config.fake_contrast {
            if v1.y == v2.y {
                lightnum -= 1;
            } else if v1.x == v2.x {
                lightnum += 1;
            }
            if wall && self.config.brightmaps && lightlevel == 0 {
                lightnum += 1;
            }
        }
        lightnum.clamp(0, LIGHTLEVELS as i32 - 1) as usize
    }

    /// R_StoreWallRange - r_segs
    ///
    /// A wall segment will be drawn between start and stop pixels
    /// (inclusive). Sets up the `SegRender` state, draws the solid parts,
    /// marks planes and keeps a `DrawSeg` for sprite clipping and masked
    /// textures.
    pub(crate) fn store_wall_range(
        &mut self,
        start: i32,
        stop: i32,
        map: &MapData,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        #[cfg(feature = "hprof")]
        profile!("store_wall_range");
        #[cfg(any(feature = "safety_check", debug_assertions))]
        if start >= self.tables.viewwidth || start > stop {
            panic!("Bad R_RenderWallRange: {} to {}", start, stop);
        }

        let view = self.view;
        let seg_num = self.seg.curline;
        let seg = &map.segments[seg_num];
        let sidedef = &map.sidedefs()[seg.sidedef];
        let linedef = &map.linedefs[seg.linedef];
        let front_num = self.seg.frontsector;
        let frontsector = &map.sectors[front_num];
        let backsector = seg.backsector.map(|b| &map.sectors[b]);
        let v1 = &map.vertexes[seg.v1];
        let v2 = &map.vertexes[seg.v2];
        let skynum = pic_data.sky_num();

        // Mark the segment as visible for auto map
        self.scratch.mapped_lines.push(seg.linedef);

        // Distances come from the render positions in 64 bits so long walls
        // don't wobble
        self.seg.rw_normalangle = seg.angle.wrapping_add(ANG90);
        let dx = v2.px as i64 - v1.px as i64;
        let dy = v2.py as i64 - v1.py as i64;
        let dx1 = view.x as i64 - v1.px as i64;
        let dy1 = view.y as i64 - v1.py as i64;
        let length = (seg.length as i64).max(1);
        self.seg.rw_distance = ((dy.wrapping_mul(dx1).wrapping_sub(dx.wrapping_mul(dy1)) / length) as Fixed).max(1);

        let mut ds = DrawSeg::new(seg_num);
        ds.x1 = start;
        ds.x2 = stop;
        self.seg.rw_x = start;
        self.seg.rw_stopx = stop + 1;

        self.wiggle.fix(front_num, frontsector.ceilingheight, frontsector.floorheight);

        // calculate scale at both ends and step
        ds.scale1 = self.scale_from_global_angle(view.angle.wrapping_add(self.tables.xtoviewangle[start as usize]));
        self.seg.rw_scale = ds.scale1;
        if stop > start {
            ds.scale2 = self.scale_from_global_angle(view.angle.wrapping_add(self.tables.xtoviewangle[stop as usize]));
            ds.scalestep = (ds.scale2 - ds.scale1) / (stop - start);
        } else {
            ds.scale2 = ds.scale1;
            ds.scalestep = 0;
        }
        self.seg.rw_scalestep = ds.scalestep;

        // calculate texture boundaries and decide if floor / ceiling marks
        // are needed
        let mut worldtop = frontsector.ceilingheight.wrapping_sub(view.z);
        let mut worldbottom = frontsector.floorheight.wrapping_sub(view.z);
        let mut worldhigh = 0;
        let mut worldlow = 0;
        let texheight = |tex: Option<usize>| tex.map_or(0, |t| pic_data.texture_height(t) << FRACBITS);

        self.seg.midtexture = None;
        self.seg.toptexture = None;
        self.seg.bottomtexture = None;
        self.seg.maskedtexture = false;
        self.seg.maskedtexturecol = None;

        match backsector {
            None => {
                // single sided line
                self.seg.midtexture = sidedef.midtexture;
                // a single sided line is terminal, so it must mark ends
                self.seg.markfloor = true;
                self.seg.markceiling = true;
                let vtop = if linedef.flags.contains(LineDefFlags::DONT_PEG_BOTTOM) {
                    frontsector.floorheight + texheight(sidedef.midtexture)
                } else {
                    frontsector.ceilingheight
                };
                // bottom of texture at bottom, or top of texture at top
                self.seg.rw_midtexturemid = vtop.wrapping_sub(view.z).wrapping_add(sidedef.rowoffset);

                ds.silhouette = SIL_BOTH;
                ds.sprtopclip = Some(self.scratch.openings.screenheight());
                ds.sprbottomclip = Some(self.scratch.openings.negone());
                ds.bsilheight = i32::MAX;
                ds.tsilheight = i32::MIN;
            }
            Some(backsector) => {
                // two sided line
                ds.silhouette = SIL_NONE;
                if frontsector.floorheight > backsector.floorheight {
                    ds.silhouette = SIL_BOTTOM;
                    ds.bsilheight = frontsector.floorheight;
                } else if backsector.floorheight > view.z {
                    ds.silhouette = SIL_BOTTOM;
                    ds.bsilheight = i32::MAX;
                }

                if frontsector.ceilingheight < backsector.ceilingheight {
                    ds.silhouette |= SIL_TOP;
                    ds.tsilheight = frontsector.ceilingheight;
                } else if backsector.ceilingheight < view.z {
                    ds.silhouette |= SIL_TOP;
                    ds.tsilheight = i32::MIN;
                }

                let closed = backsector.ceilingheight <= frontsector.floorheight
                    || backsector.floorheight >= frontsector.ceilingheight;
                if backsector.ceilingheight <= frontsector.floorheight {
                    ds.sprbottomclip = Some(self.scratch.openings.negone());
                    ds.bsilheight = i32::MAX;
                    ds.silhouette |= SIL_BOTTOM;
                }
                if backsector.floorheight >= frontsector.ceilingheight {
                    ds.sprtopclip = Some(self.scratch.openings.screenheight());
                    ds.tsilheight = i32::MIN;
                    ds.silhouette |= SIL_TOP;
                }

                worldhigh = backsector.ceilingheight.wrapping_sub(view.z);
                worldlow = backsector.floorheight.wrapping_sub(view.z);

                // hack to allow height changes in outdoor areas
                if frontsector.ceilingpic == skynum && backsector.ceilingpic == skynum {
                    worldtop = worldhigh;
                }

                self.seg.markfloor = worldlow != worldbottom
                    || backsector.floorpic != frontsector.floorpic
                    || backsector.lightlevel != frontsector.lightlevel
                    || backsector.special != frontsector.special;
                self.seg.markceiling = worldhigh != worldtop
                    || backsector.ceilingpic != frontsector.ceilingpic
                    || backsector.lightlevel != frontsector.lightlevel;

                if closed {
                    // closed door
                    self.seg.markceiling = true;
                    self.seg.markfloor = true;
                }

                if worldhigh < worldtop {
                    // top texture
                    self.seg.toptexture = sidedef.toptexture;
                    self.seg.rw_toptexturemid = if linedef.flags.contains(LineDefFlags::DONT_PEG_TOP) {
                        worldtop
                    } else {
                        // bottom of texture
                        (backsector.ceilingheight + texheight(sidedef.toptexture)).wrapping_sub(view.z)
                    };
                }
                if worldlow > worldbottom {
                    // bottom texture
                    self.seg.bottomtexture = sidedef.bottomtexture;
                    self.seg.rw_bottomtexturemid = if linedef.flags.contains(LineDefFlags::DONT_PEG_BOTTOM) {
                        // bottom of texture at bottom, top of texture at top
                        worldtop
                    } else {
                        worldlow
                    };
                }
                self.seg.rw_toptexturemid = self.seg.rw_toptexturemid.wrapping_add(sidedef.rowoffset);
                self.seg.rw_bottomtexturemid = self.seg.rw_bottomtexturemid.wrapping_add(sidedef.rowoffset);

                // allocate space for masked texture tables
                if sidedef.midtexture.is_some() {
                    self.seg.maskedtexture = true;
                    let handle = self
                        .scratch
                        .openings
                        .reserve(start, (self.seg.rw_stopx - start) as usize);
                    self.seg.maskedtexturecol = Some(handle);
                    ds.maskedtexturecol = Some(handle);
                }
            }
        }

        // calculate rw_offset (only needed for textured lines)
        self.seg.segtextured = self.seg.midtexture.is_some()
            || self.seg.toptexture.is_some()
            || self.seg.bottomtexture.is_some()
            || self.seg.maskedtexture;

        if self.seg.segtextured {
            let offset = (dx.wrapping_mul(dx1).wrapping_add(dy.wrapping_mul(dy1)) / length) as Fixed;
            self.seg.rw_offset = offset.wrapping_add(sidedef.textureoffset).wrapping_add(seg.offset);
            self.seg.rw_centerangle = ANG90
                .wrapping_add(view.angle)
                .wrapping_sub(self.seg.rw_normalangle);

            // calculate light table, use different light tables for
            // horizontal / vertical
            if view.fixedcolormap.is_none() {
                self.seg.walllights = self.seg_light(frontsector.lightlevel, v1, v2, true);
            }
        }

        // if a floor / ceiling plane is on the wrong side of the view plane,
        // it is definitely invisible and doesn't need to be marked.
        if frontsector.floorheight >= view.z {
            // above view plane
            self.seg.markfloor = false;
        }
        if frontsector.ceilingheight <= view.z && frontsector.ceilingpic != skynum {
            // below view plane
            self.seg.markceiling = false;
        }

        // calculate incremental stepping values for texture edges
        let wiggle = self.wiggle.current;
        let invhgtbits = wiggle.invhgtbits;
        worldtop >>= invhgtbits;
        worldbottom >>= invhgtbits;
        let centeryfrac = (view.centeryfrac as i64) >> invhgtbits;
        let rw_scale = self.seg.rw_scale as i64;

        self.seg.topstep = -fixed_mul(self.seg.rw_scalestep, worldtop);
        self.seg.topfrac = centeryfrac - ((worldtop as i64 * rw_scale) >> FRACBITS);
        self.seg.bottomstep = -fixed_mul(self.seg.rw_scalestep, worldbottom);
        self.seg.bottomfrac = centeryfrac - ((worldbottom as i64 * rw_scale) >> FRACBITS);

        if backsector.is_some() {
            worldhigh >>= invhgtbits;
            worldlow >>= invhgtbits;
            if worldhigh < worldtop {
                self.seg.pixhigh = centeryfrac - ((worldhigh as i64 * rw_scale) >> FRACBITS);
                self.seg.pixhighstep = -fixed_mul(self.seg.rw_scalestep, worldhigh);
            }
            if worldlow > worldbottom {
                self.seg.pixlow = centeryfrac - ((worldlow as i64 * rw_scale) >> FRACBITS);
                self.seg.pixlowstep = -fixed_mul(self.seg.rw_scalestep, worldlow);
            }
        }

        // render it
        let planes = &mut self.scratch.planes;
        if self.seg.markceiling {
            if let Some(ceiling) = planes.ceilingplane {
                planes.ceilingplane = Some(planes.check_plane(ceiling, self.seg.rw_x, self.seg.rw_stopx - 1, true));
            }
        }
        if self.seg.markfloor {
            if let Some(floor) = planes.floorplane {
                planes.floorplane = Some(planes.check_plane(floor, self.seg.rw_x, self.seg.rw_stopx - 1, false));
            }
        }

        self.render_seg_loop(pic_data, pixels);

        // save sprite clipping info
        let range = start as usize..self.seg.rw_stopx as usize;
        if (ds.silhouette & SIL_TOP != 0 || self.seg.maskedtexture) && ds.sprtopclip.is_none() {
            let clip = &self.scratch.portal_clip.ceilingclip[range.clone()];
            ds.sprtopclip = Some(self.scratch.openings.copy_in(start, clip));
        }
        if (ds.silhouette & SIL_BOTTOM != 0 || self.seg.maskedtexture) && ds.sprbottomclip.is_none() {
            let clip = &self.scratch.portal_clip.floorclip[range];
            ds.sprbottomclip = Some(self.scratch.openings.copy_in(start, clip));
        }

        if self.seg.maskedtexture && ds.silhouette & SIL_TOP == 0 {
            ds.silhouette |= SIL_TOP;
            ds.tsilheight = i32::MIN;
        }
        if self.seg.maskedtexture && ds.silhouette & SIL_BOTTOM == 0 {
            ds.silhouette |= SIL_BOTTOM;
            ds.bsilheight = i32::MAX;
        }
        self.scratch.push_drawseg(ds);
    }

    /// R_RenderSegLoop
    ///
    /// Draws the solid tiers of the wall column by column, marks the floor
    /// and ceiling spans and narrows the portal clip for whatever is behind.
    fn render_seg_loop(&mut self, pic_data: &PicData, pixels: &mut impl PixelBuffer) {
        #[cfg(feature = "hprof")]
        profile!("render_seg_loop");
        let tables = &self.tables;
        let view = &self.view;
        let wiggle = self.wiggle.current;
        let s = &mut self.seg;
        let clip = &mut self.scratch.portal_clip;
        let openings = &mut self.scratch.openings;
        let planes = &mut self.scratch.planes;
        let ceilingplane = planes.ceilingplane;
        let floorplane = planes.floorplane;
        let walllights = &tables.scalelight[s.walllights];
        let heightunit = wiggle.heightunit as i64;
        let heightbits = wiggle.heightbits;

        let mut texturecolumn = 0;
        let mut iscale = 0;
        while s.rw_x < s.rw_stopx {
            let x = s.rw_x;
            let xu = x as usize;

            // mark floor / ceiling areas
            let mut yl = to_row((s.topfrac + heightunit - 1) >> heightbits);
            // no space above wall?
            if yl < clip.ceilingclip[xu] + 1 {
                yl = clip.ceilingclip[xu] + 1;
            }

            if s.markceiling {
                let top = clip.ceilingclip[xu] + 1;
                let mut bottom = yl - 1;
                if bottom >= clip.floorclip[xu] {
                    bottom = clip.floorclip[xu] - 1;
                }
                if top <= bottom {
                    if let Some(ceiling) = ceilingplane {
                        planes.visplanes[ceiling].set_column(x, top, bottom);
                    }
                }
            }

            let mut yh = to_row(s.bottomfrac >> heightbits);
            if yh >= clip.floorclip[xu] {
                yh = clip.floorclip[xu] - 1;
            }

            if s.markfloor {
                let mut top = yh + 1;
                let bottom = clip.floorclip[xu] - 1;
                if top <= clip.ceilingclip[xu] {
                    top = clip.ceilingclip[xu] + 1;
                }
                if top <= bottom {
                    if let Some(floor) = floorplane {
                        planes.visplanes[floor].set_column(x, top, bottom);
                    }
                }
            }

            // texturecolumn and lighting are independent of wall tiers
            if s.segtextured {
                // calculate texture offset
                let angle = ((s.rw_centerangle.wrapping_add(tables.xtoviewangle[xu]) >> ANGLETOFINESHIFT)
                    as usize)
                    & (FINEANGLES / 2 - 1);
                texturecolumn = s
                    .rw_offset
                    .wrapping_sub(fixed_mul(finetangent(angle), s.rw_distance))
                    >> FRACBITS;
                iscale = (u32::MAX / s.rw_scale as u32) as Fixed;
            }
            let colourmap =
                pic_data.colourmap(view.fixedcolormap.unwrap_or_else(|| walllights[tables.scale_light_index(s.rw_scale)]));

            if let Some(mid) = s.midtexture {
                // single sided line
                let dc = DrawColumn::new(
                    pic_data.wall_pic_column(mid, texturecolumn),
                    colourmap,
                    iscale,
                    s.rw_midtexturemid,
                    view.centery,
                    x,
                    yl,
                    yh,
                );
                tables.strategy.draw_column(&dc, tables.window, pixels);
                clip.ceilingclip[xu] = tables.viewheight;
                clip.floorclip[xu] = -1;
            } else {
                // two sided line
                if let Some(top_tex) = s.toptexture {
                    // top wall
                    let mut mid = to_row(s.pixhigh >> heightbits);
                    s.pixhigh += s.pixhighstep as i64;
                    if mid >= clip.floorclip[xu] {
                        mid = clip.floorclip[xu] - 1;
                    }
                    if mid >= yl {
                        let dc = DrawColumn::new(
                            pic_data.wall_pic_column(top_tex, texturecolumn),
                            colourmap,
                            iscale,
                            s.rw_toptexturemid,
                            view.centery,
                            x,
                            yl,
                            mid,
                        );
                        tables.strategy.draw_column(&dc, tables.window, pixels);
                        clip.ceilingclip[xu] = mid;
                    } else {
                        clip.ceilingclip[xu] = yl - 1;
                    }
                } else if s.markceiling {
                    // no top wall
                    clip.ceilingclip[xu] = yl - 1;
                }

                if let Some(bottom_tex) = s.bottomtexture {
                    // bottom wall
                    let mut mid = to_row((s.pixlow + heightunit - 1) >> heightbits);
                    s.pixlow += s.pixlowstep as i64;
                    // no space above wall?
                    if mid <= clip.ceilingclip[xu] {
                        mid = clip.ceilingclip[xu] + 1;
                    }
                    if mid <= yh {
                        let dc = DrawColumn::new(
                            pic_data.wall_pic_column(bottom_tex, texturecolumn),
                            colourmap,
                            iscale,
                            s.rw_bottomtexturemid,
                            view.centery,
                            x,
                            mid,
                            yh,
                        );
                        tables.strategy.draw_column(&dc, tables.window, pixels);
                        clip.floorclip[xu] = mid;
                    } else {
                        clip.floorclip[xu] = yh + 1;
                    }
                } else if s.markfloor {
                    // no bottom wall
                    clip.floorclip[xu] = yh + 1;
                }

                if let Some(cols) = s.maskedtexturecol {
                    // save texturecol for backdrawing of masked mid texture
                    openings.set(cols, x, texturecolumn);
                }
            }

            s.rw_scale = s.rw_scale.wrapping_add(s.rw_scalestep);
            s.topfrac += s.topstep as i64;
            s.bottomfrac += s.bottomstep as i64;
            s.rw_x += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{frame_input, renderer};
    use level::LoadOptions;
    use level::testing::{PLAYER_X, PLAYER_Y, two_room_map};
    use math::{ANG180, ANG270};
    use render_trait::Framebuffer;

    #[test]
    fn wiggle_class_by_height() {
        let mut cache = WiggleCache::default();
        cache.fix(0, 1024 << FRACBITS, 0);
        assert_eq!(cache.current.max_rwscale, 512 << FRACBITS);
        assert_eq!(cache.current.heightbits, 11);
        assert_eq!(cache.current.heightunit, 1 << 11);
        assert_eq!(cache.current.invhgtbits, 5);

        // Anything up to 255 units keeps full precision
        cache.fix(1, 128 << FRACBITS, 0);
        assert_eq!(cache.current, WiggleScale::from_index(0));
        cache.fix(2, 0, 0);
        assert_eq!(cache.current.max_rwscale, 2048 << FRACBITS);
    }

    #[test]
    fn wiggle_recomputed_on_height_change() {
        let mut cache = WiggleCache::default();
        cache.fix(0, 1024 << FRACBITS, 0);
        cache.entries[0].scaleindex = 0;

        // Same height for the sector, the cached class is used
        cache.fix(1, 128 << FRACBITS, 0);
        cache.fix(0, 1024 << FRACBITS, 0);
        assert_eq!(cache.current.heightbits, 12);
        assert_eq!(cache.current.max_rwscale, 2048 << FRACBITS);

        cache.fix(0, 512 << FRACBITS, 0);
        assert_eq!(cache.current.max_rwscale, 1024 << FRACBITS);
        assert_eq!(cache.current.heightbits, 11);
    }

    #[test]
    fn frontal_wall_has_constant_scale() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.render_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, ANG180), &map, &pic_data, &mut fb);

        let ds = r
            .scratch
            .drawsegs
            .iter()
            .find(|ds| ds.curline == 0)
            .expect("west wall drawn");
        assert_eq!((ds.x1, ds.x2), (0, 319));
        assert_eq!(ds.scale1, fixed_div(r.tables.projection, 64 << FRACBITS));
        assert_eq!(ds.scale2, ds.scale1);
        assert_eq!(ds.scalestep, 0);
        assert_eq!(ds.silhouette, SIL_BOTH);
        assert!(r.scratch.mapped_lines.contains(&0));
    }

    /// Room B with room A's flats, light and special, so only heights differ
    fn matched_rooms() -> (level::PicData, level::MapData) {
        let (_, pic_data, mut map) = two_room_map(LoadOptions::default());
        let a = map.sectors[0].clone();
        let b = &mut map.sectors[1];
        b.floorpic = a.floorpic;
        b.ceilingpic = a.ceilingpic;
        b.lightlevel = a.lightlevel;
        b.special = a.special;
        b.floorheight = a.floorheight;
        b.ceilingheight = a.ceilingheight;
        (pic_data, map)
    }

    #[test]
    fn closed_door_marks_both_planes() {
        // Floor shut down on the front floor, then ceiling shut up on the
        // front ceiling. Each leaves one of the heights matching.
        for (floor, ceiling) in [(0, 0), (128 << FRACBITS, 128 << FRACBITS)] {
            let (pic_data, mut map) = matched_rooms();
            map.sectors[1].floorheight = floor;
            map.sectors[1].ceilingheight = ceiling;
            let mut r = renderer(320, 200, 11);
            let mut fb = Framebuffer::new(320, 200);
            r.begin_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map);

            r.seg.frontsector = 0;
            r.add_line(&map, 2, &pic_data, &mut fb);
            assert!(r.seg.markfloor);
            assert!(r.seg.markceiling);
            let ds = r.scratch.drawsegs.last().expect("door drawn");
            assert_eq!(ds.curline, 2);
            assert_eq!(ds.silhouette, SIL_BOTH);
            // Solid, so room B is hidden
            assert!(!r.check_bbox(&map.nodes[0].bboxes[0]));
        }
    }

    #[test]
    fn matching_open_line_marks_nothing() {
        let (pic_data, map) = matched_rooms();
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.begin_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map);

        r.seg.frontsector = 0;
        r.add_line(&map, 2, &pic_data, &mut fb);
        assert!(!r.seg.markfloor);
        assert!(!r.seg.markceiling);
        assert!(r.check_bbox(&map.nodes[0].bboxes[0]));
    }

    #[test]
    fn open_line_marks_only_differences() {
        let (_, pic_data, mut map) = two_room_map(LoadOptions::default());
        // Same heights and light, different flats
        map.sectors[1].floorheight = 0;
        map.sectors[1].ceilingheight = 128 << FRACBITS;
        map.sectors[1].lightlevel = 160;
        map.sectors[1].ceilingpic = map.sectors[0].ceilingpic;
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.begin_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map);

        r.seg.frontsector = 0;
        r.add_line(&map, 2, &pic_data, &mut fb);
        assert!(r.seg.markfloor);
        assert!(!r.seg.markceiling);
        assert!(r.check_bbox(&map.nodes[0].bboxes[0]));
    }

    #[test]
    fn fake_contrast_lighting() {
        let mut r = renderer(320, 200, 11);
        let flat = (Vertex::new(0, 0), Vertex::new(FRACUNIT, 0));
        let upright = (Vertex::new(0, 0), Vertex::new(0, FRACUNIT));
        let angled = (Vertex::new(0, 0), Vertex::new(FRACUNIT, FRACUNIT));

        assert_eq!(r.seg_light(160, &flat.0, &flat.1, true), 9);
        assert_eq!(r.seg_light(160, &upright.0, &upright.1, true), 11);
        assert_eq!(r.seg_light(160, &angled.0, &angled.1, true), 10);

        r.config.fake_contrast = false;
        assert_eq!(r.seg_light(160, &flat.0, &flat.1, true), 10);

        // Only solid walls lift a dark sector for brightmaps
        r.config.fake_contrast = true;
        r.config.brightmaps = true;
        assert_eq!(r.seg_light(0, &upright.0, &upright.1, true), 2);
        assert_eq!(r.seg_light(0, &upright.0, &upright.1, false), 1);
        assert_eq!(r.seg_light(0, &flat.0, &flat.1, false), 0);
        assert_eq!(r.seg_light(0, &flat.0, &flat.1, true), 0);
    }

    #[test]
    fn brightmap_lift_needs_fake_contrast() {
        let mut r = renderer(320, 200, 11);
        let upright = (Vertex::new(0, 0), Vertex::new(0, FRACUNIT));
        r.config.fake_contrast = false;
        r.config.brightmaps = true;
        assert_eq!(r.seg_light(0, &upright.0, &upright.1, true), 0);
        assert_eq!(r.seg_light(0, &upright.0, &upright.1, false), 0);
        assert_eq!(r.seg_light(16, &upright.0, &upright.1, true), 1);
    }

    #[test]
    fn viewer_on_wall_line_keeps_distance() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        // Standing exactly on the west wall
        r.begin_frame(&frame_input(0, PLAYER_Y, 41, ANG180), &map);
        r.seg.frontsector = 0;
        r.seg.curline = 0;
        r.store_wall_range(100, 110, &map, &pic_data, &mut fb);
        assert_eq!(r.seg.rw_distance, 1);
        let ds = r.scratch.drawsegs.last().expect("wall stored");
        assert_eq!(ds.scale1, r.wiggle.current.max_rwscale);
    }

    #[test]
    fn drawsegs_grow_past_limit() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.begin_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, ANG270), &map);
        r.seg.frontsector = 0;
        r.seg.curline = 1;
        for x in 0..crate::defs::MAXDRAWSEGS as i32 + 1 {
            r.store_wall_range(x % 320, x % 320, &map, &pic_data, &mut fb);
        }
        assert_eq!(r.scratch.drawsegs.len(), crate::defs::MAXDRAWSEGS + 1);
        assert!(r.scratch.drawseg_notice.logged());
        assert_eq!(r.scratch.drawsegs[5].x1, 5);
    }

    #[cfg(any(feature = "safety_check", debug_assertions))]
    #[test]
    #[should_panic(expected = "Bad R_RenderWallRange: 10 to 5")]
    fn wall_range_check() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 10);
        let mut fb = Framebuffer::new(320, 200);
        r.begin_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map);
        r.seg.curline = 1;
        r.store_wall_range(10, 5, &map, &pic_data, &mut fb);
    }
}
