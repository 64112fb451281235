//! Things and masked mid textures, drawn back to front once the walls and
//! planes are done, `r_things`.

use level::{Colourmap, LineDefFlags, MapData, PicData, TRANSPARENT};
#[cfg(feature = "hprof")]
use coarse_prof::profile;
use math::{FRACBITS, FRACUNIT, Fixed, fixed_div, fixed_mul};
use render_trait::PixelBuffer;

use crate::defs::{DrawSeg, SIL_BOTTOM, SIL_TOP};
use crate::draw::{DrawColumn, DrawStrategy, ViewWindow};
use crate::view::{LIGHTLEVELS, LIGHTSEGSHIFT};
use crate::{SoftwareRenderer, to_row};

/// Anything closer than this is behind the view
const MINZ: Fixed = FRACUNIT * 4;

/// Marks a column in `clipbot`/`cliptop` that no seg has clipped
const UNCLIPPED: i32 = -2;

/// A thing to draw this frame, as picked by the game: where it stands and
/// which sprite patch faces the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteThing {
    pub x: Fixed,
    pub y: Fixed,
    /// Bottom of the thing
    pub z: Fixed,
    /// Index of the sprite patch in `PicData`
    pub patch: usize,
    pub flip: bool,
    pub fullbright: bool,
}

/// A sprite projected to the screen
#[derive(Debug, Clone, Copy)]
pub(crate) struct VisSprite {
    pub x1: i32,
    pub x2: i32,
    // Line side calc
    pub gx: Fixed,
    pub gy: Fixed,
    // Bottom and top for clipping
    pub gz: Fixed,
    pub gzt: Fixed,
    // horizontal position of x1
    pub startfrac: Fixed,
    pub scale: Fixed,
    // negative if flipped
    pub xiscale: Fixed,
    pub texturemid: Fixed,
    pub patch: usize,
    pub colourmap: usize,
}

/// `dc_*` values shared by every post of a masked column
struct MaskedColumn<'a> {
    colourmap: &'a Colourmap,
    sprtopscreen: i64,
    spryscale: Fixed,
    iscale: Fixed,
    texturemid: Fixed,
    centery: i32,
    strategy: DrawStrategy,
    window: ViewWindow,
}

impl MaskedColumn<'_> {
    /// R_DrawMaskedColumn
    ///
    /// Each run of opaque texels is a post, clipped to the rows between
    /// `ceilingclip` and `floorclip` (both exclusive).
    fn draw(&self, column: &[usize], x: i32, floorclip: i32, ceilingclip: i32, pixels: &mut impl PixelBuffer) {
        let mut y = 0;
        while y < column.len() {
            if column[y] == TRANSPARENT {
                y += 1;
                continue;
            }
            let topdelta = y;
            while y < column.len() && column[y] != TRANSPARENT {
                y += 1;
            }
            let post = &column[topdelta..y];

            // calculate unclipped screen coordinates for post
            let topscreen = self.sprtopscreen + self.spryscale as i64 * topdelta as i64;
            let bottomscreen = topscreen + self.spryscale as i64 * post.len() as i64;
            let mut yl = to_row((topscreen + FRACUNIT as i64 - 1) >> FRACBITS);
            let mut yh = to_row((bottomscreen - 1) >> FRACBITS);

            if yh >= floorclip {
                yh = floorclip - 1;
            }
            if yl <= ceilingclip {
                yl = ceilingclip + 1;
            }

            if yl <= yh {
                let dc = DrawColumn::new(
                    post,
                    self.colourmap,
                    self.iscale,
                    self.texturemid.wrapping_sub((topdelta as Fixed) << FRACBITS),
                    self.centery,
                    x,
                    yl,
                    yh,
                );
                self.strategy.draw_post(&dc, self.window, pixels);
            }
        }
    }
}

impl SoftwareRenderer {
    /// Queue a thing for the next frame. It is projected when the BSP walk
    /// reaches its sector.
    pub fn add_vissprite(&mut self, thing: SpriteThing) {
        self.things.push(thing);
    }

    /// R_AddSprites
    ///
    /// Sectors can be split in to many subsectors, so each is only done on
    /// its first visit of the frame.
    pub(crate) fn add_sprites(&mut self, map: &MapData, sector: usize, pic_data: &PicData) {
        if self.scratch.sector_visits[sector] == self.view.validcount {
            return;
        }
        self.scratch.sector_visits[sector] = self.view.validcount;

        let lightnum = ((map.sectors[sector].lightlevel >> LIGHTSEGSHIFT) + self.view.extralight)
            .clamp(0, LIGHTLEVELS as i32 - 1) as usize;
        for i in 0..self.things.len() {
            if self.scratch.thing_sectors[i] == sector {
                let thing = self.things[i];
                self.project_sprite(&thing, lightnum, pic_data);
            }
        }
    }

    /// R_ProjectSprite
    ///
    /// Generates a vissprite for a thing if it might be visible.
    fn project_sprite(&mut self, thing: &SpriteThing, lightnum: usize, pic_data: &PicData) {
        let view = &self.view;
        let tables = &self.tables;

        // transform the origin point
        let tr_x = thing.x.wrapping_sub(view.x);
        let tr_y = thing.y.wrapping_sub(view.y);
        let gxt = fixed_mul(tr_x, view.cos);
        let gyt = fixed_mul(tr_y, view.sin).wrapping_neg();
        let tz = gxt.wrapping_sub(gyt);

        // thing is behind view plane?
        if tz < MINZ {
            return;
        }
        let xscale = fixed_div(tables.projection, tz);

        let gxt = fixed_mul(tr_x, view.sin).wrapping_neg();
        let gyt = fixed_mul(tr_y, view.cos);
        let mut tx = gyt.wrapping_add(gxt).wrapping_neg();

        // too far off the side?
        if tx.unsigned_abs() as i64 > (tz as i64) << 2 {
            return;
        }

        let patch = pic_data.sprite_patch(thing.patch);
        let width = (patch.data.len() as Fixed) << FRACBITS;
        let left_offset = patch.left_offset << FRACBITS;

        // calculate edges of the shape
        tx = tx.wrapping_sub(if thing.flip { width - left_offset } else { left_offset });
        let x1 = tables.centerxfrac.wrapping_add(fixed_mul(tx, xscale)) >> FRACBITS;

        // off the right side?
        if x1 > tables.viewwidth {
            return;
        }

        tx = tx.wrapping_add(width);
        let x2 = (tables.centerxfrac.wrapping_add(fixed_mul(tx, xscale)) >> FRACBITS) - 1;

        // off the left side
        if x2 < 0 {
            return;
        }

        let gzt = thing.z.wrapping_add(patch.top_offset << FRACBITS);
        let iscale = fixed_div(FRACUNIT, xscale);
        let mut vis = VisSprite {
            x1: x1.max(0),
            x2: x2.min(tables.viewwidth - 1),
            gx: thing.x,
            gy: thing.y,
            gz: thing.z,
            gzt,
            startfrac: 0,
            scale: xscale << tables.detailshift,
            xiscale: iscale,
            texturemid: gzt.wrapping_sub(view.z),
            patch: thing.patch,
            colourmap: 0,
        };
        if thing.flip {
            vis.startfrac = width - 1;
            vis.xiscale = -iscale;
        }
        if vis.x1 > x1 {
            vis.startfrac = vis.startfrac.wrapping_add(vis.xiscale.wrapping_mul(vis.x1 - x1));
        }

        vis.colourmap = if let Some(fixed) = view.fixedcolormap {
            // fixed map
            fixed
        } else if thing.fullbright {
            // full bright
            0
        } else {
            // diminished light
            tables.scalelight[lightnum][tables.scale_light_index(vis.scale)]
        };

        self.scratch.vissprites.push(vis);
    }

    /// R_DrawVisSprite
    ///
    /// `clipbot` and `cliptop` are indexed by screen column.
    fn draw_vis_sprite(
        &self,
        vis: &VisSprite,
        clipbot: &[i32],
        cliptop: &[i32],
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        let patch = pic_data.sprite_patch(vis.patch);
        let tables = &self.tables;
        let view = &self.view;
        let column = MaskedColumn {
            colourmap: pic_data.colourmap(vis.colourmap),
            sprtopscreen: view.centeryfrac as i64 - ((vis.texturemid as i64 * vis.scale as i64) >> FRACBITS),
            spryscale: vis.scale,
            iscale: vis.xiscale.abs() >> tables.detailshift,
            texturemid: vis.texturemid,
            centery: view.centery,
            strategy: tables.strategy,
            window: tables.window,
        };

        let mut frac = vis.startfrac;
        for x in vis.x1..=vis.x2 {
            let texturecolumn = frac >> FRACBITS;
            if let Some(data) = usize::try_from(texturecolumn).ok().and_then(|c| patch.data.get(c)) {
                column.draw(data, x, clipbot[x as usize], cliptop[x as usize], pixels);
            }
            frac = frac.wrapping_add(vis.xiscale);
        }
    }

    /// R_DrawSprite
    ///
    /// Clip the sprite against every draw seg in front of it, drawing the
    /// masked parts of those behind it first.
    fn draw_sprite(&mut self, spr: &VisSprite, map: &MapData, pic_data: &PicData, pixels: &mut impl PixelBuffer) {
        let width = self.tables.viewwidth as usize;
        let mut clipbot = vec![UNCLIPPED; width];
        let mut cliptop = vec![UNCLIPPED; width];

        // Scan drawsegs from end to start for obscuring segs.
        // The first drawseg that has a greater scale is the clip seg.
        for i in (0..self.scratch.drawsegs.len()).rev() {
            let ds = self.scratch.drawsegs[i];
            // determine if the drawseg obscures the sprite
            if ds.x1 > spr.x2
                || ds.x2 < spr.x1
                || (ds.silhouette == 0 && ds.maskedtexturecol.is_none())
            {
                // does not cover sprite
                continue;
            }

            let r1 = ds.x1.max(spr.x1);
            let r2 = ds.x2.min(spr.x2);
            let (lowscale, scale) = if ds.scale1 > ds.scale2 {
                (ds.scale2, ds.scale1)
            } else {
                (ds.scale1, ds.scale2)
            };

            if scale < spr.scale
                || (lowscale < spr.scale
                    && map.segments[ds.curline].point_on_side(&map.vertexes, spr.gx, spr.gy) == 0)
            {
                // masked mid texture?
                if ds.maskedtexturecol.is_some() {
                    self.render_masked_seg_range(&ds, r1, r2, map, pic_data, pixels);
                }
                // seg is behind sprite
                continue;
            }

            // clip this piece of the sprite
            let mut silhouette = ds.silhouette;
            if spr.gz >= ds.bsilheight {
                silhouette &= !SIL_BOTTOM;
            }
            if spr.gzt <= ds.tsilheight {
                silhouette &= !SIL_TOP;
            }

            let openings = &self.scratch.openings;
            for x in r1..=r2 {
                let xu = x as usize;
                if silhouette & SIL_BOTTOM != 0 && clipbot[xu] == UNCLIPPED {
                    if let Some(bottom) = ds.sprbottomclip {
                        clipbot[xu] = openings.get(bottom, x);
                    }
                }
                if silhouette & SIL_TOP != 0 && cliptop[xu] == UNCLIPPED {
                    if let Some(top) = ds.sprtopclip {
                        cliptop[xu] = openings.get(top, x);
                    }
                }
            }
        }

        // all clipping has been performed, so draw the sprite
        // check for unclipped columns
        for x in spr.x1..=spr.x2 {
            let xu = x as usize;
            if clipbot[xu] == UNCLIPPED {
                clipbot[xu] = self.tables.viewheight;
            }
            if cliptop[xu] == UNCLIPPED {
                cliptop[xu] = -1;
            }
        }

        self.draw_vis_sprite(spr, &clipbot, &cliptop, pic_data, pixels);
    }

    /// R_RenderMaskedSegRange
    ///
    /// Columns are marked done as they are drawn so a seg partly drawn while
    /// clipping a sprite is not drawn twice.
    pub(crate) fn render_masked_seg_range(
        &mut self,
        ds: &DrawSeg,
        x1: i32,
        x2: i32,
        map: &MapData,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        #[cfg(feature = "hprof")]
        profile!("render_masked_seg_range");
        let seg = &map.segments[ds.curline];
        let Some(backsector) = seg.backsector.map(|b| &map.sectors[b]) else {
            return;
        };
        let frontsector = &map.sectors[seg.frontsector];
        let sidedef = &map.sidedefs()[seg.sidedef];
        let Some(texnum) = sidedef.midtexture else {
            return;
        };
        let (Some(cols), Some(floorclip), Some(ceilingclip)) =
            (ds.maskedtexturecol, ds.sprbottomclip, ds.sprtopclip)
        else {
            return;
        };

        let lightnum = self.seg_light(
            frontsector.lightlevel,
            &map.vertexes[seg.v1],
            &map.vertexes[seg.v2],
            false,
        );
        let tables = &self.tables;
        let view = &self.view;
        let walllights = &tables.scalelight[lightnum];
        let openings = &mut self.scratch.openings;

        // find positioning
        let texheight = (pic_data.texture_height(texnum) as i64) << FRACBITS;
        let texturemid = if map.linedefs[seg.linedef].flags.contains(LineDefFlags::DONT_PEG_BOTTOM) {
            frontsector
                .floorheight
                .max(backsector.floorheight)
                .wrapping_add(texheight as Fixed)
        } else {
            frontsector.ceilingheight.min(backsector.ceilingheight)
        }
        .wrapping_sub(view.z)
        .wrapping_add(sidedef.rowoffset);

        let limit = (tables.screenheight as i64) << 32;
        let mut spryscale = ds.scale1.wrapping_add((x1 - ds.x1).wrapping_mul(ds.scalestep));
        for x in x1..=x2 {
            let col = openings.get(cols, x);
            // calculate lighting
            if col != i32::MAX {
                // Keep the 64 bit maths from overflowing on very close walls
                let t = ((view.centeryfrac as i64) << FRACBITS) - texturemid as i64 * spryscale as i64;
                if t + texheight * spryscale as i64 >= 0 && t <= limit {
                    let colourmap = view
                        .fixedcolormap
                        .unwrap_or_else(|| walllights[tables.scale_light_index(spryscale)]);
                    let column = MaskedColumn {
                        colourmap: pic_data.colourmap(colourmap),
                        sprtopscreen: t >> FRACBITS,
                        spryscale,
                        iscale: (u32::MAX / spryscale as u32) as Fixed,
                        texturemid,
                        centery: view.centery,
                        strategy: tables.strategy,
                        window: tables.window,
                    };
                    column.draw(
                        pic_data.wall_pic_column(texnum, col),
                        x,
                        openings.get(floorclip, x),
                        openings.get(ceilingclip, x),
                        pixels,
                    );
                    openings.set(cols, x, i32::MAX);
                }
            }
            spryscale = spryscale.wrapping_add(ds.scalestep);
        }
    }

    /// R_DrawMasked
    ///
    /// Sprites far to near, then whatever masked segs the sprites did not
    /// already draw.
    pub(crate) fn draw_masked(&mut self, map: &MapData, pic_data: &PicData, pixels: &mut impl PixelBuffer) {
        #[cfg(feature = "hprof")]
        profile!("draw_masked");
        let mut vissprites = std::mem::take(&mut self.scratch.vissprites);
        vissprites.sort_by_key(|v| v.scale);
        for spr in &vissprites {
            self.draw_sprite(spr, map, pic_data, pixels);
        }
        self.scratch.vissprites = vissprites;

        // render any remaining masked mid textures
        for i in (0..self.scratch.drawsegs.len()).rev() {
            let ds = self.scratch.drawsegs[i];
            if ds.maskedtexturecol.is_some() {
                self.render_masked_seg_range(&ds, ds.x1, ds.x2, map, pic_data, pixels);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{count_pixels, frame_input, renderer};
    use level::LoadOptions;
    use level::testing::{
        GRATE_PIXEL, PLAYER_X, PLAYER_Y, SPRITE_NAME, SPRITE_PIXEL, two_room_map,
    };
    use render_trait::{Framebuffer, PlayViewRenderer};

    fn barrel(pic_data: &PicData, x: i32) -> SpriteThing {
        SpriteThing {
            x: x << FRACBITS,
            y: PLAYER_Y,
            z: 16 << FRACBITS,
            patch: pic_data.sprite_num_for_name(SPRITE_NAME).unwrap(),
            flip: false,
            fullbright: false,
        }
    }

    #[test]
    fn masked_column_splits_posts() {
        let cmap: Colourmap = std::array::from_fn(|i| i as u8);
        let column = MaskedColumn {
            colourmap: &cmap,
            sprtopscreen: 0,
            spryscale: FRACUNIT,
            iscale: FRACUNIT,
            texturemid: 0,
            centery: 0,
            strategy: DrawStrategy::High,
            window: ViewWindow::default(),
        };
        let source = [3, 3, TRANSPARENT, TRANSPARENT, 5, 5, 5, TRANSPARENT];
        let mut fb = Framebuffer::new(1, 8);
        column.draw(&source, 0, 6, -1, &mut fb);
        let col: Vec<u8> = (0..8).map(|y| fb.read_pixel(0, y)).collect();
        // Clipped at row 6 by the floor
        assert_eq!(col, vec![3, 3, 0, 0, 5, 5, 0, 0]);
    }

    #[test]
    fn sprite_projects_ahead() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        r.add_vissprite(barrel(&pic_data, 384));
        // Behind the view
        r.add_vissprite(barrel(&pic_data, 16));
        r.begin_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map);
        let lightnum = 8;
        for i in 0..r.things.len() {
            let thing = r.things[i];
            r.project_sprite(&thing, lightnum, &pic_data);
        }

        assert_eq!(r.scratch.vissprites.len(), 1);
        let vis = r.scratch.vissprites[0];
        assert!((155..=157).contains(&vis.x1));
        assert!((162..=164).contains(&vis.x2));
        assert_eq!(vis.texturemid, 7 << FRACBITS);
        assert!((vis.scale - FRACUNIT / 2).abs() < 16);
    }

    #[test]
    fn distant_things_rejected_without_overflow() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        // Depth past the range of a Fixed
        r.add_vissprite(SpriteThing {
            x: PLAYER_X.wrapping_add(0x7000_0000),
            y: PLAYER_Y.wrapping_add(0x7000_0000),
            ..barrel(&pic_data, 0)
        });
        // Close in depth, sideways offset past the range of a Fixed
        r.add_vissprite(SpriteThing {
            x: PLAYER_X.wrapping_add(0x7000_0000),
            y: PLAYER_Y.wrapping_sub(0x6000_0000),
            ..barrel(&pic_data, 0)
        });
        r.begin_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, math::ANG45), &map);
        for i in 0..r.things.len() {
            let thing = r.things[i];
            r.project_sprite(&thing, 8, &pic_data);
        }
        assert!(r.scratch.vissprites.is_empty());
    }

    #[test]
    fn sprite_drawn_through_window() {
        let (_, pic_data, mut map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.add_vissprite(barrel(&pic_data, 384));
        r.render_player_view(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &mut map, &pic_data, &mut fb);

        assert!(fb.read_pixel(160, 105) == SPRITE_PIXEL);
        assert!(count_pixels(&fb, SPRITE_PIXEL) > 50);
        // Queued things only last one frame
        assert!(r.things.is_empty());
    }

    #[test]
    fn sprite_hidden_behind_wall() {
        let (_, pic_data, mut map) = two_room_map(LoadOptions::default());
        // Close the window, the barrel is behind a solid wall
        map.sectors[1].ceilingheight = 0;
        map.sectors[1].floorheight = 0;
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.add_vissprite(barrel(&pic_data, 384));
        r.render_player_view(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &mut map, &pic_data, &mut fb);
        assert_eq!(count_pixels(&fb, SPRITE_PIXEL), 0);
    }

    #[test]
    fn masked_segs_drawn_once() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.render_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map, &pic_data, &mut fb);

        assert!(count_pixels(&fb, GRATE_PIXEL) > 0);
        let ds = r
            .scratch
            .drawsegs
            .iter()
            .find(|ds| ds.maskedtexturecol.is_some())
            .copied()
            .expect("grate seg");
        let cols = ds.maskedtexturecol.unwrap();
        assert!((ds.x1..=ds.x2).all(|x| r.scratch.openings.get(cols, x) == i32::MAX));
    }

    #[test]
    fn masked_columns_off_screen_skipped() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.render_frame(&frame_input(PLAYER_X, PLAYER_Y, -20000, 0), &map, &pic_data, &mut fb);
        assert_eq!(count_pixels(&fb, GRATE_PIXEL), 0);
    }
}
