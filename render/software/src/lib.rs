//! The classic software renderer: a front to back BSP walk that clips wall
//! segs against a per column occlusion list, visplanes for floors and
//! ceilings, then sprites and masked mid textures composited back to front.
//!
//! Everything is integer fixed point, drawn as palette indices in to any
//! `PixelBuffer`.

use level::{LineDefFlags, MapData, PicData};
#[cfg(feature = "hprof")]
use coarse_prof::profile;
use log::{debug, trace};
use render_trait::{PixelBuffer, PlayViewRenderer, RenderConfig, ViewInput};

use self::defs::{ClipRange, DrawSeg, GrowthNotice, MAXDRAWSEGS};
use self::masked::VisSprite;
use self::planes::VisPlaneRender;
use self::portals::{Openings, PortalClip};
use self::segs::{SegRender, WiggleCache};
use self::view::{ViewState, ViewTables};

mod bsp;
mod defs;
mod draw;
mod masked;
mod planes;
mod portals;
mod segs;
mod view;

pub use draw::{DrawStrategy, ViewWindow};
pub use masked::SpriteThing;
pub use planes::SwirlTable;
pub use view::{LOOKDIRMAX, LOOKDIRMIN, MLOOKUNIT};

/// Narrow a 64 bit screen row, saturating positions far off screen
#[inline]
pub(crate) fn to_row(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Per frame working storage. Sized for the view and reused every frame.
///
/// The BSP walk fills `solidsegs`, `drawsegs`, `openings` and the visplanes,
/// the plane and sprite passes then read them back.
pub(crate) struct FrameScratch {
    pub solidsegs: Vec<ClipRange>,
    /// One past the last live entry of `solidsegs`
    pub new_end: usize,
    pub drawsegs: Vec<DrawSeg>,
    drawseg_limit: usize,
    pub drawseg_notice: GrowthNotice,
    pub portal_clip: PortalClip,
    pub openings: Openings,
    pub planes: VisPlaneRender,
    pub vissprites: Vec<VisSprite>,
    /// Sector of each queued thing, same order as `SoftwareRenderer::things`
    pub thing_sectors: Vec<usize>,
    /// `validcount` of the frame each sector last had its sprites added
    pub sector_visits: Vec<usize>,
    /// Lines seen this frame, flagged for the automap when the frame is done
    pub mapped_lines: Vec<usize>,
    /// Subsectors visited
    pub sscount: usize,
}

impl FrameScratch {
    fn new(tables: &ViewTables) -> Self {
        let width = tables.viewwidth as usize;
        Self {
            solidsegs: vec![ClipRange { first: 0, last: 0 }; width + 4],
            new_end: 0,
            drawsegs: Vec::with_capacity(MAXDRAWSEGS),
            drawseg_limit: MAXDRAWSEGS,
            drawseg_notice: GrowthNotice::new("R_StoreWallRange: drawsegs", MAXDRAWSEGS),
            portal_clip: PortalClip::new(width, tables.viewheight),
            openings: Openings::new(width, tables.viewheight),
            planes: VisPlaneRender::new(width, tables.viewheight as usize),
            vissprites: Vec::with_capacity(128),
            thing_sectors: Vec::new(),
            sector_visits: Vec::new(),
            mapped_lines: Vec::new(),
            sscount: 0,
        }
    }

    /// Store a finished drawseg, doubling the soft limit when it is hit
    pub fn push_drawseg(&mut self, ds: DrawSeg) {
        if self.drawsegs.len() == self.drawseg_limit {
            let old = self.drawseg_limit;
            self.drawseg_limit *= 2;
            self.drawseg_notice.grew(old, self.drawseg_limit);
        }
        self.drawsegs.push(ds);
    }
}

/// A view size change waiting for the start of the next frame
#[derive(Debug, Clone, Copy)]
struct SizeRequest {
    blocks: i32,
    detail: i32,
}

pub struct SoftwareRenderer {
    pub(crate) config: RenderConfig,
    size_request: Option<SizeRequest>,
    screen_width: i32,
    screen_height: i32,
    pub(crate) tables: ViewTables,
    pub(crate) view: ViewState,
    pub(crate) scratch: FrameScratch,
    pub(crate) seg: SegRender,
    pub(crate) wiggle: WiggleCache,
    pub(crate) swirl: SwirlTable,
    /// Things queued for the next frame
    pub(crate) things: Vec<SpriteThing>,
}

impl SoftwareRenderer {
    /// `R_Init`. The view tables for `config.screenblocks` and
    /// `config.detailshift` are built straight away.
    pub fn new(screen_width: i32, screen_height: i32, config: RenderConfig) -> Self {
        let tables = ViewTables::new(
            screen_width,
            screen_height,
            config.hires,
            config.screenblocks,
            config.detailshift,
        );
        let scratch = FrameScratch::new(&tables);
        Self {
            config,
            size_request: None,
            screen_width,
            screen_height,
            tables,
            view: ViewState::default(),
            scratch,
            seg: SegRender::default(),
            wiggle: WiggleCache::default(),
            swirl: SwirlTable::new(),
            things: Vec::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Width and height of the 3D view in columns and rows
    pub fn view_size(&self) -> (i32, i32) {
        (self.tables.viewwidth, self.tables.viewheight)
    }

    /// Where the view sits in the buffer
    pub fn view_window(&self) -> ViewWindow {
        self.tables.window
    }

    /// `R_SetViewSize`
    ///
    /// Takes effect at the start of the next frame. Only the last request
    /// before a frame is applied.
    pub fn set_view_size(&mut self, blocks: i32, detail: i32) {
        self.size_request = Some(SizeRequest {
            blocks: blocks.clamp(3, 11),
            detail: detail.clamp(0, 1),
        });
    }

    /// `R_ExecuteSetViewSize`
    fn execute_set_view_size(&mut self) {
        let Some(request) = self.size_request.take() else {
            return;
        };
        self.config.screenblocks = request.blocks;
        self.config.detailshift = request.detail;
        self.tables = ViewTables::new(
            self.screen_width,
            self.screen_height,
            self.config.hires,
            request.blocks,
            request.detail,
        );
        self.scratch = FrameScratch::new(&self.tables);
        debug!(
            "Set view size to {} blocks, detail shift {}",
            request.blocks, request.detail
        );
    }

    /// Everything `R_SetupFrame` and `R_ClearClipSegs`, `R_ClearDrawSegs`,
    /// `R_ClearPlanes` and `R_ClearSprites` do before the BSP walk.
    pub(crate) fn begin_frame(&mut self, input: &ViewInput, map: &MapData) {
        self.execute_set_view_size();
        self.view.setup(input, &self.tables);
        if self.config.swirling_flats {
            self.swirl.update(self.view.leveltime, self.view.gametic);
        }

        self.clear_clip_segs();
        self.scratch.drawsegs.clear();
        self.scratch.portal_clip.clear();
        self.scratch.openings.clear();
        self.scratch.planes.clear_planes();
        self.scratch.vissprites.clear();

        let scratch = &mut self.scratch;
        scratch.sector_visits.clear();
        scratch.sector_visits.resize(map.sectors.len(), usize::MAX);
        scratch.mapped_lines.clear();
        scratch.thing_sectors.clear();
        scratch
            .thing_sectors
            .extend(self.things.iter().map(|t| map.point_in_sector(t.x, t.y)));
        scratch.sscount = 0;
    }

    /// Draw one frame of the view in to `pixels`. Queued things are
    /// consumed.
    pub fn render_frame(
        &mut self,
        input: &ViewInput,
        map: &MapData,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        #[cfg(feature = "hprof")]
        profile!("render_frame");
        self.begin_frame(input, map);
        self.clear_view_window(pixels);

        self.render_bsp_node(map, map.start_node(), pic_data, pixels);
        self.draw_planes(pic_data, pixels);
        self.draw_masked(map, pic_data, pixels);

        trace!(
            "Frame {}: {} subsectors, {} drawsegs, {} visplanes, {} sprites, {} openings",
            self.view.framecount,
            self.scratch.sscount,
            self.scratch.drawsegs.len(),
            self.scratch.planes.lastvisplane,
            self.scratch.vissprites.len(),
            self.scratch.openings.used()
        );
        self.things.clear();
    }

    /// Fill the view window with palette index 0 so columns nothing draws
    /// to are consistent between frames
    fn clear_view_window(&self, pixels: &mut impl PixelBuffer) {
        let window = self.tables.window;
        let width = (self.tables.scaledviewwidth).min(pixels.size().width() - window.x);
        let height = self.tables.viewheight.min(pixels.size().height() - window.y);
        for y in window.y..window.y + height {
            for x in window.x..window.x + width {
                pixels.set_pixel(x as usize, y as usize, 0);
            }
        }
    }
}

impl PlayViewRenderer for SoftwareRenderer {
    fn render_player_view(
        &mut self,
        view: &ViewInput,
        map: &mut MapData,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        self.render_frame(view, map, pic_data, pixels);
        for &line in &self.scratch.mapped_lines {
            map.linedefs[line].flags.insert(LineDefFlags::MAPPED);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use level::LoadOptions;
    use level::testing::{
        CEIL_PIXEL, FLOOR_PIXEL, GRATE_PIXEL, NUKAGE_PIXEL, PLAYER_X, PLAYER_Y, SKY_PIXEL, WALL_PIXEL,
        two_room_map,
    };
    use math::{Angle, FRACBITS, Fixed};
    use render_trait::{Framebuffer, ViewPos};

    pub(crate) fn renderer(width: i32, height: i32, blocks: i32) -> SoftwareRenderer {
        SoftwareRenderer::new(
            width,
            height,
            RenderConfig {
                screenblocks: blocks,
                ..RenderConfig::default()
            },
        )
    }

    pub(crate) fn frame_input(x: Fixed, y: Fixed, z_units: i32, angle: Angle) -> ViewInput {
        let mut input = ViewInput::at(ViewPos {
            x,
            y,
            z: z_units << FRACBITS,
            angle,
            lookdir: 0,
        });
        input.leveltime = 35;
        input.gametic = 35;
        input
    }

    pub(crate) fn count_pixels(fb: &Framebuffer, colour: u8) -> usize {
        fb.buffer().iter().filter(|&&p| p == colour).count()
    }

    #[test]
    fn frame_draws_both_rooms() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.render_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map, &pic_data, &mut fb);

        for colour in [WALL_PIXEL, FLOOR_PIXEL, CEIL_PIXEL, GRATE_PIXEL, SKY_PIXEL, NUKAGE_PIXEL] {
            assert!(count_pixels(&fb, colour) > 0, "no pixels of {colour}");
        }
        // Side wall, near floor and ceiling
        assert_eq!(fb.read_pixel(10, 100), WALL_PIXEL);
        assert_eq!(fb.read_pixel(160, 190), FLOOR_PIXEL);
        assert_eq!(fb.read_pixel(160, 5), CEIL_PIXEL);
    }

    #[test]
    fn frame_is_repeatable() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut first = Framebuffer::new(320, 200);
        let mut second = Framebuffer::new(320, 200);
        let input = frame_input(PLAYER_X, PLAYER_Y, 41, 0x1000_0000);
        r.render_frame(&input, &map, &pic_data, &mut first);
        r.render_frame(&input, &map, &pic_data, &mut second);
        assert_eq!(first.buffer(), second.buffer());
    }

    #[test]
    fn view_size_deferred_to_next_frame() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        r.set_view_size(8, 0);
        r.set_view_size(9, 1);
        assert_eq!(r.view_size(), (320, 200));

        let mut fb = Framebuffer::new(320, 200);
        r.render_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map, &pic_data, &mut fb);
        // 9 blocks is 288 wide, halved by low detail
        assert_eq!(r.view_size(), (144, 142));
        assert_eq!(r.config().screenblocks, 9);
        assert_eq!(r.view_window(), ViewWindow { x: 16, y: 8 });
        // Outside the window is left alone
        fb.clear_with_colour(255);
        r.render_frame(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &map, &pic_data, &mut fb);
        assert_eq!(fb.read_pixel(0, 0), 255);
        assert_eq!(fb.read_pixel(319, 199), 255);
        assert_ne!(fb.read_pixel(160, 80), 255);
    }

    #[test]
    fn seen_lines_are_mapped() {
        let (_, pic_data, mut map) = two_room_map(LoadOptions::default());
        assert!(map.linedefs.iter().all(|l| !l.flags.contains(LineDefFlags::MAPPED)));
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        r.render_player_view(&frame_input(PLAYER_X, PLAYER_Y, 41, 0), &mut map, &pic_data, &mut fb);

        let front = map.segments[2].linedef;
        assert!(map.linedefs[front].flags.contains(LineDefFlags::MAPPED));
        let behind = map.segments[0].linedef;
        assert!(!map.linedefs[behind].flags.contains(LineDefFlags::MAPPED));
    }

    #[test]
    fn frame_with_fixed_colourmap() {
        let (_, pic_data, map) = two_room_map(LoadOptions::default());
        let mut r = renderer(320, 200, 11);
        let mut fb = Framebuffer::new(320, 200);
        let mut input = frame_input(PLAYER_X, PLAYER_Y, 41, 0);
        input.fixedcolormap = Some(0);
        r.render_frame(&input, &map, &pic_data, &mut fb);
        assert_eq!(fb.read_pixel(10, 100), WALL_PIXEL);
    }
}
