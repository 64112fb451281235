//! View window sizing, projection and light tables, and the per frame camera.
//!
//! `ViewTables` is everything `R_ExecuteSetViewSize` recomputes. It is only
//! rebuilt at the start of a frame after `set_view_size` asked for it.

use log::debug;
use math::{
    ANG90, ANGLETOFINESHIFT, Angle, FINEANGLES, FRACBITS, FRACUNIT, Fixed, finecosine, finesine,
    finetangent, fixed_div, fixed_mul, lerp_angle,
};
use render_trait::{ViewInput, ViewPos};

use crate::draw::{DrawStrategy, ViewWindow};

pub const ORIGWIDTH: i32 = 320;
/// Status bar height in original pixels
pub const SBARHEIGHT: i32 = 42;
/// Fine angles covered by the view, 90 degrees
pub const FIELDOFVIEW: usize = 2048;

pub const LIGHTLEVELS: usize = 16;
pub const LIGHTSEGSHIFT: i32 = 4;
pub const MAXLIGHTSCALE: usize = 48;
pub const LIGHTSCALESHIFT: i32 = 12;
pub const MAXLIGHTZ: usize = 128;
pub const LIGHTZSHIFT: i32 = 20;
pub const NUMCOLORMAPS: i32 = 32;
const DISTMAP: i32 = 2;

pub const LOOKDIRMIN: i32 = 110;
pub const LOOKDIRMAX: i32 = 90;
pub const LOOKDIRS: usize = (LOOKDIRMIN + 1 + LOOKDIRMAX) as usize;
/// Raw `lookdir` units per pitch step
pub const MLOOKUNIT: i32 = 8;

/// Projection, lighting and clipping tables for one view size
pub struct ViewTables {
    pub screenwidth: i32,
    pub screenheight: i32,
    /// 1 when drawing at double the original resolution
    pub hires: i32,
    /// Wider than 4:3 at this resolution
    pub wide: bool,
    pub setblocks: i32,
    pub detailshift: i32,

    pub scaledviewwidth: i32,
    pub viewwidth: i32,
    pub viewheight: i32,
    pub window: ViewWindow,

    pub centerx: i32,
    pub centerxfrac: Fixed,
    pub projection: Fixed,

    /// Fine angle (offset by 90 degrees) to the first column right of it
    pub viewangletox: Vec<i32>,
    /// Column to the smallest view angle that maps to it, `viewwidth + 1`
    /// entries
    pub xtoviewangle: Vec<Angle>,
    pub clipangle: Angle,

    /// `LOOKDIRS` rows of `viewheight` entries
    yslopes: Vec<Fixed>,
    pub distscale: Vec<Fixed>,

    /// Colourmap numbers by light level and wall scale
    pub scalelight: [[usize; MAXLIGHTSCALE]; LIGHTLEVELS],
    /// Colourmap numbers by light level and plane distance
    pub zlight: [[usize; MAXLIGHTZ]; LIGHTLEVELS],

    pub pspritescale: Fixed,
    pub pspriteiscale: Fixed,

    pub strategy: DrawStrategy,
}

impl ViewTables {
    /// `R_ExecuteSetViewSize`
    pub fn new(screenwidth: i32, screenheight: i32, hires: bool, setblocks: i32, detailshift: i32) -> Self {
        let hires = hires as i32;
        let wide = screenwidth > ORIGWIDTH << hires;

        let mut scaledviewwidth = screenwidth;
        let viewheight;
        if !wide {
            if setblocks >= 11 {
                viewheight = screenheight;
            } else {
                scaledviewwidth = (setblocks * 32) << hires;
                viewheight = (setblocks * 158 / 10) << hires;
            }
        } else if setblocks == 9 || setblocks == 10 {
            viewheight = screenheight - (SBARHEIGHT << hires);
        } else {
            viewheight = screenheight;
        }

        let viewwidth = scaledviewwidth >> detailshift;
        let window = ViewWindow {
            x: (screenwidth - scaledviewwidth) / 2,
            y: if scaledviewwidth == screenwidth {
                0
            } else {
                (screenheight - (SBARHEIGHT << hires) - viewheight) / 2
            },
        };

        let centerx = viewwidth / 2;
        let centerxfrac = centerx << FRACBITS;
        let focalwidth = (((ORIGWIDTH << hires) >> detailshift) / 2) << FRACBITS;
        let projection = if wide {
            centerxfrac.min(focalwidth)
        } else {
            centerxfrac
        };

        let mut tables = Self {
            screenwidth,
            screenheight,
            hires,
            wide,
            setblocks,
            detailshift,
            scaledviewwidth,
            viewwidth,
            viewheight,
            window,
            centerx,
            centerxfrac,
            projection,
            viewangletox: vec![0; FINEANGLES / 2],
            xtoviewangle: vec![0; viewwidth as usize + 1],
            clipangle: 0,
            yslopes: vec![0; LOOKDIRS * viewheight as usize],
            distscale: vec![0; viewwidth as usize],
            scalelight: [[0; MAXLIGHTSCALE]; LIGHTLEVELS],
            zlight: [[0; MAXLIGHTZ]; LIGHTLEVELS],
            pspritescale: FRACUNIT * viewwidth / ORIGWIDTH,
            pspriteiscale: FRACUNIT * ORIGWIDTH / viewwidth.max(1),
            strategy: DrawStrategy::for_detail(detailshift),
        };
        tables.init_texture_mapping(if wide { focalwidth } else { centerxfrac });
        tables.init_yslopes();
        tables.init_light_tables();

        debug!(
            "View size {}x{} in a {}x{} buffer, detail shift {}",
            viewwidth, viewheight, screenwidth, screenheight, detailshift
        );
        tables
    }

    /// `R_InitTextureMapping`
    fn init_texture_mapping(&mut self, focalwidth: Fixed) {
        let focallength = fixed_div(focalwidth, finetangent(FINEANGLES / 4 + FIELDOFVIEW / 2));
        let viewwidth = self.viewwidth;

        for (i, t) in self.viewangletox.iter_mut().enumerate() {
            let tangent = finetangent(i);
            *t = if tangent > FRACUNIT * 2 {
                -1
            } else if tangent < -FRACUNIT * 2 {
                viewwidth + 1
            } else {
                let t = fixed_mul(tangent, focallength);
                ((self.centerxfrac - t + FRACUNIT - 1) >> FRACBITS).clamp(-1, viewwidth + 1)
            };
        }

        // xtoviewangle will give the smallest view angle that maps to x
        for x in 0..=viewwidth {
            let i = self
                .viewangletox
                .iter()
                .position(|&t| t <= x)
                .unwrap_or(FINEANGLES / 2 - 1);
            self.xtoviewangle[x as usize] = ((i as u32) << ANGLETOFINESHIFT).wrapping_sub(ANG90);
        }

        // Take out the fencepost cases
        for t in self.viewangletox.iter_mut() {
            if *t == -1 {
                *t = 0;
            } else if *t == viewwidth + 1 {
                *t = viewwidth;
            }
        }

        self.clipangle = self.xtoviewangle[0];
    }

    fn init_yslopes(&mut self) {
        let viewheight = self.viewheight;
        let num = if self.wide {
            (self.viewwidth << self.detailshift).min(ORIGWIDTH << self.hires) / 2 * FRACUNIT
        } else {
            (self.viewwidth << self.detailshift) / 2 * FRACUNIT
        };
        for j in 0..LOOKDIRS {
            let centery = self.centery_for_pitch(j as i32 - LOOKDIRMIN);
            for i in 0..viewheight {
                let dy = (((i - centery) << FRACBITS) + FRACUNIT / 2).abs();
                self.yslopes[j * viewheight as usize + i as usize] = fixed_div(num, dy);
            }
        }

        for (i, d) in self.distscale.iter_mut().enumerate() {
            let cosadj = finecosine((self.xtoviewangle[i] >> ANGLETOFINESHIFT) as usize).abs();
            *d = fixed_div(FRACUNIT, cosadj);
        }
    }

    /// Scale light depends on the view width, z light does not
    fn init_light_tables(&mut self) {
        let numcolormaps = NUMCOLORMAPS;
        for i in 0..LIGHTLEVELS {
            let startmap = ((LIGHTLEVELS as i32 - 1 - i as i32) * 2) * numcolormaps / LIGHTLEVELS as i32;
            for j in 0..MAXLIGHTSCALE {
                let level = startmap
                    - j as i32 * self.screenwidth / (self.viewwidth << self.detailshift) / DISTMAP;
                self.scalelight[i][j] = level.clamp(0, numcolormaps - 1) as usize;
            }
            for j in 0..MAXLIGHTZ {
                let scale = fixed_div(ORIGWIDTH / 2 * FRACUNIT, (j as i32 + 1) << LIGHTZSHIFT)
                    >> LIGHTSCALESHIFT;
                let level = startmap - scale / DISTMAP;
                self.zlight[i][j] = level.clamp(0, numcolormaps - 1) as usize;
            }
        }
    }

    /// The horizon row for a look pitch
    pub fn centery_for_pitch(&self, pitch: i32) -> i32 {
        let blocks = self.setblocks.min(if self.wide { 9 } else { 11 });
        self.viewheight / 2 + (pitch << self.hires) * blocks / 10
    }

    /// `yslope` for a pitch bucket, `viewheight` entries
    pub fn yslope(&self, bucket: usize) -> &[Fixed] {
        let h = self.viewheight as usize;
        &self.yslopes[bucket * h..(bucket + 1) * h]
    }

    /// Colourmap clip for a wall or sprite scale
    #[inline]
    pub fn scale_light_index(&self, scale: Fixed) -> usize {
        ((scale >> (LIGHTSCALESHIFT + self.hires)) as usize).min(MAXLIGHTSCALE - 1)
    }

    /// Sky columns step at sprite scale
    pub fn sky_iscale(&self) -> Fixed {
        self.pspriteiscale >> self.detailshift
    }
}

/// The effective camera for one frame
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewState {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,
    pub sin: Fixed,
    pub cos: Fixed,
    pub pitch: i32,
    pub centery: i32,
    pub centeryfrac: Fixed,
    /// Which `yslope` row is in use
    pub yslope_bucket: usize,
    pub extralight: i32,
    pub fixedcolormap: Option<usize>,
    pub leveltime: u32,
    pub gametic: u32,
    pub framecount: u32,
    pub validcount: usize,
}

/// Interpolation is skipped on the first tic of a level, when the viewer
/// turned it off, or while paused or in a menu outside of demos and netgames
pub fn should_interpolate(input: &ViewInput) -> bool {
    input.leveltime > 1
        && input.interp
        && !input.paused
        && (!input.menu_active || input.demo_playback || input.netgame)
}

/// The camera position for this frame, and its look pitch in rows
pub fn interpolate(input: &ViewInput) -> (ViewPos, i32) {
    if !should_interpolate(input) {
        return (input.pos, input.pos.lookdir / MLOOKUNIT);
    }
    let prev = &input.prev;
    let cur = &input.pos;
    let frac = input.frac;
    let lerp = |a: Fixed, b: Fixed| a.wrapping_add(fixed_mul(b.wrapping_sub(a), frac));
    let pos = ViewPos {
        x: lerp(prev.x, cur.x),
        y: lerp(prev.y, cur.y),
        z: lerp(prev.z, cur.z),
        angle: lerp_angle(prev.angle, cur.angle, frac),
        lookdir: cur.lookdir,
    };
    let lookdir = prev.lookdir + fixed_mul((cur.lookdir - prev.lookdir) << FRACBITS, frac) / FRACUNIT;
    (pos, lookdir / MLOOKUNIT)
}

impl ViewState {
    /// `R_SetupFrame` minus the table swap, which the renderer does first
    pub fn setup(&mut self, input: &ViewInput, tables: &ViewTables) {
        let (pos, pitch) = interpolate(input);
        self.x = pos.x;
        self.y = pos.y;
        self.z = pos.z;
        self.angle = pos.angle;
        self.extralight = input.extralight;
        self.leveltime = input.leveltime;
        self.gametic = input.gametic;

        self.pitch = pitch.clamp(-LOOKDIRMIN, LOOKDIRMAX);
        self.centery = tables.centery_for_pitch(self.pitch);
        self.centeryfrac = self.centery << FRACBITS;
        self.yslope_bucket = (LOOKDIRMIN + self.pitch) as usize;

        let fine = (self.angle >> ANGLETOFINESHIFT) as usize;
        self.sin = finesine(fine);
        self.cos = finecosine(fine);
        self.fixedcolormap = input.fixedcolormap;
        self.framecount = self.framecount.wrapping_add(1);
        self.validcount = self.validcount.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::{ANG1, ANG45, degrees_to_bam};

    fn near(a: Angle, b: Angle) -> bool {
        (a.wrapping_sub(b) as i32).unsigned_abs() < ANG1
    }

    #[test]
    fn full_view_sizes() {
        let t = ViewTables::new(320, 200, false, 10, 0);
        assert_eq!(t.viewwidth, 320);
        assert_eq!(t.viewheight, 158);
        assert_eq!(t.window, ViewWindow { x: 0, y: 0 });
        assert_eq!(t.projection, 160 << FRACBITS);

        let t = ViewTables::new(320, 200, false, 8, 1);
        assert_eq!(t.scaledviewwidth, 256);
        assert_eq!(t.viewwidth, 128);
        assert_eq!(t.viewheight, 126);
        assert_eq!(t.window.x, 32);
        assert_eq!(t.strategy, DrawStrategy::Low);

        let t = ViewTables::new(640, 400, true, 11, 0);
        assert_eq!((t.viewwidth, t.viewheight), (640, 400));

        // 16:9 keeps the 4:3 projection
        let t = ViewTables::new(854, 480, true, 10, 0);
        assert!(t.wide);
        assert_eq!(t.viewheight, 480 - 84);
        assert_eq!(t.projection, 320 << FRACBITS);
    }

    #[test]
    fn texture_mapping_covers_view() {
        let t = ViewTables::new(320, 200, false, 11, 0);
        assert_eq!(t.xtoviewangle.len(), 321);
        assert!(near(t.clipangle, ANG45));
        assert!(near(t.xtoviewangle[160], 0));
        // Fencepost fix leaves only on screen columns
        assert!(t.viewangletox.iter().all(|&x| (0..=320).contains(&x)));
        assert_eq!(t.viewangletox[0], 320);
        assert_eq!(t.viewangletox[FINEANGLES / 2 - 1], 0);
        // Columns increase as the angle decreases
        assert!(t.xtoviewangle.windows(2).all(|w| (w[0].wrapping_sub(w[1]) as i32) >= 0));
    }

    #[test]
    fn light_tables_darken_with_distance() {
        let t = ViewTables::new(320, 200, false, 11, 0);
        // Brightest light up close is colourmap 0
        assert_eq!(t.scalelight[LIGHTLEVELS - 1][MAXLIGHTSCALE - 1], 0);
        assert_eq!(t.zlight[LIGHTLEVELS - 1][0], 0);
        // Darkest light far away is the darkest map
        assert_eq!(t.scalelight[0][0], 31);
        assert_eq!(t.zlight[0][MAXLIGHTZ - 1], 31);
        for row in t.zlight.iter() {
            assert!(row.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn yslope_follows_pitch() {
        let t = ViewTables::new(320, 200, false, 11, 0);
        let level = t.yslope(LOOKDIRMIN as usize);
        // Symmetric about the centre
        assert_eq!(level[99], level[100]);
        let up = t.yslope(LOOKDIRMIN as usize + 10);
        assert_eq!(t.centery_for_pitch(10), 111);
        assert_eq!(up[110], up[111]);
    }

    #[test]
    fn interpolation_short_arc() {
        let mut input = ViewInput::at(ViewPos {
            angle: degrees_to_bam(10),
            ..ViewPos::default()
        });
        input.prev.angle = degrees_to_bam(350);
        input.prev.x = 0;
        input.pos.x = 10 * FRACUNIT;
        input.frac = FRACUNIT / 2;
        input.interp = true;
        input.leveltime = 5;

        let (pos, _) = interpolate(&input);
        assert!(near(pos.angle, 0));
        assert_eq!(pos.x, 5 * FRACUNIT);

        // First tic of a level is never interpolated
        input.leveltime = 1;
        assert!(near(interpolate(&input).0.angle, degrees_to_bam(10)));

        // Paused in a menu, but a demo keeps it going
        input.leveltime = 5;
        input.menu_active = true;
        assert!(!should_interpolate(&input));
        input.demo_playback = true;
        assert!(should_interpolate(&input));
    }

    #[test]
    fn pitch_moves_horizon() {
        let tables = ViewTables::new(320, 200, false, 11, 0);
        let mut input = ViewInput::at(ViewPos::default());
        let mut view = ViewState::default();

        view.setup(&input, &tables);
        assert_eq!(view.centery, 100);
        assert_eq!(view.yslope_bucket, LOOKDIRMIN as usize);
        assert_eq!(view.validcount, 1);

        input.pos.lookdir = 1000 * MLOOKUNIT;
        view.setup(&input, &tables);
        assert_eq!(view.pitch, LOOKDIRMAX);
        assert_eq!(view.centery, 100 + LOOKDIRMAX * 11 / 10);
        assert_eq!(view.validcount, 2);
    }
}
