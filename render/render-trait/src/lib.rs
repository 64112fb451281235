use level::{MapData, PicData};
use math::{Angle, FRACUNIT, Fixed};
use wad::WadPalette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSize {
    hi_res: bool,
    width_usize: usize,
    height_usize: usize,
    width: i32,
    height: i32,
}

impl BufferSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self {
            hi_res: height > 200,
            width_usize: width,
            height_usize: height,
            width: width as i32,
            height: height as i32,
        }
    }

    pub const fn hi_res(&self) -> bool {
        self.hi_res
    }

    // todo, need const traits stabilised
    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    pub const fn half_width(&self) -> i32 {
        self.width / 2
    }

    pub const fn half_height(&self) -> i32 {
        self.height / 2
    }

    pub const fn width_usize(&self) -> usize {
        self.width_usize
    }

    pub const fn height_usize(&self) -> usize {
        self.height_usize
    }
}

/// An 8-bit indexed surface. Every value written is a palette index.
pub trait PixelBuffer {
    fn size(&self) -> &BufferSize;
    fn clear(&mut self);
    fn clear_with_colour(&mut self, colour: u8);
    fn set_pixel(&mut self, x: usize, y: usize, colour: u8);
    fn read_pixel(&self, x: usize, y: usize) -> u8;
    fn buf_mut(&mut self) -> &mut [u8];
    /// The pitch that should be added/subtracted to go up or down the Y while
    /// keeping X position
    fn pitch(&self) -> usize;
    /// Get an index point for this coord
    fn get_buf_index(&self, x: usize, y: usize) -> usize;
}

/// A plain in-memory `PixelBuffer`
pub struct Framebuffer {
    size: BufferSize,
    buffer: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            size: BufferSize::new(width, height),
            buffer: vec![0; width * height],
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Expand the indexed pixels through a palette, three bytes per pixel
    pub fn to_rgb(&self, palette: &WadPalette) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.buffer.len() * 3);
        for &index in &self.buffer {
            let c = palette.0[index as usize];
            rgb.extend_from_slice(&[c.r, c.g, c.b]);
        }
        rgb
    }
}

impl PixelBuffer for Framebuffer {
    fn size(&self) -> &BufferSize {
        &self.size
    }

    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    fn clear_with_colour(&mut self, colour: u8) {
        self.buffer.fill(colour);
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, colour: u8) {
        #[cfg(feature = "safety_check")]
        if x >= self.size.width_usize() || y >= self.size.height_usize() {
            panic!(
                "set_pixel: {x},{y} is outside {}x{}",
                self.size.width(),
                self.size.height()
            );
        }
        let pos = y * self.size.width_usize() + x;
        self.buffer[pos] = colour;
    }

    #[inline]
    fn read_pixel(&self, x: usize, y: usize) -> u8 {
        self.buffer[y * self.size.width_usize() + x]
    }

    fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    fn pitch(&self) -> usize {
        self.size.width_usize()
    }

    #[inline]
    fn get_buf_index(&self, x: usize, y: usize) -> usize {
        y * self.size.width_usize() + x
    }
}

/// A camera position. `lookdir` is the raw look pitch, `MLOOKUNIT` steps per
/// screen row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ViewPos {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,
    pub lookdir: i32,
}

/// Everything the renderer needs to know about the viewer and game state for
/// one frame
#[derive(Debug, Clone, Copy)]
pub struct ViewInput {
    pub pos: ViewPos,
    /// Position at the previous tic, interpolated toward `pos`
    pub prev: ViewPos,
    pub fixedcolormap: Option<usize>,
    pub extralight: i32,
    /// The viewer's own interpolation flag
    pub interp: bool,
    pub leveltime: u32,
    pub gametic: u32,
    /// How far between `prev` and `pos` this frame falls, `0..FRACUNIT`
    pub frac: Fixed,
    pub paused: bool,
    pub menu_active: bool,
    pub demo_playback: bool,
    pub netgame: bool,
}

impl ViewInput {
    /// A still camera at `pos`
    pub fn at(pos: ViewPos) -> Self {
        Self {
            pos,
            prev: pos,
            fixedcolormap: None,
            extralight: 0,
            interp: false,
            leveltime: 0,
            gametic: 0,
            frac: FRACUNIT,
            paused: false,
            menu_active: false,
            demo_playback: false,
            netgame: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// 3 to 11, 10 and up fill the width
    pub screenblocks: i32,
    /// 0 is full horizontal resolution, 1 doubles each column
    pub detailshift: i32,
    pub hires: bool,
    pub fake_contrast: bool,
    pub brightmaps: bool,
    /// Sky also takes the fixed colourmap
    pub invul_sky: bool,
    pub swirling_flats: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            screenblocks: 10,
            detailshift: 0,
            hires: false,
            fake_contrast: true,
            brightmaps: false,
            invul_sky: false,
            swirling_flats: true,
        }
    }
}

pub trait PlayViewRenderer {
    /// Doom function name `R_RenderPlayerView`
    fn render_player_view(
        &mut self,
        view: &ViewInput,
        map: &mut MapData,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use wad::WadColour;

    #[test]
    fn hi_res_above_200_rows() {
        assert!(!BufferSize::new(320, 200).hi_res());
        assert!(BufferSize::new(640, 400).hi_res());
        assert_eq!(BufferSize::new(640, 400).half_width(), 320);
    }

    #[test]
    fn framebuffer_rgb() {
        let mut fb = Framebuffer::new(4, 2);
        fb.set_pixel(3, 1, 2);
        assert_eq!(fb.read_pixel(3, 1), 2);
        assert_eq!(fb.get_buf_index(3, 1), 7);

        let mut pal = [WadColour::default(); 256];
        pal[2] = WadColour { r: 1, g: 2, b: 3 };
        let rgb = fb.to_rgb(&WadPalette(pal));
        assert_eq!(rgb.len(), 24);
        assert_eq!(&rgb[21..], &[1, 2, 3]);
        assert_eq!(&rgb[..3], &[0, 0, 0]);
    }
}
