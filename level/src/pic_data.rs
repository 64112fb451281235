//! All picture data the renderer samples from:
//! - Wall textures, composed from patches
//! - Flats
//! - Sprite patches
//! - The palette and colourmaps

use std::mem::{size_of, size_of_val};

use log::{debug, info, warn};
use wad::{WadData, WadPalette, WadPatch, WadTexture};

/// Marks a texel with nothing drawn in it. Only masked drawing cares.
pub const TRANSPARENT: usize = usize::MAX;

/// Flats that are drawn through the swirl table when liquid swirling is on
const SWIRL_FLATS: &[&str] = &[
    "NUKAGE1", "NUKAGE2", "NUKAGE3", "FWATER1", "FWATER2", "FWATER3", "FWATER4", "SWATER1",
    "SWATER2", "SWATER3", "SWATER4", "LAVA1", "LAVA2", "LAVA3", "LAVA4", "BLOOD1", "BLOOD2",
    "BLOOD3", "RROCK05", "RROCK06", "RROCK07", "RROCK08", "SLIME01", "SLIME02", "SLIME03",
    "SLIME04", "SLIME05", "SLIME06", "SLIME07", "SLIME08", "SLIME09", "SLIME10", "SLIME11",
    "SLIME12",
];

#[derive(Debug)]
pub struct FlatPic {
    pub name: String,
    /// `data[x][y]`
    pub data: [[u8; 64]; 64],
    pub swirl: bool,
}

#[derive(Debug)]
pub struct WallPic {
    pub name: String,
    /// Column major, `TRANSPARENT` where no patch covers the texel
    pub data: Vec<Vec<usize>>,
    pub height: i32,
}

#[derive(Debug)]
pub struct SpritePic {
    pub name: String,
    pub left_offset: i32,
    pub top_offset: i32,
    pub data: Vec<Vec<usize>>,
}

pub type Colourmap = [u8; 256];

#[derive(Debug)]
pub struct PicData {
    palette: WadPalette,
    /// Usually 34 maps, each u8 being an index in to the palette
    colourmaps: Vec<Colourmap>,
    walls: Vec<WallPic>,
    flats: Vec<FlatPic>,
    sprites: Vec<SpritePic>,
    /// The flat that signifies a sky should be drawn
    sky_num: usize,
    /// The texture drawn for sky planes
    sky_pic: Option<usize>,
}

impl PicData {
    pub fn init(wad: &WadData) -> Self {
        let Some(palette) = wad.palettes().into_iter().next() else {
            panic!("PLAYPAL is shorter than one palette");
        };
        let colourmaps = wad.colourmaps();
        if colourmaps.is_empty() {
            panic!("COLORMAP is shorter than one map");
        } else if colourmaps.len() < 34 {
            warn!("COLORMAP has {} maps, expected 34", colourmaps.len());
        }
        let walls = Self::init_wall_pics(wad);
        let sky_pic = walls.iter().position(|w| w.name == "SKY1");
        if sky_pic.is_none() {
            warn!("No SKY1 texture, sky planes will not be drawn");
        }
        let (flats, sky_num) = Self::init_flat_pics(wad);
        let sprites: Vec<SpritePic> = wad.sprites().iter().map(Self::build_sprite_pic).collect();

        info!(
            "Init image data: {} textures, {} flats, {} sprite patches",
            walls.len(),
            flats.len(),
            sprites.len()
        );

        Self {
            palette,
            colourmaps,
            walls,
            flats,
            sprites,
            sky_num,
            sky_pic,
        }
    }

    fn init_wall_pics(wad: &WadData) -> Vec<WallPic> {
        let pnames = wad.pnames();
        let patches: Vec<Option<WadPatch>> = pnames
            .iter()
            .map(|name| {
                let patch = wad.patch(name);
                if patch.is_none() {
                    warn!("Missing patch: {name}");
                }
                patch
            })
            .collect();

        let mut textures = wad.textures("TEXTURE1");
        textures.append(&mut wad.textures("TEXTURE2"));

        let mut texture_alloc_size = 0;
        let walls: Vec<WallPic> = textures
            .into_iter()
            .map(|tex| {
                let pic = Self::build_wall_pic(tex, &patches);
                texture_alloc_size += size_of_val(&pic.name);
                for col in &pic.data {
                    texture_alloc_size += size_of::<usize>() * col.len();
                }
                pic
            })
            .collect();
        debug!(
            "Total memory used for textures: {} KiB",
            texture_alloc_size / 1024
        );
        walls
    }

    fn init_flat_pics(wad: &WadData) -> (Vec<FlatPic>, usize) {
        let mut flats: Vec<FlatPic> = wad
            .flats()
            .into_iter()
            .map(|wf| {
                let mut flat = FlatPic {
                    swirl: SWIRL_FLATS.contains(&wf.name.as_str()),
                    name: wf.name,
                    data: [[0; 64]; 64],
                };
                if wf.data.len() != 64 * 64 {
                    warn!("Flat {} was not 64x64 in size", flat.name);
                }
                for (y, row) in wf.data.chunks(64).take(64).enumerate() {
                    for (x, px) in row.iter().enumerate() {
                        flat.data[x][y] = *px;
                    }
                }
                flat
            })
            .collect();

        let sky_num = match flats.iter().position(|f| f.name == "F_SKY1") {
            Some(num) => num,
            None => {
                warn!("No F_SKY1 flat, adding a blank one");
                flats.push(FlatPic {
                    name: "F_SKY1".to_string(),
                    data: [[0; 64]; 64],
                    swirl: false,
                });
                flats.len() - 1
            }
        };
        debug!(
            "Total memory used for flats: {} KiB",
            flats.len() * size_of::<FlatPic>() / 1024
        );
        (flats, sky_num)
    }

    /// Build a texture out of patches and return it
    fn build_wall_pic(texture: WadTexture, patches: &[Option<WadPatch>]) -> WallPic {
        let mut compose = vec![vec![TRANSPARENT; texture.height as usize]; texture.width as usize];
        for tex_patch in texture.patches.iter() {
            let Some(Some(patch)) = patches.get(tex_patch.patch_index) else {
                continue;
            };
            // Negative origins start at 0, as the DOS renderer did
            let mut x_pos = tex_patch.origin_x.max(0);
            for posts in patch.columns.iter() {
                if x_pos >= texture.width as i32 {
                    break;
                }
                for post in posts {
                    for (y, p) in post.pixels.iter().enumerate() {
                        let y_pos = y as i32 + tex_patch.origin_y + post.top_delta;
                        if y_pos >= 0 && y_pos < texture.height as i32 {
                            compose[x_pos as usize][y_pos as usize] = *p as usize;
                        }
                    }
                }
                x_pos += 1;
            }
        }

        debug!("Built texture: {}", &texture.name);
        WallPic {
            name: texture.name,
            data: compose,
            height: texture.height as i32,
        }
    }

    fn build_sprite_pic(patch: &WadPatch) -> SpritePic {
        let mut data = vec![vec![TRANSPARENT; patch.height as usize]; patch.width as usize];
        for (x, posts) in patch.columns.iter().enumerate() {
            for post in posts {
                for (y, p) in post.pixels.iter().enumerate() {
                    let y_pos = y as i32 + post.top_delta;
                    if y_pos >= 0 && y_pos < patch.height as i32 {
                        data[x][y_pos as usize] = *p as usize;
                    }
                }
            }
        }
        SpritePic {
            name: patch.name.clone(),
            left_offset: patch.left_offset as i32,
            top_offset: patch.top_offset as i32,
            data,
        }
    }

    pub fn palette(&self) -> &WadPalette {
        &self.palette
    }

    pub fn num_colourmaps(&self) -> usize {
        self.colourmaps.len()
    }

    /// A colourmap by index. Out of range indexes get the darkest map present.
    pub fn colourmap(&self, index: usize) -> &Colourmap {
        &self.colourmaps[index.min(self.colourmaps.len() - 1)]
    }

    pub fn sky_num(&self) -> usize {
        self.sky_num
    }

    pub fn sky_pic(&self) -> Option<usize> {
        self.sky_pic
    }

    pub fn set_sky_pic(&mut self, name: &str) {
        match self.wallpic_num_for_name(name) {
            Some(num) => self.sky_pic = Some(num),
            None => warn!("No sky texture {name}, keeping the current one"),
        }
    }

    pub fn get_texture(&self, num: usize) -> &WallPic {
        &self.walls[num]
    }

    pub fn texture_height(&self, num: usize) -> i32 {
        self.walls[num].height
    }

    pub fn get_flat(&self, num: usize) -> &FlatPic {
        &self.flats[num]
    }

    pub fn num_textures(&self) -> usize {
        self.walls.len()
    }

    pub fn num_flats(&self) -> usize {
        self.flats.len()
    }

    pub fn wallpic_num_for_name(&self, name: &str) -> Option<usize> {
        self.walls
            .iter()
            .position(|tex| tex.name.eq_ignore_ascii_case(name))
    }

    pub fn flat_num_for_name(&self, name: &str) -> Option<usize> {
        self.flats
            .iter()
            .position(|flat| flat.name.eq_ignore_ascii_case(name))
    }

    /// Return a ref to the specified column of the requested texture. Columns
    /// wrap in both directions.
    pub fn wall_pic_column(&self, texture: usize, texture_column: i32) -> &[usize] {
        let texture = &self.walls[texture];
        let column = texture_column.rem_euclid(texture.data.len() as i32);
        &texture.data[column as usize]
    }

    pub fn sprite_num_for_name(&self, name: &str) -> Option<usize> {
        self.sprites
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sprite_patch(&self, num: usize) -> &SpritePic {
        &self.sprites[num]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wad::{WadBuilder, WadPost, WadTexPatch};

    fn patch(name: &str, width: u16, height: u16, pixel: u8) -> WadPatch {
        WadPatch {
            name: name.into(),
            width,
            height,
            left_offset: 0,
            top_offset: 0,
            columns: (0..width)
                .map(|_| {
                    vec![WadPost {
                        top_delta: 0,
                        pixels: vec![pixel; height as usize],
                    }]
                })
                .collect(),
        }
    }

    #[test]
    fn compose_clamps_negative_origin() {
        let mut b = WadBuilder::new();
        b.add_lump("P1", WadBuilder::patch_lump(&patch("P1", 2, 2, 5)));
        b.add_textures(
            &["P1".to_string()],
            &[WadTexture {
                name: "WALL".into(),
                width: 4,
                height: 4,
                patches: vec![WadTexPatch {
                    origin_x: -3,
                    origin_y: 1,
                    patch_index: 0,
                }],
            }],
        );
        let pics = PicData::init(&b.into_wad());

        let wall = pics.get_texture(0);
        assert_eq!(wall.data[0], vec![TRANSPARENT, 5, 5, TRANSPARENT]);
        assert_eq!(wall.data[1][2], 5);
        assert_eq!(wall.data[2], vec![TRANSPARENT; 4]);
        // Columns wrap
        assert_eq!(pics.wall_pic_column(0, -4), pics.wall_pic_column(0, 0));
        assert_eq!(pics.wall_pic_column(0, 5), pics.wall_pic_column(0, 1));
    }

    #[test]
    fn sky_flat_always_exists() {
        let mut b = WadBuilder::new();
        b.add_lump("F_START", vec![]);
        b.add_lump("NUKAGE1", vec![1; 4096]);
        b.add_lump("FLOOR4_8", vec![2; 4096]);
        b.add_lump("F_END", vec![]);
        let pics = PicData::init(&b.into_wad());

        assert_eq!(pics.sky_num(), 2);
        assert_eq!(pics.flat_num_for_name("f_sky1"), Some(2));
        assert!(pics.get_flat(0).swirl);
        assert!(!pics.get_flat(1).swirl);
        assert_eq!(pics.sky_pic(), None);
        // Missing COLORMAP degrades to the identity map
        assert_eq!(pics.colourmap(40)[7], 7);
    }
}
