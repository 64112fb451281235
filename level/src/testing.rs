//! A small synthetic level for tests, so nothing needs a commercial IWAD.
//!
//! Two 256x256 rooms side by side, joined by a two-sided line at x = 256:
//!
//! ```text
//!  (0,256) v1 ──L1── v2 (256,256) ──L4── v3 (512,256)
//!          |          :                   |
//!         L0  room A  L2     room B      L5
//!          |  sector 0:      sector 1     |
//!  (0,0)   v0 ──L3── v5 (256,0)   ──L6── v4 (512,0)
//! ```
//!
//! Room A is floor 0, ceiling 128. Room B is floor 16, ceiling 112 with a
//! sky ceiling and a swirling floor. The front of L2 carries the masked
//! `GRATE` texture. Player 1 starts in room A facing east.

use math::{FRACBITS, Fixed};
use wad::*;

use crate::{LoadOptions, MapData, PicData};

pub const MAP_NAME: &str = "E1M1";
pub const PLAYER_X: Fixed = 64 << FRACBITS;
pub const PLAYER_Y: Fixed = 128 << FRACBITS;

/// Texel values used by the pictures, all drawn through identity colourmaps
pub const WALL_PIXEL: u8 = 100;
pub const GRATE_PIXEL: u8 = 90;
pub const SKY_PIXEL: u8 = 7;
pub const FLOOR_PIXEL: u8 = 40;
pub const CEIL_PIXEL: u8 = 50;
pub const NUKAGE_PIXEL: u8 = 60;
pub const SPRITE_PIXEL: u8 = 120;

/// A 16x32 sprite patch, origin at the bottom centre
pub const SPRITE_NAME: &str = "BAR1A0";

fn solid_patch(name: &str, width: u16, height: u16, pixel: u8) -> WadPatch {
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

fn texture(name: &str, width: u16, height: u16, patch_index: usize) -> WadTexture {
    WadTexture {
        name: name.into(),
        width,
        height,
        patches: vec![WadTexPatch {
            origin_x: 0,
            origin_y: 0,
            patch_index,
        }],
    }
}

/// Palette, colourmaps, flats, patches and textures shared by test levels
pub fn add_pics(b: &mut WadBuilder) {
    let mut playpal = Vec::with_capacity(768);
    for i in 0..=255u8 {
        playpal.extend_from_slice(&[i, 255 - i, i / 2]);
    }
    b.add_lump("PLAYPAL", playpal);

    let mut colormap = Vec::with_capacity(34 * 256);
    for _ in 0..34 {
        colormap.extend(0..=255u8);
    }
    b.add_lump("COLORMAP", colormap);

    b.add_lump("F_START", vec![]);
    b.add_lump("F_SKY1", vec![SKY_PIXEL; 4096]);
    b.add_lump("FLOOR4_8", vec![FLOOR_PIXEL; 4096]);
    b.add_lump("CEIL3_5", vec![CEIL_PIXEL; 4096]);
    b.add_lump("NUKAGE1", vec![NUKAGE_PIXEL; 4096]);
    b.add_lump("F_END", vec![]);

    let grate = WadPatch {
        columns: (0..64)
            .map(|x| {
                if x % 2 == 0 {
                    vec![WadPost {
                        top_delta: 0,
                        pixels: vec![GRATE_PIXEL; 64],
                    }]
                } else {
                    Vec::new()
                }
            })
            .collect(),
        ..solid_patch("GRATEP", 64, 64, 0)
    };
    b.add_lump("P_START", vec![]);
    b.add_lump("WALLP", WadBuilder::patch_lump(&solid_patch("WALLP", 64, 128, WALL_PIXEL)));
    b.add_lump("SKYP", WadBuilder::patch_lump(&solid_patch("SKYP", 256, 128, SKY_PIXEL)));
    b.add_lump("GRATEP", WadBuilder::patch_lump(&grate));
    b.add_lump("P_END", vec![]);

    let sprite = WadPatch {
        left_offset: 8,
        top_offset: 32,
        ..solid_patch(SPRITE_NAME, 16, 32, SPRITE_PIXEL)
    };
    b.add_lump("S_START", vec![]);
    b.add_lump(SPRITE_NAME, WadBuilder::patch_lump(&sprite));
    b.add_lump("S_END", vec![]);

    b.add_textures(
        &["WALLP".to_string(), "SKYP".to_string(), "GRATEP".to_string()],
        &[
            texture("WALL", 64, 128, 0),
            texture("SKY1", 256, 128, 1),
            texture("GRATE", 64, 64, 2),
        ],
    );
}

fn side(sector: u16, upper: &str, lower: &str, middle: &str) -> WadSideDef {
    WadSideDef {
        x_offset: 0,
        y_offset: 0,
        upper_tex: upper.into(),
        lower_tex: lower.into(),
        middle_tex: middle.into(),
        sector,
    }
}

fn sector(floor: i16, ceil: i16, floor_tex: &str, ceil_tex: &str, light: i16) -> WadSector {
    WadSector {
        floor_height: floor,
        ceil_height: ceil,
        floor_tex: floor_tex.into(),
        ceil_tex: ceil_tex.into(),
        light_level: light,
        kind: 0,
        tag: 0,
    }
}

/// Map lumps of the two room level
pub fn add_two_rooms(b: &mut WadBuilder) {
    const BLOCKING: u16 = 1;
    const TWO_SIDED: u16 = 4;
    b.add_map_lumps(
        MAP_NAME,
        &[
            WadThing::new(64, 128, 0, 1, 7),
            WadThing::new(384, 64, 90, 3001, 7),
        ],
        &[
            WadLineDef::new(0, 1, BLOCKING, 0, 0, 0, NO_INDEX),
            WadLineDef::new(1, 2, BLOCKING, 0, 0, 1, NO_INDEX),
            WadLineDef::new(2, 5, TWO_SIDED, 0, 0, 2, 3),
            WadLineDef::new(5, 0, BLOCKING, 0, 0, 4, NO_INDEX),
            WadLineDef::new(2, 3, BLOCKING, 0, 0, 5, NO_INDEX),
            WadLineDef::new(3, 4, BLOCKING, 0, 0, 6, NO_INDEX),
            WadLineDef::new(4, 5, BLOCKING, 0, 0, 7, NO_INDEX),
        ],
        &[
            side(0, "-", "-", "WALL"),
            side(0, "-", "-", "WALL"),
            side(0, "WALL", "WALL", "GRATE"),
            side(1, "-", "-", "-"),
            side(0, "-", "-", "WALL"),
            side(1, "-", "-", "WALL"),
            side(1, "-", "-", "WALL"),
            side(1, "-", "-", "WALL"),
        ],
        &[
            WadVertex::new(0, 0),
            WadVertex::new(0, 256),
            WadVertex::new(256, 256),
            WadVertex::new(512, 256),
            WadVertex::new(512, 0),
            WadVertex::new(256, 0),
        ],
        &[
            WadSegment::new(0, 1, 0x4000, 0, 0, 0),
            WadSegment::new(1, 2, 0, 1, 0, 0),
            WadSegment::new(2, 5, 0xC000, 2, 0, 0),
            WadSegment::new(5, 0, 0x8000, 3, 0, 0),
            WadSegment::new(5, 2, 0x4000, 2, 1, 0),
            WadSegment::new(2, 3, 0, 4, 0, 0),
            WadSegment::new(3, 4, 0xC000, 5, 0, 0),
            WadSegment::new(4, 5, 0x8000, 6, 0, 0),
        ],
        &[WadSubSector::new(4, 0), WadSubSector::new(4, 4)],
        &[WadNode::new(
            256,
            0,
            0,
            256,
            [[256, 0, 256, 512], [256, 0, 0, 256]],
            0x8000 | 1,
            0x8000,
        )],
        &[
            sector(0, 128, "FLOOR4_8", "CEIL3_5", 160),
            sector(16, 112, "NUKAGE1", "F_SKY1", 128),
        ],
    );
}

pub fn two_room_wad() -> WadData {
    let mut b = WadBuilder::new();
    add_pics(&mut b);
    add_two_rooms(&mut b);
    b.into_wad()
}

/// Load the two room level and its pictures
pub fn two_room_map(options: LoadOptions) -> (WadData, PicData, MapData) {
    let wad = two_room_wad();
    let pic_data = PicData::init(&wad);
    let mut map = MapData::default();
    map.load(MAP_NAME, &pic_data, &wad, options);
    (wad, pic_data, map)
}
