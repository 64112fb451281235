//! Picture lumps: palettes, colourmaps, patches, composite texture
//! definitions, and flats.

use log::{debug, warn};

use crate::{WadData, name_from_bytes};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WadColour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// One 256 colour palette from `PLAYPAL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadPalette(pub [WadColour; 256]);

/// A run of opaque pixels in a patch column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadPost {
    pub top_delta: i32,
    pub pixels: Vec<u8>,
}

/// A patch is a column-major picture with transparent gaps. Each column is a
/// list of posts.
///
/// | Field Size | Data Type | Content                          |
/// |------------|-----------|----------------------------------|
/// | 0x00-0x01  | i16       | Width                            |
/// | 0x02-0x03  | i16       | Height                           |
/// | 0x04-0x05  | i16       | Left offset                      |
/// | 0x06-0x07  | i16       | Top offset                       |
/// | 0x08-      | u32[w]    | Offset of each column's posts    |
///
/// Each post is `top_delta: u8, length: u8, pad: u8, pixels[length], pad: u8`
/// and a column ends with a `top_delta` of 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadPatch {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub left_offset: i16,
    pub top_offset: i16,
    pub columns: Vec<Vec<WadPost>>,
}

impl WadPatch {
    pub fn from_lump(name: &str, lump: &[u8]) -> WadPatch {
        if lump.len() < 8 {
            panic!("Patch {} is too short: {} bytes", name, lump.len());
        }
        let width = WadData::read_2_bytes(0, lump);
        let height = WadData::read_2_bytes(2, lump);
        let left_offset = WadData::read_2_bytes(4, lump) as i16;
        let top_offset = WadData::read_2_bytes(6, lump) as i16;

        let mut columns = Vec::with_capacity(width as usize);
        for x in 0..width as usize {
            let offs_at = 8 + x * 4;
            if offs_at + 4 > lump.len() {
                panic!("Patch {} column table is truncated", name);
            }
            let mut offset = WadData::read_4_bytes(offs_at, lump) as usize;
            let mut posts = Vec::new();
            let mut top_delta = -1;
            while offset < lump.len() && lump[offset] != 0xFF {
                let delta = lump[offset] as i32;
                // Tall patches stack deltas once they stop increasing
                top_delta = if delta <= top_delta {
                    top_delta + delta
                } else {
                    delta
                };
                let len = lump.get(offset + 1).copied().unwrap_or(0) as usize;
                let start = offset + 3;
                let end = (start + len).min(lump.len());
                posts.push(WadPost {
                    top_delta,
                    pixels: lump[start.min(end)..end].to_vec(),
                });
                offset += len + 4;
            }
            columns.push(posts);
        }

        WadPatch {
            name: name.to_owned(),
            width,
            height,
            left_offset,
            top_offset,
            columns,
        }
    }
}

/// A patch placed inside a composite texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadTexPatch {
    pub origin_x: i32,
    pub origin_y: i32,
    /// Index in to `PNAMES`
    pub patch_index: usize,
}

/// A composite wall texture from `TEXTURE1`/`TEXTURE2`
///
/// | Field Size | Data Type    | Content                         |
/// |------------|--------------|---------------------------------|
/// | 0x00-0x07  | 8 ASCII char | Name                            |
/// | 0x08-0x0B  | u32          | Masked flag (unused)            |
/// | 0x0C-0x0D  | i16          | Width                           |
/// | 0x0E-0x0F  | i16          | Height                          |
/// | 0x10-0x13  | u32          | Column directory (unused)       |
/// | 0x14-0x15  | i16          | Patch count                     |
/// | 0x16-      | 10 B each    | origin x, origin y, patch, 2 unused |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadTexture {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub patches: Vec<WadTexPatch>,
}

/// A 64x64 floor or ceiling picture, row major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadFlat {
    pub name: String,
    pub data: Vec<u8>,
}

impl WadData {
    pub fn palettes(&self) -> Vec<WadPalette> {
        let Some(lump) = self.get_lump("PLAYPAL") else {
            warn!("No PLAYPAL, using a greyscale palette");
            let mut pal = [WadColour::default(); 256];
            for (i, c) in pal.iter_mut().enumerate() {
                *c = WadColour {
                    r: i as u8,
                    g: i as u8,
                    b: i as u8,
                };
            }
            return vec![WadPalette(pal)];
        };
        lump.chunks_exact(768)
            .map(|chunk| {
                let mut pal = [WadColour::default(); 256];
                for (c, rgb) in pal.iter_mut().zip(chunk.chunks_exact(3)) {
                    *c = WadColour {
                        r: rgb[0],
                        g: rgb[1],
                        b: rgb[2],
                    };
                }
                WadPalette(pal)
            })
            .collect()
    }

    /// Every 256 byte light map in `COLORMAP`, brightest first
    pub fn colourmaps(&self) -> Vec<[u8; 256]> {
        let Some(lump) = self.get_lump("COLORMAP") else {
            warn!("No COLORMAP, using an identity map");
            let mut map = [0u8; 256];
            for (i, c) in map.iter_mut().enumerate() {
                *c = i as u8;
            }
            return vec![map];
        };
        lump.chunks_exact(256)
            .map(|chunk| {
                let mut map = [0u8; 256];
                map.copy_from_slice(chunk);
                map
            })
            .collect()
    }

    pub fn pnames(&self) -> Vec<String> {
        let Some(lump) = self.get_lump("PNAMES") else {
            return Vec::new();
        };
        let count = WadData::read_4_bytes(0, lump) as usize;
        (0..count)
            .filter_map(|i| lump.get(4 + i * 8..12 + i * 8))
            .map(name_from_bytes)
            .collect()
    }

    pub fn patch(&self, name: &str) -> Option<WadPatch> {
        self.get_lump(name).map(|lump| WadPatch::from_lump(name, lump))
    }

    /// Texture definitions from `TEXTURE1` or `TEXTURE2`
    pub fn textures(&self, lump_name: &str) -> Vec<WadTexture> {
        let Some(lump) = self.get_lump(lump_name) else {
            return Vec::new();
        };
        let count = WadData::read_4_bytes(0, lump) as usize;
        let mut textures = Vec::with_capacity(count);
        for i in 0..count {
            let offset = WadData::read_4_bytes(4 + i * 4, lump) as usize;
            if offset + 22 > lump.len() {
                panic!("{}: texture {} is truncated", lump_name, i);
            }
            let patch_count = WadData::read_2_bytes(offset + 20, lump) as usize;
            let patches = (0..patch_count)
                .map(|p| {
                    let at = offset + 22 + p * 10;
                    WadTexPatch {
                        origin_x: WadData::read_2_bytes(at, lump) as i16 as i32,
                        origin_y: WadData::read_2_bytes(at + 2, lump) as i16 as i32,
                        patch_index: WadData::read_2_bytes(at + 4, lump) as usize,
                    }
                })
                .collect();
            let tex = WadTexture {
                name: name_from_bytes(&lump[offset..offset + 8]),
                width: WadData::read_2_bytes(offset + 12, lump),
                height: WadData::read_2_bytes(offset + 14, lump),
                patches,
            };
            debug!("Read texture definition {}", tex.name);
            textures.push(tex);
        }
        textures
    }

    /// Flats sit between `F_START` and `F_END`. Nested `F1_START` style
    /// markers are zero sized and skipped.
    pub fn flats(&self) -> Vec<WadFlat> {
        let mut flats: Vec<WadFlat> = Vec::new();
        let mut inside = false;
        for info in &self.lumps {
            match info.name.as_str() {
                "F_START" | "FF_START" => inside = true,
                "F_END" | "FF_END" => inside = false,
                _ if inside && info.lump_size > 0 => {
                    // A PWAD flat with the same name replaces the IWAD one
                    let data = self.lump_data(info).to_vec();
                    if let Some(existing) = flats.iter_mut().find(|f| f.name == info.name) {
                        existing.data = data;
                    } else {
                        flats.push(WadFlat {
                            name: info.name.clone(),
                            data,
                        });
                    }
                }
                _ => {}
            }
        }
        flats
    }

    /// Sprite patches sit between `S_START` and `S_END`
    pub fn sprites(&self) -> Vec<WadPatch> {
        let mut inside = false;
        let mut sprites: Vec<WadPatch> = Vec::new();
        for info in &self.lumps {
            match info.name.as_str() {
                "S_START" | "SS_START" => inside = true,
                "S_END" | "SS_END" => inside = false,
                _ if inside && info.lump_size > 0 => {
                    let patch = WadPatch::from_lump(&info.name, self.lump_data(info));
                    if let Some(existing) = sprites.iter_mut().find(|s| s.name == info.name) {
                        *existing = patch;
                    } else {
                        sprites.push(patch);
                    }
                }
                _ => {}
            }
        }
        sprites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WadBuilder;

    #[test]
    fn patch_posts() {
        let patch = WadPatch {
            name: "TEST".into(),
            width: 2,
            height: 4,
            left_offset: 1,
            top_offset: 2,
            columns: vec![
                vec![WadPost {
                    top_delta: 0,
                    pixels: vec![1, 2],
                }],
                vec![
                    WadPost {
                        top_delta: 1,
                        pixels: vec![3],
                    },
                    WadPost {
                        top_delta: 3,
                        pixels: vec![4],
                    },
                ],
            ],
        };
        let bytes = WadBuilder::patch_lump(&patch);
        let read = WadPatch::from_lump("TEST", &bytes);
        assert_eq!(read, patch);
    }

    #[test]
    fn textures_and_flats() {
        let mut b = WadBuilder::new();
        b.add_lump("F_START", vec![]);
        b.add_lump("FLAT1", vec![7; 4096]);
        b.add_lump("F_END", vec![]);
        b.add_textures(
            &["WALL".to_string()],
            &[WadTexture {
                name: "BIGDOOR1".into(),
                width: 128,
                height: 96,
                patches: vec![WadTexPatch {
                    origin_x: -4,
                    origin_y: 0,
                    patch_index: 0,
                }],
            }],
        );
        let wad = WadData::from_bytes(b.build());

        let flats = wad.flats();
        assert_eq!(flats.len(), 1);
        assert_eq!(flats[0].name, "FLAT1");
        assert_eq!(wad.pnames(), vec!["WALL".to_string()]);
        let tex = wad.textures("TEXTURE1");
        assert_eq!(tex[0].name, "BIGDOOR1");
        assert_eq!(tex[0].height, 96);
        assert_eq!(tex[0].patches[0].origin_x, -4);
        assert!(wad.textures("TEXTURE2").is_empty());
        assert!(wad.sprites().is_empty());
    }

    #[test]
    fn pwad_sprite_replaces_iwad_sprite() {
        let patch = |pixel| WadPatch {
            name: "TROOA1".into(),
            width: 1,
            height: 1,
            left_offset: 0,
            top_offset: 0,
            columns: vec![vec![WadPost {
                top_delta: 0,
                pixels: vec![pixel],
            }]],
        };
        let mut b = WadBuilder::new();
        b.add_lump("S_START", vec![]);
        b.add_lump("TROOA1", WadBuilder::patch_lump(&patch(3)));
        b.add_lump("S_END", vec![]);
        b.add_lump("SS_START", vec![]);
        b.add_lump("TROOA1", WadBuilder::patch_lump(&patch(9)));
        b.add_lump("SS_END", vec![]);
        let wad = WadData::from_bytes(b.build());

        let sprites = wad.sprites();
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].columns[0][0].pixels, vec![9]);
    }

    #[test]
    fn missing_palette_falls_back() {
        let wad = WadData::from_bytes(WadBuilder::new().build());
        assert_eq!(wad.palettes().len(), 1);
        assert_eq!(wad.colourmaps()[0][200], 200);
    }
}
