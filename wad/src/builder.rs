//! Writes WAD images. Used to produce small PWADs in memory, which is how
//! the map loader and renderer are exercised without a commercial IWAD.

use crate::lumps::*;
use crate::{WadData, WadPatch, WadTexture};

#[derive(Debug, Default, Clone)]
pub struct WadBuilder {
    lumps: Vec<(String, Vec<u8>)>,
}

fn put_name(out: &mut Vec<u8>, name: &str) {
    let mut bytes = [0u8; 8];
    for (b, c) in bytes.iter_mut().zip(name.bytes()) {
        *b = c;
    }
    out.extend_from_slice(&bytes);
}

fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl WadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lump(&mut self, name: &str, data: Vec<u8>) -> &mut Self {
        self.lumps.push((name.to_ascii_uppercase(), data));
        self
    }

    /// Swap the data of the most recently added lump with this name
    pub fn replace_lump(&mut self, name: &str, data: Vec<u8>) -> &mut Self {
        let lump = self
            .lumps
            .iter_mut()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .unwrap_or_else(|| panic!("No lump {} to replace", name));
        lump.1 = data;
        self
    }

    /// Write a map marker and its ten lumps. `REJECT` and `BLOCKMAP` are left
    /// empty; use `replace_lump` to fill them.
    #[allow(clippy::too_many_arguments)]
    pub fn add_map_lumps(
        &mut self,
        map_name: &str,
        things: &[WadThing],
        linedefs: &[WadLineDef],
        sidedefs: &[WadSideDef],
        vertexes: &[WadVertex],
        segments: &[WadSegment],
        subsectors: &[WadSubSector],
        nodes: &[WadNode],
        sectors: &[WadSector],
    ) -> &mut Self {
        self.add_lump(map_name, Vec::new());

        let mut out = Vec::with_capacity(things.len() * THING_SIZE);
        for t in things {
            for v in [t.x, t.y, t.angle, t.kind, t.flags] {
                put_i16(&mut out, v);
            }
        }
        self.add_lump("THINGS", out);

        let mut out = Vec::with_capacity(linedefs.len() * LINEDEF_SIZE);
        for l in linedefs {
            put_u16(&mut out, l.start_vertex);
            put_u16(&mut out, l.end_vertex);
            put_u16(&mut out, l.flags);
            put_i16(&mut out, l.special);
            put_i16(&mut out, l.sector_tag);
            put_u16(&mut out, l.front_sidedef);
            put_u16(&mut out, l.back_sidedef.unwrap_or(NO_INDEX));
        }
        self.add_lump("LINEDEFS", out);

        let mut out = Vec::with_capacity(sidedefs.len() * SIDEDEF_SIZE);
        for s in sidedefs {
            put_i16(&mut out, s.x_offset);
            put_i16(&mut out, s.y_offset);
            put_name(&mut out, &s.upper_tex);
            put_name(&mut out, &s.lower_tex);
            put_name(&mut out, &s.middle_tex);
            put_u16(&mut out, s.sector);
        }
        self.add_lump("SIDEDEFS", out);

        let mut out = Vec::with_capacity(vertexes.len() * VERTEX_SIZE);
        for v in vertexes {
            put_i16(&mut out, v.x);
            put_i16(&mut out, v.y);
        }
        self.add_lump("VERTEXES", out);

        let mut out = Vec::with_capacity(segments.len() * SEGMENT_SIZE);
        for s in segments {
            put_u16(&mut out, s.start_vertex);
            put_u16(&mut out, s.end_vertex);
            put_u16(&mut out, s.angle);
            put_u16(&mut out, s.linedef);
            put_i16(&mut out, s.side);
            put_i16(&mut out, s.offset);
        }
        self.add_lump("SEGS", out);

        let mut out = Vec::with_capacity(subsectors.len() * SUBSECTOR_SIZE);
        for s in subsectors {
            put_u16(&mut out, s.seg_count);
            put_u16(&mut out, s.start_seg);
        }
        self.add_lump("SSECTORS", out);

        let mut out = Vec::with_capacity(nodes.len() * NODE_SIZE);
        for n in nodes {
            for v in [n.x, n.y, n.dx, n.dy] {
                put_i16(&mut out, v);
            }
            for bbox in &n.bounding_boxes {
                for v in bbox {
                    put_i16(&mut out, *v);
                }
            }
            put_u16(&mut out, n.child_index[0]);
            put_u16(&mut out, n.child_index[1]);
        }
        self.add_lump("NODES", out);

        let mut out = Vec::with_capacity(sectors.len() * SECTOR_SIZE);
        for s in sectors {
            put_i16(&mut out, s.floor_height);
            put_i16(&mut out, s.ceil_height);
            put_name(&mut out, &s.floor_tex);
            put_name(&mut out, &s.ceil_tex);
            put_i16(&mut out, s.light_level);
            put_i16(&mut out, s.kind);
            put_i16(&mut out, s.tag);
        }
        self.add_lump("SECTORS", out);

        self.add_lump("REJECT", Vec::new());
        self.add_lump("BLOCKMAP", Vec::new());
        self
    }

    /// Encode a patch in the column/post format
    pub fn patch_lump(patch: &WadPatch) -> Vec<u8> {
        let mut out = Vec::new();
        put_u16(&mut out, patch.width);
        put_u16(&mut out, patch.height);
        put_i16(&mut out, patch.left_offset);
        put_i16(&mut out, patch.top_offset);
        let table = out.len();
        out.resize(table + patch.columns.len() * 4, 0);
        for (x, posts) in patch.columns.iter().enumerate() {
            let here = out.len() as u32;
            out[table + x * 4..table + x * 4 + 4].copy_from_slice(&here.to_le_bytes());
            for post in posts {
                out.push(post.top_delta as u8);
                out.push(post.pixels.len() as u8);
                out.push(0);
                out.extend_from_slice(&post.pixels);
                out.push(0);
            }
            out.push(0xFF);
        }
        out
    }

    /// Write `PNAMES` and `TEXTURE1`
    pub fn add_textures(&mut self, pnames: &[String], textures: &[WadTexture]) -> &mut Self {
        let mut out = Vec::new();
        out.extend_from_slice(&(pnames.len() as u32).to_le_bytes());
        for name in pnames {
            put_name(&mut out, name);
        }
        self.add_lump("PNAMES", out);

        let mut out = Vec::new();
        out.extend_from_slice(&(textures.len() as u32).to_le_bytes());
        let table = out.len();
        out.resize(table + textures.len() * 4, 0);
        for (i, tex) in textures.iter().enumerate() {
            let here = out.len() as u32;
            out[table + i * 4..table + i * 4 + 4].copy_from_slice(&here.to_le_bytes());
            put_name(&mut out, &tex.name);
            out.extend_from_slice(&0u32.to_le_bytes());
            put_u16(&mut out, tex.width);
            put_u16(&mut out, tex.height);
            out.extend_from_slice(&0u32.to_le_bytes());
            put_u16(&mut out, tex.patches.len() as u16);
            for p in &tex.patches {
                put_i16(&mut out, p.origin_x as i16);
                put_i16(&mut out, p.origin_y as i16);
                put_u16(&mut out, p.patch_index as u16);
                put_i16(&mut out, 1);
                put_i16(&mut out, 0);
            }
        }
        self.add_lump("TEXTURE1", out);
        self
    }

    /// Lay the WAD out as header, lump data, then directory
    pub fn build(&self) -> Vec<u8> {
        let data_len: usize = self.lumps.iter().map(|(_, d)| d.len()).sum();
        let mut out = Vec::with_capacity(12 + data_len + self.lumps.len() * 16);
        out.extend_from_slice(b"PWAD");
        out.extend_from_slice(&(self.lumps.len() as u32).to_le_bytes());
        out.extend_from_slice(&((12 + data_len) as u32).to_le_bytes());

        let mut offsets = Vec::with_capacity(self.lumps.len());
        for (_, data) in &self.lumps {
            offsets.push(out.len() as u32);
            out.extend_from_slice(data);
        }
        for ((name, data), offset) in self.lumps.iter().zip(offsets) {
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            put_name(&mut out, name);
        }
        out
    }

    pub fn into_wad(self) -> WadData {
        WadData::from_bytes(self.build())
    }
}
