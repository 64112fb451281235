use std::time::Instant;

use log::{debug, info, warn};
use math::{Angle, FRACBITS, FRACUNIT, Fixed, degrees_to_bam, fixed_hypot};
use wad::WadData;

use crate::map_defs::{
    BBox, Blockmap, LineDef, LineDefFlags, MapThing, Node, NodeChild, Sector, Segment, SideDef,
    SlopeType, SubSector, Vertex,
};
use crate::PicData;

/// Things never have a radius larger than this, so a sector's block box is
/// padded by it
pub const MAXRADIUS: Fixed = 32 * FRACUNIT;
/// Blockmap cells are 128 map units square
pub const MAPBLOCKUNITS: i32 = 128;
pub const MAPBLOCKSHIFT: i32 = FRACBITS + 7;

/// Options applied while the records are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Flip the level along the x axis. Single player only.
    pub mirror: bool,
    /// Recompute seg offsets from vertex distances instead of trusting the
    /// stored values. Turn off to stay in sync with netgame demos.
    pub recalc_seg_offsets: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mirror: false,
            recalc_seg_offsets: true,
        }
    }
}

/// A `MapData` contains everything required for building the level the
/// renderer draws: the geometry graph, the BSP, the blockmap and reject
/// matrix, and the things placed in it.
///
/// Everything is an index in to one of the `Vec`s in here. Loading a new map
/// replaces all of it.
#[derive(Default)]
pub struct MapData {
    name: String,
    options: LoadOptions,
    things: Vec<MapThing>,
    pub vertexes: Vec<Vertex>,
    pub linedefs: Vec<LineDef>,
    pub sectors: Vec<Sector>,
    sidedefs: Vec<SideDef>,
    pub subsectors: Vec<SubSector>,
    pub segments: Vec<Segment>,
    pub nodes: Vec<Node>,
    blockmap: Blockmap,
    reject: Vec<u8>,
    start_node: NodeChild,
}

impl MapData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    pub fn things(&self) -> &[MapThing] {
        &self.things
    }

    pub fn sidedefs(&self) -> &[SideDef] {
        &self.sidedefs
    }

    pub fn blockmap(&self) -> &Blockmap {
        &self.blockmap
    }

    pub fn get_devils_rejects(&self) -> &[u8] {
        &self.reject
    }

    /// The root of the BSP. The last node, or subsector 0 if there are none.
    pub const fn start_node(&self) -> NodeChild {
        self.start_node
    }

    /// Load the named map. Any missing or malformed lump is fatal.
    ///
    /// The order matters: each step resolves indexes in to what the steps
    /// before it built.
    pub fn load(&mut self, map_name: &str, pic_data: &PicData, wad: &WadData, options: LoadOptions) {
        let start = Instant::now();
        *self = MapData {
            name: map_name.to_ascii_uppercase(),
            options,
            ..MapData::default()
        };

        let have_blockmap = self.load_blockmap(map_name, wad);
        self.load_vertexes(map_name, wad);
        self.load_sectors(map_name, wad, pic_data);
        self.load_sidedefs(map_name, wad, pic_data);
        self.load_linedefs(map_name, wad);
        if !have_blockmap {
            self.create_blockmap(map_name);
        }
        self.load_subsectors(map_name, wad);
        self.load_nodes(map_name, wad);
        self.load_segments(map_name, wad);
        self.load_devils_rejects(map_name, wad);
        self.group_lines(map_name);
        self.remove_slime_trails(map_name);
        self.set_seg_lengths();
        self.load_things(map_name, wad);

        info!(
            "{}: Level loaded in {:#?}",
            map_name,
            Instant::now().duration_since(start)
        );
    }

    fn load_blockmap(&mut self, map_name: &str, wad: &WadData) -> bool {
        let Some(wadblock) = wad.read_blockmap(map_name) else {
            warn!("{}: No blockmap, one will be built", map_name);
            return false;
        };
        let mut blockmap = Blockmap {
            orgx: (wadblock.x_origin as Fixed) << FRACBITS,
            orgy: (wadblock.y_origin as Fixed) << FRACBITS,
            width: wadblock.columns as u16 as i32,
            height: wadblock.rows as u16 as i32,
            lump: wadblock.lump,
        };
        let cells = (blockmap.width * blockmap.height) as usize;
        if blockmap.lump.len() < 4 + cells {
            panic!(
                "{}: BLOCKMAP has {} words, header needs {}",
                map_name,
                blockmap.lump.len(),
                4 + cells
            );
        }

        if self.options.mirror {
            blockmap.orgx = blockmap
                .orgx
                .wrapping_add(blockmap.width.wrapping_mul(MAPBLOCKUNITS * FRACUNIT))
                .wrapping_neg();
            let width = blockmap.width as usize;
            for y in 0..blockmap.height as usize {
                let row = 4 + y * width;
                blockmap.lump[row..row + width].reverse();
            }
        }

        info!("{}: Loaded blockmap, {} blocks", map_name, cells);
        self.blockmap = blockmap;
        true
    }

    /// Build a blockmap for maps shipped without one. Every line is listed in
    /// every cell its bounding box touches.
    fn create_blockmap(&mut self, map_name: &str) {
        if self.vertexes.is_empty() {
            panic!("{}: Vertexes must be loaded before building a blockmap", map_name);
        }
        let mut bounds = BBox::cleared();
        for v in &self.vertexes {
            bounds.add_point(v.x >> FRACBITS, v.y >> FRACBITS);
        }
        let orgx = bounds.left;
        let orgy = bounds.bottom;
        let width = ((bounds.right - orgx) / MAPBLOCKUNITS) + 1;
        let height = ((bounds.top - orgy) / MAPBLOCKUNITS) + 1;

        let mut cells: Vec<Vec<i64>> = vec![Vec::new(); (width * height) as usize];
        for line in &self.linedefs {
            let left = ((line.bbox.left >> FRACBITS) - orgx) / MAPBLOCKUNITS;
            let right = ((line.bbox.right >> FRACBITS) - orgx) / MAPBLOCKUNITS;
            let bottom = ((line.bbox.bottom >> FRACBITS) - orgy) / MAPBLOCKUNITS;
            let top = ((line.bbox.top >> FRACBITS) - orgy) / MAPBLOCKUNITS;
            for y in bottom..=top {
                for x in left..=right {
                    cells[(y * width + x) as usize].push(line.num as i64);
                }
            }
        }

        let mut lump = vec![orgx as i64, orgy as i64, width as i64, height as i64];
        let mut offset = lump.len() + cells.len();
        let mut lists = Vec::new();
        for cell in &cells {
            lump.push(offset as i64);
            lists.push(0);
            lists.extend_from_slice(cell);
            lists.push(-1);
            offset += cell.len() + 2;
        }
        lump.append(&mut lists);

        info!("{}: Created blockmap, {} blocks", map_name, cells.len());
        self.blockmap = Blockmap {
            orgx: orgx << FRACBITS,
            orgy: orgy << FRACBITS,
            width,
            height,
            lump,
        };
    }

    fn load_vertexes(&mut self, map_name: &str, wad: &WadData) {
        let mirror = self.options.mirror;
        self.vertexes = wad
            .vertex_iter(map_name)
            .map(|v| {
                let mut x = (v.x as Fixed) << FRACBITS;
                if mirror {
                    x = -x;
                }
                Vertex::new(x, (v.y as Fixed) << FRACBITS)
            })
            .collect();
        info!("{}: Loaded {} vertexes", map_name, self.vertexes.len());
    }

    fn load_sectors(&mut self, map_name: &str, wad: &WadData, pic_data: &PicData) {
        let flat_num = |name: &str| {
            pic_data.flat_num_for_name(name).unwrap_or_else(|| {
                warn!("Sectors: Did not find flat for {}, using the sky", name);
                pic_data.sky_num()
            })
        };
        self.sectors = wad
            .sector_iter(map_name)
            .enumerate()
            .map(|(num, s)| Sector {
                num,
                floorheight: (s.floor_height as Fixed) << FRACBITS,
                ceilingheight: (s.ceil_height as Fixed) << FRACBITS,
                floorpic: flat_num(&s.floor_tex),
                ceilingpic: flat_num(&s.ceil_tex),
                lightlevel: s.light_level as i32,
                special: s.kind,
                tag: s.tag,
                ..Sector::default()
            })
            .collect();
        info!("{}: Loaded {} sectors", map_name, self.sectors.len());
    }

    fn load_sidedefs(&mut self, map_name: &str, wad: &WadData, pic_data: &PicData) {
        if self.sectors.is_empty() {
            panic!("sectors must be loaded before sidedefs");
        }
        let tex_num = |name: &str| {
            if name.is_empty() || name == "-" {
                return None;
            }
            let num = pic_data.wallpic_num_for_name(name);
            if num.is_none() {
                warn!("SideDefs: Did not find texture {}", name);
            }
            num
        };
        let num_sectors = self.sectors.len();
        self.sidedefs = wad
            .sidedef_iter(map_name)
            .enumerate()
            .map(|(i, s)| {
                if s.sector as usize >= num_sectors {
                    panic!(
                        "{}: sidedef {} references sector {} of {}",
                        map_name, i, s.sector, num_sectors
                    );
                }
                SideDef {
                    textureoffset: (s.x_offset as Fixed) << FRACBITS,
                    rowoffset: (s.y_offset as Fixed) << FRACBITS,
                    toptexture: tex_num(&s.upper_tex),
                    bottomtexture: tex_num(&s.lower_tex),
                    midtexture: tex_num(&s.middle_tex),
                    sector: s.sector as usize,
                }
            })
            .collect();
        info!("{}: Loaded {} sidedefs", map_name, self.sidedefs.len());
    }

    fn load_linedefs(&mut self, map_name: &str, wad: &WadData) {
        if self.vertexes.is_empty() {
            panic!("Vertexes must be loaded before linedefs");
        }
        if self.sidedefs.is_empty() {
            panic!("sidedefs must be loaded before linedefs");
        }
        let mirror = self.options.mirror;
        self.linedefs = wad
            .linedef_iter(map_name)
            .enumerate()
            .map(|(num, l)| {
                let (v1, v2) = if mirror {
                    (l.end_vertex as usize, l.start_vertex as usize)
                } else {
                    (l.start_vertex as usize, l.end_vertex as usize)
                };
                let (Some(vx1), Some(vx2)) = (self.vertexes.get(v1), self.vertexes.get(v2)) else {
                    panic!("{}: linedef {} has an invalid vertex", map_name, num);
                };

                let front_sidedef = l.front_sidedef as usize;
                if front_sidedef >= self.sidedefs.len() {
                    panic!("{}: linedef {} has no front sidedef", map_name, num);
                }
                let back_sidedef = l.back_sidedef.map(|s| s as usize).filter(|s| {
                    let valid = *s < self.sidedefs.len();
                    if !valid {
                        warn!("{}: linedef {} back sidedef {} is invalid", map_name, num, s);
                    }
                    valid
                });

                let dx = vx2.x - vx1.x;
                let dy = vx2.y - vx1.y;
                let slopetype = if dx == 0 {
                    SlopeType::Vertical
                } else if dy == 0 {
                    SlopeType::Horizontal
                } else if (dy > 0) == (dx > 0) {
                    SlopeType::Positive
                } else {
                    SlopeType::Negative
                };

                LineDef {
                    num,
                    v1,
                    v2,
                    dx,
                    dy,
                    flags: LineDefFlags::from_bits_retain(l.flags),
                    special: l.special,
                    tag: l.sector_tag,
                    front_sidedef,
                    back_sidedef,
                    bbox: BBox::new(vx1, vx2),
                    slopetype,
                    frontsector: self.sidedefs[front_sidedef].sector,
                    backsector: back_sidedef.map(|s| self.sidedefs[s].sector),
                }
            })
            .collect();
        info!("{}: Loaded {} linedefs", map_name, self.linedefs.len());
    }

    fn load_subsectors(&mut self, map_name: &str, wad: &WadData) {
        self.subsectors = wad
            .subsector_iter(map_name)
            .map(|s| SubSector {
                sector: 0,
                seg_count: s.seg_count as usize,
                start_seg: s.start_seg as usize,
            })
            .collect();
        if self.subsectors.is_empty() {
            panic!("{}: no subsectors", map_name);
        }
        info!("{}: Loaded {} subsectors", map_name, self.subsectors.len());
    }

    fn load_nodes(&mut self, map_name: &str, wad: &WadData) {
        if self.subsectors.is_empty() {
            panic!("subsectors must be loaded before nodes");
        }
        let num_subsectors = self.subsectors.len();
        let mirror = self.options.mirror;
        self.nodes = wad
            .node_iter(map_name)
            .map(|n| Node::from_wad(&n, num_subsectors, mirror))
            .collect();

        for (i, node) in self.nodes.iter().enumerate() {
            for child in node.children {
                if let NodeChild::Node(n) = child {
                    if n >= self.nodes.len() {
                        panic!("{}: node {} has invalid child node {}", map_name, i, n);
                    }
                }
            }
        }

        self.start_node = if self.nodes.is_empty() {
            NodeChild::SubSector(0)
        } else {
            NodeChild::Node(self.nodes.len() - 1)
        };
        info!("{}: Loaded {} bsp nodes", map_name, self.nodes.len());
    }

    fn load_segments(&mut self, map_name: &str, wad: &WadData) {
        if self.linedefs.is_empty() {
            panic!("linedefs must be loaded before segs");
        }
        let mirror = self.options.mirror;
        self.segments = wad
            .segment_iter(map_name)
            .enumerate()
            .map(|(i, ms)| {
                let (mut v1, mut v2) = (ms.start_vertex as usize, ms.end_vertex as usize);
                let mut angle = (ms.angle as Angle) << 16;
                if mirror {
                    std::mem::swap(&mut v1, &mut v2);
                    angle = angle.wrapping_neg();
                }
                if v1 >= self.vertexes.len() || v2 >= self.vertexes.len() {
                    panic!("{}: seg {} has an invalid vertex", map_name, i);
                }

                let Some(linedef) = self.linedefs.get(ms.linedef as usize) else {
                    panic!("{}: seg {} has invalid linedef {}", map_name, i, ms.linedef);
                };
                let side = ms.side as usize;
                let sidedef = match side {
                    0 => linedef.front_sidedef,
                    1 => linedef.back_sidedef.unwrap_or_else(|| {
                        panic!("{}: seg {} is on a missing back side", map_name, i)
                    }),
                    _ => panic!("Invalid side num on segment"),
                };

                let backsector = if linedef.is_two_sided() {
                    let other = if side == 0 {
                        linedef.back_sidedef
                    } else {
                        Some(linedef.front_sidedef)
                    };
                    other.map(|s| self.sidedefs[s].sector)
                } else {
                    None
                };

                Segment {
                    v1,
                    v2,
                    offset: (ms.offset as Fixed) << FRACBITS,
                    angle,
                    length: 0,
                    side,
                    sidedef,
                    linedef: linedef.num,
                    frontsector: self.sidedefs[sidedef].sector,
                    backsector,
                }
            })
            .collect();
        if self.options.recalc_seg_offsets {
            self.recalc_seg_offsets();
        }
        info!("{}: Generated {} segments", map_name, self.segments.len());
    }

    fn load_devils_rejects(&mut self, map_name: &str, wad: &WadData) {
        self.reject = wad.read_reject(map_name);
        let needed = (self.sectors.len() * self.sectors.len()).div_ceil(8);
        if self.reject.len() < needed {
            warn!(
                "{}: REJECT is {} bytes, padding to {}",
                map_name,
                self.reject.len(),
                needed
            );
            self.reject.resize(needed, 0);
        }
        info!("{}: Loaded {} reject bytes", map_name, self.reject.len());
    }

    fn load_things(&mut self, map_name: &str, wad: &WadData) {
        let mirror = self.options.mirror;
        self.things = wad
            .thing_iter(map_name)
            .map(|t| {
                let (mut x, mut angle) = (t.x as i32, t.angle as i32);
                if mirror {
                    x = -x;
                    angle = 180 - angle;
                }
                MapThing {
                    x: x << FRACBITS,
                    y: (t.y as Fixed) << FRACBITS,
                    angle: degrees_to_bam(angle),
                    kind: t.kind,
                    flags: t.flags,
                }
            })
            .collect();
        info!("{}: Loaded {} things", map_name, self.things.len());
    }

    /// Recompute every seg's offset along its linedef from the integer
    /// distance between the seg start and the linedef end it runs from.
    pub fn recalc_seg_offsets(&mut self) {
        let mirror = self.options.mirror;
        for seg in self.segments.iter_mut() {
            let linedef = &self.linedefs[seg.linedef];
            let from = if (seg.side == 1) ^ mirror {
                linedef.v2
            } else {
                linedef.v1
            };
            seg.offset = get_offset(&self.vertexes[seg.v1], &self.vertexes[from]);
        }
    }

    /// Seg lengths over the render positions, to fix long wall wobble
    pub fn set_seg_lengths(&mut self) {
        for seg in self.segments.iter_mut() {
            let v1 = &self.vertexes[seg.v1];
            let v2 = &self.vertexes[seg.v2];
            seg.length = fixed_hypot(v2.px.wrapping_sub(v1.px), v2.py.wrapping_sub(v1.py));
        }
    }

    /// `P_GroupLines`: resolve subsector sectors, then build each sector's
    /// line list, sound origin and block box.
    fn group_lines(&mut self, map_name: &str) {
        for (i, ss) in self.subsectors.iter_mut().enumerate() {
            let Some(seg) = self.segments.get(ss.start_seg) else {
                panic!("{}: subsector {} starts at invalid seg {}", map_name, i, ss.start_seg);
            };
            ss.sector = self.sidedefs[seg.sidedef].sector;
        }

        let mut total = 0;
        for line in &self.linedefs {
            total += 1;
            self.sectors[line.frontsector].linecount += 1;
            if let Some(back) = line.backsector {
                if back != line.frontsector {
                    self.sectors[back].linecount += 1;
                    total += 1;
                }
            }
        }

        let blockmap = &self.blockmap;
        for sector in self.sectors.iter_mut() {
            let mut bbox = BBox::cleared();
            sector.lines = self
                .linedefs
                .iter()
                .filter(|l| l.frontsector == sector.num || l.backsector == Some(sector.num))
                .map(|l| {
                    let v1 = &self.vertexes[l.v1];
                    let v2 = &self.vertexes[l.v2];
                    bbox.add_point(v1.x, v1.y);
                    bbox.add_point(v2.x, v2.y);
                    l.num
                })
                .collect();
            if sector.lines.len() != sector.linecount {
                panic!("P_GroupLines: miscounted");
            }
            sector.bbox = bbox;

            // set the sound origin to the middle of the bounding box
            sector.sound_origin = (
                ((bbox.right as i64 + bbox.left as i64) / 2) as Fixed,
                ((bbox.top as i64 + bbox.bottom as i64) / 2) as Fixed,
            );

            // adjust bounding box to map blocks
            let to_block = |v: Fixed, org: Fixed, pad: Fixed| {
                ((v as i64 - org as i64 + pad as i64) >> MAPBLOCKSHIFT) as i32
            };
            sector.blockbox = [
                to_block(bbox.top, blockmap.orgy, MAXRADIUS).min(blockmap.height - 1),
                to_block(bbox.bottom, blockmap.orgy, -MAXRADIUS).max(0),
                to_block(bbox.left, blockmap.orgx, -MAXRADIUS).max(0),
                to_block(bbox.right, blockmap.orgx, MAXRADIUS).min(blockmap.width - 1),
            ];
        }
        info!("{}: Grouped {} sector lines", map_name, total);
    }

    /// Remove slime trails. killough 10/98
    ///
    /// Node builders can only place seg vertexes on integer coordinates, so a
    /// vertex that splits a diagonal line usually sits slightly off it and the
    /// renderer shows a sliver of the wrong flat along the seam. For each
    /// vertex of every seg on a diagonal line that is not one of the line's
    /// endpoints, project it back on to the line with the law of cosines:
    ///
    /// ```ignore
    ///      2        2                         2        2
    ///    dx  x0 + dy  x1 + dx dy (y0 - y1)  dy  y0 + dx  y1 + dx dy (x0 - x1)
    ///   {---------------------------------, ---------------------------------}
    ///                  2     2                            2     2
    ///                dx  + dy                           dx  + dy
    /// ```
    ///
    /// (x0,y0) is the vertex being moved, and (x1,y1)-(x1+dx,y1+dy) is the
    /// reference linedef.
    ///
    /// Only the render position `px`/`py` is moved. Gameplay keeps the real
    /// coordinates.
    fn remove_slime_trails(&mut self, map_name: &str) {
        let mut moved = 0;
        for seg in &self.segments {
            let line = &self.linedefs[seg.linedef];
            if line.dx == 0 || line.dy == 0 {
                continue;
            }
            let x1 = self.vertexes[line.v1].x as i64;
            let y1 = self.vertexes[line.v1].y as i64;
            let ldx = (line.dx >> FRACBITS) as i64;
            let ldy = (line.dy >> FRACBITS) as i64;
            let dx2 = ldx * ldx;
            let dy2 = ldy * ldy;
            let dxy = ldx * ldy;
            let s = dx2 + dy2;

            for v in [seg.v1, seg.v2] {
                let vertex = &mut self.vertexes[v];
                if vertex.moved {
                    continue;
                }
                vertex.moved = true;
                if v != line.v1 && v != line.v2 {
                    let x0 = vertex.x as i64;
                    let y0 = vertex.y as i64;
                    vertex.px = ((dx2 * x0 + dy2 * x1 + dxy * (y0 - y1)) / s) as Fixed;
                    vertex.py = ((dy2 * y0 + dx2 * y1 + dxy * (x0 - x1)) / s) as Fixed;
                    moved += 1;
                }
            }
        }
        debug!("{}: Moved {} vertexes on to their lines", map_name, moved);
    }

    /// Get the subsector a point is in. This is mostly used to find the
    /// sector a camera or thing stands in.
    ///
    /// Doom function name  `R_PointInSubsector`
    pub fn point_in_subsector(&self, x: Fixed, y: Fixed) -> usize {
        let mut child = self.start_node;
        loop {
            match child {
                NodeChild::SubSector(ss) => return ss,
                NodeChild::Node(n) => {
                    let node = &self.nodes[n];
                    child = node.children[node.point_on_side(x, y)];
                }
            }
        }
    }

    /// Sector index a point is in
    pub fn point_in_sector(&self, x: Fixed, y: Fixed) -> usize {
        self.subsectors[self.point_in_subsector(x, y)].sector
    }
}

/// Distance between two vertexes in whole map units, back in fixed point
fn get_offset(v1: &Vertex, v2: &Vertex) -> Fixed {
    let dx = ((v1.x - v2.x) >> FRACBITS) as i64;
    let dy = ((v1.y - v2.y) >> FRACBITS) as i64;
    (((dx * dx + dy * dy) as u64).isqrt() as Fixed) << FRACBITS
}
