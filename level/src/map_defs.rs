use bitflags::bitflags;
use math::{Angle, FRACBITS, Fixed, fixed_mul};

bitflags! {
    /// Linedef attribute flags as stored in `LINEDEFS`
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct LineDefFlags: u16 {
        /// Solid, is an obstacle
        const BLOCKING = 1;
        /// Blocks monsters only
        const BLOCK_MONSTERS = 2;
        /// Backside will not be present at all if not two sided
        const TWO_SIDED = 4;
        /// Upper texture is drawn from the top down
        const DONT_PEG_TOP = 8;
        /// Lower texture is drawn from the bottom up
        const DONT_PEG_BOTTOM = 16;
        /// In AutoMap: don't map as two sided: IT'S A SECRET!
        const SECRET = 32;
        /// Sound rendering: don't let sound cross two of these
        const SOUND_BLOCK = 64;
        /// Don't draw on the automap at all
        const DONT_DRAW = 128;
        /// Set when the line has been seen by the renderer
        const MAPPED = 256;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeType {
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

/// A map vertex. `x`/`y` are the gameplay coordinates; `px`/`py` are only
/// ever read by the renderer and may have been nudged onto their linedef to
/// hide slime trails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub x: Fixed,
    pub y: Fixed,
    pub px: Fixed,
    pub py: Fixed,
    /// Slime trail pass has already visited this vertex
    pub moved: bool,
}

impl Vertex {
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self {
            x,
            y,
            px: x,
            py: y,
            moved: false,
        }
    }
}

/// Axis aligned box, top is the largest y
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub top: Fixed,
    pub bottom: Fixed,
    pub left: Fixed,
    pub right: Fixed,
}

impl BBox {
    pub fn new(v1: &Vertex, v2: &Vertex) -> BBox {
        BBox {
            top: v1.y.max(v2.y),
            bottom: v1.y.min(v2.y),
            left: v1.x.min(v2.x),
            right: v1.x.max(v2.x),
        }
    }

    /// `M_ClearBox`: inverted so the first `add_point` sets every edge
    pub const fn cleared() -> BBox {
        BBox {
            top: i32::MIN,
            bottom: i32::MAX,
            left: i32::MAX,
            right: i32::MIN,
        }
    }

    pub fn add_point(&mut self, x: Fixed, y: Fixed) {
        self.left = self.left.min(x);
        self.right = self.right.max(x);
        self.bottom = self.bottom.min(y);
        self.top = self.top.max(y);
    }

    pub fn contains(&self, other: &BBox) -> bool {
        self.left <= other.left
            && self.right >= other.right
            && self.bottom <= other.bottom
            && self.top >= other.top
    }
}

/// The SECTORS record, at runtime. Renderer-private caches are kept by the
/// renderer, indexed by `num`.
#[derive(Default, Clone)]
pub struct Sector {
    pub num: usize,
    pub floorheight: Fixed,
    pub ceilingheight: Fixed,
    /// Index in to the flats
    pub floorpic: usize,
    /// Index in to the flats
    pub ceilingpic: usize,
    pub lightlevel: i32,
    pub special: i16,
    pub tag: i16,
    /// Origin for any sounds played by the sector
    pub sound_origin: (Fixed, Fixed),
    /// Union of every line's bounding box
    pub bbox: BBox,
    /// Bounding box in blockmap cells, `[top, bottom, left, right]`
    pub blockbox: [i32; 4],
    /// If == validcount, already checked
    pub validcount: usize,
    /// Count from the first `P_GroupLines` pass; must equal `lines.len()`
    pub linecount: usize,
    pub lines: Vec<usize>,
}

impl std::fmt::Debug for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sector")
            .field("num", &self.num)
            .field("floorheight", &self.floorheight)
            .field("ceilingheight", &self.ceilingheight)
            .field("floorpic", &self.floorpic)
            .field("ceilingpic", &self.ceilingpic)
            .field("lightlevel", &self.lightlevel)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideDef {
    /// add this to the calculated texture column
    pub textureoffset: Fixed,
    /// add this to the calculated texture top
    pub rowoffset: Fixed,
    /// Texture indices. `None` is the "-" no-texture marker
    pub toptexture: Option<usize>,
    pub bottomtexture: Option<usize>,
    pub midtexture: Option<usize>,
    /// Sector the SideDef is facing.
    pub sector: usize,
}

#[derive(Debug, Clone)]
pub struct LineDef {
    pub num: usize,
    /// Vertices, from v1 to v2.
    pub v1: usize,
    pub v2: usize,
    /// Precalculated v2 - v1 for side checking.
    pub dx: Fixed,
    pub dy: Fixed,
    pub flags: LineDefFlags,
    pub special: i16,
    pub tag: i16,
    pub front_sidedef: usize,
    pub back_sidedef: Option<usize>,
    pub bbox: BBox,
    /// To aid move clipping.
    pub slopetype: SlopeType,
    pub frontsector: usize,
    pub backsector: Option<usize>,
}

impl LineDef {
    pub fn is_two_sided(&self) -> bool {
        self.flags.contains(LineDefFlags::TWO_SIDED)
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    /// Vertices, from v1 to v2.
    pub v1: usize,
    pub v2: usize,
    /// Offset distance along the linedef (from `start_vertex`) to the start
    /// of this `Segment`
    pub offset: Fixed,
    pub angle: Angle,
    /// Length between the render positions of the vertices
    pub length: Fixed,
    /// Which side of the linedef this seg runs along
    pub side: usize,
    pub sidedef: usize,
    /// The Linedef this segment travels along. During drawing it is used for
    /// finding flags.
    pub linedef: usize,
    pub frontsector: usize,
    pub backsector: Option<usize>,
}

/// `R_PointOnSegSide` style test against an arbitrary directed line.
/// Returns 0 for the front (right) side and 1 for the back.
pub(crate) fn point_on_line_side(
    x: Fixed,
    y: Fixed,
    lx: Fixed,
    ly: Fixed,
    ldx: Fixed,
    ldy: Fixed,
) -> usize {
    if ldx == 0 {
        if x <= lx {
            return (ldy > 0) as usize;
        }
        return (ldy < 0) as usize;
    }
    if ldy == 0 {
        if y <= ly {
            return (ldx < 0) as usize;
        }
        return (ldx > 0) as usize;
    }

    let dx = x.wrapping_sub(lx);
    let dy = y.wrapping_sub(ly);

    // Try to quickly decide by looking at sign bits.
    if (ldy ^ ldx ^ dx ^ dy) < 0 {
        if (ldy ^ dx) < 0 {
            // (left is negative)
            return 1;
        }
        return 0;
    }

    let left = fixed_mul(ldy >> FRACBITS, dx);
    let right = fixed_mul(dy, ldx >> FRACBITS);
    if right < left {
        // front side
        return 0;
    }
    // back side
    1
}

impl Segment {
    pub fn point_on_side(&self, vertexes: &[Vertex], x: Fixed, y: Fixed) -> usize {
        let v1 = &vertexes[self.v1];
        let v2 = &vertexes[self.v2];
        point_on_line_side(x, y, v1.x, v1.y, v2.x - v1.x, v2.y - v1.y)
    }
}

#[derive(Debug, Clone)]
pub struct SubSector {
    pub sector: usize,
    /// How many `Segment`s line this `SubSector`
    pub seg_count: usize,
    /// The `Segment` to start with
    pub start_seg: usize,
}

/// A BSP child is either another node or a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChild {
    Node(usize),
    SubSector(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Where the line used for splitting the level starts
    pub x: Fixed,
    pub y: Fixed,
    /// Where the line used for splitting the level ends
    pub dx: Fixed,
    pub dy: Fixed,
    /// Bounding box for each child. Front first.
    pub bboxes: [BBox; 2],
    /// The node children. Front first.
    pub children: [NodeChild; 2],
}

/// A thing as placed in the map, converted to fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapThing {
    pub x: Fixed,
    pub y: Fixed,
    pub angle: Angle,
    pub kind: i16,
    pub flags: i16,
}

/// The blockmap grid. `lump` holds the entire lump with header so offsets in
/// it stay valid as stored.
#[derive(Debug, Default, Clone)]
pub struct Blockmap {
    pub orgx: Fixed,
    pub orgy: Fixed,
    pub width: i32,
    pub height: i32,
    pub lump: Vec<i64>,
}

impl Blockmap {
    /// Lines listed in the block at `(x, y)`, skipping the leading 0 marker
    pub fn block_lines(&self, x: i32, y: i32) -> impl Iterator<Item = usize> + '_ {
        let start = if x < 0 || y < 0 || x >= self.width || y >= self.height {
            self.lump.len()
        } else {
            self.lump[4 + (y * self.width + x) as usize] as usize
        };
        self.lump
            .iter()
            .skip(start)
            .take_while(|v| **v != -1)
            .filter(|v| **v >= 0)
            .skip(1)
            .map(|v| *v as usize)
    }
}
