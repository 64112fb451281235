//! Fixed-size map records, exactly as laid out in the WAD. Every multi-byte
//! field is little-endian. Conversion to fixed point and linking happens in
//! the level loader, not here.

use crate::name_from_bytes;

pub const THING_SIZE: usize = 10;
pub const VERTEX_SIZE: usize = 4;
pub const LINEDEF_SIZE: usize = 14;
pub const SIDEDEF_SIZE: usize = 30;
pub const SEGMENT_SIZE: usize = 12;
pub const SUBSECTOR_SIZE: usize = 4;
pub const NODE_SIZE: usize = 28;
pub const SECTOR_SIZE: usize = 26;

/// Sidedef or node child value meaning "nothing here"
pub const NO_INDEX: u16 = 0xFFFF;

/// A `Thing` describes only the position, type, and angle + spawn flags
///
/// The data in the WAD lump is structured as follows:
///
/// | Field Size | Data Type | Content    |
/// |------------|-----------|------------|
/// |  0x00-0x01 |    i16    | X Position |
/// |  0x02-0x03 |    i16    | Y Position |
/// |  0x04-0x05 |    i16    | Angle      |
/// |  0x06-0x07 |    i16    | Type       |
/// |  0x08-0x09 |    i16    | Flags      |
///
/// Each `Thing` record is 10 bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WadThing {
    pub x: i16,
    pub y: i16,
    pub angle: i16,
    pub kind: i16,
    pub flags: i16,
}

impl WadThing {
    pub fn new(x: i16, y: i16, angle: i16, kind: i16, flags: i16) -> WadThing {
        WadThing {
            x,
            y,
            angle,
            kind,
            flags,
        }
    }
}

/// A `Vertex` is the basic struct used for any type of coordinate
/// in the game
///
/// | Field Size | Data Type | Content      |
/// |------------|-----------|--------------|
/// |  0x00-0x01 |    i16    | X Coordinate |
/// |  0x02-0x03 |    i16    | Y Coordinate |
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct WadVertex {
    pub x: i16,
    pub y: i16,
}

impl WadVertex {
    pub fn new(x: i16, y: i16) -> WadVertex {
        WadVertex { x, y }
    }
}

/// Each linedef represents a line from one of the VERTEXES to another.
///
///| Field Size | Data Type      | Content                                   |
///|------------|----------------|-------------------------------------------|
///|  0x00-0x01 | Unsigned short | Start vertex                              |
///|  0x02-0x03 | Unsigned short | End vertex                                |
///|  0x04-0x05 | Unsigned short | Flags                                     |
///|  0x06-0x07 | Signed short   | Line type / Action                        |
///|  0x08-0x09 | Signed short   | Sector tag                                |
///|  0x0A-0x0B | Unsigned short | Front sidedef ( 0xFFFF side not present ) |
///|  0x0C-0x0D | Unsigned short | Back sidedef  ( 0xFFFF side not present ) |
///
/// A Linedef will always have at least one side. This first side is referred
/// to as either front or right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadLineDef {
    pub start_vertex: u16,
    pub end_vertex: u16,
    pub flags: u16,
    pub special: i16,
    pub sector_tag: i16,
    pub front_sidedef: u16,
    pub back_sidedef: Option<u16>,
}

impl WadLineDef {
    pub fn new(
        start_vertex: u16,
        end_vertex: u16,
        flags: u16,
        special: i16,
        sector_tag: i16,
        front_sidedef: u16,
        back_sidedef: u16,
    ) -> WadLineDef {
        WadLineDef {
            start_vertex,
            end_vertex,
            flags,
            special,
            sector_tag,
            front_sidedef,
            back_sidedef: (back_sidedef != NO_INDEX).then_some(back_sidedef),
        }
    }
}

/// A sidedef carries the textures for one side of a linedef
///
/// | Field Size | Data Type    | Content                   |
/// |------------|--------------|---------------------------|
/// |  0x00-0x01 | i16          | X offset                  |
/// |  0x02-0x03 | i16          | Y offset                  |
/// |  0x04-0x0B | 8 ASCII char | Upper texture name        |
/// |  0x0C-0x13 | 8 ASCII char | Lower texture name        |
/// |  0x14-0x1B | 8 ASCII char | Middle texture name       |
/// |  0x1C-0x1D | u16          | Sector this side faces    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadSideDef {
    pub x_offset: i16,
    pub y_offset: i16,
    pub upper_tex: String,
    pub lower_tex: String,
    pub middle_tex: String,
    pub sector: u16,
}

impl WadSideDef {
    pub fn new(
        x_offset: i16,
        y_offset: i16,
        upper_tex: &[u8],
        lower_tex: &[u8],
        middle_tex: &[u8],
        sector: u16,
    ) -> WadSideDef {
        WadSideDef {
            x_offset,
            y_offset,
            upper_tex: name_from_bytes(upper_tex),
            lower_tex: name_from_bytes(lower_tex),
            middle_tex: name_from_bytes(middle_tex),
            sector,
        }
    }
}

/// The SEGS are in a sequential order determined by the SSECTORS, which are
/// part of the NODES recursive tree
///
/// | Field Size | Data Type | Content                                       |
/// |------------|-----------|-----------------------------------------------|
/// |  0x00-0x01 |    u16    | Index of vertex the line starts from          |
/// |  0x02-0x03 |    u16    | Index of vertex the line ends with            |
/// |  0x04-0x05 |    u16    | Angle stored in BAM >> 16                     |
/// |  0x06-0x07 |    u16    | Index of the linedef this seg is part of      |
/// |  0x08-0x09 |    i16    | 0 = same direction as linedef, 1 = opposite   |
/// |  0x0A-0x0B |    i16    | Offset distance along the linedef to the seg  |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadSegment {
    pub start_vertex: u16,
    pub end_vertex: u16,
    pub angle: u16,
    pub linedef: u16,
    pub side: i16,
    pub offset: i16,
}

impl WadSegment {
    pub fn new(
        start_vertex: u16,
        end_vertex: u16,
        angle: u16,
        linedef: u16,
        side: i16,
        offset: i16,
    ) -> WadSegment {
        WadSegment {
            start_vertex,
            end_vertex,
            angle,
            linedef,
            side,
            offset,
        }
    }
}

/// A subsector is a run of consecutive segs making a convex area
///
/// | Field Size | Data Type | Content              |
/// |------------|-----------|----------------------|
/// |  0x00-0x01 |    u16    | Seg count            |
/// |  0x02-0x03 |    u16    | First seg number     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadSubSector {
    pub seg_count: u16,
    pub start_seg: u16,
}

impl WadSubSector {
    pub fn new(seg_count: u16, start_seg: u16) -> WadSubSector {
        WadSubSector {
            seg_count,
            start_seg,
        }
    }
}

/// A sector is any area with a uniform floor and ceiling
///
/// | Field Size | Data Type    | Content              |
/// |------------|--------------|----------------------|
/// |  0x00-0x01 | i16          | Floor height         |
/// |  0x02-0x03 | i16          | Ceiling height       |
/// |  0x04-0x0B | 8 ASCII char | Floor texture        |
/// |  0x0C-0x13 | 8 ASCII char | Ceiling texture      |
/// |  0x14-0x15 | i16          | Light level          |
/// |  0x16-0x17 | i16          | Special type         |
/// |  0x18-0x19 | i16          | Tag                  |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadSector {
    pub floor_height: i16,
    pub ceil_height: i16,
    pub floor_tex: String,
    pub ceil_tex: String,
    pub light_level: i16,
    pub kind: i16,
    pub tag: i16,
}

impl WadSector {
    pub fn new(
        floor_height: i16,
        ceil_height: i16,
        floor_tex: &[u8],
        ceil_tex: &[u8],
        light_level: i16,
        kind: i16,
        tag: i16,
    ) -> WadSector {
        WadSector {
            floor_height,
            ceil_height,
            floor_tex: name_from_bytes(floor_tex),
            ceil_tex: name_from_bytes(ceil_tex),
            light_level,
            kind,
            tag,
        }
    }
}

/// A BSP node. The partition line and the two child bounding boxes.
///
/// | Field Size | Data Type                            | Content                                          |
/// |------------|--------------------------------------|--------------------------------------------------|
/// | 0x00-0x01  | Partition line x coordinate          | X coordinate of the splitter                     |
/// | 0x02-0x03  | Partition line y coordinate          | Y coordinate of the splitter                     |
/// | 0x04-0x05  | Change in x to end of partition line | The amount to move in X to reach end of splitter |
/// | 0x06-0x07  | Change in y to end of partition line | The amount to move in Y to reach end of splitter |
/// | 0x08-0x0F  | Right (Front) box                    | top, bottom, left, right                         |
/// | 0x10-0x17  | Left (Back) box                      | top, bottom, left, right                         |
/// | 0x18-0x19  | Right (Front) child index            | Index of the front child + sub-sector indicator  |
/// | 0x1A-0x1B  | Left (Back)  child index             | Index of the back child + sub-sector indicator   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadNode {
    pub x: i16,
    pub y: i16,
    pub dx: i16,
    pub dy: i16,
    /// `[top, bottom, left, right]` for the front then the back child
    pub bounding_boxes: [[i16; 4]; 2],
    /// High bit set means the child is a subsector, `0xFFFF` means no child
    pub child_index: [u16; 2],
}

impl WadNode {
    pub fn new(
        x: i16,
        y: i16,
        dx: i16,
        dy: i16,
        bounding_boxes: [[i16; 4]; 2],
        right_child_id: u16,
        left_child_id: u16,
    ) -> WadNode {
        WadNode {
            x,
            y,
            dx,
            dy,
            bounding_boxes,
            child_index: [right_child_id, left_child_id],
        }
    }
}

/// The `BLOCKMAP` is a pre-calculated structure that the game engine uses to
/// simplify collision-detection between moving things and walls.
///
/// | Field Size | Data Type | Content                              |
/// |------------|-----------|--------------------------------------|
/// | 0x00-0x01  | i16       | X origin of the grid                 |
/// | 0x02-0x03  | i16       | Y origin of the grid                 |
/// | 0x04-0x05  | i16       | Number of columns                    |
/// | 0x06-0x07  | i16       | Number of rows                       |
/// | 0x08-      | u16       | Offsets to block lists, then lists   |
///
/// Offsets and list entries are read unsigned so maps with more than 32k
/// entries still work; `0xFFFF` stays `-1` since it terminates each list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadBlockMap {
    pub x_origin: i16,
    pub y_origin: i16,
    pub columns: i16,
    pub rows: i16,
    /// The whole lump as widened words, header included
    pub lump: Vec<i64>,
}

impl WadBlockMap {
    /// `None` when the lump is too short to hold a header
    pub fn from_lump(bytes: &[u8]) -> Option<WadBlockMap> {
        if bytes.len() < 8 {
            return None;
        }
        let lump: Vec<i64> = bytes
            .chunks_exact(2)
            .map(|w| {
                let v = i16::from_le_bytes([w[0], w[1]]);
                if v == -1 { -1 } else { (v as i64) & 0xffff }
            })
            .collect();
        Some(WadBlockMap {
            x_origin: lump[0] as i16,
            y_origin: lump[1] as i16,
            columns: lump[2] as i16,
            rows: lump[3] as i16,
            lump,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linedef_missing_back_side() {
        let l = WadLineDef::new(0, 1, 0, 0, 0, 3, NO_INDEX);
        assert_eq!(l.back_sidedef, None);
        let l = WadLineDef::new(0, 1, 4, 0, 0, 3, 4);
        assert_eq!(l.back_sidedef, Some(4));
    }

    #[test]
    fn texture_names_trimmed() {
        let s = WadSideDef::new(0, 0, b"STARTAN3", b"-\0\0\0\0\0\0\0", b"door1\0\0\0", 0);
        assert_eq!(s.upper_tex, "STARTAN3");
        assert_eq!(s.lower_tex, "-");
        assert_eq!(s.middle_tex, "DOOR1");
    }

    #[test]
    fn blockmap_keeps_terminator() {
        let mut bytes = Vec::new();
        for v in [0i16, 0, 1, 1, 5, 0, -1] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        // Unsigned offset above 32k
        bytes.extend_from_slice(&0x9000u16.to_le_bytes());
        let bm = WadBlockMap::from_lump(&bytes).unwrap();
        assert_eq!(bm.columns, 1);
        assert_eq!(bm.lump[6], -1);
        assert_eq!(bm.lump[7], 0x9000);
        assert!(WadBlockMap::from_lump(&[0, 0]).is_none());
    }
}
