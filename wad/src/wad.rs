use log::{info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::{fmt, str};

/// Offsets of the map lumps that follow a map marker such as `E1M1`. The
/// marker itself is a zero-sized lump; the lumps below always follow it in
/// this exact order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lumps {
    /// Position and angle for all monster, powerup and spawn location
    Things = 1,
    /// An array of lines referencing two vertices (Two vertexes are connected
    /// by one `LineDef`). Also points to one or two `SideDef` depending on if
    /// this line is a wall or a portal
    LineDefs,
    /// Defines upper, lower, and middle textures. Also defines texture
    /// horizontal and vertical offsets. This is information for a `LineDef`
    SideDefs,
    /// An array of signed short X, Y pairs (`Vertex`). All coordinates in this
    /// map block are indexes into this array
    Vertexes,
    /// Portions of lines cut due to Binary Space Partitioning.
    /// Each `SubSector`'s geometry is defined by the `Segs` which it contains
    Segs,
    /// Set of segments of a `LineDef` representing a convex subspace
    SubSectors,
    /// BSP with segs, nodes and sub-sector leaves
    Nodes,
    /// Area surrounded by lines, with set ceiling and floor textures/heights
    /// with light level
    Sectors,
    /// Sector-to-sector visibility matrix to speed-up line of sight
    /// calculations
    Reject,
    /// 128x128 grid partition of the map LINEDEFS to accelerate collision
    /// detection
    Blockmap,
}

impl Lumps {
    pub const fn name(&self) -> &'static str {
        match self {
            Lumps::Things => "THINGS",
            Lumps::LineDefs => "LINEDEFS",
            Lumps::SideDefs => "SIDEDEFS",
            Lumps::Vertexes => "VERTEXES",
            Lumps::Segs => "SEGS",
            Lumps::SubSectors => "SSECTORS",
            Lumps::Nodes => "NODES",
            Lumps::Sectors => "SECTORS",
            Lumps::Reject => "REJECT",
            Lumps::Blockmap => "BLOCKMAP",
        }
    }
}

/// Header which tells us the WAD type and where the data is
///
/// The header structure in the WAD is as follows:
///
/// | Field Size | Data Type    | Content                                              |
/// |------------|--------------|------------------------------------------------------|
/// | 0x00-0x03  | 4 ASCII char | *Must* be an ASCII string (either "IWAD" or "PWAD")  |
/// | 0x04-0x07  | unsigned int | The number entries in the directory                  |
/// | 0x08-0x0b  | unsigned int | Offset in bytes to the directory in the WAD file     |
///
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WadHeader {
    /// Will be either `IWAD` for game, or `PWAD` for patch
    pub wad_type: [u8; 4],
    /// The count of "lumps" of data
    pub dir_count: u32,
    /// Offset in bytes that the lump data starts at
    pub dir_offset: u32,
}

impl fmt::Debug for WadHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WadHeader")
            .field("wad_type", &str::from_utf8(&self.wad_type).unwrap_or("????"))
            .field("dir_count", &self.dir_count)
            .field("dir_offset", &self.dir_offset)
            .finish()
    }
}

/// Contains the details for a lump of data: where it starts, the size of it,
/// and the name
///
/// The directory structure in the WAD is as follows:
///
/// | Field Size | Data Type    | Content                                                    |
/// |------------|--------------|------------------------------------------------------------|
/// | 0x00-0x03  | unsigned int | Offset value to the start of the lump data in the WAD file |
/// | 0x04-0x07  | unsigned int | The size of the lump in bytes                              |
/// | 0x08-0x0f  | 8 ASCII char | ASCII holding the name of the lump                         |
///
#[derive(Debug, Clone)]
pub struct LumpInfo {
    pub name: String,
    /// Which loaded file this lump lives in
    pub file_handle: usize,
    /// The offset in bytes where the lump data starts
    pub lump_offset: usize,
    /// The size in bytes of the lump referenced
    pub lump_size: usize,
}

/// "Where's All (the) Data": contains every loaded WAD in memory plus one
/// combined directory. Later files override earlier ones by name, so a PWAD
/// added after the IWAD replaces its maps and textures.
pub struct WadData {
    pub(crate) lumps: Vec<LumpInfo>,
    pub(crate) file_data: Vec<Vec<u8>>,
}

impl fmt::Debug for WadData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WadData")
            .field("files", &self.file_data.len())
            .field("lumps", &self.lumps.len())
            .finish_non_exhaustive()
    }
}

/// Decode an 8 byte NUL padded name
pub fn name_from_bytes(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).to_ascii_uppercase()
}

impl WadData {
    /// Read a WAD from disk. Any I/O or format problem is fatal.
    pub fn new(file_path: &Path) -> WadData {
        let mut file = File::open(file_path)
            .unwrap_or_else(|e| panic!("Could not open {:?}: {}", file_path, e));
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .unwrap_or_else(|e| panic!("Could not read {:?}: {}", file_path, e));
        let wad = Self::from_bytes(bytes);
        info!(
            "Loaded {:?}: {} lumps",
            file_path.file_name().unwrap_or_default(),
            wad.lumps.len()
        );
        wad
    }

    /// Parse an in-memory WAD image
    pub fn from_bytes(bytes: Vec<u8>) -> WadData {
        let mut wad = WadData {
            lumps: Vec::new(),
            file_data: Vec::new(),
        };
        wad.add_bytes(bytes);
        wad
    }

    /// Load a PWAD on top of what is already loaded
    pub fn add_file(&mut self, file_path: &Path) {
        let mut file = File::open(file_path)
            .unwrap_or_else(|e| panic!("Could not open {:?}: {}", file_path, e));
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .unwrap_or_else(|e| panic!("Could not read {:?}: {}", file_path, e));
        self.add_bytes(bytes);
    }

    pub fn add_bytes(&mut self, bytes: Vec<u8>) {
        let header = Self::read_header(&bytes);
        if &header.wad_type != b"IWAD" && &header.wad_type != b"PWAD" {
            panic!("Invalid WAD header: {:?}", header);
        }
        let file_handle = self.file_data.len();
        let dir_end = header.dir_offset as usize + header.dir_count as usize * 16;
        if dir_end > bytes.len() {
            panic!(
                "WAD directory runs past end of file: {} > {}",
                dir_end,
                bytes.len()
            );
        }

        self.lumps.reserve(header.dir_count as usize);
        for i in 0..header.dir_count as usize {
            let offset = header.dir_offset as usize + i * 16;
            let lump = LumpInfo {
                lump_offset: Self::read_4_bytes(offset, &bytes) as usize,
                lump_size: Self::read_4_bytes(offset + 4, &bytes) as usize,
                name: name_from_bytes(&bytes[offset + 8..offset + 16]),
                file_handle,
            };
            if lump.lump_offset + lump.lump_size > bytes.len() {
                panic!("Lump {} runs past end of file", lump.name);
            }
            self.lumps.push(lump);
        }
        self.file_data.push(bytes);
    }

    pub(crate) fn read_header(bytes: &[u8]) -> WadHeader {
        if bytes.len() < 12 {
            panic!("WAD is too short to contain a header: {} bytes", bytes.len());
        }
        let mut wad_type = [0u8; 4];
        wad_type.copy_from_slice(&bytes[0..4]);
        WadHeader {
            wad_type,
            dir_count: Self::read_4_bytes(4, bytes),
            dir_offset: Self::read_4_bytes(8, bytes),
        }
    }

    #[inline]
    pub(crate) fn read_2_bytes(offset: usize, bytes: &[u8]) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    #[inline]
    pub(crate) fn read_4_bytes(offset: usize, bytes: &[u8]) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    pub fn lumps(&self) -> &[LumpInfo] {
        &self.lumps
    }

    /// Index of the most recently loaded lump with this name
    pub fn find_lump_index(&self, name: &str) -> Option<usize> {
        self.lumps.iter().rposition(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn lump_exists(&self, name: &str) -> bool {
        self.find_lump_index(name).is_some()
    }

    pub fn get_lump(&self, name: &str) -> Option<&[u8]> {
        self.find_lump_index(name).map(|i| self.lump_data(&self.lumps[i]))
    }

    pub fn lump_data(&self, info: &LumpInfo) -> &[u8] {
        &self.file_data[info.file_handle][info.lump_offset..info.lump_offset + info.lump_size]
    }

    pub fn map_exists(&self, map_name: &str) -> bool {
        self.find_lump_index(map_name)
            .and_then(|i| self.lumps.get(i + Lumps::Things as usize))
            .is_some_and(|l| l.name == Lumps::Things.name())
    }

    /// Locate one of the lumps belonging to a map. A missing map or a lump
    /// out of order is fatal.
    pub fn find_lump_for_map_or_panic(&self, map_name: &str, lump: Lumps) -> &LumpInfo {
        let index = self
            .find_lump_index(map_name)
            .unwrap_or_else(|| panic!("Could not find map {}", map_name));
        let info = self
            .lumps
            .get(index + lump as usize)
            .unwrap_or_else(|| panic!("{}: missing {} lump", map_name, lump.name()));
        if info.name != lump.name() {
            panic!(
                "{}: invalid {} lump index: {}, found {}",
                map_name,
                lump.name(),
                index + lump as usize,
                info.name
            );
        }
        info
    }

    /// The raw bytes of a map lump. `REJECT` is allowed to be absent.
    pub fn map_lump(&self, map_name: &str, lump: Lumps) -> &[u8] {
        let info = self.find_lump_for_map_or_panic(map_name, lump);
        self.lump_data(info)
    }

    pub fn read_reject(&self, map_name: &str) -> Vec<u8> {
        let index = self
            .find_lump_index(map_name)
            .unwrap_or_else(|| panic!("Could not find map {}", map_name));
        match self.lumps.get(index + Lumps::Reject as usize) {
            Some(info) if info.name == Lumps::Reject.name() => self.lump_data(info).to_vec(),
            _ => {
                warn!("{}: no REJECT lump, using an empty matrix", map_name);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Lumps, WadBuilder, WadData, WadVertex};

    fn small_wad() -> WadData {
        let mut builder = WadBuilder::new();
        builder.add_lump("PLAYPAL", vec![0; 768]);
        builder.add_map_lumps(
            "E1M1",
            &[],
            &[],
            &[],
            &[WadVertex::new(1, 2), WadVertex::new(-3, 4)],
            &[],
            &[],
            &[],
            &[],
        );
        builder.add_lump("PLAYPAL", vec![1; 768]);
        WadData::from_bytes(builder.build())
    }

    #[test]
    fn read_two_and_four_bytes() {
        let bytes = [0x34, 0x12, 0x78, 0x56];
        assert_eq!(WadData::read_2_bytes(0, &bytes), 0x1234);
        assert_eq!(WadData::read_4_bytes(0, &bytes), 0x5678_1234);
    }

    #[test]
    fn read_header() {
        let wad = WadBuilder::new().build();
        let header = WadData::read_header(&wad);
        assert_eq!(&header.wad_type, b"PWAD");
        assert_eq!(header.dir_count, 0);
    }

    #[test]
    fn find_map_lumps() {
        let wad = small_wad();
        assert!(wad.map_exists("E1M1"));
        assert!(!wad.map_exists("E1M2"));
        let info = wad.find_lump_for_map_or_panic("E1M1", Lumps::Vertexes);
        assert_eq!(info.name, "VERTEXES");
        assert_eq!(info.lump_size, 8);
        assert!(wad.read_reject("E1M1").is_empty());
    }

    #[test]
    fn later_lump_overrides() {
        let wad = small_wad();
        let pal = wad.get_lump("playpal").unwrap();
        assert_eq!(pal[0], 1);
    }

    #[test]
    #[should_panic(expected = "Could not find map")]
    fn missing_map_is_fatal() {
        let wad = small_wad();
        wad.find_lump_for_map_or_panic("MAP01", Lumps::Things);
    }

    #[test]
    #[should_panic(expected = "Invalid WAD header")]
    fn bad_header_is_fatal() {
        WadData::from_bytes(b"JUNKJUNKJUNKJUNK".to_vec());
    }
}
