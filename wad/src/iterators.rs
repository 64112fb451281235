use crate::lumps::*;
use crate::{Lumps, WadData};

/// Walks the fixed-size records of one lump, decoding each with `transformer`
pub struct LumpIter<'a, T> {
    item_size: usize,
    item_count: usize,
    data: &'a [u8],
    current: usize,
    transformer: fn(&[u8]) -> T,
}

impl<'a, T> LumpIter<'a, T> {
    fn new(data: &'a [u8], item_size: usize, transformer: fn(&[u8]) -> T) -> Self {
        Self {
            item_size,
            item_count: data.len() / item_size,
            data,
            current: 0,
            transformer,
        }
    }
}

impl<T> Iterator for LumpIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current < self.item_count {
            let offset = self.current * self.item_size;
            let item = (self.transformer)(&self.data[offset..offset + self.item_size]);
            self.current += 1;
            return Some(item);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.item_count - self.current;
        (left, Some(left))
    }
}

impl<T> ExactSizeIterator for LumpIter<'_, T> {}

#[inline]
fn i16_at(rec: &[u8], offset: usize) -> i16 {
    WadData::read_2_bytes(offset, rec) as i16
}

#[inline]
fn u16_at(rec: &[u8], offset: usize) -> u16 {
    WadData::read_2_bytes(offset, rec)
}

impl WadData {
    pub fn thing_iter(&self, map_name: &str) -> LumpIter<'_, WadThing> {
        let data = self.map_lump(map_name, Lumps::Things);
        LumpIter::new(data, THING_SIZE, |rec| {
            WadThing::new(
                i16_at(rec, 0),
                i16_at(rec, 2),
                i16_at(rec, 4),
                i16_at(rec, 6),
                i16_at(rec, 8),
            )
        })
    }

    pub fn vertex_iter(&self, map_name: &str) -> LumpIter<'_, WadVertex> {
        let data = self.map_lump(map_name, Lumps::Vertexes);
        LumpIter::new(data, VERTEX_SIZE, |rec| WadVertex::new(i16_at(rec, 0), i16_at(rec, 2)))
    }

    pub fn sector_iter(&self, map_name: &str) -> LumpIter<'_, WadSector> {
        let data = self.map_lump(map_name, Lumps::Sectors);
        LumpIter::new(data, SECTOR_SIZE, |rec| {
            WadSector::new(
                i16_at(rec, 0),
                i16_at(rec, 2),
                &rec[4..12],
                &rec[12..20],
                i16_at(rec, 20),
                i16_at(rec, 22),
                i16_at(rec, 24),
            )
        })
    }

    pub fn sidedef_iter(&self, map_name: &str) -> LumpIter<'_, WadSideDef> {
        let data = self.map_lump(map_name, Lumps::SideDefs);
        LumpIter::new(data, SIDEDEF_SIZE, |rec| {
            WadSideDef::new(
                i16_at(rec, 0),
                i16_at(rec, 2),
                &rec[4..12],
                &rec[12..20],
                &rec[20..28],
                u16_at(rec, 28),
            )
        })
    }

    pub fn linedef_iter(&self, map_name: &str) -> LumpIter<'_, WadLineDef> {
        let data = self.map_lump(map_name, Lumps::LineDefs);
        LumpIter::new(data, LINEDEF_SIZE, |rec| {
            WadLineDef::new(
                u16_at(rec, 0),
                u16_at(rec, 2),
                u16_at(rec, 4),
                i16_at(rec, 6),
                i16_at(rec, 8),
                u16_at(rec, 10),
                u16_at(rec, 12),
            )
        })
    }

    pub fn segment_iter(&self, map_name: &str) -> LumpIter<'_, WadSegment> {
        let data = self.map_lump(map_name, Lumps::Segs);
        LumpIter::new(data, SEGMENT_SIZE, |rec| {
            WadSegment::new(
                u16_at(rec, 0),
                u16_at(rec, 2),
                u16_at(rec, 4),
                u16_at(rec, 6),
                i16_at(rec, 8),
                i16_at(rec, 10),
            )
        })
    }

    pub fn subsector_iter(&self, map_name: &str) -> LumpIter<'_, WadSubSector> {
        let data = self.map_lump(map_name, Lumps::SubSectors);
        LumpIter::new(data, SUBSECTOR_SIZE, |rec| {
            WadSubSector::new(u16_at(rec, 0), u16_at(rec, 2))
        })
    }

    pub fn node_iter(&self, map_name: &str) -> LumpIter<'_, WadNode> {
        let data = self.map_lump(map_name, Lumps::Nodes);
        LumpIter::new(data, NODE_SIZE, |rec| {
            let bbox = |base: usize| {
                [
                    i16_at(rec, base),
                    i16_at(rec, base + 2),
                    i16_at(rec, base + 4),
                    i16_at(rec, base + 6),
                ]
            };
            WadNode::new(
                i16_at(rec, 0),
                i16_at(rec, 2),
                i16_at(rec, 4),
                i16_at(rec, 6),
                [bbox(8), bbox(16)],
                u16_at(rec, 24),
                u16_at(rec, 26),
            )
        })
    }

    pub fn read_blockmap(&self, map_name: &str) -> Option<WadBlockMap> {
        WadBlockMap::from_lump(self.map_lump(map_name, Lumps::Blockmap))
    }
}
