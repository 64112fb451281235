use math::{ANG90, ANG180, FRACBITS, FRACUNIT, fixed_hypot};
use wad::*;

use crate::testing::{self, MAP_NAME, PLAYER_X, PLAYER_Y};
use crate::{
    LineDefFlags, LoadOptions, MAPBLOCKSHIFT, MapData, NodeChild, PicData, SlopeType,
};

fn plain() -> MapData {
    testing::two_room_map(LoadOptions::default()).2
}

fn mirrored() -> MapData {
    testing::two_room_map(LoadOptions {
        mirror: true,
        ..LoadOptions::default()
    })
    .2
}

#[test]
fn record_counts() {
    let map = plain();
    assert_eq!(map.vertexes.len(), 6);
    assert_eq!(map.linedefs.len(), 7);
    assert_eq!(map.sectors.len(), 2);
    assert_eq!(map.sidedefs().len(), 8);
    assert_eq!(map.segments.len(), 8);
    assert_eq!(map.subsectors.len(), 2);
    assert_eq!(map.nodes.len(), 1);
    assert_eq!(map.things().len(), 2);
    for side in map.sidedefs() {
        assert!(side.sector < map.sectors.len());
    }
    // 2 sectors need a 4 bit matrix, padded up from the empty lump
    assert_eq!(map.get_devils_rejects(), &[0]);
    assert_eq!(map.start_node(), NodeChild::Node(0));
}

#[test]
fn linedef_fields() {
    let map = plain();
    let divider = &map.linedefs[2];
    assert!(divider.is_two_sided());
    assert!(!divider.flags.contains(LineDefFlags::MAPPED));
    assert_eq!(divider.frontsector, 0);
    assert_eq!(divider.backsector, Some(1));
    assert_eq!(divider.slopetype, SlopeType::Vertical);
    assert_eq!(map.linedefs[1].slopetype, SlopeType::Horizontal);
    assert_eq!(map.linedefs[1].backsector, None);

    let side = &map.sidedefs()[2];
    assert_eq!(side.midtexture, Some(2));
    assert_eq!(side.toptexture, Some(0));
    assert_eq!(map.sidedefs()[3].midtexture, None);
}

#[test]
fn seg_sectors_match_sidedefs() {
    let map = plain();
    for seg in &map.segments {
        let side = &map.sidedefs()[seg.sidedef];
        assert_eq!(seg.frontsector, side.sector);
        let line = &map.linedefs[seg.linedef];
        if line.is_two_sided() {
            assert_ne!(seg.backsector, Some(seg.frontsector));
        } else {
            assert_eq!(seg.backsector, None);
        }
    }
    assert_eq!(map.segments[4].frontsector, 1);
    assert_eq!(map.segments[4].backsector, Some(0));
}

#[test]
fn subsector_segs_share_a_sector() {
    let map = plain();
    for ss in &map.subsectors {
        for seg in &map.segments[ss.start_seg..ss.start_seg + ss.seg_count] {
            assert_eq!(seg.frontsector, ss.sector);
        }
    }
    assert_eq!(map.subsectors[1].sector, 1);
}

#[test]
fn group_lines_consistent() {
    let map = plain();
    for sector in &map.sectors {
        let referencing: Vec<usize> = map
            .linedefs
            .iter()
            .filter(|l| l.frontsector == sector.num || l.backsector == Some(sector.num))
            .map(|l| l.num)
            .collect();
        assert_eq!(sector.linecount, referencing.len());
        assert_eq!(sector.lines, referencing);

        let mut union = crate::BBox::cleared();
        for l in &referencing {
            let line = &map.linedefs[*l];
            union.add_point(line.bbox.left, line.bbox.bottom);
            union.add_point(line.bbox.right, line.bbox.top);
        }
        assert_eq!(sector.bbox, union);
    }
    assert_eq!(map.sectors[0].sound_origin, (128 * FRACUNIT, 128 * FRACUNIT));
    assert_eq!(map.sectors[1].sound_origin, (384 * FRACUNIT, 128 * FRACUNIT));
}

#[test]
fn blockbox_covers_lines() {
    let map = plain();
    let bm = map.blockmap();
    for sector in &map.sectors {
        let [top, bottom, left, right] = sector.blockbox;
        for l in &sector.lines {
            let bbox = &map.linedefs[*l].bbox;
            assert!((bbox.top - bm.orgy) >> MAPBLOCKSHIFT <= top);
            assert!((bbox.bottom - bm.orgy) >> MAPBLOCKSHIFT >= bottom);
            assert!((bbox.left - bm.orgx) >> MAPBLOCKSHIFT >= left);
            assert!((bbox.right - bm.orgx) >> MAPBLOCKSHIFT <= right);
        }
    }
}

#[test]
fn built_blockmap_lists_lines() {
    // The test map ships an empty BLOCKMAP so one is built
    let map = plain();
    let bm = map.blockmap();
    assert_eq!((bm.width, bm.height), (5, 3));
    let lines: Vec<usize> = bm.block_lines(0, 0).collect();
    assert_eq!(lines, vec![0, 3]);
    assert!(bm.block_lines(2, 1).any(|l| l == 2));
}

#[test]
fn seg_recompute_is_idempotent() {
    let mut map = plain();
    let before: Vec<_> = map.segments.iter().map(|s| (s.offset, s.length)).collect();
    map.recalc_seg_offsets();
    map.set_seg_lengths();
    let after: Vec<_> = map.segments.iter().map(|s| (s.offset, s.length)).collect();
    assert_eq!(before, after);
    assert_eq!(map.segments[0].length, 256 * FRACUNIT);
}

#[test]
fn stored_offsets_kept_without_recalc() {
    let mut b = WadBuilder::new();
    testing::add_pics(&mut b);
    testing::add_two_rooms(&mut b);
    let mut segs: Vec<u8> = Vec::new();
    for (v1, v2, angle, line, side, offset) in [
        (0u16, 1u16, 0x4000u16, 0u16, 0i16, 12i16),
        (1, 2, 0, 1, 0, 0),
        (2, 5, 0xC000, 2, 0, 0),
        (5, 0, 0x8000, 3, 0, 0),
        (5, 2, 0x4000, 2, 1, 0),
        (2, 3, 0, 4, 0, 0),
        (3, 4, 0xC000, 5, 0, 0),
        (4, 5, 0x8000, 6, 0, 0),
    ] {
        for v in [v1, v2, angle, line] {
            segs.extend_from_slice(&v.to_le_bytes());
        }
        segs.extend_from_slice(&side.to_le_bytes());
        segs.extend_from_slice(&offset.to_le_bytes());
    }
    b.replace_lump("SEGS", segs);
    let wad = b.into_wad();
    let pics = PicData::init(&wad);

    let mut map = MapData::default();
    map.load(
        MAP_NAME,
        &pics,
        &wad,
        LoadOptions {
            mirror: false,
            recalc_seg_offsets: false,
        },
    );
    assert_eq!(map.segments[0].offset, 12 * FRACUNIT);

    map.load(MAP_NAME, &pics, &wad, LoadOptions::default());
    assert_eq!(map.segments[0].offset, 0);
}

#[test]
fn mirror_flips_geometry() {
    let plain = plain();
    let flipped = mirrored();

    for (a, b) in plain.vertexes.iter().zip(&flipped.vertexes) {
        assert_eq!(a.x, -b.x);
        assert_eq!(a.y, b.y);
    }
    for (a, b) in plain.linedefs.iter().zip(&flipped.linedefs) {
        assert_eq!((a.v1, a.v2), (b.v2, b.v1));
        assert_eq!(a.dx, b.dx);
        assert_eq!(a.dy, -b.dy);
    }
    for (a, b) in plain.segments.iter().zip(&flipped.segments) {
        assert_eq!((a.v1, a.v2), (b.v2, b.v1));
        assert_eq!(a.angle, b.angle.wrapping_neg());
    }

    let start = flipped.things()[0];
    assert_eq!(start.x, -PLAYER_X);
    assert_eq!(start.angle, ANG180);
    assert_eq!(plain.things()[1].angle, ANG90);
    assert_eq!(flipped.things()[1].angle, ANG90);

    // Still lands in room A, now on the negative side
    assert_eq!(flipped.point_in_sector(-PLAYER_X, PLAYER_Y), 0);
    assert_eq!(flipped.point_in_sector(-384 * FRACUNIT, PLAYER_Y), 1);
}

#[test]
fn mirror_twice_is_identity() {
    let plain = plain();
    let flipped = mirrored();
    for (a, b) in plain.nodes.iter().zip(&flipped.nodes) {
        let mut back = b.clone();
        back.mirror();
        assert_eq!(&back, a);
        back.mirror();
        assert_eq!(&back, b);
    }
}

#[test]
fn mirror_reverses_blockmap_rows() {
    let mut b = WadBuilder::new();
    testing::add_pics(&mut b);
    testing::add_two_rooms(&mut b);
    // 2x1 grid at (-8, -8): block 0 lists line 0, block 1 lists line 2
    let words: [i16; 11] = [-8, -8, 2, 1, 6, 9, 0, 0, -1, 0, 2];
    let mut lump: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    lump.extend_from_slice(&(-1i16).to_le_bytes());
    b.replace_lump("BLOCKMAP", lump);
    let wad = b.into_wad();
    let pics = PicData::init(&wad);

    let mut map = MapData::default();
    map.load(
        MAP_NAME,
        &pics,
        &wad,
        LoadOptions {
            mirror: true,
            ..LoadOptions::default()
        },
    );
    let bm = map.blockmap();
    assert_eq!(bm.orgx, -(-8 + 2 * 128) * FRACUNIT);
    assert_eq!(bm.orgy, -8 * FRACUNIT);
    assert_eq!(bm.block_lines(0, 0).collect::<Vec<_>>(), vec![2]);
    assert_eq!(bm.block_lines(1, 0).collect::<Vec<_>>(), vec![0]);
}

#[test]
fn point_in_subsector_follows_nodes() {
    let map = plain();
    assert_eq!(map.point_in_subsector(PLAYER_X, PLAYER_Y), 0);
    assert_eq!(map.point_in_subsector(300 * FRACUNIT, 10 * FRACUNIT), 1);
}

/// A lone diagonal line from (0,0) to (100,33) split at (50,17), which is
/// half a unit off the line
fn slime_wad() -> WadData {
    let mut b = WadBuilder::new();
    testing::add_pics(&mut b);
    b.add_map_lumps(
        "MAP01",
        &[],
        &[WadLineDef::new(0, 1, 1, 0, 0, 0, NO_INDEX)],
        &[WadSideDef {
            x_offset: 0,
            y_offset: 0,
            upper_tex: "-".into(),
            lower_tex: "-".into(),
            middle_tex: "WALL".into(),
            sector: 0,
        }],
        &[
            WadVertex::new(0, 0),
            WadVertex::new(100, 33),
            WadVertex::new(50, 17),
        ],
        &[
            WadSegment::new(0, 2, 0, 0, 0, 0),
            WadSegment::new(2, 1, 0, 0, 0, 50),
        ],
        &[WadSubSector::new(2, 0)],
        &[],
        &[WadSector {
            floor_height: 0,
            ceil_height: 64,
            floor_tex: "FLOOR4_8".into(),
            ceil_tex: "CEIL3_5".into(),
            light_level: 255,
            kind: 0,
            tag: 0,
        }],
    );
    b.into_wad()
}

#[test]
fn slime_trails_move_render_position_only() {
    let wad = slime_wad();
    let pics = PicData::init(&wad);
    let mut map = MapData::default();
    map.load("MAP01", &pics, &wad, LoadOptions::default());

    let split = &map.vertexes[2];
    assert!(split.moved);
    assert_eq!((split.x, split.y), (50 << FRACBITS, 17 << FRACBITS));
    assert_eq!((split.px, split.py), (3286551, 1084561));
    for end in &map.vertexes[0..2] {
        assert!(end.moved);
        assert_eq!((end.px, end.py), (end.x, end.y));
    }

    assert_eq!(map.segments[0].length, fixed_hypot(3286551, 1084561));
    assert_eq!(map.segments[0].length, 3460879);
    // Offsets come from the true vertex positions
    assert_eq!(map.segments[1].offset, 52 << FRACBITS);
    assert_eq!(map.start_node(), NodeChild::SubSector(0));
    assert_eq!(map.point_in_sector(0, 0), 0);
}

#[test]
#[should_panic(expected = "Could not find map")]
fn missing_map_is_fatal() {
    let wad = testing::two_room_wad();
    let pics = PicData::init(&wad);
    MapData::default().load("MAP30", &pics, &wad, LoadOptions::default());
}
