use level::{BBox, MapData, NodeChild, PicData};
#[cfg(feature = "hprof")]
use coarse_prof::profile;
use math::{ANG90, ANG180, ANGLETOFINESHIFT, Angle, point_to_angle};
use render_trait::PixelBuffer;

use crate::SoftwareRenderer;
use crate::defs::ClipRange;

/// Corners of a `BBox` (as `[top, bottom, left, right]` indexes) that span
/// it as seen from each of the nine regions around it
const CHECKCOORD: [[usize; 4]; 12] = [
    [3, 0, 2, 1],
    [3, 0, 2, 0],
    [3, 1, 2, 0],
    [0, 0, 0, 0],
    [2, 0, 2, 1],
    [0, 0, 0, 0],
    [3, 1, 3, 0],
    [0, 0, 0, 0],
    [2, 0, 3, 1],
    [2, 1, 3, 1],
    [2, 1, 3, 0],
    [0, 0, 0, 0],
];

impl SoftwareRenderer {
    /// R_ClearClipSegs - r_bsp
    pub(crate) fn clear_clip_segs(&mut self) {
        let solidsegs = &mut self.scratch.solidsegs;
        solidsegs[0] = ClipRange {
            first: -0x7fff_ffff,
            last: -1,
        };
        solidsegs[1] = ClipRange {
            first: self.tables.viewwidth,
            last: 0x7fff_ffff,
        };
        self.scratch.new_end = 2;
    }

    /// Clip an angle pair to the view. Returns `None` when the span is
    /// entirely outside of it.
    fn clip_to_view(&self, mut angle1: Angle, mut angle2: Angle, span: Angle) -> Option<(Angle, Angle)> {
        let clipangle = self.tables.clipangle;
        let clipspan = clipangle.wrapping_mul(2);

        let mut tspan = angle1.wrapping_add(clipangle);
        if tspan > clipspan {
            tspan -= clipspan;
            // Totally off the left edge?
            if tspan >= span {
                return None;
            }
            angle1 = clipangle;
        }
        tspan = clipangle.wrapping_sub(angle2);
        if tspan > clipspan {
            tspan -= clipspan;
            // Totally off the left edge?
            if tspan >= span {
                return None;
            }
            angle2 = clipangle.wrapping_neg();
        }
        Some((angle1, angle2))
    }

    #[inline]
    fn angle_to_x(&self, angle: Angle) -> i32 {
        self.tables.viewangletox[(angle.wrapping_add(ANG90) >> ANGLETOFINESHIFT) as usize]
    }

    /// R_AddLine - r_bsp
    ///
    /// Clips the given segment and adds any visible pieces to the line list.
    pub(crate) fn add_line(&mut self, map: &MapData, seg_num: usize, pic_data: &PicData, pixels: &mut impl PixelBuffer) {
        let seg = &map.segments[seg_num];
        let v1 = &map.vertexes[seg.v1];
        let v2 = &map.vertexes[seg.v2];
        let view = &self.view;

        // OPTIMIZE: quickly reject orthogonal back sides.
        let angle1 = point_to_angle(v1.px.wrapping_sub(view.x), v1.py.wrapping_sub(view.y));
        let angle2 = point_to_angle(v2.px.wrapping_sub(view.x), v2.py.wrapping_sub(view.y));

        // Clip to view edges.
        let span = angle1.wrapping_sub(angle2);

        // Back side? I.e. backface culling
        if span >= ANG180 {
            return;
        }

        // Global angle needed by segcalc.
        self.seg.rw_angle1 = angle1;
        let Some((angle1, angle2)) = self.clip_to_view(
            angle1.wrapping_sub(self.view.angle),
            angle2.wrapping_sub(self.view.angle),
            span,
        ) else {
            return;
        };

        // The seg is in the view range, but not necessarily visible.
        let x1 = self.angle_to_x(angle1);
        let x2 = self.angle_to_x(angle2);

        // Does not cross a pixel?
        if x1 >= x2 {
            return;
        }

        self.seg.curline = seg_num;
        let front = &map.sectors[self.seg.frontsector];
        match seg.backsector.map(|b| &map.sectors[b]) {
            // Single sided line?
            None => self.clip_solid_wall_segment(x1, x2 - 1, map, pic_data, pixels),
            Some(back) => {
                // Closed door.
                if back.ceilingheight <= front.floorheight || back.floorheight >= front.ceilingheight {
                    self.clip_solid_wall_segment(x1, x2 - 1, map, pic_data, pixels);
                    return;
                }

                // Window.
                if back.ceilingheight != front.ceilingheight || back.floorheight != front.floorheight {
                    self.clip_portal_segment(x1, x2 - 1, map, pic_data, pixels);
                    return;
                }

                // Reject empty lines used for triggers and special events.
                // Identical floor and ceiling on both sides, identical light
                // levels on both sides, and no middle texture.
                if back.ceilingpic == front.ceilingpic
                    && back.floorpic == front.floorpic
                    && back.lightlevel == front.lightlevel
                    && map.sidedefs()[seg.sidedef].midtexture.is_none()
                {
                    return;
                }
                self.clip_portal_segment(x1, x2 - 1, map, pic_data, pixels);
            }
        }
    }

    /// R_ClipSolidWallSegment - r_bsp
    ///
    /// Draws the visible parts of a solid wall and adds its range to the
    /// solid segs, merging any it touches.
    fn clip_solid_wall_segment(
        &mut self,
        first: i32,
        last: i32,
        map: &MapData,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        // Find the first range that touches the range
        //  (adjacent pixels are touching).
        let mut start = 0;
        while self.scratch.solidsegs[start].last < first - 1 {
            start += 1;
        }

        if first < self.scratch.solidsegs[start].first {
            if last < self.scratch.solidsegs[start].first - 1 {
                // Post is entirely visible (above start),
                //  so insert a new clippost.
                self.store_wall_range(first, last, map, pic_data, pixels);

                let solidsegs = &mut self.scratch.solidsegs;
                let new_end = self.scratch.new_end;
                solidsegs.copy_within(start..new_end, start + 1);
                solidsegs[start] = ClipRange { first, last };
                self.scratch.new_end += 1;
                return;
            }

            // There is a fragment above *start.
            let to = self.scratch.solidsegs[start].first - 1;
            self.store_wall_range(first, to, map, pic_data, pixels);
            // Now adjust the clip size.
            self.scratch.solidsegs[start].first = first;
        }

        // Bottom contained in start?
        if last <= self.scratch.solidsegs[start].last {
            return;
        }

        let mut next = start;
        while last >= self.scratch.solidsegs[next + 1].first - 1 {
            // There is a fragment between two posts.
            let from = self.scratch.solidsegs[next].last + 1;
            let to = self.scratch.solidsegs[next + 1].first - 1;
            self.store_wall_range(from, to, map, pic_data, pixels);
            next += 1;

            if last <= self.scratch.solidsegs[next].last {
                // Bottom is contained in next.
                // Adjust the clip size.
                self.scratch.solidsegs[start].last = self.scratch.solidsegs[next].last;
                self.crunch(start, next);
                return;
            }
        }

        // There is a fragment after *next.
        let from = self.scratch.solidsegs[next].last + 1;
        self.store_wall_range(from, last, map, pic_data, pixels);
        // Adjust the clip size.
        self.scratch.solidsegs[start].last = last;
        self.crunch(start, next);
    }

    /// Remove start+1 to next from the clip list, because start now covers
    /// their area.
    fn crunch(&mut self, start: usize, next: usize) {
        if next == start {
            // Post just extended past the bottom of one post.
            return;
        }
        let new_end = self.scratch.new_end;
        self.scratch.solidsegs.copy_within(next + 1..new_end, start + 1);
        self.scratch.new_end -= next - start;
    }

    /// R_ClipPassWallSegment - r_bsp
    ///
    /// Clips the given range of columns, but does not include it in the clip
    /// list. Does handle windows, e.g. LineDefs with upper and lower texture.
    fn clip_portal_segment(
        &mut self,
        first: i32,
        last: i32,
        map: &MapData,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        // Find the first range that touches the range
        //  (adjacent pixels are touching).
        let mut start = 0;
        while self.scratch.solidsegs[start].last < first - 1 {
            start += 1;
        }

        if first < self.scratch.solidsegs[start].first {
            if last < self.scratch.solidsegs[start].first - 1 {
                // Post is entirely visible (above start).
                self.store_wall_range(first, last, map, pic_data, pixels);
                return;
            }

            // There is a fragment above *start.
            let to = self.scratch.solidsegs[start].first - 1;
            self.store_wall_range(first, to, map, pic_data, pixels);
        }

        // Bottom contained in start?
        if last <= self.scratch.solidsegs[start].last {
            return;
        }

        while last >= self.scratch.solidsegs[start + 1].first - 1 {
            // There is a fragment between two posts.
            let from = self.scratch.solidsegs[start].last + 1;
            let to = self.scratch.solidsegs[start + 1].first - 1;
            self.store_wall_range(from, to, map, pic_data, pixels);
            start += 1;

            if last <= self.scratch.solidsegs[start].last {
                return;
            }
        }

        // There is a fragment after *next.
        let from = self.scratch.solidsegs[start].last + 1;
        self.store_wall_range(from, last, map, pic_data, pixels);
    }

    /// R_Subsector - r_bsp
    ///
    /// Determine floor/ceiling planes, add sprites of things in the sector
    /// and draw one or more line segments.
    fn subsector(&mut self, map: &MapData, num: usize, pic_data: &PicData, pixels: &mut impl PixelBuffer) {
        let subsector = &map.subsectors[num];
        let sector_num = subsector.sector;
        let sector = &map.sectors[sector_num];
        let skynum = pic_data.sky_num();
        self.seg.frontsector = sector_num;
        self.scratch.sscount += 1;

        let planes = &mut self.scratch.planes;
        planes.floorplane = if sector.floorheight < self.view.z {
            Some(planes.find_plane(sector.floorheight, sector.floorpic, sector.lightlevel, skynum))
        } else {
            None
        };
        planes.ceilingplane = if sector.ceilingheight > self.view.z || sector.ceilingpic == skynum {
            Some(planes.find_plane(sector.ceilingheight, sector.ceilingpic, sector.lightlevel, skynum))
        } else {
            None
        };

        self.add_sprites(map, sector_num, pic_data);

        for seg_num in subsector.start_seg..subsector.start_seg + subsector.seg_count {
            self.add_line(map, seg_num, pic_data, pixels);
        }
    }

    /// R_CheckBBox - r_bsp
    ///
    /// Checks BSP node/subtree bounding box. Returns true if some part of
    /// the bbox might be visible.
    pub(crate) fn check_bbox(&self, bbox: &BBox) -> bool {
        let view = &self.view;

        // Find the corners of the box that define the edges from current
        // viewpoint.
        let boxx = if view.x <= bbox.left {
            0
        } else if view.x < bbox.right {
            1
        } else {
            2
        };
        let boxy = if view.y >= bbox.top {
            0
        } else if view.y > bbox.bottom {
            1
        } else {
            2
        };

        let boxpos = (boxy << 2) + boxx;
        if boxpos == 5 {
            return true;
        }

        let coords = [bbox.top, bbox.bottom, bbox.left, bbox.right];
        let corners = CHECKCOORD[boxpos];
        let x1 = coords[corners[0]];
        let y1 = coords[corners[1]];
        let x2 = coords[corners[2]];
        let y2 = coords[corners[3]];

        // check clip list for an open space
        let angle1 = point_to_angle(x1.wrapping_sub(view.x), y1.wrapping_sub(view.y));
        let angle2 = point_to_angle(x2.wrapping_sub(view.x), y2.wrapping_sub(view.y));
        let span = angle1.wrapping_sub(angle2);

        // Sitting on a line?
        if span >= ANG180 {
            return true;
        }

        let Some((angle1, angle2)) = self.clip_to_view(
            angle1.wrapping_sub(view.angle),
            angle2.wrapping_sub(view.angle),
            span,
        ) else {
            return false;
        };

        // Find the first clippost that touches the source post (adjacent
        // pixels are touching).
        let sx1 = self.angle_to_x(angle1);
        let sx2 = self.angle_to_x(angle2);

        // Does not cross a pixel.
        if sx1 == sx2 {
            return false;
        }
        let sx2 = sx2 - 1;

        let solidsegs = &self.scratch.solidsegs;
        let mut start = 0;
        while solidsegs[start].last < sx2 {
            start += 1;
        }

        // The clippost contains the new span.
        !(sx1 >= solidsegs[start].first && sx2 <= solidsegs[start].last)
    }

    /// R_RenderBSPNode - r_bsp
    ///
    /// Renders all subsectors below a given node, traversing subtree
    /// recursively. Just call with BSP root.
    pub(crate) fn render_bsp_node(
        &mut self,
        map: &MapData,
        child: NodeChild,
        pic_data: &PicData,
        pixels: &mut impl PixelBuffer,
    ) {
        #[cfg(feature = "hprof")]
        profile!("render_bsp_node");
        let num = match child {
            NodeChild::SubSector(num) => {
                self.subsector(map, num, pic_data, pixels);
                return;
            }
            NodeChild::Node(num) => num,
        };

        let node = &map.nodes[num];
        // Decide which side the view point is on.
        let side = node.point_on_side(self.view.x, self.view.y);

        // Recursively divide front space.
        self.render_bsp_node(map, node.children[side], pic_data, pixels);

        // Possibly divide back space.
        if self.check_bbox(&node.bboxes[side ^ 1]) {
            self.render_bsp_node(map, node.children[side ^ 1], pic_data, pixels);
        }
    }
}
