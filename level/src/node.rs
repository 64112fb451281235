use math::{FRACBITS, Fixed};
use wad::WadNode;

use crate::map_defs::point_on_line_side;
use crate::{BBox, Node, NodeChild};

const NF_SUBSECTOR: u16 = 0x8000;

impl Default for NodeChild {
    /// A map without nodes is a single subsector
    fn default() -> Self {
        NodeChild::SubSector(0)
    }
}

impl NodeChild {
    /// Decode a 16 bit child index. `0xFFFF` and leaf indexes past the end
    /// both fall back to subsector 0.
    pub fn from_wad(child: u16, num_subsectors: usize) -> NodeChild {
        if child == wad::NO_INDEX {
            NodeChild::SubSector(0)
        } else if child & NF_SUBSECTOR != 0 {
            let index = (child & !NF_SUBSECTOR) as usize;
            if index >= num_subsectors {
                NodeChild::SubSector(0)
            } else {
                NodeChild::SubSector(index)
            }
        } else {
            NodeChild::Node(child as usize)
        }
    }
}

impl Node {
    /// Convert a `NODES` record, mirroring it as it is read if asked to
    pub fn from_wad(n: &WadNode, num_subsectors: usize, mirror: bool) -> Node {
        let bbox = |b: &[i16; 4]| BBox {
            top: (b[0] as Fixed) << FRACBITS,
            bottom: (b[1] as Fixed) << FRACBITS,
            left: (b[2] as Fixed) << FRACBITS,
            right: (b[3] as Fixed) << FRACBITS,
        };
        let mut node = Node {
            x: (n.x as Fixed) << FRACBITS,
            y: (n.y as Fixed) << FRACBITS,
            dx: (n.dx as Fixed) << FRACBITS,
            dy: (n.dy as Fixed) << FRACBITS,
            bboxes: [bbox(&n.bounding_boxes[0]), bbox(&n.bounding_boxes[1])],
            children: [
                NodeChild::from_wad(n.child_index[0], num_subsectors),
                NodeChild::from_wad(n.child_index[1], num_subsectors),
            ],
        };
        if mirror {
            node.mirror();
        }
        node
    }

    /// Flip along the x axis. The partition is reversed so the front child
    /// stays on the front side. Applying it twice restores the node.
    pub fn mirror(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
        self.x = -self.x;
        self.dy = -self.dy;
        for bbox in self.bboxes.iter_mut() {
            let left = bbox.left;
            bbox.left = -bbox.right;
            bbox.right = -left;
        }
    }

    /// R_PointOnSide
    ///
    /// Determine with a fixed point cross-product which side of the splitting
    /// line the point is on. 0 is the front.
    pub fn point_on_side(&self, x: Fixed, y: Fixed) -> usize {
        point_on_line_side(x, y, self.x, self.y, self.dx, self.dy)
    }

    pub fn point_in_bounds(&self, x: Fixed, y: Fixed, side: usize) -> bool {
        let b = &self.bboxes[side];
        x >= b.left && x <= b.right && y >= b.bottom && y <= b.top
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::FRACUNIT;

    fn wad_node() -> WadNode {
        WadNode::new(
            64,
            0,
            0,
            128,
            [[128, 0, 64, 192], [128, 0, -64, 64]],
            NF_SUBSECTOR | 1,
            0,
        )
    }

    #[test]
    fn children_decode() {
        assert_eq!(NodeChild::from_wad(0xFFFF, 4), NodeChild::SubSector(0));
        assert_eq!(NodeChild::from_wad(0x8003, 4), NodeChild::SubSector(3));
        assert_eq!(NodeChild::from_wad(0x8004, 4), NodeChild::SubSector(0));
        assert_eq!(NodeChild::from_wad(7, 4), NodeChild::Node(7));
    }

    #[test]
    fn mirrored_node_keeps_sides() {
        let node = Node::from_wad(&wad_node(), 2, false);
        let flipped = Node::from_wad(&wad_node(), 2, true);

        // Partition is x = 64 running north, front is east
        assert_eq!(node.point_on_side(100 * FRACUNIT, 10 * FRACUNIT), 0);
        assert_eq!(node.point_on_side(10 * FRACUNIT, 10 * FRACUNIT), 1);
        // Mirrored the partition is x = -64 and east becomes west
        assert_eq!(flipped.x, -64 * FRACUNIT);
        assert_eq!(flipped.y, 128 * FRACUNIT);
        assert_eq!(flipped.dy, -128 * FRACUNIT);
        assert_eq!(flipped.point_on_side(-100 * FRACUNIT, 10 * FRACUNIT), 0);
        assert_eq!(flipped.point_on_side(-10 * FRACUNIT, 10 * FRACUNIT), 1);

        assert_eq!(flipped.bboxes[0].left, -192 * FRACUNIT);
        assert_eq!(flipped.bboxes[0].right, -64 * FRACUNIT);
        assert!(flipped.point_in_bounds(-100 * FRACUNIT, 10 * FRACUNIT, 0));
        assert_eq!(flipped.children, node.children);
    }
}
