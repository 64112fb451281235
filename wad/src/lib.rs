//! This crate contains all the structures and tools for processing
//! WAD files: the directory, map lumps, and picture data.
//!
//! The structure of a WAD is this:
//!
//! ```text,ignore
//!                        <───── 32 bits ──────>
//!                        ┌────────────────────┐
//!             ┌──── 0x00 |  ASCII WAD Type    | 0x03
//!             |          | ────────────────── |
//!     Header ─┤     0x04 | # of directories   | 0x07
//!             |          | ────────────────── |
//!             └──── 0x08 | offset to listing ───0x0B ──┐
//!             ┌───────── | ────────────────── |        |
//!             |     0x0C | ┌────────────────┐ |        |
//!             |          | |   Lump Bytes   |<─────┐   |
//!     Lumps ──┤          | |       .        | |    |   |
//!             |          | └────────────────┘ |    |   |
//!             └───────── |         .          |    |   |
//!             ┌───────── | ┌────────────────┐<─────────┘
//!             |          | |   Lump Offset  |──────┘
//!  Directory ─┤          | |   Lump Size    | |
//!     List    |          | |   Lump Name    | |
//!             |          | └────────────────┘ |
//!             └───────── └────────────────────┘
//! ```

mod builder;
mod iterators;
pub mod lumps;
mod pics;
mod wad;

pub use builder::WadBuilder;
pub use iterators::LumpIter;
pub use lumps::*;
pub use pics::*;
pub use wad::*;
