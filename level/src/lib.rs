//! The static geometry of one level, rebuilt from its WAD lumps, and the
//! picture data the renderer samples.
//!
//! Everything links by index in to the `Vec`s owned by `MapData`. The only
//! field that changes while a frame is drawn is `LineDefFlags::MAPPED`.

mod map_data;
mod map_defs;
mod node;
mod pic_data;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
#[cfg(test)]
mod tests;

pub use map_data::{LoadOptions, MAPBLOCKSHIFT, MAPBLOCKUNITS, MAXRADIUS, MapData};
pub use map_defs::*;
pub use pic_data::*;
