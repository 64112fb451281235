//! Fixed-point arithmetic, binary angles, and the trig lookup tables shared
//! by the level loader and the software renderer.
//!
//! Nothing in here uses floating point at runtime. The tables are generated
//! once with `f64` and every later use is integer only.

mod angle;
mod fixed_point;
mod tables;

pub use angle::*;
pub use fixed_point::*;
pub use tables::{finecosine, finesine, finetangent, init_tables, tantoangle};
