//! Per-draw uniform block and the arena it is staged in.

mod block;
mod stager;

pub use block::{UNIFORM_BLOCK_SIZE, Uniforms};
pub use stager::UniformStager;
