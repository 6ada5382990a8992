use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::stream::{GpuState, MAX_CLIPS};

/// Size of one [`Uniforms`] block in bytes.
pub const UNIFORM_BLOCK_SIZE: u64 = 768;

/// Per-draw uniform block as the shaders read it (std140-compatible).
///
/// `state` is `(0, viewport_w, viewport_h, 1)`. `transform` already includes
/// the viewport's orthographic projection.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub state: [f32; 4],
    pub transform: [f32; 16],
    pub scalar4: [[f32; 4]; 2],
    pub vector: [[f32; 4]; 8],
    pub clip_size: u32,
    pub _pad: [u32; 3], // 16-byte alignment of `clip`
    pub clip: [[f32; 16]; MAX_CLIPS],
}

const _: () = assert!(std::mem::size_of::<Uniforms>() == UNIFORM_BLOCK_SIZE as usize);

impl Uniforms {
    pub fn from_state(state: &GpuState) -> Self {
        let w = state.viewport_width.max(1) as f32;
        let h = state.viewport_height.max(1) as f32;

        // Top-left origin, +Y down.
        let projection = Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0);
        let transform = projection * Mat4::from_cols_array(&state.transform);

        let s = state.scalar;
        Self {
            state: [0.0, w, h, 1.0],
            transform: transform.to_cols_array(),
            scalar4: [[s[0], s[1], s[2], s[3]], [s[4], s[5], s[6], s[7]]],
            vector: state.vector,
            clip_size: u32::from(state.clip_size).min(MAX_CLIPS as u32),
            _pad: [0; 3],
            clip: state.clip,
        }
    }
}
