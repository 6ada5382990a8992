use crate::ids::{RenderBufferId, TextureId};

/// Maximum clip entries carried per draw.
pub const MAX_CLIPS: usize = 8;

/// Shader program selector of a draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ShaderType {
    /// Quads and glyphs; samples up to two textures.
    #[default]
    Fill,
    /// Tessellated path coverage; no texture sets.
    Path,
}

/// Integer rectangle given as edges, in target pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScissorRect {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }
}

/// Per-draw GPU state block.
///
/// `transform` and every `clip` matrix are column-major 4x4. `scalar` and
/// `vector` are forwarded to the shaders verbatim as ten 4-component vectors.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GpuState {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub transform: [f32; 16],
    pub shader_type: ShaderType,
    pub render_buffer_id: RenderBufferId,
    pub texture_1_id: TextureId,
    pub texture_2_id: TextureId,
    pub scalar: [f32; 8],
    pub vector: [[f32; 4]; 8],
    pub clip_size: u8,
    pub clip: [[f32; 16]; MAX_CLIPS],
    pub enable_scissor: bool,
    pub scissor_rect: ScissorRect,
}

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

impl GpuState {
    /// Untextured fill state with an identity transform covering `width` x `height`.
    pub fn new(render_buffer_id: RenderBufferId, width: u32, height: u32) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            transform: IDENTITY,
            shader_type: ShaderType::Fill,
            render_buffer_id,
            texture_1_id: TextureId::NONE,
            texture_2_id: TextureId::NONE,
            scalar: [0.0; 8],
            vector: [[0.0; 4]; 8],
            clip_size: 0,
            clip: [IDENTITY; MAX_CLIPS],
            enable_scissor: false,
            scissor_rect: ScissorRect::default(),
        }
    }

    /// Texture bound to the second sampling slot: `texture_2_id`, or
    /// `texture_1_id` when the draw names only one texture.
    #[inline]
    pub fn second_texture(&self) -> TextureId {
        if self.texture_2_id.0 == 0 {
            self.texture_1_id
        } else {
            self.texture_2_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_texture_falls_back_to_first() {
        let mut s = GpuState::new(RenderBufferId(1), 8, 8);
        s.texture_1_id = TextureId(3);
        assert_eq!(s.second_texture(), TextureId(3));

        s.texture_2_id = TextureId(4);
        assert_eq!(s.second_texture(), TextureId(4));
    }
}
