use bytemuck::{Pod, Zeroable};

/// Byte stride of a [`FillVertex`].
pub const FILL_VERTEX_STRIDE: u32 = 140;
/// Byte stride of a [`PathVertex`].
pub const PATH_VERTEX_STRIDE: u32 = 20;

/// Vertex consumed by the fill shader: position, premultiplied color, texture
/// coordinates, object coordinates and seven generic data vectors.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FillVertex {
    pub pos: [f32; 2],
    pub color: [u8; 4],
    pub tex: [f32; 2],
    pub obj: [f32; 2],
    pub data: [[f32; 4]; 7],
}

/// Vertex consumed by the path shader. Its first 12 bytes coincide with a
/// [`FillVertex`]; `obj` follows directly after the color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PathVertex {
    pub pos: [f32; 2],
    pub color: [u8; 4],
    pub obj: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<FillVertex>() == FILL_VERTEX_STRIDE as usize);
const _: () = assert!(std::mem::size_of::<PathVertex>() == PATH_VERTEX_STRIDE as usize);

impl FillVertex {
    const ATTRS: [wgpu::VertexAttribute; 11] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Unorm8x4,  // color
        2 => Float32x2, // tex
        3 => Float32x2, // obj
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x4,
        10 => Float32x4
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: FILL_VERTEX_STRIDE as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Opaque vertex at `pos` sampling `tex`, with object coordinates equal to `tex`.
    pub fn textured(pos: [f32; 2], tex: [f32; 2]) -> Self {
        Self {
            pos,
            color: [255; 4],
            tex,
            obj: tex,
            data: [[0.0; 4]; 7],
        }
    }
}

impl PathVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Unorm8x4,  // color
        2 => Float32x2  // obj
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: PATH_VERTEX_STRIDE as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_vertex_shares_fill_prefix() {
        let fill = FillVertex {
            pos: [1.0, 2.0],
            color: [9, 8, 7, 6],
            tex: [0.5, 0.25],
            obj: [0.0; 2],
            data: [[0.0; 4]; 7],
        };
        let path = PathVertex {
            pos: [1.0, 2.0],
            color: [9, 8, 7, 6],
            obj: [0.5, 0.25],
        };
        let fill_bytes = bytemuck::bytes_of(&fill);
        let path_bytes = bytemuck::bytes_of(&path);
        assert_eq!(&fill_bytes[..12], &path_bytes[..12]);
    }

    #[test]
    fn layouts_match_strides() {
        assert_eq!(FillVertex::layout().array_stride, 140);
        assert_eq!(PathVertex::layout().array_stride, 20);
        assert_eq!(FillVertex::ATTRS[4].offset, 28);
        assert_eq!(PathVertex::ATTRS[2].offset, 12);
    }
}
