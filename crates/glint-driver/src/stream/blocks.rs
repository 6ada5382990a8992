use crate::ids::TextureId;

/// Vertex layout tag of a vertex block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    /// 140-byte vertices consumed by the fill shader.
    Fill,
    /// 20-byte vertices consumed by the path shader.
    Path,
}

impl VertexFormat {
    #[inline]
    pub const fn stride(self) -> u32 {
        match self {
            VertexFormat::Fill => crate::geometry::FILL_VERTEX_STRIDE,
            VertexFormat::Path => crate::geometry::PATH_VERTEX_STRIDE,
        }
    }
}

/// Borrowed vertex bytes for a geometry upload.
#[derive(Debug, Copy, Clone)]
pub struct VertexBuffer<'a> {
    pub format: VertexFormat,
    pub data: &'a [u8],
}

impl<'a> VertexBuffer<'a> {
    #[inline]
    pub fn new(format: VertexFormat, data: &'a [u8]) -> Self {
        Self { format, data }
    }

    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Borrowed `u32` index bytes for a geometry upload.
#[derive(Debug, Copy, Clone)]
pub struct IndexBuffer<'a> {
    pub data: &'a [u8],
}

impl<'a> IndexBuffer<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    #[inline]
    pub fn from_indices(indices: &'a [u32]) -> Self {
        Self {
            data: bytemuck::cast_slice(indices),
        }
    }

    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Render buffer creation request: the texture it renders into.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderBufferDesc {
    pub texture_id: TextureId,
}
