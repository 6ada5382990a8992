//! Graphics backend seam.
//!
//! Managers and the command-list interpreter speak only to [`Backend`]. A
//! backend owns the native objects behind each handle type and records every
//! copy, clear and draw into a single per-frame command stream that is handed
//! to the GPU by [`Backend::submit`].
//!
//! Two realizations ship with the crate:
//! - [`wgpu_backend::WgpuBackend`] drives a real device through wgpu
//! - [`recording::RecordingBackend`] simulates images and buffers on the CPU
//!   and logs every call, for verifying call order without a GPU

pub mod recording;
pub mod wgpu_backend;

use crate::error::DriverResult;
use crate::stream::{PixelFormat, ShaderType};

/// Access mode of an image, changed only through [`Backend::transition`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ImageLayout {
    /// Freshly allocated; contents undefined.
    Undefined,
    /// Destination of a copy or clear.
    TransferDst,
    /// Sampleable by shaders. Resting layout of every texture between commands.
    ShaderReadOnly,
}

/// Width/height pair in pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Scissor rectangle in target pixels, origin top-left.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Scissor {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Scissor {
    #[inline]
    pub const fn full(area: Extent) -> Self {
        Self {
            x: 0,
            y: 0,
            width: area.width,
            height: area.height,
        }
    }
}

/// Role of a device-local buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// Image allocation request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Render targets are attachable and cleared; data textures receive copies.
    pub render_target: bool,
}

/// Hard limits the managers check before recording copies.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BackendLimits {
    /// Exclusive ceiling for any single staged copy, in bytes.
    pub max_copy_size: u64,
    /// Required multiple for the bytes-per-row of buffer-to-image copies.
    pub copy_row_alignment: u32,
    /// Required multiple for dynamic uniform offsets.
    pub uniform_offset_alignment: u32,
}

impl Default for BackendLimits {
    fn default() -> Self {
        Self {
            max_copy_size: i32::MAX as u64,
            copy_row_alignment: 1,
            uniform_offset_alignment: 256,
        }
    }
}

/// A graphics API the driver can realize resources and commands on.
///
/// Creation methods may fail; such failures are fatal for the frame. Pass
/// commands fail only when no pass is open. Destruction consumes the handle.
pub trait Backend {
    /// Image, its memory and its view.
    type Texture;
    /// Sampling descriptor of one texture (image view + shared sampler).
    type Binding;
    /// Host-visible copy source.
    type Staging;
    /// Device-local vertex or index buffer.
    type Buffer;
    /// Attachment binding that makes a texture renderable.
    type Framebuffer;
    /// Uniform arena buffer together with its dynamic-offset binding.
    type Uniforms;

    fn limits(&self) -> BackendLimits;

    // ── images ────────────────────────────────────────────────────────────

    fn create_texture(&mut self, desc: &TextureDesc) -> DriverResult<Self::Texture>;
    fn destroy_texture(&mut self, texture: Self::Texture);

    fn create_binding(&mut self, texture: &Self::Texture) -> DriverResult<Self::Binding>;
    fn destroy_binding(&mut self, binding: Self::Binding);

    /// Records a layout change of the whole image.
    fn transition(&mut self, texture: &Self::Texture, from: ImageLayout, to: ImageLayout);

    /// Records a full-image clear to transparent black. The image is in
    /// [`ImageLayout::TransferDst`] and no pass is open.
    fn clear_image(&mut self, texture: &Self::Texture);

    // ── staging ───────────────────────────────────────────────────────────

    fn create_staging(&mut self, size: u64) -> DriverResult<Self::Staging>;
    fn destroy_staging(&mut self, staging: Self::Staging);

    /// Overwrites the start of `staging` with `bytes`.
    fn write_staging(&mut self, staging: &Self::Staging, bytes: &[u8]);

    /// Records a copy of `extent` texels out of `staging`, rows `bytes_per_row`
    /// apart. The image is in [`ImageLayout::TransferDst`].
    fn copy_staging_to_texture(
        &mut self,
        staging: &Self::Staging,
        texture: &Self::Texture,
        bytes_per_row: u32,
        extent: Extent,
    );

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self, size: u64, usage: BufferUsage) -> DriverResult<Self::Buffer>;
    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    /// Records a copy of the first `size` bytes of `staging` into `buffer`.
    fn copy_staging_to_buffer(&mut self, staging: &Self::Staging, buffer: &Self::Buffer, size: u64);

    // ── render targets ────────────────────────────────────────────────────

    fn create_framebuffer(&mut self, texture: &Self::Texture) -> DriverResult<Self::Framebuffer>;
    fn destroy_framebuffer(&mut self, framebuffer: Self::Framebuffer);

    // ── uniforms ──────────────────────────────────────────────────────────

    /// Allocates `slots` uniform blocks of `slot_size` bytes each.
    fn create_uniforms(&mut self, slot_size: u64, slots: u32) -> DriverResult<Self::Uniforms>;
    fn destroy_uniforms(&mut self, uniforms: Self::Uniforms);
    fn write_uniforms(&mut self, uniforms: &Self::Uniforms, bytes: &[u8]);

    // ── passes ────────────────────────────────────────────────────────────

    /// Opens a pass that loads and stores `framebuffer`'s contents.
    fn begin_pass(&mut self, framebuffer: &Self::Framebuffer, area: Extent);
    /// Closes the open pass, if any.
    fn end_pass(&mut self);

    fn bind_pipeline(&mut self, shader: ShaderType) -> DriverResult<()>;
    fn bind_uniforms(&mut self, uniforms: &Self::Uniforms, offset: u32) -> DriverResult<()>;
    /// Binds the two texture sets of the fill pipeline; `None` binds a
    /// backend-provided transparent placeholder.
    fn bind_textures(
        &mut self,
        first: Option<&Self::Binding>,
        second: Option<&Self::Binding>,
    ) -> DriverResult<()>;
    fn bind_geometry(&mut self, vertices: &Self::Buffer, indices: &Self::Buffer) -> DriverResult<()>;
    fn set_viewport(&mut self, area: Extent) -> DriverResult<()>;
    fn set_scissor(&mut self, rect: Scissor) -> DriverResult<()>;
    fn draw_indexed(&mut self, count: u32, first_index: u32) -> DriverResult<()>;

    // ── submission ────────────────────────────────────────────────────────

    /// Closes any open pass and submits everything recorded so far.
    fn submit(&mut self) -> DriverResult<()>;
}

/// Backends that can copy an image back to the CPU.
pub trait Readback: Backend {
    /// Returns the texture's contents as tightly packed rows.
    fn read_texture(&mut self, texture: &Self::Texture) -> DriverResult<Vec<u8>>;
}
