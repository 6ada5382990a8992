//! CPU-side backend that records every call.
//!
//! Images, staging buffers, device buffers and uniform arenas are plain byte
//! vectors, so copies and clears have observable results and can be read back.
//! Pass commands are validated the same way a real backend would reject them.

use std::collections::HashMap;

use crate::error::{DriverError, DriverResult};
use crate::stream::ShaderType;

use super::{Backend, BackendLimits, BufferUsage, Extent, ImageLayout, Readback, Scissor, TextureDesc};

/// Handle to any object owned by a [`RecordingBackend`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One recorded backend call. Handles are identified by index.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateTexture { texture: usize, width: u32, height: u32, render_target: bool },
    DestroyTexture { texture: usize },
    CreateBinding { binding: usize, texture: usize },
    DestroyBinding { binding: usize },
    Transition { texture: usize, from: ImageLayout, to: ImageLayout },
    ClearImage { texture: usize },
    CreateStaging { staging: usize, size: u64 },
    DestroyStaging { staging: usize },
    WriteStaging { staging: usize, len: usize },
    CopyToTexture { staging: usize, texture: usize, bytes_per_row: u32 },
    CreateBuffer { buffer: usize, size: u64, usage: BufferUsage },
    DestroyBuffer { buffer: usize },
    CopyToBuffer { staging: usize, buffer: usize, size: u64 },
    CreateFramebuffer { framebuffer: usize, texture: usize },
    DestroyFramebuffer { framebuffer: usize },
    CreateUniforms { uniforms: usize, size: u64 },
    DestroyUniforms { uniforms: usize },
    WriteUniforms { uniforms: usize, len: usize },
    BeginPass { framebuffer: usize, area: Extent },
    EndPass,
    BindPipeline(ShaderType),
    BindUniforms { uniforms: usize, offset: u32 },
    BindTextures { first: Option<usize>, second: Option<usize> },
    BindGeometry { vertices: usize, indices: usize },
    SetViewport(Extent),
    SetScissor(Scissor),
    DrawIndexed { count: u32, first_index: u32 },
    Submit,
}

#[derive(Debug)]
struct SimImage {
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    pixels: Vec<u8>,
}

/// Backend that simulates GPU objects in memory and keeps a call log.
#[derive(Debug)]
pub struct RecordingBackend {
    limits: BackendLimits,
    calls: Vec<Call>,
    next_handle: usize,
    images: HashMap<usize, SimImage>,
    memory: HashMap<usize, Vec<u8>>,
    framebuffers: HashMap<usize, usize>,
    bindings: HashMap<usize, usize>,
    in_pass: bool,
    fail_after: Option<usize>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_limits(BackendLimits::default())
    }

    pub fn with_limits(limits: BackendLimits) -> Self {
        Self {
            limits,
            calls: Vec::new(),
            next_handle: 1,
            images: HashMap::new(),
            memory: HashMap::new(),
            framebuffers: HashMap::new(),
            bindings: HashMap::new(),
            in_pass: false,
            fail_after: None,
        }
    }

    /// Every call recorded so far, in order.
    #[inline]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Returns and forgets the recorded calls.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Makes the next `create_*` call fail.
    pub fn fail_next_creation(&mut self) {
        self.fail_creation_after(0);
    }

    /// Lets `n` more `create_*` calls succeed, then fails the one after.
    pub fn fail_creation_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// Contents of a staging buffer, device buffer or uniform arena.
    pub fn memory(&self, handle: &Handle) -> Option<&[u8]> {
        self.memory.get(&handle.0).map(Vec::as_slice)
    }

    /// Number of objects currently alive.
    pub fn live_objects(&self) -> usize {
        self.images.len() + self.memory.len() + self.framebuffers.len() + self.bindings.len()
    }

    #[inline]
    pub fn in_pass(&self) -> bool {
        self.in_pass
    }

    fn alloc(&mut self) -> DriverResult<usize> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                return Err(DriverError::CreationFailed("simulated allocation failure".into()));
            }
            Some(n) => self.fail_after = Some(n - 1),
            None => {}
        }
        let h = self.next_handle;
        self.next_handle += 1;
        Ok(h)
    }

    fn pass_call(&mut self, call: Call) -> DriverResult<()> {
        if !self.in_pass {
            return Err(DriverError::NoActivePass);
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Backend for RecordingBackend {
    type Texture = Handle;
    type Binding = Handle;
    type Staging = Handle;
    type Buffer = Handle;
    type Framebuffer = Handle;
    type Uniforms = Handle;

    fn limits(&self) -> BackendLimits {
        self.limits
    }

    // ── images ────────────────────────────────────────────────────────────

    fn create_texture(&mut self, desc: &TextureDesc) -> DriverResult<Handle> {
        let h = self.alloc()?;
        let bpp = desc.format.bytes_per_pixel();
        // Fresh images hold garbage; 0xCD makes a missing clear visible.
        let len = (desc.width * desc.height * bpp) as usize;
        self.images.insert(
            h,
            SimImage {
                width: desc.width,
                height: desc.height,
                bytes_per_pixel: bpp,
                pixels: vec![0xCD; len],
            },
        );
        self.calls.push(Call::CreateTexture {
            texture: h,
            width: desc.width,
            height: desc.height,
            render_target: desc.render_target,
        });
        Ok(Handle(h))
    }

    fn destroy_texture(&mut self, texture: Handle) {
        self.images.remove(&texture.0);
        self.calls.push(Call::DestroyTexture { texture: texture.0 });
    }

    fn create_binding(&mut self, texture: &Handle) -> DriverResult<Handle> {
        let h = self.alloc()?;
        self.bindings.insert(h, texture.0);
        self.calls.push(Call::CreateBinding {
            binding: h,
            texture: texture.0,
        });
        Ok(Handle(h))
    }

    fn destroy_binding(&mut self, binding: Handle) {
        self.bindings.remove(&binding.0);
        self.calls.push(Call::DestroyBinding { binding: binding.0 });
    }

    fn transition(&mut self, texture: &Handle, from: ImageLayout, to: ImageLayout) {
        self.calls.push(Call::Transition {
            texture: texture.0,
            from,
            to,
        });
    }

    fn clear_image(&mut self, texture: &Handle) {
        if let Some(img) = self.images.get_mut(&texture.0) {
            img.pixels.fill(0);
        }
        self.calls.push(Call::ClearImage { texture: texture.0 });
    }

    // ── staging ───────────────────────────────────────────────────────────

    fn create_staging(&mut self, size: u64) -> DriverResult<Handle> {
        let h = self.alloc()?;
        self.memory.insert(h, vec![0; size as usize]);
        self.calls.push(Call::CreateStaging { staging: h, size });
        Ok(Handle(h))
    }

    fn destroy_staging(&mut self, staging: Handle) {
        self.memory.remove(&staging.0);
        self.calls.push(Call::DestroyStaging { staging: staging.0 });
    }

    fn write_staging(&mut self, staging: &Handle, bytes: &[u8]) {
        if let Some(mem) = self.memory.get_mut(&staging.0) {
            let n = bytes.len().min(mem.len());
            mem[..n].copy_from_slice(&bytes[..n]);
        }
        self.calls.push(Call::WriteStaging {
            staging: staging.0,
            len: bytes.len(),
        });
    }

    fn copy_staging_to_texture(
        &mut self,
        staging: &Handle,
        texture: &Handle,
        bytes_per_row: u32,
        extent: Extent,
    ) {
        if let (Some(src), Some(img)) = (self.memory.get(&staging.0), self.images.get_mut(&texture.0)) {
            let row = (extent.width.min(img.width) * img.bytes_per_pixel) as usize;
            let dst_stride = (img.width * img.bytes_per_pixel) as usize;
            for y in 0..extent.height.min(img.height) as usize {
                let s = y * bytes_per_row as usize;
                let Some(src_row) = src.get(s..s + row) else { break };
                img.pixels[y * dst_stride..y * dst_stride + row].copy_from_slice(src_row);
            }
        }
        self.calls.push(Call::CopyToTexture {
            staging: staging.0,
            texture: texture.0,
            bytes_per_row,
        });
    }

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self, size: u64, usage: BufferUsage) -> DriverResult<Handle> {
        let h = self.alloc()?;
        self.memory.insert(h, vec![0; size as usize]);
        self.calls.push(Call::CreateBuffer { buffer: h, size, usage });
        Ok(Handle(h))
    }

    fn destroy_buffer(&mut self, buffer: Handle) {
        self.memory.remove(&buffer.0);
        self.calls.push(Call::DestroyBuffer { buffer: buffer.0 });
    }

    fn copy_staging_to_buffer(&mut self, staging: &Handle, buffer: &Handle, size: u64) {
        let chunk = self
            .memory
            .get(&staging.0)
            .map(|m| m[..(size as usize).min(m.len())].to_vec());
        if let (Some(chunk), Some(dst)) = (chunk, self.memory.get_mut(&buffer.0)) {
            let n = chunk.len().min(dst.len());
            dst[..n].copy_from_slice(&chunk[..n]);
        }
        self.calls.push(Call::CopyToBuffer {
            staging: staging.0,
            buffer: buffer.0,
            size,
        });
    }

    // ── render targets ────────────────────────────────────────────────────

    fn create_framebuffer(&mut self, texture: &Handle) -> DriverResult<Handle> {
        let h = self.alloc()?;
        self.framebuffers.insert(h, texture.0);
        self.calls.push(Call::CreateFramebuffer {
            framebuffer: h,
            texture: texture.0,
        });
        Ok(Handle(h))
    }

    fn destroy_framebuffer(&mut self, framebuffer: Handle) {
        self.framebuffers.remove(&framebuffer.0);
        self.calls.push(Call::DestroyFramebuffer {
            framebuffer: framebuffer.0,
        });
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    fn create_uniforms(&mut self, slot_size: u64, slots: u32) -> DriverResult<Handle> {
        let h = self.alloc()?;
        let size = slot_size * u64::from(slots);
        self.memory.insert(h, vec![0; size as usize]);
        self.calls.push(Call::CreateUniforms { uniforms: h, size });
        Ok(Handle(h))
    }

    fn destroy_uniforms(&mut self, uniforms: Handle) {
        self.memory.remove(&uniforms.0);
        self.calls.push(Call::DestroyUniforms {
            uniforms: uniforms.0,
        });
    }

    fn write_uniforms(&mut self, uniforms: &Handle, bytes: &[u8]) {
        if let Some(mem) = self.memory.get_mut(&uniforms.0) {
            let n = bytes.len().min(mem.len());
            mem[..n].copy_from_slice(&bytes[..n]);
        }
        self.calls.push(Call::WriteUniforms {
            uniforms: uniforms.0,
            len: bytes.len(),
        });
    }

    // ── passes ────────────────────────────────────────────────────────────

    fn begin_pass(&mut self, framebuffer: &Handle, area: Extent) {
        debug_assert!(!self.in_pass, "begin_pass while a pass is open");
        self.in_pass = true;
        self.calls.push(Call::BeginPass {
            framebuffer: framebuffer.0,
            area,
        });
    }

    fn end_pass(&mut self) {
        if std::mem::take(&mut self.in_pass) {
            self.calls.push(Call::EndPass);
        }
    }

    fn bind_pipeline(&mut self, shader: ShaderType) -> DriverResult<()> {
        self.pass_call(Call::BindPipeline(shader))
    }

    fn bind_uniforms(&mut self, uniforms: &Handle, offset: u32) -> DriverResult<()> {
        self.pass_call(Call::BindUniforms {
            uniforms: uniforms.0,
            offset,
        })
    }

    fn bind_textures(&mut self, first: Option<&Handle>, second: Option<&Handle>) -> DriverResult<()> {
        self.pass_call(Call::BindTextures {
            first: first.map(Handle::index),
            second: second.map(Handle::index),
        })
    }

    fn bind_geometry(&mut self, vertices: &Handle, indices: &Handle) -> DriverResult<()> {
        self.pass_call(Call::BindGeometry {
            vertices: vertices.0,
            indices: indices.0,
        })
    }

    fn set_viewport(&mut self, area: Extent) -> DriverResult<()> {
        self.pass_call(Call::SetViewport(area))
    }

    fn set_scissor(&mut self, rect: Scissor) -> DriverResult<()> {
        self.pass_call(Call::SetScissor(rect))
    }

    fn draw_indexed(&mut self, count: u32, first_index: u32) -> DriverResult<()> {
        self.pass_call(Call::DrawIndexed { count, first_index })
    }

    // ── submission ────────────────────────────────────────────────────────

    fn submit(&mut self) -> DriverResult<()> {
        self.end_pass();
        self.calls.push(Call::Submit);
        Ok(())
    }
}

impl Readback for RecordingBackend {
    fn read_texture(&mut self, texture: &Handle) -> DriverResult<Vec<u8>> {
        self.images
            .get(&texture.0)
            .map(|img| img.pixels.clone())
            .ok_or_else(|| DriverError::CreationFailed(format!("no simulated image {}", texture.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::PixelFormat;

    fn desc(w: u32, h: u32) -> TextureDesc {
        TextureDesc {
            width: w,
            height: h,
            format: PixelFormat::A8Unorm,
            render_target: false,
        }
    }

    #[test]
    fn pass_commands_require_open_pass() {
        let mut b = RecordingBackend::new();
        assert!(matches!(
            b.draw_indexed(6, 0),
            Err(DriverError::NoActivePass)
        ));
    }

    #[test]
    fn strided_copy_drops_row_padding() {
        let mut b = RecordingBackend::new();
        let tex = b.create_texture(&desc(2, 2)).unwrap();
        let staging = b.create_staging(8).unwrap();
        b.write_staging(&staging, &[1, 2, 9, 9, 3, 4, 9, 9]);
        b.copy_staging_to_texture(&staging, &tex, 4, Extent::new(2, 2));

        assert_eq!(b.read_texture(&tex).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn bindings_count_as_live_objects() {
        let mut b = RecordingBackend::new();
        let tex = b.create_texture(&desc(1, 1)).unwrap();
        let binding = b.create_binding(&tex).unwrap();
        b.destroy_texture(tex);
        assert_eq!(b.live_objects(), 1);

        b.destroy_binding(binding);
        assert_eq!(b.live_objects(), 0);
    }

    #[test]
    fn failure_is_one_shot() {
        let mut b = RecordingBackend::new();
        b.fail_next_creation();
        assert!(b.create_staging(4).is_err());
        assert!(b.create_staging(4).is_ok());
    }
}
