//! wgpu realization of [`Backend`].
//!
//! All copies, clears and passes of a frame are recorded into one lazily
//! created command encoder and handed to the queue by [`Backend::submit`].
//! Staging and uniform bytes go through `Queue::write_buffer`, which the queue
//! applies ahead of the next submitted encoder.
//!
//! wgpu tracks image usage itself, so [`Backend::transition`] only has to
//! keep the caller's bookkeeping honest; it records nothing.

mod pipelines;
mod readback;
mod resources;

pub use pipelines::ShaderSet;
pub use resources::{WgpuBinding, WgpuBuffer, WgpuFramebuffer, WgpuStaging, WgpuTexture, WgpuUniforms};

use std::borrow::Cow;

use crate::error::{DriverError, DriverResult};
use crate::stream::ShaderType;
use crate::uniforms::UNIFORM_BLOCK_SIZE;

use super::{Backend, BackendLimits, BufferUsage, Extent, ImageLayout, Scissor, TextureDesc};
use pipelines::Pipelines;
use resources::{align_copy, image_format};

/// Settings of a [`WgpuBackend`].
#[derive(Debug, Clone)]
pub struct WgpuBackendConfig {
    /// Format of every render-target image and of the pipelines' color target.
    pub target_format: wgpu::TextureFormat,
    /// Prefix of every object label.
    pub label: String,
}

impl Default for WgpuBackendConfig {
    fn default() -> Self {
        Self {
            target_format: wgpu::TextureFormat::Bgra8Unorm,
            label: "glint".to_owned(),
        }
    }
}

/// Backend bound to one wgpu device and queue.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: WgpuBackendConfig,
    pipelines: Pipelines,
    /// Bound for "no texture" on either texture set of the fill pipeline.
    placeholder: WgpuBinding,
    limits: BackendLimits,
    max_dimension: u32,

    encoder: Option<wgpu::CommandEncoder>,
    pass: Option<wgpu::RenderPass<'static>>,
    pass_extent: Extent,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, shaders: &ShaderSet, config: WgpuBackendConfig) -> Self {
        let pipelines = Pipelines::new(&device, shaders, config.target_format, &config.label);

        let device_limits = device.limits();
        let limits = BackendLimits {
            max_copy_size: device_limits.max_buffer_size.min(i32::MAX as u64),
            copy_row_alignment: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
            uniform_offset_alignment: device_limits.min_uniform_buffer_offset_alignment,
        };

        let placeholder = create_placeholder(&device, &queue, &pipelines, &config.label);

        log::debug!(
            "wgpu backend ready: target={:?} max_copy={} uniform_align={}",
            config.target_format,
            limits.max_copy_size,
            limits.uniform_offset_alignment
        );

        Self {
            device,
            queue,
            config,
            pipelines,
            placeholder,
            limits,
            max_dimension: device_limits.max_texture_dimension_2d,
            encoder: None,
            pass: None,
            pass_extent: Extent::default(),
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    pub fn config(&self) -> &WgpuBackendConfig {
        &self.config
    }

    fn label(&self, what: &str) -> String {
        format!("{} {what}", self.config.label)
    }

    /// Encoder for copies and clears. Closes the open pass first, since an
    /// encoder cannot record while a pass borrows it.
    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        self.end_pass();
        let device = &self.device;
        let label = &self.config.label;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{label} frame encoder")),
            })
        })
    }

    fn pass(&mut self) -> DriverResult<&mut wgpu::RenderPass<'static>> {
        self.pass.as_mut().ok_or(DriverError::NoActivePass)
    }

    fn check_buffer_size(&self, what: &str, size: u64) -> DriverResult<()> {
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(DriverError::CreationFailed(format!(
                "{what} of {size} bytes exceeds the device buffer limit of {max}"
            )));
        }
        Ok(())
    }

    fn write(&self, buffer: &wgpu::Buffer, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let padded = align_copy(bytes.len() as u64) as usize;
        let data: Cow<'_, [u8]> = if padded == bytes.len() {
            Cow::Borrowed(bytes)
        } else {
            let mut v = bytes.to_vec();
            v.resize(padded, 0);
            Cow::Owned(v)
        };
        self.queue.write_buffer(buffer, 0, &data);
    }
}

fn create_placeholder(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipelines: &Pipelines,
    label: &str,
) -> WgpuBinding {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("{label} placeholder texture")),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Bgra8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[0, 0, 0, 0],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    WgpuBinding {
        bind_group: texture_bind_group(device, pipelines, &view, &format!("{label} placeholder bind group")),
    }
}

fn texture_bind_group(
    device: &wgpu::Device,
    pipelines: &Pipelines,
    view: &wgpu::TextureView,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &pipelines.texture_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&pipelines.sampler),
            },
        ],
    })
}

impl Backend for WgpuBackend {
    type Texture = WgpuTexture;
    type Binding = WgpuBinding;
    type Staging = WgpuStaging;
    type Buffer = WgpuBuffer;
    type Framebuffer = WgpuFramebuffer;
    type Uniforms = WgpuUniforms;

    fn limits(&self) -> BackendLimits {
        self.limits
    }

    // ── images ────────────────────────────────────────────────────────────

    fn create_texture(&mut self, desc: &TextureDesc) -> DriverResult<WgpuTexture> {
        if desc.width > self.max_dimension || desc.height > self.max_dimension {
            return Err(DriverError::CreationFailed(format!(
                "texture {}x{} exceeds the device limit of {}",
                desc.width, desc.height, self.max_dimension
            )));
        }

        let (format, usage) = if desc.render_target {
            (
                self.config.target_format,
                wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
            )
        } else {
            (
                image_format(desc.format),
                wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
            )
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label("texture")),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuTexture {
            texture,
            view,
            extent: Extent::new(desc.width, desc.height),
            bytes_per_pixel: format.block_copy_size(None).unwrap_or(4),
        })
    }

    fn destroy_texture(&mut self, texture: WgpuTexture) {
        // Dropping defers the release until pending encoders are done with it.
        drop(texture);
    }

    fn create_binding(&mut self, texture: &WgpuTexture) -> DriverResult<WgpuBinding> {
        let bind_group = texture_bind_group(
            &self.device,
            &self.pipelines,
            &texture.view,
            &self.label("texture bind group"),
        );
        Ok(WgpuBinding { bind_group })
    }

    fn destroy_binding(&mut self, binding: WgpuBinding) {
        drop(binding);
    }

    fn transition(&mut self, _texture: &WgpuTexture, from: ImageLayout, to: ImageLayout) {
        log::trace!("layout {from:?} -> {to:?} left to wgpu usage tracking");
    }

    fn clear_image(&mut self, texture: &WgpuTexture) {
        let label = self.label("clear pass");
        let encoder = self.encoder();
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &texture.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        drop(pass);
    }

    // ── staging ───────────────────────────────────────────────────────────

    fn create_staging(&mut self, size: u64) -> DriverResult<WgpuStaging> {
        let size = align_copy(size);
        self.check_buffer_size("staging buffer", size)?;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label("staging buffer")),
            size,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(WgpuStaging { buffer })
    }

    fn destroy_staging(&mut self, staging: WgpuStaging) {
        drop(staging);
    }

    fn write_staging(&mut self, staging: &WgpuStaging, bytes: &[u8]) {
        self.write(&staging.buffer, bytes);
    }

    fn copy_staging_to_texture(
        &mut self,
        staging: &WgpuStaging,
        texture: &WgpuTexture,
        bytes_per_row: u32,
        extent: Extent,
    ) {
        let encoder = self.encoder();
        encoder.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &staging.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(extent.height),
                },
            },
            texture.copy_info(),
            wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
        );
    }

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self, size: u64, usage: BufferUsage) -> DriverResult<WgpuBuffer> {
        let size = align_copy(size);
        self.check_buffer_size("device buffer", size)?;
        let (role, usage) = match usage {
            BufferUsage::Vertex => ("vertex buffer", wgpu::BufferUsages::VERTEX),
            BufferUsage::Index => ("index buffer", wgpu::BufferUsages::INDEX),
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label(role)),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(WgpuBuffer { buffer })
    }

    fn destroy_buffer(&mut self, buffer: WgpuBuffer) {
        drop(buffer);
    }

    fn copy_staging_to_buffer(&mut self, staging: &WgpuStaging, buffer: &WgpuBuffer, size: u64) {
        let size = align_copy(size)
            .min(staging.buffer.size())
            .min(buffer.buffer.size());
        let encoder = self.encoder();
        encoder.copy_buffer_to_buffer(&staging.buffer, 0, &buffer.buffer, 0, size);
    }

    // ── render targets ────────────────────────────────────────────────────

    fn create_framebuffer(&mut self, texture: &WgpuTexture) -> DriverResult<WgpuFramebuffer> {
        if !texture.texture.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            return Err(DriverError::CreationFailed(
                "framebuffer over a texture without attachment usage".into(),
            ));
        }
        Ok(WgpuFramebuffer {
            view: texture.texture.create_view(&wgpu::TextureViewDescriptor::default()),
            extent: texture.extent,
        })
    }

    fn destroy_framebuffer(&mut self, framebuffer: WgpuFramebuffer) {
        drop(framebuffer);
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    fn create_uniforms(&mut self, slot_size: u64, slots: u32) -> DriverResult<WgpuUniforms> {
        let size = slot_size * u64::from(slots.max(1));
        let max = u64::from(self.device.limits().max_uniform_buffer_binding_size);
        self.check_buffer_size("uniform arena", size)?;
        if UNIFORM_BLOCK_SIZE > max {
            return Err(DriverError::CreationFailed(format!(
                "uniform block of {UNIFORM_BLOCK_SIZE} bytes exceeds the binding limit of {max}"
            )));
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label("uniform arena")),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.label("uniform bind group")),
            layout: &self.pipelines.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                }),
            }],
        });
        Ok(WgpuUniforms { buffer, bind_group })
    }

    fn destroy_uniforms(&mut self, uniforms: WgpuUniforms) {
        drop(uniforms);
    }

    fn write_uniforms(&mut self, uniforms: &WgpuUniforms, bytes: &[u8]) {
        self.write(&uniforms.buffer, bytes);
    }

    // ── passes ────────────────────────────────────────────────────────────

    fn begin_pass(&mut self, framebuffer: &WgpuFramebuffer, _area: Extent) {
        let label = self.label("draw pass");
        let encoder = self.encoder();
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &framebuffer.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();
        self.pass = Some(pass);
        self.pass_extent = framebuffer.extent;
    }

    fn end_pass(&mut self) {
        // Dropping the pass ends it and unlocks the encoder.
        self.pass = None;
    }

    fn bind_pipeline(&mut self, shader: ShaderType) -> DriverResult<()> {
        let pass = self.pass.as_mut().ok_or(DriverError::NoActivePass)?;
        pass.set_pipeline(self.pipelines.get(shader));
        Ok(())
    }

    fn bind_uniforms(&mut self, uniforms: &WgpuUniforms, offset: u32) -> DriverResult<()> {
        self.pass()?.set_bind_group(0, &uniforms.bind_group, &[offset]);
        Ok(())
    }

    fn bind_textures(&mut self, first: Option<&WgpuBinding>, second: Option<&WgpuBinding>) -> DriverResult<()> {
        let pass = self.pass.as_mut().ok_or(DriverError::NoActivePass)?;
        let first = first.unwrap_or(&self.placeholder);
        let second = second.unwrap_or(&self.placeholder);
        pass.set_bind_group(1, &first.bind_group, &[]);
        pass.set_bind_group(2, &second.bind_group, &[]);
        Ok(())
    }

    fn bind_geometry(&mut self, vertices: &WgpuBuffer, indices: &WgpuBuffer) -> DriverResult<()> {
        let pass = self.pass()?;
        pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
        Ok(())
    }

    fn set_viewport(&mut self, area: Extent) -> DriverResult<()> {
        let bounds = self.pass_extent;
        let w = area.width.min(bounds.width).max(1);
        let h = area.height.min(bounds.height).max(1);
        self.pass()?.set_viewport(0.0, 0.0, w as f32, h as f32, 0.0, 1.0);
        Ok(())
    }

    fn set_scissor(&mut self, rect: Scissor) -> DriverResult<()> {
        self.pass()?.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
        Ok(())
    }

    fn draw_indexed(&mut self, count: u32, first_index: u32) -> DriverResult<()> {
        self.pass()?.draw_indexed(first_index..first_index + count, 0, 0..1);
        Ok(())
    }

    // ── submission ────────────────────────────────────────────────────────

    fn submit(&mut self) -> DriverResult<()> {
        self.end_pass();
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        } else {
            // Queue writes still need a submission to be applied.
            self.queue.submit(std::iter::empty());
        }
        Ok(())
    }
}
