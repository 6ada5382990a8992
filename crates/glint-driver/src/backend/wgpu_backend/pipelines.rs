//! Fixed pipeline set: one render pipeline per [`ShaderType`].

use crate::geometry::{FillVertex, PathVertex};
use crate::stream::ShaderType;
use crate::uniforms::UNIFORM_BLOCK_SIZE;

const BLOCK_BINDING_SIZE: wgpu::BufferSize = match wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE) {
    Some(size) => size,
    None => panic!("uniform block size must be non-zero"),
};

/// Compiled shader modules supplied by the embedding application.
///
/// Both modules expose `vs_main` and `fs_main`. The fill module reads the
/// uniform block at group 0 and two texture sets at groups 1 and 2; the path
/// module reads only group 0.
#[derive(Debug)]
pub struct ShaderSet {
    pub fill: wgpu::ShaderModule,
    pub path: wgpu::ShaderModule,
}

impl ShaderSet {
    pub fn new(fill: wgpu::ShaderModule, path: wgpu::ShaderModule) -> Self {
        Self { fill, path }
    }

    /// Hands WGSL sources to the device for compilation.
    pub fn from_wgsl(device: &wgpu::Device, fill: &str, path: &str) -> Self {
        let module = |label: &str, src: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(src.to_owned().into()),
            })
        };
        Self {
            fill: module("glint fill shader", fill),
            path: module("glint path shader", path),
        }
    }
}

// ── blend ─────────────────────────────────────────────────────────────────

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

// ── pipeline set ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub(super) struct Pipelines {
    pub fill: wgpu::RenderPipeline,
    pub path: wgpu::RenderPipeline,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, shaders: &ShaderSet, format: wgpu::TextureFormat, label: &str) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} uniform bgl")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(BLOCK_BINDING_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} texture bgl")),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Clamped on U and V, repeating on W.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            lod_min_clamp: 0.0,
            lod_max_clamp: 1.0,
            ..Default::default()
        });

        let fill_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} fill pipeline layout")),
            bind_group_layouts: &[&uniform_layout, &texture_layout, &texture_layout],
            immediate_size: 0,
        });
        let path_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} path pipeline layout")),
            bind_group_layouts: &[&uniform_layout],
            immediate_size: 0,
        });

        let fill = build_pipeline(
            device,
            &format!("{label} fill pipeline"),
            &fill_layout,
            &shaders.fill,
            FillVertex::layout(),
            format,
        );
        let path = build_pipeline(
            device,
            &format!("{label} path pipeline"),
            &path_layout,
            &shaders.path,
            PathVertex::layout(),
            format,
        );

        Self {
            fill,
            path,
            uniform_layout,
            texture_layout,
            sampler,
        }
    }

    #[inline]
    pub fn get(&self, shader: ShaderType) -> &wgpu::RenderPipeline {
        match shader {
            ShaderType::Fill => &self.fill,
            ShaderType::Path => &self.path,
        }
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[vertex_layout],
        },

        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(premul_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
