//! End-to-end checks against a real adapter. Each test returns early when the
//! machine has no usable GPU (or software fallback).

use glint_driver::backend::wgpu_backend::{ShaderSet, WgpuBackend, WgpuBackendConfig};
use glint_driver::device::{DeviceInit, GpuContext};
use glint_driver::geometry::FillVertex;
use glint_driver::logging::{LoggingConfig, init_logging};
use glint_driver::stream::{
    Bitmap, Command, GpuState, IndexBuffer, PixelFormat, RenderBufferDesc, VertexBuffer, VertexFormat,
};
use glint_driver::{Driver, DriverConfig, GpuDriver, RenderBufferId};

const FILL_WGSL: &str = r#"
struct Uniforms {
    state: vec4<f32>,
    transform: mat4x4<f32>,
    scalar4: array<vec4<f32>, 2>,
    vector: array<vec4<f32>, 8>,
    clip_size: u32,
    clip: array<mat4x4<f32>, 8>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var tex1: texture_2d<f32>;
@group(1) @binding(1) var samp1: sampler;

struct VsIn {
    @location(0) pos: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) tex: vec2<f32>,
};

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) tex: vec2<f32>,
};

@vertex
fn vs_main(v: VsIn) -> VsOut {
    var o: VsOut;
    o.pos = u.transform * vec4<f32>(v.pos, 0.0, 1.0);
    o.color = v.color;
    o.tex = v.tex;
    return o;
}

@fragment
fn fs_main(i: VsOut) -> @location(0) vec4<f32> {
    return textureSample(tex1, samp1, i.tex) * i.color;
}
"#;

const PATH_WGSL: &str = r#"
struct Uniforms {
    state: vec4<f32>,
    transform: mat4x4<f32>,
    scalar4: array<vec4<f32>, 2>,
    vector: array<vec4<f32>, 8>,
    clip_size: u32,
    clip: array<mat4x4<f32>, 8>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) pos: vec2<f32>, @location(1) color: vec4<f32>) -> VsOut {
    var o: VsOut;
    o.pos = u.transform * vec4<f32>(pos, 0.0, 1.0);
    o.color = color;
    return o;
}

@fragment
fn fs_main(i: VsOut) -> @location(0) vec4<f32> {
    return i.color;
}
"#;

fn driver() -> Option<Driver<WgpuBackend>> {
    init_logging(LoggingConfig {
        is_test: true,
        ..LoggingConfig::with_filter("glint_driver=debug,wgpu=warn")
    });
    let ctx = match GpuContext::blocking(DeviceInit::default()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("skipping: {e:#}");
            return None;
        }
    };
    let (device, queue) = ctx.into_parts();
    let shaders = ShaderSet::from_wgsl(&device, FILL_WGSL, PATH_WGSL);
    let backend = WgpuBackend::new(device, queue, &shaders, WgpuBackendConfig::default());
    Some(Driver::new(backend, DriverConfig::default()))
}

fn render_buffer(d: &mut Driver<WgpuBackend>, w: u32, h: u32) -> RenderBufferId {
    let tex = d.next_texture_id();
    d.create_texture(tex, &Bitmap::empty(w, h, PixelFormat::Bgra8UnormSrgb)).unwrap();
    let rb = d.next_render_buffer_id();
    d.create_render_buffer(rb, RenderBufferDesc { texture_id: tex }).unwrap();
    rb
}

#[test]
fn cleared_render_buffer_reads_transparent() {
    let Some(mut d) = driver() else { return };
    let rb = render_buffer(&mut d, 64, 64);

    d.update_command_list(&[Command::ClearRenderBuffer { render_buffer: rb }]).unwrap();
    let pixels = d.read_render_buffer(rb).unwrap();

    assert_eq!(pixels.len(), 64 * 64 * 4);
    assert!(pixels.iter().all(|&p| p == 0));
}

#[test]
fn strided_bitmap_round_trips() {
    let Some(mut d) = driver() else { return };

    // 3x2 BGRA rows, 16-byte stride (4 bytes of padding per row).
    let mut px = Vec::new();
    for row in 0..2u8 {
        for col in 0..12u8 {
            px.push(row * 100 + col);
        }
        px.extend_from_slice(&[0xEE; 4]);
    }
    let t = d.next_texture_id();
    d.create_texture(t, &Bitmap::new(3, 2, PixelFormat::Bgra8UnormSrgb, 16, &px)).unwrap();

    let expected: Vec<u8> = px.chunks(16).flat_map(|row| row[..12].to_vec()).collect();
    assert_eq!(d.read_texture(t).unwrap(), expected);
}

#[test]
fn textured_quad_covers_target() {
    let Some(mut d) = driver() else { return };
    let rb = render_buffer(&mut d, 64, 64);

    let white = [0xFFu8; 16];
    let t1 = d.next_texture_id();
    d.create_texture(t1, &Bitmap::packed(2, 2, PixelFormat::Bgra8UnormSrgb, &white)).unwrap();

    let verts = [
        FillVertex::textured([0.0, 0.0], [0.0, 0.0]),
        FillVertex::textured([64.0, 0.0], [1.0, 0.0]),
        FillVertex::textured([64.0, 64.0], [1.0, 1.0]),
        FillVertex::textured([0.0, 64.0], [0.0, 1.0]),
    ];
    let g = d.next_geometry_id();
    d.create_geometry(
        g,
        VertexBuffer::new(VertexFormat::Fill, bytemuck::cast_slice(&verts)),
        IndexBuffer::from_indices(&[0, 1, 2, 0, 2, 3]),
    )
    .unwrap();

    let mut state = GpuState::new(rb, 64, 64);
    state.texture_1_id = t1;
    d.update_command_list(&[
        Command::ClearRenderBuffer { render_buffer: rb },
        Command::DrawGeometry {
            state,
            geometry: g,
            indices_count: 6,
            indices_offset: 0,
        },
    ])
    .unwrap();

    let stats = d.last_replay_stats();
    assert_eq!((stats.passes_opened, stats.draws, stats.clears), (1, 1, 1));

    let pixels = d.read_render_buffer(rb).unwrap();
    let center = (32 * 64 + 32) * 4;
    assert_eq!(&pixels[center..center + 4], &[0xFF; 4]);
}
