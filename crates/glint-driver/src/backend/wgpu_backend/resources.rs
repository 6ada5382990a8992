//! Native objects behind the backend handle types.

use crate::backend::Extent;
use crate::stream::PixelFormat;

/// Buffer sizes and copy lengths are multiples of this.
pub(super) const COPY_ALIGN: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

/// Rounds `size` up to the copy alignment, never below one aligned unit.
#[inline]
pub(super) fn align_copy(size: u64) -> u64 {
    size.max(1).div_ceil(COPY_ALIGN) * COPY_ALIGN
}

/// Image format a bitmap of `format` is stored in.
pub(super) fn image_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::A8Unorm => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8Unorm,
    }
}

#[derive(Debug)]
pub struct WgpuTexture {
    pub(super) texture: wgpu::Texture,
    pub(super) view: wgpu::TextureView,
    pub(super) extent: Extent,
    pub(super) bytes_per_pixel: u32,
}

impl WgpuTexture {
    /// Sampleable texture handed to the embedding application for presenting.
    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    pub(super) fn copy_extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.extent.width,
            height: self.extent.height,
            depth_or_array_layers: 1,
        }
    }

    pub(super) fn copy_info(&self) -> wgpu::TexelCopyTextureInfo<'_> {
        wgpu::TexelCopyTextureInfo {
            texture: &self.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        }
    }
}

/// Texture view plus the shared sampler, bound as one texture set.
#[derive(Debug)]
pub struct WgpuBinding {
    pub(super) bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct WgpuStaging {
    pub(super) buffer: wgpu::Buffer,
}

#[derive(Debug)]
pub struct WgpuBuffer {
    pub(super) buffer: wgpu::Buffer,
}

#[derive(Debug)]
pub struct WgpuFramebuffer {
    pub(super) view: wgpu::TextureView,
    pub(super) extent: Extent,
}

/// Uniform arena and its dynamic-offset bind group.
#[derive(Debug)]
pub struct WgpuUniforms {
    pub(super) buffer: wgpu::Buffer,
    pub(super) bind_group: wgpu::BindGroup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_sizes_round_up_to_four() {
        assert_eq!(align_copy(0), 4);
        assert_eq!(align_copy(4), 4);
        assert_eq!(align_copy(5), 8);
        assert_eq!(align_copy(140), 140);
    }

    #[test]
    fn bitmap_formats_map_to_unorm_images() {
        assert_eq!(image_format(PixelFormat::A8Unorm), wgpu::TextureFormat::R8Unorm);
        assert_eq!(
            image_format(PixelFormat::Bgra8UnormSrgb),
            wgpu::TextureFormat::Bgra8Unorm
        );
    }
}
