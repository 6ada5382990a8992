//! Texture readback from GPU to CPU.

use std::sync::mpsc::channel;

use crate::backend::{Backend, Readback};
use crate::error::{DriverError, DriverResult};

use super::{WgpuBackend, WgpuTexture};

impl Readback for WgpuBackend {
    /// Submits pending work, copies the texture into a mappable buffer and
    /// blocks until the copy is visible to the CPU.
    fn read_texture(&mut self, texture: &WgpuTexture) -> DriverResult<Vec<u8>> {
        self.submit()?;

        let extent = texture.extent;
        let row_bytes = extent.width * texture.bytes_per_pixel;
        let padded_bpr = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let buffer_size = u64::from(padded_bpr) * u64::from(extent.height);

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label("readback buffer")),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&self.label("readback encoder")),
        });
        encoder.copy_texture_to_buffer(
            texture.copy_info(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bpr),
                    rows_per_image: Some(extent.height),
                },
            },
            texture.copy_extent(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            drop(sender.send(res));
        });

        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| DriverError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| DriverError::Readback(e.to_string()))?
            .map_err(|e| DriverError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut data = Vec::with_capacity(row_bytes as usize * extent.height as usize);
        for row in 0..extent.height as usize {
            let start = row * padded_bpr as usize;
            data.extend_from_slice(&mapped[start..start + row_bytes as usize]);
        }
        drop(mapped);
        readback.unmap();

        log::trace!("read back {}x{} texture ({} bytes)", extent.width, extent.height, data.len());
        Ok(data)
    }
}
