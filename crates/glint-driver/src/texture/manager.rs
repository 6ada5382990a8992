use crate::backend::{Backend, Extent, ImageLayout, TextureDesc};
use crate::error::{DriverError, DriverResult, check_copy_size};
use crate::ids::{IdAllocator, TextureId};
use crate::stream::{Bitmap, PixelFormat};

use super::StagingLayout;

/// Staging buffer kept alive for re-uploads of a data texture.
pub struct Staged<B: Backend> {
    buffer: B::Staging,
    capacity: u64,
    layout: StagingLayout,
}

impl<B: Backend> Staged<B> {
    #[inline]
    pub fn buffer(&self) -> &B::Staging {
        &self.buffer
    }

    #[inline]
    pub fn layout(&self) -> StagingLayout {
        self.layout
    }
}

/// One realized texture.
///
/// Data textures keep their staging buffer; render-target textures have none.
pub struct TextureEntry<B: Backend> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    image: B::Texture,
    binding: B::Binding,
    staging: Option<Staged<B>>,
    layout: ImageLayout,
    generation: u64,
}

impl<B: Backend> TextureEntry<B> {
    #[inline]
    pub fn image(&self) -> &B::Texture {
        &self.image
    }

    #[inline]
    pub fn binding(&self) -> &B::Binding {
        &self.binding
    }

    #[inline]
    pub fn staging(&self) -> Option<&Staged<B>> {
        self.staging.as_ref()
    }

    #[inline]
    pub fn is_render_target(&self) -> bool {
        self.staging.is_none()
    }

    /// Layout the image rests in between commands.
    #[inline]
    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Distinguishes this texture from any later one created under the same id.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn move_to(&mut self, backend: &mut B, to: ImageLayout) {
        backend.transition(&self.image, self.layout, to);
        self.layout = to;
    }

    fn destroy(self, backend: &mut B) {
        backend.destroy_binding(self.binding);
        if let Some(staged) = self.staging {
            backend.destroy_staging(staged.buffer);
        }
        backend.destroy_texture(self.image);
    }
}

/// Owns every texture created by the engine.
pub struct TextureManager<B: Backend> {
    entries: IdAllocator<TextureId, TextureEntry<B>>,
    generations: u64,
}

impl<B: Backend> Default for TextureManager<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> TextureManager<B> {
    pub fn new() -> Self {
        Self {
            entries: IdAllocator::new(),
            generations: 0,
        }
    }

    #[inline]
    pub fn next_id(&mut self) -> TextureId {
        self.entries.next()
    }

    #[inline]
    pub fn get(&self, id: TextureId) -> Option<&TextureEntry<B>> {
        self.entries.get(id)
    }

    pub fn entry(&self, id: TextureId) -> DriverResult<&TextureEntry<B>> {
        self.entries.get(id).ok_or_else(|| DriverError::unknown(id))
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.entries.live()
    }

    /// Realizes `bitmap` under `id`.
    ///
    /// An empty bitmap yields a render-target texture that rests in
    /// [`ImageLayout::ShaderReadOnly`] without any upload. A pixel-carrying
    /// bitmap is staged, copied in through [`ImageLayout::TransferDst`] and
    /// keeps its staging buffer for later updates.
    pub fn create(&mut self, backend: &mut B, id: TextureId, bitmap: &Bitmap<'_>) -> DriverResult<()> {
        if self.entries.contains(id) {
            return Err(DriverError::already_live(id));
        }
        bitmap
            .validate()
            .map_err(|reason| DriverError::InvalidBitmap { id, reason })?;

        let render_target = bitmap.is_empty();
        let limits = backend.limits();
        let staging_layout = if render_target {
            None
        } else {
            let layout = StagingLayout::for_bitmap(bitmap, limits.copy_row_alignment);
            check_copy_size("bitmap", layout.size.max(bitmap.byte_size()), limits.max_copy_size)?;
            Some(layout)
        };

        let image = backend.create_texture(&TextureDesc {
            width: bitmap.width,
            height: bitmap.height,
            format: bitmap.format,
            render_target,
        })?;

        let staging = match staging_layout {
            None => None,
            Some(layout) => match backend.create_staging(layout.size) {
                Ok(buffer) => Some(Staged {
                    buffer,
                    capacity: layout.size,
                    layout,
                }),
                Err(e) => {
                    backend.destroy_texture(image);
                    return Err(e);
                }
            },
        };

        let mut layout = ImageLayout::Undefined;
        match &staging {
            Some(staged) => {
                upload(backend, &image, &mut layout, staged, bitmap);
            }
            None => {
                backend.transition(&image, layout, ImageLayout::ShaderReadOnly);
                layout = ImageLayout::ShaderReadOnly;
            }
        }

        let binding = match backend.create_binding(&image) {
            Ok(b) => b,
            Err(e) => {
                if let Some(staged) = staging {
                    backend.destroy_staging(staged.buffer);
                }
                backend.destroy_texture(image);
                return Err(e);
            }
        };

        log::trace!(
            "created {id}: {}x{} {:?}{}",
            bitmap.width,
            bitmap.height,
            bitmap.format,
            if render_target { " render target" } else { "" }
        );
        self.generations += 1;
        self.entries.insert(
            id,
            TextureEntry {
                width: bitmap.width,
                height: bitmap.height,
                format: bitmap.format,
                image,
                binding,
                staging,
                layout,
                generation: self.generations,
            },
        );
        Ok(())
    }

    /// Re-uploads a data texture in place. The image is never reallocated;
    /// the staging buffer is replaced only if the new stride needs more room.
    pub fn update(&mut self, backend: &mut B, id: TextureId, bitmap: &Bitmap<'_>) -> DriverResult<()> {
        let entry = self.entries.get_mut(id).ok_or_else(|| DriverError::unknown(id))?;
        if entry.staging.is_none() {
            return Err(DriverError::NotADataTexture(id));
        }
        if bitmap.is_empty() {
            return Err(DriverError::InvalidBitmap {
                id,
                reason: "update without pixel data".into(),
            });
        }
        bitmap
            .validate()
            .map_err(|reason| DriverError::InvalidBitmap { id, reason })?;
        if (bitmap.width, bitmap.height, bitmap.format) != (entry.width, entry.height, entry.format) {
            return Err(DriverError::BitmapMismatch { id });
        }

        let limits = backend.limits();
        let layout = StagingLayout::for_bitmap(bitmap, limits.copy_row_alignment);
        check_copy_size("bitmap", layout.size.max(bitmap.byte_size()), limits.max_copy_size)?;

        let Some(staged) = entry.staging.as_mut() else {
            return Err(DriverError::NotADataTexture(id));
        };
        if layout.size > staged.capacity {
            let buffer = backend.create_staging(layout.size)?;
            let old = std::mem::replace(&mut staged.buffer, buffer);
            backend.destroy_staging(old);
            staged.capacity = layout.size;
            log::trace!("{id}: staging regrown to {} bytes", layout.size);
        }
        staged.layout = layout;

        entry.move_to(backend, ImageLayout::TransferDst);
        if let Some(staged) = &entry.staging {
            backend.write_staging(&staged.buffer, &layout.fill(bitmap));
            backend.copy_staging_to_texture(
                &staged.buffer,
                &entry.image,
                layout.bytes_per_row,
                Extent::new(bitmap.width, bitmap.height),
            );
        }
        entry.move_to(backend, ImageLayout::ShaderReadOnly);

        log::trace!("updated {id}");
        Ok(())
    }

    /// Clears the whole image to transparent black, outside any pass.
    pub fn clear(&mut self, backend: &mut B, id: TextureId) -> DriverResult<()> {
        let entry = self.entries.get_mut(id).ok_or_else(|| DriverError::unknown(id))?;
        entry.move_to(backend, ImageLayout::TransferDst);
        backend.clear_image(&entry.image);
        entry.move_to(backend, ImageLayout::ShaderReadOnly);
        Ok(())
    }

    pub fn destroy(&mut self, backend: &mut B, id: TextureId) -> DriverResult<()> {
        if !self.entries.contains(id) {
            return Err(DriverError::unknown(id));
        }
        if let Some(entry) = self.entries.release(id) {
            entry.destroy(backend);
        }
        log::trace!("destroyed {id}");
        Ok(())
    }

    /// Destroys every live texture. Ids are not released.
    pub fn release_all(&mut self, backend: &mut B) {
        for entry in self.entries.drain() {
            entry.destroy(backend);
        }
    }
}

fn upload<B: Backend>(
    backend: &mut B,
    image: &B::Texture,
    layout: &mut ImageLayout,
    staged: &Staged<B>,
    bitmap: &Bitmap<'_>,
) {
    backend.write_staging(&staged.buffer, &staged.layout.fill(bitmap));
    backend.transition(image, *layout, ImageLayout::TransferDst);
    backend.copy_staging_to_texture(
        &staged.buffer,
        image,
        staged.layout.bytes_per_row,
        Extent::new(bitmap.width, bitmap.height),
    );
    backend.transition(image, ImageLayout::TransferDst, ImageLayout::ShaderReadOnly);
    *layout = ImageLayout::ShaderReadOnly;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::backend::{BackendLimits, Readback};

    fn manager() -> (RecordingBackend, TextureManager<RecordingBackend>) {
        (RecordingBackend::new(), TextureManager::new())
    }

    fn transitions(b: &RecordingBackend) -> Vec<(ImageLayout, ImageLayout)> {
        b.calls()
            .iter()
            .filter_map(|c| match c {
                Call::Transition { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    // ── create ──

    #[test]
    fn data_texture_goes_through_transfer_layout() {
        let (mut b, mut t) = manager();
        let px = [0xFFu8; 16];
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::packed(2, 2, PixelFormat::Bgra8UnormSrgb, &px)).unwrap();

        use ImageLayout::*;
        assert_eq!(
            transitions(&b),
            vec![(Undefined, TransferDst), (TransferDst, ShaderReadOnly)]
        );
        let entry = t.entry(id).unwrap();
        assert!(!entry.is_render_target());
        assert_eq!(entry.layout(), ShaderReadOnly);
    }

    #[test]
    fn render_target_texture_skips_upload() {
        let (mut b, mut t) = manager();
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::empty(64, 64, PixelFormat::Bgra8UnormSrgb)).unwrap();

        assert_eq!(
            transitions(&b),
            vec![(ImageLayout::Undefined, ImageLayout::ShaderReadOnly)]
        );
        assert_eq!(b.count(|c| matches!(c, Call::CreateStaging { .. })), 0);
        assert!(t.entry(id).unwrap().is_render_target());
    }

    #[test]
    fn strided_bitmap_round_trips() {
        let (mut b, mut t) = manager();
        // 2x2 A8 with 3-byte stride; padding bytes must not leak into the image.
        let px = [1, 2, 0xEE, 3, 4];
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::new(2, 2, PixelFormat::A8Unorm, 3, &px)).unwrap();

        let image = t.entry(id).unwrap().image();
        assert_eq!(b.read_texture(image).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn repacked_bitmap_round_trips() {
        let mut b = RecordingBackend::with_limits(BackendLimits {
            copy_row_alignment: 8,
            ..Default::default()
        });
        let mut t = TextureManager::new();
        let px = [1, 2, 0xEE, 3, 4];
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::new(2, 2, PixelFormat::A8Unorm, 3, &px)).unwrap();

        let staged = t.entry(id).unwrap().staging().unwrap();
        assert_eq!(staged.layout().bytes_per_row, 8);
        let image = t.entry(id).unwrap().image();
        assert_eq!(b.read_texture(image).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn bitmap_at_copy_limit_is_rejected() {
        let mut b = RecordingBackend::with_limits(BackendLimits {
            max_copy_size: 16,
            ..Default::default()
        });
        let mut t = TextureManager::new();
        let px = [0u8; 16];
        let id = t.next_id();
        let err = t
            .create(&mut b, id, &Bitmap::packed(2, 2, PixelFormat::Bgra8UnormSrgb, &px))
            .unwrap_err();

        assert!(matches!(err, DriverError::SizeLimit { size: 16, limit: 16, .. }));
        assert!(b.calls().is_empty());
    }

    #[test]
    fn row_wider_than_a_stride_is_invalid() {
        let (mut b, mut t) = manager();
        let px = [0u8; 16];
        let id = t.next_id();
        let wide = Bitmap::new(0x4000_0000, 1, PixelFormat::Bgra8UnormSrgb, 16, &px);

        assert!(matches!(
            t.create(&mut b, id, &wide),
            Err(DriverError::InvalidBitmap { .. })
        ));
        assert!(b.calls().is_empty());
    }

    #[test]
    fn failed_binding_releases_image_and_staging() {
        let (mut b, mut t) = manager();
        let px = [0u8; 4];
        let id = t.next_id();
        // Image and staging succeed, binding fails.
        b.fail_creation_after(2);
        assert!(t.create(&mut b, id, &Bitmap::packed(1, 1, PixelFormat::Bgra8UnormSrgb, &px)).is_err());

        assert_eq!(b.live_objects(), 0);
        assert!(t.get(id).is_none());
    }

    // ── update ──

    #[test]
    fn update_rewrites_pixels_in_place() {
        let (mut b, mut t) = manager();
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::packed(2, 1, PixelFormat::A8Unorm, &[1, 2])).unwrap();
        t.update(&mut b, id, &Bitmap::packed(2, 1, PixelFormat::A8Unorm, &[8, 9])).unwrap();

        assert_eq!(b.count(|c| matches!(c, Call::CreateTexture { .. })), 1);
        let image = t.entry(id).unwrap().image();
        assert_eq!(b.read_texture(image).unwrap(), vec![8, 9]);
        assert_eq!(t.entry(id).unwrap().layout(), ImageLayout::ShaderReadOnly);
    }

    #[test]
    fn wider_stride_regrows_staging() {
        let (mut b, mut t) = manager();
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::packed(2, 2, PixelFormat::A8Unorm, &[1, 2, 3, 4])).unwrap();
        t.update(&mut b, id, &Bitmap::new(2, 2, PixelFormat::A8Unorm, 4, &[5, 6, 0, 0, 7, 8]))
            .unwrap();

        assert_eq!(b.count(|c| matches!(c, Call::CreateStaging { .. })), 2);
        assert_eq!(b.count(|c| matches!(c, Call::DestroyStaging { .. })), 1);
        let image = t.entry(id).unwrap().image();
        assert_eq!(b.read_texture(image).unwrap(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn update_of_render_target_is_rejected() {
        let (mut b, mut t) = manager();
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::empty(4, 4, PixelFormat::Bgra8UnormSrgb)).unwrap();

        let px = [0u8; 64];
        assert!(matches!(
            t.update(&mut b, id, &Bitmap::packed(4, 4, PixelFormat::Bgra8UnormSrgb, &px)),
            Err(DriverError::NotADataTexture(_))
        ));
    }

    #[test]
    fn update_with_other_size_is_rejected() {
        let (mut b, mut t) = manager();
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::packed(2, 1, PixelFormat::A8Unorm, &[1, 2])).unwrap();

        assert!(matches!(
            t.update(&mut b, id, &Bitmap::packed(1, 2, PixelFormat::A8Unorm, &[1, 2])),
            Err(DriverError::BitmapMismatch { .. })
        ));
    }

    // ── clear / destroy ──

    #[test]
    fn clear_zeroes_and_restores_layout() {
        let (mut b, mut t) = manager();
        let id = t.next_id();
        t.create(&mut b, id, &Bitmap::empty(4, 4, PixelFormat::Bgra8UnormSrgb)).unwrap();
        t.clear(&mut b, id).unwrap();

        let image = t.entry(id).unwrap().image();
        assert!(b.read_texture(image).unwrap().iter().all(|&p| p == 0));
        assert_eq!(t.entry(id).unwrap().layout(), ImageLayout::ShaderReadOnly);
    }

    #[test]
    fn destroyed_id_is_reissued_empty() {
        let (mut b, mut t) = manager();
        let first = t.next_id();
        let second = t.next_id();
        t.create(&mut b, first, &Bitmap::packed(1, 1, PixelFormat::A8Unorm, &[1])).unwrap();
        t.destroy(&mut b, first).unwrap();

        assert_eq!(b.live_objects(), 0);
        let again = t.next_id();
        assert_eq!(again, first);
        assert_ne!(again, second);
        assert!(t.get(again).is_none());
    }
}
