use crate::backend::{Backend, Extent};
use crate::error::{DriverError, DriverResult};
use crate::ids::{IdAllocator, RenderBufferId, TextureId};
use crate::stream::RenderBufferDesc;
use crate::texture::{TextureEntry, TextureManager};

/// Attachment binding over a render-target texture.
///
/// The texture's lifetime belongs to the texture manager and may end before
/// or after this entry's. Once it ends, a texture reissued under the same id
/// is not this entry's backing texture.
pub struct RenderBufferEntry<B: Backend> {
    pub texture_id: TextureId,
    pub width: u32,
    pub height: u32,
    texture_generation: u64,
    framebuffer: B::Framebuffer,
}

impl<B: Backend> RenderBufferEntry<B> {
    #[inline]
    pub fn framebuffer(&self) -> &B::Framebuffer {
        &self.framebuffer
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// The texture this entry was created over, if it is still live.
    pub fn backing<'t>(&self, textures: &'t TextureManager<B>) -> Option<&'t TextureEntry<B>> {
        textures
            .get(self.texture_id)
            .filter(|t| t.generation() == self.texture_generation && t.is_render_target())
    }
}

pub struct RenderTargetManager<B: Backend> {
    entries: IdAllocator<RenderBufferId, RenderBufferEntry<B>>,
}

impl<B: Backend> Default for RenderTargetManager<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> RenderTargetManager<B> {
    pub fn new() -> Self {
        Self {
            entries: IdAllocator::new(),
        }
    }

    #[inline]
    pub fn next_id(&mut self) -> RenderBufferId {
        self.entries.next()
    }

    #[inline]
    pub fn get(&self, id: RenderBufferId) -> Option<&RenderBufferEntry<B>> {
        self.entries.get(id)
    }

    pub fn entry(&self, id: RenderBufferId) -> DriverResult<&RenderBufferEntry<B>> {
        self.entries.get(id).ok_or_else(|| DriverError::unknown(id))
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.entries.live()
    }

    pub fn create(
        &mut self,
        backend: &mut B,
        textures: &TextureManager<B>,
        id: RenderBufferId,
        desc: RenderBufferDesc,
    ) -> DriverResult<()> {
        if self.entries.contains(id) {
            return Err(DriverError::already_live(id));
        }
        let texture = textures
            .get(desc.texture_id)
            .ok_or(DriverError::MissingTarget { render_buffer: id })?;
        if !texture.is_render_target() {
            return Err(DriverError::NotARenderTarget(desc.texture_id));
        }

        let framebuffer = backend.create_framebuffer(texture.image())?;
        log::trace!("created {id} over {}", desc.texture_id);
        self.entries.insert(
            id,
            RenderBufferEntry {
                texture_id: desc.texture_id,
                width: texture.width,
                height: texture.height,
                texture_generation: texture.generation(),
                framebuffer,
            },
        );
        Ok(())
    }

    /// Destroys the attachment binding only; the backing texture is untouched.
    pub fn destroy(&mut self, backend: &mut B, id: RenderBufferId) -> DriverResult<()> {
        if !self.entries.contains(id) {
            return Err(DriverError::unknown(id));
        }
        if let Some(entry) = self.entries.release(id) {
            backend.destroy_framebuffer(entry.framebuffer);
        }
        log::trace!("destroyed {id}");
        Ok(())
    }

    pub fn release_all(&mut self, backend: &mut B) {
        for entry in self.entries.drain() {
            backend.destroy_framebuffer(entry.framebuffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::stream::{Bitmap, PixelFormat};

    fn setup() -> (RecordingBackend, TextureManager<RecordingBackend>, TextureId) {
        let mut b = RecordingBackend::new();
        let mut t = TextureManager::new();
        let tex = t.next_id();
        t.create(&mut b, tex, &Bitmap::empty(64, 32, PixelFormat::Bgra8UnormSrgb)).unwrap();
        (b, t, tex)
    }

    #[test]
    fn framebuffer_wraps_backing_texture() {
        let (mut b, t, tex) = setup();
        let mut r = RenderTargetManager::new();
        let id = r.next_id();
        r.create(&mut b, &t, id, RenderBufferDesc { texture_id: tex }).unwrap();

        let entry = r.entry(id).unwrap();
        assert_eq!(entry.extent(), Extent::new(64, 32));
        let image = t.entry(tex).unwrap().image().index();
        assert!(b.calls().contains(&Call::CreateFramebuffer {
            framebuffer: entry.framebuffer().index(),
            texture: image,
        }));
    }

    #[test]
    fn destroy_leaves_texture_alive() {
        let (mut b, t, tex) = setup();
        let mut r = RenderTargetManager::new();
        let id = r.next_id();
        r.create(&mut b, &t, id, RenderBufferDesc { texture_id: tex }).unwrap();
        r.destroy(&mut b, id).unwrap();

        assert!(t.get(tex).is_some());
        assert_eq!(b.count(|c| matches!(c, Call::DestroyTexture { .. })), 0);
        assert_eq!(r.next_id(), id);
    }

    #[test]
    fn missing_texture_is_reported() {
        let (mut b, t, _) = setup();
        let mut r = RenderTargetManager::new();
        let id = r.next_id();

        assert!(matches!(
            r.create(&mut b, &t, id, RenderBufferDesc { texture_id: TextureId(9) }),
            Err(DriverError::MissingTarget { .. })
        ));
    }

    #[test]
    fn data_texture_cannot_back_render_buffer() {
        let (mut b, mut t, _) = setup();
        let data = t.next_id();
        t.create(&mut b, data, &Bitmap::packed(1, 1, PixelFormat::A8Unorm, &[0])).unwrap();
        let mut r = RenderTargetManager::new();
        let id = r.next_id();

        assert!(matches!(
            r.create(&mut b, &t, id, RenderBufferDesc { texture_id: data }),
            Err(DriverError::NotARenderTarget(_))
        ));
    }
}
