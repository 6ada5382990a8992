use crate::backend::{Backend, BufferUsage};
use crate::error::{DriverError, DriverResult, check_copy_size};
use crate::ids::{GeometryId, IdAllocator};
use crate::stream::{IndexBuffer, VertexBuffer, VertexFormat};

/// Staging buffer, device-local buffer and the byte size they were made for.
pub struct BufferPair<B: Backend> {
    pub(crate) staging: B::Staging,
    pub(crate) buffer: B::Buffer,
    pub(crate) size: u64,
}

impl<B: Backend> BufferPair<B> {
    fn upload(backend: &mut B, usage: BufferUsage, bytes: &[u8]) -> DriverResult<Self> {
        let size = bytes.len() as u64;
        let staging = backend.create_staging(size)?;
        let buffer = match backend.create_buffer(size, usage) {
            Ok(b) => b,
            Err(e) => {
                backend.destroy_staging(staging);
                return Err(e);
            }
        };
        backend.write_staging(&staging, bytes);
        backend.copy_staging_to_buffer(&staging, &buffer, size);
        Ok(Self { staging, buffer, size })
    }

    fn refresh(&self, backend: &mut B, bytes: &[u8]) {
        backend.write_staging(&self.staging, bytes);
        backend.copy_staging_to_buffer(&self.staging, &self.buffer, bytes.len() as u64);
    }

    fn destroy(self, backend: &mut B) {
        backend.destroy_buffer(self.buffer);
        backend.destroy_staging(self.staging);
    }

    #[inline]
    pub fn buffer(&self) -> &B::Buffer {
        &self.buffer
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Vertex and index buffers of one geometry.
pub struct GeometryEntry<B: Backend> {
    pub vertex: BufferPair<B>,
    pub index: BufferPair<B>,
    pub format: VertexFormat,
}

impl<B: Backend> GeometryEntry<B> {
    /// Index count the buffers were created for.
    #[inline]
    pub fn index_capacity(&self) -> u64 {
        self.index.size / 4
    }
}

/// Owns every geometry created by the engine.
pub struct GeometryManager<B: Backend> {
    entries: IdAllocator<GeometryId, GeometryEntry<B>>,
}

impl<B: Backend> Default for GeometryManager<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> GeometryManager<B> {
    pub fn new() -> Self {
        Self {
            entries: IdAllocator::new(),
        }
    }

    #[inline]
    pub fn next_id(&mut self) -> GeometryId {
        self.entries.next()
    }

    #[inline]
    pub fn get(&self, id: GeometryId) -> Option<&GeometryEntry<B>> {
        self.entries.get(id)
    }

    pub fn entry(&self, id: GeometryId) -> DriverResult<&GeometryEntry<B>> {
        self.entries.get(id).ok_or_else(|| DriverError::unknown(id))
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.entries.live()
    }

    /// Allocates staging and device buffers for both blocks and records the
    /// staging-to-device copies.
    pub fn create(
        &mut self,
        backend: &mut B,
        id: GeometryId,
        vertices: VertexBuffer<'_>,
        indices: IndexBuffer<'_>,
    ) -> DriverResult<()> {
        if self.entries.contains(id) {
            return Err(DriverError::already_live(id));
        }
        let limit = backend.limits().max_copy_size;
        check_copy_size("vertex block", vertices.byte_size(), limit)?;
        check_copy_size("index block", indices.byte_size(), limit)?;
        warn_on_ragged(id, &vertices, &indices);

        let vertex = BufferPair::upload(backend, BufferUsage::Vertex, vertices.data)?;
        let index = match BufferPair::upload(backend, BufferUsage::Index, indices.data) {
            Ok(p) => p,
            Err(e) => {
                vertex.destroy(backend);
                return Err(e);
            }
        };

        log::trace!(
            "created {id}: {} vertex bytes ({:?}), {} index bytes",
            vertex.size,
            vertices.format,
            index.size
        );
        self.entries.insert(
            id,
            GeometryEntry {
                vertex,
                index,
                format: vertices.format,
            },
        );
        Ok(())
    }

    /// Re-copies both blocks into the existing buffers.
    ///
    /// Blocks may shrink (a prefix is updated) but never grow past the size
    /// the geometry was created with.
    pub fn update(
        &mut self,
        backend: &mut B,
        id: GeometryId,
        vertices: VertexBuffer<'_>,
        indices: IndexBuffer<'_>,
    ) -> DriverResult<()> {
        let entry = self.entries.get_mut(id).ok_or_else(|| DriverError::unknown(id))?;

        let grew = |which, capacity: u64, requested: u64| DriverError::GeometryGrew {
            id: id.0,
            which,
            capacity,
            requested,
        };
        if vertices.byte_size() > entry.vertex.size {
            return Err(grew("vertex", entry.vertex.size, vertices.byte_size()));
        }
        if indices.byte_size() > entry.index.size {
            return Err(grew("index", entry.index.size, indices.byte_size()));
        }
        warn_on_ragged(id, &vertices, &indices);

        entry.vertex.refresh(backend, vertices.data);
        entry.index.refresh(backend, indices.data);
        entry.format = vertices.format;
        log::trace!("updated {id}");
        Ok(())
    }

    pub fn destroy(&mut self, backend: &mut B, id: GeometryId) -> DriverResult<()> {
        if !self.entries.contains(id) {
            return Err(DriverError::unknown(id));
        }
        if let Some(entry) = self.entries.release(id) {
            entry.vertex.destroy(backend);
            entry.index.destroy(backend);
        }
        log::trace!("destroyed {id}");
        Ok(())
    }

    /// Destroys every live geometry. Ids are not released.
    pub fn release_all(&mut self, backend: &mut B) {
        for entry in self.entries.drain() {
            entry.vertex.destroy(backend);
            entry.index.destroy(backend);
        }
    }
}

fn warn_on_ragged(id: GeometryId, vertices: &VertexBuffer<'_>, indices: &IndexBuffer<'_>) {
    let stride = u64::from(vertices.format.stride());
    if vertices.byte_size() % stride != 0 {
        log::warn!(
            "{id}: {} vertex bytes is not a multiple of the {stride}-byte {:?} stride",
            vertices.byte_size(),
            vertices.format
        );
    }
    if indices.byte_size() % 4 != 0 {
        log::warn!("{id}: {} index bytes is not a multiple of 4", indices.byte_size());
    }
}
