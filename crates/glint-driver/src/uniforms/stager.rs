use crate::backend::Backend;
use crate::error::{DriverError, DriverResult};
use crate::stream::GpuState;

use super::{UNIFORM_BLOCK_SIZE, Uniforms};

/// Per-replay uniform arena.
///
/// Every draw of a command list gets one slot, addressed by dynamic offset.
/// The backing buffer grows to the next power of two of the draw count and
/// never shrinks. A buffer being replaced is retired, not destroyed, and is
/// released only once the work that read it has been submitted. The same
/// happens when a new replay starts before the previous one was submitted,
/// so an unsubmitted replay's slots are never overwritten.
pub struct UniformStager<B: Backend> {
    arena: Vec<u8>,
    stride: u64,
    capacity: u32,
    cursor: u32,
    min_capacity: u32,
    buffer: Option<B::Uniforms>,
    retired: Vec<B::Uniforms>,
    unsubmitted: bool,
}

impl<B: Backend> UniformStager<B> {
    pub fn new(min_capacity: u32) -> Self {
        Self {
            arena: Vec::new(),
            stride: UNIFORM_BLOCK_SIZE,
            capacity: 0,
            cursor: 0,
            min_capacity: min_capacity.max(1),
            buffer: None,
            retired: Vec::new(),
            unsubmitted: false,
        }
    }

    /// Prepares the arena for a replay of `draws` draws.
    pub fn begin(&mut self, backend: &mut B, draws: u32) -> DriverResult<()> {
        self.cursor = 0;
        self.arena.clear();

        let needs_buffer = self.buffer.is_none() || draws > self.capacity || self.unsubmitted;
        if !needs_buffer {
            return Ok(());
        }

        let alignment = u64::from(backend.limits().uniform_offset_alignment.max(1));
        let stride = UNIFORM_BLOCK_SIZE.div_ceil(alignment) * alignment;
        let capacity = draws.max(1).next_power_of_two().max(self.min_capacity).max(self.capacity);

        let buffer = backend.create_uniforms(stride, capacity)?;
        if let Some(old) = self.buffer.replace(buffer) {
            self.retired.push(old);
        }
        log::debug!(
            "uniform arena: {capacity} slots of {stride} bytes ({} retired)",
            self.retired.len()
        );
        self.stride = stride;
        self.capacity = capacity;
        self.unsubmitted = false;
        Ok(())
    }

    /// Writes the next slot and returns its dynamic offset.
    pub fn push(&mut self, state: &GpuState) -> DriverResult<u32> {
        if self.cursor >= self.capacity {
            return Err(DriverError::UniformArenaFull {
                capacity: self.capacity,
            });
        }
        let offset = u64::from(self.cursor) * self.stride;
        let start = offset as usize;
        self.arena.resize(start + self.stride as usize, 0);
        self.arena[start..start + UNIFORM_BLOCK_SIZE as usize]
            .copy_from_slice(bytemuck::bytes_of(&Uniforms::from_state(state)));
        self.cursor += 1;
        Ok(offset as u32)
    }

    /// Hands the written slots to the backend.
    pub fn flush(&mut self, backend: &mut B) {
        if self.arena.is_empty() {
            return;
        }
        if let Some(buffer) = &self.buffer {
            backend.write_uniforms(buffer, &self.arena);
            self.unsubmitted = true;
        }
    }

    /// Called after a submit: the retired buffers are no longer read.
    pub fn on_submitted(&mut self, backend: &mut B) {
        for old in self.retired.drain(..) {
            backend.destroy_uniforms(old);
        }
        self.unsubmitted = false;
    }

    pub fn release_all(&mut self, backend: &mut B) {
        self.on_submitted(backend);
        if let Some(buffer) = self.buffer.take() {
            backend.destroy_uniforms(buffer);
        }
        self.capacity = 0;
    }

    #[inline]
    pub fn buffer(&self) -> Option<&B::Uniforms> {
        self.buffer.as_ref()
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Slots written since the last [`begin`](Self::begin).
    #[inline]
    pub fn len(&self) -> u32 {
        self.cursor
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    #[inline]
    pub fn retired(&self) -> usize {
        self.retired.len()
    }

    /// Decodes a written slot.
    pub fn slot(&self, index: u32) -> Option<Uniforms> {
        if index >= self.cursor {
            return None;
        }
        let start = (u64::from(index) * self.stride) as usize;
        let bytes = self.arena.get(start..start + UNIFORM_BLOCK_SIZE as usize)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::ids::RenderBufferId;

    fn state(w: u32) -> GpuState {
        GpuState::new(RenderBufferId(1), w, 10)
    }

    // ── capacity ──

    #[test]
    fn grows_to_power_of_two_and_never_shrinks() {
        let mut b = RecordingBackend::new();
        let mut u = UniformStager::<RecordingBackend>::new(4);

        u.begin(&mut b, 5).unwrap();
        assert_eq!(u.capacity(), 8);
        u.on_submitted(&mut b);

        u.begin(&mut b, 2).unwrap();
        assert_eq!(u.capacity(), 8);
        assert_eq!(b.count(|c| matches!(c, Call::CreateUniforms { .. })), 1);
    }

    #[test]
    fn stride_follows_offset_alignment() {
        let mut b = RecordingBackend::with_limits(crate::backend::BackendLimits {
            uniform_offset_alignment: 512,
            ..Default::default()
        });
        let mut u = UniformStager::<RecordingBackend>::new(1);
        u.begin(&mut b, 2).unwrap();

        assert_eq!(u.stride(), 1024);
        assert_eq!(u.push(&state(1)).unwrap(), 0);
        assert_eq!(u.push(&state(2)).unwrap(), 1024);
    }

    #[test]
    fn push_past_capacity_fails() {
        let mut b = RecordingBackend::new();
        let mut u = UniformStager::<RecordingBackend>::new(1);
        u.begin(&mut b, 1).unwrap();
        u.push(&state(1)).unwrap();

        assert!(matches!(
            u.push(&state(1)),
            Err(DriverError::UniformArenaFull { capacity: 1 })
        ));
    }

    // ── lifetime of replaced buffers ──

    #[test]
    fn growth_retires_old_buffer_until_submit() {
        let mut b = RecordingBackend::new();
        let mut u = UniformStager::<RecordingBackend>::new(1);

        u.begin(&mut b, 1).unwrap();
        u.push(&state(1)).unwrap();
        u.flush(&mut b);
        let first = u.buffer().unwrap().index();

        u.begin(&mut b, 3).unwrap();
        assert_eq!(u.retired(), 1);
        assert_eq!(b.count(|c| matches!(c, Call::DestroyUniforms { .. })), 0);
        // The retired arena still holds the first replay's slot.
        let old = Call::WriteUniforms {
            uniforms: first,
            len: UNIFORM_BLOCK_SIZE as usize,
        };
        assert!(b.calls().contains(&old));

        u.on_submitted(&mut b);
        assert_eq!(u.retired(), 0);
        assert!(b.calls().contains(&Call::DestroyUniforms { uniforms: first }));
    }

    #[test]
    fn unsubmitted_replay_is_not_overwritten() {
        let mut b = RecordingBackend::new();
        let mut u = UniformStager::<RecordingBackend>::new(4);

        u.begin(&mut b, 1).unwrap();
        u.push(&state(1)).unwrap();
        u.flush(&mut b);
        let first = u.buffer().unwrap().index();

        u.begin(&mut b, 1).unwrap();
        assert_ne!(u.buffer().unwrap().index(), first);
    }

    #[test]
    fn slots_decode_in_push_order() {
        let mut b = RecordingBackend::new();
        let mut u = UniformStager::<RecordingBackend>::new(1);
        u.begin(&mut b, 3).unwrap();
        for w in [10, 20, 30] {
            u.push(&state(w)).unwrap();
        }

        assert_eq!(u.len(), 3);
        assert_eq!(u.slot(1).unwrap().state[1], 20.0);
        assert!(u.slot(3).is_none());
    }
}
