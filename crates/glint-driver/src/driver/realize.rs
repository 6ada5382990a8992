use crate::backend::{Backend, Readback};
use crate::error::{DriverError, DriverResult};
use crate::geometry::GeometryManager;
use crate::ids::{GeometryId, RenderBufferId, TextureId};
use crate::replay::{CommandListInterpreter, ReplayStats};
use crate::stream::{Bitmap, Command, IndexBuffer, RenderBufferDesc, VertexBuffer};
use crate::target::RenderTargetManager;
use crate::texture::TextureManager;

use super::{DriverConfig, GpuDriver, OpCounters};

/// Realizes the engine's resources and command lists on backend `B`.
///
/// Everything recorded between two [`submit`](Self::submit) calls lands in a
/// single backend submission. The embedding application calls `submit` once
/// per frame, typically when [`needs_submission`](Self::needs_submission)
/// reports a fresh command list, and then presents
/// [`render_target_texture`](Self::render_target_texture).
pub struct Driver<B: Backend> {
    backend: B,
    textures: TextureManager<B>,
    geometries: GeometryManager<B>,
    targets: RenderTargetManager<B>,
    interpreter: CommandListInterpreter<B>,
    config: DriverConfig,

    ops: OpCounters,
    last_ops: OpCounters,
    last_replay: ReplayStats,
    needs_submit: bool,
}

impl<B: Backend> Driver<B> {
    pub fn new(backend: B, config: DriverConfig) -> Self {
        Self {
            backend,
            textures: TextureManager::new(),
            geometries: GeometryManager::new(),
            targets: RenderTargetManager::new(),
            interpreter: CommandListInterpreter::new(config.initial_uniform_slots),
            config,
            ops: OpCounters::default(),
            last_ops: OpCounters::default(),
            last_replay: ReplayStats::default(),
            needs_submit: false,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    #[inline]
    pub fn textures(&self) -> &TextureManager<B> {
        &self.textures
    }

    #[inline]
    pub fn geometries(&self) -> &GeometryManager<B> {
        &self.geometries
    }

    #[inline]
    pub fn targets(&self) -> &RenderTargetManager<B> {
        &self.targets
    }

    /// Backend image of a live texture.
    pub fn texture(&self, id: TextureId) -> Option<&B::Texture> {
        self.textures.get(id).map(|e| e.image())
    }

    /// Sampleable image a render buffer draws into.
    pub fn render_target_texture(&self, id: RenderBufferId) -> Option<&B::Texture> {
        let entry = self.targets.get(id)?;
        entry.backing(&self.textures).map(|t| t.image())
    }

    /// A command list was replayed since the last submit.
    #[inline]
    pub fn needs_submission(&self) -> bool {
        self.needs_submit
    }

    /// Submits everything recorded so far, then frees uniform arenas retired
    /// by the submitted replays.
    pub fn submit(&mut self) -> DriverResult<()> {
        self.backend.submit()?;
        self.interpreter.uniforms_mut().on_submitted(&mut self.backend);
        self.needs_submit = false;
        Ok(())
    }

    /// Counters of the resource operations preceding the last flush.
    #[inline]
    pub fn last_op_counters(&self) -> OpCounters {
        self.last_ops
    }

    /// Counters accumulated since the last flush.
    #[inline]
    pub fn pending_op_counters(&self) -> OpCounters {
        self.ops
    }

    #[inline]
    pub fn last_replay_stats(&self) -> ReplayStats {
        self.last_replay
    }

    /// Destroys every backend object the driver owns. Runs on drop; the
    /// engine's ids are not released.
    pub fn release_all(&mut self) {
        self.backend.end_pass();
        self.targets.release_all(&mut self.backend);
        self.textures.release_all(&mut self.backend);
        self.geometries.release_all(&mut self.backend);
        self.interpreter.uniforms_mut().release_all(&mut self.backend);
    }
}

impl<B: Readback> Driver<B> {
    /// Reads a texture back as tightly packed rows. Submits pending work first.
    pub fn read_texture(&mut self, id: TextureId) -> DriverResult<Vec<u8>> {
        let entry = self.textures.entry(id)?;
        let pixels = self.backend.read_texture(entry.image())?;
        self.interpreter.uniforms_mut().on_submitted(&mut self.backend);
        self.needs_submit = false;
        Ok(pixels)
    }

    /// Reads back the texture behind a render buffer.
    pub fn read_render_buffer(&mut self, id: RenderBufferId) -> DriverResult<Vec<u8>> {
        let entry = self.targets.entry(id)?;
        let texture = entry
            .backing(&self.textures)
            .ok_or(DriverError::MissingTarget { render_buffer: id })?;
        let pixels = self.backend.read_texture(texture.image())?;
        self.interpreter.uniforms_mut().on_submitted(&mut self.backend);
        self.needs_submit = false;
        Ok(pixels)
    }
}

impl<B: Backend> GpuDriver for Driver<B> {
    fn begin_synchronize(&mut self) {
        log::trace!("begin synchronize");
    }

    fn end_synchronize(&mut self) {
        log::trace!("end synchronize");
    }

    fn next_texture_id(&mut self) -> TextureId {
        self.textures.next_id()
    }

    fn create_texture(&mut self, id: TextureId, bitmap: &Bitmap<'_>) -> DriverResult<()> {
        self.textures.create(&mut self.backend, id, bitmap)?;
        self.ops.textures_created += 1;
        Ok(())
    }

    fn update_texture(&mut self, id: TextureId, bitmap: &Bitmap<'_>) -> DriverResult<()> {
        self.textures.update(&mut self.backend, id, bitmap)?;
        self.ops.textures_updated += 1;
        Ok(())
    }

    fn destroy_texture(&mut self, id: TextureId) -> DriverResult<()> {
        self.textures.destroy(&mut self.backend, id)?;
        self.ops.textures_destroyed += 1;
        Ok(())
    }

    fn next_render_buffer_id(&mut self) -> RenderBufferId {
        self.targets.next_id()
    }

    fn create_render_buffer(&mut self, id: RenderBufferId, desc: RenderBufferDesc) -> DriverResult<()> {
        self.targets.create(&mut self.backend, &self.textures, id, desc)
    }

    fn destroy_render_buffer(&mut self, id: RenderBufferId) -> DriverResult<()> {
        self.targets.destroy(&mut self.backend, id)
    }

    fn next_geometry_id(&mut self) -> GeometryId {
        self.geometries.next_id()
    }

    fn create_geometry(
        &mut self,
        id: GeometryId,
        vertices: VertexBuffer<'_>,
        indices: IndexBuffer<'_>,
    ) -> DriverResult<()> {
        self.geometries.create(&mut self.backend, id, vertices, indices)?;
        self.ops.geometries_created += 1;
        Ok(())
    }

    fn update_geometry(
        &mut self,
        id: GeometryId,
        vertices: VertexBuffer<'_>,
        indices: IndexBuffer<'_>,
    ) -> DriverResult<()> {
        self.geometries.update(&mut self.backend, id, vertices, indices)?;
        self.ops.geometries_updated += 1;
        Ok(())
    }

    fn destroy_geometry(&mut self, id: GeometryId) -> DriverResult<()> {
        self.geometries.destroy(&mut self.backend, id)?;
        self.ops.geometries_destroyed += 1;
        Ok(())
    }

    fn update_command_list(&mut self, commands: &[Command]) -> DriverResult<()> {
        let stats = self.interpreter.replay(
            &mut self.backend,
            &mut self.textures,
            &self.geometries,
            &self.targets,
            commands,
        );
        // A failed replay may still have recorded commands.
        self.needs_submit = true;
        let stats = stats?;

        if self.config.log_frame_stats {
            log::debug!("flush: {}; {stats}", self.ops);
        }
        self.last_ops = std::mem::take(&mut self.ops);
        self.last_replay = stats;
        Ok(())
    }
}

impl<B: Backend> Drop for Driver<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::error::DriverError;
    use crate::geometry::FillVertex;
    use crate::stream::{GpuState, PixelFormat, VertexFormat};

    fn driver() -> Driver<RecordingBackend> {
        Driver::new(RecordingBackend::new(), DriverConfig::default())
    }

    fn render_buffer(d: &mut Driver<RecordingBackend>, w: u32, h: u32) -> RenderBufferId {
        let tex = d.next_texture_id();
        d.create_texture(tex, &Bitmap::empty(w, h, PixelFormat::Bgra8UnormSrgb)).unwrap();
        let rb = d.next_render_buffer_id();
        d.create_render_buffer(rb, RenderBufferDesc { texture_id: tex }).unwrap();
        rb
    }

    fn quad(d: &mut Driver<RecordingBackend>) -> GeometryId {
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
        g
    }

    // ── id reuse ──

    #[test]
    fn destroyed_ids_come_back_first_for_every_kind() {
        let mut d = driver();

        let t1 = d.next_texture_id();
        let _t2 = d.next_texture_id();
        d.create_texture(t1, &Bitmap::packed(1, 1, PixelFormat::A8Unorm, &[5])).unwrap();
        d.destroy_texture(t1).unwrap();
        assert_eq!(d.next_texture_id(), t1);
        assert!(d.texture(t1).is_none());

        let rb = render_buffer(&mut d, 8, 8);
        d.destroy_render_buffer(rb).unwrap();
        assert_eq!(d.next_render_buffer_id(), rb);

        let g = quad(&mut d);
        d.destroy_geometry(g).unwrap();
        assert_eq!(d.next_geometry_id(), g);
    }

    #[test]
    fn id_kinds_are_independent() {
        let mut d = driver();
        assert_eq!(d.next_texture_id(), TextureId(1));
        assert_eq!(d.next_geometry_id(), GeometryId(1));
        assert_eq!(d.next_render_buffer_id(), RenderBufferId(1));
    }

    // ── frame flow ──

    #[test]
    fn clear_scenario_reads_back_transparent() {
        let mut d = driver();
        let rb = render_buffer(&mut d, 64, 64);

        d.begin_synchronize();
        d.end_synchronize();
        d.update_command_list(&[Command::ClearRenderBuffer { render_buffer: rb }]).unwrap();
        assert!(d.needs_submission());

        let pixels = d.read_render_buffer(rb).unwrap();
        assert_eq!(pixels.len(), 64 * 64 * 4);
        assert!(pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn data_texture_round_trips_through_driver() {
        let mut d = driver();
        let t = d.next_texture_id();
        let px = [1, 2, 3, 4, 0, 0, 5, 6, 7, 8];
        d.create_texture(t, &Bitmap::new(1, 2, PixelFormat::Bgra8UnormSrgb, 6, &px)).unwrap();

        assert_eq!(d.read_texture(t).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn submit_clears_flag_and_is_one_submission() {
        let mut d = driver();
        let rb = render_buffer(&mut d, 64, 64);
        let g = quad(&mut d);

        d.update_command_list(&[Command::DrawGeometry {
            state: GpuState::new(rb, 64, 64),
            geometry: g,
            indices_count: 6,
            indices_offset: 0,
        }])
        .unwrap();
        d.submit().unwrap();

        assert!(!d.needs_submission());
        assert_eq!(d.backend().count(|c| matches!(c, Call::Submit)), 1);
        assert_eq!(d.last_replay_stats().draws, 1);
        assert_eq!(d.last_replay_stats().passes_opened, 1);
    }

    #[test]
    fn counters_reset_per_flush() {
        let mut d = driver();
        let _rb = render_buffer(&mut d, 8, 8);
        let g = quad(&mut d);
        d.destroy_geometry(g).unwrap();
        assert_eq!(d.pending_op_counters().geometries_destroyed, 1);

        d.update_command_list(&[]).unwrap();
        let last = d.last_op_counters();
        assert_eq!(last.textures_created, 1);
        assert_eq!(last.geometries_created, 1);
        assert_eq!(last.geometries_destroyed, 1);
        assert!(d.pending_op_counters().is_zero());
    }

    #[test]
    fn render_target_texture_follows_render_buffer() {
        let mut d = driver();
        let rb = render_buffer(&mut d, 16, 16);
        let tex = d.targets().entry(rb).unwrap().texture_id;

        let presented = d.render_target_texture(rb).unwrap().index();
        assert_eq!(presented, d.texture(tex).unwrap().index());

        d.destroy_texture(tex).unwrap();
        assert!(d.render_target_texture(rb).is_none());
        assert!(matches!(
            d.update_command_list(&[Command::ClearRenderBuffer { render_buffer: rb }]),
            Err(DriverError::MissingTarget { .. })
        ));
    }

    #[test]
    fn reissued_texture_id_is_not_the_render_buffers_target() {
        let mut d = driver();
        let rb = render_buffer(&mut d, 2, 2);
        let tex = d.targets().entry(rb).unwrap().texture_id;
        d.destroy_texture(tex).unwrap();

        let reused = d.next_texture_id();
        assert_eq!(reused, tex);
        d.create_texture(reused, &Bitmap::packed(2, 2, PixelFormat::A8Unorm, &[9, 9, 9, 9]))
            .unwrap();

        assert!(matches!(
            d.update_command_list(&[Command::ClearRenderBuffer { render_buffer: rb }]),
            Err(DriverError::MissingTarget { .. })
        ));
        assert!(d.render_target_texture(rb).is_none());
        assert!(matches!(
            d.read_render_buffer(rb),
            Err(DriverError::MissingTarget { .. })
        ));
        assert_eq!(d.read_texture(reused).unwrap(), vec![9, 9, 9, 9]);
    }

    #[test]
    fn reissued_render_target_id_is_still_stale() {
        let mut d = driver();
        let rb = render_buffer(&mut d, 8, 8);
        let g = quad(&mut d);
        let tex = d.targets().entry(rb).unwrap().texture_id;
        d.destroy_texture(tex).unwrap();
        let reused = d.next_texture_id();
        d.create_texture(reused, &Bitmap::empty(8, 8, PixelFormat::Bgra8UnormSrgb))
            .unwrap();

        assert!(matches!(
            d.update_command_list(&[Command::DrawGeometry {
                state: GpuState::new(rb, 8, 8),
                geometry: g,
                indices_count: 6,
                indices_offset: 0,
            }]),
            Err(DriverError::MissingTarget { .. })
        ));
        assert_eq!(d.backend().count(|c| matches!(c, Call::ClearImage { .. })), 0);
        assert_eq!(d.backend().count(|c| matches!(c, Call::BeginPass { .. })), 0);
    }

    // ── submission ──

    #[test]
    fn failed_replay_still_needs_submission() {
        let mut d = driver();
        let rb = render_buffer(&mut d, 4, 4);
        d.update_command_list(&[]).unwrap();
        d.submit().unwrap();

        let result = d.update_command_list(&[
            Command::ClearRenderBuffer { render_buffer: rb },
            Command::ClearRenderBuffer {
                render_buffer: RenderBufferId(99),
            },
        ]);

        assert!(matches!(result, Err(DriverError::UnknownResource { .. })));
        assert_eq!(d.backend().count(|c| matches!(c, Call::ClearImage { .. })), 1);
        assert!(d.needs_submission());
    }

    #[test]
    fn release_all_frees_every_object() {
        let mut d = driver();
        let _rb = render_buffer(&mut d, 8, 8);
        let _g = quad(&mut d);
        let t = d.next_texture_id();
        d.create_texture(t, &Bitmap::packed(1, 1, PixelFormat::A8Unorm, &[1])).unwrap();
        d.update_command_list(&[]).unwrap();
        assert!(d.backend().live_objects() > 0);

        d.release_all();
        assert_eq!(d.backend().live_objects(), 0);
        assert!(d.texture(t).is_none());
    }
}
