use crate::backend::{Backend, Extent, Scissor};
use crate::error::{DriverError, DriverResult};
use crate::geometry::GeometryManager;
use crate::ids::{GeometryId, RenderBufferId, TextureId};
use crate::stream::{Command, GpuState, ShaderType};
use crate::target::RenderTargetManager;
use crate::texture::TextureManager;
use crate::uniforms::UniformStager;

use super::ReplayStats;
use super::scissor::clamp_scissor;

/// Render pass state of the interpreter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PassState {
    #[default]
    Idle,
    InPass { target: RenderBufferId, area: Extent },
}

/// Replays command lists as backend calls.
///
/// Consecutive draws into the same render buffer share one pass. A clear or a
/// change of target closes the open pass; the end of the list closes it too,
/// including when a command fails.
pub struct CommandListInterpreter<B: Backend> {
    uniforms: UniformStager<B>,
    pass: PassState,
}

impl<B: Backend> CommandListInterpreter<B> {
    pub fn new(initial_uniform_slots: u32) -> Self {
        Self {
            uniforms: UniformStager::new(initial_uniform_slots),
            pass: PassState::Idle,
        }
    }

    #[inline]
    pub fn pass_state(&self) -> PassState {
        self.pass
    }

    #[inline]
    pub fn uniforms(&self) -> &UniformStager<B> {
        &self.uniforms
    }

    #[inline]
    pub fn uniforms_mut(&mut self) -> &mut UniformStager<B> {
        &mut self.uniforms
    }

    pub fn replay(
        &mut self,
        backend: &mut B,
        textures: &mut TextureManager<B>,
        geometries: &GeometryManager<B>,
        targets: &RenderTargetManager<B>,
        commands: &[Command],
    ) -> DriverResult<ReplayStats> {
        let draws = commands.iter().filter(|c| c.is_draw()).count();
        let draws = u32::try_from(draws).unwrap_or(u32::MAX);
        self.uniforms.begin(backend, draws)?;

        let mut stats = ReplayStats {
            commands: commands.len(),
            ..Default::default()
        };

        let mut result = Ok(());
        for command in commands {
            result = match command {
                Command::ClearRenderBuffer { render_buffer } => {
                    self.clear(backend, textures, targets, *render_buffer, &mut stats)
                }
                Command::DrawGeometry {
                    state,
                    geometry,
                    indices_count,
                    indices_offset,
                } => self.draw(
                    backend,
                    textures,
                    geometries,
                    targets,
                    state,
                    *geometry,
                    (*indices_count, *indices_offset),
                    &mut stats,
                ),
            };
            if result.is_err() {
                break;
            }
        }

        self.close_pass(backend);
        self.uniforms.flush(backend);
        result.map(|()| stats)
    }

    fn close_pass(&mut self, backend: &mut B) {
        if let PassState::InPass { .. } = self.pass {
            backend.end_pass();
            self.pass = PassState::Idle;
        }
    }

    fn clear(
        &mut self,
        backend: &mut B,
        textures: &mut TextureManager<B>,
        targets: &RenderTargetManager<B>,
        render_buffer: RenderBufferId,
        stats: &mut ReplayStats,
    ) -> DriverResult<()> {
        self.close_pass(backend);

        let target = targets.entry(render_buffer)?;
        if target.backing(textures).is_none() {
            return Err(DriverError::MissingTarget { render_buffer });
        }
        textures.clear(backend, target.texture_id)?;
        stats.clears += 1;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw(
        &mut self,
        backend: &mut B,
        textures: &TextureManager<B>,
        geometries: &GeometryManager<B>,
        targets: &RenderTargetManager<B>,
        state: &GpuState,
        geometry: GeometryId,
        (count, first): (u32, u32),
        stats: &mut ReplayStats,
    ) -> DriverResult<()> {
        let render_buffer = state.render_buffer_id;
        let target = targets.entry(render_buffer)?;
        if target.backing(textures).is_none() {
            return Err(DriverError::MissingTarget { render_buffer });
        }
        let mesh = geometries.entry(geometry)?;
        let offset = self.uniforms.push(state)?;

        let area = Extent::new(
            state.viewport_width.min(target.width),
            state.viewport_height.min(target.height),
        );
        let scissor = if state.enable_scissor {
            clamp_scissor(state.scissor_rect, area)
        } else {
            Some(Scissor::full(area))
        };
        let Some(scissor) = scissor.filter(|_| !area.is_empty() && count > 0) else {
            stats.skipped += 1;
            return Ok(());
        };
        if u64::from(first) + u64::from(count) > mesh.index_capacity() {
            log::warn!(
                "{geometry}: draw of {count} indices at {first} overruns {} indices; skipped",
                mesh.index_capacity()
            );
            stats.skipped += 1;
            return Ok(());
        }

        match self.pass {
            PassState::InPass { target: open, .. } if open == render_buffer => {}
            _ => {
                self.close_pass(backend);
                backend.begin_pass(target.framebuffer(), area);
                self.pass = PassState::InPass {
                    target: render_buffer,
                    area,
                };
                stats.passes_opened += 1;
            }
        }

        let Some(uniforms) = self.uniforms.buffer() else {
            return Err(DriverError::UniformArenaFull { capacity: 0 });
        };
        backend.bind_pipeline(state.shader_type)?;
        backend.bind_uniforms(uniforms, offset)?;
        if state.shader_type == ShaderType::Fill {
            let first_set = binding(textures, state.texture_1_id)?;
            let second_set = binding(textures, state.second_texture())?;
            backend.bind_textures(first_set, second_set)?;
        }
        backend.bind_geometry(mesh.vertex.buffer(), mesh.index.buffer())?;
        backend.set_viewport(area)?;
        backend.set_scissor(scissor)?;
        backend.draw_indexed(count, first)?;
        stats.draws += 1;
        Ok(())
    }
}

fn binding<B: Backend>(textures: &TextureManager<B>, id: TextureId) -> DriverResult<Option<&B::Binding>> {
    if id == TextureId::NONE {
        return Ok(None);
    }
    textures.entry(id).map(|e| Some(e.binding()))
}
