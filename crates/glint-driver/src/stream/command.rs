use crate::ids::{GeometryId, RenderBufferId};

use super::GpuState;

/// One entry of the per-frame command list, replayed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Reset the render buffer's image to transparent black.
    ClearRenderBuffer { render_buffer: RenderBufferId },
    /// Draw `indices_count` indices of `geometry`, starting at `indices_offset`.
    DrawGeometry {
        state: GpuState,
        geometry: GeometryId,
        indices_count: u32,
        indices_offset: u32,
    },
}

impl Command {
    /// Render buffer this command writes to.
    #[inline]
    pub fn target(&self) -> RenderBufferId {
        match self {
            Command::ClearRenderBuffer { render_buffer } => *render_buffer,
            Command::DrawGeometry { state, .. } => state.render_buffer_id,
        }
    }

    #[inline]
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::DrawGeometry { .. })
    }
}
