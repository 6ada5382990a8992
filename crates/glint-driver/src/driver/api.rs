use crate::error::DriverResult;
use crate::ids::{GeometryId, RenderBufferId, TextureId};
use crate::stream::{Bitmap, Command, IndexBuffer, RenderBufferDesc, VertexBuffer};

/// Entry points the paint engine calls, in the order it calls them.
///
/// Calls are serialized by the engine. Per frame it brackets its resource
/// calls with [`begin_synchronize`](Self::begin_synchronize) and
/// [`end_synchronize`](Self::end_synchronize), then hands over the command
/// list. Ids come from the matching `next_*_id` and stay valid until the
/// matching destroy.
pub trait GpuDriver {
    fn begin_synchronize(&mut self) {}
    fn end_synchronize(&mut self) {}

    fn next_texture_id(&mut self) -> TextureId;
    fn create_texture(&mut self, id: TextureId, bitmap: &Bitmap<'_>) -> DriverResult<()>;
    fn update_texture(&mut self, id: TextureId, bitmap: &Bitmap<'_>) -> DriverResult<()>;
    fn destroy_texture(&mut self, id: TextureId) -> DriverResult<()>;

    fn next_render_buffer_id(&mut self) -> RenderBufferId;
    fn create_render_buffer(&mut self, id: RenderBufferId, desc: RenderBufferDesc) -> DriverResult<()>;
    fn destroy_render_buffer(&mut self, id: RenderBufferId) -> DriverResult<()>;

    fn next_geometry_id(&mut self) -> GeometryId;
    fn create_geometry(
        &mut self,
        id: GeometryId,
        vertices: VertexBuffer<'_>,
        indices: IndexBuffer<'_>,
    ) -> DriverResult<()>;
    fn update_geometry(
        &mut self,
        id: GeometryId,
        vertices: VertexBuffer<'_>,
        indices: IndexBuffer<'_>,
    ) -> DriverResult<()>;
    fn destroy_geometry(&mut self, id: GeometryId) -> DriverResult<()>;

    /// Replays this frame's command list.
    fn update_command_list(&mut self, commands: &[Command]) -> DriverResult<()>;
}
