//! Vertex/index buffer ownership and the two vertex layouts.

mod manager;
mod vertex;

pub use manager::{BufferPair, GeometryEntry, GeometryManager};
pub use vertex::{FILL_VERTEX_STRIDE, FillVertex, PATH_VERTEX_STRIDE, PathVertex};
