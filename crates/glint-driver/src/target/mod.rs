//! Render buffers: attachment bindings over render-target textures.

mod manager;

pub use manager::{RenderBufferEntry, RenderTargetManager};
