//! Engine-facing value types.
//!
//! Everything the paint engine hands to the driver: bitmaps and vertex/index
//! blocks for resource uploads, and the command list with its per-draw state.
//! These types only borrow engine memory for the duration of a call.

mod bitmap;
mod blocks;
mod command;
mod gpu_state;

pub use bitmap::{Bitmap, PixelFormat};
pub use blocks::{IndexBuffer, RenderBufferDesc, VertexBuffer, VertexFormat};
pub use command::Command;
pub use gpu_state::{GpuState, MAX_CLIPS, ScissorRect, ShaderType};
