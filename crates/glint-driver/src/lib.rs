//! GPU realization layer for a retained HTML/CSS paint command stream.
//!
//! A paint engine identifies textures, geometry and render buffers by plain
//! integers and hands over one command list per frame. This crate allocates
//! and recycles those ids, realizes each resource on a graphics [`backend`],
//! and replays the command list as batched render passes.
//!
//! ```text
//! engine ── lifecycle calls ──▶ Driver ── TextureManager / GeometryManager / RenderTargetManager
//!        ── command list ────▶ Driver ── CommandListInterpreter ──▶ Backend ──▶ submit
//! ```

pub mod backend;
pub mod device;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod logging;
pub mod replay;
pub mod stream;
pub mod target;
pub mod texture;
pub mod uniforms;

pub use backend::{Backend, Readback};
pub use driver::{Driver, DriverConfig, GpuDriver};
pub use error::{DriverError, DriverResult};
pub use ids::{GeometryId, RenderBufferId, TextureId};
