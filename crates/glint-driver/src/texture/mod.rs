//! Texture ownership: images, their sampling bindings and staging buffers.

mod layout;
mod manager;

pub use layout::StagingLayout;
pub use manager::{Staged, TextureEntry, TextureManager};
