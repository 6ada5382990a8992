//! Resource id spaces.
//!
//! The paint engine names every resource with a plain `u32`. Each manager
//! keeps a dense, id-indexed store behind an [`IdAllocator`] so lookups stay
//! O(1) and nothing but integers crosses the engine boundary.

mod allocator;
mod kinds;

pub use allocator::IdAllocator;
pub use kinds::{GeometryId, RenderBufferId, ResourceId, ResourceKind, TextureId};
