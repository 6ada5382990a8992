use thiserror::Error;

use crate::ids::{RenderBufferId, ResourceKind, TextureId};

/// Errors raised by the driver core.
///
/// None of these are retried. A creation failure or size-limit violation means
/// the frame being recorded is unusable; contract violations mean the engine
/// broke the id lifecycle. Either way the error is handed to the embedding
/// application, which decides whether to abort or rebuild the context.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{kind} {id} has no live entry")]
    UnknownResource { kind: ResourceKind, id: u32 },

    #[error("{kind} {id} is already live; destroy it before creating it again")]
    AlreadyLive { kind: ResourceKind, id: u32 },

    #[error("{0} is a render target texture and has no staging buffer to update")]
    NotADataTexture(TextureId),

    #[error("bitmap for {id} is invalid: {reason}")]
    InvalidBitmap { id: TextureId, reason: String },

    #[error("bitmap for {id} does not match the size or format it was created with")]
    BitmapMismatch { id: TextureId },

    #[error("{what} of {size} bytes reaches the backend copy limit of {limit} bytes")]
    SizeLimit {
        what: &'static str,
        size: u64,
        limit: u64,
    },

    #[error("geometry {id} {which} block grew from {capacity} to {requested} bytes; recreate it instead")]
    GeometryGrew {
        id: u32,
        which: &'static str,
        capacity: u64,
        requested: u64,
    },

    #[error("{render_buffer} is not backed by a live texture")]
    MissingTarget { render_buffer: RenderBufferId },

    #[error("{0} carries pixel data and cannot back a render buffer")]
    NotARenderTarget(TextureId),

    #[error("uniform arena of {capacity} slots is full")]
    UniformArenaFull { capacity: u32 },

    #[error("texture readback failed: {0}")]
    Readback(String),

    #[error("backend resource creation failed: {0}")]
    CreationFailed(String),

    #[error("pass command recorded while no render pass is open")]
    NoActivePass,
}

impl DriverError {
    pub(crate) fn unknown<I: crate::ids::ResourceId>(id: I) -> Self {
        Self::UnknownResource {
            kind: I::KIND,
            id: id.raw(),
        }
    }

    pub(crate) fn already_live<I: crate::ids::ResourceId>(id: I) -> Self {
        Self::AlreadyLive {
            kind: I::KIND,
            id: id.raw(),
        }
    }
}

/// Result alias used across the driver core.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Fails with [`DriverError::SizeLimit`] when `size` is at or above `limit`.
pub(crate) fn check_copy_size(what: &'static str, size: u64, limit: u64) -> DriverResult<()> {
    if size >= limit {
        return Err(DriverError::SizeLimit { what, size, limit });
    }
    Ok(())
}
