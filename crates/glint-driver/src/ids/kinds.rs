use core::fmt;

/// Resource families that share the engine's numeric id namespace shape.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Texture,
    Geometry,
    RenderBuffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Texture => "texture",
            ResourceKind::Geometry => "geometry",
            ResourceKind::RenderBuffer => "render buffer",
        })
    }
}

/// A typed view over a raw engine id.
///
/// Raw value `0` never names a resource; callers use it as "no resource".
pub trait ResourceId: Copy + Eq + fmt::Debug {
    const KIND: ResourceKind;

    fn from_raw(raw: u32) -> Self;
    fn raw(self) -> u32;

    #[inline]
    fn is_none(self) -> bool {
        self.raw() == 0
    }
}

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// The reserved "no resource" id.
            pub const NONE: Self = Self(0);
        }

        impl ResourceId for $name {
            const KIND: ResourceKind = ResourceKind::$kind;

            #[inline]
            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", ResourceKind::$kind, self.0)
            }
        }
    };
}

resource_id!(
    /// Id of a texture owned by the texture manager.
    TextureId => Texture
);
resource_id!(
    /// Id of a vertex/index buffer pair owned by the geometry manager.
    GeometryId => Geometry
);
resource_id!(
    /// Id of a render target binding owned by the render target manager.
    RenderBufferId => RenderBuffer
);
