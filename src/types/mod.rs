//! Enumerations & Type Tables
//!
//! Closed enumerations for every driver enum the crate passes through, plus the
//! flag sets used by buffer storage and mapping.
//!
//! # Overview
//!
//! Each enumeration carries the driver's raw value as its discriminant, so
//! [`as_raw`](BufferType::as_raw) is free and
//! [`from_raw`](BufferType::from_raw) is the only place an unknown value can
//! be rejected. Everything above this module works with the typed values.
//!
//! - [`component`]: vertex/pixel component types, byte sizes and categories
//! - [`targets`]: buffer and texture binding targets, usages, map flags
//! - [`format`]: internal, pixel and compressed image formats
//! - [`sampling`]: wrap, filter, compare and swizzle modes
//! - [`params`]: object parameter names and values
//! - [`state`]: capabilities, faces, error codes, object identifiers
//! - [`status`]: framebuffer attachment slots and completeness
//! - [`stage`]: shader stages and file-extension guessing

/// Declares a `#[repr(u32)]` enum whose discriminants are driver values.
macro_rules! gl_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The raw driver value.
            #[inline]
            #[must_use]
            pub const fn as_raw(self) -> u32 {
                self as u32
            }

            /// Maps a raw driver value back, `None` for values outside the enum.
            #[must_use]
            pub fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $( v if v == Self::$variant as u32 => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

pub mod component;
pub mod format;
pub mod params;
pub mod sampling;
pub mod stage;
pub mod state;
pub mod status;
pub mod targets;

pub use component::{Component, ComponentCategory, ComponentType};
pub use format::{CompressedFormat, ImageAspect, InternalFormat, PixelFormat};
pub use params::{
    BufferParameter, ParamValue, ProgramParameter, ShaderParameter, TextureParameter,
    VertexAttribParameter,
};
pub use sampling::{CompareFunc, CubeFace, DepthStencilMode, Filter, Swizzle, WrapMode};
pub use stage::ShaderKind;
pub use state::{Capability, ErrorCode, Face, ObjectType, WaitStatus};
pub use status::{AttachmentSlot, FramebufferStatus, MAX_COLOR_ATTACHMENTS};
pub use targets::{
    BufferType, BufferUsage, FramebufferTarget, MapAccess, MapFlags, StorageFlags, TextureType,
};
