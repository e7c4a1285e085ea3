//! GPU Resources
//!
//! Scoped, move-only wrappers for every driver object family.
//!
//! | Type | Family |
//! |------|--------|
//! | [`Buffer<T>`](buffer::Buffer) | storage, bound to target `T` |
//! | [`Texture<K>`](texture::Texture) | images of kind `K` |
//! | [`Sampler`](sampler::Sampler) | sampling state shared between textures |
//! | [`Framebuffer`](framebuffer::Framebuffer), [`Renderbuffer`](framebuffer::Renderbuffer) | render targets |
//! | [`VertexArray`](vertex_array::VertexArray) | vertex input layout |
//! | [`Shader`](shader::Shader), [`Program`](program::Program) | shader stages and linked programs |
//! | [`Fence`](sync::Fence) | GPU/CPU synchronization |
//!
//! All of them share the lifecycle of [`Handle`](handle::Handle): `init`,
//! `destroy`, `take`, `raw` and `is_null` behave the same for every family.

/// Lifecycle methods shared by every resource wrapping a `handle` field.
///
/// Fields listed under `reset` hold cached per-object state; they are reset to
/// their `Default` whenever the object is replaced or released, and move along
/// with it on `take`.
///
/// The `@lifecycle` form skips labels and [`GlObject`](handle::GlObject), for
/// families whose names are not 32-bit object names.
macro_rules! scoped_resource {
    (@lifecycle [$($gen:tt)*] $ty:ty, $raw:ty $(, reset { $($field:ident),* $(,)? })?) => {
        impl<$($gen)*> $ty {
            /// Releases the current object, if any, and creates a fresh one.
            pub fn init(&mut self) {
                self.handle.init();
                $($(self.$field = Default::default();)*)?
            }

            /// Releases the object and leaves this resource null. Calling it
            /// again does nothing.
            pub fn destroy(&mut self) {
                self.handle.destroy();
                $($(self.$field = Default::default();)*)?
            }

            /// Moves the object into a new value, leaving this one null.
            #[must_use]
            pub fn take(&mut self) -> Self {
                Self {
                    handle: self.handle.take(),
                    $($($field: std::mem::take(&mut self.$field),)*)?
                }
            }

            #[inline]
            #[must_use]
            pub fn raw(&self) -> $raw {
                self.handle.raw()
            }

            #[inline]
            #[must_use]
            pub fn is_null(&self) -> bool {
                self.handle.is_null()
            }
        }
    };
    ([$($gen:tt)*] $ty:ty $(, reset { $($field:ident),* $(,)? })?) => {
        scoped_resource!(
            @lifecycle [$($gen)*] $ty, $crate::driver::RawHandle
            $(, reset { $($field),* })?
        );

        impl<$($gen)*> $ty {
            /// Attaches a debug label shown by driver tools.
            pub fn set_label(&self, label: &str) {
                self.handle.set_label(label);
            }

            #[must_use]
            pub fn label(&self) -> String {
                self.handle.label()
            }
        }

        impl<$($gen)*> $crate::resources::handle::GlObject for $ty {
            #[inline]
            fn raw(&self) -> $crate::driver::RawHandle {
                self.handle.raw()
            }

            #[inline]
            fn context(&self) -> &$crate::context::Context {
                self.handle.context()
            }
        }
    };
}

pub mod handle;
pub mod uniform;

pub mod buffer;
pub mod framebuffer;
pub mod program;
pub mod sampler;
pub mod shader;
pub mod sync;
pub mod texture;
pub mod vertex_array;

pub use buffer::{Buffer, MappedBuffer};
pub use framebuffer::{Attachment, Framebuffer, Renderbuffer};
pub use handle::{GlObject, Handle, HandleKind};
pub use program::{Program, ProgramBinary, ProgramState};
pub use sampler::{Sampler, SamplingParameters};
pub use shader::{Shader, ShaderState};
pub use sync::Fence;
pub use texture::{Texture, TextureKind};
pub use uniform::{UniformLocation, UniformValue};
pub use vertex_array::{AttributeDescriptor, AttributeState, FormatPath, VertexArray};
