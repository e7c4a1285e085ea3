#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Scoped, typed wrappers over a handle-based graphics driver.
//!
//! Every driver object (buffer, texture, sampler, framebuffer, renderbuffer,
//! vertex array, shader, program, fence) is owned by exactly one Rust value
//! and released exactly once. Calls go through the [`Driver`] trait;
//! [`SoftDriver`] implements it on the CPU for tests and headless tools.

#[macro_use]
pub mod types;

pub mod context;
pub mod debug;
pub mod driver;
pub mod errors;
pub mod resources;
pub mod settings;

pub use context::Context;
pub use debug::{DebugFilter, DebugMessage, DebugSeverity, DebugSource, DebugType};
pub use driver::soft::SoftDriver;
pub use driver::{Driver, PixelData, RawHandle, RawSync};
pub use errors::{GlError, Result};
pub use resources::buffer::*;
pub use resources::texture::*;
pub use resources::{
    Attachment, AttributeDescriptor, AttributeState, Fence, FormatPath, Framebuffer, GlObject,
    Program, ProgramBinary, ProgramState, Renderbuffer, Sampler, SamplingParameters, Shader,
    ShaderState, UniformLocation, UniformValue, VertexArray,
};
pub use settings::{ContextSettings, DebugSettings};
pub use types::*;
