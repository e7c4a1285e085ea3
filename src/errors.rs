//! Error Types
//!
//! This module defines the error type returned by every fallible operation.
//!
//! # Overview
//!
//! [`GlError`] covers the failure modes this layer detects itself:
//! - shader compilation, program link and validation failures (with the
//!   driver's info log)
//! - framebuffer completeness assertions
//! - preconditions that are cheap to check (overlapping copies, null handles)
//! - errors polled from the driver with [`Context::check_error`]
//! - I/O while loading shader files
//!
//! Setters and binds never validate their arguments; invalid values surface
//! through the driver's error poll or debug output instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use glkit::errors::Result;
//!
//! fn build(ctx: &Context) -> Result<Program> {
//!     let vs = Shader::from_file(ctx, "shaders/basic.vert")?;
//!     let fs = Shader::from_file(ctx, "shaders/basic.frag")?;
//!     Program::from_shaders(ctx, &[&vs, &fs])
//! }
//! ```
//!
//! [`Context::check_error`]: crate::context::Context::check_error

use thiserror::Error;

use crate::types::{ErrorCode, FramebufferStatus, ShaderKind};

/// The error type for every fallible operation in the crate.
#[derive(Error, Debug)]
pub enum GlError {
    // ========================================================================
    // Shader & Program Errors
    // ========================================================================
    /// A shader failed to compile or specialize.
    #[error("Failed to compile {kind} shader:\n{log}")]
    ShaderCompile {
        /// Stage of the failing shader
        kind: ShaderKind,
        /// Driver info log
        log: String,
    },

    /// A program failed to link.
    #[error("Failed to link program:\n{log}")]
    ProgramLink {
        /// Driver info log
        log: String,
    },

    /// A program failed validation against the current state.
    #[error("Program validation failed:\n{log}")]
    ProgramValidation {
        /// Driver info log
        log: String,
    },

    /// The driver refused a previously retrieved program binary.
    #[error("Program binary was rejected by the driver")]
    ProgramBinaryRejected,

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// A framebuffer completeness assertion failed.
    #[error("Framebuffer {status}")]
    FramebufferIncomplete {
        /// The incompleteness reason reported by the driver
        status: FramebufferStatus,
    },

    /// A same-buffer copy was requested with overlapping source and
    /// destination ranges.
    #[error("Overlapping buffer copy: {size} bytes from {src} to {dst}")]
    OverlappingCopy { src: usize, dst: usize, size: usize },

    /// The driver returned no mapping for a map request.
    #[error("Failed to map buffer")]
    MapFailed,

    /// A data-returning operation was invoked on a released resource.
    #[error("Operation on a null {0} handle")]
    NullHandle(&'static str),

    // ========================================================================
    // Driver Errors
    // ========================================================================
    /// An error flag polled from the driver.
    #[error("Driver error: {0}")]
    Driver(ErrorCode),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The shader stage could not be guessed from the file name.
    #[error("Cannot determine shader stage from file name: {0}")]
    UnknownShaderExtension(String),
}

/// Alias for `Result<T, GlError>`.
pub type Result<T> = std::result::Result<T, GlError>;
