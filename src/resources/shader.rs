//! Shaders
//!
//! A [`Shader`] is one compiled stage, created from GLSL source, a file, or a
//! SPIR-V module. Constructors that compile return
//! [`GlError::ShaderCompile`] with the driver's info log on failure.
//!
//! # Usage
//!
//! ```rust,ignore
//! let vs = Shader::from_file(&ctx, "shaders/quad.vert")?;
//! let fs = Shader::fragment(&ctx, FRAGMENT_SOURCE)?;
//! let program = Program::from_shaders(&ctx, &[&vs, &fs])?;
//! ```

use std::path::Path;

use log::{debug, error, warn};

use super::handle::{Handle, HandleKind};
use crate::context::Context;
use crate::driver::{Driver, RawHandle};
use crate::errors::{GlError, Result};
use crate::types::{ObjectType, ShaderKind, ShaderParameter};

/// Compilation state of a [`Shader`] as last observed by this wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderState {
    #[default]
    Uncompiled,
    Compiled,
    Failed,
}

/// Shader object family. The descriptor is the stage.
#[derive(Debug)]
pub enum ShaderObject {}

impl HandleKind for ShaderObject {
    const OBJECT: ObjectType = ObjectType::Shader;
    type Raw = RawHandle;
    type Desc = ShaderKind;

    fn acquire(driver: &dyn Driver, kind: ShaderKind) -> RawHandle {
        driver.create_shader(kind)
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_shader(raw);
    }
}

#[derive(Debug)]
pub struct Shader {
    handle: Handle<ShaderObject>,
    state: ShaderState,
}

scoped_resource!([] Shader, reset { state });

impl Shader {
    /// Creates an empty, uncompiled shader of stage `kind`.
    #[must_use]
    pub fn new(ctx: &Context, kind: ShaderKind) -> Self {
        Self {
            handle: Handle::new(ctx, kind),
            state: ShaderState::Uncompiled,
        }
    }

    #[must_use]
    pub fn null(ctx: &Context, kind: ShaderKind) -> Self {
        Self {
            handle: Handle::null(ctx, kind),
            state: ShaderState::Uncompiled,
        }
    }

    // ========================================================================
    // Constructors that compile
    // ========================================================================

    pub fn from_source(ctx: &Context, kind: ShaderKind, source: &str) -> Result<Self> {
        Self::from_sources(ctx, kind, &[source])
    }

    /// Compiles the concatenation of `sources`.
    pub fn from_sources(ctx: &Context, kind: ShaderKind, sources: &[&str]) -> Result<Self> {
        let mut shader = Self::new(ctx, kind);
        shader.compile_glsl(sources);
        shader.check_compiled()?;
        Ok(shader)
    }

    /// Loads a SPIR-V module and specializes `entry_point`.
    pub fn from_spirv(
        ctx: &Context,
        kind: ShaderKind,
        module: &[u8],
        entry_point: &str,
    ) -> Result<Self> {
        let mut shader = Self::new(ctx, kind);
        shader.load_spirv(module);
        shader.specialize(entry_point, &[]);
        shader.check_compiled()?;
        Ok(shader)
    }

    /// Compiles a GLSL file, guessing the stage from its extension.
    pub fn from_file(ctx: &Context, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let kind = ShaderKind::from_path(path)
            .ok_or_else(|| GlError::UnknownShaderExtension(path.display().to_string()))?;
        Self::from_file_with_kind(ctx, kind, path)
    }

    pub fn from_file_with_kind(
        ctx: &Context,
        kind: ShaderKind,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_source(ctx, kind, &source)
    }

    #[inline]
    pub fn vertex(ctx: &Context, source: &str) -> Result<Self> {
        Self::from_source(ctx, ShaderKind::Vertex, source)
    }

    #[inline]
    pub fn fragment(ctx: &Context, source: &str) -> Result<Self> {
        Self::from_source(ctx, ShaderKind::Fragment, source)
    }

    #[inline]
    pub fn compute(ctx: &Context, source: &str) -> Result<Self> {
        Self::from_source(ctx, ShaderKind::Compute, source)
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    #[inline]
    fn driver(&self) -> &dyn Driver {
        self.handle.driver()
    }

    /// Replaces the source and compiles it. Returns whether it compiled.
    pub fn compile_glsl(&mut self, sources: &[&str]) -> bool {
        if self.is_null() {
            return false;
        }
        self.driver().shader_source(self.raw(), sources);
        self.driver().compile_shader(self.raw());
        self.observe("compiled")
    }

    /// Replaces the shader's code with a SPIR-V module. The shader is not
    /// usable until [`specialize`](Self::specialize) succeeds.
    pub fn load_spirv(&mut self, module: &[u8]) {
        if self.is_null() {
            return;
        }
        self.driver().shader_binary_spirv(self.raw(), module);
        self.state = ShaderState::Uncompiled;
    }

    /// Selects the entry point of a SPIR-V shader and sets specialization
    /// constants given as `(id, value)` pairs. Returns whether it succeeded.
    pub fn specialize(&mut self, entry_point: &str, constants: &[(u32, u32)]) -> bool {
        if self.is_null() {
            return false;
        }
        self.driver()
            .specialize_shader(self.raw(), entry_point, constants);
        self.observe("specialized")
    }

    fn observe(&mut self, action: &str) -> bool {
        let ok = self.compile_status();
        self.state = if ok {
            ShaderState::Compiled
        } else {
            ShaderState::Failed
        };
        if ok {
            debug!("{} shader {} {action}", self.kind(), self.raw());
        } else {
            warn!("{} shader {} log:\n{}", self.kind(), self.raw(), self.info_log());
        }
        ok
    }

    /// Fails with the info log unless the shader compiled.
    pub fn check_compiled(&self) -> Result<()> {
        if self.state == ShaderState::Compiled {
            return Ok(());
        }
        let log = self.info_log();
        error!("{} shader {} failed to compile", self.kind(), self.raw());
        Err(GlError::ShaderCompile {
            kind: self.kind(),
            log,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn state(&self) -> ShaderState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ShaderKind {
        self.handle.desc()
    }

    fn parameter(&self, pname: ShaderParameter) -> i32 {
        if self.is_null() {
            return 0;
        }
        self.driver().get_shader_parameter(self.raw(), pname)
    }

    /// Compile status as reported by the driver.
    #[must_use]
    pub fn compile_status(&self) -> bool {
        self.parameter(ShaderParameter::CompileStatus) != 0
    }

    /// Whether the driver has flagged the shader for deletion.
    #[must_use]
    pub fn deletion_status(&self) -> bool {
        self.parameter(ShaderParameter::DeleteStatus) != 0
    }

    #[must_use]
    pub fn info_log(&self) -> String {
        if self.is_null() {
            return String::new();
        }
        self.driver().get_shader_info_log(self.raw())
    }

    #[must_use]
    pub fn source(&self) -> String {
        if self.is_null() {
            return String::new();
        }
        self.driver().get_shader_source(self.raw())
    }
}
