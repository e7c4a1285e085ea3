//! Programs
//!
//! A [`Program`] links shader stages into an executable pipeline and exposes
//! its interface: uniform and attribute locations, uniform blocks, and
//! uniform uploads.
//!
//! # Lifecycle
//!
//! `Empty` → `Linked` | `LinkFailed`, then after [`Program::validate`]
//! `Validated` | `Invalid`. [`Program::link`] attaches the given shaders only
//! for the duration of the link, so the shaders may be dropped afterwards.
//!
//! # Usage
//!
//! ```rust,ignore
//! let program = Program::from_shaders(&ctx, &[&vs, &fs])?;
//! program.use_program();
//! program.uniform("tint", Vec4::new(1.0, 0.5, 0.2, 1.0));
//! program.bind_uniform_block("Camera", 0);
//! ```

use log::{debug, error, warn};

use super::handle::{Handle, HandleKind};
use super::shader::Shader;
use super::uniform::{UniformLocation, UniformValue};
use crate::context::Context;
use crate::driver::{Driver, RawHandle};
use crate::errors::{GlError, Result};
use crate::types::{ObjectType, ProgramParameter};

/// Link and validation state of a [`Program`] as last observed by this
/// wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramState {
    #[default]
    Empty,
    Linked,
    LinkFailed,
    Validated,
    Invalid,
}

impl ProgramState {
    /// Whether the program holds a successful link.
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(self, Self::Linked | Self::Validated | Self::Invalid)
    }
}

/// A driver-specific program binary, reloadable on the same driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBinary {
    /// Driver format tag.
    pub format: u32,
    pub data: Vec<u8>,
}

/// Program object family.
#[derive(Debug)]
pub enum ProgramObject {}

impl HandleKind for ProgramObject {
    const OBJECT: ObjectType = ObjectType::Program;
    type Raw = RawHandle;
    type Desc = ();

    fn acquire(driver: &dyn Driver, (): ()) -> RawHandle {
        driver.create_program()
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_program(raw);
    }
}

#[derive(Debug)]
pub struct Program {
    handle: Handle<ProgramObject>,
    state: ProgramState,
}

scoped_resource!([] Program, reset { state });

impl Program {
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            handle: Handle::new(ctx, ()),
            state: ProgramState::Empty,
        }
    }

    #[must_use]
    pub fn null(ctx: &Context) -> Self {
        Self {
            handle: Handle::null(ctx, ()),
            state: ProgramState::Empty,
        }
    }

    /// Creates a program and links `shaders` into it.
    pub fn from_shaders(ctx: &Context, shaders: &[&Shader]) -> Result<Self> {
        let mut program = Self::new(ctx);
        program.link(shaders)?;
        Ok(program)
    }

    #[inline]
    fn driver(&self) -> &dyn Driver {
        self.handle.driver()
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Attaches `shaders`, links, then detaches them again.
    pub fn link(&mut self, shaders: &[&Shader]) -> Result<()> {
        for shader in shaders {
            self.attach(shader);
        }
        self.link_attached();
        for shader in shaders {
            self.detach(shader);
        }
        self.assert_linked()
    }

    pub fn attach(&self, shader: &Shader) {
        if !self.is_null() {
            self.driver().attach_shader(self.raw(), shader.raw());
        }
    }

    pub fn detach(&self, shader: &Shader) {
        if !self.is_null() {
            self.driver().detach_shader(self.raw(), shader.raw());
        }
    }

    /// Links whatever is attached. Returns whether the link succeeded.
    pub fn link_attached(&mut self) -> bool {
        if self.is_null() {
            return false;
        }
        self.driver().link_program(self.raw());
        let ok = self.link_status();
        self.state = if ok {
            debug!("program {} linked", self.raw());
            ProgramState::Linked
        } else {
            warn!("program {} log:\n{}", self.raw(), self.info_log());
            ProgramState::LinkFailed
        };
        ok
    }

    /// Fails with the info log unless the last link succeeded.
    pub fn assert_linked(&self) -> Result<()> {
        if self.state.is_linked() {
            return Ok(());
        }
        error!("program {} failed to link", self.raw());
        Err(GlError::ProgramLink {
            log: self.info_log(),
        })
    }

    /// Checks whether the program can run in the current state.
    pub fn validate(&mut self) -> bool {
        if self.is_null() {
            return false;
        }
        self.driver().validate_program(self.raw());
        let ok = self.validation_status();
        if self.state.is_linked() {
            self.state = if ok {
                ProgramState::Validated
            } else {
                ProgramState::Invalid
            };
        }
        ok
    }

    pub fn assert_valid(&mut self) -> Result<()> {
        if self.validate() {
            return Ok(());
        }
        Err(GlError::ProgramValidation {
            log: self.info_log(),
        })
    }

    // ========================================================================
    // Binaries
    // ========================================================================

    /// Asks the driver to keep the linked binary retrievable. Takes effect at
    /// the next link.
    pub fn hint_binary_retrievable(&self, retrievable: bool) {
        if !self.is_null() {
            self.driver().program_parameter(
                self.raw(),
                ProgramParameter::BinaryRetrievableHint,
                retrievable,
            );
        }
    }

    /// Marks the program usable in separate-stage pipelines. Takes effect at
    /// the next link.
    pub fn set_separable(&self, separable: bool) {
        if !self.is_null() {
            self.driver()
                .program_parameter(self.raw(), ProgramParameter::Separable, separable);
        }
    }

    /// The linked program in the driver's binary format.
    #[must_use]
    pub fn binary(&self) -> Option<ProgramBinary> {
        if self.is_null() {
            return None;
        }
        self.driver().get_program_binary(self.raw())
    }

    /// Replaces the program with a previously retrieved binary.
    pub fn load_binary(&mut self, binary: &ProgramBinary) -> Result<()> {
        if self.is_null() {
            return Err(GlError::NullHandle("program"));
        }
        self.driver().program_binary(self.raw(), binary);
        if self.link_status() {
            self.state = ProgramState::Linked;
            Ok(())
        } else {
            warn!("program {} rejected binary: {}", self.raw(), self.info_log());
            self.state = ProgramState::LinkFailed;
            Err(GlError::ProgramBinaryRejected)
        }
    }

    /// Makes this the current program.
    pub fn use_program(&self) {
        self.driver().use_program(self.raw());
    }

    // ========================================================================
    // Interface
    // ========================================================================

    /// Location of uniform `name`, [`UniformLocation::NONE`] if it is not an
    /// active uniform.
    #[must_use]
    pub fn uniform_location(&self, name: &str) -> UniformLocation {
        if self.is_null() {
            return UniformLocation::NONE;
        }
        UniformLocation(self.driver().get_uniform_location(self.raw(), name))
    }

    #[must_use]
    pub fn attrib_location(&self, name: &str) -> Option<u32> {
        if self.is_null() {
            return None;
        }
        u32::try_from(self.driver().get_attrib_location(self.raw(), name)).ok()
    }

    #[must_use]
    pub fn uniform_block_index(&self, name: &str) -> Option<u32> {
        if self.is_null() {
            return None;
        }
        let index = self.driver().get_uniform_block_index(self.raw(), name);
        (index != u32::MAX).then_some(index)
    }

    /// Reads uniform block `index` from uniform buffer binding `binding`.
    pub fn uniform_block_binding(&self, index: u32, binding: u32) {
        if !self.is_null() {
            self.driver()
                .uniform_block_binding(self.raw(), index, binding);
        }
    }

    /// Binds block `name` to `binding`. Returns `false` if there is no such
    /// block.
    pub fn bind_uniform_block(&self, name: &str, binding: u32) -> bool {
        match self.uniform_block_index(name) {
            Some(index) => {
                self.uniform_block_binding(index, binding);
                true
            }
            None => false,
        }
    }

    /// Uploads a uniform value. Uploads to [`UniformLocation::NONE`] are
    /// ignored.
    pub fn set_uniform(&self, location: UniformLocation, value: impl Into<UniformValue>) {
        if self.is_null() || !location.is_valid() {
            return;
        }
        self.driver()
            .program_uniform(self.raw(), location.0, &value.into());
    }

    /// Uploads uniform `name`. Returns `false` if it is not an active
    /// uniform.
    pub fn uniform(&self, name: &str, value: impl Into<UniformValue>) -> bool {
        let location = self.uniform_location(name);
        self.set_uniform(location, value);
        location.is_valid()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn state(&self) -> ProgramState {
        self.state
    }

    fn parameter(&self, pname: ProgramParameter) -> i32 {
        if self.is_null() {
            return 0;
        }
        self.driver().get_program_parameter(self.raw(), pname)
    }

    fn count(&self, pname: ProgramParameter) -> usize {
        usize::try_from(self.parameter(pname)).unwrap_or_default()
    }

    #[must_use]
    pub fn link_status(&self) -> bool {
        self.parameter(ProgramParameter::LinkStatus) != 0
    }

    #[must_use]
    pub fn validation_status(&self) -> bool {
        self.parameter(ProgramParameter::ValidateStatus) != 0
    }

    #[must_use]
    pub fn deletion_status(&self) -> bool {
        self.parameter(ProgramParameter::DeleteStatus) != 0
    }

    #[must_use]
    pub fn info_log(&self) -> String {
        if self.is_null() {
            return String::new();
        }
        self.driver().get_program_info_log(self.raw())
    }

    #[must_use]
    pub fn attached_shader_count(&self) -> usize {
        self.count(ProgramParameter::AttachedShaders)
    }

    #[must_use]
    pub fn active_attribute_count(&self) -> usize {
        self.count(ProgramParameter::ActiveAttributes)
    }

    #[must_use]
    pub fn active_uniform_count(&self) -> usize {
        self.count(ProgramParameter::ActiveUniforms)
    }

    #[must_use]
    pub fn active_uniform_block_count(&self) -> usize {
        self.count(ProgramParameter::ActiveUniformBlocks)
    }

    /// Length of the longest active attribute name, including the terminator.
    #[must_use]
    pub fn longest_active_attribute_name(&self) -> usize {
        self.count(ProgramParameter::ActiveAttributeMaxLength)
    }
}
