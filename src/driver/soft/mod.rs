//! Software Driver
//!
//! [`SoftDriver`] implements [`Driver`](crate::driver::Driver) entirely on
//! the CPU. It does not rasterize anything; it reproduces the driver's object
//! model and validation state machine, which is what the resource layer
//! depends on:
//!
//! - names are reserved by `create_*` and only gain a type on first bind;
//!   direct-state calls on a name that was never bound record
//!   `InvalidOperation`
//! - buffers own real memory, so uploads, read-back, copies and mappings can
//!   be observed
//! - framebuffer completeness, attribute format state, shader compilation and
//!   program linking follow the driver's rules closely enough to test against
//! - errors are recorded in the error flag and reported through the debug
//!   callback, filtered by the debug message controls
//!
//! Every interesting entry point is also appended to a call log, see
//! [`SoftDriver::calls`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let driver = Rc::new(SoftDriver::new());
//! let ctx = Context::from_shared(driver.clone());
//!
//! let vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &[0.0f32; 9]);
//! assert_eq!(driver.buffer_contents(vbo.raw()).map(|b| b.len()), Some(36));
//! ```

mod calls;
pub mod glsl;
mod linker;
mod objects;

use std::cell::{Cell, RefCell};

use rustc_hash::{FxHashMap, FxHashSet};

use self::objects::{
    BufferObject, Fault, FramebufferObject, Op, ProgramObject, RenderbufferObject, SamplerObject,
    ShaderObject, SoftObject, Table, TextureObject, VertexArrayObject,
};
use crate::debug::{DebugCallback, DebugMessage, DebugSeverity, DebugSource, DebugType};
use crate::driver::{RawHandle, RawSync};
use crate::resources::uniform::UniformValue;
use crate::types::{
    BufferType, Capability, ComponentType, ErrorCode, Face, FramebufferTarget, ObjectType,
    ParamValue, TextureParameter, TextureType,
};

/// Number of vertex attribute locations and buffer bindings.
pub const MAX_VERTEX_ATTRIBS: u32 = 16;
/// Number of texture and sampler units.
pub const MAX_TEXTURE_UNITS: u32 = 32;
/// Number of indexed binding points per indexed buffer target.
pub const MAX_INDEXED_BINDINGS: u32 = 36;
/// Maximum multisample count.
pub const MAX_SAMPLES: u32 = 8;
/// Maximum texture anisotropy.
pub const MAX_ANISOTROPY: f32 = 16.0;
/// Format tag of program binaries produced by this driver.
pub const BINARY_FORMAT: u32 = 0x534F_4654;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Create(ObjectType, RawHandle),
    Delete(ObjectType, RawHandle),
    BindBuffer(BufferType, RawHandle),
    BindBufferBase {
        target: BufferType,
        index: u32,
        buffer: RawHandle,
    },
    BindTexture(TextureType, RawHandle),
    BindTextureUnit { unit: u32, texture: RawHandle },
    BindSampler { unit: u32, sampler: RawHandle },
    BindFramebuffer(FramebufferTarget, RawHandle),
    BindRenderbuffer(RawHandle),
    BindVertexArray(RawHandle),
    CopyBufferSubData {
        read: RawHandle,
        write: RawHandle,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    },
    TextureParameter {
        texture: RawHandle,
        pname: TextureParameter,
        value: ParamValue,
    },
    SamplerParameter {
        sampler: RawHandle,
        pname: TextureParameter,
        value: ParamValue,
    },
    TextureSubImage {
        texture: RawHandle,
        level: u32,
        offset: [u32; 3],
        extent: [u32; 3],
    },
    AttribFormat {
        location: u32,
        components: u32,
        ty: ComponentType,
        normalized: bool,
    },
    AttribIFormat {
        location: u32,
        components: u32,
        ty: ComponentType,
    },
    AttribLFormat {
        location: u32,
        components: u32,
        ty: ComponentType,
    },
    AttribBinding { location: u32, binding: u32 },
    EnableAttrib(u32),
    DisableAttrib(u32),
    AttachShader { program: RawHandle, shader: RawHandle },
    DetachShader { program: RawHandle, shader: RawHandle },
    LinkProgram(RawHandle),
    ValidateProgram(RawHandle),
    UseProgram(RawHandle),
}

/// Global binding points.
#[derive(Debug, Default)]
struct Bindings {
    buffers: FxHashMap<BufferType, RawHandle>,
    indexed_buffers: FxHashMap<(BufferType, u32), RawHandle>,
    active_unit: u32,
    textures: FxHashMap<(u32, TextureType), RawHandle>,
    texture_units: FxHashMap<u32, RawHandle>,
    samplers: FxHashMap<u32, RawHandle>,
    draw_framebuffer: RawHandle,
    read_framebuffer: RawHandle,
    renderbuffer: RawHandle,
    vertex_array: RawHandle,
    program: RawHandle,
}

/// Fixed-function state.
#[derive(Debug)]
struct RasterState {
    capabilities: FxHashSet<Capability>,
    viewport: [i32; 4],
    scissor: [i32; 4],
    cull_face: Face,
    depth_mask: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        let mut capabilities = FxHashSet::default();
        capabilities.insert(Capability::Multisample);
        Self {
            capabilities,
            viewport: [0; 4],
            scissor: [0; 4],
            cull_face: Face::Back,
            depth_mask: true,
        }
    }
}

/// One debug-message control call.
#[derive(Debug, Clone)]
struct DebugRule {
    source: Option<DebugSource>,
    ty: Option<DebugType>,
    severity: Option<DebugSeverity>,
    ids: Vec<u32>,
    enabled: bool,
}

impl DebugRule {
    fn matches(&self, message: &DebugMessage<'_>) -> bool {
        self.source.is_none_or(|s| s == message.source)
            && self.ty.is_none_or(|t| t == message.ty)
            && self.severity.is_none_or(|s| s == message.severity)
            && (self.ids.is_empty() || self.ids.contains(&message.id))
    }
}

#[derive(Default)]
struct DebugState {
    rules: Vec<DebugRule>,
    groups: Vec<(DebugSource, u32, String)>,
}

impl DebugState {
    /// Low-severity messages start out disabled; the last matching rule wins.
    fn allows(&self, message: &DebugMessage<'_>) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(message))
            .map_or(message.severity != DebugSeverity::Low, |rule| rule.enabled)
    }
}

/// CPU-side implementation of the driver boundary.
#[derive(Default)]
pub struct SoftDriver {
    next_name: Cell<RawHandle>,
    next_sync: Cell<RawSync>,
    error: Cell<Option<ErrorCode>>,
    raster: RefCell<RasterState>,
    bindings: RefCell<Bindings>,
    labels: RefCell<FxHashMap<(ObjectType, RawHandle), String>>,

    buffers: RefCell<Table<BufferObject>>,
    textures: RefCell<Table<TextureObject>>,
    samplers: RefCell<Table<SamplerObject>>,
    framebuffers: RefCell<Table<FramebufferObject>>,
    renderbuffers: RefCell<Table<RenderbufferObject>>,
    vertex_arrays: RefCell<Table<VertexArrayObject>>,
    shaders: RefCell<Table<ShaderObject>>,
    programs: RefCell<Table<ProgramObject>>,
    syncs: RefCell<FxHashSet<RawSync>>,

    debug: RefCell<DebugState>,
    callback: RefCell<Option<DebugCallback>>,
    calls: RefCell<Vec<DriverCall>>,
}

impl SoftDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Every recorded call since creation or the last [`clear_calls`](Self::clear_calls).
    #[must_use]
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Number of live objects of a family.
    #[must_use]
    pub fn live_objects(&self, ty: ObjectType) -> usize {
        match ty {
            ObjectType::Buffer => self.buffers.borrow().len(),
            ObjectType::Texture => self.textures.borrow().len(),
            ObjectType::Sampler => self.samplers.borrow().len(),
            ObjectType::Framebuffer => self.framebuffers.borrow().len(),
            ObjectType::Renderbuffer => self.renderbuffers.borrow().len(),
            ObjectType::VertexArray => self.vertex_arrays.borrow().len(),
            ObjectType::Shader => self.shaders.borrow().len(),
            ObjectType::Program => self.programs.borrow().len(),
            ObjectType::Sync => self.syncs.borrow().len(),
        }
    }

    #[must_use]
    pub fn live_fences(&self) -> usize {
        self.syncs.borrow().len()
    }

    /// Copy of a buffer's memory.
    #[must_use]
    pub fn buffer_contents(&self, buffer: RawHandle) -> Option<Vec<u8>> {
        self.buffers.borrow().get(&buffer).map(|b| b.data.clone())
    }

    #[must_use]
    pub fn bound_buffer(&self, target: BufferType) -> RawHandle {
        self.bindings
            .borrow()
            .buffers
            .get(&target)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn bound_indexed_buffer(&self, target: BufferType, index: u32) -> RawHandle {
        self.bindings
            .borrow()
            .indexed_buffers
            .get(&(target, index))
            .copied()
            .unwrap_or(0)
    }

    /// Texture bound to `target` on the active unit.
    #[must_use]
    pub fn bound_texture(&self, target: TextureType) -> RawHandle {
        let bindings = self.bindings.borrow();
        bindings
            .textures
            .get(&(bindings.active_unit, target))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn active_texture_unit(&self) -> u32 {
        self.bindings.borrow().active_unit
    }

    /// Texture bound to `unit` through the unit-binding entry point.
    #[must_use]
    pub fn texture_unit(&self, unit: u32) -> RawHandle {
        self.bindings
            .borrow()
            .texture_units
            .get(&unit)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn sampler_unit(&self, unit: u32) -> RawHandle {
        self.bindings
            .borrow()
            .samplers
            .get(&unit)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn bound_framebuffer(&self, target: FramebufferTarget) -> RawHandle {
        let bindings = self.bindings.borrow();
        match target {
            FramebufferTarget::Read => bindings.read_framebuffer,
            FramebufferTarget::Draw | FramebufferTarget::ReadDraw => bindings.draw_framebuffer,
        }
    }

    #[must_use]
    pub fn bound_renderbuffer(&self) -> RawHandle {
        self.bindings.borrow().renderbuffer
    }

    #[must_use]
    pub fn bound_vertex_array(&self) -> RawHandle {
        self.bindings.borrow().vertex_array
    }

    #[must_use]
    pub fn current_program(&self) -> RawHandle {
        self.bindings.borrow().program
    }

    /// Last value uploaded to a uniform location.
    #[must_use]
    pub fn uniform_value(&self, program: RawHandle, location: i32) -> Option<UniformValue> {
        self.programs
            .borrow()
            .get(&program)?
            .uniform_values
            .get(&location)
            .copied()
    }

    #[must_use]
    pub fn uniform_block_binding(&self, program: RawHandle, block: u32) -> Option<u32> {
        self.programs
            .borrow()
            .get(&program)?
            .block_bindings
            .get(&block)
            .copied()
    }

    #[must_use]
    pub fn viewport(&self) -> [i32; 4] {
        self.raster.borrow().viewport
    }

    #[must_use]
    pub fn scissor_box(&self) -> [i32; 4] {
        self.raster.borrow().scissor
    }

    #[must_use]
    pub fn cull_face_mode(&self) -> Face {
        self.raster.borrow().cull_face
    }

    #[must_use]
    pub fn depth_write_enabled(&self) -> bool {
        self.raster.borrow().depth_mask
    }

    #[must_use]
    pub fn debug_group_depth(&self) -> usize {
        self.debug.borrow().groups.len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn record(&self, call: DriverCall) {
        self.calls.borrow_mut().push(call);
    }

    fn gen_name(&self) -> RawHandle {
        let name = self.next_name.get() + 1;
        self.next_name.set(name);
        name
    }

    /// Records a fault in the error flag and reports it as a debug message.
    fn raise(&self, fault: Fault) {
        if self.error.get().is_none() {
            self.error.set(Some(fault.code));
        }
        self.emit(&DebugMessage {
            source: DebugSource::Api,
            ty: DebugType::Error,
            id: fault.code.as_raw(),
            severity: DebugSeverity::High,
            message: &fault.message,
        });
    }

    fn check<T>(&self, outcome: Op<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(fault) => {
                self.raise(fault);
                None
            }
        }
    }

    /// Delivers a message to the callback if debug output is on and the
    /// filter allows it.
    fn emit(&self, message: &DebugMessage<'_>) {
        if !self.raster.borrow().capabilities.contains(&Capability::DebugOutput) {
            return;
        }
        if !self.debug.borrow().allows(message) {
            return;
        }

        // The callback may call back into the driver, so it runs outside the
        // borrow and is put back afterwards unless it was replaced meanwhile.
        let taken = self.callback.borrow_mut().take();
        if let Some(mut callback) = taken {
            callback(message);
            let mut slot = self.callback.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }

    /// Runs `f` on a live, committed object, recording a fault otherwise.
    fn with<T: SoftObject, R>(
        &self,
        table: &RefCell<Table<T>>,
        handle: RawHandle,
        f: impl FnOnce(&mut T) -> Op<R>,
    ) -> Option<R> {
        let outcome = {
            let mut table = table.borrow_mut();
            match table.get_mut(&handle) {
                None => Err(Fault::invalid_operation(format!(
                    "{} {handle} does not exist",
                    T::NAME
                ))),
                Some(object) if !object.committed() => Err(Fault::invalid_operation(format!(
                    "{} {handle} has never been bound",
                    T::NAME
                ))),
                Some(object) => f(object),
            }
        };
        self.check(outcome)
    }

    /// Removes an object. Unknown names and 0 are ignored.
    fn delete<T>(&self, table: &RefCell<Table<T>>, ty: ObjectType, handle: RawHandle) -> bool {
        self.record(DriverCall::Delete(ty, handle));
        if handle == 0 {
            return false;
        }
        let removed = table.borrow_mut().remove(&handle).is_some();
        if removed {
            self.labels.borrow_mut().remove(&(ty, handle));
        }
        removed
    }

    fn create<T: Default>(&self, table: &RefCell<Table<T>>, ty: ObjectType) -> RawHandle {
        let name = self.gen_name();
        table.borrow_mut().insert(name, T::default());
        self.record(DriverCall::Create(ty, name));
        name
    }

    fn exists(&self, ty: ObjectType, handle: RawHandle) -> bool {
        match ty {
            ObjectType::Buffer => self.buffers.borrow().contains_key(&handle),
            ObjectType::Texture => self.textures.borrow().contains_key(&handle),
            ObjectType::Sampler => self.samplers.borrow().contains_key(&handle),
            ObjectType::Framebuffer => self.framebuffers.borrow().contains_key(&handle),
            ObjectType::Renderbuffer => self.renderbuffers.borrow().contains_key(&handle),
            ObjectType::VertexArray => self.vertex_arrays.borrow().contains_key(&handle),
            ObjectType::Shader => self.shaders.borrow().contains_key(&handle),
            ObjectType::Program => self.programs.borrow().contains_key(&handle),
            ObjectType::Sync => self.syncs.borrow().contains(&RawSync::from(handle)),
        }
    }
}
