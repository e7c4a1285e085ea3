//! Driver Boundary
//!
//! The [`Driver`] trait is the only place the crate talks to the GPU driver.
//! Each method corresponds to exactly one direct-state-access entry point; the
//! resource types above it add ownership and typing but never batch, reorder
//! or cache calls.
//!
//! # Overview
//!
//! - Object names are plain [`RawHandle`]s, with 0 meaning "no object".
//! - Every enum argument is already typed; backends convert with `as_raw()`.
//! - Errors are not returned. They are recorded by the driver and surface
//!   through [`Driver::get_error`] and the debug-message callback.
//!
//! [`soft::SoftDriver`] implements the trait without a GPU and is what the
//! tests and the headless demo run against.
//!
//! # Safety
//!
//! The trait is `unsafe` to implement because the buffer-mapping entry points
//! return raw pointers that the crate turns into slices. See
//! [`Driver::map_buffer_range`].

pub mod soft;

use crate::debug::{DebugCallback, DebugSeverity, DebugSource, DebugType};
use crate::resources::program::ProgramBinary;
use crate::resources::uniform::UniformValue;
use crate::types::{
    AttachmentSlot, BufferParameter, BufferType, BufferUsage, Capability, ComponentType,
    CompressedFormat, CubeFace, ErrorCode, Face, FramebufferStatus, FramebufferTarget,
    InternalFormat, MapAccess, MapFlags, ObjectType, ParamValue, PixelFormat, ProgramParameter,
    ShaderKind, ShaderParameter, StorageFlags, TextureParameter, TextureType,
    VertexAttribParameter, WaitStatus,
};

/// Name of a driver object. 0 is never a live object.
pub type RawHandle = u32;

/// Name of a fence. 0 is never a live fence.
pub type RawSync = u64;

/// Client pixel data for a texture transfer.
#[derive(Debug, Clone, Copy)]
pub struct PixelData<'a> {
    pub format: PixelFormat,
    pub component_type: ComponentType,
    pub bytes: &'a [u8],
}

impl PixelData<'_> {
    /// Bytes needed for a region of `extent` texels.
    #[must_use]
    pub fn required_len(&self, extent: [u32; 3]) -> usize {
        let texels: usize = extent.iter().map(|&e| e as usize).product();
        texels * self.format.components() * self.component_type.size_bytes()
    }
}

/// A direct-state-access GPU driver.
///
/// All methods take `&self`: drivers are single-threaded state machines and
/// keep their state behind interior mutability.
///
/// # Safety
///
/// Implementors must guarantee that a non-null pointer returned by
/// [`map_buffer`](Self::map_buffer) or [`map_buffer_range`](Self::map_buffer_range)
/// is valid for reads and writes of the mapped length until the matching
/// [`unmap_buffer`](Self::unmap_buffer) or until the buffer is deleted, and
/// that no other driver call reads or writes that memory in between unless the
/// mapping is persistent.
pub unsafe trait Driver {
    // ========================================================================
    // Errors & Global State
    // ========================================================================
    /// Returns and clears the oldest recorded error.
    fn get_error(&self) -> Option<ErrorCode>;
    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn is_enabled(&self, capability: Capability) -> bool;
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn cull_face(&self, face: Face);
    fn depth_mask(&self, write: bool);
    fn object_label(&self, ty: ObjectType, handle: RawHandle, label: &str);
    fn get_object_label(&self, ty: ObjectType, handle: RawHandle) -> String;

    // ========================================================================
    // Debug Output
    // ========================================================================
    /// Installs or removes the debug-message callback.
    fn debug_message_callback(&self, callback: Option<DebugCallback>);
    /// Enables or disables messages matching every given criterion. `None`
    /// matches anything; an empty `ids` slice matches every id.
    fn debug_message_control(
        &self,
        source: Option<DebugSource>,
        ty: Option<DebugType>,
        severity: Option<DebugSeverity>,
        ids: &[u32],
        enabled: bool,
    );
    fn debug_message_insert(
        &self,
        source: DebugSource,
        ty: DebugType,
        id: u32,
        severity: DebugSeverity,
        message: &str,
    );
    fn push_debug_group(&self, source: DebugSource, id: u32, message: &str);
    fn pop_debug_group(&self);

    // ========================================================================
    // Buffers
    // ========================================================================
    fn create_buffer(&self) -> RawHandle;
    fn delete_buffer(&self, buffer: RawHandle);
    fn bind_buffer(&self, target: BufferType, buffer: RawHandle);
    fn bind_buffer_base(&self, target: BufferType, index: u32, buffer: RawHandle);
    fn bind_buffer_range(
        &self,
        target: BufferType,
        index: u32,
        buffer: RawHandle,
        offset: usize,
        size: usize,
    );
    fn buffer_data(&self, buffer: RawHandle, size: usize, data: Option<&[u8]>, usage: BufferUsage);
    fn buffer_storage(
        &self,
        buffer: RawHandle,
        size: usize,
        data: Option<&[u8]>,
        flags: StorageFlags,
    );
    fn buffer_sub_data(&self, buffer: RawHandle, offset: usize, data: &[u8]);
    fn get_buffer_sub_data(&self, buffer: RawHandle, offset: usize, out: &mut [u8]);
    fn copy_buffer_sub_data(
        &self,
        read: RawHandle,
        write: RawHandle,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    );
    /// Maps the whole buffer. Returns null on failure.
    fn map_buffer(&self, buffer: RawHandle, access: MapAccess) -> *mut u8;
    /// Maps `length` bytes starting at `offset`. Returns null on failure.
    fn map_buffer_range(
        &self,
        buffer: RawHandle,
        offset: usize,
        length: usize,
        flags: MapFlags,
    ) -> *mut u8;
    /// Returns `false` when the buffer contents were lost while mapped.
    fn unmap_buffer(&self, buffer: RawHandle) -> bool;
    /// `offset` is relative to the start of the mapped range.
    fn flush_mapped_buffer_range(&self, buffer: RawHandle, offset: usize, length: usize);
    fn invalidate_buffer_data(&self, buffer: RawHandle);
    fn invalidate_buffer_sub_data(&self, buffer: RawHandle, offset: usize, length: usize);
    fn get_buffer_parameter(&self, buffer: RawHandle, pname: BufferParameter) -> i64;

    // ========================================================================
    // Textures
    // ========================================================================
    fn create_texture(&self) -> RawHandle;
    fn delete_texture(&self, texture: RawHandle);
    /// Binds to the active texture unit.
    fn bind_texture(&self, target: TextureType, texture: RawHandle);
    fn active_texture(&self, unit: u32);
    fn bind_texture_unit(&self, unit: u32, texture: RawHandle);
    fn texture_storage(
        &self,
        texture: RawHandle,
        levels: u32,
        format: InternalFormat,
        extent: [u32; 3],
    );
    fn texture_storage_multisample(
        &self,
        texture: RawHandle,
        samples: u32,
        format: InternalFormat,
        extent: [u32; 3],
        fixed_sample_locations: bool,
    );
    /// Mutable storage for one level. `face` selects the cube-map face and
    /// must be `Some` exactly for cube maps.
    fn texture_image(
        &self,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: InternalFormat,
        extent: [u32; 3],
        pixels: Option<PixelData<'_>>,
    );
    fn compressed_texture_image(
        &self,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: CompressedFormat,
        extent: [u32; 3],
        data: &[u8],
    );
    fn texture_sub_image(
        &self,
        texture: RawHandle,
        level: u32,
        offset: [u32; 3],
        extent: [u32; 3],
        pixels: PixelData<'_>,
    );
    fn generate_texture_mipmap(&self, texture: RawHandle);
    fn texture_parameter(&self, texture: RawHandle, pname: TextureParameter, value: ParamValue);
    fn get_texture_parameter(&self, texture: RawHandle, pname: TextureParameter) -> ParamValue;
    /// Upper bound for [`TextureParameter::MaxAnisotropy`].
    fn max_texture_anisotropy(&self) -> f32;

    // ========================================================================
    // Samplers
    // ========================================================================
    fn create_sampler(&self) -> RawHandle;
    fn delete_sampler(&self, sampler: RawHandle);
    fn bind_sampler(&self, unit: u32, sampler: RawHandle);
    fn sampler_parameter(&self, sampler: RawHandle, pname: TextureParameter, value: ParamValue);
    fn get_sampler_parameter(&self, sampler: RawHandle, pname: TextureParameter) -> ParamValue;

    // ========================================================================
    // Framebuffers & Renderbuffers
    // ========================================================================
    fn create_framebuffer(&self) -> RawHandle;
    fn delete_framebuffer(&self, framebuffer: RawHandle);
    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: RawHandle);
    /// Attaches a whole level. A texture handle of 0 detaches the slot.
    fn framebuffer_texture(
        &self,
        framebuffer: RawHandle,
        slot: AttachmentSlot,
        texture: RawHandle,
        level: u32,
    );
    fn framebuffer_texture_layer(
        &self,
        framebuffer: RawHandle,
        slot: AttachmentSlot,
        texture: RawHandle,
        level: u32,
        layer: u32,
    );
    fn framebuffer_renderbuffer(
        &self,
        framebuffer: RawHandle,
        slot: AttachmentSlot,
        renderbuffer: RawHandle,
    );
    fn framebuffer_draw_buffers(&self, framebuffer: RawHandle, slots: &[Option<AttachmentSlot>]);
    fn framebuffer_read_buffer(&self, framebuffer: RawHandle, slot: Option<AttachmentSlot>);
    fn check_framebuffer_status(
        &self,
        framebuffer: RawHandle,
        target: FramebufferTarget,
    ) -> FramebufferStatus;

    fn create_renderbuffer(&self) -> RawHandle;
    fn delete_renderbuffer(&self, renderbuffer: RawHandle);
    fn bind_renderbuffer(&self, renderbuffer: RawHandle);
    fn renderbuffer_storage(
        &self,
        renderbuffer: RawHandle,
        format: InternalFormat,
        width: u32,
        height: u32,
    );
    fn renderbuffer_storage_multisample(
        &self,
        renderbuffer: RawHandle,
        samples: u32,
        format: InternalFormat,
        width: u32,
        height: u32,
    );

    // ========================================================================
    // Vertex Arrays
    // ========================================================================
    fn create_vertex_array(&self) -> RawHandle;
    fn delete_vertex_array(&self, vao: RawHandle);
    fn bind_vertex_array(&self, vao: RawHandle);
    fn vertex_array_element_buffer(&self, vao: RawHandle, buffer: RawHandle);
    fn vertex_array_vertex_buffer(
        &self,
        vao: RawHandle,
        binding: u32,
        buffer: RawHandle,
        offset: usize,
        stride: u32,
    );
    fn vertex_array_binding_divisor(&self, vao: RawHandle, binding: u32, divisor: u32);
    /// Float attribute format. Integer component types are converted to
    /// float, normalized when `normalized` is set.
    fn vertex_array_attrib_format(
        &self,
        vao: RawHandle,
        location: u32,
        components: u32,
        ty: ComponentType,
        normalized: bool,
        relative_offset: u32,
    );
    /// Integer attribute format, values reach the shader unconverted.
    fn vertex_array_attrib_i_format(
        &self,
        vao: RawHandle,
        location: u32,
        components: u32,
        ty: ComponentType,
        relative_offset: u32,
    );
    /// Double-precision attribute format.
    fn vertex_array_attrib_l_format(
        &self,
        vao: RawHandle,
        location: u32,
        components: u32,
        ty: ComponentType,
        relative_offset: u32,
    );
    fn vertex_array_attrib_binding(&self, vao: RawHandle, location: u32, binding: u32);
    fn enable_vertex_array_attrib(&self, vao: RawHandle, location: u32);
    fn disable_vertex_array_attrib(&self, vao: RawHandle, location: u32);
    fn get_vertex_array_attrib(
        &self,
        vao: RawHandle,
        location: u32,
        pname: VertexAttribParameter,
    ) -> i64;

    // ========================================================================
    // Shaders
    // ========================================================================
    fn create_shader(&self, kind: ShaderKind) -> RawHandle;
    fn delete_shader(&self, shader: RawHandle);
    fn shader_source(&self, shader: RawHandle, sources: &[&str]);
    fn compile_shader(&self, shader: RawHandle);
    fn shader_binary_spirv(&self, shader: RawHandle, binary: &[u8]);
    fn specialize_shader(&self, shader: RawHandle, entry_point: &str, constants: &[(u32, u32)]);
    fn get_shader_parameter(&self, shader: RawHandle, pname: ShaderParameter) -> i32;
    fn get_shader_info_log(&self, shader: RawHandle) -> String;
    fn get_shader_source(&self, shader: RawHandle) -> String;

    // ========================================================================
    // Programs
    // ========================================================================
    fn create_program(&self) -> RawHandle;
    fn delete_program(&self, program: RawHandle);
    fn attach_shader(&self, program: RawHandle, shader: RawHandle);
    fn detach_shader(&self, program: RawHandle, shader: RawHandle);
    fn link_program(&self, program: RawHandle);
    fn validate_program(&self, program: RawHandle);
    fn use_program(&self, program: RawHandle);
    fn program_parameter(&self, program: RawHandle, pname: ProgramParameter, value: bool);
    fn get_program_parameter(&self, program: RawHandle, pname: ProgramParameter) -> i32;
    fn get_program_info_log(&self, program: RawHandle) -> String;
    /// -1 when the program has no active uniform of that name.
    fn get_uniform_location(&self, program: RawHandle, name: &str) -> i32;
    /// -1 when the program has no active attribute of that name.
    fn get_attrib_location(&self, program: RawHandle, name: &str) -> i32;
    /// `u32::MAX` when the program has no uniform block of that name.
    fn get_uniform_block_index(&self, program: RawHandle, name: &str) -> u32;
    fn uniform_block_binding(&self, program: RawHandle, block: u32, binding: u32);
    fn program_uniform(&self, program: RawHandle, location: i32, value: &UniformValue);
    fn get_program_binary(&self, program: RawHandle) -> Option<ProgramBinary>;
    fn program_binary(&self, program: RawHandle, binary: &ProgramBinary);

    // ========================================================================
    // Sync
    // ========================================================================
    fn fence_sync(&self) -> RawSync;
    fn delete_sync(&self, sync: RawSync);
    /// Makes the server wait for the fence before executing further commands.
    fn wait_sync(&self, sync: RawSync);
    fn client_wait_sync(&self, sync: RawSync, flush: bool, timeout_ns: u64) -> WaitStatus;
    fn is_sync_signaled(&self, sync: RawSync) -> bool;
}
