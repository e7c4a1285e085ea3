//! `Driver` entry points of the software driver.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::linker::{self, Stage};
use super::objects::{
    AttachedImage, Fault, ImageInfo, Mapping, Op, RenderbufferStorage, SoftObject,
    StorageFormat, Table, TextureStorage, full_mip_chain,
};
use super::{
    DebugRule, DriverCall, MAX_ANISOTROPY, MAX_INDEXED_BINDINGS, MAX_SAMPLES, MAX_TEXTURE_UNITS,
    MAX_VERTEX_ATTRIBS, SoftDriver,
};
use crate::debug::{DebugCallback, DebugMessage, DebugSeverity, DebugSource, DebugType};
use crate::driver::{Driver, PixelData, RawHandle, RawSync};
use crate::resources::program::ProgramBinary;
use crate::resources::uniform::UniformValue;
use crate::types::{
    AttachmentSlot, BufferParameter, BufferType, BufferUsage, Capability, ComponentCategory,
    ComponentType, CompressedFormat, CubeFace, ErrorCode, Face, FramebufferStatus,
    FramebufferTarget, InternalFormat, MAX_COLOR_ATTACHMENTS, MapAccess, MapFlags, ObjectType,
    ParamValue, ProgramParameter, ShaderKind, ShaderParameter, StorageFlags, TextureParameter,
    TextureType, VertexAttribParameter, WaitStatus,
};

/// Largest texture or renderbuffer dimension.
const MAX_DIMENSION: u32 = 16384;
/// Largest vertex binding stride and relative attribute offset.
const MAX_VERTEX_STRIDE: u32 = 2048;

// ============================================================================
// Helpers
// ============================================================================

impl SoftDriver {
    /// Like `with`, but also accepts names that were never bound.
    fn on_object<T: SoftObject, R>(
        &self,
        table: &RefCell<Table<T>>,
        handle: RawHandle,
        f: impl FnOnce(&mut T) -> Op<R>,
    ) -> Option<R> {
        let outcome = {
            let mut table = table.borrow_mut();
            match table.get_mut(&handle) {
                Some(object) => f(object),
                None => Err(Fault::invalid_operation(format!(
                    "{} {handle} does not exist",
                    T::NAME
                ))),
            }
        };
        self.check(outcome)
    }

    fn check_attrib_location(&self, location: u32) -> bool {
        if location >= MAX_VERTEX_ATTRIBS {
            self.raise(Fault::invalid_value(format!(
                "attribute location {location} exceeds {MAX_VERTEX_ATTRIBS}"
            )));
            return false;
        }
        true
    }

    fn check_vertex_binding(&self, binding: u32) -> bool {
        if binding >= MAX_VERTEX_ATTRIBS {
            self.raise(Fault::invalid_value(format!(
                "vertex binding {binding} exceeds {MAX_VERTEX_ATTRIBS}"
            )));
            return false;
        }
        true
    }

    fn check_texture_unit(&self, unit: u32) -> bool {
        if unit >= MAX_TEXTURE_UNITS {
            self.raise(Fault::invalid_value(format!(
                "texture unit {unit} exceeds {MAX_TEXTURE_UNITS}"
            )));
            return false;
        }
        true
    }

    fn check_buffer_name(&self, buffer: RawHandle) -> bool {
        if buffer != 0 && !self.buffers.borrow().contains_key(&buffer) {
            self.raise(Fault::invalid_operation(format!(
                "buffer {buffer} does not exist"
            )));
            return false;
        }
        true
    }

    fn bind_indexed(
        &self,
        target: BufferType,
        index: u32,
        buffer: RawHandle,
        range: Option<(usize, usize)>,
    ) {
        self.record(DriverCall::BindBufferBase {
            target,
            index,
            buffer,
        });
        if !target.is_indexed() {
            self.raise(Fault::invalid_enum(format!(
                "{target:?} has no indexed binding points"
            )));
            return;
        }
        if index >= MAX_INDEXED_BINDINGS {
            self.raise(Fault::invalid_value(format!(
                "binding index {index} exceeds {MAX_INDEXED_BINDINGS}"
            )));
            return;
        }
        if buffer != 0 {
            let committed = self.on_object(&self.buffers, buffer, |b| {
                if let Some((offset, size)) = range {
                    if size == 0 {
                        return Err(Fault::invalid_value("empty buffer range"));
                    }
                    b.check_range(offset, size)?;
                }
                b.committed = true;
                Ok(())
            });
            if committed.is_none() {
                return;
            }
        }
        let mut bindings = self.bindings.borrow_mut();
        bindings.indexed_buffers.insert((target, index), buffer);
        bindings.buffers.insert(target, buffer);
    }

    fn map_inner(
        &self,
        buffer: RawHandle,
        range: Option<(usize, usize)>,
        access: MapAccess,
        flags: MapFlags,
    ) -> *mut u8 {
        self.with(&self.buffers, buffer, |b| {
            if b.mapping.is_some() {
                return Err(Fault::invalid_operation("buffer is already mapped"));
            }
            if !flags.intersects(MapFlags::READ | MapFlags::WRITE) {
                return Err(Fault::invalid_operation("map needs READ or WRITE access"));
            }
            if flags.contains(MapFlags::READ)
                && flags.intersects(
                    MapFlags::INVALIDATE_RANGE
                        | MapFlags::INVALIDATE_BUFFER
                        | MapFlags::UNSYNCHRONIZED,
                )
            {
                return Err(Fault::invalid_operation(
                    "read mappings cannot invalidate or skip synchronization",
                ));
            }
            if flags.contains(MapFlags::FLUSH_EXPLICIT) && !flags.contains(MapFlags::WRITE) {
                return Err(Fault::invalid_operation("explicit flush needs WRITE access"));
            }

            let persistent = flags.intersects(MapFlags::PERSISTENT | MapFlags::COHERENT);
            if b.immutable {
                let required = [
                    (MapFlags::READ, StorageFlags::MAP_READ),
                    (MapFlags::WRITE, StorageFlags::MAP_WRITE),
                    (MapFlags::PERSISTENT, StorageFlags::MAP_PERSISTENT),
                    (MapFlags::COHERENT, StorageFlags::MAP_COHERENT),
                ];
                for (map_flag, storage_flag) in required {
                    if flags.contains(map_flag) && !b.storage_flags.contains(storage_flag) {
                        return Err(Fault::invalid_operation(format!(
                            "storage was not created with {storage_flag:?}"
                        )));
                    }
                }
            } else if persistent {
                return Err(Fault::invalid_operation(
                    "persistent mappings need immutable storage",
                ));
            }

            let (offset, length) = range.unwrap_or((0, b.data.len()));
            if range.is_some() && length == 0 {
                return Err(Fault::invalid_value("empty map range"));
            }
            b.check_range(offset, length)?;

            if flags.contains(MapFlags::INVALIDATE_BUFFER) {
                b.data.fill(0);
            } else if flags.contains(MapFlags::INVALIDATE_RANGE) {
                b.data[offset..offset + length].fill(0);
            }

            b.mapping = Some(Mapping {
                offset,
                length,
                access,
                flags,
            });
            Ok(b.data.as_mut_ptr().wrapping_add(offset))
        })
        .unwrap_or(std::ptr::null_mut())
    }

    fn check_face(target: TextureType, face: Option<CubeFace>) -> Op<()> {
        match (target, face) {
            (TextureType::CubeMap, Some(_)) => Ok(()),
            (TextureType::CubeMap, None) => {
                Err(Fault::invalid_enum("cube map images need a face"))
            }
            (_, None) => Ok(()),
            (other, Some(face)) => Err(Fault::invalid_enum(format!(
                "{other:?} has no face {face:?}"
            ))),
        }
    }

    fn check_extent(target: TextureType, extent: [u32; 3]) -> Op<()> {
        if extent.contains(&0) {
            return Err(Fault::invalid_value(format!("empty extent {extent:?}")));
        }
        if extent.iter().any(|&e| e > MAX_DIMENSION) {
            return Err(Fault::invalid_value(format!(
                "extent {extent:?} exceeds {MAX_DIMENSION}"
            )));
        }
        if matches!(target, TextureType::CubeMap | TextureType::CubeMapArray)
            && extent[0] != extent[1]
        {
            return Err(Fault::invalid_value("cube map faces must be square"));
        }
        if target == TextureType::CubeMapArray && extent[2] % 6 != 0 {
            return Err(Fault::invalid_value(
                "cube map array depth must be a multiple of 6",
            ));
        }
        Ok(())
    }

    fn define_level(
        &self,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: StorageFormat,
        extent: [u32; 3],
        validate: impl FnOnce() -> Op<()>,
    ) {
        self.with(&self.textures, texture, |t| {
            let target = t.target();
            Self::check_face(target, face)?;
            t.check_mutable()?;
            if target.is_multisample() {
                return Err(Fault::invalid_operation(
                    "multisample textures need multisample storage",
                ));
            }
            Self::check_extent(target, extent)?;
            validate()?;

            if level == 0 {
                let levels = t.storage.map_or(1, |s| s.levels);
                t.storage = Some(TextureStorage {
                    format,
                    extent,
                    levels,
                    samples: 0,
                    immutable: false,
                });
                return Ok(());
            }
            let storage = t
                .storage
                .as_mut()
                .ok_or_else(|| Fault::invalid_operation("define level 0 first"))?;
            if storage.format != format {
                return Err(Fault::invalid_operation("mip levels must share one format"));
            }
            storage.levels = storage.levels.max(level + 1);
            Ok(())
        });
    }

    fn attach_image(
        &self,
        framebuffer: RawHandle,
        slot: AttachmentSlot,
        image: Option<AttachedImage>,
    ) {
        if let AttachmentSlot::Color(index) = slot
            && index >= MAX_COLOR_ATTACHMENTS
        {
            self.raise(Fault::invalid_enum(format!(
                "color attachment {index} exceeds {MAX_COLOR_ATTACHMENTS}"
            )));
            return;
        }

        let valid = match image {
            None => true,
            Some(AttachedImage::Texture {
                texture,
                level,
                layer,
            }) => self
                .with(&self.textures, texture, |t| {
                    let target = t.target();
                    if let Some(storage) = t.storage {
                        if level >= storage.levels {
                            return Err(Fault::invalid_value(format!(
                                "level {level} exceeds {} levels",
                                storage.levels
                            )));
                        }
                        if let Some(layer) = layer
                            && layer >= storage.layers(target, level)
                        {
                            return Err(Fault::invalid_value(format!(
                                "layer {layer} out of range"
                            )));
                        }
                    }
                    if layer.is_some() && !target.is_layered() {
                        return Err(Fault::invalid_operation(format!(
                            "{target:?} has no layers"
                        )));
                    }
                    Ok(())
                })
                .is_some(),
            Some(AttachedImage::Renderbuffer(renderbuffer)) => self
                .with(&self.renderbuffers, renderbuffer, |_| Ok(()))
                .is_some(),
        };
        if !valid {
            return;
        }

        self.with(&self.framebuffers, framebuffer, |f| {
            match image {
                Some(image) => {
                    f.attachments.insert(slot, image);
                }
                None => {
                    f.attachments.remove(&slot);
                }
            }
            Ok(())
        });
    }

    fn texture_image_info(
        &self,
        texture: RawHandle,
        level: u32,
        layer: Option<u32>,
    ) -> Option<ImageInfo> {
        let textures = self.textures.borrow();
        let t = textures.get(&texture)?;
        let target = t.target();
        let storage = t.storage?;
        if level >= storage.levels {
            return None;
        }
        if let Some(layer) = layer
            && layer >= storage.layers(target, level)
        {
            return None;
        }
        let [width, height, _] = storage.level_extent(target, level);
        Some(ImageInfo {
            aspect: storage.aspect(),
            width,
            height,
            samples: storage.samples,
            layered: layer.is_none() && target.is_layered(),
        })
    }

    fn renderbuffer_image_info(&self, renderbuffer: RawHandle) -> Option<ImageInfo> {
        let renderbuffers = self.renderbuffers.borrow();
        let storage = renderbuffers.get(&renderbuffer)?.storage?;
        Some(ImageInfo {
            aspect: storage.format.aspect(),
            width: storage.width,
            height: storage.height,
            samples: storage.samples,
            layered: false,
        })
    }

    fn completeness(
        &self,
        attachments: &[(AttachmentSlot, AttachedImage)],
        draw_buffers: &[Option<AttachmentSlot>],
        read_buffer: Option<AttachmentSlot>,
        target: FramebufferTarget,
    ) -> FramebufferStatus {
        if attachments.is_empty() {
            return FramebufferStatus::MissingAttachment;
        }

        let mut images: SmallVec<[ImageInfo; 8]> = SmallVec::new();
        for &(slot, image) in attachments {
            let info = match image {
                AttachedImage::Texture {
                    texture,
                    level,
                    layer,
                } => self.texture_image_info(texture, level, layer),
                AttachedImage::Renderbuffer(renderbuffer) => {
                    self.renderbuffer_image_info(renderbuffer)
                }
            };
            match info {
                Some(info) if info.width > 0 && info.height > 0 && slot.accepts(info.aspect) => {
                    images.push(info);
                }
                _ => return FramebufferStatus::IncompleteAttachment,
            }
        }

        let attached = |slot: AttachmentSlot| attachments.iter().any(|&(s, _)| s == slot);

        if target.includes_draw()
            && draw_buffers
                .iter()
                .flatten()
                .any(|&slot| !attached(slot))
        {
            return FramebufferStatus::IncompleteDrawBuffer;
        }

        if target == FramebufferTarget::Read && read_buffer.is_some_and(|slot| !attached(slot)) {
            return FramebufferStatus::IncompleteReadBuffer;
        }

        let image_at = |slot: AttachmentSlot| {
            attachments
                .iter()
                .find(|&&(s, _)| s == slot)
                .map(|&(_, image)| image)
        };
        if let (Some(depth), Some(stencil)) = (
            image_at(AttachmentSlot::Depth),
            image_at(AttachmentSlot::Stencil),
        ) && depth != stencil
        {
            return FramebufferStatus::Unsupported;
        }

        if images.iter().any(|i| i.samples != images[0].samples) {
            return FramebufferStatus::IncompleteMultisample;
        }

        if images.iter().any(|i| i.layered != images[0].layered) {
            return FramebufferStatus::IncompleteLayerTargets;
        }

        if self.is_enabled(Capability::DepthTest)
            && !attachments.iter().any(|&(slot, _)| slot.provides_depth())
        {
            return FramebufferStatus::MissingAttachment;
        }

        FramebufferStatus::Complete
    }

    /// Deletes shaders flagged for deletion once no program holds them.
    fn collect_shaders(&self, candidates: &[RawHandle]) {
        let programs = self.programs.borrow();
        let mut shaders = self.shaders.borrow_mut();
        for shader in candidates {
            let pending = shaders.get(shader).is_some_and(|s| s.delete_pending);
            let attached = programs.values().any(|p| p.attached.contains(shader));
            if pending && !attached {
                shaders.remove(shader);
            }
        }
    }

    fn check_debug_source(&self, source: DebugSource) -> bool {
        if matches!(source, DebugSource::Application | DebugSource::ThirdParty) {
            return true;
        }
        self.raise(Fault::invalid_enum(format!(
            "{source:?} messages cannot be inserted by the application"
        )));
        false
    }
}

fn is_sampler_state(pname: TextureParameter) -> bool {
    !matches!(
        pname,
        TextureParameter::BaseLevel
            | TextureParameter::MaxLevel
            | TextureParameter::SwizzleRgba
            | TextureParameter::DepthStencilMode
    )
}

fn log_length(log: &str) -> i32 {
    if log.is_empty() { 0 } else { log.len() as i32 + 1 }
}

// ============================================================================
// Driver
// ============================================================================

// SAFETY: mapped pointers point into the buffer's `Vec`, which is neither
// reallocated nor accessed through other entry points while a non-persistent
// mapping is active, and is only freed by deleting the buffer.
unsafe impl Driver for SoftDriver {
    // ------------------------------------------------------------------------
    // Errors & Global State
    // ------------------------------------------------------------------------

    fn get_error(&self) -> Option<ErrorCode> {
        self.error.take()
    }

    fn enable(&self, capability: Capability) {
        self.raster.borrow_mut().capabilities.insert(capability);
    }

    fn disable(&self, capability: Capability) {
        self.raster.borrow_mut().capabilities.remove(&capability);
    }

    fn is_enabled(&self, capability: Capability) -> bool {
        self.raster.borrow().capabilities.contains(&capability)
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            self.raise(Fault::invalid_value("negative viewport size"));
            return;
        }
        self.raster.borrow_mut().viewport = [x, y, width, height];
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            self.raise(Fault::invalid_value("negative scissor size"));
            return;
        }
        self.raster.borrow_mut().scissor = [x, y, width, height];
    }

    fn cull_face(&self, face: Face) {
        self.raster.borrow_mut().cull_face = face;
    }

    fn depth_mask(&self, write: bool) {
        self.raster.borrow_mut().depth_mask = write;
    }

    fn object_label(&self, ty: ObjectType, handle: RawHandle, label: &str) {
        if !self.exists(ty, handle) {
            self.raise(Fault::invalid_value(format!(
                "{handle} is not a {}",
                ty.name()
            )));
            return;
        }
        self.labels
            .borrow_mut()
            .insert((ty, handle), label.to_owned());
    }

    fn get_object_label(&self, ty: ObjectType, handle: RawHandle) -> String {
        self.labels
            .borrow()
            .get(&(ty, handle))
            .cloned()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Debug Output
    // ------------------------------------------------------------------------

    fn debug_message_callback(&self, callback: Option<DebugCallback>) {
        *self.callback.borrow_mut() = callback;
    }

    fn debug_message_control(
        &self,
        source: Option<DebugSource>,
        ty: Option<DebugType>,
        severity: Option<DebugSeverity>,
        ids: &[u32],
        enabled: bool,
    ) {
        if !ids.is_empty() && (source.is_none() || ty.is_none() || severity.is_some()) {
            self.raise(Fault::invalid_operation(
                "message ids need a source and a type and no severity",
            ));
            return;
        }
        self.debug.borrow_mut().rules.push(DebugRule {
            source,
            ty,
            severity,
            ids: ids.to_vec(),
            enabled,
        });
    }

    fn debug_message_insert(
        &self,
        source: DebugSource,
        ty: DebugType,
        id: u32,
        severity: DebugSeverity,
        message: &str,
    ) {
        if !self.check_debug_source(source) {
            return;
        }
        self.emit(&DebugMessage {
            source,
            ty,
            id,
            severity,
            message,
        });
    }

    fn push_debug_group(&self, source: DebugSource, id: u32, message: &str) {
        if !self.check_debug_source(source) {
            return;
        }
        self.debug
            .borrow_mut()
            .groups
            .push((source, id, message.to_owned()));
        self.emit(&DebugMessage {
            source,
            ty: DebugType::PushGroup,
            id,
            severity: DebugSeverity::Notification,
            message,
        });
    }

    fn pop_debug_group(&self) {
        let popped = self.debug.borrow_mut().groups.pop();
        match popped {
            Some((source, id, message)) => self.emit(&DebugMessage {
                source,
                ty: DebugType::PopGroup,
                id,
                severity: DebugSeverity::Notification,
                message: &message,
            }),
            None => self.raise(Fault {
                code: ErrorCode::StackUnderflow,
                message: "debug group stack is empty".to_owned(),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------------

    fn create_buffer(&self) -> RawHandle {
        self.create(&self.buffers, ObjectType::Buffer)
    }

    fn delete_buffer(&self, buffer: RawHandle) {
        if self.delete(&self.buffers, ObjectType::Buffer, buffer) {
            let mut bindings = self.bindings.borrow_mut();
            bindings.buffers.retain(|_, b| *b != buffer);
            bindings.indexed_buffers.retain(|_, b| *b != buffer);
        }
    }

    fn bind_buffer(&self, target: BufferType, buffer: RawHandle) {
        self.record(DriverCall::BindBuffer(target, buffer));
        if buffer != 0
            && self
                .on_object(&self.buffers, buffer, |b| {
                    b.committed = true;
                    Ok(())
                })
                .is_none()
        {
            return;
        }
        self.bindings.borrow_mut().buffers.insert(target, buffer);
    }

    fn bind_buffer_base(&self, target: BufferType, index: u32, buffer: RawHandle) {
        self.bind_indexed(target, index, buffer, None);
    }

    fn bind_buffer_range(
        &self,
        target: BufferType,
        index: u32,
        buffer: RawHandle,
        offset: usize,
        size: usize,
    ) {
        self.bind_indexed(target, index, buffer, Some((offset, size)));
    }

    fn buffer_data(&self, buffer: RawHandle, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        self.with(&self.buffers, buffer, |b| {
            b.check_reallocatable()?;
            b.data = match data {
                Some(data) if data.len() < size => {
                    return Err(Fault::invalid_value(format!(
                        "{} bytes of data for a {size} byte buffer",
                        data.len()
                    )));
                }
                Some(data) => data[..size].to_vec(),
                None => vec![0; size],
            };
            b.usage = usage;
            Ok(())
        });
    }

    fn buffer_storage(
        &self,
        buffer: RawHandle,
        size: usize,
        data: Option<&[u8]>,
        flags: StorageFlags,
    ) {
        self.with(&self.buffers, buffer, |b| {
            b.check_reallocatable()?;
            if size == 0 {
                return Err(Fault::invalid_value("immutable storage cannot be empty"));
            }
            if flags.contains(StorageFlags::MAP_PERSISTENT)
                && !flags.intersects(StorageFlags::MAP_READ | StorageFlags::MAP_WRITE)
            {
                return Err(Fault::invalid_value(
                    "MAP_PERSISTENT needs MAP_READ or MAP_WRITE",
                ));
            }
            if flags.contains(StorageFlags::MAP_COHERENT)
                && !flags.contains(StorageFlags::MAP_PERSISTENT)
            {
                return Err(Fault::invalid_value("MAP_COHERENT needs MAP_PERSISTENT"));
            }
            b.data = match data {
                Some(data) if data.len() < size => {
                    return Err(Fault::invalid_value(format!(
                        "{} bytes of data for a {size} byte buffer",
                        data.len()
                    )));
                }
                Some(data) => data[..size].to_vec(),
                None => vec![0; size],
            };
            b.immutable = true;
            b.storage_flags = flags;
            Ok(())
        });
    }

    fn buffer_sub_data(&self, buffer: RawHandle, offset: usize, data: &[u8]) {
        self.with(&self.buffers, buffer, |b| {
            if b.immutable && !b.storage_flags.contains(StorageFlags::DYNAMIC_STORAGE) {
                return Err(Fault::invalid_operation(
                    "immutable storage was created without DYNAMIC_STORAGE",
                ));
            }
            b.check_unmapped()?;
            b.check_range(offset, data.len())?;
            b.data[offset..offset + data.len()].copy_from_slice(data);
            Ok(())
        });
    }

    fn get_buffer_sub_data(&self, buffer: RawHandle, offset: usize, out: &mut [u8]) {
        self.with(&self.buffers, buffer, |b| {
            b.check_unmapped()?;
            b.check_range(offset, out.len())?;
            out.copy_from_slice(&b.data[offset..offset + out.len()]);
            Ok(())
        });
    }

    fn copy_buffer_sub_data(
        &self,
        read: RawHandle,
        write: RawHandle,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    ) {
        self.record(DriverCall::CopyBufferSubData {
            read,
            write,
            read_offset,
            write_offset,
            size,
        });

        let Some(bytes) = self.with(&self.buffers, read, |b| {
            b.check_unmapped()?;
            b.check_range(read_offset, size)?;
            Ok(b.data[read_offset..read_offset + size].to_vec())
        }) else {
            return;
        };

        self.with(&self.buffers, write, |b| {
            b.check_unmapped()?;
            b.check_range(write_offset, size)?;
            if read == write
                && read_offset < write_offset + size
                && write_offset < read_offset + size
            {
                return Err(Fault::invalid_value(
                    "source and destination ranges overlap",
                ));
            }
            b.data[write_offset..write_offset + size].copy_from_slice(&bytes);
            Ok(())
        });
    }

    fn map_buffer(&self, buffer: RawHandle, access: MapAccess) -> *mut u8 {
        self.map_inner(buffer, None, access, access.flags())
    }

    fn map_buffer_range(
        &self,
        buffer: RawHandle,
        offset: usize,
        length: usize,
        flags: MapFlags,
    ) -> *mut u8 {
        let access = match (flags.contains(MapFlags::READ), flags.contains(MapFlags::WRITE)) {
            (true, false) => MapAccess::ReadOnly,
            (false, true) => MapAccess::WriteOnly,
            _ => MapAccess::ReadWrite,
        };
        self.map_inner(buffer, Some((offset, length)), access, flags)
    }

    fn unmap_buffer(&self, buffer: RawHandle) -> bool {
        self.with(&self.buffers, buffer, |b| match b.mapping.take() {
            Some(_) => Ok(true),
            None => Err(Fault::invalid_operation("buffer is not mapped")),
        })
        .unwrap_or(false)
    }

    fn flush_mapped_buffer_range(&self, buffer: RawHandle, offset: usize, length: usize) {
        self.with(&self.buffers, buffer, |b| {
            let Some(mapping) = b.mapping else {
                return Err(Fault::invalid_operation("buffer is not mapped"));
            };
            if !mapping.flags.contains(MapFlags::FLUSH_EXPLICIT) {
                return Err(Fault::invalid_operation(
                    "mapping was not created with FLUSH_EXPLICIT",
                ));
            }
            if offset.checked_add(length).is_none_or(|end| end > mapping.length) {
                return Err(Fault::invalid_value("flush range exceeds the mapping"));
            }
            Ok(())
        });
    }

    fn invalidate_buffer_data(&self, buffer: RawHandle) {
        self.with(&self.buffers, buffer, |b| {
            b.check_unmapped()?;
            b.data.fill(0);
            Ok(())
        });
    }

    fn invalidate_buffer_sub_data(&self, buffer: RawHandle, offset: usize, length: usize) {
        self.with(&self.buffers, buffer, |b| {
            b.check_unmapped()?;
            b.check_range(offset, length)?;
            b.data[offset..offset + length].fill(0);
            Ok(())
        });
    }

    fn get_buffer_parameter(&self, buffer: RawHandle, pname: BufferParameter) -> i64 {
        self.with(&self.buffers, buffer, |b| {
            let mapping = b.mapping;
            Ok(match pname {
                BufferParameter::Size => b.data.len() as i64,
                BufferParameter::Usage => i64::from(b.usage.as_raw()),
                BufferParameter::Access => i64::from(
                    mapping.map_or(MapAccess::ReadWrite, |m| m.access).as_raw(),
                ),
                BufferParameter::Mapped => i64::from(mapping.is_some()),
                BufferParameter::AccessFlags => i64::from(mapping.map_or(0, |m| m.flags.bits())),
                BufferParameter::ImmutableStorage => i64::from(b.immutable),
                BufferParameter::StorageFlags => i64::from(b.storage_flags.bits()),
                BufferParameter::MapOffset => mapping.map_or(0, |m| m.offset as i64),
                BufferParameter::MapLength => mapping.map_or(0, |m| m.length as i64),
            })
        })
        .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------------

    fn create_texture(&self) -> RawHandle {
        self.create(&self.textures, ObjectType::Texture)
    }

    fn delete_texture(&self, texture: RawHandle) {
        if self.delete(&self.textures, ObjectType::Texture, texture) {
            let mut bindings = self.bindings.borrow_mut();
            bindings.textures.retain(|_, t| *t != texture);
            bindings.texture_units.retain(|_, t| *t != texture);
        }
    }

    fn bind_texture(&self, target: TextureType, texture: RawHandle) {
        self.record(DriverCall::BindTexture(target, texture));
        if texture != 0
            && self
                .on_object(&self.textures, texture, |t| match t.target {
                    None => {
                        t.target = Some(target);
                        Ok(())
                    }
                    Some(existing) if existing == target => Ok(()),
                    Some(existing) => Err(Fault::invalid_operation(format!(
                        "texture {texture} is a {existing:?}, not a {target:?}"
                    ))),
                })
                .is_none()
        {
            return;
        }
        let mut bindings = self.bindings.borrow_mut();
        let unit = bindings.active_unit;
        bindings.textures.insert((unit, target), texture);
    }

    fn active_texture(&self, unit: u32) {
        if unit >= MAX_TEXTURE_UNITS {
            self.raise(Fault::invalid_enum(format!(
                "texture unit {unit} exceeds {MAX_TEXTURE_UNITS}"
            )));
            return;
        }
        self.bindings.borrow_mut().active_unit = unit;
    }

    fn bind_texture_unit(&self, unit: u32, texture: RawHandle) {
        self.record(DriverCall::BindTextureUnit { unit, texture });
        if !self.check_texture_unit(unit) {
            return;
        }
        let mut target = None;
        if texture != 0 {
            target = self.with(&self.textures, texture, |t| Ok(t.target()));
            if target.is_none() {
                return;
            }
        }
        let mut bindings = self.bindings.borrow_mut();
        bindings.texture_units.insert(unit, texture);
        if let Some(target) = target {
            bindings.textures.insert((unit, target), texture);
        } else {
            bindings.textures.retain(|&(u, _), _| u != unit);
        }
    }

    fn texture_storage(
        &self,
        texture: RawHandle,
        levels: u32,
        format: InternalFormat,
        extent: [u32; 3],
    ) {
        self.with(&self.textures, texture, |t| {
            let target = t.target();
            if target.is_multisample() {
                return Err(Fault::invalid_operation(
                    "multisample textures need multisample storage",
                ));
            }
            t.check_mutable()?;
            Self::check_extent(target, extent)?;
            if levels == 0 {
                return Err(Fault::invalid_value("texture storage needs at least one level"));
            }
            let max = full_mip_chain(target, extent);
            if levels > max {
                return Err(Fault::invalid_operation(format!(
                    "{levels} levels exceed the {max} level mip chain of {extent:?}"
                )));
            }
            t.storage = Some(TextureStorage {
                format: StorageFormat::Uncompressed(format),
                extent,
                levels,
                samples: 0,
                immutable: true,
            });
            Ok(())
        });
    }

    fn texture_storage_multisample(
        &self,
        texture: RawHandle,
        samples: u32,
        format: InternalFormat,
        extent: [u32; 3],
        _fixed_sample_locations: bool,
    ) {
        self.with(&self.textures, texture, |t| {
            let target = t.target();
            if !target.is_multisample() {
                return Err(Fault::invalid_operation(format!(
                    "{target:?} cannot have multisample storage"
                )));
            }
            if samples == 0 || samples > MAX_SAMPLES {
                return Err(Fault::invalid_value(format!(
                    "{samples} samples outside 1..={MAX_SAMPLES}"
                )));
            }
            t.check_mutable()?;
            Self::check_extent(target, extent)?;
            t.storage = Some(TextureStorage {
                format: StorageFormat::Uncompressed(format),
                extent,
                levels: 1,
                samples,
                immutable: true,
            });
            Ok(())
        });
    }

    fn texture_image(
        &self,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: InternalFormat,
        extent: [u32; 3],
        pixels: Option<PixelData<'_>>,
    ) {
        self.define_level(
            texture,
            face,
            level,
            StorageFormat::Uncompressed(format),
            extent,
            || match pixels {
                Some(p) if p.bytes.len() < p.required_len(extent) => Err(Fault::invalid_value(
                    format!(
                        "{} bytes of pixel data, {} needed",
                        p.bytes.len(),
                        p.required_len(extent)
                    ),
                )),
                _ => Ok(()),
            },
        );
    }

    fn compressed_texture_image(
        &self,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: CompressedFormat,
        extent: [u32; 3],
        data: &[u8],
    ) {
        let target = self.textures.borrow().get(&texture).map(|t| t.target());
        if let Some(
            TextureType::Tex1D
            | TextureType::Tex3D
            | TextureType::Rectangle
            | TextureType::Tex2DMultisample
            | TextureType::Tex2DMultisampleArray,
        ) = target
        {
            self.raise(Fault::invalid_enum(format!(
                "{target:?} cannot hold compressed images"
            )));
            return;
        }

        let blocks = extent[0].div_ceil(4) as usize * extent[1].div_ceil(4) as usize;
        let expected = blocks * extent[2] as usize * format.block_bytes();
        self.define_level(
            texture,
            face,
            level,
            StorageFormat::Compressed(format),
            extent,
            || {
                if data.len() == expected {
                    Ok(())
                } else {
                    Err(Fault::invalid_value(format!(
                        "{} bytes of compressed data, {expected} expected",
                        data.len()
                    )))
                }
            },
        );
    }

    fn texture_sub_image(
        &self,
        texture: RawHandle,
        level: u32,
        offset: [u32; 3],
        extent: [u32; 3],
        pixels: PixelData<'_>,
    ) {
        self.record(DriverCall::TextureSubImage {
            texture,
            level,
            offset,
            extent,
        });
        self.with(&self.textures, texture, |t| {
            let target = t.target();
            let storage = t.storage()?;
            if matches!(storage.format, StorageFormat::Compressed(_)) {
                return Err(Fault::invalid_operation(
                    "compressed textures need compressed uploads",
                ));
            }
            if target.is_multisample() {
                return Err(Fault::invalid_operation(
                    "multisample textures cannot be uploaded to",
                ));
            }
            if level >= storage.levels {
                return Err(Fault::invalid_value(format!(
                    "level {level} exceeds {} levels",
                    storage.levels
                )));
            }
            let mut bounds = storage.level_extent(target, level);
            if target == TextureType::CubeMap {
                bounds[2] = 6;
            }
            let inside = (0..3).all(|i| {
                offset[i]
                    .checked_add(extent[i])
                    .is_some_and(|end| end <= bounds[i])
            });
            if !inside {
                return Err(Fault::invalid_value(format!(
                    "region {offset:?}+{extent:?} exceeds level {level} of size {bounds:?}"
                )));
            }
            let required = pixels.required_len(extent);
            if pixels.bytes.len() < required {
                return Err(Fault::invalid_value(format!(
                    "{} bytes of pixel data, {required} needed",
                    pixels.bytes.len()
                )));
            }
            Ok(())
        });
    }

    fn generate_texture_mipmap(&self, texture: RawHandle) {
        self.with(&self.textures, texture, |t| {
            let target = t.target();
            if target.is_multisample() || target == TextureType::Rectangle {
                return Err(Fault::invalid_operation(format!(
                    "{target:?} textures have no mipmaps"
                )));
            }
            let storage = t
                .storage
                .as_mut()
                .ok_or_else(|| Fault::invalid_operation("texture has no storage"))?;
            if !storage.immutable {
                storage.levels = full_mip_chain(target, storage.extent);
            }
            Ok(())
        });
    }

    fn texture_parameter(&self, texture: RawHandle, pname: TextureParameter, value: ParamValue) {
        self.record(DriverCall::TextureParameter {
            texture,
            pname,
            value,
        });
        self.with(&self.textures, texture, |t| {
            if t.target().is_multisample() && is_sampler_state(pname) {
                return Err(Fault::invalid_enum(format!(
                    "multisample textures have no {pname:?}"
                )));
            }
            t.sampling.set(pname, value, MAX_ANISOTROPY)
        });
    }

    fn get_texture_parameter(&self, texture: RawHandle, pname: TextureParameter) -> ParamValue {
        self.with(&self.textures, texture, |t| Ok(t.sampling.get(pname)))
            .unwrap_or(ParamValue::Int(0))
    }

    fn max_texture_anisotropy(&self) -> f32 {
        MAX_ANISOTROPY
    }

    // ------------------------------------------------------------------------
    // Samplers
    // ------------------------------------------------------------------------

    fn create_sampler(&self) -> RawHandle {
        self.create(&self.samplers, ObjectType::Sampler)
    }

    fn delete_sampler(&self, sampler: RawHandle) {
        if self.delete(&self.samplers, ObjectType::Sampler, sampler) {
            self.bindings
                .borrow_mut()
                .samplers
                .retain(|_, s| *s != sampler);
        }
    }

    fn bind_sampler(&self, unit: u32, sampler: RawHandle) {
        self.record(DriverCall::BindSampler { unit, sampler });
        if !self.check_texture_unit(unit) {
            return;
        }
        if sampler != 0 && self.with(&self.samplers, sampler, |_| Ok(())).is_none() {
            return;
        }
        self.bindings.borrow_mut().samplers.insert(unit, sampler);
    }

    fn sampler_parameter(&self, sampler: RawHandle, pname: TextureParameter, value: ParamValue) {
        self.record(DriverCall::SamplerParameter {
            sampler,
            pname,
            value,
        });
        self.with(&self.samplers, sampler, |s| {
            if !is_sampler_state(pname) {
                return Err(Fault::invalid_enum(format!(
                    "{pname:?} is not sampler state"
                )));
            }
            s.sampling.set(pname, value, MAX_ANISOTROPY)
        });
    }

    fn get_sampler_parameter(&self, sampler: RawHandle, pname: TextureParameter) -> ParamValue {
        self.with(&self.samplers, sampler, |s| Ok(s.sampling.get(pname)))
            .unwrap_or(ParamValue::Int(0))
    }

    // ------------------------------------------------------------------------
    // Framebuffers & Renderbuffers
    // ------------------------------------------------------------------------

    fn create_framebuffer(&self) -> RawHandle {
        self.create(&self.framebuffers, ObjectType::Framebuffer)
    }

    fn delete_framebuffer(&self, framebuffer: RawHandle) {
        if self.delete(&self.framebuffers, ObjectType::Framebuffer, framebuffer) {
            let mut bindings = self.bindings.borrow_mut();
            if bindings.draw_framebuffer == framebuffer {
                bindings.draw_framebuffer = 0;
            }
            if bindings.read_framebuffer == framebuffer {
                bindings.read_framebuffer = 0;
            }
        }
    }

    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: RawHandle) {
        self.record(DriverCall::BindFramebuffer(target, framebuffer));
        if framebuffer != 0
            && self
                .on_object(&self.framebuffers, framebuffer, |f| {
                    f.committed = true;
                    Ok(())
                })
                .is_none()
        {
            return;
        }
        let mut bindings = self.bindings.borrow_mut();
        if target.includes_draw() {
            bindings.draw_framebuffer = framebuffer;
        }
        if target.includes_read() {
            bindings.read_framebuffer = framebuffer;
        }
    }

    fn framebuffer_texture(
        &self,
        framebuffer: RawHandle,
        slot: AttachmentSlot,
        texture: RawHandle,
        level: u32,
    ) {
        let image = (texture != 0).then_some(AttachedImage::Texture {
            texture,
            level,
            layer: None,
        });
        self.attach_image(framebuffer, slot, image);
    }

    fn framebuffer_texture_layer(
        &self,
        framebuffer: RawHandle,
        slot: AttachmentSlot,
        texture: RawHandle,
        level: u32,
        layer: u32,
    ) {
        let image = (texture != 0).then_some(AttachedImage::Texture {
            texture,
            level,
            layer: Some(layer),
        });
        self.attach_image(framebuffer, slot, image);
    }

    fn framebuffer_renderbuffer(
        &self,
        framebuffer: RawHandle,
        slot: AttachmentSlot,
        renderbuffer: RawHandle,
    ) {
        let image = (renderbuffer != 0).then_some(AttachedImage::Renderbuffer(renderbuffer));
        self.attach_image(framebuffer, slot, image);
    }

    fn framebuffer_draw_buffers(&self, framebuffer: RawHandle, slots: &[Option<AttachmentSlot>]) {
        self.with(&self.framebuffers, framebuffer, |f| {
            if slots.len() > usize::from(MAX_COLOR_ATTACHMENTS) {
                return Err(Fault::invalid_value(format!(
                    "{} draw buffers exceed {MAX_COLOR_ATTACHMENTS}",
                    slots.len()
                )));
            }
            let colors: SmallVec<[AttachmentSlot; 8]> = slots.iter().flatten().copied().collect();
            if colors.iter().any(|slot| !slot.is_color()) {
                return Err(Fault::invalid_enum("draw buffers must be color attachments"));
            }
            for (i, slot) in colors.iter().enumerate() {
                if colors[..i].contains(slot) {
                    return Err(Fault::invalid_operation(format!(
                        "{slot:?} listed twice in draw buffers"
                    )));
                }
            }
            f.draw_buffers = slots.iter().copied().collect();
            Ok(())
        });
    }

    fn framebuffer_read_buffer(&self, framebuffer: RawHandle, slot: Option<AttachmentSlot>) {
        self.with(&self.framebuffers, framebuffer, |f| {
            if slot.is_some_and(|s| !s.is_color()) {
                return Err(Fault::invalid_enum("read buffer must be a color attachment"));
            }
            f.read_buffer = slot;
            Ok(())
        });
    }

    fn check_framebuffer_status(
        &self,
        framebuffer: RawHandle,
        target: FramebufferTarget,
    ) -> FramebufferStatus {
        if framebuffer == 0 {
            return FramebufferStatus::Complete;
        }
        let snapshot = self.with(&self.framebuffers, framebuffer, |f| {
            let mut attachments: SmallVec<[(AttachmentSlot, AttachedImage); 8]> =
                f.attachments.iter().map(|(&s, &i)| (s, i)).collect();
            attachments.sort_by_key(|&(slot, _)| slot);
            Ok((attachments, f.draw_buffers.clone(), f.read_buffer))
        });
        match snapshot {
            Some((attachments, draw_buffers, read_buffer)) => {
                self.completeness(&attachments, &draw_buffers, read_buffer, target)
            }
            None => FramebufferStatus::Unsupported,
        }
    }

    fn create_renderbuffer(&self) -> RawHandle {
        self.create(&self.renderbuffers, ObjectType::Renderbuffer)
    }

    fn delete_renderbuffer(&self, renderbuffer: RawHandle) {
        if self.delete(&self.renderbuffers, ObjectType::Renderbuffer, renderbuffer) {
            let mut bindings = self.bindings.borrow_mut();
            if bindings.renderbuffer == renderbuffer {
                bindings.renderbuffer = 0;
            }
        }
    }

    fn bind_renderbuffer(&self, renderbuffer: RawHandle) {
        self.record(DriverCall::BindRenderbuffer(renderbuffer));
        if renderbuffer != 0
            && self
                .on_object(&self.renderbuffers, renderbuffer, |r| {
                    r.committed = true;
                    Ok(())
                })
                .is_none()
        {
            return;
        }
        self.bindings.borrow_mut().renderbuffer = renderbuffer;
    }

    fn renderbuffer_storage(
        &self,
        renderbuffer: RawHandle,
        format: InternalFormat,
        width: u32,
        height: u32,
    ) {
        self.renderbuffer_storage_multisample(renderbuffer, 0, format, width, height);
    }

    fn renderbuffer_storage_multisample(
        &self,
        renderbuffer: RawHandle,
        samples: u32,
        format: InternalFormat,
        width: u32,
        height: u32,
    ) {
        self.with(&self.renderbuffers, renderbuffer, |r| {
            if width > MAX_DIMENSION || height > MAX_DIMENSION {
                return Err(Fault::invalid_value(format!(
                    "{width}x{height} exceeds {MAX_DIMENSION}"
                )));
            }
            if samples > MAX_SAMPLES {
                return Err(Fault::invalid_operation(format!(
                    "{samples} samples exceed {MAX_SAMPLES}"
                )));
            }
            r.storage = Some(RenderbufferStorage {
                format,
                width,
                height,
                samples,
            });
            Ok(())
        });
    }

    // ------------------------------------------------------------------------
    // Vertex Arrays
    // ------------------------------------------------------------------------

    fn create_vertex_array(&self) -> RawHandle {
        self.create(&self.vertex_arrays, ObjectType::VertexArray)
    }

    fn delete_vertex_array(&self, vao: RawHandle) {
        if self.delete(&self.vertex_arrays, ObjectType::VertexArray, vao) {
            let mut bindings = self.bindings.borrow_mut();
            if bindings.vertex_array == vao {
                bindings.vertex_array = 0;
            }
        }
    }

    fn bind_vertex_array(&self, vao: RawHandle) {
        self.record(DriverCall::BindVertexArray(vao));
        if vao != 0
            && self
                .on_object(&self.vertex_arrays, vao, |v| {
                    v.committed = true;
                    Ok(())
                })
                .is_none()
        {
            return;
        }
        self.bindings.borrow_mut().vertex_array = vao;
    }

    fn vertex_array_element_buffer(&self, vao: RawHandle, buffer: RawHandle) {
        if !self.check_buffer_name(buffer) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            v.element_buffer = buffer;
            Ok(())
        });
    }

    fn vertex_array_vertex_buffer(
        &self,
        vao: RawHandle,
        binding: u32,
        buffer: RawHandle,
        offset: usize,
        stride: u32,
    ) {
        if !self.check_vertex_binding(binding) || !self.check_buffer_name(buffer) {
            return;
        }
        if stride > MAX_VERTEX_STRIDE {
            self.raise(Fault::invalid_value(format!(
                "stride {stride} exceeds {MAX_VERTEX_STRIDE}"
            )));
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            let entry = v.bindings.entry(binding).or_default();
            entry.buffer = buffer;
            entry.offset = offset;
            entry.stride = stride;
            Ok(())
        });
    }

    fn vertex_array_binding_divisor(&self, vao: RawHandle, binding: u32, divisor: u32) {
        if !self.check_vertex_binding(binding) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            v.bindings.entry(binding).or_default().divisor = divisor;
            Ok(())
        });
    }

    fn vertex_array_attrib_format(
        &self,
        vao: RawHandle,
        location: u32,
        components: u32,
        ty: ComponentType,
        normalized: bool,
        relative_offset: u32,
    ) {
        self.record(DriverCall::AttribFormat {
            location,
            components,
            ty,
            normalized,
        });
        if !self.check_attrib_location(location) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            check_format(components, relative_offset)?;
            let a = v.attrib(location);
            a.components = components;
            a.ty = ty;
            a.normalized = normalized;
            a.integer = false;
            a.long = false;
            a.relative_offset = relative_offset;
            Ok(())
        });
    }

    fn vertex_array_attrib_i_format(
        &self,
        vao: RawHandle,
        location: u32,
        components: u32,
        ty: ComponentType,
        relative_offset: u32,
    ) {
        self.record(DriverCall::AttribIFormat {
            location,
            components,
            ty,
        });
        if !self.check_attrib_location(location) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            check_format(components, relative_offset)?;
            if ty.category() != ComponentCategory::Integer {
                return Err(Fault::invalid_enum(format!(
                    "{ty:?} is not an integer type"
                )));
            }
            let a = v.attrib(location);
            a.components = components;
            a.ty = ty;
            a.normalized = false;
            a.integer = true;
            a.long = false;
            a.relative_offset = relative_offset;
            Ok(())
        });
    }

    fn vertex_array_attrib_l_format(
        &self,
        vao: RawHandle,
        location: u32,
        components: u32,
        ty: ComponentType,
        relative_offset: u32,
    ) {
        self.record(DriverCall::AttribLFormat {
            location,
            components,
            ty,
        });
        if !self.check_attrib_location(location) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            check_format(components, relative_offset)?;
            if ty != ComponentType::F64 {
                return Err(Fault::invalid_enum(format!("{ty:?} is not a double type")));
            }
            let a = v.attrib(location);
            a.components = components;
            a.ty = ty;
            a.normalized = false;
            a.integer = false;
            a.long = true;
            a.relative_offset = relative_offset;
            Ok(())
        });
    }

    fn vertex_array_attrib_binding(&self, vao: RawHandle, location: u32, binding: u32) {
        self.record(DriverCall::AttribBinding { location, binding });
        if !self.check_attrib_location(location) || !self.check_vertex_binding(binding) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            v.attrib(location).binding = binding;
            Ok(())
        });
    }

    fn enable_vertex_array_attrib(&self, vao: RawHandle, location: u32) {
        self.record(DriverCall::EnableAttrib(location));
        if !self.check_attrib_location(location) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            v.attrib(location).enabled = true;
            Ok(())
        });
    }

    fn disable_vertex_array_attrib(&self, vao: RawHandle, location: u32) {
        self.record(DriverCall::DisableAttrib(location));
        if !self.check_attrib_location(location) {
            return;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            v.attrib(location).enabled = false;
            Ok(())
        });
    }

    fn get_vertex_array_attrib(
        &self,
        vao: RawHandle,
        location: u32,
        pname: VertexAttribParameter,
    ) -> i64 {
        if !self.check_attrib_location(location) {
            return 0;
        }
        self.with(&self.vertex_arrays, vao, |v| {
            let a = v.attrib_state(location);
            let binding = v.bindings.get(&a.binding).copied().unwrap_or_default();
            Ok(match pname {
                VertexAttribParameter::Enabled => i64::from(a.enabled),
                VertexAttribParameter::Size => i64::from(a.components),
                VertexAttribParameter::Stride => i64::from(binding.stride),
                VertexAttribParameter::Type => i64::from(a.ty.as_raw()),
                VertexAttribParameter::Normalized => i64::from(a.normalized),
                VertexAttribParameter::Integer => i64::from(a.integer),
                VertexAttribParameter::Long => i64::from(a.long),
                VertexAttribParameter::Divisor => i64::from(binding.divisor),
                VertexAttribParameter::Binding => i64::from(a.binding),
                VertexAttribParameter::RelativeOffset => i64::from(a.relative_offset),
            })
        })
        .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Shaders
    // ------------------------------------------------------------------------

    fn create_shader(&self, kind: ShaderKind) -> RawHandle {
        let name = self.gen_name();
        self.shaders
            .borrow_mut()
            .insert(name, super::objects::ShaderObject::new(kind));
        self.record(DriverCall::Create(ObjectType::Shader, name));
        name
    }

    fn delete_shader(&self, shader: RawHandle) {
        if shader == 0 {
            self.record(DriverCall::Delete(ObjectType::Shader, shader));
            return;
        }
        let attached = self
            .programs
            .borrow()
            .values()
            .any(|p| p.attached.contains(&shader));
        if attached {
            self.record(DriverCall::Delete(ObjectType::Shader, shader));
            self.on_object(&self.shaders, shader, |s| {
                s.delete_pending = true;
                Ok(())
            });
        } else {
            self.delete(&self.shaders, ObjectType::Shader, shader);
        }
    }

    fn shader_source(&self, shader: RawHandle, sources: &[&str]) {
        self.with(&self.shaders, shader, |s| {
            s.source = sources.concat();
            s.spirv = None;
            Ok(())
        });
    }

    fn compile_shader(&self, shader: RawHandle) {
        self.with(&self.shaders, shader, |s| {
            if s.spirv.is_some() {
                return Err(Fault::invalid_operation(
                    "SPIR-V shaders are specialized, not compiled",
                ));
            }
            match linker::compile_glsl(&s.source) {
                Ok(decls) => {
                    s.compiled = true;
                    s.log.clear();
                    s.decls = decls;
                }
                Err(log) => {
                    s.compiled = false;
                    s.log = log;
                    s.decls = Default::default();
                }
            }
            Ok(())
        });
    }

    fn shader_binary_spirv(&self, shader: RawHandle, binary: &[u8]) {
        self.with(&self.shaders, shader, |s| {
            if !linker::is_spirv(binary) {
                return Err(Fault::invalid_value("binary is not a SPIR-V module"));
            }
            s.spirv = Some(binary.to_vec());
            s.source.clear();
            s.compiled = false;
            s.log.clear();
            s.decls = Default::default();
            Ok(())
        });
    }

    fn specialize_shader(&self, shader: RawHandle, entry_point: &str, _constants: &[(u32, u32)]) {
        self.with(&self.shaders, shader, |s| {
            let Some(module) = &s.spirv else {
                return Err(Fault::invalid_operation("shader has no SPIR-V module"));
            };
            s.compiled = linker::has_entry_point(module, entry_point);
            s.log = if s.compiled {
                String::new()
            } else {
                format!("error: entry point `{entry_point}` not found in module")
            };
            Ok(())
        });
    }

    fn get_shader_parameter(&self, shader: RawHandle, pname: ShaderParameter) -> i32 {
        self.with(&self.shaders, shader, |s| {
            Ok(match pname {
                ShaderParameter::ShaderType => s.kind.as_raw() as i32,
                ShaderParameter::DeleteStatus => i32::from(s.delete_pending),
                ShaderParameter::CompileStatus => i32::from(s.compiled),
                ShaderParameter::InfoLogLength => log_length(&s.log),
                ShaderParameter::SourceLength => log_length(&s.source),
                ShaderParameter::SpirvBinary => i32::from(s.spirv.is_some()),
            })
        })
        .unwrap_or_default()
    }

    fn get_shader_info_log(&self, shader: RawHandle) -> String {
        self.with(&self.shaders, shader, |s| Ok(s.log.clone()))
            .unwrap_or_default()
    }

    fn get_shader_source(&self, shader: RawHandle) -> String {
        self.with(&self.shaders, shader, |s| Ok(s.source.clone()))
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------------

    fn create_program(&self) -> RawHandle {
        self.create(&self.programs, ObjectType::Program)
    }

    fn delete_program(&self, program: RawHandle) {
        let attached = self
            .programs
            .borrow()
            .get(&program)
            .map(|p| p.attached.clone())
            .unwrap_or_default();
        if self.delete(&self.programs, ObjectType::Program, program) {
            let mut bindings = self.bindings.borrow_mut();
            if bindings.program == program {
                bindings.program = 0;
            }
            drop(bindings);
            self.collect_shaders(&attached);
        }
    }

    fn attach_shader(&self, program: RawHandle, shader: RawHandle) {
        self.record(DriverCall::AttachShader { program, shader });
        if self.with(&self.shaders, shader, |_| Ok(())).is_none() {
            return;
        }
        self.with(&self.programs, program, |p| {
            if p.attached.contains(&shader) {
                return Err(Fault::invalid_operation(format!(
                    "shader {shader} is already attached"
                )));
            }
            p.attached.push(shader);
            Ok(())
        });
    }

    fn detach_shader(&self, program: RawHandle, shader: RawHandle) {
        self.record(DriverCall::DetachShader { program, shader });
        let detached = self.with(&self.programs, program, |p| {
            let index = p
                .attached
                .iter()
                .position(|&s| s == shader)
                .ok_or_else(|| {
                    Fault::invalid_operation(format!("shader {shader} is not attached"))
                })?;
            p.attached.remove(index);
            Ok(())
        });
        if detached.is_some() {
            self.collect_shaders(&[shader]);
        }
    }

    fn link_program(&self, program: RawHandle) {
        self.record(DriverCall::LinkProgram(program));
        let Some(attached) = self.with(&self.programs, program, |p| Ok(p.attached.clone())) else {
            return;
        };

        let result = {
            let shaders = self.shaders.borrow();
            let stages: Vec<Stage<'_>> = attached
                .iter()
                .filter_map(|handle| {
                    shaders.get(handle).map(|s| Stage {
                        handle: *handle,
                        kind: s.kind,
                        compiled: s.compiled,
                        decls: &s.decls,
                    })
                })
                .collect();
            linker::link(&stages)
        };

        self.with(&self.programs, program, |p| {
            p.validated = false;
            p.uniform_values.clear();
            p.block_bindings.clear();
            match result {
                Ok(interface) => {
                    p.linked = true;
                    p.log.clear();
                    p.interface = interface;
                }
                Err(log) => {
                    p.linked = false;
                    p.log = log;
                    p.interface = Default::default();
                }
            }
            Ok(())
        });
    }

    fn validate_program(&self, program: RawHandle) {
        self.record(DriverCall::ValidateProgram(program));
        self.with(&self.programs, program, |p| {
            p.validated = p.linked;
            if p.linked {
                p.log.clear();
            } else if p.log.is_empty() {
                p.log = "error: program is not linked".to_owned();
            }
            Ok(())
        });
    }

    fn use_program(&self, program: RawHandle) {
        self.record(DriverCall::UseProgram(program));
        if program != 0 && self.with(&self.programs, program, |p| p.check_linked()).is_none() {
            return;
        }
        self.bindings.borrow_mut().program = program;
    }

    fn program_parameter(&self, program: RawHandle, pname: ProgramParameter, value: bool) {
        self.with(&self.programs, program, |p| {
            match pname {
                ProgramParameter::BinaryRetrievableHint => p.binary_retrievable = value,
                ProgramParameter::Separable => p.separable = value,
                other => {
                    return Err(Fault::invalid_enum(format!("{other:?} is read-only")));
                }
            }
            Ok(())
        });
    }

    fn get_program_parameter(&self, program: RawHandle, pname: ProgramParameter) -> i32 {
        self.with(&self.programs, program, |p| {
            let longest = |vars: &[super::glsl::Variable]| {
                vars.iter().map(|v| v.name.len() as i32 + 1).max().unwrap_or(0)
            };
            Ok(match pname {
                ProgramParameter::DeleteStatus => 0,
                ProgramParameter::LinkStatus => i32::from(p.linked),
                ProgramParameter::ValidateStatus => i32::from(p.validated),
                ProgramParameter::InfoLogLength => log_length(&p.log),
                ProgramParameter::AttachedShaders => p.attached.len() as i32,
                ProgramParameter::ActiveUniforms => p.interface.uniforms.len() as i32,
                ProgramParameter::ActiveUniformMaxLength => {
                    longest(p.interface.uniforms.as_slice())
                }
                ProgramParameter::ActiveAttributes => p.interface.attributes.len() as i32,
                ProgramParameter::ActiveAttributeMaxLength => {
                    longest(p.interface.attributes.as_slice())
                }
                ProgramParameter::ActiveUniformBlocks => p.interface.blocks.len() as i32,
                ProgramParameter::BinaryLength => {
                    if p.linked {
                        linker::encode_binary(&p.interface).len() as i32
                    } else {
                        0
                    }
                }
                ProgramParameter::BinaryRetrievableHint => i32::from(p.binary_retrievable),
                ProgramParameter::Separable => i32::from(p.separable),
            })
        })
        .unwrap_or_default()
    }

    fn get_program_info_log(&self, program: RawHandle) -> String {
        self.with(&self.programs, program, |p| Ok(p.log.clone()))
            .unwrap_or_default()
    }

    fn get_uniform_location(&self, program: RawHandle, name: &str) -> i32 {
        self.with(&self.programs, program, |p| {
            p.check_linked()?;
            let base = name.strip_suffix("[0]").unwrap_or(name);
            Ok(p.interface
                .uniforms
                .iter()
                .position(|u| u.name == base)
                .map_or(-1, |i| i as i32))
        })
        .unwrap_or(-1)
    }

    fn get_attrib_location(&self, program: RawHandle, name: &str) -> i32 {
        self.with(&self.programs, program, |p| {
            p.check_linked()?;
            Ok(p.interface
                .attributes
                .iter()
                .find(|a| a.name == name)
                .and_then(|a| a.location)
                .map_or(-1, |l| l as i32))
        })
        .unwrap_or(-1)
    }

    fn get_uniform_block_index(&self, program: RawHandle, name: &str) -> u32 {
        self.with(&self.programs, program, |p| {
            p.check_linked()?;
            Ok(p.interface
                .blocks
                .iter()
                .position(|b| b == name)
                .map_or(u32::MAX, |i| i as u32))
        })
        .unwrap_or(u32::MAX)
    }

    fn uniform_block_binding(&self, program: RawHandle, block: u32, binding: u32) {
        self.with(&self.programs, program, |p| {
            p.check_linked()?;
            if block as usize >= p.interface.blocks.len() {
                return Err(Fault::invalid_value(format!(
                    "uniform block {block} does not exist"
                )));
            }
            if binding >= MAX_INDEXED_BINDINGS {
                return Err(Fault::invalid_value(format!(
                    "binding {binding} exceeds {MAX_INDEXED_BINDINGS}"
                )));
            }
            p.block_bindings.insert(block, binding);
            Ok(())
        });
    }

    fn program_uniform(&self, program: RawHandle, location: i32, value: &UniformValue) {
        if location == -1 {
            return;
        }
        self.with(&self.programs, program, |p| {
            p.check_linked()?;
            let uniform = usize::try_from(location)
                .ok()
                .and_then(|l| p.interface.uniforms.get(l))
                .ok_or_else(|| {
                    Fault::invalid_operation(format!("no uniform at location {location}"))
                })?;
            if !value.fits(&uniform.ty) {
                return Err(Fault::invalid_operation(format!(
                    "cannot upload {} to {} `{}`",
                    value.glsl_type(),
                    uniform.ty,
                    uniform.name
                )));
            }
            p.uniform_values.insert(location, *value);
            Ok(())
        });
    }

    fn get_program_binary(&self, program: RawHandle) -> Option<ProgramBinary> {
        self.with(&self.programs, program, |p| {
            p.check_linked()?;
            Ok(ProgramBinary {
                format: super::BINARY_FORMAT,
                data: linker::encode_binary(&p.interface),
            })
        })
    }

    fn program_binary(&self, program: RawHandle, binary: &ProgramBinary) {
        self.with(&self.programs, program, |p| {
            p.validated = false;
            p.uniform_values.clear();
            p.block_bindings.clear();
            match linker::decode_binary(binary.format, &binary.data) {
                Ok(interface) => {
                    p.linked = true;
                    p.log.clear();
                    p.interface = interface;
                }
                Err(reason) => {
                    p.linked = false;
                    p.log = format!("error: {reason}");
                    p.interface = Default::default();
                }
            }
            Ok(())
        });
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    fn fence_sync(&self) -> RawSync {
        let sync = self.next_sync.get() + 1;
        self.next_sync.set(sync);
        self.syncs.borrow_mut().insert(sync);
        sync
    }

    fn delete_sync(&self, sync: RawSync) {
        if sync != 0 && !self.syncs.borrow_mut().remove(&sync) {
            self.raise(Fault::invalid_value(format!("{sync} is not a fence")));
        }
    }

    fn wait_sync(&self, sync: RawSync) {
        if !self.syncs.borrow().contains(&sync) {
            self.raise(Fault::invalid_value(format!("{sync} is not a fence")));
        }
    }

    fn client_wait_sync(&self, sync: RawSync, _flush: bool, _timeout_ns: u64) -> WaitStatus {
        if self.syncs.borrow().contains(&sync) {
            WaitStatus::AlreadySignaled
        } else {
            self.raise(Fault::invalid_value(format!("{sync} is not a fence")));
            WaitStatus::WaitFailed
        }
    }

    fn is_sync_signaled(&self, sync: RawSync) -> bool {
        if self.syncs.borrow().contains(&sync) {
            true
        } else {
            self.raise(Fault::invalid_value(format!("{sync} is not a fence")));
            false
        }
    }
}

fn check_format(components: u32, relative_offset: u32) -> Op<()> {
    if !(1..=4).contains(&components) {
        return Err(Fault::invalid_value(format!(
            "{components} components outside 1..=4"
        )));
    }
    if relative_offset >= MAX_VERTEX_STRIDE {
        return Err(Fault::invalid_value(format!(
            "relative offset {relative_offset} exceeds {MAX_VERTEX_STRIDE}"
        )));
    }
    Ok(())
}
