//! Buffers
//!
//! [`Buffer<T>`] owns one buffer object created against the binding target `T`.
//! The target is a hint for binding: [`Buffer::bind`] uses it, and
//! [`Buffer::bind_as`] binds the same storage anywhere else.
//!
//! # Overview
//!
//! - mutable storage through [`Buffer::allocate`] and the typed
//!   [`Buffer::upload`]
//! - immutable storage through [`Buffer::allocate_storage`]
//! - partial updates and read-back, raw or typed through `bytemuck`
//! - scoped mappings: [`MappedBuffer`] borrows the buffer mutably and unmaps on
//!   drop
//! - copies between buffers, and overlap-safe copies inside one buffer
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let vertices = [[0.0f32, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]];
//! let mut vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &vertices);
//!
//! {
//!     let mut map = vbo.map(MapAccess::WriteOnly)?;
//!     map[0..4].copy_from_slice(&1.0f32.to_ne_bytes());
//! } // unmapped here
//!
//! vbo.copy_within(0, 12, 24)?;
//! ```

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use bytemuck::Pod;
use log::warn;

use super::handle::{Handle, HandleKind};
use crate::context::Context;
use crate::driver::{Driver, RawHandle};
use crate::errors::{GlError, Result};
use crate::types::{
    BufferParameter, BufferType, BufferUsage, MapAccess, MapFlags, ObjectType, StorageFlags,
};

// ============================================================================
// Targets
// ============================================================================

/// Compile-time binding target of a [`Buffer`].
pub trait BufferTarget {
    const TYPE: BufferType;
}

macro_rules! buffer_targets {
    ($($(#[$meta:meta])* $marker:ident, $alias:ident => $ty:ident;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug)]
            pub enum $marker {}

            impl BufferTarget for $marker {
                const TYPE: BufferType = BufferType::$ty;
            }

            pub type $alias = Buffer<$marker>;
        )+
    };
}

buffer_targets! {
    /// Vertex attribute data.
    ArrayTarget, ArrayBuffer => Array;
    /// Index data.
    ElementArrayTarget, ElementArrayBuffer => ElementArray;
    UniformTarget, UniformBuffer => Uniform;
    ShaderStorageTarget, ShaderStorageBuffer => ShaderStorage;
    CopyReadTarget, CopyReadBuffer => CopyRead;
    CopyWriteTarget, CopyWriteBuffer => CopyWrite;
    PixelPackTarget, PixelPackBuffer => PixelPack;
    PixelUnpackTarget, PixelUnpackBuffer => PixelUnpack;
    DrawIndirectTarget, DrawIndirectBuffer => DrawIndirect;
    DispatchIndirectTarget, DispatchIndirectBuffer => DispatchIndirect;
    QueryTarget, QueryBuffer => Query;
    AtomicCounterTarget, AtomicCounterBuffer => AtomicCounter;
    TransformFeedbackTarget, TransformFeedbackBuffer => TransformFeedback;
    /// Backing store of a buffer texture.
    TextureTarget, TextureBuffer => Texture;
}

/// Buffer object family. The descriptor is the target used to commit the
/// object type.
#[derive(Debug)]
pub enum BufferObject {}

impl HandleKind for BufferObject {
    const OBJECT: ObjectType = ObjectType::Buffer;
    type Raw = RawHandle;
    type Desc = BufferType;

    fn acquire(driver: &dyn Driver, target: BufferType) -> RawHandle {
        let raw = driver.create_buffer();
        driver.bind_buffer(target, raw);
        driver.bind_buffer(target, 0);
        raw
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_buffer(raw);
    }
}

// ============================================================================
// Buffer
// ============================================================================

/// A buffer object bound by default to target `T`.
#[derive(Debug)]
pub struct Buffer<T: BufferTarget> {
    handle: Handle<BufferObject>,
    _target: PhantomData<fn() -> T>,
}

scoped_resource!([T: BufferTarget] Buffer<T>, reset { _target });

impl<T: BufferTarget> Buffer<T> {
    /// Creates a buffer with no storage.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            handle: Handle::new(ctx, T::TYPE),
            _target: PhantomData,
        }
    }

    /// A buffer that owns nothing. Call [`init`](Self::init) to create one.
    #[must_use]
    pub fn null(ctx: &Context) -> Self {
        Self {
            handle: Handle::null(ctx, T::TYPE),
            _target: PhantomData,
        }
    }

    /// Creates a buffer and fills it with `data`.
    #[must_use]
    pub fn with_data<D: Pod>(ctx: &Context, usage: BufferUsage, data: &[D]) -> Self {
        let buffer = Self::new(ctx);
        buffer.upload(usage, data);
        buffer
    }

    /// Creates a buffer with immutable storage holding `data`.
    #[must_use]
    pub fn with_storage<D: Pod>(ctx: &Context, flags: StorageFlags, data: &[D]) -> Self {
        let buffer = Self::new(ctx);
        let bytes: &[u8] = bytemuck::cast_slice(data);
        buffer.allocate_storage(flags, bytes.len(), Some(bytes));
        buffer
    }

    #[inline]
    fn driver(&self) -> &dyn Driver {
        self.handle.driver()
    }

    // ========================================================================
    // Binding
    // ========================================================================

    #[inline]
    pub fn bind(&self) {
        self.bind_as(T::TYPE);
    }

    pub fn bind_as(&self, target: BufferType) {
        self.driver().bind_buffer(target, self.raw());
    }

    /// Clears the binding of `T`, whatever is bound there.
    #[inline]
    pub fn unbind(&self) {
        self.unbind_from(T::TYPE);
    }

    pub fn unbind_from(&self, target: BufferType) {
        self.driver().bind_buffer(target, 0);
    }

    /// Binds the whole buffer to an indexed binding point of `T`.
    #[inline]
    pub fn bind_base(&self, index: u32) {
        self.bind_base_as(T::TYPE, index);
    }

    pub fn bind_base_as(&self, target: BufferType, index: u32) {
        self.driver().bind_buffer_base(target, index, self.raw());
    }

    /// Binds `size` bytes starting at `offset` to an indexed binding point.
    #[inline]
    pub fn bind_range(&self, index: u32, offset: usize, size: usize) {
        self.bind_range_as(T::TYPE, index, offset, size);
    }

    pub fn bind_range_as(&self, target: BufferType, index: u32, offset: usize, size: usize) {
        self.driver()
            .bind_buffer_range(target, index, self.raw(), offset, size);
    }

    // ========================================================================
    // Storage
    // ========================================================================

    /// (Re)allocates mutable storage of `size` bytes, filled from `data` when
    /// given.
    pub fn allocate(&self, usage: BufferUsage, size: usize, data: Option<&[u8]>) {
        if !self.is_null() {
            self.driver().buffer_data(self.raw(), size, data, usage);
        }
    }

    /// Allocates immutable storage. The buffer cannot be reallocated
    /// afterwards.
    pub fn allocate_storage(&self, flags: StorageFlags, size: usize, data: Option<&[u8]>) {
        if !self.is_null() {
            self.driver().buffer_storage(self.raw(), size, data, flags);
        }
    }

    /// Replaces the storage with a copy of `data`.
    pub fn upload<D: Pod>(&self, usage: BufferUsage, data: &[D]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.allocate(usage, bytes.len(), Some(bytes));
    }

    /// Overwrites bytes starting at `offset`. The range is not checked here.
    pub fn update(&self, offset: usize, data: &[u8]) {
        if !self.is_null() {
            self.driver().buffer_sub_data(self.raw(), offset, data);
        }
    }

    /// Overwrites elements starting at element index `first`.
    pub fn update_typed<D: Pod>(&self, first: usize, data: &[D]) {
        self.update(first * size_of::<D>(), bytemuck::cast_slice(data));
    }

    /// Reads `out.len()` bytes starting at `offset`.
    pub fn read_back(&self, offset: usize, out: &mut [u8]) -> Result<()> {
        if self.is_null() {
            return Err(GlError::NullHandle("buffer"));
        }
        self.driver().get_buffer_sub_data(self.raw(), offset, out);
        Ok(())
    }

    /// Reads `out.len()` elements starting at element index `first`.
    pub fn read_back_typed<D: Pod>(&self, first: usize, out: &mut [D]) -> Result<()> {
        self.read_back(first * size_of::<D>(), bytemuck::cast_slice_mut(out))
    }

    /// Marks the whole content undefined.
    pub fn invalidate(&self) {
        if !self.is_null() {
            self.driver().invalidate_buffer_data(self.raw());
        }
    }

    pub fn invalidate_range(&self, offset: usize, length: usize) {
        if !self.is_null() {
            self.driver()
                .invalidate_buffer_sub_data(self.raw(), offset, length);
        }
    }

    // ========================================================================
    // Mapping
    // ========================================================================

    /// Maps the whole buffer.
    pub fn map(&mut self, access: MapAccess) -> Result<MappedBuffer<'_, T>> {
        if self.is_null() {
            return Err(GlError::NullHandle("buffer"));
        }
        let len = self.size();
        let ptr = self.driver().map_buffer(self.raw(), access);
        MappedBuffer::new(self, ptr, len)
    }

    /// Maps `length` bytes starting at `offset`.
    pub fn map_range(
        &mut self,
        offset: usize,
        length: usize,
        flags: MapFlags,
    ) -> Result<MappedBuffer<'_, T>> {
        if self.is_null() {
            return Err(GlError::NullHandle("buffer"));
        }
        let ptr = self
            .driver()
            .map_buffer_range(self.raw(), offset, length, flags);
        MappedBuffer::new(self, ptr, length)
    }

    // ========================================================================
    // Copies
    // ========================================================================

    /// Copies `size` bytes into `dst`.
    ///
    /// Copying inside one buffer with overlapping ranges fails with
    /// [`GlError::OverlappingCopy`]; use [`copy_within`](Self::copy_within)
    /// for that.
    pub fn copy_to<U: BufferTarget>(
        &self,
        dst: &Buffer<U>,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    ) -> Result<()> {
        if self.is_null() || dst.is_null() {
            return Ok(());
        }
        if self.raw() == dst.raw()
            && read_offset < write_offset + size
            && write_offset < read_offset + size
        {
            return Err(GlError::OverlappingCopy {
                src: read_offset,
                dst: write_offset,
                size,
            });
        }
        self.driver()
            .copy_buffer_sub_data(self.raw(), dst.raw(), read_offset, write_offset, size);
        Ok(())
    }

    /// Copies `size` bytes from `src_offset` to `dst_offset` inside this
    /// buffer. The ranges may overlap.
    pub fn copy_within(&self, src_offset: usize, dst_offset: usize, size: usize) -> Result<()> {
        if self.is_null() {
            return Err(GlError::NullHandle("buffer"));
        }
        for (offset, len) in overlapping_copy_chunks(src_offset, dst_offset, size) {
            self.driver().copy_buffer_sub_data(
                self.raw(),
                self.raw(),
                src_offset + offset,
                dst_offset + offset,
                len,
            );
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn parameter(&self, pname: BufferParameter) -> i64 {
        if self.is_null() {
            return 0;
        }
        self.driver().get_buffer_parameter(self.raw(), pname)
    }

    /// Storage size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        usize::try_from(self.parameter(BufferParameter::Size)).unwrap_or_default()
    }

    #[must_use]
    pub fn usage(&self) -> Option<BufferUsage> {
        BufferUsage::from_raw(self.parameter(BufferParameter::Usage) as u32)
    }

    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.parameter(BufferParameter::ImmutableStorage) != 0
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.parameter(BufferParameter::Mapped) != 0
    }

    #[must_use]
    pub fn access(&self) -> Option<MapAccess> {
        MapAccess::from_raw(self.parameter(BufferParameter::Access) as u32)
    }

    #[must_use]
    pub fn access_flags(&self) -> MapFlags {
        MapFlags::from_bits_truncate(self.parameter(BufferParameter::AccessFlags) as u32)
    }

    #[must_use]
    pub fn storage_flags(&self) -> StorageFlags {
        StorageFlags::from_bits_truncate(self.parameter(BufferParameter::StorageFlags) as u32)
    }

    #[must_use]
    pub fn map_offset(&self) -> usize {
        usize::try_from(self.parameter(BufferParameter::MapOffset)).unwrap_or_default()
    }

    #[must_use]
    pub fn map_length(&self) -> usize {
        usize::try_from(self.parameter(BufferParameter::MapLength)).unwrap_or_default()
    }
}

// ============================================================================
// Mapping guard
// ============================================================================

/// A live mapping of a [`Buffer`]. Dereferences to the mapped bytes and unmaps
/// when dropped.
#[derive(Debug)]
pub struct MappedBuffer<'a, T: BufferTarget> {
    buffer: &'a mut Buffer<T>,
    ptr: NonNull<u8>,
    len: usize,
    mapped: bool,
}

impl<'a, T: BufferTarget> MappedBuffer<'a, T> {
    fn new(buffer: &'a mut Buffer<T>, ptr: *mut u8, len: usize) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or(GlError::MapFailed)?;
        Ok(Self {
            buffer,
            ptr,
            len,
            mapped: true,
        })
    }

    /// Makes writes to `length` bytes at `offset` (relative to the mapping)
    /// visible to the driver. Requires [`MapFlags::FLUSH_EXPLICIT`].
    pub fn flush(&self, offset: usize, length: usize) {
        self.buffer
            .driver()
            .flush_mapped_buffer_range(self.buffer.raw(), offset, length);
    }

    /// Ends the mapping. Returns `false` if the content was lost while
    /// mapped.
    pub fn unmap(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        if !std::mem::take(&mut self.mapped) {
            return true;
        }
        let ok = self.buffer.driver().unmap_buffer(self.buffer.raw());
        if !ok {
            warn!("buffer {} lost its content while mapped", self.buffer.raw());
        }
        ok
    }
}

impl<T: BufferTarget> Deref for MappedBuffer<'_, T> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the driver keeps `len` bytes at `ptr` valid until unmap,
        // which only happens through `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: BufferTarget> DerefMut for MappedBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; the buffer is mutably borrowed for the guard's
        // lifetime, so no other access can alias the mapping.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: BufferTarget> Drop for MappedBuffer<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Overlapping copies
// ============================================================================

/// Splits an overlapping copy of `size` bytes from `src` to `dst` into
/// `(offset, len)` chunks, in the order they must be issued.
///
/// Each chunk copies `src + offset .. src + offset + len` to
/// `dst + offset ..`; no chunk overlaps itself and every byte of `0..size` is
/// covered exactly once. Chunks are `|src - dst|` long, walking forward when
/// `dst < src` and backward otherwise, followed by the `size % step`
/// remainder.
#[must_use]
pub fn overlapping_copy_chunks(src: usize, dst: usize, size: usize) -> Vec<(usize, usize)> {
    let step = src.abs_diff(dst);
    if step == 0 || size == 0 {
        return Vec::new();
    }
    if step >= size {
        return vec![(0, size)];
    }

    let full = size / step;
    let remainder = size % step;
    let mut chunks = Vec::with_capacity(full + 1);

    if dst < src {
        chunks.extend((0..full).map(|i| (i * step, step)));
        if remainder > 0 {
            chunks.push((full * step, remainder));
        }
    } else {
        chunks.extend((0..full).map(|i| (size - (i + 1) * step, step)));
        if remainder > 0 {
            chunks.push((0, remainder));
        }
    }
    chunks
}
