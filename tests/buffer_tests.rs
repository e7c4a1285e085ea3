//! Buffer Tests
//!
//! Tests for:
//! - Typed targets: bind / unbind / indexed binding points
//! - Mutable and immutable storage, uploads and read-back
//! - Mapping guards
//! - Same-buffer copies: overlap rejection and chunked copy_within

use std::rc::Rc;

use glkit::driver::soft::{DriverCall, SoftDriver};
use glkit::{
    ArrayBuffer, BufferType, BufferUsage, Context, CopyWriteBuffer, ErrorCode, GlError, MapAccess,
    MapFlags, ShaderStorageBuffer, StorageFlags, UniformBuffer,
};

fn setup() -> (Rc<SoftDriver>, Context) {
    let driver = Rc::new(SoftDriver::new());
    let ctx = Context::from_shared(driver.clone());
    (driver, ctx)
}

fn bytes(range: std::ops::Range<u8>) -> Vec<u8> {
    range.collect()
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn bind_uses_the_marker_target() {
    let (driver, ctx) = setup();
    let vbo = ArrayBuffer::new(&ctx);
    let ubo = UniformBuffer::new(&ctx);

    vbo.bind();
    ubo.bind();
    assert_eq!(driver.bound_buffer(BufferType::Array), vbo.raw());
    assert_eq!(driver.bound_buffer(BufferType::Uniform), ubo.raw());

    vbo.unbind();
    assert_eq!(driver.bound_buffer(BufferType::Array), 0);
    assert_eq!(driver.bound_buffer(BufferType::Uniform), ubo.raw());
}

#[test]
fn bind_as_overrides_the_target() {
    let (driver, ctx) = setup();
    let vbo = ArrayBuffer::new(&ctx);

    vbo.bind_as(BufferType::CopyRead);
    assert_eq!(driver.bound_buffer(BufferType::CopyRead), vbo.raw());
    assert_eq!(driver.bound_buffer(BufferType::Array), 0);
}

#[test]
fn indexed_bindings() {
    let (driver, ctx) = setup();
    let ubo = UniformBuffer::with_data(&ctx, BufferUsage::DynamicDraw, &[0.0f32; 64]);
    let ssbo = ShaderStorageBuffer::with_data(&ctx, BufferUsage::DynamicCopy, &[0u32; 16]);

    ubo.bind_base(2);
    ssbo.bind_range(0, 16, 32);

    assert_eq!(driver.bound_indexed_buffer(BufferType::Uniform, 2), ubo.raw());
    assert_eq!(
        driver.bound_indexed_buffer(BufferType::ShaderStorage, 0),
        ssbo.raw()
    );
    assert!(driver.calls().contains(&DriverCall::BindBufferBase {
        target: BufferType::Uniform,
        index: 2,
        buffer: ubo.raw(),
    }));
    assert!(ctx.check_error().is_ok());
}

#[test]
fn non_indexed_target_rejects_bind_base() {
    let (_driver, ctx) = setup();
    let vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &[1u8; 4]);

    vbo.bind_base(0);
    assert!(matches!(
        ctx.check_error(),
        Err(GlError::Driver(ErrorCode::InvalidEnum))
    ));
}

// ============================================================================
// Storage
// ============================================================================

#[test]
fn with_data_uploads_vertices() {
    let (driver, ctx) = setup();
    let vertices: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
    ];
    let vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &vertices);

    assert_eq!(vbo.size(), 48);
    assert_eq!(vbo.usage(), Some(BufferUsage::StaticDraw));
    assert!(!vbo.is_immutable());
    assert_eq!(
        driver.buffer_contents(vbo.raw()),
        Some(bytemuck::cast_slice::<_, u8>(&vertices).to_vec())
    );
}

#[test]
fn update_and_read_back_typed() {
    let (_driver, ctx) = setup();
    let buffer = ArrayBuffer::with_data(&ctx, BufferUsage::DynamicDraw, &[0u32; 8]);

    buffer.update_typed(2, &[7u32, 8, 9]);

    let mut out = [0u32; 8];
    buffer.read_back_typed(0, &mut out).unwrap();
    assert_eq!(out, [0, 0, 7, 8, 9, 0, 0, 0]);

    let mut tail = [0u32; 2];
    buffer.read_back_typed(3, &mut tail).unwrap();
    assert_eq!(tail, [8, 9]);
}

#[test]
fn out_of_range_update_sets_invalid_value() {
    let (_driver, ctx) = setup();
    let buffer = ArrayBuffer::with_data(&ctx, BufferUsage::DynamicDraw, &[0u8; 8]);

    buffer.update(6, &[1, 2, 3, 4]);
    assert!(matches!(
        ctx.check_error(),
        Err(GlError::Driver(ErrorCode::InvalidValue))
    ));
    assert!(ctx.check_error().is_ok());
}

#[test]
fn immutable_storage_cannot_be_reallocated() {
    let (_driver, ctx) = setup();
    let buffer = UniformBuffer::with_storage(&ctx, StorageFlags::DYNAMIC_STORAGE, &[0.5f32; 4]);
    assert!(buffer.is_immutable());
    assert_eq!(buffer.storage_flags(), StorageFlags::DYNAMIC_STORAGE);
    assert_eq!(buffer.size(), 16);

    buffer.update_typed(1, &[2.0f32]);
    assert!(ctx.check_error().is_ok());

    buffer.allocate(BufferUsage::StaticDraw, 64, None);
    assert!(matches!(
        ctx.check_error(),
        Err(GlError::Driver(ErrorCode::InvalidOperation))
    ));
    assert_eq!(buffer.size(), 16);
}

#[test]
fn immutable_storage_without_dynamic_flag_rejects_updates() {
    let (_driver, ctx) = setup();
    let buffer = ArrayBuffer::with_storage(&ctx, StorageFlags::empty(), &[1u8; 16]);

    buffer.update(0, &[0]);
    assert!(matches!(
        ctx.check_error(),
        Err(GlError::Driver(ErrorCode::InvalidOperation))
    ));
}

#[test]
fn invalidate_range_discards_contents() {
    let (driver, ctx) = setup();
    let buffer = ArrayBuffer::with_data(&ctx, BufferUsage::StreamDraw, &[0xFFu8; 8]);

    buffer.invalidate_range(2, 4);
    assert_eq!(
        driver.buffer_contents(buffer.raw()),
        Some(vec![0xFF, 0xFF, 0, 0, 0, 0, 0xFF, 0xFF])
    );
}

#[test]
fn null_buffer_data_operations_fail() {
    let (driver, ctx) = setup();
    let mut buffer = ArrayBuffer::null(&ctx);

    buffer.upload(BufferUsage::StaticDraw, &[1u8, 2, 3]);
    assert_eq!(buffer.size(), 0);

    let mut out = [0u8; 4];
    assert!(matches!(
        buffer.read_back(0, &mut out),
        Err(GlError::NullHandle("buffer"))
    ));
    assert!(matches!(
        buffer.map(MapAccess::ReadOnly),
        Err(GlError::NullHandle("buffer"))
    ));
    assert!(buffer.copy_within(0, 1, 2).is_err());
    assert!(ctx.check_error().is_ok());
    assert!(driver.calls().is_empty());
}

// ============================================================================
// Mapping
// ============================================================================

#[test]
fn mapped_writes_reach_the_buffer() {
    let (driver, ctx) = setup();
    let mut buffer = ArrayBuffer::with_data(&ctx, BufferUsage::DynamicDraw, &[0u8; 8]);
    let raw = buffer.raw();

    {
        let mut mapped = buffer.map_range(4, 4, MapFlags::WRITE).unwrap();
        assert_eq!(mapped.len(), 4);
        mapped.copy_from_slice(&[1, 2, 3, 4]);
        assert!(mapped.unmap());
    }

    assert!(!buffer.is_mapped());
    assert_eq!(
        driver.buffer_contents(raw),
        Some(vec![0, 0, 0, 0, 1, 2, 3, 4])
    );
    assert!(ctx.check_error().is_ok());
}

#[test]
fn mapping_reports_range_while_live() {
    let (driver, ctx) = setup();
    let mut buffer = ArrayBuffer::with_data(&ctx, BufferUsage::DynamicRead, &bytes(0..16));
    let raw = buffer.raw();

    let mapped = buffer.map(MapAccess::ReadOnly).unwrap();
    assert_eq!(&mapped[..4], &[0, 1, 2, 3]);
    assert_eq!(
        glkit::Driver::get_buffer_parameter(&*driver, raw, glkit::BufferParameter::Mapped),
        1
    );
    drop(mapped);

    assert!(!buffer.is_mapped());
    assert_eq!(buffer.map_length(), 0);
    assert!(ctx.check_error().is_ok());
}

#[test]
fn failed_map_returns_map_failed() {
    let (_driver, ctx) = setup();
    let mut buffer = ArrayBuffer::with_data(&ctx, BufferUsage::DynamicDraw, &[0u8; 8]);

    assert!(matches!(
        buffer.map_range(4, 16, MapFlags::WRITE),
        Err(GlError::MapFailed)
    ));
    assert!(matches!(
        ctx.check_error(),
        Err(GlError::Driver(ErrorCode::InvalidValue))
    ));
    assert!(!buffer.is_mapped());
}

#[test]
fn explicit_flush_within_mapping() {
    let (_driver, ctx) = setup();
    let mut buffer = ArrayBuffer::with_data(&ctx, BufferUsage::StreamDraw, &[0u8; 32]);

    let mut mapped = buffer
        .map_range(8, 16, MapFlags::WRITE | MapFlags::FLUSH_EXPLICIT)
        .unwrap();
    mapped[0] = 42;
    mapped.flush(0, 4);
    assert!(mapped.unmap());
    assert!(ctx.check_error().is_ok());
}

// ============================================================================
// Copies
// ============================================================================

#[test]
fn copy_between_buffers() {
    let (driver, ctx) = setup();
    let src = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &bytes(0..8));
    let dst = CopyWriteBuffer::with_data(&ctx, BufferUsage::StaticCopy, &[0u8; 8]);

    src.copy_to(&dst, 2, 4, 4).unwrap();

    assert_eq!(
        driver.buffer_contents(dst.raw()),
        Some(vec![0, 0, 0, 0, 2, 3, 4, 5])
    );
}

#[test]
fn overlapping_copy_to_self_is_rejected() {
    let (driver, ctx) = setup();
    let buffer = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &bytes(0..16));
    driver.clear_calls();

    let err = buffer.copy_to(&buffer, 0, 3, 10).unwrap_err();
    assert!(matches!(
        err,
        GlError::OverlappingCopy {
            src: 0,
            dst: 3,
            size: 10
        }
    ));
    assert!(driver.calls().is_empty());

    buffer.copy_to(&buffer, 0, 10, 4).unwrap();
    assert!(ctx.check_error().is_ok());
}

#[test]
fn copy_within_issues_non_overlapping_chunks() {
    let (driver, ctx) = setup();
    let buffer = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &bytes(0..16));
    let raw = buffer.raw();
    driver.clear_calls();

    buffer.copy_within(0, 3, 10).unwrap();

    let chunks: Vec<(usize, usize, usize)> = driver
        .calls()
        .iter()
        .filter_map(|call| match *call {
            DriverCall::CopyBufferSubData {
                read,
                write,
                read_offset,
                write_offset,
                size,
            } if read == raw && write == raw => Some((read_offset, write_offset, size)),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, vec![(7, 10, 3), (4, 7, 3), (1, 4, 3), (0, 3, 1)]);

    let mut expected = bytes(0..16);
    expected.copy_within(0..10, 3);
    assert_eq!(driver.buffer_contents(raw), Some(expected));
    assert!(ctx.check_error().is_ok());
}

#[test]
fn copy_within_forward() {
    let (driver, ctx) = setup();
    let buffer = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &bytes(0..16));

    buffer.copy_within(5, 1, 11).unwrap();

    let mut expected = bytes(0..16);
    expected.copy_within(5..16, 1);
    assert_eq!(driver.buffer_contents(buffer.raw()), Some(expected));
    assert!(ctx.check_error().is_ok());
}
