//! Vertex Array Tests
//!
//! Tests for:
//! - Buffer bindings and attribute state read-back
//! - Format dispatch: float / integer / double entry points
//! - The explicit integer-to-float path
//! - Validation of locations, component counts and strides

use std::rc::Rc;

use glam::Vec3;
use glkit::driver::soft::{DriverCall, SoftDriver};
use glkit::{
    ArrayBuffer, AttributeDescriptor, BufferUsage, ComponentType, Context, ElementArrayBuffer,
    ErrorCode, GlError, VertexArray,
};

fn setup() -> (Rc<SoftDriver>, Context) {
    let driver = Rc::new(SoftDriver::new());
    let ctx = Context::from_shared(driver.clone());
    (driver, ctx)
}

fn format_calls(driver: &SoftDriver) -> Vec<DriverCall> {
    driver
        .calls()
        .into_iter()
        .filter(|call| {
            matches!(
                call,
                DriverCall::AttribFormat { .. }
                    | DriverCall::AttribIFormat { .. }
                    | DriverCall::AttribLFormat { .. }
            )
        })
        .collect()
}

fn expect_error(ctx: &Context, code: ErrorCode) {
    match ctx.check_error() {
        Err(GlError::Driver(actual)) => assert_eq!(actual, code),
        other => panic!("expected {code:?}, got {other:?}"),
    }
}

// ============================================================================
// Bindings
// ============================================================================

#[test]
fn float3_positions_from_one_buffer() {
    let (driver, ctx) = setup();
    let positions = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
    ];
    let vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &positions);
    assert_eq!(vbo.size(), 48);

    let vao = VertexArray::new(&ctx);
    vao.bind_buffer(0, &vbo, 12, 0);
    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(0, 0, 3));
    assert!(ctx.check_error().is_ok());

    let state = vao.attribute_state(0);
    assert!(state.enabled);
    assert_eq!(state.binding, 0);
    assert_eq!(state.components, 3);
    assert_eq!(state.component_type, Some(ComponentType::F32));
    assert!(!state.normalized);
    assert!(!state.integer);
    assert!(!state.long);

    vao.bind();
    assert_eq!(driver.bound_vertex_array(), vao.raw());
    vao.unbind();
    assert_eq!(driver.bound_vertex_array(), 0);
}

#[test]
fn interleaved_attributes_share_a_binding() {
    let (_driver, ctx) = setup();
    let vertices = [0.0f32; 8 * 3];
    let vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &vertices);
    let ibo = ElementArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &[0u16, 1, 2]);

    let vao = VertexArray::new(&ctx);
    vao.bind_buffer(0, &vbo, 32, 0);
    vao.bind_elements(&ibo);
    vao.bind_typed_attribute::<f32>(0, 0, 3, 0, false);
    vao.bind_typed_attribute::<f32>(0, 1, 3, 12, false);
    vao.bind_typed_attribute::<f32>(0, 2, 2, 24, false);
    assert!(ctx.check_error().is_ok());

    let uv = vao.attribute_state(2);
    assert_eq!(uv.components, 2);
    assert_eq!(uv.relative_offset, 24);
    assert_eq!(vao.attribute_state(1).relative_offset, 12);
}

#[test]
fn disable_and_enable_attribute() {
    let (_driver, ctx) = setup();
    let vao = VertexArray::new(&ctx);
    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(0, 4, 4));

    vao.disable_attribute(4);
    assert!(!vao.attribute_state(4).enabled);
    vao.enable_attribute(4);
    assert!(vao.attribute_state(4).enabled);
}

#[test]
fn instanced_binding_divisor() {
    let (_driver, ctx) = setup();
    let offsets = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &[Vec3::ZERO; 16]);
    let vao = VertexArray::new(&ctx);

    vao.bind_buffer(1, &offsets, 12, 0);
    vao.set_binding_divisor(1, 1);
    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(1, 3, 3));
    assert!(ctx.check_error().is_ok());
    assert_eq!(vao.attribute_state(3).binding, 1);
}

// ============================================================================
// Format dispatch
// ============================================================================

#[test]
fn integer_types_take_the_integer_path() {
    let (driver, ctx) = setup();
    let vao = VertexArray::new(&ctx);
    driver.clear_calls();

    vao.bind_attribute(&AttributeDescriptor::new(0, 0, ComponentType::U8, 4).normalized(true));
    vao.bind_attribute(&AttributeDescriptor::new(0, 1, ComponentType::I32, 1));

    assert_eq!(
        format_calls(&driver),
        vec![
            DriverCall::AttribIFormat {
                location: 0,
                components: 4,
                ty: ComponentType::U8,
            },
            DriverCall::AttribIFormat {
                location: 1,
                components: 1,
                ty: ComponentType::I32,
            },
        ]
    );
    let state = vao.attribute_state(0);
    assert!(state.integer);
    assert!(!state.normalized);
    assert!(ctx.check_error().is_ok());
}

#[test]
fn doubles_take_the_double_path() {
    let (driver, ctx) = setup();
    let vao = VertexArray::new(&ctx);
    driver.clear_calls();

    vao.bind_attribute(&AttributeDescriptor::typed::<f64>(0, 2, 3).normalized(true));
    assert_eq!(
        format_calls(&driver),
        vec![DriverCall::AttribLFormat {
            location: 2,
            components: 3,
            ty: ComponentType::F64,
        }]
    );
    assert!(vao.attribute_state(2).long);
    assert!(ctx.check_error().is_ok());
}

#[test]
fn floats_honour_normalize() {
    let (driver, ctx) = setup();
    let vao = VertexArray::new(&ctx);
    driver.clear_calls();

    vao.bind_attribute(&AttributeDescriptor::new(0, 0, ComponentType::F16, 2));
    vao.bind_attribute(&AttributeDescriptor::new(0, 1, ComponentType::F32, 4).normalized(true));
    assert_eq!(
        format_calls(&driver),
        vec![
            DriverCall::AttribFormat {
                location: 0,
                components: 2,
                ty: ComponentType::F16,
                normalized: false,
            },
            DriverCall::AttribFormat {
                location: 1,
                components: 4,
                ty: ComponentType::F32,
                normalized: true,
            },
        ]
    );
}

#[test]
fn integers_as_float_on_request() {
    let (driver, ctx) = setup();
    let vao = VertexArray::new(&ctx);
    driver.clear_calls();

    let color = AttributeDescriptor::typed::<u8>(0, 3, 4).normalized(true);
    vao.bind_attribute_as_float(&color);
    assert_eq!(
        format_calls(&driver),
        vec![DriverCall::AttribFormat {
            location: 3,
            components: 4,
            ty: ComponentType::U8,
            normalized: true,
        }]
    );

    let state = vao.attribute_state(3);
    assert!(state.enabled);
    assert!(state.normalized);
    assert!(!state.integer);
    assert!(driver.calls().contains(&DriverCall::AttribBinding {
        location: 3,
        binding: 0
    }));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn location_beyond_limit_fails() {
    let (_driver, ctx) = setup();
    let vao = VertexArray::new(&ctx);

    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(0, 16, 3));
    expect_error(&ctx, ErrorCode::InvalidValue);
}

#[test]
fn component_count_is_checked() {
    let (_driver, ctx) = setup();
    let vao = VertexArray::new(&ctx);

    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(0, 0, 5));
    expect_error(&ctx, ErrorCode::InvalidValue);
    assert_eq!(vao.attribute_state(0).components, 4);
}

#[test]
fn oversized_stride_fails() {
    let (_driver, ctx) = setup();
    let vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &[0u8; 16]);
    let vao = VertexArray::new(&ctx);

    vao.bind_buffer(0, &vbo, 4096, 0);
    expect_error(&ctx, ErrorCode::InvalidValue);
}

#[test]
fn null_vertex_array_issues_nothing() {
    let (driver, ctx) = setup();
    let vao = VertexArray::null(&ctx);

    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(0, 0, 3));
    vao.enable_attribute(0);
    assert_eq!(vao.attribute_state(0), glkit::AttributeState::default());
    assert!(driver.calls().is_empty());
}
