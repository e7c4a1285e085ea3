//! Context & Fence Tests
//!
//! Tests for:
//! - Capability toggles and fixed-function state
//! - Error polling
//! - Fence creation, waits and deletion

use std::rc::Rc;
use std::time::Duration;

use glkit::driver::soft::SoftDriver;
use glkit::{Capability, Context, ErrorCode, Face, Fence, GlError, WaitStatus};

fn setup() -> (Rc<SoftDriver>, Context) {
    let driver = Rc::new(SoftDriver::new());
    let ctx = Context::from_shared(driver.clone());
    (driver, ctx)
}

// ============================================================================
// State
// ============================================================================

#[test]
fn capabilities_toggle() {
    let (_driver, ctx) = setup();
    assert!(!ctx.is_enabled(Capability::Blend));

    ctx.enable(Capability::Blend);
    assert!(ctx.is_enabled(Capability::Blend));
    ctx.set_capability(Capability::Blend, false);
    assert!(!ctx.is_enabled(Capability::Blend));

    ctx.enable_depth_test(true);
    assert!(ctx.is_enabled(Capability::DepthTest));
}

#[test]
fn depth_write_is_independent_of_depth_test() {
    let (driver, ctx) = setup();
    ctx.enable_depth_test(true);
    ctx.enable_depth_write(false);

    assert!(!driver.depth_write_enabled());
    assert!(ctx.is_enabled(Capability::DepthTest));

    ctx.enable_depth_write(true);
    assert!(driver.depth_write_enabled());
}

#[test]
fn cull_face() {
    let (driver, ctx) = setup();
    ctx.enable_cull_face(Some(Face::Front));
    assert!(ctx.is_enabled(Capability::CullFace));
    assert_eq!(driver.cull_face_mode(), Face::Front);

    ctx.enable_cull_face(None);
    assert!(!ctx.is_enabled(Capability::CullFace));
}

#[test]
fn viewport_and_scissor() {
    let (driver, ctx) = setup();
    ctx.viewport(0, 0, 1280, 720);
    ctx.scissor(10, 20, 100, 50);

    assert_eq!(driver.viewport(), [0, 0, 1280, 720]);
    assert_eq!(driver.scissor_box(), [10, 20, 100, 50]);
    assert!(ctx.is_enabled(Capability::ScissorTest));

    ctx.disable_scissor();
    assert!(!ctx.is_enabled(Capability::ScissorTest));
    assert!(ctx.check_error().is_ok());
}

#[test]
fn contexts_share_a_driver() {
    let (driver, ctx) = setup();
    let clone = ctx.clone();
    let other = Context::from_shared(driver);

    assert!(ctx.same_driver(&clone));
    assert!(ctx.same_driver(&other));
    assert!(!ctx.same_driver(&Context::new(SoftDriver::new())));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn first_error_wins() {
    let (_driver, ctx) = setup();
    ctx.viewport(0, 0, -1, 0);
    glkit::Driver::pop_debug_group(ctx.driver());

    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidValue),
        other => panic!("expected InvalidValue, got {other:?}"),
    }
    assert!(ctx.check_error().is_ok());
}

#[test]
fn drain_errors_empties_the_flag() {
    let (_driver, ctx) = setup();
    assert!(ctx.drain_errors().is_empty());

    ctx.scissor(0, 0, -1, -1);
    let errors = ctx.drain_errors();
    assert_eq!(errors.as_slice(), &[ErrorCode::InvalidValue]);
    assert!(ctx.drain_errors().is_empty());
}

#[test]
fn driver_errors_display_their_code() {
    assert_eq!(
        GlError::Driver(ErrorCode::InvalidOperation).to_string(),
        "Driver error: invalid operation (0x0502)"
    );
}

// ============================================================================
// Fences
// ============================================================================

#[test]
fn fence_waits() {
    let (driver, ctx) = setup();
    let fence = Fence::new(&ctx);
    assert!(!fence.is_null());
    assert_eq!(driver.live_fences(), 1);

    let status = fence.client_wait(Duration::from_millis(16));
    assert_eq!(status, WaitStatus::AlreadySignaled);
    assert!(status.is_signaled());
    assert!(fence.signaled());
    fence.wait();
    assert!(ctx.check_error().is_ok());

    drop(fence);
    assert_eq!(driver.live_fences(), 0);
}

#[test]
fn null_fence_fails_without_driver_errors() {
    let (driver, ctx) = setup();
    let fence = Fence::null(&ctx);

    assert_eq!(fence.client_wait(Duration::MAX), WaitStatus::WaitFailed);
    assert!(!fence.signaled());
    fence.wait();
    drop(fence);

    assert!(ctx.check_error().is_ok());
    assert_eq!(driver.live_fences(), 0);
}

#[test]
fn destroyed_fence_is_null() {
    let (driver, ctx) = setup();
    let mut fence = Fence::new(&ctx);

    fence.destroy();
    assert!(fence.is_null());
    fence.destroy();
    assert_eq!(driver.live_fences(), 0);
    assert!(ctx.check_error().is_ok());
}

#[test]
fn unknown_sync_fails_the_wait() {
    let (_driver, ctx) = setup();
    let status = glkit::Driver::client_wait_sync(ctx.driver(), 999, true, 0);

    assert_eq!(status, WaitStatus::WaitFailed);
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidValue),
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}
