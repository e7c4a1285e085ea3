//! Debug Output Tests
//!
//! Tests for:
//! - Callback delivery of driver errors and application messages
//! - Filtering by severity, id and source/type
//! - Debug groups and the group stack
//! - Debug settings applied at context creation

use std::cell::RefCell;
use std::rc::Rc;

use glkit::driver::soft::SoftDriver;
use glkit::{
    Capability, Context, ContextSettings, DebugFilter, DebugMessage, DebugSettings, DebugSeverity,
    DebugSource, DebugType, ErrorCode, GlError,
};

/// Owned copy of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    source: DebugSource,
    ty: DebugType,
    id: u32,
    severity: DebugSeverity,
    text: String,
}

type Inbox = Rc<RefCell<Vec<Record>>>;

fn setup() -> (Rc<SoftDriver>, Context) {
    let driver = Rc::new(SoftDriver::new());
    let ctx = Context::from_shared(driver.clone());
    (driver, ctx)
}

/// Installs a callback that copies every message into the returned inbox.
fn collect(ctx: &Context) -> Inbox {
    let inbox: Inbox = Rc::default();
    let sink = inbox.clone();
    ctx.set_debug_callback(move |message: &DebugMessage<'_>| {
        sink.borrow_mut().push(Record {
            source: message.source,
            ty: message.ty,
            id: message.id,
            severity: message.severity,
            text: message.message.to_owned(),
        });
    });
    inbox
}

fn ids(inbox: &Inbox) -> Vec<u32> {
    inbox.borrow().iter().map(|r| r.id).collect()
}

// ============================================================================
// Callback
// ============================================================================

#[test]
fn errors_are_reported_once_output_is_enabled() {
    let (_driver, ctx) = setup();
    let inbox = collect(&ctx);

    ctx.viewport(0, 0, -1, 1);
    assert!(inbox.borrow().is_empty());
    assert!(ctx.check_error().is_err());

    ctx.enable(Capability::DebugOutput);
    ctx.viewport(0, 0, -1, 1);

    let records = inbox.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, DebugSource::Api);
    assert_eq!(records[0].ty, DebugType::Error);
    assert_eq!(records[0].severity, DebugSeverity::High);
    assert_eq!(records[0].id, ErrorCode::InvalidValue.as_raw());
    assert!(records[0].text.contains("viewport"));
}

#[test]
fn application_messages() {
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    ctx.insert_debug_message(DebugType::Marker, 42, DebugSeverity::Notification, "frame start");
    assert_eq!(
        inbox.borrow().as_slice(),
        &[Record {
            source: DebugSource::Application,
            ty: DebugType::Marker,
            id: 42,
            severity: DebugSeverity::Notification,
            text: "frame start".to_owned(),
        }]
    );
}

#[test]
fn third_party_messages_only() {
    let (driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    glkit::Driver::debug_message_insert(
        &*driver,
        DebugSource::ThirdParty,
        DebugType::Other,
        1,
        DebugSeverity::Medium,
        "tool message",
    );
    assert_eq!(ids(&inbox), vec![1]);

    glkit::Driver::debug_message_insert(
        &*driver,
        DebugSource::Api,
        DebugType::Other,
        2,
        DebugSeverity::Medium,
        "spoofed",
    );
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidEnum),
        other => panic!("expected InvalidEnum, got {other:?}"),
    }
    assert!(!ids(&inbox).contains(&2));
}

#[test]
fn cleared_callback_receives_nothing() {
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    ctx.clear_debug_callback();
    ctx.insert_debug_message(DebugType::Marker, 1, DebugSeverity::High, "dropped");
    assert!(inbox.borrow().is_empty());
}

#[test]
fn log_callback_formats_messages() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    ctx.set_log_debug_callback();

    ctx.insert_debug_message(DebugType::Performance, 7, DebugSeverity::Medium, "slow path");
    ctx.viewport(0, 0, -4, -4);
    assert!(ctx.check_error().is_err());

    let message = DebugMessage {
        source: DebugSource::Application,
        ty: DebugType::Performance,
        id: 7,
        severity: DebugSeverity::Medium,
        message: "slow path",
    };
    assert_eq!(
        message.to_string(),
        "[GL][application]<performance>\t(7) slow path"
    );
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn low_severity_starts_disabled() {
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    ctx.insert_debug_message(DebugType::Other, 1, DebugSeverity::Low, "hidden");
    assert!(inbox.borrow().is_empty());

    ctx.set_debug_filter(&DebugFilter::any().severity(DebugSeverity::Low), true);
    ctx.insert_debug_message(DebugType::Other, 2, DebugSeverity::Low, "shown");
    assert_eq!(ids(&inbox), vec![2]);
}

#[test]
fn disabled_errors_still_set_the_flag() {
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    ctx.set_debug_filter(&DebugFilter::any().severity(DebugSeverity::High), false);
    ctx.scissor(0, 0, -1, -1);

    assert!(inbox.borrow().is_empty());
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidValue),
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn filter_by_ids() {
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    ctx.set_debug_filter(
        &DebugFilter::ids(DebugSource::Application, DebugType::Marker, &[7, 9]),
        false,
    );
    for id in 6..=9 {
        ctx.insert_debug_message(DebugType::Marker, id, DebugSeverity::High, "marker");
    }
    ctx.insert_debug_message(DebugType::Other, 7, DebugSeverity::High, "other");

    let records = inbox.borrow();
    let seen: Vec<(DebugType, u32)> = records.iter().map(|r| (r.ty, r.id)).collect();
    assert_eq!(
        seen,
        vec![
            (DebugType::Marker, 6),
            (DebugType::Marker, 8),
            (DebugType::Other, 7)
        ]
    );
}

#[test]
fn later_filters_take_precedence() {
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    ctx.set_debug_filter(&DebugFilter::any(), false);
    ctx.set_debug_filter(&DebugFilter::any().ty(DebugType::Portability), true);

    ctx.insert_debug_message(DebugType::Portability, 1, DebugSeverity::Medium, "kept");
    ctx.insert_debug_message(DebugType::Performance, 2, DebugSeverity::Medium, "dropped");
    assert_eq!(ids(&inbox), vec![1]);
}

#[test]
fn ids_with_a_severity_are_rejected() {
    let (_driver, ctx) = setup();
    let filter = DebugFilter::ids(DebugSource::Application, DebugType::Marker, &[1])
        .severity(DebugSeverity::High);

    ctx.set_debug_filter(&filter, false);
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidOperation),
        other => panic!("expected InvalidOperation, got {other:?}"),
    }
}

#[test]
fn filter_matching() {
    let message = DebugMessage {
        source: DebugSource::ShaderCompiler,
        ty: DebugType::Error,
        id: 3,
        severity: DebugSeverity::High,
        message: "",
    };

    assert!(DebugFilter::any().matches(&message));
    assert!(DebugFilter::any().source(DebugSource::ShaderCompiler).matches(&message));
    assert!(!DebugFilter::any().severity(DebugSeverity::Low).matches(&message));
    let by_id = |id| DebugFilter::ids(DebugSource::ShaderCompiler, DebugType::Error, &[id]);
    assert!(by_id(3).matches(&message));
    assert!(!by_id(4).matches(&message));
}

// ============================================================================
// Groups
// ============================================================================

#[test]
fn groups_nest_and_close_on_drop() {
    let (driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);
    let inbox = collect(&ctx);

    {
        let _frame = ctx.debug_group(1, "frame");
        {
            let _shadow = ctx.debug_group(2, "shadow pass");
            assert_eq!(driver.debug_group_depth(), 2);
        }
        assert_eq!(driver.debug_group_depth(), 1);
    }
    assert_eq!(driver.debug_group_depth(), 0);

    let seen: Vec<(DebugType, u32)> = inbox.borrow().iter().map(|r| (r.ty, r.id)).collect();
    assert_eq!(
        seen,
        vec![
            (DebugType::PushGroup, 1),
            (DebugType::PushGroup, 2),
            (DebugType::PopGroup, 2),
            (DebugType::PopGroup, 1),
        ]
    );
    assert!(ctx.check_error().is_ok());
}

#[test]
fn popping_an_empty_stack_underflows() {
    let (driver, ctx) = setup();

    glkit::Driver::pop_debug_group(&*driver);
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::StackUnderflow),
        other => panic!("expected StackUnderflow, got {other:?}"),
    }
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn settings_set_threshold_and_toggles() {
    let driver = Rc::new(SoftDriver::new());
    let settings = ContextSettings {
        debug: DebugSettings {
            enabled: true,
            synchronous: true,
            min_severity: DebugSeverity::Medium,
            log_messages: false,
        },
    };
    let ctx = Context::with_settings(driver.clone(), &settings);
    assert!(ctx.is_enabled(Capability::DebugOutput));
    assert!(ctx.is_enabled(Capability::DebugOutputSynchronous));

    let inbox = collect(&ctx);
    ctx.insert_debug_message(DebugType::Other, 1, DebugSeverity::Notification, "n");
    ctx.insert_debug_message(DebugType::Other, 2, DebugSeverity::Low, "l");
    ctx.insert_debug_message(DebugType::Other, 3, DebugSeverity::Medium, "m");
    ctx.insert_debug_message(DebugType::Other, 4, DebugSeverity::High, "h");
    assert_eq!(ids(&inbox), vec![3, 4]);
}

#[test]
fn disabled_settings_turn_output_off() {
    let (_driver, ctx) = setup();
    ctx.enable(Capability::DebugOutput);

    ctx.apply_debug_settings(&DebugSettings {
        enabled: false,
        ..DebugSettings::default()
    });
    assert!(!ctx.is_enabled(Capability::DebugOutput));
}

#[test]
fn debug_preset_forces_output_on() {
    let settings = ContextSettings::debug();
    assert!(settings.debug.enabled);
    assert!(settings.debug.log_messages);
    assert_eq!(settings.debug.min_severity, DebugSeverity::Low);
}
