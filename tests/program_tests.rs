//! Shader & Program Tests
//!
//! Tests for:
//! - GLSL compilation, file loading and SPIR-V specialization
//! - Linking, validation and the info logs reported on failure
//! - Interface queries: uniforms, attributes, uniform blocks
//! - Program binaries
//! - Deferred shader deletion

use std::rc::Rc;

use glam::{Mat4, Vec4};
use glkit::driver::soft::{DriverCall, SoftDriver};
use glkit::{
    Context, ErrorCode, GlError, ObjectType, Program, ProgramBinary, ProgramState, Shader,
    ShaderKind, ShaderState, UniformLocation, UniformValue,
};

const VERTEX: &str = r"#version 450 core
layout(location = 0) in vec3 position;
in vec2 uv;

uniform mat4 model;
uniform vec4 tint;

layout(std140, binding = 0) uniform Camera {
    mat4 view_projection;
};

out vec2 v_uv;

void main() {
    v_uv = uv;
    gl_Position = view_projection * model * vec4(position, 1.0);
}
";

const FRAGMENT: &str = r"#version 450 core
in vec2 v_uv;

uniform vec4 tint;
uniform sampler2D albedo;
uniform float weights[4];

out vec4 color;

void main() {
    color = tint * texture(albedo, v_uv) * weights[0];
}
";

fn setup() -> (Rc<SoftDriver>, Context) {
    let driver = Rc::new(SoftDriver::new());
    let ctx = Context::from_shared(driver.clone());
    (driver, ctx)
}

fn linked_program(ctx: &Context) -> Program {
    let vs = Shader::vertex(ctx, VERTEX).expect("vertex shader compiles");
    let fs = Shader::fragment(ctx, FRAGMENT).expect("fragment shader compiles");
    Program::from_shaders(ctx, &[&vs, &fs]).expect("program links")
}

fn spirv_module(entry_point: &str) -> Vec<u8> {
    let mut module = 0x0723_0203u32.to_le_bytes().to_vec();
    module.extend_from_slice(&[0; 16]);
    module.extend_from_slice(entry_point.as_bytes());
    module.push(0);
    while module.len() % 4 != 0 {
        module.push(0);
    }
    module
}

// ============================================================================
// Shaders
// ============================================================================

#[test]
fn glsl_compiles() {
    let (_driver, ctx) = setup();
    let shader = Shader::vertex(&ctx, VERTEX).unwrap();

    assert_eq!(shader.state(), ShaderState::Compiled);
    assert_eq!(shader.kind(), ShaderKind::Vertex);
    assert!(shader.compile_status());
    assert!(shader.info_log().is_empty());
    assert_eq!(shader.source(), VERTEX);
}

#[test]
fn sources_are_concatenated() {
    let (_driver, ctx) = setup();
    let shader = Shader::from_sources(
        &ctx,
        ShaderKind::Fragment,
        &["#version 450 core\n", "out vec4 c;\n", "void main() { c = vec4(1.0); }\n"],
    )
    .unwrap();

    assert!(shader.source().starts_with("#version 450 core\nout vec4 c;"));
}

#[test]
fn compile_failure_carries_the_log() {
    let (_driver, ctx) = setup();
    let err = Shader::fragment(&ctx, "#version 450 core\n#error no fragment path\nvoid main() {}")
        .unwrap_err();

    match err {
        GlError::ShaderCompile { kind, log } => {
            assert_eq!(kind, ShaderKind::Fragment);
            assert!(log.contains("0:2(0)"), "{log}");
            assert!(log.contains("#error no fragment path"), "{log}");
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert!(ctx.check_error().is_ok());
}

#[test]
fn missing_main_fails() {
    let (_driver, ctx) = setup();
    let mut shader = Shader::new(&ctx, ShaderKind::Vertex);
    assert_eq!(shader.state(), ShaderState::Uncompiled);

    assert!(!shader.compile_glsl(&["uniform float unused;"]));
    assert_eq!(shader.state(), ShaderState::Failed);
    assert!(shader.check_compiled().is_err());

    assert!(shader.compile_glsl(&["void main() {}"]));
    assert!(shader.check_compiled().is_ok());
}

#[test]
fn stage_from_file_name() {
    let (_driver, ctx) = setup();
    let path = std::env::temp_dir().join(format!("glkit-{}-tint.frag", std::process::id()));
    std::fs::write(&path, FRAGMENT).unwrap();

    let shader = Shader::from_file(&ctx, &path);
    std::fs::remove_file(&path).unwrap();

    let shader = shader.unwrap();
    assert_eq!(shader.kind(), ShaderKind::Fragment);
    assert_eq!(shader.state(), ShaderState::Compiled);
}

#[test]
fn unknown_extension_is_rejected() {
    let (driver, ctx) = setup();
    let err = Shader::from_file(&ctx, "shaders/notes.txt").unwrap_err();

    assert!(matches!(err, GlError::UnknownShaderExtension(ref name) if name.contains("notes.txt")));
    assert_eq!(driver.live_objects(ObjectType::Shader), 0);
}

#[test]
fn missing_file_is_an_io_error() {
    let (_driver, ctx) = setup();
    let err = Shader::from_file(&ctx, "/nonexistent/glkit/missing.vert").unwrap_err();
    assert!(matches!(err, GlError::Io(_)));
}

#[test]
fn spirv_entry_points() {
    let (_driver, ctx) = setup();
    let module = spirv_module("main");

    let shader = Shader::from_spirv(&ctx, ShaderKind::Vertex, &module, "main").unwrap();
    assert_eq!(shader.state(), ShaderState::Compiled);

    let err = Shader::from_spirv(&ctx, ShaderKind::Vertex, &module, "vs_main").unwrap_err();
    match err {
        GlError::ShaderCompile { log, .. } => assert!(log.contains("vs_main"), "{log}"),
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert!(ctx.check_error().is_ok());
}

#[test]
fn malformed_spirv_is_rejected() {
    let (_driver, ctx) = setup();
    let result = Shader::from_spirv(&ctx, ShaderKind::Fragment, &[0u8; 8], "main");

    assert!(matches!(result, Err(GlError::ShaderCompile { .. })));
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidValue),
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn attached_shader_deletion_is_deferred() {
    let (driver, ctx) = setup();
    let program = Program::new(&ctx);
    let vs = Shader::vertex(&ctx, VERTEX).unwrap();

    program.attach(&vs);
    drop(vs);
    assert_eq!(driver.live_objects(ObjectType::Shader), 1);
    assert_eq!(program.attached_shader_count(), 1);

    drop(program);
    assert_eq!(driver.live_objects(ObjectType::Shader), 0);
}

// ============================================================================
// Linking
// ============================================================================

#[test]
fn link_detaches_its_shaders() {
    let (_driver, ctx) = setup();
    let program = linked_program(&ctx);

    assert_eq!(program.state(), ProgramState::Linked);
    assert!(program.link_status());
    assert_eq!(program.attached_shader_count(), 0);
    assert!(program.info_log().is_empty());
}

#[test]
fn interface_counts() {
    let (_driver, ctx) = setup();
    let program = linked_program(&ctx);

    // model, tint, albedo, weights
    assert_eq!(program.active_uniform_count(), 4);
    assert_eq!(program.active_attribute_count(), 2);
    assert_eq!(program.active_uniform_block_count(), 1);
    assert_eq!(program.longest_active_attribute_name(), "position".len() + 1);
}

#[test]
fn conflicting_uniforms_fail_to_link() {
    let (_driver, ctx) = setup();
    let vs = Shader::vertex(&ctx, "uniform vec3 tint;\nvoid main() {}").unwrap();
    let fs = Shader::fragment(&ctx, "uniform vec4 tint;\nvoid main() {}").unwrap();

    let err = Program::from_shaders(&ctx, &[&vs, &fs]).unwrap_err();
    match err {
        GlError::ProgramLink { log } => assert!(log.contains("tint"), "{log}"),
        other => panic!("expected a link error, got {other:?}"),
    }
}

#[test]
fn compute_links_alone() {
    let (_driver, ctx) = setup();
    let cs = Shader::compute(&ctx, "layout(local_size_x = 64) in;\nvoid main() {}").unwrap();
    let vs = Shader::vertex(&ctx, VERTEX).unwrap();

    assert!(Program::from_shaders(&ctx, &[&cs]).is_ok());
    assert!(matches!(
        Program::from_shaders(&ctx, &[&cs, &vs]),
        Err(GlError::ProgramLink { .. })
    ));
}

#[test]
fn duplicate_attribute_locations_fail() {
    let (_driver, ctx) = setup();
    let vs = Shader::vertex(
        &ctx,
        "layout(location = 1) in vec3 a;\nlayout(location = 1) in vec3 b;\nvoid main() {}",
    )
    .unwrap();

    let mut program = Program::new(&ctx);
    assert!(program.link(&[&vs]).is_err());
    assert_eq!(program.state(), ProgramState::LinkFailed);
    assert!(program.info_log().contains("location 1"));
}

#[test]
fn empty_program_fails_to_link() {
    let (_driver, ctx) = setup();
    let mut program = Program::new(&ctx);

    assert!(!program.link_attached());
    assert!(!program.state().is_linked());
    assert!(program.assert_linked().is_err());
}

#[test]
fn validation() {
    let (_driver, ctx) = setup();
    let mut program = linked_program(&ctx);

    assert!(program.validate());
    assert_eq!(program.state(), ProgramState::Validated);
    assert!(program.validation_status());
    assert!(program.assert_valid().is_ok());

    let mut unlinked = Program::new(&ctx);
    assert!(!unlinked.validate());
    assert_eq!(unlinked.state(), ProgramState::Empty);
    assert!(matches!(
        unlinked.assert_valid(),
        Err(GlError::ProgramValidation { .. })
    ));

    assert!(!Program::null(&ctx).validate());
}

#[test]
fn validating_a_failed_link_keeps_the_link_log() {
    let (driver, ctx) = setup();
    let vs = Shader::vertex(
        &ctx,
        "layout(location = 1) in vec3 a;\nlayout(location = 1) in vec3 b;\nvoid main() {}",
    )
    .unwrap();

    let mut program = Program::new(&ctx);
    assert!(program.link(&[&vs]).is_err());
    driver.clear_calls();

    assert!(!program.validate());
    assert!(driver.calls().contains(&DriverCall::ValidateProgram(program.raw())));
    assert_eq!(program.state(), ProgramState::LinkFailed);
    assert!(!program.state().is_linked());
    assert!(program.info_log().contains("location 1"));
    assert!(matches!(
        program.assert_linked(),
        Err(GlError::ProgramLink { log }) if log.contains("location 1")
    ));
}

#[test]
fn use_program_requires_a_link() {
    let (driver, ctx) = setup();
    let program = linked_program(&ctx);

    program.use_program();
    assert_eq!(driver.current_program(), program.raw());

    let unlinked = Program::new(&ctx);
    unlinked.use_program();
    assert_eq!(driver.current_program(), program.raw());
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidOperation),
        other => panic!("expected InvalidOperation, got {other:?}"),
    }
}

// ============================================================================
// Interface
// ============================================================================

#[test]
fn uniform_uploads() {
    let (driver, ctx) = setup();
    let program = linked_program(&ctx);

    let tint = Vec4::new(1.0, 0.5, 0.25, 1.0);
    assert!(program.uniform("tint", tint));
    assert!(program.uniform("albedo", 3i32));
    program.set_uniform(program.uniform_location("model"), Mat4::IDENTITY);
    assert!(ctx.check_error().is_ok());

    let location = program.uniform_location("tint");
    assert_eq!(
        driver.uniform_value(program.raw(), location.0),
        Some(UniformValue::Vec4(tint))
    );
    assert_eq!(
        driver.uniform_value(program.raw(), program.uniform_location("albedo").0),
        Some(UniformValue::Int(3))
    );
}

#[test]
fn array_uniforms_resolve_with_or_without_index() {
    let (_driver, ctx) = setup();
    let program = linked_program(&ctx);

    let bare = program.uniform_location("weights");
    assert!(bare.is_valid());
    assert_eq!(program.uniform_location("weights[0]"), bare);
}

#[test]
fn unknown_uniforms_are_ignored() {
    let (_driver, ctx) = setup();
    let program = linked_program(&ctx);

    assert_eq!(program.uniform_location("exposure"), UniformLocation::NONE);
    assert!(!program.uniform("exposure", 1.0f32));
    program.set_uniform(UniformLocation::NONE, 1.0f32);
    assert!(ctx.check_error().is_ok());
}

#[test]
fn mismatched_uniform_type_is_rejected() {
    let (_driver, ctx) = setup();
    let program = linked_program(&ctx);

    program.uniform("tint", 1.0f32);
    match ctx.check_error() {
        Err(GlError::Driver(code)) => assert_eq!(code, ErrorCode::InvalidOperation),
        other => panic!("expected InvalidOperation, got {other:?}"),
    }
}

#[test]
fn attribute_locations() {
    let (_driver, ctx) = setup();
    let program = linked_program(&ctx);

    assert_eq!(program.attrib_location("position"), Some(0));
    assert_eq!(program.attrib_location("uv"), Some(1));
    assert_eq!(program.attrib_location("normal"), None);
}

#[test]
fn uniform_block_bindings() {
    let (driver, ctx) = setup();
    let program = linked_program(&ctx);

    assert_eq!(program.uniform_block_index("Camera"), Some(0));
    assert!(program.bind_uniform_block("Camera", 2));
    assert_eq!(driver.uniform_block_binding(program.raw(), 0), Some(2));

    assert_eq!(program.uniform_block_index("Lights"), None);
    assert!(!program.bind_uniform_block("Lights", 1));
    assert!(ctx.check_error().is_ok());
}

// ============================================================================
// Binaries
// ============================================================================

#[test]
fn binary_round_trip() {
    let (_driver, ctx) = setup();
    let source = linked_program(&ctx);
    source.hint_binary_retrievable(true);
    let binary = source.binary().expect("linked programs have a binary");

    let mut restored = Program::new(&ctx);
    restored.load_binary(&binary).unwrap();

    assert_eq!(restored.state(), ProgramState::Linked);
    assert_eq!(
        restored.uniform_location("tint"),
        source.uniform_location("tint")
    );
    assert_eq!(restored.attrib_location("uv"), Some(1));
    assert_eq!(restored.uniform_block_index("Camera"), Some(0));
}

#[test]
fn foreign_binary_is_rejected() {
    let (_driver, ctx) = setup();
    let mut program = Program::new(&ctx);
    let binary = ProgramBinary {
        format: 0x1234,
        data: b"not a program".to_vec(),
    };

    assert!(matches!(
        program.load_binary(&binary),
        Err(GlError::ProgramBinaryRejected)
    ));
    assert_eq!(program.state(), ProgramState::LinkFailed);
    assert!(program.info_log().contains("unknown binary format"));
}

#[test]
fn unlinked_program_has_no_binary() {
    let (_driver, ctx) = setup();
    let program = Program::new(&ctx);

    assert!(program.binary().is_none());
    assert!(matches!(
        Program::null(&ctx).load_binary(&ProgramBinary {
            format: 0,
            data: Vec::new()
        }),
        Err(GlError::NullHandle(_))
    ));
}
