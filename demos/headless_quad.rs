//! Headless Quad Example
//!
//! Builds everything a textured quad needs on the software driver: vertex
//! and index buffers, a vertex array, a texture with a sampler, a program,
//! and an offscreen framebuffer with a depth attachment. Driver debug
//! messages are routed to `log`.
//!
//! Run with `RUST_LOG=debug cargo run --example headless_quad`.

use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use glam::{Mat4, Vec2, Vec3, Vec4};
use glkit::{
    ArrayBuffer, AttachmentSlot, AttributeDescriptor, BufferUsage, Context, ContextSettings,
    ElementArrayBuffer, Fence, Filter, Framebuffer, FramebufferTarget, InternalFormat,
    PixelFormat, Program, Renderbuffer, Sampler, SamplingParameters, Shader, SoftDriver,
    Texture2D, UniformBuffer, VertexArray, WrapMode,
};

const VERTEX: &str = r"#version 450 core
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;

uniform mat4 model;

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

uniform sampler2D albedo;
uniform vec4 tint;

out vec4 color;

void main() {
    color = tint * texture(albedo, v_uv);
}
";

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: Vec3,
    uv: Vec2,
}

const QUAD: [Vertex; 4] = [
    Vertex { position: Vec3::new(-1.0, -1.0, 0.0), uv: Vec2::new(0.0, 0.0) },
    Vertex { position: Vec3::new(1.0, -1.0, 0.0), uv: Vec2::new(1.0, 0.0) },
    Vertex { position: Vec3::new(1.0, 1.0, 0.0), uv: Vec2::new(1.0, 1.0) },
    Vertex { position: Vec3::new(-1.0, 1.0, 0.0), uv: Vec2::new(0.0, 1.0) },
];

const INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

const SIZE: u32 = 256;

fn checkerboard(size: u32) -> Vec<u8> {
    (0..size * size)
        .flat_map(|i| {
            let (x, y) = (i % size / 32, i / size / 32);
            if (x + y) % 2 == 0 { [255, 255, 255, 255] } else { [40, 40, 40, 255] }
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let driver = Rc::new(SoftDriver::new());
    let ctx = Context::with_settings(driver.clone(), &ContextSettings::debug());
    let _frame = ctx.debug_group(1, "headless quad");

    // Geometry
    let vbo = ArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &QUAD);
    let ibo = ElementArrayBuffer::with_data(&ctx, BufferUsage::StaticDraw, &INDICES);
    vbo.set_label("quad vertices");

    let stride = std::mem::size_of::<Vertex>() as u32;
    let vao = VertexArray::new(&ctx);
    vao.bind_buffer(0, &vbo, stride, 0);
    vao.bind_elements(&ibo);
    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(0, 0, 3));
    vao.bind_attribute(&AttributeDescriptor::typed::<f32>(0, 1, 2).with_offset(12));

    // Camera block
    let camera = UniformBuffer::with_data(&ctx, BufferUsage::DynamicDraw, &[Mat4::IDENTITY]);
    camera.bind_base(0);

    // Texture and sampler
    let albedo = Texture2D::with_storage(&ctx, 9, InternalFormat::Rgba8, [SIZE, SIZE]);
    albedo.upload_typed(0, [0, 0], [SIZE, SIZE], PixelFormat::Rgba, &checkerboard(SIZE));
    albedo.generate_mipmaps();
    albedo.bind_to_unit(0);

    let sampler = Sampler::new(&ctx);
    sampler.filter(Filter::LinearMipmapLinear, Filter::Linear);
    sampler.wrap(WrapMode::ClampToEdge, WrapMode::ClampToEdge, WrapMode::ClampToEdge);
    sampler.set_max_anisotropy(albedo.max_anisotropy().min(8.0));
    sampler.bind_to_unit(0);

    // Program
    let vs = Shader::vertex(&ctx, VERTEX)?;
    let fs = Shader::fragment(&ctx, FRAGMENT)?;
    let mut program = Program::from_shaders(&ctx, &[&vs, &fs])?;
    drop((vs, fs));

    program.use_program();
    program.uniform("model", Mat4::from_scale(Vec3::splat(0.5)));
    program.uniform("tint", Vec4::new(1.0, 0.8, 0.6, 1.0));
    program.uniform("albedo", 0i32);
    if !program.bind_uniform_block("Camera", 0) {
        bail!("program has no Camera block");
    }
    program.assert_valid()?;
    log::info!(
        "program {}: {} uniforms, {} attributes",
        program.raw(),
        program.active_uniform_count(),
        program.active_attribute_count()
    );

    // Offscreen target
    ctx.enable_depth_test(true);
    let color = Texture2D::with_storage(&ctx, 1, InternalFormat::Rgba8, [SIZE, SIZE]);
    let depth = Renderbuffer::with_storage(&ctx, InternalFormat::Depth24, SIZE, SIZE);
    let mut target = Framebuffer::new(&ctx);
    target.attach_texture(AttachmentSlot::Color(0), &color, 0);
    target.attach_renderbuffer(AttachmentSlot::Depth, &depth);
    target
        .assert_complete()
        .context("offscreen target is incomplete")?;

    target.bind(FramebufferTarget::Draw);
    ctx.viewport(0, 0, SIZE as i32, SIZE as i32);
    vao.bind();

    let fence = Fence::new(&ctx);
    let status = fence.client_wait(Duration::from_millis(100));
    log::info!("frame fence: {status:?}");

    ctx.bind_default_framebuffer(FramebufferTarget::Draw);
    ctx.check_error()?;

    // Keep a binary around for the next run.
    if let Some(binary) = program.binary() {
        log::info!("program binary: {} bytes", binary.data.len());
        let mut cached = Program::new(&ctx);
        cached.load_binary(&binary)?;
    }

    Ok(())
}
