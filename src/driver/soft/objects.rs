//! Object state kept by the software driver.

use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

use super::glsl::{Declarations, Variable};
use crate::driver::RawHandle;
use crate::resources::uniform::UniformValue;
use crate::types::{
    AttachmentSlot, BufferUsage, ComponentType, CompareFunc, CompressedFormat, DepthStencilMode,
    Filter, ImageAspect, InternalFormat, MapAccess, MapFlags, ParamValue, ShaderKind,
    StorageFlags, Swizzle, TextureParameter, TextureType, WrapMode,
};

/// An error the driver records instead of performing a call.
#[derive(Debug, Clone)]
pub(super) struct Fault {
    pub code: crate::types::ErrorCode,
    pub message: String,
}

impl Fault {
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self {
            code: crate::types::ErrorCode::InvalidValue,
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self {
            code: crate::types::ErrorCode::InvalidOperation,
            message: message.into(),
        }
    }

    pub fn invalid_enum(message: impl Into<String>) -> Self {
        Self {
            code: crate::types::ErrorCode::InvalidEnum,
            message: message.into(),
        }
    }
}

pub(super) type Op<T> = Result<T, Fault>;

/// Common behaviour of entries in an object table.
pub(super) trait SoftObject {
    const NAME: &'static str;

    /// Whether the name has been bound once and so has a type.
    fn committed(&self) -> bool {
        true
    }
}

pub(super) type Table<T> = FxHashMap<RawHandle, T>;

// ============================================================================
// Buffers
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub(super) struct Mapping {
    pub offset: usize,
    pub length: usize,
    pub access: MapAccess,
    pub flags: MapFlags,
}

#[derive(Debug, Default)]
pub(super) struct BufferObject {
    pub committed: bool,
    pub data: Vec<u8>,
    pub usage: BufferUsage,
    pub immutable: bool,
    pub storage_flags: StorageFlags,
    pub mapping: Option<Mapping>,
}

impl SoftObject for BufferObject {
    const NAME: &'static str = "buffer";

    fn committed(&self) -> bool {
        self.committed
    }
}

impl BufferObject {
    pub fn check_range(&self, offset: usize, len: usize) -> Op<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Fault::invalid_value(format!(
                "range {offset}+{len} exceeds buffer size {}",
                self.data.len()
            ))),
        }
    }

    /// Fails while a non-persistent mapping is active.
    pub fn check_unmapped(&self) -> Op<()> {
        match self.mapping {
            Some(m) if !m.flags.contains(MapFlags::PERSISTENT) => {
                Err(Fault::invalid_operation("buffer is mapped"))
            }
            _ => Ok(()),
        }
    }

    pub fn check_reallocatable(&self) -> Op<()> {
        if self.immutable {
            return Err(Fault::invalid_operation("buffer storage is immutable"));
        }
        if self.mapping.is_some() {
            return Err(Fault::invalid_operation("buffer is mapped"));
        }
        Ok(())
    }
}

// ============================================================================
// Sampling state
// ============================================================================

/// Parameter table shared by textures and samplers.
#[derive(Debug, Default)]
pub(super) struct SamplingState(FxHashMap<TextureParameter, ParamValue>);

impl SamplingState {
    pub fn set(
        &mut self,
        pname: TextureParameter,
        value: ParamValue,
        max_anisotropy: f32,
    ) -> Op<()> {
        match pname {
            TextureParameter::MaxAnisotropy => {
                let v = value.as_float();
                if !(1.0..=max_anisotropy).contains(&v) {
                    return Err(Fault::invalid_value(format!(
                        "anisotropy {v} outside [1, {max_anisotropy}]"
                    )));
                }
            }
            TextureParameter::BaseLevel | TextureParameter::MaxLevel if value.as_int() < 0 => {
                return Err(Fault::invalid_value("negative mip level"));
            }
            _ => {}
        }
        self.0.insert(pname, value);
        Ok(())
    }

    pub fn get(&self, pname: TextureParameter) -> ParamValue {
        self.0
            .get(&pname)
            .copied()
            .unwrap_or_else(|| default_parameter(pname))
    }
}

fn default_parameter(pname: TextureParameter) -> ParamValue {
    let raw = |v: u32| ParamValue::Int(v as i32);
    match pname {
        TextureParameter::MagFilter => raw(Filter::Linear.as_raw()),
        TextureParameter::MinFilter => raw(Filter::NearestMipmapLinear.as_raw()),
        TextureParameter::WrapS | TextureParameter::WrapT | TextureParameter::WrapR => {
            raw(WrapMode::Repeat.as_raw())
        }
        TextureParameter::MinLod => ParamValue::Float(-1000.0),
        TextureParameter::MaxLod => ParamValue::Float(1000.0),
        TextureParameter::BaseLevel | TextureParameter::CompareMode => ParamValue::Int(0),
        TextureParameter::MaxLevel => ParamValue::Int(1000),
        TextureParameter::LodBias => ParamValue::Float(0.0),
        TextureParameter::BorderColor => ParamValue::Floats([0.0; 4]),
        TextureParameter::CompareFunc => raw(CompareFunc::LessEqual.as_raw()),
        TextureParameter::SwizzleRgba => ParamValue::Ints([
            Swizzle::Red.as_raw() as i32,
            Swizzle::Green.as_raw() as i32,
            Swizzle::Blue.as_raw() as i32,
            Swizzle::Alpha.as_raw() as i32,
        ]),
        TextureParameter::MaxAnisotropy => ParamValue::Float(1.0),
        TextureParameter::DepthStencilMode => raw(DepthStencilMode::Depth.as_raw()),
    }
}

// ============================================================================
// Textures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StorageFormat {
    Uncompressed(InternalFormat),
    Compressed(CompressedFormat),
}

#[derive(Debug, Clone, Copy)]
pub(super) struct TextureStorage {
    pub format: StorageFormat,
    pub extent: [u32; 3],
    pub levels: u32,
    pub samples: u32,
    pub immutable: bool,
}

impl TextureStorage {
    pub fn aspect(&self) -> ImageAspect {
        match self.format {
            StorageFormat::Uncompressed(format) => format.aspect(),
            StorageFormat::Compressed(_) => ImageAspect::Color,
        }
    }

    /// Extent of `level`; only the axes that are not layers shrink.
    pub fn level_extent(&self, target: TextureType, level: u32) -> [u32; 3] {
        let shrink = |v: u32| (v >> level).max(1);
        let [x, y, z] = self.extent;
        match target {
            TextureType::Tex1D | TextureType::Tex1DArray => [shrink(x), y, z],
            TextureType::Tex3D => [shrink(x), shrink(y), shrink(z)],
            _ => [shrink(x), shrink(y), z],
        }
    }

    /// Number of layers a single level can be addressed by.
    pub fn layers(&self, target: TextureType, level: u32) -> u32 {
        match target {
            TextureType::Tex1DArray => self.extent[1],
            TextureType::Tex2DArray
            | TextureType::Tex2DMultisampleArray
            | TextureType::CubeMapArray => self.extent[2],
            TextureType::Tex3D => self.level_extent(target, level)[2],
            TextureType::CubeMap => 6,
            _ => 1,
        }
    }
}

/// Number of levels in a full mip chain for `extent`.
pub(super) fn full_mip_chain(target: TextureType, extent: [u32; 3]) -> u32 {
    let largest = match target {
        TextureType::Tex1D | TextureType::Tex1DArray => extent[0],
        TextureType::Tex3D => extent[0].max(extent[1]).max(extent[2]),
        _ => extent[0].max(extent[1]),
    };
    u32::BITS - largest.max(1).leading_zeros()
}

#[derive(Debug, Default)]
pub(super) struct TextureObject {
    pub target: Option<TextureType>,
    pub storage: Option<TextureStorage>,
    pub sampling: SamplingState,
}

impl SoftObject for TextureObject {
    const NAME: &'static str = "texture";

    fn committed(&self) -> bool {
        self.target.is_some()
    }
}

impl TextureObject {
    pub fn target(&self) -> TextureType {
        self.target.unwrap_or(TextureType::Tex2D)
    }

    pub fn storage(&self) -> Op<&TextureStorage> {
        self.storage
            .as_ref()
            .ok_or_else(|| Fault::invalid_operation("texture has no storage"))
    }

    pub fn check_mutable(&self) -> Op<()> {
        match self.storage {
            Some(s) if s.immutable => Err(Fault::invalid_operation("texture storage is immutable")),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct SamplerObject {
    pub sampling: SamplingState,
}

impl SoftObject for SamplerObject {
    const NAME: &'static str = "sampler";
}

// ============================================================================
// Framebuffers & Renderbuffers
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub(super) struct RenderbufferStorage {
    pub format: InternalFormat,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

#[derive(Debug, Default)]
pub(super) struct RenderbufferObject {
    pub committed: bool,
    pub storage: Option<RenderbufferStorage>,
}

impl SoftObject for RenderbufferObject {
    const NAME: &'static str = "renderbuffer";

    fn committed(&self) -> bool {
        self.committed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AttachedImage {
    Texture {
        texture: RawHandle,
        level: u32,
        layer: Option<u32>,
    },
    Renderbuffer(RawHandle),
}

#[derive(Debug)]
pub(super) struct FramebufferObject {
    pub committed: bool,
    pub attachments: FxHashMap<AttachmentSlot, AttachedImage>,
    pub draw_buffers: SmallVec<[Option<AttachmentSlot>; 8]>,
    pub read_buffer: Option<AttachmentSlot>,
}

impl Default for FramebufferObject {
    fn default() -> Self {
        Self {
            committed: false,
            attachments: FxHashMap::default(),
            draw_buffers: smallvec![Some(AttachmentSlot::Color(0))],
            read_buffer: Some(AttachmentSlot::Color(0)),
        }
    }
}

impl SoftObject for FramebufferObject {
    const NAME: &'static str = "framebuffer";

    fn committed(&self) -> bool {
        self.committed
    }
}

/// What completeness checking needs to know about one attached image.
#[derive(Debug, Clone, Copy)]
pub(super) struct ImageInfo {
    pub aspect: ImageAspect,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub layered: bool,
}

// ============================================================================
// Vertex Arrays
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct VertexBinding {
    pub buffer: RawHandle,
    pub offset: usize,
    pub stride: u32,
    pub divisor: u32,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct AttribState {
    pub enabled: bool,
    pub binding: u32,
    pub components: u32,
    pub ty: ComponentType,
    pub normalized: bool,
    pub integer: bool,
    pub long: bool,
    pub relative_offset: u32,
}

impl AttribState {
    pub fn new(location: u32) -> Self {
        Self {
            enabled: false,
            binding: location,
            components: 4,
            ty: ComponentType::F32,
            normalized: false,
            integer: false,
            long: false,
            relative_offset: 0,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct VertexArrayObject {
    pub committed: bool,
    pub element_buffer: RawHandle,
    pub bindings: FxHashMap<u32, VertexBinding>,
    pub attribs: FxHashMap<u32, AttribState>,
}

impl SoftObject for VertexArrayObject {
    const NAME: &'static str = "vertex array";

    fn committed(&self) -> bool {
        self.committed
    }
}

impl VertexArrayObject {
    pub fn attrib(&mut self, location: u32) -> &mut AttribState {
        self.attribs
            .entry(location)
            .or_insert_with(|| AttribState::new(location))
    }

    pub fn attrib_state(&self, location: u32) -> AttribState {
        self.attribs
            .get(&location)
            .copied()
            .unwrap_or_else(|| AttribState::new(location))
    }
}

// ============================================================================
// Shaders & Programs
// ============================================================================

#[derive(Debug)]
pub(super) struct ShaderObject {
    pub kind: ShaderKind,
    pub source: String,
    pub spirv: Option<Vec<u8>>,
    pub compiled: bool,
    pub log: String,
    pub decls: Declarations,
    pub delete_pending: bool,
}

impl ShaderObject {
    pub fn new(kind: ShaderKind) -> Self {
        Self {
            kind,
            source: String::new(),
            spirv: None,
            compiled: false,
            log: String::new(),
            decls: Declarations::default(),
            delete_pending: false,
        }
    }
}

impl SoftObject for ShaderObject {
    const NAME: &'static str = "shader";
}

/// Linked interface of a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Interface {
    /// Location is the index.
    pub uniforms: Vec<Variable>,
    pub attributes: Vec<Variable>,
    pub blocks: Vec<String>,
}

#[derive(Debug, Default)]
pub(super) struct ProgramObject {
    pub attached: SmallVec<[RawHandle; 4]>,
    pub linked: bool,
    pub validated: bool,
    pub log: String,
    pub binary_retrievable: bool,
    pub separable: bool,
    pub interface: Interface,
    pub uniform_values: FxHashMap<i32, UniformValue>,
    pub block_bindings: FxHashMap<u32, u32>,
}

impl SoftObject for ProgramObject {
    const NAME: &'static str = "program";
}

impl ProgramObject {
    pub fn check_linked(&self) -> Op<()> {
        if self.linked {
            Ok(())
        } else {
            Err(Fault::invalid_operation("program is not linked"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {
        assert_eq!(full_mip_chain(TextureType::Tex2D, [256, 64, 1]), 9);
        assert_eq!(full_mip_chain(TextureType::Tex1DArray, [16, 300, 1]), 5);
        assert_eq!(full_mip_chain(TextureType::Tex3D, [4, 4, 32]), 6);
        assert_eq!(full_mip_chain(TextureType::Tex2D, [1, 1, 1]), 1);
    }

    #[test]
    fn array_layers_do_not_shrink() {
        let storage = TextureStorage {
            format: StorageFormat::Uncompressed(InternalFormat::Rgba8),
            extent: [64, 32, 6],
            levels: 4,
            samples: 0,
            immutable: true,
        };
        assert_eq!(storage.level_extent(TextureType::Tex2DArray, 2), [16, 8, 6]);
        assert_eq!(storage.level_extent(TextureType::Tex3D, 2), [16, 8, 1]);
        assert_eq!(storage.layers(TextureType::Tex2DArray, 3), 6);
    }
}
