//! Object parameter names and the values they carry.

gl_enum! {
    /// Texture and sampler parameters.
    pub enum TextureParameter {
        MagFilter = 0x2800,
        MinFilter = 0x2801,
        WrapS = 0x2802,
        WrapT = 0x2803,
        WrapR = 0x8072,
        MinLod = 0x813A,
        MaxLod = 0x813B,
        BaseLevel = 0x813C,
        MaxLevel = 0x813D,
        LodBias = 0x8501,
        BorderColor = 0x1004,
        CompareMode = 0x884C,
        CompareFunc = 0x884D,
        SwizzleRgba = 0x8E46,
        MaxAnisotropy = 0x84FE,
        DepthStencilMode = 0x90EA,
    }
}

/// Compare mode value that turns depth comparison on.
pub const COMPARE_REF_TO_TEXTURE: i32 = 0x884E;
/// Compare mode value that turns depth comparison off.
pub const COMPARE_NONE: i32 = 0;

gl_enum! {
    pub enum BufferParameter {
        Size = 0x8764,
        Usage = 0x8765,
        Access = 0x88BB,
        Mapped = 0x88BC,
        AccessFlags = 0x911F,
        ImmutableStorage = 0x821F,
        StorageFlags = 0x8220,
        MapOffset = 0x9121,
        MapLength = 0x9120,
    }
}

gl_enum! {
    pub enum ShaderParameter {
        ShaderType = 0x8B4F,
        DeleteStatus = 0x8B80,
        CompileStatus = 0x8B81,
        InfoLogLength = 0x8B84,
        SourceLength = 0x8B88,
        SpirvBinary = 0x9552,
    }
}

gl_enum! {
    pub enum ProgramParameter {
        DeleteStatus = 0x8B80,
        LinkStatus = 0x8B82,
        ValidateStatus = 0x8B83,
        InfoLogLength = 0x8B84,
        AttachedShaders = 0x8B85,
        ActiveUniforms = 0x8B86,
        ActiveUniformMaxLength = 0x8B87,
        ActiveAttributes = 0x8B89,
        ActiveAttributeMaxLength = 0x8B8A,
        ActiveUniformBlocks = 0x8A36,
        BinaryLength = 0x8741,
        BinaryRetrievableHint = 0x8257,
        Separable = 0x8258,
    }
}

gl_enum! {
    /// Per-attribute state of a vertex array.
    pub enum VertexAttribParameter {
        Enabled = 0x8622,
        Size = 0x8623,
        Stride = 0x8624,
        Type = 0x8625,
        Normalized = 0x886A,
        Integer = 0x88FD,
        Long = 0x874E,
        Divisor = 0x88FE,
        Binding = 0x82D4,
        RelativeOffset = 0x82D5,
    }
}

/// Value of a texture or sampler parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    Ints([i32; 4]),
    Floats([f32; 4]),
}

impl ParamValue {
    /// The value as a single integer, truncating floats and reading the first
    /// element of vectors.
    #[must_use]
    pub fn as_int(self) -> i32 {
        match self {
            Self::Int(v) => v,
            Self::Float(v) => v as i32,
            Self::Ints(v) => v[0],
            Self::Floats(v) => v[0] as i32,
        }
    }

    #[must_use]
    pub fn as_float(self) -> f32 {
        match self {
            Self::Int(v) => v as f32,
            Self::Float(v) => v,
            Self::Ints(v) => v[0] as f32,
            Self::Floats(v) => v[0],
        }
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<[f32; 4]> for ParamValue {
    fn from(v: [f32; 4]) -> Self {
        Self::Floats(v)
    }
}

impl From<[i32; 4]> for ParamValue {
    fn from(v: [i32; 4]) -> Self {
        Self::Ints(v)
    }
}
