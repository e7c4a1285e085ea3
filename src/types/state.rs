//! Global state enums: capabilities, faces, errors and object identifiers.

gl_enum! {
    /// Server-side capability toggled with `enable` / `disable`.
    pub enum Capability {
        Blend = 0x0BE2,
        CullFace = 0x0B44,
        DepthTest = 0x0B71,
        StencilTest = 0x0B90,
        ScissorTest = 0x0C11,
        Multisample = 0x809D,
        FramebufferSrgb = 0x8DB9,
        PrimitiveRestart = 0x8F9D,
        ProgramPointSize = 0x8642,
        TextureCubeMapSeamless = 0x884F,
        DebugOutput = 0x92E0,
        DebugOutputSynchronous = 0x8242,
    }
}

gl_enum! {
    pub enum Face {
        Front = 0x0404,
        Back = 0x0405,
        FrontAndBack = 0x0408,
    }
}

gl_enum! {
    /// Error recorded by the driver and returned by the error poll.
    pub enum ErrorCode {
        InvalidEnum = 0x0500,
        InvalidValue = 0x0501,
        InvalidOperation = 0x0502,
        StackOverflow = 0x0503,
        StackUnderflow = 0x0504,
        OutOfMemory = 0x0505,
        InvalidFramebufferOperation = 0x0506,
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidEnum => "invalid enum",
            Self::InvalidValue => "invalid value",
            Self::InvalidOperation => "invalid operation",
            Self::StackOverflow => "stack overflow",
            Self::StackUnderflow => "stack underflow",
            Self::OutOfMemory => "out of memory",
            Self::InvalidFramebufferOperation => "invalid framebuffer operation",
        };
        write!(f, "{name} (0x{:04X})", self.as_raw())
    }
}

gl_enum! {
    /// Object namespace, used for debug labels and logging.
    pub enum ObjectType {
        Buffer = 0x82E0,
        Shader = 0x82E1,
        Program = 0x82E2,
        VertexArray = 0x8074,
        Sampler = 0x82E6,
        Texture = 0x1702,
        Renderbuffer = 0x8D41,
        Framebuffer = 0x8D40,
        Sync = 0x9116,
    }
}

impl ObjectType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::Shader => "shader",
            Self::Program => "program",
            Self::VertexArray => "vertex array",
            Self::Sampler => "sampler",
            Self::Texture => "texture",
            Self::Renderbuffer => "renderbuffer",
            Self::Framebuffer => "framebuffer",
            Self::Sync => "fence",
        }
    }
}

gl_enum! {
    /// Result of a client-side fence wait.
    pub enum WaitStatus {
        AlreadySignaled = 0x911A,
        TimeoutExpired = 0x911B,
        ConditionSatisfied = 0x911C,
        WaitFailed = 0x911D,
    }
}

impl WaitStatus {
    /// Whether the fence was signaled by the time the wait returned.
    #[must_use]
    pub const fn is_signaled(self) -> bool {
        matches!(self, Self::AlreadySignaled | Self::ConditionSatisfied)
    }
}
