//! Image formats.

gl_enum! {
    /// Sized internal format of texture or renderbuffer storage.
    pub enum InternalFormat {
        R8 = 0x8229,
        Rg8 = 0x822B,
        Rgb8 = 0x8051,
        Rgba8 = 0x8058,
        Srgb8 = 0x8C41,
        Srgb8Alpha8 = 0x8C43,
        R16F = 0x822D,
        Rg16F = 0x822F,
        Rgb16F = 0x881B,
        Rgba16F = 0x881A,
        R32F = 0x822E,
        Rg32F = 0x8230,
        Rgb32F = 0x8815,
        Rgba32F = 0x8814,
        R32I = 0x8235,
        R32UI = 0x8236,
        Rgba32UI = 0x8D70,
        R11FG11FB10F = 0x8C3A,
        Rgb10A2 = 0x8059,
        Depth16 = 0x81A5,
        Depth24 = 0x81A6,
        Depth32F = 0x8CAC,
        Depth24Stencil8 = 0x88F0,
        Depth32FStencil8 = 0x8CAD,
        Stencil8 = 0x8D48,
    }
}

/// Which planes of an image a format stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAspect {
    Color,
    Depth,
    Stencil,
    DepthStencil,
}

impl ImageAspect {
    #[must_use]
    pub const fn has_depth(self) -> bool {
        matches!(self, Self::Depth | Self::DepthStencil)
    }

    #[must_use]
    pub const fn has_stencil(self) -> bool {
        matches!(self, Self::Stencil | Self::DepthStencil)
    }
}

impl InternalFormat {
    #[must_use]
    pub const fn aspect(self) -> ImageAspect {
        match self {
            Self::Depth16 | Self::Depth24 | Self::Depth32F => ImageAspect::Depth,
            Self::Depth24Stencil8 | Self::Depth32FStencil8 => ImageAspect::DepthStencil,
            Self::Stencil8 => ImageAspect::Stencil,
            _ => ImageAspect::Color,
        }
    }

    /// Bytes per texel.
    #[must_use]
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            Self::R8 | Self::Stencil8 => 1,
            Self::Rg8 | Self::R16F | Self::Depth16 => 2,
            Self::Rgb8 | Self::Srgb8 | Self::Depth24 => 3,
            Self::Rgba8
            | Self::Srgb8Alpha8
            | Self::Rg16F
            | Self::R32F
            | Self::R32I
            | Self::R32UI
            | Self::R11FG11FB10F
            | Self::Rgb10A2
            | Self::Depth32F
            | Self::Depth24Stencil8 => 4,
            Self::Rgb16F => 6,
            Self::Rgba16F | Self::Rg32F | Self::Depth32FStencil8 => 8,
            Self::Rgb32F => 12,
            Self::Rgba32F | Self::Rgba32UI => 16,
        }
    }
}

gl_enum! {
    /// Layout of client pixel data in a transfer.
    pub enum PixelFormat {
        Red = 0x1903,
        Rg = 0x8227,
        Rgb = 0x1907,
        Rgba = 0x1908,
        Bgr = 0x80E0,
        Bgra = 0x80E1,
        RedInteger = 0x8D94,
        RgInteger = 0x8228,
        RgbInteger = 0x8D98,
        RgbaInteger = 0x8D99,
        DepthComponent = 0x1902,
        StencilIndex = 0x1901,
        DepthStencil = 0x84F9,
    }
}

impl PixelFormat {
    /// Components per pixel.
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Red | Self::RedInteger | Self::DepthComponent | Self::StencilIndex => 1,
            Self::Rg | Self::RgInteger | Self::DepthStencil => 2,
            Self::Rgb | Self::Bgr | Self::RgbInteger => 3,
            Self::Rgba | Self::Bgra | Self::RgbaInteger => 4,
        }
    }
}

gl_enum! {
    /// Block-compressed internal format.
    pub enum CompressedFormat {
        RgbaS3tcDxt1 = 0x83F1,
        RgbaS3tcDxt3 = 0x83F2,
        RgbaS3tcDxt5 = 0x83F3,
        RedRgtc1 = 0x8DBB,
        RgRgtc2 = 0x8DBD,
        RgbaBptcUnorm = 0x8E8C,
        SrgbAlphaBptcUnorm = 0x8E8D,
        Rgb8Etc2 = 0x9274,
        Rgba8Etc2Eac = 0x9278,
    }
}

impl CompressedFormat {
    /// Bytes per 4x4 block.
    #[must_use]
    pub const fn block_bytes(self) -> usize {
        match self {
            Self::RgbaS3tcDxt1 | Self::RedRgtc1 | Self::Rgb8Etc2 => 8,
            _ => 16,
        }
    }
}
