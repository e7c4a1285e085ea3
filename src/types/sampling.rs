//! Sampling modes shared by textures and sampler objects.

gl_enum! {
    pub enum WrapMode {
        Repeat = 0x2901,
        MirroredRepeat = 0x8370,
        ClampToEdge = 0x812F,
        ClampToBorder = 0x812D,
        MirrorClampToEdge = 0x8743,
    }
}

gl_enum! {
    pub enum Filter {
        Nearest = 0x2600,
        Linear = 0x2601,
        NearestMipmapNearest = 0x2700,
        LinearMipmapNearest = 0x2701,
        NearestMipmapLinear = 0x2702,
        LinearMipmapLinear = 0x2703,
    }
}

impl Filter {
    /// Whether the filter reads from more than the base level.
    #[must_use]
    pub const fn uses_mipmaps(self) -> bool {
        !matches!(self, Self::Nearest | Self::Linear)
    }
}

gl_enum! {
    /// Depth comparison function for shadow sampling.
    pub enum CompareFunc {
        Never = 0x0200,
        Less = 0x0201,
        Equal = 0x0202,
        LessEqual = 0x0203,
        Greater = 0x0204,
        NotEqual = 0x0205,
        GreaterEqual = 0x0206,
        Always = 0x0207,
    }
}

gl_enum! {
    /// Source of one output channel of a texture lookup.
    pub enum Swizzle {
        Zero = 0,
        One = 1,
        Red = 0x1903,
        Green = 0x1904,
        Blue = 0x1905,
        Alpha = 0x1906,
    }
}

gl_enum! {
    /// Which plane a depth-stencil texture samples.
    pub enum DepthStencilMode {
        Depth = 0x1902,
        Stencil = 0x1901,
    }
}

gl_enum! {
    /// One face of a cube map, in layer order.
    pub enum CubeFace {
        PositiveX = 0x8515,
        NegativeX = 0x8516,
        PositiveY = 0x8517,
        NegativeY = 0x8518,
        PositiveZ = 0x8519,
        NegativeZ = 0x851A,
    }
}

impl CubeFace {
    /// Layer index of the face inside the cube map.
    #[inline]
    #[must_use]
    pub const fn layer(self) -> u32 {
        self as u32 - Self::PositiveX as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_funcs_use_driver_values() {
        assert_eq!(CompareFunc::Never.as_raw(), 0x0200);
        assert_eq!(CompareFunc::LessEqual.as_raw(), 0x0203);
        assert_eq!(CompareFunc::Always.as_raw(), 0x0207);
    }

    #[test]
    fn cube_face_layers_are_sequential() {
        let layers: Vec<u32> = CubeFace::ALL.iter().map(|f| f.layer()).collect();
        assert_eq!(layers, vec![0, 1, 2, 3, 4, 5]);
    }
}
