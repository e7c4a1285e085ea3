//! Component types shared by vertex attributes and pixel transfers.

use bytemuck::Pod;

gl_enum! {
    /// Scalar type of one component of a vertex attribute or pixel.
    pub enum ComponentType {
        I8 = 0x1400,
        U8 = 0x1401,
        I16 = 0x1402,
        U16 = 0x1403,
        I32 = 0x1404,
        U32 = 0x1405,
        F32 = 0x1406,
        F64 = 0x140A,
        F16 = 0x140B,
    }
}

/// Which vertex-format entry point a component type is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentCategory {
    /// Half and single precision floats.
    Float,
    /// 8, 16 and 32 bit signed and unsigned integers.
    Integer,
    /// 64 bit floats.
    Double,
}

impl ComponentType {
    /// Size of one component in bytes.
    #[inline]
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    #[inline]
    #[must_use]
    pub const fn category(self) -> ComponentCategory {
        match self {
            Self::F16 | Self::F32 => ComponentCategory::Float,
            Self::I8 | Self::U8 | Self::I16 | Self::U16 | Self::I32 | Self::U32 => {
                ComponentCategory::Integer
            }
            Self::F64 => ComponentCategory::Double,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_signed(self) -> bool {
        !matches!(self, Self::U8 | Self::U16 | Self::U32)
    }
}

/// A Rust scalar that can be uploaded as a component of [`Self::TYPE`].
pub trait Component: Pod {
    const TYPE: ComponentType;
}

macro_rules! impl_component {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(impl Component for $ty {
            const TYPE: ComponentType = ComponentType::$variant;
        })+
    };
}

impl_component! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    half::f16 => F16,
    f32 => F32,
    f64 => F64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_match_scalar_widths() {
        assert_eq!(ComponentType::I8.size_bytes(), size_of::<i8>());
        assert_eq!(ComponentType::U16.size_bytes(), size_of::<u16>());
        assert_eq!(ComponentType::F16.size_bytes(), size_of::<half::f16>());
        assert_eq!(ComponentType::I32.size_bytes(), size_of::<i32>());
        assert_eq!(ComponentType::F32.size_bytes(), size_of::<f32>());
        assert_eq!(ComponentType::F64.size_bytes(), size_of::<f64>());
    }

    #[test]
    fn categories_cover_every_type() {
        for &ty in ComponentType::ALL {
            let expected = match ty {
                ComponentType::F16 | ComponentType::F32 => ComponentCategory::Float,
                ComponentType::F64 => ComponentCategory::Double,
                _ => ComponentCategory::Integer,
            };
            assert_eq!(ty.category(), expected, "{ty:?}");
        }
    }

    #[test]
    fn raw_values_round_trip() {
        assert_eq!(ComponentType::from_raw(0x1406), Some(ComponentType::F32));
        assert_eq!(ComponentType::from_raw(0x1407), None);
        assert_eq!(<half::f16 as Component>::TYPE, ComponentType::F16);
    }
}
