//! Uniform values and locations.

use glam::{IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

/// Location of a uniform inside a linked program.
///
/// [`UniformLocation::NONE`] is what the driver reports for names that are not
/// active uniforms; uploads to it are silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

impl UniformLocation {
    pub const NONE: Self = Self(-1);

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

/// A value uploaded to a single uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    UVec2(UVec2),
    UVec3(UVec3),
    UVec4(UVec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    /// GLSL type the value is uploaded as.
    #[must_use]
    pub const fn glsl_type(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Bool(_) => "bool",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::IVec2(_) => "ivec2",
            Self::IVec3(_) => "ivec3",
            Self::IVec4(_) => "ivec4",
            Self::UVec2(_) => "uvec2",
            Self::UVec3(_) => "uvec3",
            Self::UVec4(_) => "uvec4",
            Self::Mat2(_) => "mat2",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) => "mat4",
        }
    }

    /// Whether the value can be uploaded to a uniform declared as `glsl_type`.
    ///
    /// Sampler and image uniforms take texture-unit indices as `int`; `bool`
    /// uniforms also take `int`.
    #[must_use]
    pub fn fits(&self, glsl_type: &str) -> bool {
        if glsl_type == self.glsl_type() {
            return true;
        }
        match self {
            Self::Int(_) => {
                glsl_type == "bool"
                    || ["sampler", "isampler", "usampler", "image", "iimage", "uimage"]
                        .iter()
                        .any(|prefix| glsl_type.starts_with(prefix))
            }
            _ => false,
        }
    }
}

macro_rules! impl_from_uniform {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(impl From<$ty> for UniformValue {
            #[inline]
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        })+
    };
}

impl_from_uniform! {
    f32 => Float,
    i32 => Int,
    u32 => UInt,
    bool => Bool,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    IVec2 => IVec2,
    IVec3 => IVec3,
    IVec4 => IVec4,
    UVec2 => UVec2,
    UVec3 => UVec3,
    UVec4 => UVec4,
    Mat2 => Mat2,
    Mat3 => Mat3,
    Mat4 => Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samplers_accept_unit_indices() {
        let unit = UniformValue::from(3i32);
        assert!(unit.fits("sampler2D"));
        assert!(unit.fits("usampler2DArray"));
        assert!(unit.fits("int"));
        assert!(!unit.fits("float"));
    }

    #[test]
    fn vectors_require_exact_type() {
        let v = UniformValue::from(Vec3::ONE);
        assert!(v.fits("vec3"));
        assert!(!v.fits("vec4"));
        assert!(!UniformValue::from(Mat4::IDENTITY).fits("mat3"));
    }
}
