//! Sampling State
//!
//! [`SamplingParameters`] is the parameter surface shared by textures and
//! [`Sampler`] objects. Implementors provide the raw parameter calls; every
//! typed setter is a provided method.
//!
//! A sampler bound to a unit overrides the sampling state of whatever texture
//! is bound there.

use glam::Vec4;

use super::handle::{Handle, HandleKind};
use crate::context::Context;
use crate::driver::{Driver, RawHandle};
use crate::types::params::{COMPARE_NONE, COMPARE_REF_TO_TEXTURE};
use crate::types::{
    CompareFunc, DepthStencilMode, Filter, ObjectType, ParamValue, Swizzle, TextureParameter,
    WrapMode,
};

pub trait SamplingParameters {
    /// Number of coordinate axes that accept a wrap mode.
    const WRAP_AXES: u8;

    fn set_parameter(&self, pname: TextureParameter, value: ParamValue);

    fn parameter(&self, pname: TextureParameter) -> ParamValue;

    // ========================================================================
    // Wrapping
    // ========================================================================

    fn wrap_s(&self, mode: WrapMode) {
        self.set_parameter(TextureParameter::WrapS, raw(mode.as_raw()));
    }

    fn wrap_t(&self, mode: WrapMode) {
        self.set_parameter(TextureParameter::WrapT, raw(mode.as_raw()));
    }

    fn wrap_r(&self, mode: WrapMode) {
        self.set_parameter(TextureParameter::WrapR, raw(mode.as_raw()));
    }

    /// Sets the wrap mode of each axis that exists; the rest are skipped.
    fn wrap(&self, s: WrapMode, t: WrapMode, r: WrapMode) {
        if Self::WRAP_AXES >= 1 {
            self.wrap_s(s);
        }
        if Self::WRAP_AXES >= 2 {
            self.wrap_t(t);
        }
        if Self::WRAP_AXES >= 3 {
            self.wrap_r(r);
        }
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    fn min_filter(&self, filter: Filter) {
        self.set_parameter(TextureParameter::MinFilter, raw(filter.as_raw()));
    }

    /// Only `Nearest` and `Linear` are valid for magnification.
    fn mag_filter(&self, filter: Filter) {
        self.set_parameter(TextureParameter::MagFilter, raw(filter.as_raw()));
    }

    fn filter(&self, min: Filter, mag: Filter) {
        self.min_filter(min);
        self.mag_filter(mag);
    }

    fn set_max_anisotropy(&self, anisotropy: f32) {
        self.set_parameter(TextureParameter::MaxAnisotropy, ParamValue::Float(anisotropy));
    }

    // ========================================================================
    // Level of detail
    // ========================================================================

    fn min_lod(&self, lod: f32) {
        self.set_parameter(TextureParameter::MinLod, ParamValue::Float(lod));
    }

    fn max_lod(&self, lod: f32) {
        self.set_parameter(TextureParameter::MaxLod, ParamValue::Float(lod));
    }

    fn lod_range(&self, min: f32, max: f32) {
        self.min_lod(min);
        self.max_lod(max);
    }

    fn lod_bias(&self, bias: f32) {
        self.set_parameter(TextureParameter::LodBias, ParamValue::Float(bias));
    }

    /// Texture-only.
    fn base_level(&self, level: i32) {
        self.set_parameter(TextureParameter::BaseLevel, ParamValue::Int(level));
    }

    /// Texture-only.
    fn max_level(&self, level: i32) {
        self.set_parameter(TextureParameter::MaxLevel, ParamValue::Int(level));
    }

    // ========================================================================
    // Misc
    // ========================================================================

    fn border_color(&self, color: Vec4) {
        self.set_parameter(TextureParameter::BorderColor, ParamValue::Floats(color.to_array()));
    }

    /// Turns depth comparison on with `func`, or off for `None`.
    fn compare_func(&self, func: Option<CompareFunc>) {
        match func {
            Some(func) => {
                self.set_parameter(
                    TextureParameter::CompareMode,
                    ParamValue::Int(COMPARE_REF_TO_TEXTURE),
                );
                self.set_parameter(TextureParameter::CompareFunc, raw(func.as_raw()));
            }
            None => {
                self.set_parameter(TextureParameter::CompareMode, ParamValue::Int(COMPARE_NONE));
            }
        }
    }

    /// Texture-only.
    fn swizzle(&self, rgba: [Swizzle; 4]) {
        self.set_parameter(
            TextureParameter::SwizzleRgba,
            ParamValue::Ints(rgba.map(|s| s.as_raw() as i32)),
        );
    }

    /// Texture-only. Which aspect a depth-stencil texture samples.
    fn depth_stencil_mode(&self, mode: DepthStencilMode) {
        self.set_parameter(TextureParameter::DepthStencilMode, raw(mode.as_raw()));
    }

    /// Current wrap mode of the S axis.
    fn wrap_mode_s(&self) -> Option<WrapMode> {
        WrapMode::from_raw(self.parameter(TextureParameter::WrapS).as_int() as u32)
    }

    fn min_filter_mode(&self) -> Option<Filter> {
        Filter::from_raw(self.parameter(TextureParameter::MinFilter).as_int() as u32)
    }

    fn mag_filter_mode(&self) -> Option<Filter> {
        Filter::from_raw(self.parameter(TextureParameter::MagFilter).as_int() as u32)
    }
}

#[inline]
fn raw(value: u32) -> ParamValue {
    ParamValue::Int(value as i32)
}

// ============================================================================
// Sampler
// ============================================================================

/// Sampler object family.
#[derive(Debug)]
pub enum SamplerObject {}

impl HandleKind for SamplerObject {
    const OBJECT: ObjectType = ObjectType::Sampler;
    type Raw = RawHandle;
    type Desc = ();

    fn acquire(driver: &dyn Driver, (): ()) -> RawHandle {
        driver.create_sampler()
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_sampler(raw);
    }
}

/// Sampling state that can be bound to texture units independently of
/// textures.
#[derive(Debug)]
pub struct Sampler {
    handle: Handle<SamplerObject>,
}

scoped_resource!([] Sampler);

impl Sampler {
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            handle: Handle::new(ctx, ()),
        }
    }

    #[must_use]
    pub fn null(ctx: &Context) -> Self {
        Self {
            handle: Handle::null(ctx, ()),
        }
    }

    pub fn bind_to_unit(&self, unit: u32) {
        self.handle.driver().bind_sampler(unit, self.raw());
    }

    /// Clears whatever sampler is bound to `unit`.
    pub fn unbind_unit(&self, unit: u32) {
        self.handle.driver().bind_sampler(unit, 0);
    }
}

impl SamplingParameters for Sampler {
    const WRAP_AXES: u8 = 3;

    fn set_parameter(&self, pname: TextureParameter, value: ParamValue) {
        if !self.is_null() {
            self.handle
                .driver()
                .sampler_parameter(self.raw(), pname, value);
        }
    }

    fn parameter(&self, pname: TextureParameter) -> ParamValue {
        if self.is_null() {
            return ParamValue::Int(0);
        }
        self.handle.driver().get_sampler_parameter(self.raw(), pname)
    }
}
