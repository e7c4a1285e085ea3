//! Textures
//!
//! [`Texture<K>`] owns one texture object of kind `K`. The kind fixes the
//! binding target, the number of wrap axes, and the shape of extents and
//! offsets: `u32` for 1D, `[u32; 2]` for 2D-like kinds, `[u32; 3]` for arrays
//! and volumes.
//!
//! # Usage
//!
//! ```rust,ignore
//! let albedo = Texture2D::with_storage(&ctx, 1, InternalFormat::Rgba8, [256, 256]);
//! albedo.upload_typed(0, [0, 0], [256, 256], PixelFormat::Rgba, &pixels);
//! albedo.filter(Filter::Linear, Filter::Linear);
//! albedo.bind_to_unit(0);
//! ```

use std::fmt;
use std::marker::PhantomData;

use super::handle::{Handle, HandleKind};
use super::sampler::SamplingParameters;
use crate::context::Context;
use crate::driver::{Driver, PixelData, RawHandle};
use crate::types::{
    Component, ComponentType, CompressedFormat, CubeFace, InternalFormat, ObjectType, ParamValue,
    PixelFormat, TextureParameter, TextureType,
};

// ============================================================================
// Kinds
// ============================================================================

/// Compile-time kind of a [`Texture`].
pub trait TextureKind {
    const TYPE: TextureType;

    /// Size or position of a region, one value per axis of the kind.
    type Extent: Copy + fmt::Debug;

    /// Widens an extent to three axes, padding with 1.
    fn size3(extent: Self::Extent) -> [u32; 3];

    /// Widens an offset to three axes, padding with 0.
    fn offset3(offset: Self::Extent) -> [u32; 3];
}

/// Kinds that take multisample storage.
pub trait MultisampleKind: TextureKind {}

macro_rules! texture_kinds {
    ($($(#[$meta:meta])* $marker:ident, $alias:ident => $ty:ident, $extent:ty;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug)]
            pub enum $marker {}

            impl TextureKind for $marker {
                const TYPE: TextureType = TextureType::$ty;
                type Extent = $extent;

                #[inline]
                fn size3(extent: $extent) -> [u32; 3] {
                    Widen::widen(extent, 1)
                }

                #[inline]
                fn offset3(offset: $extent) -> [u32; 3] {
                    Widen::widen(offset, 0)
                }
            }

            pub type $alias = Texture<$marker>;
        )+
    };
}

texture_kinds! {
    Tex1D, Texture1D => Tex1D, u32;
    /// Extent is `[width, layers]`.
    Tex1DArray, Texture1DArray => Tex1DArray, [u32; 2];
    Tex2D, Texture2D => Tex2D, [u32; 2];
    /// Extent is `[width, height, layers]`.
    Tex2DArray, Texture2DArray => Tex2DArray, [u32; 3];
    Tex2DMultisample, Texture2DMultisample => Tex2DMultisample, [u32; 2];
    Tex2DMultisampleArray, Texture2DMultisampleArray => Tex2DMultisampleArray, [u32; 3];
    Tex3D, Texture3D => Tex3D, [u32; 3];
    TexRectangle, TextureRectangle => Rectangle, [u32; 2];
    /// Extent is the size of one face.
    TexCubeMap, TextureCubeMap => CubeMap, [u32; 2];
    /// Extent is `[width, height, layer-faces]`; layer-faces is a multiple of 6.
    TexCubeMapArray, TextureCubeMapArray => CubeMapArray, [u32; 3];
}

impl MultisampleKind for Tex2DMultisample {}
impl MultisampleKind for Tex2DMultisampleArray {}

trait Widen {
    fn widen(self, pad: u32) -> [u32; 3];
}

impl Widen for u32 {
    fn widen(self, pad: u32) -> [u32; 3] {
        [self, pad, pad]
    }
}

impl Widen for [u32; 2] {
    fn widen(self, pad: u32) -> [u32; 3] {
        [self[0], self[1], pad]
    }
}

impl Widen for [u32; 3] {
    fn widen(self, _pad: u32) -> [u32; 3] {
        self
    }
}

/// Texture object family.
#[derive(Debug)]
pub enum TextureObject {}

impl HandleKind for TextureObject {
    const OBJECT: ObjectType = ObjectType::Texture;
    type Raw = RawHandle;
    type Desc = TextureType;

    fn acquire(driver: &dyn Driver, target: TextureType) -> RawHandle {
        let raw = driver.create_texture();
        driver.bind_texture(target, raw);
        driver.bind_texture(target, 0);
        raw
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_texture(raw);
    }
}

// ============================================================================
// Texture
// ============================================================================

#[derive(Debug)]
pub struct Texture<K: TextureKind> {
    handle: Handle<TextureObject>,
    _kind: PhantomData<fn() -> K>,
}

scoped_resource!([K: TextureKind] Texture<K>, reset { _kind });

impl<K: TextureKind> Texture<K> {
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            handle: Handle::new(ctx, K::TYPE),
            _kind: PhantomData,
        }
    }

    #[must_use]
    pub fn null(ctx: &Context) -> Self {
        Self {
            handle: Handle::null(ctx, K::TYPE),
            _kind: PhantomData,
        }
    }

    /// Creates a texture with immutable storage.
    #[must_use]
    pub fn with_storage(
        ctx: &Context,
        levels: u32,
        format: InternalFormat,
        extent: K::Extent,
    ) -> Self {
        let texture = Self::new(ctx);
        texture.allocate_storage(levels, format, extent);
        texture
    }

    #[inline]
    fn driver(&self) -> &dyn Driver {
        self.handle.driver()
    }

    #[inline]
    #[must_use]
    pub fn texture_type(&self) -> TextureType {
        K::TYPE
    }

    // ========================================================================
    // Storage & Uploads
    // ========================================================================

    /// Allocates `levels` immutable mip levels.
    pub fn allocate_storage(&self, levels: u32, format: InternalFormat, extent: K::Extent) {
        if !self.is_null() {
            self.driver()
                .texture_storage(self.raw(), levels, format, K::size3(extent));
        }
    }

    /// (Re)defines one mutable mip level, optionally filled from `data`.
    pub fn allocate_image(
        &self,
        level: u32,
        format: InternalFormat,
        extent: K::Extent,
        pixel_format: PixelFormat,
        component_type: ComponentType,
        data: Option<&[u8]>,
    ) {
        self.define_image(
            None,
            level,
            format,
            K::size3(extent),
            data.map(|bytes| PixelData {
                format: pixel_format,
                component_type,
                bytes,
            }),
        );
    }

    /// Defines one mutable mip level from block-compressed data.
    pub fn allocate_compressed(
        &self,
        level: u32,
        format: CompressedFormat,
        extent: K::Extent,
        data: &[u8],
    ) {
        if !self.is_null() {
            self.driver().compressed_texture_image(
                self.raw(),
                None,
                level,
                format,
                K::size3(extent),
                data,
            );
        }
    }

    /// Uploads pixels into a sub-region of one level.
    pub fn upload(
        &self,
        level: u32,
        offset: K::Extent,
        size: K::Extent,
        pixel_format: PixelFormat,
        component_type: ComponentType,
        data: &[u8],
    ) {
        self.sub_image(
            level,
            K::offset3(offset),
            K::size3(size),
            PixelData {
                format: pixel_format,
                component_type,
                bytes: data,
            },
        );
    }

    /// Like [`upload`](Self::upload), with the component type taken from `C`.
    pub fn upload_typed<C: Component>(
        &self,
        level: u32,
        offset: K::Extent,
        size: K::Extent,
        pixel_format: PixelFormat,
        data: &[C],
    ) {
        self.upload(
            level,
            offset,
            size,
            pixel_format,
            C::TYPE,
            bytemuck::cast_slice(data),
        );
    }

    fn define_image(
        &self,
        face: Option<CubeFace>,
        level: u32,
        format: InternalFormat,
        extent: [u32; 3],
        pixels: Option<PixelData<'_>>,
    ) {
        if !self.is_null() {
            self.driver()
                .texture_image(self.raw(), face, level, format, extent, pixels);
        }
    }

    fn sub_image(&self, level: u32, offset: [u32; 3], extent: [u32; 3], pixels: PixelData<'_>) {
        if !self.is_null() {
            self.driver()
                .texture_sub_image(self.raw(), level, offset, extent, pixels);
        }
    }

    /// Fills every level below the base level from it.
    pub fn generate_mipmaps(&self) {
        if !self.is_null() {
            self.driver().generate_texture_mipmap(self.raw());
        }
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Binds to `K`'s target on the active texture unit.
    pub fn bind(&self) {
        self.driver().bind_texture(K::TYPE, self.raw());
    }

    pub fn unbind(&self) {
        self.driver().bind_texture(K::TYPE, 0);
    }

    /// Makes `unit` the active unit and binds there.
    pub fn activate(&self, unit: u32) {
        self.driver().active_texture(unit);
        self.bind();
    }

    /// Binds to `unit` without touching the active unit.
    pub fn bind_to_unit(&self, unit: u32) {
        self.driver().bind_texture_unit(unit, self.raw());
    }

    /// Largest anisotropy the driver accepts.
    #[must_use]
    pub fn max_anisotropy(&self) -> f32 {
        self.driver().max_texture_anisotropy()
    }
}

impl<K: MultisampleKind> Texture<K> {
    /// Allocates immutable multisample storage.
    pub fn allocate_multisample(
        &self,
        samples: u32,
        format: InternalFormat,
        extent: K::Extent,
        fixed_sample_locations: bool,
    ) {
        if !self.is_null() {
            self.driver().texture_storage_multisample(
                self.raw(),
                samples,
                format,
                K::size3(extent),
                fixed_sample_locations,
            );
        }
    }
}

impl Texture<TexCubeMap> {
    /// (Re)defines one level of one face.
    pub fn allocate_face_image(
        &self,
        face: CubeFace,
        level: u32,
        format: InternalFormat,
        size: [u32; 2],
        pixel_format: PixelFormat,
        component_type: ComponentType,
        data: Option<&[u8]>,
    ) {
        self.define_image(
            Some(face),
            level,
            format,
            [size[0], size[1], 1],
            data.map(|bytes| PixelData {
                format: pixel_format,
                component_type,
                bytes,
            }),
        );
    }

    /// Uploads pixels into a sub-region of one face.
    pub fn upload_face(
        &self,
        face: CubeFace,
        level: u32,
        offset: [u32; 2],
        size: [u32; 2],
        pixel_format: PixelFormat,
        component_type: ComponentType,
        data: &[u8],
    ) {
        self.sub_image(
            level,
            [offset[0], offset[1], face.layer()],
            [size[0], size[1], 1],
            PixelData {
                format: pixel_format,
                component_type,
                bytes: data,
            },
        );
    }
}

impl<K: TextureKind> SamplingParameters for Texture<K> {
    const WRAP_AXES: u8 = K::TYPE.wrap_axes();

    fn set_parameter(&self, pname: TextureParameter, value: ParamValue) {
        if !self.is_null() {
            self.driver().texture_parameter(self.raw(), pname, value);
        }
    }

    fn parameter(&self, pname: TextureParameter) -> ParamValue {
        if self.is_null() {
            return ParamValue::Int(0);
        }
        self.driver().get_texture_parameter(self.raw(), pname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extents_widen_per_kind() {
        assert_eq!(Tex1D::size3(64), [64, 1, 1]);
        assert_eq!(Tex1DArray::size3([64, 4]), [64, 4, 1]);
        assert_eq!(Tex2D::offset3([3, 5]), [3, 5, 0]);
        assert_eq!(Tex3D::size3([8, 8, 8]), [8, 8, 8]);
        assert_eq!(TexCubeMap::TYPE, TextureType::CubeMap);
    }
}
