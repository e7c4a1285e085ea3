//! Binding targets, buffer usages and map/storage flag sets.

use bitflags::bitflags;

gl_enum! {
    /// Binding point for buffer objects.
    ///
    /// A buffer is created against one target but may be bound to any other.
    pub enum BufferType {
        Array = 0x8892,
        ElementArray = 0x8893,
        Uniform = 0x8A11,
        ShaderStorage = 0x90D2,
        CopyRead = 0x8F36,
        CopyWrite = 0x8F37,
        PixelPack = 0x88EB,
        PixelUnpack = 0x88EC,
        DrawIndirect = 0x8F3F,
        DispatchIndirect = 0x90EE,
        Query = 0x9192,
        AtomicCounter = 0x92C0,
        TransformFeedback = 0x8C8E,
        Texture = 0x8C2A,
    }
}

impl BufferType {
    /// Whether the target has indexed binding points (`bind_base` / `bind_range`).
    #[must_use]
    pub const fn is_indexed(self) -> bool {
        matches!(
            self,
            Self::Uniform | Self::ShaderStorage | Self::AtomicCounter | Self::TransformFeedback
        )
    }
}

gl_enum! {
    /// Binding point and dimensionality of a texture object.
    pub enum TextureType {
        Tex1D = 0x0DE0,
        Tex1DArray = 0x8C18,
        Tex2D = 0x0DE1,
        Tex2DArray = 0x8C1A,
        Tex2DMultisample = 0x9100,
        Tex2DMultisampleArray = 0x9102,
        Tex3D = 0x806F,
        Rectangle = 0x84F5,
        CubeMap = 0x8513,
        CubeMapArray = 0x9009,
    }
}

impl TextureType {
    /// Number of texture-coordinate axes that accept a wrap mode.
    #[must_use]
    pub const fn wrap_axes(self) -> u8 {
        match self {
            Self::Tex2DMultisample | Self::Tex2DMultisampleArray => 0,
            Self::Tex1D => 1,
            Self::Tex3D => 3,
            _ => 2,
        }
    }

    /// Whether each mip level is made of layers addressable one at a time.
    #[must_use]
    pub const fn is_layered(self) -> bool {
        matches!(
            self,
            Self::Tex1DArray
                | Self::Tex2DArray
                | Self::Tex2DMultisampleArray
                | Self::Tex3D
                | Self::CubeMap
                | Self::CubeMapArray
        )
    }

    #[must_use]
    pub const fn is_multisample(self) -> bool {
        matches!(self, Self::Tex2DMultisample | Self::Tex2DMultisampleArray)
    }
}

gl_enum! {
    /// Which framebuffer binding point a bind call touches.
    pub enum FramebufferTarget {
        Read = 0x8CA8,
        Draw = 0x8CA9,
        ReadDraw = 0x8D40,
    }
}

impl FramebufferTarget {
    #[must_use]
    pub const fn includes_draw(self) -> bool {
        matches!(self, Self::Draw | Self::ReadDraw)
    }

    #[must_use]
    pub const fn includes_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadDraw)
    }
}

gl_enum! {
    /// Update-frequency hint for mutable buffer storage.
    pub enum BufferUsage {
        StreamDraw = 0x88E0,
        StreamRead = 0x88E1,
        StreamCopy = 0x88E2,
        StaticDraw = 0x88E4,
        StaticRead = 0x88E5,
        StaticCopy = 0x88E6,
        DynamicDraw = 0x88E8,
        DynamicRead = 0x88E9,
        DynamicCopy = 0x88EA,
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::StaticDraw
    }
}

gl_enum! {
    /// Access mode for a whole-buffer map.
    pub enum MapAccess {
        ReadOnly = 0x88B8,
        WriteOnly = 0x88B9,
        ReadWrite = 0x88BA,
    }
}

impl MapAccess {
    /// The equivalent range-map flags.
    #[must_use]
    pub const fn flags(self) -> MapFlags {
        match self {
            Self::ReadOnly => MapFlags::READ,
            Self::WriteOnly => MapFlags::WRITE,
            Self::ReadWrite => MapFlags::READ.union(MapFlags::WRITE),
        }
    }
}

bitflags! {
    /// Flags for immutable buffer storage.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StorageFlags: u32 {
        const MAP_READ = 0x0001;
        const MAP_WRITE = 0x0002;
        const MAP_PERSISTENT = 0x0040;
        const MAP_COHERENT = 0x0080;
        const DYNAMIC_STORAGE = 0x0100;
        const CLIENT_STORAGE = 0x0200;
    }
}

bitflags! {
    /// Flags for a ranged buffer map.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MapFlags: u32 {
        const READ = 0x0001;
        const WRITE = 0x0002;
        const INVALIDATE_RANGE = 0x0004;
        const INVALIDATE_BUFFER = 0x0008;
        const FLUSH_EXPLICIT = 0x0010;
        const UNSYNCHRONIZED = 0x0020;
        const PERSISTENT = 0x0040;
        const COHERENT = 0x0080;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_axes_follow_dimensionality() {
        assert_eq!(TextureType::Tex1D.wrap_axes(), 1);
        assert_eq!(TextureType::Tex1DArray.wrap_axes(), 2);
        assert_eq!(TextureType::CubeMap.wrap_axes(), 2);
        assert_eq!(TextureType::Rectangle.wrap_axes(), 2);
        assert_eq!(TextureType::Tex3D.wrap_axes(), 3);
        assert_eq!(TextureType::Tex2DMultisample.wrap_axes(), 0);
        assert_eq!(TextureType::Tex2DMultisampleArray.wrap_axes(), 0);
    }

    #[test]
    fn flag_sets_compose() {
        let rw = MapFlags::READ | MapFlags::WRITE;
        assert_eq!(MapAccess::ReadWrite.flags(), rw);
        assert_eq!(rw & MapFlags::WRITE, MapFlags::WRITE);
        assert!(!(rw.complement()).contains(MapFlags::READ));

        let storage = StorageFlags::DYNAMIC_STORAGE | StorageFlags::MAP_WRITE;
        assert_eq!(storage.bits(), 0x0102);
    }
}
