//! Vertex Arrays
//!
//! [`VertexArray`] records where vertex attributes come from: which buffer is
//! bound to each binding slot, and how each attribute location reads its
//! binding.
//!
//! # Format dispatch
//!
//! The driver has three attribute-format entry points, and the shader sees
//! different values depending on which one is used. [`VertexArray::bind_attribute`]
//! picks it from the component type:
//!
//! | Category | Entry point | `normalize` |
//! |----------|-------------|-------------|
//! | `F16`, `F32` | float format | honoured |
//! | 8/16/32-bit integers | integer format | ignored |
//! | `F64` | double format | ignored |
//!
//! Integer data meant for `float`/`vec*` shader inputs goes through
//! [`VertexArray::bind_attribute_as_float`] instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! let vao = VertexArray::new(&ctx);
//! vao.bind_buffer(0, &vbo, 12, 0);
//! vao.bind_attribute(&AttributeDescriptor::new(0, 0, ComponentType::F32, 3));
//! ```

use super::buffer::{Buffer, BufferTarget};
use super::handle::{Handle, HandleKind};
use crate::context::Context;
use crate::driver::{Driver, RawHandle};
use crate::types::{
    Component, ComponentCategory, ComponentType, ObjectType, VertexAttribParameter,
};

// ============================================================================
// Attribute descriptors
// ============================================================================

/// Layout of one vertex attribute inside a buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeDescriptor {
    /// Buffer binding slot the attribute reads from.
    pub binding: u32,
    /// Shader input location.
    pub location: u32,
    pub component_type: ComponentType,
    /// Components per vertex, 1 to 4.
    pub components: u32,
    /// Byte offset of the attribute inside one vertex.
    pub offset: u32,
    /// Map integer data to `[0, 1]` or `[-1, 1]` on the float path.
    pub normalize: bool,
}

impl AttributeDescriptor {
    #[must_use]
    pub const fn new(
        binding: u32,
        location: u32,
        component_type: ComponentType,
        components: u32,
    ) -> Self {
        Self {
            binding,
            location,
            component_type,
            components,
            offset: 0,
            normalize: false,
        }
    }

    /// Descriptor whose component type is taken from `C`.
    #[must_use]
    pub const fn typed<C: Component>(binding: u32, location: u32, components: u32) -> Self {
        Self::new(binding, location, C::TYPE, components)
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn normalized(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Entry point [`VertexArray::bind_attribute`] dispatches to.
    #[must_use]
    pub const fn format_path(&self) -> FormatPath {
        match self.component_type.category() {
            ComponentCategory::Float => FormatPath::Float {
                normalized: self.normalize,
            },
            ComponentCategory::Integer => FormatPath::Integer,
            ComponentCategory::Double => FormatPath::Double,
        }
    }
}

/// Attribute-format entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatPath {
    Float { normalized: bool },
    Integer,
    Double,
}

/// Attribute state as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeState {
    pub enabled: bool,
    pub binding: u32,
    pub components: u32,
    /// `None` if the driver reports a type outside [`ComponentType`].
    pub component_type: Option<ComponentType>,
    pub normalized: bool,
    pub integer: bool,
    pub long: bool,
    pub relative_offset: u32,
}

// ============================================================================
// Vertex Array
// ============================================================================

/// Vertex array object family.
#[derive(Debug)]
pub enum VertexArrayObject {}

impl HandleKind for VertexArrayObject {
    const OBJECT: ObjectType = ObjectType::VertexArray;
    type Raw = RawHandle;
    type Desc = ();

    fn acquire(driver: &dyn Driver, (): ()) -> RawHandle {
        let raw = driver.create_vertex_array();
        driver.bind_vertex_array(raw);
        driver.bind_vertex_array(0);
        raw
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_vertex_array(raw);
    }
}

#[derive(Debug)]
pub struct VertexArray {
    handle: Handle<VertexArrayObject>,
}

scoped_resource!([] VertexArray);

impl VertexArray {
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

    #[inline]
    fn driver(&self) -> &dyn Driver {
        self.handle.driver()
    }

    pub fn bind(&self) {
        self.driver().bind_vertex_array(self.raw());
    }

    pub fn unbind(&self) {
        self.driver().bind_vertex_array(0);
    }

    // ========================================================================
    // Buffers
    // ========================================================================

    /// Reads binding slot `binding` from `buffer`, one vertex every `stride`
    /// bytes starting at `offset`.
    pub fn bind_buffer<T: BufferTarget>(
        &self,
        binding: u32,
        buffer: &Buffer<T>,
        stride: u32,
        offset: usize,
    ) {
        if !self.is_null() {
            self.driver()
                .vertex_array_vertex_buffer(self.raw(), binding, buffer.raw(), offset, stride);
        }
    }

    /// Advances binding slot `binding` once every `divisor` instances; 0 means
    /// once per vertex.
    pub fn set_binding_divisor(&self, binding: u32, divisor: u32) {
        if !self.is_null() {
            self.driver()
                .vertex_array_binding_divisor(self.raw(), binding, divisor);
        }
    }

    /// Uses `buffer` as the index source for indexed draws.
    pub fn bind_elements<T: BufferTarget>(&self, buffer: &Buffer<T>) {
        if !self.is_null() {
            self.driver()
                .vertex_array_element_buffer(self.raw(), buffer.raw());
        }
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Sets the format of an attribute through the entry point matching its
    /// component type, associates it with its binding and enables it.
    pub fn bind_attribute(&self, attribute: &AttributeDescriptor) {
        if self.is_null() {
            return;
        }
        let driver = self.driver();
        let AttributeDescriptor {
            binding,
            location,
            component_type,
            components,
            offset,
            ..
        } = *attribute;

        match attribute.format_path() {
            FormatPath::Float { normalized } => driver.vertex_array_attrib_format(
                self.raw(),
                location,
                components,
                component_type,
                normalized,
                offset,
            ),
            FormatPath::Integer => driver.vertex_array_attrib_i_format(
                self.raw(),
                location,
                components,
                component_type,
                offset,
            ),
            FormatPath::Double => driver.vertex_array_attrib_l_format(
                self.raw(),
                location,
                components,
                component_type,
                offset,
            ),
        }
        self.link_and_enable(binding, location);
    }

    /// [`bind_attribute`](Self::bind_attribute) from loose parts.
    pub fn bind_attribute_parts(
        &self,
        binding: u32,
        location: u32,
        component_type: ComponentType,
        components: u32,
        offset: u32,
        normalize: bool,
    ) {
        self.bind_attribute(
            &AttributeDescriptor::new(binding, location, component_type, components)
                .with_offset(offset)
                .normalized(normalize),
        );
    }

    /// [`bind_attribute`](Self::bind_attribute) with the component type taken
    /// from `C`.
    pub fn bind_typed_attribute<C: Component>(
        &self,
        binding: u32,
        location: u32,
        components: u32,
        offset: u32,
        normalize: bool,
    ) {
        self.bind_attribute_parts(binding, location, C::TYPE, components, offset, normalize);
    }

    /// Feeds an attribute to a floating-point shader input whatever its
    /// component type, converting integers (normalized when the descriptor
    /// asks for it). Doubles cannot take this path.
    pub fn bind_attribute_as_float(&self, attribute: &AttributeDescriptor) {
        debug_assert!(
            attribute.component_type != ComponentType::F64,
            "double attributes must use the double format path"
        );
        if self.is_null() {
            return;
        }
        self.driver().vertex_array_attrib_format(
            self.raw(),
            attribute.location,
            attribute.components,
            attribute.component_type,
            attribute.normalize,
            attribute.offset,
        );
        self.link_and_enable(attribute.binding, attribute.location);
    }

    fn link_and_enable(&self, binding: u32, location: u32) {
        self.driver()
            .vertex_array_attrib_binding(self.raw(), location, binding);
        self.driver()
            .enable_vertex_array_attrib(self.raw(), location);
    }

    pub fn enable_attribute(&self, location: u32) {
        if !self.is_null() {
            self.driver()
                .enable_vertex_array_attrib(self.raw(), location);
        }
    }

    pub fn disable_attribute(&self, location: u32) {
        if !self.is_null() {
            self.driver()
                .disable_vertex_array_attrib(self.raw(), location);
        }
    }

    /// Reads back the state of attribute `location`.
    #[must_use]
    pub fn attribute_state(&self, location: u32) -> AttributeState {
        if self.is_null() {
            return AttributeState::default();
        }
        let query = |pname| {
            self.driver()
                .get_vertex_array_attrib(self.raw(), location, pname)
        };
        let as_u32 = |pname| u32::try_from(query(pname)).unwrap_or_default();

        AttributeState {
            enabled: query(VertexAttribParameter::Enabled) != 0,
            binding: as_u32(VertexAttribParameter::Binding),
            components: as_u32(VertexAttribParameter::Size),
            component_type: ComponentType::from_raw(as_u32(VertexAttribParameter::Type)),
            normalized: query(VertexAttribParameter::Normalized) != 0,
            integer: query(VertexAttribParameter::Integer) != 0,
            long: query(VertexAttribParameter::Long) != 0,
            relative_offset: as_u32(VertexAttribParameter::RelativeOffset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_types_ignore_normalize() {
        for ty in [
            ComponentType::I8,
            ComponentType::U8,
            ComponentType::I16,
            ComponentType::U16,
            ComponentType::I32,
            ComponentType::U32,
        ] {
            for normalize in [false, true] {
                let attribute = AttributeDescriptor::new(0, 0, ty, 4).normalized(normalize);
                assert_eq!(attribute.format_path(), FormatPath::Integer, "{ty:?}");
            }
        }
    }

    #[test]
    fn float_and_double_paths() {
        let float = AttributeDescriptor::typed::<f32>(0, 1, 3);
        assert_eq!(float.format_path(), FormatPath::Float { normalized: false });
        assert_eq!(
            float.normalized(true).format_path(),
            FormatPath::Float { normalized: true }
        );
        assert_eq!(
            AttributeDescriptor::typed::<half::f16>(0, 1, 2).format_path(),
            FormatPath::Float { normalized: false }
        );
        assert_eq!(
            AttributeDescriptor::typed::<f64>(0, 1, 2)
                .normalized(true)
                .format_path(),
            FormatPath::Double
        );
    }
}
