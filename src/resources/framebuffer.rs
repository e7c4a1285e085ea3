//! Framebuffers & Renderbuffers
//!
//! A [`Framebuffer`] collects images into attachment slots. Completeness is
//! never cached: [`Framebuffer::check_status`] asks the driver every time, and
//! [`Framebuffer::assert_complete`] turns anything but `Complete` into
//! [`GlError::FramebufferIncomplete`](crate::errors::GlError::FramebufferIncomplete).
//!
//! Using an incomplete framebuffer is not prevented here.
//!
//! # Usage
//!
//! ```rust,ignore
//! let color = Texture2D::with_storage(&ctx, 1, InternalFormat::Rgba8, [640, 480]);
//! let depth = Renderbuffer::with_storage(&ctx, InternalFormat::Depth24Stencil8, 640, 480);
//!
//! let mut fbo = Framebuffer::new(&ctx);
//! fbo.attach_texture(AttachmentSlot::Color(0), &color, 0);
//! fbo.attach_renderbuffer(AttachmentSlot::DepthStencil, &depth);
//! fbo.assert_complete()?;
//! fbo.bind(FramebufferTarget::Draw);
//! ```

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::handle::{Handle, HandleKind};
use super::texture::{TexCubeMap, Texture, TextureKind};
use crate::context::Context;
use crate::driver::{Driver, RawHandle};
use crate::errors::Result;
use crate::types::{
    AttachmentSlot, CubeFace, FramebufferStatus, FramebufferTarget, InternalFormat, ObjectType,
    TextureType,
};

/// An image attached to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// A whole mip level; layered for array, cube and 3D textures.
    Texture {
        texture: RawHandle,
        target: TextureType,
        level: u32,
    },
    /// One layer of a mip level.
    TextureLayer {
        texture: RawHandle,
        target: TextureType,
        level: u32,
        layer: u32,
    },
    CubeFace {
        texture: RawHandle,
        face: CubeFace,
        level: u32,
    },
    Renderbuffer(RawHandle),
}

impl Attachment {
    /// Raw name of the attached object.
    #[must_use]
    pub const fn raw(&self) -> RawHandle {
        match *self {
            Self::Texture { texture, .. }
            | Self::TextureLayer { texture, .. }
            | Self::CubeFace { texture, .. } => texture,
            Self::Renderbuffer(renderbuffer) => renderbuffer,
        }
    }
}

// ============================================================================
// Framebuffer
// ============================================================================

/// Framebuffer object family.
#[derive(Debug)]
pub enum FramebufferObject {}

impl HandleKind for FramebufferObject {
    const OBJECT: ObjectType = ObjectType::Framebuffer;
    type Raw = RawHandle;
    type Desc = ();

    fn acquire(driver: &dyn Driver, (): ()) -> RawHandle {
        let raw = driver.create_framebuffer();
        driver.bind_framebuffer(FramebufferTarget::ReadDraw, raw);
        driver.bind_framebuffer(FramebufferTarget::ReadDraw, 0);
        raw
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_framebuffer(raw);
    }
}

#[derive(Debug)]
pub struct Framebuffer {
    handle: Handle<FramebufferObject>,
    attachments: FxHashMap<AttachmentSlot, Attachment>,
}

scoped_resource!([] Framebuffer, reset { attachments });

impl Framebuffer {
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            handle: Handle::new(ctx, ()),
            attachments: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn null(ctx: &Context) -> Self {
        Self {
            handle: Handle::null(ctx, ()),
            attachments: FxHashMap::default(),
        }
    }

    #[inline]
    fn driver(&self) -> &dyn Driver {
        self.handle.driver()
    }

    pub fn bind(&self, mode: FramebufferTarget) {
        self.driver().bind_framebuffer(mode, self.raw());
    }

    /// Binds the default framebuffer to `mode`.
    pub fn unbind(&self, mode: FramebufferTarget) {
        self.driver().bind_framebuffer(mode, 0);
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    /// Attaches mip `level` of `texture`. Array, cube and 3D textures are
    /// attached layered.
    pub fn attach_texture<K: TextureKind>(
        &mut self,
        slot: AttachmentSlot,
        texture: &Texture<K>,
        level: u32,
    ) {
        if self.is_null() {
            return;
        }
        if texture.is_null() {
            self.detach(slot);
            return;
        }
        self.driver()
            .framebuffer_texture(self.raw(), slot, texture.raw(), level);
        self.remember(
            slot,
            Attachment::Texture {
                texture: texture.raw(),
                target: K::TYPE,
                level,
            },
        );
    }

    /// Attaches one layer of mip `level`.
    pub fn attach_texture_layer<K: TextureKind>(
        &mut self,
        slot: AttachmentSlot,
        texture: &Texture<K>,
        level: u32,
        layer: u32,
    ) {
        if self.is_null() {
            return;
        }
        if texture.is_null() {
            self.detach(slot);
            return;
        }
        self.driver()
            .framebuffer_texture_layer(self.raw(), slot, texture.raw(), level, layer);
        self.remember(
            slot,
            Attachment::TextureLayer {
                texture: texture.raw(),
                target: K::TYPE,
                level,
                layer,
            },
        );
    }

    pub fn attach_cube_face(
        &mut self,
        slot: AttachmentSlot,
        texture: &Texture<TexCubeMap>,
        face: CubeFace,
        level: u32,
    ) {
        if self.is_null() {
            return;
        }
        if texture.is_null() {
            self.detach(slot);
            return;
        }
        self.driver().framebuffer_texture_layer(
            self.raw(),
            slot,
            texture.raw(),
            level,
            face.layer(),
        );
        self.remember(
            slot,
            Attachment::CubeFace {
                texture: texture.raw(),
                face,
                level,
            },
        );
    }

    pub fn attach_renderbuffer(&mut self, slot: AttachmentSlot, renderbuffer: &Renderbuffer) {
        if self.is_null() {
            return;
        }
        if renderbuffer.is_null() {
            self.detach(slot);
            return;
        }
        self.driver()
            .framebuffer_renderbuffer(self.raw(), slot, renderbuffer.raw());
        self.remember(slot, Attachment::Renderbuffer(renderbuffer.raw()));
    }

    /// Caches an attachment the driver was asked to make. Slots past the
    /// color limit are rejected by the driver and never cached.
    fn remember(&mut self, slot: AttachmentSlot, attachment: Attachment) {
        if slot.exists() {
            self.attachments.insert(slot, attachment);
        }
    }

    /// Empties `slot`.
    pub fn detach(&mut self, slot: AttachmentSlot) {
        if self.is_null() {
            return;
        }
        match self.attachments.remove(&slot) {
            Some(Attachment::Renderbuffer(_)) => {
                self.driver().framebuffer_renderbuffer(self.raw(), slot, 0);
            }
            _ => self.driver().framebuffer_texture(self.raw(), slot, 0, 0),
        }
    }

    /// What was last attached to `slot` through this wrapper.
    #[must_use]
    pub fn attachment(&self, slot: AttachmentSlot) -> Option<&Attachment> {
        self.attachments.get(&slot)
    }

    /// Every attachment, ordered by slot.
    #[must_use]
    pub fn attachments(&self) -> SmallVec<[(AttachmentSlot, Attachment); 8]> {
        let mut all: SmallVec<[(AttachmentSlot, Attachment); 8]> = self
            .attachments
            .iter()
            .map(|(&slot, &attachment)| (slot, attachment))
            .collect();
        all.sort_by_key(|&(slot, _)| slot);
        all
    }

    /// Color slots written by draws, in fragment output order.
    pub fn set_draw_targets(&self, slots: &[AttachmentSlot]) {
        if self.is_null() {
            return;
        }
        let slots: SmallVec<[Option<AttachmentSlot>; 8]> =
            slots.iter().copied().map(Some).collect();
        self.driver().framebuffer_draw_buffers(self.raw(), &slots);
    }

    /// Color slot read by pixel reads and blits, or none.
    pub fn set_read_target(&self, slot: Option<AttachmentSlot>) {
        if !self.is_null() {
            self.driver().framebuffer_read_buffer(self.raw(), slot);
        }
    }

    // ========================================================================
    // Completeness
    // ========================================================================

    /// Queries completeness for drawing. A null framebuffer has no
    /// attachments and reports [`FramebufferStatus::MissingAttachment`].
    #[must_use]
    pub fn check_status(&self) -> FramebufferStatus {
        self.check_status_for(FramebufferTarget::Draw)
    }

    /// Queries completeness for use through `target`.
    #[must_use]
    pub fn check_status_for(&self, target: FramebufferTarget) -> FramebufferStatus {
        if self.is_null() {
            return FramebufferStatus::MissingAttachment;
        }
        self.driver().check_framebuffer_status(self.raw(), target)
    }

    /// Fails with the incompleteness reason unless the framebuffer is
    /// complete.
    pub fn assert_complete(&self) -> Result<()> {
        self.check_status().into_result()
    }
}

// ============================================================================
// Renderbuffer
// ============================================================================

/// Renderbuffer object family.
#[derive(Debug)]
pub enum RenderbufferObject {}

impl HandleKind for RenderbufferObject {
    const OBJECT: ObjectType = ObjectType::Renderbuffer;
    type Raw = RawHandle;
    type Desc = ();

    fn acquire(driver: &dyn Driver, (): ()) -> RawHandle {
        let raw = driver.create_renderbuffer();
        driver.bind_renderbuffer(raw);
        driver.bind_renderbuffer(0);
        raw
    }

    fn release(driver: &dyn Driver, raw: RawHandle) {
        driver.delete_renderbuffer(raw);
    }
}

/// A single image that can only be rendered to.
#[derive(Debug)]
pub struct Renderbuffer {
    handle: Handle<RenderbufferObject>,
}

scoped_resource!([] Renderbuffer);

impl Renderbuffer {
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

    #[must_use]
    pub fn with_storage(ctx: &Context, format: InternalFormat, width: u32, height: u32) -> Self {
        let renderbuffer = Self::new(ctx);
        renderbuffer.storage(format, width, height);
        renderbuffer
    }

    #[must_use]
    pub fn with_multisample_storage(
        ctx: &Context,
        samples: u32,
        format: InternalFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let renderbuffer = Self::new(ctx);
        renderbuffer.storage_multisample(samples, format, width, height);
        renderbuffer
    }

    pub fn storage(&self, format: InternalFormat, width: u32, height: u32) {
        if !self.is_null() {
            self.handle
                .driver()
                .renderbuffer_storage(self.raw(), format, width, height);
        }
    }

    pub fn storage_multisample(
        &self,
        samples: u32,
        format: InternalFormat,
        width: u32,
        height: u32,
    ) {
        if !self.is_null() {
            self.handle.driver().renderbuffer_storage_multisample(
                self.raw(),
                samples,
                format,
                width,
                height,
            );
        }
    }

    pub fn bind(&self) {
        self.handle.driver().bind_renderbuffer(self.raw());
    }

    pub fn unbind(&self) {
        self.handle.driver().bind_renderbuffer(0);
    }
}
