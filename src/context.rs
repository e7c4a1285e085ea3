//! Context
//!
//! [`Context`] owns the connection to a [`Driver`] and is the explicit holder
//! of the driver's global state (capabilities, viewport, current bindings).
//! Every resource keeps a clone of the context it was created from and issues
//! all of its calls through it.
//!
//! # Threading
//!
//! The driver is shared through an [`Rc`], which makes `Context` and every
//! resource `!Send` and `!Sync`. A context and its resources live on the thread
//! that created them; releases happen synchronously on that thread when a
//! resource is dropped.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::driver::Driver;
use crate::errors::{GlError, Result};
use crate::settings::ContextSettings;
use crate::types::{Capability, ErrorCode, Face, FramebufferTarget};

/// Bound driver plus the state helpers that are not tied to one resource.
#[derive(Clone)]
pub struct Context {
    driver: Rc<dyn Driver>,
}

impl Context {
    /// Wraps a driver with default settings.
    pub fn new<D: Driver + 'static>(driver: D) -> Self {
        Self::with_settings(Rc::new(driver), &ContextSettings::default())
    }

    /// Wraps a driver that is also held elsewhere, without applying any
    /// settings.
    #[must_use]
    pub fn from_shared(driver: Rc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Wraps a shared driver and applies `settings`.
    #[must_use]
    pub fn with_settings(driver: Rc<dyn Driver>, settings: &ContextSettings) -> Self {
        let ctx = Self::from_shared(driver);
        ctx.apply_debug_settings(&settings.debug);
        ctx
    }

    #[inline]
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        &*self.driver
    }

    /// Whether both contexts talk to the same driver instance.
    #[must_use]
    pub fn same_driver(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.driver, &other.driver)
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    #[inline]
    pub fn enable(&self, capability: Capability) {
        self.driver.enable(capability);
    }

    #[inline]
    pub fn disable(&self, capability: Capability) {
        self.driver.disable(capability);
    }

    #[must_use]
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.driver.is_enabled(capability)
    }

    pub fn set_capability(&self, capability: Capability, enabled: bool) {
        if enabled {
            self.enable(capability);
        } else {
            self.disable(capability);
        }
    }

    pub fn enable_depth_test(&self, enabled: bool) {
        self.set_capability(Capability::DepthTest, enabled);
    }

    /// Toggles depth writes. Independent of the depth test itself.
    pub fn enable_depth_write(&self, enabled: bool) {
        self.driver.depth_mask(enabled);
    }

    /// Culls `face`, or turns culling off for `None`.
    pub fn enable_cull_face(&self, face: Option<Face>) {
        match face {
            Some(face) => {
                self.driver.cull_face(face);
                self.enable(Capability::CullFace);
            }
            None => self.disable(Capability::CullFace),
        }
    }

    pub fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.driver.viewport(x, y, width, height);
    }

    /// Sets the scissor box and turns the scissor test on.
    pub fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.driver.scissor(x, y, width, height);
        self.enable(Capability::ScissorTest);
    }

    pub fn disable_scissor(&self) {
        self.disable(Capability::ScissorTest);
    }

    /// Binds the window-system framebuffer.
    pub fn bind_default_framebuffer(&self, target: FramebufferTarget) {
        self.driver.bind_framebuffer(target, 0);
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Polls the driver's error flag.
    pub fn check_error(&self) -> Result<()> {
        match self.driver.get_error() {
            Some(code) => Err(GlError::Driver(code)),
            None => Ok(()),
        }
    }

    /// Drains every pending error flag.
    #[must_use]
    pub fn drain_errors(&self) -> SmallVec<[ErrorCode; 4]> {
        std::iter::from_fn(|| self.driver.get_error()).collect()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("driver", &Rc::as_ptr(&self.driver).cast::<()>())
            .finish()
    }
}
