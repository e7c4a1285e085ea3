//! Scoped Handles
//!
//! [`Handle<K>`] owns exactly one driver object of family `K` and releases it
//! exactly once.
//!
//! # Overview
//!
//! - Construction acquires a name from the driver and commits it by binding it
//!   once to the family's target, so later direct-state calls find an object
//!   of the right type.
//! - Moving a handle moves ownership. There is no `Clone`; [`Handle::take`]
//!   steals the object and leaves a null handle behind.
//! - [`Handle::destroy`] releases the object and resets to null. It is
//!   idempotent, and `Drop` calls it, so a handle never reaches the driver's
//!   delete entry point twice.
//!
//! Every resource type wraps one `Handle` and exposes the shared lifecycle
//! operations through the `scoped_resource!` macro. Fences use the same
//! handle with 64-bit sync names.

use std::fmt;
use std::marker::PhantomData;

use log::trace;

use crate::context::Context;
use crate::driver::{Driver, RawHandle, RawSync};
use crate::types::ObjectType;

/// A driver name type. The zero value (`Default`) is the null name.
pub trait RawName: Copy + Default + Eq + fmt::Debug + fmt::Display {}

impl RawName for RawHandle {}
impl RawName for RawSync {}

/// An object family: how names are acquired and released.
pub trait HandleKind {
    /// Namespace of the family, for labels and logging.
    const OBJECT: ObjectType;

    /// Name type the driver hands out for the family.
    type Raw: RawName;

    /// Extra data needed to create an object, such as a shader's stage.
    type Desc: Copy + fmt::Debug;

    /// Creates an object and commits it to its target.
    fn acquire(driver: &dyn Driver, desc: Self::Desc) -> Self::Raw;

    /// Deletes a non-null object.
    fn release(driver: &dyn Driver, raw: Self::Raw);
}

/// Access to the raw name of a resource, for interop with calls this crate
/// does not wrap (draws, dispatches, queries).
pub trait GlObject {
    fn raw(&self) -> RawHandle;
    fn context(&self) -> &Context;
}

/// Owner of one driver object.
pub struct Handle<K: HandleKind> {
    ctx: Context,
    raw: K::Raw,
    desc: K::Desc,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Handle<K> {
    /// Acquires and commits a new object.
    #[must_use]
    pub fn new(ctx: &Context, desc: K::Desc) -> Self {
        let mut handle = Self::null(ctx, desc);
        handle.init();
        handle
    }

    /// A handle that owns nothing.
    #[must_use]
    pub fn null(ctx: &Context, desc: K::Desc) -> Self {
        Self {
            ctx: ctx.clone(),
            raw: K::Raw::default(),
            desc,
            _kind: PhantomData,
        }
    }

    /// Adopts a name created elsewhere.
    ///
    /// # Safety
    ///
    /// `raw` must be a live object of family `K` on `ctx`'s driver, and no
    /// other owner may release it.
    #[must_use]
    pub unsafe fn from_raw(ctx: &Context, raw: K::Raw, desc: K::Desc) -> Self {
        Self {
            ctx: ctx.clone(),
            raw,
            desc,
            _kind: PhantomData,
        }
    }

    /// Releases the current object, if any, and acquires a fresh one.
    pub fn init(&mut self) {
        self.destroy();
        self.raw = K::acquire(self.ctx.driver(), self.desc);
        trace!("created {} {}", K::OBJECT.name(), self.raw);
    }

    /// Releases the object and resets to null. Does nothing when null.
    pub fn destroy(&mut self) {
        if !self.is_null() {
            K::release(self.ctx.driver(), self.raw);
            trace!("released {} {}", K::OBJECT.name(), self.raw);
            self.raw = K::Raw::default();
        }
    }

    /// Moves the object into a new handle, leaving this one null.
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            raw: std::mem::take(&mut self.raw),
            desc: self.desc,
            _kind: PhantomData,
        }
    }

    /// Gives up ownership without releasing.
    #[must_use]
    pub fn into_raw(mut self) -> K::Raw {
        std::mem::take(&mut self.raw)
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> K::Raw {
        self.raw
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.raw == K::Raw::default()
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> K::Desc {
        self.desc
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    #[inline]
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.ctx.driver()
    }
}

impl<K: HandleKind<Raw = RawHandle>> Handle<K> {
    /// Attaches a debug label shown by driver tools. Ignored when null.
    pub fn set_label(&self, label: &str) {
        if !self.is_null() {
            self.ctx.driver().object_label(K::OBJECT, self.raw, label);
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        if self.is_null() {
            return String::new();
        }
        self.ctx.driver().get_object_label(K::OBJECT, self.raw)
    }
}

impl<K: HandleKind> Drop for Handle<K> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("object", &K::OBJECT)
            .field("raw", &self.raw)
            .field("desc", &self.desc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::driver::soft::SoftDriver;

    enum TestBuffer {}

    impl HandleKind for TestBuffer {
        const OBJECT: ObjectType = ObjectType::Buffer;
        type Raw = RawHandle;
        type Desc = ();

        fn acquire(driver: &dyn Driver, (): ()) -> RawHandle {
            driver.create_buffer()
        }

        fn release(driver: &dyn Driver, raw: RawHandle) {
            driver.delete_buffer(raw);
        }
    }

    #[test]
    fn init_replaces_the_previous_object() {
        let driver = Rc::new(SoftDriver::new());
        let ctx = Context::from_shared(driver.clone());

        let mut handle = Handle::<TestBuffer>::new(&ctx, ());
        let first = handle.raw();
        handle.init();

        assert_ne!(handle.raw(), first);
        assert_eq!(driver.live_objects(ObjectType::Buffer), 1);
    }

    #[test]
    fn into_raw_skips_release() {
        let driver = Rc::new(SoftDriver::new());
        let ctx = Context::from_shared(driver.clone());

        let raw = Handle::<TestBuffer>::new(&ctx, ()).into_raw();
        assert_ne!(raw, 0);
        assert_eq!(driver.live_objects(ObjectType::Buffer), 1);

        drop(unsafe { Handle::<TestBuffer>::from_raw(&ctx, raw, ()) });
        assert_eq!(driver.live_objects(ObjectType::Buffer), 0);
    }
}
