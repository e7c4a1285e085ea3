//! Fences
//!
//! A [`Fence`] marks a point in the command stream. The CPU can poll it or
//! block on it; the GPU can be told to wait for it before running later
//! commands.
//!
//! Fences share the [`Handle`] lifecycle of every other resource: `init`
//! re-inserts the fence at the current end of the stream, `destroy` deletes
//! it once, and `take` moves it out.

use std::fmt;
use std::time::Duration;

use super::handle::{Handle, HandleKind};
use crate::context::Context;
use crate::driver::{Driver, RawSync};
use crate::types::{ObjectType, WaitStatus};

/// Fence object family.
#[derive(Debug)]
pub enum FenceObject {}

impl HandleKind for FenceObject {
    const OBJECT: ObjectType = ObjectType::Sync;
    type Raw = RawSync;
    type Desc = ();

    fn acquire(driver: &dyn Driver, (): ()) -> RawSync {
        driver.fence_sync()
    }

    fn release(driver: &dyn Driver, raw: RawSync) {
        driver.delete_sync(raw);
    }
}

/// Owner of one fence. Deleted once, on [`destroy`](Fence::destroy) or drop.
pub struct Fence {
    handle: Handle<FenceObject>,
}

scoped_resource!(@lifecycle [] Fence, RawSync);

impl Fence {
    /// Inserts a fence after every command issued so far.
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

    /// Makes the GPU wait for the fence before later commands. Returns
    /// immediately on the CPU.
    pub fn wait(&self) {
        if !self.is_null() {
            self.handle.driver().wait_sync(self.raw());
        }
    }

    /// Blocks until the fence is signaled or `timeout` elapses. Pending
    /// commands are flushed first.
    #[must_use]
    pub fn client_wait(&self, timeout: Duration) -> WaitStatus {
        if self.is_null() {
            return WaitStatus::WaitFailed;
        }
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        self.handle
            .driver()
            .client_wait_sync(self.raw(), true, timeout_ns)
    }

    /// Polls without blocking.
    #[must_use]
    pub fn signaled(&self) -> bool {
        !self.is_null() && self.handle.driver().is_sync_signaled(self.raw())
    }
}

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fence").field("sync", &self.raw()).finish()
    }
}
