//! Context Settings
//!
//! Configuration applied once when a [`Context`](crate::Context) is created
//! with [`Context::with_settings`](crate::Context::with_settings).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use glkit::settings::{ContextSettings, DebugSettings};
//! use glkit::debug::DebugSeverity;
//!
//! // Default: debug output on in debug builds, routed to `log`
//! let settings = ContextSettings::default();
//!
//! // Only surface medium and high severity messages
//! let settings = ContextSettings {
//!     debug: DebugSettings {
//!         min_severity: DebugSeverity::Medium,
//!         ..Default::default()
//!     },
//! };
//!
//! let ctx = Context::with_settings(driver, &settings);
//! ```

use crate::debug::DebugSeverity;

// ---------------------------------------------------------------------------
// DebugSettings
// ---------------------------------------------------------------------------

/// Driver debug-output configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugSettings {
    /// Turns on driver debug output.
    pub enabled: bool,
    /// Delivers messages on the thread and inside the call that produced
    /// them, so a breakpoint in the callback shows the offending call.
    pub synchronous: bool,
    /// Messages below this severity are filtered out by the driver.
    pub min_severity: DebugSeverity,
    /// Installs the callback that forwards messages to the `log` facade.
    pub log_messages: bool,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            synchronous: true,
            min_severity: DebugSeverity::Low,
            log_messages: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ContextSettings
// ---------------------------------------------------------------------------

/// Settings applied when wrapping a driver in a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextSettings {
    pub debug: DebugSettings,
}

impl ContextSettings {
    /// Settings with debug output forced on, regardless of build profile.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            debug: DebugSettings {
                enabled: true,
                ..DebugSettings::default()
            },
        }
    }
}
