//! Debug Output
//!
//! Typed access to the driver's debug-message facility: message callback,
//! filtering, application-inserted messages and debug groups.
//!
//! # Overview
//!
//! The driver reports `{source, type, id, severity, message}` records. A
//! callback receives each record as a [`DebugMessage`]; user data is whatever
//! the closure captures. [`log_debug_message`] is the stock callback and
//! forwards records to the `log` facade under the `gl` target:
//!
//! | Severity       | Log level |
//! |----------------|-----------|
//! | `High`         | `error`   |
//! | `Medium`       | `warn`    |
//! | `Low`          | `info`    |
//! | `Notification` | `debug`   |
//!
//! # Usage
//!
//! ```rust,ignore
//! ctx.set_log_debug_callback();
//! ctx.set_debug_filter(&DebugFilter::any().severity(DebugSeverity::Notification), false);
//!
//! {
//!     let _group = ctx.debug_group(1, "shadow pass");
//!     // calls issued here are nested under "shadow pass" in driver tools
//! }
//! ```

use std::fmt;

use smallvec::SmallVec;

use crate::context::Context;
use crate::settings::DebugSettings;
use crate::types::Capability;

gl_enum! {
    /// Component that produced a debug message.
    pub enum DebugSource {
        Api = 0x8246,
        WindowSystem = 0x8247,
        ShaderCompiler = 0x8248,
        ThirdParty = 0x8249,
        Application = 0x824A,
        Other = 0x824B,
    }
}

gl_enum! {
    pub enum DebugType {
        Error = 0x824C,
        DeprecatedBehavior = 0x824D,
        UndefinedBehavior = 0x824E,
        Portability = 0x824F,
        Performance = 0x8250,
        Other = 0x8251,
        Marker = 0x8268,
        PushGroup = 0x8269,
        PopGroup = 0x826A,
    }
}

gl_enum! {
    pub enum DebugSeverity {
        High = 0x9146,
        Medium = 0x9147,
        Low = 0x9148,
        Notification = 0x826B,
    }
}

impl DebugSource {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::WindowSystem => "window system",
            Self::ShaderCompiler => "shader compiler",
            Self::ThirdParty => "third party",
            Self::Application => "application",
            Self::Other => "other",
        }
    }
}

impl DebugType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::DeprecatedBehavior => "deprecated",
            Self::UndefinedBehavior => "undefined behavior",
            Self::Portability => "portability",
            Self::Performance => "performance",
            Self::Other => "other",
            Self::Marker => "marker",
            Self::PushGroup => "push group",
            Self::PopGroup => "pop group",
        }
    }
}

impl DebugSeverity {
    /// Ordering key, higher is more severe.
    #[inline]
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Notification => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    #[inline]
    #[must_use]
    pub const fn at_least(self, min: Self) -> bool {
        self.rank() >= min.rank()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Notification => "notification",
        }
    }

    /// Log level used by [`log_debug_message`].
    #[must_use]
    pub const fn log_level(self) -> log::Level {
        match self {
            Self::High => log::Level::Error,
            Self::Medium => log::Level::Warn,
            Self::Low => log::Level::Info,
            Self::Notification => log::Level::Debug,
        }
    }
}

/// One record delivered to the debug callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessage<'a> {
    pub source: DebugSource,
    pub ty: DebugType,
    pub id: u32,
    pub severity: DebugSeverity,
    pub message: &'a str,
}

impl fmt::Display for DebugMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[GL][{}]<{}>\t({}) {}",
            self.source.name(),
            self.ty.name(),
            self.id,
            self.message
        )
    }
}

/// Debug-message callback. User data is carried by the closure's captures.
pub type DebugCallback = Box<dyn FnMut(&DebugMessage<'_>)>;

/// Stock callback: forwards the message to `log` with target `gl`.
pub fn log_debug_message(message: &DebugMessage<'_>) {
    log::log!(target: "gl", message.severity.log_level(), "{message}");
}

// ---------------------------------------------------------------------------
// DebugFilter
// ---------------------------------------------------------------------------

/// Selects a set of debug messages by source, type, severity and id.
///
/// Unset criteria match anything. Listing ids only makes sense together with
/// a source and a type and without a severity, as the driver keys ids by
/// `(source, type)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugFilter {
    pub source: Option<DebugSource>,
    pub ty: Option<DebugType>,
    pub severity: Option<DebugSeverity>,
    pub ids: SmallVec<[u32; 8]>,
}

impl DebugFilter {
    /// A filter matching every message.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// A filter matching the given ids of one source and type.
    #[must_use]
    pub fn ids(source: DebugSource, ty: DebugType, ids: &[u32]) -> Self {
        Self {
            source: Some(source),
            ty: Some(ty),
            severity: None,
            ids: SmallVec::from_slice(ids),
        }
    }

    #[must_use]
    pub fn source(mut self, source: DebugSource) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn ty(mut self, ty: DebugType) -> Self {
        self.ty = Some(ty);
        self
    }

    #[must_use]
    pub fn severity(mut self, severity: DebugSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Whether `message` is selected by this filter.
    #[must_use]
    pub fn matches(&self, message: &DebugMessage<'_>) -> bool {
        self.source.is_none_or(|s| s == message.source)
            && self.ty.is_none_or(|t| t == message.ty)
            && self.severity.is_none_or(|s| s == message.severity)
            && (self.ids.is_empty() || self.ids.contains(&message.id))
    }
}

// ---------------------------------------------------------------------------
// Context integration
// ---------------------------------------------------------------------------

impl Context {
    /// Installs `callback` as the debug-message callback, replacing any
    /// previous one.
    pub fn set_debug_callback<F>(&self, callback: F)
    where
        F: FnMut(&DebugMessage<'_>) + 'static,
    {
        self.driver().debug_message_callback(Some(Box::new(callback)));
    }

    /// Installs [`log_debug_message`] as the debug-message callback.
    pub fn set_log_debug_callback(&self) {
        self.set_debug_callback(log_debug_message);
    }

    pub fn clear_debug_callback(&self) {
        self.driver().debug_message_callback(None);
    }

    /// Enables or disables every message selected by `filter`. Later calls
    /// take precedence over earlier ones.
    pub fn set_debug_filter(&self, filter: &DebugFilter, enabled: bool) {
        self.driver()
            .debug_message_control(filter.source, filter.ty, filter.severity, &filter.ids, enabled);
    }

    /// Inserts an application message into the debug stream.
    pub fn insert_debug_message(
        &self,
        ty: DebugType,
        id: u32,
        severity: DebugSeverity,
        message: &str,
    ) {
        self.driver()
            .debug_message_insert(DebugSource::Application, ty, id, severity, message);
    }

    /// Opens a debug group that stays open until the guard is dropped.
    #[must_use = "the group closes as soon as the guard is dropped"]
    pub fn debug_group(&self, id: u32, message: &str) -> DebugGroup {
        self.driver()
            .push_debug_group(DebugSource::Application, id, message);
        DebugGroup { ctx: self.clone() }
    }

    /// Applies debug settings: output toggles, severity threshold and the
    /// log callback. Disabled settings only turn debug output off.
    pub fn apply_debug_settings(&self, settings: &DebugSettings) {
        if !settings.enabled {
            self.disable(Capability::DebugOutput);
            return;
        }

        self.enable(Capability::DebugOutput);
        self.set_capability(Capability::DebugOutputSynchronous, settings.synchronous);

        self.set_debug_filter(&DebugFilter::any(), false);
        for &severity in DebugSeverity::ALL {
            if severity.at_least(settings.min_severity) {
                self.set_debug_filter(&DebugFilter::any().severity(severity), true);
            }
        }

        if settings.log_messages {
            self.set_log_debug_callback();
        }
    }
}

/// Guard for an open debug group; pops the group when dropped.
pub struct DebugGroup {
    ctx: Context,
}

impl Drop for DebugGroup {
    fn drop(&mut self) {
        self.ctx.driver().pop_debug_group();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(severity: DebugSeverity, id: u32) -> DebugMessage<'static> {
        DebugMessage {
            source: DebugSource::Api,
            ty: DebugType::Error,
            id,
            severity,
            message: "GL_INVALID_OPERATION",
        }
    }

    #[test]
    fn severity_rank_orders_by_importance() {
        assert!(DebugSeverity::High.at_least(DebugSeverity::Medium));
        assert!(DebugSeverity::Low.at_least(DebugSeverity::Low));
        assert!(!DebugSeverity::Notification.at_least(DebugSeverity::Low));
    }

    #[test]
    fn message_display_format() {
        let text = message(DebugSeverity::High, 1282).to_string();
        assert_eq!(text, "[GL][api]<error>\t(1282) GL_INVALID_OPERATION");
    }

    #[test]
    fn filter_criteria_combine() {
        let high = message(DebugSeverity::High, 7);
        let low = message(DebugSeverity::Low, 8);

        assert!(DebugFilter::any().matches(&high));
        assert!(DebugFilter::any().severity(DebugSeverity::High).matches(&high));
        assert!(!DebugFilter::any().severity(DebugSeverity::High).matches(&low));

        let by_id = DebugFilter::ids(DebugSource::Api, DebugType::Error, &[8]);
        assert!(by_id.matches(&low));
        assert!(!by_id.matches(&high));
        assert!(!DebugFilter::any().source(DebugSource::Application).matches(&high));
    }
}
