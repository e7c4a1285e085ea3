//! Framebuffer attachment slots and completeness status.

use super::ImageAspect;

/// Number of color attachment slots a framebuffer exposes.
pub const MAX_COLOR_ATTACHMENTS: u8 = 8;

/// Attachment point of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentSlot {
    /// Color attachment `0..MAX_COLOR_ATTACHMENTS`.
    Color(u8),
    Depth,
    Stencil,
    DepthStencil,
}

impl AttachmentSlot {
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Color(index) => 0x8CE0 + index as u32,
            Self::Depth => 0x8D00,
            Self::Stencil => 0x8D20,
            Self::DepthStencil => 0x821A,
        }
    }

    #[must_use]
    pub const fn is_color(self) -> bool {
        matches!(self, Self::Color(_))
    }

    /// Whether the slot lies within the attachment points a framebuffer has.
    #[must_use]
    pub const fn exists(self) -> bool {
        match self {
            Self::Color(index) => index < MAX_COLOR_ATTACHMENTS,
            _ => true,
        }
    }

    /// Whether an image with `aspect` may be attached here.
    #[must_use]
    pub const fn accepts(self, aspect: ImageAspect) -> bool {
        match self {
            Self::Color(_) => matches!(aspect, ImageAspect::Color),
            Self::Depth => aspect.has_depth(),
            Self::Stencil => aspect.has_stencil(),
            Self::DepthStencil => matches!(aspect, ImageAspect::DepthStencil),
        }
    }

    /// Whether the slot supplies depth values to the depth test.
    #[must_use]
    pub const fn provides_depth(self) -> bool {
        matches!(self, Self::Depth | Self::DepthStencil)
    }
}

/// Result of a framebuffer completeness check.
///
/// Everything but [`Complete`](Self::Complete) names the first rule the
/// driver found violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FramebufferStatus {
    Complete = 0x8CD5,
    IncompleteAttachment = 0x8CD6,
    MissingAttachment = 0x8CD7,
    IncompleteDrawBuffer = 0x8CDB,
    IncompleteReadBuffer = 0x8CDC,
    Unsupported = 0x8CDD,
    IncompleteMultisample = 0x8D56,
    IncompleteLayerTargets = 0x8DA8,
}

impl FramebufferStatus {
    pub const ALL: [Self; 8] = [
        Self::Complete,
        Self::IncompleteAttachment,
        Self::MissingAttachment,
        Self::IncompleteDrawBuffer,
        Self::IncompleteReadBuffer,
        Self::Unsupported,
        Self::IncompleteMultisample,
        Self::IncompleteLayerTargets,
    ];

    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_raw() == raw)
    }

    #[inline]
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Human-readable reason, distinct for every status.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Complete => "Complete",
            Self::IncompleteAttachment => "Incomplete: attachment",
            Self::MissingAttachment => "Incomplete: missing attachment",
            Self::IncompleteDrawBuffer => "Incomplete: draw buffer",
            Self::IncompleteReadBuffer => "Incomplete: read buffer",
            Self::Unsupported => "Incomplete: unsupported attachment combination",
            Self::IncompleteMultisample => "Incomplete: multisample",
            Self::IncompleteLayerTargets => "Incomplete: layer targets",
        }
    }

    /// `Ok(())` when complete, otherwise the matching error.
    pub fn into_result(self) -> crate::errors::Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(crate::errors::GlError::FramebufferIncomplete { status: self })
        }
    }
}

impl std::fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}
