//! Convenience re-exports for common use.

pub use crate::config::LinkConfig;
pub use crate::error::{LinkError, Result};
pub use crate::link::{Account, HttpLinkClient, LinkApi, LinkSession, LinkSnapshot, LinkStatus};
pub use crate::overlay::{HeadlessOverlay, Overlay, OverlayFrame};
pub use crate::plugin::{Action, ActionOutput, LinkExtension};
pub use crate::qr::{QrRenderer, SvgQrRenderer};
