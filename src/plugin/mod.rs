//! Host-facing action surface.
//!
//! [`LinkExtension`] exposes a [`LinkSession`] plus QR display as named
//! actions (`generateLinkCode`, `getUsername`, `showQR`, ...). Nothing raised
//! while running an action reaches the host: failures are logged and show up
//! only through the session status.

pub mod args;
pub mod blocks;

pub use args::ShowQrArgs;
pub use blocks::{extension_info, BlockInfo, BlockType, ExtensionInfo, Opcode};

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::link::{LinkApi, LinkSession};
use crate::overlay::{Overlay, OverlayFrame};
use crate::qr::{QrRenderer, SvgQrRenderer};

/// A parsed host action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    GenerateLinkCode,
    CheckLinkStatus,
    GetLinkCode,
    GetLinkToken,
    GetLinkStatus,
    GetUsername,
    GetAvatarUrl,
    GetAccountObject,
    ShowQr(ShowQrArgs),
    HideQr,
}

impl Action {
    /// Resolve an opcode and its block arguments.
    ///
    /// # Errors
    ///
    /// [`LinkError::UnknownAction`] for opcodes this extension does not define.
    pub fn parse(opcode: &str, args: &Map<String, Value>) -> Result<Self> {
        let opcode =
            Opcode::from_str(opcode).map_err(|_| LinkError::UnknownAction(opcode.to_string()))?;
        Ok(match opcode {
            Opcode::GenerateLinkCode => Self::GenerateLinkCode,
            Opcode::CheckLinkStatus => Self::CheckLinkStatus,
            Opcode::GetLinkCode => Self::GetLinkCode,
            Opcode::GetLinkToken => Self::GetLinkToken,
            Opcode::GetLinkStatus => Self::GetLinkStatus,
            Opcode::GetUsername => Self::GetUsername,
            Opcode::GetAvatarUrl => Self::GetAvatarUrl,
            Opcode::GetAccountObject => Self::GetAccountObject,
            Opcode::ShowQr => Self::ShowQr(ShowQrArgs::from_block_args(args)),
            Opcode::HideQr => Self::HideQr,
        })
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::GenerateLinkCode => Opcode::GenerateLinkCode,
            Self::CheckLinkStatus => Opcode::CheckLinkStatus,
            Self::GetLinkCode => Opcode::GetLinkCode,
            Self::GetLinkToken => Opcode::GetLinkToken,
            Self::GetLinkStatus => Opcode::GetLinkStatus,
            Self::GetUsername => Opcode::GetUsername,
            Self::GetAvatarUrl => Opcode::GetAvatarUrl,
            Self::GetAccountObject => Opcode::GetAccountObject,
            Self::ShowQr(_) => Opcode::ShowQr,
            Self::HideQr => Opcode::HideQr,
        }
    }
}

/// What an action hands back to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    /// Command blocks report nothing.
    Done,
    Text(String),
    Json(Value),
}

impl ActionOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Readiness report for the host's extension manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub status: u8,
    pub msg: &'static str,
}

/// The linking extension: one session, one QR renderer, one overlay.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use warplink::config::LinkConfig;
/// use warplink::overlay::HeadlessOverlay;
/// use warplink::plugin::{Action, LinkExtension};
///
/// # async fn example() -> warplink::error::Result<()> {
/// let overlay = Arc::new(HeadlessOverlay::new(1280, 720));
/// let ext = LinkExtension::from_config(LinkConfig::from_env()?, overlay)?;
/// ext.dispatch(Action::GenerateLinkCode).await;
/// let code = ext.dispatch(Action::GetLinkCode).await;
/// println!("{code:?}");
/// # Ok(())
/// # }
/// ```
pub struct LinkExtension {
    session: LinkSession,
    renderer: Arc<dyn QrRenderer>,
    overlay: Arc<dyn Overlay>,
}

impl LinkExtension {
    pub fn new(api: Arc<dyn LinkApi>, config: LinkConfig, overlay: Arc<dyn Overlay>) -> Self {
        Self {
            session: LinkSession::new(api, config).with_overlay(overlay.clone()),
            renderer: Arc::new(SvgQrRenderer::default()),
            overlay,
        }
    }

    /// Build the extension against the HTTP endpoints in `config`.
    pub fn from_config(config: LinkConfig, overlay: Arc<dyn Overlay>) -> Result<Self> {
        Ok(Self {
            session: LinkSession::from_config(config)?.with_overlay(overlay.clone()),
            renderer: Arc::new(SvgQrRenderer::default()),
            overlay,
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn QrRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn info(&self) -> ExtensionInfo {
        extension_info()
    }

    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    /// Run one action.
    pub async fn dispatch(&self, action: Action) -> ActionOutput {
        debug!(opcode = %action.opcode(), "dispatching action");
        match action {
            Action::GenerateLinkCode => {
                self.session.request_code().await;
                ActionOutput::Done
            }
            Action::CheckLinkStatus => {
                self.session.check_once().await;
                ActionOutput::Done
            }
            Action::GetLinkCode => ActionOutput::Text(self.session.code()),
            Action::GetLinkToken => ActionOutput::Text(self.session.token()),
            Action::GetLinkStatus => ActionOutput::Text(self.session.status().to_string()),
            Action::GetUsername => ActionOutput::Text(self.session.username()),
            Action::GetAvatarUrl => ActionOutput::Text(self.session.avatar_url()),
            Action::GetAccountObject => ActionOutput::Json(self.session.account_object()),
            Action::ShowQr(args) => {
                if let Err(e) = self.show_qr(&args) {
                    warn!(error = %e, size = args.size, "failed to show QR overlay");
                }
                ActionOutput::Done
            }
            Action::HideQr => {
                self.hide_qr();
                ActionOutput::Done
            }
        }
    }

    /// Parse and run an action given by opcode name.
    pub async fn dispatch_opcode(
        &self,
        opcode: &str,
        args: &Map<String, Value>,
    ) -> Result<ActionOutput> {
        let action = Action::parse(opcode, args)?;
        Ok(self.dispatch(action).await)
    }

    /// Render `args.text` as a QR code and show it on the overlay.
    pub fn show_qr(&self, args: &ShowQrArgs) -> Result<()> {
        let image_uri = self.renderer.render(&args.text, args.size)?;
        self.overlay
            .render(&OverlayFrame::new(image_uri, args.size, args.y_offset));
        Ok(())
    }

    /// Remove the QR overlay. No-op when nothing is shown.
    pub fn hide_qr(&self) {
        self.overlay.clear();
    }

    /// Host unload hook: hide the overlay and stop polling.
    pub fn shutdown(&self) {
        self.hide_qr();
        self.session.teardown();
    }

    pub fn host_status(&self) -> HostStatus {
        HostStatus {
            status: 2,
            msg: "Ready",
        }
    }
}
