//! Screen overlay that shows the QR image above host content.
//!
//! The overlay is a fixed-position, borderless, input-transparent layer. Hosts
//! provide the actual drawing through [`Overlay`]; [`HeadlessOverlay`] keeps the
//! state in memory for headless hosts and tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// What to draw: an image data URI shown at `size × size` pixels, centred on
/// the viewport and shifted down by `y_offset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub image_uri: String,
    pub size: u32,
    pub y_offset: f64,
}

impl OverlayFrame {
    pub fn new(image_uri: impl Into<String>, size: u32, y_offset: f64) -> Self {
        Self {
            image_uri: image_uri.into(),
            size,
            y_offset,
        }
    }
}

/// Top-left corner of the overlay in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayPlacement {
    pub left: f64,
    pub top: f64,
}

impl OverlayPlacement {
    /// Centre a `size`-pixel square in the viewport, then shift by `y_offset`.
    pub fn centered(viewport_width: u32, viewport_height: u32, size: u32, y_offset: f64) -> Self {
        let left = (f64::from(viewport_width) - f64::from(size)) / 2.0;
        let top = (f64::from(viewport_height) - f64::from(size)) / 2.0;
        Self {
            left,
            top: top + y_offset,
        }
    }
}

/// Rendering collaborator for the QR overlay.
pub trait Overlay: Send + Sync {
    /// Show `frame`, replacing whatever is currently shown.
    fn render(&self, frame: &OverlayFrame);

    /// Remove the overlay. Must be a no-op when nothing is shown.
    fn clear(&self);
}

#[derive(Debug, Default)]
struct HeadlessState {
    frame: Option<OverlayFrame>,
    viewport: (u32, u32),
}

/// In-memory [`Overlay`] that tracks the shown frame and its placement.
#[derive(Debug, Default)]
pub struct HeadlessOverlay {
    state: Mutex<HeadlessState>,
}

impl HeadlessOverlay {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                frame: None,
                viewport: (viewport_width, viewport_height),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update the viewport; placement follows on the next read.
    pub fn resize(&self, viewport_width: u32, viewport_height: u32) {
        self.state().viewport = (viewport_width, viewport_height);
    }

    pub fn is_visible(&self) -> bool {
        self.state().frame.is_some()
    }

    pub fn frame(&self) -> Option<OverlayFrame> {
        self.state().frame.clone()
    }

    /// Where the current frame sits in the viewport, if one is shown.
    pub fn placement(&self) -> Option<OverlayPlacement> {
        let state = self.state();
        let frame = state.frame.as_ref()?;
        let (width, height) = state.viewport;
        Some(OverlayPlacement::centered(width, height, frame.size, frame.y_offset))
    }
}

impl Overlay for HeadlessOverlay {
    fn render(&self, frame: &OverlayFrame) {
        self.state().frame = Some(frame.clone());
    }

    fn clear(&self) {
        self.state().frame = None;
    }
}
