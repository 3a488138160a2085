//! QR code rendering.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};

use crate::error::Result;

/// Default edge length, in pixels, of a rendered QR image.
pub const DEFAULT_QR_SIZE: u32 = 256;

/// Turns text into an image data URI of roughly `size × size` pixels.
pub trait QrRenderer: Send + Sync {
    fn render(&self, text: &str, size: u32) -> Result<String>;
}

/// SVG QR renderer at error-correction level H.
///
/// # Example
/// ```
/// use warplink::qr::{QrRenderer, SvgQrRenderer};
///
/// let uri = SvgQrRenderer::default().render("https://rotur.dev/link", 256).unwrap();
/// assert!(uri.starts_with("data:image/svg+xml;base64,"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgQrRenderer;

impl SvgQrRenderer {
    /// Raw black-on-white SVG document for `text`, no larger than `size`
    /// pixels per side.
    pub fn svg(&self, text: &str, size: u32) -> Result<String> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)?;
        Ok(code
            .render::<svg::Color<'_>>()
            .max_dimensions(size, size)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build())
    }
}

impl QrRenderer for SvgQrRenderer {
    fn render(&self, text: &str, size: u32) -> Result<String> {
        let svg = self.svg(text, size)?;
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
    }
}

/// Half-block Unicode rendering for terminals.
pub fn render_terminal(text: &str) -> Result<String> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}
