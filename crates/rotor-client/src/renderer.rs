//! QR renderers for generated codes.
//!
//! Both renderers encode the code string with the `qrcode` crate at the
//! error correction level from [`RenderOptions`]. The matrix encoding itself
//! is entirely the crate's business.

use qrcode::{
    EcLevel, QrCode,
    render::{svg, unicode},
    types::QrError,
};
use rotor_core::render::{CodeRenderer, ErrorCorrection, RenderOptions};
use thiserror::Error;

/// Rendering failures.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The string does not fit in a QR symbol at the requested level
    #[error("failed to encode QR symbol: {0}")]
    Encode(#[from] QrError),
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::Low => EcLevel::L,
        ErrorCorrection::Medium => EcLevel::M,
        ErrorCorrection::Quartile => EcLevel::Q,
        ErrorCorrection::High => EcLevel::H,
    }
}

fn encode(code: &str, options: &RenderOptions) -> Result<QrCode, RenderError> {
    Ok(QrCode::with_error_correction_level(code.as_bytes(), ec_level(options.error_correction))?)
}

/// Renders an SVG document sized and colored per [`RenderOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl CodeRenderer for SvgRenderer {
    type Output = String;
    type Error = RenderError;

    fn render(&self, code: &str, options: &RenderOptions) -> Result<String, RenderError> {
        let symbol = encode(code, options)?;
        Ok(symbol
            .render::<svg::Color<'_>>()
            .min_dimensions(options.width, options.height)
            .dark_color(svg::Color(&options.foreground))
            .light_color(svg::Color(&options.background))
            .build())
    }
}

/// Renders with Unicode half blocks for a terminal.
///
/// Terminal cells cannot be sized in pixels, so only the error correction
/// level is taken from the options. Colors are inverted for dark terminals:
/// the symbol's light modules print as filled blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalRenderer;

impl CodeRenderer for TerminalRenderer {
    type Output = String;
    type Error = RenderError;

    fn render(&self, code: &str, options: &RenderOptions) -> Result<String, RenderError> {
        let symbol = encode(code, options)?;
        Ok(symbol
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .quiet_zone(true)
            .build())
    }
}
