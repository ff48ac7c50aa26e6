//! Contract for the code-to-image collaborator.
//!
//! The core hands over the code string and these options; how the symbol is
//! encoded and drawn is entirely the renderer's business.

/// Error-correction level requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCorrection {
    /// ~7% recovery
    Low,
    /// ~15% recovery
    Medium,
    /// ~25% recovery
    Quartile,
    /// ~30% recovery
    High,
}

/// Rendering options passed with every code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Minimum width in pixels
    pub width: u32,
    /// Minimum height in pixels
    pub height: u32,
    /// Foreground (dark module) color, CSS hex
    pub foreground: String,
    /// Background (light module) color, CSS hex
    pub background: String,
    /// Error-correction level
    pub error_correction: ErrorCorrection,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            foreground: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            error_correction: ErrorCorrection::High,
        }
    }
}

/// Turns a code string into a scannable artifact.
pub trait CodeRenderer {
    /// Rendered artifact (SVG text, terminal art, image bytes, ...)
    type Output;
    /// Rendering failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Render `code` according to `options`.
    ///
    /// # Errors
    ///
    /// Implementation specific, e.g. the code is too long for the symbol.
    fn render(&self, code: &str, options: &RenderOptions) -> Result<Self::Output, Self::Error>;
}
