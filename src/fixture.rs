//! Synthetic UI screenshots for demos and tests.
//!
//! [`ScreenshotCanvas`] is a small RGB drawing surface:
//! - `fill()` / `draw_rect()` / `draw_border()` for panels and widgets
//! - `draw_text()` renders 8x8 bitmap glyphs, optionally scaled up
//! - `to_png()` encodes the result for an analyzer or a file
//!
//! [`sample_bug_screenshot`] draws a login form whose Submit button is
//! clipped by the dialog edge, matching the mock analyzer's canned bug.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, Rgb, RgbImage};
use std::io::Cursor;

/// Glyph cell size of the bitmap font in pixels
pub const GLYPH_SIZE: u32 = 8;

/// Errors produced while rendering fixtures
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("canvas must be at least 1x1, got {0}x{1}")]
    EmptyCanvas(u32, u32),

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

pub type FixtureResult<T> = Result<T, FixtureError>;

/// RGB drawing surface backed by an `image` buffer
#[derive(Debug, Clone)]
pub struct ScreenshotCanvas {
    pixels: RgbImage,
}

impl ScreenshotCanvas {
    /// Create a canvas filled with `background`
    pub fn new(width: u32, height: u32, background: [u8; 3]) -> FixtureResult<Self> {
        if width == 0 || height == 0 {
            return Err(FixtureError::EmptyCanvas(width, height));
        }
        Ok(Self {
            pixels: ImageBuffer::from_pixel(width, height, Rgb(background)),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn fill(&mut self, color: [u8; 3]) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgb(color);
        }
    }

    /// Filled rectangle, clipped to the canvas
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        let x_end = x.saturating_add(w).min(self.width());
        let y_end = y.saturating_add(h).min(self.height());
        for py in y..y_end {
            for px in x..x_end {
                self.pixels.put_pixel(px, py, Rgb(color));
            }
        }
    }

    /// One-pixel rectangle outline, clipped to the canvas
    pub fn draw_border(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        if w == 0 || h == 0 {
            return;
        }
        self.draw_rect(x, y, w, 1, color);
        self.draw_rect(x, y + h - 1, w, 1, color);
        self.draw_rect(x, y, 1, h, color);
        self.draw_rect(x + w - 1, y, 1, h, color);
    }

    /// Draw a line of text with glyphs scaled by `scale` (transparent background).
    ///
    /// Characters outside the basic Latin set render as blanks. Text is
    /// clipped at the canvas edge, not wrapped.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, color: [u8; 3], scale: u32) {
        let scale = scale.max(1);
        let advance = GLYPH_SIZE * scale;
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width() {
                break;
            }
            self.draw_glyph(cursor_x, y, ch, color, scale);
            cursor_x = cursor_x.saturating_add(advance);
        }
    }

    fn draw_glyph(&mut self, x: u32, y: u32, ch: char, color: [u8; 3], scale: u32) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            for bit in 0..GLYPH_SIZE {
                // leftmost pixel is the least significant bit
                if (row >> bit) & 1 == 1 {
                    self.draw_rect(
                        x + bit * scale,
                        y + row_idx as u32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        (x < self.width() && y < self.height()).then(|| self.pixels.get_pixel(x, y).0)
    }

    pub fn into_image(self) -> RgbImage {
        self.pixels
    }

    /// Encode the canvas as PNG bytes
    pub fn to_png(&self) -> FixtureResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

// ============================================================================
// Sample screenshot
// ============================================================================

const BACKGROUND: [u8; 3] = [236, 239, 244];
const DIALOG: [u8; 3] = [255, 255, 255];
const BORDER: [u8; 3] = [180, 186, 196];
const TEXT: [u8; 3] = [33, 37, 41];
const MUTED: [u8; 3] = [120, 126, 135];
const ACCENT: [u8; 3] = [13, 110, 253];
const ACCENT_TEXT: [u8; 3] = [255, 255, 255];

/// Width and height of [`sample_bug_screenshot`]
pub const SAMPLE_SIZE: (u32, u32) = (480, 320);

/// Render a login dialog whose Submit button runs past the dialog's right edge.
pub fn sample_bug_screenshot() -> FixtureResult<ScreenshotCanvas> {
    let (width, height) = SAMPLE_SIZE;
    let mut canvas = ScreenshotCanvas::new(width, height, BACKGROUND)?;

    // dialog
    let (dx, dy, dw, dh) = (80, 40, 320, 240);
    canvas.draw_rect(dx, dy, dw, dh, DIALOG);
    canvas.draw_border(dx, dy, dw, dh, BORDER);
    canvas.draw_text(dx + 24, dy + 20, "Sign in", TEXT, 2);

    // fields
    for (i, label) in ["Email", "Password"].iter().enumerate() {
        let fy = dy + 64 + i as u32 * 56;
        canvas.draw_text(dx + 24, fy, label, MUTED, 1);
        canvas.draw_rect(dx + 24, fy + 12, dw - 48, 28, DIALOG);
        canvas.draw_border(dx + 24, fy + 12, dw - 48, 28, BORDER);
    }

    // Submit button starts inside the dialog and is cut off at its edge
    let (bx, by, bw, bh) = (dx + dw - 96, dy + dh - 52, 160, 32);
    canvas.draw_rect(bx, by, bw, bh, ACCENT);
    canvas.draw_text(bx + 16, by + 8, "Submit", ACCENT_TEXT, 2);
    canvas.draw_rect(dx + dw, dy, width - (dx + dw), height - dy, BACKGROUND);

    Ok(canvas)
}
