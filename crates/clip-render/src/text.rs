//! Text rendering.
//!
//! Uses fontdue for CPU font rasterization when a font file has been loaded.
//! Without one, glyphs fall back to a deterministic block pattern derived
//! from the character code — readable as "text-shaped" placeholder blocks,
//! identical on every run, and measurable with a fixed advance so the wrap
//! algorithm behaves the same way in tests and asset-free environments.

use std::path::Path;

use fontdue::{Font, FontSettings};

use clip_core::{ClipError, ClipResult, Color, FrameBuffer};

/// Fallback glyph advance as a fraction of the font size.
const FALLBACK_ADVANCE: f32 = 0.6;

/// Line height as a fraction of the font size (~130%).
const LINE_HEIGHT: f32 = 1.3;

/// Rasterizes text into a FrameBuffer.
pub struct TextRenderer {
    font: Option<Font>,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Load a TTF/OTF font from a file path.
    pub fn load_font(&mut self, path: &Path) -> ClipResult<()> {
        let data = std::fs::read(path)?;
        self.load_font_bytes(data)
    }

    /// Load a font from raw bytes.
    pub fn load_font_bytes(&mut self, data: Vec<u8>) -> ClipResult<()> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| ClipError::Render(format!("failed to parse font: {}", e)))?;
        tracing::debug!("loaded font with {} glyphs", font.glyph_count());
        self.font = Some(font);
        Ok(())
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Pixel width of a single line of text at the given size.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        match &self.font {
            Some(font) => text
                .chars()
                .map(|ch| font.metrics(ch, size).advance_width)
                .sum(),
            None => text.chars().count() as f32 * size * FALLBACK_ADVANCE,
        }
    }

    /// Vertical distance between consecutive line tops.
    pub fn line_height(&self, size: f32) -> f32 {
        size * LINE_HEIGHT
    }

    /// Draw one line of text with its top-left corner at (x, y).
    pub fn draw_line(&self, fb: &mut FrameBuffer, text: &str, x: f32, y: f32, size: f32, color: &Color) {
        // Baseline sits ~80% down the em box for both raster paths.
        let baseline = y + size * 0.8;
        match &self.font {
            Some(font) => self.draw_line_fontdue(fb, font, text, x, baseline, size, color),
            None => self.draw_line_blocks(fb, text, x, baseline, size, color),
        }
    }

    fn draw_line_fontdue(
        &self,
        fb: &mut FrameBuffer,
        font: &Font,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: &Color,
    ) {
        let mut pen_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, size);
            let gx = (pen_x + metrics.xmin as f32).round() as i32;
            let gy = baseline.round() as i32 - metrics.height as i32 - metrics.ymin;
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let coverage = bitmap[row * metrics.width + col];
                    if coverage == 0 {
                        continue;
                    }
                    let alpha = color.a * (coverage as f32 / 255.0);
                    fb.blend_pixel(
                        gx + col as i32,
                        gy + row as i32,
                        &color.with_alpha(alpha),
                    );
                }
            }
            pen_x += metrics.advance_width;
        }
    }

    /// Placeholder glyphs: a 3×5 cell pattern per character, bits taken from
    /// a hash of the character code. Same character, same pattern, always.
    fn draw_line_blocks(
        &self,
        fb: &mut FrameBuffer,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: &Color,
    ) {
        let advance = size * FALLBACK_ADVANCE;
        let glyph_w = advance * 0.85;
        let glyph_h = size * 0.7;
        let cell_w = (glyph_w / 3.0).max(1.0);
        let cell_h = (glyph_h / 5.0).max(1.0);
        let top = baseline - glyph_h;

        let mut pen_x = x;
        for ch in text.chars() {
            if !ch.is_whitespace() {
                let bits = glyph_bits(ch);
                for cell in 0..15u32 {
                    if bits & (1 << cell) == 0 {
                        continue;
                    }
                    let cx = (cell % 3) as f32;
                    let cy = (cell / 3) as f32;
                    fb.fill_rect(
                        (pen_x + cx * cell_w).round() as i32,
                        (top + cy * cell_h).round() as i32,
                        cell_w.ceil() as u32,
                        cell_h.ceil() as u32,
                        color,
                    );
                }
            }
            pen_x += advance;
        }
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic 15-bit cell pattern for a character.
fn glyph_bits(ch: char) -> u32 {
    let mut h = (ch as u32).wrapping_mul(0x9E37_79B9);
    h ^= h >> 15;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    // Guarantee at least the center column so every glyph is visible.
    (h & 0x7FFF) | 0b000_010_010_010_000
}
