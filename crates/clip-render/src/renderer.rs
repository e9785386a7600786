//! Per-frame painting.
//!
//! `render_frame` is called once per animation tick. Everything it draws is
//! a function of the inputs and `elapsed_ms` alone — ambient motion uses a
//! hashed index loop rather than a random source, so the same timestamp
//! always yields the same layout.

use std::path::Path;

use clip_core::{
    ClipError, ClipResult, Color, FrameBuffer, ParticleKind, QualityPreset, Script, Theme,
};

use crate::text::TextRenderer;
use crate::wrap::wrap_words;

/// Number of ambient particles per frame.
const PARTICLE_COUNT: u32 = 24;

/// Paints frames for one job. Holds the text renderer (and its loaded font);
/// no per-frame state.
pub struct FrameRenderer {
    text: TextRenderer,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self {
            text: TextRenderer::new(),
        }
    }

    pub fn with_text_renderer(text: TextRenderer) -> Self {
        Self { text }
    }

    /// Load a TTF font used for all subsequent frames.
    pub fn load_font(&mut self, path: &Path) -> ClipResult<()> {
        self.text.load_font(path)
    }

    /// Paint one complete frame onto `surface`.
    ///
    /// `frame_index` beyond the last body frame is clamped; empty hook or
    /// cta strings skip their draw step.
    pub fn render_frame(
        &self,
        surface: &mut FrameBuffer,
        theme: &Theme,
        quality: &QualityPreset,
        script: &Script,
        frame_index: usize,
        elapsed_ms: f64,
    ) -> ClipResult<()> {
        if surface.width != quality.width || surface.height != quality.height {
            return Err(ClipError::Render(format!(
                "surface is {}x{}, quality preset {} wants {}x{}",
                surface.width, surface.height, quality.id, quality.width, quality.height
            )));
        }

        self.paint_background(surface, theme, elapsed_ms);
        self.paint_particles(surface, theme, elapsed_ms);
        self.paint_hook(surface, theme, quality, &script.hook, elapsed_ms);
        if !script.frames.is_empty() {
            let idx = script.clamp_frame_index(frame_index);
            self.paint_body(surface, quality, &script.frames[idx]);
        }
        self.paint_cta(surface, theme, quality, &script.cta);
        Ok(())
    }

    /// Step 1: vertical gradient plus a theme-procedural overlay keyed by
    /// elapsed time.
    fn paint_background(&self, fb: &mut FrameBuffer, theme: &Theme, elapsed_ms: f64) {
        let h = fb.height;
        for y in 0..h {
            let t = y as f32 / h.max(1) as f32;
            let row = theme.background_primary.lerp(&theme.background_secondary, t);
            fb.fill_row(y, &row);
        }

        match theme.particle_kind {
            ParticleKind::Grid => self.overlay_scrolling_blocks(fb, theme, elapsed_ms),
            ParticleKind::Streaks => self.overlay_scrolling_lines(fb, theme, elapsed_ms),
            ParticleKind::Bubbles | ParticleKind::Sparks => {}
        }
    }

    /// Tiled blocks drifting downward, checkerboarded.
    fn overlay_scrolling_blocks(&self, fb: &mut FrameBuffer, theme: &Theme, elapsed_ms: f64) {
        let block = (fb.width / 8).max(4);
        let scroll = ((elapsed_ms * 0.02) as i64).rem_euclid(2 * block as i64) as i32;
        let tint = theme.background_secondary.with_alpha(0.3);
        let cols = fb.width / block + 2;
        let rows = fb.height / block + 2;
        for cy in 0..rows {
            for cx in 0..cols {
                if (cx + cy) % 2 == 0 {
                    continue;
                }
                fb.fill_rect(
                    (cx * block) as i32 - block as i32,
                    (cy * block) as i32 - block as i32 + scroll,
                    block,
                    block,
                    &tint,
                );
            }
        }
    }

    /// Thin horizontal lines scrolling upward.
    fn overlay_scrolling_lines(&self, fb: &mut FrameBuffer, theme: &Theme, elapsed_ms: f64) {
        let spacing = (fb.height / 14).max(4);
        let scroll = ((elapsed_ms * 0.05) as i64).rem_euclid(spacing as i64) as u32;
        let tint = theme.accent.with_alpha(0.08);
        let mut y = spacing - scroll;
        while y < fb.height {
            fb.fill_row(y, &tint);
            if y + 1 < fb.height {
                fb.fill_row(y + 1, &tint);
            }
            y += spacing;
        }
    }

    /// Step 2: ambient particles. Position is a pure function of
    /// (elapsed_ms, particle index).
    fn paint_particles(&self, fb: &mut FrameBuffer, theme: &Theme, elapsed_ms: f64) {
        let w = fb.width as f32;
        let h = fb.height as f32;
        let elapsed = elapsed_ms as f32;

        for i in 0..PARTICLE_COUNT {
            let seed = particle_hash(i);
            let fx = (seed & 0xFFFF) as f32 / 65535.0;
            let fy = ((seed >> 16) & 0x7FFF) as f32 / 32767.0;
            let speed = 0.02 + fx * 0.05;
            let size = (w / 90.0 + fy * w / 60.0).max(2.0);

            match theme.particle_kind {
                ParticleKind::Bubbles => {
                    // Rise, wrapping at the top.
                    let x = fx * w + (elapsed * 0.001 * (i as f32 + 1.0)).sin() * w * 0.02;
                    let y = (fy * h - elapsed * speed).rem_euclid(h + 2.0 * size) - size;
                    let c = theme.accent.with_alpha(0.20 + fy * 0.15);
                    fill_circle(fb, x, y, size * 0.6, &c);
                }
                ParticleKind::Sparks => {
                    let x = (fx * w + elapsed * speed * 0.4).rem_euclid(w);
                    let y = (fy * h + elapsed * speed).rem_euclid(h);
                    let flicker = 0.5 + 0.5 * (elapsed * 0.01 + i as f32).sin();
                    let c = theme.accent.with_alpha(0.1 + 0.3 * flicker);
                    fb.fill_rect(x as i32, y as i32, size as u32 / 2 + 1, size as u32 / 2 + 1, &c);
                }
                ParticleKind::Streaks => {
                    // Fast horizontal streaks of varying length.
                    let x = (fx * w + elapsed * (speed * 6.0)).rem_euclid(w + size * 8.0) - size * 4.0;
                    let y = fy * h;
                    let c = theme.accent.with_alpha(0.12 + fx * 0.1);
                    fb.fill_rect(x as i32, y as i32, (size * 4.0) as u32, 2, &c);
                }
                ParticleKind::Grid => {
                    // Slow drifting dots over the block pattern.
                    let x = fx * w;
                    let y = (fy * h + elapsed * speed * 0.5).rem_euclid(h);
                    let c = Color::WHITE.with_alpha(0.10);
                    fill_circle(fb, x, y, size * 0.35, &c);
                }
            }
        }
    }

    /// Step 3: hook pinned near the top, accent colored, pulsing with time.
    fn paint_hook(
        &self,
        fb: &mut FrameBuffer,
        theme: &Theme,
        quality: &QualityPreset,
        hook: &str,
        elapsed_ms: f64,
    ) {
        if hook.is_empty() {
            return;
        }
        let pulse = 1.0 + 0.06 * ((elapsed_ms * 0.004).sin() as f32);
        let size = quality.height as f32 * 0.032 * pulse;
        let margin = quality.width as f32 / 12.0;
        let max_width = quality.width as f32 - 2.0 * margin;

        let lines = wrap_words(hook, max_width, |s| self.text.measure(s, size));
        let mut y = quality.height as f32 * 0.06;
        for line in &lines {
            let line_w = self.text.measure(line, size);
            let x = (quality.width as f32 - line_w) / 2.0;
            self.text.draw_line(fb, line, x, y, size, &theme.accent);
            y += self.text.line_height(size);
        }
    }

    /// Step 4: current body frame, word-wrapped and vertically centered.
    fn paint_body(&self, fb: &mut FrameBuffer, quality: &QualityPreset, body: &str) {
        if body.is_empty() {
            return;
        }
        let size = quality.height as f32 * 0.026;
        let margin = quality.width as f32 / 12.0;
        let max_width = quality.width as f32 - 2.0 * margin;

        let lines = wrap_words(body, max_width, |s| self.text.measure(s, size));
        let block_height = lines.len() as f32 * self.text.line_height(size);
        let mut y = (quality.height as f32 - block_height) / 2.0;
        for line in &lines {
            let line_w = self.text.measure(line, size);
            let x = (quality.width as f32 - line_w) / 2.0;
            self.text.draw_line(fb, line, x, y, size, &Color::WHITE);
            y += self.text.line_height(size);
        }
    }

    /// Step 5: call-to-action on a filled button near the bottom.
    fn paint_cta(&self, fb: &mut FrameBuffer, theme: &Theme, quality: &QualityPreset, cta: &str) {
        if cta.is_empty() {
            return;
        }
        let size = quality.height as f32 * 0.022;
        let text_w = self.text.measure(cta, size);
        let pad_x = size * 1.2;
        let pad_y = size * 0.6;
        let btn_w = text_w + 2.0 * pad_x;
        let btn_h = size + 2.0 * pad_y;
        let btn_x = (quality.width as f32 - btn_w) / 2.0;
        let btn_y = quality.height as f32 * 0.91 - btn_h;

        fb.fill_rect(
            btn_x.round() as i32,
            btn_y.round() as i32,
            btn_w.round() as u32,
            btn_h.round() as u32,
            &theme.accent,
        );
        self.text.draw_line(
            fb,
            cta,
            btn_x + pad_x,
            btn_y + pad_y,
            size,
            &theme.background_primary,
        );
    }
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic per-particle seed.
fn particle_hash(i: u32) -> u32 {
    let mut h = i.wrapping_mul(0x9E37_79B9) ^ 0x85EB_CA6B;
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^ (h >> 16)
}

/// Filled circle via its bounding box.
fn fill_circle(fb: &mut FrameBuffer, cx: f32, cy: f32, radius: f32, color: &Color) {
    let r = radius.max(1.0);
    let r2 = r * r;
    let x0 = (cx - r).floor() as i32;
    let x1 = (cx + r).ceil() as i32;
    let y0 = (cy - r).floor() as i32;
    let y1 = (cy + r).ceil() as i32;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                fb.blend_pixel(x, y, color);
            }
        }
    }
}
