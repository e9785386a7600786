use serde::{Deserialize, Serialize};

use crate::Color;

/// Pixel format of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (4 bytes per pixel).
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// The rendering surface: an addressable 2D pixel buffer sized to a quality
/// preset. Exclusively owned by one job's worker, never shared across jobs.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        let format = PixelFormat::Rgba8;
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            data: vec![0u8; size],
            width,
            height,
            format,
        }
    }

    /// Create a frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &Color) -> Self {
        let mut fb = Self::new(width, height);
        fb.clear(color);
        fb
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Fill the entire buffer with one color.
    pub fn clear(&mut self, color: &Color) {
        let pixel = color.to_rgba8();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&pixel);
        }
    }

    /// Fill one horizontal row with a color. No-op if `y` is out of bounds.
    /// The per-row fill is what makes vertical gradients cheap.
    pub fn fill_row(&mut self, y: u32, color: &Color) {
        if y >= self.height {
            return;
        }
        let pixel = color.to_rgba8();
        let stride = (self.width * 4) as usize;
        let start = (y as usize) * stride;
        for chunk in self.data[start..start + stride].chunks_exact_mut(4) {
            chunk.copy_from_slice(&pixel);
        }
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data[offset..offset + 4].copy_from_slice(&rgba);
    }

    /// Alpha-blend a single pixel over the existing value ("over" operator).
    /// Signed coordinates so callers can draw shapes that straddle the edges.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: &Color) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let [sr, sg, sb, sa] = color.to_rgba8();
        if sa == 0 {
            return;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        if sa == 255 {
            self.data[offset..offset + 4].copy_from_slice(&[sr, sg, sb, 255]);
            return;
        }
        let sa = sa as u32;
        let inv = 255 - sa;
        for (i, s) in [sr, sg, sb].into_iter().enumerate() {
            let d = self.data[offset + i] as u32;
            self.data[offset + i] = ((s as u32 * sa + d * inv) / 255) as u8;
        }
        let da = self.data[offset + 3] as u32;
        self.data[offset + 3] = (sa + (da * inv) / 255).min(255) as u8;
    }

    /// Alpha-blend an axis-aligned filled rectangle. The rectangle is clipped
    /// to the buffer; fully out-of-bounds rectangles are a no-op.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: &Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w as i32).min(self.width as i32);
        let y1 = (y + h as i32).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dimensions() {
        let fb = FrameBuffer::new(720, 1280);
        assert_eq!(fb.byte_size(), 720 * 1280 * 4);
        assert_eq!(fb.pixel_count(), 720 * 1280);
    }

    #[test]
    fn test_solid_fill() {
        let fb = FrameBuffer::solid(2, 2, &Color::WHITE);
        assert_eq!(fb.get_pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(1, 1), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_get_set_pixel_bounds() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.set_pixel(5, 5, [128, 64, 32, 255]);
        assert_eq!(fb.get_pixel(5, 5), Some([128, 64, 32, 255]));
        assert_eq!(fb.get_pixel(10, 0), None);
        assert_eq!(fb.get_pixel(0, 10), None);
    }

    #[test]
    fn test_fill_row() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.fill_row(2, &Color::WHITE);
        assert_eq!(fb.get_pixel(0, 2), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(3, 2), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(0, 1), Some([0, 0, 0, 0]));
        // Out-of-bounds row is a no-op.
        fb.fill_row(4, &Color::WHITE);
    }

    #[test]
    fn test_blend_opaque_replaces() {
        let mut fb = FrameBuffer::solid(2, 2, &Color::BLACK);
        fb.blend_pixel(0, 0, &Color::WHITE);
        assert_eq!(fb.get_pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_blend_semi_transparent() {
        let mut fb = FrameBuffer::solid(1, 1, &Color::BLACK);
        fb.blend_pixel(0, 0, &Color::WHITE.with_alpha(0.5));
        let px = fb.get_pixel(0, 0).unwrap();
        assert!(px[0] > 100 && px[0] < 150, "expected mid grey, got {:?}", px);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut fb = FrameBuffer::solid(4, 4, &Color::BLACK);
        fb.fill_rect(-2, -2, 4, 4, &Color::WHITE);
        assert_eq!(fb.get_pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(2, 2), Some([0, 0, 0, 255]));
        // Fully outside: no panic, no change.
        fb.fill_rect(10, 10, 4, 4, &Color::WHITE);
    }
}
