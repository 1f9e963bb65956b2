//! Framebuffer for the 2.9" monochrome e-paper display
//!
//! Drawing happens in landscape (296x128), but the bytes are kept in the
//! controller's native RAM order (128 sources x 296 gates, 1 bit per pixel,
//! MSB first) so a refresh ships the buffer as-is.
//!
//! Landscape pixel (x, y) lives at gate `x`, source `127 - y`. A set bit is
//! white paper, a clear bit is black ink.

use core::convert::Infallible;

use embedded_graphics_core::pixelcolor::BinaryColor;
use embedded_graphics_core::prelude::*;

/// Landscape width (gate lines)
pub const WIDTH: u32 = 296;
/// Landscape height (source lines)
pub const HEIGHT: u32 = 128;

/// Bytes per gate line
pub const ROW_BYTES: usize = HEIGHT as usize / 8;
/// Total buffer size in bytes
pub const BUFFER_SIZE: usize = ROW_BYTES * WIDTH as usize;

pub struct Framebuffer {
    buffer: [u8; BUFFER_SIZE],
}

impl Framebuffer {
    /// Create a new framebuffer initialized to white
    pub fn new() -> Self {
        Self {
            buffer: [0xFF; BUFFER_SIZE],
        }
    }

    /// Clear the entire framebuffer to a single color
    pub fn clear(&mut self, color: BinaryColor) {
        self.buffer.fill(match color {
            BinaryColor::On => 0x00,
            BinaryColor::Off => 0xFF,
        });
    }

    /// Raw bytes in native RAM order
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    fn locate(x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        let source = (HEIGHT - 1 - y) as usize;
        let idx = x as usize * ROW_BYTES + source / 8;
        Some((idx, 0x80 >> (source % 8)))
    }

    /// Write a single landscape pixel; out-of-range writes are ignored
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        let Some((idx, mask)) = Self::locate(x, y) else {
            return;
        };
        match color {
            BinaryColor::On => self.buffer[idx] &= !mask,
            BinaryColor::Off => self.buffer[idx] |= mask,
        }
    }

    /// Read back a landscape pixel
    pub fn pixel(&self, point: Point) -> Option<BinaryColor> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (idx, mask) = Self::locate(point.x as u32, point.y as u32)?;
        Some(if self.buffer[idx] & mask == 0 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        })
    }

    /// Count of inked pixels, mostly useful to check that something was drawn
    pub fn ink_count(&self) -> u32 {
        self.buffer.iter().map(|b| b.count_zeros()).sum()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        Framebuffer::clear(self, color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_white() {
        let fb = Framebuffer::new();
        assert_eq!(fb.as_slice().len(), 4736);
        assert_eq!(fb.ink_count(), 0);
        assert_eq!(fb.pixel(Point::new(0, 0)), Some(BinaryColor::Off));
    }

    #[test]
    fn test_native_order() {
        let mut fb = Framebuffer::new();

        // Top-left landscape pixel is the last source of gate 0
        fb.set_pixel(0, 0, BinaryColor::On);
        assert_eq!(fb.as_slice()[ROW_BYTES - 1], 0xFE);

        // Bottom-left is the first source of gate 0
        fb.set_pixel(0, HEIGHT - 1, BinaryColor::On);
        assert_eq!(fb.as_slice()[0], 0x7F);

        // Next gate line starts one row further
        fb.set_pixel(1, HEIGHT - 1, BinaryColor::On);
        assert_eq!(fb.as_slice()[ROW_BYTES], 0x7F);
        assert_eq!(fb.ink_count(), 3);
    }

    #[test]
    fn test_set_and_clear_pixel() {
        let mut fb = Framebuffer::new();
        let p = Point::new(150, 64);
        fb.set_pixel(150, 64, BinaryColor::On);
        assert_eq!(fb.pixel(p), Some(BinaryColor::On));
        fb.set_pixel(150, 64, BinaryColor::Off);
        assert_eq!(fb.pixel(p), Some(BinaryColor::Off));
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut fb = Framebuffer::new();
        fb.draw_iter([
            Pixel(Point::new(-1, 5), BinaryColor::On),
            Pixel(Point::new(296, 5), BinaryColor::On),
            Pixel(Point::new(5, 128), BinaryColor::On),
        ])
        .unwrap();
        assert_eq!(fb.ink_count(), 0);
        assert_eq!(fb.pixel(Point::new(296, 0)), None);
    }

    #[test]
    fn test_clear() {
        let mut fb = Framebuffer::new();
        DrawTarget::clear(&mut fb, BinaryColor::On).unwrap();
        assert_eq!(fb.ink_count(), WIDTH * HEIGHT);
    }
}
