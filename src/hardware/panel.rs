//! Framebuffer for the 64x32 HUB75 matrix.
//!
//! The renderer draws into this buffer through `embedded-graphics`; the DMA
//! panel driver continuously scans [`Hub75Frame::data`] out to the LEDs and
//! owns all pin/timing concerns. Nothing in this crate touches the panel
//! hardware directly.

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use std::convert::Infallible;

pub const PANEL_WIDTH: u32 = 64;
pub const PANEL_HEIGHT: u32 = 32;
const PIXEL_COUNT: usize = (PANEL_WIDTH * PANEL_HEIGHT) as usize;

pub struct Hub75Frame {
    pixels: [Rgb565; PIXEL_COUNT],
    brightness: u8,
}

impl Hub75Frame {
    pub fn new() -> Self {
        Self {
            pixels: [Rgb565::BLACK; PIXEL_COUNT],
            brightness: u8::MAX,
        }
    }

    /// 8-bit global brightness, applied by the scan-out driver.
    pub fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Row-major pixel data for the scan-out driver.
    pub fn data(&self) -> &[Rgb565] {
        &self.pixels
    }
}

impl Default for Hub75Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Hub75Frame {
    fn size(&self) -> Size {
        Size::new(PANEL_WIDTH, PANEL_HEIGHT)
    }
}

impl DrawTarget for Hub75Frame {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && point.y >= 0
                && (point.x as u32) < PANEL_WIDTH
                && (point.y as u32) < PANEL_HEIGHT
            {
                self.pixels[point.y as usize * PANEL_WIDTH as usize + point.x as usize] = color;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.pixels.fill(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_and_clear() {
        let mut frame = Hub75Frame::new();
        frame
            .draw_iter([Pixel(Point::new(3, 2), Rgb565::RED)])
            .unwrap();
        assert_eq!(frame.data()[2 * 64 + 3], Rgb565::RED);

        frame.clear(Rgb565::BLACK).unwrap();
        assert!(frame.data().iter().all(|px| *px == Rgb565::BLACK));
    }

    #[test]
    fn test_out_of_bounds_pixels_ignored() {
        let mut frame = Hub75Frame::new();
        frame
            .draw_iter([
                Pixel(Point::new(-1, 0), Rgb565::RED),
                Pixel(Point::new(64, 0), Rgb565::RED),
                Pixel(Point::new(0, 32), Rgb565::RED),
            ])
            .unwrap();
        assert!(frame.data().iter().all(|px| *px == Rgb565::BLACK));
    }
}
