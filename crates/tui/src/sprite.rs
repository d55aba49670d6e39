//! Draws vehicle artwork with half-block cells, two pixels per cell.

use parklot_core::ImageHandle;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

const UPPER_HALF: &str = "▀";
const ALPHA_CUTOFF: u8 = 128;

/// Nearest-neighbour rendering of an image stretched over its area.
pub struct Sprite<'a> {
    image: &'a ImageHandle,
    background: Color,
}

impl<'a> Sprite<'a> {
    pub fn new(image: &'a ImageHandle, background: Color) -> Self {
        Self { image, background }
    }

    fn sample(&self, x: u32, y: u32) -> Color {
        match self.image.pixel(x, y) {
            Some([r, g, b, a]) if a >= ALPHA_CUTOFF => Color::Rgb(r, g, b),
            _ => self.background,
        }
    }
}

impl Widget for Sprite<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = area.intersection(buf.area);
        if area.is_empty() || self.image.width() == 0 || self.image.height() == 0 {
            return;
        }
        let columns = u32::from(area.width);
        let rows = u32::from(area.height) * 2;
        let (width, height) = (self.image.width(), self.image.height());

        for cy in 0..area.height {
            let top_y = u32::from(cy) * 2 * height / rows;
            let bottom_y = (u32::from(cy) * 2 + 1) * height / rows;
            for cx in 0..area.width {
                let x = u32::from(cx) * width / columns;
                let top = self.sample(x, top_y);
                let bottom = self.sample(x, bottom_y);
                buf.get_mut(area.x + cx, area.y + cy)
                    .set_symbol(UPPER_HALF)
                    .set_fg(top)
                    .set_bg(bottom);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn each_cell_carries_two_pixel_rows() {
        let mut pixels = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        pixels.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        pixels.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let image = ImageHandle::new(pixels);

        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        Sprite::new(&image, Color::Black).render(area, &mut buf);

        for x in 0..2 {
            let cell = buf.get(x, 0);
            assert_eq!(cell.symbol(), UPPER_HALF);
            assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
            assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
        }
    }

    #[test]
    fn transparent_pixels_show_the_background() {
        let image = ImageHandle::new(RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 0])));
        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        Sprite::new(&image, Color::Gray).render(area, &mut buf);
        assert_eq!(buf.get(0, 0).fg, Color::Gray);
        assert_eq!(buf.get(0, 0).bg, Color::Gray);
    }
}
