//! RGBA pixel canvas the view renderer draws into.

use super::pages::PageImage;

/// One pixel: red, green, blue, alpha.
pub type Rgba = [u8; 4];

/// A rectangle in pixel space. May extend past the canvas edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if the point lies inside this rectangle with corners
    /// rounded to `radius`.
    fn contains_rounded(&self, px: f64, py: f64, radius: f64) -> bool {
        if !(self.x.is_finite() && self.y.is_finite() && self.width > 0.0 && self.height > 0.0) {
            return false;
        }
        if px < self.x || py < self.y || px >= self.x + self.width || py >= self.y + self.height {
            return false;
        }
        let r = radius.min(self.width / 2.0).min(self.height / 2.0).max(0.0);
        let cx = px.clamp(self.x + r, self.x + self.width - r);
        let cy = py.clamp(self.y + r, self.y + self.height - r);
        let (dx, dy) = (px - cx, py - cy);
        dx * dx + dy * dy <= r * r
    }
}

/// An opaque RGBA pixel buffer.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Canvas {
    /// Creates a transparent-black canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0, 0]; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel at (x, y), or None outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Changes the canvas size. Contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![[0, 0, 0, 0]; width as usize * height as usize];
    }

    /// Fills the whole canvas with one color.
    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Scales `src` (a sub-rectangle of `image`) onto the whole canvas.
    ///
    /// Uses nearest-neighbour sampling; source coordinates outside the image
    /// are clamped to its edge.
    pub fn draw_image(&mut self, image: &PageImage, src: PixelRect) {
        if self.width == 0 || self.height == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let scale_x = src.width / self.width as f64;
        let scale_y = src.height / self.height as f64;
        let max_x = image.width() - 1;
        let max_y = image.height() - 1;

        for y in 0..self.height {
            let sy = (src.y + (y as f64 + 0.5) * scale_y).floor().max(0.0) as u32;
            let row = y as usize * self.width as usize;
            for x in 0..self.width {
                let sx = (src.x + (x as f64 + 0.5) * scale_x).floor().max(0.0) as u32;
                self.pixels[row + x as usize] = image.pixel(sx.min(max_x), sy.min(max_y));
            }
        }
    }

    /// Alpha-blends a rounded rectangle onto the canvas.
    pub fn fill_rounded_rect(&mut self, rect: PixelRect, radius: f64, color: Rgba) {
        self.blend_where(rect, color, |px, py| rect.contains_rounded(px, py, radius));
    }

    /// Draws the outline of a rounded rectangle, `line_width` pixels thick,
    /// on the inside of `rect`.
    pub fn stroke_rounded_rect(&mut self, rect: PixelRect, radius: f64, line_width: f64, color: Rgba) {
        let inner = PixelRect::new(
            rect.x + line_width,
            rect.y + line_width,
            rect.width - 2.0 * line_width,
            rect.height - 2.0 * line_width,
        );
        let inner_radius = (radius - line_width).max(0.0);
        let has_inner = inner.width > 0.0 && inner.height > 0.0;
        self.blend_where(rect, color, |px, py| {
            rect.contains_rounded(px, py, radius)
                && !(has_inner && inner.contains_rounded(px, py, inner_radius))
        });
    }

    /// Blends `color` into every pixel of `bounds` whose center passes `inside`.
    fn blend_where<F>(&mut self, bounds: PixelRect, color: Rgba, inside: F)
    where
        F: Fn(f64, f64) -> bool,
    {
        let x0 = bounds.x.floor().max(0.0) as u32;
        let y0 = bounds.y.floor().max(0.0) as u32;
        let x1 = ((bounds.x + bounds.width).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((bounds.y + bounds.height).ceil().max(0.0) as u32).min(self.height);

        for y in y0..y1 {
            for x in x0..x1 {
                if inside(x as f64 + 0.5, y as f64 + 0.5) {
                    let idx = y as usize * self.width as usize + x as usize;
                    self.pixels[idx] = blend(self.pixels[idx], color);
                }
            }
        }
    }
}

/// Source-over blend of `src` onto an opaque `dst`.
fn blend(dst: Rgba, src: Rgba) -> Rgba {
    let a = src[3] as u32;
    let mix = |d: u8, s: u8| ((s as u32 * a + d as u32 * (255 - a) + 127) / 255) as u8;
    [mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba = [255, 255, 255, 255];
    const RED: Rgba = [255, 0, 0, 255];

    #[test]
    fn test_clear_and_resize() {
        let mut canvas = Canvas::new(4, 2);
        canvas.clear(WHITE);
        assert_eq!(canvas.pixel(3, 1), Some(WHITE));
        assert_eq!(canvas.pixel(4, 0), None);

        canvas.resize(10, 5);
        assert_eq!(canvas.width(), 10);
        assert_eq!(canvas.pixel(9, 4), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_image_scales_subrect() {
        // 4x1 image: red, red, white, white
        let image = PageImage::from_rgba(4, 1, [RED, RED, WHITE, WHITE].concat()).unwrap();
        let mut canvas = Canvas::new(8, 2);
        canvas.draw_image(&image, PixelRect::new(2.0, 0.0, 2.0, 1.0));
        assert!((0..8).all(|x| canvas.pixel(x, 1) == Some(WHITE)));

        canvas.draw_image(&image, PixelRect::new(0.0, 0.0, 4.0, 1.0));
        assert_eq!(canvas.pixel(0, 0), Some(RED));
        assert_eq!(canvas.pixel(3, 0), Some(RED));
        assert_eq!(canvas.pixel(4, 0), Some(WHITE));
    }

    #[test]
    fn test_fill_blends_and_rounds() {
        let mut canvas = Canvas::new(20, 20);
        canvas.clear(WHITE);
        canvas.fill_rounded_rect(PixelRect::new(0.0, 0.0, 20.0, 20.0), 8.0, [0, 0, 0, 128]);

        // Corner pixel lies outside the rounding
        assert_eq!(canvas.pixel(0, 0), Some(WHITE));
        // Center is half-blended toward black
        let center = canvas.pixel(10, 10).unwrap();
        assert!(center[0] > 100 && center[0] < 155);
        assert_eq!(center[3], 255);
    }

    #[test]
    fn test_stroke_leaves_interior() {
        let mut canvas = Canvas::new(20, 20);
        canvas.clear(WHITE);
        canvas.stroke_rounded_rect(PixelRect::new(2.0, 2.0, 16.0, 16.0), 0.0, 2.0, RED);
        assert_eq!(canvas.pixel(2, 10), Some(RED));
        assert_eq!(canvas.pixel(3, 10), Some(RED));
        assert_eq!(canvas.pixel(4, 10), Some(WHITE));
        assert_eq!(canvas.pixel(1, 10), Some(WHITE));
    }

    #[test]
    fn test_offcanvas_rect_clipped() {
        let mut canvas = Canvas::new(5, 5);
        canvas.clear(WHITE);
        canvas.fill_rounded_rect(PixelRect::new(-10.0, -10.0, 40.0, 40.0), 0.0, RED);
        assert!((0..5).all(|i| canvas.pixel(i, i) == Some(RED)));
    }
}
