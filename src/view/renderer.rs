//! Magnified page view for the active frame.
//!
//! Each frame change redraws the whole canvas: the frame's region is cropped
//! out of its page image and scaled to a fixed display height, then one
//! rounded highlight box is drawn over every sounding note head.

use super::canvas::{Canvas, PixelRect, Rgba};
use super::pages::PageImages;
use crate::score::{Frame, PageRect, NORMALIZED_SCALE};

/// Height of the rendered view in pixels.
pub const DISPLAY_HEIGHT: u32 = 240;

/// Upper bound on the rendered view width.
pub const MAX_CANVAS_WIDTH: u32 = 4096;

/// Padding added around each highlight box, in canvas pixels.
pub const HIGHLIGHT_PADDING: f64 = 4.0;

/// Largest highlight corner radius, in canvas pixels.
pub const HIGHLIGHT_RADIUS: f64 = 6.0;

/// Highlight border thickness, in canvas pixels.
pub const HIGHLIGHT_BORDER: f64 = 2.0;

/// Semi-transparent highlight fill (35% opacity).
pub const HIGHLIGHT_FILL: Rgba = [255, 196, 0, 89];

/// Solid highlight border.
pub const HIGHLIGHT_STROKE: Rgba = [255, 150, 0, 255];

/// Background behind the page crop.
pub const BACKGROUND: Rgba = [255, 255, 255, 255];

/// Why a render call left the canvas untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The frame's page has not been decoded (yet).
    PageMissing,
    /// The frame's region has no area.
    DegenerateRegion,
}

/// Result of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn { highlights: usize },
    Skipped(SkipReason),
}

/// Scales a normalized page rectangle to image pixels.
///
/// The crop is kept at least one pixel wide and tall.
pub fn crop_rect(region: &PageRect, image_width: u32, image_height: u32) -> PixelRect {
    let sx = image_width as f64 / NORMALIZED_SCALE;
    let sy = image_height as f64 / NORMALIZED_SCALE;
    PixelRect::new(
        region.left * sx,
        region.top * sy,
        (region.width() * sx).max(1.0),
        (region.height() * sy).max(1.0),
    )
}

/// Canvas size for a crop: fixed height, width following the crop's aspect ratio.
pub fn canvas_size(crop: &PixelRect, display_height: u32) -> (u32, u32) {
    let aspect = crop.width / crop.height;
    let width = (display_height as f64 * aspect).round();
    let width = if width.is_finite() {
        width.clamp(1.0, MAX_CANVAS_WIDTH as f64) as u32
    } else {
        1
    };
    (width, display_height)
}

/// Maps a highlight from page coordinates into canvas pixels.
///
/// Position and size are taken as fractions of the region, so the mapping
/// matches the crop's own scaling. The result includes `HIGHLIGHT_PADDING`
/// on every side.
pub fn map_highlight(
    highlight: &PageRect,
    region: &PageRect,
    canvas_width: u32,
    canvas_height: u32,
) -> PixelRect {
    let (cw, ch) = (canvas_width as f64, canvas_height as f64);
    let fx = (highlight.left - region.left) / region.width();
    let fy = (highlight.top - region.top) / region.height();
    let fw = highlight.width() / region.width();
    let fh = highlight.height() / region.height();

    PixelRect::new(
        fx * cw - HIGHLIGHT_PADDING,
        fy * ch - HIGHLIGHT_PADDING,
        (fw * cw).max(1.0) + 2.0 * HIGHLIGHT_PADDING,
        (fh * ch).max(1.0) + 2.0 * HIGHLIGHT_PADDING,
    )
}

/// Corner radius for a highlight box, never more than half its width or height.
pub fn corner_radius(rect: &PixelRect) -> f64 {
    HIGHLIGHT_RADIUS
        .min(rect.width / 2.0)
        .min(rect.height / 2.0)
        .max(0.0)
}

/// Draws the active frame into an owned canvas.
#[derive(Debug, Clone)]
pub struct ViewRenderer {
    display_height: u32,
    canvas: Canvas,
}

impl ViewRenderer {
    /// Creates a renderer with the default display height.
    pub fn new() -> Self {
        Self::with_height(DISPLAY_HEIGHT)
    }

    /// Creates a renderer with a custom display height (at least 1 px).
    pub fn with_height(display_height: u32) -> Self {
        let display_height = display_height.max(1);
        Self {
            display_height,
            canvas: Canvas::new(0, display_height),
        }
    }

    /// The most recently drawn view.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Redraws the canvas for `frame`.
    ///
    /// If the page is not decoded or the region has no area, the canvas is
    /// left as it was and the reason is returned. No retry is scheduled.
    pub fn render(&mut self, frame: &Frame, pages: &PageImages) -> RenderOutcome {
        if frame.region.is_degenerate() {
            tracing::debug!("frame {}: degenerate region, skipping draw", frame.id);
            return RenderOutcome::Skipped(SkipReason::DegenerateRegion);
        }
        let Some(page) = pages.get(frame.page_index) else {
            tracing::debug!("frame {}: page {} not ready", frame.id, frame.page_index);
            return RenderOutcome::Skipped(SkipReason::PageMissing);
        };

        let crop = crop_rect(&frame.region, page.width(), page.height());
        let (width, height) = canvas_size(&crop, self.display_height);
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.resize(width, height);
        }

        self.canvas.clear(BACKGROUND);
        self.canvas.draw_image(page, crop);

        for highlight in &frame.highlights {
            let rect = map_highlight(highlight, &frame.region, width, height);
            let radius = corner_radius(&rect);
            self.canvas.fill_rounded_rect(rect, radius, HIGHLIGHT_FILL);
            self.canvas
                .stroke_rounded_rect(rect, radius, HIGHLIGHT_BORDER, HIGHLIGHT_STROKE);
        }

        RenderOutcome::Drawn {
            highlights: frame.highlights.len(),
        }
    }
}

impl Default for ViewRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::pages::PageImage;

    const GRAY: Rgba = [128, 128, 128, 255];

    fn frame(page_index: usize, region: PageRect, highlights: Vec<PageRect>) -> Frame {
        Frame::new(page_index, vec!["C4".into()], 1.0, region, highlights)
    }

    fn pages() -> PageImages {
        let mut pages = PageImages::with_len(2);
        pages.insert(0, PageImage::solid(2000, 1000, GRAY));
        pages
    }

    #[test]
    fn test_crop_scales_bounds() {
        let region = PageRect::new(100.0, 250.0, 300.0, 750.0);
        let crop = crop_rect(&region, 2000, 1000);
        assert_eq!(crop, PixelRect::new(500.0, 100.0, 1000.0, 200.0));
    }

    #[test]
    fn test_canvas_width_follows_aspect() {
        let wide = canvas_size(&PixelRect::new(0.0, 0.0, 1000.0, 200.0), 240);
        assert_eq!(wide, (1200, 240));
        let narrow = canvas_size(&PixelRect::new(0.0, 0.0, 100.0, 200.0), 240);
        assert_eq!(narrow, (120, 240));
        let extreme = canvas_size(&PixelRect::new(0.0, 0.0, 1e9, 1.0), 240);
        assert_eq!(extreme.0, MAX_CANVAS_WIDTH);
    }

    #[test]
    fn test_full_region_highlight_maps_to_canvas() {
        let region = PageRect::new(100.0, 250.0, 300.0, 750.0);
        let rect = map_highlight(&region, &region, 1200, 240);
        let p = HIGHLIGHT_PADDING;
        assert!((rect.x + p).abs() < 1e-9);
        assert!((rect.y + p).abs() < 1e-9);
        assert!((rect.width - (1200.0 + 2.0 * p)).abs() < 1e-9);
        assert!((rect.height - (240.0 + 2.0 * p)).abs() < 1e-9);
    }

    #[test]
    fn test_highlight_relative_to_region() {
        let region = PageRect::new(0.0, 0.0, 500.0, 500.0);
        // Lower-right quarter of the region
        let highlight = PageRect::new(250.0, 250.0, 500.0, 500.0);
        let rect = map_highlight(&highlight, &region, 400, 200);
        let p = HIGHLIGHT_PADDING;
        assert!((rect.x - (200.0 - p)).abs() < 1e-9);
        assert!((rect.y - (100.0 - p)).abs() < 1e-9);
        assert!((rect.width - (200.0 + 2.0 * p)).abs() < 1e-9);
    }

    #[test]
    fn test_corner_radius_clamped() {
        assert_eq!(corner_radius(&PixelRect::new(0.0, 0.0, 100.0, 100.0)), HIGHLIGHT_RADIUS);
        assert_eq!(corner_radius(&PixelRect::new(0.0, 0.0, 100.0, 4.0)), 2.0);
        assert_eq!(corner_radius(&PixelRect::new(0.0, 0.0, 3.0, 100.0)), 1.5);
    }

    #[test]
    fn test_tiny_highlight_kept_visible() {
        let region = PageRect::FULL_PAGE;
        let dot = PageRect::new(10.0, 10.0, 10.0, 10.0);
        let rect = map_highlight(&dot, &region, 100, 100);
        assert!(rect.width >= 1.0 + 2.0 * HIGHLIGHT_PADDING);
        assert!(rect.height >= 1.0 + 2.0 * HIGHLIGHT_PADDING);
    }

    #[test]
    fn test_render_draws_crop_and_highlights() {
        let mut renderer = ViewRenderer::new();
        let region = PageRect::new(100.0, 250.0, 300.0, 750.0);
        let highlight = PageRect::new(150.0, 400.0, 250.0, 500.0);
        let outcome = renderer.render(&frame(0, region, vec![highlight]), &pages());

        assert_eq!(outcome, RenderOutcome::Drawn { highlights: 1 });
        let canvas = renderer.canvas();
        assert_eq!((canvas.width(), canvas.height()), (1200, DISPLAY_HEIGHT));
        // Away from the highlight the crop shows the page
        assert_eq!(canvas.pixel(5, 5), Some(GRAY));
        // Inside the highlight the fill is blended in
        let inside = canvas.pixel(540, 120).unwrap();
        assert_ne!(inside, GRAY);
        assert!(inside[0] > GRAY[0]);
    }

    #[test]
    fn test_render_skips_missing_page() {
        let mut renderer = ViewRenderer::new();
        renderer.render(&frame(0, PageRect::FULL_PAGE, vec![]), &pages());
        let before = renderer.canvas().pixel(0, 0);

        let outcome = renderer.render(&frame(1, PageRect::FULL_PAGE, vec![]), &pages());
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::PageMissing));
        assert_eq!(renderer.canvas().pixel(0, 0), before);

        let outcome = renderer.render(&frame(7, PageRect::FULL_PAGE, vec![]), &pages());
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::PageMissing));
    }

    #[test]
    fn test_render_skips_degenerate_region() {
        let mut renderer = ViewRenderer::new();
        let outcome = renderer.render(&frame(0, PageRect::default(), vec![]), &pages());
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::DegenerateRegion));
    }

    #[test]
    fn test_render_redraws_everything() {
        let mut renderer = ViewRenderer::new();
        let region = PageRect::new(0.0, 0.0, 500.0, 500.0);
        renderer.render(&frame(0, region, vec![PageRect::new(0.0, 0.0, 250.0, 250.0)]), &pages());
        renderer.render(&frame(0, region, vec![]), &pages());

        // The earlier highlight is gone
        let canvas = renderer.canvas();
        assert!((0..canvas.width()).all(|x| canvas.pixel(x, 20) == Some(GRAY)));
    }
}
