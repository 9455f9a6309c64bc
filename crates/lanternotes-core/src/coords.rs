//! Coordinate mapping between client space and surface pixel space.

use kurbo::{Point, Rect, Size, Vec2};

/// Display extents below this are treated as degenerate (a collapsed or
/// not-yet-laid-out element) rather than a real size.
pub const MIN_DISPLAY_EXTENT: f64 = 1e-6;

fn axis_scale(pixel: f64, display: f64) -> f64 {
    if display < MIN_DISPLAY_EXTENT {
        return 1.0;
    }
    pixel / display
}

/// Maps pointer/touch client coordinates onto a surface's pixel grid.
///
/// A page canvas is displayed at some on-screen size that generally differs
/// from its backing-store size, so client coordinates are converted with
/// independent X/Y linear scale factors. The same mapping is applied for
/// mouse, pen and touch input so strokes from different sources stay
/// geometrically consistent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    /// Top-left corner of the displayed surface, in client coordinates.
    pub origin: Point,
    /// On-screen displayed size.
    pub display: Size,
    /// Backing-store pixel size.
    pub pixel: Size,
}

impl DisplayMetrics {
    /// Create metrics for a surface displayed at the given origin and size.
    pub fn new(origin: Point, display: Size, pixel: Size) -> Self {
        Self {
            origin,
            display,
            pixel,
        }
    }

    /// Per-axis scale factors from display space to pixel space.
    ///
    /// A degenerate display extent (below [`MIN_DISPLAY_EXTENT`]) falls back
    /// to the identity scale on that axis; real sub-pixel sizes scale
    /// normally.
    pub fn scale(&self) -> Vec2 {
        Vec2::new(
            axis_scale(self.pixel.width, self.display.width),
            axis_scale(self.pixel.height, self.display.height),
        )
    }

    /// Convert a client-space point to surface pixel coordinates.
    pub fn to_surface(&self, client: Point) -> Point {
        let s = self.scale();
        Point::new(
            (client.x - self.origin.x) * s.x,
            (client.y - self.origin.y) * s.y,
        )
    }

    /// Convert a surface pixel coordinate back to client space.
    ///
    /// Used to position selection overlays over the displayed canvas.
    pub fn to_display(&self, surface: Point) -> Point {
        let s = self.scale();
        Point::new(
            surface.x / s.x + self.origin.x,
            surface.y / s.y + self.origin.y,
        )
    }

    /// Convert a surface-space rectangle to client space.
    pub fn rect_to_display(&self, rect: Rect) -> Rect {
        let p0 = self.to_display(Point::new(rect.x0, rect.y0));
        let p1 = self.to_display(Point::new(rect.x1, rect.y1));
        Rect::new(p0.x, p0.y, p1.x, p1.y)
    }
}
